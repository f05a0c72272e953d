//! Constant values and four-state integer arithmetic.
//!
//! Integers carry explicit width and signedness and two bit planes:
//! `bits` holds known values, `xz` marks unknown positions. Where an
//! `xz` bit is set, the matching `bits` bit distinguishes X (0) from
//! Z (1). Arithmetic poisons to all-X when any operand bit is
//! unknown; bitwise operators propagate per-bit per the language
//! truth tables.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};
use smol_str::SmolStr;
use vela_syntax::LiteralBase;

/// One four-state bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Zero,
    One,
    X,
    Z,
}

impl Logic {
    pub fn is_unknown(self) -> bool {
        matches!(self, Logic::X | Logic::Z)
    }

    pub fn from_bool(b: bool) -> Self {
        if b { Logic::One } else { Logic::Zero }
    }
}

fn width_mask(width: u32) -> BigUint {
    (BigUint::one() << width) - BigUint::one()
}

/// Arbitrary-precision four-state integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicInt {
    width: u32,
    signed: bool,
    bits: BigUint,
    xz: BigUint,
}

impl LogicInt {
    /// Build from raw planes, masking both to `width`. Width is
    /// clamped to at least one bit.
    pub fn new(width: u32, signed: bool, bits: BigUint, xz: BigUint) -> Self {
        let width = width.max(1);
        let mask = width_mask(width);
        Self {
            width,
            signed,
            bits: bits & &mask,
            xz: xz & mask,
        }
    }

    pub fn zero(width: u32) -> Self {
        Self::new(width, false, BigUint::zero(), BigUint::zero())
    }

    pub fn all_x(width: u32) -> Self {
        let width = width.max(1);
        Self::new(width, false, BigUint::zero(), width_mask(width))
    }

    pub fn all_z(width: u32) -> Self {
        let width = width.max(1);
        let mask = width_mask(width);
        Self::new(width, false, mask.clone(), mask)
    }

    pub fn filled(width: u32, bit: Logic) -> Self {
        let width = width.max(1);
        let mask = width_mask(width);
        match bit {
            Logic::Zero => Self::zero(width),
            Logic::One => Self::new(width, false, mask, BigUint::zero()),
            Logic::X => Self::all_x(width),
            Logic::Z => Self::all_z(width),
        }
    }

    pub fn from_u64(width: u32, value: u64) -> Self {
        Self::new(width, false, BigUint::from(value), BigUint::zero())
    }

    /// Two's-complement wrap of a signed value into `width` bits.
    pub fn from_i64(width: u32, signed: bool, value: i64) -> Self {
        Self::from_bigint(width, signed, &BigInt::from(value))
    }

    pub fn from_bigint(width: u32, signed: bool, value: &BigInt) -> Self {
        let width = width.max(1);
        let modulus = BigInt::one() << width;
        let mut v = value % &modulus;
        if v.sign() == Sign::Minus {
            v += &modulus;
        }
        let bits = v.to_biguint().unwrap_or_default();
        Self::new(width, signed, bits, BigUint::zero())
    }

    /// Parse digit text of a based or decimal literal. `digits` has
    /// underscores stripped; x/z/? digits fill their bit group.
    /// Unsized literals get at least 32 bits, wider if needed.
    pub fn parse_literal(
        width: Option<u32>,
        signed: bool,
        base: LiteralBase,
        digits: &str,
    ) -> Option<Self> {
        let mut bits = BigUint::zero();
        let mut xz = BigUint::zero();

        if base == LiteralBase::Decimal {
            // A decimal x/z literal is a single digit covering the
            // whole width.
            if digits.len() == 1 && matches!(digits.as_bytes()[0], b'x' | b'X') {
                return Some(Self::all_x(width.unwrap_or(32)));
            }
            if digits.len() == 1 && matches!(digits.as_bytes()[0], b'z' | b'Z' | b'?') {
                return Some(Self::all_z(width.unwrap_or(32)));
            }
            for ch in digits.chars() {
                let d = ch.to_digit(10)?;
                bits = bits * 10u32 + d;
            }
            let needed = bits.bits().max(1) as u32;
            let w = width.unwrap_or_else(|| needed.max(32));
            return Some(Self::new(w, signed || width.is_none(), bits, xz));
        }

        let per_digit = base.bits_per_digit();
        for ch in digits.chars() {
            bits <<= per_digit;
            xz <<= per_digit;
            let group = width_mask(per_digit);
            match ch {
                'x' | 'X' => {
                    xz |= &group;
                }
                'z' | 'Z' | '?' => {
                    bits |= &group;
                    xz |= &group;
                }
                _ => {
                    let d = ch.to_digit(base.radix())?;
                    bits |= BigUint::from(d);
                }
            }
        }
        let needed = (digits.len() as u32 * per_digit).max(1);
        let w = width.unwrap_or_else(|| needed.max(32));
        Some(Self::new(w, signed, bits, xz))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn has_unknown(&self) -> bool {
        !self.xz.is_zero()
    }

    pub fn bit(&self, index: u32) -> Logic {
        if index >= self.width {
            return Logic::X;
        }
        let b = self.bits.bit(index as u64);
        if self.xz.bit(index as u64) {
            if b { Logic::Z } else { Logic::X }
        } else {
            Logic::from_bool(b)
        }
    }

    fn msb(&self) -> Logic {
        self.bit(self.width - 1)
    }

    /// Known-one and known-zero planes.
    fn known_planes(&self) -> (BigUint, BigUint) {
        let mask = width_mask(self.width);
        let known = &mask ^ &self.xz;
        let ones = &self.bits & &known;
        let zeros = (&mask ^ &self.bits) & &known;
        (ones, zeros)
    }

    /// Signed interpretation of the value plane; `None` when any bit
    /// is unknown.
    pub fn to_bigint(&self) -> Option<BigInt> {
        if self.has_unknown() {
            return None;
        }
        let unsigned = BigInt::from(self.bits.clone());
        if self.signed && self.bits.bit((self.width - 1) as u64) {
            Some(unsigned - (BigInt::one() << self.width))
        } else {
            Some(unsigned)
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_bigint()?.to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        if self.has_unknown() {
            return None;
        }
        self.bits.to_u64()
    }

    #[must_use]
    pub fn as_signed(&self, signed: bool) -> Self {
        let mut out = self.clone();
        out.signed = signed;
        out
    }

    /// Resize to `width`, sign- or zero-extending per the value's own
    /// signedness. An unknown sign bit extends as itself (X stays X,
    /// Z stays Z).
    #[must_use]
    pub fn resize(&self, width: u32) -> Self {
        let width = width.max(1);
        if width == self.width {
            return self.clone();
        }
        if width < self.width {
            return Self::new(width, self.signed, self.bits.clone(), self.xz.clone());
        }
        let ext_bit = if self.signed { self.msb() } else { Logic::Zero };
        let ext_width = width - self.width;
        let ext_mask = width_mask(ext_width) << self.width;
        let mut bits = self.bits.clone();
        let mut xz = self.xz.clone();
        match ext_bit {
            Logic::Zero => {}
            Logic::One => bits |= &ext_mask,
            Logic::X => xz |= &ext_mask,
            Logic::Z => {
                bits |= &ext_mask;
                xz |= &ext_mask;
            }
        }
        Self::new(width, self.signed, bits, xz)
    }

    /// Convert to the given width/signedness, truncating or extending.
    /// Extension uses the value's own signedness before retagging.
    #[must_use]
    pub fn convert(&self, width: u32, signed: bool) -> Self {
        self.resize(width).as_signed(signed)
    }

    fn binary_width(&self, rhs: &Self) -> u32 {
        debug_assert_eq!(self.width, rhs.width);
        self.width
    }

    fn arith<F>(&self, rhs: &Self, f: F) -> Self
    where
        F: FnOnce(BigInt, BigInt) -> BigInt,
    {
        let width = self.binary_width(rhs);
        let signed = self.signed && rhs.signed;
        match (self.to_bigint(), rhs.to_bigint()) {
            (Some(a), Some(b)) => Self::from_bigint(width, signed, &f(a, b)).as_signed(signed),
            _ => Self::all_x(width),
        }
    }

    pub fn add(&self, rhs: &Self) -> Self {
        self.arith(rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        self.arith(rhs, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        self.arith(rhs, |a, b| a * b)
    }

    /// `None` signals division by zero; callers diagnose and use
    /// all-X. Unknown operands fold to all-X without the signal.
    pub fn div(&self, rhs: &Self) -> Option<Self> {
        let width = self.binary_width(rhs);
        let signed = self.signed && rhs.signed;
        match (self.to_bigint(), rhs.to_bigint()) {
            (Some(_), Some(b)) if b.is_zero() => None,
            (Some(a), Some(b)) => {
                // Truncating division, matching hardware semantics.
                Some(Self::from_bigint(width, signed, &(a / b)).as_signed(signed))
            }
            _ => Some(Self::all_x(width)),
        }
    }

    pub fn rem(&self, rhs: &Self) -> Option<Self> {
        let width = self.binary_width(rhs);
        let signed = self.signed && rhs.signed;
        match (self.to_bigint(), rhs.to_bigint()) {
            (Some(_), Some(b)) if b.is_zero() => None,
            (Some(a), Some(b)) => {
                Some(Self::from_bigint(width, signed, &(a % b)).as_signed(signed))
            }
            _ => Some(Self::all_x(width)),
        }
    }

    /// Power operator per the language result table for negative
    /// exponents; `0 ** negative` yields all-X.
    pub fn pow(&self, rhs: &Self) -> Self {
        let width = self.width;
        let signed = self.signed && rhs.signed;
        let (Some(base), Some(exp)) = (self.to_bigint(), rhs.to_bigint()) else {
            return Self::all_x(width);
        };
        if exp.sign() == Sign::Minus {
            let result = if base.is_zero() {
                return Self::all_x(width);
            } else if base == BigInt::one() {
                BigInt::one()
            } else if base == BigInt::from(-1) {
                if (&exp % BigInt::from(2)).is_zero() {
                    BigInt::one()
                } else {
                    BigInt::from(-1)
                }
            } else {
                BigInt::zero()
            };
            return Self::from_bigint(width, signed, &result).as_signed(signed);
        }
        let Some(e) = exp.to_u32() else {
            return Self::all_x(width);
        };
        Self::from_bigint(width, signed, &base.pow(e)).as_signed(signed)
    }

    pub fn neg(&self) -> Self {
        if self.has_unknown() {
            return Self::all_x(self.width);
        }
        let v = self.to_bigint().unwrap_or_default();
        Self::from_bigint(self.width, self.signed, &(-v)).as_signed(self.signed)
    }

    pub fn and(&self, rhs: &Self) -> Self {
        let width = self.binary_width(rhs);
        let mask = width_mask(width);
        let (a1, a0) = self.known_planes();
        let (b1, b0) = rhs.known_planes();
        let ones = &a1 & &b1;
        let zeros = &a0 | &b0;
        let unknown = &mask ^ (&ones | &zeros);
        Self::new(width, self.signed && rhs.signed, ones, unknown)
    }

    pub fn or(&self, rhs: &Self) -> Self {
        let width = self.binary_width(rhs);
        let mask = width_mask(width);
        let (a1, a0) = self.known_planes();
        let (b1, b0) = rhs.known_planes();
        let ones = &a1 | &b1;
        let zeros = &a0 & &b0;
        let unknown = &mask ^ (&ones | &zeros);
        Self::new(width, self.signed && rhs.signed, ones, unknown)
    }

    pub fn xor(&self, rhs: &Self) -> Self {
        let width = self.binary_width(rhs);
        let mask = width_mask(width);
        let known = (&mask ^ &self.xz) & (&mask ^ &rhs.xz);
        let bits = (&self.bits ^ &rhs.bits) & &known;
        Self::new(width, self.signed && rhs.signed, bits, &mask ^ known)
    }

    pub fn xnor(&self, rhs: &Self) -> Self {
        self.xor(rhs).not()
    }

    pub fn not(&self) -> Self {
        let mask = width_mask(self.width);
        // Z inputs produce X outputs.
        let known = &mask ^ &self.xz;
        let bits = (&mask ^ &self.bits) & known;
        Self::new(self.width, self.signed, bits, self.xz.clone())
    }

    pub fn shl(&self, amount: &Self) -> Self {
        let Some(n) = amount.to_u64() else {
            return Self::all_x(self.width);
        };
        if n >= u64::from(self.width) {
            return Self::zero(self.width).as_signed(self.signed);
        }
        Self::new(
            self.width,
            self.signed,
            &self.bits << n,
            &self.xz << n,
        )
    }

    pub fn lshr(&self, amount: &Self) -> Self {
        let Some(n) = amount.to_u64() else {
            return Self::all_x(self.width);
        };
        if n >= u64::from(self.width) {
            return Self::zero(self.width).as_signed(self.signed);
        }
        Self::new(
            self.width,
            self.signed,
            &self.bits >> n,
            &self.xz >> n,
        )
    }

    /// Arithmetic right shift; fills with the sign bit when signed.
    pub fn ashr(&self, amount: &Self) -> Self {
        if !self.signed {
            return self.lshr(amount);
        }
        let Some(n) = amount.to_u64() else {
            return Self::all_x(self.width);
        };
        let fill = self.msb();
        let n = n.min(u64::from(self.width)) as u32;
        let shifted_bits = &self.bits >> n;
        let shifted_xz = &self.xz >> n;
        let fill_mask = if n == 0 {
            BigUint::zero()
        } else {
            width_mask(n) << (self.width - n)
        };
        let (bits, xz) = match fill {
            Logic::Zero => (shifted_bits, shifted_xz),
            Logic::One => (shifted_bits | fill_mask, shifted_xz),
            Logic::X => (shifted_bits, shifted_xz | fill_mask),
            Logic::Z => (shifted_bits | &fill_mask, shifted_xz | fill_mask),
        };
        Self::new(self.width, self.signed, bits, xz)
    }

    /// Numeric comparison; `None` when either side has unknown bits.
    pub fn compare(&self, rhs: &Self) -> Option<Ordering> {
        Some(self.to_bigint()?.cmp(&rhs.to_bigint()?))
    }

    /// Logical equality: X when either side has unknown bits.
    pub fn eq_logic(&self, rhs: &Self) -> Logic {
        if self.has_unknown() || rhs.has_unknown() {
            return Logic::X;
        }
        Logic::from_bool(self.to_bigint() == rhs.to_bigint())
    }

    /// Case equality compares both planes exactly.
    pub fn case_eq(&self, rhs: &Self) -> bool {
        debug_assert_eq!(self.width, rhs.width);
        self.bits == rhs.bits && self.xz == rhs.xz
    }

    /// Wildcard equality: X/Z bits of `rhs` are don't-care positions;
    /// unknown bits of `self` in cared positions give X.
    pub fn wildcard_eq(&self, rhs: &Self) -> Logic {
        let width = self.binary_width(rhs);
        let mask = width_mask(width);
        let care = &mask ^ &rhs.xz;
        if !((&self.xz & &care).is_zero()) {
            return Logic::X;
        }
        let lhs_bits = &self.bits & &care;
        let rhs_bits = &rhs.bits & &care;
        Logic::from_bool(lhs_bits == rhs_bits)
    }

    pub fn reduce_and(&self) -> Logic {
        let (_, zeros) = self.known_planes();
        if !zeros.is_zero() {
            Logic::Zero
        } else if self.has_unknown() {
            Logic::X
        } else {
            Logic::One
        }
    }

    pub fn reduce_or(&self) -> Logic {
        let (ones, _) = self.known_planes();
        if !ones.is_zero() {
            Logic::One
        } else if self.has_unknown() {
            Logic::X
        } else {
            Logic::Zero
        }
    }

    pub fn reduce_xor(&self) -> Logic {
        if self.has_unknown() {
            return Logic::X;
        }
        Logic::from_bool(self.bits.count_ones() % 2 == 1)
    }

    /// Truthiness: any known one bit is true; otherwise unknown bits
    /// make the answer X.
    pub fn truthy(&self) -> Logic {
        self.reduce_or()
    }

    /// Concatenate `rhs` below `self` (self becomes the high part).
    pub fn concat(&self, rhs: &Self) -> Self {
        let width = self.width + rhs.width;
        let bits = (&self.bits << rhs.width) | &rhs.bits;
        let xz = (&self.xz << rhs.width) | &rhs.xz;
        Self::new(width, false, bits, xz)
    }

    /// Extract `width` bits starting at `lsb`; positions past the end
    /// read as X.
    pub fn extract(&self, lsb: i64, width: u32) -> Self {
        let mut out = Self::all_x(width);
        for i in 0..width {
            let src = lsb + i as i64;
            if src >= 0 && (src as u64) < u64::from(self.width) {
                out.set_bit(i, self.bit(src as u32));
            }
        }
        out
    }

    pub fn set_bit(&mut self, index: u32, value: Logic) {
        if index >= self.width {
            return;
        }
        let i = u64::from(index);
        let (b, x) = match value {
            Logic::Zero => (false, false),
            Logic::One => (true, false),
            Logic::X => (false, true),
            Logic::Z => (true, true),
        };
        self.bits.set_bit(i, b);
        self.xz.set_bit(i, x);
    }

    pub fn to_real(&self) -> f64 {
        match self.to_bigint() {
            Some(v) => v.to_f64().unwrap_or(0.0),
            None => 0.0,
        }
    }
}

impl fmt::Display for LogicInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_unknown() {
            match self.to_bigint() {
                Some(v) => return write!(f, "{}'{}{}", self.width, if self.signed { "sd" } else { "d" }, v),
                None => {}
            }
        }
        write!(f, "{}'b", self.width)?;
        for i in (0..self.width).rev() {
            let c = match self.bit(i) {
                Logic::Zero => '0',
                Logic::One => '1',
                Logic::X => 'x',
                Logic::Z => 'z',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// A constant as computed by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Integer(LogicInt),
    Real(f64),
    ShortReal(f32),
    Str(SmolStr),
    NullHandle,
    Unbounded,
    /// Ordered element list for unpacked arrays.
    Elements(Vec<ConstantValue>),
    /// Ordered field map for structs and unions.
    Fields(Vec<(SmolStr, ConstantValue)>),
    Event,
    Bad,
}

impl ConstantValue {
    pub fn is_bad(&self) -> bool {
        matches!(self, ConstantValue::Bad)
    }

    pub fn integer(&self) -> Option<&LogicInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_integer(self) -> Option<LogicInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Truthiness for condition positions.
    pub fn truthy(&self) -> Logic {
        match self {
            ConstantValue::Integer(v) => v.truthy(),
            ConstantValue::Real(v) => Logic::from_bool(*v != 0.0),
            ConstantValue::ShortReal(v) => Logic::from_bool(*v != 0.0),
            ConstantValue::Str(s) => Logic::from_bool(!s.is_empty()),
            ConstantValue::NullHandle => Logic::Zero,
            _ => Logic::X,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Integer(v) => write!(f, "{v}"),
            ConstantValue::Real(v) => write!(f, "{v}"),
            ConstantValue::ShortReal(v) => write!(f, "{v}"),
            ConstantValue::Str(s) => write!(f, "\"{s}\""),
            ConstantValue::NullHandle => write!(f, "null"),
            ConstantValue::Unbounded => write!(f, "$"),
            ConstantValue::Elements(elems) => {
                write!(f, "'{{")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")
            }
            ConstantValue::Fields(fields) => {
                write!(f, "'{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {v}")?;
                }
                write!(f, "}}")
            }
            ConstantValue::Event => write!(f, "<event>"),
            ConstantValue::Bad => write!(f, "<bad>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn li(width: u32, signed: bool, value: i64) -> LogicInt {
        LogicInt::from_i64(width, signed, value)
    }

    #[test]
    fn from_i64_wraps_twos_complement() {
        let v = li(8, true, -1);
        assert_eq!(v.to_u64(), Some(255));
        assert_eq!(v.to_i64(), Some(-1));
    }

    #[test]
    fn unsigned_reading_ignores_sign_bit() {
        let v = li(8, false, -1);
        assert_eq!(v.to_i64(), Some(255));
    }

    #[test]
    fn add_wraps_at_width() {
        let a = li(8, false, 200);
        let b = li(8, false, 100);
        assert_eq!(a.add(&b).to_u64(), Some(44));
    }

    #[test]
    fn signed_add() {
        let a = li(32, true, 3);
        let b = li(32, true, 4);
        assert_eq!(a.add(&b).to_i64(), Some(7));
    }

    #[test]
    fn mul_and_sub() {
        assert_eq!(li(32, true, 6).mul(&li(32, true, 7)).to_i64(), Some(42));
        assert_eq!(li(32, true, 10).sub(&li(32, true, 3)).to_i64(), Some(7));
    }

    #[test]
    fn div_by_zero_signals() {
        assert!(li(32, true, 1).div(&li(32, true, 0)).is_none());
        assert!(li(32, true, 1).rem(&li(32, true, 0)).is_none());
    }

    #[test]
    fn div_truncates_toward_zero() {
        assert_eq!(li(32, true, -7).div(&li(32, true, 2)).unwrap().to_i64(), Some(-3));
        assert_eq!(li(32, true, 7).rem(&li(32, true, -2)).unwrap().to_i64(), Some(1));
    }

    #[test]
    fn arith_with_unknown_is_all_x() {
        let a = LogicInt::all_x(8);
        let b = li(8, false, 1);
        let sum = a.add(&b);
        assert!(sum.has_unknown());
        assert_eq!(sum.bit(0), Logic::X);
        assert_eq!(sum.bit(7), Logic::X);
    }

    #[test]
    fn pow_basic() {
        assert_eq!(li(32, true, 2).pow(&li(32, true, 10)).to_i64(), Some(1024));
    }

    #[test]
    fn pow_zero_to_negative_is_x() {
        assert!(li(32, true, 0).pow(&li(32, true, -1)).has_unknown());
    }

    #[test]
    fn pow_negative_exponent_table() {
        assert_eq!(li(32, true, 1).pow(&li(32, true, -5)).to_i64(), Some(1));
        assert_eq!(li(32, true, 5).pow(&li(32, true, -2)).to_i64(), Some(0));
    }

    #[test]
    fn bitwise_and_x_propagation() {
        // 0 & x = 0, 1 & x = x.
        let mut a = LogicInt::zero(2);
        a.set_bit(1, Logic::One);
        let x = LogicInt::all_x(2);
        let r = a.and(&x);
        assert_eq!(r.bit(0), Logic::Zero);
        assert_eq!(r.bit(1), Logic::X);
    }

    #[test]
    fn bitwise_or_x_propagation() {
        // 1 | x = 1, 0 | x = x.
        let mut a = LogicInt::zero(2);
        a.set_bit(1, Logic::One);
        let x = LogicInt::all_x(2);
        let r = a.or(&x);
        assert_eq!(r.bit(0), Logic::X);
        assert_eq!(r.bit(1), Logic::One);
    }

    #[test]
    fn xor_with_unknown_is_unknown() {
        let a = li(2, false, 0b01);
        let mut b = li(2, false, 0b00);
        b.set_bit(0, Logic::X);
        let r = a.xor(&b);
        assert_eq!(r.bit(0), Logic::X);
        assert_eq!(r.bit(1), Logic::Zero);
    }

    #[test]
    fn not_turns_z_into_x() {
        let v = LogicInt::all_z(4);
        let r = v.not();
        assert_eq!(r.bit(0), Logic::X);
    }

    #[test]
    fn shifts() {
        assert_eq!(li(16, false, 1).shl(&li(16, false, 8)).to_u64(), Some(256));
        assert_eq!(li(16, false, 256).lshr(&li(16, false, 4)).to_u64(), Some(16));
    }

    #[test]
    fn shift_by_unknown_is_x() {
        assert!(li(8, false, 1).shl(&LogicInt::all_x(8)).has_unknown());
    }

    #[test]
    fn shift_past_width_clears() {
        assert_eq!(li(8, false, 0xFF).shl(&li(8, false, 8)).to_u64(), Some(0));
    }

    #[test]
    fn ashr_fills_with_sign() {
        let v = li(8, true, -128);
        assert_eq!(v.ashr(&li(8, false, 7)).to_i64(), Some(-1));
    }

    #[test]
    fn eq_logic_with_x_is_x() {
        let a = li(8, false, 3);
        let b = LogicInt::all_x(8);
        assert_eq!(a.eq_logic(&b), Logic::X);
    }

    #[test]
    fn case_eq_is_exact() {
        let a = LogicInt::all_x(8);
        let b = LogicInt::all_x(8);
        assert!(a.case_eq(&b));
        assert!(!a.case_eq(&LogicInt::all_z(8)));
    }

    #[test]
    fn wildcard_eq_ignores_rhs_xz() {
        // 4'b1010 ==? 4'b1xz0
        let a = li(4, false, 0b1010);
        let mut b = li(4, false, 0b1000);
        b.set_bit(2, Logic::X);
        b.set_bit(1, Logic::Z);
        assert_eq!(a.wildcard_eq(&b), Logic::One);
    }

    #[test]
    fn reductions() {
        assert_eq!(li(4, false, 0b1111).reduce_and(), Logic::One);
        assert_eq!(li(4, false, 0b1011).reduce_and(), Logic::Zero);
        assert_eq!(li(4, false, 0).reduce_or(), Logic::Zero);
        assert_eq!(li(4, false, 0b0100).reduce_or(), Logic::One);
        assert_eq!(li(4, false, 0b0111).reduce_xor(), Logic::One);
        assert_eq!(li(4, false, 0b0110).reduce_xor(), Logic::Zero);
    }

    #[test]
    fn reduce_or_with_known_one_and_x_is_one() {
        let mut v = li(2, false, 0b10);
        v.set_bit(0, Logic::X);
        assert_eq!(v.reduce_or(), Logic::One);
    }

    #[test]
    fn resize_sign_extends() {
        let v = li(4, true, -2);
        assert_eq!(v.resize(8).to_i64(), Some(-2));
        let u = li(4, false, 0b1110);
        assert_eq!(u.resize(8).to_u64(), Some(0b1110));
    }

    #[test]
    fn resize_extends_x_sign_bit() {
        let mut v = LogicInt::zero(4).as_signed(true);
        v.set_bit(3, Logic::X);
        let wide = v.resize(8);
        assert_eq!(wide.bit(7), Logic::X);
        assert_eq!(wide.bit(0), Logic::Zero);
    }

    #[test]
    fn resize_truncates() {
        let v = li(32, false, 0x1FF);
        assert_eq!(v.resize(8).to_u64(), Some(0xFF));
    }

    #[test]
    fn concat_orders_high_to_low() {
        let hi = li(4, false, 0xA);
        let lo = li(4, false, 0x5);
        let r = hi.concat(&lo);
        assert_eq!(r.width(), 8);
        assert_eq!(r.to_u64(), Some(0xA5));
    }

    #[test]
    fn extract_in_and_out_of_range() {
        let v = li(8, false, 0b1100_0011);
        assert_eq!(v.extract(0, 4).to_u64(), Some(0b0011));
        assert_eq!(v.extract(4, 4).to_u64(), Some(0b1100));
        assert!(v.extract(6, 4).has_unknown());
        assert!(v.extract(-2, 4).has_unknown());
    }

    #[test]
    fn parse_sized_hex() {
        let v = LogicInt::parse_literal(Some(8), false, LiteralBase::Hex, "FF").unwrap();
        assert_eq!(v.to_u64(), Some(255));
        assert_eq!(v.width(), 8);
    }

    #[test]
    fn parse_unsized_decimal_is_32_signed() {
        let v = LogicInt::parse_literal(None, true, LiteralBase::Decimal, "42").unwrap();
        assert_eq!(v.width(), 32);
        assert!(v.is_signed());
        assert_eq!(v.to_i64(), Some(42));
    }

    #[test]
    fn parse_wide_decimal_grows_past_32() {
        let v =
            LogicInt::parse_literal(None, true, LiteralBase::Decimal, "18446744073709551615")
                .unwrap();
        assert!(v.width() >= 64);
    }

    #[test]
    fn parse_xz_digits() {
        // 4'bxx10
        let v = LogicInt::parse_literal(Some(4), false, LiteralBase::Binary, "xx10").unwrap();
        assert_eq!(v.bit(0), Logic::Zero);
        assert_eq!(v.bit(1), Logic::One);
        assert_eq!(v.bit(2), Logic::X);
        assert_eq!(v.bit(3), Logic::X);
    }

    #[test]
    fn parse_z_hex_digit_fills_group() {
        let v = LogicInt::parse_literal(Some(8), false, LiteralBase::Hex, "zF").unwrap();
        assert_eq!(v.bit(0), Logic::One);
        assert_eq!(v.bit(4), Logic::Z);
        assert_eq!(v.bit(7), Logic::Z);
    }

    #[test]
    fn parse_truncates_oversized_digits() {
        let v = LogicInt::parse_literal(Some(4), false, LiteralBase::Hex, "FF").unwrap();
        assert_eq!(v.to_u64(), Some(0xF));
    }

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(li(32, true, 7).to_string(), "32'sd7");
        assert_eq!(li(8, false, 255).to_string(), "8'd255");
        let v = LogicInt::parse_literal(Some(4), false, LiteralBase::Binary, "x1z0").unwrap();
        assert_eq!(v.to_string(), "4'bx1z0");
    }

    #[test]
    fn constant_value_truthiness() {
        assert_eq!(
            ConstantValue::Integer(li(8, false, 1)).truthy(),
            Logic::One
        );
        assert_eq!(ConstantValue::Real(0.0).truthy(), Logic::Zero);
        assert_eq!(ConstantValue::Str(SmolStr::new("")).truthy(), Logic::Zero);
        assert_eq!(ConstantValue::NullHandle.truthy(), Logic::Zero);
    }
}
