//! The semantic type representation and the interning table.
//!
//! Types are immutable and canonical: the compilation owns one
//! instance per structural key, so two types are equal exactly when
//! their [`TypeId`]s are equal. Enums are nominal; a per-declaration
//! id participates in their key.

use std::collections::HashMap;

use smol_str::SmolStr;
use vela_arena::{Arena, Idx};

use crate::value::{ConstantValue, LogicInt};

pub type TypeId = Idx<Type>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bit,
    Logic,
    Reg,
}

impl ScalarKind {
    pub fn four_state(self) -> bool {
        matches!(self, Self::Logic | Self::Reg)
    }

    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::Logic => "logic",
            Self::Reg => "reg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    Real,
    ShortReal,
    RealTime,
}

impl FloatKind {
    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::ShortReal => "shortreal",
            Self::RealTime => "realtime",
        }
    }
}

/// One unpacked dimension, normalized so `[n]` becomes `[0:n-1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayDim {
    pub msb: i32,
    pub lsb: i32,
}

impl ArrayDim {
    pub fn size(self) -> u64 {
        (i64::from(self.msb) - i64::from(self.lsb)).unsigned_abs() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    pub name: SmolStr,
    pub ty: TypeId,
}

/// The structural type representation; doubles as the intern key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// One-bit `bit`/`logic`/`reg`.
    Scalar { kind: ScalarKind, signed: bool },
    /// A packed vector of `width` bits. `bounds` records declared
    /// `[msb:lsb]` when it differs from the canonical `[width-1:0]`.
    PackedInteger {
        width: u32,
        signed: bool,
        four_state: bool,
        bounds: Option<(i32, i32)>,
    },
    PackedStruct {
        fields: Vec<FieldInfo>,
    },
    PackedUnion {
        fields: Vec<FieldInfo>,
    },
    UnpackedArray {
        elem: TypeId,
        dims: Vec<ArrayDim>,
    },
    /// Nominal enum: the declaration id keeps distinct enums distinct.
    Enum {
        base: TypeId,
        members: Vec<(SmolStr, LogicInt)>,
        unique_id: u32,
    },
    Floating(FloatKind),
    Str,
    CHandle,
    Event,
    Void,
    Null,
    Unbounded,
    Error,
}

/// Width, signedness, and statefulness of an integral type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegralInfo {
    pub width: u32,
    pub signed: bool,
    pub four_state: bool,
}

impl IntegralInfo {
    pub fn bounds(&self) -> (i32, i32) {
        (self.width as i32 - 1, 0)
    }
}

/// Owner of all canonical types.
///
/// Builtins are created eagerly so accessors never allocate.
#[derive(Debug)]
pub struct TypeTable {
    arena: Arena<Type>,
    map: HashMap<Type, TypeId>,
    next_enum_id: u32,

    bit: TypeId,
    logic: TypeId,
    reg: TypeId,
    byte: TypeId,
    short_int: TypeId,
    int: TypeId,
    long_int: TypeId,
    integer: TypeId,
    time: TypeId,
    real: TypeId,
    short_real: TypeId,
    real_time: TypeId,
    string: TypeId,
    chandle: TypeId,
    event: TypeId,
    void: TypeId,
    null: TypeId,
    unbounded: TypeId,
    error: TypeId,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let mut map = HashMap::new();
        let mut intern = |ty: Type| -> TypeId {
            let id = arena.alloc(ty.clone());
            map.insert(ty, id);
            id
        };

        let bit = intern(Type::Scalar {
            kind: ScalarKind::Bit,
            signed: false,
        });
        let logic = intern(Type::Scalar {
            kind: ScalarKind::Logic,
            signed: false,
        });
        let reg = intern(Type::Scalar {
            kind: ScalarKind::Reg,
            signed: false,
        });
        let byte = intern(packed(8, true, false));
        let short_int = intern(packed(16, true, false));
        let int = intern(packed(32, true, false));
        let long_int = intern(packed(64, true, false));
        let integer = intern(packed(32, true, true));
        let time = intern(packed(64, false, true));
        let real = intern(Type::Floating(FloatKind::Real));
        let short_real = intern(Type::Floating(FloatKind::ShortReal));
        let real_time = intern(Type::Floating(FloatKind::RealTime));
        let string = intern(Type::Str);
        let chandle = intern(Type::CHandle);
        let event = intern(Type::Event);
        let void = intern(Type::Void);
        let null = intern(Type::Null);
        let unbounded = intern(Type::Unbounded);
        let error = intern(Type::Error);

        Self {
            arena,
            map,
            next_enum_id: 1,
            bit,
            logic,
            reg,
            byte,
            short_int,
            int,
            long_int,
            integer,
            time,
            real,
            short_real,
            real_time,
            string,
            chandle,
            event,
            void,
            null,
            unbounded,
            error,
        }
    }

    /// The existing id for a structural key, if one was interned.
    pub fn try_get(&self, ty: &Type) -> Option<TypeId> {
        self.map.get(ty).copied()
    }

    /// Canonicalize: returns the existing id for an equal structural
    /// key, or allocates a fresh one.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.map.get(&ty) {
            return id;
        }
        let id = self.arena.alloc(ty.clone());
        self.map.insert(ty, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        self.arena.get(id)
    }

    pub fn next_enum_id(&mut self) -> u32 {
        let id = self.next_enum_id;
        self.next_enum_id += 1;
        id
    }

    /// A packed vector of the given shape, canonical bounds.
    pub fn packed(&mut self, width: u32, signed: bool, four_state: bool) -> TypeId {
        self.intern(packed(width, signed, four_state))
    }

    pub fn bit_type(&self) -> TypeId {
        self.bit
    }
    pub fn logic_type(&self) -> TypeId {
        self.logic
    }
    pub fn reg_type(&self) -> TypeId {
        self.reg
    }
    pub fn byte_type(&self) -> TypeId {
        self.byte
    }
    pub fn shortint_type(&self) -> TypeId {
        self.short_int
    }
    pub fn int_type(&self) -> TypeId {
        self.int
    }
    pub fn longint_type(&self) -> TypeId {
        self.long_int
    }
    pub fn integer_type(&self) -> TypeId {
        self.integer
    }
    pub fn time_type(&self) -> TypeId {
        self.time
    }
    pub fn real_type(&self) -> TypeId {
        self.real
    }
    pub fn shortreal_type(&self) -> TypeId {
        self.short_real
    }
    pub fn realtime_type(&self) -> TypeId {
        self.real_time
    }
    pub fn string_type(&self) -> TypeId {
        self.string
    }
    pub fn chandle_type(&self) -> TypeId {
        self.chandle
    }
    pub fn event_type(&self) -> TypeId {
        self.event
    }
    pub fn void_type(&self) -> TypeId {
        self.void
    }
    pub fn null_type(&self) -> TypeId {
        self.null
    }
    pub fn unbounded_type(&self) -> TypeId {
        self.unbounded
    }
    pub fn error_type(&self) -> TypeId {
        self.error
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == self.error
    }

    /// Integral shape of a type, looking through enums.
    pub fn integral_info(&self, id: TypeId) -> Option<IntegralInfo> {
        match self.get(id) {
            Type::Scalar { kind, signed } => Some(IntegralInfo {
                width: 1,
                signed: *signed,
                four_state: kind.four_state(),
            }),
            Type::PackedInteger {
                width,
                signed,
                four_state,
                ..
            } => Some(IntegralInfo {
                width: *width,
                signed: *signed,
                four_state: *four_state,
            }),
            Type::PackedStruct { fields } => {
                let mut width = 0u32;
                let mut four_state = false;
                for f in fields {
                    let info = self.integral_info(f.ty)?;
                    width = width.checked_add(info.width)?;
                    four_state |= info.four_state;
                }
                Some(IntegralInfo {
                    width,
                    signed: false,
                    four_state,
                })
            }
            Type::PackedUnion { fields } => {
                let mut width = 0u32;
                let mut four_state = false;
                for f in fields {
                    let info = self.integral_info(f.ty)?;
                    width = width.max(info.width);
                    four_state |= info.four_state;
                }
                Some(IntegralInfo {
                    width,
                    signed: false,
                    four_state,
                })
            }
            Type::Enum { base, .. } => self.integral_info(*base),
            _ => None,
        }
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        self.integral_info(id).is_some()
    }

    pub fn is_floating(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Floating(_))
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integral(id) || self.is_floating(id)
    }

    pub fn is_four_state(&self, id: TypeId) -> bool {
        self.integral_info(id).is_some_and(|i| i.four_state)
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        self.integral_info(id).is_some_and(|i| i.signed)
    }

    /// Total bit width of an integral type.
    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        self.integral_info(id).map(|i| i.width)
    }

    /// Declared `[msb:lsb]` bounds of a packed type.
    pub fn packed_bounds(&self, id: TypeId) -> Option<(i32, i32)> {
        match self.get(id) {
            Type::PackedInteger {
                bounds: Some(b), ..
            } => Some(*b),
            _ => self.integral_info(id).map(|i| i.bounds()),
        }
    }

    /// The default (uninitialized) value of a type: X for four-state,
    /// zero for two-state, composites element-wise.
    pub fn default_value(&self, id: TypeId) -> ConstantValue {
        match self.get(id) {
            Type::Scalar { .. } | Type::PackedInteger { .. } | Type::PackedStruct { .. }
            | Type::PackedUnion { .. } | Type::Enum { .. } => {
                let Some(info) = self.integral_info(id) else {
                    return ConstantValue::Bad;
                };
                let v = if info.four_state {
                    LogicInt::all_x(info.width)
                } else {
                    LogicInt::zero(info.width)
                };
                ConstantValue::Integer(v.as_signed(info.signed))
            }
            Type::UnpackedArray { elem, dims } => {
                let mut value = self.default_value(*elem);
                for dim in dims.iter().rev() {
                    value = ConstantValue::Elements(vec![value; dim.size() as usize]);
                }
                value
            }
            Type::Floating(FloatKind::ShortReal) => ConstantValue::ShortReal(0.0),
            Type::Floating(_) => ConstantValue::Real(0.0),
            Type::Str => ConstantValue::Str(SmolStr::default()),
            Type::CHandle | Type::Null => ConstantValue::NullHandle,
            Type::Event => ConstantValue::Event,
            Type::Unbounded => ConstantValue::Unbounded,
            Type::Void | Type::Error => ConstantValue::Bad,
        }
    }

    /// The value a failed constant evaluation leaves behind: all-X at
    /// the type's width, so downstream use stays quiet.
    pub fn default_error_value(&self, id: TypeId) -> ConstantValue {
        match self.integral_info(id) {
            Some(info) => {
                ConstantValue::Integer(LogicInt::all_x(info.width).as_signed(info.signed))
            }
            None => ConstantValue::Bad,
        }
    }

    /// Human-readable name, using keyword aliases for the well-known
    /// shapes.
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Scalar { kind, signed } => {
                let mut s = kind.keyword_str().to_string();
                if *signed {
                    s.push_str(" signed");
                }
                s
            }
            Type::PackedInteger {
                width,
                signed,
                four_state,
                bounds,
            } => match (width, signed, four_state, bounds) {
                (8, true, false, None) => "byte".into(),
                (16, true, false, None) => "shortint".into(),
                (32, true, false, None) => "int".into(),
                (64, true, false, None) => "longint".into(),
                (32, true, true, None) => "integer".into(),
                (64, false, true, None) => "time".into(),
                _ => {
                    let (msb, lsb) = bounds.unwrap_or((*width as i32 - 1, 0));
                    let base = if *four_state { "logic" } else { "bit" };
                    let sign = if *signed { " signed" } else { "" };
                    format!("{base}{sign} [{msb}:{lsb}]")
                }
            },
            Type::PackedStruct { .. } => "struct packed".into(),
            Type::PackedUnion { .. } => "union packed".into(),
            Type::UnpackedArray { elem, dims } => {
                let mut s = self.display(*elem);
                for dim in dims {
                    s.push_str(&format!("[{}:{}]", dim.msb, dim.lsb));
                }
                s
            }
            Type::Enum { .. } => "enum".into(),
            Type::Floating(kind) => kind.keyword_str().into(),
            Type::Str => "string".into(),
            Type::CHandle => "chandle".into(),
            Type::Event => "event".into(),
            Type::Void => "void".into(),
            Type::Null => "null".into(),
            Type::Unbounded => "$".into(),
            Type::Error => "<error>".into(),
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn packed(width: u32, signed: bool, four_state: bool) -> Type {
    Type::PackedInteger {
        width,
        signed,
        four_state,
        bounds: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Logic;

    #[test]
    fn equal_keys_intern_to_equal_ids() {
        let mut table = TypeTable::new();
        let a = table.packed(8, false, true);
        let b = table.packed(8, false, true);
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_intern_to_different_ids() {
        let mut table = TypeTable::new();
        let a = table.packed(8, false, true);
        let b = table.packed(8, true, true);
        let c = table.packed(9, false, true);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn builtins_match_their_structural_keys() {
        let mut table = TypeTable::new();
        assert_eq!(table.packed(32, true, false), table.int_type());
        assert_eq!(table.packed(32, true, true), table.integer_type());
        assert_eq!(table.packed(64, false, true), table.time_type());
    }

    #[test]
    fn integral_info_of_builtins() {
        let table = TypeTable::new();
        let int = table.integral_info(table.int_type()).unwrap();
        assert_eq!(int.width, 32);
        assert!(int.signed);
        assert!(!int.four_state);

        let logic = table.integral_info(table.logic_type()).unwrap();
        assert_eq!(logic.width, 1);
        assert!(logic.four_state);
    }

    #[test]
    fn struct_width_sums_fields() {
        let mut table = TypeTable::new();
        let b8 = table.packed(8, false, false);
        let b4 = table.packed(4, false, true);
        let s = table.intern(Type::PackedStruct {
            fields: vec![
                FieldInfo {
                    name: SmolStr::new("hi"),
                    ty: b8,
                },
                FieldInfo {
                    name: SmolStr::new("lo"),
                    ty: b4,
                },
            ],
        });
        let info = table.integral_info(s).unwrap();
        assert_eq!(info.width, 12);
        assert!(info.four_state);
    }

    #[test]
    fn union_width_is_max_field() {
        let mut table = TypeTable::new();
        let b8 = table.packed(8, false, false);
        let b4 = table.packed(4, false, false);
        let u = table.intern(Type::PackedUnion {
            fields: vec![
                FieldInfo {
                    name: SmolStr::new("a"),
                    ty: b8,
                },
                FieldInfo {
                    name: SmolStr::new("b"),
                    ty: b4,
                },
            ],
        });
        assert_eq!(table.bit_width(u), Some(8));
    }

    #[test]
    fn enums_are_nominal() {
        let mut table = TypeTable::new();
        let base = table.int_type();
        let id1 = table.next_enum_id();
        let id2 = table.next_enum_id();
        let members = vec![(SmolStr::new("A"), LogicInt::from_i64(32, true, 0))];
        let e1 = table.intern(Type::Enum {
            base,
            members: members.clone(),
            unique_id: id1,
        });
        let e2 = table.intern(Type::Enum {
            base,
            members,
            unique_id: id2,
        });
        assert_ne!(e1, e2);
    }

    #[test]
    fn default_value_four_state_is_x() {
        let mut table = TypeTable::new();
        let l8 = table.packed(8, false, true);
        match table.default_value(l8) {
            ConstantValue::Integer(v) => {
                assert!(v.has_unknown());
                assert_eq!(v.bit(0), Logic::X);
            }
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn default_value_two_state_is_zero() {
        let table = TypeTable::new();
        match table.default_value(table.int_type()) {
            ConstantValue::Integer(v) => assert_eq!(v.to_i64(), Some(0)),
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn default_value_array_nests() {
        let mut table = TypeTable::new();
        let elem = table.int_type();
        let arr = table.intern(Type::UnpackedArray {
            elem,
            dims: vec![ArrayDim { msb: 0, lsb: 2 }],
        });
        match table.default_value(arr) {
            ConstantValue::Elements(elems) => assert_eq!(elems.len(), 3),
            _ => panic!("expected elements"),
        }
    }

    #[test]
    fn display_uses_keyword_aliases() {
        let mut table = TypeTable::new();
        assert_eq!(table.display(table.int_type()), "int");
        assert_eq!(table.display(table.logic_type()), "logic");
        let l8 = table.packed(8, false, true);
        assert_eq!(table.display(l8), "logic [7:0]");
        let b4s = table.packed(4, true, false);
        assert_eq!(table.display(b4s), "bit signed [3:0]");
    }

    #[test]
    fn declared_bounds_participate_in_identity() {
        let mut table = TypeTable::new();
        let canonical = table.packed(4, false, true);
        let shifted = table.intern(Type::PackedInteger {
            width: 4,
            signed: false,
            four_state: true,
            bounds: Some((7, 4)),
        });
        assert_ne!(canonical, shifted);
        assert_eq!(table.packed_bounds(shifted), Some((7, 4)));
        assert_eq!(table.packed_bounds(canonical), Some((3, 0)));
    }
}
