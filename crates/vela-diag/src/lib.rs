mod code;
mod diagnostic;
mod sink;

pub use code::DiagCode;
pub use diagnostic::{Diagnostic, Note, Severity};
pub use sink::Diagnostics;
