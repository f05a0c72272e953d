use smol_str::SmolStr;
use vela_source::TextRange;

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::ty::{DimensionSyntax, TypeSyntax};

/// A design element or scope member as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub range: TextRange,
    pub attributes: Vec<AttributeSpec>,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            range: TextRange::default(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attr: AttributeSpec) -> Self {
        self.attributes.push(attr);
        self
    }
}

/// `(* name = value *)` attached to a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: SmolStr,
    pub value: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Module(ModuleDecl),
    Package(PackageDecl),
    Config(ConfigDecl),
    Class(ClassDecl),
    Param(ParamDecl),
    Var(VarDecl),
    Net(NetDecl),
    Typedef(TypedefDecl),
    Function(FunctionDecl),
    DpiExport(DpiExport),
    Instance(InstantiationDecl),
    Defparam(DefparamDecl),
    Bind(BindDirective),
    Import(ImportDecl),
    Genvar(GenvarDecl),
    GenerateIf(GenerateIf),
    GenerateFor(GenerateFor),
    GenerateBlock(GenerateBlock),
    ContinuousAssign(ContinuousAssign),
    Initial(InitialBlock),
}

/// Whether a definition is a module, interface, or program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
}

impl DefinitionKind {
    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Interface => "interface",
            Self::Program => "program",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub kind: DefinitionKind,
    pub name: SmolStr,
    pub name_range: TextRange,
    /// `#(parameter ...)` header entries.
    pub param_ports: Vec<ParamDecl>,
    pub ports: Vec<PortDecl>,
    pub body: Vec<Item>,
    pub timescale: Option<SmolStr>,
    pub default_nettype: Option<NetKind>,
}

impl ModuleDecl {
    pub fn module(name: &str, body: Vec<Item>) -> Self {
        Self {
            kind: DefinitionKind::Module,
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            param_ports: Vec::new(),
            ports: Vec::new(),
            body,
            timescale: None,
            default_nettype: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDecl {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub body: Vec<Item>,
}

/// `config ... design cell ... endconfig`. Only the design statement is
/// meaningful to elaboration; rule clauses are a driver concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDecl {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub design_cells: Vec<SmolStr>,
}

/// Generic class shell; specialization is not modeled.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: SmolStr,
    pub name_range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub is_local: bool,
    /// True for entries of a `#(...)` parameter port list.
    pub is_port: bool,
    pub ty: TypeSyntax,
    pub declarators: Vec<Declarator>,
}

impl ParamDecl {
    pub fn parameter(ty: TypeSyntax, name: &str, init: Expr) -> Self {
        Self {
            is_local: false,
            is_port: false,
            ty,
            declarators: vec![Declarator::new(name, Some(init))],
        }
    }

    pub fn localparam(ty: TypeSyntax, name: &str, init: Expr) -> Self {
        Self {
            is_local: true,
            is_port: false,
            ty,
            declarators: vec![Declarator::new(name, Some(init))],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub unpacked_dims: Vec<DimensionSyntax>,
    pub init: Option<Expr>,
}

impl Declarator {
    pub fn new(name: &str, init: Option<Expr>) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            unpacked_dims: Vec::new(),
            init,
        }
    }

    #[must_use]
    pub fn with_name_range(mut self, range: TextRange) -> Self {
        self.name_range = range;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: TypeSyntax,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetKind {
    Wire,
    Tri,
    Wand,
    Wor,
    Tri0,
    Tri1,
    Trireg,
    Supply0,
    Supply1,
    Uwire,
}

impl NetKind {
    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Wire => "wire",
            Self::Tri => "tri",
            Self::Wand => "wand",
            Self::Wor => "wor",
            Self::Tri0 => "tri0",
            Self::Tri1 => "tri1",
            Self::Trireg => "trireg",
            Self::Supply0 => "supply0",
            Self::Supply1 => "supply1",
            Self::Uwire => "uwire",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetDecl {
    pub net_kind: NetKind,
    pub ty: TypeSyntax,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedefDecl {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub ty: TypeSyntax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
    Ref,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub direction: PortDirection,
    pub ty: TypeSyntax,
    pub name: SmolStr,
    pub name_range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDirection {
    Input,
    Output,
    Inout,
    Ref,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub direction: ArgDirection,
    pub ty: TypeSyntax,
    pub default: Option<Expr>,
}

impl FunctionArg {
    pub fn input(name: &str, ty: TypeSyntax) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            direction: ArgDirection::Input,
            ty,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: SmolStr,
    pub name_range: TextRange,
    /// `None` means `void`.
    pub return_ty: Option<TypeSyntax>,
    pub args: Vec<FunctionArg>,
    pub body: Vec<Stmt>,
    /// `Some("DPI-C")` for imported DPI routines; such functions carry
    /// no body.
    pub dpi_import: Option<SmolStr>,
}

impl FunctionDecl {
    pub fn new(name: &str, return_ty: Option<TypeSyntax>, args: Vec<FunctionArg>, body: Vec<Stmt>) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            return_ty,
            args,
            body,
            dpi_import: None,
        }
    }
}

/// `export "DPI-C" function name;`
#[derive(Debug, Clone, PartialEq)]
pub struct DpiExport {
    pub spec: SmolStr,
    pub name: SmolStr,
    pub name_range: TextRange,
}

/// A parameter value assignment at an instantiation site; `name` is
/// `None` for ordered assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAssignment {
    pub name: Option<SmolStr>,
    pub value: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortConnection {
    pub name: Option<SmolStr>,
    pub expr: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSyntax {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub connections: Vec<PortConnection>,
}

impl InstanceSyntax {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            connections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstantiationDecl {
    pub module_name: SmolStr,
    pub module_name_range: TextRange,
    pub param_assignments: Vec<ParamAssignment>,
    pub instances: Vec<InstanceSyntax>,
}

impl InstantiationDecl {
    pub fn simple(module_name: &str, instance_name: &str) -> Self {
        Self {
            module_name: SmolStr::new(module_name),
            module_name_range: TextRange::default(),
            param_assignments: Vec::new(),
            instances: vec![InstanceSyntax::new(instance_name)],
        }
    }
}

/// `defparam path.to.param = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct DefparamDecl {
    pub path: Vec<SmolStr>,
    pub path_range: TextRange,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindTarget {
    /// Applies to every instance of the named definition.
    Definition(SmolStr),
    /// Applies to the instance at the given hierarchical path.
    Path(Vec<SmolStr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindDirective {
    pub target: BindTarget,
    pub instantiation: InstantiationDecl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportName {
    Explicit(SmolStr),
    Wildcard,
}

/// `import pkg::name;` or `import pkg::*;`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub package: SmolStr,
    pub name: ImportName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenvarDecl {
    pub names: Vec<(SmolStr, TextRange)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateBlock {
    pub name: Option<SmolStr>,
    pub items: Vec<Item>,
}

impl GenerateBlock {
    pub fn anonymous(items: Vec<Item>) -> Self {
        Self { name: None, items }
    }

    pub fn named(name: &str, items: Vec<Item>) -> Self {
        Self {
            name: Some(SmolStr::new(name)),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateIf {
    pub condition: Expr,
    pub then_block: GenerateBlock,
    pub else_block: Option<GenerateBlock>,
}

/// `for (genvar i = 0; i < N; i = i + 1) begin ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateFor {
    pub genvar: SmolStr,
    pub genvar_range: TextRange,
    pub init: Expr,
    pub condition: Expr,
    /// The step as an assignment expression over the genvar.
    pub step: Expr,
    pub body: GenerateBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousAssign {
    pub lhs: Expr,
    pub rhs: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialBlock {
    pub body: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_helper_defaults() {
        let m = ModuleDecl::module("top", Vec::new());
        assert_eq!(m.kind, DefinitionKind::Module);
        assert_eq!(m.name, "top");
        assert!(m.param_ports.is_empty());
    }

    #[test]
    fn simple_instantiation_has_one_instance() {
        let inst = InstantiationDecl::simple("leaf", "u0");
        assert_eq!(inst.instances.len(), 1);
        assert_eq!(inst.instances[0].name, "u0");
    }

    #[test]
    fn net_kind_keywords() {
        assert_eq!(NetKind::Wire.keyword_str(), "wire");
        assert_eq!(NetKind::Supply1.keyword_str(), "supply1");
    }
}
