use super::{Block, DocComment, Expr, Ident, Path, StrLit, Type};
use sable_interface::Span;
use strum::EnumIs;

/// A list of variable declarations.
pub type ParameterList = Vec<VariableDefinition>;

/// A top-level item in a source file, or a member of a contract.
#[derive(Clone, Debug)]
pub struct Item {
    pub docs: Option<DocComment>,
    pub span: Span,
    pub kind: ItemKind,
}

impl Item {
    /// Returns the name of the item, if any.
    pub fn name(&self) -> Option<&Ident> {
        self.kind.name()
    }

    /// Returns the description of the item.
    pub fn description(&self) -> &'static str {
        self.kind.description()
    }
}

/// The items of the supported language subset. `Function` also covers constructors, fallbacks
/// and modifiers.
#[derive(Clone, Debug)]
pub enum ItemKind {
    Pragma(PragmaDirective),
    Import(ImportDirective),
    Contract(ItemContract),
    Function(ItemFunction),
    Variable(VariableDefinition),
    Struct(ItemStruct),
    Enum(ItemEnum),
    Event(ItemEvent),
}

impl ItemKind {
    /// Returns the name of the item, if any.
    pub fn name(&self) -> Option<&Ident> {
        match self {
            Self::Pragma(_) | Self::Import(_) => None,
            Self::Contract(item) => Some(&item.name),
            Self::Function(item) => item.header.name.as_ref(),
            Self::Variable(item) => item.name.as_ref(),
            Self::Struct(item) => Some(&item.name),
            Self::Enum(item) => Some(&item.name),
            Self::Event(item) => Some(&item.name),
        }
    }

    /// Returns the description of the item.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pragma(_) => "pragma directive",
            Self::Import(_) => "import directive",
            Self::Contract(_) => "contract definition",
            Self::Function(_) => "function definition",
            Self::Variable(_) => "variable definition",
            Self::Struct(_) => "struct definition",
            Self::Enum(_) => "enum definition",
            Self::Event(_) => "event definition",
        }
    }
}

#[derive(Clone, Debug)]
pub enum PragmaDirective {
    /// `pragma solidity <req>;`, checked against the compiler version during analysis.
    Version(Ident, StrLit),
    Custom(Ident, Option<Ident>),
}

#[derive(Clone, Debug)]
pub struct ImportDirective {
    /// As written; resolved against the importing source later.
    pub path: StrLit,
    pub items: ImportItems,
}

impl ImportDirective {
    /// Whether every exported name of the target is brought into scope unqualified.
    pub fn imports_all(&self) -> bool {
        matches!(self.items, ImportItems::Glob(None) | ImportItems::Plain(None))
    }
}

/// The binding forms: `import "a.sol" [as A];`, `import {X as Y, Z} from "a.sol";` and
/// `import * [as A] from "a.sol";`.
#[derive(Clone, Debug)]
pub enum ImportItems {
    Plain(Option<Ident>),
    Aliases(Vec<(Ident, Option<Ident>)>),
    Glob(Option<Ident>),
}

#[derive(Clone, Debug)]
pub struct ItemContract {
    pub kind: ContractKind,
    pub name: Ident,
    /// Inheritance specifiers, in declaration order.
    pub bases: Vec<Modifier>,
    pub body: Vec<Item>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIs, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ContractKind {
    Contract,
    #[strum(serialize = "abstract contract")]
    AbstractContract,
    Interface,
    Library,
}

impl ContractKind {
    pub fn to_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug)]
pub struct ItemFunction {
    pub kind: FunctionKind,
    pub header: FunctionHeader,
    /// `None` for declarations without an implementation.
    pub body: Option<Block>,
}

#[derive(Clone, Debug, Default)]
pub struct FunctionHeader {
    /// Unset for constructors and fallbacks.
    pub name: Option<Ident>,
    pub parameters: ParameterList,
    pub visibility: Option<Visibility>,
    pub state_mutability: StateMutability,
    pub modifiers: Vec<Modifier>,
    pub virtual_: bool,
    pub returns: ParameterList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIs, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    Constructor,
    Function,
    Fallback,
    Modifier,
}

impl FunctionKind {
    pub fn to_str(self) -> &'static str {
        self.into()
    }
}

/// A modifier invocation or an inheritance specifier; both are a path with optional arguments.
#[derive(Clone, Debug)]
pub struct Modifier {
    pub name: Path,
    pub arguments: Vec<Expr>,
}

impl Modifier {
    pub fn span(&self) -> Span {
        self.name.span()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataLocation {
    Storage,
    Memory,
    Calldata,
}

impl DataLocation {
    pub fn to_str(self) -> &'static str {
        self.into()
    }
}

/// Ordered from the most restrictive mutability to the least.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIs,
    strum::IntoStaticStr,
    strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    /// No keyword.
    #[default]
    NonPayable,
    Payable,
}

impl StateMutability {
    pub fn to_str(self) -> &'static str {
        self.into()
    }
}

/// Ordered from the most restrictive visibility to the least.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::IntoStaticStr, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
    External,
}

impl Visibility {
    pub fn to_str(self) -> &'static str {
        self.into()
    }

    /// Whether the item is part of the contract's external interface.
    pub const fn is_external_facing(self) -> bool {
        matches!(self, Self::Public | Self::External)
    }
}

/// State variables, parameters, struct fields, event parameters and locals.
#[derive(Clone, Debug)]
pub struct VariableDefinition {
    pub span: Span,
    pub ty: Type,
    pub visibility: Option<Visibility>,
    pub mutability: Option<VarMut>,
    pub data_location: Option<DataLocation>,
    pub indexed: bool,
    pub name: Option<Ident>,
    pub initializer: Option<Box<Expr>>,
}

impl VariableDefinition {
    /// Creates a definition without attributes, spanning the type and the name.
    pub fn new(ty: Type, name: Option<Ident>) -> Self {
        let span = match &name {
            Some(name) => ty.span.to(name.span),
            None => ty.span,
        };
        Self {
            span,
            ty,
            visibility: None,
            mutability: None,
            data_location: None,
            indexed: false,
            name,
            initializer: None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.mutability == Some(VarMut::Constant)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum VarMut {
    Immutable,
    Constant,
}

#[derive(Clone, Debug)]
pub struct ItemStruct {
    pub name: Ident,
    pub fields: Vec<VariableDefinition>,
}

#[derive(Clone, Debug)]
pub struct ItemEnum {
    pub name: Ident,
    pub variants: Vec<Ident>,
}

#[derive(Clone, Debug)]
pub struct ItemEvent {
    pub name: Ident,
    pub parameters: ParameterList,
    pub anonymous: bool,
}
