//! High-level intermediate representation.
//!
//! The HIR is the owned, resolved view of every declaration the driver and the code generator need
//! after semantic analysis: contracts with their linearized bases and dependencies, functions,
//! variables with their resolved types, structs, enums and events. Function bodies are not lowered;
//! they stay in the AST.

use crate::{scope::ScopeId, ty::Ty};
use sable_ast::ast::{
    ContractKind, DataLocation, DocComment, FunctionKind, Ident, StateMutability, VarMut,
    Visibility,
};
use sable_data_structures::{index::IndexVec, map::FxIndexSet, newtype_index};
use sable_interface::{SourceId, Span};

newtype_index! {
    /// A [`Contract`] ID.
    pub struct ContractId;

    /// A [`Function`] ID.
    pub struct FunctionId;

    /// A [`Variable`] ID.
    pub struct VariableId;

    /// A [`Struct`] ID.
    pub struct StructId;

    /// An [`Enum`] ID.
    pub struct EnumId;

    /// An [`Event`] ID.
    pub struct EventId;
}

/// Every resolved declaration of a compilation.
#[derive(Debug, Default)]
pub struct Hir {
    pub contracts: IndexVec<ContractId, Contract>,
    pub functions: IndexVec<FunctionId, Function>,
    pub variables: IndexVec<VariableId, Variable>,
    pub structs: IndexVec<StructId, Struct>,
    pub enums: IndexVec<EnumId, Enum>,
    pub events: IndexVec<EventId, Event>,
}

impl Hir {
    /// Creates a new, empty HIR.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contract(&self, id: ContractId) -> &Contract {
        &self.contracts[id]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id]
    }

    #[inline]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    #[inline]
    pub fn strukt(&self, id: StructId) -> &Struct {
        &self.structs[id]
    }

    #[inline]
    pub fn enumm(&self, id: EnumId) -> &Enum {
        &self.enums[id]
    }

    #[inline]
    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id]
    }

    /// Returns an iterator over all the contract IDs, in declaration order.
    pub fn contract_ids(&self) -> impl ExactSizeIterator<Item = ContractId> + Clone + use<> {
        self.contracts.indices()
    }

    /// Returns the contracts declared in `source`, in declaration order.
    pub fn contracts_in(&self, source: SourceId) -> impl Iterator<Item = ContractId> + '_ {
        self.contracts.iter_enumerated().filter(move |(_, c)| c.source == source).map(|(id, _)| id)
    }

    /// Finds a contract by name. Returns the last one declared if the name is not unique.
    pub fn find_contract(&self, name: &str) -> Option<ContractId> {
        self.contracts
            .iter_enumerated()
            .rev()
            .find(|(_, c)| c.name.as_str() == name)
            .map(|(id, _)| id)
    }
}

/// A contract, abstract contract, interface, or library definition.
#[derive(Debug)]
pub struct Contract {
    /// The source this contract is defined in.
    pub source: SourceId,
    pub span: Span,
    pub name: Ident,
    pub kind: ContractKind,
    pub docs: Option<DocComment>,
    /// The scope holding the contract's members, and the members inherited from its bases.
    pub scope: ScopeId,
    /// The direct bases, as written in the `is` list.
    pub bases: Vec<ContractId>,
    /// The C3 linearization of the inheritance graph, starting with the contract itself.
    ///
    /// Empty if the linearization failed or has not been computed yet.
    pub linearized_bases: Vec<ContractId>,
    /// Functions, modifiers, constructor and fallback declared in the contract itself.
    pub functions: Vec<FunctionId>,
    /// State variables declared in the contract itself, in declaration order.
    pub variables: Vec<VariableId>,
    pub structs: Vec<StructId>,
    pub enums: Vec<EnumId>,
    pub events: Vec<EventId>,
    pub ctor: Option<FunctionId>,
    pub fallback: Option<FunctionId>,
    /// Contracts whose code must be available to compile this one: bases and `new` targets,
    /// including those of the bases.
    pub dependencies: FxIndexSet<ContractId>,
    /// Whether the contract can be deployed: it is not abstract nor an interface, and every
    /// function in its inheritance hierarchy is implemented.
    pub fully_implemented: bool,
}

impl Contract {
    /// Returns `true` if the contract is a library.
    #[inline]
    pub fn is_library(&self) -> bool {
        self.kind.is_library()
    }

    /// Returns `true` if the contract is an interface.
    #[inline]
    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }
}

/// A function, constructor, fallback, or modifier.
#[derive(Debug)]
pub struct Function {
    pub source: SourceId,
    /// The contract this function is defined in, if any.
    pub contract: Option<ContractId>,
    pub span: Span,
    /// Only `None` for constructors and fallbacks.
    pub name: Option<Ident>,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub state_mutability: StateMutability,
    pub virtual_: bool,
    pub docs: Option<DocComment>,
    pub scope: ScopeId,
    pub parameters: Vec<VariableId>,
    pub returns: Vec<VariableId>,
    /// Whether the function has a body.
    pub implemented: bool,
}

impl Function {
    /// Returns `true` if the function is part of the contract's external interface.
    pub fn is_part_of_external_interface(&self) -> bool {
        self.kind.is_function() && self.visibility.is_external_facing()
    }

    /// Returns the name of the function, or an empty string for constructors and fallbacks.
    pub fn name_str(&self) -> &str {
        self.name.as_ref().map_or("", Ident::as_str)
    }
}

/// The kind of a [`Variable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// A contract state variable, or a file-level constant.
    State,
    /// A struct field.
    StructField,
    /// A function or modifier parameter.
    FunctionParam,
    /// A named or unnamed function return value.
    FunctionReturn,
    /// An event parameter.
    EventParam,
}

/// A variable declaration.
#[derive(Debug)]
pub struct Variable {
    pub source: SourceId,
    pub contract: Option<ContractId>,
    pub span: Span,
    pub name: Option<Ident>,
    pub kind: VarKind,
    /// The resolved type, with its data location applied.
    ///
    /// `None` until the variable has been resolved, or if resolution failed.
    pub ty: Option<Ty>,
    pub data_location: Option<DataLocation>,
    pub visibility: Option<Visibility>,
    pub mutability: Option<VarMut>,
    pub indexed: bool,
}

impl Variable {
    /// Returns `true` if the variable is a state variable with a public getter.
    pub fn is_public_state_variable(&self) -> bool {
        self.kind == VarKind::State && self.visibility == Some(Visibility::Public)
    }

    /// Returns `true` if the variable is declared `constant`.
    pub fn is_constant(&self) -> bool {
        self.mutability == Some(VarMut::Constant)
    }

    /// Returns the name of the variable, or an empty string.
    pub fn name_str(&self) -> &str {
        self.name.as_ref().map_or("", Ident::as_str)
    }
}

/// A struct definition.
#[derive(Debug)]
pub struct Struct {
    pub source: SourceId,
    pub contract: Option<ContractId>,
    pub span: Span,
    pub name: Ident,
    pub scope: ScopeId,
    pub fields: Vec<VariableId>,
}

/// An enum definition.
#[derive(Debug)]
pub struct Enum {
    pub source: SourceId,
    pub contract: Option<ContractId>,
    pub span: Span,
    pub name: Ident,
    pub scope: ScopeId,
    pub variants: Vec<Ident>,
}

/// An event definition.
#[derive(Debug)]
pub struct Event {
    pub source: SourceId,
    pub contract: Option<ContractId>,
    pub span: Span,
    pub name: Ident,
    pub docs: Option<DocComment>,
    pub scope: ScopeId,
    pub parameters: Vec<VariableId>,
    pub anonymous: bool,
}
