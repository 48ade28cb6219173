//! The interface between the compiler driver and the assembler.

use crate::{AbiError, AbiFunctions, LinkerObject};
use sable_config::{EvmVersion, OptimizerSettings};
use sable_data_structures::map::{FxHashMap, FxIndexMap};
use sable_interface::Span;
use sable_sema::hir::{ContractId, FunctionId, Hir};

/// Generates the bytecode of a resolved contract.
///
/// Implemented for closures taking a [`BackendContext`].
pub trait Backend {
    /// Assembles the contract `ctx.contract`.
    ///
    /// Every contract the contract depends on has been assembled before and is available in
    /// `ctx.compiled`.
    fn assemble(&mut self, ctx: BackendContext<'_>) -> Result<AssembledObject, BackendError>;
}

impl<F> Backend for F
where
    F: FnMut(BackendContext<'_>) -> Result<AssembledObject, BackendError>,
{
    fn assemble(&mut self, ctx: BackendContext<'_>) -> Result<AssembledObject, BackendError> {
        self(ctx)
    }
}

/// Everything a [`Backend`] has access to while assembling a contract.
#[derive(Debug)]
pub struct BackendContext<'a> {
    pub hir: &'a Hir,
    pub contract: ContractId,
    /// The contracts assembled so far in this compilation.
    pub compiled: &'a FxIndexMap<ContractId, AssembledObject>,
    /// The pool of ABI helper functions, shared by all contracts of the compilation.
    pub abi: &'a mut AbiFunctions,
    pub evm_version: EvmVersion,
    pub optimizer: OptimizerSettings,
}

impl BackendContext<'_> {
    /// Returns the assembled object of a dependency.
    pub fn dependency(&self, id: ContractId) -> Result<&AssembledObject, BackendError> {
        self.compiled
            .get(&id)
            .ok_or_else(|| BackendError::MissingDependency(self.hir.contract(id).name.to_string()))
    }
}

/// How an instruction transfers control, as recorded in source maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum JumpType {
    #[default]
    #[display("-")]
    Ordinary,
    /// A jump into a function.
    #[display("i")]
    IntoFunction,
    /// A jump returning from a function.
    #[display("o")]
    OutOfFunction,
}

/// An assembled instruction, as seen by source maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblyItem {
    /// The source range the instruction was generated for.
    pub span: Option<Span>,
    pub jump: JumpType,
}

/// The output of a [`Backend`] for a single contract.
#[derive(Clone, Debug, Default)]
pub struct AssembledObject {
    /// The creation (deploy) bytecode.
    pub creation: LinkerObject,
    /// The bytecode of the deployed contract.
    pub runtime: LinkerObject,
    /// Bytecode of a contract delegating every call to the deployed one, if supported.
    pub clone: Option<LinkerObject>,
    pub creation_items: Vec<AssemblyItem>,
    pub runtime_items: Vec<AssemblyItem>,
    /// Runtime code offsets of function entry points.
    pub function_entries: FxHashMap<FunctionId, usize>,
}

impl AssembledObject {
    /// Returns the runtime code offset at which `function` starts.
    pub fn function_entry(&self, function: FunctionId) -> Option<usize> {
        self.function_entries.get(&function).copied()
    }
}

/// Errors returned by a [`Backend`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error("dependency `{0}` has not been compiled")]
    MissingDependency(String),
    #[error("{0}")]
    Custom(String),
}
