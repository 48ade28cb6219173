use crate::StackError;
use sable_codegen::{AssembledObject, LinkerObject};
use sable_sema::hir::ContractId;
use std::cell::OnceCell;

/// The artifacts of a contract.
///
/// Records are created once analysis succeeds. Compilation fills in the bytecode; the JSON
/// outputs and source mappings are computed on first request and cached until the
/// [`CompilerStack`](crate::CompilerStack) is reset.
#[derive(Debug)]
pub struct Contract {
    pub(crate) id: ContractId,
    pub(crate) name: String,
    pub(crate) compiled: Option<CompiledContract>,
    pub(crate) interface: OnceCell<String>,
    pub(crate) userdoc: OnceCell<String>,
    pub(crate) devdoc: OnceCell<String>,
    pub(crate) metadata: OnceCell<String>,
    pub(crate) source_mapping: OnceCell<String>,
    pub(crate) runtime_source_mapping: OnceCell<String>,
}

impl Contract {
    pub(crate) fn new(id: ContractId, name: String) -> Self {
        Self {
            id,
            name,
            compiled: None,
            interface: OnceCell::new(),
            userdoc: OnceCell::new(),
            devdoc: OnceCell::new(),
            metadata: OnceCell::new(),
            source_mapping: OnceCell::new(),
            runtime_source_mapping: OnceCell::new(),
        }
    }

    /// Returns the ID of the contract in the HIR.
    pub fn id(&self) -> ContractId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the compiled artifacts, if the contract was compiled.
    pub fn compiled(&self) -> Option<&CompiledContract> {
        self.compiled.as_ref()
    }
}

/// The output of compiling a single contract.
///
/// Contracts that can't be deployed, such as interfaces and abstract contracts, have empty
/// objects.
#[derive(Clone, Debug, Default)]
pub struct CompiledContract {
    /// The linked creation bytecode.
    pub object: LinkerObject,
    /// The linked runtime bytecode.
    pub runtime_object: LinkerObject,
    /// The linked clone bytecode, if the backend produced one.
    pub clone_object: Option<LinkerObject>,
    /// The unlinked output of the backend.
    pub assembled: AssembledObject,
    /// The Yul code of the ABI helper functions requested while compiling the contract.
    pub abi_functions: String,
}

/// Returns the cached value, computing it first if needed.
pub(crate) fn cached(
    cell: &OnceCell<String>,
    init: impl FnOnce() -> Result<String, StackError>,
) -> Result<&str, StackError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}
