use sable_codegen::{AbiError, BackendError};

/// Errors returned by [`CompilerStack`](crate::CompilerStack) queries and by compilation.
///
/// Problems in the compiled sources are not errors: they are reported as diagnostics, see
/// [`CompilerStack::errors`](crate::CompilerStack::errors).
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// No contract has the given name, or an empty name was given and there is not exactly one
    /// contract.
    #[error("contract {0:?} not found")]
    ContractNotFound(String),
    /// The query needs the sources to be parsed and resolved without errors.
    #[error("parsing was not successful")]
    NotParsed,
    /// The query needs the sources to be compiled without errors.
    #[error("compilation was not successful")]
    NotCompiled,
    /// An ABI helper function could not be generated.
    #[error(transparent)]
    Abi(AbiError),
    #[error(transparent)]
    Backend(BackendError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AbiError> for StackError {
    fn from(err: AbiError) -> Self {
        Self::Abi(err)
    }
}

impl From<BackendError> for StackError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Abi(err) => Self::Abi(err),
            err => Self::Backend(err),
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {err}"))
    }
}
