//! Code generation support for the Sable compiler.
//!
//! - [`abi`]: synthesis of the Yul helper functions that clean, convert and ABI-encode values
//! - [`Backend`]: the interface of the assembler that turns a resolved contract into bytecode
//! - [`Assembly`]: a label-resolving assembler backends can build their objects with
//! - [`LinkerObject`]: bytecode with unresolved library references
//! - [`compute_source_mapping`]: compressed source maps of assembled items

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, allow(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub use sable_sema as sema;

pub mod abi;
pub use abi::{AbiError, AbiFunctions, EncodingOptions, GeneratedFunction};

mod assembly;
pub use assembly::{AssembledCode, Assembly, Label, opcodes};

mod backend;
pub use backend::{
    AssembledObject, AssemblyItem, Backend, BackendContext, BackendError, JumpType,
};

mod linker;
pub use linker::LinkerObject;

mod source_map;
pub use source_map::compute_source_mapping;
