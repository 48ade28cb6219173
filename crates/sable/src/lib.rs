//! The Sable compiler.
//!
//! [`CompilerStack`] drives a multi-file compilation: it resolves and fetches imports, orders the
//! sources, runs semantic analysis, hands every deployable contract to a [`Backend`] in dependency
//! order, and links the resulting bytecode. Artifacts are queried by contract name.
//!
//! The parser and the backend are collaborators supplied by the caller, see [`SourceParser`] and
//! [`Backend`].
//!
//! [`Backend`]: codegen::Backend
//! [`SourceParser`]: ast::SourceParser

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, allow(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

#[doc(inline)]
pub use sable_ast as ast;
#[doc(inline)]
pub use sable_codegen as codegen;
#[doc(inline)]
pub use sable_config as config;
#[doc(inline)]
pub use sable_data_structures as data_structures;
#[doc(inline)]
pub use sable_interface as interface;
#[doc(inline)]
pub use sable_sema as sema;

mod contract;
pub use contract::{CompiledContract, Contract};

mod error;
pub use error::StackError;

mod metadata;

mod stack;
pub use stack::{CompilerStack, StackState};
