//! Syntax tree definitions.
//!
//! The tree is produced by a [`SourceParser`] and consumed read-only by semantic analysis.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod ast;
pub mod build;
pub mod visit;

mod parser;
pub use parser::SourceParser;
