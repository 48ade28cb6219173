//! Source locations, diagnostics, and import path resolution shared by every compiler stage.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, allow(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod diagnostics;
use diagnostics::ErrorGuaranteed;

pub mod import;
pub use import::{FileReader, FsReader, ImportError, ImportResolver};

mod span;
pub use span::{SourceId, Span};

pub use sable_config as config;
pub use sable_data_structures as data_structures;

/// Compiler result type.
pub type Result<T = (), E = ErrorGuaranteed> = std::result::Result<T, E>;

/// Pluralize a word based on a count.
#[macro_export]
#[rustfmt::skip]
macro_rules! pluralize {
    ($x:expr) => {
        if $x == 1 { "" } else { "s" }
    };
}
