//! Import path resolution.
//!
//! Source names are virtual paths: resolution is purely lexical and never touches the filesystem.
//! Loading the text of a missing source is delegated to a [`FileReader`].

use itertools::Itertools;
use normalize_path::NormalizePath;
use sable_config::Remapping;
use std::{
    borrow::Cow,
    path::{Component, Path},
};

mod reader;
pub use reader::{FileReader, FsReader, ImportError};

/// Resolves import paths against the importing source and a set of remappings.
#[derive(Clone, Debug, Default)]
pub struct ImportResolver {
    remappings: Vec<Remapping>,
}

impl ImportResolver {
    /// Creates a new resolver with the given remappings.
    pub fn new(remappings: Vec<Remapping>) -> Self {
        Self { remappings }
    }

    /// Returns the remappings.
    pub fn remappings(&self) -> &[Remapping] {
        &self.remappings
    }

    /// Replaces the remappings.
    pub fn set_remappings(&mut self, remappings: Vec<Remapping>) {
        self.remappings = remappings;
    }

    /// Resolves `path`, as written in an import directive of `importer`, to a source name.
    #[instrument(level = "trace", skip(self), ret)]
    pub fn resolve(&self, path: &str, importer: &str) -> String {
        let absolute = absolute_path(path, importer);
        self.remap(&absolute, importer).into_owned()
    }

    /// Applies the remapping with the longest matching context, then the longest matching prefix.
    ///
    /// `context` is the name of the importing source.
    pub fn remap<'a>(&self, path: &'a str, context: &str) -> Cow<'a, str> {
        let mut longest_prefix = 0;
        let mut longest_context = 0;
        let mut best_match = None;
        for Remapping { context: rule_context, prefix, target } in &self.remappings {
            if rule_context.len() < longest_context || !context.starts_with(rule_context.as_str())
            {
                continue;
            }
            if rule_context.len() == longest_context && prefix.len() < longest_prefix {
                continue;
            }
            if !path.starts_with(prefix.as_str()) {
                continue;
            }
            longest_context = rule_context.len();
            longest_prefix = prefix.len();
            best_match = Some(target);
        }
        match best_match {
            Some(target) => Cow::Owned(format!("{target}{}", &path[longest_prefix..])),
            None => Cow::Borrowed(path),
        }
    }
}

/// Resolves a relative import path (one starting with `.`) against the directory of `importer`.
///
/// `.` segments are dropped and `..` segments pop the preceding one. Any other path is returned
/// unchanged.
pub fn absolute_path(path: &str, importer: &str) -> String {
    if !path.starts_with('.') {
        return path.to_string();
    }
    let base = Path::new(importer).parent().unwrap_or(Path::new(""));
    base.join(path)
        .normalize()
        .components()
        .map(|component| match component {
            Component::RootDir => Cow::Borrowed(""),
            component => component.as_os_str().to_string_lossy(),
        })
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let resolver = ImportResolver::new(vec![
            Remapping::new("", "a/", "x/"),
            Remapping::new("", "a/b/", "y/"),
        ]);
        assert_eq!(resolver.remap("a/b/c", "main.sol"), "y/c");
        assert_eq!(resolver.remap("a/d", "main.sol"), "x/d");
        assert_eq!(resolver.remap("b/d", "main.sol"), "b/d");

        // Rule order does not matter.
        let resolver = ImportResolver::new(vec![
            Remapping::new("", "a/b/", "y/"),
            Remapping::new("", "a/", "x/"),
        ]);
        assert_eq!(resolver.remap("a/b/c", "main.sol"), "y/c");
        assert_eq!(resolver.remap("a/d", "main.sol"), "x/d");
    }

    #[test]
    fn longest_context_wins() {
        let resolver = ImportResolver::new(vec![
            Remapping::new("", "a/b/", "generic/"),
            Remapping::new("lib/", "a/", "scoped/"),
        ]);
        assert_eq!(resolver.remap("a/b/c", "lib/x.sol"), "scoped/b/c");
        assert_eq!(resolver.remap("a/b/c", "src/x.sol"), "generic/c");
        assert_eq!(resolver.remap("a/d", "src/x.sol"), "a/d");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(absolute_path("./b.sol", "a.sol"), "b.sol");
        assert_eq!(absolute_path("./b.sol", "dir/a.sol"), "dir/b.sol");
        assert_eq!(absolute_path("../b.sol", "dir/sub/a.sol"), "dir/b.sol");
        assert_eq!(absolute_path("./x/../y/./b.sol", "dir/a.sol"), "dir/y/b.sol");
        assert_eq!(absolute_path("../../b.sol", "a.sol"), "b.sol");
        assert_eq!(absolute_path("lib/b.sol", "dir/a.sol"), "lib/b.sol");
        assert_eq!(absolute_path("./b.sol", "/abs/a.sol"), "/abs/b.sol");
    }

    #[test]
    fn resolve_then_remap() {
        let resolver = ImportResolver::new(vec!["dir/=mapped/".parse().unwrap()]);
        assert_eq!(resolver.resolve("./b.sol", "dir/a.sol"), "mapped/b.sol");
        assert_eq!(resolver.resolve("other/b.sol", "dir/a.sol"), "other/b.sol");
    }
}
