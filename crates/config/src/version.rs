//! Compiler version information.

/// The compiler version, as reported in metadata and checked against `pragma solidity`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parses [`VERSION`].
///
/// Falls back to `0.0.0` if the package version is not valid semver, which cargo rejects anyway.
pub fn version() -> semver::Version {
    semver::Version::parse(VERSION).unwrap_or_else(|_| semver::Version::new(0, 0, 0))
}

/// Returns `true` if this compiler is a pre-release build.
pub fn version_is_prerelease() -> bool {
    is_prerelease(&version())
}

/// Returns `true` if `version` carries a pre-release tag, e.g. `0.5.0-nightly.2024.1.1`.
pub fn is_prerelease(version: &semver::Version) -> bool {
    !version.pre.is_empty()
}
