//! Sable compiler configuration.
//!
//! Everything here is plain data: the driver and code generator read it, nothing in this crate
//! performs compilation.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, allow(unused_crate_dependencies))]

use serde::{Deserialize, Serialize};
use std::fmt;

#[macro_use]
mod macros;

mod utils;

pub mod version;

str_enum! {
    /// A version specifier of the EVM we want to compile to.
    ///
    /// Defaults to the latest version this compiler generates code for.
    #[derive(Default)]
    #[strum(serialize_all = "camelCase")]
    pub enum EvmVersion {
        // NOTE: Order matters.
        Homestead,
        TangerineWhistle,
        SpuriousDragon,
        Byzantium,
        Constantinople,
        Petersburg,
        Istanbul,
        Berlin,
        London,
        Paris,
        Shanghai,
        #[default]
        Cancun,
    }
}

impl EvmVersion {
    /// `shl`, `shr` and `sar` are available.
    pub fn has_bitwise_shifting(self) -> bool {
        self >= Self::Constantinople
    }
}

/// An import remapping: `[context:]prefix=target`.
///
/// Rewrites import paths starting with `prefix` to start with `target` instead, but only in
/// sources whose own path starts with `context`. An empty context applies everywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Remapping {
    #[serde(default)]
    pub context: String,
    pub prefix: String,
    pub target: String,
}

impl Remapping {
    /// Creates a new remapping.
    pub fn new(
        context: impl Into<String>,
        prefix: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self { context: context.into(), prefix: prefix.into(), target: target.into() }
    }
}

/// Error returned when parsing a [`Remapping`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemappingError {
    /// No `=` separating the prefix from the target.
    MissingEquals,
    /// The prefix is empty.
    EmptyPrefix,
}

impl fmt::Display for RemappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingEquals => "missing '='",
            Self::EmptyPrefix => "empty remapping prefix",
        })
    }
}

impl std::error::Error for RemappingError {}

impl std::str::FromStr for Remapping {
    type Err = RemappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lhs, target) = s.split_once('=').ok_or(RemappingError::MissingEquals)?;
        let (context, prefix) = lhs.split_once(':').unwrap_or(("", lhs));
        if prefix.is_empty() {
            return Err(RemappingError::EmptyPrefix);
        }
        Ok(Self::new(context, prefix, target))
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}:", self.context)?;
        }
        write!(f, "{}={}", self.prefix, self.target)
    }
}

/// Optimizer settings, recorded in the metadata and forwarded to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    #[serde(default)]
    pub enabled: bool,
    /// The number of expected contract runs to optimize for.
    #[serde(default = "OptimizerSettings::default_runs")]
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self { enabled: false, runs: Self::default_runs() }
    }
}

impl OptimizerSettings {
    const fn default_runs() -> u32 {
        200
    }
}

/// Settings of a single compilation.
///
/// Can be deserialized from the `settings` object of a standard JSON input:
///
/// ```
/// # use sable_config::{CompilerSettings, EvmVersion};
/// let settings: CompilerSettings = serde_json::from_str(
///     r#"{ "evmVersion": "byzantium", "optimizer": { "enabled": true }, "remappings": ["a/=b/"] }"#,
/// )
/// .unwrap();
/// assert_eq!(settings.evm_version, EvmVersion::Byzantium);
/// assert_eq!(settings.optimizer.runs, 200);
/// assert_eq!(settings.remappings[0].target, "b/");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSettings {
    #[serde(default)]
    pub evm_version: EvmVersion,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
    #[serde(default, with = "remappings_as_strings")]
    pub remappings: Vec<Remapping>,
}

/// Remappings are written as `[context:]prefix=target` strings in JSON.
mod remappings_as_strings {
    use super::Remapping;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(
        remappings: &[Remapping],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(remappings.iter().map(ToString::to_string))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Remapping>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| {
                s.parse().map_err(|e| D::Error::custom(format!("invalid remapping {s:?}: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn string_enum() {
        for value in EvmVersion::iter() {
            let s = value.to_str();
            assert_eq!(value.to_string(), s);
            assert_eq!(value, s.parse().unwrap());

            let json_s = format!("\"{value}\"");
            assert_eq!(serde_json::to_string(&value).unwrap(), json_s);
            assert_eq!(serde_json::from_str::<EvmVersion>(&json_s).unwrap(), value);
        }
        assert!(EvmVersion::variants().contains(&"tangerineWhistle"));
    }

    #[test]
    fn bitwise_shifting() {
        assert!(!EvmVersion::Byzantium.has_bitwise_shifting());
        assert!(EvmVersion::Constantinople.has_bitwise_shifting());
        assert!(EvmVersion::default().has_bitwise_shifting());
    }

    #[test]
    fn parse_remapping() {
        let r: Remapping = "a/=b/".parse().unwrap();
        assert_eq!(r, Remapping::new("", "a/", "b/"));
        assert_eq!(r.to_string(), "a/=b/");

        let r: Remapping = "ctx/:a/=b/".parse().unwrap();
        assert_eq!(r, Remapping::new("ctx/", "a/", "b/"));
        assert_eq!(r.to_string(), "ctx/:a/=b/");

        let r: Remapping = "a=".parse().unwrap();
        assert_eq!(r.target, "");

        assert_eq!("a/b".parse::<Remapping>(), Err(RemappingError::MissingEquals));
        assert_eq!("ctx:=b".parse::<Remapping>(), Err(RemappingError::EmptyPrefix));
    }

    #[test]
    fn settings_json() {
        let settings: CompilerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, CompilerSettings::default());

        let settings = CompilerSettings {
            evm_version: EvmVersion::Byzantium,
            optimizer: OptimizerSettings { enabled: true, runs: 1 },
            remappings: vec![Remapping::new("c", "a/", "b/")],
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(
            json,
            r#"{"evmVersion":"byzantium","optimizer":{"enabled":true,"runs":1},"remappings":["c:a/=b/"]}"#
        );

        let err = serde_json::from_str::<CompilerSettings>(r#"{"remappings":["nope"]}"#);
        assert!(err.unwrap_err().to_string().contains("invalid remapping"));
    }
}
