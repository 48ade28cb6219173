//! Contract metadata JSON.
//!
//! Fields are declared in lexicographic order, and maps are `BTreeMap`s, so the serialized
//! object has sorted keys.

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, hex, keccak256};
use sable_config::{CompilerSettings, EvmVersion, OptimizerSettings, version::VERSION};
use sable_data_structures::map::{FxHashSet, FxIndexMap};
use sable_interface::SourceId;
use sable_sema::Sources;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct Metadata<'a> {
    compiler: Compiler,
    language: &'static str,
    output: Output<'a>,
    settings: Settings<'a>,
    sources: BTreeMap<&'a str, SourceInfo>,
    version: u32,
}

#[derive(Serialize)]
struct Compiler {
    version: &'static str,
}

#[derive(Serialize)]
struct Output<'a> {
    abi: &'a JsonAbi,
    devdoc: &'a Value,
    userdoc: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Settings<'a> {
    compilation_target: BTreeMap<&'a str, &'a str>,
    evm_version: EvmVersion,
    libraries: BTreeMap<&'a str, String>,
    optimizer: OptimizerSettings,
    remappings: Vec<String>,
}

#[derive(Serialize)]
struct SourceInfo {
    keccak256: String,
}

/// The documentation and interface of the contract the metadata describes.
pub(crate) struct ContractOutputs<'a> {
    pub(crate) source: SourceId,
    pub(crate) name: &'a str,
    pub(crate) abi: &'a JsonAbi,
    pub(crate) userdoc: &'a Value,
    pub(crate) devdoc: &'a Value,
}

/// Serializes the metadata of a contract.
///
/// The metadata lists the hashes of the contract's source and of every source it imports,
/// directly or not.
pub(crate) fn metadata(
    contract: ContractOutputs<'_>,
    sources: &Sources,
    settings: &CompilerSettings,
    libraries: &FxIndexMap<String, Address>,
) -> serde_json::Result<String> {
    let mut hashes = BTreeMap::new();
    let mut stack = vec![contract.source];
    let mut seen = FxHashSet::default();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let source = sources.source(id);
        let hash = SourceInfo { keccak256: hex::encode_prefixed(keccak256(&source.text)) };
        hashes.insert(source.name.as_str(), hash);
        stack.extend(source.imports.iter().map(|&(_, import)| import));
    }

    let metadata = Metadata {
        compiler: Compiler { version: VERSION },
        language: "Solidity",
        output: Output { abi: contract.abi, devdoc: contract.devdoc, userdoc: contract.userdoc },
        settings: Settings {
            compilation_target: BTreeMap::from([(
                sources.source(contract.source).name.as_str(),
                contract.name,
            )]),
            evm_version: settings.evm_version,
            libraries: libraries
                .iter()
                .map(|(name, address)| (name.as_str(), hex::encode_prefixed(address)))
                .collect(),
            optimizer: settings.optimizer,
            remappings: settings.remappings.iter().map(ToString::to_string).collect(),
        },
        sources: hashes,
        version: 1,
    };
    serde_json::to_string(&metadata)
}
