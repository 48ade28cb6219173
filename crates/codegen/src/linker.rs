use alloy_primitives::{Address, hex};
use sable_data_structures::map::FxIndexMap;
use std::collections::BTreeMap;

const ADDRESS_LEN: usize = 20;

/// Bytecode together with the library addresses that still need to be filled in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkerObject {
    pub bytecode: Vec<u8>,
    /// Byte offsets of 20-byte address placeholders, and the library each one refers to.
    pub link_references: BTreeMap<usize, String>,
}

impl LinkerObject {
    /// Creates a fully linked object.
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self { bytecode, link_references: BTreeMap::new() }
    }

    /// Returns `true` if no library reference is left.
    pub fn is_linked(&self) -> bool {
        self.link_references.is_empty()
    }

    /// Appends `other`, shifting its references to their new offsets.
    pub fn append(&mut self, other: &Self) {
        let base = self.bytecode.len();
        self.bytecode.extend_from_slice(&other.bytecode);
        for (&offset, name) in &other.link_references {
            self.link_references.insert(base + offset, name.clone());
        }
    }

    /// Fills in the addresses of the known libraries.
    ///
    /// A reference matches a library by its full name (`source:Name`) or by the bare contract
    /// name. References to unknown libraries are kept.
    pub fn link(&mut self, libraries: &FxIndexMap<String, Address>) {
        let bytecode = &mut self.bytecode;
        self.link_references.retain(|&offset, name| {
            let name = name.as_str();
            let short = name.rsplit(':').next().unwrap_or(name);
            let Some(address) = libraries.get(name).or_else(|| libraries.get(short)) else {
                return true;
            };
            match bytecode.get_mut(offset..offset + ADDRESS_LEN) {
                Some(slot) => {
                    trace!(%name, offset, %address, "linked library");
                    slot.copy_from_slice(address.as_slice());
                    false
                }
                None => true,
            }
        });
    }

    /// Returns the bytecode as a hex string without prefix.
    ///
    /// Unresolved references are rendered as `__<name>__`, with the name cut or padded with `_`
    /// to 36 characters so that the placeholder spans exactly 20 bytes.
    pub fn to_hex(&self) -> String {
        let mut out = hex::encode(&self.bytecode);
        for (&offset, name) in &self.link_references {
            let start = offset * 2;
            let end = start + ADDRESS_LEN * 2;
            if out.len() < end {
                continue;
            }
            let name: String = name.chars().take(36).collect();
            out.replace_range(start..end, &format!("__{name:_<36}__"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn object() -> LinkerObject {
        let mut bytecode = vec![0x73];
        bytecode.extend([0; 20]);
        bytecode.push(0x73);
        bytecode.extend([0; 20]);
        bytecode.push(0x00);
        let link_references =
            BTreeMap::from([(1, "lib.sol:Math".to_string()), (22, "lib.sol:Strings".to_string())]);
        LinkerObject { bytecode, link_references }
    }

    #[test]
    fn placeholders() {
        let hex = object().to_hex();
        assert_eq!(hex.len(), 43 * 2);
        assert_eq!(&hex[..2], "73");
        assert_eq!(&hex[2..42], "__lib.sol:Math__________________________");
        assert_eq!(&hex[44..84], "__lib.sol:Strings_______________________");
        assert_eq!(&hex[84..], "00");
    }

    #[test]
    fn partial_link() {
        let mut obj = object();
        let math = address!("0x1111111111111111111111111111111111111111");
        let libraries = FxIndexMap::from_iter([("Math".to_string(), math)]);
        obj.link(&libraries);
        assert_eq!(&obj.bytecode[1..21], math.as_slice());
        assert_eq!(obj.link_references.len(), 1);
        assert!(!obj.is_linked());

        let strings = address!("0x2222222222222222222222222222222222222222");
        let libraries = FxIndexMap::from_iter([("lib.sol:Strings".to_string(), strings)]);
        obj.link(&libraries);
        assert!(obj.is_linked());
        assert_eq!(obj.to_hex(), hex::encode(&obj.bytecode));
    }

    #[test]
    fn append_shifts_references() {
        let mut obj = LinkerObject::new(vec![0x60, 0x00]);
        obj.append(&object());
        assert_eq!(obj.link_references.keys().copied().collect::<Vec<_>>(), [3, 24]);
    }
}
