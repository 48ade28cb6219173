//! Synthesis of Yul helper functions for ABI encoding.
//!
//! Every function is named deterministically after the types it operates on and is generated at
//! most once per [`AbiFunctions`] pool. Code generation for a contract references functions by
//! name only; the driver collects the bodies requested by each contract once it is assembled.
//!
//! Functions fall into three groups:
//! - value helpers: cleanup, conversion, shifts and rounding
//! - memory and storage helpers: array lengths and data areas, copies and storage reads
//! - encoders, built in [`encode`] on top of the other two

use alloy_primitives::U256;
use sable_ast::ast::DataLocation;
use sable_config::EvmVersion;
use sable_data_structures::map::{FxHashSet, FxIndexMap};
use sable_sema::ty::{FunctionTyKind, Ty, WORD_SIZE};

mod encode;

#[cfg(test)]
mod interp;
#[cfg(test)]
mod tests;

/// Encoders nested deeper than this are rejected.
const MAX_ENCODING_DEPTH: usize = 64;

/// Flags selecting a variant of an encoding function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EncodingOptions {
    /// Encode for a library call: storage references are passed as their slot.
    pub library: bool,
    /// External function references are given as a single combined word instead of an
    /// address and a selector.
    pub compacted: bool,
}

impl EncodingOptions {
    /// Options for encoding the arguments of a call.
    pub const fn new(library: bool) -> Self {
        Self { library, compacted: false }
    }

    fn suffix(self) -> String {
        let mut suffix = String::new();
        if self.compacted {
            suffix.push_str("_compacted");
        }
        if self.library {
            suffix.push_str("_library");
        }
        suffix
    }
}

/// Errors returned when a function can't be generated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// The request is valid, but the compiler can't generate code for it yet.
    #[error("not yet implemented: {0}")]
    Unimplemented(String),
    /// The request itself is invalid.
    #[error("internal error: {0}")]
    Internal(String),
}

pub(crate) type Result<T, E = AbiError> = std::result::Result<T, E>;

fn unimplemented<T>(msg: impl Into<String>) -> Result<T> {
    Err(AbiError::Unimplemented(msg.into()))
}

fn internal<T>(msg: impl Into<String>) -> Result<T> {
    Err(AbiError::Internal(msg.into()))
}

/// A generated function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFunction {
    /// The Yul definition of the function.
    pub body: String,
    /// The functions called by this one.
    pub helpers: Vec<String>,
}

/// The pool of generated functions of a compilation.
#[derive(Debug)]
pub struct AbiFunctions {
    evm_version: EvmVersion,
    functions: FxIndexMap<String, GeneratedFunction>,
    /// Functions requested since the last [`begin_unit`](Self::begin_unit), with their helpers.
    requested: FxHashSet<String>,
    /// The helpers called so far by each function under construction.
    generating: Vec<Vec<String>>,
    depth: usize,
}

impl AbiFunctions {
    /// Creates an empty pool generating code for `evm_version`.
    pub fn new(evm_version: EvmVersion) -> Self {
        Self {
            evm_version,
            functions: FxIndexMap::default(),
            requested: FxHashSet::default(),
            generating: Vec::new(),
            depth: 0,
        }
    }

    pub fn evm_version(&self) -> EvmVersion {
        self.evm_version
    }

    /// Returns the number of generated functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Returns the function named `name`, if it was generated.
    pub fn get(&self, name: &str) -> Option<&GeneratedFunction> {
        self.functions.get(name)
    }

    /// Removes every function.
    pub fn clear(&mut self) {
        self.functions.clear();
        self.requested.clear();
    }

    /// Starts a new compilation unit: no function is requested by it yet.
    pub fn begin_unit(&mut self) {
        self.requested.clear();
    }

    /// Returns the functions requested since the last [`begin_unit`](Self::begin_unit),
    /// including the helpers they call, sorted by name.
    pub fn requested_functions(&self) -> Vec<(&str, &GeneratedFunction)> {
        let mut functions: Vec<_> = self
            .functions
            .iter()
            .filter(|(name, _)| self.requested.contains(name.as_str()))
            .map(|(name, f)| (name.as_str(), f))
            .collect();
        functions.sort_unstable_by_key(|&(name, _)| name);
        functions
    }

    /// Returns the Yul code of all [requested functions](Self::requested_functions).
    pub fn requested_code(&self) -> String {
        self.requested_functions().into_iter().map(|(_, f)| f.body.as_str()).collect()
    }

    /// Returns `name`, generating its body with `generate` unless it already exists.
    ///
    /// Either way, the function and its helpers are marked as requested by the current unit.
    pub fn create_function(
        &mut self,
        name: String,
        generate: impl FnOnce(&mut Self) -> Result<String>,
    ) -> Result<String> {
        if let Some(caller) = self.generating.last_mut()
            && !caller.contains(&name)
        {
            caller.push(name.clone());
        }
        if !self.functions.contains_key(&name) {
            trace!(%name, "generating function");
            self.generating.push(Vec::new());
            let body = generate(self);
            let helpers = self.generating.pop().unwrap_or_default();
            self.functions.insert(name.clone(), GeneratedFunction { body: body?, helpers });
        }
        self.mark_requested(&name);
        Ok(name)
    }

    fn mark_requested(&mut self, name: &str) {
        let mut stack = vec![name.to_string()];
        while let Some(name) = stack.pop() {
            if let Some(f) = self.functions.get(&name)
                && self.requested.insert(name)
            {
                stack.extend(f.helpers.iter().cloned());
            }
        }
    }

    /// Runs `f` one encoding level deeper, failing beyond [`MAX_ENCODING_DEPTH`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_ENCODING_DEPTH {
            return internal(format!("encoders nested deeper than {MAX_ENCODING_DEPTH} levels"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Returns a function `(value) -> cleaned` that brings a value of `ty` into its canonical
    /// representation.
    ///
    /// Out-of-range enum values revert if `revert_on_failure` is set, and hit an invalid
    /// instruction otherwise.
    pub fn cleanup_function(&mut self, ty: &Ty, revert_on_failure: bool) -> Result<String> {
        let policy = if revert_on_failure { "revert" } else { "assert" };
        let name = format!("cleanup_{policy}_{}", ty.identifier());
        self.create_function(name.clone(), |this| {
            let cleaned = match ty {
                Ty::Integer { bits: 256, .. } | Ty::FixedBytes(32) => "value".to_string(),
                Ty::Integer { bits, signed: false } => {
                    format!("and(value, {})", hex(low_mask(u32::from(*bits))))
                }
                Ty::Integer { bits, signed: true } => {
                    format!("signextend({}, value)", bits / 8 - 1)
                }
                Ty::Bool => "iszero(iszero(value))".to_string(),
                Ty::FixedBytes(n) => format!("and(value, {})", hex(high_mask(u32::from(*n) * 8))),
                Ty::Address | Ty::Contract { .. } => {
                    format!("{}(value)", this.cleanup_function(&Ty::uint(160), revert_on_failure)?)
                }
                Ty::Function(f) => {
                    let repr = match f.kind {
                        FunctionTyKind::External => Ty::FixedBytes(24),
                        FunctionTyKind::Internal => Ty::uint(64),
                    };
                    format!("{}(value)", this.cleanup_function(&repr, revert_on_failure)?)
                }
                Ty::Enum { members, .. } => {
                    let fail = if revert_on_failure { "revert(0, 0)" } else { "invalid()" };
                    let mut w = Writer::default();
                    w.open(format!("function {name}(value) -> cleaned"));
                    w.line(format!("if iszero(lt(value, {members})) {{ {fail} }}"));
                    w.line("cleaned := value");
                    w.close();
                    return Ok(w.finish());
                }
                Ty::FixedPoint { .. } => return unimplemented("fixed point types"),
                _ => return internal(format!("cleanup of `{ty}` requested")),
            };
            Ok(one_liner(&name, "value", "cleaned", &cleaned))
        })
    }

    /// Returns a function `(value) -> converted` converting a value of `from` to `to`, after
    /// cleaning it up.
    pub fn conversion_function(&mut self, from: &Ty, to: &Ty) -> Result<String> {
        if from.size_on_stack() != 1 || to.size_on_stack() != 1 {
            return unimplemented(format!("conversion from `{from}` to `{to}`"));
        }
        let name = format!("convert_{}_to_{}", from.identifier(), to.identifier());
        self.create_function(name.clone(), |this| {
            let converted = if from == to {
                format!("{}(value)", this.cleanup_function(from, false)?)
            } else {
                this.conversion_expr(from, to)?
            };
            Ok(one_liner(&name, "value", "converted", &converted))
        })
    }

    fn conversion_expr(&mut self, from: &Ty, to: &Ty) -> Result<String> {
        let invalid = || internal(format!("invalid conversion from `{from}` to `{to}`"));
        if matches!(from, Ty::FixedPoint { .. }) || matches!(to, Ty::FixedPoint { .. }) {
            return unimplemented("fixed point types");
        }
        if matches!(from, Ty::Array(_) | Ty::Struct(_) | Ty::Tuple(_) | Ty::Mapping(..)) {
            return unimplemented(format!("conversion from `{from}` to `{to}`"));
        }
        let numeric = |ty: &Ty| {
            matches!(ty, Ty::Integer { .. } | Ty::Address | Ty::Contract { .. } | Ty::Enum { .. })
        };
        Ok(match (from, to) {
            (Ty::Rational(_), Ty::Integer { .. } | Ty::Address | Ty::Contract { .. }) => {
                format!("{}(value)", self.cleanup_function(to, false)?)
            }
            (Ty::Rational(_), Ty::Enum { .. }) => {
                format!("{}(value)", self.cleanup_function(to, true)?)
            }
            (_, Ty::Enum { .. }) if numeric(from) => {
                let clean = self.cleanup_function(from, false)?;
                format!("{}({clean}(value))", self.cleanup_function(to, true)?)
            }
            (_, Ty::Integer { .. } | Ty::Address | Ty::Contract { .. }) if numeric(from) => {
                let clean = self.cleanup_function(from, false)?;
                format!("{}({clean}(value))", self.cleanup_function(to, false)?)
            }
            (Ty::Integer { bits, signed: false }, Ty::FixedBytes(n))
                if u32::from(*bits) == u32::from(*n) * 8 =>
            {
                let clean = self.cleanup_function(from, false)?;
                let shift = self.shift_left_function(256 - u32::from(*bits))?;
                format!("{shift}({clean}(value))")
            }
            (Ty::FixedBytes(_), Ty::FixedBytes(_)) => {
                let clean = self.cleanup_function(from, false)?;
                format!("{}({clean}(value))", self.cleanup_function(to, false)?)
            }
            (Ty::FixedBytes(n), Ty::Integer { .. } | Ty::Address)
                if to.storage_bytes() == u64::from(*n) =>
            {
                let shift = self.shift_right_function(256 - u32::from(*n) * 8, false)?;
                format!("{}({shift}(value))", self.cleanup_function(to, false)?)
            }
            (Ty::Function(a), Ty::Function(b)) if a.kind == b.kind => {
                format!("{}(value)", self.cleanup_function(to, false)?)
            }
            _ => return invalid(),
        })
    }

    /// Returns a function `(value) -> newValue` shifting left by `bits`.
    pub fn shift_left_function(&mut self, bits: u32) -> Result<String> {
        if bits >= 256 {
            return internal(format!("shift by {bits} bits"));
        }
        let name = format!("shift_left_{bits}");
        let expr = if self.evm_version.has_bitwise_shifting() {
            format!("shl({bits}, value)")
        } else {
            format!("mul(value, {})", hex(U256::from(1) << bits as usize))
        };
        self.create_function(name.clone(), |_| Ok(one_liner(&name, "value", "newValue", &expr)))
    }

    /// Returns a function `(value) -> newValue` shifting right by `bits`, arithmetically if
    /// `signed`.
    pub fn shift_right_function(&mut self, bits: u32, signed: bool) -> Result<String> {
        if bits >= 256 {
            return internal(format!("shift by {bits} bits"));
        }
        let sign = if signed { "signed" } else { "unsigned" };
        let name = format!("shift_right_{bits}_{sign}");
        let expr = match (self.evm_version.has_bitwise_shifting(), signed) {
            (true, false) => format!("shr({bits}, value)"),
            (true, true) => format!("sar({bits}, value)"),
            (false, false) => format!("div(value, {})", hex(U256::from(1) << bits as usize)),
            (false, true) => format!("sdiv(value, {})", hex(U256::from(1) << bits as usize)),
        };
        self.create_function(name.clone(), |_| Ok(one_liner(&name, "value", "newValue", &expr)))
    }

    /// Returns a function `(value) -> result` rounding up to a multiple of 32.
    pub fn round_up_function(&mut self) -> Result<String> {
        let name = "round_up_to_mul_of_32".to_string();
        self.create_function(name.clone(), |_| {
            Ok(one_liner(&name, "value", "result", "and(add(value, 31), not(31))"))
        })
    }

    /// Returns a function `(src, dst, length)` copying `length` bytes from calldata or memory
    /// to memory.
    ///
    /// Both zero the bytes following the copied ones up to the next word boundary.
    pub fn copy_to_memory_function(&mut self, from_calldata: bool) -> Result<String> {
        let source = if from_calldata { "calldata" } else { "memory" };
        let name = format!("copy_{source}_to_memory");
        self.create_function(name.clone(), |_| {
            let mut w = Writer::default();
            w.open(format!("function {name}(src, dst, length)"));
            if from_calldata {
                w.line("calldatacopy(dst, src, length)");
                w.line("mstore(add(dst, length), 0)");
            } else {
                w.line("let i := 0");
                w.open("for { } lt(i, length) { i := add(i, 32) }");
                w.line("mstore(add(dst, i), mload(add(src, i)))");
                w.close();
                w.line("if gt(i, length) { mstore(add(dst, length), 0) }");
            }
            w.close();
            Ok(w.finish())
        })
    }

    /// Returns a function `(value) -> length` returning the length of an array.
    pub fn array_length_function(&mut self, ty: &Ty) -> Result<String> {
        let Some(array) = ty.as_array() else {
            return internal(format!("array length of `{ty}` requested"));
        };
        let name = format!("array_length_{}", ty.identifier());
        self.create_function(name.clone(), |_| {
            let mut w = Writer::default();
            w.open(format!("function {name}(value) -> length"));
            match (array.length, array.location) {
                (Some(length), _) => w.line(format!("length := {}", hex(U256::from(length)))),
                (None, DataLocation::Memory) => w.line("length := mload(value)"),
                (None, DataLocation::Storage) if array.is_byte_array() => {
                    // Long arrays store `2 * length + 1` in the whole slot, short ones
                    // `2 * length` in the lowest byte.
                    w.line("length := sload(value)");
                    w.line("switch and(length, 1)");
                    w.line("case 0 { length := div(and(length, 0xff), 2) }");
                    w.line("default { length := div(length, 2) }");
                }
                (None, DataLocation::Storage) => w.line("length := sload(value)"),
                (None, DataLocation::Calldata) => {
                    return internal("the length of calldata arrays is passed on the stack");
                }
            }
            w.close();
            Ok(w.finish())
        })
    }

    /// Returns a function `(ptr) -> data` returning the start of an array's elements.
    pub fn array_data_area_function(&mut self, ty: &Ty) -> Result<String> {
        let Some(array) = ty.as_array() else {
            return internal(format!("data area of `{ty}` requested"));
        };
        let name = format!("array_dataslot_{}", ty.identifier());
        self.create_function(name.clone(), |_| {
            let mut w = Writer::default();
            w.open(format!("function {name}(ptr) -> data"));
            match (array.location, array.is_dynamically_sized()) {
                (DataLocation::Memory, true) => w.line("data := add(ptr, 0x20)"),
                (DataLocation::Storage, true) => {
                    w.line("mstore(0, ptr)");
                    w.line("data := keccak256(0, 0x20)");
                }
                _ => w.line("data := ptr"),
            }
            w.close();
            Ok(w.finish())
        })
    }

    /// Returns a function `(ptr) -> next` advancing a pointer to the next element of an array.
    pub fn next_array_element_function(&mut self, ty: &Ty) -> Result<String> {
        let Some(array) = ty.as_array() else {
            return internal(format!("array iteration over `{ty}` requested"));
        };
        let step = match array.location {
            DataLocation::Memory => WORD_SIZE,
            DataLocation::Storage if array.is_byte_array() || array.base.is_packable() => {
                return internal(format!("packed storage array `{ty}` is iterated by slot"));
            }
            DataLocation::Storage => array.base.storage_size(),
            DataLocation::Calldata => match array.base.calldata_encoded_size() {
                Some(size) if !array.is_byte_array() => size,
                _ => return unimplemented(format!("iteration over `{ty}`")),
            },
        };
        let name = format!("array_nextElement_{}", ty.identifier());
        let expr = format!("add(ptr, {})", hex(U256::from(step)));
        self.create_function(name.clone(), |_| Ok(one_liner(&name, "ptr", "next", &expr)))
    }

    /// Returns a function `(slot) -> value` reading a value of `ty` stored at byte `offset` of
    /// `slot`.
    pub fn read_from_storage(&mut self, ty: &Ty, offset: u64) -> Result<String> {
        let name = format!("read_from_storage_offset_{offset}_{}", ty.identifier());
        self.create_function(name.clone(), |this| {
            let extract = this.extract_from_storage_value(ty, offset)?;
            Ok(one_liner(&name, "slot", "value", &format!("{extract}(sload(slot))")))
        })
    }

    /// Returns a function `(slot_value) -> value` extracting a value of `ty` stored at byte
    /// `offset` of a slot's value.
    pub fn extract_from_storage_value(&mut self, ty: &Ty, offset: u64) -> Result<String> {
        if offset + ty.storage_bytes() > WORD_SIZE {
            return internal(format!("`{ty}` at offset {offset} does not fit in a slot"));
        }
        let name = format!("extract_from_storage_value_offset_{offset}_{}", ty.identifier());
        self.create_function(name.clone(), |this| {
            let cleanup = this.cleanup_from_storage_function(ty)?;
            let value = if offset == 0 {
                format!("{cleanup}(slot_value)")
            } else {
                let shift = this.shift_right_function(offset as u32 * 8, false)?;
                format!("{cleanup}({shift}(slot_value))")
            };
            Ok(one_liner(&name, "slot_value", "value", &value))
        })
    }

    /// Returns a function `(value) -> cleaned` turning the right-aligned storage representation
    /// of a value into its stack representation.
    pub fn cleanup_from_storage_function(&mut self, ty: &Ty) -> Result<String> {
        if !ty.is_value_type() {
            return internal(format!("`{ty}` is not stored in a single slot value"));
        }
        let name = format!("cleanup_from_storage_{}", ty.identifier());
        self.create_function(name.clone(), |this| {
            let bytes = ty.storage_bytes();
            let left_aligned = matches!(ty, Ty::FixedBytes(_))
                || matches!(ty, Ty::Function(f) if f.kind == FunctionTyKind::External);
            let cleaned = if bytes == WORD_SIZE {
                "value".to_string()
            } else if left_aligned {
                let shift = this.shift_left_function(256 - bytes as u32 * 8)?;
                format!("{shift}(value)")
            } else if matches!(ty, Ty::Integer { signed: true, .. }) {
                format!("signextend({}, value)", bytes - 1)
            } else {
                format!("and(value, {})", hex(low_mask(bytes as u32 * 8)))
            };
            Ok(one_liner(&name, "value", "cleaned", &cleaned))
        })
    }

    /// Returns a function `(addr, selector) -> combined` packing an external function reference
    /// into a left-aligned 24-byte word.
    pub fn combine_external_function_id_function(&mut self) -> Result<String> {
        let name = "combine_external_function_id".to_string();
        self.create_function(name.clone(), |this| {
            let shl32 = this.shift_left_function(32)?;
            let shl64 = this.shift_left_function(64)?;
            let mut w = Writer::default();
            w.open(format!("function {name}(addr, selector) -> combined"));
            w.line(format!("combined := {shl64}(or({shl32}(addr), and(selector, 0xffffffff)))"));
            w.close();
            Ok(w.finish())
        })
    }

    /// Returns a function `(addr_and_selector) -> cleaned` cleaning up a combined external
    /// function reference.
    pub fn cleanup_combined_external_function_id_function(&mut self) -> Result<String> {
        let name = "cleanup_combined_external_function_id".to_string();
        self.create_function(name.clone(), |this| {
            let cleanup = this.cleanup_function(&Ty::FixedBytes(24), false)?;
            let cleaned = format!("{cleanup}(addr_and_selector)");
            Ok(one_liner(&name, "addr_and_selector", "cleaned", &cleaned))
        })
    }
}

/// Builds indented Yul source.
#[derive(Default)]
struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn line(&mut self, line: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    /// Writes `header {` and indents the following lines.
    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// `function name(param) -> ret { ret := expr }`
fn one_liner(name: &str, param: &str, ret: &str, expr: &str) -> String {
    let mut w = Writer::default();
    w.open(format!("function {name}({param}) -> {ret}"));
    w.line(format!("{ret} := {expr}"));
    w.close();
    w.finish()
}

/// The lowest `bits` bits set.
fn low_mask(bits: u32) -> U256 {
    if bits >= 256 { U256::MAX } else { (U256::from(1) << bits as usize) - U256::from(1) }
}

/// The highest `bits` bits set.
fn high_mask(bits: u32) -> U256 {
    !low_mask(256 - bits.min(256))
}

fn hex(value: U256) -> String {
    format!("{value:#x}")
}
