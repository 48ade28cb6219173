//! ABI encoders.
//!
//! An encoder writes a value at a memory position `pos`. Encoders of dynamically encoded types
//! return the position following the written data as `end`; the size of all other encodings is
//! known statically and they return nothing.

use super::{AbiFunctions, EncodingOptions, Result, Writer, hex, internal, unimplemented};
use alloy_primitives::U256;
use sable_ast::ast::DataLocation;
use sable_sema::ty::{ArrayTy, FunctionTyKind, Ty, WORD_SIZE};

/// `mstore(pos, length)` followed by skipping the length word.
fn store_length(w: &mut Writer) {
    w.line("mstore(pos, length)");
    w.line("pos := add(pos, 0x20)");
}

fn returns_end(to: &Ty) -> &'static str {
    if to.is_dynamically_encoded() { " -> end" } else { "" }
}

/// Returns the size of the head of a value of `ty` in an enclosing tuple or array.
fn head_size(ty: &Ty) -> Result<u64> {
    if ty.is_dynamically_encoded() {
        return Ok(WORD_SIZE);
    }
    match ty.calldata_encoded_size() {
        Some(size) => Ok(size),
        None => internal(format!("`{ty}` has no static encoding")),
    }
}

fn encoding_type(ty: &Ty, library: bool) -> Result<Ty> {
    match ty.full_encoding_type(library) {
        Some(ty) => Ok(ty),
        None => internal(format!("`{ty}` can't be ABI-encoded")),
    }
}

impl AbiFunctions {
    /// Returns a function `(headStart, value0, ...) -> tail` encoding values of `given` types as
    /// a tuple of `targets` types.
    ///
    /// Each value takes as many parameters as stack slots. The head of every element is written
    /// at its fixed offset from `headStart`; dynamic elements are appended to the tail and their
    /// head holds the tail offset relative to `headStart`.
    #[instrument(level = "debug", skip_all)]
    pub fn tuple_encoder(
        &mut self,
        given: &[Ty],
        targets: &[Ty],
        encode_as_library: bool,
    ) -> Result<String> {
        if given.len() != targets.len() {
            return internal(format!(
                "encoding {} values as a tuple of {} types",
                given.len(),
                targets.len()
            ));
        }
        let mut name = String::from("abi_encode_tuple_");
        for ty in given {
            name.push_str(&ty.identifier());
            name.push('_');
        }
        name.push_str("_to_");
        for ty in targets {
            name.push_str(&ty.identifier());
            name.push('_');
        }
        if encode_as_library {
            name.push_str("_library");
        }

        self.create_function(name.clone(), |this| {
            let encoded = targets
                .iter()
                .map(|ty| encoding_type(ty, encode_as_library))
                .collect::<Result<Vec<_>>>()?;
            let heads = encoded.iter().map(head_size).collect::<Result<Vec<_>>>()?;
            let total: u64 = heads.iter().sum();

            let mut params = vec!["headStart".to_string()];
            let mut body = Writer::default();
            body.indent = 1;
            body.line(format!("tail := add(headStart, {})", hex(U256::from(total))));
            let mut head = 0u64;
            for (i, (from, to)) in given.iter().zip(targets).enumerate() {
                let options = EncodingOptions::new(encode_as_library);
                let encoder = this.abi_encoding_function(from, to, options)?;
                let first = params.len();
                params.extend((0..from.size_on_stack()).map(|k| format!("value{}", first - 1 + k)));
                let values: String =
                    params[first..].iter().map(|value| format!("{value}, ")).collect();
                let head_pos = format!("add(headStart, {})", hex(U256::from(head)));
                if encoded[i].is_dynamically_encoded() {
                    body.line(format!("mstore({head_pos}, sub(tail, headStart))"));
                    body.line(format!("tail := {encoder}({values}tail)"));
                } else {
                    body.line(format!("{encoder}({values}{head_pos})"));
                }
                head += heads[i];
            }

            let mut w = Writer::default();
            w.open(format!("function {name}({}) -> tail", params.join(", ")));
            w.out.push_str(&body.finish());
            w.close();
            Ok(w.finish())
        })
    }

    /// Returns a function encoding a value of `from` as `to` at `pos`.
    ///
    /// The parameters are the stack slots of the value followed by `pos`. Which of the
    /// specialized encoders is used depends on the category and data location of `from`.
    pub fn abi_encoding_function(
        &mut self,
        from: &Ty,
        to: &Ty,
        options: EncodingOptions,
    ) -> Result<String> {
        self.nested(|this| {
            let to = encoding_type(to, options.library)?;
            // Only external function references have a compacted representation.
            let options = EncodingOptions {
                compacted: options.compacted
                    && matches!(from, Ty::Function(f) if f.kind == FunctionTyKind::External),
                ..options
            };
            let name = format!(
                "abi_encode_{}_to_{}{}",
                from.identifier(),
                to.identifier(),
                options.suffix()
            );

            if options.library && from.is_in(DataLocation::Storage) {
                return this.create_function(name.clone(), |_| {
                    let mut w = Writer::default();
                    w.open(format!("function {name}(value, pos)"));
                    w.line("mstore(pos, value)");
                    w.close();
                    Ok(w.finish())
                });
            }
            match from {
                Ty::StringLiteral(value) => this.encode_string_literal(name, value, &to),
                Ty::Array(array) => {
                    let Ty::Array(to_array) = &to else {
                        return internal(format!("encoding `{from}` as `{to}`"));
                    };
                    match array.location {
                        DataLocation::Calldata => this.encode_calldata_array(name, array, &to),
                        DataLocation::Memory if array.is_byte_array() => {
                            this.encode_memory_byte_array(name, from)
                        }
                        DataLocation::Storage if array.is_byte_array() => {
                            this.encode_storage_byte_array(name, from)
                        }
                        DataLocation::Storage if array.base.is_packable() => {
                            this.encode_packed_storage_array(name, from, &to, to_array, options)
                        }
                        _ => this.encode_array(name, from, &to, to_array, options),
                    }
                }
                Ty::Struct(_) => unimplemented("encoding of structs"),
                Ty::Function(f) if f.kind == FunctionTyKind::External => {
                    this.encode_external_function(name, options.compacted)
                }
                _ => this.encode_value(name, from, &to),
            }
        })
    }

    fn encode_value(&mut self, name: String, from: &Ty, to: &Ty) -> Result<String> {
        self.create_function(name.clone(), |this| {
            let convert = if from == to {
                this.cleanup_function(from, false)?
            } else {
                this.conversion_function(from, to)?
            };
            let mut w = Writer::default();
            w.open(format!("function {name}(value, pos)"));
            w.line(format!("mstore(pos, {convert}(value))"));
            w.close();
            Ok(w.finish())
        })
    }

    /// String literals are written word by word; no copy loop is needed.
    fn encode_string_literal(&mut self, name: String, value: &[u8], to: &Ty) -> Result<String> {
        let fits = match to {
            Ty::Array(array) if array.is_dynamically_sized() => true,
            Ty::FixedBytes(n) => value.len() <= usize::from(*n),
            _ => false,
        };
        if !fits {
            return internal(format!(
                "string literal of {} bytes can't be encoded as `{to}`",
                value.len()
            ));
        }
        self.create_function(name.clone(), |_| {
            let mut w = Writer::default();
            if to.is_dynamically_sized() {
                w.open(format!("function {name}(pos) -> end"));
                w.line(format!("mstore(pos, {})", hex(U256::from(value.len()))));
                for (i, chunk) in value.chunks(32).enumerate() {
                    let offset = U256::from((i + 1) * 32);
                    w.line(format!("mstore(add(pos, {}), {})", hex(offset), word(chunk)));
                }
                let size = 32 + value.len().div_ceil(32) * 32;
                w.line(format!("end := add(pos, {})", hex(U256::from(size))));
            } else {
                w.open(format!("function {name}(pos)"));
                w.line(format!("mstore(pos, {})", word(value)));
            }
            w.close();
            Ok(w.finish())
        })
    }

    fn encode_external_function(&mut self, name: String, compacted: bool) -> Result<String> {
        self.create_function(name.clone(), |this| {
            let mut w = Writer::default();
            if compacted {
                let cleanup = this.cleanup_combined_external_function_id_function()?;
                w.open(format!("function {name}(addr_and_function_id, pos)"));
                w.line(format!("mstore(pos, {cleanup}(addr_and_function_id))"));
            } else {
                let combine = this.combine_external_function_id_function()?;
                w.open(format!("function {name}(addr, function_id, pos)"));
                w.line(format!("mstore(pos, {combine}(addr, function_id))"));
            }
            w.close();
            Ok(w.finish())
        })
    }

    /// Calldata byte arrays are copied as a whole, followed by zero padding.
    fn encode_calldata_array(&mut self, name: String, from: &ArrayTy, to: &Ty) -> Result<String> {
        if !from.is_byte_array() {
            return unimplemented("encoding of calldata arrays other than `bytes` and `string`");
        }
        self.create_function(name.clone(), |this| {
            let copy = this.copy_to_memory_function(true)?;
            let round_up = this.round_up_function()?;
            let mut w = Writer::default();
            w.open(format!("function {name}(start, length, pos){}", returns_end(to)));
            store_length(&mut w);
            w.line(format!("{copy}(start, pos, length)"));
            w.line(format!("end := add(pos, {round_up}(length))"));
            w.close();
            Ok(w.finish())
        })
    }

    fn encode_memory_byte_array(&mut self, name: String, from: &Ty) -> Result<String> {
        self.create_function(name.clone(), |this| {
            let length = this.array_length_function(from)?;
            let copy = this.copy_to_memory_function(false)?;
            let round_up = this.round_up_function()?;
            let mut w = Writer::default();
            w.open(format!("function {name}(value, pos) -> end"));
            w.line(format!("let length := {length}(value)"));
            store_length(&mut w);
            w.line(format!("{copy}(add(value, 0x20), pos, length)"));
            w.line(format!("end := add(pos, {round_up}(length))"));
            w.close();
            Ok(w.finish())
        })
    }

    /// Byte arrays of up to 31 bytes are stored in a single slot together with twice their
    /// length. Longer ones store `2 * length + 1` in the slot and their data at its hash.
    fn encode_storage_byte_array(&mut self, name: String, from: &Ty) -> Result<String> {
        self.create_function(name.clone(), |this| {
            let data_area = this.array_data_area_function(from)?;
            let mut w = Writer::default();
            w.open(format!("function {name}(value, pos) -> end"));
            w.line("let slotValue := sload(value)");
            w.line("switch and(slotValue, 1)");
            w.open("case 0");
            w.line("let length := and(div(slotValue, 2), 0x7f)");
            w.line("mstore(pos, length)");
            w.line("end := add(pos, 0x20)");
            w.open("if length");
            w.line("mstore(end, and(slotValue, not(0xff)))");
            w.line("end := add(end, 0x20)");
            w.close();
            w.close();
            w.open("case 1");
            w.line("let length := div(slotValue, 2)");
            store_length(&mut w);
            w.line(format!("let dataPos := {data_area}(value)"));
            w.line("let i := 0");
            w.open("for { } lt(i, length) { i := add(i, 0x20) }");
            w.line("mstore(add(pos, i), sload(dataPos))");
            w.line("dataPos := add(dataPos, 1)");
            w.close();
            w.line("end := add(pos, i)");
            w.close();
            w.close();
            Ok(w.finish())
        })
    }

    /// Several elements share a slot: each slot is read once and every element in it is
    /// extracted by its byte offset.
    fn encode_packed_storage_array(
        &mut self,
        name: String,
        from: &Ty,
        to: &Ty,
        to_array: &ArrayTy,
        options: EncodingOptions,
    ) -> Result<String> {
        let Ty::Array(from_array) = from else {
            return internal(format!("`{from}` is not an array"));
        };
        let element_bytes = from_array.base.storage_bytes();
        let per_slot = WORD_SIZE / element_bytes;
        self.create_function(name.clone(), |this| {
            let length = this.array_length_function(from)?;
            let data_area = this.array_data_area_function(from)?;
            let element_options = EncodingOptions { compacted: true, ..options };
            let encode =
                this.abi_encoding_function(&from_array.base, &to_array.base, element_options)?;
            let element_size = head_size(&to_array.base)?;

            let mut w = Writer::default();
            w.open(format!("function {name}(value, pos){}", returns_end(to)));
            w.line(format!("let length := {length}(value)"));
            if to_array.is_dynamically_sized() {
                store_length(&mut w);
            }
            w.line(format!("let srcPtr := {data_area}(value)"));
            w.open(format!("for {{ let i := 0 }} lt(i, length) {{ i := add(i, {per_slot}) }}"));
            w.line("let data := sload(srcPtr)");
            for j in 0..per_slot {
                let extract = this.extract_from_storage_value(&from_array.base, j * element_bytes)?;
                let step = format!(
                    "{encode}({extract}(data), pos) pos := add(pos, {})",
                    hex(U256::from(element_size))
                );
                if j == 0 {
                    w.line(step);
                } else {
                    w.line(format!("if lt(add(i, {j}), length) {{ {step} }}"));
                }
            }
            w.line("srcPtr := add(srcPtr, 1)");
            w.close();
            if to.is_dynamically_encoded() {
                w.line("end := pos");
            }
            w.close();
            Ok(w.finish())
        })
    }

    /// Encodes memory arrays and storage arrays of elements occupying at least a slot each,
    /// element by element.
    fn encode_array(
        &mut self,
        name: String,
        from: &Ty,
        to: &Ty,
        to_array: &ArrayTy,
        options: EncodingOptions,
    ) -> Result<String> {
        let Ty::Array(from_array) = from else {
            return internal(format!("`{from}` is not an array"));
        };
        self.create_function(name.clone(), |this| {
            let length = this.array_length_function(from)?;
            let data_area = this.array_data_area_function(from)?;
            let next = this.next_array_element_function(from)?;
            let element_options = EncodingOptions { compacted: true, ..options };
            let encode =
                this.abi_encoding_function(&from_array.base, &to_array.base, element_options)?;
            let base = &*from_array.base;
            let element = match from_array.location {
                DataLocation::Storage if base.is_value_type() => {
                    format!("{}(srcPtr)", this.read_from_storage(base, 0)?)
                }
                DataLocation::Storage => "srcPtr".to_string(),
                _ => "mload(srcPtr)".to_string(),
            };
            let dynamic_elements = to_array.base.is_dynamically_encoded();

            let mut w = Writer::default();
            w.open(format!("function {name}(value, pos){}", returns_end(to)));
            w.line(format!("let length := {length}(value)"));
            if to_array.is_dynamically_sized() {
                store_length(&mut w);
            }
            if dynamic_elements {
                w.line("let headStart := pos");
                w.line("let tail := add(pos, mul(length, 0x20))");
            }
            w.line(format!("let srcPtr := {data_area}(value)"));
            w.open("for { let i := 0 } lt(i, length) { i := add(i, 1) }");
            if dynamic_elements {
                w.line("mstore(pos, sub(tail, headStart))");
                w.line(format!("tail := {encode}({element}, tail)"));
                w.line("pos := add(pos, 0x20)");
            } else {
                let size = head_size(&to_array.base)?;
                w.line(format!("{encode}({element}, pos)"));
                w.line(format!("pos := add(pos, {})", hex(U256::from(size))));
            }
            w.line(format!("srcPtr := {next}(srcPtr)"));
            w.close();
            if dynamic_elements {
                w.line("pos := tail");
            }
            if to.is_dynamically_encoded() {
                w.line("end := pos");
            }
            w.close();
            Ok(w.finish())
        })
    }
}

/// Formats up to 32 bytes as a left-aligned word.
fn word(bytes: &[u8]) -> String {
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    hex(U256::from_be_bytes(word))
}
