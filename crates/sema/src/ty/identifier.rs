//! Deterministic type identifiers and canonical ABI names.

use super::{ArrayKind, ArrayTy, Ty};
use alloy_primitives::{hex, keccak256};
use num_traits::Signed;
use sable_ast::ast::DataLocation;
use std::fmt::Write;

impl Ty {
    /// Returns a string that uniquely identifies this type, usable as part of a Yul identifier.
    ///
    /// Two types have the same identifier iff they are equal, data location included.
    pub fn identifier(&self) -> String {
        escape_identifier(&self.rich_identifier())
    }

    /// Returns the identifier before escaping, using parentheses and commas as separators.
    fn rich_identifier(&self) -> String {
        match self {
            Self::Integer { bits, signed } => {
                format!("t_{}int{bits}", if *signed { "" } else { "u" })
            }
            Self::Bool => "t_bool".into(),
            Self::FixedBytes(n) => format!("t_bytes{n}"),
            Self::Address => "t_address".into(),
            Self::FixedPoint { bits, decimals, signed } => {
                format!("t_{}fixed{bits}x{decimals}", if *signed { "" } else { "u" })
            }
            Self::Contract { id, name } => {
                format!("t_contract{}{}", parenthesize_user_identifier(name), id.get())
            }
            Self::Enum { id, name, .. } => {
                format!("t_enum{}{}", parenthesize_user_identifier(name), id.get())
            }
            Self::Array(array) => array_identifier(array),
            Self::Struct(strukt) => format!(
                "t_struct{}{}{}",
                parenthesize_user_identifier(&strukt.name),
                strukt.id.get(),
                location_suffix(strukt.location)
            ),
            Self::Function(f) => {
                let mut id = format!("t_function_{}_{}", f.kind.to_str(), f.state_mutability);
                id.push_str(&identifier_list(&f.parameters));
                id.push_str("returns");
                id.push_str(&identifier_list(&f.returns));
                id
            }
            Self::StringLiteral(value) => {
                format!("t_stringliteral_{}", hex::encode(keccak256(value)))
            }
            Self::Rational(value) => {
                let mut id = String::from("t_rational_");
                if value.is_negative() {
                    id.push_str("minus_");
                }
                let _ = write!(id, "{}_by_{}", value.numer().abs(), value.denom());
                id
            }
            Self::Tuple(elements) => format!("t_tuple{}", identifier_list(elements)),
            Self::Mapping(key, value) => {
                format!("t_mapping{}", identifier_list([&**key, &**value]))
            }
        }
    }

    /// Returns the canonical name of the type as used in the JSON ABI.
    ///
    /// Structs are reported as `tuple`; their components are listed separately.
    pub fn abi_type_name(&self) -> String {
        match self {
            Self::Contract { .. } => "address".into(),
            Self::Enum { .. } => "uint8".into(),
            Self::Array(array) => match array.kind {
                ArrayKind::Bytes => "bytes".into(),
                ArrayKind::String => "string".into(),
                ArrayKind::Ordinary => {
                    format!("{}{}", array.base.abi_type_name(), array_suffix(array))
                }
            },
            Self::Struct(_) => "tuple".into(),
            Self::Function(_) => "function".into(),
            _ => self.to_string(),
        }
    }

    /// Returns the name of the type in function signatures: like [`abi_type_name`], but
    /// structs are spelled out as the tuple of their fields.
    ///
    /// [`abi_type_name`]: Self::abi_type_name
    pub fn signature_type_name(&self) -> String {
        match self {
            Self::Struct(strukt) => {
                let fields: Vec<_> =
                    strukt.fields.iter().map(|(_, ty)| ty.signature_type_name()).collect();
                format!("({})", fields.join(","))
            }
            Self::Array(array) if array.kind == ArrayKind::Ordinary => {
                format!("{}{}", array.base.signature_type_name(), array_suffix(array))
            }
            _ => self.abi_type_name(),
        }
    }
}

fn array_identifier(array: &ArrayTy) -> String {
    let mut id = match array.kind {
        ArrayKind::Bytes => "t_bytes".to_string(),
        ArrayKind::String => "t_string".to_string(),
        ArrayKind::Ordinary => {
            let mut id = format!("t_array{}", identifier_list([&*array.base]));
            match array.length {
                Some(length) => {
                    let _ = write!(id, "{length}");
                }
                None => id.push_str("dyn"),
            }
            id
        }
    };
    id.push_str(location_suffix(array.location));
    id
}

fn array_suffix(array: &ArrayTy) -> String {
    match array.length {
        Some(length) => format!("[{length}]"),
        None => "[]".into(),
    }
}

fn location_suffix(location: DataLocation) -> &'static str {
    match location {
        DataLocation::Storage => "_storage",
        DataLocation::Memory => "_memory_ptr",
        DataLocation::Calldata => "_calldata_ptr",
    }
}

fn identifier_list<'a>(tys: impl IntoIterator<Item = &'a Ty>) -> String {
    let ids: Vec<_> = tys.into_iter().map(Ty::rich_identifier).collect();
    format!("({})", ids.join(","))
}

fn parenthesize_user_identifier(name: &str) -> String {
    format!("({name})")
}

/// Makes a rich identifier a valid Yul identifier.
fn escape_identifier(id: &str) -> String {
    id.replace('$', "$$$").replace(',', "_$_").replace('(', "$_").replace(')', "_$")
}
