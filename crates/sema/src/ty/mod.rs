//! The type descriptor model.
//!
//! [`Ty`] is a closed set of type categories. Everything the code generator needs to decide how
//! a value is laid out and encoded is answered here: whether it is dynamically encoded, how many
//! bytes it occupies in calldata and storage, and how many stack slots it takes.

use crate::hir::{ContractId, EnumId, StructId};
use alloy_primitives::U256;
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::One;
use sable_ast::ast::{DataLocation, StateMutability};
use std::fmt;

mod identifier;

/// The size of a word in bytes.
pub const WORD_SIZE: u64 = 32;

/// A resolved type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// `uintN` and `intN`.
    Integer { bits: u16, signed: bool },
    /// `bool`.
    Bool,
    /// `bytesN`, with `N` in bytes.
    FixedBytes(u8),
    /// `address`.
    Address,
    /// `fixedMxN` and `ufixedMxN`.
    FixedPoint { bits: u16, decimals: u8, signed: bool },
    /// A contract, interface or library. Values are addresses.
    Contract { id: ContractId, name: String },
    /// An enum, with its number of members.
    Enum { id: EnumId, name: String, members: u32 },
    /// Arrays, including `bytes` and `string`.
    Array(ArrayTy),
    /// A struct, with its fields resolved.
    Struct(StructTy),
    /// A function reference.
    Function(FunctionTy),
    /// The type of a string literal: its bytes are known at compile time.
    StringLiteral(Vec<u8>),
    /// The type of a number literal, or of a constant expression over number literals.
    Rational(BigRational),
    /// A tuple of values, as returned by functions with multiple return values.
    Tuple(Vec<Ty>),
    /// `mapping(key => value)`.
    Mapping(Box<Ty>, Box<Ty>),
}

/// The kind of an [`ArrayTy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// `T[]` or `T[N]`.
    Ordinary,
    /// `bytes`.
    Bytes,
    /// `string`.
    String,
}

/// An array type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayTy {
    /// The element type. `bytes1` for byte arrays.
    pub base: Box<Ty>,
    /// The static length, or `None` for dynamically sized arrays.
    pub length: Option<u64>,
    pub location: DataLocation,
    pub kind: ArrayKind,
}

impl ArrayTy {
    /// Returns `true` for `bytes` and `string`.
    #[inline]
    pub fn is_byte_array(&self) -> bool {
        self.kind != ArrayKind::Ordinary
    }

    /// Returns `true` if the array has no static length.
    #[inline]
    pub fn is_dynamically_sized(&self) -> bool {
        self.length.is_none()
    }
}

/// A struct type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructTy {
    pub id: StructId,
    pub name: String,
    /// The fields, in declaration order. Reference-typed fields share the struct's location.
    pub fields: Vec<(String, Ty)>,
    pub location: DataLocation,
}

/// Whether a function reference is internal or external.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionTyKind {
    /// A jump destination in the current contract.
    Internal,
    /// An address and a function selector.
    External,
}

impl FunctionTyKind {
    /// Returns the string representation of the kind.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// A function reference type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionTy {
    pub kind: FunctionTyKind,
    pub parameters: Vec<Ty>,
    pub returns: Vec<Ty>,
    pub state_mutability: StateMutability,
}

impl Ty {
    /// `uint256`.
    pub const UINT256: Self = Self::Integer { bits: 256, signed: false };

    /// Creates an unsigned integer type.
    #[inline]
    pub const fn uint(bits: u16) -> Self {
        Self::Integer { bits, signed: false }
    }

    /// Creates a signed integer type.
    #[inline]
    pub const fn int(bits: u16) -> Self {
        Self::Integer { bits, signed: true }
    }

    /// Creates a `bytes` or `string` type in the given location.
    pub fn byte_array(kind: ArrayKind, location: DataLocation) -> Self {
        debug_assert_ne!(kind, ArrayKind::Ordinary);
        Self::Array(ArrayTy { base: Box::new(Self::FixedBytes(1)), length: None, location, kind })
    }

    /// Creates an ordinary array type.
    pub fn array(base: Self, length: Option<u64>, location: DataLocation) -> Self {
        Self::Array(ArrayTy { base: Box::new(base), length, location, kind: ArrayKind::Ordinary })
    }

    /// Returns the array type, if this is an array.
    #[inline]
    pub fn as_array(&self) -> Option<&ArrayTy> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Returns `true` if values of this type fit in a single stack slot and are copied on
    /// assignment.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            Self::Integer { .. }
                | Self::Bool
                | Self::FixedBytes(_)
                | Self::Address
                | Self::FixedPoint { .. }
                | Self::Contract { .. }
                | Self::Enum { .. }
                | Self::Function(_)
                | Self::Rational(_)
        )
    }

    /// Returns `true` for types that live in a data location.
    pub fn is_reference_type(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Struct(_) | Self::Mapping(..))
    }

    /// Returns the data location of a reference type.
    ///
    /// Mappings only live in storage.
    pub fn location(&self) -> Option<DataLocation> {
        match self {
            Self::Array(array) => Some(array.location),
            Self::Struct(strukt) => Some(strukt.location),
            Self::Mapping(..) => Some(DataLocation::Storage),
            _ => None,
        }
    }

    /// Returns `true` if this is a reference type stored in `location`.
    pub fn is_in(&self, location: DataLocation) -> bool {
        self.location() == Some(location)
    }

    /// Returns `true` for arrays without a static length, including `bytes` and `string`.
    pub fn is_dynamically_sized(&self) -> bool {
        matches!(self, Self::Array(array) if array.is_dynamically_sized())
    }

    /// Returns `true` if the ABI encoding of a value of this type needs a tail: dynamically
    /// sized arrays, and arrays or structs containing them.
    pub fn is_dynamically_encoded(&self) -> bool {
        match self {
            Self::Array(array) => {
                array.is_dynamically_sized() || array.base.is_dynamically_encoded()
            }
            Self::Struct(strukt) => strukt.fields.iter().any(|(_, ty)| ty.is_dynamically_encoded()),
            _ => false,
        }
    }

    /// Returns the size of the ABI encoding of a statically encoded value, padded to words.
    ///
    /// Returns `None` for dynamically encoded types, and for types that can't be encoded at all.
    pub fn calldata_encoded_size(&self) -> Option<u64> {
        match self {
            Self::Integer { .. }
            | Self::Bool
            | Self::FixedBytes(_)
            | Self::Address
            | Self::FixedPoint { .. }
            | Self::Contract { .. }
            | Self::Enum { .. } => Some(WORD_SIZE),
            Self::Function(f) => (f.kind == FunctionTyKind::External).then_some(WORD_SIZE),
            Self::Array(array) => {
                let length = array.length?;
                if array.base.is_dynamically_encoded() {
                    return None;
                }
                length.checked_mul(array.base.calldata_encoded_size()?)
            }
            Self::Struct(strukt) => {
                strukt.fields.iter().try_fold(0u64, |acc, (_, ty)| {
                    if ty.is_dynamically_encoded() {
                        return None;
                    }
                    acc.checked_add(ty.calldata_encoded_size()?)
                })
            }
            Self::StringLiteral(_) | Self::Rational(_) | Self::Tuple(_) | Self::Mapping(..) => None,
        }
    }

    /// Returns the number of bytes a value of this type occupies in storage.
    ///
    /// Values of 16 bytes or fewer are packed together in storage arrays.
    pub fn storage_bytes(&self) -> u64 {
        match self {
            Self::Integer { bits, .. } | Self::FixedPoint { bits, .. } => u64::from(*bits) / 8,
            Self::Bool => 1,
            Self::FixedBytes(n) => u64::from(*n),
            Self::Address | Self::Contract { .. } => 20,
            Self::Enum { members, .. } => {
                let max = members.saturating_sub(1);
                let bits = u32::BITS - max.leading_zeros();
                u64::from(bits.div_ceil(8).max(1))
            }
            Self::Function(f) => match f.kind {
                FunctionTyKind::External => 24,
                FunctionTyKind::Internal => 8,
            },
            Self::Array(_)
            | Self::Struct(_)
            | Self::Mapping(..)
            | Self::StringLiteral(_)
            | Self::Rational(_)
            | Self::Tuple(_) => WORD_SIZE,
        }
    }

    /// Returns `true` if several values of this type share one storage slot in arrays.
    #[inline]
    pub fn is_packable(&self) -> bool {
        self.storage_bytes() <= 16
    }

    /// Returns the number of storage slots a value of this type occupies.
    pub fn storage_size(&self) -> u64 {
        match self {
            Self::Array(array) => match array.length {
                None => 1,
                Some(length) => {
                    if array.is_byte_array() {
                        return 1;
                    }
                    let base = &array.base;
                    if base.is_packable() {
                        let per_slot = WORD_SIZE / base.storage_bytes();
                        length.div_ceil(per_slot)
                    } else {
                        length.saturating_mul(base.storage_size())
                    }
                }
            },
            Self::Struct(strukt) => {
                StorageLayout::compute(strukt.fields.iter().map(|(_, ty)| ty)).slots
            }
            _ => 1,
        }
    }

    /// Returns the number of stack slots a value of this type occupies.
    pub fn size_on_stack(&self) -> usize {
        match self {
            Self::Array(array)
                if array.location == DataLocation::Calldata && array.is_dynamically_sized() =>
            {
                2
            }
            Self::Function(f) if f.kind == FunctionTyKind::External => 2,
            Self::StringLiteral(_) => 0,
            Self::Tuple(elements) => elements.iter().map(Self::size_on_stack).sum(),
            _ => 1,
        }
    }

    /// Returns the type a literal is converted to when it needs to be stored.
    ///
    /// Integer rationals become the smallest integer type holding them, string literals become
    /// `string memory`. Returns `None` for fractional rationals and for integers wider than 256
    /// bits.
    pub fn mobile_type(&self) -> Option<Self> {
        match self {
            Self::Rational(value) => integer_type_for(value),
            Self::StringLiteral(_) => {
                Some(Self::byte_array(ArrayKind::String, DataLocation::Memory))
            }
            _ => Some(self.clone()),
        }
    }

    /// Returns the type used for this type in the external interface of a contract.
    ///
    /// `in_library` is set for the interface of library functions, which may take storage
    /// references.
    pub fn interface_type(&self, in_library: bool) -> Option<Self> {
        match self {
            Self::Integer { .. }
            | Self::Bool
            | Self::FixedBytes(_)
            | Self::Address
            | Self::FixedPoint { .. } => Some(self.clone()),
            Self::Contract { .. } => Some(Self::Address),
            Self::Enum { .. } => Some(Self::uint(8)),
            Self::Function(f) => (f.kind == FunctionTyKind::External).then(|| self.clone()),
            Self::Array(array) => {
                if in_library && array.location == DataLocation::Storage {
                    return Some(self.clone());
                }
                if array.is_byte_array() {
                    return Some(Self::byte_array(array.kind, DataLocation::Memory));
                }
                let base = array.base.interface_type(in_library)?;
                if base.is_in(DataLocation::Storage) {
                    return None;
                }
                Some(Self::array(base, array.length, DataLocation::Memory))
            }
            Self::Struct(strukt) => {
                if in_library && strukt.location == DataLocation::Storage {
                    return Some(self.clone());
                }
                let fields = strukt
                    .fields
                    .iter()
                    .map(|(name, ty)| Some((name.clone(), ty.interface_type(false)?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::Struct(StructTy {
                    id: strukt.id,
                    name: strukt.name.clone(),
                    fields,
                    location: DataLocation::Memory,
                }))
            }
            Self::Mapping(..) => in_library.then(|| self.clone()),
            Self::StringLiteral(_) | Self::Rational(_) | Self::Tuple(_) => None,
        }
    }

    /// Returns the type a value of this type is ABI-encoded as.
    ///
    /// In library calls, storage references are passed as their slot, encoded as `uint256`.
    pub fn full_encoding_type(&self, in_library: bool) -> Option<Self> {
        let ty = self.mobile_type()?.interface_type(in_library)?;
        Some(match ty {
            Self::Array(_) | Self::Struct(_) if ty.is_in(DataLocation::Storage) => Self::UINT256,
            Self::Mapping(..) => Self::UINT256,
            Self::Array(_) | Self::Struct(_) => ty.with_location(DataLocation::Memory),
            ty => ty,
        })
    }

    /// Returns a copy of this type with reference types moved to `location`, recursively.
    ///
    /// Value types and mappings are returned unchanged.
    pub fn with_location(&self, location: DataLocation) -> Self {
        match self {
            Self::Array(array) => Self::Array(ArrayTy {
                base: Box::new(array.base.with_location(location)),
                location,
                ..array.clone()
            }),
            Self::Struct(strukt) => Self::Struct(StructTy {
                fields: strukt
                    .fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.with_location(location)))
                    .collect(),
                location,
                ..strukt.clone()
            }),
            _ => self.clone(),
        }
    }

    /// Returns `true` if the type can be used in the external interface of a contract.
    pub fn can_be_encoded(&self, in_library: bool) -> bool {
        self.full_encoding_type(in_library).is_some()
    }
}

/// Returns the smallest integer type holding the value of an integer rational.
fn integer_type_for(value: &BigRational) -> Option<Ty> {
    if !value.is_integer() {
        return None;
    }
    let value = value.to_integer();
    let (signed, magnitude) = match value.sign() {
        Sign::Minus => (true, -&value - BigInt::one()),
        Sign::NoSign | Sign::Plus => (false, value),
    };
    // Bits needed for the magnitude, plus a sign bit for negative values.
    let bits = magnitude.bits() + u64::from(signed);
    let bits = bits.max(1).div_ceil(8) * 8;
    if bits > 256 {
        return None;
    }
    let bits = bits as u16;
    Some(if signed { Ty::int(bits) } else { Ty::uint(bits) })
}

/// Slot and byte offset of each member of a packed storage layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    /// `(slot, byte offset)` of every member, relative to the first slot.
    pub offsets: Vec<(u64, u64)>,
    /// The total number of slots.
    pub slots: u64,
}

impl StorageLayout {
    /// Computes the layout of `types` stored one after the other, packing consecutive small
    /// values into shared slots.
    pub fn compute<'a>(types: impl IntoIterator<Item = &'a Ty>) -> Self {
        let mut offsets = Vec::new();
        let mut slot = 0u64;
        let mut byte = 0u64;
        for ty in types {
            let bytes = ty.storage_bytes();
            if byte + bytes > WORD_SIZE {
                slot += 1;
                byte = 0;
            }
            offsets.push((slot, byte));
            let size = ty.storage_size();
            if size == 1 && byte + bytes <= WORD_SIZE {
                byte += bytes;
            } else {
                slot += size;
                byte = 0;
            }
        }
        if byte > 0 {
            slot += 1;
        }
        Self { offsets, slots: slot.max(1) }
    }
}

/// Returns the value of `value` as a 256-bit two's complement word, if it fits.
pub fn rational_to_word(value: &BigRational) -> Option<U256> {
    if !value.is_integer() {
        return None;
    }
    let int = value.to_integer();
    let (sign, bytes) = int.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    let magnitude = U256::try_from_be_slice(&bytes)?;
    Some(if sign == Sign::Minus { magnitude.wrapping_neg() } else { magnitude })
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer { bits, signed } => {
                write!(f, "{}int{bits}", if *signed { "" } else { "u" })
            }
            Self::Bool => f.write_str("bool"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Address => f.write_str("address"),
            Self::FixedPoint { bits, decimals, signed } => {
                write!(f, "{}fixed{bits}x{decimals}", if *signed { "" } else { "u" })
            }
            Self::Contract { name, .. } => write!(f, "contract {name}"),
            Self::Enum { name, .. } => write!(f, "enum {name}"),
            Self::Array(array) => {
                match array.kind {
                    ArrayKind::Bytes => f.write_str("bytes")?,
                    ArrayKind::String => f.write_str("string")?,
                    ArrayKind::Ordinary => {
                        write!(f, "{}[", array.base.without_location())?;
                        if let Some(length) = array.length {
                            write!(f, "{length}")?;
                        }
                        f.write_str("]")?;
                    }
                }
                write!(f, " {}", array.location)
            }
            Self::Struct(strukt) => write!(f, "struct {} {}", strukt.name, strukt.location),
            Self::Function(func) => {
                f.write_str("function (")?;
                fmt_list(f, &func.parameters)?;
                f.write_str(")")?;
                if func.state_mutability != StateMutability::NonPayable {
                    write!(f, " {}", func.state_mutability)?;
                }
                if func.kind == FunctionTyKind::External {
                    f.write_str(" external")?;
                }
                if !func.returns.is_empty() {
                    f.write_str(" returns (")?;
                    fmt_list(f, &func.returns)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Self::StringLiteral(value) => {
                write!(f, "literal_string \"{}\"", value.escape_ascii())
            }
            Self::Rational(value) => {
                if value.is_integer() {
                    write!(f, "int_const {}", value.to_integer())
                } else {
                    write!(f, "rational_const {value}")
                }
            }
            Self::Tuple(elements) => {
                f.write_str("tuple(")?;
                fmt_list(f, elements)?;
                f.write_str(")")
            }
            Self::Mapping(key, value) => write!(f, "mapping({key} => {value})"),
        }
    }
}

impl Ty {
    /// Formats the type without its data location, as used for array elements.
    fn without_location(&self) -> impl fmt::Display + '_ {
        struct WithoutLocation<'a>(&'a Ty);
        impl fmt::Display for WithoutLocation<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = self.0.to_string();
                match self.0.location() {
                    Some(loc) if !matches!(self.0, Ty::Mapping(..)) => {
                        f.write_str(s.strip_suffix(loc.to_str()).unwrap_or(&s).trim_end())
                    }
                    _ => f.write_str(&s),
                }
            }
        }
        WithoutLocation(self)
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, tys: &[Ty]) -> fmt::Result {
    for (i, ty) in tys.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}
