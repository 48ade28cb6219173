use super::{Expr, ParameterList, Path, StateMutability, Visibility};
use sable_interface::Span;
use std::fmt;

/// A type name.
#[derive(Clone, Debug)]
pub struct Type {
    pub span: Span,
    pub kind: TypeKind,
}

impl Type {
    /// Creates a new elementary type.
    pub fn elementary(ty: ElementaryType, span: Span) -> Self {
        Self { span, kind: TypeKind::Elementary(ty) }
    }

    /// Returns `true` if the type is an elementary type.
    #[inline]
    pub fn is_elementary(&self) -> bool {
        matches!(self.kind, TypeKind::Elementary(_))
    }

    /// Returns `true` if the type is a custom type.
    #[inline]
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, TypeKind::Custom(_))
    }
}

/// The kind of a type.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// An elementary/primitive type.
    Elementary(ElementaryType),

    /// `$element[$($size)?]`
    Array(Box<TypeArray>),
    /// `function($($parameters),*) $($attributes)* $(returns ($($returns),+))?`
    Function(Box<TypeFunction>),
    /// `mapping($key => $value)`
    Mapping(Box<TypeMapping>),

    /// A user-defined type: a contract, struct or enum name.
    Custom(Path),
}

/// Elementary/primitive type.
///
/// Integer sizes are in bits, byte array sizes in bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementaryType {
    /// `address $(payable)?`
    Address(/* payable: */ bool),
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,

    /// `fixedMxN`: total bits and number of decimals.
    Fixed(u16, u8),
    /// `ufixedMxN`: total bits and number of decimals.
    UFixed(u16, u8),

    /// `int{8..=256}`
    Int(u16),
    /// `uint{8..=256}`
    UInt(u16),
    /// `bytes{1..=32}`
    FixedBytes(u8),
}

impl fmt::Debug for ElementaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(false) => f.write_str("Address"),
            Self::Address(true) => f.write_str("AddressPayable"),
            Self::Bool => f.write_str("Bool"),
            Self::String => f.write_str("String"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Fixed(m, n) => write!(f, "Fixed({m}, {n})"),
            Self::UFixed(m, n) => write!(f, "UFixed({m}, {n})"),
            Self::Int(bits) => write!(f, "Int({bits})"),
            Self::UInt(bits) => write!(f, "UInt({bits})"),
            Self::FixedBytes(size) => write!(f, "FixedBytes({size})"),
        }
    }
}

impl fmt::Display for ElementaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(false) => f.write_str("address"),
            Self::Address(true) => f.write_str("address payable"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Bytes => f.write_str("bytes"),
            Self::Fixed(m, n) => write!(f, "fixed{m}x{n}"),
            Self::UFixed(m, n) => write!(f, "ufixed{m}x{n}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::UInt(bits) => write!(f, "uint{bits}"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
        }
    }
}

impl ElementaryType {
    /// Returns `true` if the size of the type is valid.
    pub fn is_valid(self) -> bool {
        match self {
            Self::Int(bits) | Self::UInt(bits) => bits % 8 == 0 && (8..=256).contains(&bits),
            Self::Fixed(bits, decimals) | Self::UFixed(bits, decimals) => {
                bits % 8 == 0 && (8..=256).contains(&bits) && decimals <= 80
            }
            Self::FixedBytes(size) => (1..=32).contains(&size),
            Self::Address(_) | Self::Bool | Self::String | Self::Bytes => true,
        }
    }

    /// Returns `true` if the type is a value type.
    pub fn is_value_type(self) -> bool {
        !matches!(self, Self::String | Self::Bytes)
    }
}

/// An array type: `$element[$($size)?]`.
#[derive(Clone, Debug)]
pub struct TypeArray {
    pub element: Type,
    pub size: Option<Box<Expr>>,
}

/// A function type name: `function($($parameters),*) $($attributes)* $(returns ($($returns),+))?`
#[derive(Clone, Debug)]
pub struct TypeFunction {
    pub parameters: ParameterList,
    pub visibility: Option<Visibility>,
    pub state_mutability: StateMutability,
    pub returns: ParameterList,
}

/// A mapping type: `mapping($key => $value)`.
#[derive(Clone, Debug)]
pub struct TypeMapping {
    pub key: Type,
    pub value: Type,
}
