//! Kind enums that make up a field's type
//!
//! A field type is the triple (container, struct, primitive). Variant order
//! is significant: it is the order descriptors sort in, and the wire tag
//! used by the record codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Single element
    Scalar,
    /// One-dimensional sequence of elements
    Vector,
    /// Column-major rows x cols elements
    Matrix,
    /// One-dimensional sequence with string semantics
    String,
}

impl ContainerKind {
    /// Returns the kind name for diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Scalar => "scalar",
            ContainerKind::Vector => "vector",
            ContainerKind::Matrix => "matrix",
            ContainerKind::String => "string",
        }
    }

    /// Wire tag
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Inverse of [`ContainerKind::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ContainerKind::Scalar),
            1 => Some(ContainerKind::Vector),
            2 => Some(ContainerKind::Matrix),
            3 => Some(ContainerKind::String),
            _ => None,
        }
    }

    /// Whether values of this container are a flat, length-prefixed sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, ContainerKind::Vector | ContainerKind::String)
    }
}

/// Structural qualifier of each element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    /// Plain primitive elements
    None,
    /// Each element is a string of primitives
    StringStruct,
    /// Each element is a sparse vector of (index, primitive) entries
    Sparse,
}

impl StructKind {
    /// Returns the kind name for diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            StructKind::None => "none",
            StructKind::StringStruct => "string_struct",
            StructKind::Sparse => "sparse",
        }
    }

    /// Wire tag
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Inverse of [`StructKind::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(StructKind::None),
            1 => Some(StructKind::StringStruct),
            2 => Some(StructKind::Sparse),
            _ => None,
        }
    }
}

/// Element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Bool,
    /// Single byte character
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Widest float the build supports; stored as 64-bit
    FloatMax,
    /// Reference to another persisted object
    ObjectRef,
}

impl PrimitiveKind {
    /// Returns the kind name for diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::FloatMax => "floatmax",
            PrimitiveKind::ObjectRef => "object",
        }
    }

    /// Wire tag
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Inverse of [`PrimitiveKind::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        use PrimitiveKind::*;
        const ALL: [PrimitiveKind; 14] = [
            Bool, Char, Int8, UInt8, Int16, UInt16, Int32, UInt32, Int64, UInt64, Float32,
            Float64, FloatMax, ObjectRef,
        ];
        ALL.get(tag as usize).copied()
    }

    /// True for the integer kinds, signed or not
    pub fn is_integer(&self) -> bool {
        use PrimitiveKind::*;
        matches!(
            self,
            Int8 | UInt8 | Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64
        )
    }

    /// True for the floating point kinds
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::Float32 | PrimitiveKind::Float64 | PrimitiveKind::FloatMax
        )
    }
}

/// The (container, struct, primitive) triple describing a field's type.
///
/// Field order matches the descriptor sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub container: ContainerKind,
    pub structure: StructKind,
    pub primitive: PrimitiveKind,
}

impl FieldType {
    pub fn new(container: ContainerKind, structure: StructKind, primitive: PrimitiveKind) -> Self {
        Self {
            container,
            structure,
            primitive,
        }
    }

    /// Plain scalar of the given primitive
    pub fn scalar(primitive: PrimitiveKind) -> Self {
        Self::new(ContainerKind::Scalar, StructKind::None, primitive)
    }

    /// Plain vector of the given primitive
    pub fn vector(primitive: PrimitiveKind) -> Self {
        Self::new(ContainerKind::Vector, StructKind::None, primitive)
    }

    /// Plain matrix of the given primitive
    pub fn matrix(primitive: PrimitiveKind) -> Self {
        Self::new(ContainerKind::Matrix, StructKind::None, primitive)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.container.as_str())?;
        if self.structure != StructKind::None {
            write!(f, "<{}>", self.structure.as_str())?;
        }
        write!(f, " {}", self.primitive.as_str())
    }
}
