//! In-memory field values
//!
//! A value mirrors the descriptor's type triple: the [`FieldValue`] variant
//! is the container, each [`Cell`] is shaped by the struct kind, and each
//! [`Primitive`] carries the element type.

use serde::{Deserialize, Serialize};

use crate::descriptor::{ContainerKind, FieldType, PrimitiveKind, StructKind};

/// Opaque handle of a persisted object owned by the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

/// One element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Bool(bool),
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    FloatMax(f64),
    /// `None` is a null reference
    Object(Option<ObjectHandle>),
}

impl Primitive {
    /// The kind this element carries
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::Char(_) => PrimitiveKind::Char,
            Primitive::Int8(_) => PrimitiveKind::Int8,
            Primitive::UInt8(_) => PrimitiveKind::UInt8,
            Primitive::Int16(_) => PrimitiveKind::Int16,
            Primitive::UInt16(_) => PrimitiveKind::UInt16,
            Primitive::Int32(_) => PrimitiveKind::Int32,
            Primitive::UInt32(_) => PrimitiveKind::UInt32,
            Primitive::Int64(_) => PrimitiveKind::Int64,
            Primitive::UInt64(_) => PrimitiveKind::UInt64,
            Primitive::Float32(_) => PrimitiveKind::Float32,
            Primitive::Float64(_) => PrimitiveKind::Float64,
            Primitive::FloatMax(_) => PrimitiveKind::FloatMax,
            Primitive::Object(_) => PrimitiveKind::ObjectRef,
        }
    }

    /// Bitwise equality; unlike `==`, NaN payloads compare equal to themselves
    pub fn bit_eq(&self, other: &Primitive) -> bool {
        match (self, other) {
            (Primitive::Float32(a), Primitive::Float32(b)) => a.to_bits() == b.to_bits(),
            (Primitive::Float64(a), Primitive::Float64(b))
            | (Primitive::FloatMax(a), Primitive::FloatMax(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

/// One sparse entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseEntry {
    pub index: u32,
    pub value: Primitive,
}

/// An element slot, shaped by the struct kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// `StructKind::None`
    Plain(Primitive),
    /// `StructKind::StringStruct`
    Str(Vec<Primitive>),
    /// `StructKind::Sparse`
    Sparse(Vec<SparseEntry>),
}

impl Cell {
    pub fn structure(&self) -> StructKind {
        match self {
            Cell::Plain(_) => StructKind::None,
            Cell::Str(_) => StructKind::StringStruct,
            Cell::Sparse(_) => StructKind::Sparse,
        }
    }

    /// Every primitive in the cell
    pub fn primitives(&self) -> Box<dyn Iterator<Item = &Primitive> + '_> {
        match self {
            Cell::Plain(p) => Box::new(std::iter::once(p)),
            Cell::Str(items) => Box::new(items.iter()),
            Cell::Sparse(entries) => Box::new(entries.iter().map(|e| &e.value)),
        }
    }

    fn bit_eq(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Plain(a), Cell::Plain(b)) => a.bit_eq(b),
            (Cell::Str(a), Cell::Str(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.bit_eq(y))
            }
            (Cell::Sparse(a), Cell::Sparse(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.index == y.index && x.value.bit_eq(&y.value))
            }
            _ => false,
        }
    }
}

/// A complete field value, shaped by the container kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Scalar(Cell),
    Vector(Vec<Cell>),
    /// Column-major storage, `cells.len() == rows * cols`
    Matrix { rows: u32, cols: u32, cells: Vec<Cell> },
    String(Vec<Cell>),
}

impl FieldValue {
    /// Plain scalar
    pub fn scalar(value: Primitive) -> Self {
        FieldValue::Scalar(Cell::Plain(value))
    }

    /// Plain vector
    pub fn vector(values: impl IntoIterator<Item = Primitive>) -> Self {
        FieldValue::Vector(values.into_iter().map(Cell::Plain).collect())
    }

    /// Plain column-major matrix
    pub fn matrix(rows: u32, cols: u32, values: impl IntoIterator<Item = Primitive>) -> Self {
        FieldValue::Matrix {
            rows,
            cols,
            cells: values.into_iter().map(Cell::Plain).collect(),
        }
    }

    /// Character string
    pub fn text(s: &str) -> Self {
        FieldValue::String(s.bytes().map(|b| Cell::Plain(Primitive::Char(b))).collect())
    }

    pub fn container(&self) -> ContainerKind {
        match self {
            FieldValue::Scalar(_) => ContainerKind::Scalar,
            FieldValue::Vector(_) => ContainerKind::Vector,
            FieldValue::Matrix { .. } => ContainerKind::Matrix,
            FieldValue::String(_) => ContainerKind::String,
        }
    }

    /// All cells in storage order
    pub fn cells(&self) -> &[Cell] {
        match self {
            FieldValue::Scalar(cell) => std::slice::from_ref(cell),
            FieldValue::Vector(cells) | FieldValue::String(cells) => cells.as_slice(),
            FieldValue::Matrix { cells, .. } => cells.as_slice(),
        }
    }

    /// The single plain primitive of a scalar
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            FieldValue::Scalar(Cell::Plain(p)) => Some(*p),
            _ => None,
        }
    }

    /// Whether this value is a valid instance of `field_type`.
    ///
    /// Empty sequences match any primitive kind of the right container and
    /// struct kind.
    pub fn matches(&self, field_type: &FieldType) -> bool {
        if self.container() != field_type.container {
            return false;
        }
        if let FieldValue::Matrix { rows, cols, cells } = self {
            if (*rows as usize).checked_mul(*cols as usize) != Some(cells.len()) {
                return false;
            }
        }
        self.cells().iter().all(|cell| {
            cell.structure() == field_type.structure
                && cell.primitives().all(|p| p.kind() == field_type.primitive)
        })
    }

    /// Best-effort description of this value's type, for diagnostics
    pub fn describe(&self) -> String {
        let first = self.cells().first();
        let structure = first.map(Cell::structure).unwrap_or(StructKind::None);
        match first.and_then(|c| c.primitives().next()) {
            Some(p) => FieldType::new(self.container(), structure, p.kind()).to_string(),
            None => format!("empty {}", self.container().as_str()),
        }
    }

    /// Bitwise equality over every element
    pub fn bit_eq(&self, other: &FieldValue) -> bool {
        let dims_match = match (self, other) {
            (
                FieldValue::Matrix { rows: r1, cols: c1, .. },
                FieldValue::Matrix { rows: r2, cols: c2, .. },
            ) => r1 == r2 && c1 == c2,
            _ => self.container() == other.container(),
        };
        dims_match
            && self.cells().len() == other.cells().len()
            && self.cells().iter().zip(other.cells()).all(|(a, b)| a.bit_eq(b))
    }
}
