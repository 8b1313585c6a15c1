//! Object record codec
//!
//! The reference on-disk form of one versioned object:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record)
//! +------------------+
//! | Class Name       | (length-prefixed string)
//! +------------------+
//! | Version          | (u32 LE)
//! +------------------+
//! | Field Count      | (u32 LE)
//! +------------------+
//! | Fields           | name, container/struct/primitive tags, value
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Values are laid out by their descriptor: sequences carry a u32 element
//! count, matrices a u32 row and column count, string-struct cells a u32
//! length, sparse cells a u32 entry count with a u32 index per entry.
//! Primitives are little-endian at their natural width; bools are one byte,
//! object references a presence byte followed by a u64 handle.
//!
//! Checksum covers all bytes except the checksum itself. Field versions are
//! not stored: decoded descriptors carry the record's version.

use std::io::{Read, Write};

use crate::descriptor::{ContainerKind, FieldDescriptor, FieldType, PrimitiveKind, StructKind};
use crate::migration::{Cell, FieldValue, ObjectHandle, Primitive, SparseEntry};

use super::adapter::RawFieldSource;
use super::checksum::compute_checksum;
use super::errors::{PersistError, PersistResult};

/// len + class len + version + field count + checksum
const MIN_RECORD_SIZE: usize = 4 + 4 + 4 + 4 + 4;

/// One object, all fields at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    class: String,
    version: u32,
    fields: Vec<(FieldDescriptor, FieldValue)>,
}

impl ObjectRecord {
    /// Creates a record. Every value must be an instance of its
    /// descriptor's type; descriptors are re-tagged with `version`.
    pub fn new(
        class: impl Into<String>,
        version: u32,
        fields: Vec<(FieldDescriptor, FieldValue)>,
    ) -> PersistResult<Self> {
        let mut tagged = Vec::with_capacity(fields.len());
        for (descriptor, value) in fields {
            if !value.matches(&descriptor.field_type()) {
                return Err(PersistError::ValueMismatch {
                    field: descriptor.name().to_string(),
                    expected: descriptor.field_type().to_string(),
                    actual: value.describe(),
                });
            }
            tagged.push((descriptor.with_version(version), value));
        }
        Ok(Self {
            class: class.into(),
            version,
            fields: tagged,
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fields(&self) -> &[(FieldDescriptor, FieldValue)] {
        &self.fields
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        write_string(&mut buf, &self.class);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&(self.fields.len() as u32).to_le_bytes());

        for (descriptor, value) in &self.fields {
            write_string(&mut buf, descriptor.name());
            buf.push(descriptor.container().tag());
            buf.push(descriptor.structure().tag());
            buf.push(descriptor.primitive().tag());
            encode_value(&mut buf, value);
        }

        buf
    }

    /// Serialize the complete record to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();

        // Record length = 4 (length) + body.len() + 4 (checksum)
        let record_length = (4 + body.len() + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize one record from the front of `data`, verifying the
    /// checksum. Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> PersistResult<(Self, usize)> {
        Self::deserialize_at(data, 0)
    }

    fn deserialize_at(data: &[u8], offset: u64) -> PersistResult<(Self, usize)> {
        if data.len() < 4 {
            return Err(PersistError::Truncated {
                offset,
                needed: 4 - data.len(),
            });
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(PersistError::InvalidLength {
                offset,
                length: record_length,
            });
        }

        if data.len() < record_length {
            return Err(PersistError::Truncated {
                offset,
                needed: record_length - data.len(),
            });
        }

        let checksum_offset = record_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = compute_checksum(&data[..checksum_offset]);
        if computed != stored {
            return Err(PersistError::ChecksumMismatch {
                offset,
                computed,
                stored,
            });
        }

        let mut decoder = Decoder {
            data: &data[4..checksum_offset],
            pos: 0,
            base: offset + 4,
        };

        let class = decoder.string()?;
        let version = decoder.u32()?;
        let count = decoder.u32()?;

        let mut fields = Vec::new();
        for _ in 0..count {
            let name = decoder.string()?;
            let container = decoder.tag("container", ContainerKind::from_tag)?;
            let structure = decoder.tag("struct", StructKind::from_tag)?;
            let primitive = decoder.tag("primitive", PrimitiveKind::from_tag)?;
            let field_type = FieldType::new(container, structure, primitive);

            let descriptor = FieldDescriptor::typed(name, field_type, version).map_err(|e| {
                PersistError::InvalidField {
                    offset: decoder.base + decoder.pos as u64,
                    reason: e.to_string(),
                }
            })?;
            let value = decoder.value(&field_type)?;
            fields.push((descriptor, value));
        }

        if decoder.pos != decoder.data.len() {
            return Err(PersistError::InvalidLength {
                offset,
                length: record_length,
            });
        }

        Ok((
            Self {
                class,
                version,
                fields,
            },
            record_length,
        ))
    }

    /// Writes the serialized record to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> PersistResult<()> {
        writer.write_all(&self.serialize())?;
        Ok(())
    }

    /// Reads every record from a stream of concatenated records.
    ///
    /// Any corruption fails the whole read.
    pub fn read_records<R: Read>(mut reader: R) -> PersistResult<Vec<Self>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < data.len() {
            let (record, consumed) = Self::deserialize_at(&data[offset..], offset as u64)?;
            records.push(record);
            offset += consumed;
        }

        Ok(records)
    }
}

impl RawFieldSource for ObjectRecord {
    fn stored_version(&self) -> u32 {
        self.version
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn get_all_fields(&self) -> Vec<(FieldDescriptor, FieldValue)> {
        self.fields.clone()
    }
}

// ==================
// Encoding
// ==================

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn encode_value(buf: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Scalar(cell) => encode_cell(buf, cell),
        FieldValue::Vector(cells) | FieldValue::String(cells) => {
            buf.extend_from_slice(&(cells.len() as u32).to_le_bytes());
            cells.iter().for_each(|cell| encode_cell(buf, cell));
        }
        FieldValue::Matrix { rows, cols, cells } => {
            buf.extend_from_slice(&rows.to_le_bytes());
            buf.extend_from_slice(&cols.to_le_bytes());
            cells.iter().for_each(|cell| encode_cell(buf, cell));
        }
    }
}

fn encode_cell(buf: &mut Vec<u8>, cell: &Cell) {
    match cell {
        Cell::Plain(p) => encode_primitive(buf, p),
        Cell::Str(items) => {
            buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
            items.iter().for_each(|p| encode_primitive(buf, p));
        }
        Cell::Sparse(entries) => {
            buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
            for entry in entries {
                buf.extend_from_slice(&entry.index.to_le_bytes());
                encode_primitive(buf, &entry.value);
            }
        }
    }
}

fn encode_primitive(buf: &mut Vec<u8>, p: &Primitive) {
    match *p {
        Primitive::Bool(v) => buf.push(v as u8),
        Primitive::Char(v) => buf.push(v),
        Primitive::Int8(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::UInt8(v) => buf.push(v),
        Primitive::Int16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::UInt16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::UInt32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::UInt64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Float32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Float64(v) | Primitive::FloatMax(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Primitive::Object(None) => buf.push(0),
        Primitive::Object(Some(handle)) => {
            buf.push(1);
            buf.extend_from_slice(&handle.0.to_le_bytes());
        }
    }
}

// ==================
// Decoding
// ==================

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]`, for error reports
    base: u64,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, n: usize) -> PersistResult<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if remaining < n {
            return Err(PersistError::Truncated {
                offset: self.base + self.pos as u64,
                needed: n - remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> PersistResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> PersistResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> PersistResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> PersistResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn tag<T>(&mut self, what: &'static str, parse: fn(u8) -> Option<T>) -> PersistResult<T> {
        let tag = self.u8()?;
        parse(tag).ok_or(PersistError::InvalidTag { what, tag })
    }

    fn value(&mut self, field_type: &FieldType) -> PersistResult<FieldValue> {
        let (structure, primitive) = (field_type.structure, field_type.primitive);
        Ok(match field_type.container {
            ContainerKind::Scalar => FieldValue::Scalar(self.cell(structure, primitive)?),
            ContainerKind::Vector => FieldValue::Vector(self.cells(None, structure, primitive)?),
            ContainerKind::String => FieldValue::String(self.cells(None, structure, primitive)?),
            ContainerKind::Matrix => {
                let rows = self.u32()?;
                let cols = self.u32()?;
                let count = (rows as usize).checked_mul(cols as usize).ok_or(
                    PersistError::InvalidLength {
                        offset: self.base + self.pos as u64,
                        length: usize::MAX,
                    },
                )?;
                let cells = self.cells(Some(count), structure, primitive)?;
                FieldValue::Matrix { rows, cols, cells }
            }
        })
    }

    /// `count` is read from the stream when not implied by the container
    fn cells(
        &mut self,
        count: Option<usize>,
        structure: StructKind,
        primitive: PrimitiveKind,
    ) -> PersistResult<Vec<Cell>> {
        let count = match count {
            Some(count) => count,
            None => self.u32()? as usize,
        };
        let mut cells = Vec::new();
        for _ in 0..count {
            cells.push(self.cell(structure, primitive)?);
        }
        Ok(cells)
    }

    fn cell(&mut self, structure: StructKind, primitive: PrimitiveKind) -> PersistResult<Cell> {
        Ok(match structure {
            StructKind::None => Cell::Plain(self.primitive(primitive)?),
            StructKind::StringStruct => {
                let len = self.u32()?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(self.primitive(primitive)?);
                }
                Cell::Str(items)
            }
            StructKind::Sparse => {
                let len = self.u32()?;
                let mut entries = Vec::new();
                for _ in 0..len {
                    let index = self.u32()?;
                    let value = self.primitive(primitive)?;
                    entries.push(SparseEntry { index, value });
                }
                Cell::Sparse(entries)
            }
        })
    }

    fn primitive(&mut self, kind: PrimitiveKind) -> PersistResult<Primitive> {
        Ok(match kind {
            PrimitiveKind::Bool => match self.u8()? {
                0 => Primitive::Bool(false),
                1 => Primitive::Bool(true),
                tag => return Err(PersistError::InvalidTag { what: "bool", tag }),
            },
            PrimitiveKind::Char => Primitive::Char(self.u8()?),
            PrimitiveKind::Int8 => Primitive::Int8(i8::from_le_bytes(self.array()?)),
            PrimitiveKind::UInt8 => Primitive::UInt8(self.u8()?),
            PrimitiveKind::Int16 => Primitive::Int16(i16::from_le_bytes(self.array()?)),
            PrimitiveKind::UInt16 => Primitive::UInt16(u16::from_le_bytes(self.array()?)),
            PrimitiveKind::Int32 => Primitive::Int32(i32::from_le_bytes(self.array()?)),
            PrimitiveKind::UInt32 => Primitive::UInt32(self.u32()?),
            PrimitiveKind::Int64 => Primitive::Int64(i64::from_le_bytes(self.array()?)),
            PrimitiveKind::UInt64 => Primitive::UInt64(u64::from_le_bytes(self.array()?)),
            PrimitiveKind::Float32 => Primitive::Float32(f32::from_le_bytes(self.array()?)),
            PrimitiveKind::Float64 => Primitive::Float64(f64::from_le_bytes(self.array()?)),
            PrimitiveKind::FloatMax => Primitive::FloatMax(f64::from_le_bytes(self.array()?)),
            PrimitiveKind::ObjectRef => match self.u8()? {
                0 => Primitive::Object(None),
                1 => Primitive::Object(Some(ObjectHandle(u64::from_le_bytes(self.array()?)))),
                tag => {
                    return Err(PersistError::InvalidTag {
                        what: "object reference",
                        tag,
                    })
                }
            },
        })
    }
}
