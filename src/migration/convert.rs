//! Representation conversion between two versions of a field
//!
//! Applied once per lineage step, so a value stored three versions ago is
//! converted through every intermediate type rather than straight to the
//! current one. A narrowing step in the middle of a chain therefore still
//! truncates (or fails) exactly as it would have when that version was
//! current.
//!
//! Supported changes:
//! - primitive kind: integer widening, checked narrowing, int <-> float,
//!   bool/char <-> integer, object -> object only
//! - container: Vector <-> String, Scalar -> Vector/String (singleton),
//!   Vector/String -> Matrix (one column), single row/column Matrix -> Vector
//! - struct kind: never

use crate::config::ConversionPolicy;
use crate::descriptor::{ContainerKind, FieldType, PrimitiveKind};

use super::value::{Cell, FieldValue, Primitive, SparseEntry};

type ConvertResult<T> = Result<T, String>;

/// Converts `value`, an instance of `from`, into an instance of `to`.
///
/// The error is a human-readable reason; callers attach class and field.
pub fn convert_value(
    value: FieldValue,
    from: &FieldType,
    to: &FieldType,
    policy: ConversionPolicy,
) -> ConvertResult<FieldValue> {
    if from == to {
        return Ok(value);
    }

    if from.structure != to.structure {
        return Err(format!(
            "struct kind changes from {} to {}",
            from.structure.as_str(),
            to.structure.as_str()
        ));
    }

    let value = rewrap(value, to.container)?;

    if from.primitive == to.primitive {
        return Ok(value);
    }

    let target = to.primitive;
    let convert_cells = |cells: Vec<Cell>| -> ConvertResult<Vec<Cell>> {
        cells
            .into_iter()
            .map(|cell| convert_cell(cell, target, policy))
            .collect()
    };

    Ok(match value {
        FieldValue::Scalar(cell) => FieldValue::Scalar(convert_cell(cell, target, policy)?),
        FieldValue::Vector(cells) => FieldValue::Vector(convert_cells(cells)?),
        FieldValue::String(cells) => FieldValue::String(convert_cells(cells)?),
        FieldValue::Matrix { rows, cols, cells } => FieldValue::Matrix {
            rows,
            cols,
            cells: convert_cells(cells)?,
        },
    })
}

/// Changes the container, keeping cells untouched.
fn rewrap(value: FieldValue, to: ContainerKind) -> ConvertResult<FieldValue> {
    let from = value.container();
    if from == to {
        return Ok(value);
    }

    match (value, to) {
        (FieldValue::Vector(cells), ContainerKind::String) => Ok(FieldValue::String(cells)),
        (FieldValue::String(cells), ContainerKind::Vector) => Ok(FieldValue::Vector(cells)),
        (FieldValue::Scalar(cell), ContainerKind::Vector) => Ok(FieldValue::Vector(vec![cell])),
        (FieldValue::Scalar(cell), ContainerKind::String) => Ok(FieldValue::String(vec![cell])),
        (FieldValue::Vector(cells) | FieldValue::String(cells), ContainerKind::Matrix) => {
            let rows = u32::try_from(cells.len())
                .map_err(|_| format!("{} elements do not fit a matrix column", cells.len()))?;
            Ok(FieldValue::Matrix { rows, cols: 1, cells })
        }
        (FieldValue::Matrix { rows, cols, cells }, ContainerKind::Vector) if rows == 1 || cols == 1 => {
            Ok(FieldValue::Vector(cells))
        }
        _ => Err(format!(
            "container changes from {} to {}",
            from.as_str(),
            to.as_str()
        )),
    }
}

fn convert_cell(cell: Cell, target: PrimitiveKind, policy: ConversionPolicy) -> ConvertResult<Cell> {
    Ok(match cell {
        Cell::Plain(p) => Cell::Plain(convert_primitive(p, target, policy)?),
        Cell::Str(items) => Cell::Str(
            items
                .into_iter()
                .map(|p| convert_primitive(p, target, policy))
                .collect::<ConvertResult<_>>()?,
        ),
        Cell::Sparse(entries) => Cell::Sparse(
            entries
                .into_iter()
                .map(|e| {
                    Ok(SparseEntry {
                        index: e.index,
                        value: convert_primitive(e.value, target, policy)?,
                    })
                })
                .collect::<ConvertResult<_>>()?,
        ),
    })
}

/// Numeric view of a primitive; i128 holds every integer kind exactly.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
}

fn numeric(p: Primitive) -> Option<Num> {
    Some(match p {
        Primitive::Bool(b) => Num::Int(b as i128),
        Primitive::Char(c) => Num::Int(c as i128),
        Primitive::Int8(v) => Num::Int(v as i128),
        Primitive::UInt8(v) => Num::Int(v as i128),
        Primitive::Int16(v) => Num::Int(v as i128),
        Primitive::UInt16(v) => Num::Int(v as i128),
        Primitive::Int32(v) => Num::Int(v as i128),
        Primitive::UInt32(v) => Num::Int(v as i128),
        Primitive::Int64(v) => Num::Int(v as i128),
        Primitive::UInt64(v) => Num::Int(v as i128),
        Primitive::Float32(v) => Num::Float(v as f64),
        Primitive::Float64(v) | Primitive::FloatMax(v) => Num::Float(v),
        Primitive::Object(_) => return None,
    })
}

/// Float to integer under the checked policy: finite, integral, in range.
fn checked_integral(f: f64, min: f64, max: f64, target: &str) -> ConvertResult<f64> {
    if !f.is_finite() {
        return Err(format!("{} is not finite and cannot become {}", f, target));
    }
    if f.fract() != 0.0 {
        return Err(format!("{} has a fractional part and cannot become {}", f, target));
    }
    // `max as f64` rounds up for 64-bit targets, so compare against max + 1
    if f < min || f >= max + 1.0 {
        return Err(format!("{} does not fit in {}", f, target));
    }
    Ok(f)
}

/// Integer to float under the checked policy: `back` is the integer the
/// float rounds to, and it must equal the original.
fn checked_exact(i: i128, back: i128, policy: ConversionPolicy, target: &str) -> ConvertResult<i128> {
    if policy == ConversionPolicy::Checked && back != i {
        return Err(format!("{} is not exactly representable as {}", i, target));
    }
    Ok(i)
}

macro_rules! to_int {
    ($num:expr, $policy:expr, $t:ty, $variant:ident, $label:expr) => {{
        let v: $t = match ($num, $policy) {
            (Num::Int(i), ConversionPolicy::Checked) => {
                <$t>::try_from(i).map_err(|_| format!("{} does not fit in {}", i, $label))?
            }
            (Num::Int(i), ConversionPolicy::Lossy) => i as $t,
            (Num::Float(f), ConversionPolicy::Checked) => {
                checked_integral(f, <$t>::MIN as f64, <$t>::MAX as f64, $label)? as $t
            }
            (Num::Float(f), ConversionPolicy::Lossy) => f as $t,
        };
        Primitive::$variant(v)
    }};
}

/// Converts one element to `target`.
pub fn convert_primitive(p: Primitive, target: PrimitiveKind, policy: ConversionPolicy) -> ConvertResult<Primitive> {
    if p.kind() == target {
        return Ok(p);
    }

    let num = numeric(p).ok_or_else(|| format!("object reference cannot become {}", target.as_str()))?;

    Ok(match target {
        PrimitiveKind::Bool => match (num, policy) {
            (Num::Int(0), _) => Primitive::Bool(false),
            (Num::Int(1), _) => Primitive::Bool(true),
            (Num::Float(f), ConversionPolicy::Checked) if f == 0.0 || f == 1.0 => Primitive::Bool(f == 1.0),
            (Num::Int(i), ConversionPolicy::Lossy) => Primitive::Bool(i != 0),
            (Num::Float(f), ConversionPolicy::Lossy) => Primitive::Bool(f != 0.0),
            (Num::Int(i), ConversionPolicy::Checked) => {
                return Err(format!("{} is not a boolean", i));
            }
            (Num::Float(f), ConversionPolicy::Checked) => {
                return Err(format!("{} is not a boolean", f));
            }
        },
        PrimitiveKind::Char => to_int!(num, policy, u8, Char, "char"),
        PrimitiveKind::Int8 => to_int!(num, policy, i8, Int8, "int8"),
        PrimitiveKind::UInt8 => to_int!(num, policy, u8, UInt8, "uint8"),
        PrimitiveKind::Int16 => to_int!(num, policy, i16, Int16, "int16"),
        PrimitiveKind::UInt16 => to_int!(num, policy, u16, UInt16, "uint16"),
        PrimitiveKind::Int32 => to_int!(num, policy, i32, Int32, "int32"),
        PrimitiveKind::UInt32 => to_int!(num, policy, u32, UInt32, "uint32"),
        PrimitiveKind::Int64 => to_int!(num, policy, i64, Int64, "int64"),
        PrimitiveKind::UInt64 => to_int!(num, policy, u64, UInt64, "uint64"),
        PrimitiveKind::Float32 => match num {
            Num::Int(i) => Primitive::Float32(checked_exact(i, i as f32 as i128, policy, "float32")? as f32),
            Num::Float(f) => {
                if policy == ConversionPolicy::Checked && f.is_finite() && f.abs() > f32::MAX as f64 {
                    return Err(format!("{} does not fit in float32", f));
                }
                Primitive::Float32(f as f32)
            }
        },
        PrimitiveKind::Float64 => match num {
            Num::Int(i) => Primitive::Float64(checked_exact(i, i as f64 as i128, policy, "float64")? as f64),
            Num::Float(f) => Primitive::Float64(f),
        },
        PrimitiveKind::FloatMax => match num {
            Num::Int(i) => Primitive::FloatMax(checked_exact(i, i as f64 as i128, policy, "floatmax")? as f64),
            Num::Float(f) => Primitive::FloatMax(f),
        },
        PrimitiveKind::ObjectRef => {
            return Err(format!("{} cannot become an object reference", p.kind().as_str()));
        }
    })
}
