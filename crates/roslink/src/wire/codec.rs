// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven encoder/decoder.
//!
//! Fields are processed strictly in declaration order; constants are never
//! written or read. Nested messages are inlined without a length prefix.

use super::cursor::{WireReader, WireWriter};
use super::WireError;
use crate::message::{Duration, FieldValue, Message, Time};
use crate::schema::{ArrayKind, ElementType, FieldDescriptor, MessageSchema, PrimitiveKind};
use std::sync::Arc;

/// Serialize a slot vector (one value per schema field) to bytes.
pub fn serialize(schema: &MessageSchema, values: &[FieldValue]) -> Result<Vec<u8>, WireError> {
    let mut writer = WireWriter::with_capacity(64);
    encode_fields(&mut writer, schema, values)?;
    Ok(writer.into_bytes())
}

/// Deepest chain of nested messages accepted on decode.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Largest count accepted for a variable array whose elements may encode to
/// zero bytes (`std_msgs/Empty[]`), where the payload size gives no bound.
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

/// Deserialize bytes into a slot vector for `schema`.
///
/// Constant slots are filled from the schema. Trailing bytes are ignored.
pub fn deserialize(schema: &Arc<MessageSchema>, bytes: &[u8]) -> Result<Vec<FieldValue>, WireError> {
    let mut reader = WireReader::new(bytes);
    decode_fields(&mut reader, schema)
}

pub(crate) fn encode_fields(
    writer: &mut WireWriter,
    schema: &MessageSchema,
    values: &[FieldValue],
) -> Result<(), WireError> {
    if values.len() != schema.fields().len() {
        return Err(WireError::ValueMismatch {
            field: schema.type_name().to_string(),
            expected: format!("{} slots", schema.fields().len()),
            got: format!("{} slots", values.len()),
        });
    }
    for (field, value) in schema.fields().iter().zip(values) {
        if field.is_constant() {
            continue;
        }
        encode_field(writer, field, value)?;
    }
    Ok(())
}

fn encode_field(writer: &mut WireWriter, field: &FieldDescriptor, value: &FieldValue) -> Result<(), WireError> {
    let element = &field.field_type.element;
    match field.field_type.array {
        ArrayKind::Scalar => encode_element(writer, field, element, value),
        ArrayKind::Variable | ArrayKind::Fixed(_) => {
            let FieldValue::Array(items) = value else {
                return Err(mismatch(field, "array", value));
            };
            match field.field_type.array {
                ArrayKind::Fixed(n) if items.len() != n => {
                    return Err(WireError::FixedArrayLength {
                        field: field.name.clone(),
                        expected: n,
                        got: items.len(),
                    });
                }
                ArrayKind::Fixed(_) => {}
                _ => writer.write_len(items.len())?,
            }
            for item in items {
                encode_element(writer, field, element, item)?;
            }
            Ok(())
        }
    }
}

fn encode_element(
    writer: &mut WireWriter,
    field: &FieldDescriptor,
    element: &ElementType,
    value: &FieldValue,
) -> Result<(), WireError> {
    match (element, value) {
        (ElementType::Message(type_name), FieldValue::Message(msg)) => {
            if msg.type_name() != type_name {
                return Err(mismatch(field, type_name, value));
            }
            encode_fields(writer, msg.schema(), msg.values())
        }
        (ElementType::Primitive(kind), _) => encode_primitive(writer, field, *kind, value),
        (ElementType::Message(type_name), _) => Err(mismatch(field, type_name, value)),
    }
}

// @audit-ok: dispatch table over primitive kinds
fn encode_primitive(
    writer: &mut WireWriter,
    field: &FieldDescriptor,
    kind: PrimitiveKind,
    value: &FieldValue,
) -> Result<(), WireError> {
    match (kind, value) {
        (PrimitiveKind::Bool, FieldValue::Bool(v)) => writer.write_u8(u8::from(*v)),
        (PrimitiveKind::Int8, FieldValue::Int8(v)) => writer.write_i8(*v),
        (PrimitiveKind::UInt8, FieldValue::UInt8(v)) => writer.write_u8(*v),
        (PrimitiveKind::Int16, FieldValue::Int16(v)) => writer.write_i16(*v),
        (PrimitiveKind::UInt16, FieldValue::UInt16(v)) => writer.write_u16(*v),
        (PrimitiveKind::Int32, FieldValue::Int32(v)) => writer.write_i32(*v),
        (PrimitiveKind::UInt32, FieldValue::UInt32(v)) => writer.write_u32(*v),
        (PrimitiveKind::Int64, FieldValue::Int64(v)) => writer.write_i64(*v),
        (PrimitiveKind::UInt64, FieldValue::UInt64(v)) => writer.write_u64(*v),
        (PrimitiveKind::Float32, FieldValue::Float32(v)) => writer.write_f32(*v),
        (PrimitiveKind::Float64, FieldValue::Float64(v)) => writer.write_f64(*v),
        (PrimitiveKind::String, FieldValue::String(s)) => writer.write_string(s)?,
        (PrimitiveKind::Time, FieldValue::Time(t)) => {
            writer.write_u32(t.secs);
            writer.write_u32(t.nsecs);
        }
        (PrimitiveKind::Duration, FieldValue::Duration(d)) => {
            writer.write_i32(d.secs);
            writer.write_i32(d.nsecs);
        }
        _ => return Err(mismatch(field, kind.ros_name(), value)),
    }
    Ok(())
}

pub(crate) fn decode_fields(
    reader: &mut WireReader<'_>,
    schema: &Arc<MessageSchema>,
) -> Result<Vec<FieldValue>, WireError> {
    // Rejects types that contain themselves by value before any recursion.
    schema.min_wire_size()?;
    decode_nested(reader, schema, 0)
}

fn decode_nested(
    reader: &mut WireReader<'_>,
    schema: &Arc<MessageSchema>,
    depth: usize,
) -> Result<Vec<FieldValue>, WireError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(WireError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }
    let mut values = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let value = match &field.constant {
            Some(constant) => FieldValue::from_constant(field, constant),
            None => decode_field(reader, schema, field, depth)?,
        };
        values.push(value);
    }
    Ok(values)
}

fn decode_field(
    reader: &mut WireReader<'_>,
    schema: &Arc<MessageSchema>,
    field: &FieldDescriptor,
    depth: usize,
) -> Result<FieldValue, WireError> {
    let element = &field.field_type.element;
    let nested = schema.nested_field(field)?;
    let len = match field.field_type.array {
        ArrayKind::Scalar => return decode_element(reader, element, nested.as_ref(), depth),
        ArrayKind::Fixed(n) => n,
        ArrayKind::Variable => {
            let min_size = match &nested {
                Some(schema) => schema.min_wire_size()?,
                None => min_encoded_size(element),
            };
            let len = reader.read_len(min_size)?;
            if min_size == 0 && len > MAX_EMPTY_ELEMENTS {
                return Err(WireError::TooManyElements {
                    field: field.name.clone(),
                    count: len,
                    limit: MAX_EMPTY_ELEMENTS,
                });
            }
            len
        }
    };
    let mut items = Vec::with_capacity(len.min(reader.remaining()));
    for _ in 0..len {
        items.push(decode_element(reader, element, nested.as_ref(), depth)?);
    }
    Ok(FieldValue::Array(items))
}

fn decode_element(
    reader: &mut WireReader<'_>,
    element: &ElementType,
    nested: Option<&Arc<MessageSchema>>,
    depth: usize,
) -> Result<FieldValue, WireError> {
    match (element, nested) {
        (ElementType::Primitive(kind), _) => decode_primitive(reader, *kind),
        (ElementType::Message(_), Some(schema)) => {
            let values = decode_nested(reader, schema, depth + 1)?;
            Ok(FieldValue::Message(Box::new(Message::from_parts(schema.clone(), values))))
        }
        (ElementType::Message(name), None) => Err(WireError::Schema(
            crate::schema::SchemaError::UnknownType(name.clone()),
        )),
    }
}

fn decode_primitive(reader: &mut WireReader<'_>, kind: PrimitiveKind) -> Result<FieldValue, WireError> {
    let value = match kind {
        PrimitiveKind::Bool => FieldValue::Bool(reader.read_u8()? != 0),
        PrimitiveKind::Int8 => FieldValue::Int8(reader.read_i8()?),
        PrimitiveKind::UInt8 => FieldValue::UInt8(reader.read_u8()?),
        PrimitiveKind::Int16 => FieldValue::Int16(reader.read_i16()?),
        PrimitiveKind::UInt16 => FieldValue::UInt16(reader.read_u16()?),
        PrimitiveKind::Int32 => FieldValue::Int32(reader.read_i32()?),
        PrimitiveKind::UInt32 => FieldValue::UInt32(reader.read_u32()?),
        PrimitiveKind::Int64 => FieldValue::Int64(reader.read_i64()?),
        PrimitiveKind::UInt64 => FieldValue::UInt64(reader.read_u64()?),
        PrimitiveKind::Float32 => FieldValue::Float32(reader.read_f32()?),
        PrimitiveKind::Float64 => FieldValue::Float64(reader.read_f64()?),
        PrimitiveKind::String => FieldValue::String(reader.read_string()?),
        PrimitiveKind::Time => {
            let secs = reader.read_u32()?;
            let nsecs = reader.read_u32()?;
            FieldValue::Time(Time { secs, nsecs })
        }
        PrimitiveKind::Duration => {
            let secs = reader.read_i32()?;
            let nsecs = reader.read_i32()?;
            FieldValue::Duration(Duration { secs, nsecs })
        }
    };
    Ok(value)
}

/// Lower bound on the encoded size of one primitive element.
fn min_encoded_size(element: &ElementType) -> usize {
    match element {
        ElementType::Primitive(PrimitiveKind::String) => 4,
        ElementType::Primitive(kind) => kind.size().unwrap_or(0),
        ElementType::Message(_) => 0,
    }
}

fn mismatch(field: &FieldDescriptor, expected: &str, got: &FieldValue) -> WireError {
    WireError::ValueMismatch {
        field: field.name.clone(),
        expected: expected.to_string(),
        got: got.kind_name(),
    }
}
