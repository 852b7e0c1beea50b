// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Line-oriented parser for `.msg` / `.srv` definition text.
//!
//! ```text
//! # comment
//! uint8 KIND_A=1          <- constant
//! string LABEL=hi # there <- string constant keeps the whole right-hand side
//! Header header           <- nested message (std_msgs/Header)
//! float64[] samples       <- variable array
//! uint8[16] id            <- fixed array
//! ```

use super::field::{ArrayKind, ConstantValue, ElementType, FieldDescriptor, FieldType, PrimitiveKind};
use super::SchemaError;
use std::collections::HashSet;

/// Line separating request and response in a service definition.
pub const SERVICE_SEPARATOR: &str = "---";

/// Fully qualified name of the header type.
pub const HEADER_TYPE: &str = "std_msgs/Header";

/// Parse a message definition into its ordered field layout.
pub fn parse_definition(type_name: &str, text: &str) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let package = package_of(type_name);
    let mut fields = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let clean = strip_comment(raw_line);
        if clean.is_empty() {
            continue;
        }

        let malformed = |reason: &str| SchemaError::MalformedLine {
            type_name: type_name.to_string(),
            line_number,
            line: raw_line.to_string(),
            reason: reason.to_string(),
        };

        let field = if clean.contains('=') {
            parse_constant(type_name, raw_line, clean, line_number)?
        } else {
            let mut tokens = clean.split_whitespace();
            let (Some(declared), Some(name), None) = (tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(malformed("expected `<type> <name>`"));
            };
            if !is_valid_field_name(name) {
                return Err(malformed("invalid field name"));
            }
            let field_type = parse_field_type(declared, package).map_err(|reason| malformed(&reason))?;
            FieldDescriptor::new(name, field_type, declared)
        };

        if !seen.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateField {
                type_name: type_name.to_string(),
                field: field.name,
            });
        }
        fields.push(field);
    }

    Ok(fields)
}

/// Split a combined service definition into (request, response) text.
pub fn split_service(type_name: &str, text: &str) -> Result<(String, String), SchemaError> {
    let mut request = Vec::new();
    let mut response = Vec::new();
    let mut separator_line = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim() == SERVICE_SEPARATOR {
            if separator_line.is_some() {
                return Err(SchemaError::MalformedLine {
                    type_name: type_name.to_string(),
                    line_number: index + 1,
                    line: line.to_string(),
                    reason: "more than one service separator".to_string(),
                });
            }
            separator_line = Some(index);
            continue;
        }
        if separator_line.is_some() {
            response.push(line);
        } else {
            request.push(line);
        }
    }

    if separator_line.is_none() {
        return Err(SchemaError::MalformedLine {
            type_name: type_name.to_string(),
            line_number: 0,
            line: String::new(),
            reason: "service definition has no `---` separator".to_string(),
        });
    }

    Ok((request.join("\n"), response.join("\n")))
}

/// Package part of a `pkg/Name` type name.
pub fn package_of(type_name: &str) -> Option<&str> {
    type_name.split_once('/').map(|(pkg, _)| pkg)
}

/// Qualify a nested type reference relative to the declaring package.
pub fn qualify_type_name(base: &str, package: Option<&str>) -> String {
    if base == "Header" {
        return HEADER_TYPE.to_string();
    }
    if base.contains('/') {
        return base.to_string();
    }
    match package {
        Some(pkg) => format!("{}/{}", pkg, base),
        None => base.to_string(),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

fn parse_constant(
    type_name: &str,
    raw_line: &str,
    clean: &str,
    line_number: usize,
) -> Result<FieldDescriptor, SchemaError> {
    let malformed = |reason: &str| SchemaError::MalformedLine {
        type_name: type_name.to_string(),
        line_number,
        line: raw_line.to_string(),
        reason: reason.to_string(),
    };

    let declared = clean
        .split_whitespace()
        .next()
        .ok_or_else(|| malformed("missing constant type"))?;
    let kind = PrimitiveKind::from_ros_name(declared)
        .filter(PrimitiveKind::allows_constant)
        .ok_or_else(|| malformed("constants must have a primitive, non-time type"))?;

    // String constants take everything right of `=`, comment markers included.
    let source = if kind == PrimitiveKind::String {
        raw_line.trim()
    } else {
        clean
    };
    let (lhs, rhs) = source
        .split_once('=')
        .ok_or_else(|| malformed("missing `=`"))?;
    let name = lhs[declared.len()..].trim();
    if !is_valid_field_name(name) {
        return Err(malformed("invalid constant name"));
    }
    let text = rhs.trim();
    let value = parse_literal(kind, text).ok_or_else(|| SchemaError::InvalidConstant {
        type_name: type_name.to_string(),
        name: name.to_string(),
        literal: text.to_string(),
    })?;

    Ok(FieldDescriptor::new(
        name,
        FieldType::scalar(ElementType::Primitive(kind)),
        declared,
    )
    .with_constant(value, text))
}

fn parse_literal(kind: PrimitiveKind, text: &str) -> Option<ConstantValue> {
    let value = match kind {
        PrimitiveKind::Bool => match text {
            "true" | "True" | "1" => ConstantValue::Bool(true),
            "false" | "False" | "0" => ConstantValue::Bool(false),
            _ => return None,
        },
        PrimitiveKind::Int8 => ConstantValue::Int(text.parse::<i8>().ok()? as i64),
        PrimitiveKind::Int16 => ConstantValue::Int(text.parse::<i16>().ok()? as i64),
        PrimitiveKind::Int32 => ConstantValue::Int(text.parse::<i32>().ok()? as i64),
        PrimitiveKind::Int64 => ConstantValue::Int(text.parse::<i64>().ok()?),
        PrimitiveKind::UInt8 => ConstantValue::UInt(text.parse::<u8>().ok()? as u64),
        PrimitiveKind::UInt16 => ConstantValue::UInt(text.parse::<u16>().ok()? as u64),
        PrimitiveKind::UInt32 => ConstantValue::UInt(text.parse::<u32>().ok()? as u64),
        PrimitiveKind::UInt64 => ConstantValue::UInt(text.parse::<u64>().ok()?),
        PrimitiveKind::Float32 | PrimitiveKind::Float64 => ConstantValue::Float(text.parse().ok()?),
        PrimitiveKind::String => ConstantValue::String(text.to_string()),
        PrimitiveKind::Time | PrimitiveKind::Duration => return None,
    };
    Some(value)
}

fn parse_field_type(declared: &str, package: Option<&str>) -> Result<FieldType, String> {
    let (base, array) = match declared.find('[') {
        Some(open) => {
            let close = declared
                .strip_suffix(']')
                .ok_or_else(|| "unterminated array qualifier".to_string())?;
            let inner = &close[open + 1..];
            let array = if inner.is_empty() {
                ArrayKind::Variable
            } else {
                let len = inner
                    .parse::<usize>()
                    .map_err(|_| format!("invalid array length `{}`", inner))?;
                ArrayKind::Fixed(len)
            };
            (&declared[..open], array)
        }
        None => (declared, ArrayKind::Scalar),
    };

    let element = match PrimitiveKind::from_ros_name(base) {
        Some(kind) => ElementType::Primitive(kind),
        None if is_valid_type_name(base) => ElementType::Message(qualify_type_name(base, package)),
        None => return Err(format!("invalid type name `{}`", base)),
    };

    Ok(FieldType { element, array })
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_type_name(name: &str) -> bool {
    let mut parts = name.split('/');
    let valid = |part: &str| is_valid_field_name(part);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ty), None, None) => valid(ty),
        (Some(pkg), Some(ty), None) => valid(pkg) && valid(ty),
        _ => false,
    }
}
