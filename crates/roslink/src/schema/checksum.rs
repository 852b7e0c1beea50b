// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ROS md5sum computation.
//!
//! The hashed text lists constants first (`type NAME=value`), then fields;
//! primitive fields keep their declared type text, nested message fields are
//! replaced by the nested type's own md5sum (array qualifier dropped).

use super::context::MessageSchema;
use super::SchemaError;
use md5::{Digest, Md5};

pub(crate) fn compute_md5(schema: &MessageSchema, visiting: &mut Vec<String>) -> Result<String, SchemaError> {
    let text = md5_text(schema, visiting)?;
    Ok(hex_digest(text.as_bytes()))
}

pub(crate) fn compute_service_md5(
    request: &MessageSchema,
    response: &MessageSchema,
) -> Result<String, SchemaError> {
    let mut text = md5_text(request, &mut Vec::new())?;
    text.push_str(&md5_text(response, &mut Vec::new())?);
    Ok(hex_digest(text.as_bytes()))
}

/// Canonical text hashed for `schema`.
pub fn md5_text(schema: &MessageSchema, visiting: &mut Vec<String>) -> Result<String, SchemaError> {
    if visiting.iter().any(|t| t == schema.type_name()) {
        return Err(SchemaError::RecursiveType(schema.type_name().to_string()));
    }
    visiting.push(schema.type_name().to_string());

    let mut lines = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        if let Some(constant) = &field.constant {
            lines.push(format!("{} {}={}", field.declared_type, field.name, constant.text));
        }
    }
    for field in schema.wire_fields() {
        match field.field_type.element.message_type() {
            None => lines.push(format!("{} {}", field.declared_type, field.name)),
            Some(nested) => {
                let sum = schema.nested(nested)?.md5sum_visiting(visiting)?;
                lines.push(format!("{} {}", sum, field.name));
            }
        }
    }

    visiting.pop();
    Ok(lines.join("\n"))
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
