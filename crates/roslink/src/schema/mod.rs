// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message schemas: parsing, resolution and checksums.
//!
//! A definition such as
//!
//! ```text
//! Header header
//! uint8 MODE_IDLE=0
//! uint8 mode
//! geometry_msgs/Point[] path
//! ```
//!
//! is parsed into a [`MessageSchema`]: an ordered list of [`FieldDescriptor`]s
//! whose order is the wire order. Schemas are resolved through a
//! [`MessageDefinitionProvider`] and cached by type name for the lifetime of
//! the [`SchemaResolver`]; nested types resolve lazily through the same cache.
//!
//! # Example
//!
//! ```rust
//! use roslink::schema::{MapDefinitionProvider, SchemaResolver};
//! use std::sync::Arc;
//!
//! let provider = MapDefinitionProvider::new().with("std_msgs/String", "string data");
//! let resolver = SchemaResolver::new(Arc::new(provider));
//! let schema = resolver.resolve("std_msgs/String").unwrap();
//! assert_eq!(schema.md5sum().unwrap(), "992ce8a1687cec8c8bd883ec73ca41d1");
//! ```

mod checksum;
mod context;
mod field;
mod loader;
mod parser;
mod resolver;

pub use checksum::md5_text;
pub use context::{MessageSchema, ServiceSchema};
pub use field::{
    ArrayKind, Constant, ConstantValue, ElementType, FieldDescriptor, FieldType, PrimitiveKind,
};
pub use loader::MessageLoader;
pub use parser::{
    package_of, parse_definition, qualify_type_name, split_service, HEADER_TYPE,
    SERVICE_SEPARATOR,
};
pub use resolver::{MapDefinitionProvider, MessageDefinitionProvider, SchemaResolver};

use std::fmt;

/// Errors raised while resolving a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// No definition is known for this type name.
    UnknownType(String),
    /// A definition line could not be parsed.
    MalformedLine {
        type_name: String,
        line_number: usize,
        line: String,
        reason: String,
    },
    /// Two fields (or constants) share a name.
    DuplicateField { type_name: String, field: String },
    /// A field references a message type with no definition.
    UnknownNestedType {
        type_name: String,
        field: String,
        nested: String,
    },
    /// A constant literal does not fit its declared type.
    InvalidConstant {
        type_name: String,
        name: String,
        literal: String,
    },
    /// A checksum was requested for a type that contains itself.
    RecursiveType(String),
    /// The resolver owning this schema no longer exists.
    RegistryDropped,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "unknown message type: {}", name),
            Self::MalformedLine {
                type_name,
                line_number,
                line,
                reason,
            } => write!(
                f,
                "{}:{}: {} (`{}`)",
                type_name, line_number, reason, line
            ),
            Self::DuplicateField { type_name, field } => {
                write!(f, "{}: duplicate field `{}`", type_name, field)
            }
            Self::UnknownNestedType {
                type_name,
                field,
                nested,
            } => write!(
                f,
                "{}: field `{}` references unknown type {}",
                type_name, field, nested
            ),
            Self::InvalidConstant {
                type_name,
                name,
                literal,
            } => write!(
                f,
                "{}: invalid literal `{}` for constant {}",
                type_name, literal, name
            ),
            Self::RecursiveType(name) => write!(f, "recursive type: {}", name),
            Self::RegistryDropped => write!(f, "schema resolver dropped"),
        }
    }
}

impl std::error::Error for SchemaError {}
