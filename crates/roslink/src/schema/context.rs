// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Immutable, cached message layout (`MessageContext` in ROS parlance).

use super::field::{ArrayKind, ElementType, FieldDescriptor};
use super::parser::{package_of, HEADER_TYPE};
use super::resolver::ResolverInner;
use super::SchemaError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Parsed, ordered field layout for one message type.
///
/// Field order is the wire order. Schemas are shared through `Arc` and never
/// mutated after construction; the checksum is computed once on demand.
pub struct MessageSchema {
    type_name: String,
    definition: String,
    fields: Vec<FieldDescriptor>,
    slots: HashMap<String, usize>,
    checksum: OnceLock<String>,
    min_size: OnceLock<usize>,
    resolver: Weak<ResolverInner>,
}

impl MessageSchema {
    pub(crate) fn new(
        type_name: impl Into<String>,
        definition: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        resolver: Weak<ResolverInner>,
    ) -> Self {
        let slots = fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .collect();
        Self {
            type_name: type_name.into(),
            definition: definition.into(),
            fields,
            slots,
            checksum: OnceLock::new(),
            min_size: OnceLock::new(),
            resolver,
        }
    }

    /// Fully qualified type name (`pkg/Name`).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn package(&self) -> Option<&str> {
        package_of(&self.type_name)
    }

    /// Definition text this schema was parsed from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// All fields (constants included) in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Non-constant fields in declaration (wire) order.
    pub fn wire_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_constant())
    }

    /// Slot index of a field.
    #[inline]
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.slot(name).map(|idx| &self.fields[idx])
    }

    /// Whether this is `std_msgs/Header`.
    pub fn is_header(&self) -> bool {
        self.type_name == HEADER_TYPE
    }

    /// Resolve a nested message type referenced by this schema.
    pub fn nested(&self, type_name: &str) -> Result<Arc<MessageSchema>, SchemaError> {
        let resolver = self.resolver.upgrade().ok_or(SchemaError::RegistryDropped)?;
        resolver.resolve(type_name)
    }

    /// Resolve the element schema of a message-typed field.
    pub fn nested_field(&self, field: &FieldDescriptor) -> Result<Option<Arc<MessageSchema>>, SchemaError> {
        match &field.field_type.element {
            ElementType::Message(name) => self.nested(name).map(Some),
            ElementType::Primitive(_) => Ok(None),
        }
    }

    /// Smallest encoding of this type in bytes: empty strings and variable
    /// arrays count their 4-byte prefix, nested messages count their own
    /// minimum.
    ///
    /// Fails with `RecursiveType` when the type contains itself by value,
    /// directly or through other types (`Node child`, `Node[2] pair`). Such a
    /// type has no finite instance. References through `T[]` are fine.
    pub fn min_wire_size(&self) -> Result<usize, SchemaError> {
        self.min_wire_size_visiting(&mut Vec::new())
    }

    fn min_wire_size_visiting(&self, visiting: &mut Vec<String>) -> Result<usize, SchemaError> {
        if let Some(size) = self.min_size.get() {
            return Ok(*size);
        }
        if visiting.iter().any(|name| *name == self.type_name) {
            return Err(SchemaError::RecursiveType(self.type_name.clone()));
        }
        visiting.push(self.type_name.clone());
        let mut total = 0usize;
        for field in self.wire_fields() {
            let count = match field.field_type.array {
                ArrayKind::Variable => {
                    total = total.saturating_add(4);
                    continue;
                }
                ArrayKind::Fixed(0) => continue,
                ArrayKind::Fixed(n) => n,
                ArrayKind::Scalar => 1,
            };
            let element = match &field.field_type.element {
                ElementType::Primitive(kind) => kind.size().unwrap_or(4),
                ElementType::Message(name) => self.nested(name)?.min_wire_size_visiting(visiting)?,
            };
            total = total.saturating_add(element.saturating_mul(count));
        }
        visiting.pop();
        Ok(*self.min_size.get_or_init(|| total))
    }

    /// ROS md5sum of this type (hex, lowercase).
    pub fn md5sum(&self) -> Result<String, SchemaError> {
        self.md5sum_visiting(&mut Vec::new())
    }

    pub(crate) fn md5sum_visiting(&self, visiting: &mut Vec<String>) -> Result<String, SchemaError> {
        if let Some(sum) = self.checksum.get() {
            return Ok(sum.clone());
        }
        let sum = super::checksum::compute_md5(self, visiting)?;
        Ok(self.checksum.get_or_init(|| sum).clone())
    }
}

impl fmt::Debug for MessageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSchema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl PartialEq for MessageSchema {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.fields == other.fields
    }
}

/// Request/response schema pair of a service type.
#[derive(Debug)]
pub struct ServiceSchema {
    pub type_name: String,
    pub request: Arc<MessageSchema>,
    pub response: Arc<MessageSchema>,
}

impl ServiceSchema {
    /// Service md5sum: checksum over request text followed by response text.
    pub fn md5sum(&self) -> Result<String, SchemaError> {
        super::checksum::compute_service_md5(&self.request, &self.response)
    }
}
