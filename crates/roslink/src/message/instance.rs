// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic message container.

use super::value::{conversion_error, FromFieldValue, IntoFieldValue};
use super::{FieldError, FieldValue};
use crate::schema::{FieldDescriptor, MessageSchema, SchemaError};
use crate::wire::{self, WireError, WireReader, WireWriter};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Runtime message instance conforming to a [`MessageSchema`].
///
/// Values live in a slot vector aligned with `schema.fields()`; the field set
/// is fixed at construction. Two messages with the same type and equal values
/// compare equal.
#[derive(Clone)]
pub struct Message {
    schema: Arc<MessageSchema>,
    values: Vec<FieldValue>,
}

impl Message {
    /// Create a message with default values for every field.
    ///
    /// Fails with `RecursiveType` for a type that contains itself by value.
    pub fn new(schema: &Arc<MessageSchema>) -> Result<Self, SchemaError> {
        schema.min_wire_size()?;
        let values = schema
            .fields()
            .iter()
            .map(|field| FieldValue::default_for(schema, field))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema: schema.clone(),
            values,
        })
    }

    /// Assemble from an already-validated slot vector.
    pub(crate) fn from_parts(schema: Arc<MessageSchema>, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(schema.fields().len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<MessageSchema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// Slot vector (constants included), aligned with `schema().fields()`.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    fn slot(&self, name: &str) -> Result<usize, FieldError> {
        self.schema.slot(name).ok_or_else(|| FieldError::NoSuchField {
            type_name: self.type_name().to_string(),
            field: name.to_string(),
        })
    }

    /// Raw value of a field (constants included).
    pub fn get_value(&self, name: &str) -> Result<&FieldValue, FieldError> {
        let slot = self.slot(name)?;
        Ok(&self.values[slot])
    }

    /// Typed read of a field.
    pub fn get<T: FromFieldValue>(&self, name: &str) -> Result<T, FieldError> {
        let slot = self.slot(name)?;
        let value = &self.values[slot];
        T::from_field_value(value).ok_or_else(|| {
            let expected = self.schema.fields()[slot].field_type.to_string();
            conversion_error(self.type_name(), name, &expected, value)
        })
    }

    /// Nested message stored in a scalar message field.
    pub fn get_message(&self, name: &str) -> Result<&Message, FieldError> {
        let value = self.get_value(name)?;
        value
            .as_message()
            .ok_or_else(|| conversion_error(self.type_name(), name, "message", value))
    }

    /// Mutable access to a nested message, for in-place edits.
    pub fn get_message_mut(&mut self, name: &str) -> Result<&mut Message, FieldError> {
        let slot = self.writable_slot(name)?;
        let type_name = self.schema.type_name().to_string();
        match &mut self.values[slot] {
            FieldValue::Message(msg) => Ok(msg),
            other => Err(conversion_error(&type_name, name, "message", other)),
        }
    }

    /// Typed write of a field.
    pub fn set<T: IntoFieldValue>(&mut self, name: &str, value: T) -> Result<(), FieldError> {
        self.set_value(name, value.into_field_value())
    }

    /// Write a raw value after checking it against the declared type.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let slot = self.writable_slot(name)?;
        let field = &self.schema.fields()[slot];
        if !value.conforms_to(&field.field_type) {
            return Err(conversion_error(
                self.schema.type_name(),
                name,
                &field.field_type.to_string(),
                &value,
            ));
        }
        self.values[slot] = value;
        Ok(())
    }

    fn writable_slot(&self, name: &str) -> Result<usize, FieldError> {
        let slot = self.slot(name)?;
        if self.schema.fields()[slot].is_constant() {
            return Err(FieldError::ImmutableField {
                type_name: self.type_name().to_string(),
                field: name.to_string(),
            });
        }
        Ok(slot)
    }

    /// Non-constant fields with their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .filter(|(field, _)| !field.is_constant())
    }

    /// Encode to ROS wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        wire::serialize(&self.schema, &self.values)
    }

    /// Append the wire encoding to an existing writer.
    pub fn write_to(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        wire::encode_fields(writer, &self.schema, &self.values)
    }

    /// Decode a message of type `schema` from wire bytes.
    pub fn from_bytes(schema: &Arc<MessageSchema>, bytes: &[u8]) -> Result<Self, WireError> {
        let values = wire::deserialize(schema, bytes)?;
        Ok(Self::from_parts(schema.clone(), values))
    }

    /// Replace every value with the decoding of `bytes`.
    ///
    /// On error the message keeps its previous values.
    pub fn decode_into(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let mut reader = WireReader::new(bytes);
        self.values = wire::decode_fields(&mut reader, &self.schema)?;
        Ok(())
    }

    /// Number of bytes `to_bytes` would produce.
    pub fn serialized_len(&self) -> Result<usize, WireError> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer)?;
        Ok(writer.len())
    }

    /// Typed read through a pre-resolved key.
    pub fn read<T: FromFieldValue>(&self, key: &FieldKey<T>) -> Result<T, FieldError> {
        let value = self.keyed_slot(key)?;
        T::from_field_value(value)
            .ok_or_else(|| conversion_error(self.type_name(), &key.name, "keyed type", value))
    }

    /// Typed write through a pre-resolved key.
    pub fn write<T: IntoFieldValue>(&mut self, key: &FieldKey<T>, value: T) -> Result<(), FieldError> {
        if !Arc::ptr_eq(&key.schema, &self.schema) {
            return self.set(&key.name, value);
        }
        let field = &self.schema.fields()[key.slot];
        if field.is_constant() {
            return Err(FieldError::ImmutableField {
                type_name: self.type_name().to_string(),
                field: key.name.clone(),
            });
        }
        let value = value.into_field_value();
        if !value.conforms_to(&field.field_type) {
            return Err(conversion_error(
                self.schema.type_name(),
                &key.name,
                &field.field_type.to_string(),
                &value,
            ));
        }
        self.values[key.slot] = value;
        Ok(())
    }

    fn keyed_slot<T>(&self, key: &FieldKey<T>) -> Result<&FieldValue, FieldError> {
        if Arc::ptr_eq(&key.schema, &self.schema) {
            Ok(&self.values[key.slot])
        } else {
            self.get_value(&key.name)
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.values == other.values
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (field, value) in self.fields() {
            s.field(&field.name, value);
        }
        s.finish()
    }
}

/// A field slot resolved once against a schema, for repeated typed access.
///
/// Keys used on a message of a different schema instance fall back to a
/// by-name lookup.
pub struct FieldKey<T> {
    schema: Arc<MessageSchema>,
    name: String,
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldKey<T> {
    /// Resolve `name` in `schema`. Constants can be read but not written.
    pub fn new(schema: &Arc<MessageSchema>, name: &str) -> Result<Self, FieldError> {
        let slot = schema.slot(name).ok_or_else(|| FieldError::NoSuchField {
            type_name: schema.type_name().to_string(),
            field: name.to_string(),
        })?;
        Ok(Self {
            schema: schema.clone(),
            name: name.to_string(),
            slot,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.schema.fields()[self.slot]
    }
}

impl<T> Clone for FieldKey<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            name: self.name.clone(),
            slot: self.slot,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FieldKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKey")
            .field("type_name", &self.schema.type_name())
            .field("name", &self.name)
            .field("slot", &self.slot)
            .finish()
    }
}
