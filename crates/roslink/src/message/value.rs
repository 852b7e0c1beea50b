// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged field values.

use super::{FieldError, Message};
use crate::schema::{
    ArrayKind, Constant, ConstantValue, ElementType, FieldDescriptor, FieldType, MessageSchema,
    PrimitiveKind, SchemaError,
};

/// ROS `time`: seconds and nanoseconds since the epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    pub secs: u32,
    pub nsecs: u32,
}

impl Time {
    pub fn new(secs: u32, nsecs: u32) -> Self {
        Self { secs, nsecs }
    }
}

/// ROS `duration`: signed seconds and nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    pub secs: i32,
    pub nsecs: i32,
}

impl Duration {
    pub fn new(secs: i32, nsecs: i32) -> Self {
        Self { secs, nsecs }
    }
}

/// A value held by one message field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
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
    String(String),
    Time(Time),
    Duration(Duration),
    Message(Box<Message>),
    /// Homogeneous array (fixed or variable length).
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Default (zero) value for a primitive kind.
    pub fn default_primitive(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(false),
            PrimitiveKind::Int8 => Self::Int8(0),
            PrimitiveKind::UInt8 => Self::UInt8(0),
            PrimitiveKind::Int16 => Self::Int16(0),
            PrimitiveKind::UInt16 => Self::UInt16(0),
            PrimitiveKind::Int32 => Self::Int32(0),
            PrimitiveKind::UInt32 => Self::UInt32(0),
            PrimitiveKind::Int64 => Self::Int64(0),
            PrimitiveKind::UInt64 => Self::UInt64(0),
            PrimitiveKind::Float32 => Self::Float32(0.0),
            PrimitiveKind::Float64 => Self::Float64(0.0),
            PrimitiveKind::String => Self::String(String::new()),
            PrimitiveKind::Time => Self::Time(Time::default()),
            PrimitiveKind::Duration => Self::Duration(Duration::default()),
        }
    }

    /// Default value for a field of `schema`.
    ///
    /// Nested messages are built recursively; fixed arrays hold N defaults.
    pub fn default_for(schema: &MessageSchema, field: &FieldDescriptor) -> Result<Self, SchemaError> {
        if let Some(constant) = &field.constant {
            return Ok(Self::from_constant(field, constant));
        }
        let element = || -> Result<Self, SchemaError> {
            match &field.field_type.element {
                ElementType::Primitive(kind) => Ok(Self::default_primitive(*kind)),
                ElementType::Message(name) => {
                    let nested = schema.nested(name)?;
                    Ok(Self::Message(Box::new(Message::new(&nested)?)))
                }
            }
        };
        match field.field_type.array {
            ArrayKind::Scalar => element(),
            ArrayKind::Variable => Ok(Self::Array(Vec::new())),
            ArrayKind::Fixed(n) => (0..n).map(|_| element()).collect::<Result<_, _>>().map(Self::Array),
        }
    }

    /// Materialize a constant literal with its declared width.
    pub fn from_constant(field: &FieldDescriptor, constant: &Constant) -> Self {
        let kind = match field.field_type.element {
            ElementType::Primitive(kind) => kind,
            ElementType::Message(_) => return Self::String(constant.text.clone()),
        };
        match (&constant.value, kind) {
            (ConstantValue::Bool(v), _) => Self::Bool(*v),
            (ConstantValue::Int(v), PrimitiveKind::Int8) => Self::Int8(*v as i8),
            (ConstantValue::Int(v), PrimitiveKind::Int16) => Self::Int16(*v as i16),
            (ConstantValue::Int(v), PrimitiveKind::Int32) => Self::Int32(*v as i32),
            (ConstantValue::Int(v), _) => Self::Int64(*v),
            (ConstantValue::UInt(v), PrimitiveKind::UInt8) => Self::UInt8(*v as u8),
            (ConstantValue::UInt(v), PrimitiveKind::UInt16) => Self::UInt16(*v as u16),
            (ConstantValue::UInt(v), PrimitiveKind::UInt32) => Self::UInt32(*v as u32),
            (ConstantValue::UInt(v), _) => Self::UInt64(*v),
            (ConstantValue::Float(v), PrimitiveKind::Float32) => Self::Float32(*v as f32),
            (ConstantValue::Float(v), _) => Self::Float64(*v),
            (ConstantValue::String(s), _) => Self::String(s.clone()),
        }
    }

    /// Whether this value is valid for a field declared as `field_type`.
    pub fn conforms_to(&self, field_type: &FieldType) -> bool {
        match (field_type.array, self) {
            (ArrayKind::Scalar, value) => value.conforms_to_element(&field_type.element),
            (ArrayKind::Variable, Self::Array(items)) => {
                items.iter().all(|v| v.conforms_to_element(&field_type.element))
            }
            (ArrayKind::Fixed(n), Self::Array(items)) => {
                items.len() == n && items.iter().all(|v| v.conforms_to_element(&field_type.element))
            }
            _ => false,
        }
    }

    fn conforms_to_element(&self, element: &ElementType) -> bool {
        match (element, self) {
            (ElementType::Message(name), Self::Message(msg)) => msg.type_name() == name,
            (ElementType::Primitive(kind), value) => value.primitive_kind() == Some(*kind),
            _ => false,
        }
    }

    /// Primitive kind of a scalar value.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        let kind = match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Int8(_) => PrimitiveKind::Int8,
            Self::UInt8(_) => PrimitiveKind::UInt8,
            Self::Int16(_) => PrimitiveKind::Int16,
            Self::UInt16(_) => PrimitiveKind::UInt16,
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::UInt32(_) => PrimitiveKind::UInt32,
            Self::Int64(_) => PrimitiveKind::Int64,
            Self::UInt64(_) => PrimitiveKind::UInt64,
            Self::Float32(_) => PrimitiveKind::Float32,
            Self::Float64(_) => PrimitiveKind::Float64,
            Self::String(_) => PrimitiveKind::String,
            Self::Time(_) => PrimitiveKind::Time,
            Self::Duration(_) => PrimitiveKind::Duration,
            Self::Message(_) | Self::Array(_) => return None,
        };
        Some(kind)
    }

    /// Short type description used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Self::Message(msg) => msg.type_name().to_string(),
            Self::Array(items) => match items.first() {
                Some(first) => format!("{}[]", first.kind_name()),
                None => "[]".to_string(),
            },
            scalar => scalar
                .primitive_kind()
                .map(|k| k.ros_name().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(msg) => Some(&**msg),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Conversion out of a [`FieldValue`].
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

/// Conversion into a [`FieldValue`].
pub trait IntoFieldValue {
    fn into_field_value(self) -> FieldValue;
}

macro_rules! impl_field_value {
    ($ty:ty, $variant:ident) => {
        impl FromFieldValue for $ty {
            fn from_field_value(value: &FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl IntoFieldValue for $ty {
            fn into_field_value(self) -> FieldValue {
                FieldValue::$variant(self)
            }
        }

        impl From<$ty> for FieldValue {
            fn from(v: $ty) -> Self {
                FieldValue::$variant(v)
            }
        }
    };
}

impl_field_value!(bool, Bool);
impl_field_value!(i8, Int8);
impl_field_value!(u8, UInt8);
impl_field_value!(i16, Int16);
impl_field_value!(u16, UInt16);
impl_field_value!(i32, Int32);
impl_field_value!(u32, UInt32);
impl_field_value!(i64, Int64);
impl_field_value!(u64, UInt64);
impl_field_value!(f32, Float32);
impl_field_value!(f64, Float64);
impl_field_value!(String, String);
impl_field_value!(Time, Time);
impl_field_value!(Duration, Duration);

impl IntoFieldValue for &str {
    fn into_field_value(self) -> FieldValue {
        FieldValue::String(self.to_string())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl FromFieldValue for Message {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_message().cloned()
    }
}

impl IntoFieldValue for Message {
    fn into_field_value(self) -> FieldValue {
        FieldValue::Message(Box::new(self))
    }
}

impl<T: FromFieldValue> FromFieldValue for Vec<T> {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_array()?.iter().map(T::from_field_value).collect()
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Vec<T> {
    fn into_field_value(self) -> FieldValue {
        FieldValue::Array(self.into_iter().map(IntoFieldValue::into_field_value).collect())
    }
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl IntoFieldValue for FieldValue {
    fn into_field_value(self) -> FieldValue {
        self
    }
}

/// Build a `TypeMismatch` for a failed conversion.
pub(crate) fn conversion_error(type_name: &str, field: &str, expected: &str, got: &FieldValue) -> FieldError {
    FieldError::TypeMismatch {
        type_name: type_name.to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
        got: got.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_conversions() {
        let v = FieldValue::from(42u32);
        assert_eq!(u32::from_field_value(&v), Some(42));
        assert_eq!(i32::from_field_value(&v), None);
        assert_eq!(v.primitive_kind(), Some(PrimitiveKind::UInt32));

        let v = "hello".into_field_value();
        assert_eq!(String::from_field_value(&v).as_deref(), Some("hello"));
    }

    #[test]
    fn test_array_conversions() {
        let v = vec![1.0f64, 2.0, 3.0].into_field_value();
        assert_eq!(Vec::<f64>::from_field_value(&v), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(Vec::<f32>::from_field_value(&v), None);
        assert_eq!(v.kind_name(), "float64[]");
    }

    #[test]
    fn test_conforms_to() {
        let int_array = FieldType {
            element: ElementType::Primitive(PrimitiveKind::Int32),
            array: ArrayKind::Fixed(2),
        };
        assert!(vec![1i32, 2].into_field_value().conforms_to(&int_array));
        assert!(!vec![1i32].into_field_value().conforms_to(&int_array));
        assert!(!vec![1u32, 2].into_field_value().conforms_to(&int_array));
        assert!(!FieldValue::Int32(1).conforms_to(&int_array));

        let scalar = FieldType::scalar(ElementType::Primitive(PrimitiveKind::Time));
        assert!(FieldValue::Time(Time::new(1, 2)).conforms_to(&scalar));
        assert!(!FieldValue::UInt64(1).conforms_to(&scalar));
    }
}
