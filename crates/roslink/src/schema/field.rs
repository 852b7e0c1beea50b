// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field descriptors for parsed message definitions.

use std::fmt;

/// Primitive field kinds understood by the ROS1 message grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Time,
    Duration,
}

impl PrimitiveKind {
    /// Map a declared type name to a primitive kind.
    ///
    /// `byte` and `char` are the deprecated aliases for `int8` and `uint8`.
    pub fn from_ros_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => Self::Bool,
            "int8" | "byte" => Self::Int8,
            "uint8" | "char" => Self::UInt8,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "string" => Self::String,
            "time" => Self::Time,
            "duration" => Self::Duration,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical ROS name of this kind.
    pub fn ros_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Time => "time",
            Self::Duration => "duration",
        }
    }

    /// Encoded size in bytes (None for strings).
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Time | Self::Duration => Some(8),
            Self::String => None,
        }
    }

    /// Whether a constant of this kind may be declared.
    pub fn allows_constant(&self) -> bool {
        !matches!(self, Self::Time | Self::Duration)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ros_name())
    }
}

/// Element type of a field: a primitive or a (fully qualified) message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    Primitive(PrimitiveKind),
    Message(String),
}

impl ElementType {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Nested message type name, if any.
    pub fn message_type(&self) -> Option<&str> {
        match self {
            Self::Message(name) => Some(name),
            Self::Primitive(_) => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p),
            Self::Message(name) => f.write_str(name),
        }
    }
}

/// Array qualifier of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// Plain scalar field.
    Scalar,
    /// `T[]`: length-prefixed on the wire.
    Variable,
    /// `T[N]`: exactly N elements, no prefix on the wire.
    Fixed(usize),
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub element: ElementType,
    pub array: ArrayKind,
}

impl FieldType {
    pub fn scalar(element: ElementType) -> Self {
        Self {
            element,
            array: ArrayKind::Scalar,
        }
    }

    pub fn is_array(&self) -> bool {
        !matches!(self.array, ArrayKind::Scalar)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array {
            ArrayKind::Scalar => write!(f, "{}", self.element),
            ArrayKind::Variable => write!(f, "{}[]", self.element),
            ArrayKind::Fixed(n) => write!(f, "{}[{}]", self.element, n),
        }
    }
}

/// Literal value of a constant, narrowed to its declared kind at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

/// One entry of a message layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name, unique within the schema.
    pub name: String,
    /// Resolved field type.
    pub field_type: FieldType,
    /// Type text as written in the definition (used for checksums).
    pub declared_type: String,
    /// Literal for constants; `None` for regular fields.
    pub constant: Option<Constant>,
}

/// A constant's parsed value plus its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: ConstantValue,
    pub text: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            declared_type: declared_type.into(),
            constant: None,
        }
    }

    pub fn with_constant(mut self, value: ConstantValue, text: impl Into<String>) -> Self {
        self.constant = Some(Constant {
            value,
            text: text.into(),
        });
        self
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_aliases() {
        assert_eq!(PrimitiveKind::from_ros_name("byte"), Some(PrimitiveKind::Int8));
        assert_eq!(PrimitiveKind::from_ros_name("char"), Some(PrimitiveKind::UInt8));
        assert_eq!(PrimitiveKind::from_ros_name("Header"), None);
    }

    #[test]
    fn test_primitive_size() {
        assert_eq!(PrimitiveKind::Bool.size(), Some(1));
        assert_eq!(PrimitiveKind::Time.size(), Some(8));
        assert_eq!(PrimitiveKind::String.size(), None);
    }

    #[test]
    fn test_field_type_display() {
        let t = FieldType {
            element: ElementType::Primitive(PrimitiveKind::Int32),
            array: ArrayKind::Fixed(3),
        };
        assert_eq!(t.to_string(), "int32[3]");
        let t = FieldType {
            element: ElementType::Message("geometry_msgs/Point".into()),
            array: ArrayKind::Variable,
        };
        assert_eq!(t.to_string(), "geometry_msgs/Point[]");
    }
}
