// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed views over [`Message`].
//!
//! A [`MessageInterface`] is a thin wrapper that presents compile-time named
//! accessors while storing everything in the generic container. The
//! [`message_interface!`](crate::message_interface) macro generates them:
//!
//! ```rust
//! roslink::message_interface! {
//!     /// `std_msgs/String`
//!     pub struct StringMsg("std_msgs/String") {
//!         data, set_data: String => "string";
//!     }
//! }
//! ```
//!
//! The [`MessageClassRegistry`] checks each interface against the resolved
//! schema once, then every later access is a plain slot lookup.

use super::{FieldError, Message};
use crate::schema::MessageSchema;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::{Arc, Weak};

/// Typed view bound to one ROS message type.
pub trait MessageInterface: Sized + Send + 'static {
    /// Fully qualified ROS type name.
    const TYPE_NAME: &'static str;

    /// `(field name, declared type)` pairs the view relies on.
    fn declared_fields() -> &'static [(&'static str, &'static str)];

    /// Wrap a message. The caller guarantees the type matches.
    fn from_message(message: Message) -> Self;

    fn as_message(&self) -> &Message;

    fn as_message_mut(&mut self) -> &mut Message;

    fn into_message(self) -> Message;
}

/// Check an interface's declared fields against a schema.
pub fn validate_interface<I: MessageInterface>(schema: &MessageSchema) -> Result<(), FieldError> {
    for (name, declared) in I::declared_fields() {
        let field = schema.field(name).ok_or_else(|| FieldError::NoSuchField {
            type_name: schema.type_name().to_string(),
            field: (*name).to_string(),
        })?;
        let actual = field.field_type.to_string();
        if actual != *declared {
            return Err(FieldError::TypeMismatch {
                type_name: schema.type_name().to_string(),
                field: (*name).to_string(),
                expected: actual,
                got: (*declared).to_string(),
            });
        }
    }
    Ok(())
}

/// Metadata of a registered interface.
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub type_name: &'static str,
    pub rust_type: &'static str,
    type_id: TypeId,
}

/// Type name to typed interface lookup.
///
/// Validation results are remembered per schema instance, so a view is
/// checked once no matter how many messages are created through it.
#[derive(Debug, Default)]
pub struct MessageClassRegistry {
    interfaces: DashMap<String, InterfaceInfo>,
    validated: DashMap<TypeId, Weak<MessageSchema>>,
}

impl MessageClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `I` to its type name, replacing any previous binding.
    pub fn register<I: MessageInterface>(&self) {
        let info = InterfaceInfo {
            type_name: I::TYPE_NAME,
            rust_type: std::any::type_name::<I>(),
            type_id: TypeId::of::<I>(),
        };
        if let Some(previous) = self.interfaces.insert(I::TYPE_NAME.to_string(), info) {
            log::debug!(
                "[MessageClassRegistry] {} rebound from {}",
                I::TYPE_NAME,
                previous.rust_type
            );
        }
    }

    pub fn lookup(&self, type_name: &str) -> Option<InterfaceInfo> {
        self.interfaces.get(type_name).map(|e| e.value().clone())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.interfaces.contains_key(type_name)
    }

    /// Whether `I` is the interface bound to its own type name.
    pub fn is_registered<I: MessageInterface>(&self) -> bool {
        self.interfaces
            .get(I::TYPE_NAME)
            .is_some_and(|e| e.type_id == TypeId::of::<I>())
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Validate `I` against `schema`, once per schema instance.
    pub fn ensure_valid<I: MessageInterface>(&self, schema: &Arc<MessageSchema>) -> Result<(), FieldError> {
        let key = TypeId::of::<I>();
        if let Some(known) = self.validated.get(&key) {
            if known.upgrade().is_some_and(|s| Arc::ptr_eq(&s, schema)) {
                return Ok(());
            }
        }
        validate_interface::<I>(schema)?;
        self.validated.insert(key, Arc::downgrade(schema));
        if !self.is_registered::<I>() {
            self.register::<I>();
        }
        Ok(())
    }

    /// Wrap a message in `I` after checking the type name and layout.
    pub fn wrap<I: MessageInterface>(&self, message: Message) -> Result<I, FieldError> {
        if message.type_name() != I::TYPE_NAME {
            return Err(FieldError::TypeMismatch {
                type_name: message.type_name().to_string(),
                field: String::new(),
                expected: I::TYPE_NAME.to_string(),
                got: message.type_name().to_string(),
            });
        }
        self.ensure_valid::<I>(message.schema())?;
        Ok(I::from_message(message))
    }
}

/// Generate a typed [`MessageInterface`] wrapper.
///
/// Each line names a getter, a setter, the Rust value type and the declared
/// ROS field type (as printed by `FieldType`).
#[macro_export]
macro_rules! message_interface {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($type_name:literal) {
            $( $getter:ident, $setter:ident : $ty:ty => $declared:literal; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name($crate::message::Message);

        impl $crate::message::MessageInterface for $name {
            const TYPE_NAME: &'static str = $type_name;

            fn declared_fields() -> &'static [(&'static str, &'static str)] {
                &[ $( (stringify!($getter), $declared) ),* ]
            }

            fn from_message(message: $crate::message::Message) -> Self {
                Self(message)
            }

            fn as_message(&self) -> &$crate::message::Message {
                &self.0
            }

            fn as_message_mut(&mut self) -> &mut $crate::message::Message {
                &mut self.0
            }

            fn into_message(self) -> $crate::message::Message {
                self.0
            }
        }

        #[allow(dead_code)]
        impl $name {
            $(
                pub fn $getter(&self) -> ::std::result::Result<$ty, $crate::message::FieldError> {
                    self.0.get::<$ty>(stringify!($getter))
                }

                pub fn $setter(&mut self, value: $ty) -> ::std::result::Result<(), $crate::message::FieldError> {
                    self.0.set(stringify!($getter), value)
                }
            )*

            pub fn to_bytes(&self) -> ::std::result::Result<::std::vec::Vec<u8>, $crate::wire::WireError> {
                self.0.to_bytes()
            }
        }
    };
}
