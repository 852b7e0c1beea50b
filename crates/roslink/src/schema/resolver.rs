// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema resolution and process-lifetime caching.

use super::context::{MessageSchema, ServiceSchema};
use super::parser::{parse_definition, split_service};
use super::SchemaError;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Type-name to definition-text lookup (supplied by the discovery layer).
pub trait MessageDefinitionProvider: Send + Sync {
    /// Definition text for `type_name`, if known.
    fn definition(&self, type_name: &str) -> Option<String>;

    /// Whether a definition exists for `type_name`.
    fn has_definition(&self, type_name: &str) -> bool {
        self.definition(type_name).is_some()
    }
}

/// In-memory provider backed by a hash map.
#[derive(Debug, Default, Clone)]
pub struct MapDefinitionProvider {
    definitions: HashMap<String, String>,
}

impl MapDefinitionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a definition.
    pub fn insert(&mut self, type_name: impl Into<String>, definition: impl Into<String>) {
        self.definitions.insert(type_name.into(), definition.into());
    }

    /// Builder-style `insert`.
    pub fn with(mut self, type_name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.insert(type_name, definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl MessageDefinitionProvider for MapDefinitionProvider {
    fn definition(&self, type_name: &str) -> Option<String> {
        self.definitions.get(type_name).cloned()
    }

    fn has_definition(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }
}

pub(crate) struct ResolverInner {
    provider: Arc<dyn MessageDefinitionProvider>,
    messages: DashMap<String, Arc<MessageSchema>>,
    services: DashMap<String, Arc<ServiceSchema>>,
}

impl ResolverInner {
    pub(crate) fn resolve(self: &Arc<Self>, type_name: &str) -> Result<Arc<MessageSchema>, SchemaError> {
        if let Some(schema) = self.messages.get(type_name) {
            return Ok(schema.clone());
        }
        let definition = self
            .provider
            .definition(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;
        self.build(type_name, &definition)
    }

    fn resolve_with_definition(
        self: &Arc<Self>,
        type_name: &str,
        definition: &str,
    ) -> Result<Arc<MessageSchema>, SchemaError> {
        if let Some(schema) = self.messages.get(type_name) {
            return Ok(schema.clone());
        }
        self.build(type_name, definition)
    }

    fn build(self: &Arc<Self>, type_name: &str, definition: &str) -> Result<Arc<MessageSchema>, SchemaError> {
        let fields = parse_definition(type_name, definition)?;

        // Nested types are only checked for existence here; their layouts are
        // resolved lazily so self- and mutually-recursive definitions work.
        for field in &fields {
            if let Some(nested) = field.field_type.element.message_type() {
                let known = nested == type_name
                    || self.messages.contains_key(nested)
                    || self.provider.has_definition(nested);
                if !known {
                    return Err(SchemaError::UnknownNestedType {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                        nested: nested.to_string(),
                    });
                }
            }
        }

        let schema = Arc::new(MessageSchema::new(
            type_name,
            definition,
            fields,
            Arc::downgrade(self),
        ));
        // First writer wins so every caller observes the same schema object.
        let cached = self
            .messages
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        log::debug!(
            "[SchemaResolver] resolved {} ({} fields)",
            type_name,
            cached.fields().len()
        );
        Ok(cached)
    }

    fn resolve_service(self: &Arc<Self>, type_name: &str) -> Result<Arc<ServiceSchema>, SchemaError> {
        if let Some(service) = self.services.get(type_name) {
            return Ok(service.clone());
        }
        let definition = self
            .provider
            .definition(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;
        let (request_text, response_text) = split_service(type_name, &definition)?;
        let request = self.resolve_with_definition(&format!("{}Request", type_name), &request_text)?;
        let response = self.resolve_with_definition(&format!("{}Response", type_name), &response_text)?;
        let service = Arc::new(ServiceSchema {
            type_name: type_name.to_string(),
            request,
            response,
        });
        Ok(self
            .services
            .entry(type_name.to_string())
            .or_insert(service)
            .clone())
    }
}

/// Resolves type names to cached [`MessageSchema`]s.
///
/// Cloning is cheap and clones share the same cache.
#[derive(Clone)]
pub struct SchemaResolver {
    inner: Arc<ResolverInner>,
}

impl SchemaResolver {
    pub fn new(provider: Arc<dyn MessageDefinitionProvider>) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                provider,
                messages: DashMap::new(),
                services: DashMap::new(),
            }),
        }
    }

    /// Resolve `type_name` through the definition provider.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<MessageSchema>, SchemaError> {
        self.inner.resolve(type_name)
    }

    /// Resolve `type_name` from explicit definition text.
    ///
    /// A type already cached is returned as-is; the text is not re-parsed.
    pub fn resolve_with_definition(
        &self,
        type_name: &str,
        definition: &str,
    ) -> Result<Arc<MessageSchema>, SchemaError> {
        self.inner.resolve_with_definition(type_name, definition)
    }

    /// Resolve a service definition into its request/response schemas.
    ///
    /// The halves are cached as `<type>Request` and `<type>Response`.
    pub fn resolve_service(&self, type_name: &str) -> Result<Arc<ServiceSchema>, SchemaError> {
        self.inner.resolve_service(type_name)
    }

    pub fn provider(&self) -> &Arc<dyn MessageDefinitionProvider> {
        &self.inner.provider
    }

    /// Number of cached message schemas.
    pub fn cached_len(&self) -> usize {
        self.inner.messages.len()
    }
}

impl std::fmt::Debug for SchemaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaResolver")
            .field("cached", &self.inner.messages.len())
            .finish_non_exhaustive()
    }
}
