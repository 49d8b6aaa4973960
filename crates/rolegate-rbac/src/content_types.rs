//! # Content Types
//!
//! Stable identifiers for model types. A role assignment refers to its target
//! through a content type id plus an object id, so every model type that can
//! carry roles needs a content type.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A model type, identified by the application it lives in and its name.
///
/// Both parts are stored lowercase, so `ModelType::new("Library", "Book")`
/// and `ModelType::new("library", "book")` are the same type.
///
/// # Example
///
/// ```
/// use rolegate_rbac::content_types::ModelType;
///
/// let book = ModelType::new("library", "Book");
/// assert_eq!(book.to_string(), "library.book");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelType {
    /// Application label (e.g., "library").
    pub app_label: String,
    /// Model name (e.g., "book").
    pub model: String,
}

impl ModelType {
    /// Create a model type from an app label and model name.
    pub fn new(app_label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into().to_lowercase(),
            model: model.into().to_lowercase(),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// Identifier of a content type row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ContentTypeId(pub u32);

impl fmt::Display for ContentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered content type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentType {
    /// Content type id.
    pub id: ContentTypeId,
    /// The model type it stands for.
    pub model_type: ModelType,
}

/// Maps model types to content types and back.
///
/// Implementations are expected to be populated at startup and read-only
/// afterwards.
pub trait ContentTypeRegistry: Send + Sync {
    /// Get the content type of a model type.
    fn get_for_model(&self, model_type: &ModelType) -> Option<ContentType>;

    /// Get a content type by id.
    fn get(&self, id: ContentTypeId) -> Option<ContentType>;
}

/// In-memory content type registry.
///
/// Ids are handed out sequentially, starting at 1, in registration order.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentTypes {
    by_model: HashMap<ModelType, ContentTypeId>,
    by_id: HashMap<ContentTypeId, ModelType>,
    last_id: u32,
}

impl MemoryContentTypes {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model type, returning its content type.
    ///
    /// Registering the same model type twice returns the existing row.
    pub fn register(&mut self, model_type: ModelType) -> ContentType {
        if let Some(id) = self.by_model.get(&model_type) {
            return ContentType {
                id: *id,
                model_type,
            };
        }

        self.last_id += 1;
        let id = ContentTypeId(self.last_id);
        self.by_model.insert(model_type.clone(), id);
        self.by_id.insert(id, model_type.clone());
        ContentType { id, model_type }
    }

    /// Number of registered content types.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl ContentTypeRegistry for MemoryContentTypes {
    fn get_for_model(&self, model_type: &ModelType) -> Option<ContentType> {
        self.by_model.get(model_type).map(|id| ContentType {
            id: *id,
            model_type: model_type.clone(),
        })
    }

    fn get(&self, id: ContentTypeId) -> Option<ContentType> {
        self.by_id.get(&id).map(|model_type| ContentType {
            id,
            model_type: model_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_is_lowercased() {
        assert_eq!(
            ModelType::new("Library", "Book"),
            ModelType::new("library", "book")
        );
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = MemoryContentTypes::new();
        let library = registry.register(ModelType::new("library", "library"));
        let book = registry.register(ModelType::new("library", "book"));

        assert_eq!(library.id, ContentTypeId(1));
        assert_eq!(book.id, ContentTypeId(2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = MemoryContentTypes::new();
        let first = registry.register(ModelType::new("library", "book"));
        let second = registry.register(ModelType::new("library", "book"));

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let chapter = registry.register(ModelType::new("library", "chapter"));
        assert_eq!(chapter.id, ContentTypeId(2));
    }

    #[test]
    fn test_lookup_both_ways() {
        let mut registry = MemoryContentTypes::new();
        let book = registry.register(ModelType::new("library", "book"));

        assert_eq!(
            registry.get_for_model(&ModelType::new("library", "book")),
            Some(book.clone())
        );
        assert_eq!(registry.get(book.id), Some(book));
        assert_eq!(registry.get(ContentTypeId(99)), None);
    }
}
