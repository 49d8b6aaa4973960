//! # Permissions
//!
//! Permission records and their string codec. A permission belongs to one
//! model type and is identified by its app label plus codename; its string
//! form is `app_label.codename`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::content_types::ModelType;
use crate::error::{RbacError, RbacResult};

/// Actions every registered model gets a permission for.
pub const DEFAULT_ACTIONS: [&str; 4] = ["add", "change", "delete", "view"];

/// A permission record from the permission registry.
///
/// # Example
///
/// ```
/// use rolegate_rbac::content_types::ModelType;
/// use rolegate_rbac::permissions::Permission;
///
/// let perm = Permission::new(ModelType::new("library", "book"), "view_book", "Can view book");
/// assert_eq!(perm.to_string(), "library.view_book");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The model type this permission belongs to.
    pub model_type: ModelType,
    /// Codename, unique within the app label (e.g., "view_book").
    pub codename: String,
    /// Human-readable name.
    pub name: String,
}

impl Permission {
    /// Create a new permission record.
    pub fn new(model_type: ModelType, codename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model_type,
            codename: codename.into(),
            name: name.into(),
        }
    }

    /// App label of the permission, taken from its model type.
    pub fn app_label(&self) -> &str {
        &self.model_type.app_label
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label(), self.codename)
    }
}

/// Lookup service for permission records.
pub trait PermissionRegistry: Send + Sync {
    /// Get a permission by app label and codename.
    fn get(&self, app_label: &str, codename: &str) -> Option<Permission>;

    /// Get every permission that belongs to one of the given model types.
    fn for_models(&self, models: &[ModelType]) -> Vec<Permission>;
}

/// Transform a permission into its string form.
///
/// # Example
///
/// ```
/// use rolegate_rbac::content_types::ModelType;
/// use rolegate_rbac::permissions::{permission_to_string, Permission};
///
/// let perm = Permission::new(ModelType::new("library", "book"), "add_book", "Can add book");
/// assert_eq!(permission_to_string(&perm), "library.add_book");
/// ```
pub fn permission_to_string(permission: &Permission) -> String {
    format!("{}.{}", permission.app_label(), permission.codename)
}

/// Split a permission string into its app label and codename.
///
/// Fails with [`RbacError::MalformedPermission`] unless the string has
/// exactly two dot-separated parts.
pub fn split_permission(perm: &str) -> RbacResult<(&str, &str)> {
    let mut parts = perm.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(app_label), Some(codename), None) => Ok((app_label, codename)),
        _ => Err(RbacError::MalformedPermission(perm.to_string())),
    }
}

/// Transform a string of the form `app_label.codename` into a permission
/// record.
///
/// # Errors
///
/// - [`RbacError::MalformedPermission`] if the string does not split into
///   exactly two parts
/// - [`RbacError::PermissionNotFound`] if no record matches
pub fn string_to_permission(registry: &dyn PermissionRegistry, perm: &str) -> RbacResult<Permission> {
    let (app_label, codename) = split_permission(perm)?;
    registry
        .get(app_label, codename)
        .ok_or_else(|| RbacError::PermissionNotFound(perm.to_string()))
}

/// Get all permissions related to the given model types.
///
/// An empty list yields no permissions.
pub fn get_permissions_list(registry: &dyn PermissionRegistry, models: &[ModelType]) -> Vec<Permission> {
    if models.is_empty() {
        return Vec::new();
    }
    registry.for_models(models)
}

/// In-memory permission registry.
///
/// Keeps permissions in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionRegistry {
    permissions: Vec<Permission>,
    index: HashMap<(String, String), usize>,
}

impl MemoryPermissionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission record.
    ///
    /// A record with the same app label and codename replaces the old one.
    pub fn add(&mut self, permission: Permission) {
        let key = (permission.app_label().to_string(), permission.codename.clone());
        if let Some(&idx) = self.index.get(&key) {
            self.permissions[idx] = permission;
        } else {
            self.index.insert(key, self.permissions.len());
            self.permissions.push(permission);
        }
    }

    /// Add the default `add`, `change`, `delete` and `view` permissions for a
    /// model type.
    pub fn add_defaults(&mut self, model_type: &ModelType) {
        for action in DEFAULT_ACTIONS {
            self.add(Permission::new(
                model_type.clone(),
                format!("{}_{}", action, model_type.model),
                format!("Can {} {}", action, model_type.model),
            ));
        }
    }

    /// Get all permissions.
    pub fn all(&self) -> &[Permission] {
        &self.permissions
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl PermissionRegistry for MemoryPermissionRegistry {
    fn get(&self, app_label: &str, codename: &str) -> Option<Permission> {
        self.index
            .get(&(app_label.to_string(), codename.to_string()))
            .map(|&idx| self.permissions[idx].clone())
    }

    fn for_models(&self, models: &[ModelType]) -> Vec<Permission> {
        self.permissions
            .iter()
            .filter(|p| models.contains(&p.model_type))
            .cloned()
            .collect()
    }
}
