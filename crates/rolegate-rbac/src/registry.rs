//! Role registry
//!
//! Roles are registered once, at process start, and looked up by class name
//! afterwards. Callers refer to roles either by name or by a descriptor they
//! already hold; [`RoleRegistry::resolve_role`] coerces both to the registered
//! descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{RbacError, RbacResult};
use crate::roles::Role;

/// Class name reserved for the base role, which is never a concrete role.
pub const BASE_ROLE_NAME: &str = "Role";

/// Check if a descriptor is a concrete role.
///
/// A concrete role has a class name, and that name is not the reserved base
/// name. Registration is not checked.
pub fn is_role(role: &Role) -> bool {
    let name = role.class_name();
    !name.trim().is_empty() && name != BASE_ROLE_NAME
}

/// Reference to a role, by class name or by descriptor.
#[derive(Debug, Clone)]
pub enum RoleRef {
    /// Role class name.
    Name(String),
    /// Role descriptor.
    Role(Arc<Role>),
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<Arc<Role>> for RoleRef {
    fn from(role: Arc<Role>) -> Self {
        RoleRef::Role(role)
    }
}

impl From<&Arc<Role>> for RoleRef {
    fn from(role: &Arc<Role>) -> Self {
        RoleRef::Role(role.clone())
    }
}

impl RoleRef {
    /// The class name the reference points to.
    pub fn class_name(&self) -> &str {
        match self {
            RoleRef::Name(name) => name,
            RoleRef::Role(role) => role.class_name(),
        }
    }
}

/// Table of registered roles.
///
/// # Example
///
/// ```
/// use rolegate_rbac::registry::RoleRegistry;
/// use rolegate_rbac::roles::Role;
///
/// let mut registry = RoleRegistry::new();
/// registry
///     .register(
///         Role::builder("Auditor")
///             .verbose_name("Auditor")
///             .all_models()
///             .allow(["library.view_book"])
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let role = registry.resolve_role("Auditor").unwrap();
/// assert_eq!(role.verbose_name(), "Auditor");
/// assert!(registry.resolve_role("Ghost").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: Vec<Arc<Role>>,
    by_name: HashMap<String, usize>,
}

impl RoleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role descriptor.
    ///
    /// # Errors
    ///
    /// - [`RbacError::ImproperlyConfigured`] if the descriptor is not a
    ///   concrete role
    /// - [`RbacError::RoleAlreadyRegistered`] if the class name is taken
    pub fn register(&mut self, role: Role) -> RbacResult<Arc<Role>> {
        if !is_role(&role) {
            return Err(RbacError::improperly_configured(
                role.class_name(),
                "not a concrete role",
            ));
        }
        if self.by_name.contains_key(role.class_name()) {
            return Err(RbacError::RoleAlreadyRegistered(role.class_name().to_string()));
        }

        let role = Arc::new(role);
        self.by_name
            .insert(role.class_name().to_string(), self.roles.len());
        self.roles.push(role.clone());
        Ok(role)
    }

    /// Get a role by class name.
    pub fn get(&self, class_name: &str) -> Option<&Arc<Role>> {
        self.by_name.get(class_name).map(|&idx| &self.roles[idx])
    }

    /// Check if a role reference is registered.
    pub fn contains(&self, role: &RoleRef) -> bool {
        self.resolve_role(role.clone()).is_ok()
    }

    /// Get all registered roles, in registration order.
    pub fn roles(&self) -> &[Arc<Role>] {
        &self.roles
    }

    /// Get the count of registered roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Coerce a role reference into the registered descriptor.
    ///
    /// A descriptor reference resolves only when the registry holds an equal
    /// descriptor under the same class name.
    ///
    /// # Errors
    ///
    /// [`RbacError::RoleNotFound`] when nothing matches.
    pub fn resolve_role(&self, role: impl Into<RoleRef>) -> RbacResult<Arc<Role>> {
        let role = role.into();
        let registered = self.get(role.class_name());
        match (&role, registered) {
            (RoleRef::Name(_), Some(found)) => Ok(found.clone()),
            (RoleRef::Role(given), Some(found))
                if Arc::ptr_eq(given, found) || given.as_ref() == found.as_ref() =>
            {
                Ok(found.clone())
            }
            _ => Err(RbacError::RoleNotFound(role.class_name().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_types::ModelType;

    fn role(name: &str) -> Role {
        Role::builder(name)
            .verbose_name("Test role")
            .models([ModelType::new("library", "library")])
            .deny(Vec::<String>::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_role() {
        assert!(is_role(&role("LibraryOwner")));
        assert!(!is_role(&role(BASE_ROLE_NAME)));
        assert!(!is_role(&role("  ")));
    }

    #[test]
    fn test_register_and_list() {
        let mut registry = RoleRegistry::new();
        registry.register(role("LibraryOwner")).unwrap();
        registry.register(role("Reader")).unwrap();

        let names: Vec<&str> = registry.roles().iter().map(|r| r.class_name()).collect();
        assert_eq!(names, vec!["LibraryOwner", "Reader"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_rejects_base_role() {
        let mut registry = RoleRegistry::new();
        let err = registry.register(role(BASE_ROLE_NAME)).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = RoleRegistry::new();
        registry.register(role("Reader")).unwrap();
        assert_eq!(
            registry.register(role("Reader")).unwrap_err(),
            RbacError::RoleAlreadyRegistered("Reader".into())
        );
    }

    #[test]
    fn test_resolve_by_name_and_descriptor() {
        let mut registry = RoleRegistry::new();
        let owner = registry.register(role("LibraryOwner")).unwrap();

        let by_name = registry.resolve_role("LibraryOwner").unwrap();
        assert!(Arc::ptr_eq(&by_name, &owner));

        let by_descriptor = registry.resolve_role(&owner).unwrap();
        assert!(Arc::ptr_eq(&by_descriptor, &owner));
    }

    #[test]
    fn test_resolve_unknown() {
        let mut registry = RoleRegistry::new();
        registry.register(role("LibraryOwner")).unwrap();

        assert_eq!(
            registry.resolve_role("Ghost").unwrap_err(),
            RbacError::RoleNotFound("Ghost".into())
        );

        let unregistered = Arc::new(role("Stranger"));
        assert!(registry.resolve_role(&unregistered).is_err());
        assert!(!registry.contains(&RoleRef::from(&unregistered)));
    }

    #[test]
    fn test_resolve_rejects_impostor_descriptor() {
        let mut registry = RoleRegistry::new();
        registry.register(role("LibraryOwner")).unwrap();

        let impostor = Arc::new(
            Role::builder("LibraryOwner")
                .verbose_name("Impostor")
                .all_models()
                .deny(Vec::<String>::new())
                .build()
                .unwrap(),
        );
        assert!(registry.resolve_role(impostor).is_err());
    }
}
