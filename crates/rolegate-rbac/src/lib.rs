//! # Rolegate RBAC
//!
//! This crate provides the role model of rolegate: role descriptors, the role
//! registry, permission records and their string codec, parent chains and
//! the inheritance check.
//!
//! ## Overview
//!
//! The rolegate-rbac crate handles:
//! - **Roles**: Named bundles of permission rules, scoped to model types
//! - **Registry**: Explicit registration of role descriptors at startup
//! - **Permissions**: `app_label.codename` records and their lookup
//! - **Content Types**: Stable identifiers for model types
//! - **Parents**: Declared parent relations of model instances
//! - **Assignments**: Users holding roles, globally or on one object
//!
//! ## Architecture
//!
//! ```text
//! RoleAssignment (user, role_class, content_type?, object_id?)
//!   └─ Role
//!        ├─ ModelScope   All | Specific(models)
//!        ├─ Rules        AllowList | DenyList          (on the target)
//!        └─ Inheritance  Disabled | AllowList | DenyList (on its children)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolegate_rbac::{inherit_check, ModelType, RoleAssignment, Role, RoleRegistry, Verdict};
//! use uuid::Uuid;
//!
//! let mut registry = RoleRegistry::new();
//! registry.register(
//!     Role::builder("LibraryOwner")
//!         .verbose_name("Librarian")
//!         .models([ModelType::new("library", "library")])
//!         .deny(Vec::<String>::new())
//!         .inherit_allow(["library.view_book"])
//!         .build()?,
//! )?;
//!
//! let assignment = RoleAssignment::new(Uuid::now_v7(), "LibraryOwner", None)?;
//! assert_eq!(inherit_check(&registry, &assignment, "library.view_book")?, Verdict::Allow);
//! # Ok::<(), rolegate_rbac::RbacError>(())
//! ```
//!
//! ## Integration with rolegate-access
//!
//! This crate has no I/O. `rolegate-access` stores assignments and combines
//! explicit grants, parent inheritance and global roles into one answer.

pub mod assignment;
pub mod content_types;
pub mod error;
pub mod parents;
pub mod permissions;
pub mod registry;
pub mod roles;

// Re-export main types for convenience
pub use assignment::{inherit_check, AssignmentKey, ObjectRef, RoleAssignment};
pub use content_types::{ContentType, ContentTypeId, ContentTypeRegistry, MemoryContentTypes, ModelType};
pub use error::{RbacError, RbacResult, ROLE_CLASS_MAX_LEN};
pub use parents::{get_parents, Model, Relation, RoleOptions};
pub use permissions::{
    get_permissions_list, permission_to_string, string_to_permission, MemoryPermissionRegistry,
    Permission, PermissionRegistry,
};
pub use registry::{is_role, RoleRef, RoleRegistry, BASE_ROLE_NAME};
pub use roles::{Inheritance, ModelScope, Role, RoleBuilder, Rules, Verdict};
