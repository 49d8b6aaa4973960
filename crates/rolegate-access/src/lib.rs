//! # Rolegate Access
//!
//! This crate stores role assignments and answers permission checks on top
//! of the role model in `rolegate-rbac`.
//!
//! ## Overview
//!
//! The rolegate-access crate handles:
//! - **Store**: Role assignment persistence with uniqueness and cascades
//! - **Checker**: Assigning, revoking and listing roles; permission checks
//! - **Config**: Parent walk depth and optional rules
//!
//! ## Resolution Order
//!
//! ```text
//! has_permission(user, "app.codename", target)
//!   1. roles on target       -> explicit rules (allow / deny lists)
//!   2. roles on parents      -> inheritance policy, closest level first
//!   3. global roles          -> explicit rules, then inheritance
//!   4. nothing decided       -> deny
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rolegate_access::{CheckerConfig, MemoryAssignmentStore, PermissionChecker};
//! use rolegate_rbac::{MemoryContentTypes, MemoryPermissionRegistry, ModelType, Role, RoleRegistry};
//! use uuid::Uuid;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = ModelType::new("library", "library");
//!
//!     let mut content_types = MemoryContentTypes::new();
//!     content_types.register(library.clone());
//!     let mut permissions = MemoryPermissionRegistry::new();
//!     permissions.add_defaults(&library);
//!
//!     let mut roles = RoleRegistry::new();
//!     roles.register(
//!         Role::builder("Auditor")
//!             .verbose_name("Auditor")
//!             .all_models()
//!             .allow(["library.view_library"])
//!             .build()?,
//!     )?;
//!
//!     let checker = PermissionChecker::new(
//!         Arc::new(roles),
//!         Arc::new(permissions),
//!         Arc::new(content_types),
//!         Arc::new(MemoryAssignmentStore::new()),
//!         CheckerConfig::from_env(),
//!     )?;
//!
//!     let user = Uuid::now_v7();
//!     checker.assign_role(user, "Auditor", None).await?;
//!     assert!(checker.has_permission(user, "library.view_library", None).await?);
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod store;

// Re-export main types for convenience
pub use checker::PermissionChecker;
pub use config::{CheckerConfig, ConfigError};
pub use error::{AccessError, AccessResult};
pub use store::{AssignmentStore, MemoryAssignmentStore, StoreStats};
