//! Error types for role and permission operations
//!
//! This module defines the errors raised while registering roles, coercing
//! role references, parsing permission strings and walking parent chains.

use thiserror::Error;

/// Maximum length of a stored role class name.
pub const ROLE_CLASS_MAX_LEN: usize = 256;

/// Role and permission error types.
///
/// All of these are local, synchronous failures. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    /// The role name or descriptor is not present in the registry
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// A role with the same class name was already registered
    #[error("Role already registered: {0}")]
    RoleAlreadyRegistered(String),

    /// A declared parent relation does not exist on the instance
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// The permission string is not in `app_label.codename` form
    #[error("Malformed permission string: {0}")]
    MalformedPermission(String),

    /// No permission record matches the given app label and codename
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    /// The role descriptor declares an invalid combination of options
    #[error("Role {role} is improperly configured: {message}")]
    ImproperlyConfigured {
        /// Class name of the offending role.
        role: String,
        /// What is wrong with it.
        message: String,
    },

    /// The role class name does not fit the assignment column
    #[error("Role class name exceeds 256 characters: {0}")]
    RoleClassTooLong(String),
}

/// Result type for role and permission operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    pub(crate) fn improperly_configured(role: &str, message: impl Into<String>) -> Self {
        RbacError::ImproperlyConfigured {
            role: role.to_string(),
            message: message.into(),
        }
    }

    /// Check if this error comes from a bad role declaration rather than
    /// from caller input.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RbacError::ImproperlyConfigured { .. } | RbacError::RoleAlreadyRegistered(_)
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::RoleNotFound(_) => "ROLE_NOT_FOUND",
            RbacError::RoleAlreadyRegistered(_) => "ROLE_ALREADY_REGISTERED",
            RbacError::ParentNotFound(_) => "PARENT_NOT_FOUND",
            RbacError::MalformedPermission(_) => "MALFORMED_PERMISSION",
            RbacError::PermissionNotFound(_) => "PERMISSION_NOT_FOUND",
            RbacError::ImproperlyConfigured { .. } => "IMPROPERLY_CONFIGURED",
            RbacError::RoleClassTooLong(_) => "ROLE_CLASS_TOO_LONG",
        }
    }
}
