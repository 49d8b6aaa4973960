//! Error types for role assignment and permission checks
//!
//! Errors from the role model are wrapped, so callers only deal with
//! [`AccessError`].

use rolegate_rbac::RbacError;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;

/// Access error types.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Role model error (unknown role, bad permission string, missing parent)
    #[error(transparent)]
    Rbac(#[from] RbacError),

    /// The user already holds the role on this target
    #[error("User {user_id} already holds role {role} on {target}")]
    DuplicateAssignment {
        /// User holding the role.
        user_id: Uuid,
        /// Role class name.
        role: String,
        /// Target description.
        target: String,
    },

    /// No such role assignment
    #[error("User {user_id} does not hold role {role} on {target}")]
    AssignmentNotFound {
        /// User the assignment was looked up for.
        user_id: Uuid,
        /// Role class name.
        role: String,
        /// Target description.
        target: String,
    },

    /// A unique role is already held on the target by another user
    #[error("Unique role {role} is already held on {target}")]
    UniqueRoleTaken {
        /// Role class name.
        role: String,
        /// Target description.
        target: String,
    },

    /// The role cannot be assigned on this kind of object
    #[error("Role {role} cannot be assigned on {model}")]
    InvalidAssignment {
        /// Role class name.
        role: String,
        /// Model type of the rejected target.
        model: String,
    },

    /// The model type has no registered content type
    #[error("No content type registered for {0}")]
    UnknownContentType(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for access operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Check if this error should be logged at error level.
    ///
    /// Caller mistakes (unknown roles, duplicate assignments) are expected
    /// and should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        match self {
            AccessError::Storage(_) | AccessError::Config(_) => true,
            AccessError::Rbac(err) => err.is_configuration_error(),
            _ => false,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::Rbac(err) => err.error_code(),
            AccessError::DuplicateAssignment { .. } => "DUPLICATE_ASSIGNMENT",
            AccessError::AssignmentNotFound { .. } => "ASSIGNMENT_NOT_FOUND",
            AccessError::UniqueRoleTaken { .. } => "UNIQUE_ROLE_TAKEN",
            AccessError::InvalidAssignment { .. } => "INVALID_ASSIGNMENT",
            AccessError::UnknownContentType(_) => "UNKNOWN_CONTENT_TYPE",
            AccessError::Storage(_) => "STORAGE_ERROR",
            AccessError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rbac_errors_pass_through() {
        let err: AccessError = RbacError::RoleNotFound("Ghost".into()).into();
        assert_eq!(err.error_code(), "ROLE_NOT_FOUND");
        assert_eq!(err.to_string(), "Role not found: Ghost");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_errors() {
        assert!(AccessError::Storage("down".into()).is_server_error());
        assert!(!AccessError::UnknownContentType("library.book".into()).is_server_error());

        let err: AccessError = RbacError::RoleAlreadyRegistered("Owner".into()).into();
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_codes() {
        let err = AccessError::UniqueRoleTaken {
            role: "Owner".into(),
            target: "library.library#1".into(),
        };
        assert_eq!(err.error_code(), "UNIQUE_ROLE_TAKEN");
        assert_eq!(
            err.to_string(),
            "Unique role Owner is already held on library.library#1"
        );
    }
}
