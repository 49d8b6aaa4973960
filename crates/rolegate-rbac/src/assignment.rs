//! Role assignment records
//!
//! This module provides the one persisted entity: a row linking a user to a
//! role, optionally on a specific target object. Rows without a target are
//! global assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::content_types::ContentTypeId;
use crate::error::{RbacError, RbacResult, ROLE_CLASS_MAX_LEN};
use crate::registry::RoleRegistry;
use crate::roles::{Role, Verdict};

/// Reference to a target object: its content type and primary key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Content type of the object.
    pub content_type: ContentTypeId,
    /// Primary key of the object.
    pub object_id: u64,
}

impl ObjectRef {
    /// Create an object reference.
    pub fn new(content_type: ContentTypeId, object_id: u64) -> Self {
        Self {
            content_type,
            object_id,
        }
    }
}

/// Uniqueness key of an assignment: `(user, role_class, content_type, object_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentKey {
    /// User holding the role.
    pub user_id: Uuid,
    /// Role class name.
    pub role_class: String,
    /// Content type of the target, if any.
    pub content_type_id: Option<ContentTypeId>,
    /// Object id of the target, if any.
    pub object_id: Option<u64>,
}

impl AssignmentKey {
    /// Build the key of a `(user, role, target)` assignment without creating
    /// a row.
    ///
    /// # Errors
    ///
    /// [`RbacError::RoleClassTooLong`] when the class name exceeds the column
    /// size.
    pub fn new(
        user_id: Uuid,
        role_class: impl Into<String>,
        target: Option<ObjectRef>,
    ) -> RbacResult<Self> {
        Ok(Self {
            user_id,
            role_class: checked_role_class(role_class.into())?,
            content_type_id: target.map(|t| t.content_type),
            object_id: target.map(|t| t.object_id),
        })
    }
}

fn checked_role_class(role_class: String) -> RbacResult<String> {
    if role_class.chars().count() > ROLE_CLASS_MAX_LEN {
        return Err(RbacError::RoleClassTooLong(role_class));
    }
    Ok(role_class)
}

/// A role held by a user, globally or on one object.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use rolegate_rbac::assignment::{ObjectRef, RoleAssignment};
/// use rolegate_rbac::content_types::ContentTypeId;
///
/// let user_id = Uuid::now_v7();
/// let target = ObjectRef::new(ContentTypeId(1), 42);
/// let assignment = RoleAssignment::new(user_id, "LibraryOwner", Some(target)).unwrap();
/// assert_eq!(assignment.target(), Some(target));
/// assert!(!assignment.is_global());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Unique assignment ID
    pub id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Class name of the assigned role
    pub role_class: String,

    /// Content type of the target (None for global assignments)
    pub content_type_id: Option<ContentTypeId>,

    /// Primary key of the target (None for global assignments)
    pub object_id: Option<u64>,

    /// When the role was assigned
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Creates a new role assignment.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user receiving the role
    /// * `role_class` - Class name of the role
    /// * `target` - The target object, or `None` for a global assignment
    ///
    /// # Errors
    ///
    /// [`RbacError::RoleClassTooLong`] when the class name exceeds the column
    /// size.
    pub fn new(
        user_id: Uuid,
        role_class: impl Into<String>,
        target: Option<ObjectRef>,
    ) -> RbacResult<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            user_id,
            role_class: checked_role_class(role_class.into())?,
            content_type_id: target.map(|t| t.content_type),
            object_id: target.map(|t| t.object_id),
            created_at: Utc::now(),
        })
    }

    /// The target object, when both target columns are set.
    pub fn target(&self) -> Option<ObjectRef> {
        match (self.content_type_id, self.object_id) {
            (Some(content_type), Some(object_id)) => Some(ObjectRef::new(content_type, object_id)),
            _ => None,
        }
    }

    /// Check if this is a global assignment.
    pub fn is_global(&self) -> bool {
        self.content_type_id.is_none() && self.object_id.is_none()
    }

    /// Check if the assignment is on the given target (`None` for global).
    pub fn is_on(&self, target: Option<ObjectRef>) -> bool {
        match target {
            Some(t) => self.content_type_id == Some(t.content_type) && self.object_id == Some(t.object_id),
            None => self.is_global(),
        }
    }

    /// Uniqueness key of the row.
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            user_id: self.user_id,
            role_class: self.role_class.clone(),
            content_type_id: self.content_type_id,
            object_id: self.object_id,
        }
    }

    /// Resolve the assigned role in the registry.
    pub fn role(&self, registry: &RoleRegistry) -> RbacResult<Arc<Role>> {
        registry.resolve_role(self.role_class.as_str())
    }
}

/// Check whether an assignment's role passes a permission down by
/// inheritance.
///
/// Returns [`Verdict::NotApplicable`] when the role does not inherit, or when
/// it neither lists the permission nor covers all models.
///
/// # Errors
///
/// [`RbacError::RoleNotFound`] when the assignment's role is not registered.
pub fn inherit_check(
    registry: &RoleRegistry,
    assignment: &RoleAssignment,
    permission: &str,
) -> RbacResult<Verdict> {
    let role = assignment.role(registry)?;
    Ok(role.inherit_check(permission))
}
