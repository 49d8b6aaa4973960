//! Role assignment storage
//!
//! This module provides the storage abstraction for role assignments and an
//! in-memory implementation. Storage owns the uniqueness rules: the
//! `(user, role_class, content_type, object_id)` key, and the single holder of
//! a unique role per target.

use async_trait::async_trait;
use rolegate_rbac::{AssignmentKey, ContentTypeId, ObjectRef, RoleAssignment};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AccessError, AccessResult};

/// Describe a target for messages and log fields.
pub(crate) fn describe_target(target: Option<ObjectRef>) -> String {
    match target {
        Some(t) => format!("{}#{}", t.content_type, t.object_id),
        None => "global".to_string(),
    }
}

/// Storage trait for role assignments.
///
/// Targets are exact: `None` selects global assignments only.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Insert an assignment.
    ///
    /// Fails with [`AccessError::DuplicateAssignment`] if a row with the same
    /// key exists.
    async fn insert(&self, assignment: RoleAssignment) -> AccessResult<RoleAssignment>;

    /// Insert an assignment of a unique role.
    ///
    /// Additionally fails with [`AccessError::UniqueRoleTaken`] if another
    /// user holds the same role on the same target.
    async fn insert_exclusive(&self, assignment: RoleAssignment) -> AccessResult<RoleAssignment>;

    /// Delete the assignment with the given key.
    ///
    /// Fails with [`AccessError::AssignmentNotFound`] if there is none.
    async fn delete(&self, key: &AssignmentKey) -> AccessResult<RoleAssignment>;

    /// Check if an assignment with the given key exists.
    async fn exists(&self, key: &AssignmentKey) -> AccessResult<bool>;

    /// Get a user's assignments on a target.
    async fn find_for_user(
        &self,
        user_id: Uuid,
        target: Option<ObjectRef>,
    ) -> AccessResult<Vec<RoleAssignment>>;

    /// Get the assignments of a role on a target.
    async fn find_for_role(
        &self,
        role_class: &str,
        target: Option<ObjectRef>,
    ) -> AccessResult<Vec<RoleAssignment>>;

    /// Get every assignment of a user.
    async fn list_for_user(&self, user_id: Uuid) -> AccessResult<Vec<RoleAssignment>>;

    /// Delete every assignment of a user. Returns the number of rows removed.
    async fn delete_user(&self, user_id: Uuid) -> AccessResult<usize>;

    /// Delete every assignment targeting a content type. Returns the number
    /// of rows removed.
    async fn delete_content_type(&self, content_type: ContentTypeId) -> AccessResult<usize>;

    /// Get store stats.
    async fn stats(&self) -> StoreStats;
}

/// Assignment store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Stored assignments
    pub assignments: usize,
    /// Global assignments among them
    pub global_assignments: usize,
    /// Distinct users holding at least one role
    pub users: usize,
}

/// In-memory assignment store.
///
/// This is suitable for single-process applications and testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssignmentStore {
    rows: Arc<RwLock<HashMap<AssignmentKey, RoleAssignment>>>,
}

impl MemoryAssignmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn duplicate(assignment: &RoleAssignment) -> AccessError {
        AccessError::DuplicateAssignment {
            user_id: assignment.user_id,
            role: assignment.role_class.clone(),
            target: describe_target(assignment.target()),
        }
    }

    fn sorted<'a, I>(rows: I) -> Vec<RoleAssignment>
    where
        I: Iterator<Item = &'a RoleAssignment>,
    {
        let mut result: Vec<RoleAssignment> = rows.cloned().collect();
        result.sort_by_key(|a| a.id);
        result
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn insert(&self, assignment: RoleAssignment) -> AccessResult<RoleAssignment> {
        let mut rows = self.rows.write().await;
        let key = assignment.key();
        if rows.contains_key(&key) {
            return Err(Self::duplicate(&assignment));
        }
        rows.insert(key, assignment.clone());
        Ok(assignment)
    }

    async fn insert_exclusive(&self, assignment: RoleAssignment) -> AccessResult<RoleAssignment> {
        let mut rows = self.rows.write().await;
        let key = assignment.key();
        if rows.contains_key(&key) {
            return Err(Self::duplicate(&assignment));
        }

        let target = assignment.target();
        let taken = rows.values().any(|existing| {
            existing.role_class == assignment.role_class
                && existing.is_on(target)
                && existing.user_id != assignment.user_id
        });
        if taken {
            return Err(AccessError::UniqueRoleTaken {
                role: assignment.role_class.clone(),
                target: describe_target(target),
            });
        }

        rows.insert(key, assignment.clone());
        Ok(assignment)
    }

    async fn delete(&self, key: &AssignmentKey) -> AccessResult<RoleAssignment> {
        let mut rows = self.rows.write().await;
        rows.remove(key).ok_or_else(|| {
            let target = match (key.content_type_id, key.object_id) {
                (Some(content_type), Some(object_id)) => Some(ObjectRef::new(content_type, object_id)),
                _ => None,
            };
            AccessError::AssignmentNotFound {
                user_id: key.user_id,
                role: key.role_class.clone(),
                target: describe_target(target),
            }
        })
    }

    async fn exists(&self, key: &AssignmentKey) -> AccessResult<bool> {
        Ok(self.rows.read().await.contains_key(key))
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        target: Option<ObjectRef>,
    ) -> AccessResult<Vec<RoleAssignment>> {
        let rows = self.rows.read().await;
        Ok(Self::sorted(
            rows.values()
                .filter(|a| a.user_id == user_id && a.is_on(target)),
        ))
    }

    async fn find_for_role(
        &self,
        role_class: &str,
        target: Option<ObjectRef>,
    ) -> AccessResult<Vec<RoleAssignment>> {
        let rows = self.rows.read().await;
        Ok(Self::sorted(
            rows.values()
                .filter(|a| a.role_class == role_class && a.is_on(target)),
        ))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AccessResult<Vec<RoleAssignment>> {
        let rows = self.rows.read().await;
        Ok(Self::sorted(rows.values().filter(|a| a.user_id == user_id)))
    }

    async fn delete_user(&self, user_id: Uuid) -> AccessResult<usize> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|key, _| key.user_id != user_id);
        Ok(before - rows.len())
    }

    async fn delete_content_type(&self, content_type: ContentTypeId) -> AccessResult<usize> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|key, _| key.content_type_id != Some(content_type));
        Ok(before - rows.len())
    }

    async fn stats(&self) -> StoreStats {
        let rows = self.rows.read().await;
        let mut users: Vec<Uuid> = rows.keys().map(|k| k.user_id).collect();
        users.sort();
        users.dedup();

        StoreStats {
            assignments: rows.len(),
            global_assignments: rows.values().filter(|a| a.is_global()).count(),
            users: users.len(),
        }
    }
}
