//! Permission checker
//!
//! The checker ties the role registry, the permission and content type
//! registries and an [`AssignmentStore`] together. It assigns and revokes
//! roles, and resolves permission checks:
//!
//! 1. Roles the user holds on the target decide through their explicit rules.
//! 2. Otherwise the target's parents are walked level by level; roles held on
//!    a parent decide through their inheritance policy.
//! 3. Otherwise global roles decide, explicit rules first, then inheritance.
//! 4. Otherwise the permission is refused.
//!
//! Within one level a refusal wins over a grant. The first level with a
//! decision ends the walk.

use rolegate_rbac::{
    get_parents, inherit_check, string_to_permission, AssignmentKey, ContentTypeId,
    ContentTypeRegistry, Model, ObjectRef, Permission, PermissionRegistry, Role, RoleAssignment,
    RoleRef, RoleRegistry, Verdict,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::CheckerConfig;
use crate::error::{AccessError, AccessResult};
use crate::store::{describe_target, AssignmentStore};

/// Merge the verdicts of one level: a refusal wins over a grant.
fn combine<I>(verdicts: I) -> Verdict
where
    I: IntoIterator<Item = Verdict>,
{
    let mut result = Verdict::NotApplicable;
    for verdict in verdicts {
        match verdict {
            Verdict::Deny => return Verdict::Deny,
            Verdict::Allow => result = Verdict::Allow,
            Verdict::NotApplicable => {}
        }
    }
    result
}

/// Role assignment and permission resolution service.
pub struct PermissionChecker {
    roles: Arc<RoleRegistry>,
    permissions: Arc<dyn PermissionRegistry>,
    content_types: Arc<dyn ContentTypeRegistry>,
    store: Arc<dyn AssignmentStore>,
    config: CheckerConfig,
}

impl std::fmt::Debug for PermissionChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionChecker")
            .field("roles", &self.roles.len())
            .field("config", &self.config)
            .finish()
    }
}

impl PermissionChecker {
    /// Create a checker.
    ///
    /// # Errors
    ///
    /// [`AccessError::Config`] when the configuration does not validate.
    pub fn new(
        roles: Arc<RoleRegistry>,
        permissions: Arc<dyn PermissionRegistry>,
        content_types: Arc<dyn ContentTypeRegistry>,
        store: Arc<dyn AssignmentStore>,
        config: CheckerConfig,
    ) -> AccessResult<Self> {
        config.validate()?;
        Ok(Self {
            roles,
            permissions,
            content_types,
            store,
            config,
        })
    }

    /// The role registry.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// The assignment store.
    pub fn store(&self) -> &Arc<dyn AssignmentStore> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Resolve a model instance to its content type and primary key.
    pub fn object_ref(&self, model: &dyn Model) -> AccessResult<ObjectRef> {
        let model_type = model.model_type();
        let content_type = self
            .content_types
            .get_for_model(&model_type)
            .ok_or_else(|| AccessError::UnknownContentType(model_type.to_string()))?;
        Ok(ObjectRef::new(content_type.id, model.pk()))
    }

    fn target_ref(&self, target: Option<&dyn Model>) -> AccessResult<Option<ObjectRef>> {
        target.map(|model| self.object_ref(model)).transpose()
    }

    /// Resolve parents to object references, dropping the ones already seen.
    fn unvisited(
        &self,
        parents: Vec<Arc<dyn Model>>,
        visited: &mut HashSet<ObjectRef>,
    ) -> AccessResult<Vec<(ObjectRef, Arc<dyn Model>)>> {
        let mut level = Vec::with_capacity(parents.len());
        for parent in parents {
            let parent_ref = self.object_ref(parent.as_ref())?;
            if visited.insert(parent_ref) {
                level.push((parent_ref, parent));
            }
        }
        Ok(level)
    }

    /// Assign a role to a user, on a target object or globally.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Rbac`] with `RoleNotFound` if the role is not registered
    /// - [`AccessError::InvalidAssignment`] if the target's model type is
    ///   outside the role's scope
    /// - [`AccessError::UniqueRoleTaken`] if the role is unique and another
    ///   user holds it on the target
    /// - [`AccessError::DuplicateAssignment`] if the user already holds it
    #[instrument(skip(self, role, target), fields(user_id = %user_id))]
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role: impl Into<RoleRef> + Send,
        target: Option<&dyn Model>,
    ) -> AccessResult<RoleAssignment> {
        let role = self.roles.resolve_role(role)?;

        if let Some(model) = target {
            let model_type = model.model_type();
            if !role.models().covers(&model_type) {
                return Err(AccessError::InvalidAssignment {
                    role: role.class_name().to_string(),
                    model: model_type.to_string(),
                });
            }
        }

        let target = self.target_ref(target)?;
        let assignment = RoleAssignment::new(user_id, role.class_name(), target)?;
        let assignment = if role.is_unique() && self.config.enforce_unique_roles {
            self.store.insert_exclusive(assignment).await?
        } else {
            self.store.insert(assignment).await?
        };

        info!(
            role = %role.class_name(),
            target = %describe_target(target),
            "Role assigned"
        );
        Ok(assignment)
    }

    /// Revoke a role from a user.
    ///
    /// # Errors
    ///
    /// [`AccessError::AssignmentNotFound`] if the user does not hold the role
    /// on the target.
    #[instrument(skip(self, role, target), fields(user_id = %user_id))]
    pub async fn remove_role(
        &self,
        user_id: Uuid,
        role: impl Into<RoleRef> + Send,
        target: Option<&dyn Model>,
    ) -> AccessResult<()> {
        let role = self.roles.resolve_role(role)?;
        let target = self.target_ref(target)?;
        let key = AssignmentKey::new(user_id, role.class_name(), target)?;

        self.store.delete(&key).await?;
        info!(
            role = %role.class_name(),
            target = %describe_target(target),
            "Role removed"
        );
        Ok(())
    }

    /// Check if a user holds a role on a target (`None` for global).
    pub async fn has_role(
        &self,
        user_id: Uuid,
        role: impl Into<RoleRef> + Send,
        target: Option<&dyn Model>,
    ) -> AccessResult<bool> {
        let role = self.roles.resolve_role(role)?;
        let target = self.target_ref(target)?;
        let key = AssignmentKey::new(user_id, role.class_name(), target)?;
        self.store.exists(&key).await
    }

    /// Get the users holding a role on a target (`None` for global).
    pub async fn get_users(
        &self,
        role: impl Into<RoleRef> + Send,
        target: Option<&dyn Model>,
    ) -> AccessResult<Vec<Uuid>> {
        let role = self.roles.resolve_role(role)?;
        let target = self.target_ref(target)?;
        let rows = self.store.find_for_role(role.class_name(), target).await?;
        Ok(rows.into_iter().map(|a| a.user_id).collect())
    }

    /// Get the roles a user holds on a target (`None` for global).
    ///
    /// # Errors
    ///
    /// `RoleNotFound` if a stored assignment refers to an unregistered role.
    pub async fn get_roles(
        &self,
        user_id: Uuid,
        target: Option<&dyn Model>,
    ) -> AccessResult<Vec<Arc<Role>>> {
        let target = self.target_ref(target)?;
        let rows = self.store.find_for_user(user_id, target).await?;
        rows.iter()
            .map(|a| a.role(&self.roles).map_err(AccessError::from))
            .collect()
    }

    /// Check if a user holds a permission, on a target object or globally.
    ///
    /// `permission` is a string of the form `app_label.codename`.
    ///
    /// # Errors
    ///
    /// - `MalformedPermission` / `PermissionNotFound` for a bad permission
    /// - `ParentNotFound` if a model declares a parent it does not have
    /// - [`AccessError::UnknownContentType`] for an unregistered model type
    #[instrument(skip(self, target), fields(user_id = %user_id))]
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        permission: &str,
        target: Option<&dyn Model>,
    ) -> AccessResult<bool> {
        let permission = string_to_permission(self.permissions.as_ref(), permission)?;

        if let Some(model) = target {
            let verdict = self.check_object(user_id, &permission, model).await?;
            if let Some(allowed) = verdict.decision() {
                return Ok(allowed);
            }
        }

        if self.config.check_global_roles {
            let verdict = self.check_global(user_id, &permission).await?;
            if let Some(allowed) = verdict.decision() {
                debug!(allowed, "Decided by global role");
                return Ok(allowed);
            }
        }

        debug!("No role decided, refusing");
        Ok(false)
    }

    async fn check_object(
        &self,
        user_id: Uuid,
        permission: &Permission,
        model: &dyn Model,
    ) -> AccessResult<Verdict> {
        let target = self.object_ref(model)?;
        let rows = self.store.find_for_user(user_id, Some(target)).await?;

        let mut verdicts = Vec::with_capacity(rows.len());
        for assignment in &rows {
            verdicts.push(assignment.role(&self.roles)?.explicit_check(permission));
        }
        let verdict = combine(verdicts);
        if verdict.is_applicable() {
            debug!(?verdict, target = %describe_target(Some(target)), "Decided on target");
            return Ok(verdict);
        }

        // Each object is checked once, at the closest level it appears on
        let perm = permission.to_string();
        let mut visited = HashSet::from([target]);
        let mut level = self.unvisited(get_parents(model)?, &mut visited)?;
        let mut depth = 0;
        while !level.is_empty() {
            depth += 1;

            let mut verdicts = Vec::new();
            for (parent_ref, _) in &level {
                for assignment in self.store.find_for_user(user_id, Some(*parent_ref)).await? {
                    verdicts.push(inherit_check(&self.roles, &assignment, &perm)?);
                }
            }

            let verdict = combine(verdicts);
            if verdict.is_applicable() {
                debug!(?verdict, depth, "Decided by inherited role");
                return Ok(verdict);
            }

            if depth >= self.config.max_parent_depth {
                warn!(depth, "Parent walk reached maximum depth, stopping");
                break;
            }

            let mut next = Vec::new();
            for (_, parent) in &level {
                next.extend(self.unvisited(get_parents(parent.as_ref())?, &mut visited)?);
            }
            level = next;
        }

        Ok(Verdict::NotApplicable)
    }

    async fn check_global(&self, user_id: Uuid, permission: &Permission) -> AccessResult<Verdict> {
        let rows = self.store.find_for_user(user_id, None).await?;
        let perm = permission.to_string();

        let mut verdicts = Vec::with_capacity(rows.len());
        for assignment in &rows {
            let role = assignment.role(&self.roles)?;
            let verdict = match role.explicit_check(permission) {
                Verdict::NotApplicable => role.inherit_check(&perm),
                verdict => verdict,
            };
            verdicts.push(verdict);
        }
        Ok(combine(verdicts))
    }

    /// Delete every role assignment of a user.
    ///
    /// Call this when the user is deleted.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> AccessResult<usize> {
        let removed = self.store.delete_user(user_id).await?;
        info!(removed, "Removed role assignments of deleted user");
        Ok(removed)
    }

    /// Delete every role assignment targeting a content type.
    ///
    /// Call this when the content type is deleted.
    #[instrument(skip(self), fields(content_type = %content_type))]
    pub async fn delete_content_type(&self, content_type: ContentTypeId) -> AccessResult<usize> {
        let removed = self.store.delete_content_type(content_type).await?;
        info!(removed, "Removed role assignments of deleted content type");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryAssignmentStore, StoreStats};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use rolegate_rbac::{
        MemoryContentTypes, MemoryPermissionRegistry, ModelType, Relation, RoleOptions,
    };

    struct Folder {
        id: u64,
        parent: Option<Arc<Folder>>,
    }

    impl Model for Folder {
        fn model_type(&self) -> ModelType {
            ModelType::new("files", "folder")
        }

        fn pk(&self) -> u64 {
            self.id
        }

        fn role_options(&self) -> Option<RoleOptions> {
            Some(RoleOptions {
                permission_parents: &["parent"],
            })
        }

        fn relation(&self, name: &str) -> Option<Relation> {
            match name {
                "parent" => Some(match &self.parent {
                    Some(parent) => Relation::Instance(parent.clone()),
                    None => Relation::Null,
                }),
                _ => None,
            }
        }
    }

    /// A folder with up to two parents and a free list of declared parents.
    struct Node {
        id: u64,
        declared: &'static [&'static str],
        left: Option<Arc<Node>>,
        right: Option<Arc<Node>>,
    }

    impl Node {
        fn root(id: u64, declared: &'static [&'static str]) -> Arc<Self> {
            Arc::new(Self {
                id,
                declared,
                left: None,
                right: None,
            })
        }

        fn under(id: u64, left: &Arc<Node>, right: &Arc<Node>) -> Arc<Self> {
            Arc::new(Self {
                id,
                declared: &["left", "right"],
                left: Some(left.clone()),
                right: Some(right.clone()),
            })
        }
    }

    impl Model for Node {
        fn model_type(&self) -> ModelType {
            ModelType::new("files", "folder")
        }

        fn pk(&self) -> u64 {
            self.id
        }

        fn role_options(&self) -> Option<RoleOptions> {
            Some(RoleOptions {
                permission_parents: self.declared,
            })
        }

        fn relation(&self, name: &str) -> Option<Relation> {
            let side = match name {
                "left" => &self.left,
                "right" => &self.right,
                _ => return None,
            };
            Some(match side {
                Some(node) => Relation::Instance(node.clone()),
                None => Relation::Null,
            })
        }
    }

    /// Memory store that counts assignment lookups.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryAssignmentStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AssignmentStore for CountingStore {
        async fn insert(&self, assignment: RoleAssignment) -> AccessResult<RoleAssignment> {
            self.inner.insert(assignment).await
        }

        async fn insert_exclusive(
            &self,
            assignment: RoleAssignment,
        ) -> AccessResult<RoleAssignment> {
            self.inner.insert_exclusive(assignment).await
        }

        async fn delete(&self, key: &AssignmentKey) -> AccessResult<RoleAssignment> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &AssignmentKey) -> AccessResult<bool> {
            self.inner.exists(key).await
        }

        async fn find_for_user(
            &self,
            user_id: Uuid,
            target: Option<ObjectRef>,
        ) -> AccessResult<Vec<RoleAssignment>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_for_user(user_id, target).await
        }

        async fn find_for_role(
            &self,
            role_class: &str,
            target: Option<ObjectRef>,
        ) -> AccessResult<Vec<RoleAssignment>> {
            self.inner.find_for_role(role_class, target).await
        }

        async fn list_for_user(&self, user_id: Uuid) -> AccessResult<Vec<RoleAssignment>> {
            self.inner.list_for_user(user_id).await
        }

        async fn delete_user(&self, user_id: Uuid) -> AccessResult<usize> {
            self.inner.delete_user(user_id).await
        }

        async fn delete_content_type(&self, content_type: ContentTypeId) -> AccessResult<usize> {
            self.inner.delete_content_type(content_type).await
        }

        async fn stats(&self) -> StoreStats {
            self.inner.stats().await
        }
    }

    fn chain(len: u64) -> Arc<Folder> {
        let mut folder = Arc::new(Folder { id: 1, parent: None });
        for id in 2..=len {
            folder = Arc::new(Folder {
                id,
                parent: Some(folder),
            });
        }
        folder
    }

    fn checker(config: CheckerConfig) -> PermissionChecker {
        checker_with_store(config, Arc::new(MemoryAssignmentStore::new()))
    }

    fn checker_with_store(
        config: CheckerConfig,
        store: Arc<dyn AssignmentStore>,
    ) -> PermissionChecker {
        let folder = ModelType::new("files", "folder");

        let mut content_types = MemoryContentTypes::new();
        content_types.register(folder.clone());

        let mut permissions = MemoryPermissionRegistry::new();
        permissions.add_defaults(&folder);

        let mut roles = RoleRegistry::new();
        roles
            .register(
                Role::builder("FolderOwner")
                    .verbose_name("Folder owner")
                    .models([folder.clone()])
                    .deny(["files.delete_folder"])
                    .inherit_deny(["files.delete_folder"])
                    .unique()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        roles
            .register(
                Role::builder("Viewer")
                    .verbose_name("Viewer")
                    .models([folder])
                    .allow(["files.view_folder"])
                    .inherit_allow(["files.view_folder"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        roles
            .register(
                Role::builder("Blocked")
                    .verbose_name("Blocked")
                    .all_models()
                    .allow(Vec::<String>::new())
                    .build()
                    .unwrap(),
            )
            .unwrap();

        PermissionChecker::new(
            Arc::new(roles),
            Arc::new(permissions),
            Arc::new(content_types),
            store,
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(Vec::<Verdict>::new()), Verdict::NotApplicable);
        assert_eq!(
            combine([Verdict::NotApplicable, Verdict::Allow]),
            Verdict::Allow
        );
        assert_eq!(combine([Verdict::Allow, Verdict::Deny]), Verdict::Deny);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = PermissionChecker::new(
            Arc::new(RoleRegistry::new()),
            Arc::new(MemoryPermissionRegistry::new()),
            Arc::new(MemoryContentTypes::new()),
            Arc::new(MemoryAssignmentStore::new()),
            CheckerConfig {
                max_parent_depth: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AccessError::Config(_))));
    }

    #[tokio::test]
    async fn test_explicit_rules_on_target() {
        let checker = checker(CheckerConfig::default());
        let user = Uuid::now_v7();
        let folder = chain(1);

        checker
            .assign_role(user, "FolderOwner", Some(&*folder))
            .await
            .unwrap();

        assert!(checker
            .has_permission(user, "files.change_folder", Some(&*folder))
            .await
            .unwrap());
        assert!(!checker
            .has_permission(user, "files.delete_folder", Some(&*folder))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_inherited_through_parents() {
        let checker = checker(CheckerConfig::default());
        let user = Uuid::now_v7();
        let leaf = chain(3);
        let root = chain(1);

        checker
            .assign_role(user, "Viewer", Some(&*root))
            .await
            .unwrap();

        assert!(checker
            .has_permission(user, "files.view_folder", Some(&*leaf))
            .await
            .unwrap());
        assert!(!checker
            .has_permission(user, "files.change_folder", Some(&*leaf))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_parent_depth_limit() {
        let checker = checker(CheckerConfig {
            max_parent_depth: 1,
            ..Default::default()
        });
        let user = Uuid::now_v7();
        let leaf = chain(3);
        let root = chain(1);

        checker
            .assign_role(user, "Viewer", Some(&*root))
            .await
            .unwrap();

        assert!(!checker
            .has_permission(user, "files.view_folder", Some(&*leaf))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_deciding_parent_ends_walk_before_its_own_parents() {
        // The root declares a parent relation it does not have
        let root = Node::root(1, &["left", "owner_group"]);
        let leaf = Node::under(2, &root, &root);

        for max_parent_depth in [1, 16] {
            let checker = checker(CheckerConfig {
                max_parent_depth,
                ..Default::default()
            });
            let user = Uuid::now_v7();
            checker
                .assign_role(user, "Viewer", Some(&*root))
                .await
                .unwrap();

            assert!(checker
                .has_permission(user, "files.view_folder", Some(&*leaf))
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_undecided_walk_reports_missing_parent() {
        let root = Node::root(1, &["left", "owner_group"]);
        let leaf = Node::under(2, &root, &root);
        let user = Uuid::now_v7();

        let checker_at = |max_parent_depth| {
            checker(CheckerConfig {
                max_parent_depth,
                ..Default::default()
            })
        };

        // Stopping at the root never reads its parents
        assert!(!checker_at(1)
            .has_permission(user, "files.change_folder", Some(&*leaf))
            .await
            .unwrap());

        let err = checker_at(16)
            .has_permission(user, "files.change_folder", Some(&*leaf))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PARENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_shared_ancestors_are_checked_once() {
        // Every node has the node above it as both left and right parent
        let mut node = Node::root(1, &["left", "right"]);
        for id in 2..=6 {
            node = Node::under(id, &node, &node);
        }

        let store = Arc::new(CountingStore::default());
        let checker = checker_with_store(CheckerConfig::default(), store.clone());

        assert!(!checker
            .has_permission(Uuid::now_v7(), "files.view_folder", Some(&*node))
            .await
            .unwrap());

        // Target, five ancestors and the global lookup
        assert_eq!(store.lookups.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_closest_level_wins() {
        let checker = checker(CheckerConfig::default());
        let user = Uuid::now_v7();
        let leaf = chain(2);

        checker.assign_role(user, "Blocked", None).await.unwrap();
        checker
            .assign_role(user, "Viewer", Some(&*leaf))
            .await
            .unwrap();

        assert!(checker
            .has_permission(user, "files.view_folder", Some(&*leaf))
            .await
            .unwrap());
        assert!(!checker
            .has_permission(user, "files.view_folder", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_global_roles_can_be_disabled() {
        let checker = checker(CheckerConfig {
            check_global_roles: false,
            ..Default::default()
        });
        let user = Uuid::now_v7();

        checker.assign_role(user, "Viewer", None).await.unwrap();
        assert!(!checker
            .has_permission(user, "files.view_folder", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unique_role() {
        let checker = checker(CheckerConfig::default());
        let folder = chain(1);

        checker
            .assign_role(Uuid::now_v7(), "FolderOwner", Some(&*folder))
            .await
            .unwrap();
        let err = checker
            .assign_role(Uuid::now_v7(), "FolderOwner", Some(&*folder))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::UniqueRoleTaken { .. }));
    }

    #[tokio::test]
    async fn test_unique_role_not_enforced() {
        let checker = checker(CheckerConfig {
            enforce_unique_roles: false,
            ..Default::default()
        });
        let folder = chain(1);

        for _ in 0..2 {
            checker
                .assign_role(Uuid::now_v7(), "FolderOwner", Some(&*folder))
                .await
                .unwrap();
        }
        assert_eq!(
            checker
                .get_users("FolderOwner", Some(&*folder))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_bad_permission_strings() {
        let checker = checker(CheckerConfig::default());
        let user = Uuid::now_v7();

        let err = checker
            .has_permission(user, "not-a-valid-format", None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_PERMISSION");

        let err = checker
            .has_permission(user, "bogus.codename", None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_NOT_FOUND");
    }
}
