//! Role descriptors
//!
//! A role is a named, statically declared bundle of permission rules. It
//! carries:
//!
//! - a **model scope**: the model types it can be assigned on, or all models
//! - explicit **rules**: an allow-list or a deny-list of permissions that
//!   apply to objects the role is assigned on
//! - an **inheritance** policy: which permissions flow down to the children
//!   of those objects
//!
//! Descriptors are built with [`RoleBuilder`], which rejects invalid
//! combinations, and registered in a [`RoleRegistry`](crate::registry::RoleRegistry)
//! at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::content_types::ModelType;
use crate::error::{RbacError, RbacResult, ROLE_CLASS_MAX_LEN};
use crate::permissions::{split_permission, Permission};

/// Three-valued outcome of evaluating a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The rule has nothing to say about this permission.
    #[default]
    NotApplicable,
    /// The permission is granted.
    Allow,
    /// The permission is refused.
    Deny,
}

impl Verdict {
    /// Build an applicable verdict from a boolean.
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }

    /// Check if the verdict carries a decision.
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Verdict::NotApplicable)
    }

    /// Check if the verdict grants the permission.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// `Some(allowed)` when applicable, `None` otherwise.
    pub fn decision(&self) -> Option<bool> {
        match self {
            Verdict::NotApplicable => None,
            Verdict::Allow => Some(true),
            Verdict::Deny => Some(false),
        }
    }
}

/// The model types a role applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelScope {
    /// Every model type.
    All,
    /// Only the listed model types.
    Specific(BTreeSet<ModelType>),
}

impl ModelScope {
    /// Build a specific scope from model types.
    pub fn specific<I>(models: I) -> Self
    where
        I: IntoIterator<Item = ModelType>,
    {
        ModelScope::Specific(models.into_iter().collect())
    }

    /// Check if the scope covers every model type.
    pub fn is_all(&self) -> bool {
        matches!(self, ModelScope::All)
    }

    /// Check if the scope includes a model type.
    pub fn covers(&self, model_type: &ModelType) -> bool {
        match self {
            ModelScope::All => true,
            ModelScope::Specific(models) => models.contains(model_type),
        }
    }
}

/// Explicit rules of a role, applied on the objects it is assigned on.
///
/// Entries are permission strings (`app_label.codename`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rules {
    /// Only the listed permissions are granted.
    AllowList(BTreeSet<String>),
    /// Every permission is granted except the listed ones.
    DenyList(BTreeSet<String>),
}

impl Rules {
    /// Evaluate a permission string against the rules.
    ///
    /// Always applicable: rules either grant or refuse.
    pub fn evaluate(&self, permission: &str) -> Verdict {
        match self {
            Rules::AllowList(allowed) => Verdict::from_allowed(allowed.contains(permission)),
            Rules::DenyList(denied) => Verdict::from_allowed(!denied.contains(permission)),
        }
    }
}

/// Which permissions a role passes down to the children of its targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Inheritance {
    /// Nothing is inherited.
    #[default]
    Disabled,
    /// Only the listed permissions are inherited.
    AllowList(BTreeSet<String>),
    /// Every permission is inherited except the listed ones.
    DenyList(BTreeSet<String>),
}

impl Inheritance {
    /// Check if inheritance is enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Inheritance::Disabled)
    }

    /// Evaluate a permission string.
    ///
    /// A listed permission always decides. An unlisted one only decides when
    /// the role covers all models: refused in allow-list mode, granted in
    /// deny-list mode.
    pub fn evaluate(&self, permission: &str, scope: &ModelScope) -> Verdict {
        match self {
            Inheritance::Disabled => Verdict::NotApplicable,
            Inheritance::AllowList(allowed) => {
                if allowed.contains(permission) {
                    Verdict::Allow
                } else if scope.is_all() {
                    Verdict::Deny
                } else {
                    Verdict::NotApplicable
                }
            }
            Inheritance::DenyList(denied) => {
                if denied.contains(permission) {
                    Verdict::Deny
                } else if scope.is_all() {
                    Verdict::Allow
                } else {
                    Verdict::NotApplicable
                }
            }
        }
    }
}

/// A role descriptor.
///
/// # Examples
///
/// ```
/// use rolegate_rbac::content_types::ModelType;
/// use rolegate_rbac::roles::{Role, Verdict};
///
/// let librarian = Role::builder("LibraryOwner")
///     .verbose_name("Librarian")
///     .models([ModelType::new("library", "library")])
///     .deny(Vec::<String>::new())
///     .inherit_allow(["library.view_book"])
///     .build()
///     .unwrap();
///
/// assert_eq!(librarian.inherit_check("library.view_book"), Verdict::Allow);
/// assert_eq!(librarian.inherit_check("library.delete_book"), Verdict::NotApplicable);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    class_name: String,
    verbose_name: String,
    models: ModelScope,
    rules: Rules,
    inheritance: Inheritance,
    unique: bool,
}

impl Role {
    /// Start declaring a role with the given class name.
    pub fn builder(class_name: impl Into<String>) -> RoleBuilder {
        RoleBuilder::new(class_name)
    }

    /// Class name identifying the role.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Human-readable name.
    pub fn verbose_name(&self) -> &str {
        &self.verbose_name
    }

    /// Model types the role applies to.
    pub fn models(&self) -> &ModelScope {
        &self.models
    }

    /// Explicit rules.
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Inheritance policy.
    pub fn inheritance(&self) -> &Inheritance {
        &self.inheritance
    }

    /// Whether at most one user can hold the role on a given object.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Evaluate the role's explicit rules for a permission.
    ///
    /// The rules only apply to permissions whose model type is inside the
    /// role's scope.
    pub fn explicit_check(&self, permission: &Permission) -> Verdict {
        if !self.models.covers(&permission.model_type) {
            return Verdict::NotApplicable;
        }
        self.rules.evaluate(&permission.to_string())
    }

    /// Evaluate the role's inheritance policy for a permission string.
    pub fn inherit_check(&self, permission: &str) -> Verdict {
        self.inheritance.evaluate(permission, &self.models)
    }
}

/// Builder collecting a role declaration before validation.
#[derive(Debug, Clone, Default)]
pub struct RoleBuilder {
    class_name: String,
    verbose_name: Option<String>,
    models: Option<ModelScope>,
    allow: Option<BTreeSet<String>>,
    deny: Option<BTreeSet<String>>,
    inherit: bool,
    inherit_allow: Option<BTreeSet<String>>,
    inherit_deny: Option<BTreeSet<String>>,
    unique: bool,
}

fn collect<I, S>(perms: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    perms.into_iter().map(Into::into).collect()
}

impl RoleBuilder {
    /// Create a builder for the given class name.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Set the human-readable name.
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    /// Make the role apply to every model type.
    pub fn all_models(mut self) -> Self {
        self.models = Some(ModelScope::All);
        self
    }

    /// Restrict the role to the given model types.
    pub fn models<I>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = ModelType>,
    {
        self.models = Some(ModelScope::specific(models));
        self
    }

    /// Grant only these permissions on assigned objects.
    pub fn allow<I, S>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(collect(perms));
        self
    }

    /// Grant every permission on assigned objects except these.
    pub fn deny<I, S>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = Some(collect(perms));
        self
    }

    /// Enable inheritance. Also implied by [`inherit_allow`](Self::inherit_allow)
    /// and [`inherit_deny`](Self::inherit_deny).
    pub fn inherit(mut self) -> Self {
        self.inherit = true;
        self
    }

    /// Inherit only these permissions.
    pub fn inherit_allow<I, S>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit = true;
        self.inherit_allow = Some(collect(perms));
        self
    }

    /// Inherit every permission except these.
    pub fn inherit_deny<I, S>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit = true;
        self.inherit_deny = Some(collect(perms));
        self
    }

    /// Allow at most one holder of the role per object.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Validate the declaration and produce the descriptor.
    ///
    /// # Errors
    ///
    /// [`RbacError::ImproperlyConfigured`] when the verbose name or the models
    /// are missing, when both or neither of `allow`/`deny` are declared, when
    /// inheritance is enabled without exactly one of
    /// `inherit_allow`/`inherit_deny`, when a permission entry is not in
    /// `app_label.codename` form, or when a unique role covers all models.
    /// [`RbacError::RoleClassTooLong`] when the class name does not fit the
    /// assignment table.
    pub fn build(self) -> RbacResult<Role> {
        let name = self.class_name.as_str();
        if name.chars().count() > ROLE_CLASS_MAX_LEN {
            return Err(RbacError::RoleClassTooLong(self.class_name));
        }

        let verbose_name = self
            .verbose_name
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RbacError::improperly_configured(name, "missing verbose name"))?;

        let models = match self.models {
            Some(ModelScope::Specific(models)) if models.is_empty() => {
                return Err(RbacError::improperly_configured(
                    name,
                    "model list must not be empty",
                ))
            }
            Some(models) => models,
            None => return Err(RbacError::improperly_configured(name, "missing models")),
        };

        let rules = match (self.allow, self.deny) {
            (Some(allow), None) => Rules::AllowList(allow),
            (None, Some(deny)) => Rules::DenyList(deny),
            (Some(_), Some(_)) => {
                return Err(RbacError::improperly_configured(
                    name,
                    "allow and deny are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(RbacError::improperly_configured(
                    name,
                    "one of allow or deny must be declared",
                ))
            }
        };

        let inheritance = if self.inherit {
            match (self.inherit_allow, self.inherit_deny) {
                (Some(allow), None) => Inheritance::AllowList(allow),
                (None, Some(deny)) => Inheritance::DenyList(deny),
                (Some(_), Some(_)) => {
                    return Err(RbacError::improperly_configured(
                        name,
                        "inherit_allow and inherit_deny are mutually exclusive",
                    ))
                }
                (None, None) => {
                    return Err(RbacError::improperly_configured(
                        name,
                        "inherit requires one of inherit_allow or inherit_deny",
                    ))
                }
            }
        } else {
            Inheritance::Disabled
        };

        let listed = match &rules {
            Rules::AllowList(perms) | Rules::DenyList(perms) => perms.iter(),
        };
        let inherited = match &inheritance {
            Inheritance::AllowList(perms) | Inheritance::DenyList(perms) => perms.iter().collect(),
            Inheritance::Disabled => Vec::new(),
        };
        for perm in listed.chain(inherited) {
            if split_permission(perm).is_err() {
                return Err(RbacError::improperly_configured(
                    name,
                    format!("invalid permission entry: {}", perm),
                ));
            }
        }

        if self.unique && models.is_all() {
            return Err(RbacError::improperly_configured(
                name,
                "unique roles must be restricted to specific models",
            ));
        }

        Ok(Role {
            class_name: self.class_name,
            verbose_name,
            models,
            rules,
            inheritance,
            unique: self.unique,
        })
    }
}
