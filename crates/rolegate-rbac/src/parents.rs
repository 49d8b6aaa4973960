//! # Parent Chains
//!
//! Model instances can declare "parent" relations through their role options.
//! Permissions inherited from roles held on a parent flow down to the
//! instance, so the resolver walks these relations upwards.

use std::fmt;
use std::sync::Arc;

use crate::content_types::ModelType;
use crate::error::{RbacError, RbacResult};

/// Role-related options declared by a model type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleOptions {
    /// Names of the relations pointing to parent objects, in lookup order.
    pub permission_parents: &'static [&'static str],
}

/// Value of a named relation on a model instance.
pub enum Relation {
    /// The relation points to an instance.
    Instance(Arc<dyn Model>),
    /// The relation exists but is empty.
    Null,
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Instance(model) => f
                .debug_tuple("Instance")
                .field(&model.model_type())
                .field(&model.pk())
                .finish(),
            Relation::Null => f.write_str("Null"),
        }
    }
}

/// A model instance roles can be assigned on.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rolegate_rbac::content_types::ModelType;
/// use rolegate_rbac::parents::{get_parents, Model, Relation, RoleOptions};
///
/// struct Library { id: u64 }
///
/// impl Model for Library {
///     fn model_type(&self) -> ModelType { ModelType::new("library", "library") }
///     fn pk(&self) -> u64 { self.id }
/// }
///
/// struct Book { id: u64, library: Arc<Library> }
///
/// impl Model for Book {
///     fn model_type(&self) -> ModelType { ModelType::new("library", "book") }
///     fn pk(&self) -> u64 { self.id }
///     fn role_options(&self) -> Option<RoleOptions> {
///         Some(RoleOptions { permission_parents: &["library"] })
///     }
///     fn relation(&self, name: &str) -> Option<Relation> {
///         match name {
///             "library" => Some(Relation::Instance(self.library.clone())),
///             _ => None,
///         }
///     }
/// }
///
/// let book = Book { id: 7, library: Arc::new(Library { id: 1 }) };
/// let parents = get_parents(&book).unwrap();
/// assert_eq!(parents.len(), 1);
/// assert_eq!(parents[0].pk(), 1);
/// ```
pub trait Model: Send + Sync {
    /// Model type of the instance.
    fn model_type(&self) -> ModelType;

    /// Primary key of the instance.
    fn pk(&self) -> u64;

    /// Role options declared by the model type, if any.
    fn role_options(&self) -> Option<RoleOptions> {
        None
    }

    /// Resolve a named relation.
    ///
    /// Returns `None` when the instance has no relation with that name.
    fn relation(&self, _name: &str) -> Option<Relation> {
        None
    }
}

/// Return the instances declared as parents of a model instance.
///
/// Parents are returned in declaration order. Empty relations are skipped.
///
/// # Errors
///
/// [`RbacError::ParentNotFound`] if a declared relation does not exist on the
/// instance.
pub fn get_parents(model: &dyn Model) -> RbacResult<Vec<Arc<dyn Model>>> {
    let Some(options) = model.role_options() else {
        return Ok(Vec::new());
    };

    let mut result = Vec::with_capacity(options.permission_parents.len());
    for name in options.permission_parents {
        match model.relation(name) {
            Some(Relation::Instance(parent)) => result.push(parent),
            Some(Relation::Null) => {}
            None => return Err(RbacError::ParentNotFound((*name).to_string())),
        }
    }
    Ok(result)
}
