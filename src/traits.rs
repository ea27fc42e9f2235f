use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::{Debug, Display};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::context::{Actor, RequestContext, ResponseContext};
use crate::errors::ApiError;
use crate::inflector::humanize;
use crate::validation::ValidationErrors;

/// Submitted attributes, keyed by field name
pub type Params = Map<String, Value>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of saving, destroying or running a named operation on one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure(ValidationErrors),
}

impl ActionOutcome {
    /// `Success` when `errors` is empty
    #[must_use]
    pub fn from_errors(errors: ValidationErrors) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::Failure(errors)
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Capability set every controllable domain type provides.
///
/// The controller never reflects on a resource: assignable attributes, supported
/// operations and named scopes are declared here up front.
pub trait CrudResource: Display + Send + Sync + Sized + 'static {
    type Id: Clone + Debug + Display + FromStr + PartialEq + Send + Sync;

    /// Type identifier naming is derived from, e.g. `Blog::Post`
    const CLASS_NAME: &'static str;

    /// `None` until the resource has been persisted
    fn id(&self) -> Option<Self::Id>;

    #[must_use]
    fn is_new_record(&self) -> bool {
        self.id().is_none()
    }

    /// Fields that may be mass-assigned from request parameters
    fn assignable_attributes() -> &'static [&'static str];

    /// Assign already-permitted attributes.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when a value has the wrong shape.
    fn assign_attributes(&mut self, attributes: &Params) -> Result<(), ApiError>;

    fn errors(&self) -> &ValidationErrors;

    fn errors_mut(&mut self) -> &mut ValidationErrors;

    /// Stamp the creating actor. Returns `false` for types without a creator field.
    fn set_created_by(&mut self, _actor: &Actor) -> bool {
        false
    }

    /// Named imperative operations (`approve`, `archive`, ...) this type supports
    #[must_use]
    fn member_actions() -> &'static [&'static str] {
        &[]
    }

    /// Named query scopes usable as the target set of a bulk action
    #[must_use]
    fn named_scopes() -> &'static [&'static str] {
        &[]
    }

    #[must_use]
    fn supports_action(action: &str) -> bool {
        action == "destroy" || Self::member_actions().contains(&action)
    }

    #[must_use]
    fn human_attribute_name(attribute: &str) -> String {
        humanize(attribute)
    }

    /// Attributes nested under `key` (`post[title]`), reduced to the assignable ones.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the param key is missing or empty.
    fn permitted_params(params: &Params, key: &str) -> Result<Params, ApiError> {
        match params.get(key) {
            Some(Value::Object(attributes)) if !attributes.is_empty() => {
                Ok(assignable_subset::<Self>(attributes))
            }
            _ => Err(ApiError::bad_request(format!(
                "param is missing or the value is empty: {key}"
            ))),
        }
    }
}

/// Keeps only the entries `R` declares as assignable
#[must_use]
pub fn assignable_subset<R: CrudResource>(params: &Params) -> Params {
    params
        .iter()
        .filter(|(key, _)| R::assignable_attributes().contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Persistence collaborator for one resource type.
///
/// Implementations typically wrap a `sea_orm::DatabaseConnection`; a `DbErr` converts
/// into [`ApiError`] with `?`. Validation problems are reported through
/// [`ActionOutcome::Failure`], never as `Err`.
#[async_trait]
pub trait ResourceScope<R: CrudResource>: Send + Sync {
    /// A blank, unsaved resource
    fn build(&self) -> R;

    /// # Errors
    /// `ApiError::NotFound` when no resource has `id`.
    async fn find(&self, id: &R::Id) -> Result<R, ApiError>;

    async fn all(&self) -> Result<Vec<R>, ApiError>;

    async fn where_ids(&self, ids: &[R::Id]) -> Result<Vec<R>, ApiError>;

    /// Resources matched by one of [`CrudResource::named_scopes`]
    async fn named_scope(&self, name: &str) -> Result<Vec<R>, ApiError>;

    /// Persist `resource`; `action` is the resolved commit verb (`create`, `update`, ...)
    async fn save(&self, resource: &mut R, action: &str) -> Result<ActionOutcome, ApiError>;

    async fn destroy(&self, resource: &mut R) -> Result<ActionOutcome, ApiError>;

    /// Run a declared member operation, e.g. `approve`
    async fn perform(&self, resource: &mut R, action: &str) -> Result<ActionOutcome, ApiError>;

    /// Refresh `resource` from storage
    async fn reload(&self, resource: &mut R) -> Result<(), ApiError>;

    /// Run `work` inside one all-or-nothing storage transaction
    async fn transaction<'a, T, F>(&'a self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'a,
        F: FnOnce() -> BoxFuture<'a, Result<T, ApiError>> + Send + 'a;
}

/// What an authorization check is made against
#[derive(Debug)]
pub enum AuthorizationTarget<'a, R> {
    /// The resource type as a whole (index, bulk actions)
    Type,
    Resource(&'a R),
}

impl<R> Clone for AuthorizationTarget<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for AuthorizationTarget<'_, R> {}

pub trait Authorizer<R: CrudResource>: Send + Sync {
    fn is_authorized(&self, actor: &Actor, action: &str, target: AuthorizationTarget<'_, R>)
    -> bool;
}

/// Template lookup and rendering
pub trait Templates: Send + Sync {
    /// Whether `prefix/name` (e.g. `admin/posts/approve`) can be rendered
    fn template_exists(&self, prefix: &str, name: &str) -> bool;

    /// # Errors
    /// Any rendering failure, usually `ApiError::Internal`.
    fn render(&self, prefix: &str, name: &str, locals: &Params) -> Result<String, ApiError>;
}

/// Per-controller customization points; every method has a no-op default.
#[async_trait]
pub trait CrudHooks<R: CrudResource>: Send + Sync {
    /// Runs before any view is rendered, including error re-renders
    async fn before_render(
        &self,
        _action: &str,
        _request: &RequestContext,
        _response: &mut ResponseContext,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    /// Build an unsaved copy of `source` for the `new` action's `duplicate_id`
    async fn duplicate_resource(&self, _source: &R) -> Result<R, ApiError> {
        Err(ApiError::configuration(format!(
            "duplicate_resource is not implemented for {}",
            R::CLASS_NAME
        )))
    }

    /// Called for every resource a bulk action could not process
    fn on_bulk_failure(&self, _resource: &R, _action: &str, _reason: &str) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<R: CrudResource> CrudHooks<R> for NoHooks {}
