//! # CRUD Controller
//!
//! One generic implementation of the seven resource actions plus member and
//! collection actions, shared by every type implementing [`CrudResource`].
//!
//! A controller owns its collaborators:
//!
//! - a [`ResourceScope`] for persistence,
//! - an [`Authorizer`] gate,
//! - a [`Templates`] lookup,
//! - optional [`CrudHooks`].
//!
//! ```rust,ignore
//! let posts = CrudController::new(PostScope::new(db), PostPolicy, views)
//!     .with_config(ControllerConfig::default().with_namespaces(["admin"]).with_per_page(25));
//!
//! let response = posts.create(&request).await?;
//! ```
//!
//! Actions return an [`crate::ActionResponse`]; turning it into HTTP is the job of
//! [`crate::routes`].

mod actions;
mod paths;
mod respond;

use std::marker::PhantomData;

use crate::config::{ControllerConfig, RedirectTarget};
use crate::context::{Actor, RequestContext};
use crate::errors::ApiError;
use crate::naming::ResourceNaming;
use crate::traits::{
    AuthorizationTarget, Authorizer, CrudHooks, CrudResource, NoHooks, ResourceScope, Templates,
};

/// The verb an action commits, resolved from the submit button that was pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAction {
    pub action: String,
    pub redirect: Option<RedirectTarget>,
}

impl CommitAction {
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            redirect: None,
        }
    }

    /// Replaces the generic `save` verb with `action`
    #[must_use]
    pub fn or_action(mut self, action: &str) -> Self {
        if self.action == "save" {
            self.action = action.to_string();
        }
        self
    }
}

pub struct CrudController<R, S, A, T, H = NoHooks> {
    scope: S,
    authorizer: A,
    templates: T,
    hooks: H,
    config: ControllerConfig,
    naming: ResourceNaming,
    _resource: PhantomData<fn() -> R>,
}

impl<R, S, A, T> CrudController<R, S, A, T, NoHooks>
where
    R: CrudResource,
    S: ResourceScope<R>,
    A: Authorizer<R>,
    T: Templates,
{
    #[must_use]
    pub fn new(scope: S, authorizer: A, templates: T) -> Self {
        Self {
            scope,
            authorizer,
            templates,
            hooks: NoHooks,
            config: ControllerConfig::default(),
            naming: ResourceNaming::for_class(R::CLASS_NAME),
            _resource: PhantomData,
        }
    }
}

impl<R, S, A, T, H> CrudController<R, S, A, T, H>
where
    R: CrudResource,
    S: ResourceScope<R>,
    A: Authorizer<R>,
    T: Templates,
    H: CrudHooks<R>,
{
    #[must_use]
    pub fn with_hooks<H2: CrudHooks<R>>(self, hooks: H2) -> CrudController<R, S, A, T, H2> {
        CrudController {
            scope: self.scope,
            authorizer: self.authorizer,
            templates: self.templates,
            hooks,
            config: self.config,
            naming: self.naming,
            _resource: PhantomData,
        }
    }

    /// Replaces the configuration; naming is rebuilt for the configured namespaces.
    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.naming =
            ResourceNaming::for_class(R::CLASS_NAME).with_namespaces(config.namespaces.clone());
        self.config = config;
        self
    }

    pub fn naming(&self) -> &ResourceNaming {
        &self.naming
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    pub fn templates(&self) -> &T {
        &self.templates
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Views live under the controller path, e.g. `admin/posts/edit`
    pub fn template_prefix(&self) -> &str {
        self.naming.controller_path()
    }

    #[must_use]
    pub fn template_exists(&self, name: &str) -> bool {
        self.templates.template_exists(self.template_prefix(), name)
    }

    /// Resolves the submit for this request.
    ///
    /// Lookup order: the pressed `commit` label, the first submit committing `action`,
    /// the first `save` submit, and finally `action` itself with no redirect.
    #[must_use]
    pub fn commit_action(&self, request: &RequestContext, action: Option<&str>) -> CommitAction {
        let submits = &self.config.submits;
        let submit = request
            .commit()
            .and_then(|label| submits.iter().find(|s| s.label == label))
            .or_else(|| action.and_then(|a| submits.iter().find(|s| s.action == a)))
            .or_else(|| submits.iter().find(|s| s.action == "save"));

        match submit {
            Some(submit) => CommitAction {
                action: submit.action.clone(),
                redirect: submit.redirect.clone(),
            },
            None => CommitAction::new(action.unwrap_or("save")),
        }
    }

    /// The submit for a route-named action: the pressed submit only contributes its
    /// redirect, the committed verb is always `action`.
    #[must_use]
    pub fn route_commit_action(&self, request: &RequestContext, action: &str) -> CommitAction {
        CommitAction {
            action: action.to_string(),
            redirect: self.commit_action(request, Some(action)).redirect,
        }
    }

    /// Raising variant of [`Authorizer::is_authorized`].
    ///
    /// # Errors
    /// `ApiError::Forbidden` when the check fails.
    pub fn authorize(
        &self,
        actor: &Actor,
        action: &str,
        target: AuthorizationTarget<'_, R>,
    ) -> Result<(), ApiError> {
        if self.authorizer.is_authorized(actor, action, target) {
            return Ok(());
        }
        let subject = match target {
            AuthorizationTarget::Type => self.naming.human_plural_name().to_string(),
            AuthorizationTarget::Resource(resource) => resource.to_string(),
        };
        Err(ApiError::forbidden(format!(
            "You are not authorized to {action} {subject}"
        )))
    }
}
