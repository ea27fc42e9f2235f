use crate::config::RedirectTarget;
use crate::context::RequestContext;
use crate::traits::{AuthorizationTarget, Authorizer, CrudHooks, CrudResource, ResourceScope, Templates};

use super::{CommitAction, CrudController};

/// Path portion of a referer, without query string or fragment
fn referer_path(referer: &str) -> &str {
    referer
        .split(['?', '#'])
        .next()
        .unwrap_or(referer)
}

fn referer_ends_with(referer: Option<&str>, path: Option<&str>) -> bool {
    match (referer, path) {
        (Some(referer), Some(path)) => referer_path(referer).ends_with(path),
        _ => false,
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
    /// `/admin/posts`
    #[must_use]
    pub fn index_path(&self) -> Option<String> {
        self.config.routes.index.then(|| self.naming.index_path())
    }

    /// `/admin/posts/new`
    #[must_use]
    pub fn new_path(&self) -> Option<String> {
        self.config
            .routes
            .new
            .then(|| format!("{}/new", self.naming.index_path()))
    }

    /// `/admin/posts/1`, `None` for unsaved resources
    #[must_use]
    pub fn show_path(&self, resource: &R) -> Option<String> {
        if !self.config.routes.show {
            return None;
        }
        resource
            .id()
            .map(|id| format!("{}/{id}", self.naming.index_path()))
    }

    /// `/admin/posts/1/edit`, `None` for unsaved resources
    #[must_use]
    pub fn edit_path(&self, resource: &R) -> Option<String> {
        if !self.config.routes.edit {
            return None;
        }
        resource
            .id()
            .map(|id| format!("{}/{id}/edit", self.naming.index_path()))
    }

    /// The referring page, unless it is a duplicate form or the page of a resource that
    /// was just destroyed.
    #[must_use]
    pub fn referer_redirect_path(
        &self,
        request: &RequestContext,
        resource: &R,
        action: &str,
        succeeded: bool,
    ) -> Option<String> {
        let referer = request.referer.as_deref().map(str::trim)?;
        if referer.is_empty() || referer.contains("duplicate_id=") {
            return None;
        }

        if action == "destroy" && succeeded {
            if let Some(show) = self.show_path(resource) {
                let path = referer_path(referer);
                if path.ends_with(&show) || path.contains(&format!("{show}/")) {
                    return None;
                }
            }
        }

        Some(referer.to_string())
    }

    pub(super) fn redirect_target_path(
        &self,
        target: &RedirectTarget,
        request: &RequestContext,
        resource: &R,
        commit: &CommitAction,
        succeeded: bool,
    ) -> Option<String> {
        match target {
            RedirectTarget::Index => self.index_path(),
            RedirectTarget::New => self.new_path(),
            RedirectTarget::Show => self.show_path(resource),
            RedirectTarget::Edit => self.edit_path(resource),
            RedirectTarget::Back => {
                self.referer_redirect_path(request, resource, &commit.action, succeeded)
            }
            RedirectTarget::Path(path) => Some(path.clone()),
        }
    }

    /// The submit's own redirect, when it resolves to a path
    #[must_use]
    pub fn specific_redirect_path(
        &self,
        request: &RequestContext,
        resource: &R,
        commit: &CommitAction,
    ) -> Option<String> {
        commit
            .redirect
            .as_ref()
            .and_then(|target| self.redirect_target_path(target, request, resource, commit, true))
    }

    /// Where to send the client after `commit` ran on `resource`.
    ///
    /// Edit and show pages are only considered when the actor may see them; the
    /// configured root path is the last resort.
    #[must_use]
    pub fn resource_redirect_path(
        &self,
        request: &RequestContext,
        resource: &R,
        commit: &CommitAction,
        succeeded: bool,
    ) -> String {
        if let Some(path) = commit.redirect.as_ref().and_then(|target| {
            self.redirect_target_path(target, request, resource, commit, succeeded)
        }) {
            return path;
        }

        let action = commit.action.as_str();
        let allowed = |verb: &str, target: AuthorizationTarget<'_, R>| {
            self.authorizer.is_authorized(&request.actor, verb, target)
        };
        let edit = || {
            self.edit_path(resource)
                .filter(|_| allowed("edit", AuthorizationTarget::Resource(resource)))
        };
        let show = || {
            self.show_path(resource)
                .filter(|_| allowed("show", AuthorizationTarget::Resource(resource)))
        };
        let index = || {
            self.index_path()
                .filter(|_| allowed("index", AuthorizationTarget::Type))
        };
        let referer = || self.referer_redirect_path(request, resource, action, succeeded);

        let path = match action {
            "destroy" => referer().or_else(|| self.index_path()),
            "create" | "update" | "save" => edit().or_else(show).or_else(index),
            _ => referer().or_else(edit).or_else(show).or_else(index),
        };

        path.unwrap_or_else(|| self.config.root_path.clone())
    }

    /// View the referring page was rendered from, used to re-render a failed member
    /// action in place. Checked in order: edit, new, show.
    pub(super) fn referer_view(&self, request: &RequestContext, resource: &R) -> Option<&'static str> {
        let referer = request.referer.as_deref();
        if referer_ends_with(referer, self.edit_path(resource).as_deref()) {
            Some("edit")
        } else if referer_ends_with(referer, self.new_path().as_deref()) {
            Some("new")
        } else if referer_ends_with(referer, self.show_path(resource).as_deref()) {
            Some("show")
        } else {
            None
        }
    }
}
