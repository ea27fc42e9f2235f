use tracing::debug;

use crate::context::{ActionResponse, RenderDecision, RequestContext, ResponseContext};
use crate::errors::ApiError;
use crate::flash::{FlashKind, flash_danger, flash_success};
use crate::inflector::titleize;
use crate::traits::{Authorizer, CrudHooks, CrudResource, ResourceScope, Templates};

use super::{CommitAction, CrudController};

impl<R, S, A, T, H> CrudController<R, S, A, T, H>
where
    R: CrudResource,
    S: ResourceScope<R>,
    A: Authorizer<R>,
    T: Templates,
    H: CrudHooks<R>,
{
    /// Turns the result of a mutating action into exactly one render or redirect.
    pub(super) async fn respond(
        &self,
        request: &RequestContext,
        response: ResponseContext,
        resource: R,
        commit: CommitAction,
        succeeded: bool,
    ) -> Result<ActionResponse<R>, ApiError> {
        if succeeded {
            self.respond_with_success(request, response, resource, commit).await
        } else {
            self.respond_with_error(request, response, resource, commit).await
        }
    }

    async fn respond_with_success(
        &self,
        request: &RequestContext,
        mut response: ResponseContext,
        mut resource: R,
        commit: CommitAction,
    ) -> Result<ActionResponse<R>, ApiError> {
        let action = commit.action.as_str();
        let message = flash_success(&self.naming, Some(action));

        let decision = if let Some(path) = self.specific_redirect_path(request, &resource, &commit) {
            response.flash.set_if_absent(FlashKind::Success, message);
            RenderDecision::redirect(path)
        } else if self.template_exists(action) {
            response.flash.set_now_if_absent(FlashKind::Success, message);
            if request.format.is_programmatic() && action != "destroy" {
                self.scope.reload(&mut resource).await?;
            }
            RenderDecision::render_action(action, action)
        } else if request.format.is_programmatic() {
            response.flash.set_now_if_absent(FlashKind::Success, message);
            RenderDecision::render_action("member_action", action)
        } else {
            response.flash.set_if_absent(FlashKind::Success, message);
            RenderDecision::redirect(self.resource_redirect_path(request, &resource, &commit, true))
        };

        debug!(action, decision = ?decision, "Resolved successful action");
        Ok(ActionResponse::new(commit.action.clone(), request.format, decision, response)
            .with_resource(resource))
    }

    async fn respond_with_error(
        &self,
        request: &RequestContext,
        mut response: ResponseContext,
        resource: R,
        commit: CommitAction,
    ) -> Result<ActionResponse<R>, ApiError> {
        let action = commit.action.as_str();
        let danger = flash_danger(&resource, &self.naming, Some(action));

        response.flash.delete(FlashKind::Success);
        response.flash.set_now_if_absent(FlashKind::Danger, danger.clone());
        self.hooks.before_render(action, request, &mut response).await?;

        let decision = if action == "destroy" {
            // The resource may be gone, so never re-render it
            response.flash.set(FlashKind::Danger, danger);
            RenderDecision::redirect(self.resource_redirect_path(request, &resource, &commit, false))
        } else if request.format.is_programmatic() {
            let view = if self.template_exists(action) { action } else { "member_action" };
            RenderDecision::render_action(view, action)
        } else {
            match action {
                "create" => RenderDecision::render_action("new", action),
                "update" => RenderDecision::render_action("edit", action),
                _ => self.member_error_decision(request, &mut response, &resource, &commit, danger),
            }
        };

        debug!(action, decision = ?decision, "Resolved failed action");
        Ok(ActionResponse::new(commit.action.clone(), request.format, decision, response)
            .with_resource(resource))
    }

    /// Re-renders a failed member action where the user came from, or redirects back.
    fn member_error_decision(
        &self,
        request: &RequestContext,
        response: &mut ResponseContext,
        resource: &R,
        commit: &CommitAction,
        danger: String,
    ) -> RenderDecision {
        let action = commit.action.as_str();

        if self.template_exists(action) {
            response.page_title_or(format!("{} {resource}", titleize(action)));
            return RenderDecision::render_action(action, action);
        }

        match self.referer_view(request, resource) {
            Some("edit") => {
                response.set_page_title(format!("Edit {resource}"));
                RenderDecision::render_action("edit", action)
            }
            Some("new") => {
                response.set_page_title(format!("New {}", titleize(self.naming.name())));
                RenderDecision::render_action("new", action)
            }
            Some(_) => {
                response.set_page_title(titleize(self.naming.name()));
                RenderDecision::render_action("show", action)
            }
            None => {
                response.set_page_title(resource.to_string());
                response.flash.set(FlashKind::Danger, danger);
                let path = self
                    .referer_redirect_path(request, resource, action, false)
                    .unwrap_or_else(|| self.resource_redirect_path(request, resource, commit, false));
                RenderDecision::redirect(path)
            }
        }
    }
}
