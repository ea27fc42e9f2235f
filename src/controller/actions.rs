use tracing::{debug, info, warn};

use crate::context::{ActionResponse, RenderDecision, RequestContext, ResponseContext};
use crate::errors::ApiError;
use crate::flash::{FlashKind, action_verb};
use crate::inflector::titleize;
use crate::pagination::{datatable, page_params};
use crate::traits::{
    ActionOutcome, AuthorizationTarget, Authorizer, CrudHooks, CrudResource, Params, ResourceScope,
    Templates, assignable_subset,
};

use super::CrudController;

/// Request params that are never assigned by `new`
const NON_ATTRIBUTE_PARAMS: &[&str] = &["controller", "action", "id", "duplicate_id"];

impl<R, S, A, T, H> CrudController<R, S, A, T, H>
where
    R: CrudResource,
    S: ResourceScope<R>,
    A: Authorizer<R>,
    T: Templates,
    H: CrudHooks<R>,
{
    fn response_context(request: &RequestContext) -> ResponseContext {
        ResponseContext::new(request.flash.clone())
    }

    fn parse_id(&self, raw: &str) -> Result<R::Id, ApiError> {
        raw.parse()
            .map_err(|_| ApiError::not_found(self.naming.class_name(), Some(raw.to_string())))
    }

    async fn find_resource(&self, request: &RequestContext) -> Result<R, ApiError> {
        let raw = request
            .id()
            .ok_or_else(|| ApiError::bad_request("param is missing or the value is empty: id"))?;
        let id = self.parse_id(&raw)?;
        self.scope.find(&id).await
    }

    fn titleized_name(&self) -> String {
        titleize(self.naming.name())
    }

    /// Runs the persistence step for `action` and copies any failure onto the resource.
    ///
    /// Returns whether the step succeeded.
    pub(super) async fn save_resource(&self, resource: &mut R, action: &str) -> Result<bool, ApiError> {
        let outcome = match action {
            "destroy" => self.scope.destroy(resource).await?,
            "create" | "update" | "save" => self.scope.save(resource, action).await?,
            other => {
                if !R::supports_action(other) {
                    return Err(ApiError::configuration(format!(
                        "{} does not declare the member action {other}",
                        self.naming.class_name()
                    )));
                }
                self.scope.perform(resource, other).await?
            }
        };

        match outcome {
            ActionOutcome::Success => Ok(true),
            ActionOutcome::Failure(errors) => {
                if !errors.is_empty() {
                    *resource.errors_mut() = errors;
                }
                debug!(
                    resource = self.naming.class_name(),
                    action,
                    errors = %resource.errors(),
                    "Resource action failed"
                );
                Ok(false)
            }
        }
    }

    /// `GET /posts`
    ///
    /// # Errors
    /// Storage errors from the scope, or `Forbidden` when `index` is denied.
    pub async fn index(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#index");

        let mut resources = self.scope.all().await?;
        self.authorize(&request.actor, "index", AuthorizationTarget::Type)?;

        let mut response = Self::response_context(request);
        response.page_title_or(titleize(self.naming.plural_name()));

        let table = self.config.per_page.map(|per_page| {
            let total = u64::try_from(resources.len()).unwrap_or(u64::MAX);
            let table = datatable(
                &page_params(request),
                per_page,
                self.config.max_per_page,
                total,
                self.naming.plural_name(),
            );
            let offset = usize::try_from(table.offset).unwrap_or(usize::MAX);
            let limit = usize::try_from(table.per_page).unwrap_or(usize::MAX);
            resources = std::mem::take(&mut resources)
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect();
            table
        });

        self.hooks.before_render("index", request, &mut response).await?;

        Ok(
            ActionResponse::new("index", request.format, RenderDecision::render("index"), response)
                .with_resources(resources)
                .with_datatable(table),
        )
    }

    /// `GET /posts/new`, optionally prefilled from `duplicate_id`
    ///
    /// # Errors
    /// `Configuration` when the duplicate hook hands back a persisted record.
    pub async fn new_action(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#new");

        let mut response = Self::response_context(request);
        let mut resource = self.scope.build();

        let raw: Params = request
            .params
            .iter()
            .filter(|(key, _)| !NON_ATTRIBUTE_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let attributes = assignable_subset::<R>(&raw);
        if !attributes.is_empty() {
            resource.assign_attributes(&attributes)?;
        }

        if let Some(duplicate_id) = request.duplicate_id() {
            let id = self.parse_id(&duplicate_id)?;
            let source = self.scope.find(&id).await?;
            self.authorize(
                &request.actor,
                "show",
                AuthorizationTarget::Resource(&source),
            )?;

            let duplicate = self.hooks.duplicate_resource(&source).await?;
            if !duplicate.is_new_record() {
                return Err(ApiError::configuration(format!(
                    "duplicate_resource must return a new, unsaved {}",
                    self.naming.class_name()
                )));
            }
            resource = duplicate;

            if let Some(previous) = response.flash.get(FlashKind::Success) {
                let message = format!(
                    "{}. Adding another {} based on previous.",
                    previous.trim_end_matches('.'),
                    self.titleized_name()
                );
                response.flash.set_now(FlashKind::Success, message);
            }
        }

        self.authorize(&request.actor, "new", AuthorizationTarget::Resource(&resource))?;
        response.page_title_or(format!("New {}", self.titleized_name()));
        self.hooks.before_render("new", request, &mut response).await?;

        let view = if request.format.is_programmatic() { "new.js" } else { "new" };
        Ok(
            ActionResponse::new("new", request.format, RenderDecision::render(view), response)
                .with_resource(resource),
        )
    }

    /// `POST /posts`
    ///
    /// # Errors
    /// `BadRequest` when the nested attributes are missing; `Forbidden` when the commit
    /// action is denied. Validation failures are not errors.
    pub async fn create(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#create");

        let mut response = Self::response_context(request);
        let mut resource = self.scope.build();
        let commit = self.commit_action(request, Some("create")).or_action("create");

        let attributes = R::permitted_params(&request.params, self.naming.param_key())?;
        resource.assign_attributes(&attributes)?;
        resource.set_created_by(&request.actor);

        self.authorize(
            &request.actor,
            &commit.action,
            AuthorizationTarget::Resource(&resource),
        )?;
        response.page_title_or(format!("New {}", self.titleized_name()));

        let succeeded = self.save_resource(&mut resource, &commit.action).await?;
        self.respond(request, response, resource, commit, succeeded).await
    }

    /// `GET /posts/{id}`
    ///
    /// # Errors
    /// `NotFound` or `Forbidden`.
    pub async fn show(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#show");

        let resource = self.find_resource(request).await?;
        self.authorize(&request.actor, "show", AuthorizationTarget::Resource(&resource))?;

        let mut response = Self::response_context(request);
        response.page_title_or(resource.to_string());
        self.hooks.before_render("show", request, &mut response).await?;

        Ok(
            ActionResponse::new("show", request.format, RenderDecision::render("show"), response)
                .with_resource(resource),
        )
    }

    /// `GET /posts/{id}/edit`
    ///
    /// # Errors
    /// `NotFound` or `Forbidden`.
    pub async fn edit(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#edit");

        let resource = self.find_resource(request).await?;
        self.authorize(&request.actor, "edit", AuthorizationTarget::Resource(&resource))?;

        let mut response = Self::response_context(request);
        response.page_title_or(format!("Edit {resource}"));
        self.hooks.before_render("edit", request, &mut response).await?;

        let view = if request.format.is_programmatic() { "edit.js" } else { "edit" };
        Ok(
            ActionResponse::new("edit", request.format, RenderDecision::render(view), response)
                .with_resource(resource),
        )
    }

    /// `PUT|PATCH /posts/{id}`
    ///
    /// # Errors
    /// `NotFound`, `Forbidden` or `BadRequest`. Validation failures are not errors.
    pub async fn update(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        info!(resource = self.naming.class_name(), "Processed by CrudController#update");

        let mut resource = self.find_resource(request).await?;
        let commit = self.commit_action(request, Some("update")).or_action("update");

        self.authorize(
            &request.actor,
            &commit.action,
            AuthorizationTarget::Resource(&resource),
        )?;

        let mut response = Self::response_context(request);
        response.page_title_or(format!("Edit {resource}"));

        let attributes = R::permitted_params(&request.params, self.naming.param_key())?;
        resource.assign_attributes(&attributes)?;

        let succeeded = self.save_resource(&mut resource, &commit.action).await?;
        self.respond(request, response, resource, commit, succeeded).await
    }

    /// `DELETE /posts/{id}`, or a bulk destroy when `ids` are given
    ///
    /// # Errors
    /// `NotFound` or `Forbidden`.
    pub async fn destroy(&self, request: &RequestContext) -> Result<ActionResponse<R>, ApiError> {
        if !request.ids().is_empty() {
            return self.collection_action(request, "destroy").await;
        }

        info!(resource = self.naming.class_name(), "Processed by CrudController#destroy");

        let mut resource = self.find_resource(request).await?;
        let commit = self.route_commit_action(request, "destroy");

        self.authorize(&request.actor, "destroy", AuthorizationTarget::Resource(&resource))?;

        let mut response = Self::response_context(request);
        response.page_title_or(format!("Destroy {resource}"));

        let succeeded = self.save_resource(&mut resource, "destroy").await?;
        self.respond(request, response, resource, commit, succeeded).await
    }

    /// A named operation on one resource, e.g. `POST /posts/{id}/approve`.
    ///
    /// Unparsable attributes are ignored rather than rejected.
    ///
    /// # Errors
    /// `NotFound`, `Forbidden`, or `Configuration` when `R` does not declare `action`.
    pub async fn member_action(
        &self,
        request: &RequestContext,
        action: &str,
    ) -> Result<ActionResponse<R>, ApiError> {
        info!(
            resource = self.naming.class_name(),
            action,
            "Processed by CrudController#member_action"
        );

        let mut resource = self.find_resource(request).await?;
        let commit = self.route_commit_action(request, action);

        self.authorize(&request.actor, action, AuthorizationTarget::Resource(&resource))?;

        let mut response = Self::response_context(request);
        response.page_title_or(format!("{} {resource}", titleize(action)));

        if request.is_get() {
            self.hooks.before_render(action, request, &mut response).await?;
            return Ok(ActionResponse::new(
                action,
                request.format,
                RenderDecision::render_action(action, action),
                response,
            )
            .with_resource(resource));
        }

        let attributes = R::permitted_params(&request.params, self.naming.param_key())
            .unwrap_or_else(|err| {
                debug!(action, error = %err, "Ignoring member action params");
                Params::new()
            });
        if !attributes.is_empty() {
            resource.assign_attributes(&attributes)?;
        }

        let succeeded = self.save_resource(&mut resource, action).await?;
        self.respond(request, response, resource, commit, succeeded).await
    }

    /// A named operation over many resources, e.g. `POST /posts/bulk/archive?ids=1,2`.
    ///
    /// Best effort: resources the actor may not touch are skipped, and failures are
    /// logged and reported to [`CrudHooks::on_bulk_failure`] without aborting the rest.
    ///
    /// # Errors
    /// `Forbidden` when the actor may not run `action` at all, `Configuration` when
    /// `R` does not support it, or a storage error from the transaction itself.
    pub async fn collection_action(
        &self,
        request: &RequestContext,
        action: &str,
    ) -> Result<ActionResponse<R>, ApiError> {
        let action = action.strip_prefix("bulk_").unwrap_or(action).to_string();
        info!(
            resource = self.naming.class_name(),
            action = %action,
            "Processed by CrudController#collection_action"
        );

        let ids = request.ids();
        let resources = if !ids.is_empty() {
            let ids: Vec<R::Id> = ids
                .iter()
                .filter_map(|raw| match raw.parse() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        debug!(action = %action, id = %raw, "Ignoring unparsable bulk id");
                        None
                    }
                })
                .collect();
            if ids.is_empty() {
                Vec::new()
            } else {
                self.scope.where_ids(&ids).await?
            }
        } else if request.is_get() && R::named_scopes().contains(&action.as_str()) {
            self.scope.named_scope(&action).await?
        } else {
            self.scope.all().await?
        };

        self.authorize(&request.actor, &action, AuthorizationTarget::Type)?;

        let mut response = Self::response_context(request);
        response.page_title_or(format!(
            "{} {}",
            titleize(&action),
            titleize(self.naming.plural_name())
        ));

        if request.is_get() {
            self.hooks.before_render(&action, request, &mut response).await?;
            let decision = RenderDecision::render_action(action.clone(), &action);
            return Ok(ActionResponse::new(action, request.format, decision, response)
                .with_resources(resources));
        }

        if !resources.is_empty() && !R::supports_action(&action) {
            return Err(ApiError::configuration(format!(
                "expected all {} objects to support {action}",
                self.naming.class_name()
            )));
        }

        let total = resources.len();
        let successes = self
            .scope
            .transaction(|| {
                Box::pin(async {
                    let mut successes = 0usize;
                    for mut resource in resources {
                        if !self.authorizer.is_authorized(
                            &request.actor,
                            &action,
                            AuthorizationTarget::Resource(&resource),
                        ) {
                            debug!(action = %action, resource = %resource, "Skipping unauthorized resource");
                            continue;
                        }

                        let result = if action == "destroy" {
                            self.scope.destroy(&mut resource).await
                        } else {
                            self.scope.perform(&mut resource, &action).await
                        };

                        let reason = match result {
                            Ok(ActionOutcome::Success) => {
                                successes += 1;
                                continue;
                            }
                            Ok(ActionOutcome::Failure(errors)) => errors
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(", "),
                            Err(err) => err.to_string(),
                        };
                        warn!(
                            action = %action,
                            resource = %resource,
                            reason = %reason,
                            "Bulk action failed for resource"
                        );
                        self.hooks.on_bulk_failure(&resource, &action, &reason);
                    }
                    Ok(successes)
                })
            })
            .await?;

        let message = format!(
            "Successfully {} {successes} / {total} selected {}",
            action_verb(&action),
            self.naming.plural_name().replace('_', " ")
        );
        debug!(action = %action, successes, total, "Bulk action finished");

        Ok(ActionResponse::new(
            action,
            request.format,
            RenderDecision::json(200, message),
            response,
        ))
    }
}
