use axum::http::Method;
use serde_json::json;

use crudcrate_controller::{
    Actor, ApiError, ControllerConfig, CrudController, Flash, FlashKind, RedirectTarget,
    RenderDecision, RequestContext, RequestFormat, Submit,
};
use crudcrate_controller::flash::FlashLifetime;

mod common;
use common::{
    MemoryScope, Policy, Post, RecordingHooks, Views, init_tracing, setup_controller,
    setup_controller_with_config,
};

fn patch() -> RequestContext {
    RequestContext::new(Method::PATCH)
}

fn delete() -> RequestContext {
    RequestContext::new(Method::DELETE)
}

#[tokio::test]
async fn test_index_renders_every_post() {
    init_tracing();
    let scope = MemoryScope::new();
    scope.seed(&["First", "Second"]);
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let response = controller.index(&RequestContext::get()).await.unwrap();

    assert_eq!(response.decision.view(), Some("index"));
    assert_eq!(response.page_title.as_deref(), Some("Posts"));
    assert_eq!(response.resources.as_ref().map(Vec::len), Some(2));
    assert_eq!(response.locals["prepared_for"], json!("index"));
    assert!(response.datatable.is_none());
}

#[tokio::test]
async fn test_index_paginates_when_per_page_is_configured() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b", "c", "d", "e"]);
    let controller = setup_controller_with_config(
        scope,
        Policy::allow_all(),
        Views::standard(),
        ControllerConfig::default().with_per_page(2),
    );

    let request = RequestContext::get().with_param("page", 2);
    let response = controller.index(&request).await.unwrap();

    let titles: Vec<_> = response
        .resources
        .unwrap()
        .into_iter()
        .map(|post| post.title)
        .collect();
    assert_eq!(titles, vec!["c", "d"]);

    let table = response.datatable.unwrap();
    assert_eq!(table.total, 5);
    assert_eq!(table.content_range, "posts 2-3/5");
}

#[tokio::test]
async fn test_index_page_far_past_the_end_is_empty() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b"]);
    let controller = setup_controller_with_config(
        scope,
        Policy::allow_all(),
        Views::standard(),
        ControllerConfig::default().with_per_page(10),
    );

    let request = RequestContext::get().with_param("page", "18446744073709551615");
    let response = controller.index(&request).await.unwrap();

    assert_eq!(response.resources.as_ref().map(Vec::len), Some(0));
    let table = response.datatable.unwrap();
    assert_eq!(table.total, 2);
    assert!(table.content_range.ends_with("-2/2"));
}

#[tokio::test]
async fn test_index_denied() {
    let controller = setup_controller(
        MemoryScope::new(),
        Policy::allow_all().deny_action("index"),
        Views::standard(),
    );

    let err = controller.index(&RequestContext::get()).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(err.user_message(), "You are not authorized to index posts");
}

#[tokio::test]
async fn test_new_assigns_only_assignable_params() {
    let controller = setup_controller(MemoryScope::new(), Policy::allow_all(), Views::standard());

    let request = RequestContext::get()
        .with_param("title", "Draft")
        .with_param("status", "published")
        .with_param("id", 9);
    let response = controller.new_action(&request).await.unwrap();

    let post = response.resource.unwrap();
    assert_eq!(post.title, "Draft");
    assert_eq!(post.status, "draft");
    assert_eq!(post.id, None);
    assert_eq!(response.decision.view(), Some("new"));
    assert_eq!(response.page_title.as_deref(), Some("New Post"));
}

#[tokio::test]
async fn test_new_renders_script_partial_for_programmatic_requests() {
    let controller = setup_controller(MemoryScope::new(), Policy::allow_all(), Views::standard());

    let request = RequestContext::get().with_format(RequestFormat::Js);
    let response = controller.new_action(&request).await.unwrap();
    assert_eq!(response.decision.view(), Some("new.js"));
}

#[tokio::test]
async fn test_new_duplicates_an_existing_post() {
    let scope = MemoryScope::new();
    scope.seed(&["Original"]);
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let request = RequestContext::get()
        .with_param("duplicate_id", 1)
        .with_flash(Flash::carried_over([(
            FlashKind::Success,
            "Post was successfully created.",
        )]));
    let response = controller.new_action(&request).await.unwrap();

    let post = response.resource.unwrap();
    assert_eq!(post.title, "Copy of Original");
    assert!(post.id.is_none());
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully created. Adding another Post based on previous.")
    );
    assert_eq!(response.flash.lifetime(FlashKind::Success), Some(FlashLifetime::Now));
}

#[tokio::test]
async fn test_new_duplicate_requires_show_permission() {
    let scope = MemoryScope::new();
    scope.seed(&["Secret"]);
    let controller = setup_controller(scope, Policy::allow_all().deny_id(1), Views::standard());

    let request = RequestContext::get().with_param("duplicate_id", 1);
    let err = controller.new_action(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
}

#[tokio::test]
async fn test_new_duplicate_must_return_unsaved_record() {
    let scope = MemoryScope::new();
    scope.seed(&["Original"]);
    let controller: CrudController<Post, _, _, _, _> =
        CrudController::new(scope, Policy::allow_all(), Views::standard()).with_hooks(
            RecordingHooks {
                duplicate_keeps_id: true,
                ..RecordingHooks::default()
            },
        );

    let request = RequestContext::get().with_param("duplicate_id", 1);
    let err = controller.new_action(&request).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_new_duplicate_without_hook_is_a_configuration_error() {
    let scope = MemoryScope::new();
    scope.seed(&["Original"]);
    let controller: CrudController<Post, _, _, _> =
        CrudController::new(scope, Policy::allow_all(), Views::standard());

    let request = RequestContext::get().with_param("duplicate_id", 1);
    let err = controller.new_action(&request).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_create_saves_and_redirects_to_edit() {
    let scope = MemoryScope::new();
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post()
        .with_params(json!({ "post": { "title": "Hello", "status": "published" } }))
        .with_actor(Actor::new("42"));
    let response = controller.create(&request).await.unwrap();

    assert_eq!(response.action, "create");
    assert_eq!(response.decision.redirect_path(), Some("/posts/1/edit"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully created")
    );
    assert_eq!(
        response.flash.lifetime(FlashKind::Success),
        Some(FlashLifetime::Persisted)
    );

    let stored = scope.get(1).unwrap();
    assert_eq!(stored.title, "Hello");
    assert_eq!(stored.status, "draft");
    assert_eq!(stored.created_by.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_create_with_invalid_attributes_rerenders_new() {
    let scope = MemoryScope::new();
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_params(json!({ "post": { "title": "" } }));
    let response = controller.create(&request).await.unwrap();

    assert_eq!(response.decision.view(), Some("new"));
    assert_eq!(response.page_title.as_deref(), Some("New Post"));
    assert_eq!(
        response.flash.get(FlashKind::Danger),
        Some("Unable to create post: title can't be blank.")
    );
    assert_eq!(response.flash.lifetime(FlashKind::Danger), Some(FlashLifetime::Now));
    assert_eq!(response.locals["prepared_for"], json!("create"));
    assert_eq!(
        response.resource.unwrap().errors.on("title"),
        vec!["can't be blank"]
    );
    assert_eq!(scope.count(), 0);
}

#[tokio::test]
async fn test_create_without_nested_params_is_a_bad_request() {
    let controller = setup_controller(MemoryScope::new(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_param("title", "Loose");
    let err = controller.create(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest { .. }));
    assert_eq!(err.user_message(), "param is missing or the value is empty: post");
}

#[tokio::test]
async fn test_create_denied() {
    let controller = setup_controller(
        MemoryScope::new(),
        Policy::allow_all().deny_action("create"),
        Views::standard(),
    );

    let request = RequestContext::post().with_params(json!({ "post": { "title": "Hello" } }));
    let err = controller.create(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
}

#[tokio::test]
async fn test_show_and_edit() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let show = controller
        .show(&RequestContext::get().with_param("id", 1))
        .await
        .unwrap();
    assert_eq!(show.decision.view(), Some("show"));
    assert_eq!(show.page_title.as_deref(), Some("First"));

    let edit = controller
        .edit(&RequestContext::get().with_param("id", "1"))
        .await
        .unwrap();
    assert_eq!(edit.decision.view(), Some("edit"));
    assert_eq!(edit.page_title.as_deref(), Some("Edit First"));

    let edit_js = controller
        .edit(
            &RequestContext::get()
                .with_param("id", 1)
                .with_format(RequestFormat::Js),
        )
        .await
        .unwrap();
    assert_eq!(edit_js.decision.view(), Some("edit.js"));
}

#[tokio::test]
async fn test_show_missing_or_unparsable_id_is_not_found() {
    let controller = setup_controller(MemoryScope::new(), Policy::allow_all(), Views::standard());

    for id in ["99", "abc"] {
        let err = controller
            .show(&RequestContext::get().with_param("id", id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }), "{id}");
    }

    let err = controller.show(&RequestContext::get()).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest { .. }));
}

#[tokio::test]
async fn test_update_success_and_failure() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = patch()
        .with_param("id", 1)
        .with_params(json!({ "post": { "title": "Renamed" } }));
    let response = controller.update(&request).await.unwrap();
    assert_eq!(response.action, "update");
    assert_eq!(response.decision.redirect_path(), Some("/posts/1/edit"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully updated")
    );
    assert_eq!(scope.get(1).unwrap().title, "Renamed");

    let request = patch()
        .with_param("id", 1)
        .with_params(json!({ "post": { "title": " " } }));
    let response = controller.update(&request).await.unwrap();
    assert_eq!(response.decision.view(), Some("edit"));
    assert_eq!(response.page_title.as_deref(), Some("Edit Renamed"));
    assert_eq!(
        response.flash.get(FlashKind::Danger),
        Some("Unable to update post: title can't be blank.")
    );
    assert_eq!(scope.get(1).unwrap().title, "Renamed");
}

#[tokio::test]
async fn test_destroy_redirects_away_from_the_destroyed_post() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = delete().with_param("id", 1).with_referer("http://localhost/posts/1");
    let response = controller.destroy(&request).await.unwrap();

    assert_eq!(response.decision.redirect_path(), Some("/posts"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully destroyed")
    );
    assert_eq!(scope.count(), 0);
}

#[tokio::test]
async fn test_destroy_failure_always_redirects() {
    for format in [RequestFormat::Html, RequestFormat::Js] {
        let scope = MemoryScope::new();
        scope.seed(&["First"]);
        scope.set_status(1, "locked");
        let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

        let request = delete().with_param("id", 1).with_format(format);
        let response = controller.destroy(&request).await.unwrap();

        assert!(response.decision.is_redirect(), "{format:?}");
        assert_eq!(response.page_title.as_deref(), Some("Destroy First"));
        assert_eq!(
            response.flash.get(FlashKind::Danger),
            Some("Unable to destroy post: post is locked.")
        );
        assert_eq!(
            response.flash.lifetime(FlashKind::Danger),
            Some(FlashLifetime::Persisted)
        );
        assert_eq!(scope.count(), 1);
    }
}

#[tokio::test]
async fn test_destroy_with_ids_runs_the_bulk_destroy() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b", "c"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = delete().with_param("ids", "1,2");
    let response = controller.destroy(&request).await.unwrap();

    assert_eq!(
        response.decision,
        RenderDecision::json(200, "Successfully destroyed 2 / 2 selected posts")
    );
    assert_eq!(scope.count(), 1);
}

#[tokio::test]
async fn test_member_action_get_renders_the_action_view() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let response = controller
        .member_action(&RequestContext::get().with_param("id", 1), "approve")
        .await
        .unwrap();

    assert_eq!(response.decision.view(), Some("approve"));
    assert_eq!(response.page_title.as_deref(), Some("Approve First"));
    assert_eq!(scope.get(1).unwrap().status, "draft");
}

#[tokio::test]
async fn test_member_action_performs_and_redirects_back() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post()
        .with_param("id", 1)
        .with_param("post", "not a map")
        .with_referer("/dashboard");
    let response = controller.member_action(&request, "approve").await.unwrap();

    assert_eq!(response.action, "approve");
    assert_eq!(response.decision.redirect_path(), Some("/dashboard"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully approved")
    );
    assert_eq!(scope.get(1).unwrap().status, "approved");
}

#[tokio::test]
async fn test_member_action_assigns_permitted_params() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post()
        .with_param("id", 1)
        .with_params(json!({ "post": { "body": "Reviewed" } }));
    controller.member_action(&request, "publish").await.unwrap();

    let stored = scope.get(1).unwrap();
    assert_eq!(stored.status, "published");
    assert_eq!(stored.body, "Reviewed");
}

#[tokio::test]
async fn test_member_action_verb_comes_from_the_route_not_the_commit_label() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let config = ControllerConfig::default()
        .with_submit(Submit::new("Approve", "approve").redirect_to(RedirectTarget::Index));
    let controller = setup_controller_with_config(
        scope.clone(),
        Policy::allow_all().deny_action("approve"),
        Views::standard(),
        config,
    );

    let request = RequestContext::post()
        .with_param("id", 1)
        .with_param("commit", "Approve");
    let response = controller.member_action(&request, "archive").await.unwrap();

    assert_eq!(response.action, "archive");
    assert_eq!(response.decision.redirect_path(), Some("/posts"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully archived")
    );
    assert_eq!(scope.get(1).unwrap().status, "archived");
}

#[tokio::test]
async fn test_destroy_flash_ignores_the_commit_label() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let config = ControllerConfig::default()
        .with_submit(Submit::new("Approve", "approve").redirect_to(RedirectTarget::Index));
    let controller =
        setup_controller_with_config(scope.clone(), Policy::allow_all(), Views::standard(), config);

    let request = delete().with_param("id", 1).with_param("commit", "Approve");
    let response = controller.destroy(&request).await.unwrap();

    assert_eq!(response.action, "destroy");
    assert_eq!(response.decision.redirect_path(), Some("/posts"));
    assert_eq!(
        response.flash.get(FlashKind::Success),
        Some("Post was successfully destroyed")
    );
    assert_eq!(scope.count(), 0);
}

#[tokio::test]
async fn test_undeclared_member_action_is_a_configuration_error() {
    let scope = MemoryScope::new();
    scope.seed(&["First"]);
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_param("id", 1);
    let err = controller.member_action(&request, "explode").await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_bulk_archive_skips_unauthorized_and_failing_posts() {
    init_tracing();
    let scope = MemoryScope::new();
    scope.seed(&["a", "b", "c", "d", "e"]);
    scope.raise_on(2);
    let controller = setup_controller(scope.clone(), Policy::allow_all().deny_id(4), Views::standard());

    let request = RequestContext::post().with_params(json!({ "ids": [1, 2, 3, 4, 5] }));
    let response = controller
        .collection_action(&request, "bulk_archive")
        .await
        .unwrap();

    assert_eq!(
        response.decision,
        RenderDecision::Json {
            status: 200,
            message: "Successfully archived 3 / 5 selected posts".to_string(),
        }
    );
    assert_eq!(scope.transactions(), 1);

    let statuses: Vec<_> = (1..=5).map(|id| scope.get(id).unwrap().status).collect();
    assert_eq!(
        statuses,
        vec!["archived", "draft", "archived", "draft", "archived"]
    );

    let failures = controller.hooks().failures.lock().unwrap().clone();
    assert_eq!(
        failures,
        vec![(Some(2), "archive".to_string(), "Operation failed".to_string())]
    );
}

#[tokio::test]
async fn test_bulk_failure_outcomes_are_reported() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b"]);
    scope.set_status(1, "archived");
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_param("ids", "1,2");
    let response = controller.collection_action(&request, "archive").await.unwrap();

    assert_eq!(
        response.decision,
        RenderDecision::json(200, "Successfully archived 1 / 2 selected posts")
    );
    let failures = controller.hooks().failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].2, "status: is already archived");
}

#[tokio::test]
async fn test_bulk_ignores_unparsable_ids() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b", "c"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_params(json!({ "ids": ["1", "2", "abc"] }));
    let response = controller.collection_action(&request, "archive").await.unwrap();

    assert_eq!(
        response.decision,
        RenderDecision::json(200, "Successfully archived 2 / 2 selected posts")
    );
    assert_eq!(scope.get(3).unwrap().status, "draft");

    let request = RequestContext::post().with_param("ids", "abc");
    let response = controller.collection_action(&request, "archive").await.unwrap();
    assert_eq!(
        response.decision,
        RenderDecision::json(200, "Successfully archived 0 / 0 selected posts")
    );
}

#[tokio::test]
async fn test_bulk_get_renders_named_scope() {
    let scope = MemoryScope::new();
    scope.seed(&["a", "b", "c"]);
    scope.set_status(1, "approved");
    let controller = setup_controller(scope, Policy::allow_all(), Views::standard());

    let response = controller
        .collection_action(&RequestContext::get(), "bulk_drafts")
        .await
        .unwrap();

    assert_eq!(response.decision.view(), Some("drafts"));
    assert_eq!(response.page_title.as_deref(), Some("Drafts Posts"));
    assert_eq!(response.resources.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_bulk_unsupported_operation_is_a_configuration_error() {
    let scope = MemoryScope::new();
    scope.seed(&["a"]);
    let controller = setup_controller(scope.clone(), Policy::allow_all(), Views::standard());

    let request = RequestContext::post().with_param("ids", "1");
    let err = controller
        .collection_action(&request, "explode")
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(scope.transactions(), 0);
}

#[tokio::test]
async fn test_bulk_action_denied_for_the_type() {
    let controller = setup_controller(
        MemoryScope::new(),
        Policy::allow_all().deny_action("archive"),
        Views::standard(),
    );

    let request = RequestContext::post().with_param("ids", "1");
    let err = controller
        .collection_action(&request, "archive")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
}
