#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde::Serialize;
use serde_json::Value;

use crudcrate_controller::traits::BoxFuture;
use crudcrate_controller::{
    ActionOutcome, Actor, ApiError, AuthorizationTarget, Authorizer, ControllerConfig,
    CrudController, CrudHooks, CrudResource, Params, RequestContext, ResourceScope,
    ResponseContext, Templates, ValidationErrors, crud_router,
};

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_by: Option<String>,
    #[serde(skip)]
    pub errors: ValidationErrors,
}

impl Post {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            body: String::new(),
            status: "draft".to_string(),
            created_by: None,
            errors: ValidationErrors::new(),
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "New Post")
        } else {
            write!(f, "{}", self.title)
        }
    }
}

impl CrudResource for Post {
    type Id = i64;
    const CLASS_NAME: &'static str = "Post";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assignable_attributes() -> &'static [&'static str] {
        &["title", "body"]
    }

    fn assign_attributes(&mut self, attributes: &Params) -> Result<(), ApiError> {
        for (key, value) in attributes {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => {
                    return Err(ApiError::bad_request(format!("{key} must be a string, got {other}")));
                }
            };
            match key.as_str() {
                "title" => self.title = text,
                "body" => self.body = text,
                _ => {}
            }
        }
        Ok(())
    }

    fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    fn set_created_by(&mut self, actor: &Actor) -> bool {
        self.created_by.clone_from(&actor.id);
        true
    }

    fn member_actions() -> &'static [&'static str] {
        &["approve", "archive", "publish"]
    }

    fn named_scopes() -> &'static [&'static str] {
        &["drafts"]
    }
}

#[derive(Default)]
struct Store {
    posts: BTreeMap<i64, Post>,
    next_id: i64,
    /// Ids whose member operations raise instead of returning an outcome
    raising: HashSet<i64>,
    transactions: usize,
    reloads: usize,
}

/// In-memory storage with the same failure modes as a database-backed scope
#[derive(Clone, Default)]
pub struct MemoryScope {
    store: Arc<Mutex<Store>>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mut post: Post) -> Post {
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        let id = store.next_id;
        post.id = Some(id);
        store.posts.insert(id, post.clone());
        post
    }

    pub fn seed(&self, titles: &[&str]) -> Vec<Post> {
        titles.iter().map(|title| self.insert(Post::new(title))).collect()
    }

    pub fn get(&self, id: i64) -> Option<Post> {
        self.store.lock().unwrap().posts.get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.store.lock().unwrap().posts.len()
    }

    pub fn set_status(&self, id: i64, status: &str) {
        if let Some(post) = self.store.lock().unwrap().posts.get_mut(&id) {
            post.status = status.to_string();
        }
    }

    pub fn raise_on(&self, id: i64) {
        self.store.lock().unwrap().raising.insert(id);
    }

    pub fn transactions(&self) -> usize {
        self.store.lock().unwrap().transactions
    }

    pub fn reloads(&self) -> usize {
        self.store.lock().unwrap().reloads
    }

    fn validate(post: &Post) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if post.title.trim().is_empty() {
            errors.add("title", "can't be blank");
        }
        errors
    }
}

#[async_trait]
impl ResourceScope<Post> for MemoryScope {
    fn build(&self) -> Post {
        Post::new("")
    }

    async fn find(&self, id: &i64) -> Result<Post, ApiError> {
        self.get(*id)
            .ok_or_else(|| ApiError::not_found("Post", Some(id.to_string())))
    }

    async fn all(&self) -> Result<Vec<Post>, ApiError> {
        Ok(self.store.lock().unwrap().posts.values().cloned().collect())
    }

    async fn where_ids(&self, ids: &[i64]) -> Result<Vec<Post>, ApiError> {
        let store = self.store.lock().unwrap();
        Ok(ids.iter().filter_map(|id| store.posts.get(id).cloned()).collect())
    }

    async fn named_scope(&self, name: &str) -> Result<Vec<Post>, ApiError> {
        let status = name.trim_end_matches('s');
        let store = self.store.lock().unwrap();
        Ok(store
            .posts
            .values()
            .filter(|post| post.status == status)
            .cloned()
            .collect())
    }

    async fn save(&self, resource: &mut Post, _action: &str) -> Result<ActionOutcome, ApiError> {
        let errors = Self::validate(resource);
        if !errors.is_empty() {
            return Ok(ActionOutcome::Failure(errors));
        }
        match resource.id {
            Some(id) => {
                self.store.lock().unwrap().posts.insert(id, resource.clone());
            }
            None => *resource = self.insert(resource.clone()),
        }
        Ok(ActionOutcome::Success)
    }

    async fn destroy(&self, resource: &mut Post) -> Result<ActionOutcome, ApiError> {
        if resource.status == "locked" {
            let mut errors = ValidationErrors::new();
            errors.add_to_base("is locked");
            return Ok(ActionOutcome::Failure(errors));
        }
        let id = resource.id.ok_or_else(|| ApiError::not_found("Post", None))?;
        self.store.lock().unwrap().posts.remove(&id);
        Ok(ActionOutcome::Success)
    }

    async fn perform(&self, resource: &mut Post, action: &str) -> Result<ActionOutcome, ApiError> {
        let id = resource.id.ok_or_else(|| ApiError::not_found("Post", None))?;
        if self.store.lock().unwrap().raising.contains(&id) {
            return Err(ApiError::internal("Operation failed", Some(format!("{action} raised"))));
        }

        let status = match action {
            "approve" => "approved",
            "archive" => "archived",
            _ => "published",
        };
        if resource.status == status {
            let mut errors = ValidationErrors::new();
            errors.add("status", format!("is already {status}"));
            return Ok(ActionOutcome::Failure(errors));
        }

        let errors = Self::validate(resource);
        if !errors.is_empty() {
            return Ok(ActionOutcome::Failure(errors));
        }

        resource.status = status.to_string();
        self.store.lock().unwrap().posts.insert(id, resource.clone());
        Ok(ActionOutcome::Success)
    }

    async fn reload(&self, resource: &mut Post) -> Result<(), ApiError> {
        let id = resource.id.ok_or_else(|| ApiError::not_found("Post", None))?;
        let mut store = self.store.lock().unwrap();
        store.reloads += 1;
        let stored = store
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Post", Some(id.to_string())))?;
        *resource = stored;
        Ok(())
    }

    async fn transaction<'a, T, F>(&'a self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'a,
        F: FnOnce() -> BoxFuture<'a, Result<T, ApiError>> + Send + 'a,
    {
        self.store.lock().unwrap().transactions += 1;
        work().await
    }
}

/// Allows everything except the denied actions and resource ids
#[derive(Clone, Default)]
pub struct Policy {
    denied_actions: Vec<String>,
    denied_ids: Vec<i64>,
}

impl Policy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny_action(mut self, action: &str) -> Self {
        self.denied_actions.push(action.to_string());
        self
    }

    pub fn deny_id(mut self, id: i64) -> Self {
        self.denied_ids.push(id);
        self
    }
}

impl Authorizer<Post> for Policy {
    fn is_authorized(&self, _actor: &Actor, action: &str, target: AuthorizationTarget<'_, Post>) -> bool {
        if self.denied_actions.iter().any(|denied| denied == action) {
            return false;
        }
        match target {
            AuthorizationTarget::Type => true,
            AuthorizationTarget::Resource(post) => {
                post.id.is_none_or(|id| !self.denied_ids.contains(&id))
            }
        }
    }
}

/// Templates known by `prefix/name`; renders the view name and locals as JSON
#[derive(Clone, Default)]
pub struct Views {
    names: HashSet<String>,
}

impl Views {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
        }
    }

    /// The standard page templates of `posts`
    pub fn standard() -> Self {
        Self::new(&["posts/index", "posts/new", "posts/show", "posts/edit"])
    }
}

impl Templates for Views {
    fn template_exists(&self, prefix: &str, name: &str) -> bool {
        self.names.contains(&format!("{prefix}/{name}"))
    }

    fn render(&self, prefix: &str, name: &str, locals: &Params) -> Result<String, ApiError> {
        Ok(serde_json::json!({ "view": format!("{prefix}/{name}"), "locals": locals }).to_string())
    }
}

/// Records bulk failures and tags every render with the action name
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub failures: Arc<Mutex<Vec<(Option<i64>, String, String)>>>,
    pub duplicate_keeps_id: bool,
}

#[async_trait]
impl CrudHooks<Post> for RecordingHooks {
    async fn before_render(
        &self,
        action: &str,
        _request: &RequestContext,
        response: &mut ResponseContext,
    ) -> Result<(), ApiError> {
        response
            .locals
            .insert("prepared_for".to_string(), Value::String(action.to_string()));
        Ok(())
    }

    async fn duplicate_resource(&self, source: &Post) -> Result<Post, ApiError> {
        let mut copy = source.clone();
        if !self.duplicate_keeps_id {
            copy.id = None;
        }
        copy.title = format!("Copy of {}", source.title);
        Ok(copy)
    }

    fn on_bulk_failure(&self, resource: &Post, action: &str, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((resource.id, action.to_string(), reason.to_string()));
    }
}

pub type PostController = CrudController<Post, MemoryScope, Policy, Views, RecordingHooks>;

pub fn setup_controller(scope: MemoryScope, policy: Policy, views: Views) -> PostController {
    CrudController::new(scope, policy, views).with_hooks(RecordingHooks::default())
}

pub fn setup_controller_with_config(
    scope: MemoryScope,
    policy: Policy,
    views: Views,
    config: ControllerConfig,
) -> PostController {
    setup_controller(scope, policy, views).with_config(config)
}

pub fn setup_test_app(controller: PostController) -> Router {
    Router::new().nest("/posts", crud_router(Arc::new(controller)))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
