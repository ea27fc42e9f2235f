//! Explicit per-request state threaded through the controller.
//!
//! [`RequestContext`] is what came in; [`ResponseContext`] collects the flash and page
//! title while an action runs; [`ActionResponse`] is what the action hands back.

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::flash::Flash;
use crate::models::Datatable;
use crate::traits::Params;

/// Response mode requested by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    /// Navigational HTML
    #[default]
    Html,
    /// Script-driven callers (`text/javascript`, XHR)
    Js,
}

impl RequestFormat {
    #[must_use]
    pub fn is_programmatic(self) -> bool {
        matches!(self, Self::Js)
    }
}

/// The authenticated caller, as far as authorization and creator stamping need it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Renders a scalar param as a string, `None` for blanks, arrays and objects
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub format: RequestFormat,
    pub params: Params,
    pub referer: Option<String>,
    pub actor: Actor,
    /// Flash carried over from the previous request
    pub flash: Flash,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            format: RequestFormat::Html,
            params: Params::new(),
            referer: None,
            actor: Actor::anonymous(),
            flash: Flash::new(),
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn with_format(mut self, format: RequestFormat) -> Self {
        self.format = format;
        self
    }

    /// Merge the entries of a JSON object into the params; other values are ignored.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.params.extend(map);
        }
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = flash;
        self
    }

    /// Reads (`GET`/`HEAD`) never mutate
    #[must_use]
    pub fn is_get(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<String> {
        self.params.get(key).and_then(scalar_to_string)
    }

    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.param("id")
    }

    #[must_use]
    pub fn duplicate_id(&self) -> Option<String> {
        self.param("duplicate_id")
    }

    /// Label of the submit button that was pressed
    #[must_use]
    pub fn commit(&self) -> Option<String> {
        self.param("commit")
    }

    /// `ids` as an array, or a comma separated string
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        match self.params.get("ids") {
            Some(Value::Array(values)) => values.iter().filter_map(scalar_to_string).collect(),
            Some(Value::String(joined)) => joined
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
                .collect(),
            Some(value) => scalar_to_string(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Mutable state an action builds up before a decision is made
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    pub flash: Flash,
    pub page_title: Option<String>,
    /// Extra template locals, typically added by `before_render` hooks
    pub locals: Params,
}

impl ResponseContext {
    #[must_use]
    pub fn new(flash: Flash) -> Self {
        Self {
            flash,
            page_title: None,
            locals: Params::new(),
        }
    }

    /// Sets the page title unless one was already chosen
    pub fn page_title_or(&mut self, title: impl Into<String>) {
        if self.page_title.is_none() {
            self.page_title = Some(title.into());
        }
    }

    pub fn set_page_title(&mut self, title: impl Into<String>) {
        self.page_title = Some(title.into());
    }
}

/// The one next step an action resolves to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderDecision {
    Render { view: String, locals: Params },
    Redirect { path: String },
    Json { status: u16, message: String },
}

impl RenderDecision {
    #[must_use]
    pub fn render(view: impl Into<String>) -> Self {
        Self::Render {
            view: view.into(),
            locals: Params::new(),
        }
    }

    /// Render with the action name passed as a local
    #[must_use]
    pub fn render_action(view: impl Into<String>, action: &str) -> Self {
        let mut locals = Params::new();
        locals.insert("action".to_string(), json!(action));
        Self::Render {
            view: view.into(),
            locals,
        }
    }

    #[must_use]
    pub fn redirect(path: impl Into<String>) -> Self {
        Self::Redirect { path: path.into() }
    }

    #[must_use]
    pub fn json(status: u16, message: impl Into<String>) -> Self {
        Self::Json {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn view(&self) -> Option<&str> {
        match self {
            Self::Render { view, .. } => Some(view),
            _ => None,
        }
    }

    #[must_use]
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirect { path } => Some(path),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render { .. })
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Everything an action produced
#[derive(Debug)]
pub struct ActionResponse<R> {
    pub action: String,
    pub format: RequestFormat,
    pub decision: RenderDecision,
    pub flash: Flash,
    pub page_title: Option<String>,
    pub locals: Params,
    pub resource: Option<R>,
    pub resources: Option<Vec<R>>,
    pub datatable: Option<Datatable>,
}

impl<R> ActionResponse<R> {
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        format: RequestFormat,
        decision: RenderDecision,
        context: ResponseContext,
    ) -> Self {
        Self {
            action: action.into(),
            format,
            decision,
            flash: context.flash,
            page_title: context.page_title,
            locals: context.locals,
            resource: None,
            resources: None,
            datatable: None,
        }
    }

    #[must_use]
    pub fn with_resource(mut self, resource: R) -> Self {
        self.resource = Some(resource);
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: Vec<R>) -> Self {
        self.resources = Some(resources);
        self
    }

    #[must_use]
    pub fn with_datatable(mut self, datatable: Option<Datatable>) -> Self {
        self.datatable = datatable;
        self
    }
}
