//! Per-controller configuration.
//!
//! Everything has a default, so `ControllerConfig::default()` is a working setup. The
//! struct deserializes from JSON/YAML for applications that keep it in a config file:
//!
//! ```json
//! {
//!   "namespaces": ["admin"],
//!   "per_page": 25,
//!   "submits": [
//!     { "label": "Save", "action": "save" },
//!     { "label": "Approve", "action": "approve", "redirect": "index" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Where a submit button sends the client after success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Index,
    Show,
    Edit,
    New,
    /// The referring page
    Back,
    Path(String),
}

/// A commit button: its label, the action it commits and an optional redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submit {
    pub label: String,
    pub action: String,
    #[serde(default)]
    pub redirect: Option<RedirectTarget>,
}

impl Submit {
    #[must_use]
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
            redirect: None,
        }
    }

    #[must_use]
    pub fn redirect_to(mut self, target: RedirectTarget) -> Self {
        self.redirect = Some(target);
        self
    }
}

/// `Save`, `Continue` (back to index) and `Add New`
#[must_use]
pub fn default_submits() -> Vec<Submit> {
    vec![
        Submit::new("Save", "save"),
        Submit::new("Continue", "save").redirect_to(RedirectTarget::Index),
        Submit::new("Add New", "save").redirect_to(RedirectTarget::New),
    ]
}

/// Page routes the application exposes for this resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSet {
    pub index: bool,
    pub new: bool,
    pub show: bool,
    pub edit: bool,
}

impl Default for RouteSet {
    fn default() -> Self {
        Self {
            index: true,
            new: true,
            show: true,
            edit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub namespaces: Vec<String>,
    pub submits: Vec<Submit>,
    pub routes: RouteSet,
    /// Enables the index datatable with this page size
    pub per_page: Option<u64>,
    pub max_per_page: u64,
    pub root_path: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            submits: default_submits(),
            routes: RouteSet::default(),
            per_page: None,
            max_per_page: 100,
            root_path: "/".to_string(),
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a submit, replacing any existing one with the same label
    #[must_use]
    pub fn with_submit(mut self, submit: Submit) -> Self {
        self.submits.retain(|s| s.label != submit.label);
        self.submits.push(submit);
        self
    }

    #[must_use]
    pub fn with_submits(mut self, submits: Vec<Submit>) -> Self {
        self.submits = submits;
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: RouteSet) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }
}
