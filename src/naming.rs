//! Naming conventions derived from a resource's type identifier.
//!
//! ```rust
//! use crudcrate_controller::naming::ResourceNaming;
//!
//! let naming = ResourceNaming::for_class("Blog::Post").with_namespaces(["admin"]);
//! assert_eq!(naming.name(), "post");
//! assert_eq!(naming.plural_name(), "posts");
//! assert_eq!(naming.class_path(), "blog");
//! assert_eq!(naming.namespaced_class_name(), "Admin::Blog::Post");
//! assert_eq!(naming.human_plural_name(), "blog posts");
//! assert_eq!(naming.index_path(), "/admin/posts");
//! ```
//!
//! Every derived string is computed on first access and memoized for the lifetime of
//! the `ResourceNaming` value.

use std::sync::OnceLock;

use heck::ToUpperCamelCase;

use crate::inflector::{classify, humanize, pluralize, singularize, underscore};

fn segments(identifier: &str) -> impl Iterator<Item = &str> {
    identifier
        .split("::")
        .flat_map(|part| part.split('/'))
        .filter(|part| !part.is_empty())
}

fn humanize_class(class_name: &str) -> String {
    underscore(&class_name.replace("::", " ").replace('/', " ")).replace('_', " ")
}

#[derive(Debug, Clone)]
pub struct ResourceNaming {
    identifier: String,
    bound: bool,
    namespaces: Vec<String>,
    name: OnceLock<String>,
    plural_name: OnceLock<String>,
    class_name: OnceLock<String>,
    class_path: OnceLock<String>,
    namespaced_class_name: OnceLock<String>,
    namespace: OnceLock<Option<String>>,
    human_name: OnceLock<String>,
    human_plural_name: OnceLock<String>,
    model_human_name: OnceLock<String>,
    controller_path: OnceLock<String>,
}

impl ResourceNaming {
    fn build(identifier: &str, bound: bool) -> Self {
        Self {
            identifier: identifier.to_string(),
            bound,
            namespaces: Vec::new(),
            name: OnceLock::new(),
            plural_name: OnceLock::new(),
            class_name: OnceLock::new(),
            class_path: OnceLock::new(),
            namespaced_class_name: OnceLock::new(),
            namespace: OnceLock::new(),
            human_name: OnceLock::new(),
            human_plural_name: OnceLock::new(),
            model_human_name: OnceLock::new(),
            controller_path: OnceLock::new(),
        }
    }

    /// Naming bound to a concrete type, `class_name` is the identifier itself.
    #[must_use]
    pub fn for_class(class_name: &str) -> Self {
        Self::build(class_name, true)
    }

    /// Naming from a loose name such as `admin/posts`; `class_name` is classified from it.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::build(name, false)
    }

    #[must_use]
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// `post`
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| {
            let last = segments(&self.identifier).last().unwrap_or_default();
            underscore(&singularize(last))
        })
    }

    /// `posts`
    pub fn plural_name(&self) -> &str {
        self.plural_name.get_or_init(|| pluralize(self.name()))
    }

    /// `Blog::Post`
    pub fn class_name(&self) -> &str {
        self.class_name.get_or_init(|| {
            if self.bound {
                self.identifier.clone()
            } else {
                classify(self.name())
            }
        })
    }

    /// `blog`
    pub fn class_path(&self) -> &str {
        self.class_path.get_or_init(|| {
            let parts: Vec<&str> = segments(self.class_name()).collect();
            parts[..parts.len().saturating_sub(1)]
                .iter()
                .map(|part| underscore(part))
                .collect::<Vec<_>>()
                .join("/")
        })
    }

    /// `Admin::Blog::Post`
    pub fn namespaced_class_name(&self) -> &str {
        self.namespaced_class_name.get_or_init(|| {
            self.namespaces
                .iter()
                .map(|ns| ns.to_upper_camel_case())
                .chain(std::iter::once(self.class_name().to_string()))
                .collect::<Vec<_>>()
                .join("::")
        })
    }

    /// `admin/things`, or `None` without namespaces
    pub fn namespace(&self) -> Option<&str> {
        self.namespace
            .get_or_init(|| {
                if self.namespaces.is_empty() {
                    None
                } else {
                    Some(self.namespaces.join("/"))
                }
            })
            .as_deref()
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// `blog post`
    pub fn human_name(&self) -> &str {
        self.human_name
            .get_or_init(|| humanize_class(self.class_name()))
    }

    /// `blog posts`
    pub fn human_plural_name(&self) -> &str {
        self.human_plural_name
            .get_or_init(|| humanize_class(&pluralize(self.class_name())))
    }

    /// `Post` for `Blog::Post`; the model name used in flash messages
    pub fn model_human_name(&self) -> &str {
        self.model_human_name.get_or_init(|| humanize(self.name()))
    }

    /// Key that nests submitted attributes, e.g. `post[title]`.
    pub fn param_key(&self) -> &str {
        self.name()
    }

    /// `admin/posts`, also the template prefix.
    pub fn controller_path(&self) -> &str {
        self.controller_path.get_or_init(|| match self.namespace() {
            Some(namespace) => format!("{namespace}/{}", self.plural_name()),
            None => self.plural_name().to_string(),
        })
    }

    /// `/admin/posts`
    #[must_use]
    pub fn index_path(&self) -> String {
        format!("/{}", self.controller_path())
    }
}
