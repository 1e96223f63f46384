//! Defaults-merged option structs for the public operations

use serde_json::Value;

use crate::markup::NodeId;

/// Options for `clone_template` / `clone_sub` / `insert`.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Hand the new instances to the effects collaborator for a fade-in
    pub fade: bool,
    /// Insert before existing same-named siblings instead of after
    pub top: bool,
    /// Explicit target container; required for nested templates
    pub container: Option<NodeId>,
    /// Remove existing instances in the container first
    pub empty: bool,
    /// Replicate the supplied models this many times
    pub clones: usize,
    /// Inject text rules as parsed markup instead of escaped text
    pub html: bool,
    /// Transform hook run against each model before injection
    pub transform: Option<String>,
    /// Callback hook run with each populated instance
    pub callback: Option<String>,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            fade: false,
            top: false,
            container: None,
            empty: false,
            clones: 1,
            html: false,
            transform: None,
            callback: None,
        }
    }
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = fade;
        self
    }

    pub fn with_top(mut self, top: bool) -> Self {
        self.top = top;
        self
    }

    pub fn with_container(mut self, container: NodeId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_empty(mut self, empty: bool) -> Self {
        self.empty = empty;
        self
    }

    pub fn with_clones(mut self, clones: usize) -> Self {
        self.clones = clones;
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transform = Some(name.into());
        self
    }

    pub fn with_callback(mut self, name: impl Into<String>) -> Self {
        self.callback = Some(name.into());
        self
    }
}

/// Options for `refresh` / `refresh_all` / `recount`.
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Replacement model; the instance's stored model is used otherwise
    pub model: Option<Value>,
    /// Inject text rules as parsed markup instead of escaped text
    pub html: bool,
    /// Resolve to the outermost clone instead of the nearest sub-clone
    pub main: bool,
}

impl RefreshOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Value) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    pub fn with_main(mut self, main: bool) -> Self {
        self.main = main;
        self
    }
}

/// Options for `destroy`.
#[derive(Debug, Clone, Default)]
pub struct DestroyOptions {
    /// Resolve to the outermost clone instead of the nearest sub-clone
    pub main: bool,
    /// Hand the instance to the effects collaborator before removal
    pub fade: bool,
}

impl DestroyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main(mut self, main: bool) -> Self {
        self.main = main;
        self
    }

    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = fade;
        self
    }
}

/// Options for `empty`.
#[derive(Debug, Clone, Default)]
pub struct EmptyOptions {
    /// Hand removed instances to the effects collaborator first
    pub fade: bool,
}

impl EmptyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = fade;
        self
    }
}
