//! Error types for template compilation and clone lifecycle operations

use thiserror::Error;

/// Errors raised by engine operations.
///
/// `TemplateNotFound` and `ContainerMissing` are contract violations: they
/// indicate broken markup or a broken caller, so the operation aborts and
/// nothing is retried. `MalformedRule` is constructed during compilation,
/// logged, and skipped so that partially annotated markup still compiles.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No template with the given name exists in the registry or the document
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// A nested template was cloned without an explicit container
    #[error("container missing for nested template: {name}")]
    ContainerMissing { name: String },

    /// A transform or callback name has no registered hook
    #[error("callback not registered: {name}")]
    CallbackUnresolved { name: String },

    /// A directive attribute's value does not match the token grammar
    #[error("malformed {directive} rule: {value:?}")]
    MalformedRule { directive: String, value: String },
}
