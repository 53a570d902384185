//! Typed error kinds for the source resolution engine.
//!
//! Component functions (filter planner, variant lowering, command composer,
//! patch pipeline) return [`EngineResult`], a plain `Result<T, Error>` that
//! callers can match on directly — this is what lets the `Build` variant's
//! `NoSourceVariant` recovery (see [`crate::lower::variant`]) inspect the
//! root cause before any context gets stacked onto it. Public entry points on
//! [`crate::engine::Engine`] convert into `stacked_errors::Result`, wrapping
//! with call-site context the way the rest of this codebase always does at a
//! capability boundary.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No variant field was set on a `Source`.
    #[error("source has no variant set")]
    NoSourceVariant,

    /// Wraps any per-source lowering failure with the name it failed under,
    /// for user-facing diagnostics.
    #[error("invalid source \"{name}\": {cause}")]
    InvalidSource { name: String, cause: Box<Error> },

    /// A source name in the enclosing spec contained a path separator.
    #[error("source name \"{name}\" must not contain a path separator")]
    NameHasSeparator { name: String },

    /// A `DockerImage` source carried a `Command` with zero steps.
    #[error("image command has no steps")]
    EmptyCommand,

    /// A `Git` source's URL could not be parsed as SSH or HTTP(S).
    #[error("could not parse git ref \"{url}\"")]
    InvalidGitRef { url: String },

    /// The injected `Forwarder` capability failed to lower a `Build` source.
    #[error("forwarder failed: {0}")]
    ForwardFailure(String),

    /// The injected `ContextResolver` capability failed to resolve a named
    /// local context.
    #[error("context resolve failed: {0}")]
    ContextResolveFailure(String),

    /// A catch-all for ambient wrapping, in the same spirit as this
    /// codebase's `Error::from(String)` convenience constructor.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps `self` as the cause of an [`Error::InvalidSource`] for `name`.
    pub fn invalid_source(name: impl Into<String>, cause: Error) -> Error {
        Error::InvalidSource {
            name: name.into(),
            cause: Box::new(cause),
        }
    }

    /// True if this error (or its immediate cause, for `InvalidSource`) is
    /// [`Error::NoSourceVariant`].
    pub fn is_no_source_variant(&self) -> bool {
        match self {
            Error::NoSourceVariant => true,
            Error::InvalidSource { cause, .. } => cause.is_no_source_variant(),
            _ => false,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_owned())
    }
}
