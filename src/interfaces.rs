//! External interface contracts (C7): the capabilities this engine is given
//! rather than implements itself.
//!
//! `Forwarder` and `ContextResolver` are trait objects so callers can inject
//! closures or richer gateway-client adapters without this crate depending
//! on any concrete BuildKit client. `MetaResolver` is kept as an opaque
//! marker: it is handed to `Engine::lower` alongside the other capabilities
//! so the same `SourceOpts` bundle reaches every call site, but it is never
//! attached to an emitted `Image` op and never inspected by this engine —
//! an `Op` stays plain data (content-addressed via `Serialize`), and a
//! resolver handle has no serializable form to attach. Whatever executes
//! the graph later already holds the same `Arc<dyn MetaResolver>` and can
//! consult it itself when it reaches an `Image` op. Both fallible
//! capabilities report failure as a plain `String`; the engine is the one
//! that wraps it into a typed `Error::ForwardFailure`/
//! `Error::ContextResolveFailure` with call-site context, so implementors
//! don't need this crate's error type at all.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llb::{Graph, State};

/// Lowers a `Build` source's nested Dockerfile into LLB, a capability this
/// crate does not implement (Dockerfile-to-LLB conversion is out of scope).
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        graph: &mut Graph,
        dockerfile: &str,
        context: State,
    ) -> Result<State, String>;
}

/// Resolves a named local build context (e.g. a `Context` source's name)
/// into an LLB state, a capability this crate does not implement (the
/// caller's own dockerignore/context handling is out of scope).
#[async_trait]
pub trait ContextResolver: Send + Sync {
    async fn resolve(&self, graph: &mut Graph, name: &str) -> Result<State, String>;
}

/// Opaque image metadata resolution (platform/digest pinning). The engine
/// never calls into this itself; it only threads the handle through so a
/// caller's resolver can be consulted by whichever layer actually executes
/// the graph.
pub trait MetaResolver: Send + Sync {}

/// The capabilities bundle threaded through every `Engine::lower` call, in
/// place of passing three separate trait-object parameters at each call
/// site.
#[derive(Clone)]
pub struct SourceOpts {
    pub forwarder: Arc<dyn Forwarder>,
    pub context_resolver: Arc<dyn ContextResolver>,
    pub meta_resolver: Arc<dyn MetaResolver>,
}
