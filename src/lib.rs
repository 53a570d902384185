//! dalec's Source Resolution Engine: lowers a tagged `Source` into an
//! ordered sequence of BuildKit LLB operations.
//!
//! This crate covers the hard recursive core only — executing the graph,
//! fetching bytes, YAML parsing of the top-level spec, and talking to an
//! actual BuildKit daemon are the caller's concern.

pub mod doc;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod llb;
pub mod lower;
pub mod source;
pub mod spec;

pub use engine::Engine;
pub use error::{EngineResult, Error};
pub use interfaces::{ContextResolver, Forwarder, MetaResolver, SourceOpts};
pub use source::{Source, SourceVariant};
pub use spec::{PatchSpec, Spec};
