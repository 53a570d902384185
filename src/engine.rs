//! The `Engine` entry point gluing C1-C7 together. This is the only place
//! the typed `error::Error` gets converted into the crate's ambient
//! `stacked_errors::Result`, matching the rest of this codebase's habit of
//! layering call-site context onto a typed cause at capability boundaries.

use std::collections::BTreeMap;

use stacked_errors::{Result, StackableErr};

use crate::error::Error;
use crate::interfaces::SourceOpts;
use crate::llb::{Graph, State};
use crate::lower::{patch, variant};
use crate::source::Source;
use crate::spec::Spec;

pub struct Engine;

impl Engine {
    /// Lowers one named `Source` into LLB, appending ops to `graph` and
    /// returning the resolved state.
    #[tracing::instrument(level = "debug", skip(graph, source, opts))]
    pub async fn lower(
        graph: &mut Graph,
        name: &str,
        source: &Source,
        opts: &SourceOpts,
    ) -> Result<State> {
        variant::lower(graph, name, source, opts, false)
            .await
            .map_err(|e| Error::invalid_source(name, e))
            .stack_err_locationless(|| format!("Engine::lower(\"{name}\")"))
    }

    /// Applies the patch pipeline (C5) to every named source in `spec`,
    /// given a worker state (carrying a `patch` binary) and the
    /// already-lowered state for each named source. Returns a new map; the
    /// caller's map is never mutated.
    #[tracing::instrument(level = "debug", skip(graph, worker, spec, sources))]
    pub fn apply_patches(
        graph: &mut Graph,
        worker: State,
        spec: &Spec,
        sources: &BTreeMap<String, State>,
    ) -> Result<BTreeMap<String, State>> {
        patch::apply(worker, sources, &spec.patches, graph)
            .stack_err_locationless(|| "Engine::apply_patches")
    }
}
