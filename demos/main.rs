//! Exercises the engine end to end: reads a minimal JSON fixture describing
//! one named `Source`, lowers it with stub injected capabilities, and
//! prints the reproducibility doc plus a summary of the emitted ops.
//!
//! This is a smoke-testing harness, not a reimplementation of the
//! (out-of-scope) YAML front end or CLI.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use dalec::llb::{Graph, Op, SourceOp, State};
use dalec::{ContextResolver, Forwarder, MetaResolver, Source, SourceOpts};
use stacked_errors::{Result, StackableErr};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Lower a single dalec Source fixture and print its LLB doc")]
struct Args {
    /// Path to a JSON fixture with shape `{"name": ..., "source": {...}}`.
    #[arg(short, long, default_value = "demos/fixtures/git.json")]
    fixture: PathBuf,
}

#[derive(serde::Deserialize)]
struct Fixture {
    name: String,
    source: Source,
}

struct NoopForwarder;

#[async_trait]
impl Forwarder for NoopForwarder {
    async fn forward(
        &self,
        graph: &mut Graph,
        dockerfile: &str,
        _context: State,
    ) -> std::result::Result<State, String> {
        Ok(graph.add(Op::Source(SourceOp {
            identifier: format!("forwarded://{dockerfile}"),
            attrs: Default::default(),
        })))
    }
}

struct NoopContextResolver;

#[async_trait]
impl ContextResolver for NoopContextResolver {
    async fn resolve(&self, graph: &mut Graph, name: &str) -> std::result::Result<State, String> {
        Ok(graph.add(Op::Source(SourceOp {
            identifier: format!("local://{name}"),
            attrs: Default::default(),
        })))
    }
}

struct NoopMetaResolver;

impl MetaResolver for NoopMetaResolver {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let contents = std::fs::read_to_string(&args.fixture)
        .stack_err_locationless(|| format!("reading fixture {:?}", args.fixture))?;
    let fixture: Fixture = serde_json::from_str(&contents)
        .stack_err_locationless(|| format!("parsing fixture {:?}", args.fixture))?;

    let opts = SourceOpts {
        forwarder: Arc::new(NoopForwarder),
        context_resolver: Arc::new(NoopContextResolver),
        meta_resolver: Arc::new(NoopMetaResolver),
    };

    let mut graph = Graph::new();
    let state = dalec::Engine::lower(&mut graph, &fixture.name, &fixture.source, &opts).await?;

    println!("{}", dalec::doc::render(&fixture.source, &fixture.name));
    println!(
        "emitted {} op(s); final state is op #{}",
        graph.ops().len(),
        state.op_index
    );

    Ok(())
}
