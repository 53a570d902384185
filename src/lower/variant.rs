//! Variant Lowering (C3): the per-variant rules producing each variant's
//! base LLB state.

use std::collections::BTreeMap;

use crate::error::{EngineResult, Error};
use crate::interfaces::SourceOpts;
use crate::llb::{FileAction, FileActionMkdir, FileActionMkfile, FileOp, Graph, Op, SourceOp, State};
use crate::source::git;
use crate::source::{
    BuildSource, ContextSource, DockerImageSource, GitSource, HttpSource, InlineSource, Source,
    SourceVariant,
};

use super::command;
use super::filter::{self, LoweringOutcome};

/// Dispatches on the tagged variant and returns the variant's own state plus
/// the flags recording what it already absorbed, *before* the Filter
/// Planner (C2) runs. Recursive callers (mounts, nested builds) use this
/// directly when they need to inspect `path_handled` themselves; top-level
/// callers should prefer [`lower`].
pub async fn lower_variant(
    graph: &mut Graph,
    name: &str,
    source: &Source,
    opts: &SourceOpts,
    for_mount: bool,
) -> EngineResult<LoweringOutcome> {
    match &source.variant {
        SourceVariant::DockerImage(s) => lower_docker_image(graph, s, opts).await,
        SourceVariant::Git(s) => lower_git(graph, s),
        SourceVariant::Http(s) => lower_http(graph, s, name),
        SourceVariant::Context(s) => lower_context(graph, s, opts).await,
        SourceVariant::Build(s) => lower_build(graph, name, s, opts, for_mount).await,
        SourceVariant::Inline(s) => lower_inline(graph, name, s),
    }
}

/// Dispatches (C3) and immediately applies the Filter Planner (C2) — the
/// composition every caller other than the Command Composer wants, since
/// the Command Composer needs `path_handled` itself to decide a mount's
/// `SourcePath` before planning.
pub async fn lower(
    graph: &mut Graph,
    name: &str,
    source: &Source,
    opts: &SourceOpts,
    for_mount: bool,
) -> EngineResult<State> {
    let outcome = lower_variant(graph, name, source, opts, for_mount).await?;
    Ok(filter::plan(graph, outcome, &source.common, for_mount))
}

async fn lower_docker_image(
    graph: &mut Graph,
    s: &DockerImageSource,
    opts: &SourceOpts,
) -> EngineResult<LoweringOutcome> {
    let base = graph.add(Op::Source(SourceOp {
        identifier: format!("docker-image://{}", s.reference),
        attrs: BTreeMap::new(),
    }));
    match &s.cmd {
        None => Ok(LoweringOutcome::unhandled(base)),
        Some(cmd) => {
            if cmd.steps.is_empty() {
                return Err(Error::EmptyCommand);
            }
            let state = command::compose(graph, base, cmd, opts).await?;
            Ok(LoweringOutcome {
                state,
                path_handled: true,
                include_exclude_handled: false,
            })
        }
    }
}

fn lower_git(graph: &mut Graph, s: &GitSource) -> EngineResult<LoweringOutcome> {
    let remote = git::parse_remote(&s.url)?;
    let mut attrs = BTreeMap::new();
    attrs.insert("git.fullurl".to_string(), s.url.clone());
    if s.keep_git_dir {
        attrs.insert("git.keepgitdir".to_string(), "true".to_string());
    }
    let identifier = format!("git://{remote}#{}", s.commit);
    let state = graph.add(Op::Source(SourceOp { identifier, attrs }));
    Ok(LoweringOutcome::unhandled(state))
}

fn lower_http(graph: &mut Graph, s: &HttpSource, name: &str) -> EngineResult<LoweringOutcome> {
    let mut attrs = BTreeMap::new();
    attrs.insert("http.filename".to_string(), name.to_string());
    let state = graph.add(Op::Source(SourceOp {
        identifier: s.url.clone(),
        attrs,
    }));
    Ok(LoweringOutcome::unhandled(state))
}

async fn lower_context(
    graph: &mut Graph,
    s: &ContextSource,
    opts: &SourceOpts,
) -> EngineResult<LoweringOutcome> {
    let state = opts
        .context_resolver
        .resolve(graph, s.name_or_default())
        .await
        .map_err(Error::ContextResolveFailure)?;
    Ok(LoweringOutcome {
        state,
        path_handled: false,
        include_exclude_handled: true,
    })
}

fn lower_inline(graph: &mut Graph, name: &str, s: &InlineSource) -> EngineResult<LoweringOutcome> {
    match (&s.file, &s.dir) {
        (Some(file), None) => {
            let state = graph.add(Op::File(FileOp {
                base: None,
                actions: vec![FileAction::Mkfile(FileActionMkfile {
                    path: format!("/{name}"),
                    mode: file.permissions_or_default(),
                    data: file.contents.clone().into_bytes(),
                })],
            }));
            Ok(LoweringOutcome::unhandled(state))
        }
        (None, Some(dir)) => {
            let mut state = graph.add(Op::File(FileOp {
                base: None,
                actions: vec![FileAction::Mkdir(FileActionMkdir {
                    path: "/".to_string(),
                    mode: dir.permissions_or_default(),
                })],
            }));
            for (child_name, child_file) in &dir.files {
                state = graph.add(Op::File(FileOp {
                    base: Some(state),
                    actions: vec![FileAction::Mkfile(FileActionMkfile {
                        path: format!("/{child_name}"),
                        mode: child_file.permissions_or_default(),
                        data: child_file.contents.clone().into_bytes(),
                    })],
                }));
            }
            Ok(LoweringOutcome::unhandled(state))
        }
        (None, None) => Err(Error::NoSourceVariant),
        (Some(_), Some(_)) => Err(Error::from(
            "inline source must set exactly one of file or dir",
        )),
    }
}

/// The `Build` variant's `NoSourceVariant` recovery is deliberately narrow:
/// it fires only when the nested source is *literally* the zero value (an
/// empty `Inline`, the one a wire format that omits the `source` key
/// produces) and `inline` is set — not for any lowering failure that
/// happens to carry the same error kind. See `DESIGN.md` Open Question O-1.
async fn lower_build(
    graph: &mut Graph,
    name: &str,
    s: &BuildSource,
    opts: &SourceOpts,
    for_mount: bool,
) -> EngineResult<LoweringOutcome> {
    if s.inline.is_some() && s.file.is_some() {
        return Err(Error::from(
            "build source must not set both inline and file",
        ));
    }

    let nested_is_default = s.source.is_empty_inline();
    // Boxed: `lower` -> `lower_variant` -> `lower_build` -> `lower` is a
    // recursive async call cycle, which needs an explicit heap allocation to
    // give the future a finite size.
    let context_result = Box::pin(lower(graph, name, &s.source, opts, for_mount)).await;

    let context_state = match context_result {
        Ok(state) => state,
        Err(e) if e.is_no_source_variant() && s.inline.is_some() && nested_is_default => {
            graph.add(Op::Scratch)
        }
        Err(e) => return Err(e),
    };

    let dockerfile = s
        .inline
        .clone()
        .or_else(|| s.file.clone())
        .unwrap_or_default();

    let state = opts
        .forwarder
        .forward(graph, &dockerfile, context_state)
        .await
        .map_err(Error::ForwardFailure)?;

    Ok(LoweringOutcome::unhandled(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::stub;
    use crate::source::{CommonOpts, GitSource, HttpSource};

    #[tokio::test]
    async fn git_ssh_scenario() {
        let mut graph = Graph::new();
        let source = Source::new(SourceVariant::Git(GitSource {
            url: "user@host:22:test.git".to_string(),
            commit: "abc".to_string(),
            keep_git_dir: false,
        }));
        let opts = stub::opts();
        let state = lower(&mut graph, "repo", &source, &opts, false).await.unwrap();
        assert_eq!(graph.ops().len(), 1);
        match &graph.ops()[state.op_index] {
            Op::Source(op) => {
                assert_eq!(op.identifier, "git://host:22/test.git#abc");
                assert_eq!(op.attrs.get("git.fullurl").unwrap(), "user@host:22:test.git");
            }
            _ => panic!("expected a source op"),
        }
    }

    #[tokio::test]
    async fn http_uses_enclosing_name_not_url_basename() {
        let mut graph = Graph::new();
        let source = Source::new(SourceVariant::Http(HttpSource {
            url: "https://localhost/test.tar.gz".to_string(),
        }));
        let opts = stub::opts();
        let state = lower(&mut graph, "test", &source, &opts, false).await.unwrap();
        match &graph.ops()[state.op_index] {
            Op::Source(op) => {
                assert_eq!(op.identifier, "https://localhost/test.tar.gz");
                assert_eq!(op.attrs.get("http.filename").unwrap(), "test");
            }
            _ => panic!("expected a source op"),
        }
        assert_eq!(graph.ops().len(), 1);
    }

    #[tokio::test]
    async fn build_recovers_from_omitted_source_when_inline_set() {
        let mut graph = Graph::new();
        let build = BuildSource {
            source: Box::new(Source::default()),
            inline: Some("FROM busybox:latest\nRUN echo hello".to_string()),
            file: None,
            target: None,
            args: BTreeMap::new(),
        };
        let source = Source::new(SourceVariant::Build(build));
        let opts = stub::opts();
        let result = lower(&mut graph, "img", &source, &opts, false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn build_rejects_inline_and_file_together() {
        let mut graph = Graph::new();
        let build = BuildSource {
            source: Box::new(Source::default()),
            inline: Some("FROM x".to_string()),
            file: Some("Dockerfile".to_string()),
            target: None,
            args: BTreeMap::new(),
        };
        let source = Source::new(SourceVariant::Build(build));
        let opts = stub::opts();
        let result = lower(&mut graph, "img", &source, &opts, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn inline_dir_emits_mkdir_then_sorted_mkfiles() {
        use crate::source::{InlineDir, InlineFile, InlineSource};

        let mut files = BTreeMap::new();
        files.insert(
            "zeta.txt".to_string(),
            InlineFile {
                contents: "z".to_string(),
                uid: None,
                gid: None,
                permissions: None,
            },
        );
        files.insert(
            "alpha.txt".to_string(),
            InlineFile {
                contents: "a".to_string(),
                uid: None,
                gid: None,
                permissions: None,
            },
        );
        let mut graph = Graph::new();
        let source = Source::new(SourceVariant::Inline(InlineSource {
            file: None,
            dir: Some(InlineDir {
                uid: None,
                gid: None,
                permissions: None,
                files,
            }),
        }));
        let opts = stub::opts();
        lower(&mut graph, "tree", &source, &opts, false).await.unwrap();
        assert_eq!(graph.ops().len(), 3);
        match &graph.ops()[1] {
            Op::File(FileOp { actions, .. }) => match &actions[0] {
                FileAction::Mkfile(m) => assert_eq!(m.path, "/alpha.txt"),
                _ => panic!("expected a mkfile action"),
            },
            _ => panic!("expected a file op"),
        }
        match &graph.ops()[2] {
            Op::File(FileOp { actions, .. }) => match &actions[0] {
                FileAction::Mkfile(m) => assert_eq!(m.path, "/zeta.txt"),
                _ => panic!("expected a mkfile action"),
            },
            _ => panic!("expected a file op"),
        }
    }

    #[tokio::test]
    async fn no_variant_on_empty_inline_reports_no_source_variant() {
        let mut graph = Graph::new();
        let source = Source::default();
        let opts = stub::opts();
        let err = lower(&mut graph, "x", &source, &opts, false).await.unwrap_err();
        assert!(err.is_no_source_variant());
    }

    #[allow(dead_code)]
    fn with_path(mut s: Source, path: &str) -> Source {
        s.common = CommonOpts {
            path: path.to_string(),
            ..Default::default()
        };
        s
    }
}
