//! Command Composer (C4): for `DockerImage` sources with a `cmd`, chains
//! exec-ops with env, cwd, and mounts, recursively resolving mount sources
//! via C3.

use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::interfaces::SourceOpts;
use crate::llb::{self, ExecOp, Graph, Meta, Mount, Op, State};
use crate::source::Command;

use super::filter;
use super::variant::lower_variant;

fn normalize_dir(dir: &str) -> String {
    if dir.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", dir.trim_start_matches('/'))
    }
}

/// Pre-resolves one mount's source with `for_mount = true`, returning its
/// state and — when the source has a bare subpath with no include/exclude
/// filters — the `SourcePath` to mount instead of a filter copy.
async fn lower_mount_source(
    graph: &mut Graph,
    mount_name: &str,
    source: &crate::source::Source,
    opts: &SourceOpts,
) -> EngineResult<(State, Option<String>)> {
    let outcome = lower_variant(graph, mount_name, source, opts, true).await?;
    let path_handled = outcome.path_handled;
    let common = &source.common;
    let state = filter::plan(graph, outcome, common, true);
    let source_path = if !path_handled && !common.is_root_path() && !common.has_filters() {
        Some(normalize_dir(&common.path))
    } else {
        None
    };
    Ok((state, source_path))
}

/// Runs `cmd`'s steps against `base`, returning the final accumulated
/// state. The rootfs (mount output 0) threads the image forward step by
/// step; a second, independent mount (output 1) starts from scratch at
/// `cmd.dir` and accumulates the same way — this is the state `cmd.dir`'s
/// caller receives, per the `DockerImage+cmd` variant's `path_handled`
/// contract.
pub async fn compose(
    graph: &mut Graph,
    base: State,
    cmd: &Command,
    opts: &SourceOpts,
) -> EngineResult<State> {
    let cwd = normalize_dir(&cmd.dir);

    let mut resolved_mounts = Vec::with_capacity(cmd.mounts.len());
    for mount in &cmd.mounts {
        let (state, source_path) =
            lower_mount_source(graph, &mount.dest, &mount.spec, opts).await?;
        resolved_mounts.push((mount.dest.clone(), state, source_path));
    }

    let mut rootfs = base;
    let mut accumulator: Option<State> = None;

    for step in &cmd.steps {
        let mut env: BTreeMap<String, String> = cmd.env.clone();
        for (k, v) in &step.env {
            env.insert(k.clone(), v.clone());
        }

        let meta = Meta {
            args: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                step.command.clone(),
            ],
            env: llb::env_pairs(&env),
            cwd: cwd.clone(),
            user: String::new(),
        };

        let mut mounts = vec![Mount::layer(rootfs, 0, "/")];
        mounts.push(match accumulator {
            Some(prev) => Mount::layer(prev, 1, cwd.clone()),
            None => {
                let mut m = Mount::scratch(cwd.clone());
                m.output = Some(1);
                m
            }
        });
        for (dest, state, source_path) in &resolved_mounts {
            let mut mount = Mount::readonly(*state, dest.clone());
            if let Some(source_path) = source_path {
                mount = mount.with_source_path(source_path.clone());
            }
            mounts.push(mount);
        }
        for cache_dir in &cmd.cache_dirs {
            mounts.push(Mount::cache(cache_dir.clone(), cache_dir.clone()));
        }

        let exec = graph.add(Op::Exec(ExecOp { meta, mounts }));
        rootfs = State {
            op_index: exec.op_index,
            output_index: 0,
        };
        accumulator = Some(State {
            op_index: exec.op_index,
            output_index: 1,
        });
    }

    Ok(accumulator.expect("DockerImage's EmptyCommand check runs before compose() is called"))
}
