//! Patch Pipeline (C5): applies an ordered patch list per named source,
//! mounting each patch source read-only under a worker image.

use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::llb::{ExecOp, Graph, Meta, Mount, Op, State};
use crate::spec::PatchSpec;

/// Applies `patches` (keyed by source name, sorted for deterministic LLB
/// output) to `sources` (also keyed by name), returning a new map — the
/// caller's map is never mutated.
///
/// `worker` is any state with a `patch` binary on its `PATH`; the pipeline
/// does not construct it.
pub fn apply(
    worker: State,
    sources: &BTreeMap<String, State>,
    patches: &BTreeMap<String, Vec<PatchSpec>>,
    graph: &mut Graph,
) -> EngineResult<BTreeMap<String, State>> {
    let mut result = sources.clone();

    for (name, state) in sources.iter() {
        let Some(patch_list) = patches.get(name) else {
            continue;
        };
        let mut current = *state;
        for patch in patch_list {
            let Some(&patch_state) = sources.get(&patch.source) else {
                continue;
            };
            current = apply_one(graph, worker, current, patch_state, &patch.source, patch.strip);
        }
        result.insert(name.clone(), current);
    }

    Ok(result)
}

fn apply_one(
    graph: &mut Graph,
    worker: State,
    src: State,
    patch: State,
    patch_source: &str,
    strip: u32,
) -> State {
    let meta = Meta {
        args: vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            format!("patch -p{strip} < /patch"),
        ],
        env: Vec::new(),
        cwd: "/src".to_string(),
        user: String::new(),
    };

    let patch_mount = Mount::readonly(patch, "/patch").with_source_path(patch_source.to_string());
    let mounts = vec![
        Mount::layer(worker, 0, "/"),
        patch_mount,
        Mount::layer(src, 1, "/src"),
    ];

    let exec = graph.add(Op::Exec(ExecOp { meta, mounts }));
    State {
        op_index: exec.op_index,
        output_index: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llb::SourceOp;

    fn seed(graph: &mut Graph, id: &str) -> State {
        graph.add(Op::Source(SourceOp {
            identifier: id.to_string(),
            attrs: BTreeMap::new(),
        }))
    }

    #[test]
    fn patches_apply_in_declared_order() {
        let mut graph = Graph::new();
        let worker = seed(&mut graph, "docker-image://worker");
        let src = seed(&mut graph, "git://example#abc");
        let p1 = seed(&mut graph, "docker-image://p1");
        let p2 = seed(&mut graph, "docker-image://p2");

        let mut sources = BTreeMap::new();
        sources.insert("main".to_string(), src);
        sources.insert("patch1".to_string(), p1);
        sources.insert("patch2".to_string(), p2);

        let mut patches = BTreeMap::new();
        patches.insert(
            "main".to_string(),
            vec![
                PatchSpec {
                    source: "patch1".to_string(),
                    strip: 1,
                },
                PatchSpec {
                    source: "patch2".to_string(),
                    strip: 1,
                },
            ],
        );

        let result = apply(worker, &sources, &patches, &mut graph).unwrap();
        assert_ne!(result.get("main").unwrap(), sources.get("main").unwrap());

        // The two applications are separate exec ops, appended in order.
        let exec_ops: Vec<_> = graph
            .ops()
            .iter()
            .filter(|op| matches!(op, Op::Exec(_)))
            .collect();
        assert_eq!(exec_ops.len(), 2);
    }

    #[test]
    fn input_map_is_not_mutated() {
        let mut graph = Graph::new();
        let worker = seed(&mut graph, "docker-image://worker");
        let src = seed(&mut graph, "git://example#abc");
        let p1 = seed(&mut graph, "docker-image://p1");

        let mut sources = BTreeMap::new();
        sources.insert("main".to_string(), src);
        sources.insert("patch1".to_string(), p1);
        let sources_before = sources.clone();

        let mut patches = BTreeMap::new();
        patches.insert(
            "main".to_string(),
            vec![PatchSpec {
                source: "patch1".to_string(),
                strip: 0,
            }],
        );

        let _ = apply(worker, &sources, &patches, &mut graph).unwrap();
        assert_eq!(sources, sources_before);
    }
}
