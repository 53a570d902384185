//! Filter Planner (C2): decides whether include/exclude/subpath handling
//! requires an extra copy-op, and emits it.
//!
//! Variant lowering (C3) returns a [`LoweringOutcome`] — the state plus two
//! flags recording what the variant already absorbed — instead of writing
//! through a shared mutable receipt, the explicit-return shape the design
//! notes recommend as clearer in a language with real sum types.

use crate::llb::{FileAction, FileActionCopy, FileOp, Graph, Op, State};
use crate::source::CommonOpts;

pub struct LoweringOutcome {
    pub state: State,
    pub path_handled: bool,
    pub include_exclude_handled: bool,
}

impl LoweringOutcome {
    pub fn unhandled(state: State) -> Self {
        LoweringOutcome {
            state,
            path_handled: false,
            include_exclude_handled: false,
        }
    }
}

/// Applies the C2 decision table, returning the final state for this
/// source: either the variant's own state unchanged, or that state with one
/// combined filter copy-op appended.
pub fn plan(graph: &mut Graph, outcome: LoweringOutcome, common: &CommonOpts, for_mount: bool) -> State {
    let LoweringOutcome {
        state,
        path_handled,
        include_exclude_handled,
    } = outcome;

    let needs_path_copy = !common.is_root_path() && !for_mount && !path_handled;
    let needs_filter_copy = common.has_filters() && !include_exclude_handled;

    if !needs_path_copy && !needs_filter_copy {
        return state;
    }

    let src = if path_handled || common.path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", common.path.trim_start_matches('/'))
    };

    let (include_patterns, exclude_patterns) = if include_exclude_handled {
        (Vec::new(), Vec::new())
    } else {
        (common.includes.clone(), common.excludes.clone())
    };

    graph.add(Op::File(FileOp {
        base: Some(state),
        actions: vec![FileAction::Copy(FileActionCopy {
            input: state,
            src,
            dest: "/".to_string(),
            dir_copy_contents: true,
            include_patterns,
            exclude_patterns,
        })],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llb::SourceOp;
    use std::collections::BTreeMap;

    fn seed(graph: &mut Graph) -> State {
        graph.add(Op::Source(SourceOp {
            identifier: "docker-image://alpine".to_string(),
            attrs: BTreeMap::new(),
        }))
    }

    #[test]
    fn root_path_no_filters_is_noop() {
        let mut graph = Graph::new();
        let state = seed(&mut graph);
        let out = plan(
            &mut graph,
            LoweringOutcome::unhandled(state),
            &CommonOpts::default(),
            false,
        );
        assert_eq!(out, state);
        assert_eq!(graph.ops().len(), 1);
    }

    #[test]
    fn subpath_emits_single_copy() {
        let mut graph = Graph::new();
        let state = seed(&mut graph);
        let common = CommonOpts {
            path: "subdir".to_string(),
            ..Default::default()
        };
        plan(&mut graph, LoweringOutcome::unhandled(state), &common, false);
        assert_eq!(graph.ops().len(), 2);
        match &graph.ops()[1] {
            Op::File(FileOp { actions, .. }) => {
                assert_eq!(actions.len(), 1);
                match &actions[0] {
                    FileAction::Copy(c) => {
                        assert_eq!(c.src, "/subdir");
                        assert_eq!(c.dest, "/");
                        assert!(c.dir_copy_contents);
                    }
                    _ => panic!("expected a copy action"),
                }
            }
            _ => panic!("expected a file op"),
        }
    }

    #[test]
    fn subpath_and_filters_share_one_copy() {
        let mut graph = Graph::new();
        let state = seed(&mut graph);
        let common = CommonOpts {
            path: "subdir".to_string(),
            includes: vec!["foo".to_string(), "bar".to_string()],
            excludes: vec!["baz".to_string()],
        };
        plan(&mut graph, LoweringOutcome::unhandled(state), &common, false);
        assert_eq!(graph.ops().len(), 2);
        match &graph.ops()[1] {
            Op::File(FileOp { actions, .. }) => match &actions[0] {
                FileAction::Copy(c) => {
                    assert_eq!(c.src, "/subdir");
                    assert_eq!(c.include_patterns, vec!["foo".to_string(), "bar".to_string()]);
                    assert_eq!(c.exclude_patterns, vec!["baz".to_string()]);
                }
                _ => panic!("expected a copy action"),
            },
            _ => panic!("expected a file op"),
        }
    }

    #[test]
    fn path_handled_skips_path_copy_but_not_filter_copy() {
        let mut graph = Graph::new();
        let state = seed(&mut graph);
        let common = CommonOpts {
            path: "subdir".to_string(),
            includes: vec!["foo".to_string()],
            ..Default::default()
        };
        let out = LoweringOutcome {
            state,
            path_handled: true,
            include_exclude_handled: false,
        };
        plan(&mut graph, out, &common, false);
        match &graph.ops()[1] {
            Op::File(FileOp { actions, .. }) => match &actions[0] {
                FileAction::Copy(c) => assert_eq!(c.src, "/"),
                _ => panic!("expected a copy action"),
            },
            _ => panic!("expected a file op"),
        }
    }

    #[test]
    fn for_mount_suppresses_path_copy() {
        let mut graph = Graph::new();
        let state = seed(&mut graph);
        let common = CommonOpts {
            path: "subdir".to_string(),
            ..Default::default()
        };
        let out = plan(&mut graph, LoweringOutcome::unhandled(state), &common, true);
        assert_eq!(out, state);
        assert_eq!(graph.ops().len(), 1);
    }
}
