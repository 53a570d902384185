//! A small, self-contained model of the slice of the BuildKit LLB op graph
//! this engine emits.
//!
//! Rather than depend on a thick client crate for a handful of op shapes,
//! [`Graph`] builds and content-addresses ops directly — the same approach
//! the corpus's own hand-rolled LLB builder takes for exactly the same
//! reason: full control over what gets emitted. `State` is the handle
//! threaded between lowering functions and into downstream mounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// A reference to one output of a previously-added op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub op_index: usize,
    pub output_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOp {
    pub identifier: String,
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountType {
    Bind,
    Cache,
    Tmpfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub input: Option<State>,
    pub dest: String,
    /// `Some(n)` if this mount produces a new output on the exec op.
    pub output: Option<i64>,
    pub readonly: bool,
    pub mount_type: MountType,
    pub cache_id: Option<String>,
    /// The `SourcePath` selector: a subpath within `input` to mount, rather
    /// than its root. `None` mounts the whole of `input`.
    pub source_path: Option<String>,
}

impl Mount {
    pub fn layer(input: State, output: i64, dest: impl Into<String>) -> Self {
        Mount {
            input: Some(input),
            dest: dest.into(),
            output: Some(output),
            readonly: false,
            mount_type: MountType::Bind,
            cache_id: None,
            source_path: None,
        }
    }

    pub fn readonly(input: State, dest: impl Into<String>) -> Self {
        Mount {
            input: Some(input),
            dest: dest.into(),
            output: None,
            readonly: true,
            mount_type: MountType::Bind,
            cache_id: None,
            source_path: None,
        }
    }

    pub fn scratch(dest: impl Into<String>) -> Self {
        Mount {
            input: None,
            dest: dest.into(),
            output: None,
            readonly: false,
            mount_type: MountType::Tmpfs,
            cache_id: None,
            source_path: None,
        }
    }

    pub fn cache(dest: impl Into<String>, cache_id: impl Into<String>) -> Self {
        Mount {
            input: None,
            dest: dest.into(),
            output: None,
            readonly: false,
            mount_type: MountType::Cache,
            cache_id: Some(cache_id.into()),
            source_path: None,
        }
    }

    /// Sets the `SourcePath` selector, consuming and returning `self` for
    /// use at a constructor call site.
    pub fn with_source_path(mut self, source_path: impl Into<String>) -> Self {
        self.source_path = Some(source_path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOp {
    pub meta: Meta,
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActionCopy {
    pub input: State,
    pub src: String,
    pub dest: String,
    pub dir_copy_contents: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActionMkdir {
    pub path: String,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActionMkfile {
    pub path: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileAction {
    Copy(FileActionCopy),
    Mkdir(FileActionMkdir),
    Mkfile(FileActionMkfile),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOp {
    pub base: Option<State>,
    pub actions: Vec<FileAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Source(SourceOp),
    Exec(ExecOp),
    File(FileOp),
    /// An explicitly empty state, used where the graph needs a placeholder
    /// input rather than an omitted one (e.g. a `Build` source whose nested
    /// context was never provided).
    Scratch,
}

/// The op log an `Engine::lower` call produces, in emission order.
///
/// Ops are content-addressed the way real LLB definitions are (a digest per
/// marshaled op); here the "marshaling" is a canonical JSON encoding rather
/// than the real wire protobuf, since this engine's job ends at producing
/// the graph, not transmitting it to a daemon.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    ops: Vec<Op>,
    digests: Vec<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn digest(&self, state: State) -> &str {
        &self.digests[state.op_index]
    }

    pub fn add(&mut self, op: Op) -> State {
        let op_index = self.ops.len();
        let digest = digest_of(&op);
        self.ops.push(op);
        self.digests.push(digest);
        State {
            op_index,
            output_index: 0,
        }
    }
}

fn digest_of(op: &Op) -> String {
    let encoded = serde_json::to_vec(op).expect("Op is always JSON-serializable");
    let mut hasher = Sha3_256::new();
    hasher.update(&encoded);
    format!("sha3:{:x}", hasher.finalize())
}

/// `env` as `(key, value)` pairs in lexicographic key order. Taking a
/// `BTreeMap` makes this the identity operation on iteration, but the
/// explicit conversion point is kept so the sort guarantee is visible at
/// every call site that hands env to an `llb::Meta`.
pub fn env_pairs(env: &BTreeMap<String, String>) -> Vec<(String, String)> {
    env.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
