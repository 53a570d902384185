//! The top-level `Spec`/`PatchSpec` container: the named-source map, name
//! validation, and the read-only input contract the engine consumes.
//!
//! Parsing this shape from user-authored YAML remains out of scope; this
//! module only defines the in-memory shape and its invariants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, Error};
use crate::source::Source;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub source: String,
    #[serde(default)]
    pub strip: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spec {
    pub name: String,
    #[serde(default)]
    pub sources: BTreeMap<String, Source>,
    #[serde(default)]
    pub patches: BTreeMap<String, Vec<PatchSpec>>,
}

impl Spec {
    /// Source names must not contain a path separator (`/` or `\`).
    pub fn validate_names(&self) -> EngineResult<()> {
        for name in self.sources.keys() {
            if name.contains('/') || name.contains('\\') {
                return Err(Error::NameHasSeparator { name: name.clone() });
            }
        }
        Ok(())
    }
}
