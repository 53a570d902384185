//! Lowering: the part of the engine that turns a `Source` (and its
//! surrounding `Spec`) into LLB state — C2 through C5.

pub mod command;
pub mod filter;
pub mod patch;
pub mod variant;

pub use variant::lower;
