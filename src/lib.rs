// Core engine of an assembly-graph viewer: the bidirected graph model,
// path tracing and contiguity queries, exact-overlap auto-detection, and
// reconciliation of external-aligner hits into ranked candidate paths.
// Rendering, layout and graph-file parsing live in other components and
// talk to this crate through `AssemblyGraph`'s build interface.
pub mod evalue;
pub mod graph;
pub mod hits;
pub mod link;
pub mod overlap;
pub mod path;
pub mod reconcile;
pub mod search;
pub mod segment;
pub mod trace;
