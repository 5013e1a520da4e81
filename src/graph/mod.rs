//! Arena-allocated signal graph evaluated one sample at a time.
//!
//! A patch builds a graph of primitive nodes once, then steps it for every
//! sample. Nodes live in a single arena and reference each other by index,
//! which keeps evaluation allocation-free and lets one node feed several
//! consumers through a splitter.

/// The node arena's vocabulary: node variants, inputs, and the step context.
pub mod node;
/// Graph construction, live parameter access, and pull-model evaluation.
pub mod signal;

pub use node::{Input, Node, NodeId, StepCtx};
pub use signal::SignalGraph;
