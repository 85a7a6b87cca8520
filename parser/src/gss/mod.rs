//! The graph-structured-stack runtime.

mod engine;
mod failure;
mod node;

pub use engine::{EngineConfig, RunOutcome, RuntimeParser};
pub use failure::{
    context_line, failure_issue, line_starts, location_of, FailedParseReason, InputLocation,
    IssueKind, ParseIssue,
};
pub use node::{GrowingNode, GrowingNodeIndex, Merged, NodeId, ParseGraph};
