//! Errors raised while constructing or linking block graphs.

use thiserror::Error;

use crate::blocks::BlockId;

/// Authoring-time graph errors. Nothing in here is raised while a script runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown {category} block kind: {kind}")]
    UnknownKind { category: &'static str, kind: String },

    #[error("block {0} does not exist in this script")]
    MissingBlock(BlockId),

    #[error("block {0} is an event and can only be used as a script root")]
    EventNotRoot(BlockId),

    #[error("event blocks can only be added as script roots")]
    EventAsBlock,

    #[error("block {block} has no `{link}` slot")]
    NoSuchLink { block: BlockId, link: &'static str },
}
