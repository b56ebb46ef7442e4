//! Error types for every layer of the simulation.
//!
//! Graph and config errors are fatal to a run. Growth errors are local to one
//! cell or one command. Protocol errors drop a single message.

use thiserror::Error;

use crate::types::{CellId, Generation};

/// Failures while writing cell state or seeding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrowthError {
    #[error("cell {cell}: step {step} written out of order ({filled} slots filled)")]
    OutOfOrderWrite {
        cell: CellId,
        step: usize,
        filled: usize,
    },
    #[error("cell {cell}: step {step} exceeds lifetime {lifetime}")]
    StepBeyondLifetime {
        cell: CellId,
        step: usize,
        lifetime: usize,
    },
    #[error("cell {cell}: generation {generation} for step {step} precedes previous step at {previous}")]
    GenerationRegressed {
        cell: CellId,
        step: usize,
        generation: Generation,
        previous: Generation,
    },
    #[error("cell index {index} out of range ({len} cells)")]
    IndexOutOfRange { index: CellId, len: usize },
    #[error("damp factor must be positive and finite, got {0}")]
    InvalidDampFactor(f32),
    #[error("generation {start} was requested, but generations up to {last} already ran")]
    GenerationReplayed { start: Generation, last: Generation },
    #[error("generation {base} offset by {offset} is out of range")]
    GenerationOverflow { base: Generation, offset: i64 },
}

/// Failures while validating the tessellation graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cell {cell} lists neighbor {neighbor}, but only {len} cells exist")]
    IndexOutOfRange {
        cell: CellId,
        neighbor: CellId,
        len: usize,
    },
    #[error("no cell was added with index {index}")]
    MissingCell { index: CellId },
    #[error("cell index {index} was added more than once")]
    DuplicateCell { index: CellId },
    #[error("cell {cell} lists itself as a neighbor")]
    SelfNeighbor { cell: CellId },
    #[error("cell {a} lists {b} as a neighbor but not the other way around")]
    AsymmetricAdjacency { a: CellId, b: CellId },
    #[error("the cell graph is already built; no more cells can be added")]
    Frozen,
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("threshold must be at least 1")]
    ZeroThreshold,
    #[error("lifetime must be at least 1")]
    ZeroLifetime,
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),
    #[error("could not parse config: {0}")]
    Parse(String),
}

/// Rejected wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message has no string `type` field")]
    MissingType,
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Failures at the driver side of a [`crate::channel::SimulationChannel`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn growth worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("growth worker has shut down")]
    Disconnected,
    #[error("command queue is full; retry later")]
    QueueFull,
}
