//! Core colony growth simulation library.
//!
//! Main components:
//! - [`graph`]: validated tessellation input (cells, polygons, adjacency).
//! - [`cell`]: per-cell append-only lifetime state.
//! - [`membership`]: bitset index sets for alive/candidate bookkeeping.
//! - [`engine`]: seeding and the generation stepping loop.
//! - [`batcher`]: bounded batching of mutated cells.
//! - [`protocol`]: command/response types and the JSON wire codec.
//! - [`channel`]: the worker thread that owns an engine.
//! - [`config`]: global configuration for the growth rule and queues.
//! - [`palette`]: step-to-color mapping.
//! - [`geometry`], [`types`], [`error`]: shared types.

pub mod batcher;
pub mod cell;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod membership;
pub mod palette;
pub mod protocol;
pub mod types;
