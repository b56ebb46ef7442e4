//! Validated tessellation input.
//!
//! Cells arrive one [`CellSpec`] at a time, possibly out of order. A
//! [`CellGraph`] is only produced once every index is present, every neighbor
//! reference is in range, and adjacency is symmetric.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    error::GraphError,
    types::{CellId, MediumId},
};

/// One cell of the precomputed mesh, as sent by the driver (`addCell`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    pub x: f32,
    pub y: f32,
    pub index: CellId,
    #[serde(default)]
    pub polygon: Vec<[f32; 2]>,
    pub neighbors: Vec<CellId>,
    #[serde(default)]
    pub medium: MediumId,
}

impl CellSpec {
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn polygon_points(&self) -> Vec<Vec2> {
        self.polygon.iter().map(|&p| Vec2::from_array(p)).collect()
    }
}

/// A complete, validated neighbor graph with specs stored at their index.
#[derive(Clone, Debug, Default)]
pub struct CellGraph {
    specs: Vec<CellSpec>,
}

impl CellGraph {
    /// Sorts `specs` by index and validates the result.
    ///
    /// ### Errors
    /// - [`GraphError::DuplicateCell`] / [`GraphError::MissingCell`] if the
    ///   indices are not exactly `0..len`.
    /// - [`GraphError::IndexOutOfRange`] for a neighbor that does not exist.
    /// - [`GraphError::SelfNeighbor`] / [`GraphError::AsymmetricAdjacency`]
    ///   for malformed adjacency.
    pub fn from_specs(mut specs: Vec<CellSpec>) -> Result<Self, GraphError> {
        specs.sort_by_key(|s| s.index);

        for (pos, spec) in specs.iter().enumerate() {
            if spec.index < pos {
                return Err(GraphError::DuplicateCell { index: spec.index });
            }
            if spec.index > pos {
                return Err(GraphError::MissingCell { index: pos });
            }
        }

        // Repeated neighbor entries would be counted twice by the threshold rule.
        for spec in &mut specs {
            let mut seen = HashSet::with_capacity(spec.neighbors.len());
            spec.neighbors.retain(|&n| seen.insert(n));
        }

        let len = specs.len();
        let mut edges = HashSet::with_capacity(len * 6);
        for spec in &specs {
            for &n in &spec.neighbors {
                if n >= len {
                    return Err(GraphError::IndexOutOfRange {
                        cell: spec.index,
                        neighbor: n,
                        len,
                    });
                }
                if n == spec.index {
                    return Err(GraphError::SelfNeighbor { cell: spec.index });
                }
                edges.insert((spec.index, n));
            }
        }
        for &(a, b) in &edges {
            if !edges.contains(&(b, a)) {
                return Err(GraphError::AsymmetricAdjacency { a, b });
            }
        }

        Ok(Self { specs })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[CellSpec] {
        &self.specs
    }

    pub fn into_specs(self) -> Vec<CellSpec> {
        self.specs
    }
}
