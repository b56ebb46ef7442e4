#![allow(dead_code)]

use colony_core::{
    graph::{CellGraph, CellSpec},
    types::{CellId, MediumId},
};

/// A `w x h` grid with 4-neighborhood adjacency. Rows are split into
/// `bands` horizontal media, top rows first.
pub fn grid_specs(w: usize, h: usize, bands: usize) -> Vec<CellSpec> {
    let bands = bands.clamp(1, h);
    let mut specs = Vec::with_capacity(w * h);
    for row in 0..h {
        for col in 0..w {
            let index = row * w + col;
            let mut neighbors = Vec::with_capacity(4);
            if col > 0 {
                neighbors.push(index - 1);
            }
            if col + 1 < w {
                neighbors.push(index + 1);
            }
            if row > 0 {
                neighbors.push(index - w);
            }
            if row + 1 < h {
                neighbors.push(index + w);
            }
            let (x, y) = (col as f32 * 10.0, row as f32 * 10.0);
            specs.push(CellSpec {
                x,
                y,
                index,
                polygon: vec![
                    [x - 5.0, y - 5.0],
                    [x + 5.0, y - 5.0],
                    [x + 5.0, y + 5.0],
                    [x - 5.0, y + 5.0],
                ],
                neighbors,
                medium: (row * bands / h) as MediumId,
            });
        }
    }
    specs
}

pub fn grid(w: usize, h: usize, bands: usize) -> CellGraph {
    CellGraph::from_specs(grid_specs(w, h, bands)).expect("grid is a valid graph")
}

/// Center 0 surrounded by ring cells 1..=6.
pub fn ring_specs() -> Vec<CellSpec> {
    let adj: [&[CellId]; 7] = [
        &[1, 2, 3, 4, 5, 6],
        &[0, 6, 2],
        &[0, 1, 3],
        &[0, 2, 4],
        &[0, 3, 5],
        &[0, 4, 6],
        &[0, 5, 1],
    ];
    adj.iter()
        .enumerate()
        .map(|(index, neighbors)| CellSpec {
            x: index as f32,
            y: 0.0,
            index,
            polygon: Vec::new(),
            neighbors: neighbors.to_vec(),
            medium: 0,
        })
        .collect()
}
