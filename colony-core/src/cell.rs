use glam::Vec2;

use crate::{
    error::GrowthError,
    geometry::BoundingBox,
    graph::CellSpec,
    palette::StepPalette,
    protocol::{CellSnapshot, InitialCellData},
    types::{CellId, Generation, MediumId, Rgba},
};

/// Per-mesh-node simulation state.
///
/// `state` holds the filled prefix of the cell's lifetime slots: `state[i]`
/// is the generation at which the cell reached lifetime step `i`. Slots are
/// only ever appended, so "slot `i` filled implies slot `i - 1` filled" holds
/// by construction.
#[derive(Debug, Clone)]
pub struct Cell {
    pub index: CellId,
    pub pos: Vec2,
    pub polygon: Vec<Vec2>,
    pub neighbors: Vec<CellId>,
    pub medium: MediumId,
    pub bbox: BoundingBox,
    lifetime: usize,
    state: Vec<Generation>,
    colors: Vec<Rgba>,
}

impl Cell {
    pub fn new(spec: CellSpec, lifetime: usize) -> Self {
        let pos = spec.position();
        let polygon = spec.polygon_points();
        let bbox = BoundingBox::from_polygon(&polygon, pos);
        Self {
            index: spec.index,
            pos,
            polygon,
            neighbors: spec.neighbors,
            medium: spec.medium,
            bbox,
            lifetime,
            state: Vec::with_capacity(lifetime),
            colors: Vec::with_capacity(lifetime),
        }
    }

    /// Fills slot `step` with `generation` and records its display color.
    ///
    /// ### Errors
    /// - [`GrowthError::StepBeyondLifetime`] if `step >= lifetime`.
    /// - [`GrowthError::OutOfOrderWrite`] if the previous slot is empty or
    ///   this slot is already filled.
    /// - [`GrowthError::GenerationRegressed`] if `generation` is earlier than
    ///   the previous slot's generation.
    pub fn activate_step(
        &mut self,
        step: usize,
        generation: Generation,
        palette: &dyn StepPalette,
    ) -> Result<(), GrowthError> {
        if step >= self.lifetime {
            return Err(GrowthError::StepBeyondLifetime {
                cell: self.index,
                step,
                lifetime: self.lifetime,
            });
        }
        if step != self.state.len() {
            return Err(GrowthError::OutOfOrderWrite {
                cell: self.index,
                step,
                filled: self.state.len(),
            });
        }
        if let Some(&previous) = self.state.last()
            && generation < previous
        {
            return Err(GrowthError::GenerationRegressed {
                cell: self.index,
                step,
                generation,
                previous,
            });
        }

        self.state.push(generation);
        self.colors.push(palette.color(step, self.lifetime));
        Ok(())
    }

    #[inline]
    pub fn is_alive(&self, generation: Generation) -> bool {
        self.state.contains(&generation)
    }

    #[inline]
    pub fn is_dead(&self, generation: Generation) -> bool {
        self.state.last().is_some_and(|&last| generation > last)
    }

    #[inline]
    pub fn is_dormant(&self, generation: Generation) -> bool {
        !self.is_alive(generation) && !self.is_dead(generation)
    }

    /// Whether slot 0 has ever been filled.
    #[inline]
    pub fn has_activated(&self) -> bool {
        !self.state.is_empty()
    }

    /// Index of the last filled slot.
    #[inline]
    pub fn furthest_step(&self) -> Option<usize> {
        self.state.len().checked_sub(1)
    }

    #[inline]
    pub fn latest_generation(&self) -> Option<Generation> {
        self.state.last().copied()
    }

    #[inline]
    pub fn slot(&self, step: usize) -> Option<Generation> {
        self.state.get(step).copied()
    }

    /// All slots have been filled.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.state.len() == self.lifetime
    }

    #[inline]
    pub fn lifetime(&self) -> usize {
        self.lifetime
    }

    pub fn state(&self) -> &[Generation] {
        &self.state
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            index: self.index,
            state: self.state.clone(),
            colors: self.colors.clone(),
            latest_generation: self.latest_generation(),
        }
    }

    pub fn initial_data(&self) -> InitialCellData {
        InitialCellData {
            index: self.index,
            bounding_box: self.bbox,
            medium: self.medium,
            state: self.state.clone(),
            colors: self.colors.clone(),
        }
    }
}
