//! The growth engine: seeding and the per-generation stepping loop.
//!
//! A generation `g` is processed in three phases:
//! 1. [`GrowthEngine::plan`] decides, against the state as of `g - 1`,
//!    which candidates activate, which alive cells advance a step, and which
//!    leave the alive set.
//! 2. The commit applies every decision at once, so no decision taken for
//!    `g` observes another decision for `g`.
//! 3. Every written cell is recorded with the [`UpdateBatcher`], which is
//!    flushed whenever it is due and at the end of the requested range.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    batcher::UpdateBatcher,
    cell::Cell,
    config::Config,
    error::{ConfigError, GrowthError},
    graph::CellGraph,
    membership::IndexSet,
    palette::{LogisticPalette, StepPalette},
    protocol::{GenerateRange, InitialCellData, UpdateBatch},
    types::{CellId, Generation, MediumId},
};

/// Owns every [`Cell`] plus the alive and candidate index sets.
pub struct GrowthEngine {
    cfg: Config,
    cells: Vec<Cell>,
    alive: IndexSet,
    candidates: IndexSet,
    palette: Box<dyn StepPalette>,
    last_generation: Option<Generation>,
}

/// Outcome of one [`GrowthEngine::generate`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReport {
    pub generations_run: u32,
    pub last_generation: Option<Generation>,
    pub cancelled: bool,
    /// Local-cell write failures. They never abort the range.
    pub errors: Vec<GrowthError>,
}

/// Seed placed by [`GrowthEngine::seed_banded`] for one medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSeed {
    pub medium: MediumId,
    pub origin: CellId,
    pub generation: Generation,
}

/// Decisions for one generation, taken before any write.
#[derive(Debug, Default)]
struct StepPlan {
    activate: Vec<CellId>,
    advance: Vec<(CellId, usize)>,
    retire: Vec<CellId>,
}

impl GrowthEngine {
    pub fn new(graph: CellGraph, cfg: Config) -> Result<Self, ConfigError> {
        Self::with_palette(graph, cfg, Box::new(LogisticPalette::default()))
    }

    pub fn with_palette(
        graph: CellGraph,
        cfg: Config,
        palette: Box<dyn StepPalette>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let cells: Vec<Cell> = graph
            .into_specs()
            .into_iter()
            .map(|spec| Cell::new(spec, cfg.lifetime))
            .collect();
        info!(
            "growth engine built: {} cells, threshold {}, lifetime {}",
            cells.len(),
            cfg.threshold,
            cfg.lifetime
        );
        Ok(Self {
            alive: IndexSet::with_capacity(cells.len()),
            candidates: IndexSet::with_capacity(cells.len()),
            cfg,
            cells,
            palette,
            last_generation: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn alive(&self) -> &IndexSet {
        &self.alive
    }

    pub fn candidates(&self) -> &IndexSet {
        &self.candidates
    }

    /// Last generation processed by [`GrowthEngine::generate`].
    pub fn last_generation(&self) -> Option<Generation> {
        self.last_generation
    }

    /// A batcher sized for this engine's cells and configured batch size.
    pub fn new_batcher(&self) -> UpdateBatcher {
        UpdateBatcher::new(self.cfg.batch_size, self.cells.len())
    }

    pub fn initial_cells_data(&self) -> Vec<InitialCellData> {
        self.cells.iter().map(Cell::initial_data).collect()
    }

    fn same_medium_neighbors(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        let cell = &self.cells[id];
        cell.neighbors
            .iter()
            .copied()
            .filter(move |&n| self.cells[n].medium == cell.medium)
    }

    fn alive_neighbor_count(&self, id: CellId, generation: Generation) -> usize {
        self.same_medium_neighbors(id)
            .filter(|&n| self.cells[n].is_alive(generation))
            .count()
    }

    fn write(&mut self, id: CellId, step: usize, generation: Generation) -> Result<(), GrowthError> {
        let palette = self.palette.as_ref();
        self.cells[id].activate_step(step, generation, palette)
    }

    /// Adds the never-activated same-medium neighbors of `id` to the
    /// candidate set.
    fn extend_frontier(&mut self, id: CellId) {
        let fresh: Vec<CellId> = self
            .same_medium_neighbors(id)
            .filter(|&n| !self.cells[n].has_activated())
            .collect();
        for n in fresh {
            self.candidates.insert(n);
        }
    }

    /// Seeds a colony at `origin`.
    ///
    /// The origin and its never-activated same-medium neighbors (the
    /// founding cells) all fill slot 0 with `generation` and join the alive
    /// set. Their dormant same-medium neighbors become candidates.
    ///
    /// ### Returns
    /// The founding cells, origin first.
    ///
    /// ### Errors
    /// - [`GrowthError::IndexOutOfRange`] if `origin` does not exist.
    /// - [`GrowthError::OutOfOrderWrite`] if `origin` has already activated.
    /// - [`GrowthError::GenerationReplayed`] if `generation` already ran; the
    ///   founders would be retired before they could grow.
    pub fn seed_single(
        &mut self,
        origin: CellId,
        generation: Generation,
        batcher: &mut UpdateBatcher,
    ) -> Result<Vec<CellId>, GrowthError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get(origin)
            .ok_or(GrowthError::IndexOutOfRange { index: origin, len })?;
        if cell.has_activated() {
            return Err(GrowthError::OutOfOrderWrite {
                cell: origin,
                step: 0,
                filled: cell.state().len(),
            });
        }
        if let Some(last) = self.last_generation
            && generation <= last
        {
            return Err(GrowthError::GenerationReplayed {
                start: generation,
                last,
            });
        }

        let mut founders = vec![origin];
        founders.extend(
            self.same_medium_neighbors(origin)
                .filter(|&n| !self.cells[n].has_activated()),
        );

        for &id in &founders {
            self.write(id, 0, generation)?;
            self.candidates.remove(id);
            self.alive.insert(id);
            batcher.record(id);
        }
        for &id in &founders {
            self.extend_frontier(id);
        }

        info!(
            "seeded cell {origin} (medium {}) at generation {generation} with {} founding cells",
            self.cells[origin].medium,
            founders.len()
        );
        Ok(founders)
    }

    /// Seeds every medium at its topmost cell, staggering start generations
    /// by vertical position: `floor(min_y / damp_factor) + band_offset`.
    ///
    /// The topmost cell is the one with the smallest bounding-box `min.y`;
    /// ties go to the lower index. Mediums whose topmost cell has already
    /// activated, or whose start generation already ran, are skipped.
    ///
    /// Every band's generation is computed before any cell is written, so a
    /// [`GrowthError::GenerationOverflow`] leaves the engine untouched.
    pub fn seed_banded(
        &mut self,
        damp_factor: f32,
        batcher: &mut UpdateBatcher,
    ) -> Result<Vec<BandSeed>, GrowthError> {
        if !(damp_factor.is_finite() && damp_factor > 0.0) {
            return Err(GrowthError::InvalidDampFactor(damp_factor));
        }

        let mut topmost: BTreeMap<MediumId, CellId> = BTreeMap::new();
        for cell in &self.cells {
            topmost
                .entry(cell.medium)
                .and_modify(|best| {
                    if cell.bbox.min.y < self.cells[*best].bbox.min.y {
                        *best = cell.index;
                    }
                })
                .or_insert(cell.index);
        }

        let offset = self.cfg.band_offset;
        let mut seeds = Vec::with_capacity(topmost.len());
        for (medium, origin) in topmost {
            if self.cells[origin].has_activated() {
                warn!("medium {medium}: topmost cell {origin} already active; band not seeded");
                continue;
            }
            // `as` saturates, so only the offset can overflow.
            let base = (self.cells[origin].bbox.min.y / damp_factor).floor() as Generation;
            let generation = base
                .checked_add(offset)
                .ok_or(GrowthError::GenerationOverflow { base, offset })?;
            if let Some(last) = self.last_generation
                && generation <= last
            {
                warn!("medium {medium}: band start {generation} already ran (last {last}); band not seeded");
                continue;
            }
            seeds.push(BandSeed {
                medium,
                origin,
                generation,
            });
        }

        for seed in &seeds {
            self.seed_single(seed.origin, seed.generation, batcher)?;
        }
        Ok(seeds)
    }

    /// Decides every transition for `generation` from the state as of
    /// `generation - 1`.
    ///
    /// Alive cells that are neither alive nor dormant at `generation - 1`
    /// missed their slot (the driver skipped generations) and are retired.
    /// Cells that are still dormant there, i.e. banded seeds whose start
    /// lies ahead, are left alone.
    fn plan(&self, generation: Generation) -> StepPlan {
        let mut plan = StepPlan::default();
        let Some(prev) = generation.checked_sub(1) else {
            return plan;
        };

        for id in self.candidates.iter() {
            if !self.cells[id].has_activated()
                && self.alive_neighbor_count(id, prev) >= self.cfg.threshold
            {
                plan.activate.push(id);
            }
        }

        for id in self.alive.iter() {
            let cell = &self.cells[id];
            if cell.is_alive(prev) {
                match cell.furthest_step() {
                    Some(step) if step + 1 < self.cfg.lifetime => plan.advance.push((id, step + 1)),
                    _ => plan.retire.push(id),
                }
            } else if cell.is_dead(prev) {
                debug!("cell {id} stalled at generation {prev}; retiring");
                plan.retire.push(id);
            }
        }

        plan
    }

    /// Applies one generation and records every written cell.
    fn step(&mut self, generation: Generation, batcher: &mut UpdateBatcher) -> Vec<GrowthError> {
        let plan = self.plan(generation);
        let mut errors = Vec::new();
        let mut activated = Vec::with_capacity(plan.activate.len());

        for id in plan.activate {
            match self.write(id, 0, generation) {
                Ok(()) => {
                    self.candidates.remove(id);
                    self.alive.insert(id);
                    batcher.record(id);
                    activated.push(id);
                }
                Err(err) => errors.push(err),
            }
        }

        for (id, step) in plan.advance {
            match self.write(id, step, generation) {
                Ok(()) => batcher.record(id),
                Err(err) => errors.push(err),
            }
        }

        for id in plan.retire {
            self.alive.remove(id);
        }

        for id in activated {
            self.extend_frontier(id);
        }

        errors
    }

    /// Advances the simulation over `range`.
    ///
    /// ### Parameters
    /// - `range` - Generations `start_gen .. start_gen + num_gens`.
    /// - `batcher` - Receives every written cell; flushed into `emit` when
    ///   due and once more at the end of the range.
    /// - `emit` - Consumer of flushed batches.
    /// - `should_stop` - Checked before every generation; returning `true`
    ///   ends the range early and marks the report as cancelled.
    ///
    /// ### Errors
    /// - [`GrowthError::GenerationReplayed`] if `range` starts at or before a
    ///   generation that already ran.
    /// - [`GrowthError::GenerationOverflow`] if `start_gen - 1` or the last
    ///   generation of `range` does not fit in a [`Generation`].
    ///
    /// Nothing runs in either case. Cell write failures are collected in the
    /// report instead.
    pub fn generate(
        &mut self,
        range: GenerateRange,
        batcher: &mut UpdateBatcher,
        mut emit: impl FnMut(UpdateBatch),
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<GenerateReport, GrowthError> {
        if let Some(last) = self.last_generation
            && range.start_gen <= last
        {
            return Err(GrowthError::GenerationReplayed {
                start: range.start_gen,
                last,
            });
        }
        let overflow = |offset: i64| GrowthError::GenerationOverflow {
            base: range.start_gen,
            offset,
        };
        range.start_gen.checked_sub(1).ok_or_else(|| overflow(-1))?;
        if range.num_gens > 0 {
            let span = i64::from(range.num_gens) - 1;
            range
                .start_gen
                .checked_add(span)
                .ok_or_else(|| overflow(span))?;
        }

        let mut report = GenerateReport::default();
        for offset in 0..range.num_gens {
            if should_stop() {
                report.cancelled = true;
                break;
            }
            let generation = range.start_gen + Generation::from(offset);
            let errors = self.step(generation, batcher);
            for err in &errors {
                warn!("generation {generation}: {err}");
            }
            report.errors.extend(errors);
            report.generations_run += 1;
            report.last_generation = Some(generation);
            self.last_generation = Some(generation);

            if batcher.is_due()
                && let Some(batch) = batcher.flush(generation, &self.cells)
            {
                debug!(
                    "flushing {} cells at generation {generation}",
                    batch.batch_updates.len()
                );
                emit(batch);
            }
        }

        if let Some(generation) = report.last_generation
            && let Some(batch) = batcher.flush(generation, &self.cells)
        {
            debug!(
                "flushing {} cells at end of range, generation {generation}",
                batch.batch_updates.len()
            );
            emit(batch);
        }

        Ok(report)
    }
}
