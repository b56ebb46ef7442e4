//! Interactive colony growth viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns a [`SimulationChannel`] plus a
//! local mirror of every cell, and implements [`eframe::App`] to render and
//! control the simulation through an egui UI.

use std::ops::RangeInclusive;

use colony_core::{
    channel::SimulationChannel,
    config::Config,
    error::ChannelError,
    graph::CellSpec,
    protocol::{BandedSeed, Command, GenerateRange, Response, SingleSeed, UpdateBatch},
    types::{Generation, MediumId, Rgba},
};
use eframe::App;
use glam::Vec2;
use log::{info, warn};
use rand::rng;

use crate::mesh::{MeshParams, hex_mesh};

/// How a fresh simulation is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// One colony at the middle of the mesh, at generation 0.
    Center,
    /// One colony per band, started later the lower the band sits.
    Banded,
}

/// Local copy of one cell: geometry from the mesh, state from the worker.
#[derive(Debug, Clone)]
struct CellView {
    polygon: Vec<Vec2>,
    medium: MediumId,
    state: Vec<Generation>,
    colors: Vec<Rgba>,
}

impl CellView {
    fn from_spec(spec: &CellSpec) -> Self {
        Self {
            polygon: spec.polygon_points(),
            medium: spec.medium,
            state: Vec::new(),
            colors: Vec::new(),
        }
    }
}

/// What the viewer is waiting on from the worker.
///
/// Every request ends with a `getInitialCellsData`, whose answer marks it as
/// done.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Idle,
    Seeding,
    Generating {
        range: GenerateRange,
        /// Set once a `cancelled` response arrives for `range`.
        cancelled: Option<Option<Generation>>,
    },
}

/// Main application state for the interactive viewer.
///
/// The typical per-frame update is:
/// 1. Drain worker responses into the cell mirror.
/// 2. Handle UI interactions / input.
/// 3. If `running` is `true`, nothing is pending and enough time has
///    passed, queue the next range with [`Viewer::request_generate`].
/// 4. Paint every cell polygon in its latest color.
///
/// ### Fields
/// - `sim` - Handle to the worker that owns the growth engine.
/// - `cfg` - Configuration used for the next reset.
/// - `mesh` - Mesh parameters used for the next reset.
/// - `cells` - Mirror of the worker's cells, indexed by cell id.
/// - `processed` - Last generation the worker is known to have run.
/// - `pending` - Outstanding request, if any.
///
/// - `running` - Whether the simulation is currently auto-advancing.
/// - `zoom` - Zoom factor for world-to-screen coordinate mapping.
/// - `pan` - Screen-space pan offset in pixels.
/// - `focus` - World point drawn at the center of the view when unpanned.
pub struct Viewer {
    sim: SimulationChannel,
    cfg: Config,
    mesh: MeshParams,
    seed_mode: SeedMode,
    damp_factor: f32,
    gens_per_frame: u32,

    cells: Vec<CellView>,
    processed: Option<Generation>,
    latest_batch: Option<Generation>,
    pending: Pending,
    last_error: Option<String>,

    rng: rand::rngs::ThreadRng,

    running: bool,
    zoom: f32,
    pan: egui::Vec2,
    focus: Vec2,

    step_interval: f64,
    last_step_time: f64,
}

impl Viewer {
    /// Creates a viewer over the default mesh, seeded in bands.
    pub fn new() -> Result<Self, ChannelError> {
        Self::with_setup(Config::default(), MeshParams::default(), SeedMode::Banded)
    }

    /// Spawns a worker, streams a fresh mesh into it and seeds it.
    ///
    /// ### Errors
    /// [`ChannelError`] if `cfg` is invalid or the worker cannot start.
    pub fn with_setup(
        cfg: Config,
        mesh: MeshParams,
        seed_mode: SeedMode,
    ) -> Result<Self, ChannelError> {
        let mut viewer = Self {
            sim: SimulationChannel::spawn(cfg)?,
            cfg,
            mesh,
            seed_mode,
            damp_factor: 20.0,
            gens_per_frame: 1,
            cells: Vec::new(),
            processed: None,
            latest_batch: None,
            pending: Pending::Idle,
            last_error: None,
            rng: rng(),
            running: false,
            zoom: 1.5,
            pan: egui::vec2(0.0, 0.0),
            focus: mesh.extent_center(),
            step_interval: 0.05,
            last_step_time: 0.0,
        };
        viewer.populate()?;
        Ok(viewer)
    }

    /// Sends the mesh and seed commands to the current worker.
    fn populate(&mut self) -> Result<(), ChannelError> {
        let specs = hex_mesh(&self.mesh, &mut self.rng);
        self.cells = specs.iter().map(CellView::from_spec).collect();
        info!("streaming {} mesh cells", specs.len());
        for spec in specs {
            self.sim.send(Command::AddCell(spec))?;
        }

        let seed = match self.seed_mode {
            SeedMode::Center => Command::InitCell(SingleSeed {
                start_index: self.mesh.center_index(),
            }),
            SeedMode::Banded => Command::InitCells(BandedSeed {
                damp_factor: self.damp_factor,
            }),
        };
        self.sim.send(seed)?;
        self.sim.send(Command::GetInitialCellsData)?;
        self.pending = Pending::Seeding;
        Ok(())
    }

    /// Replaces the worker with a fresh one using the current `cfg` and
    /// `mesh`, keeping camera settings.
    fn reset(&mut self) {
        self.sim.cancel();
        match SimulationChannel::spawn(self.cfg) {
            // The old worker is joined when its handle is dropped here.
            Ok(sim) => self.sim = sim,
            Err(err) => {
                warn!("reset failed: {err}");
                self.last_error = Some(err.to_string());
                return;
            }
        }
        self.processed = None;
        self.latest_batch = None;
        self.last_error = None;
        self.running = false;
        self.focus = self.mesh.extent_center();
        if let Err(err) = self.populate() {
            self.last_error = Some(err.to_string());
        }
    }

    /// First generation of the next range.
    ///
    /// Before any range has run, this is one past the earliest seed so no
    /// founding cell misses its first step.
    fn next_start(&self) -> Generation {
        match self.processed {
            Some(g) => g + 1,
            None => self
                .cells
                .iter()
                .filter_map(|c| c.state.first().copied())
                .min()
                .map_or(1, |g| g + 1),
        }
    }

    /// Queues the next `gens_per_frame` generations unless a request is
    /// still outstanding.
    fn request_generate(&mut self) {
        if self.pending != Pending::Idle {
            return;
        }
        let range = GenerateRange {
            start_gen: self.next_start(),
            num_gens: self.gens_per_frame,
        };
        match self.sim.try_send(Command::Generate(range)) {
            Ok(()) => {}
            Err(ChannelError::QueueFull) => return,
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.running = false;
                return;
            }
        }
        self.pending = Pending::Generating {
            range,
            cancelled: None,
        };
        if let Err(err) = self.sim.send(Command::GetInitialCellsData) {
            self.last_error = Some(err.to_string());
            self.running = false;
        }
    }

    /// Stops the running range and every queued one.
    fn cancel(&mut self) {
        self.sim.cancel();
        self.running = false;
    }

    fn apply_update(&mut self, batch: UpdateBatch) {
        for snap in batch.batch_updates {
            if let Some(cell) = self.cells.get_mut(snap.index) {
                cell.state = snap.state;
                cell.colors = snap.colors;
            }
        }
        self.latest_batch = Some(batch.generation);
    }

    fn handle_response(&mut self, response: Response) {
        match response {
            Response::UpdateCells(batch) => self.apply_update(batch),
            Response::SetInitialCellsData(data) => {
                for d in data {
                    if let Some(cell) = self.cells.get_mut(d.index) {
                        cell.state = d.state;
                        cell.colors = d.colors;
                    }
                }
                self.finish_pending();
            }
            Response::Cancelled { generation } => {
                info!("range cancelled at {generation:?}");
                if let Pending::Generating { cancelled, .. } = &mut self.pending {
                    *cancelled = Some(generation);
                }
            }
            Response::Error(message) => {
                warn!("worker error: {message}");
                self.last_error = Some(message);
            }
        }
    }

    fn finish_pending(&mut self) {
        if let Pending::Generating { range, cancelled } = self.pending {
            self.processed = match cancelled {
                Some(stopped) => stopped.or(self.processed),
                None => Some(range.start_gen + Generation::from(range.num_gens) - 1),
            };
        }
        self.pending = Pending::Idle;
    }

    fn drain_responses(&mut self) {
        for response in self.sim.drain() {
            self.handle_response(response);
        }
    }

    fn cell_color(&self, cell: &CellView) -> egui::Color32 {
        const BACKGROUND: [[u8; 3]; 4] = [[24, 26, 34], [34, 28, 30], [26, 34, 30], [32, 32, 24]];
        match cell.colors.last() {
            Some(&[r, g, b, a]) => egui::Color32::from_rgba_unmultiplied(r, g, b, a),
            None => {
                let [r, g, b] = BACKGROUND[cell.medium as usize % BACKGROUND.len()];
                egui::Color32::from_rgb(r, g, b)
            }
        }
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World coordinates are taken relative to `focus`, scaled by `zoom`,
    /// offset by `pan`, and then centered inside the given `rect`. The mesh
    /// already uses screen orientation, so `y` is not flipped.
    ///
    /// ### Parameters
    /// - `p` - World-space position.
    /// - `rect` - Screen-space rectangle representing the drawing area.
    ///
    /// ### Returns
    /// The corresponding egui position in screen-space.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        let d = p - self.focus;
        egui::pos2(
            center.x + d.x * self.zoom + self.pan.x,
            center.y + d.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`] (up to floating point
    /// rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (p.y - center.y - self.pan.y) / self.zoom;
        self.focus + Vec2::new(x, y)
    }

    /// Helper to draw a labeled numeric [`egui::DragValue`].
    fn labeled_drag<N: egui::emath::Numeric>(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut N,
        range: RangeInclusive<N>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Builds the top panel UI (run controls, stepping, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                ui.add(
                    egui::DragValue::new(&mut self.step_interval)
                        .prefix("dt target = ")
                        .range(0.0..=1.0)
                        .speed(0.01),
                );

                if ui.button("Step").clicked() {
                    self.request_generate();
                }

                if ui.button("Cancel").clicked() {
                    self.cancel();
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.1..=10.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (generation, activated cells, errors).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match self.processed {
                    Some(g) => ui.label(format!("gen = {g}")),
                    None => ui.label("gen = -"),
                };
                if let Some(g) = self.latest_batch {
                    ui.label(format!("last batch = {g}"));
                }
                ui.separator();
                ui.label(format!(
                    "activated = {} / {}",
                    self.cells.iter().filter(|c| !c.state.is_empty()).count(),
                    self.cells.len()
                ));
                if self.pending != Pending::Idle {
                    ui.spinner();
                }
                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    /// Builds the right-hand configuration panel. Changes apply on reset.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                ui.label("Growth rule");
                Self::labeled_drag(ui, "threshold:", &mut self.cfg.threshold, 1..=6, 0.05);
                Self::labeled_drag(ui, "lifetime:", &mut self.cfg.lifetime, 1..=256, 0.5);
                Self::labeled_drag(ui, "batch_size:", &mut self.cfg.batch_size, 1..=10_000, 10.0);

                ui.separator();
                ui.label("Seeding");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.seed_mode, SeedMode::Banded, "Banded");
                    ui.radio_value(&mut self.seed_mode, SeedMode::Center, "Center");
                });
                Self::labeled_drag(ui, "damp_factor:", &mut self.damp_factor, 0.1..=500.0, 0.5);
                Self::labeled_drag(ui, "band_offset:", &mut self.cfg.band_offset, -100..=100, 0.2);

                ui.separator();
                ui.label("Mesh");
                Self::labeled_drag(ui, "cols:", &mut self.mesh.cols, 2..=200, 0.5);
                Self::labeled_drag(ui, "rows:", &mut self.mesh.rows, 2..=200, 0.5);
                Self::labeled_drag(ui, "radius:", &mut self.mesh.radius, 2.0..=32.0, 0.1);
                let max_jitter = self.mesh.radius * 0.5;
                Self::labeled_drag(ui, "jitter:", &mut self.mesh.jitter, 0.0..=max_jitter, 0.05);
                Self::labeled_drag(ui, "bands:", &mut self.mesh.bands, 1..=8, 0.05);

                ui.separator();
                ui.label("Playback");
                Self::labeled_drag(ui, "gens per step:", &mut self.gens_per_frame, 1..=64, 0.1);

                ui.separator();
                if ui.button("Apply and reset").clicked() {
                    self.reset();
                }
                if ui.button("Reset cfg to default").clicked() {
                    self.cfg = Config::default();
                    self.mesh = MeshParams::default();
                }
            });
    }

    /// Builds the central panel where the mesh is drawn and navigated.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.1, 10.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            let outline = egui::Stroke::new(0.5, egui::Color32::from_black_alpha(96));
            for cell in &self.cells {
                if cell.polygon.len() < 3 {
                    continue;
                }
                let points: Vec<egui::Pos2> = cell
                    .polygon
                    .iter()
                    .map(|&p| self.world_to_screen(p, rect))
                    .collect();
                painter.add(egui::Shape::convex_polygon(
                    points,
                    self.cell_color(cell),
                    outline,
                ));
            }

            // Auto-run simulation if requested.
            if self.running {
                let now = ctx.input(|i| i.time);
                if now - self.last_step_time >= self.step_interval {
                    self.request_generate();
                    self.last_step_time = now;
                }
            }

            if self.running || self.pending != Pending::Idle {
                ctx.request_repaint();
            }
        });
    }
}

impl App for Viewer {
    /// eframe callback that applies worker output, then builds all panels.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_responses();
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
