//! Application entry point for the colony growth viewer.
//!
//! This binary sets up logging and eframe/egui, and delegates all
//! interactive logic and rendering to [`Viewer`] from the `viewer` module.

mod mesh;
mod viewer;

use viewer::Viewer;

/// Starts the native eframe application.
///
/// Logging goes through `env_logger`; set `RUST_LOG=debug` to trace the
/// worker's commands and flushes.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if the simulation worker or the native window cannot start.
fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Colony Growth",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new()?))),
    )
}
