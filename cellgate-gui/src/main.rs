//! Cellgate viewer entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod state;
mod ui;
mod util;
mod viewer;

use std::path::PathBuf;

use app::CellGateApp;
use clap::Parser;
use eframe::egui;

/// Manual marker gating viewer.
#[derive(Parser)]
#[command(name = "cellgate-gui", version, about)]
struct Args {
    /// Project file to open on start
    project: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Cellgate",
        opts,
        Box::new(move |cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            let mut app = CellGateApp::default();
            if let Some(path) = args.project {
                app.open_project(&path);
            }
            Ok(Box::new(app))
        }),
    )
}
