//! Gate plot window: marker scatter and intensity histogram.

use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Plot, PlotUi, Points, VLine};

use super::theme::accent;
use crate::app::CellGateApp;
use crate::util::u64_to_f64;

/// Draws the slider gate and, when known, the stored gate.
fn gate_lines(plot_ui: &mut PlotUi, current: f64, saved: Option<f64>) {
    plot_ui.vline(
        VLine::new(current)
            .color(accent::RED)
            .width(2.0)
            .name(format!("Gate {current:.2}")),
    );
    if let Some(saved) = saved {
        plot_ui.vline(
            VLine::new(saved)
                .color(accent::GREEN)
                .width(1.5)
                .style(egui_plot::LineStyle::dashed_dense())
                .name(format!("Saved {saved:.2}")),
        );
    }
}

impl CellGateApp {
    /// Render the gate plot window (if visible).
    pub(crate) fn render_plot_window(&mut self, ctx: &egui::Context) {
        if !self.ui_state.show_plot {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        let current = session.current_gate();
        let marker = session.active_marker().unwrap_or_default().to_string();
        let y_axis = session.y_axis().unwrap_or_default().to_string();
        let saved = self.saved_gate;

        let mut open = self.ui_state.show_plot;
        egui::Window::new("Gate plot")
            .open(&mut open)
            .default_size([520.0, 560.0])
            .show(ctx, |ui| {
                Plot::new("scatter")
                    .height(260.0)
                    .x_axis_label(marker.clone())
                    .y_axis_label(y_axis.clone())
                    .legend(Legend::default())
                    .show(ui, |plot_ui| {
                        plot_ui.points(
                            Points::new(self.plot.scatter.clone())
                                .radius(1.5)
                                .color(accent::BLUE)
                                .name("Cells"),
                        );
                        gate_lines(plot_ui, current, saved);
                    });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.ui_state.log_histogram, "Log scale");
                    ui.label("Bins");
                    if ui
                        .add(egui::DragValue::new(&mut self.ui_state.n_bins).range(5..=500))
                        .changed()
                    {
                        if let Some(session) = &self.session {
                            self.plot.histogram = session.histogram(self.ui_state.n_bins).ok();
                        }
                    }
                });

                let log = self.ui_state.log_histogram;
                Plot::new("histogram")
                    .height(220.0)
                    .x_axis_label(marker.clone())
                    .y_axis_label(if log { "Log10(Cells + 1)" } else { "Cells" })
                    .include_y(0.0)
                    .show(ui, |plot_ui| {
                        if let Some(hist) = &self.plot.histogram {
                            let heights = if log {
                                hist.log_counts()
                            } else {
                                hist.counts().iter().map(|&c| u64_to_f64(c)).collect()
                            };
                            let bars: Vec<Bar> = hist
                                .bin_centers()
                                .into_iter()
                                .zip(heights)
                                .map(|(x, y)| {
                                    Bar::new(x, y)
                                        .width(hist.bin_width())
                                        .fill(accent::BLUE)
                                })
                                .collect();
                            plot_ui.bar_chart(BarChart::new(bars).name("Cells"));
                        }
                        gate_lines(plot_ui, current, saved);
                    });
            });
        self.ui_state.show_plot = open;
    }
}
