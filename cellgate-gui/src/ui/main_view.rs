//! Main view (central panel) rendering.

use eframe::egui;
use egui_plot::{Legend, Plot, PlotImage, PlotPoint, Points};

use crate::app::CellGateApp;
use crate::util::{image_to_plot, plot_to_pixel, usize_to_f64};

impl CellGateApp {
    /// Render the central panel with the composite image and cell points.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn render_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (Some(tex), Some((rows, cols))) = (&self.texture, self.image_dim()) else {
                ui.centered_and_justified(|ui| ui.label("No image"));
                return;
            };
            let (w, h) = (usize_to_f64(cols), usize_to_f64(rows));
            let title = [&self.marker_layer, &self.reference_layer]
                .into_iter()
                .flatten()
                .map(|l| l.name.as_str())
                .collect::<Vec<_>>()
                .join(" + ");

            let mut hovered = None;
            Plot::new("image")
                .data_aspect(1.0)
                .show_grid(false)
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    plot_ui.image(
                        PlotImage::new(tex, PlotPoint::new(w / 2.0, h / 2.0), [w as f32, h as f32])
                            .name(title),
                    );

                    if let Some(layer) = &self.points {
                        let points: Vec<[f64; 2]> = layer
                            .points
                            .iter()
                            .map(|p| image_to_plot(p.y, p.x, rows))
                            .collect();
                        plot_ui.points(
                            Points::new(points)
                                .radius(2.5)
                                .color(egui::Color32::YELLOW)
                                .name(&layer.name),
                        );
                    }

                    hovered = plot_ui
                        .pointer_coordinate()
                        .and_then(|p| plot_to_pixel(p.x, p.y, rows, cols));
                });

            self.cursor_info = hovered.map(|(row, col)| {
                let value = self
                    .marker_layer
                    .as_ref()
                    .map_or(f32::NAN, |l| l.plane[[row, col]]);
                let label = self
                    .mask
                    .as_ref()
                    .filter(|m| m.dim() == (rows, cols))
                    .map_or(0, |m| m[[row, col]]);
                (row, col, value, label)
            });
        });
    }
}
