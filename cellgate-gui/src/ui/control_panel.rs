//! Control panel (left sidebar) and top/bottom bars rendering.

use eframe::egui::{self, Color32, FontFamily, FontId, Stroke};
use rfd::FileDialog;

use super::theme::{accent, form_label, primary_button, stat_label, stat_value, ThemeColors};
use crate::app::CellGateApp;
use crate::state::StatusKind;
use crate::util::format_number;
use crate::viewer::Colormap;
use cellgate_core::GateEvent;

/// Snapshot of the session values the side panel shows.
struct Selection {
    samples: Vec<String>,
    markers: Vec<String>,
    y_columns: Vec<String>,
    sample: String,
    marker: String,
    reference: String,
    y_axis: String,
    gate: f64,
}

impl CellGateApp {
    /// Render the top panel with branding and project actions.
    pub(crate) fn render_top_panel(&mut self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 8.0)),
            )
            .show(ctx, |ui| {
                ui.set_min_height(32.0);
                ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(10.0, 0.0);
                    ui.label(
                        egui::RichText::new("CELLGATE")
                            .size(14.0)
                            .strong()
                            .color(accent::BLUE),
                    );
                    Self::top_bar_separator(ui, colors);

                    if ui.button("Open project").clicked() {
                        if let Some(path) =
                            FileDialog::new().add_filter("Project", &["json"]).pick_file()
                        {
                            self.open_project(&path);
                        }
                    }

                    let has_session = self.session.is_some();
                    if ui
                        .add_enabled(has_session, egui::Button::new("Load gates"))
                        .clicked()
                    {
                        if let Some(path) = Self::pick_load_path() {
                            self.apply(GateEvent::LoadRequested(path));
                        }
                    }
                    if ui
                        .add_enabled(has_session, egui::Button::new("Save gates"))
                        .clicked()
                    {
                        self.render_save_action();
                    }

                    if let Some(path) = self.session.as_ref().and_then(|s| s.gates_path()) {
                        Self::top_bar_separator(ui, colors);
                        ui.label(
                            egui::RichText::new(path.display().to_string())
                                .size(11.0)
                                .color(colors.text_muted),
                        );
                    }
                });
            });
    }

    /// Save to the remembered path, asking for one the first time.
    fn render_save_action(&mut self) {
        let remembered = self.session.as_ref().and_then(|s| s.gates_path()).is_some();
        if remembered {
            self.apply(GateEvent::SaveRequested(None));
        } else if let Some(path) = Self::pick_save_path() {
            self.apply(GateEvent::SaveRequested(Some(path)));
        }
    }

    fn top_bar_separator(ui: &mut egui::Ui, colors: ThemeColors) {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(1.0, 20.0), egui::Sense::hover());
        ui.painter()
            .vline(rect.center().x, rect.y_range(), Stroke::new(1.0, colors.border));
    }

    /// Render the bottom status bar.
    pub(crate) fn render_bottom_panel(&self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_header)
                    .inner_margin(egui::Margin::symmetric(16.0, 6.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let (color, text) = match self.status.kind {
                        StatusKind::Info if self.status.text.is_empty() => {
                            (accent::GREEN, "Ready")
                        }
                        StatusKind::Info => (accent::GREEN, self.status.text.as_str()),
                        StatusKind::Notice => (colors.text_muted, self.status.text.as_str()),
                        StatusKind::Error => (accent::RED, self.status.text.as_str()),
                    };
                    ui.label(egui::RichText::new("●").size(11.0).color(color));
                    ui.label(egui::RichText::new(text).size(11.0).color(color));

                    if let Some((row, col, value, label)) = self.cursor_info {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(
                                egui::RichText::new(format!(
                                    "y {row}  x {col}  intensity {value:.1}  cell {label}"
                                ))
                                .font(FontId::new(11.0, FontFamily::Monospace))
                                .color(colors.text_muted),
                            );
                        });
                    }
                });
            });
    }

    fn selection_snapshot(&self) -> Option<Selection> {
        let session = self.session.as_ref()?;
        let markers = session.markers().name_list();
        let mut y_columns: Vec<String> = session
            .quantification()
            .non_marker_columns(session.markers())
            .into_iter()
            .map(str::to_string)
            .collect();
        y_columns.extend(markers.iter().cloned());
        Some(Selection {
            samples: session.samples().to_vec(),
            markers,
            y_columns,
            sample: session.active_sample().unwrap_or_default().to_string(),
            marker: session.active_marker().unwrap_or_default().to_string(),
            reference: session.reference_marker().unwrap_or_default().to_string(),
            y_axis: session.y_axis().unwrap_or_default().to_string(),
            gate: session.current_gate(),
        })
    }

    /// Render the left side panel with selection and gate controls.
    pub(crate) fn render_side_panel(&mut self, ctx: &egui::Context) {
        let colors = ThemeColors::from_ctx(ctx);

        egui::SidePanel::left("ctrl")
            .default_width(260.0)
            .frame(
                egui::Frame::none()
                    .fill(colors.bg_panel)
                    .inner_margin(egui::Margin::same(16.0)),
            )
            .show(ctx, |ui| {
                let Some(selection) = self.selection_snapshot() else {
                    ui.centered_and_justified(|ui| ui.label("Open a project to start"));
                    return;
                };
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.render_selection(ui, &selection);
                        ui.add_space(16.0);
                        self.render_gate_controls(ui, &selection);
                        ui.add_space(16.0);
                        self.render_gate_summary(ui);
                        ui.add_space(16.0);
                        self.render_view_options(ui);
                    });
            });
    }

    fn combo(
        ui: &mut egui::Ui,
        id: &str,
        label: &str,
        current: &str,
        options: &[String],
    ) -> Option<String> {
        let mut picked = None;
        ui.label(form_label(label));
        ui.add_space(4.0);
        egui::ComboBox::from_id_salt(id)
            .selected_text(current)
            .width(ui.available_width() - 8.0)
            .show_ui(ui, |ui| {
                for option in options {
                    if ui.selectable_label(option == current, option).clicked()
                        && option != current
                    {
                        picked = Some(option.clone());
                    }
                }
            });
        ui.add_space(8.0);
        picked
    }

    fn render_selection(&mut self, ui: &mut egui::Ui, selection: &Selection) {
        if let Some(sample) =
            Self::combo(ui, "sample_select", "Sample", &selection.sample, &selection.samples)
        {
            self.apply(GateEvent::SampleChanged(sample));
        }
        if let Some(marker) =
            Self::combo(ui, "marker_select", "Marker", &selection.marker, &selection.markers)
        {
            self.apply(GateEvent::MarkerChanged(marker));
        }
        if let Some(marker) = Self::combo(
            ui,
            "reference_select",
            "Reference",
            &selection.reference,
            &selection.markers,
        ) {
            self.apply(GateEvent::ReferenceMarkerChanged(marker));
        }
        if let Some(column) = Self::combo(
            ui,
            "y_axis_select",
            "Y axis",
            &selection.y_axis,
            &selection.y_columns,
        ) {
            self.apply(GateEvent::YAxisChanged(column));
        }
    }

    fn render_gate_controls(&mut self, ui: &mut egui::Ui, selection: &Selection) {
        ui.label(form_label("Gate"));
        ui.add_space(4.0);

        let (lo, hi) = self.plot.range.unwrap_or((0.0, 1.0));
        let mut value = selection.gate;
        let response = ui.add(
            egui::Slider::new(&mut value, lo..=hi)
                .clamping(egui::SliderClamping::Never)
                .max_decimals(2),
        );
        if response.changed() {
            self.apply(GateEvent::GateAdjusted(value));
        }
        if let Some(saved) = self.saved_gate {
            ui.label(stat_label(&format!("Saved gate {saved:.2}")));
        }
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.add(primary_button("Commit gate")).clicked() {
                self.apply(GateEvent::GateCommitted);
            }
            if ui.button("Plot points").clicked() {
                self.apply(GateEvent::PlotPointsRequested);
            }
        });
    }

    fn render_gate_summary(&self, ui: &mut egui::Ui) {
        let Some(session) = &self.session else {
            return;
        };
        let Ok(summary) = session.summary(session.current_gate()) else {
            return;
        };
        egui::Grid::new("gate_summary")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label(stat_label("Cells"));
                ui.label(stat_value(&format_number(summary.total)));
                ui.end_row();
                ui.label(stat_label("Positive"));
                ui.label(stat_value(&format!(
                    "{} ({:.1}%)",
                    format_number(summary.positive),
                    summary.fraction() * 100.0
                )));
                ui.end_row();
                ui.label(stat_label("Gates set"));
                ui.label(stat_value(&format!(
                    "{} / {}",
                    session.gates().set_count(),
                    session.gates().len()
                )));
                ui.end_row();
            });
        if let Some(points) = &self.points {
            ui.add_space(4.0);
            ui.label(
                egui::RichText::new(&points.name)
                    .size(11.0)
                    .color(Color32::YELLOW),
            );
        }
    }

    /// Render view options (colormaps, toggles).
    fn render_view_options(&mut self, ui: &mut egui::Ui) {
        for (id, label, is_marker) in [
            ("marker_cmap", "Marker color", true),
            ("reference_cmap", "Reference color", false),
        ] {
            ui.label(form_label(label));
            ui.add_space(4.0);
            let current = if is_marker {
                self.ui_state.marker_colormap
            } else {
                self.ui_state.reference_colormap
            };
            egui::ComboBox::from_id_salt(id)
                .selected_text(current.to_string())
                .width(ui.available_width() - 8.0)
                .show_ui(ui, |ui| {
                    for cmap in Colormap::ALL {
                        let target = if is_marker {
                            &mut self.ui_state.marker_colormap
                        } else {
                            &mut self.ui_state.reference_colormap
                        };
                        if ui
                            .selectable_value(target, cmap, cmap.to_string())
                            .clicked()
                        {
                            self.texture = None;
                        }
                    }
                });
            ui.add_space(8.0);
        }

        if ui.checkbox(&mut self.ui_state.show_mask, "Mask outline").changed() {
            self.texture = None;
        }
        ui.checkbox(&mut self.ui_state.show_plot, "Gate plot");
    }
}
