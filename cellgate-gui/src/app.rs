//! Main application state and logic.
//!
//! Contains the `CellGateApp` struct which owns the gating session,
//! forwards user actions to it and carries out the returned effects.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use cellgate_core::plot::points_layer_name;
use cellgate_core::{CellPoint, Effect, GateEvent, IntensityHistogram, Session};
use cellgate_io::{CsvGateStorage, LabelMask, Plane, ProjectConfig};
use eframe::egui;
use ndarray::Array2;
use rfd::FileDialog;

use crate::state::{StatusKind, StatusLine, UiState};
use crate::viewer::{compose_image, ChannelLayer};

/// Quantile contrast limits applied to every channel.
const CONTRAST_QUANTILES: (f64, f64) = (0.01, 0.995);
/// Mask outline color.
const OUTLINE_COLOR: [u8; 3] = [255, 255, 255];

/// A loaded image plane and its display limits.
pub(crate) struct ImageLayer {
    pub(crate) name: String,
    pub(crate) plane: Plane,
    pub(crate) limits: (f32, f32),
}

impl ImageLayer {
    fn new(name: impl Into<String>, plane: Plane) -> Self {
        let (lo, hi) = CONTRAST_QUANTILES;
        let limits = cellgate_io::contrast_limits(&plane, lo, hi).unwrap_or((0.0, 1.0));
        Self {
            name: name.into(),
            plane,
            limits,
        }
    }
}

/// Cells above a gate, drawn over the image.
pub(crate) struct PointsLayer {
    pub(crate) name: String,
    pub(crate) points: Vec<CellPoint>,
}

/// Plot data for the active sample and marker.
#[derive(Default)]
pub(crate) struct PlotData {
    pub(crate) scatter: Vec<[f64; 2]>,
    pub(crate) histogram: Option<IntensityHistogram>,
    pub(crate) range: Option<(f64, f64)>,
}

/// Main application state.
#[derive(Default)]
pub struct CellGateApp {
    /// Open project.
    pub(crate) project: Option<ProjectConfig>,
    /// Gating session of the open project.
    pub(crate) session: Option<Session>,
    pub(crate) storage: CsvGateStorage,

    /// Gated marker channel of the active sample.
    pub(crate) marker_layer: Option<ImageLayer>,
    /// Reference channel of the active sample.
    pub(crate) reference_layer: Option<ImageLayer>,
    /// Segmentation mask of the active sample.
    pub(crate) mask: Option<LabelMask>,
    /// Cached mask outline.
    pub(crate) outline: Option<Array2<bool>>,
    /// Positive cells at the last plotted gate.
    pub(crate) points: Option<PointsLayer>,
    /// Stored gate of the selection, once shown.
    pub(crate) saved_gate: Option<f64>,
    pub(crate) plot: PlotData,

    /// Current cursor info (row, column, marker intensity, mask label).
    pub(crate) cursor_info: Option<(usize, usize, f32, u32)>,

    /// UI display state.
    pub(crate) ui_state: UiState,
    pub(crate) status: StatusLine,

    /// Cached composite texture.
    pub(crate) texture: Option<egui::TextureHandle>,
}

impl CellGateApp {
    /// Open a project file and start a new session.
    pub fn open_project(&mut self, path: &Path) {
        match Self::load_project(path) {
            Ok((config, session)) => {
                *self = Self {
                    ui_state: std::mem::take(&mut self.ui_state),
                    project: Some(config),
                    session: Some(session),
                    ..Self::default()
                };
                self.status
                    .set(StatusKind::Info, format!("Opened {}", path.display()));
                let mut effects = vec![Effect::ReloadSampleLayers, Effect::RefreshPlot];
                effects.extend(self.saved_gate_effects());
                self.apply_effects(&effects);
            }
            Err(e) => self.report(&e),
        }
    }

    fn load_project(path: &Path) -> anyhow::Result<(ProjectConfig, Session)> {
        let config = ProjectConfig::load(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let session = config.open_session().context("opening session")?;
        Ok((config, session))
    }

    /// Forward a user action to the session and carry out its effects.
    pub fn apply(&mut self, event: GateEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.dispatch(event, &mut self.storage) {
            Ok(outcome) => {
                if let Some(message) = outcome.notification {
                    self.status.set(StatusKind::Info, message);
                }
                self.apply_effects(&outcome.effects);
            }
            Err(err) if err.is_informational() => {
                self.status.set(StatusKind::Notice, err.to_string());
            }
            Err(err) => self.report(&anyhow::Error::new(err)),
        }
    }

    fn apply_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            log::debug!("effect: {effect:?}");
            let result = match effect {
                Effect::ReloadSampleLayers => self.reload_sample_layers(),
                Effect::ReloadMarkerLayer => self.reload_marker_layer(),
                Effect::ReloadReferenceLayer => self.reload_reference_layer(),
                Effect::RefreshPlot => {
                    self.refresh_plot();
                    Ok(())
                }
                Effect::ShowSavedGate(gate) => {
                    self.saved_gate = Some(*gate);
                    Ok(())
                }
                Effect::PlotPositiveCells { threshold } => self.plot_positive_cells(*threshold),
                Effect::RequestSavePath => {
                    if let Some(path) = Self::pick_save_path() {
                        self.apply(GateEvent::SaveRequested(Some(path)));
                    }
                    Ok(())
                }
            };
            if let Err(e) = result {
                self.report(&e);
            }
        }
    }

    /// Effects showing a stored gate loaded with the project.
    fn saved_gate_effects(&self) -> Vec<Effect> {
        self.session
            .as_ref()
            .and_then(|s| s.saved_gate().ok())
            .filter(|g| *g > cellgate_core::UNSET_GATE)
            .map(|gate| {
                vec![
                    Effect::ShowSavedGate(gate),
                    Effect::PlotPositiveCells { threshold: gate },
                ]
            })
            .unwrap_or_default()
    }

    fn report(&mut self, err: &anyhow::Error) {
        log::error!("{err:#}");
        self.status.set(StatusKind::Error, format!("Error: {err:#}"));
    }

    pub(crate) fn pick_save_path() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("gates.csv")
            .save_file()
    }

    pub(crate) fn pick_load_path() -> Option<PathBuf> {
        FileDialog::new().add_filter("CSV", &["csv"]).pick_file()
    }

    fn read_channel(&self, marker: &str) -> anyhow::Result<Option<ImageLayer>> {
        let (Some(project), Some(session)) = (&self.project, &self.session) else {
            return Ok(None);
        };
        let Some(sample) = session.active_sample() else {
            return Ok(None);
        };
        let Some(path) = project.image_path(sample) else {
            return Ok(None);
        };
        let channel = session
            .markers()
            .channel(marker)
            .ok_or_else(|| anyhow!("marker {marker} has no channel"))?;
        let plane = cellgate_io::read_channel(path, channel)
            .with_context(|| format!("reading {marker} from {}", path.display()))?;
        Ok(Some(ImageLayer::new(marker, plane)))
    }

    fn reload_sample_layers(&mut self) -> anyhow::Result<()> {
        self.marker_layer = None;
        self.reference_layer = None;
        self.mask = None;
        self.outline = None;
        self.points = None;
        self.texture = None;

        if let Some(path) = self
            .project
            .as_ref()
            .zip(self.session.as_ref().and_then(Session::active_sample))
            .and_then(|(project, sample)| project.mask_path(sample))
        {
            let mask = cellgate_io::read_mask(path)
                .with_context(|| format!("reading mask {}", path.display()))?;
            self.outline = Some(cellgate_io::mask_outline(&mask));
            self.mask = Some(mask);
        }
        self.reload_marker_layer()?;
        self.reload_reference_layer()
    }

    fn reload_marker_layer(&mut self) -> anyhow::Result<()> {
        self.points = None;
        self.texture = None;
        let marker = self
            .session
            .as_ref()
            .and_then(Session::active_marker)
            .map(str::to_string);
        self.marker_layer = match marker {
            Some(m) => self.read_channel(&m)?,
            None => None,
        };
        Ok(())
    }

    fn reload_reference_layer(&mut self) -> anyhow::Result<()> {
        self.texture = None;
        let marker = self
            .session
            .as_ref()
            .and_then(Session::reference_marker)
            .map(str::to_string);
        self.reference_layer = match marker {
            Some(m) => self.read_channel(&m)?,
            None => None,
        };
        Ok(())
    }

    fn refresh_plot(&mut self) {
        self.saved_gate = None;
        let n_bins = self.ui_state.n_bins;
        self.plot = self
            .session
            .as_ref()
            .map(|s| PlotData {
                scatter: s.scatter_points().unwrap_or_default(),
                histogram: s.histogram(n_bins).ok(),
                range: s.intensity_range().ok().flatten(),
            })
            .unwrap_or_default();
    }

    fn plot_positive_cells(&mut self, threshold: f64) -> anyhow::Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let (sample, marker) = session.selection()?;
        let points = session.positive_cells(threshold)?;
        self.points = Some(PointsLayer {
            name: points_layer_name(threshold, sample, marker),
            points,
        });
        Ok(())
    }

    /// Regenerate the composite texture if needed.
    pub(crate) fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let mut layers = Vec::with_capacity(2);
        if let Some(layer) = &self.marker_layer {
            layers.push(ChannelLayer {
                plane: &layer.plane,
                colormap: self.ui_state.marker_colormap,
                limits: layer.limits,
            });
        }
        if let Some(layer) = &self.reference_layer {
            layers.push(ChannelLayer {
                plane: &layer.plane,
                colormap: self.ui_state.reference_colormap,
                limits: layer.limits,
            });
        }
        let outline = self.outline.as_ref().filter(|_| self.ui_state.show_mask);
        if let Some(img) = compose_image(&layers, outline, OUTLINE_COLOR) {
            self.texture = Some(ctx.load_texture("composite", img, egui::TextureOptions::NEAREST));
        }
    }

    /// Image size as (rows, columns) of the displayed layers.
    pub(crate) fn image_dim(&self) -> Option<(usize, usize)> {
        self.marker_layer
            .as_ref()
            .or(self.reference_layer.as_ref())
            .map(|l| l.plane.dim())
    }
}

impl eframe::App for CellGateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        crate::ui::theme::apply_system_theme(ctx);
        self.ensure_texture(ctx);
        self.render_top_panel(ctx);
        self.render_bottom_panel(ctx);
        self.render_side_panel(ctx);
        self.render_plot_window(ctx);
        self.render_central_panel(ctx);
    }
}
