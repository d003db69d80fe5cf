//! Gating session state and user-intent dispatch.
//!
//! A [`Session`] is owned by the front end (CLI or GUI) and receives one
//! [`GateEvent`] per user action. Each event is handled synchronously and
//! answers with an [`Outcome`]: an optional notification plus the
//! [`Effect`]s the front end must carry out (reload image layers, redraw
//! plots, ...). File access goes through a [`GateStorage`] backend.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gate::{GateTable, UNSET_GATE};
use crate::histogram::IntensityHistogram;
use crate::markers::MarkerIndex;
use crate::natural::sort_natural;
use crate::plot::{self, CellPoint, GateSummary};
use crate::quantification::Quantification;

/// Persistence backend for gate tables.
pub trait GateStorage {
    /// Reads a gate table, checking its column schema.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for schema problems and
    /// [`Error::Storage`] for I/O or parse failures.
    fn read(&mut self, path: &Path) -> Result<GateTable>;

    /// Writes a gate table.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the table cannot be written.
    fn write(&mut self, path: &Path, table: &GateTable) -> Result<()>;
}

/// Discrete user actions.
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// A sample was picked.
    SampleChanged(String),
    /// A marker was picked.
    MarkerChanged(String),
    /// A reference (anchor overlay) marker was picked.
    ReferenceMarkerChanged(String),
    /// A different y-axis column was picked for the scatter plot.
    YAxisChanged(String),
    /// The gate slider moved.
    GateAdjusted(f64),
    /// The slider value should be stored as the gate of the selection.
    GateCommitted,
    /// Replace the gate table with a file.
    LoadRequested(PathBuf),
    /// Write the gate table, to the given path or the remembered one.
    SaveRequested(Option<PathBuf>),
    /// Show the cells above the current slider value.
    PlotPointsRequested,
}

/// Work the front end must do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Clear all layers and load marker, reference and mask of the sample.
    ReloadSampleLayers,
    /// Replace only the marker image layer.
    ReloadMarkerLayer,
    /// Replace only the reference channel layer.
    ReloadReferenceLayer,
    /// Redraw the scatter plot and histogram and reset the slider range.
    RefreshPlot,
    /// Draw the stored gate as a fixed line.
    ShowSavedGate(f64),
    /// Show cells above the threshold as a point layer.
    PlotPositiveCells { threshold: f64 },
    /// Ask the user where to save the gates.
    RequestSavePath,
}

/// Response to a dispatched event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Message for the user, if any.
    pub notification: Option<String>,
    /// Front-end work, in order.
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn with_effects(effects: Vec<Effect>) -> Self {
        Self {
            notification: None,
            effects,
        }
    }

    fn notify(mut self, message: impl Into<String>) -> Self {
        self.notification = Some(message.into());
        self
    }
}

/// State of one gating session.
#[derive(Debug, Clone)]
pub struct Session {
    quantification: Quantification,
    markers: MarkerIndex,
    samples: Vec<String>,
    gates: GateTable,
    active_sample: Option<String>,
    active_marker: Option<String>,
    reference_marker: Option<String>,
    y_axis: Option<String>,
    current_gate: f64,
    gates_path: Option<PathBuf>,
}

impl Session {
    /// Starts a session with a fresh gate table.
    ///
    /// The first sample in natural order and the first marker become the
    /// selection; the first marker is also the reference channel.
    ///
    /// # Errors
    /// Returns [`Error::MissingMarkerColumn`] if a marker of the index has no
    /// quantification column.
    pub fn new(quantification: Quantification, markers: MarkerIndex) -> Result<Self> {
        quantification.check_markers(&markers)?;

        let quant_samples = quantification.sample_ids();
        let gates = GateTable::initialize(&quant_samples, &markers.name_list());
        let mut samples = quant_samples;
        sort_natural(&mut samples);

        let first_marker = markers.names().next().map(str::to_string);
        let y_axis = quantification
            .non_marker_columns(&markers)
            .first()
            .map(|s| (*s).to_string())
            .or_else(|| first_marker.clone());

        log::debug!(
            "session started: {} cells, {} samples, {} markers",
            quantification.len(),
            samples.len(),
            markers.len()
        );

        Ok(Self {
            active_sample: samples.first().cloned(),
            active_marker: first_marker.clone(),
            reference_marker: first_marker,
            quantification,
            markers,
            samples,
            gates,
            y_axis,
            current_gate: UNSET_GATE,
            gates_path: None,
        })
    }

    /// Handles one user action.
    ///
    /// Nothing is changed when an error is returned, except that a commit
    /// whose save fails stays in memory.
    ///
    /// # Errors
    /// Returns the error of the rejected action; [`Error::is_informational`]
    /// tells declined commits from failures.
    pub fn dispatch(&mut self, event: GateEvent, storage: &mut dyn GateStorage) -> Result<Outcome> {
        log::debug!("dispatch: {event:?}");
        match event {
            GateEvent::SampleChanged(sample) => self.on_sample_changed(sample),
            GateEvent::MarkerChanged(marker) => self.on_marker_changed(marker),
            GateEvent::ReferenceMarkerChanged(marker) => {
                if !self.markers.contains(&marker) {
                    return Err(Error::UnknownMarker(marker));
                }
                self.reference_marker = Some(marker);
                Ok(Outcome::with_effects(vec![Effect::ReloadReferenceLayer]))
            }
            GateEvent::YAxisChanged(column) => {
                if self.quantification.column(&column).is_none() {
                    return Err(Error::UnknownColumn(column));
                }
                self.y_axis = Some(column);
                Ok(Outcome::with_effects(vec![Effect::RefreshPlot]))
            }
            GateEvent::GateAdjusted(value) => {
                if !value.is_finite() {
                    return Err(Error::InvalidGateValue(value));
                }
                self.current_gate = value;
                Ok(Outcome::default())
            }
            GateEvent::GateCommitted => self.on_gate_committed(storage),
            GateEvent::LoadRequested(path) => self.on_load_requested(path, storage),
            GateEvent::SaveRequested(path) => self.on_save_requested(path, storage),
            GateEvent::PlotPointsRequested => {
                self.selection()?;
                Ok(Outcome::with_effects(vec![Effect::PlotPositiveCells {
                    threshold: self.current_gate,
                }]))
            }
        }
    }

    fn on_sample_changed(&mut self, sample: String) -> Result<Outcome> {
        if !self.quantification.has_sample(&sample) {
            return Err(Error::UnknownSample(sample));
        }
        self.active_sample = Some(sample);
        self.reset_slider();
        let mut effects = vec![Effect::ReloadSampleLayers, Effect::RefreshPlot];
        effects.extend(self.saved_gate_effects());
        Ok(Outcome::with_effects(effects))
    }

    fn on_marker_changed(&mut self, marker: String) -> Result<Outcome> {
        if !self.markers.contains(&marker) {
            return Err(Error::UnknownMarker(marker));
        }
        self.active_marker = Some(marker);
        self.reset_slider();
        let mut effects = vec![Effect::ReloadMarkerLayer, Effect::RefreshPlot];
        effects.extend(self.saved_gate_effects());
        Ok(Outcome::with_effects(effects))
    }

    fn on_gate_committed(&mut self, storage: &mut dyn GateStorage) -> Result<Outcome> {
        let (sample, marker) = self.selection()?;
        let (sample, marker) = (sample.to_string(), marker.to_string());
        let update = self.gates.set_gate(&sample, &marker, self.current_gate)?;
        log::info!(
            "gate {sample}:{marker} set to {} (was {})",
            update.value,
            update.previous
        );

        let mut outcome = Outcome::with_effects(vec![Effect::ShowSavedGate(update.value)]).notify(
            format!(
                "Old gate {:.2} overwritten to {:.2}",
                update.previous, update.value
            ),
        );
        match &self.gates_path {
            Some(path) => {
                storage.write(path, &self.gates)?;
                log::debug!("gates saved to {}", path.display());
            }
            None => outcome.effects.push(Effect::RequestSavePath),
        }
        Ok(outcome)
    }

    fn on_load_requested(&mut self, path: PathBuf, storage: &mut dyn GateStorage) -> Result<Outcome> {
        let table = storage.read(&path)?;
        table.validate_key_space(&self.samples, &self.markers.name_list())?;
        log::debug!(
            "gates loaded from {}: {} records, {} set",
            path.display(),
            table.len(),
            table.set_count()
        );

        self.gates = table;
        let message = format!("Gates dataframe loaded from: {}", path.display());
        self.gates_path = Some(path);

        let mut effects = Vec::new();
        if let Ok(gate) = self.saved_gate() {
            effects.push(Effect::ShowSavedGate(gate));
            effects.push(Effect::PlotPositiveCells { threshold: gate });
        }
        Ok(Outcome::with_effects(effects).notify(message))
    }

    fn on_save_requested(&mut self, path: Option<PathBuf>, storage: &mut dyn GateStorage) -> Result<Outcome> {
        let target = path
            .or_else(|| self.gates_path.clone())
            .ok_or(Error::NoSaveTarget)?;
        storage.write(&target, &self.gates)?;
        log::debug!("gates saved to {}", target.display());
        let message = format!("File saved to: {}", target.display());
        self.gates_path = Some(target);
        Ok(Outcome::default().notify(message))
    }

    fn reset_slider(&mut self) {
        self.current_gate = self.saved_gate().unwrap_or(UNSET_GATE);
    }

    fn saved_gate_effects(&self) -> Vec<Effect> {
        match self.saved_gate() {
            Ok(gate) if gate > UNSET_GATE => vec![
                Effect::ShowSavedGate(gate),
                Effect::PlotPositiveCells { threshold: gate },
            ],
            _ => Vec::new(),
        }
    }

    /// Active (sample, marker) pair.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] unless both are selected.
    pub fn selection(&self) -> Result<(&str, &str)> {
        match (&self.active_sample, &self.active_marker) {
            (Some(s), Some(m)) => Ok((s.as_str(), m.as_str())),
            _ => Err(Error::NoSelection),
        }
    }

    /// Stored gate of the active pair.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or [`Error::NotFound`].
    pub fn saved_gate(&self) -> Result<f64> {
        let (sample, marker) = self.selection()?;
        self.gates.lookup(sample, marker)
    }

    /// Scatter points of the active pair against the y-axis column.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or a lookup error.
    pub fn scatter_points(&self) -> Result<Vec<[f64; 2]>> {
        let (sample, marker) = self.selection()?;
        let y_axis = self.y_axis.as_deref().unwrap_or(marker);
        plot::scatter_points(&self.quantification, sample, marker, y_axis)
    }

    /// Slider bounds for the active pair.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or a lookup error.
    pub fn intensity_range(&self) -> Result<Option<(f64, f64)>> {
        let (sample, marker) = self.selection()?;
        plot::intensity_range(&self.quantification, sample, marker)
    }

    /// Histogram of the active pair.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or a lookup error.
    pub fn histogram(&self, n_bins: usize) -> Result<IntensityHistogram> {
        let (sample, marker) = self.selection()?;
        plot::intensity_histogram(&self.quantification, sample, marker, n_bins)
    }

    /// Cells of the active pair above `threshold`.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or a lookup error.
    pub fn positive_cells(&self, threshold: f64) -> Result<Vec<CellPoint>> {
        let (sample, marker) = self.selection()?;
        plot::positive_cells(&self.quantification, sample, marker, threshold)
    }

    /// Positive/total counts of the active pair at `gate`.
    ///
    /// # Errors
    /// Returns [`Error::NoSelection`] or a lookup error.
    pub fn summary(&self, gate: f64) -> Result<GateSummary> {
        let (sample, marker) = self.selection()?;
        plot::gate_summary(&self.quantification, sample, marker, gate)
    }

    /// Remembers where gates are saved without loading them.
    pub fn set_gates_path(&mut self, path: impl Into<PathBuf>) {
        self.gates_path = Some(path.into());
    }

    #[must_use]
    pub fn quantification(&self) -> &Quantification {
        &self.quantification
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerIndex {
        &self.markers
    }

    /// Sample ids in natural order.
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    #[must_use]
    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    #[must_use]
    pub fn active_sample(&self) -> Option<&str> {
        self.active_sample.as_deref()
    }

    #[must_use]
    pub fn active_marker(&self) -> Option<&str> {
        self.active_marker.as_deref()
    }

    #[must_use]
    pub fn reference_marker(&self) -> Option<&str> {
        self.reference_marker.as_deref()
    }

    #[must_use]
    pub fn y_axis(&self) -> Option<&str> {
        self.y_axis.as_deref()
    }

    /// Current slider value.
    #[must_use]
    pub fn current_gate(&self) -> f64 {
        self.current_gate
    }

    #[must_use]
    pub fn gates_path(&self) -> Option<&Path> {
        self.gates_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NoOpReason, ValidationError};
    use crate::gate::GateRecord;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStorage {
        files: HashMap<PathBuf, GateTable>,
        writes: usize,
    }

    impl GateStorage for MemoryStorage {
        fn read(&mut self, path: &Path) -> Result<GateTable> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::storage(format!("no such file: {}", path.display())))
        }

        fn write(&mut self, path: &Path, table: &GateTable) -> Result<()> {
            self.writes += 1;
            self.files.insert(path.to_path_buf(), table.clone());
            Ok(())
        }
    }

    fn session() -> Session {
        let q = Quantification::new(
            vec!["S10".into(), "S2".into(), "S2".into(), "S10".into()],
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
        )
        .unwrap()
        .with_column("CD3", vec![1.0, 2.0, 3.0, 4.0])
        .unwrap()
        .with_column("CD8", vec![4.0, 3.0, 2.0, 1.0])
        .unwrap()
        .with_column("Area", vec![10.0, 20.0, 30.0, 40.0])
        .unwrap();
        let markers = MarkerIndex::from_names(&["CD3", "CD8"]).unwrap();
        Session::new(q, markers).unwrap()
    }

    #[test]
    fn test_new_session_defaults() {
        let s = session();
        assert_eq!(s.samples(), &["S2".to_string(), "S10".to_string()]);
        assert_eq!(s.active_sample(), Some("S2"));
        assert_eq!(s.active_marker(), Some("CD3"));
        assert_eq!(s.reference_marker(), Some("CD3"));
        assert_eq!(s.y_axis(), Some("Area"));
        assert_eq!(s.gates().len(), 4);
    }

    #[test]
    fn test_missing_marker_column_rejected() {
        let q = Quantification::new(vec!["S1".into()], vec![0.0], vec![0.0]).unwrap();
        let markers = MarkerIndex::from_names(&["CD3"]).unwrap();
        assert!(matches!(
            Session::new(q, markers),
            Err(Error::MissingMarkerColumn(_))
        ));
    }

    #[test]
    fn test_commit_unset_is_informational() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        let err = s.dispatch(GateEvent::GateCommitted, &mut store).unwrap_err();
        assert!(err.is_informational());
        assert!(matches!(err, Error::NoOp(NoOpReason::Unset)));
        assert_eq!(s.gates().set_count(), 0);
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_commit_without_path_requests_one() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        s.dispatch(GateEvent::GateAdjusted(2.5), &mut store).unwrap();
        let outcome = s.dispatch(GateEvent::GateCommitted, &mut store).unwrap();
        assert_eq!(
            outcome.notification.as_deref(),
            Some("Old gate 0.00 overwritten to 2.50")
        );
        assert!(outcome.effects.contains(&Effect::RequestSavePath));
        assert_relative_eq!(s.saved_gate().unwrap(), 2.5);

        let err = s.dispatch(GateEvent::GateCommitted, &mut store).unwrap_err();
        assert!(matches!(err, Error::NoOp(NoOpReason::NoChange)));
    }

    #[test]
    fn test_commit_persists_to_known_path() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        s.set_gates_path("gates.csv");
        s.dispatch(GateEvent::GateAdjusted(3.0), &mut store).unwrap();
        let outcome = s.dispatch(GateEvent::GateCommitted, &mut store).unwrap();
        assert_eq!(outcome.effects, vec![Effect::ShowSavedGate(3.0)]);
        assert_eq!(store.writes, 1);
        let saved = &store.files[Path::new("gates.csv")];
        assert_relative_eq!(saved.lookup("S2", "CD3").unwrap(), 3.0);
    }

    #[test]
    fn test_sample_change_resets_slider_and_reloads() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        s.dispatch(GateEvent::GateAdjusted(2.0), &mut store).unwrap();
        s.dispatch(GateEvent::GateCommitted, &mut store).unwrap();

        let outcome = s
            .dispatch(GateEvent::SampleChanged("S10".into()), &mut store)
            .unwrap();
        assert_eq!(
            outcome.effects,
            vec![Effect::ReloadSampleLayers, Effect::RefreshPlot]
        );
        assert_relative_eq!(s.current_gate(), 0.0);

        let outcome = s
            .dispatch(GateEvent::SampleChanged("S2".into()), &mut store)
            .unwrap();
        assert!(outcome.effects.contains(&Effect::ShowSavedGate(2.0)));
        assert!(outcome
            .effects
            .contains(&Effect::PlotPositiveCells { threshold: 2.0 }));
        assert_relative_eq!(s.current_gate(), 2.0);
    }

    #[test]
    fn test_marker_change_reloads_marker_layer_only() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        let outcome = s
            .dispatch(GateEvent::MarkerChanged("CD8".into()), &mut store)
            .unwrap();
        assert_eq!(outcome.effects[0], Effect::ReloadMarkerLayer);
        assert!(!outcome.effects.contains(&Effect::ReloadSampleLayers));
        assert_eq!(s.active_marker(), Some("CD8"));
    }

    #[test]
    fn test_unknown_ids_leave_state() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        assert!(matches!(
            s.dispatch(GateEvent::SampleChanged("S7".into()), &mut store),
            Err(Error::UnknownSample(_))
        ));
        assert!(matches!(
            s.dispatch(GateEvent::MarkerChanged("CD4".into()), &mut store),
            Err(Error::UnknownMarker(_))
        ));
        assert!(matches!(
            s.dispatch(GateEvent::YAxisChanged("Perimeter".into()), &mut store),
            Err(Error::UnknownColumn(_))
        ));
        assert_eq!(s.active_sample(), Some("S2"));
        assert_eq!(s.active_marker(), Some("CD3"));
    }

    #[test]
    fn test_load_mismatch_keeps_table() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        s.dispatch(GateEvent::GateAdjusted(1.5), &mut store).unwrap();
        s.dispatch(GateEvent::GateCommitted, &mut store).unwrap();

        let bad = GateTable::initialize(&["S2", "S3"], &["CD3", "CD8"]);
        store.files.insert(PathBuf::from("bad.csv"), bad);
        let err = s
            .dispatch(GateEvent::LoadRequested("bad.csv".into()), &mut store)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::SampleMismatch { .. })
        ));
        assert_relative_eq!(s.saved_gate().unwrap(), 1.5);
        assert!(s.gates_path().is_none());
    }

    #[test]
    fn test_load_replaces_table_and_plots() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        let good = GateTable::from_records(vec![
            GateRecord::new("S2", "CD3", 2.5),
            GateRecord::new("S2", "CD8", 0.0),
            GateRecord::new("S10", "CD3", 0.0),
            GateRecord::new("S10", "CD8", 1.0),
        ])
        .unwrap();
        store.files.insert(PathBuf::from("gates.csv"), good);

        let outcome = s
            .dispatch(GateEvent::LoadRequested("gates.csv".into()), &mut store)
            .unwrap();
        assert_eq!(
            outcome.effects,
            vec![
                Effect::ShowSavedGate(2.5),
                Effect::PlotPositiveCells { threshold: 2.5 }
            ]
        );
        assert_eq!(s.gates_path(), Some(Path::new("gates.csv")));
        assert_eq!(s.positive_cells(2.5).unwrap().len(), 1);
    }

    #[test]
    fn test_save_requires_target() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        assert!(matches!(
            s.dispatch(GateEvent::SaveRequested(None), &mut store),
            Err(Error::NoSaveTarget)
        ));
        let outcome = s
            .dispatch(GateEvent::SaveRequested(Some("out.csv".into())), &mut store)
            .unwrap();
        assert_eq!(outcome.notification.as_deref(), Some("File saved to: out.csv"));
        s.dispatch(GateEvent::SaveRequested(None), &mut store).unwrap();
        assert_eq!(store.writes, 2);
    }

    #[test]
    fn test_plot_helpers_follow_selection() {
        let s = session();
        assert_eq!(
            s.scatter_points().unwrap(),
            vec![[2.0, 20.0], [3.0, 30.0]]
        );
        assert_eq!(s.intensity_range().unwrap(), Some((2.0, 3.0)));
        assert_eq!(s.summary(2.5).unwrap().positive, 1);
        assert_eq!(s.histogram(2).unwrap().total(), 2);
    }

    #[test]
    fn test_gate_adjusted_rejects_nan() {
        let mut s = session();
        let mut store = MemoryStorage::default();
        assert!(s
            .dispatch(GateEvent::GateAdjusted(f64::NAN), &mut store)
            .is_err());
        assert_relative_eq!(s.current_gate(), 0.0);
    }
}
