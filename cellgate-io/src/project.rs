//! Project configuration files.
//!
//! A project is a small JSON document tying together the quantification
//! table, the marker list, the per-sample images and masks and an optional
//! gate table. Relative paths are resolved against the directory holding the
//! project file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cellgate_core::{GateEvent, Session};
use serde::{Deserialize, Serialize};

use crate::gates::CsvGateStorage;
use crate::quantification::{read_markers, read_quantification};
use crate::Result;

/// Project file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Quantification CSV.
    pub quantification: PathBuf,
    /// Markers CSV.
    pub markers: PathBuf,
    /// Multi-channel image per sample.
    #[serde(default)]
    pub images: BTreeMap<String, PathBuf>,
    /// Segmentation mask per sample.
    #[serde(default)]
    pub masks: BTreeMap<String, PathBuf>,
    /// Gate table CSV, loaded on open when it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gates: Option<PathBuf>,
    /// Marker shown as the reference channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_marker: Option<String>,
    /// Default scatter plot y axis column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

impl ProjectConfig {
    /// Parses a project file and resolves its paths against `base`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Json`] for malformed JSON.
    pub fn from_json(text: &str, base: &Path) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.resolve_paths(base);
        Ok(config)
    }

    /// Reads a project file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] or [`crate::Error::Json`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::from_json(&text, base)?;
        log::debug!("loaded project {}", path.display());
        Ok(config)
    }

    /// Writes the project as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] or [`crate::Error::Json`].
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.quantification);
        resolve(&mut self.markers);
        self.images.values_mut().for_each(resolve);
        self.masks.values_mut().for_each(resolve);
        if let Some(gates) = self.gates.as_mut() {
            resolve(gates);
        }
    }

    /// Image of a sample.
    #[must_use]
    pub fn image_path(&self, sample: &str) -> Option<&Path> {
        self.images.get(sample).map(PathBuf::as_path)
    }

    /// Mask of a sample.
    #[must_use]
    pub fn mask_path(&self, sample: &str) -> Option<&Path> {
        self.masks.get(sample).map(PathBuf::as_path)
    }

    /// Reads the tables and starts a session.
    ///
    /// An existing gate file is loaded through the session, so it must match
    /// the quantification samples and the markers. A gate path that does not
    /// exist yet is remembered as the save target.
    ///
    /// # Errors
    /// Returns the errors of [`ProjectConfig::open_session_without_gates`]
    /// and core errors for a mismatching gate file.
    pub fn open_session(&self) -> Result<Session> {
        let mut session = self.open_session_without_gates()?;
        if let Some(gates) = &self.gates {
            if gates.exists() {
                session.dispatch(GateEvent::LoadRequested(gates.clone()), &mut CsvGateStorage)?;
            } else {
                session.set_gates_path(gates);
            }
        }
        Ok(session)
    }

    /// Starts a session with a fresh gate table, leaving the project's gate
    /// file unread.
    ///
    /// # Errors
    /// Returns read errors of the tables, and core errors for an unknown
    /// reference marker or y axis column.
    pub fn open_session_without_gates(&self) -> Result<Session> {
        let quantification = read_quantification(&self.quantification)?;
        let markers = read_markers(&self.markers)?;
        let mut session = Session::new(quantification, markers)?;
        let mut storage = CsvGateStorage;

        if let Some(marker) = &self.reference_marker {
            session.dispatch(GateEvent::ReferenceMarkerChanged(marker.clone()), &mut storage)?;
        }
        if let Some(column) = &self.y_axis {
            session.dispatch(GateEvent::YAxisChanged(column.clone()), &mut storage)?;
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    const PROJECT: &str = r#"{
        "quantification": "quant.csv",
        "markers": "markers.csv",
        "images": { "S1": "images/S1.tif" },
        "masks": { "S1": "/data/masks/S1.tif" },
        "gates": "gates.csv",
        "reference_marker": "DNA1",
        "y_axis": "Area"
    }"#;

    #[test]
    fn test_relative_paths_resolved() {
        let config = ProjectConfig::from_json(PROJECT, Path::new("/proj")).unwrap();
        assert_eq!(config.quantification, PathBuf::from("/proj/quant.csv"));
        assert_eq!(
            config.image_path("S1"),
            Some(Path::new("/proj/images/S1.tif"))
        );
        assert_eq!(config.mask_path("S1"), Some(Path::new("/data/masks/S1.tif")));
        assert_eq!(config.gates, Some(PathBuf::from("/proj/gates.csv")));
        assert!(config.image_path("S2").is_none());
    }

    #[test]
    fn test_optional_fields_default() {
        let config =
            ProjectConfig::from_json(r#"{"quantification":"q.csv","markers":"m.csv"}"#, Path::new("."))
                .unwrap();
        assert!(config.images.is_empty());
        assert!(config.gates.is_none());
    }

    #[test]
    fn test_open_session_loads_gates() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("quant.csv"),
            "sample_id,DNA1,CD3,X_centroid,Y_centroid,Area\nS1,1,5,0,0,10\nS1,2,50,1,1,20\n",
        )
        .unwrap();
        fs::write(dir.path().join("markers.csv"), "marker_name\nDNA1\nCD3\n").unwrap();
        fs::write(
            dir.path().join("gates.csv"),
            "sample_id,marker_id,gate_value\nS1,DNA1,1.5\nS1,CD3,0\n",
        )
        .unwrap();
        let project = dir.path().join("project.json");
        fs::write(&project, PROJECT).unwrap();

        let session = ProjectConfig::load(&project).unwrap().open_session().unwrap();
        assert_eq!(session.reference_marker(), Some("DNA1"));
        assert_eq!(session.y_axis(), Some("Area"));
        assert_eq!(session.gates_path(), Some(dir.path().join("gates.csv").as_path()));
        assert_relative_eq!(session.gates().lookup("S1", "DNA1").unwrap(), 1.5);
    }

    #[test]
    fn test_stale_gates_only_block_full_open() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("quant.csv"),
            "sample_id,DNA1,X_centroid,Y_centroid\nS1,1,0,0\nS2,2,1,1\n",
        )
        .unwrap();
        fs::write(dir.path().join("markers.csv"), "marker_name\nDNA1\n").unwrap();
        fs::write(
            dir.path().join("gates.csv"),
            "sample_id,marker_id,gate_value\nS1,DNA1,1.5\n",
        )
        .unwrap();
        let project = dir.path().join("project.json");
        fs::write(
            &project,
            r#"{"quantification": "quant.csv", "markers": "markers.csv", "gates": "gates.csv"}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&project).unwrap();
        assert!(config.open_session().is_err());
        let session = config.open_session_without_gates().unwrap();
        assert_eq!(session.samples(), ["S1", "S2"]);
        assert_eq!(session.gates().set_count(), 0);
        assert!(session.gates_path().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        let config = ProjectConfig {
            quantification: dir.path().join("q.csv"),
            markers: dir.path().join("m.csv"),
            ..ProjectConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ProjectConfig::load(&path).unwrap(), config);
    }
}
