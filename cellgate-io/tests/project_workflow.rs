//! End-to-end gating of a project stored on disk.

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use cellgate_core::{Effect, GateEvent, GateTable, Session, UNSET_GATE};
use cellgate_io::{read_gates_file, write_gates_file, CsvGateStorage, ProjectConfig};
use tempfile::TempDir;

const QUANT: &str = "\
sample_id,DNA1,CD3,CD8,X_centroid,Y_centroid,Area
S10,10,120,3,5,5,40
S2,12,80,9,6,7,35
S2,11,15,40,2,3,50
S10,9,30,60,8,1,45
";

fn write_project(dir: &Path, with_gates: bool) -> PathBuf {
    fs::write(dir.join("quant.csv"), QUANT).unwrap();
    fs::write(dir.join("markers.csv"), "marker_name\nDNA1\nCD3\nCD8\n").unwrap();
    let gates = if with_gates { r#","gates": "gates.csv""# } else { "" };
    let project = dir.join("project.json");
    fs::write(
        &project,
        format!(r#"{{"quantification": "quant.csv", "markers": "markers.csv"{gates}}}"#),
    )
    .unwrap();
    project
}

fn open(project: &Path) -> Session {
    ProjectConfig::load(project).unwrap().open_session().unwrap()
}

#[test]
fn test_init_set_reload() {
    let dir = TempDir::new().unwrap();
    let project = write_project(dir.path(), true);
    let gates_path = dir.path().join("gates.csv");

    let mut session = open(&project);
    assert_eq!(session.samples(), ["S2", "S10"]);
    assert_eq!(session.gates_path(), Some(gates_path.as_path()));

    let fresh = GateTable::initialize(
        &session.quantification().sample_ids(),
        &session.markers().name_list(),
    );
    write_gates_file(&gates_path, &fresh).unwrap();

    let mut storage = CsvGateStorage;
    session
        .dispatch(GateEvent::LoadRequested(gates_path.clone()), &mut storage)
        .unwrap();
    session
        .dispatch(GateEvent::SampleChanged("S10".into()), &mut storage)
        .unwrap();
    session
        .dispatch(GateEvent::MarkerChanged("CD3".into()), &mut storage)
        .unwrap();
    session.dispatch(GateEvent::GateAdjusted(50.0), &mut storage).unwrap();
    let outcome = session.dispatch(GateEvent::GateCommitted, &mut storage).unwrap();
    assert_eq!(
        outcome.notification.as_deref(),
        Some("Old gate 0.00 overwritten to 50.00")
    );
    assert!(!outcome.effects.contains(&Effect::RequestSavePath));

    let on_disk = read_gates_file(&gates_path).unwrap();
    assert_relative_eq!(on_disk.lookup("S10", "CD3").unwrap(), 50.0);
    assert_relative_eq!(on_disk.lookup("S2", "CD3").unwrap(), UNSET_GATE);
    assert_eq!(on_disk.len(), 6);

    let reopened = open(&project);
    assert_relative_eq!(reopened.gates().lookup("S10", "CD3").unwrap(), 50.0);
    let positives = session.positive_cells(50.0).unwrap();
    assert_eq!(positives.len(), 1);
    assert_relative_eq!(positives[0].x, 5.0);
}

#[test]
fn test_mismatched_gate_file_keeps_table() {
    let dir = TempDir::new().unwrap();
    let project = write_project(dir.path(), false);
    let mut session = open(&project);
    let mut storage = CsvGateStorage;

    let other = dir.path().join("other.csv");
    fs::write(
        &other,
        "sample_id,marker_id,gate_value\nS2,DNA1,1\nS2,CD3,2\nS2,CD8,3\n",
    )
    .unwrap();
    let before = session.gates().records().to_vec();
    assert!(session
        .dispatch(GateEvent::LoadRequested(other), &mut storage)
        .is_err());
    assert_eq!(session.gates().records(), before.as_slice());
    assert!(session.gates_path().is_none());
}

#[test]
fn test_commit_without_target_requests_path() {
    let dir = TempDir::new().unwrap();
    let project = write_project(dir.path(), false);
    let mut session = open(&project);
    let mut storage = CsvGateStorage;

    session.dispatch(GateEvent::GateAdjusted(20.0), &mut storage).unwrap();
    let outcome = session.dispatch(GateEvent::GateCommitted, &mut storage).unwrap();
    assert!(outcome.effects.contains(&Effect::RequestSavePath));

    let target = dir.path().join("saved.csv");
    let saved = session
        .dispatch(GateEvent::SaveRequested(Some(target.clone())), &mut storage)
        .unwrap();
    assert_eq!(
        saved.notification,
        Some(format!("File saved to: {}", target.display()))
    );
    let table = read_gates_file(&target).unwrap();
    assert_relative_eq!(table.lookup("S2", "DNA1").unwrap(), 20.0);
}
