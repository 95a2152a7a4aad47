use std::fs;

use super::storage::{load_model, read_manifest, save_model};
use super::types::{Manifest, ModelBundle, MANIFEST_FILE, THRESHOLD_FILE, WEIGHTS_FILE};
use crate::logic::config::{Architecture, TrainConfig};
use crate::logic::error::DetectorError;
use crate::logic::features::{FeatureLayout, MinMaxScaler, ScalerState};
use crate::logic::model::{calibrate, Autoencoder};

fn trained_bundle() -> ModelBundle {
    let rows: Vec<Vec<f32>> = (0..24)
        .map(|i| vec![(i % 5) as f32 / 5.0, (i % 3) as f32 / 3.0])
        .collect();
    let scaler = MinMaxScaler::fit(&rows).unwrap();

    let mut model = Autoencoder::new(2, Architecture::default()).unwrap();
    let config = TrainConfig { epochs: 2, ..Default::default() };
    let training = model.train(&rows, &config).unwrap();
    let errors = model.reconstruction_errors(&rows).unwrap();

    ModelBundle {
        dimensionality: 2,
        architecture: Architecture::default(),
        layout: FeatureLayout::new(["rpm", "error_pct"]),
        scaler: Some(scaler),
        threshold: calibrate(&errors, 0.9).unwrap(),
        tensors: model.tensors().unwrap(),
        training: Some(training),
    }
}

#[test]
fn test_save_load_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    let original = trained_bundle();

    save_model(&location, &original).unwrap();
    let loaded = load_model(&location).unwrap();

    assert_eq!(loaded, original);
}

#[test]
fn test_save_creates_three_files_and_no_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();

    for name in [MANIFEST_FILE, WEIGHTS_FILE, THRESHOLD_FILE] {
        assert!(location.join(name).is_file(), "{} missing", name);
    }

    // Only the artifact dir remains next to it
    let siblings: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap()).collect();
    assert_eq!(siblings.len(), 1);
}

#[test]
fn test_save_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    fs::create_dir_all(&location).unwrap();
    fs::write(location.join("stale.txt"), b"old").unwrap();

    save_model(&location, &trained_bundle()).unwrap();

    assert!(!location.join("stale.txt").exists());
    assert!(load_model(&location).is_ok());
}

#[test]
fn test_load_missing_directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_model(&dir.path().join("nope"));
    assert!(matches!(result, Err(DetectorError::NotFound(_))));

    // Empty directory
    let result = load_model(dir.path());
    assert!(matches!(result, Err(DetectorError::NotFound(_))));
}

#[test]
fn test_load_incomplete_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();
    fs::remove_file(location.join(THRESHOLD_FILE)).unwrap();

    assert!(matches!(load_model(&location), Err(DetectorError::NotFound(_))));
}

#[test]
fn test_tampered_weights_are_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();

    let mut bytes = fs::read(location.join(WEIGHTS_FILE)).unwrap();
    bytes.extend_from_slice(b" ");
    fs::write(location.join(WEIGHTS_FILE), bytes).unwrap();

    assert!(matches!(load_model(&location), Err(DetectorError::CorruptArtifact(_))));
}

#[test]
fn test_dimensionality_disagreement_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();

    // Declare D=3 with a consistent layout; tensors still have D=2
    let path = location.join(MANIFEST_FILE);
    let mut manifest: Manifest = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    manifest.dimensionality = 3;
    manifest.layout = FeatureLayout::new(["rpm", "error_pct", "latency"]);
    manifest.layout_hash = manifest.layout.layout_hash();
    manifest.scaler = None;
    fs::write(&path, serde_json::to_vec_pretty(&manifest).unwrap()).unwrap();

    assert!(matches!(load_model(&location), Err(DetectorError::CorruptArtifact(_))));
}

#[test]
fn test_threshold_from_another_model_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    save_model(&first, &trained_bundle()).unwrap();

    let mut other = trained_bundle();
    other.threshold.value += 1.0;
    save_model(&second, &other).unwrap();

    fs::copy(second.join(THRESHOLD_FILE), first.join(THRESHOLD_FILE)).unwrap();
    assert!(matches!(load_model(&first), Err(DetectorError::CorruptArtifact(_))));
}

#[test]
fn test_malformed_scaler_in_manifest_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();

    let path = location.join(MANIFEST_FILE);
    let mut manifest: Manifest = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    if let Some(scaler) = manifest.scaler.as_mut() {
        scaler.max_vals.pop();
    }
    fs::write(&path, serde_json::to_vec_pretty(&manifest).unwrap()).unwrap();

    match load_model(&location) {
        Err(DetectorError::CorruptArtifact(msg)) => {
            assert!(msg.contains("2 minima but 1 maxima"), "{}", msg)
        }
        other => panic!("Expected CorruptArtifact, got {:?}", other),
    }
}

#[test]
fn test_save_refuses_malformed_scaler() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    let mut bundle = trained_bundle();
    bundle.scaler = Some(ScalerState {
        min_vals: vec![0.0, 0.0],
        max_vals: vec![1.0],
    });

    assert!(matches!(save_model(&location, &bundle), Err(DetectorError::InvalidConfig(_))));
    assert!(!location.exists());
}

#[test]
fn test_garbage_manifest_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();
    fs::write(location.join(MANIFEST_FILE), b"{not json").unwrap();

    assert!(matches!(load_model(&location), Err(DetectorError::CorruptArtifact(_))));
}

#[test]
fn test_read_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("model");
    save_model(&location, &trained_bundle()).unwrap();

    let manifest = read_manifest(&location).unwrap();
    assert_eq!(manifest.dimensionality, 2);
    assert_eq!(manifest.layout.names, vec!["rpm", "error_pct"]);
    assert_eq!(manifest.weights_sha256.len(), 64);
    assert_eq!(manifest.threshold_sha256.len(), 64);
}
