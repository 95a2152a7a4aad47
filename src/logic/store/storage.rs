use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::logic::error::{DetectorError, Result};
use super::types::{
    Manifest, ModelBundle, WeightsFile, ARTIFACT_FILES, MANIFEST_FILE, THRESHOLD_FILE,
    WEIGHTS_FILE,
};
use super::validate::{checksum, validate_artifact};
use crate::logic::model::Threshold;

/// Get default model directory
pub fn get_default_model_dir() -> PathBuf {
    constants::get_model_dir()
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Sibling path `.{name}.{tag}-{uuid}` next to `location`
fn sibling(location: &Path, tag: &str) -> Result<PathBuf> {
    let name = location
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            DetectorError::invalid_config(format!(
                "model location {} has no directory name",
                location.display()
            ))
        })?;
    let parent = location.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.{}-{}", name, tag, uuid::Uuid::new_v4())))
}

fn write_staging(staging: &Path, bundle: &ModelBundle) -> Result<()> {
    fs::create_dir_all(staging)?;

    let weights = serde_json::to_vec(&WeightsFile {
        tensors: bundle.tensors.clone(),
    })?;
    let threshold = serde_json::to_vec_pretty(&bundle.threshold)?;
    let manifest = Manifest::for_bundle(bundle, checksum(&weights), checksum(&threshold));

    write_synced(&staging.join(WEIGHTS_FILE), &weights)?;
    write_synced(&staging.join(THRESHOLD_FILE), &threshold)?;
    // Manifest last: a staging dir with a manifest is complete
    write_synced(&staging.join(MANIFEST_FILE), &serde_json::to_vec_pretty(&manifest)?)?;
    Ok(())
}

/// Save a bundle, replacing whatever is at `location`
///
/// The new artifact is written to a sibling staging directory and renamed
/// into place, so readers never see a half-written set.
pub fn save_model(location: &Path, bundle: &ModelBundle) -> Result<()> {
    // Refuse to write what load would reject
    if let Some(scaler) = &bundle.scaler {
        scaler.validate()?;
        if scaler.dimensionality() != bundle.dimensionality {
            return Err(DetectorError::invalid_config(format!(
                "scaler covers {} features, model declares {}",
                scaler.dimensionality(),
                bundle.dimensionality
            )));
        }
    }

    if let Some(parent) = location.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let staging = sibling(location, "tmp")?;
    if let Err(e) = write_staging(&staging, bundle) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    // Move previous content aside, then swap in the new set
    let backup = if location.exists() {
        let backup = sibling(location, "old")?;
        if let Err(e) = fs::rename(location, &backup) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(&staging, location) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, location);
        }
        let _ = fs::remove_dir_all(&staging);
        return Err(e.into());
    }

    if let Some(backup) = backup {
        if let Err(e) = remove_path(&backup) {
            log::warn!("Failed to remove previous artifact {}: {}", backup.display(), e);
        }
    }

    log::info!(
        "Saved {} model (D={}, threshold {:.6}) to {}",
        bundle.architecture.name(),
        bundle.dimensionality,
        bundle.threshold.value,
        location.display()
    );
    Ok(())
}

fn read_artifact_file(location: &Path, name: &str) -> Result<Vec<u8>> {
    let path = location.join(name);
    match fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DetectorError::NotFound(location.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse<T: serde::de::DeserializeOwned>(bytes: &[u8], name: &str) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| DetectorError::corrupt(format!("{} is unreadable: {}", name, e)))
}

fn ensure_complete(location: &Path) -> Result<()> {
    if !location.is_dir() || ARTIFACT_FILES.iter().any(|f| !location.join(f).is_file()) {
        return Err(DetectorError::NotFound(location.to_path_buf()));
    }
    Ok(())
}

/// Read only the manifest
pub fn read_manifest(location: &Path) -> Result<Manifest> {
    ensure_complete(location)?;
    parse(&read_artifact_file(location, MANIFEST_FILE)?, MANIFEST_FILE)
}

/// Load and validate a complete artifact
pub fn load_model(location: &Path) -> Result<ModelBundle> {
    ensure_complete(location)?;

    let manifest: Manifest = parse(&read_artifact_file(location, MANIFEST_FILE)?, MANIFEST_FILE)?;
    let weights_bytes = read_artifact_file(location, WEIGHTS_FILE)?;
    let weights: WeightsFile = parse(&weights_bytes, WEIGHTS_FILE)?;
    let threshold_bytes = read_artifact_file(location, THRESHOLD_FILE)?;
    let threshold: Threshold = parse(&threshold_bytes, THRESHOLD_FILE)?;

    validate_artifact(&manifest, &weights_bytes, &threshold_bytes, &weights.tensors, &threshold)?;

    log::info!(
        "Loaded {} model {} (D={}, threshold {:.6}) from {}",
        manifest.architecture.name(),
        manifest.id,
        manifest.dimensionality,
        threshold.value,
        location.display()
    );

    Ok(ModelBundle {
        dimensionality: manifest.dimensionality,
        architecture: manifest.architecture,
        layout: manifest.layout,
        scaler: manifest.scaler,
        threshold,
        tensors: weights.tensors,
        training: manifest.training,
    })
}
