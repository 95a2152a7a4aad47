use sha2::{Digest, Sha256};

use crate::constants::ARTIFACT_FORMAT_VERSION;
use crate::logic::error::{DetectorError, Result};
use crate::logic::model::{Autoencoder, Tensor, Threshold};
use super::types::Manifest;

/// Hex SHA-256 of a byte slice
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Validate that manifest, weights and threshold describe one model
pub fn validate_artifact(
    manifest: &Manifest,
    weights_bytes: &[u8],
    threshold_bytes: &[u8],
    tensors: &[Tensor],
    threshold: &Threshold,
) -> Result<()> {
    if manifest.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(DetectorError::corrupt(format!(
            "unsupported artifact format v{} (expected v{})",
            manifest.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let actual = checksum(weights_bytes);
    if actual != manifest.weights_sha256 {
        return Err(DetectorError::corrupt(format!(
            "weights checksum mismatch: manifest {}, file {}",
            manifest.weights_sha256, actual
        )));
    }

    let actual = checksum(threshold_bytes);
    if actual != manifest.threshold_sha256 {
        return Err(DetectorError::corrupt(format!(
            "threshold checksum mismatch: manifest {}, file {}",
            manifest.threshold_sha256, actual
        )));
    }

    if manifest.layout.dimensionality() != manifest.dimensionality {
        return Err(DetectorError::corrupt(format!(
            "layout has {} features, model declares {}",
            manifest.layout.dimensionality(),
            manifest.dimensionality
        )));
    }
    if manifest.layout.layout_hash() != manifest.layout_hash {
        return Err(DetectorError::corrupt(format!(
            "layout hash {:08x} does not match recorded {:08x}",
            manifest.layout.layout_hash(),
            manifest.layout_hash
        )));
    }

    if let Some(scaler) = &manifest.scaler {
        scaler
            .validate()
            .map_err(|e| DetectorError::corrupt(e.to_string()))?;
        if scaler.dimensionality() != manifest.dimensionality {
            return Err(DetectorError::corrupt(format!(
                "scaler covers {} features, model declares {}",
                scaler.dimensionality(),
                manifest.dimensionality
            )));
        }
    }

    if !(threshold.value.is_finite() && threshold.value >= 0.0) {
        return Err(DetectorError::corrupt(format!(
            "threshold {} is not a valid reconstruction error",
            threshold.value
        )));
    }

    // Parameters must fit the declared dimensionality and architecture
    Autoencoder::from_tensors(
        manifest.dimensionality,
        manifest.architecture.clone(),
        tensors,
    )
    .map_err(|e| match e {
        DetectorError::InvalidConfig(msg) => DetectorError::corrupt(msg),
        other => other,
    })?;

    Ok(())
}
