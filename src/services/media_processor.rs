//! Video post-processing: face-centered cropping
//!
//! Runs entirely off the request path. Detection picks the largest face in
//! a probe frame; ffmpeg does the actual cropping. Every failure is logged
//! and swallowed, leaving the cropped path unset.

use crate::error::{Error, Result};
use crate::services::frame_analyzer::FrameAnalyzer;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Crop `src` to a padded window around the largest detected face, writing
/// `dst`. Returns false when no face is found and the original is kept.
pub async fn crop_to_face(analyzer: &FrameAnalyzer, src: &Path, dst: &Path) -> Result<bool> {
    if !src.exists() {
        return Err(Error::NotFound(format!(
            "Recording not found: {}",
            src.display()
        )));
    }

    let probe_path = probe_frame(src).await?;
    let frame = image::open(&probe_path)
        .map_err(|e| Error::Internal(format!("Could not decode probe frame: {}", e)))?;
    let _ = std::fs::remove_file(&probe_path);

    let Some(face) = analyzer.largest_face(&frame) else {
        info!("No face detected for cropping, keeping original recording");
        return Ok(false);
    };

    // 50% padding on each side, clamped to the frame
    let (frame_w, frame_h) = (frame.width(), frame.height());
    let pad_w = face.width / 2;
    let pad_h = face.height / 2;
    let crop_x = face.x.saturating_sub(pad_w);
    let crop_y = face.y.saturating_sub(pad_h);
    let crop_w = (face.width + 2 * pad_w).min(frame_w - crop_x);
    let crop_h = (face.height + 2 * pad_h).min(frame_h - crop_y);

    let filter = format!("crop={}:{}:{}:{}", crop_w, crop_h, crop_x, crop_y);
    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(src)
        .args(["-vf", &filter, "-c:a", "copy"])
        .arg(dst)
        .output()
        .await
        .map_err(|e| Error::Internal(format!("ffmpeg not runnable: {}", e)))?;

    if !status.status.success() {
        return Err(Error::Internal(format!(
            "ffmpeg crop failed with status {}",
            status.status
        )));
    }

    info!("Cropped recording saved to {}", dst.display());
    Ok(true)
}

/// Extract a single frame roughly one second in
async fn probe_frame(src: &Path) -> Result<PathBuf> {
    let probe_path = std::env::temp_dir().join(format!("hireflow-probe-{}.png", uuid::Uuid::new_v4()));

    let output = Command::new("ffmpeg")
        .args(["-y", "-ss", "1", "-i"])
        .arg(src)
        .args(["-frames:v", "1"])
        .arg(&probe_path)
        .output()
        .await
        .map_err(|e| Error::Internal(format!("ffmpeg not runnable: {}", e)))?;

    if !output.status.success() || !probe_path.exists() {
        return Err(Error::Internal(format!(
            "ffmpeg frame extraction failed with status {}",
            output.status
        )));
    }
    Ok(probe_path)
}

/// Fire-and-forget wrapper: spawn the crop, record the cropped path on
/// success, only log on failure. The interview flow never sees the outcome.
pub fn spawn_crop(
    pool: sqlx::SqlitePool,
    analyzer: FrameAnalyzer,
    answer_id: uuid::Uuid,
    src: PathBuf,
    dst: PathBuf,
) {
    tokio::spawn(async move {
        match crop_to_face(&analyzer, &src, &dst).await {
            Ok(true) => {
                if let Err(e) =
                    crate::db::answers::set_cropped_path(&pool, answer_id, &dst.to_string_lossy())
                        .await
                {
                    warn!(answer_id = %answer_id, "Failed to record cropped path: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!(answer_id = %answer_id, "Recording crop failed: {}", e);
            }
        }
    });
}
