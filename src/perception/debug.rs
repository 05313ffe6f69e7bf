use std::path::{Path, PathBuf};

use crate::errors::AutoQuizResult;
use crate::perception::types::ScreenImage;

/// `question_{NN}_{unix_ts}.png`
pub fn snapshot_name(question_index: u32, unix_ts: i64) -> String {
    format!("question_{question_index:02}_{unix_ts}.png")
}

fn write_snapshot(dir: &Path, question_index: u32, image: &ScreenImage) -> AutoQuizResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(snapshot_name(question_index, chrono::Utc::now().timestamp()));
    image.pixels().save(&path)?;
    Ok(path)
}

/// Best effort: a failed write is logged and otherwise ignored.
pub fn save_snapshot(dir: &Path, question_index: u32, image: &ScreenImage) -> Option<PathBuf> {
    match write_snapshot(dir, question_index, image) {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "debug screenshot saved");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, dir = %dir.display(), "debug screenshot not saved");
            None
        }
    }
}
