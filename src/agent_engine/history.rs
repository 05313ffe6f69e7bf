use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::AutoQuizResult;

/// One line of the attempt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub session_id: String,
    pub question: u32,
    pub ts: i64,
    pub question_type: Option<String>,
    pub answer: Option<String>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub rule: Option<String>,
    pub source: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Append-only JSONL log of attempts, one file per session. Never read back
/// by the run itself.
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
}

impl SessionHistory {
    /// `<data_dir>/sessions/session_<uuid>.jsonl`
    pub fn new(data_dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = data_dir
            .join("sessions")
            .join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            file_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, record: &AttemptRecord) -> AutoQuizResult<()> {
        if let Some(dir) = self.file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        tracing::debug!(path = %self.file_path.display(), question = record.question, "attempt recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &str, question: u32, success: bool) -> AttemptRecord {
        AttemptRecord {
            session_id: session.into(),
            question,
            ts: 0,
            question_type: Some("true_false".into()),
            answer: Some("true".into()),
            confidence: Some(0.7),
            reasoning: Some("prior".into()),
            rule: Some("strong_candidate".into()),
            source: Some("combined".into()),
            success,
            error: None,
        }
    }

    #[test]
    fn records_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let history = SessionHistory::new(dir.path());
        history.append(&record(&history.session_id, 1, true)).unwrap();
        history.append(&record(&history.session_id, 2, false)).unwrap();

        let name = history.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("session_{}.jsonl", history.session_id));

        let content = std::fs::read_to_string(history.path()).unwrap();
        let lines: Vec<AttemptRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].question, 2);
        assert!(!lines[1].success);
    }
}
