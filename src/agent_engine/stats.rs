use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::types::QuestionType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub attempted: u32,
    pub successful: u32,
}

/// Counters for one batch. Written only by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub attempted: u32,
    pub successful: u32,
    pub per_type: BTreeMap<QuestionType, TypeCounts>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            attempted: 0,
            successful: 0,
            per_type: BTreeMap::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn record(&mut self, kind: QuestionType, success: bool) {
        self.attempted += 1;
        let counts = self.per_type.entry(kind).or_default();
        counts.attempted += 1;
        if success {
            self.successful += 1;
            counts.successful += 1;
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Percentage in `[0, 100]`; zero when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.successful as f64 * 100.0 / self.attempted as f64
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} / {} questions answered ({:.1}%) in {}s",
            self.successful,
            self.attempted,
            self.success_rate(),
            self.duration().num_seconds()
        );
        for (kind, counts) in &self.per_type {
            out.push_str(&format!("\n  {kind}: {}/{}", counts.successful, counts.attempted));
        }
        out
    }
}
