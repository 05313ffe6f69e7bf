use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AutoQuizError, AutoQuizResult};

const SLICE_MS: u64 = 50;

/// Fixed-delay sleeps that observe external cancellation.
///
/// Every wait in a run goes through here, so a raised stop flag is noticed
/// within one slice no matter which step is sleeping.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    stop_flag: Arc<AtomicBool>,
}

impl Pacer {
    pub fn cancel(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> AutoQuizResult<()> {
        if self.is_cancelled() {
            Err(AutoQuizError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub async fn sleep_ms(&self, ms: u64) -> AutoQuizResult<()> {
        self.check()?;
        let mut remaining = ms;
        while remaining > 0 {
            let slice = remaining.min(SLICE_MS);
            tokio::time::sleep(Duration::from_millis(slice)).await;
            remaining -= slice;
            self.check()?;
        }
        Ok(())
    }
}

/// Decides when a batch stops: question limit reached or run cancelled.
pub struct LoopController {
    max_questions: u32,
    answered: u32,
    pacer: Pacer,
}

impl LoopController {
    pub fn new(max_questions: u32, pacer: Pacer) -> Self {
        Self {
            max_questions,
            answered: 0,
            pacer,
        }
    }

    pub fn record_attempt(&mut self) {
        self.answered += 1;
    }

    pub fn should_stop(&self) -> bool {
        self.answered >= self.max_questions || self.pacer.is_cancelled()
    }

    pub fn remaining(&self) -> u32 {
        self.max_questions.saturating_sub(self.answered)
    }
}
