use std::sync::Arc;

use serde::Serialize;

use crate::agent_engine::history::{AttemptRecord, SessionHistory};
use crate::agent_engine::loop_control::{LoopController, Pacer};
use crate::agent_engine::state::{AttemptState, AttemptTracker};
use crate::agent_engine::stats::RunStatistics;
use crate::analysis::classifier::QuestionClassifier;
use crate::analysis::combine::{combine, AnswerDecision};
use crate::analysis::knowledge::KnowledgeBase;
use crate::analysis::planner::{AnswerPlanner, PlanHints};
use crate::analysis::types::{AnswerValue, QuestionType, Source};
use crate::auth::Authorization;
use crate::config::AppConfig;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::executor::driver::{Action, InteractionDriver};
use crate::executor::input::InputDevice;
use crate::executor::resolver::TargetResolver;
use crate::perception::debug::save_snapshot;
use crate::perception::traits::{ScreenSource, TextExtractor};
use crate::perception::types::{ExtractMode, ScreenImage};

/// Platform-facing pieces handed to the orchestrator.
pub struct Collaborators {
    pub screen: Arc<dyn ScreenSource>,
    pub extractor: Arc<dyn TextExtractor>,
    pub input: Box<dyn InputDevice>,
    pub authorization: Box<dyn Authorization>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed,
    Cancelled,
    AuthorizationDenied,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub statistics: RunStatistics,
    /// Percentage in `[0, 100]`.
    pub success_rate: f64,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        format!("outcome: {:?}\n{}", self.outcome, self.statistics.summary())
    }
}

/// Runs questions one after another: capture, read, classify, plan, combine,
/// resolve, interact, submit. Sole writer of the run statistics.
pub struct AnswerOrchestrator {
    config: AppConfig,
    screen: Arc<dyn ScreenSource>,
    extractor: Arc<dyn TextExtractor>,
    authorization: Box<dyn Authorization>,
    driver: InteractionDriver,
    classifier: QuestionClassifier,
    planner: AnswerPlanner,
    knowledge: KnowledgeBase,
    resolver: TargetResolver,
    pacer: Pacer,
    stats: RunStatistics,
    history: Option<SessionHistory>,
}

impl AnswerOrchestrator {
    pub fn new(config: AppConfig, collaborators: Collaborators, pacer: Pacer) -> Self {
        let Collaborators {
            screen,
            extractor,
            input,
            authorization,
        } = collaborators;
        let driver = InteractionDriver::new(input, screen.clone(), config.timing.clone(), pacer.clone());
        let history = config
            .run
            .history
            .then(|| SessionHistory::new(&config.run.resolved_data_dir()));
        if let Some(h) = &history {
            tracing::info!(session = %h.session_id, path = %h.path().display(), "attempt history enabled");
        }
        Self {
            classifier: QuestionClassifier::new(config.classifier.clone()),
            planner: AnswerPlanner::new(config.planner.clone()),
            knowledge: KnowledgeBase::default(),
            resolver: TargetResolver::new(config.layouts.clone()),
            config,
            screen,
            extractor,
            authorization,
            driver,
            pacer,
            stats: RunStatistics::new(),
            history,
        }
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    // ── Batch ───────────────────────────────────────────────────────────────

    /// Authorization is checked once up front. Cancellation ends the loop at
    /// the next sleep point and still yields the partial statistics, as does
    /// any other error a question cannot recover from.
    pub async fn run_batch(&mut self, max_questions: u32) -> BatchReport {
        self.stats = RunStatistics::new();

        if !self.authorization.is_authorized().await {
            tracing::error!("run not authorized, no question attempted");
            return self.report(BatchOutcome::AuthorizationDenied);
        }

        tracing::info!(max_questions, "batch started");
        let mut control = LoopController::new(max_questions, self.pacer.clone());
        let mut index = 0;
        let mut halted = None;
        while !control.should_stop() {
            index += 1;
            let result = self.answer_one(index).await;
            control.record_attempt();

            if let Err(e) = result {
                halted = Some(e);
                break;
            }
            if control.should_stop() {
                break;
            }
            tracing::debug!(remaining = control.remaining(), "waiting for next question");
            if self.pacer.sleep_ms(self.config.run.inter_question_ms).await.is_err() {
                break;
            }
        }

        let outcome = match halted {
            Some(AutoQuizError::AuthorizationDenied(reason)) => {
                tracing::error!(reason = %reason, "authorization withdrawn during batch");
                BatchOutcome::AuthorizationDenied
            }
            _ if self.pacer.is_cancelled() => {
                tracing::warn!(attempted = self.stats.attempted, "batch cancelled");
                BatchOutcome::Cancelled
            }
            Some(e) => {
                tracing::error!(error = %e, "batch halted");
                BatchOutcome::Completed
            }
            None => BatchOutcome::Completed,
        };
        self.report(outcome)
    }

    fn report(&mut self, outcome: BatchOutcome) -> BatchReport {
        self.stats.finish();
        tracing::info!(
            outcome = ?outcome,
            attempted = self.stats.attempted,
            successful = self.stats.successful,
            rate = self.stats.success_rate(),
            "batch finished"
        );
        BatchReport {
            success_rate: self.stats.success_rate(),
            statistics: self.stats.clone(),
            outcome,
        }
    }

    // ── Single question ─────────────────────────────────────────────────────

    /// Every attempt is recorded, failed or not. Returns whether it succeeded;
    /// an error that is not recoverable is returned after recording so the
    /// batch can end. A question that never got a decision counts as `Unknown`.
    pub async fn answer_one(&mut self, index: u32) -> AutoQuizResult<bool> {
        let mut tracker = AttemptTracker::new(index);
        let mut decision = None;
        let result = self.attempt(index, &mut tracker, &mut decision).await;

        let kind = decision
            .as_ref()
            .map(|d: &AnswerDecision| d.question_type)
            .unwrap_or(QuestionType::Unknown);
        let success = match &result {
            Ok(()) => true,
            Err(e) => {
                let failed_at = tracker.state();
                tracker.fail();
                tracing::warn!(question = index, kind = %kind, step = ?failed_at, error = %e, "question failed");
                false
            }
        };
        self.stats.record(kind, success);
        tracing::info!(
            question = index,
            kind = %kind,
            state = ?tracker.state(),
            rate = %format!("{:.1}%", self.stats.success_rate()),
            "question done"
        );
        self.write_history(index, decision.as_ref(), result.as_ref().err());
        match result {
            Err(e) if !e.is_recoverable() => Err(e),
            _ => Ok(success),
        }
    }

    async fn attempt(
        &mut self,
        index: u32,
        tracker: &mut AttemptTracker,
        decided: &mut Option<AnswerDecision>,
    ) -> AutoQuizResult<()> {
        let image = self.screen.capture(None).await?;
        if self.config.run.debug_screenshots {
            save_snapshot(&self.config.run.debug_dir, index, &image);
        }

        tracker.advance_to(AttemptState::Classifying);
        let text = self.read_question(&image).await;
        let classification = self.classifier.classify(Some(&image), &text);
        tracing::debug!(
            question = index,
            kind = %classification.question_type,
            confidence = classification.confidence,
            source = ?classification.source,
            "question classified"
        );

        tracker.advance_to(AttemptState::Planning);
        let hints = PlanHints {
            expected_phrase: self.config.planner.expected_phrase.clone(),
            expected_answer: self.config.planner.expected_answer.clone(),
        };
        let candidate = match self.planner.plan(&classification, &text, &self.knowledge, &hints) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::debug!(question = index, error = %e, "no planned answer");
                None
            }
        };
        let decision = combine(&classification, candidate.as_ref());
        tracing::info!(
            question = index,
            kind = %decision.question_type,
            answer = %decision.value,
            confidence = decision.confidence,
            rule = ?decision.rule,
            source = ?Source::Combined,
            "answer decided"
        );
        *decided = Some(decision.clone());

        tracker.advance_to(AttemptState::Resolving);
        let done = match &decision.value {
            AnswerValue::Bool(_) | AnswerValue::Letter(_) => {
                let targets = self.resolver.resolve_fixed(&decision.value)?;
                tracker.advance_to(AttemptState::Interacting);
                self.driver.try_all(&targets, Action::Click).await?
            }
            AnswerValue::FreeText(answer) => {
                let fields = self.classifier.layout().analyze(&image).inputs;
                let targets = self.resolver.resolve_fill_blank(&fields)?;
                tracker.advance_to(AttemptState::Interacting);
                self.driver.try_all(&targets, Action::Type(answer)).await?
            }
            AnswerValue::WordSequence(words) => {
                tracker.advance_to(AttemptState::Interacting);
                self.click_words(words).await?
            }
            AnswerValue::Pairs(pairs) => {
                let drags = self.resolver.resolve_matching(pairs)?;
                tracker.advance_to(AttemptState::Interacting);
                self.driver.drag_all(&drags).await?
            }
        };
        if !done {
            return Err(AutoQuizError::InteractionFailed(format!(
                "every target for {} failed",
                decision.value
            )));
        }

        tracker.advance_to(AttemptState::Validating);
        self.pacer.sleep_ms(self.config.timing.answer_settle_ms).await?;
        self.submit().await?;
        self.pacer.sleep_ms(self.config.timing.after_submit_ms).await?;
        tracker.advance_to(AttemptState::Succeeded);
        Ok(())
    }

    /// Question area, options area and full screen, non-empty results joined.
    async fn read_question(&self, image: &ScreenImage) -> String {
        let capture = &self.config.capture;
        let mut parts = Vec::new();
        for region in [capture.question_region, capture.options_region] {
            match image.crop(region) {
                Some(part) => parts.push(self.extractor.extract_text(&part, ExtractMode::Block).await),
                None => tracing::debug!(region = ?region, "text region outside capture"),
            }
        }
        parts.push(self.extractor.extract_text(image, ExtractMode::Block).await);

        let text = parts
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            tracing::warn!("no text extracted, falling back to layout");
        }
        text
    }

    /// Each word is looked up on a fresh capture since clicking one moves the
    /// others. Stops at the first word that cannot be found.
    async fn click_words(&mut self, words: &[String]) -> AutoQuizResult<bool> {
        for word in words {
            let image = self.screen.capture(None).await?;
            let tokens = self.extractor.extract_tokens(&image).await;
            let target = self.resolver.locate_word(word, &tokens)?;
            if !self.driver.try_all(std::slice::from_ref(&target), Action::Click).await? {
                return Err(AutoQuizError::InteractionFailed(format!("could not click '{word}'")));
            }
            tracing::debug!(word = %word, point = %target.point, "word placed");
            self.pacer.sleep_ms(self.config.timing.word_wait_ms).await?;
        }
        Ok(!words.is_empty())
    }

    /// A missed submit button is logged; the answer itself already went in.
    async fn submit(&mut self) -> AutoQuizResult<()> {
        let targets = self.resolver.resolve_submit()?;
        if !self.driver.try_all(&targets, Action::Click).await? {
            tracing::warn!("no submit position accepted the click");
        }
        Ok(())
    }

    fn write_history(&self, index: u32, decision: Option<&AnswerDecision>, error: Option<&AutoQuizError>) {
        let Some(history) = &self.history else {
            return;
        };
        let record = AttemptRecord {
            session_id: history.session_id.clone(),
            question: index,
            ts: chrono::Utc::now().timestamp(),
            question_type: decision.map(|d| d.question_type.to_string()),
            answer: decision.map(|d| d.value.to_string()),
            confidence: decision.map(|d| d.confidence),
            reasoning: decision.map(|d| d.reasoning.clone()),
            rule: decision.and_then(|d| serde_json::to_value(d.rule).ok()?.as_str().map(String::from)),
            source: decision.map(|_| "combined".to_string()),
            success: error.is_none(),
            error: error.map(|e| e.kind().to_string()),
        };
        if let Err(e) = history.append(&record) {
            tracing::warn!(error = %e, "attempt history not written");
        }
    }
}
