use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::types::LetterPrior;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::executor::targets::Layouts;
use crate::perception::types::Region;

pub const CONFIG_FILE_NAME: &str = "autoquiz.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub layouts: Layouts,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_questions")]
    pub max_questions: u32,
    /// Pause between two questions.
    #[serde(default = "default_inter_question_ms")]
    pub inter_question_ms: u64,
    /// Seconds to wait before the first question so the user can focus the exam window.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,
    #[serde(default)]
    pub debug_screenshots: bool,
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
    /// Append attempt records to a JSONL file under `data_dir`.
    #[serde(default = "default_true")]
    pub history: bool,
    /// Falls back to the platform data directory when absent.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_max_questions() -> u32 {
    30
}

fn default_inter_question_ms() -> u64 {
    2500
}

fn default_countdown_secs() -> u64 {
    5
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug_screenshots")
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            inter_question_ms: default_inter_question_ms(),
            countdown_secs: default_countdown_secs(),
            debug_screenshots: false,
            debug_dir: default_debug_dir(),
            history: true,
            data_dir: None,
        }
    }
}

impl RunConfig {
    /// `<data dir>/AutoQuiz`, or the working directory when no platform dir exists.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("AutoQuiz"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Screen areas read before the full-screen pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub question_region: Region,
    pub options_region: Region,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            question_region: Region::new(200, 200, 1200, 300),
            options_region: Region::new(200, 300, 1200, 500),
        }
    }
}

/// Delays around pointer and keyboard actions, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Duration of an animated pointer move.
    pub move_ms: u64,
    /// Number of intermediate pointer positions per move.
    pub move_steps: u32,
    pub pre_click_ms: u64,
    pub click_settle_ms: u64,
    pub drag_ms: u64,
    pub select_all_ms: u64,
    pub after_type_ms: u64,
    /// Wait between two words of a phrase reconstruction.
    pub word_wait_ms: u64,
    /// Wait between a successful answer and the submit action.
    pub answer_settle_ms: u64,
    pub after_submit_ms: u64,
    /// Capture before/after images around each target.
    pub validate: bool,
    /// Side of the square window captured around a target.
    pub validation_window: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            move_ms: 200,
            move_steps: 10,
            pre_click_ms: 200,
            click_settle_ms: 500,
            drag_ms: 800,
            select_all_ms: 200,
            after_type_ms: 500,
            word_wait_ms: 800,
            answer_settle_ms: 1000,
            after_submit_ms: 1500,
            validate: true,
            validation_window: 60,
        }
    }
}

impl TimingConfig {
    /// Every delay set to zero. Used by tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            move_ms: 0,
            move_steps: 1,
            pre_click_ms: 0,
            click_settle_ms: 0,
            drag_ms: 0,
            select_all_ms: 0,
            after_type_ms: 0,
            word_wait_ms: 0,
            answer_settle_ms: 0,
            after_submit_ms: 0,
            ..Self::default()
        }
    }
}

/// Thresholds for the visual layout fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub button_min_area: u64,
    pub button_max_area: u64,
    pub button_min_aspect: f64,
    pub button_max_aspect: f64,
    pub input_min_width: u32,
    pub input_min_height: u32,
    pub input_max_height: u32,
    pub input_min_aspect: f64,
    pub input_max_aspect: f64,
    /// Maximum vertical offset between two buttons on the same row.
    pub align_tolerance: u32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            button_min_area: 500,
            button_max_area: 10_000,
            button_min_aspect: 0.2,
            button_max_aspect: 5.0,
            input_min_width: 100,
            input_min_height: 20,
            input_max_height: 60,
            input_min_aspect: 3.0,
            input_max_aspect: 15.0,
            align_tolerance: 50,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Confidence of `True` when no negative word is present.
    pub true_prior: f64,
    pub false_confidence: f64,
    /// Letter frequencies used when no category rule fires.
    pub letter_prior: LetterPrior,
    pub letter_fallback_confidence: f64,
    pub matching_confidence: f64,
    /// Phrase to rebuild for word-reordering questions.
    pub expected_phrase: Option<String>,
    /// Known answer for true/false, multiple-choice or fill-in questions,
    /// written the way a person would (`vrai`, `B)`, `notice`).
    pub expected_answer: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            true_prior: 0.7,
            false_confidence: 0.8,
            letter_prior: LetterPrior::default(),
            letter_fallback_confidence: 0.6,
            matching_confidence: 0.3,
            expected_phrase: None,
            expected_answer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub binary: String,
    pub language: String,
    /// Tokens at or below this confidence are dropped.
    pub min_confidence: u8,
    pub upscale: u32,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".into(),
            language: "eng".into(),
            min_confidence: 30,
            upscale: 2,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// No check. Development only.
    Disabled,
    #[default]
    License,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub mode: AuthorizationMode,
    pub app_name: String,
    /// Directory holding the license file. Defaults to the data directory.
    pub license_dir: Option<PathBuf>,
    pub license_file: String,
    /// Approval servers, asked in order.
    pub servers: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            mode: AuthorizationMode::License,
            app_name: "AutoQuiz".into(),
            license_dir: None,
            license_file: "license.dat".into(),
            servers: Vec::new(),
            timeout_secs: 5,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// An explicit path wins; otherwise look next to the executable, then in the
/// working directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> AutoQuizResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(AutoQuizError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(Some(candidate));
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(Some(candidate));
    }

    Ok(None)
}

pub fn load_config(explicit: Option<&Path>) -> AutoQuizResult<AppConfig> {
    let Some(path) = resolve_config_path(explicit)? else {
        tracing::warn!("{CONFIG_FILE_NAME} not found, running with built-in defaults");
        return Ok(AppConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> AutoQuizResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        max_questions = config.run.max_questions,
        auth = ?config.authorization.mode,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> AutoQuizResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.run.max_questions, 30);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.planner.true_prior, 0.7);
        assert!(config.layouts.tables.len() >= 7);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [run]
            max_questions = 5

            [timing]
            move_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.run.max_questions, 5);
        assert_eq!(config.run.inter_question_ms, 2500);
        assert_eq!(config.timing.move_ms, 0);
        assert_eq!(config.timing.click_settle_ms, 500);
    }

    #[test]
    fn saved_template_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.planner.expected_phrase = Some("the quick brown fox".into());
        config.planner.expected_answer = Some("B)".into());
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.planner, config.planner);
        assert_eq!(loaded.layouts, config.layouts);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/autoquiz.toml"))).unwrap_err();
        assert!(matches!(err, AutoQuizError::Config(_)));
    }
}
