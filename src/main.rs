//! AutoQuiz command line.
//!
//! ```bash
//! autoquiz run --max-questions 20
//! autoquiz machine-id
//! autoquiz activate --secret S --code 12345678
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use autoquiz::agent_engine::loop_control::Pacer;
use autoquiz::agent_engine::orchestrator::{AnswerOrchestrator, BatchOutcome, Collaborators};
use autoquiz::auth::{self, LicenseAuthorization};
use autoquiz::config::{self, AppConfig, CONFIG_FILE_NAME};
use autoquiz::executor::input::EnigoInput;
use autoquiz::perception::ocr::TesseractExtractor;
use autoquiz::perception::screenshot::XcapScreen;

#[derive(Parser)]
#[command(name = "autoquiz")]
#[command(version)]
#[command(about = "Answers on-screen quiz questions by clicking and typing")]
struct Args {
    /// Configuration file (default: autoquiz.toml next to the executable, then in the working directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer questions until the limit or Ctrl+C
    Run {
        #[arg(long, value_name = "N")]
        max_questions: Option<u32>,

        /// Skip the authorization check
        #[arg(long)]
        disable_security: bool,

        /// Seconds to switch to the quiz window before the first question
        #[arg(long, value_name = "SECS")]
        countdown: Option<u64>,
    },
    /// Print this machine's fingerprint
    MachineId,
    /// Print the activation code for this machine
    ActivationCode {
        #[arg(long, env = "AUTOQUIZ_MASTER_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Write the license file when the code matches this machine
    Activate {
        #[arg(long, env = "AUTOQUIZ_MASTER_SECRET", hide_env_values = true)]
        secret: String,

        #[arg(long)]
        code: String,
    },
    /// Write a default configuration file
    InitConfig {
        #[arg(long, value_name = "PATH", default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    autoquiz::init_tracing(args.debug);

    match args.command {
        Command::InitConfig { output } => {
            config::save_config(&AppConfig::default(), &output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
        Command::MachineId => {
            println!("{}", auth::license::machine_fingerprint());
        }
        Command::ActivationCode { secret } => {
            let fingerprint = auth::license::machine_fingerprint();
            println!("{}", auth::license::activation_code(&fingerprint, &secret));
        }
        Command::Activate { secret, code } => {
            let config = config::load_config(args.config.as_deref())?;
            let license = LicenseAuthorization::from_config(&config.authorization, &config.run);
            let record = license.activate(&secret, &code).context("activation failed")?;
            println!(
                "License activated for {}@{} ({})",
                record.username,
                record.computer_name,
                license.path().display()
            );
        }
        Command::Run {
            max_questions,
            disable_security,
            countdown,
        } => {
            let config = config::load_config(args.config.as_deref())?;
            run(config, max_questions, disable_security, countdown).await?;
        }
    }
    Ok(())
}

async fn run(
    config: AppConfig,
    max_questions: Option<u32>,
    disable_security: bool,
    countdown: Option<u64>,
) -> anyhow::Result<()> {
    let max_questions = max_questions.unwrap_or(config.run.max_questions);
    let countdown = countdown.unwrap_or(config.run.countdown_secs);

    let pacer = Pacer::default();
    let stop = pacer.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, stopping after the current step");
            stop.cancel();
        }
    });

    let collaborators = Collaborators {
        screen: Arc::new(XcapScreen::new()),
        extractor: Arc::new(TesseractExtractor::new(config.ocr.clone())),
        input: Box::new(EnigoInput::new().context("input device unavailable")?),
        authorization: auth::from_config(&config.authorization, &config.run, disable_security),
    };

    for remaining in (1..=countdown).rev() {
        println!("Starting in {remaining}s, switch to the quiz window...");
        if pacer.sleep_ms(1000).await.is_err() {
            println!("Cancelled before start");
            return Ok(());
        }
    }

    let mut orchestrator = AnswerOrchestrator::new(config, collaborators, pacer);
    let report = orchestrator.run_batch(max_questions).await;
    println!("{}", report.summary());

    if report.outcome == BatchOutcome::AuthorizationDenied {
        anyhow::bail!("this machine is not authorized; run `autoquiz activate` first");
    }
    Ok(())
}
