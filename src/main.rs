use anyhow::{bail, Context, Result};
use clap::Parser;
use dexpara_lib::models::progress::SessionId;
use dexpara_lib::pipeline::{PipelineInput, PipelineOutcome, PipelineRunner, DEFAULT_MIN_SCORE};
use dexpara_lib::progress::poller::{ProgressEvent, ProgressPoller};
use dexpara_lib::progress::tracker::ProgressTracker;
use dexpara_lib::refine::ollama::OllamaRanker;
use dexpara_lib::refine::refiner::Refiner;
use dexpara_lib::utils::config::AppConfig;
use dexpara_lib::utils::env::load_env;
use dexpara_lib::utils::input::{load_rows, load_workbook, parse_weights};
use dexpara_lib::utils::logging::join_logged;
use dexpara_lib::WeightVector;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Reconciles DE URLs against RASTREIO URLs and writes a JSON match report.
#[derive(Parser, Debug)]
#[command(name = "dexpara", version, about)]
struct Args {
    /// JSON array of DE rows
    #[arg(long, requires = "rast", conflicts_with = "workbook")]
    de: Option<PathBuf>,

    /// JSON array of RASTREIO rows
    #[arg(long, requires = "de", conflicts_with = "workbook")]
    rast: Option<PathBuf>,

    /// JSON object holding both sheets: {"DE": [...], "RASTREIO": [...]}
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Comma-separated slug,title,description,h1 weights
    #[arg(long)]
    weights: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    min_score: f64,

    #[arg(long, default_value = "dexpara_result.json")]
    output: PathBuf,

    /// Skip AI refinement; similarity scores are final
    #[arg(long)]
    no_ai: bool,

    /// Check the Ollama connection and exit
    #[arg(long)]
    test_ranker: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting DE x RASTREIO reconciliation");
    load_env();

    let args = Args::parse();
    let config = AppConfig::from_env();
    config.log_config();

    let ranker = Arc::new(OllamaRanker::new(config.ranker.clone()).context("Failed to set up AI ranker")?);

    if args.test_ranker {
        let status = ranker.test_connection().await;
        if status.success {
            info!("✅ {}", status.message);
            return Ok(());
        }
        bail!("{}", status.message);
    }

    let (de_rows, rast_rows) = match (&args.workbook, &args.de, &args.rast) {
        (Some(workbook), _, _) => load_workbook(workbook)?,
        (None, Some(de), Some(rast)) => (load_rows(de)?, load_rows(rast)?),
        _ => bail!("Provide either --workbook or both --de and --rast"),
    };
    let weights = match &args.weights {
        Some(raw) => WeightVector::from_slice(&parse_weights(raw)?)?,
        None => WeightVector::default(),
    };
    info!(
        "Loaded {} DE rows and {} RASTREIO rows, weights {:?}, minScore {}",
        de_rows.len(),
        rast_rows.len(),
        weights.as_array(),
        args.min_score
    );

    let refiner = if args.no_ai {
        info!("AI refinement skipped (--no-ai)");
        None
    } else {
        Some(Refiner::new(ranker, config.refiner.clone()))
    };

    let tracker = ProgressTracker::new();
    let runner = PipelineRunner::new(tracker.clone(), refiner, config.matching.workers);
    let session_id = SessionId::generate();

    let progress_task = if config.progress.enabled {
        let poller = ProgressPoller::new(tracker.clone(), config.progress.poll_interval);
        let mut events = poller.subscribe(session_id.clone());
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ProgressEvent::Connected(connected) => {
                        pb.set_message(format!("Sessão {}", connected.session_id));
                    }
                    ProgressEvent::Progress(record) => {
                        pb.set_position(record.percentage as u64);
                        pb.set_message(record.message.clone());
                        if record.is_terminal() {
                            pb.finish_with_message(record.message);
                        }
                    }
                }
            }
        }))
    } else {
        None
    };

    let outcome = runner
        .run(
            &session_id,
            PipelineInput {
                de_rows,
                rast_rows,
                weights,
                min_score: args.min_score,
            },
        )
        .await;

    if let Some(task) = progress_task {
        join_logged(task, "Progress display").await;
    }

    match outcome {
        PipelineOutcome::Completed(output) => {
            output.report.write_json(&args.output)?;
            info!(
                "📄 Report written to {} ({} of {} DE rows at or above {:.2})",
                args.output.display(),
                output.report.matched_rows(),
                output.report.rows.len(),
                args.min_score
            );
            Ok(())
        }
        PipelineOutcome::Failed {
            session_id,
            stage,
            message,
        } => {
            error!("Session {} failed during {}", session_id, stage);
            bail!("Reconciliation failed: {}", message)
        }
    }
}
