use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tubegenius::cancel::cancel_pair;
use tubegenius::models::{AspectRatio, Config, GenerateParams, GenerationMode, ReferenceImage};
use tubegenius::orchestrator::GenerationOrchestrator;
use tubegenius::output;
use tubegenius::session::{Session, SessionState};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "tubegenius")]
#[command(about = "Generate YouTube thumbnails, channel banners and title ideas")]
struct CliArgs {
    /// Video title, channel name, image prompt or topic, depending on mode.
    #[arg(value_name = "PROMPT")]
    prompt: String,

    /// standard, thumbnail-set, banner-set or title-ideas.
    #[arg(long, default_value = "thumbnail-set", value_parser = parse_mode_arg)]
    mode: GenerationMode,

    /// Channel niche for banner-set; ignored by other modes.
    #[arg(long)]
    description: Option<String>,

    /// Only used by standard mode; sets are always 16:9.
    #[arg(long, default_value = "16:9", value_parser = parse_aspect_ratio_arg)]
    aspect_ratio: AspectRatio,

    /// Image to restyle or build on.
    #[arg(long, value_name = "PATH")]
    reference_image: Option<PathBuf>,

    /// Defaults to output/<date>_<uuid>.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the result as JSON instead of saving files or listing titles.
    #[arg(long)]
    json: bool,
}

fn parse_mode_arg(input: &str) -> std::result::Result<GenerationMode, String> {
    input.parse()
}

fn parse_aspect_ratio_arg(input: &str) -> std::result::Result<AspectRatio, String> {
    input.parse()
}

fn default_output_dir() -> PathBuf {
    let date = Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from("output").join(format!("{}_{}", date, Uuid::new_v4()))
}

fn build_params(args: &CliArgs) -> Result<GenerateParams> {
    let mut params =
        GenerateParams::new(args.mode, args.prompt.clone()).with_aspect_ratio(args.aspect_ratio);

    if let Some(description) = &args.description {
        params = params.with_description(description.clone());
    }

    if let Some(path) = &args.reference_image {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read reference image {}", path.display()))?;
        let reference = ReferenceImage::from_bytes(bytes)
            .with_context(|| format!("Unsupported reference image {}", path.display()))?;
        params = params.with_reference_image(reference);
    }

    Ok(params)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubegenius=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tubegenius");

    let args = CliArgs::parse();
    let params = build_params(&args)?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let orchestrator = GenerationOrchestrator::from_config(&config);
    let (cancel_handle, cancel_token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling generation");
            cancel_handle.cancel();
        }
    });

    let mut session = Session::new(&orchestrator).with_cancel_token(cancel_token);

    match session.submit(params).await {
        SessionState::Succeeded { params, result } => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else if result.titles().is_empty() {
                let output_dir = args.output_dir.clone().unwrap_or_else(default_output_dir);
                for path in output::save_result(&output_dir, params.mode, result)? {
                    println!("{}", path.display());
                }
            } else {
                for (rank, candidate) in result.titles().iter().enumerate() {
                    println!(
                        "{}. {} (score {}, {})",
                        rank + 1,
                        candidate.title,
                        candidate.score,
                        candidate.cognitive_bias
                    );
                }
            }

            info!("Generation completed successfully");
            Ok(())
        }
        SessionState::Failed { failure, .. } => {
            error!("{}", failure.message);
            eprintln!("{}", failure.message);
            std::process::exit(1);
        }
        // A blank prompt never leaves Idle.
        SessionState::Idle { .. } | SessionState::Pending { .. } => {
            eprintln!("Generation failed: Prompt is empty");
            std::process::exit(1);
        }
    }
}
