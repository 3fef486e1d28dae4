//! narramix - Main entry point
//!
//! Command-line front end for the narration engine: inspect a plan, mix a
//! manifest of scheduled items, run the full pipeline, or play the ambience
//! cue schedule in real time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use narramix_common::config::{ConfigResolver, NarramixConfig};
use narramix_common::ScheduledAudioItem;
use narramix_engine::classifier::KeywordClassifier;
use narramix_engine::mixer::{AudioMixer, AudioResource, MixedAudioResult, MixerConfig};
use narramix_engine::narration::{FileNarration, HttpNarration, NarrationSynthesizer};
use narramix_engine::queue::QueueBuilder;
use narramix_engine::resource::DefaultFetcher;
use narramix_engine::scheduler::AmbienceScheduler;
use narramix_engine::sounds::{EnvironmentTable, SoundLookup};
use narramix_engine::Narrator;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for narramix
#[derive(Parser, Debug)]
#[command(name = "narramix")]
#[command(about = "Narration and ambience timing and mixing engine")]
#[command(version)]
struct Args {
    /// Configuration file (overrides NARRAMIX_CONFIG and the per-user file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Where narration audio comes from
#[derive(clap::Args, Debug)]
struct NarrationSource {
    /// Directory of pre-rendered narration files, one per segment in name order
    #[arg(long)]
    narration_dir: Option<PathBuf>,

    /// Text-to-speech endpoint receiving speech markup
    #[arg(long, env = "NARRAMIX_TTS_ENDPOINT")]
    tts_endpoint: Option<String>,

    /// API key sent to the text-to-speech endpoint
    #[arg(long, env = "NARRAMIX_TTS_KEY", hide_env_values = true)]
    tts_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print segments, timeline and (with a narration source) scheduled items as JSON
    Plan {
        /// Input text file
        #[arg(long)]
        text: PathBuf,

        #[command(flatten)]
        source: NarrationSource,
    },

    /// Mix a JSON list of scheduled items into a WAV file
    Mix {
        /// JSON array of scheduled audio items
        #[arg(long)]
        manifest: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Classify, synthesize, queue and mix a text
    Narrate {
        /// Input text file
        #[arg(long)]
        text: PathBuf,

        #[command(flatten)]
        source: NarrationSource,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Play the periodic ambience cues of a text in real time, one JSON line per cue
    Cues {
        /// Input text file
        #[arg(long)]
        text: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = ConfigResolver::new()
        .resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(source = ?source, sample_rate = config.sample_rate, "Configuration resolved");

    match args.command {
        Command::Plan { text, source } => plan(&config, &text, &source).await,
        Command::Mix { manifest, output } => mix(&config, &manifest, &output).await,
        Command::Narrate { text, source, output } => narrate(&config, &text, &source, &output).await,
        Command::Cues { text } => cues(&config, &text).await,
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read text file {}", path.display()))
}

async fn synthesizer(source: &NarrationSource) -> Result<Option<Arc<dyn NarrationSynthesizer>>> {
    if let Some(dir) = &source.narration_dir {
        let files = FileNarration::from_dir(dir)
            .await
            .with_context(|| format!("Failed to list narration directory {}", dir.display()))?;
        if files.is_empty() {
            bail!("No audio files in narration directory {}", dir.display());
        }
        return Ok(Some(Arc::new(files)));
    }

    if let Some(endpoint) = &source.tts_endpoint {
        let http = HttpNarration::new(endpoint.as_str(), source.tts_key.clone())
            .context("Failed to create text-to-speech client")?;
        return Ok(Some(Arc::new(http)));
    }

    Ok(None)
}

fn narrator(config: &NarramixConfig, synthesizer: Arc<dyn NarrationSynthesizer>) -> Result<Narrator> {
    let fetcher = DefaultFetcher::new().context("Failed to create resource fetcher")?;
    Ok(Narrator::from_config(config, synthesizer, Arc::new(fetcher)))
}

async fn plan(config: &NarramixConfig, text_path: &Path, source: &NarrationSource) -> Result<()> {
    let text = read_text(text_path).await?;

    let json = match synthesizer(source).await? {
        Some(synth) => {
            let plan = narrator(config, synth)?.plan(&text).await.context("Planning failed")?;
            serde_json::to_string_pretty(&plan)?
        }
        None => {
            let classification = KeywordClassifier::from_config(config).classify_text(&text);
            let queue = QueueBuilder::from_config(config, Arc::new(EnvironmentTable::from_config(config)));
            let timeline = queue.schedule(&classification.segments);
            serde_json::to_string_pretty(&serde_json::json!({
                "classification_status": classification.status,
                "segments": classification.segments,
                "timeline": timeline,
            }))?
        }
    };

    println!("{}", json);
    Ok(())
}

async fn mix(config: &NarramixConfig, manifest: &Path, output: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    let items: Vec<ScheduledAudioItem> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid manifest {}", manifest.display()))?;

    let fetcher = DefaultFetcher::new().context("Failed to create resource fetcher")?;
    let mixer = AudioMixer::new(MixerConfig::from_config(config), Arc::new(fetcher));
    let result = mixer.mix(&items).await.context("Mix failed")?;

    write_result(&result, output).await
}

async fn narrate(config: &NarramixConfig, text_path: &Path, source: &NarrationSource, output: &Path) -> Result<()> {
    let text = read_text(text_path).await?;
    let Some(synth) = synthesizer(source).await? else {
        bail!("narrate needs --narration-dir or --tts-endpoint");
    };

    let report = narrator(config, synth)?.narrate(&text).await.context("Narration failed")?;
    if report.classification_status.is_fallback() {
        info!(status = ?report.classification_status, "Some segments used default tags");
    }

    match report.result {
        Some(result) => write_result(&result, output).await,
        None => bail!("Mix was superseded before it completed"),
    }
}

async fn write_result(result: &MixedAudioResult, output: &Path) -> Result<()> {
    match &result.resource {
        AudioResource::Rendered { bytes, .. } => {
            tokio::fs::write(output, bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{} ({:?}, {:.3} s, {} items)",
                output.display(),
                result.outcome,
                result.duration,
                result.segments.len()
            );
        }
        AudioResource::Passthrough(resource) => {
            println!(
                "{} ({:?}, {:.3} s, nothing rendered)",
                resource, result.outcome, result.duration
            );
        }
    }
    Ok(())
}

async fn cues(config: &NarramixConfig, text_path: &Path) -> Result<()> {
    let text = read_text(text_path).await?;
    let classification = KeywordClassifier::from_config(config).classify_text(&text);
    let sounds = Arc::new(EnvironmentTable::from_config(config));
    let timeline = QueueBuilder::from_config(config, sounds.clone()).schedule(&classification.segments);

    let scheduler = AmbienceScheduler::new();
    for (segment, slot) in classification.segments.iter().zip(&timeline) {
        if slot.is_empty() || !segment.has_environment() {
            continue;
        }
        let environment = segment.environment.trim();
        let layers = sounds.layered_for(environment);
        scheduler
            .plan(environment, &layers, slot.start, slot.timing.estimated_duration)
            .await;
    }

    let (tx, mut rx) = mpsc::channel(16);
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(tx).await })
    };

    loop {
        tokio::select! {
            cue = rx.recv() => match cue {
                Some(cue) => println!(
                    "{}",
                    serde_json::json!({
                        "offset": cue.offset,
                        "resource": cue.resource,
                        "volume": cue.volume,
                        "environment": cue.environment,
                    })
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling pending cues");
                scheduler.clear().await;
                break;
            }
        }
    }

    drop(rx);
    let sent = runner.await.context("Cue scheduler task failed")?;
    info!(sent, "Cue playback finished");
    Ok(())
}
