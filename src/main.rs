use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use scriba::audio::convert::FfmpegConverter;
use scriba::capture::{AudioInputDevice, select_backend};
use scriba::cli::{Cli, Commands};
use scriba::config::Config;
use scriba::stt::{SpeechEngine, WhisperEngine, WhisperEngineConfig};
use scriba::tools::ProcessToolRunner;
use scriba::transcribe::batch::find_recordings;
use scriba::transcribe::live::{DeviceSelector, LiveOptions, LiveTranscriber};
use scriba::transcribe::{BatchTranscriber, OverwritePolicy};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Batch { files, overwrite } => {
            run_batch(config, cli.model, files, overwrite).await?;
        }
        Commands::Live { device } => {
            run_live(config, cli.model, device).await?;
        }
        Commands::Devices => {
            list_capture_devices().await;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    Ok(config.with_env_overrides())
}

fn build_engine(model: Option<PathBuf>) -> Result<Arc<WhisperEngine>> {
    let mut engine_config = WhisperEngineConfig::default();
    if let Some(model_path) = model {
        engine_config.model_path = model_path;
    }
    tracing::info!(
        backend = scriba::defaults::gpu_backend(),
        model = %engine_config.model_path.display(),
        "loading recognition model"
    );
    let engine = WhisperEngine::new(engine_config).context("failed to load recognition model")?;
    Ok(Arc::new(engine))
}

async fn run_batch(
    config: Config,
    model: Option<PathBuf>,
    files: Vec<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let files = if files.is_empty() {
        let found = find_recordings(&config.directories.input).with_context(|| {
            format!(
                "failed to scan input directory {}",
                config.directories.input.display()
            )
        })?;
        if found.is_empty() {
            println!(
                "No recordings found in {}",
                config.directories.input.display()
            );
            return Ok(());
        }
        found
    } else {
        files
    };

    let engine = build_engine(model)?;
    let runner = Arc::new(ProcessToolRunner);
    let converter = Arc::new(FfmpegConverter::new(runner.clone()));

    let policy = if overwrite {
        OverwritePolicy::Overwrite
    } else {
        OverwritePolicy::Prompt(Box::new(confirm_overwrite))
    };

    let transcriber = BatchTranscriber::new(runner, converter, engine, config, policy);
    let total = files.len();
    let completed = transcriber.transcribe_all(&files).await;
    println!("Transcribed {} of {} file(s)", completed, total);
    Ok(())
}

fn confirm_overwrite(existing: &Path) -> bool {
    print!("Transcript {} exists. Overwrite? [y/N] ", existing.display());
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn run_live(config: Config, model: Option<PathBuf>, device: Option<String>) -> Result<()> {
    let engine = build_engine(model)?;
    let model_name = engine.model_name().to_string();

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStopping...");
            cancel_for_signal.store(true, Ordering::Relaxed);
        }
    });

    let options = LiveOptions {
        output_dir: Some(config.directories.output.clone()),
        model_name,
        chunk_secs: scriba::defaults::CHUNK_SECONDS,
        toggles: config.toggles,
    };

    let transcriber = LiveTranscriber::new(engine, options);
    let mut backend = select_backend();
    let selector = ConsoleDeviceSelector { preferred: device };
    let on_segment = |text: &str| {
        println!("{}", text.trim());
    };

    println!("Listening (Ctrl+C to stop)...");
    let saved = transcriber
        .run(backend.as_mut(), &selector, &on_segment, cancel)
        .await?;

    match saved {
        Some(path) => println!("Transcript saved to {}", path.display()),
        None => println!("No transcript produced."),
    }
    Ok(())
}

/// Picks the device named on the command line, or asks on the console.
struct ConsoleDeviceSelector {
    preferred: Option<String>,
}

#[async_trait]
impl DeviceSelector for ConsoleDeviceSelector {
    async fn select(&self, devices: &[AudioInputDevice]) -> Option<AudioInputDevice> {
        if let Some(preferred) = &self.preferred {
            let found = devices.iter().find(|d| &d.id == preferred).cloned();
            if found.is_none() {
                eprintln!("Device {} not found", preferred);
            }
            return found;
        }

        println!("Available input devices:");
        for (i, device) in devices.iter().enumerate() {
            println!("  {}: {}", i + 1, device.name);
        }
        print!("Select device [1-{}]: ", devices.len());
        std::io::stdout().flush().ok()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer).ok()?;
        let choice: usize = answer.trim().parse().ok()?;
        devices.get(choice.checked_sub(1)?).cloned()
    }
}

async fn list_capture_devices() {
    let backend = select_backend();
    let devices = backend.list_devices().await;
    if devices.is_empty() {
        println!("No capture devices found.");
        return;
    }
    for device in devices {
        println!("{}\t{}", device.id, device.name);
    }
}
