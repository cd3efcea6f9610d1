// Lookout command line interface
// Webcam object detection with spoken announcements

mod config;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use lookout_assistant::Assistant;
use lookout_core::{Shutdown, SystemClock};
use lookout_eye::{CameraManager, DetectionPipeline, ModelManager, OverlayRenderer, YoloModel};
use lookout_spk::{create_engine, voice_queue, TtsEngine, VoiceWorker};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "Webcam object detection assistant that speaks what it sees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the assistant
    Run(RunArgs),

    /// Check the model, the speech engine and the camera
    Check {
        /// Speak a test phrase
        #[arg(long)]
        speak: bool,
    },

    /// Download the detection model and print its path
    DownloadModel,

    /// List the voices of the configured speech engine
    Voices,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Camera device index
    #[arg(long)]
    camera: Option<u32>,

    /// ONNX model file to use instead of the managed download
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seconds before the same object is announced again
    #[arg(long)]
    window_secs: Option<u64>,

    /// Minimum seconds between spoken charger alerts
    #[arg(long)]
    cooldown_secs: Option<u64>,

    /// Disable the charger alert
    #[arg(long)]
    no_alert: bool,

    /// Do not speak
    #[arg(long)]
    mute: bool,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(camera) = self.camera {
            config.vision.camera_id = camera;
        }

        if let Some(ref model) = self.model {
            if !model.is_file() {
                bail!("Model file {:?} does not exist", model);
            }
            let file = model
                .file_name()
                .and_then(|f| f.to_str())
                .with_context(|| format!("Invalid model path {:?}", model))?;
            config.vision.model_file = file.to_string();
            config.vision.model_path = model
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
        }

        if let Some(window) = self.window_secs {
            config.assistant.memory_window_secs = window;
        }

        if let Some(cooldown) = self.cooldown_secs {
            config.assistant.alert.cooldown_secs = cooldown;
        }

        if self.no_alert {
            config.assistant.alert.enabled = false;
        }

        if self.mute {
            config.speech.enabled = false;
        }

        if self.headless {
            config.vision.show_window = false;
        }

        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env()?;
    if let Commands::Run(ref args) = cli.command {
        args.apply(&mut config)?;
    }

    init_logging(&config.log_level, cli.verbose);
    config.validate().context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("lookout-worker")
        .build()
        .context("Failed to start async runtime")?;

    let result = match cli.command {
        Commands::Run(_) => run(config, &runtime),
        Commands::Check { speak } => check(config, speak, &runtime),
        Commands::DownloadModel => download_model(config, &runtime),
        Commands::Voices => list_voices(config, &runtime),
    };

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}

fn init_logging(level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { level }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn load_model(config: &AppConfig, runtime: &Runtime) -> Result<Arc<YoloModel>> {
    let manager = ModelManager::new(Arc::new(config.vision.clone()));
    let path = runtime
        .block_on(manager.get_yolo_model())
        .context("Failed to obtain detection model")?;
    let model = YoloModel::new(&path, &config.vision).context("Failed to load detection model")?;
    Ok(Arc::new(model))
}

/// Start the assistant and block until it stops
fn run(config: AppConfig, runtime: &Runtime) -> Result<()> {
    info!("Starting Lookout");

    let engine = create_engine(&config.speech).context("Failed to start speech")?;
    info!("Speech engine: {}", engine.name());

    let model = load_model(&config, runtime)?;
    let candidates = model.warm_up().context("Model warm-up failed")?;
    info!("Model ready ({} candidate boxes per frame)", candidates);
    let detector = DetectionPipeline::new(model);

    let vision = Arc::new(config.vision.clone());
    let mut camera = CameraManager::new(vision.clone());
    camera.initialize().context("Failed to open camera")?;

    let mut display = if vision.show_window {
        OverlayRenderer::new(&vision)
    } else {
        info!("Running headless; press Ctrl-C to stop");
        OverlayRenderer::headless()
    };

    let shutdown = Shutdown::new();
    let (queue, receiver) = voice_queue();
    let worker = VoiceWorker::from_config(engine, &config.speech, receiver, shutdown.clone());
    let worker_task = runtime.spawn(worker.run());

    let signal = shutdown.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            signal.trigger();
        }
    });

    let assistant = Assistant::new(config.assistant, queue, Arc::new(SystemClock), shutdown)?;
    let summary = assistant.run(&mut camera, &detector, &mut display);
    drop(assistant);
    camera.stop();

    let report = runtime.block_on(worker_task).context("Voice worker panicked")?;
    info!(
        "Processed {} frames: {} announcements, {} alerts, {} detection errors, {} render errors",
        summary.frames,
        summary.announcements,
        summary.alerts,
        summary.detection_errors,
        summary.render_errors
    );
    info!(
        "Voice worker spoke {} utterances ({} failed, {} discarded)",
        report.spoken, report.failed, report.discarded
    );
    Ok(())
}

/// Self-test of each external collaborator
fn check(config: AppConfig, speak: bool, runtime: &Runtime) -> Result<()> {
    let mut failed = false;

    println!("Checking detection model...");
    match load_model(&config, runtime).and_then(|m| m.warm_up().map_err(anyhow::Error::from)) {
        Ok(candidates) => println!("  ✅ Model loaded, dummy inference returned {} candidates", candidates),
        Err(e) => {
            println!("  ❌ Model: {:#}", e);
            failed = true;
        }
    }

    println!("Checking speech engine...");
    match check_speech(&config, speak, runtime) {
        Ok(voices) => println!("  ✅ Speech ready, {} voices available", voices),
        Err(e) => {
            println!("  ❌ Speech: {:#}", e);
            failed = true;
        }
    }

    println!("Checking camera {}...", config.vision.camera_id);
    let mut camera = CameraManager::new(Arc::new(config.vision.clone()));
    match camera.initialize().and_then(|_| camera.probe()) {
        Ok(Some((width, height))) => println!("  ✅ Camera delivered a {}x{} frame", width, height),
        Ok(None) => println!("  ⚠️  Camera opened but returned no frame"),
        Err(e) => {
            warn!("Camera check failed: {}", e);
            println!("  ⚠️  Camera: {}", e);
        }
    }
    camera.stop();

    if failed {
        bail!("Self-test failed");
    }
    println!("All checks passed");
    Ok(())
}

fn check_speech(config: &AppConfig, speak: bool, runtime: &Runtime) -> Result<usize> {
    let engine = create_engine(&config.speech)?;
    let voices = runtime.block_on(engine.list_voices())?;
    if speak {
        runtime.block_on(engine.speak("Lookout self test. Can you hear me?", &config.speech.voice))?;
    }
    Ok(voices.len())
}

fn download_model(config: AppConfig, runtime: &Runtime) -> Result<()> {
    let manager = ModelManager::new(Arc::new(config.vision));
    let path = runtime
        .block_on(manager.get_yolo_model())
        .context("Model download failed")?;
    println!("{}", path.display());
    Ok(())
}

fn list_voices(config: AppConfig, runtime: &Runtime) -> Result<()> {
    let engine: Arc<dyn TtsEngine> = create_engine(&config.speech)?;
    let voices = runtime.block_on(engine.list_voices())?;
    if voices.is_empty() {
        println!("No voices reported by the {} engine", engine.name());
    }
    for voice in voices {
        println!("{}", voice);
    }
    Ok(())
}
