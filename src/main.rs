mod cli;

use mergeforged::{config, jobs::JobRegistry, status::TerminalStatus};
use mergeforged_av::{
    compat, Engine, JobContext, MergeJob, StatusReporter, StreamProfile, TargetParams,
    ToolRegistry,
};
use mergeforged_common::{paths, InputSet};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mergeforged=trace,mergeforged_av=trace,mergeforged_common=debug".to_string()
        } else {
            "mergeforged=info,mergeforged_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Merge {
            files,
            output,
            subtitles,
            audio,
            work_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(merge_files(
                cli.config.as_deref(),
                files,
                output,
                subtitles,
                audio,
                work_dir,
            ))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(cli.config.as_deref(), &file, json))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze { files } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(analyze_files(cli.config.as_deref(), &files))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckTools => {
            check_tools(cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("mergeforged {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Sort positional files into videos and extra tracks, then add the explicit tracks.
fn build_job(
    files: Vec<PathBuf>,
    output: Option<String>,
    subtitles: Vec<PathBuf>,
    audio: Vec<PathBuf>,
    work_dir: Option<PathBuf>,
) -> Result<MergeJob> {
    let inputs = InputSet::classify(files);
    if let Some(unknown) = inputs.unknown.first() {
        anyhow::bail!(
            "Unsupported file type: {:?} (videos: {}; audio: {}; subtitles: {})",
            unknown,
            paths::video_extensions().join(", "),
            paths::audio_extensions().join(", "),
            paths::subtitle_extensions().join(", "),
        );
    }

    let mut job = MergeJob::from_inputs(inputs).subtitles(subtitles).audio(audio);
    job.output_name = output;
    job.work_dir = work_dir;

    job.validate()?;
    Ok(job)
}

async fn merge_files(
    config_path: Option<&Path>,
    files: Vec<PathBuf>,
    output: Option<String>,
    subtitles: Vec<PathBuf>,
    audio: Vec<PathBuf>,
    work_dir: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = config::load_config_or_default(config_path)?;
    let job = build_job(files, output, subtitles, audio, work_dir)?;

    let tools = ToolRegistry::discover(&config.tools);
    let engine = Engine::new(&tools, config.merge.clone(), config.standardize.clone())?;

    let registry = JobRegistry::new(config.jobs.max_concurrent);
    let guard = registry.register()?;

    let ctrl_c_registry = registry.clone();
    let job_id = guard.id();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(job_id = %job_id, "Interrupted, cancelling merge");
            let _ = ctrl_c_registry.cancel(&job_id);
        }
    });

    let status = StatusReporter::new(Arc::new(TerminalStatus), config.merge.progress_throttle());
    let ctx = JobContext::new(guard.id(), guard.token(), status);

    // The engine reports the final outcome through the status sink.
    match engine.run(&ctx, &job).await {
        Ok(path) => {
            tracing::debug!("Merged file: {:?}", path);
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

fn engine_for(config_path: Option<&Path>) -> Result<Engine> {
    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    Ok(Engine::new(&tools, config.merge, config.standardize)?)
}

fn silent_context() -> JobContext {
    JobContext::new(Default::default(), CancellationToken::new(), StatusReporter::silent())
}

async fn probe_file(config_path: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let engine = engine_for(config_path)?;
    let profile = engine
        .probe(&silent_context(), file)
        .await
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_profile(&profile);
    }

    Ok(())
}

fn print_profile(profile: &StreamProfile) {
    println!("File: {}", profile.path.display());
    println!("Container: {}", profile.container);
    println!(
        "Duration: {}",
        mergeforged_av::status::readable_time(profile.duration_secs.round() as u64)
    );
    if let Some(bitrate) = profile.bitrate {
        println!("Bitrate: {} kb/s", bitrate / 1000);
    }
    println!(
        "Video: {} {} {}fps {}",
        profile.video_codec,
        profile.resolution(),
        profile.fps,
        profile.pixel_format
    );
    match &profile.audio_codec {
        Some(codec) => println!(
            "Audio: {} {} Hz, {} stream(s)",
            codec, profile.audio_sample_rate, profile.audio_stream_count
        ),
        None => println!("Audio: none"),
    }
    println!("Subtitles: {} stream(s)", profile.subtitle_stream_count);
}

async fn analyze_files(config_path: Option<&Path>, files: &[PathBuf]) -> Result<()> {
    let engine = engine_for(config_path)?;
    let ctx = silent_context();

    let videos: Vec<PathBuf> = files
        .iter()
        .filter(|f| paths::is_video_file(f))
        .cloned()
        .collect();
    let profiles = engine.probe_all(&ctx, &videos).await?;

    for profile in &profiles {
        println!(
            "{}: {} {} {}fps",
            profile.path.display(),
            profile.video_codec,
            profile.resolution(),
            profile.fps
        );
    }
    println!();

    let verdict = compat::check_compatibility(&profiles);
    match &verdict {
        compat::Compatibility::Identical => println!("✓ Identical parameters: fast merge possible"),
        compat::Compatibility::Mismatch(mismatch) => {
            println!("✗ Standardization required: {}", mismatch);
            for line in compat::difference_summary(&profiles) {
                println!("  - {}", line);
            }
        }
        compat::Compatibility::TooFewInputs => println!("✗ Need at least 2 video files"),
    }

    let container = engine.merge_settings().container;
    if compat::requires_container_remux(&profiles, container) {
        println!("Container remux to {} required", container);
    }

    if !profiles.is_empty() && !verdict.is_fast_path_eligible() {
        let target = TargetParams::from_profiles(&profiles, engine.standardize_settings());
        println!(
            "Standardization target: {}x{} {}fps {} {}Hz {}ch",
            target.width,
            target.height,
            target.fps,
            target.pixel_format,
            target.sample_rate,
            target.audio_channels
        );
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable merging.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Container: {}", config.merge.container);
    println!(
        "  Work dir: {}",
        config.merge.work_dir().display()
    );
    println!("  Progress interval: {}s", config.merge.progress_throttle_secs);
    println!(
        "  Standardize: {}fps {} {} crf {} / {} {}",
        config.standardize.fps,
        config.standardize.pixel_format,
        config.standardize.video_codec,
        config.standardize.crf,
        config.standardize.audio_codec,
        config.standardize.audio_bitrate
    );
    println!("  Max concurrent merges: {}", config.jobs.max_concurrent);

    Ok(())
}
