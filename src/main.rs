use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod analysis;
mod config;
mod error;
mod extract;
mod orchestrator;
mod registry;
mod wav;

use crate::analysis::AnalysisResult;
use crate::config::Config;
use crate::orchestrator::CloningOrchestrator;
use crate::registry::VoiceRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Revoice")
        .version("0.1.0")
        .about("Voice cloning pipeline: clone each speaker's voice from their own audio")
        .arg(
            Arg::new("analysis")
                .short('a')
                .long("analysis")
                .value_name("JSON")
                .help("Analysis result JSON (speakers + segments)")
                .required(true),
        )
        .arg(
            Arg::new("media")
                .short('m')
                .long("media")
                .value_name("FILE")
                .help("Source media file; omit to run in demo mode with placeholder voices"),
        )
        .arg(
            Arg::new("say")
                .long("say")
                .value_name("SPEAKER_ID:TEXT")
                .help("After cloning, synthesize TEXT in SPEAKER_ID's voice"),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("WAV")
                .help("Output path for synthesized audio")
                .default_value("synthesized.wav"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    // Initialize logging
    let filter = if matches.get_flag("verbose") {
        "revoice=debug,info".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;

    let analysis_path = PathBuf::from(matches.get_one::<String>("analysis").unwrap());
    let media_path = matches.get_one::<String>("media").map(PathBuf::from);

    info!("🚀 Revoice starting...");
    info!("📄 Analysis: {}", analysis_path.display());

    let analysis = AnalysisResult::from_json_file(&analysis_path).await?;
    info!(
        "🗣️  {} speaker(s), {} segment(s), {:.1}s of media",
        analysis.speakers.len(),
        analysis.segments.len(),
        analysis.metadata.total_duration
    );

    let media = match &media_path {
        Some(path) => {
            if !path.exists() {
                error!("Media file does not exist: {}", path.display());
                return Err(anyhow::anyhow!("Media file not found"));
            }
            info!("🎞️  Media: {}", path.display());
            Some(tokio::fs::read(path).await?)
        }
        None => {
            info!("🎭 No media source given, running in demo mode");
            None
        }
    };

    let registry = Arc::new(VoiceRegistry::from_config(&config.voice)?);
    let orchestrator = CloningOrchestrator::new(registry);

    let start_time = std::time::Instant::now();
    orchestrator.run(&analysis, media).await;
    let snapshot = orchestrator.snapshot();

    info!("🎉 {} in {:.2}s", snapshot.progress, start_time.elapsed().as_secs_f64());
    for speaker in &analysis.speakers {
        let segment_count = analysis.segments_for(&speaker.id).len();
        match snapshot.speaker_status.get(&speaker.id) {
            Some(status) => info!(
                "   {} ({} segment(s)) -> {}",
                speaker.display_name, segment_count, status
            ),
            None => info!("   {} -> skipped (no segments)", speaker.display_name),
        }
    }

    // Optional synthesis probe
    if let Some(say) = matches.get_one::<String>("say") {
        let (speaker_id, text) = say
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("--say expects SPEAKER_ID:TEXT"))?;

        info!("🔊 Synthesizing for '{}': {}", speaker_id, text);
        let resource = orchestrator.synthesize_segment(speaker_id, text).await?;
        let bytes = resource.into_playable_bytes();

        let out_path = PathBuf::from(matches.get_one::<String>("out").unwrap());
        tokio::fs::write(&out_path, &bytes).await?;
        info!("💾 Wrote {} bytes to {}", bytes.len(), out_path.display());
    }

    Ok(())
}
