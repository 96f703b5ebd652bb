mod config;
mod report;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use report::PlaybackReport;
use splatstream::{StreamingPipeline, open_source, spawn_worker};

#[derive(Parser)]
#[command(name = "splat-player")]
#[command(about = "Headless player for streamed Gaussian splat scenes")]
pub struct Args {
    #[arg(short, long, help = "JSON streaming config")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Model URL or file path, overrides MODEL_URL")]
    url: Option<String>,

    #[arg(long)]
    max_frame: Option<u16>,

    #[arg(long)]
    slice_num: Option<usize>,

    #[arg(long)]
    total_cap: Option<usize>,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    gop_size: Option<u16>,

    #[arg(long, help = "Treat every frame as uncompressed records")]
    no_compression: bool,

    #[arg(long, help = "Stop after this many seconds")]
    seconds: Option<u64>,

    #[arg(long, help = "Stop after this many playback loops")]
    loops: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::build(&args)?;

    let mut worker = spawn_worker(config.slice_num, config.slice_cap());
    let outputs = tokio::spawn(report::count_outputs(worker.take_outputs()));

    let mut pipeline = StreamingPipeline::new(config.clone(), worker.sender())?;
    let mut source = open_source(&config.model_url)
        .await
        .with_context(|| format!("failed to open {}", config.model_url))?;
    pipeline
        .load_initial(&mut source)
        .await
        .context("failed to load the initial I-frame")?;

    let running = pipeline.running();
    {
        let running = running.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted");
                running.store(false, Ordering::SeqCst);
            }
        });
    }
    if let Some(seconds) = args.seconds {
        let running = running.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            running.store(false, Ordering::SeqCst);
        });
    }

    let mut report = PlaybackReport::new(args.loops);
    pipeline
        .run_with(source, |event| {
            if report.record(&event) {
                running.store(false, Ordering::SeqCst);
            }
        })
        .await?;

    report.summary(
        pipeline.stats(),
        pipeline.progress(),
        pipeline.playback_fps(),
    );

    drop(pipeline);
    let worker_stats = worker.shutdown().await?;
    let counts = outputs.await?;
    log::info!(
        "Worker: {} textures, {} depth sorts, {} rows dropped",
        counts.textures,
        counts.sorts,
        worker_stats.dropped_rows
    );
    if let Some(stats) = counts.last_stats {
        log::info!(
            "Worker re-sorted {} frames ({} I, {} P), last GoP {}",
            stats.total_frames,
            stats.i_frames,
            stats.p_frames,
            stats.last_gop
        );
    }

    Ok(())
}
