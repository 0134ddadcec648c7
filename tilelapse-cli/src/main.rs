//! Tilelapse CLI - historical satellite imagery timelapses
//!
//! Resolves the requested area and resolution into a tile grid, walks the
//! tile server's version history backwards and writes one JPEG still per
//! changed version plus a GIF animation through all of them.

mod args;
mod error;
mod options;
mod progress;

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilelapse::fetch::FetchPolicy;
use tilelapse::output::SequenceConfig;
use tilelapse::{
    detect_current_version, GeoPoint, GeoRect, ReqwestClient, SequenceRecorder, ServerConfig,
    TileFetcher, VersionCrawler,
};

use crate::args::{parse_point, CliArgs};
use crate::error::CliError;
use crate::progress::ConsoleProgress;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    if let Err(error) = run(args).await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), CliError> {
    let (lat, lon) = parse_point(&args.point)?;
    let point = GeoPoint::new(lat, lon)?;
    let direction = args.direction.into();

    let plan = options::plan_render(
        args.width,
        args.height,
        args.max_meters_per_pixel,
        args.image_width,
        args.image_height,
    )?;

    let zoom = point.required_zoom(plan.max_meters_per_pixel)?;
    let rect = GeoRect::around(point, args.width, args.height)?;
    info!(
        zoom,
        mpp = plan.max_meters_per_pixel,
        "resolved area and zoom level"
    );

    let server = ServerConfig::default();
    let client = ReqwestClient::new(&server)?;
    let current_version = detect_current_version(&client, &server).await;
    info!(current_version, "starting from current imagery version");

    let fetcher = TileFetcher::new(
        client,
        server,
        FetchPolicy {
            retry_fraction: args.retry_fraction,
        },
    );
    let crawler = VersionCrawler::new(fetcher, rect, zoom, direction, plan.target_size);

    let basename = args.basename.unwrap_or_else(|| {
        format!(
            "tilelapse-{},{}-{}x{}m",
            lat, lon, args.width, args.height
        )
    });
    let mut recorder = SequenceRecorder::new(SequenceConfig {
        format: args.format.into(),
        directory: args.output_dir,
        basename,
        jpeg_quality: args.quality,
        frame_interval: Duration::from_millis(args.frame_interval_ms),
    });

    let progress = ConsoleProgress::new();
    let summary = crawler
        .run(current_version, &mut recorder, &progress)
        .await?;
    progress.finish();

    let written = recorder.finalize()?;
    info!(
        versions = summary.emitted.len(),
        skipped = summary.skipped,
        files = written.len(),
        "all done"
    );
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
