//! Render command - run one pipeline pass headlessly and save the tiles.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rasterlayer::controller::ViewportController;
use rasterlayer::map::{HeadlessMap, MapSurface, Overlay};
use rasterlayer::GeoBounds;
use tracing::{debug, info};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the render command.
pub struct RenderArgs {
    pub path: String,
    pub bounds: Option<String>,
    pub zoom: Option<u8>,
    pub output: PathBuf,
    pub timeout_secs: u64,
}

/// Run the render command.
pub fn run(runner: &CliRunner, args: RenderArgs) -> Result<(), CliError> {
    runner.log_startup("render");
    let view = args.bounds.as_deref().map(parse_bounds).transpose()?;

    // Placeholder view; load_raster fits the map to the raster.
    let map = HeadlessMap::new(GeoBounds::default(), 0);
    let mut controller = ViewportController::new(
        map,
        runner.backend()?,
        runner.config().controller_config(),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Loading {}", args.path));

    runner.runtime().block_on(async {
        let info = controller.load_raster(&args.path).await?;
        debug!(bounds = ?info.bounds, bands = info.count, "Raster opened");

        if view.is_some() || args.zoom.is_some() {
            let bounds = view.unwrap_or_else(|| controller.map().current_bounds());
            let zoom = args.zoom.unwrap_or_else(|| controller.map().zoom());
            controller.map_mut().set_view(bounds, zoom);
            controller.on_viewport_change();
        }

        spinner.set_message(format!(
            "Fetching {} tiles",
            controller.cache().pending_count()
        ));

        let wait = Duration::from_secs(args.timeout_secs);
        let settled: Result<(), CliError> = tokio::select! {
            result = tokio::time::timeout(wait, controller.settle()) => {
                result.map_err(|_| CliError::Timeout(args.timeout_secs))
            }
            _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
        };
        settled
    })?;
    spinner.finish_and_clear();

    let written = write_overlays(controller.map(), &args.output)?;
    let stats = controller.stats();
    info!(stats = %stats, "Render finished");

    println!(
        "Wrote {} tiles to {} (zoom {}, {} failed)",
        written,
        args.output.display(),
        controller.map().zoom(),
        controller.cache().failed_count()
    );
    Ok(())
}

/// Parse `south,west,north,east`.
pub fn parse_bounds(text: &str) -> Result<GeoBounds, CliError> {
    let invalid = || CliError::InvalidBounds(text.to_string());
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    let [south, west, north, east] = values[..] else {
        return Err(invalid());
    };
    GeoBounds::new(south, west, north, east).map_err(|_| invalid())
}

/// File name for a tile: its bounds at six decimals.
fn tile_file_name(bounds: &GeoBounds) -> String {
    format!(
        "tile_{:.6}_{:.6}_{:.6}_{:.6}.png",
        bounds.south(),
        bounds.west(),
        bounds.north(),
        bounds.east()
    )
}

/// Save every overlay on the map as a PNG in `dir`.
fn write_overlays(map: &HeadlessMap, dir: &Path) -> Result<usize, CliError> {
    std::fs::create_dir_all(dir)?;

    let mut written = 0;
    for (_, overlay) in map.overlays() {
        write_overlay(overlay, dir)?;
        written += 1;
    }
    Ok(written)
}

fn write_overlay(overlay: &Overlay, dir: &Path) -> Result<(), CliError> {
    let path = dir.join(tile_file_name(&overlay.bounds));
    overlay
        .image
        .pixels()
        .save(&path)
        .map_err(|e| CliError::Output {
            path: path.clone(),
            message: e.to_string(),
        })
}
