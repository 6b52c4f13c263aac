//! Info command - print raster metadata reported by the backend.

use rasterlayer::raster::RasterInfo;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the info command.
pub fn run(runner: &CliRunner, path: &str) -> Result<(), CliError> {
    runner.log_startup("info");
    let backend = runner.backend()?;
    let info = runner.runtime().block_on(backend.load_raster_info(path))?;

    print!("{}", format_info(path, &info));
    Ok(())
}

fn format_info(path: &str, info: &RasterInfo) -> String {
    let mut out = String::new();
    let b = info.bounds;

    out.push_str(&format!("Raster: {}\n", path));
    out.push_str(&format!(
        "  Bounds:     [[{}, {}], [{}, {}]]\n",
        b.south(),
        b.west(),
        b.north(),
        b.east()
    ));
    out.push_str(&format!("  Bands:      {}\n", info.count));
    if let (Some(width), Some(height)) = (info.width, info.height) {
        out.push_str(&format!("  Size:       {} x {} px\n", width, height));
    }

    let extent = info.extent();
    out.push_str(&format!(
        "  Zoom range: {}-{}\n",
        extent.min_zoom, extent.max_zoom
    ));
    out.push_str(&format!("  Default:    bands {}\n", info.default_bands()));

    let methods: Vec<&str> = info.supported_resampling().iter().map(|m| m.as_str()).collect();
    out.push_str(&format!("  Resampling: {}\n", methods.join(", ")));

    for (band, stats) in &info.stats {
        out.push_str(&format!(
            "  Band {:<6}min {}, max {}\n",
            format!("{}:", band),
            stats.min,
            stats.max
        ));
    }
    out
}
