#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod helpers;
mod input;
mod paint;
mod theme;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use tracing::info;

use trimline_core::TimelineConfig;
use trimline_media::FfmpegBackend;

/// Trimline - filmstrip trimmer with lossless export
#[derive(Parser, Debug, Default, PartialEq)]
#[command(name = "trimline")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file overriding the timeline defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory that receives exported clips
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Video to open on startup
    file: Option<PathBuf>,
}

/// Defaults when `path` is `None`; otherwise a JSON override validated before
/// use. Missing keys keep their default values.
fn load_config(path: Option<&Path>) -> Result<TimelineConfig> {
    let Some(path) = path else {
        return Ok(TimelineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: TimelineConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Exports land next to the source unless `--out` says otherwise.
fn default_out_dir(file: Option<&Path>) -> PathBuf {
    file.and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir)
}

fn main() -> Result<()> {
    helpers::log::init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let out_dir = args.out.clone().unwrap_or_else(|| default_out_dir(args.file.as_deref()));
    let backend = FfmpegBackend::new().context("FFmpeg init failed")?;
    info!("[app] exports → {}", out_dir.display());

    let native_options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_title("Trimline")
            .with_inner_size([1100.0, 360.0])
            .with_min_inner_size([480.0, 240.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Trimline",
        native_options,
        Box::new(move |cc| {
            let app = app::TrimlineApp::new(cc, config, backend, out_dir, args.file)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("trimline").chain(list.iter().copied()))
    }

    #[test]
    fn parses_options_and_file() {
        let parsed = args(&["--out", "/tmp/clips", "in.mp4", "--config", "cfg.json"]).unwrap();
        assert_eq!(parsed.out, Some(PathBuf::from("/tmp/clips")));
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(parsed.file, Some(PathBuf::from("in.mp4")));
    }

    #[test]
    fn rejects_unknown_flags_and_second_file() {
        assert!(args(&["--fast"]).is_err());
        assert!(args(&["a.mp4", "b.mp4"]).is_err());
        assert!(args(&["--out"]).is_err());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "min_trim_ms": 2500, "zoom_intervals_ms": [2000, 1000] }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.min_trim_ms, 2500);
        assert_eq!(config.zoom_intervals_ms, vec![2000, 1000]);
        assert_eq!(config.thumb_width, TimelineConfig::default().thumb_width);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "zoom_intervals_ms": [250, 500] }"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn out_dir_defaults_to_the_source_folder() {
        assert_eq!(default_out_dir(Some(Path::new("/videos/a.mp4"))), PathBuf::from("/videos"));
    }
}
