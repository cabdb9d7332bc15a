// ============================================================================
// ImageStacker CLI - headless export / overlay via command-line arguments
// ============================================================================
//
// Usage examples:
//   imagestacker --base shot.png --rect 100,100,600,400 --export --save-dir out/
//   imagestacker -b shot.png -r 100,100,600,400 --patch fixed.png --output-dir out/
//   imagestacker -b shot.png -r 100,100,600,400 --export --patch-from-clipboard
//
// No window is opened in CLI mode. Everything runs synchronously on the
// current thread.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::canvas::SelectionRect;
use crate::error::Result;
use crate::io::BaseImage;
use crate::ops::clipboard::{ClipboardPort, MemoryClipboard, SystemClipboard};
use crate::ops::export::{self, ExportOptions};
use crate::ops::overlay::{self, OverlayOptions, PatchSource};
use crate::settings::{AppSettings, MAX_EXPORT_DIMENSION_LIMIT};

/// ImageStacker headless region exporter / compositor.
#[derive(Parser, Debug)]
#[command(
    name = "imagestacker",
    about = "Capture a region of an image or composite a patch into it",
    long_about = "Headless mode of ImageStacker. Crops a rectangle out of a base image\n\
                  (scaled so its longer side equals --max-dim) and/or pastes a patch\n\
                  into that rectangle, writing a composite and a mask.\n\n\
                  Example:\n  \
                  imagestacker --base shot.png --rect 100,100,600,400 --export --save-dir out/",
    group(ArgGroup::new("action").required(true).multiple(true).args(["export", "patch", "patch_from_clipboard"]))
)]
pub struct CliArgs {
    /// Base image file.
    #[arg(short, long, value_name = "FILE")]
    pub base: PathBuf,

    /// Region in base-image pixels, corners in any order.
    #[arg(short, long, value_name = "X0,Y0,X1,Y1")]
    pub rect: SelectionRect,

    /// Export the region: scale it, copy it to the clipboard, optionally save it.
    #[arg(long)]
    pub export: bool,

    /// Save the exported region into this directory.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// File stem for the saved export (ignored with --timestamp).
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Name the saved export after the current unix time.
    #[arg(long)]
    pub timestamp: bool,

    /// Longest side of the exported region in pixels.
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_EXPORT_DIMENSION_LIMIT)))]
    pub max_dim: Option<u32>,

    /// Only shrink exports larger than --max-dim; never enlarge.
    #[arg(long)]
    pub no_upscale: bool,

    /// Overlay this patch file into the region.
    #[arg(short, long, value_name = "FILE", conflicts_with = "patch_from_clipboard")]
    pub patch: Option<PathBuf>,

    /// Overlay the clipboard image into the region.
    #[arg(long)]
    pub patch_from_clipboard: bool,

    /// Directory for the composite and mask files.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not copy the composite to the clipboard.
    #[arg(long)]
    pub no_copy_result: bool,

    /// Use a private in-process clipboard instead of the system one.
    #[arg(long)]
    pub no_clipboard: bool,

    /// Print every file written.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--base" || a == "-b" || a.starts_with("--base="))
    }

    /// Settings for this run: defaults overridden by the flags given.
    pub fn settings(&self) -> AppSettings {
        let mut s = AppSettings::default();
        if let Some(max) = self.max_dim {
            s.max_export_dimension = max;
        }
        s.upscale_small_crops = !self.no_upscale;
        s.save_crop = self.save_dir.is_some();
        s.save_dir = self.save_dir.clone();
        s.timestamp_names = self.timestamp;
        if let Some(name) = &self.name {
            s.default_save_name = name.clone();
        }
        if let Some(dir) = &self.output_dir {
            s.output_dir = dir.clone();
        }
        s.copy_result = !self.no_copy_result;
        s
    }

    fn patch_source(&self) -> Option<PatchSource> {
        match (&self.patch, self.patch_from_clipboard) {
            (Some(path), _) => Some(PatchSource::File(path.clone())),
            (None, true) => Some(PatchSource::Clipboard),
            (None, false) => None,
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the requested actions and return the process exit status
/// (0 on success, 1 on any error).
pub fn run(args: CliArgs) -> i32 {
    let mut system = SystemClipboard::new();
    let mut memory = MemoryClipboard::new();
    let clipboard: &mut dyn ClipboardPort = if args.no_clipboard { &mut memory } else { &mut system };

    match execute(&args, clipboard) {
        Ok(lines) => {
            if args.verbose {
                for line in lines {
                    println!("{}", line);
                }
            }
            0
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            1
        }
    }
}

/// Export first (so its clipboard copy can feed a following overlay), then
/// overlay. Returns one human-readable line per result.
pub fn execute(args: &CliArgs, clipboard: &mut dyn ClipboardPort) -> Result<Vec<String>> {
    let settings = args.settings();
    let base = BaseImage::load(&args.base)?;
    let mut lines = Vec::new();

    if args.export {
        let outcome = export::export_selection(
            Some(&base.pixels),
            args.rect,
            &ExportOptions::from_settings(&settings),
            clipboard,
        )?;
        lines.push(format!(
            "export: {}×{} copied to clipboard",
            outcome.image.width(),
            outcome.image.height()
        ));
        if let Some(path) = outcome.saved_to {
            lines.push(format!("export: saved {}", path.display()));
        }
    }

    if let Some(source) = args.patch_source() {
        if let Some(dir) = &args.output_dir {
            std::fs::create_dir_all(dir)?;
        }
        let outcome = overlay::overlay_from_source(
            Some(&base.pixels),
            Some(args.rect),
            &source,
            &OverlayOptions::from_settings(&settings),
            clipboard,
        )?;
        lines.push(format!("overlay: wrote {}", outcome.composite_path.display()));
        lines.push(format!("overlay: wrote {}", outcome.mask_path.display()));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("imagestacker").chain(args.iter().copied()))
    }

    #[test]
    fn requires_an_action() {
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1"]).is_err());
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "--export"]).is_ok());
    }

    #[test]
    fn patch_sources_conflict() {
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "-p", "x.png", "--patch-from-clipboard"]).is_err());
    }

    #[test]
    fn rect_is_normalized_on_parse() {
        let args = parse(&["-b", "a.png", "-r", "9,8,1,2", "--export"]).unwrap();
        assert_eq!(args.rect, SelectionRect { x0: 1, y0: 2, x1: 9, y1: 8 });
        assert!(parse(&["-b", "a.png", "-r", "9,8", "--export"]).is_err());
    }

    #[test]
    fn flags_map_onto_settings() {
        let args = parse(&[
            "-b", "a.png", "-r", "0,0,1,1", "--export", "--save-dir", "caps", "--name", "shot",
            "--max-dim", "640", "--no-upscale", "--no-copy-result",
        ])
        .unwrap();
        let s = args.settings();
        assert_eq!(s.max_export_dimension, 640);
        assert!(!s.upscale_small_crops);
        assert!(s.save_crop);
        assert_eq!(s.save_dir, Some(PathBuf::from("caps")));
        assert_eq!(s.default_save_name, "shot");
        assert!(!s.timestamp_names);
        assert!(!s.copy_result);

        let s = parse(&["-b", "a.png", "-r", "0,0,1,1", "--export"]).unwrap().settings();
        assert!(!s.save_crop);
        assert!(s.copy_result);
    }

    #[test]
    fn max_dim_must_be_in_range() {
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "--export", "--max-dim", "0"]).is_err());
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "--export", "--max-dim", "65536"]).is_err());
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "--export", "--max-dim", "4000000000"]).is_err());
        assert!(parse(&["-b", "a.png", "-r", "0,0,1,1", "--export", "--max-dim", "65535"]).is_ok());
    }
}
