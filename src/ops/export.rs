// ============================================================================
// EXPORT - crop the selection, normalize its size, copy and optionally save
// ============================================================================

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::canvas::SelectionRect;
use crate::error::{Result, StackerError};
use crate::io;
use crate::ops::clipboard::ClipboardPort;
use crate::settings::{AppSettings, MAX_EXPORT_DIMENSION_LIMIT};

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub max_dimension: u32,
    /// Scale crops whose longer side is below `max_dimension` up to it.
    pub upscale_small: bool,
    pub save_to_disk: bool,
    pub save_dir: Option<PathBuf>,
    pub timestamp_names: bool,
    pub default_name: String,
}

impl ExportOptions {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            max_dimension: settings.max_export_dimension.clamp(1, MAX_EXPORT_DIMENSION_LIMIT),
            upscale_small: settings.upscale_small_crops,
            save_to_disk: settings.save_crop,
            save_dir: settings.save_dir.clone(),
            timestamp_names: settings.timestamp_names,
            default_name: settings.default_save_name.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub image: RgbImage,
    pub saved_to: Option<PathBuf>,
}

/// Output size for a `width`×`height` crop: uniform scale so the longer side
/// becomes `max_dimension`. Small crops keep their size unless `upscale`.
/// Each side is truncated and kept at least 1.
pub fn export_size(width: u32, height: u32, max_dimension: u32, upscale: bool) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || (!upscale && longest <= max_dimension) {
        return (width, height);
    }
    let scaled = |side: u32| ((side as u64 * max_dimension as u64 / longest as u64) as u32).max(1);
    if width >= height {
        (max_dimension, scaled(height))
    } else {
        (scaled(width), max_dimension)
    }
}

/// Copy the selected pixels out of `base`. The selection is clipped to the
/// image first; nothing left is an error.
pub fn crop_selection(base: &RgbImage, selection: SelectionRect) -> Result<RgbImage> {
    let sel = selection.clamped_to(base.width(), base.height());
    if sel.is_empty() {
        return Err(StackerError::EmptySelection);
    }
    Ok(imageops::crop_imm(base, sel.x0, sel.y0, sel.width(), sel.height()).to_image())
}

/// Crop and rescale with Lanczos3.
pub fn render_capture(base: &RgbImage, selection: SelectionRect, opts: &ExportOptions) -> Result<RgbImage> {
    let crop = crop_selection(base, selection)?;
    let (w, h) = export_size(crop.width(), crop.height(), opts.max_dimension, opts.upscale_small);
    if (w, h) == crop.dimensions() {
        return Ok(crop);
    }
    Ok(imageops::resize(&crop, w, h, FilterType::Lanczos3))
}

/// `<unix seconds>.png` or `<default name>.png`.
pub fn capture_file_name(opts: &ExportOptions, unix_seconds: i64) -> String {
    if opts.timestamp_names {
        format!("{}.png", unix_seconds)
    } else {
        format!("{}.png", opts.default_name)
    }
}

/// Full export: validate, crop, scale, put on the clipboard and, when
/// enabled, save into `save_dir`. Preconditions are checked before any side
/// effect.
pub fn export_selection(
    base: Option<&RgbImage>,
    selection: SelectionRect,
    opts: &ExportOptions,
    clipboard: &mut dyn ClipboardPort,
) -> Result<ExportOutcome> {
    let base = base.ok_or(StackerError::NoImageLoaded)?;
    let save_dir = match (opts.save_to_disk, &opts.save_dir) {
        (false, _) => None,
        (true, Some(dir)) => Some(dir),
        (true, None) => return Err(StackerError::SaveDirUnset),
    };

    let image = render_capture(base, selection, opts)?;
    let encoded = match save_dir {
        Some(_) => Some(io::encode_png_rgb(&image)?),
        None => None,
    };

    clipboard.put_image(&image)?;

    let saved_to = match (save_dir, encoded) {
        (Some(dir), Some(bytes)) => {
            let path = dir.join(capture_file_name(opts, chrono::Utc::now().timestamp()));
            io::write_file_atomic(&path, &bytes)?;
            log::info!("Saved capture to {}", path.display());
            Some(path)
        }
        _ => None,
    };

    log::info!(
        "Exported selection {} as {}×{}",
        selection,
        image.width(),
        image.height()
    );
    Ok(ExportOutcome { image, saved_to })
}
