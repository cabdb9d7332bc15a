// ============================================================================
// OVERLAY - paste a patch into the selection, emit composite + mask
// ============================================================================
//
// The composite is built on a blank background, not on the base image: the
// consumer only needs the patch and the mask marking where it went.

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::canvas::SelectionRect;
use crate::error::{Result, StackerError};
use crate::io;
use crate::ops::clipboard::{self, ClipboardPort};
use crate::settings::AppSettings;

pub const COMPOSITE_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
/// Mask value outside the replaced area.
pub const MASK_KEEP: Luma<u8> = Luma([255]);
/// Mask value inside the replaced area.
pub const MASK_REPLACED: Luma<u8> = Luma([0]);

/// Where the patch comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchSource {
    Clipboard,
    File(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayOptions {
    pub composite_path: PathBuf,
    pub mask_path: PathBuf,
    pub copy_result: bool,
    pub background: Rgb<u8>,
}

impl OverlayOptions {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            composite_path: settings.composite_path(),
            mask_path: settings.mask_path(),
            copy_result: settings.copy_result,
            background: COMPOSITE_BACKGROUND,
        }
    }
}

#[derive(Debug)]
pub struct OverlayOutcome {
    pub composite: RgbImage,
    pub mask: GrayImage,
    pub composite_path: PathBuf,
    pub mask_path: PathBuf,
}

/// Base size and usable selection, or the precondition that is missing.
/// Call before asking the user for a patch file.
pub fn check_ready(base: Option<&RgbImage>, selection: Option<SelectionRect>) -> Result<((u32, u32), SelectionRect)> {
    let base = base.ok_or(StackerError::NoImageLoaded)?;
    let selection = selection.ok_or(StackerError::NoSelection)?;
    let sel = selection.clamped_to(base.width(), base.height());
    if sel.is_empty() {
        return Err(StackerError::EmptySelection);
    }
    Ok((base.dimensions(), sel))
}

pub fn load_patch(source: &PatchSource, clipboard: &mut dyn ClipboardPort) -> Result<RgbImage> {
    match source {
        PatchSource::Clipboard => clipboard::require_image(clipboard),
        PatchSource::File(path) => io::load_rgb(path),
    }
}

/// Stretch `patch` to exactly the selection's size (aspect ratio ignored).
pub fn fit_patch(patch: &RgbImage, selection: SelectionRect) -> RgbImage {
    if patch.dimensions() == (selection.width(), selection.height()) {
        return patch.clone();
    }
    imageops::resize(patch, selection.width(), selection.height(), FilterType::Lanczos3)
}

/// Blank `size` canvas with `patch` pasted at the selection's top-left.
pub fn build_composite(size: (u32, u32), patch: &RgbImage, selection: SelectionRect, background: Rgb<u8>) -> RgbImage {
    let mut out = RgbImage::from_pixel(size.0, size.1, background);
    imageops::replace(&mut out, patch, selection.x0 as i64, selection.y0 as i64);
    out
}

/// `MASK_KEEP` everywhere except the selection, which is `MASK_REPLACED`.
pub fn build_mask(size: (u32, u32), selection: SelectionRect) -> GrayImage {
    GrayImage::from_fn(size.0, size.1, |x, y| {
        if selection.contains(x, y) { MASK_REPLACED } else { MASK_KEEP }
    })
}

/// Composite `patch` into the selection and persist composite + mask.
/// Both PNGs are encoded before either file is written.
pub fn apply_overlay(
    base_size: (u32, u32),
    selection: SelectionRect,
    patch: &RgbImage,
    opts: &OverlayOptions,
    clipboard: &mut dyn ClipboardPort,
) -> Result<OverlayOutcome> {
    let selection = selection.clamped_to(base_size.0, base_size.1);
    if selection.is_empty() {
        return Err(StackerError::EmptySelection);
    }

    let fitted = fit_patch(patch, selection);
    let composite = build_composite(base_size, &fitted, selection, opts.background);
    let mask = build_mask(base_size, selection);

    let composite_png = io::encode_png_rgb(&composite)?;
    let mask_png = io::encode_png_gray(&mask)?;
    io::write_files_atomic(&[
        (opts.composite_path.as_path(), composite_png.as_slice()),
        (opts.mask_path.as_path(), mask_png.as_slice()),
    ])?;
    log::info!(
        "Overlay {}×{} patch into {}: wrote {} and {}",
        patch.width(),
        patch.height(),
        selection,
        opts.composite_path.display(),
        opts.mask_path.display()
    );

    if opts.copy_result {
        clipboard.put_image(&composite)?;
    }

    Ok(OverlayOutcome {
        composite,
        mask,
        composite_path: opts.composite_path.clone(),
        mask_path: opts.mask_path.clone(),
    })
}

/// Precondition check, patch fetch and overlay in one call (headless use).
pub fn overlay_from_source(
    base: Option<&RgbImage>,
    selection: Option<SelectionRect>,
    source: &PatchSource,
    opts: &OverlayOptions,
    clipboard: &mut dyn ClipboardPort,
) -> Result<OverlayOutcome> {
    let (size, selection) = check_ready(base, selection)?;
    let patch = load_patch(source, clipboard)?;
    apply_overlay(size, selection, &patch, opts, clipboard)
}
