// ============================================================================
// IO - image decode/encode, output files and native dialogs
// ============================================================================

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageOutputFormat, RgbImage};
use rfd::FileDialog;

use crate::error::{Result, StackerError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tga", "gif", "ico", "tiff", "tif"];

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

// ---------------------------------------------------------------------------
//  Base image
// ---------------------------------------------------------------------------

/// The loaded source image and the file it came from.
pub struct BaseImage {
    pub pixels: RgbImage,
    pub path: PathBuf,
}

impl BaseImage {
    pub fn load(path: &Path) -> Result<Self> {
        let pixels = load_rgb(path)?;
        log::info!(
            "Loaded {} ({}×{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        Ok(Self {
            pixels,
            path: path.to_path_buf(),
        })
    }

    /// Decode the same file again (picks up edits made by other programs).
    pub fn reload(&self) -> Result<Self> {
        Self::load(&self.path)
    }

    /// Reload whatever is currently open; an error when nothing is.
    pub fn reload_current(current: Option<&Self>) -> Result<Self> {
        current.ok_or(StackerError::NoImageLoaded)?.reload()
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Decode any supported file, dropping alpha.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

// ---------------------------------------------------------------------------
//  Encoding and writing
// ---------------------------------------------------------------------------

pub fn encode_png_rgb(img: &RgbImage) -> Result<Vec<u8>> {
    encode_png(DynamicImage::ImageRgb8(img.clone()))
}

pub fn encode_png_gray(img: &GrayImage) -> Result<Vec<u8>> {
    encode_png(DynamicImage::ImageLuma8(img.clone()))
}

fn encode_png(img: DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(buf)
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// failed write never leaves a truncated file at `path`.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_files_atomic(&[(path, bytes)])
}

/// All-or-nothing version of `write_file_atomic` for a group of files.
/// Every temp file is written before any is renamed; on failure the temp
/// files and any already renamed targets are removed.
pub fn write_files_atomic(files: &[(&Path, &[u8])]) -> Result<()> {
    let staged: Vec<PathBuf> = files.iter().map(|(path, _)| part_path(path)).collect();

    for ((_, bytes), tmp) in files.iter().zip(&staged) {
        if let Err(e) = std::fs::write(tmp, bytes) {
            remove_all(&staged);
            return Err(e.into());
        }
    }

    for (i, ((path, _), tmp)) in files.iter().zip(&staged).enumerate() {
        if let Err(e) = std::fs::rename(tmp, path) {
            remove_all(&staged[i..]);
            for (done, _) in &files[..i] {
                let _ = std::fs::remove_file(done);
            }
            return Err(e.into());
        }
    }
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}

// ---------------------------------------------------------------------------
//  File handler (native dialogs)
// ---------------------------------------------------------------------------

/// Native open/folder dialogs. Remembers the last directory used.
#[derive(Default)]
pub struct FileHandler {
    pub last_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn dialog(&self) -> FileDialog {
        let dialog = FileDialog::new();
        match &self.last_dir {
            Some(dir) => dialog.set_directory(dir),
            None => dialog,
        }
    }

    /// Ask for an image file. `None` when the user cancels.
    pub fn pick_image(&mut self) -> Option<PathBuf> {
        let path = self
            .dialog()
            .add_filter("PNG", &["png"])
            .add_filter("Images", IMAGE_EXTENSIONS)
            .add_filter("All Files", &["*"])
            .pick_file()?;
        self.last_dir = path.parent().map(Path::to_path_buf);
        Some(path)
    }

    /// Ask for a directory. `None` when the user cancels.
    pub fn pick_folder(&mut self) -> Option<PathBuf> {
        let dir = self.dialog().pick_folder()?;
        self.last_dir = Some(dir.clone());
        Some(dir)
    }
}
