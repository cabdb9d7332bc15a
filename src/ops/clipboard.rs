// ============================================================================
// CLIPBOARD - platform clipboard behind a two-call capability
// ============================================================================

use image::{DynamicImage, RgbImage, RgbaImage};

use crate::error::{Result, StackerError};

/// What the editor needs from a clipboard. Keeps the editor free of any
/// OS-specific bitmap encoding.
pub trait ClipboardPort {
    /// Replace the clipboard contents with `img`.
    fn put_image(&mut self, img: &RgbImage) -> Result<()>;
    /// Current clipboard image, or `None` when the clipboard holds none.
    fn get_image(&mut self) -> Result<Option<RgbImage>>;
}

// ---------------------------------------------------------------------------
//  System clipboard (OS-level copy/paste via arboard)
// ---------------------------------------------------------------------------

/// The OS clipboard. A fresh `arboard::Clipboard` is opened per call so the
/// clipboard is never held open between events.
#[derive(Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardPort for SystemClipboard {
    fn put_image(&mut self, img: &RgbImage) -> Result<()> {
        // arboard wants RGBA; on Windows it publishes the image as a DIB.
        let rgba = DynamicImage::ImageRgb8(img.clone()).into_rgba8();
        let data = arboard::ImageData {
            width: rgba.width() as usize,
            height: rgba.height() as usize,
            bytes: std::borrow::Cow::Borrowed(rgba.as_raw()),
        };
        arboard::Clipboard::new()?.set_image(data)?;
        log::info!("Copied {}×{} image to clipboard", img.width(), img.height());
        Ok(())
    }

    /// Handles three cases:
    ///   1. Raw image data (Print Screen, copied from another image editor).
    ///   2. A file copied in Explorer (CF_HDROP file list), Windows only.
    ///   3. Text on the clipboard that is a path to an image file.
    fn get_image(&mut self) -> Result<Option<RgbImage>> {
        let mut clip = arboard::Clipboard::new()?;
        match clip.get_image() {
            Ok(img_data) => {
                if let Some(img) = RgbaImage::from_raw(
                    img_data.width as u32,
                    img_data.height as u32,
                    img_data.bytes.into_owned(),
                ) {
                    return Ok(Some(DynamicImage::ImageRgba8(img).to_rgb8()));
                }
                log::warn!("Clipboard image had an unexpected buffer size");
            }
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => log::warn!("Reading clipboard image failed: {}", e),
        }

        #[cfg(target_os = "windows")]
        {
            if let Some(img) = read_image_from_clipboard_file_list() {
                return Ok(Some(img));
            }
        }

        if let Ok(text) = clip.get_text() {
            let path = std::path::Path::new(text.trim());
            if path.is_file()
                && let Ok(dyn_img) = image::open(path)
            {
                log::info!("Using clipboard path {} as image", path.display());
                return Ok(Some(dyn_img.to_rgb8()));
            }
        }

        Ok(None)
    }
}

/// On Windows, read the CF_HDROP file list from the clipboard and try to
/// open the first image-format file found.
#[cfg(target_os = "windows")]
fn read_image_from_clipboard_file_list() -> Option<RgbImage> {
    use std::ptr;
    use winapi::um::shellapi::{DragQueryFileW, HDROP};
    use winapi::um::winuser::{CF_HDROP, CloseClipboard, GetClipboardData, OpenClipboard};

    unsafe {
        if OpenClipboard(ptr::null_mut()) == 0 {
            return None;
        }

        let handle = GetClipboardData(CF_HDROP);
        if handle.is_null() {
            CloseClipboard();
            return None;
        }

        let hdrop = handle as HDROP;
        let count = DragQueryFileW(hdrop, 0xFFFFFFFF, ptr::null_mut(), 0);
        let mut paths = Vec::new();
        for i in 0..count {
            let len = DragQueryFileW(hdrop, i, ptr::null_mut(), 0);
            if len == 0 {
                continue;
            }
            let mut buf: Vec<u16> = vec![0u16; (len + 1) as usize];
            DragQueryFileW(hdrop, i, buf.as_mut_ptr(), len + 1);
            paths.push(std::path::PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])));
        }
        CloseClipboard();

        // Decode after the clipboard is closed again.
        paths
            .iter()
            .filter(|p| crate::io::has_image_extension(p))
            .find_map(|p| image::open(p).ok())
            .map(|img| img.to_rgb8())
    }
}

// ---------------------------------------------------------------------------
//  In-memory clipboard
// ---------------------------------------------------------------------------

/// Process-local clipboard. Used by headless runs that must not touch the
/// user's clipboard, and by tests.
#[derive(Default, Debug, Clone)]
pub struct MemoryClipboard {
    image: Option<RgbImage>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(img: RgbImage) -> Self {
        Self { image: Some(img) }
    }

    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }
}

impl ClipboardPort for MemoryClipboard {
    fn put_image(&mut self, img: &RgbImage) -> Result<()> {
        self.image = Some(img.clone());
        Ok(())
    }

    fn get_image(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.image.clone())
    }
}

/// Fetch an image or fail with `ClipboardEmpty`.
pub fn require_image(clipboard: &mut dyn ClipboardPort) -> Result<RgbImage> {
    clipboard.get_image()?.ok_or(StackerError::ClipboardEmpty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn memory_clipboard_holds_last_image() {
        let mut clip = MemoryClipboard::new();
        assert!(clip.get_image().unwrap().is_none());
        clip.put_image(&RgbImage::from_pixel(2, 3, Rgb([1, 2, 3]))).unwrap();
        clip.put_image(&RgbImage::from_pixel(4, 5, Rgb([9, 9, 9]))).unwrap();
        let got = clip.get_image().unwrap().unwrap();
        assert_eq!(got.dimensions(), (4, 5));
    }

    #[test]
    fn require_image_reports_empty_clipboard() {
        let mut clip = MemoryClipboard::new();
        assert!(matches!(require_image(&mut clip), Err(StackerError::ClipboardEmpty)));
        let mut clip = MemoryClipboard::with_image(RgbImage::new(1, 1));
        assert!(require_image(&mut clip).is_ok());
    }
}
