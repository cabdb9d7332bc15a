// ============================================================================
// SETTINGS - persisted key=value configuration
// ============================================================================

use std::path::PathBuf;

/// Longest side of an exported capture, in pixels.
pub const DEFAULT_MAX_EXPORT_DIMENSION: u32 = 1500;
/// Largest accepted `max_export_dimension`.
pub const MAX_EXPORT_DIMENSION_LIMIT: u32 = 65535;
/// File stem used for captures when timestamp naming is off.
pub const DEFAULT_SAVE_NAME: &str = "tmp";
pub const DEFAULT_COMPOSITE_FILE: &str = "tmp.png";
pub const DEFAULT_MASK_FILE: &str = "mask.png";

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Longest side of an exported capture
    pub max_export_dimension: u32,
    /// Scale captures smaller than `max_export_dimension` up to it
    pub upscale_small_crops: bool,
    /// Capture file stem when timestamp naming is off
    pub default_save_name: String,
    /// Composite image file name, relative to `output_dir`
    pub composite_file_name: String,
    /// Mask image file name, relative to `output_dir`
    pub mask_file_name: String,
    /// Where the composite and mask are written
    pub output_dir: PathBuf,

    // Toolbar state, restored on next launch
    pub save_dir: Option<PathBuf>,
    pub patch_from_clipboard: bool,
    pub copy_result: bool,
    pub save_crop: bool,
    pub timestamp_names: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_export_dimension: DEFAULT_MAX_EXPORT_DIMENSION,
            upscale_small_crops: true,
            default_save_name: DEFAULT_SAVE_NAME.to_string(),
            composite_file_name: DEFAULT_COMPOSITE_FILE.to_string(),
            mask_file_name: DEFAULT_MASK_FILE.to_string(),
            output_dir: PathBuf::from("."),
            save_dir: None,
            patch_from_clipboard: true,
            copy_result: true,
            save_crop: true,
            timestamp_names: true,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/imagestacker/imagestacker_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\ImageStacker\imagestacker_settings.cfg
    /// On macOS:   ~/Library/Application Support/ImageStacker/imagestacker_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("imagestacker");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("imagestacker_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("ImageStacker");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("imagestacker_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("ImageStacker");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("imagestacker_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("imagestacker_settings.cfg")))
        }
    }

    /// Render settings in the on-disk `key=value` form.
    pub fn to_config_string(&self) -> String {
        let save_dir = self
            .save_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!(
            "max_export_dimension={}\n\
             upscale_small_crops={}\n\
             default_save_name={}\n\
             composite_file_name={}\n\
             mask_file_name={}\n\
             output_dir={}\n\
             save_dir={}\n\
             patch_from_clipboard={}\n\
             copy_result={}\n\
             save_crop={}\n\
             timestamp_names={}\n",
            self.max_export_dimension,
            self.upscale_small_crops,
            self.default_save_name,
            self.composite_file_name,
            self.mask_file_name,
            self.output_dir.display(),
            save_dir,
            self.patch_from_clipboard,
            self.copy_result,
            self.save_crop,
            self.timestamp_names,
        )
    }

    /// Parse settings text. Unknown keys are skipped and unparsable values
    /// keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_export_dimension" => {
                    s.max_export_dimension = val
                        .parse::<u32>()
                        .unwrap_or(DEFAULT_MAX_EXPORT_DIMENSION)
                        .clamp(1, MAX_EXPORT_DIMENSION_LIMIT);
                }
                "upscale_small_crops" => s.upscale_small_crops = val == "true",
                "default_save_name" => {
                    if !val.is_empty() {
                        s.default_save_name = val.to_string();
                    }
                }
                "composite_file_name" => {
                    if !val.is_empty() {
                        s.composite_file_name = val.to_string();
                    }
                }
                "mask_file_name" => {
                    if !val.is_empty() {
                        s.mask_file_name = val.to_string();
                    }
                }
                "output_dir" => {
                    if !val.is_empty() {
                        s.output_dir = PathBuf::from(val);
                    }
                }
                "save_dir" => {
                    s.save_dir = (!val.is_empty()).then(|| PathBuf::from(val));
                }
                "patch_from_clipboard" => s.patch_from_clipboard = val == "true",
                "copy_result" => s.copy_result = val == "true",
                "save_crop" => s.save_crop = val == "true",
                "timestamp_names" => s.timestamp_names = val == "true",
                _ => {}
            }
        }
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log::warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str(&content)
    }

    /// Full path of the composite output file.
    pub fn composite_path(&self) -> PathBuf {
        self.output_dir.join(&self.composite_file_name)
    }

    /// Full path of the mask output file.
    pub fn mask_path(&self) -> PathBuf {
        self.output_dir.join(&self.mask_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let s = AppSettings::default();
        assert_eq!(s.max_export_dimension, 1500);
        assert_eq!(s.default_save_name, "tmp");
        assert!(s.upscale_small_crops);
        assert!(s.patch_from_clipboard && s.copy_result && s.save_crop && s.timestamp_names);
        assert!(s.save_dir.is_none());
        assert_eq!(s.composite_path(), PathBuf::from("./tmp.png"));
        assert_eq!(s.mask_path(), PathBuf::from("./mask.png"));
    }

    #[test]
    fn config_text_survives_reparse() {
        let s = AppSettings {
            max_export_dimension: 800,
            upscale_small_crops: false,
            save_dir: Some(PathBuf::from("/tmp/captures")),
            copy_result: false,
            timestamp_names: false,
            ..AppSettings::default()
        };
        assert_eq!(AppSettings::from_config_str(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back() {
        let s = AppSettings::from_config_str(
            "max_export_dimension=lots\n\
             nonsense line\n\
             unknown_key=1\n\
             save_dir=\n\
             default_save_name=\n",
        );
        assert_eq!(s, AppSettings::default());
    }

    #[test]
    fn dimension_is_clamped_to_range() {
        let s = AppSettings::from_config_str("max_export_dimension=0");
        assert_eq!(s.max_export_dimension, 1);
        let s = AppSettings::from_config_str("max_export_dimension=4000000000");
        assert_eq!(s.max_export_dimension, MAX_EXPORT_DIMENSION_LIMIT);
    }
}
