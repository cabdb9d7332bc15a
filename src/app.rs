// ============================================================================
// APP - eframe application: toolbar, shortcuts, canvas and notifications
// ============================================================================

use std::path::{Path, PathBuf};

use eframe::egui;
use rfd::{MessageDialog, MessageLevel};

use crate::canvas::{Canvas, SelectionRect};
use crate::error::{Result, StackerError};
use crate::io::{BaseImage, FileHandler};
use crate::logger;
use crate::ops::clipboard::{ClipboardPort, SystemClipboard};
use crate::ops::export::{self, ExportOptions};
use crate::ops::overlay::{self, OverlayOptions, PatchSource};
use crate::session::{EditorEvent, EditorState};
use crate::settings::AppSettings;

pub struct StackerApp {
    settings: AppSettings,
    state: EditorState,
    base: Option<BaseImage>,
    canvas: Canvas,
    file_handler: FileHandler,
    clipboard: Box<dyn ClipboardPort>,
}

impl StackerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::with_parts(AppSettings::load(), Box::new(SystemClipboard::new()))
    }

    pub fn with_parts(settings: AppSettings, clipboard: Box<dyn ClipboardPort>) -> Self {
        Self {
            settings,
            state: EditorState::default(),
            base: None,
            canvas: Canvas::new(),
            file_handler: FileHandler::new(),
            clipboard,
        }
    }

    fn dispatch(&mut self, event: EditorEvent) {
        let transition = self.state.apply(event);
        self.state = transition.state;
        if let Some(selection) = transition.completed {
            self.export(selection);
        }
    }

    // -- Actions -------------------------------------------------------------

    fn load_base(&mut self) {
        let Some(path) = self.file_handler.pick_image() else { return };
        match BaseImage::load(&path) {
            Ok(base) => {
                let (width, height) = base.size();
                self.install_base(base, EditorEvent::ImageLoaded { width, height });
            }
            Err(e) => report(&e),
        }
    }

    fn reload_base(&mut self) {
        match BaseImage::reload_current(self.base.as_ref()) {
            Ok(base) => {
                let (width, height) = base.size();
                self.install_base(base, EditorEvent::ImageReloaded { width, height });
            }
            Err(e) => report(&e),
        }
    }

    fn install_base(&mut self, base: BaseImage, event: EditorEvent) {
        self.base = Some(base);
        self.canvas.invalidate();
        self.dispatch(event);
    }

    fn choose_save_dir(&mut self) {
        if let Some(dir) = self.file_handler.pick_folder() {
            log::info!("Save folder set to {}", dir.display());
            self.settings.save_dir = Some(dir);
        }
    }

    fn export(&mut self, selection: SelectionRect) {
        let opts = ExportOptions::from_settings(&self.settings);
        let base = self.base.as_ref().map(|b| &b.pixels);
        match export::export_selection(base, selection, &opts, self.clipboard.as_mut()) {
            Ok(outcome) => {
                let mut msg = format!(
                    "Capture ({}×{}) copied to the clipboard",
                    outcome.image.width(),
                    outcome.image.height()
                );
                if let Some(path) = outcome.saved_to {
                    msg.push_str(&format!("\nSaved to {}", path.display()));
                }
                inform("Done", &msg);
            }
            Err(e) => report(&e),
        }
    }

    fn overlay(&mut self) {
        match self.try_overlay() {
            Ok(Some(outcome)) => inform("Done", &format!("Wrote {}", outcome.composite_path.display())),
            Ok(None) => {}
            Err(e) => report(&e),
        }
    }

    /// `Ok(None)` when the user cancelled the patch file picker.
    fn try_overlay(&mut self) -> Result<Option<overlay::OverlayOutcome>> {
        let base = self.base.as_ref().map(|b| &b.pixels);
        let (size, selection) = overlay::check_ready(base, self.state.selection)?;
        let source = if self.settings.patch_from_clipboard {
            PatchSource::Clipboard
        } else {
            match self.file_handler.pick_image() {
                Some(path) => PatchSource::File(path),
                None => return Ok(None),
            }
        };
        let patch = overlay::load_patch(&source, self.clipboard.as_mut())?;
        let opts = OverlayOptions::from_settings(&self.settings);
        overlay::apply_overlay(size, selection, &patch, &opts, self.clipboard.as_mut()).map(Some)
    }

    // -- UI ------------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let reload = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::F5));
        let overlay = ctx.input_mut(|i| {
            // Text on the clipboard arrives as a Paste event instead of the key.
            i.consume_key(egui::Modifiers::COMMAND, egui::Key::V)
                || i.events.iter().any(|e| matches!(e, egui::Event::Paste(_)))
        });
        if reload {
            self.reload_base();
        }
        if overlay {
            self.overlay();
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Load image").clicked() {
                self.load_base();
            }
            if ui.button("Reload (F5)").clicked() {
                self.reload_base();
            }
            if ui.button("Overlay (Ctrl+V)").clicked() {
                self.overlay();
            }
            ui.separator();
            ui.checkbox(&mut self.settings.patch_from_clipboard, "Patch from clipboard");
            ui.checkbox(&mut self.settings.copy_result, "Copy result to clipboard");
            ui.checkbox(&mut self.settings.save_crop, "Save capture");
            ui.checkbox(&mut self.settings.timestamp_names, "Timestamp names");
            if ui.button("Choose save folder").clicked() {
                self.choose_save_dir();
            }
        });
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Zoom {:.0}%", self.state.view.zoom * 100.0));
            ui.separator();
            match self.state.selection {
                Some(sel) => ui.label(format!("Selection {}", sel)),
                None => ui.label("No selection"),
            };
            ui.separator();
            match &self.settings.save_dir {
                Some(dir) => ui.label(format!("Save folder {}", dir.display())),
                None => ui.label("No save folder"),
            };
            ui.separator();
            ui.label("Hold Space and drag to pan");
        });
    }
}

impl eframe::App for StackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let title = match &self.base {
            Some(base) => format!("ImageStacker - {}", base.path.display()),
            None => "ImageStacker".to_string(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));

        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::bottom("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
            self.status_line(ui);
        });

        let events = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let image = self.base.as_ref().map(|b| &b.pixels);
                self.canvas.show(ui, image, &self.state)
            })
            .inner;
        for event in events {
            self.dispatch(event);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
        log::info!("Session ended");
    }
}

// ---------------------------------------------------------------------------
//  Notifications (blocking native message boxes)
// ---------------------------------------------------------------------------

fn report(err: &StackerError) {
    if err.is_precondition() {
        log::warn!("{}", err);
    } else {
        log::error!("{}", err);
    }
    let description = error_description(err, logger::log_path().map(PathBuf::as_path));
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Error")
        .set_description(&description)
        .show();
}

/// Dialog text for `err`. Failures outside the user's control point at the
/// session log.
fn error_description(err: &StackerError, log_path: Option<&Path>) -> String {
    match log_path {
        Some(path) if !err.is_precondition() => {
            format!("{}\n\nDetails are in the session log:\n{}", err, path.display())
        }
        _ => err.to_string(),
    }
}

fn inform(title: &str, msg: &str) {
    log::info!("{}", msg);
    MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(title)
        .set_description(msg)
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_dialog_points_at_log() {
        let log = Path::new("/tmp/imagestacker.log");
        let err = StackerError::Clipboard("busy".into());
        let text = error_description(&err, Some(log));
        assert!(text.starts_with(&err.to_string()));
        assert!(text.ends_with("/tmp/imagestacker.log"));
    }

    #[test]
    fn precondition_dialog_is_just_the_message() {
        let log = Path::new("/tmp/imagestacker.log");
        let err = StackerError::NoSelection;
        assert_eq!(error_description(&err, Some(log)), err.to_string());

        let failure = StackerError::Clipboard("busy".into());
        assert_eq!(error_description(&failure, None), failure.to_string());
    }
}
