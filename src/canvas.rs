// ============================================================================
// CANVAS - zoomable / scrollable view of the base image and the selection
// ============================================================================
//
// Screen coordinates here are always relative to the canvas origin (top-left
// of the area the canvas occupies), not to the window.

use std::str::FromStr;

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions, Vec2};
use image::RgbImage;

use crate::session::{EditorEvent, EditorState};

pub const ZOOM_MIN: f32 = 0.1;
pub const ZOOM_MAX: f32 = 10.0;
/// Zoom multiplier for one wheel notch (inverse when zooming out).
pub const ZOOM_STEP: f32 = 1.1;

const CANVAS_BG: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
const SELECTION_STROKE: Color32 = Color32::RED;

// ---------------------------------------------------------------------------
//  View state
// ---------------------------------------------------------------------------

/// Presentational zoom and scroll. Never affects stored pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub zoom: f32,
    /// Distance the view is scrolled into the zoomed image, in screen pixels.
    pub scroll: Vec2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            scroll: Vec2::ZERO,
        }
    }
}

impl ViewState {
    /// `(sx + scroll_x) / zoom`, `(sy + scroll_y) / zoom`
    pub fn screen_to_image(&self, screen: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x + self.scroll.x) / self.zoom,
            (screen.y + self.scroll.y) / self.zoom,
        )
    }

    pub fn image_to_screen(&self, image: Pos2) -> Pos2 {
        Pos2::new(
            image.x * self.zoom - self.scroll.x,
            image.y * self.zoom - self.scroll.y,
        )
    }

    /// One wheel notch in or out, clamped to `[ZOOM_MIN, ZOOM_MAX]`.
    pub fn zoomed(self, zoom_in: bool) -> Self {
        let factor = if zoom_in { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
        Self {
            zoom: (self.zoom * factor).clamp(ZOOM_MIN, ZOOM_MAX),
            ..self
        }
    }

    /// Keep the scroll offset inside the scrollable region: the zoomed image
    /// minus what the viewport already shows.
    pub fn clamped(self, image_size: [u32; 2], viewport: Vec2) -> Self {
        let max_x = (image_size[0] as f32 * self.zoom - viewport.x).max(0.0);
        let max_y = (image_size[1] as f32 * self.zoom - viewport.y).max(0.0);
        Self {
            scroll: Vec2::new(self.scroll.x.clamp(0.0, max_x), self.scroll.y.clamp(0.0, max_y)),
            ..self
        }
    }

    /// Screen rectangle the whole image occupies.
    pub fn image_rect(&self, image_size: [u32; 2]) -> Rect {
        Rect::from_min_max(
            self.image_to_screen(Pos2::ZERO),
            self.image_to_screen(Pos2::new(image_size[0] as f32, image_size[1] as f32)),
        )
    }
}

// ---------------------------------------------------------------------------
//  Selection rectangle
// ---------------------------------------------------------------------------

/// Region of interest in base-image pixels. Always normalized:
/// `x0 <= x1` and `y0 <= y1`. `x1`/`y1` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SelectionRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl SelectionRect {
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        }
    }

    /// Build from two image-space points. Coordinates are truncated toward
    /// zero; anything left of or above the image saturates to 0.
    pub fn from_image_points(a: Pos2, b: Pos2) -> Self {
        Self::from_corners((a.x as u32, a.y as u32), (b.x as u32, b.y as u32))
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersect with an image of the given size.
    pub fn clamped_to(&self, width: u32, height: u32) -> Self {
        Self {
            x0: self.x0.min(width),
            y0: self.y0.min(height),
            x1: self.x1.min(width),
            y1: self.y1.min(height),
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

impl std::fmt::Display for SelectionRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) {}×{}",
            self.x0,
            self.y0,
            self.x1,
            self.y1,
            self.width(),
            self.height()
        )
    }
}

/// Parses `x0,y0,x1,y1` with corners in any order.
impl FromStr for SelectionRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected X0,Y0,X1,Y1 but got '{}'", s));
        }
        let mut v = [0u32; 4];
        for (slot, part) in v.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a pixel coordinate", part))?;
        }
        Ok(Self::from_corners((v[0], v[1]), (v[2], v[3])))
    }
}

// ---------------------------------------------------------------------------
//  Canvas widget
// ---------------------------------------------------------------------------

/// Renders the base image and selection, and turns raw pointer input into
/// `EditorEvent`s. Holds only the GPU texture; all editor state lives in
/// `EditorState`.
#[derive(Default)]
pub struct Canvas {
    texture: Option<TextureHandle>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached texture so the next frame uploads the new image.
    pub fn invalidate(&mut self) {
        self.texture = None;
    }

    fn ensure_texture(&mut self, ctx: &egui::Context, image: &RgbImage) -> &TextureHandle {
        self.texture.get_or_insert_with(|| {
            let size = [image.width() as usize, image.height() as usize];
            let color_image = egui::ColorImage::from_rgb(size, image.as_raw());
            ctx.load_texture("base-image", color_image, TextureOptions::LINEAR)
        })
    }

    /// Draw one frame and collect this frame's input events.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        image: Option<&RgbImage>,
        state: &EditorState,
    ) -> Vec<EditorEvent> {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas_rect = response.rect;
        let origin = canvas_rect.min.to_vec2();
        painter.rect_filled(canvas_rect, 0.0, CANVAS_BG);

        let mut events = Vec::new();
        if state.viewport != canvas_rect.size() {
            events.push(EditorEvent::ViewportResized(canvas_rect.size()));
        }

        let Some(image) = image else {
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Load an image to begin",
                egui::FontId::proportional(18.0),
                Color32::from_gray(180),
            );
            return events;
        };

        let texture_id = self.ensure_texture(ui.ctx(), image).id();
        let size = [image.width(), image.height()];
        let image_rect = state.view.image_rect(size).translate(origin);
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        painter
            .with_clip_rect(canvas_rect)
            .image(texture_id, image_rect, uv, Color32::WHITE);

        let clipped = painter.with_clip_rect(canvas_rect);
        let stroke = Stroke::new(1.5, SELECTION_STROKE);
        if let Some(rect) = state.drag_outline() {
            clipped.rect_stroke(rect.translate(origin), 0.0, stroke);
        } else if let Some(sel) = state.selection {
            let a = state.view.image_to_screen(Pos2::new(sel.x0 as f32, sel.y0 as f32));
            let b = state.view.image_to_screen(Pos2::new(sel.x1 as f32, sel.y1 as f32));
            clipped.rect_stroke(Rect::from_two_pos(a, b).translate(origin), 0.0, stroke);
        }

        let local = |p: Pos2| p - origin;
        let (pan_modifier, pan_released, press_origin, latest_pos, scroll_y) = ui.input(|i| {
            (
                i.key_down(egui::Key::Space),
                i.key_released(egui::Key::Space),
                i.pointer.press_origin(),
                i.pointer.interact_pos(),
                i.scroll_delta.y,
            )
        });

        // Space belongs to panning while over the canvas, not to a focused button.
        if response.hovered() {
            ui.memory_mut(|m| {
                if let Some(id) = m.focus() {
                    m.surrender_focus(id);
                }
            });
        }

        if pan_released {
            events.push(EditorEvent::PanModifierReleased);
        }
        if response.drag_started() {
            if let Some(pos) = press_origin.or(response.interact_pointer_pos()) {
                events.push(EditorEvent::PointerPressed {
                    pos: local(pos),
                    pan_modifier,
                });
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                events.push(EditorEvent::PointerMoved { pos: local(pos) });
            }
        }
        if response.drag_released() {
            if let Some(pos) = response.interact_pointer_pos().or(latest_pos) {
                events.push(EditorEvent::PointerReleased { pos: local(pos) });
            }
        }
        if response.hovered() && scroll_y != 0.0 {
            events.push(EditorEvent::Wheel {
                zoom_in: scroll_y > 0.0,
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_inverts_rendering() {
        let zooms = [0.1_f32, 0.37, 1.0, 1.1, 2.5, 10.0];
        let scrolls = [Vec2::ZERO, Vec2::new(13.0, 250.5), Vec2::new(4000.0, 17.25)];
        let points = [Pos2::ZERO, Pos2::new(1.0, 1.0), Pos2::new(123.4, 987.6), Pos2::new(1999.0, 999.0)];
        for &zoom in &zooms {
            for &scroll in &scrolls {
                let view = ViewState { zoom, scroll };
                for &p in &points {
                    let back = view.screen_to_image(view.image_to_screen(p));
                    assert!((back.x - p.x).abs() < 1e-2, "{zoom} {scroll:?} {p:?} -> {back:?}");
                    assert!((back.y - p.y).abs() < 1e-2, "{zoom} {scroll:?} {p:?} -> {back:?}");
                }
            }
        }
    }

    #[test]
    fn mapping_includes_scroll() {
        let view = ViewState {
            zoom: 2.0,
            scroll: Vec2::new(100.0, 40.0),
        };
        assert_eq!(view.screen_to_image(Pos2::new(0.0, 0.0)), Pos2::new(50.0, 20.0));
        assert_eq!(view.screen_to_image(Pos2::new(100.0, 60.0)), Pos2::new(100.0, 50.0));
    }

    #[test]
    fn zoom_steps_and_clamps() {
        let v = ViewState::default().zoomed(true);
        assert!((v.zoom - 1.1).abs() < 1e-6);
        let v = v.zoomed(false);
        assert!((v.zoom - 1.0).abs() < 1e-6);

        let mut v = ViewState::default();
        for _ in 0..100 {
            v = v.zoomed(true);
        }
        assert_eq!(v.zoom, ZOOM_MAX);
        for _ in 0..200 {
            v = v.zoomed(false);
        }
        assert_eq!(v.zoom, ZOOM_MIN);
    }

    #[test]
    fn scroll_stays_inside_zoomed_image() {
        let view = ViewState {
            zoom: 2.0,
            scroll: Vec2::new(5000.0, -30.0),
        };
        let v = view.clamped([1000, 500], Vec2::new(800.0, 600.0));
        assert_eq!(v.scroll, Vec2::new(1200.0, 0.0));

        // Image smaller than the viewport cannot scroll at all.
        let v = view.clamped([100, 100], Vec2::new(800.0, 600.0));
        assert_eq!(v.scroll, Vec2::ZERO);
    }

    #[test]
    fn corners_normalize_in_any_order() {
        let pairs = [
            ((10, 20), (30, 40)),
            ((30, 40), (10, 20)),
            ((30, 20), (10, 40)),
            ((10, 40), (30, 20)),
            ((7, 7), (7, 7)),
        ];
        for (a, b) in pairs {
            let r = SelectionRect::from_corners(a, b);
            assert!(r.x0 <= r.x1 && r.y0 <= r.y1);
        }
        assert_eq!(
            SelectionRect::from_corners((30, 20), (10, 40)),
            SelectionRect { x0: 10, y0: 20, x1: 30, y1: 40 }
        );
    }

    #[test]
    fn image_points_truncate_and_saturate() {
        let r = SelectionRect::from_image_points(Pos2::new(-4.5, 10.9), Pos2::new(20.99, 3.2));
        assert_eq!(r, SelectionRect { x0: 0, y0: 3, x1: 20, y1: 10 });
    }

    #[test]
    fn clamping_and_emptiness() {
        let r = SelectionRect { x0: 90, y0: 10, x1: 150, y1: 40 }.clamped_to(100, 100);
        assert_eq!(r, SelectionRect { x0: 90, y0: 10, x1: 100, y1: 40 });
        assert!(!r.is_empty());
        let r = SelectionRect { x0: 120, y0: 10, x1: 150, y1: 40 }.clamped_to(100, 100);
        assert!(r.is_empty());
    }

    #[test]
    fn parses_cli_rectangles() {
        let r: SelectionRect = "600, 400,100,100".parse().unwrap();
        assert_eq!(r, SelectionRect { x0: 100, y0: 100, x1: 600, y1: 400 });
        assert!("1,2,3".parse::<SelectionRect>().is_err());
        assert!("1,2,x,4".parse::<SelectionRect>().is_err());
    }
}
