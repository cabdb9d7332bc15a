// ============================================================================
// SESSION - editor state snapshot and its event-driven transitions
// ============================================================================
//
// Every input event produces a fresh `EditorState`. The large pixel buffers
// are not part of the snapshot; the app owns them and only tells the session
// about their size (`ImageLoaded`).

use eframe::egui;
use egui::{Pos2, Rect, Vec2};

use crate::canvas::{SelectionRect, ViewState};

/// What the primary pointer is currently doing on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Drawing a selection. Both points are canvas-local screen coordinates.
    Selecting { anchor: Pos2, current: Pos2 },
    /// Scrolling the view while the pan modifier is held.
    Panning { last: Pos2 },
}

/// Discrete inputs the editor reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditorEvent {
    PointerPressed { pos: Pos2, pan_modifier: bool },
    PointerMoved { pos: Pos2 },
    PointerReleased { pos: Pos2 },
    Wheel { zoom_in: bool },
    PanModifierReleased,
    ViewportResized(Vec2),
    /// A different base image replaced the old one.
    ImageLoaded { width: u32, height: u32 },
    /// The same file was decoded again; the selection survives.
    ImageReloaded { width: u32, height: u32 },
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct EditorState {
    pub view: ViewState,
    pub drag: DragState,
    pub selection: Option<SelectionRect>,
    /// Size of the loaded base image, if any.
    pub image_size: Option<[u32; 2]>,
    /// Size of the canvas on screen.
    pub viewport: Vec2,
}

/// Result of applying one event.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: EditorState,
    /// Set when this event finished a selection drag; the caller exports it.
    pub completed: Option<SelectionRect>,
}

impl Transition {
    fn unchanged(state: &EditorState) -> Self {
        Self::to(state.clone())
    }

    fn to(state: EditorState) -> Self {
        Self {
            state,
            completed: None,
        }
    }
}

impl EditorState {
    pub fn has_image(&self) -> bool {
        self.image_size.is_some()
    }

    /// Outline of the selection being drawn, in canvas-local screen space.
    pub fn drag_outline(&self) -> Option<Rect> {
        match self.drag {
            DragState::Selecting { anchor, current } => Some(Rect::from_two_pos(anchor, current)),
            _ => None,
        }
    }

    /// Apply one event and return the next snapshot.
    pub fn apply(&self, event: EditorEvent) -> Transition {
        match event {
            EditorEvent::ImageLoaded { width, height } => Transition::to(EditorState {
                view: ViewState::default(),
                drag: DragState::Idle,
                selection: None,
                image_size: Some([width, height]),
                viewport: self.viewport,
            }),
            EditorEvent::ImageReloaded { width, height } => Transition::to(EditorState {
                view: ViewState::default(),
                drag: DragState::Idle,
                selection: self
                    .selection
                    .map(|sel| sel.clamped_to(width, height))
                    .filter(|sel| !sel.is_empty()),
                image_size: Some([width, height]),
                viewport: self.viewport,
            }),
            EditorEvent::ViewportResized(viewport) => {
                let mut next = self.clone();
                next.viewport = viewport;
                next.view = next.clamp_view(next.view);
                Transition::to(next)
            }
            // Pointer and wheel input do nothing until an image is loaded.
            _ if !self.has_image() => Transition::unchanged(self),
            EditorEvent::Wheel { zoom_in } => {
                let mut next = self.clone();
                next.view = self.clamp_view(self.view.zoomed(zoom_in));
                Transition::to(next)
            }
            EditorEvent::PointerPressed { pos, pan_modifier } => {
                let mut next = self.clone();
                next.drag = if pan_modifier {
                    DragState::Panning { last: pos }
                } else {
                    DragState::Selecting {
                        anchor: pos,
                        current: pos,
                    }
                };
                Transition::to(next)
            }
            EditorEvent::PointerMoved { pos } => {
                let mut next = self.clone();
                match self.drag {
                    DragState::Selecting { anchor, .. } => {
                        next.drag = DragState::Selecting {
                            anchor,
                            current: pos,
                        };
                    }
                    DragState::Panning { last } => {
                        let mut view = self.view;
                        view.scroll += last - pos;
                        next.view = self.clamp_view(view);
                        next.drag = DragState::Panning { last: pos };
                    }
                    DragState::Idle => {}
                }
                Transition::to(next)
            }
            EditorEvent::PointerReleased { pos } => match self.drag {
                DragState::Selecting { anchor, .. } => {
                    let mut next = self.clone();
                    next.drag = DragState::Idle;
                    let mut rect = SelectionRect::from_image_points(
                        self.view.screen_to_image(anchor),
                        self.view.screen_to_image(pos),
                    );
                    if let Some([w, h]) = self.image_size {
                        rect = rect.clamped_to(w, h);
                    }
                    // A click, or a drag entirely off the image, keeps the old selection.
                    if rect.is_empty() {
                        return Transition::to(next);
                    }
                    next.selection = Some(rect);
                    Transition {
                        state: next,
                        completed: Some(rect),
                    }
                }
                DragState::Panning { .. } => {
                    let mut next = self.clone();
                    next.drag = DragState::Idle;
                    Transition::to(next)
                }
                DragState::Idle => Transition::unchanged(self),
            },
            EditorEvent::PanModifierReleased => match self.drag {
                DragState::Panning { .. } => {
                    let mut next = self.clone();
                    next.drag = DragState::Idle;
                    Transition::to(next)
                }
                _ => Transition::unchanged(self),
            },
        }
    }

    fn clamp_view(&self, view: ViewState) -> ViewState {
        match self.image_size {
            Some(size) => view.clamped(size, self.viewport),
            None => view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(w: u32, h: u32) -> EditorState {
        let s = EditorState::default()
            .apply(EditorEvent::ViewportResized(Vec2::new(800.0, 600.0)))
            .state;
        s.apply(EditorEvent::ImageLoaded { width: w, height: h }).state
    }

    fn drag(state: &EditorState, from: Pos2, to: Pos2, pan: bool) -> Transition {
        let s = state
            .apply(EditorEvent::PointerPressed { pos: from, pan_modifier: pan })
            .state;
        let s = s.apply(EditorEvent::PointerMoved { pos: to }).state;
        s.apply(EditorEvent::PointerReleased { pos: to })
    }

    #[test]
    fn drag_produces_image_space_selection() {
        let s = loaded(2000, 1000);
        let t = drag(&s, Pos2::new(600.0, 400.0), Pos2::new(100.0, 100.0), false);
        let expected = SelectionRect { x0: 100, y0: 100, x1: 600, y1: 400 };
        assert_eq!(t.completed, Some(expected));
        assert_eq!(t.state.selection, Some(expected));
        assert_eq!(t.state.drag, DragState::Idle);
    }

    #[test]
    fn selection_uses_zoom_and_scroll_at_release() {
        let mut s = loaded(2000, 1000);
        s = s.apply(EditorEvent::Wheel { zoom_in: true }).state;
        s.view.zoom = 2.0;
        s.view.scroll = Vec2::new(100.0, 50.0);
        let t = drag(&s, Pos2::new(0.0, 0.0), Pos2::new(200.0, 150.0), false);
        assert_eq!(t.completed, Some(SelectionRect { x0: 50, y0: 25, x1: 150, y1: 100 }));
    }

    #[test]
    fn selection_is_kept_across_zoom() {
        let s = loaded(2000, 1000);
        let t = drag(&s, Pos2::new(10.0, 10.0), Pos2::new(50.0, 60.0), false);
        let before = t.state.selection;
        let s = t.state.apply(EditorEvent::Wheel { zoom_in: true }).state;
        let s = s.apply(EditorEvent::Wheel { zoom_in: true }).state;
        assert_eq!(s.selection, before);
        assert!(s.view.zoom > 1.2);
    }

    #[test]
    fn pan_drag_scrolls_without_selecting() {
        let s = loaded(2000, 1000);
        let t = drag(&s, Pos2::new(300.0, 300.0), Pos2::new(250.0, 280.0), true);
        assert_eq!(t.completed, None);
        assert_eq!(t.state.selection, None);
        assert_eq!(t.state.view.scroll, Vec2::new(50.0, 20.0));
    }

    #[test]
    fn pan_keeps_existing_selection() {
        let s = loaded(2000, 1000);
        let s = drag(&s, Pos2::new(1.0, 1.0), Pos2::new(9.0, 9.0), false).state;
        let t = drag(&s, Pos2::new(300.0, 300.0), Pos2::new(100.0, 100.0), true);
        assert_eq!(t.state.selection, Some(SelectionRect { x0: 1, y0: 1, x1: 9, y1: 9 }));
    }

    #[test]
    fn releasing_pan_modifier_ends_pan() {
        let s = loaded(2000, 1000);
        let s = s
            .apply(EditorEvent::PointerPressed { pos: Pos2::new(10.0, 10.0), pan_modifier: true })
            .state;
        let s = s.apply(EditorEvent::PanModifierReleased).state;
        assert_eq!(s.drag, DragState::Idle);
        let s = s.apply(EditorEvent::PointerMoved { pos: Pos2::ZERO }).state;
        assert_eq!(s.view.scroll, Vec2::ZERO);
    }

    #[test]
    fn input_ignored_without_image() {
        let s = EditorState::default();
        let t = drag(&s, Pos2::new(0.0, 0.0), Pos2::new(50.0, 50.0), false);
        assert_eq!(t.completed, None);
        assert_eq!(t.state, s);
        assert_eq!(s.apply(EditorEvent::Wheel { zoom_in: true }).state.view.zoom, 1.0);
    }

    #[test]
    fn selection_is_clamped_to_image() {
        let s = loaded(100, 50);
        let t = drag(&s, Pos2::new(20.0, 10.0), Pos2::new(700.0, 500.0), false);
        assert_eq!(t.completed, Some(SelectionRect { x0: 20, y0: 10, x1: 100, y1: 50 }));
    }

    #[test]
    fn loading_resets_view_and_selection() {
        let s = loaded(2000, 1000);
        let mut s = drag(&s, Pos2::new(1.0, 1.0), Pos2::new(9.0, 9.0), false).state;
        s.view.zoom = 3.0;
        let s = s.apply(EditorEvent::ImageLoaded { width: 10, height: 10 }).state;
        assert_eq!(s.view, ViewState::default());
        assert_eq!(s.selection, None);
        assert_eq!(s.image_size, Some([10, 10]));
        assert_eq!(s.viewport, Vec2::new(800.0, 600.0));
    }

    #[test]
    fn reload_keeps_selection_inside_new_bounds() {
        let s = loaded(2000, 1000);
        let mut s = drag(&s, Pos2::new(10.0, 10.0), Pos2::new(90.0, 60.0), false).state;
        s.view.zoom = 3.0;
        let same = s.apply(EditorEvent::ImageReloaded { width: 2000, height: 1000 }).state;
        assert_eq!(same.selection, Some(SelectionRect { x0: 10, y0: 10, x1: 90, y1: 60 }));
        assert_eq!(same.view, ViewState::default());

        let smaller = s.apply(EditorEvent::ImageReloaded { width: 50, height: 50 }).state;
        assert_eq!(smaller.selection, Some(SelectionRect { x0: 10, y0: 10, x1: 50, y1: 50 }));

        let tiny = s.apply(EditorEvent::ImageReloaded { width: 5, height: 5 }).state;
        assert_eq!(tiny.selection, None);
    }

    #[test]
    fn click_without_drag_keeps_selection() {
        let s = loaded(2000, 1000);
        let s = drag(&s, Pos2::new(10.0, 10.0), Pos2::new(200.0, 200.0), false).state;
        let s = s
            .apply(EditorEvent::PointerPressed { pos: Pos2::new(50.0, 50.0), pan_modifier: false })
            .state;
        let t = s.apply(EditorEvent::PointerReleased { pos: Pos2::new(50.0, 50.0) });
        assert_eq!(t.completed, None);
        assert_eq!(t.state.drag, DragState::Idle);
        assert_eq!(t.state.selection, Some(SelectionRect { x0: 10, y0: 10, x1: 200, y1: 200 }));
    }

    #[test]
    fn drag_off_image_keeps_selection() {
        let s = loaded(100, 50);
        let s = drag(&s, Pos2::new(1.0, 1.0), Pos2::new(9.0, 9.0), false).state;
        let t = drag(&s, Pos2::new(300.0, 10.0), Pos2::new(400.0, 40.0), false);
        assert_eq!(t.completed, None);
        assert_eq!(t.state.selection, Some(SelectionRect { x0: 1, y0: 1, x1: 9, y1: 9 }));
    }

    #[test]
    fn outline_follows_pointer_while_selecting() {
        let s = loaded(2000, 1000);
        let s = s
            .apply(EditorEvent::PointerPressed { pos: Pos2::new(50.0, 50.0), pan_modifier: false })
            .state;
        let s = s.apply(EditorEvent::PointerMoved { pos: Pos2::new(10.0, 80.0) }).state;
        assert_eq!(
            s.drag_outline(),
            Some(Rect::from_min_max(Pos2::new(10.0, 50.0), Pos2::new(50.0, 80.0)))
        );
    }
}
