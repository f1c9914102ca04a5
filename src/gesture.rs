use egui::Pos2;

use crate::geometry::normalize_drag;
use crate::model::{BoxRect, ToolMode};

/// Drags narrower or shorter than this (in image pixels) count as clicks.
pub const MIN_BOX_SIZE: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawSession {
    pub anchor: Pos2,
    pub current: Pos2,
}

impl DrawSession {
    /// Live candidate as `(origin, signed extent)`, matching the drag direction.
    pub fn candidate(&self) -> (Pos2, egui::Vec2) {
        (self.anchor, self.current - self.anchor)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing(DrawSession),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureOutcome {
    /// Nothing changed.
    Ignored,
    Started,
    /// The live rectangle moved; the surface needs a repaint.
    Updated,
    Committed(BoxRect),
    /// The drag ended below [`MIN_BOX_SIZE`] on some axis.
    Discarded,
}

impl GestureState {
    pub fn is_drawing(&self) -> bool {
        matches!(self, GestureState::Drawing(_))
    }

    pub fn session(&self) -> Option<&DrawSession> {
        match self {
            GestureState::Drawing(session) => Some(session),
            GestureState::Idle => None,
        }
    }

    /// `pos` is `None` when the event could not be mapped to image space.
    pub fn pointer_down(&mut self, mode: ToolMode, pos: Option<Pos2>) -> GestureOutcome {
        if mode != ToolMode::Box {
            return GestureOutcome::Ignored;
        }
        let Some(pos) = pos else {
            return GestureOutcome::Ignored;
        };
        *self = GestureState::Drawing(DrawSession {
            anchor: pos,
            current: pos,
        });
        GestureOutcome::Started
    }

    pub fn pointer_move(&mut self, pos: Option<Pos2>) -> GestureOutcome {
        match (self, pos) {
            (GestureState::Drawing(session), Some(pos)) => {
                if session.current == pos {
                    return GestureOutcome::Ignored;
                }
                session.current = pos;
                GestureOutcome::Updated
            }
            _ => GestureOutcome::Ignored,
        }
    }

    /// Ends the drag. An unmappable release point falls back to the last
    /// position seen during the drag.
    pub fn pointer_up(&mut self, pos: Option<Pos2>) -> GestureOutcome {
        let GestureState::Drawing(session) = *self else {
            return GestureOutcome::Ignored;
        };
        *self = GestureState::Idle;

        let end = pos.unwrap_or(session.current);
        let rect = normalize_drag(session.anchor, end);
        if rect.width < MIN_BOX_SIZE || rect.height < MIN_BOX_SIZE {
            return GestureOutcome::Discarded;
        }
        GestureOutcome::Committed(rect)
    }

    /// Drops an in-progress drag. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        let was_drawing = self.is_drawing();
        *self = GestureState::Idle;
        was_drawing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn drag(from: Pos2, to: Pos2) -> GestureOutcome {
        let mut state = GestureState::default();
        assert_eq!(state.pointer_down(ToolMode::Box, Some(from)), GestureOutcome::Started);
        state.pointer_move(Some(to));
        let outcome = state.pointer_up(Some(to));
        assert_eq!(state, GestureState::Idle);
        outcome
    }

    #[test]
    fn tiny_drag_is_a_click() {
        assert_eq!(drag(pos2(10.0, 10.0), pos2(12.0, 12.0)), GestureOutcome::Discarded);
    }

    #[test]
    fn one_thin_axis_is_enough_to_discard() {
        assert_eq!(drag(pos2(10.0, 10.0), pos2(100.0, 14.0)), GestureOutcome::Discarded);
        assert_eq!(drag(pos2(10.0, 10.0), pos2(14.9, 100.0)), GestureOutcome::Discarded);
    }

    #[test]
    fn exactly_five_pixels_commits() {
        assert_eq!(
            drag(pos2(0.0, 0.0), pos2(5.0, 5.0)),
            GestureOutcome::Committed(BoxRect { x: 0.0, y: 0.0, width: 5.0, height: 5.0 })
        );
    }

    #[test]
    fn ten_pixel_drag_commits() {
        assert_eq!(
            drag(pos2(10.0, 10.0), pos2(20.0, 20.0)),
            GestureOutcome::Committed(BoxRect { x: 10.0, y: 10.0, width: 10.0, height: 10.0 })
        );
    }

    #[test]
    fn reverse_drag_is_normalized() {
        assert_eq!(
            drag(pos2(50.0, 50.0), pos2(10.0, 10.0)),
            GestureOutcome::Committed(BoxRect { x: 10.0, y: 10.0, width: 40.0, height: 40.0 })
        );
    }

    #[test]
    fn select_mode_never_draws() {
        let mut state = GestureState::default();
        assert_eq!(
            state.pointer_down(ToolMode::Select, Some(pos2(0.0, 0.0))),
            GestureOutcome::Ignored
        );
        assert_eq!(state.pointer_move(Some(pos2(100.0, 100.0))), GestureOutcome::Ignored);
        assert_eq!(state.pointer_up(Some(pos2(100.0, 100.0))), GestureOutcome::Ignored);
        assert_eq!(state, GestureState::Idle);
    }

    #[test]
    fn unmapped_down_stays_idle() {
        let mut state = GestureState::default();
        assert_eq!(state.pointer_down(ToolMode::Box, None), GestureOutcome::Ignored);
        assert!(!state.is_drawing());
    }

    #[test]
    fn unmapped_release_uses_last_move() {
        let mut state = GestureState::default();
        state.pointer_down(ToolMode::Box, Some(pos2(0.0, 0.0)));
        state.pointer_move(Some(pos2(30.0, 40.0)));
        state.pointer_move(None);
        assert_eq!(
            state.pointer_up(None),
            GestureOutcome::Committed(BoxRect { x: 0.0, y: 0.0, width: 30.0, height: 40.0 })
        );
    }

    #[test]
    fn candidate_keeps_signed_extent_while_dragging() {
        let mut state = GestureState::default();
        state.pointer_down(ToolMode::Box, Some(pos2(50.0, 50.0)));
        state.pointer_move(Some(pos2(20.0, 70.0)));
        let (origin, extent) = state.session().unwrap().candidate();
        assert_eq!(origin, pos2(50.0, 50.0));
        assert_eq!(extent, egui::vec2(-30.0, 20.0));
    }

    #[test]
    fn cancel_drops_the_session() {
        let mut state = GestureState::default();
        state.pointer_down(ToolMode::Box, Some(pos2(0.0, 0.0)));
        assert!(state.cancel());
        assert!(!state.cancel());
        assert_eq!(state.pointer_up(Some(pos2(50.0, 50.0))), GestureOutcome::Ignored);
    }
}
