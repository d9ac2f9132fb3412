//! Keyboard handling (winit -> view state).
//!
//! Keeps `Windowing` focused on window lifecycle + rendering; this module
//! owns interpreting key presses into state mutations. Every binding either
//! wraps, clamps or toggles -- there are no failure states, and unknown keys
//! are no-ops.

use winit::keyboard::{Key, NamedKey};

use crate::app::state::{Projection, ViewState, step_pct};

/// What the windowing layer should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Tear the event loop down.
    Exit,
    /// State changed; redraw.
    Handled,
    /// Not one of ours.
    Ignored,
}

/// First-person walk step per key press.
const MOVE_STEP: f32 = 0.05;
/// First-person turn step per key press, radians.
const TURN_STEP: f32 = 0.05;

/// Applies a single pressed key to the view state.
pub fn apply_key(state: &mut ViewState, key: &Key) -> KeyOutcome {
    match key {
        Key::Named(named) => apply_named(state, *named),
        Key::Character(text) => apply_character(state, text.as_str()),
        _ => KeyOutcome::Ignored,
    }
}

fn apply_named(state: &mut ViewState, named: NamedKey) -> KeyOutcome {
    match named {
        NamedKey::Escape => return KeyOutcome::Exit,
        // Arrows orbit in 5 degree steps.
        NamedKey::ArrowRight => state.orbit(5, 0),
        NamedKey::ArrowLeft => state.orbit(-5, 0),
        NamedKey::ArrowUp => state.orbit(0, 5),
        NamedKey::ArrowDown => state.orbit(0, -5),
        NamedKey::PageUp => state.zoom(0.1),
        NamedKey::PageDown => state.zoom(-0.1),
        _ => return KeyOutcome::Ignored,
    }
    KeyOutcome::Handled
}

fn apply_character(state: &mut ViewState, ch: &str) -> KeyOutcome {
    let first_person = state.projection == Projection::FirstPerson;
    match ch {
        "0" => state.reset_view(),
        "x" | "X" => state.axes = !state.axes,
        "m" | "M" => state.toggle_projection(),
        "l" | "L" => state.lighting.enabled = !state.lighting.enabled,
        "p" | "P" => state.moving = !state.moving,
        "+" => state.adjust_fov(1),
        "-" => state.adjust_fov(-1),
        "[" => state.lighting.elevation -= 0.1,
        "]" => state.lighting.elevation += 0.1,
        "t" => step_pct(&mut state.lighting.ambient, -5),
        "T" => step_pct(&mut state.lighting.ambient, 5),
        "h" => step_pct(&mut state.lighting.diffuse, -5),
        "H" => step_pct(&mut state.lighting.diffuse, 5),
        "g" => step_pct(&mut state.lighting.specular, -5),
        "G" => step_pct(&mut state.lighting.specular, 5),
        "e" => step_pct(&mut state.lighting.emission, -5),
        "E" => step_pct(&mut state.lighting.emission, 5),
        "n" => state.lighting.step_shininess(-1),
        "N" => state.lighting.step_shininess(1),
        // Walking only works in first-person mode.
        "w" | "W" if first_person => state.first_person.advance(MOVE_STEP),
        "s" | "S" if first_person => state.first_person.advance(-MOVE_STEP),
        "a" | "A" if first_person => state.first_person.turn(-TURN_STEP),
        "d" | "D" if first_person => state.first_person.turn(TURN_STEP),
        _ => return KeyOutcome::Ignored,
    }
    KeyOutcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(state: &mut ViewState, ch: &str) -> KeyOutcome {
        apply_key(state, &Key::Character(ch.into()))
    }

    #[test]
    fn escape_requests_exit() {
        let mut s = ViewState::default();
        assert_eq!(
            apply_key(&mut s, &Key::Named(NamedKey::Escape)),
            KeyOutcome::Exit
        );
    }

    #[test]
    fn arrows_orbit_and_wrap() {
        let mut s = ViewState::default();
        for _ in 0..200 {
            apply_key(&mut s, &Key::Named(NamedKey::ArrowRight));
            apply_key(&mut s, &Key::Named(NamedKey::ArrowDown));
        }
        assert!((-360..=360).contains(&s.th));
        assert!((-360..=360).contains(&s.ph));
    }

    #[test]
    fn page_down_respects_zoom_floor() {
        let mut s = ViewState::default();
        for _ in 0..1000 {
            apply_key(&mut s, &Key::Named(NamedKey::PageDown));
        }
        assert!(s.dim >= 1.0);
    }

    #[test]
    fn ambient_clamps_at_100_after_20_presses() {
        let mut s = ViewState::default();
        for _ in 0..20 {
            press(&mut s, "T");
        }
        assert_eq!(s.lighting.ambient, 100);
    }

    #[test]
    fn toggles_round_trip() {
        let mut s = ViewState::default();
        let initial = (s.axes, s.lighting.enabled, s.moving, s.projection);
        for ch in ["x", "l", "p", "m"] {
            press(&mut s, ch);
            press(&mut s, ch);
        }
        assert_eq!(
            initial,
            (s.axes, s.lighting.enabled, s.moving, s.projection)
        );
    }

    #[test]
    fn mode_toggle_switches_to_first_person_and_back() {
        let mut s = ViewState::default();
        press(&mut s, "m");
        assert_eq!(s.projection, Projection::FirstPerson);
        press(&mut s, "m");
        assert_eq!(s.projection, Projection::Perspective);
    }

    #[test]
    fn fov_keys_clamp() {
        let mut s = ViewState::default();
        for _ in 0..300 {
            press(&mut s, "+");
        }
        assert_eq!(s.fov, 179);
        for _ in 0..300 {
            press(&mut s, "-");
        }
        assert_eq!(s.fov, 1);
    }

    #[test]
    fn shininess_keys_stay_in_range() {
        let mut s = ViewState::default();
        for _ in 0..10 {
            press(&mut s, "n");
        }
        assert_eq!(s.lighting.shininess, -1);
        for _ in 0..20 {
            press(&mut s, "N");
        }
        assert_eq!(s.lighting.shininess, 7);
    }

    #[test]
    fn walking_is_gated_on_first_person_mode() {
        let mut s = ViewState::default();
        assert_eq!(press(&mut s, "w"), KeyOutcome::Ignored);
        assert_eq!(s.first_person.position.length(), 0.0);

        press(&mut s, "m");
        assert_eq!(press(&mut s, "w"), KeyOutcome::Handled);
        assert!(s.first_person.position.length() > 0.0);
    }

    #[test]
    fn turn_keys_adjust_heading() {
        let mut s = ViewState::default();
        press(&mut s, "m");
        press(&mut s, "d");
        assert!(s.first_person.heading > 0.0);
        press(&mut s, "a");
        press(&mut s, "a");
        assert!(s.first_person.heading < 0.0);
    }

    #[test]
    fn reset_restores_stock_angles() {
        let mut s = ViewState::default();
        s.orbit(40, 40);
        press(&mut s, "0");
        assert_eq!((s.th, s.ph), (-45, -345));
    }

    #[test]
    fn unknown_keys_are_noops() {
        let mut s = ViewState::default();
        assert_eq!(press(&mut s, "q"), KeyOutcome::Ignored);
        assert_eq!(press(&mut s, "?"), KeyOutcome::Ignored);
    }
}
