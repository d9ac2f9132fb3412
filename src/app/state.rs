//! View, first-person and lighting state.
//!
//! One plain struct owns everything the keyboard can touch. Input handlers
//! take it `&mut`, the composer reads it; there is exactly one writer per
//! event-loop tick.

use glam::Vec3;

/// Camera mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    FirstPerson,
}

impl Projection {
    pub fn name(self) -> &'static str {
        match self {
            Projection::Perspective => "Perspective",
            Projection::FirstPerson => "First Person",
        }
    }
}

/// Free-flying eye for first-person mode.
#[derive(Debug, Clone, Copy)]
pub struct FirstPerson {
    pub position: Vec3,
    /// Heading around +Y, radians.
    pub heading: f32,
    /// Pitch above the horizon, radians.
    pub pitch: f32,
}

impl Default for FirstPerson {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
            pitch: 0.0,
        }
    }
}

impl FirstPerson {
    /// Forward direction derived from heading/pitch. Unit length.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.heading.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.heading.sin() * self.pitch.cos(),
        )
    }

    /// Walk along the current forward direction (negative = backward).
    pub fn advance(&mut self, step: f32) {
        self.position += self.forward() * step;
    }

    pub fn turn(&mut self, delta: f32) {
        self.heading += delta;
    }
}

/// Light source parameters. Percentages are integer sliders in [0, 100];
/// shininess is stored as a power-of-two exponent in [-1, 7].
#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    pub enabled: bool,
    pub emission: i32,
    pub ambient: i32,
    pub diffuse: i32,
    pub specular: i32,
    pub shininess: i32,
    /// Azimuth of the orbiting light, degrees. Animated from wall-clock time.
    pub azimuth: f32,
    /// Light elevation (world Y).
    pub elevation: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            enabled: true,
            emission: 0,
            ambient: 30,
            diffuse: 100,
            specular: 0,
            shininess: 0,
            azimuth: 90.0,
            elevation: 20.0,
        }
    }
}

impl Lighting {
    /// Exponent -1 maps to 0, everything else to 2^exponent.
    pub fn shininess_value(&self) -> f32 {
        if self.shininess < 0 {
            0.0
        } else {
            2f32.powi(self.shininess)
        }
    }

    pub fn step_shininess(&mut self, delta: i32) {
        self.shininess = (self.shininess + delta).clamp(-1, 7);
    }
}

/// Steps an intensity slider, clamped to [0, 100].
pub fn step_pct(value: &mut i32, delta: i32) {
    *value = (*value + delta).clamp(0, 100);
}

/// Everything the keyboard mutates and the composer reads.
#[derive(Debug, Clone, Copy)]
pub struct ViewState {
    pub axes: bool,
    pub projection: Projection,
    /// Movement toggle (`p`). Stored and flipped, read by nothing else.
    pub moving: bool,
    /// Orbit azimuth, degrees.
    pub th: i32,
    /// Orbit elevation, degrees.
    pub ph: i32,
    /// Field of view, degrees, clamped to [1, 179].
    pub fov: i32,
    pub aspect: f32,
    /// Scene scale: orbit radius is 2*dim, frustum depth derives from it.
    pub dim: f32,
    pub first_person: FirstPerson,
    pub lighting: Lighting,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            axes: false,
            projection: Projection::Perspective,
            moving: false,
            th: -250,
            ph: 35,
            fov: 55,
            aspect: 1.0,
            dim: 28.5,
            first_person: FirstPerson::default(),
            lighting: Lighting::default(),
        }
    }
}

impl ViewState {
    /// Orbit by whole-degree steps, wrapping so angles stay in [-360, 360].
    pub fn orbit(&mut self, dth: i32, dph: i32) {
        self.th = (self.th + dth) % 360;
        self.ph = (self.ph + dph) % 360;
    }

    /// Zoom in/out. The distance never drops below 1.
    pub fn zoom(&mut self, delta: f32) {
        self.dim = (self.dim + delta).max(1.0);
    }

    pub fn adjust_fov(&mut self, delta: i32) {
        self.fov = (self.fov + delta).clamp(1, 179);
    }

    /// The `0` key: snap back to the stock viewing angle.
    pub fn reset_view(&mut self) {
        self.th = -45;
        self.ph = -345;
    }

    pub fn toggle_projection(&mut self) {
        self.projection = match self.projection {
            Projection::Perspective => Projection::FirstPerson,
            Projection::FirstPerson => Projection::Perspective,
        };
    }

    /// Status line shown to the user every frame.
    pub fn status_line(&self) -> String {
        format!(
            "Angle={},{}  Dim={:.1} FOV={} Projection={}",
            self.th,
            self.ph,
            self.dim,
            self.fov,
            self.projection.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_angles_wrap_within_360() {
        let mut s = ViewState::default();
        for _ in 0..500 {
            s.orbit(5, -5);
            assert!((-360..=360).contains(&s.th));
            assert!((-360..=360).contains(&s.ph));
        }
    }

    #[test]
    fn zoom_never_drops_below_one() {
        let mut s = ViewState::default();
        for _ in 0..1000 {
            s.zoom(-0.1);
        }
        assert!(s.dim >= 1.0);
        s.zoom(0.1);
        assert!(s.dim > 1.0);
    }

    #[test]
    fn fov_clamps_to_valid_range() {
        let mut s = ViewState::default();
        for _ in 0..300 {
            s.adjust_fov(1);
        }
        assert_eq!(s.fov, 179);
        for _ in 0..300 {
            s.adjust_fov(-1);
        }
        assert_eq!(s.fov, 1);
    }

    #[test]
    fn percentage_sliders_clamp() {
        let mut l = Lighting::default();
        assert_eq!(l.ambient, 30);
        for _ in 0..20 {
            step_pct(&mut l.ambient, 5);
        }
        assert_eq!(l.ambient, 100);
        for _ in 0..50 {
            step_pct(&mut l.ambient, -5);
        }
        assert_eq!(l.ambient, 0);
    }

    #[test]
    fn shininess_exponent_and_value() {
        let mut l = Lighting::default();
        for _ in 0..20 {
            l.step_shininess(-1);
        }
        assert_eq!(l.shininess, -1);
        assert_eq!(l.shininess_value(), 0.0);
        for _ in 0..20 {
            l.step_shininess(1);
        }
        assert_eq!(l.shininess, 7);
        assert_eq!(l.shininess_value(), 128.0);
        l.shininess = 0;
        assert_eq!(l.shininess_value(), 1.0);
    }

    #[test]
    fn projection_toggle_round_trips() {
        let mut s = ViewState::default();
        assert_eq!(s.projection, Projection::Perspective);
        s.toggle_projection();
        assert_eq!(s.projection, Projection::FirstPerson);
        s.toggle_projection();
        assert_eq!(s.projection, Projection::Perspective);
    }

    #[test]
    fn first_person_forward_is_unit() {
        let mut fp = FirstPerson::default();
        fp.heading = 1.2;
        fp.pitch = -0.4;
        assert!((fp.forward().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn first_person_advance_moves_along_forward() {
        let mut fp = FirstPerson::default();
        fp.advance(0.05);
        assert!((fp.position.x - 0.05).abs() < 1e-6);
        assert!(fp.position.y.abs() < 1e-6);
        fp.advance(-0.05);
        assert!(fp.position.length() < 1e-6);
    }
}
