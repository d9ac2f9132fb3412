//! Camera and projection matrices.
//!
//! Two camera modes share one projection: an orbit camera riding a sphere of
//! radius 2*dim around the origin, and a free first-person eye. Matrices are
//! glam `Mat4`, column-major, handed to the renderer as-is.

use glam::{Mat4, Vec3};

use crate::app::state::{FirstPerson, Projection, ViewState};

fn sind(deg: f32) -> f32 {
    deg.to_radians().sin()
}

fn cosd(deg: f32) -> f32 {
    deg.to_radians().cos()
}

/// Perspective frustum sized so the whole scene stays visible: the near and
/// far planes are derived from the scene scale `dim`.
///
/// The Y axis is flipped for Vulkan clip space (Y down, depth [0, 1]).
pub fn projection(fov_deg: i32, aspect: f32, dim: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(
        (fov_deg as f32).to_radians(),
        aspect,
        dim / 16.0,
        16.0 * dim,
    );
    proj.y_axis.y = -proj.y_axis.y;
    proj
}

/// Orbit eye from spherical angles (degrees) and zoom distance.
///
/// The up vector flips sign with the elevation so the scene does not roll
/// upside down when the eye crosses a pole.
pub fn orbit_view(th: i32, ph: i32, dim: f32) -> (Mat4, Vec3) {
    let th = th as f32;
    let ph = ph as f32;
    let eye = Vec3::new(
        -2.0 * dim * sind(th) * cosd(ph),
        2.0 * dim * sind(ph),
        2.0 * dim * cosd(th) * cosd(ph),
    );
    let up_y = if cosd(ph) < 0.0 { -1.0 } else { 1.0 };
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::new(0.0, up_y, 0.0));
    (view, eye)
}

/// First-person eye: position plus a forward target one unit ahead.
pub fn first_person_view(fp: &FirstPerson) -> (Mat4, Vec3) {
    let eye = fp.position;
    let view = Mat4::look_at_rh(eye, eye + fp.forward(), Vec3::Y);
    (view, eye)
}

/// View matrix and eye position for the active camera mode.
pub fn view(state: &ViewState) -> (Mat4, Vec3) {
    match state.projection {
        Projection::Perspective => orbit_view(state.th, state.ph, state.dim),
        Projection::FirstPerson => first_person_view(&state.first_person),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_eye_sits_at_twice_dim() {
        let (_, eye) = orbit_view(-250, 35, 28.5);
        assert!((eye.length() - 57.0).abs() < 1e-3);
    }

    #[test]
    fn orbit_up_flips_past_the_pole() {
        // cos(ph) > 0: ordinary up.
        let (v0, _) = orbit_view(0, 35, 10.0);
        // cos(ph) < 0: flipped up. Both must still be finite.
        let (v1, _) = orbit_view(0, 120, 10.0);
        assert!(v0.is_finite());
        assert!(v1.is_finite());
    }

    #[test]
    fn projection_is_finite_and_y_flipped() {
        let p = projection(55, 1.0, 28.5);
        assert!(p.is_finite());
        assert!(p.y_axis.y < 0.0);
    }

    #[test]
    fn first_person_looks_down_heading() {
        let fp = FirstPerson::default();
        let (view, eye) = first_person_view(&fp);
        assert_eq!(eye, Vec3::ZERO);
        // Default heading looks along +X; the view transform must map the
        // target ahead of the eye (negative Z in view space).
        let target = view.transform_point3(Vec3::X);
        assert!(target.z < 0.0);
    }
}
