//! Per-frame scene composition.
//!
//! The city is a fixed display list: a static table of prop placements
//! consumed by one dispatch loop. Composition also derives the camera
//! matrices and the light block for the frame.

use glam::Vec3;

use crate::app::camera;
use crate::app::state::{Projection, ViewState};
use crate::render::{FrameGraph, FrameParams, LightParams, TextureHandle};
use crate::scene::props::{self, SceneMeshes};

/// Light orbit radius factor: the light circles at 20 * this distance.
const LIGHT_DISTANCE: f32 = 5.0;
/// Radius of the ball marking the light position.
const MARKER_RADIUS: f32 = 0.1;

/// The two startup textures.
#[derive(Debug, Clone, Copy)]
pub struct SceneTextures {
    /// City-block ground texture.
    pub block: TextureHandle,
    /// Outer grass disc texture.
    pub grass: TextureHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropKind {
    CityFrame,
    Ground,
    /// The rotation slot doubles as the layout selector (0 or 5).
    Streetlights,
    Lamp,
    ArchBuilding,
    Skyscraper,
}

#[derive(Debug, Clone, Copy)]
pub struct PropPlacement {
    pub kind: PropKind,
    pub pos: [f32; 3],
    pub scale: [f32; 3],
    pub rot: f32,
}

const fn prop(kind: PropKind, pos: [f32; 3], rot: f32) -> PropPlacement {
    PropPlacement {
        kind,
        pos,
        scale: [0.3, 0.3, 0.3],
        rot,
    }
}

/// The whole city, in draw order.
pub const PROPS: &[PropPlacement] = &[
    prop(PropKind::CityFrame, [1.0, 1.0, 1.0], 90.0),
    // City foundation.
    prop(PropKind::Ground, [1.0, 1.0, 1.0], 90.0),
    prop(PropKind::Ground, [15.0, 1.3, 1.0], 90.0),
    prop(PropKind::Ground, [1.0, 1.0, 15.0], 90.0),
    prop(PropKind::Ground, [15.0, 1.3, 15.0], 90.0),
    // Streetlights, straight rows.
    prop(PropKind::Streetlights, [-2.0, 1.0, -1.5], 0.0),
    prop(PropKind::Streetlights, [-2.0, 1.0, 3.75], 0.0),
    prop(PropKind::Streetlights, [-2.0, 1.0, -10.5], 0.0),
    prop(PropKind::Streetlights, [-2.0, 1.0, -15.75], 0.0),
    prop(PropKind::Streetlights, [-2.0, 1.0, 12.5], 0.0),
    prop(PropKind::Streetlights, [-2.0, 1.0, 17.75], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, -1.5], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, 3.75], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, -10.5], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, -15.75], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, 12.5], 0.0),
    prop(PropKind::Streetlights, [12.0, 1.0, 17.75], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, -1.5], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, 3.75], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, -10.5], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, -15.75], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, 12.5], 0.0),
    prop(PropKind::Streetlights, [-16.0, 0.5, 17.75], 0.0),
    // Streetlights, rotated rows.
    prop(PropKind::Streetlights, [-1.6, 1.0, -1.375], 5.0),
    prop(PropKind::Streetlights, [-6.6, 1.0, -1.375], 5.0),
    prop(PropKind::Streetlights, [-15.6, 0.5, -1.375], 5.0),
    prop(PropKind::Streetlights, [-20.6, 0.5, -1.375], 5.0),
    prop(PropKind::Streetlights, [7.4, 1.0, -1.375], 5.0),
    prop(PropKind::Streetlights, [12.4, 1.0, -1.375], 5.0),
    prop(PropKind::Streetlights, [-1.6, 1.0, 12.6], 5.0),
    prop(PropKind::Streetlights, [-6.6, 1.0, 12.6], 5.0),
    prop(PropKind::Streetlights, [-1.6, 1.0, -15.6], 5.0),
    prop(PropKind::Streetlights, [-6.6, 1.0, -15.6], 5.0),
    prop(PropKind::Streetlights, [-15.6, 0.5, -15.6], 5.0),
    prop(PropKind::Streetlights, [-20.6, 0.5, -15.6], 5.0),
    prop(PropKind::Streetlights, [-15.6, 0.5, 12.6], 5.0),
    prop(PropKind::Streetlights, [-20.6, 0.5, 12.6], 5.0),
    prop(PropKind::Streetlights, [7.4, 1.0, -15.6], 5.0),
    prop(PropKind::Streetlights, [12.4, 1.0, -15.6], 5.0),
    prop(PropKind::Streetlights, [7.4, 1.0, 12.6], 5.0),
    prop(PropKind::Streetlights, [12.4, 1.0, 12.6], 5.0),
    // Street lamps.
    prop(PropKind::Lamp, [7.5, 1.0, 12.5], 90.0),
    prop(PropKind::Lamp, [7.5, 1.0, 17.5], 90.0),
    prop(PropKind::Lamp, [7.5, 1.0, -1.25], 90.0),
    prop(PropKind::Lamp, [7.5, 1.0, 3.5], 90.0),
    prop(PropKind::Lamp, [7.5, 1.0, -15.4], 90.0),
    prop(PropKind::Lamp, [7.5, 1.0, -10.65], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, -10.65], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, -15.4], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, 12.5], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, 17.5], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, -1.25], 90.0),
    prop(PropKind::Lamp, [-6.5, 1.0, 3.5], 90.0),
    // Arch buildings.
    prop(PropKind::ArchBuilding, [5.0, 1.0, 1.75], 90.0),
    prop(PropKind::ArchBuilding, [5.0, 1.0, -4.0], 90.0),
    prop(PropKind::ArchBuilding, [5.0, 10.0, -1.25], 90.0),
    // The skyscraper.
    prop(PropKind::Skyscraper, [-5.2, 1.0, -5.0], 90.0),
];

fn sind(deg: f32) -> f32 {
    deg.to_radians().sin()
}

fn cosd(deg: f32) -> f32 {
    deg.to_radians().cos()
}

fn intensity(pct: i32) -> [f32; 3] {
    let v = 0.01 * pct as f32;
    [v, v, v]
}

/// Builds the frame: every prop from the table, the light (marker ball plus
/// light block) when enabled, the axes when toggled on, and the camera.
pub fn compose(
    state: &ViewState,
    meshes: &SceneMeshes,
    textures: &SceneTextures,
    graph: &mut FrameGraph,
) -> FrameParams {
    graph.clear();

    for placement in PROPS {
        let p = Vec3::from_array(placement.pos);
        let s = Vec3::from_array(placement.scale);
        match placement.kind {
            PropKind::CityFrame => {
                props::city_frame(meshes, graph, textures.grass, p, s, placement.rot)
            }
            PropKind::Ground => props::ground(meshes, graph, textures.block, p, s),
            PropKind::Streetlights => {
                props::streetlights(meshes, graph, p, s, placement.rot as i32)
            }
            PropKind::Lamp => props::lamp(meshes, graph, p, s),
            PropKind::ArchBuilding => props::arch_building(meshes, graph, p, s),
            PropKind::Skyscraper => props::skyscraper(meshes, graph, p, s),
        }
    }

    let lighting = &state.lighting;
    let light = if lighting.enabled {
        let position = Vec3::new(
            20.0 * LIGHT_DISTANCE * cosd(lighting.azimuth),
            lighting.elevation,
            20.0 * LIGHT_DISTANCE * sind(lighting.azimuth),
        );
        props::marker_ball(meshes, graph, position, MARKER_RADIUS);
        Some(LightParams {
            position: position.to_array(),
            ambient: intensity(lighting.ambient),
            diffuse: intensity(lighting.diffuse),
            specular: intensity(lighting.specular),
        })
    } else {
        None
    };

    if state.axes {
        props::axes(meshes, graph);
    }

    let (view, eye) = camera::view(state);
    let proj = camera::projection(state.fov, state.aspect, state.dim);

    FrameParams {
        view: view.to_cols_array_2d(),
        proj: proj.to_cols_array_2d(),
        eye: eye.to_array(),
        light,
        tex_replace: state.projection == Projection::Perspective,
        shininess: lighting.shininess_value(),
        emission: lighting.emission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MeshHandle;

    fn meshes() -> SceneMeshes {
        SceneMeshes {
            tower: MeshHandle(0),
            ring: MeshHandle(1),
            lamp_post: MeshHandle(2),
            pole: MeshHandle(3),
            cable: MeshHandle(4),
            bulb: MeshHandle(5),
            quad_front: MeshHandle(6),
            quad_back: MeshHandle(7),
            head_left: MeshHandle(8),
            head_right: MeshHandle(9),
            quad_top: MeshHandle(10),
            wall_left: MeshHandle(11),
            wall_right: MeshHandle(12),
            ground: MeshHandle(13),
            disc: MeshHandle(14),
            axes: MeshHandle(15),
        }
    }

    fn textures() -> SceneTextures {
        SceneTextures {
            block: TextureHandle(1),
            grass: TextureHandle(2),
        }
    }

    #[test]
    fn prop_table_matches_display_list() {
        assert_eq!(PROPS.len(), 57);
        let count = |k: PropKind| PROPS.iter().filter(|p| p.kind == k).count();
        assert_eq!(count(PropKind::CityFrame), 1);
        assert_eq!(count(PropKind::Ground), 4);
        assert_eq!(count(PropKind::Streetlights), 36);
        assert_eq!(count(PropKind::Lamp), 12);
        assert_eq!(count(PropKind::ArchBuilding), 3);
        assert_eq!(count(PropKind::Skyscraper), 1);

        let rotated = PROPS
            .iter()
            .filter(|p| p.kind == PropKind::Streetlights && p.rot == 5.0)
            .count();
        assert_eq!(rotated, 18);
    }

    #[test]
    fn lit_frame_has_full_instance_count() {
        let state = ViewState::default();
        let mut graph = FrameGraph::new();
        let params = compose(&state, &meshes(), &textures(), &mut graph);

        // 1 disc + 16 ground tiles + 36*13 streetlight pieces + 12*3 lamp
        // pieces + 3*15 facade quads + 5 skyscraper pieces + marker ball.
        assert_eq!(graph.instances().len(), 572);
        assert!(params.light.is_some());
        assert!(params.tex_replace);
    }

    #[test]
    fn disabled_light_drops_marker_and_block() {
        let mut state = ViewState::default();
        state.lighting.enabled = false;
        let mut graph = FrameGraph::new();
        let params = compose(&state, &meshes(), &textures(), &mut graph);
        assert_eq!(graph.instances().len(), 571);
        assert!(params.light.is_none());
    }

    #[test]
    fn axes_toggle_adds_one_instance() {
        let mut state = ViewState::default();
        state.axes = true;
        let mut graph = FrameGraph::new();
        compose(&state, &meshes(), &textures(), &mut graph);
        assert_eq!(graph.instances().len(), 573);
    }

    #[test]
    fn light_position_follows_azimuth() {
        let mut state = ViewState::default();
        state.lighting.azimuth = 0.0;
        state.lighting.elevation = 20.0;
        let mut graph = FrameGraph::new();
        let params = compose(&state, &meshes(), &textures(), &mut graph);
        let light = params.light.unwrap();
        assert!((light.position[0] - 100.0).abs() < 1e-3);
        assert!((light.position[1] - 20.0).abs() < 1e-3);
        assert!(light.position[2].abs() < 1e-3);
    }

    #[test]
    fn first_person_mode_modulates_textures() {
        let mut state = ViewState::default();
        state.toggle_projection();
        let mut graph = FrameGraph::new();
        let params = compose(&state, &meshes(), &textures(), &mut graph);
        assert!(!params.tex_replace);
    }

    #[test]
    fn light_intensities_scale_with_sliders() {
        let mut state = ViewState::default();
        state.lighting.ambient = 30;
        state.lighting.diffuse = 100;
        state.lighting.specular = 0;
        let mut graph = FrameGraph::new();
        let light = compose(&state, &meshes(), &textures(), &mut graph)
            .light
            .unwrap();
        assert!((light.ambient[0] - 0.3).abs() < 1e-6);
        assert!((light.diffuse[0] - 1.0).abs() < 1e-6);
        assert_eq!(light.specular[0], 0.0);
    }
}
