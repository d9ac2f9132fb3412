//! Per-prop instance emitters.
//!
//! Each prop is a fixed, hand-tuned arrangement of primitive meshes. The
//! offsets, scales, colors and rotation axes are deliberate look choices and
//! are not derived from any formula; treat them as data.

use glam::{Mat4, Vec3};

use crate::render::{FrameGraph, Instance, MaterialKind, MeshHandle, Renderer, TextureHandle};
use crate::scene::mesh::MeshFactory;

// Rotation axes sit slightly off the primary axes; the small tilt is part of
// the city's look.
const UPRIGHT_AXIS: Vec3 = Vec3::new(100.0, 1.0, 0.0);
const FLIP_AXIS: Vec3 = Vec3::new(0.0, 1.0, -100.0);
const FLIP_TILT_AXIS: Vec3 = Vec3::new(100.0, 1.0, -100.0);

const TOWER_TEAL: [f32; 4] = [0.196078, 0.6, 0.8, 1.0];
const RING_VIOLET: [f32; 4] = [0.6, 0.196078, 0.8, 1.0];
const FACADE_SLATE: [f32; 4] = [0.560784, 0.560784, 0.737255, 1.0];
const LAMP_GRAY: [f32; 4] = [0.329412, 0.329412, 0.329412, 1.0];
const LAMP_COLLAR: [f32; 4] = [0.29, 0.46, 0.43, 1.0];
const POLE_SILVER: [f32; 4] = [0.752941, 0.752941, 0.752941, 1.0];
const CABLE_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const GRASS_GREEN: [f32; 4] = [0.137255, 0.556863, 0.137255, 1.0];
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

// Facade vertex sets. The art mixes vertex sets and normals freely, so each
// (vertex set, normal) combination in use is its own mesh.
const FACE_Z: [[f32; 3]; 4] = [
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];
const FACE_TOP: [[f32; 3]; 4] = [
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
];
const FACE_X: [[f32; 3]; 4] = [
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
];

/// GPU handles for every mesh the scene draws, uploaded once at startup.
pub struct SceneMeshes {
    pub tower: MeshHandle,
    pub ring: MeshHandle,
    pub lamp_post: MeshHandle,
    pub pole: MeshHandle,
    pub cable: MeshHandle,
    pub bulb: MeshHandle,
    pub quad_front: MeshHandle,
    pub quad_back: MeshHandle,
    pub head_left: MeshHandle,
    pub head_right: MeshHandle,
    pub quad_top: MeshHandle,
    pub wall_left: MeshHandle,
    pub wall_right: MeshHandle,
    pub ground: MeshHandle,
    pub disc: MeshHandle,
    pub axes: MeshHandle,
}

impl SceneMeshes {
    pub fn upload(renderer: &mut Renderer) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            tower: renderer.upload_mesh(&MeshFactory::cylinder(0.5, 1.0, 5.0, 48))?,
            ring: renderer.upload_mesh(&MeshFactory::torus(1.0, 2.0, 32, 48))?,
            lamp_post: renderer.upload_mesh(&MeshFactory::cylinder(0.01, 0.04, 0.7, 32))?,
            pole: renderer.upload_mesh(&MeshFactory::cylinder(0.02, 0.02, 1.0, 32))?,
            cable: renderer.upload_mesh(&MeshFactory::cylinder(0.007, 0.007, 1.65, 16))?,
            bulb: renderer.upload_mesh(&MeshFactory::sphere_bands(10))?,
            quad_front: renderer.upload_mesh(&MeshFactory::quad_face(FACE_Z, [0.0, 0.0, -1.0]))?,
            quad_back: renderer.upload_mesh(&MeshFactory::quad_face(FACE_Z, [0.0, 0.0, 1.0]))?,
            head_left: renderer.upload_mesh(&MeshFactory::quad_face(FACE_Z, [-1.0, 0.0, 0.0]))?,
            head_right: renderer.upload_mesh(&MeshFactory::quad_face(FACE_Z, [1.0, 0.0, 0.0]))?,
            quad_top: renderer.upload_mesh(&MeshFactory::quad_face(FACE_TOP, [0.0, 1.0, 0.0]))?,
            wall_left: renderer.upload_mesh(&MeshFactory::quad_face(FACE_X, [-1.0, 0.0, 0.0]))?,
            wall_right: renderer.upload_mesh(&MeshFactory::quad_face(FACE_X, [1.0, 0.0, 0.0]))?,
            ground: renderer.upload_mesh(&MeshFactory::ground_tile(2.5))?,
            disc: renderer.upload_mesh(&MeshFactory::disc_fan(15.0, 360))?,
            axes: renderer.upload_mesh(&MeshFactory::axes(1.5))?,
        })
    }
}

/// Translate * rotate(angle about axis) * scale, packed for the instance
/// buffer.
fn place(pos: Vec3, axis: Vec3, angle_deg: f32, scale: Vec3) -> [[f32; 4]; 4] {
    (Mat4::from_translation(pos)
        * Mat4::from_axis_angle(axis.normalize(), angle_deg.to_radians())
        * Mat4::from_scale(scale))
    .to_cols_array_2d()
}

/// Same, but the rotation applied twice (the offset streetlight cable).
fn place_double_rot(pos: Vec3, axis: Vec3, angle_deg: f32, scale: Vec3) -> [[f32; 4]; 4] {
    let rot = Mat4::from_axis_angle(axis.normalize(), angle_deg.to_radians());
    (Mat4::from_translation(pos) * rot * rot * Mat4::from_scale(scale)).to_cols_array_2d()
}

fn lit(mesh: MeshHandle, model: [[f32; 4]; 4], color: [f32; 4]) -> Instance {
    Instance {
        mesh,
        material: MaterialKind::Lit,
        texture: None,
        model,
        color,
    }
}

fn textured(
    mesh: MeshHandle,
    model: [[f32; 4]; 4],
    color: [f32; 4],
    texture: TextureHandle,
) -> Instance {
    Instance {
        mesh,
        material: MaterialKind::Lit,
        texture: Some(texture),
        model,
        color,
    }
}

/// Tapered tower with a stack of four shrinking rings.
pub fn skyscraper(m: &SceneMeshes, g: &mut FrameGraph, p: Vec3, s: Vec3) {
    g.push(lit(
        m.tower,
        place(p + Vec3::new(0.0, 12.5, 0.0), UPRIGHT_AXIS, 90.0, 10.0 * s),
        TOWER_TEAL,
    ));
    for (dy, k) in [(12.5, 4.0), (14.0, 3.0), (15.0, 2.0), (15.75, 1.0)] {
        g.push(lit(
            m.ring,
            place(p + Vec3::new(0.0, dy, 0.0), UPRIGHT_AXIS, 90.0, k * s),
            RING_VIOLET,
        ));
    }
}

/// The arch building: fifteen facade quads forming two pillar blocks and a
/// connecting bridge slab.
pub fn arch_building(m: &SceneMeshes, g: &mut FrameGraph, p: Vec3, s: Vec3) {
    let faces: [(MeshHandle, [f32; 3], [f32; 3]); 15] = [
        (m.quad_front, [0.0, 1.2, 0.1], [5.0, 12.0, 5.0]),
        (m.quad_back, [0.0, 2.2, 1.5], [5.0, 15.0, 5.0]),
        (m.quad_top, [0.0, 9.2, 1.4], [5.0, 15.0, 5.0]),
        (m.quad_top, [0.0, 9.25, -1.3], [5.0, 15.0, 5.0]),
        (m.quad_top, [0.0, 11.2, 1.7], [5.0, 15.0, 5.0]),
        (m.quad_top, [0.0, 11.25, -1.1], [5.0, 15.0, 5.0]),
        (m.quad_top, [0.0, 11.25, -2.6], [5.0, 15.0, 5.0]),
        (m.wall_left, [0.7, 2.2, 2.3], [2.5, 15.0, 2.5]),
        (m.wall_right, [-2.2, 2.2, 2.3], [2.5, 15.0, 2.5]),
        (m.quad_front, [0.0, 2.3, -5.85], [5.0, 15.0, 5.0]),
        (m.quad_back, [0.0, 1.3, -4.4], [5.0, 12.0, 5.0]),
        (m.wall_left, [0.7, 2.3, -3.6], [2.5, 15.0, 2.5]),
        (m.wall_right, [-2.2, 2.3, -3.6], [2.5, 15.0, 2.5]),
        (m.wall_left, [-1.5, 5.75, 0.0], [10.0, 3.5, 10.0]),
        (m.wall_right, [-4.4, 5.75, 0.0], [10.0, 3.5, 10.0]),
    ];
    for (mesh, offset, scale) in faces {
        g.push(lit(
            mesh,
            place(
                p + Vec3::from_array(offset),
                FLIP_AXIS,
                180.0,
                Vec3::from_array(scale) * s,
            ),
            FACADE_SLATE,
        ));
    }
}

/// Street lamp: tapered post, torus collar, band-sphere bulb.
pub fn lamp(m: &SceneMeshes, g: &mut FrameGraph, p: Vec3, s: Vec3) {
    g.push(lit(m.lamp_post, place(p, UPRIGHT_AXIS, 90.0, 10.0 * s), LAMP_GRAY));
    g.push(lit(m.ring, place(p, UPRIGHT_AXIS, 90.0, 0.2 * s), LAMP_COLLAR));
    g.push(lit(m.bulb, place(p, UPRIGHT_AXIS, 90.0, 0.2 * s), WHITE));
}

/// Streetlight pair: two capped poles, a cable between them and two
/// four-sided light heads hanging off it.
///
/// `offset == 5` places the rotated variant; every piece then shifts by the
/// tuned offsets below. The head offsets are 3 and 1 exactly.
pub fn streetlights(m: &SceneMeshes, g: &mut FrameGraph, p: Vec3, s: Vec3, offset: i32) {
    let alt = offset == 5;
    let t = offset as f32;
    let (x, y, z) = (p.x, p.y, p.z);

    let pole_scale = 10.0 * s;
    let bulb_scale = 0.2 * s;

    let pole1 = if alt {
        Vec3::new(x + t - 0.4, y + 1.0, z + t)
    } else {
        Vec3::new(x + t, y + 1.0, z + t)
    };
    g.push(lit(m.pole, place(pole1, UPRIGHT_AXIS, 90.0, pole_scale), POLE_SILVER));
    g.push(lit(m.bulb, place(pole1, UPRIGHT_AXIS, 90.0, bulb_scale), POLE_SILVER));

    let pole2 = if alt {
        Vec3::new(x + 5.0 - 0.4, y + 1.0, z)
    } else {
        Vec3::new(x + 5.0, y + 1.0, z)
    };
    g.push(lit(m.pole, place(pole2, UPRIGHT_AXIS, 90.0, pole_scale), POLE_SILVER));
    g.push(lit(m.bulb, place(pole2, UPRIGHT_AXIS, 90.0, bulb_scale), POLE_SILVER));

    let cable_model = if alt {
        place_double_rot(pole2, FLIP_TILT_AXIS, 180.0, pole_scale)
    } else {
        place(pole2, FLIP_TILT_AXIS, 180.0, pole_scale)
    };
    g.push(lit(m.cable, cable_model, CABLE_BLACK));

    // First light head; the alt variant shifts by 3.
    let off = 3.0;
    let (pa, pb, pd) = if alt {
        (
            Vec3::new(x + 1.75 + off, y + 0.8, z + off),
            Vec3::new(x + 1.6 + off, y + 0.8, z + off),
            Vec3::new(x + 1.6 + off, y + 0.8, z - 0.15 + off),
        )
    } else {
        (
            Vec3::new(x + 1.75, y + 0.8, z),
            Vec3::new(x + 1.6, y + 0.8, z),
            Vec3::new(x + 1.6, y + 0.8, z - 0.15),
        )
    };
    light_head(m, g, s, pa, pb, pd);

    // Second light head; the alt variant shifts by 1.
    let off = 1.0;
    let (pa, pb, pd) = if alt {
        (
            Vec3::new(x + 3.75 + off, y + 0.8, z + off),
            Vec3::new(x + 3.6 + off, y + 0.8, z + off),
            Vec3::new(x + 3.6 + off, y + 0.8, z - 0.15 + off),
        )
    } else {
        (
            Vec3::new(x + 3.65, y + 0.8, z),
            Vec3::new(x + 3.5, y + 0.8, z),
            Vec3::new(x + 3.5, y + 0.8, z - 0.15),
        )
    };
    light_head(m, g, s, pa, pb, pd);
}

/// Four quads boxing in one hanging light.
fn light_head(m: &SceneMeshes, g: &mut FrameGraph, s: Vec3, pa: Vec3, pb: Vec3, pd: Vec3) {
    let scale = Vec3::new(0.25 * s.x, 0.5 * s.y, 0.25 * s.z);
    g.push(lit(m.head_left, place(pa, FLIP_TILT_AXIS, 180.0, scale), FACADE_SLATE));
    g.push(lit(m.quad_front, place(pb, FLIP_AXIS, 180.0, scale), FACADE_SLATE));
    g.push(lit(m.head_right, place(pb, FLIP_TILT_AXIS, 180.0, scale), FACADE_SLATE));
    g.push(lit(m.quad_back, place(pd, FLIP_AXIS, 180.0, scale), FACADE_SLATE));
}

/// One ground call lays four textured city blocks.
pub fn ground(
    m: &SceneMeshes,
    g: &mut FrameGraph,
    tex: TextureHandle,
    p: Vec3,
    s: Vec3,
) {
    const BLOCK_OFFSETS: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [-14.0, -0.3, 0.0],
        [0.0, 0.0, -14.0],
        [-14.0, -0.3, -14.0],
    ];
    for offset in BLOCK_OFFSETS {
        g.push(textured(
            m.ground,
            place(
                p + Vec3::new(offset[0], offset[1] - 5.0, offset[2]),
                UPRIGHT_AXIS,
                180.0,
                10.0 * s,
            ),
            GRASS_GREEN,
            tex,
        ));
    }
}

/// The textured disc the whole city sits on.
pub fn city_frame(
    m: &SceneMeshes,
    g: &mut FrameGraph,
    tex: TextureHandle,
    p: Vec3,
    s: Vec3,
    rot_deg: f32,
) {
    g.push(textured(
        m.disc,
        place(p + Vec3::new(0.0, -2.4, 0.0), UPRIGHT_AXIS, rot_deg, 10.0 * s),
        GRASS_GREEN,
        tex,
    ));
}

/// White ball marking the light position. Uses the emissive marker material.
pub fn marker_ball(m: &SceneMeshes, g: &mut FrameGraph, p: Vec3, radius: f32) {
    g.push(Instance {
        mesh: m.bulb,
        material: MaterialKind::Marker,
        texture: None,
        model: (Mat4::from_translation(p) * Mat4::from_scale(Vec3::splat(radius)))
            .to_cols_array_2d(),
        color: WHITE,
    });
}

/// Coordinate axes at the origin, drawn unlit.
pub fn axes(m: &SceneMeshes, g: &mut FrameGraph) {
    g.push(Instance {
        mesh: m.axes,
        material: MaterialKind::Unlit,
        texture: None,
        model: Mat4::IDENTITY.to_cols_array_2d(),
        color: CABLE_BLACK,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn prop_instance_counts() {
        let m = meshes();
        let mut g = FrameGraph::new();
        let p = Vec3::ZERO;
        let s = Vec3::splat(0.3);

        skyscraper(&m, &mut g, p, s);
        assert_eq!(g.instances().len(), 5);

        g.clear();
        arch_building(&m, &mut g, p, s);
        assert_eq!(g.instances().len(), 15);

        g.clear();
        lamp(&m, &mut g, p, s);
        assert_eq!(g.instances().len(), 3);

        g.clear();
        streetlights(&m, &mut g, p, s, 0);
        assert_eq!(g.instances().len(), 13);

        g.clear();
        streetlights(&m, &mut g, p, s, 5);
        assert_eq!(g.instances().len(), 13);

        g.clear();
        ground(&m, &mut g, TextureHandle(1), p, s);
        assert_eq!(g.instances().len(), 4);
    }

    #[test]
    fn offset_variant_shifts_first_pole() {
        let m = meshes();
        let mut g = FrameGraph::new();
        let p = Vec3::new(-1.6, 1.0, -1.375);
        streetlights(&m, &mut g, p, Vec3::splat(0.3), 5);

        // Translation column of the first pole's model matrix.
        let t = g.instances()[0].model[3];
        assert!((t[0] - (-1.6 + 5.0 - 0.4)).abs() < 1e-5);
        assert!((t[1] - 2.0).abs() < 1e-5);
        assert!((t[2] - (-1.375 + 5.0)).abs() < 1e-5);
    }

    #[test]
    fn ground_emits_four_blocks_with_shared_texture() {
        let m = meshes();
        let mut g = FrameGraph::new();
        let tex = TextureHandle(2);
        ground(&m, &mut g, tex, Vec3::new(1.0, 1.0, 1.0), Vec3::splat(0.3));
        for inst in g.instances() {
            assert_eq!(inst.texture, Some(tex));
            assert_eq!(inst.material, MaterialKind::Lit);
        }
        // Two blocks sit 0.3 lower than the other two.
        let low = g
            .instances()
            .iter()
            .filter(|i| (i.model[3][1] - (1.0 - 5.3)).abs() < 1e-5)
            .count();
        assert_eq!(low, 2);
    }

    #[test]
    fn marker_ball_is_emissive_material() {
        let m = meshes();
        let mut g = FrameGraph::new();
        marker_ball(&m, &mut g, Vec3::new(100.0, 20.0, 0.0), 0.1);
        assert_eq!(g.instances()[0].material, MaterialKind::Marker);
        assert_eq!(g.instances()[0].model[3][0], 100.0);
    }
}
