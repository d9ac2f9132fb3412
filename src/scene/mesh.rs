//! CPU-side procedural mesh generation.
//!
//! These meshes are authoring / staging data. The renderer uploads them into
//! GPU buffers once at startup and returns handles the scene references for
//! the rest of the process.

use glam::Vec3;
use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    LineList,
}

/// Vertex format shared by every mesh in the demo.
///
/// - `pos`: object-space position
/// - `normal`: object-space normal (not necessarily unit; shaded paths
///   normalize in the fragment shader)
/// - `uv`: 0..1 texture coordinate, zero for untextured meshes
#[derive(BufferContents, Vertex, Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct CpuVertex {
    #[format(R32G32B32_SFLOAT)]
    pub pos: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub uv: [f32; 2],
}

fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> CpuVertex {
    CpuVertex { pos, normal, uv }
}

/// CPU-side mesh data.
///
/// Contract:
/// - `vertices` + `indices_u32` fully define geometry.
/// - `topology` is how indices are interpreted (the axes mesh is the only
///   line list).
#[derive(Debug, Clone)]
pub struct CpuMesh {
    pub vertices: Vec<CpuVertex>,
    pub indices_u32: Vec<u32>,
    pub topology: PrimitiveTopology,
}

impl CpuMesh {
    pub fn new(vertices: Vec<CpuVertex>, indices_u32: Vec<u32>) -> Self {
        Self {
            vertices,
            indices_u32,
            topology: PrimitiveTopology::TriangleList,
        }
    }

    pub fn lines(vertices: Vec<CpuVertex>, indices_u32: Vec<u32>) -> Self {
        Self {
            vertices,
            indices_u32,
            topology: PrimitiveTopology::LineList,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices_u32.len() as u32
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}

/// Rim/band vertex in polar coordinates; position and normal coincide, so a
/// unit sphere falls out of it directly.
fn polar_vertex(th_deg: f32, ph_deg: f32) -> CpuVertex {
    let (th, ph) = (th_deg.to_radians(), ph_deg.to_radians());
    let p = [
        th.sin() * ph.cos(),
        th.cos() * ph.cos(),
        ph.sin(),
    ];
    v(p, p, [0.0, 0.0])
}

/// Procedural mesh constructors.
///
/// Every shape is authored once in object space; placement, scaling and the
/// trademark slightly-off rotation axes live in `scene::props`.
pub struct MeshFactory;

impl MeshFactory {
    /// Single quad from an explicit vertex set and an explicit normal.
    ///
    /// The building facades reuse a handful of vertex sets under different
    /// normals, so the normal is the caller's choice rather than derived.
    pub fn quad_face(corners: [[f32; 3]; 4], normal: [f32; 3]) -> CpuMesh {
        let vertices = corners.map(|c| v(c, normal, [0.0, 0.0])).to_vec();
        CpuMesh::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// Textured ground tile: a horizontal quad at y = -1 with corner UVs.
    pub fn ground_tile(half: f32) -> CpuMesh {
        let n = [0.0, 1.0, 0.0];
        let vertices = vec![
            v([half, -1.0, half], n, [0.0, 0.0]),
            v([-half, -1.0, half], n, [1.0, 0.0]),
            v([-half, -1.0, -half], n, [1.0, 1.0]),
            v([half, -1.0, -half], n, [0.0, 1.0]),
        ];
        CpuMesh::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// Open cylinder along +Z, base ring at z = 0, top ring at z = `height`.
    ///
    /// Differing radii give a cone slice; the normals lean with the slope.
    /// No caps, matching how the posts and cables are used.
    pub fn cylinder(base_radius: f32, top_radius: f32, height: f32, slices: u32) -> CpuMesh {
        let mut vertices = Vec::with_capacity(2 * (slices as usize + 1));
        let mut indices = Vec::with_capacity(6 * slices as usize);

        let slope = (base_radius - top_radius) / height;
        for i in 0..=slices {
            let t = i as f32 / slices as f32;
            let a = t * std::f32::consts::TAU;
            let (sin, cos) = a.sin_cos();
            let n = Vec3::new(cos, sin, slope).normalize().to_array();
            vertices.push(v([base_radius * cos, base_radius * sin, 0.0], n, [t, 0.0]));
            vertices.push(v([top_radius * cos, top_radius * sin, height], n, [t, 1.0]));
        }
        for i in 0..slices {
            let a = 2 * i;
            indices.extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
        }
        CpuMesh::new(vertices, indices)
    }

    /// Torus around the Z axis: `tube_radius` is the ring thickness,
    /// `center_radius` the distance from the origin to the tube center.
    pub fn torus(tube_radius: f32, center_radius: f32, sides: u32, rings: u32) -> CpuMesh {
        let mut vertices = Vec::with_capacity(((rings + 1) * (sides + 1)) as usize);
        let mut indices = Vec::with_capacity((6 * rings * sides) as usize);

        for i in 0..=rings {
            let u = i as f32 / rings as f32 * std::f32::consts::TAU;
            let (su, cu) = u.sin_cos();
            for j in 0..=sides {
                let w = j as f32 / sides as f32 * std::f32::consts::TAU;
                let (sw, cw) = w.sin_cos();
                let r = center_radius + tube_radius * cw;
                vertices.push(v(
                    [r * cu, r * su, tube_radius * sw],
                    [cw * cu, cw * su, sw],
                    [0.0, 0.0],
                ));
            }
        }
        let stride = sides + 1;
        for i in 0..rings {
            for j in 0..sides {
                let a = i * stride + j;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        CpuMesh::new(vertices, indices)
    }

    /// Unit sphere approximated by latitude bands of quads, stepping
    /// `step_deg` in elevation and 2*`step_deg` in azimuth.
    pub fn sphere_bands(step_deg: i32) -> CpuMesh {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let mut ph = -90;
        while ph < 90 {
            let base = vertices.len() as u32;
            let mut th = 0;
            while th <= 360 {
                vertices.push(polar_vertex(th as f32, ph as f32));
                vertices.push(polar_vertex(th as f32, (ph + step_deg) as f32));
                th += 2 * step_deg;
            }
            let pairs = (vertices.len() as u32 - base) / 2;
            for i in 0..pairs - 1 {
                let a = base + 2 * i;
                indices.extend_from_slice(&[a, a + 1, a + 2, a + 2, a + 1, a + 3]);
            }
            ph += step_deg;
        }
        CpuMesh::new(vertices, indices)
    }

    /// City-frame disc: a fan over `steps` rim points in the XY plane.
    ///
    /// The fan pivots on the rim point at angle 0 (not a center vertex), the
    /// UVs alternate (0,0)/(1,1) per rim step, and the per-vertex normal is
    /// the unnormalized (x, y, 1). All three quirks are part of the look and
    /// kept as-is.
    pub fn disc_fan(radius: f32, steps: u32) -> CpuMesh {
        let mut vertices = Vec::with_capacity(steps as usize + 1);
        let mut indices = Vec::with_capacity(3 * (steps as usize - 1));

        for i in 0..=steps {
            let t = (i % 2) as f32;
            let angle = std::f32::consts::TAU * i as f32 / steps as f32;
            let (x, y) = (angle.cos() * radius, angle.sin() * radius);
            vertices.push(v([x, y, 0.0], [x, y, 1.0], [t, t]));
        }
        for i in 1..steps {
            indices.extend_from_slice(&[0, i, i + 1]);
        }
        CpuMesh::new(vertices, indices)
    }

    /// Coordinate axes as a line list from the origin.
    pub fn axes(len: f32) -> CpuMesh {
        let n = [0.0, 1.0, 0.0];
        let o = [0.0, 0.0, 0.0];
        let vertices = vec![
            v(o, n, [0.0, 0.0]),
            v([len, 0.0, 0.0], n, [0.0, 0.0]),
            v(o, n, [0.0, 0.0]),
            v([0.0, len, 0.0], n, [0.0, 0.0]),
            v(o, n, [0.0, 0.0]),
            v([0.0, 0.0, len], n, [0.0, 0.0]),
        ];
        CpuMesh::lines(vertices, vec![0, 1, 2, 3, 4, 5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_counts_and_unit_normals() {
        let m = MeshFactory::cylinder(0.5, 1.0, 5.0, 16);
        assert_eq!(m.vertex_count(), 2 * 17);
        assert_eq!(m.index_count(), 6 * 16);
        for vert in &m.vertices {
            let len = Vec3::from_array(vert.normal).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_band_structure() {
        let m = MeshFactory::sphere_bands(10);
        // 18 bands, 19 azimuth stops of 2 vertices each.
        assert_eq!(m.vertex_count(), 18 * 19 * 2);
        assert_eq!(m.index_count(), 18 * 18 * 6);
        // Position doubles as normal on the unit sphere.
        for vert in &m.vertices {
            assert_eq!(vert.pos, vert.normal);
            let len = Vec3::from_array(vert.pos).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn disc_fan_rim_and_uv_alternate() {
        let m = MeshFactory::disc_fan(15.0, 360);
        assert_eq!(m.vertex_count(), 361);
        assert_eq!(m.index_count(), 359 * 3);
        assert_eq!(m.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(m.vertices[1].uv, [1.0, 1.0]);
        assert_eq!(m.vertices[2].uv, [0.0, 0.0]);
        for vert in &m.vertices {
            let r = (vert.pos[0].powi(2) + vert.pos[1].powi(2)).sqrt();
            assert!((r - 15.0).abs() < 1e-3);
        }
    }

    #[test]
    fn torus_is_closed() {
        let m = MeshFactory::torus(1.0, 2.0, 12, 24);
        assert_eq!(m.vertex_count(), 25 * 13);
        assert_eq!(m.index_count(), 6 * 24 * 12);
    }

    #[test]
    fn ground_tile_uv_corners() {
        let m = MeshFactory::ground_tile(2.5);
        assert_eq!(m.vertex_count(), 4);
        let uvs: Vec<[f32; 2]> = m.vertices.iter().map(|vert| vert.uv).collect();
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn axes_are_lines() {
        let m = MeshFactory::axes(1.5);
        assert_eq!(m.topology, PrimitiveTopology::LineList);
        assert_eq!(m.index_count(), 6);
    }
}
