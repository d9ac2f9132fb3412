//! Renderer-facing types: resource handles, per-frame instance collection,
//! and the frame parameter block the scene hands to the GPU backend.

pub mod texture;
mod vulkan;

pub use vulkan::Renderer;

/// Renderer-owned mesh resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(pub u32);

/// Renderer-owned texture resource handle. Handle 0 is the built-in 1x1
/// white texture, so untextured materials can always bind a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureHandle(pub u32);

/// Closed set of materials used by the demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaterialKind {
    /// Shaded scene geometry: white specular, no emission.
    Lit,
    /// Bypasses lighting entirely (coordinate axes).
    Unlit,
    /// The light-position ball: yellow specular plus the emission slider.
    Marker,
}

/// One drawn object: a mesh under a model transform.
///
/// Every instance owns its complete transform, so no matrix state can leak
/// between draws -- the moral equivalent of a guaranteed-balanced
/// push/pop pair.
#[derive(Debug, Clone, Copy)]
pub struct Instance {
    pub mesh: MeshHandle,
    pub material: MaterialKind,
    pub texture: Option<TextureHandle>,
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Contiguous run of instances sharing (material, mesh, texture); maps to a
/// single instanced draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawBatch {
    pub mesh: MeshHandle,
    pub material: MaterialKind,
    pub texture: Option<TextureHandle>,
    pub start: usize,
    pub count: usize,
}

/// Per-frame instance collection, rebuilt by the scene composer each frame
/// and consumed by the renderer as batched instanced draws.
#[derive(Default)]
pub struct FrameGraph {
    instances: Vec<Instance>,
    draw_order: Vec<u32>,
    batches: Vec<DrawBatch>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.draw_order.clear();
        self.batches.clear();
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Indices into `instances` in draw order; batches slice into this.
    pub fn draw_order(&self) -> &[u32] {
        &self.draw_order
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Groups instances into contiguous batches. Called once per frame by
    /// the renderer before building the instance buffer.
    pub fn prepare(&mut self) {
        let instances = &self.instances;
        self.draw_order.clear();
        self.draw_order.extend(0..instances.len() as u32);
        self.draw_order.sort_by_key(|&i| {
            let inst = &instances[i as usize];
            (inst.material, inst.mesh, inst.texture)
        });

        self.batches.clear();
        let mut start = 0usize;
        while start < self.draw_order.len() {
            let first = &self.instances[self.draw_order[start] as usize];
            let key = (first.material, first.mesh, first.texture);
            let mut end = start + 1;
            while end < self.draw_order.len() {
                let next = &self.instances[self.draw_order[end] as usize];
                if (next.material, next.mesh, next.texture) != key {
                    break;
                }
                end += 1;
            }
            self.batches.push(DrawBatch {
                mesh: first.mesh,
                material: first.material,
                texture: first.texture,
                start,
                count: end - start,
            });
            start = end;
        }
    }
}

/// Positional light block, present only while lighting is enabled.
#[derive(Debug, Clone, Copy)]
pub struct LightParams {
    pub position: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

/// Everything the backend needs for one frame besides the instances.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub eye: [f32; 3],
    pub light: Option<LightParams>,
    /// Texture environment: true = texel replaces the shaded color,
    /// false = texel modulates it.
    pub tex_replace: bool,
    /// Derived shininess value (already 2^exponent, or 0).
    pub shininess: f32,
    /// Emission slider percentage, applied to the marker material.
    pub emission: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(mesh: u32, material: MaterialKind, texture: Option<u32>) -> Instance {
        Instance {
            mesh: MeshHandle(mesh),
            material,
            texture: texture.map(TextureHandle),
            model: [[0.0; 4]; 4],
            color: [1.0; 4],
        }
    }

    #[test]
    fn prepare_groups_same_key_into_one_batch() {
        let mut g = FrameGraph::new();
        g.push(inst(0, MaterialKind::Lit, None));
        g.push(inst(1, MaterialKind::Lit, Some(1)));
        g.push(inst(0, MaterialKind::Lit, None));
        g.push(inst(1, MaterialKind::Lit, Some(1)));
        g.prepare();

        assert_eq!(g.batches().len(), 2);
        assert_eq!(g.batches().iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn prepare_covers_every_instance_exactly_once() {
        let mut g = FrameGraph::new();
        for i in 0..10 {
            g.push(inst(i % 3, MaterialKind::Lit, None));
        }
        g.push(inst(7, MaterialKind::Marker, None));
        g.prepare();

        let covered: usize = g.batches().iter().map(|b| b.count).sum();
        assert_eq!(covered, g.instances().len());
        assert_eq!(g.draw_order().len(), g.instances().len());

        // Batches are contiguous and non-overlapping in draw order.
        let mut cursor = 0;
        for b in g.batches() {
            assert_eq!(b.start, cursor);
            cursor += b.count;
        }
    }

    #[test]
    fn clear_resets_everything() {
        let mut g = FrameGraph::new();
        g.push(inst(0, MaterialKind::Unlit, None));
        g.prepare();
        g.clear();
        assert!(g.instances().is_empty());
        assert!(g.batches().is_empty());
    }
}
