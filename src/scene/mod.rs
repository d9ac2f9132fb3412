pub mod composer;
pub mod mesh;
pub mod props;

pub use composer::{SceneTextures, compose};
pub use mesh::{CpuMesh, CpuVertex, MeshFactory, PrimitiveTopology};
pub use props::SceneMeshes;
