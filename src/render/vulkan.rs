//! Vulkano renderer.
//!
//! One lit pipeline for the city geometry, one line pipeline for the axes.
//! Meshes and textures are uploaded once through staging buffers; per frame
//! the backend rebuilds a small instance buffer from the frame graph and
//! issues one instanced draw per batch.

use std::sync::Arc;

use winit::window::Window;

use crate::render::{FrameGraph, FrameParams, MeshHandle, TextureHandle};
use crate::scene::mesh::CpuMesh;

mod backend {
    use std::collections::BTreeMap;
    use std::collections::HashMap;
    use std::mem::size_of;
    use std::sync::Arc;

    use vulkano::DeviceSize;
    use vulkano::buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer};
    use vulkano::command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, CopyBufferInfo, CopyBufferToImageInfo,
        PrimaryCommandBufferAbstract, RenderPassBeginInfo, SubpassBeginInfo, SubpassEndInfo,
        allocator::StandardCommandBufferAllocator,
    };
    use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
    use vulkano::descriptor_set::layout::{
        DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo,
        DescriptorType,
    };
    use vulkano::descriptor_set::{DescriptorSet, WriteDescriptorSet};
    use vulkano::device::Device;
    use vulkano::format::{ClearValue, Format};
    use vulkano::image::sampler::{Sampler, SamplerCreateInfo};
    use vulkano::image::view::ImageView;
    use vulkano::image::{Image, ImageCreateInfo, ImageType, ImageUsage};
    use vulkano::memory::allocator::{AllocationCreateInfo, MemoryTypeFilter};
    use vulkano::pipeline::graphics::GraphicsPipelineCreateInfo;
    use vulkano::pipeline::graphics::color_blend::{ColorBlendAttachmentState, ColorBlendState};
    use vulkano::pipeline::graphics::depth_stencil::{DepthState, DepthStencilState};
    use vulkano::pipeline::graphics::input_assembly::{
        InputAssemblyState, PrimitiveTopology as VkTopology,
    };
    use vulkano::pipeline::graphics::multisample::MultisampleState;
    use vulkano::pipeline::graphics::rasterization::RasterizationState;
    use vulkano::pipeline::graphics::subpass::PipelineSubpassType;
    use vulkano::pipeline::graphics::vertex_input::{
        VertexInputAttributeDescription, VertexInputBindingDescription, VertexInputRate,
        VertexInputState,
    };
    use vulkano::pipeline::graphics::viewport::{Scissor, Viewport, ViewportState};
    use vulkano::pipeline::layout::{PipelineLayout, PipelineLayoutCreateInfo};
    use vulkano::pipeline::{
        DynamicState, GraphicsPipeline, PipelineBindPoint, PipelineShaderStageCreateInfo,
    };
    use vulkano::render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass};
    use vulkano::shader::ShaderStages;
    use vulkano::swapchain::{self, Surface, Swapchain, SwapchainCreateInfo, SwapchainPresentInfo};
    use vulkano::sync::{self, GpuFuture};
    use vulkano::{Validated, VulkanError};
    use vulkano_util::context::{VulkanoConfig, VulkanoContext};
    use winit::window::Window;

    use crate::render::{FrameGraph, FrameParams, MaterialKind, MeshHandle, TextureHandle};
    use crate::scene::mesh::{CpuMesh, CpuVertex, PrimitiveTopology};

    mod city_vs {
        vulkano_shaders::shader! {
            ty: "vertex",
            path: "assets/shaders/city.vert",
        }
    }

    mod city_fs {
        vulkano_shaders::shader! {
            ty: "fragment",
            path: "assets/shaders/city.frag",
        }
    }

    const DEPTH_FORMAT: Format = Format::D16_UNORM;

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct CameraUBO {
        view: [[f32; 4]; 4],
        proj: [[f32; 4]; 4],
        // Eye position for specular; w unused.
        eye: [f32; 4],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct LightUBO {
        position: [f32; 4],
        ambient: [f32; 4],
        diffuse: [f32; 4],
        specular: [f32; 4],
        enabled: u32,
        tex_replace: u32,
        _pad0: [u32; 2],
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C, align(16))]
    struct MaterialUBO {
        specular: [f32; 4],
        emission: [f32; 4],
        shininess: f32,
        unlit: u32,
        textured: u32,
        _pad0: u32,
    }

    #[derive(BufferContents, Clone, Copy, Debug, Default)]
    #[repr(C)]
    struct InstanceData {
        i_model_c0: [f32; 4],
        i_model_c1: [f32; 4],
        i_model_c2: [f32; 4],
        i_model_c3: [f32; 4],
        i_color: [f32; 4],
    }

    pub struct GpuMesh {
        vertices: Subbuffer<[CpuVertex]>,
        indices: Subbuffer<[u32]>,
        index_count: u32,
        topology: PrimitiveTopology,
    }

    pub struct GpuTexture {
        view: Arc<ImageView>,
    }

    /// Descriptor set layouts shared by both pipelines.
    ///
    /// Set 0: global data (camera UBO, light UBO).
    /// Set 1: material data (material UBO, base color texture).
    struct SetLayouts {
        global: Arc<DescriptorSetLayout>,
        material: Arc<DescriptorSetLayout>,
    }

    impl SetLayouts {
        fn new(device: Arc<Device>) -> Result<Self, Box<dyn std::error::Error>> {
            let mut global_bindings = BTreeMap::new();

            let mut camera_binding =
                DescriptorSetLayoutBinding::descriptor_type(DescriptorType::UniformBuffer);
            camera_binding.descriptor_count = 1;
            // Superset stage mask: the camera feeds the VS transform and the
            // FS specular term.
            camera_binding.stages = ShaderStages::VERTEX | ShaderStages::FRAGMENT;
            global_bindings.insert(0, camera_binding);

            let mut light_binding =
                DescriptorSetLayoutBinding::descriptor_type(DescriptorType::UniformBuffer);
            light_binding.descriptor_count = 1;
            light_binding.stages = ShaderStages::FRAGMENT;
            global_bindings.insert(1, light_binding);

            let global = DescriptorSetLayout::new(
                device.clone(),
                DescriptorSetLayoutCreateInfo {
                    bindings: global_bindings,
                    ..Default::default()
                },
            )?;

            let mut material_bindings = BTreeMap::new();
            let mut material_params =
                DescriptorSetLayoutBinding::descriptor_type(DescriptorType::UniformBuffer);
            material_params.descriptor_count = 1;
            material_params.stages = ShaderStages::FRAGMENT;
            material_bindings.insert(0, material_params);

            let mut base_color_tex =
                DescriptorSetLayoutBinding::descriptor_type(DescriptorType::CombinedImageSampler);
            base_color_tex.descriptor_count = 1;
            base_color_tex.stages = ShaderStages::FRAGMENT;
            material_bindings.insert(1, base_color_tex);

            let material = DescriptorSetLayout::new(
                device,
                DescriptorSetLayoutCreateInfo {
                    bindings: material_bindings,
                    ..Default::default()
                },
            )?;

            Ok(Self { global, material })
        }
    }

    pub struct VulkanState {
        context: VulkanoContext,
        window: Arc<Window>,
        #[allow(dead_code)]
        surface: Arc<Surface>,
        swapchain: Arc<Swapchain>,
        render_pass: Arc<RenderPass>,
        framebuffers: Vec<Arc<Framebuffer>>,

        command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
        descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,

        pipeline_layout: Arc<PipelineLayout>,
        pipeline_triangles: Arc<GraphicsPipeline>,
        pipeline_lines: Arc<GraphicsPipeline>,

        meshes: HashMap<MeshHandle, GpuMesh>,
        textures: HashMap<TextureHandle, GpuTexture>,
        sampler: Arc<Sampler>,
        default_white_texture: TextureHandle,

        pub window_resized: bool,
        recreate_swapchain: bool,
        previous_frame_end: Option<Box<dyn GpuFuture>>,
    }

    impl VulkanState {
        pub fn new(window: Arc<Window>) -> Result<Self, Box<dyn std::error::Error>> {
            // The helper context enables surface extensions and sets up
            // queues and allocators.
            let context = VulkanoContext::new(VulkanoConfig::default());
            let device = context.device().clone();

            let surface = Surface::from_window(device.instance().clone(), window.clone())?;

            let surface_capabilities = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;
            let image_format = device
                .physical_device()
                .surface_formats(&surface, Default::default())?
                .first()
                .ok_or("no supported surface formats")?
                .0;

            let mut min_image_count = 2u32.max(surface_capabilities.min_image_count);
            if let Some(max_image_count) = surface_capabilities.max_image_count {
                min_image_count = min_image_count.min(max_image_count);
            }

            let (swapchain, images) = Swapchain::new(
                device.clone(),
                surface.clone(),
                SwapchainCreateInfo {
                    min_image_count,
                    image_format,
                    image_extent: window.inner_size().into(),
                    image_usage: ImageUsage::COLOR_ATTACHMENT,
                    composite_alpha: surface_capabilities
                        .supported_composite_alpha
                        .into_iter()
                        .next()
                        .ok_or("no supported composite alpha")?,
                    ..Default::default()
                },
            )?;

            let render_pass = vulkano::single_pass_renderpass!(
                device.clone(),
                attachments: {
                    color: {
                        format: swapchain.image_format(),
                        samples: 1,
                        load_op: Clear,
                        store_op: Store,
                    },
                    depth: {
                        format: DEPTH_FORMAT,
                        samples: 1,
                        load_op: Clear,
                        store_op: DontCare,
                    },
                },
                pass: {
                    color: [color],
                    depth_stencil: {depth},
                }
            )?;

            let framebuffers =
                Self::create_framebuffers(&context, &render_pass, images, window.inner_size().into())?;

            let set_layouts = SetLayouts::new(device.clone())?;

            let vs = city_vs::load(device.clone())?;
            let fs = city_fs::load(device.clone())?;

            let stages = vec![
                PipelineShaderStageCreateInfo::new(
                    vs.entry_point("main").ok_or("missing city.vert entry point")?,
                ),
                PipelineShaderStageCreateInfo::new(
                    fs.entry_point("main").ok_or("missing city.frag entry point")?,
                ),
            ];

            let pipeline_layout = PipelineLayout::new(
                device.clone(),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![set_layouts.global.clone(), set_layouts.material.clone()],
                    ..Default::default()
                },
            )?;

            let subpass = Subpass::from(render_pass.clone(), 0).ok_or("missing subpass 0")?;

            let pipeline_triangles = Self::build_pipeline(
                device.clone(),
                stages.clone(),
                pipeline_layout.clone(),
                subpass.clone(),
                VkTopology::TriangleList,
            )?;
            let pipeline_lines = Self::build_pipeline(
                device.clone(),
                stages,
                pipeline_layout.clone(),
                subpass,
                VkTopology::LineList,
            )?;

            let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
                device.clone(),
                Default::default(),
            ));
            let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
                device.clone(),
                Default::default(),
            ));

            let sampler = Sampler::new(device.clone(), SamplerCreateInfo::simple_repeat_linear())?;

            let mut state = Self {
                context,
                window,
                surface,
                swapchain,
                render_pass,
                framebuffers,

                command_buffer_allocator,
                descriptor_set_allocator,

                pipeline_layout,
                pipeline_triangles,
                pipeline_lines,

                meshes: HashMap::new(),
                textures: HashMap::new(),
                sampler,
                default_white_texture: TextureHandle(0),

                window_resized: false,
                recreate_swapchain: false,
                previous_frame_end: Some(sync::now(device).boxed()),
            };

            // Default texture: 1x1 white so untextured materials can still
            // bind a sampler.
            state.upload_texture_rgba8(TextureHandle(0), &[255, 255, 255, 255], 1, 1)?;

            Ok(state)
        }

        fn build_pipeline(
            device: Arc<Device>,
            stages: Vec<PipelineShaderStageCreateInfo>,
            layout: Arc<PipelineLayout>,
            subpass: Subpass,
            topology: VkTopology,
        ) -> Result<Arc<GraphicsPipeline>, Box<dyn std::error::Error>> {
            // Binding 0: per-vertex data; binding 1: per-instance model
            // matrix columns + color in locations 3..=7.
            let vertex_input_state = VertexInputState::new()
                .binding(
                    0,
                    VertexInputBindingDescription {
                        stride: size_of::<CpuVertex>() as u32,
                        input_rate: VertexInputRate::Vertex,
                        ..Default::default()
                    },
                )
                .binding(
                    1,
                    VertexInputBindingDescription {
                        stride: size_of::<InstanceData>() as u32,
                        input_rate: VertexInputRate::Instance { divisor: 1 },
                        ..Default::default()
                    },
                )
                .attribute(
                    0,
                    VertexInputAttributeDescription {
                        binding: 0,
                        format: Format::R32G32B32_SFLOAT,
                        offset: 0,
                        ..Default::default()
                    },
                )
                .attribute(
                    1,
                    VertexInputAttributeDescription {
                        binding: 0,
                        format: Format::R32G32B32_SFLOAT,
                        offset: 12,
                        ..Default::default()
                    },
                )
                .attribute(
                    2,
                    VertexInputAttributeDescription {
                        binding: 0,
                        format: Format::R32G32_SFLOAT,
                        offset: 24,
                        ..Default::default()
                    },
                )
                .attribute(
                    3,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: 0,
                        ..Default::default()
                    },
                )
                .attribute(
                    4,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: 16,
                        ..Default::default()
                    },
                )
                .attribute(
                    5,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: 32,
                        ..Default::default()
                    },
                )
                .attribute(
                    6,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: 48,
                        ..Default::default()
                    },
                )
                .attribute(
                    7,
                    VertexInputAttributeDescription {
                        binding: 1,
                        format: Format::R32G32B32A32_SFLOAT,
                        offset: 64,
                        ..Default::default()
                    },
                );

            let mut pipeline_ci = GraphicsPipelineCreateInfo::layout(layout);
            pipeline_ci.stages = stages.into();
            pipeline_ci.vertex_input_state = Some(vertex_input_state);
            pipeline_ci.input_assembly_state = Some(InputAssemblyState {
                topology,
                ..Default::default()
            });
            pipeline_ci.viewport_state = Some(ViewportState::default());
            pipeline_ci.rasterization_state = Some(RasterizationState::default());
            pipeline_ci.multisample_state = Some(MultisampleState::default());
            // Opaque scene: depth test + write, no blending.
            pipeline_ci.depth_stencil_state = Some(DepthStencilState {
                depth: Some(DepthState::simple()),
                ..Default::default()
            });
            pipeline_ci.color_blend_state = Some(ColorBlendState::with_attachment_states(
                1,
                ColorBlendAttachmentState::default(),
            ));
            pipeline_ci.dynamic_state = [DynamicState::Viewport, DynamicState::Scissor]
                .into_iter()
                .collect();
            pipeline_ci.subpass = Some(PipelineSubpassType::BeginRenderPass(subpass));

            Ok(GraphicsPipeline::new(device, None, pipeline_ci)?)
        }

        fn create_framebuffers(
            context: &VulkanoContext,
            render_pass: &Arc<RenderPass>,
            images: Vec<Arc<Image>>,
            extent: [u32; 2],
        ) -> Result<Vec<Arc<Framebuffer>>, Box<dyn std::error::Error>> {
            // One depth buffer is enough; frames are serialized through
            // `previous_frame_end`.
            let depth_image = Image::new(
                context.memory_allocator().clone(),
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format: DEPTH_FORMAT,
                    extent: [extent[0], extent[1], 1],
                    usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
            )?;
            let depth_view = ImageView::new_default(depth_image)?;

            images
                .into_iter()
                .map(|image| {
                    let view = ImageView::new_default(image)?;
                    Framebuffer::new(
                        render_pass.clone(),
                        FramebufferCreateInfo {
                            attachments: vec![view, depth_view.clone()],
                            ..Default::default()
                        },
                    )
                    .map_err(|e| e.into())
                })
                .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()
        }

        fn recreate_swapchain_if_needed(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            if !(self.window_resized || self.recreate_swapchain) {
                return Ok(());
            }

            self.recreate_swapchain = false;
            let new_dimensions = self.window.inner_size();
            if new_dimensions.width == 0 || new_dimensions.height == 0 {
                // Avoid recreating with a zero-sized swapchain while minimized.
                return Ok(());
            }

            let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
                image_extent: new_dimensions.into(),
                ..self.swapchain.create_info()
            }) {
                Ok(r) => r,
                Err(e) => {
                    self.recreate_swapchain = true;
                    log::warn!("failed to recreate swapchain: {}", Validated::unwrap(e));
                    return Ok(());
                }
            };

            self.swapchain = new_swapchain;
            self.framebuffers = Self::create_framebuffers(
                &self.context,
                &self.render_pass,
                new_images,
                new_dimensions.into(),
            )?;

            self.window_resized = false;
            Ok(())
        }

        fn material_ubo(kind: MaterialKind, params: &FrameParams, textured: bool) -> MaterialUBO {
            let textured = textured as u32;
            match kind {
                MaterialKind::Lit => MaterialUBO {
                    specular: [1.0, 1.0, 1.0, 1.0],
                    emission: [0.0, 0.0, 0.0, 1.0],
                    shininess: params.shininess,
                    unlit: 0,
                    textured,
                    _pad0: 0,
                },
                MaterialKind::Unlit => MaterialUBO {
                    specular: [0.0, 0.0, 0.0, 1.0],
                    emission: [0.0, 0.0, 0.0, 1.0],
                    shininess: 0.0,
                    unlit: 1,
                    textured,
                    _pad0: 0,
                },
                MaterialKind::Marker => MaterialUBO {
                    specular: [1.0, 1.0, 0.0, 1.0],
                    emission: [0.0, 0.0, 0.01 * params.emission as f32, 1.0],
                    shininess: params.shininess,
                    unlit: 0,
                    textured,
                    _pad0: 0,
                },
            }
        }

        pub fn draw_frame(
            &mut self,
            params: &FrameParams,
            graph: &mut FrameGraph,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.recreate_swapchain_if_needed()?;

            let device = self.context.device().clone();
            let queue = self.context.graphics_queue().clone();

            if let Some(previous_frame_end) = self.previous_frame_end.as_mut() {
                previous_frame_end.cleanup_finished();
            }

            let (image_i, suboptimal, acquire_future) =
                match swapchain::acquire_next_image(self.swapchain.clone(), None)
                    .map_err(Validated::unwrap)
                {
                    Ok(r) => r,
                    Err(VulkanError::OutOfDate) => {
                        self.recreate_swapchain = true;
                        return Ok(());
                    }
                    Err(e) => return Err(Box::new(e)),
                };

            if suboptimal {
                self.recreate_swapchain = true;
            }

            graph.prepare();

            // Instance buffer in draw order, so each batch maps to a
            // contiguous range.
            let instances_ref = graph.instances();
            let instance_buffer: Option<Subbuffer<[InstanceData]>> =
                if graph.draw_order().is_empty() {
                    None
                } else {
                    let instance_data_iter = graph.draw_order().iter().map(|&idx| {
                        let inst = instances_ref[idx as usize];
                        InstanceData {
                            i_model_c0: inst.model[0],
                            i_model_c1: inst.model[1],
                            i_model_c2: inst.model[2],
                            i_model_c3: inst.model[3],
                            i_color: inst.color,
                        }
                    });
                    Some(Buffer::from_iter(
                        self.context.memory_allocator().clone(),
                        BufferCreateInfo {
                            usage: BufferUsage::VERTEX_BUFFER,
                            ..Default::default()
                        },
                        AllocationCreateInfo {
                            memory_type_filter: MemoryTypeFilter::PREFER_HOST
                                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                            ..Default::default()
                        },
                        instance_data_iter,
                    )?)
                };

            let framebuffer = self.framebuffers[image_i as usize].clone();
            let mut render_pass_begin = RenderPassBeginInfo::framebuffer(framebuffer);
            render_pass_begin.clear_values = vec![
                Some(ClearValue::from([0.0f32, 0.0, 0.0, 1.0])),
                Some(ClearValue::Depth(1.0)),
            ];

            let extent = self.swapchain.image_extent();
            let viewport = Viewport {
                offset: [0.0, 0.0],
                extent: [extent[0] as f32, extent[1] as f32],
                depth_range: 0.0..=1.0,
                ..Default::default()
            };

            let camera_buffer: Subbuffer<CameraUBO> = Buffer::from_data(
                self.context.memory_allocator().clone(),
                BufferCreateInfo {
                    usage: BufferUsage::UNIFORM_BUFFER,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                CameraUBO {
                    view: params.view,
                    proj: params.proj,
                    eye: [params.eye[0], params.eye[1], params.eye[2], 0.0],
                },
            )?;

            let light_ubo = match params.light {
                Some(l) => LightUBO {
                    position: [l.position[0], l.position[1], l.position[2], 1.0],
                    ambient: [l.ambient[0], l.ambient[1], l.ambient[2], 1.0],
                    diffuse: [l.diffuse[0], l.diffuse[1], l.diffuse[2], 1.0],
                    specular: [l.specular[0], l.specular[1], l.specular[2], 1.0],
                    enabled: 1,
                    tex_replace: params.tex_replace as u32,
                    _pad0: [0, 0],
                },
                None => LightUBO {
                    tex_replace: params.tex_replace as u32,
                    ..Default::default()
                },
            };
            let light_buffer: Subbuffer<LightUBO> = Buffer::from_data(
                self.context.memory_allocator().clone(),
                BufferCreateInfo {
                    usage: BufferUsage::UNIFORM_BUFFER,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                light_ubo,
            )?;

            let global_set = DescriptorSet::new(
                self.descriptor_set_allocator.clone(),
                self.pipeline_layout.set_layouts()[0].clone(),
                [
                    WriteDescriptorSet::buffer(0, camera_buffer),
                    WriteDescriptorSet::buffer(1, light_buffer),
                ],
                [],
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;

            cbb.begin_render_pass(render_pass_begin, SubpassBeginInfo::default())?;
            cbb.set_viewport(0, vec![viewport].into())?;
            cbb.set_scissor(
                0,
                vec![Scissor {
                    offset: [0, 0],
                    extent: [extent[0], extent[1]],
                    ..Default::default()
                }]
                .into(),
            )?;

            if let Some(instance_buffer) = &instance_buffer {
                for batch in graph.batches() {
                    let Some(mesh) = self.meshes.get(&batch.mesh) else {
                        continue;
                    };
                    let texture_handle = batch.texture.unwrap_or(self.default_white_texture);
                    let Some(tex) = self.textures.get(&texture_handle) else {
                        // Missing texture: skip this batch.
                        continue;
                    };

                    let material_ubo =
                        Self::material_ubo(batch.material, params, batch.texture.is_some());
                    let material_buffer: Subbuffer<MaterialUBO> = Buffer::from_data(
                        self.context.memory_allocator().clone(),
                        BufferCreateInfo {
                            usage: BufferUsage::UNIFORM_BUFFER,
                            ..Default::default()
                        },
                        AllocationCreateInfo {
                            memory_type_filter: MemoryTypeFilter::PREFER_HOST
                                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                            ..Default::default()
                        },
                        material_ubo,
                    )?;

                    let material_set = DescriptorSet::new(
                        self.descriptor_set_allocator.clone(),
                        self.pipeline_layout.set_layouts()[1].clone(),
                        [
                            WriteDescriptorSet::buffer(0, material_buffer),
                            WriteDescriptorSet::image_view_sampler(
                                1,
                                tex.view.clone(),
                                self.sampler.clone(),
                            ),
                        ],
                        [],
                    )?;

                    let pipeline = match mesh.topology {
                        PrimitiveTopology::TriangleList => self.pipeline_triangles.clone(),
                        PrimitiveTopology::LineList => self.pipeline_lines.clone(),
                    };
                    cbb.bind_pipeline_graphics(pipeline)?;
                    cbb.bind_descriptor_sets(
                        PipelineBindPoint::Graphics,
                        self.pipeline_layout.clone(),
                        0,
                        (global_set.clone(), material_set),
                    )?;
                    cbb.bind_vertex_buffers(0, (mesh.vertices.clone(), instance_buffer.clone()))?;
                    cbb.bind_index_buffer(mesh.indices.clone())?;

                    unsafe {
                        cbb.draw_indexed(
                            mesh.index_count,
                            batch.count as u32,
                            0,
                            0,
                            batch.start as u32,
                        )?;
                    }
                }
            }

            cbb.end_render_pass(SubpassEndInfo::default())?;

            let cb = cbb.build()?;

            let start_future: Box<dyn GpuFuture> = self
                .previous_frame_end
                .take()
                .unwrap_or_else(|| sync::now(device.clone()).boxed());

            let execution = start_future
                .join(acquire_future)
                .then_execute(queue.clone(), cb)?
                .then_swapchain_present(
                    queue.clone(),
                    SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_i),
                )
                .then_signal_fence_and_flush();

            match execution.map_err(Validated::unwrap) {
                Ok(future) => {
                    // Keep the future so resources are cleaned up incrementally.
                    self.previous_frame_end = Some(future.boxed());
                }
                Err(VulkanError::OutOfDate) => {
                    self.recreate_swapchain = true;
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
                Err(e) => {
                    log::warn!("failed to flush frame: {e}");
                    self.previous_frame_end = Some(sync::now(device).boxed());
                }
            }

            Ok(())
        }

        pub fn upload_texture_rgba8(
            &mut self,
            handle: TextureHandle,
            rgba: &[u8],
            width: u32,
            height: u32,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.textures.contains_key(&handle) {
                return Ok(());
            }

            if width == 0 || height == 0 {
                return Err("texture has zero size".into());
            }

            let expected_len = width as usize * height as usize * 4;
            if rgba.len() != expected_len {
                return Err(format!(
                    "texture rgba length mismatch: got={}, expected={}",
                    rgba.len(),
                    expected_len
                )
                .into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            let staging = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                rgba.iter().copied(),
            )?;

            let image = Image::new(
                memory_allocator,
                ImageCreateInfo {
                    image_type: ImageType::Dim2d,
                    format: Format::R8G8B8A8_UNORM,
                    extent: [width, height, 1],
                    usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;
            cbb.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging, image.clone()))?;
            let cb = cbb.build()?;

            cb.execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            let view = ImageView::new_default(image)?;
            self.textures.insert(handle, GpuTexture { view });
            Ok(())
        }

        pub fn upload_mesh(
            &mut self,
            handle: MeshHandle,
            mesh: &CpuMesh,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.meshes.contains_key(&handle) {
                return Ok(());
            }

            if mesh.vertices.is_empty() {
                return Err("mesh has no vertices".into());
            }
            if mesh.indices_u32.is_empty() {
                return Err("mesh has no indices".into());
            }

            let memory_allocator = self.context.memory_allocator().clone();
            let queue = self.context.graphics_queue().clone();

            // Host-visible staging buffers.
            let vertices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                mesh.vertices.iter().copied(),
            )?;

            let indices_src = Buffer::from_iter(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::TRANSFER_SRC,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_HOST
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
                mesh.indices_u32.iter().copied(),
            )?;

            // Device-local destination buffers.
            let vertices_dst = Buffer::new_slice::<CpuVertex>(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::VERTEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.vertices.len() as DeviceSize,
            )?;

            let indices_dst = Buffer::new_slice::<u32>(
                memory_allocator.clone(),
                BufferCreateInfo {
                    usage: BufferUsage::INDEX_BUFFER | BufferUsage::TRANSFER_DST,
                    ..Default::default()
                },
                AllocationCreateInfo {
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                    ..Default::default()
                },
                mesh.indices_u32.len() as DeviceSize,
            )?;

            let mut cbb = AutoCommandBufferBuilder::primary(
                self.command_buffer_allocator.clone(),
                queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )?;
            cbb.copy_buffer(CopyBufferInfo::buffers(vertices_src, vertices_dst.clone()))?;
            cbb.copy_buffer(CopyBufferInfo::buffers(indices_src, indices_dst.clone()))?;
            let cb = cbb.build()?;

            cb.execute(queue.clone())?
                .then_signal_fence_and_flush()?
                .wait(None)?;

            self.meshes.insert(
                handle,
                GpuMesh {
                    vertices: vertices_dst,
                    indices: indices_dst,
                    index_count: mesh.index_count(),
                    topology: mesh.topology,
                },
            );

            Ok(())
        }
    }
}

/// Renderer facade: handle bookkeeping over the Vulkan state.
pub struct Renderer {
    backend: Option<backend::VulkanState>,
    next_mesh_handle: u32,
    next_texture_handle: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            backend: None,
            next_mesh_handle: 0,
            // Handle 0 is reserved for the default white texture.
            next_texture_handle: 1,
        }
    }

    pub fn init_for_window(
        &mut self,
        window: &Arc<Window>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.backend.is_none() {
            self.backend = Some(backend::VulkanState::new(window.clone())?);
            log::info!("swapchain and render pass initialized");
        }
        Ok(())
    }

    pub fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        let _ = size;
        if let Some(backend) = self.backend.as_mut() {
            backend.window_resized = true;
        }
    }

    /// The built-in 1x1 white texture; the fallback for failed loads.
    pub fn white_texture(&self) -> TextureHandle {
        TextureHandle(0)
    }

    pub fn upload_mesh(&mut self, mesh: &CpuMesh) -> Result<MeshHandle, Box<dyn std::error::Error>> {
        let Some(backend) = self.backend.as_mut() else {
            return Err("renderer not initialized (call init_for_window first)".into());
        };

        let handle = MeshHandle(self.next_mesh_handle);
        self.next_mesh_handle = self.next_mesh_handle.wrapping_add(1);

        backend.upload_mesh(handle, mesh)?;
        Ok(handle)
    }

    pub fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, Box<dyn std::error::Error>> {
        let Some(backend) = self.backend.as_mut() else {
            return Err("renderer not initialized (call init_for_window first)".into());
        };

        let handle = TextureHandle(self.next_texture_handle);
        self.next_texture_handle = self.next_texture_handle.wrapping_add(1);

        backend.upload_texture_rgba8(handle, rgba, width, height)?;
        Ok(handle)
    }

    pub fn draw_frame(
        &mut self,
        params: &FrameParams,
        graph: &mut FrameGraph,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(backend) = self.backend.as_mut() else {
            return Err("renderer not initialized (call init_for_window first)".into());
        };
        backend.draw_frame(params, graph)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
