//! wgpu implementation of [`PickingBackend`].

use std::sync::Arc;

use glam::{Mat4, UVec2, Vec3};
use pickpass_core::{
    IdColor, IdPassSettings, PassTag, PickingBackend, RenderSurface, Result, Surface,
    TargetFormat,
};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::pipeline::{IdDrawUniforms, IdPassPipeline};
use crate::readback::TextureReadback;
use crate::target::IdTarget;

/// A device and queue created without a window.
pub struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl HeadlessGpu {
    /// Requests an adapter and device with no surface attached.
    pub async fn new() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let info = adapter.get_info();
        log::info!("pick adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pickpass device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self { device, queue })
    }
}

/// View state the backend owns and the id pass temporarily overrides.
///
/// Sample count, blending and filtering are fixed by [`IdPassPipeline`] and
/// [`IdTarget`], so only the clear color and camera live here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    /// Color the next pass clears its target to.
    pub clear_color: wgpu::Color,
    /// Camera uploaded before drawing.
    pub view_proj: Mat4,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            view_proj: Mat4::IDENTITY,
        }
    }
}

/// The wgpu clear color that stores `color` exactly in an unorm target.
pub fn clear_color_of(color: IdColor) -> wgpu::Color {
    let [r, g, b, a] = color.to_unorm();
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}

/// Resources available to a scene while it records the id pass.
pub struct IdDrawContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub pipeline: &'a IdPassPipeline,
}

/// Geometry that can be drawn into the id target.
pub trait IdPassScene {
    /// Records draws for every surface whose material matches `tag`.
    ///
    /// The pipeline and camera bind group are already set on `pass`.
    fn draw_id_pass(
        &mut self,
        ctx: &IdDrawContext<'_>,
        pass: &mut wgpu::RenderPass<'_>,
        tag: &PassTag,
    );
}

/// Triangle mesh bound to a scene [`Surface`].
pub struct IdMesh {
    surface: Arc<Surface>,
    model: Mat4,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
}

impl IdMesh {
    /// The surface whose material and properties drive this mesh.
    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    /// Sets the model transform.
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }
}

/// A flat list of meshes, each drawn with its surface's id color.
#[derive(Default)]
pub struct IdMeshScene {
    meshes: Vec<IdMesh>,
}

impl IdMeshScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads a mesh for `surface`.
    pub fn add_mesh(
        &mut self,
        ctx: &IdDrawContext<'_>,
        surface: Arc<Surface>,
        positions: &[Vec3],
        indices: &[u32],
        model: Mat4,
    ) -> usize {
        let vertices: Vec<[f32; 3]> = positions.iter().map(|p| p.to_array()).collect();
        let vertex_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Id Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Id Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let (draw_buffer, draw_bind_group) = ctx.pipeline.create_draw_binding(ctx.device);

        self.meshes.push(IdMesh {
            surface,
            model,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            draw_buffer,
            draw_bind_group,
        });
        self.meshes.len() - 1
    }

    /// The uploaded meshes.
    pub fn meshes(&self) -> &[IdMesh] {
        &self.meshes
    }

    /// Mutable access to a mesh.
    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut IdMesh> {
        self.meshes.get_mut(index)
    }

    /// Number of meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Returns true if the scene has no meshes.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl IdPassScene for IdMeshScene {
    fn draw_id_pass(
        &mut self,
        ctx: &IdDrawContext<'_>,
        pass: &mut wgpu::RenderPass<'_>,
        tag: &PassTag,
    ) {
        for mesh in &self.meshes {
            // Surfaces without a matching material are not drawn at all.
            if !mesh.surface.material().matches(tag) {
                continue;
            }
            let Some(id_color) = mesh.surface.property_block().id_color() else {
                continue;
            };

            let uniforms = IdDrawUniforms {
                model: mesh.model.to_cols_array_2d(),
                id_color: id_color.to_unorm(),
            };
            ctx.queue
                .write_buffer(&mesh.draw_buffer, 0, bytemuck::bytes_of(&uniforms));

            pass.set_bind_group(1, &mesh.draw_bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

/// Renders the id pass with wgpu.
pub struct WgpuPickingBackend<S: IdPassScene> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: IdPassPipeline,
    scene: S,
    view: ViewSettings,
}

impl<S: IdPassScene> WgpuPickingBackend<S> {
    /// Builds the id pipeline on `device`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, scene: S) -> Self {
        let pipeline = IdPassPipeline::new(&device);
        Self {
            device,
            queue,
            pipeline,
            scene,
            view: ViewSettings::default(),
        }
    }

    /// Builds a backend on a headless device.
    pub fn from_headless(gpu: HeadlessGpu, scene: S) -> Self {
        Self::new(gpu.device, gpu.queue, scene)
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Resources for uploading scene geometry.
    pub fn draw_context(&self) -> IdDrawContext<'_> {
        IdDrawContext {
            device: &self.device,
            queue: &self.queue,
            pipeline: &self.pipeline,
        }
    }

    /// The scene.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Current view attributes.
    pub fn view(&self) -> &ViewSettings {
        &self.view
    }

    /// Sets the camera used by the id pass.
    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view.view_proj = view_proj;
    }

    /// Blocks until all submitted GPU work has finished.
    pub fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }
}

impl WgpuPickingBackend<IdMeshScene> {
    /// Uploads a mesh for `surface` and returns its index in the scene.
    pub fn add_mesh(
        &mut self,
        surface: Arc<Surface>,
        positions: &[Vec3],
        indices: &[u32],
        model: Mat4,
    ) -> usize {
        let ctx = IdDrawContext {
            device: &self.device,
            queue: &self.queue,
            pipeline: &self.pipeline,
        };
        self.scene.add_mesh(&ctx, surface, positions, indices, model)
    }
}

impl<S: IdPassScene> PickingBackend for WgpuPickingBackend<S> {
    type Target = IdTarget;
    type ViewState = ViewSettings;
    type Readback = TextureReadback;

    fn create_target(&mut self, size: UVec2) -> Result<IdTarget> {
        log::debug!("creating id target {}x{}", size.x, size.y);
        Ok(IdTarget::new(&self.device, size)?)
    }

    fn target_format(&self, target: &IdTarget) -> TargetFormat {
        target.format()
    }

    fn save_view_state(&mut self) -> ViewSettings {
        self.view
    }

    fn restore_view_state(&mut self, state: ViewSettings) {
        self.view = state;
    }

    fn render_replacement(
        &mut self,
        target: &IdTarget,
        tag: &PassTag,
        settings: &IdPassSettings,
    ) -> Result<()> {
        self.view.clear_color = clear_color_of(settings.clear_color);
        self.pipeline.set_view_proj(&self.queue, self.view.view_proj);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Id Pass Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Id Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.view.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(self.pipeline.pipeline());
            pass.set_bind_group(0, self.pipeline.camera_bind_group(), &[]);

            let ctx = IdDrawContext {
                device: &self.device,
                queue: &self.queue,
                pipeline: &self.pipeline,
            };
            self.scene.draw_id_pass(&ctx, &mut pass, tag);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn request_readback(&mut self, target: &IdTarget) -> Result<TextureReadback> {
        Ok(TextureReadback::start(&self.device, &self.queue, target))
    }
}
