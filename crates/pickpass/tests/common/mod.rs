//! CPU rasterizer implementing `PickingBackend` for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::sync::Arc;

use pickpass::*;

/// Axis-aligned rectangle in normalized viewport coordinates (0..1, top-left
/// origin). Lower depth wins.
pub struct Quad {
    pub surface: Arc<Surface>,
    pub min: Vec2,
    pub max: Vec2,
    pub depth: f32,
}

pub struct SoftwareTarget {
    size: UVec2,
    pixels: RefCell<Vec<u8>>,
}

impl SoftwareTarget {
    pub fn size(&self) -> UVec2 {
        self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareView {
    pub sample_count: u32,
    pub blending: bool,
}

impl Default for SoftwareView {
    fn default() -> Self {
        Self {
            sample_count: 8,
            blending: true,
        }
    }
}

/// Completes after a fixed number of polls.
pub struct SoftwareReadback {
    pixels: Option<Vec<u8>>,
    polls_left: u32,
    fail: bool,
}

impl Readback for SoftwareReadback {
    fn poll(&mut self) -> ReadbackStatus {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return ReadbackStatus::Pending;
        }
        if self.fail {
            return ReadbackStatus::Failed("simulated device loss".into());
        }
        match self.pixels.take() {
            Some(pixels) => ReadbackStatus::Ready(pixels),
            None => ReadbackStatus::Failed("polled after completion".into()),
        }
    }
}

#[derive(Default)]
pub struct SoftwareBackend {
    pub quads: Vec<Quad>,
    pub view: SoftwareView,
    /// Polls that return `Pending` before a readback completes.
    pub latency: u32,
    /// Makes the next requested readback fail.
    pub fail_next: bool,
    pub targets_created: Vec<UVec2>,
    pub renders: usize,
    pub readbacks_requested: usize,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_quad(&mut self, surface: Arc<Surface>, min: Vec2, max: Vec2, depth: f32) {
        self.quads.push(Quad {
            surface,
            min,
            max,
            depth,
        });
    }
}

impl PickingBackend for SoftwareBackend {
    type Target = SoftwareTarget;
    type ViewState = SoftwareView;
    type Readback = SoftwareReadback;

    fn create_target(&mut self, size: UVec2) -> Result<SoftwareTarget> {
        self.targets_created.push(size);
        Ok(SoftwareTarget {
            size,
            pixels: RefCell::new(vec![0; (size.x * size.y * 4) as usize]),
        })
    }

    fn target_format(&self, _target: &SoftwareTarget) -> TargetFormat {
        TargetFormat::RGBA8_UNORM
    }

    fn save_view_state(&mut self) -> SoftwareView {
        self.view
    }

    fn restore_view_state(&mut self, state: SoftwareView) {
        self.view = state;
    }

    fn render_replacement(
        &mut self,
        target: &SoftwareTarget,
        tag: &PassTag,
        settings: &IdPassSettings,
    ) -> Result<()> {
        self.view.sample_count = settings.sample_count;
        self.view.blending = settings.blending;
        self.renders += 1;

        let size = target.size;
        let mut pixels = target.pixels.borrow_mut();
        for texel in pixels.chunks_mut(4) {
            texel.copy_from_slice(&settings.clear_color.0);
        }
        let mut depth = vec![f32::INFINITY; (size.x * size.y) as usize];

        for quad in &self.quads {
            if !quad.surface.material().matches(tag) {
                continue;
            }
            let Some(color) = quad.surface.property_block().id_color() else {
                continue;
            };
            for y in 0..size.y {
                for x in 0..size.x {
                    let center = Vec2::new(
                        (x as f32 + 0.5) / size.x as f32,
                        (y as f32 + 0.5) / size.y as f32,
                    );
                    let inside = center.cmpge(quad.min).all() && center.cmplt(quad.max).all();
                    let index = (y * size.x + x) as usize;
                    if inside && quad.depth < depth[index] {
                        depth[index] = quad.depth;
                        pixels[index * 4..index * 4 + 4].copy_from_slice(&color.0);
                    }
                }
            }
        }
        Ok(())
    }

    fn request_readback(&mut self, target: &SoftwareTarget) -> Result<SoftwareReadback> {
        self.readbacks_requested += 1;
        let fail = std::mem::take(&mut self.fail_next);
        Ok(SoftwareReadback {
            pixels: Some(target.pixels.borrow().clone()),
            polls_left: self.latency,
            fail,
        })
    }
}

/// A node with one lit surface.
pub fn lit_node(name: &str) -> Arc<SceneNode> {
    let material = Arc::new(Material::new(format!("{name}-lit"), "standard"));
    Arc::new(SceneNode::new(name).with_surface(Surface::new(material)))
}

/// A node with a fixed instance id and one lit surface.
pub fn lit_node_with_id(instance_id: u32, name: &str) -> Arc<SceneNode> {
    let material = Arc::new(Material::new(format!("{name}-lit"), "standard"));
    Arc::new(SceneNode::with_instance_id(instance_id, name).with_surface(Surface::new(material)))
}

/// Runs frames until a new readback has been accepted.
pub fn run_until_frame(
    surface: &mut PickingSurface<SoftwareBackend>,
    backend: &mut SoftwareBackend,
    viewport: UVec2,
) {
    let start = surface.frames_received();
    for _ in 0..16 {
        surface.frame(backend, viewport).expect("frame failed");
        if surface.frames_received() > start {
            return;
        }
    }
    panic!("no readback completed within 16 frames");
}
