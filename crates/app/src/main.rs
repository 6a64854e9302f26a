//! swapframe: opens a window and renders the demo scene until closed.
//!
//! The loop polls window events, then drives one frame through the frame
//! controller. Resizes, minimizing and stale swapchains are all handled by
//! the controller; the loop never sees them.

mod render_system;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Vec2, Vec3};
use tracing::{debug, info};

use swapframe_core::{Config, Timer};
use swapframe_platform::Window;
use swapframe_renderer::vulkan::{VulkanChain, VulkanContext};
use swapframe_renderer::{FrameController, RenderPassParticipant};
use swapframe_rhi::instance::Instance;
use swapframe_scene::{Model, Scene, Sierpinski, TransformComponent};

use render_system::SceneRenderer;

/// Subdivisions of the demo gasket: 81 triangles.
const SIERPINSKI_DEPTH: u32 = 4;

#[derive(Parser, Debug)]
#[command(name = "swapframe", version, about = "Minimal Vulkan frame loop demo")]
struct Args {
    /// Configuration file; defaults are used when it does not exist.
    #[arg(long, default_value = "swapframe.toml")]
    config: PathBuf,

    /// Initial window width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Enable the Khronos validation layer.
    #[arg(long)]
    validation: bool,

    /// Present with FIFO even when MAILBOX is available.
    #[arg(long)]
    vsync: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.validation {
            config.renderer.validation = true;
        }
        if self.vsync {
            config.renderer.prefer_mailbox = false;
        }
    }
}

/// Four copies of the gasket, one per quadrant, each tinted differently.
fn build_scene() -> Result<Scene> {
    let mut scene = Scene::new();
    let gasket = Sierpinski::new(Vec2::new(-1.0, 1.0), 2.0, SIERPINSKI_DEPTH)?;
    let model = scene.add_model(Model::new("sierpinski", gasket)?);

    let placements = [
        (Vec2::new(-0.5, -0.5), Vec3::new(1.0, 0.2, 0.2)),
        (Vec2::new(0.5, -0.5), Vec3::new(0.2, 1.0, 0.2)),
        (Vec2::new(-0.5, 0.5), Vec3::new(0.2, 0.2, 1.0)),
        (Vec2::new(0.5, 0.5), Vec3::new(1.0, 1.0, 0.2)),
    ];
    for (offset, color) in placements {
        let object = scene.spawn(Some(model));
        object.color = color;
        object.transform = TransformComponent::new()
            .with_translation(offset.extend(0.0))
            .with_scale(Vec3::new(0.45, 0.45, 1.0));
    }

    info!(
        "Scene ready: {} objects, {} vertices",
        scene.objects().len(),
        scene.vertex_count()?
    );
    Ok(scene)
}

fn main() -> Result<()> {
    swapframe_core::init_logging();
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    info!("Starting swapframe");

    let window = Window::new(&config.window)?;
    let extensions = window.required_instance_extensions()?;
    let instance = Instance::new(c"swapframe", &extensions, config.renderer.validation)?;
    let surface = window.create_surface(&instance)?;
    let context = VulkanContext::new(instance, surface, config.renderer.prefer_mailbox)?;

    let mut controller: FrameController<Window, VulkanChain> =
        FrameController::new(window, context)?;
    // Declared after the controller so it drops first.
    let mut renderer = SceneRenderer::new(controller.device().device().clone(), build_scene()?)?;
    let mut timer = Timer::new();

    info!("Initialization complete, entering main loop");
    while !controller.surface().should_close() {
        controller.surface_mut().poll_events();
        renderer.set_delta(timer.tick());

        let Some(buffer) = controller.begin_frame()? else {
            continue;
        };
        let participant: &mut dyn RenderPassParticipant<VulkanContext> = &mut renderer;
        controller.record_render_pass(buffer, &mut [participant])?;
        controller.end_frame()?;

        if let Some(fps) = timer.frame_presented() {
            debug!("{:.1} fps", fps);
            let title = format!("{} ({:.0} fps)", config.window.title, fps);
            controller.surface().set_title(&title);
        }
    }

    controller.wait_idle()?;
    info!(
        "Shutting down after {} frames and {} swapchain rebuilds ({} objects drawn per frame)",
        controller.frame_count(),
        controller.rebuild_count(),
        renderer.scene().objects().len()
    );
    Ok(())
}
