//! Scripted in-memory backend for frame controller tests.
//!
//! A single [`World`] is shared by the mock surface, device and chain so a
//! test can script what the backend reports next and inspect every call the
//! controller made.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use swapframe_renderer::{
    ChainStatus, DeviceContext, Extent, FrameController, FrameError, PresentationChain,
    RenderPassBegin, RenderResult, SurfaceProvider,
};

pub const DEFAULT_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockCommandBuffer(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockRenderPass {
    pub generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFramebuffer {
    pub generation: u32,
    pub slot: usize,
}

/// Every call the controller makes on the backend, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    WaitIdle,
    Allocate(usize),
    Free(Vec<MockCommandBuffer>),
    BeginRecording(MockCommandBuffer),
    EndRecording(MockCommandBuffer),
    BeginRenderPass {
        buffer: MockCommandBuffer,
        begin: RenderPassBegin<MockRenderPass, MockFramebuffer>,
    },
    EndRenderPass(MockCommandBuffer),
    Construct {
        extent: Extent,
        /// Whether an old chain was handed over to seed the new one.
        seeded: bool,
        /// Chains alive when construction started.
        alive: usize,
    },
    Acquire,
    Submit(MockCommandBuffer, usize),
    WaitForEvents,
}

#[derive(Debug, Default)]
pub struct World {
    // Surface.
    pub extent: Extent,
    pub resized: bool,
    /// Extents the surface takes on, one per `wait_for_events` call.
    pub pending_extents: VecDeque<Extent>,

    // Device.
    next_handle: u64,
    pub live_buffers: Vec<MockCommandBuffer>,
    pub fail_submit: Option<FrameError>,

    // Chain.
    /// Slot counts for successive constructions; `DEFAULT_SLOTS` when empty.
    pub slot_counts: VecDeque<usize>,
    pub acquire_script: VecDeque<ChainStatus>,
    pub submit_script: VecDeque<ChainStatus>,
    /// Colour format the next chain is built with.
    pub color_format: u32,
    /// Returned by the next construction instead of a chain.
    pub fail_construct: Option<FrameError>,
    pub generation: u32,
    pub chains_alive: usize,

    pub events: Vec<Event>,
}

pub type SharedWorld = Rc<RefCell<World>>;

impl World {
    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }

    pub fn constructed(&self) -> Vec<Extent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Construct { extent, .. } => Some(*extent),
                _ => None,
            })
            .collect()
    }

    /// `(seeded, alive)` for every construction, in order.
    pub fn constructions(&self) -> Vec<(bool, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Construct { seeded, alive, .. } => Some((*seeded, *alive)),
                _ => None,
            })
            .collect()
    }

    pub fn submissions(&self) -> Vec<(MockCommandBuffer, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Submit(buffer, slot) => Some((*buffer, *slot)),
                _ => None,
            })
            .collect()
    }
}

pub fn world(width: u32, height: u32) -> SharedWorld {
    Rc::new(RefCell::new(World {
        extent: Extent::new(width, height),
        ..Default::default()
    }))
}

pub type MockController = FrameController<MockSurface, MockChain>;

pub fn controller(world: &SharedWorld) -> MockController {
    FrameController::new(
        MockSurface {
            world: world.clone(),
        },
        MockDevice {
            world: world.clone(),
        },
    )
    .expect("controller construction")
}

/// Simulates a window resize that the controller will see after the next
/// submitted frame.
pub fn resize(world: &SharedWorld, width: u32, height: u32) {
    let mut w = world.borrow_mut();
    w.extent = Extent::new(width, height);
    w.resized = true;
}

/// Runs one complete frame. Returns the buffer used, or `None` when the
/// frame was skipped.
pub fn run_frame(controller: &mut MockController) -> RenderResult<Option<MockCommandBuffer>> {
    let Some(cb) = controller.begin_frame()? else {
        return Ok(None);
    };
    controller.begin_render_pass(cb)?;
    controller.end_render_pass(cb)?;
    controller.end_frame()?;
    Ok(Some(cb))
}

pub struct MockSurface {
    world: SharedWorld,
}

impl SurfaceProvider for MockSurface {
    fn current_extent(&self) -> Extent {
        self.world.borrow().extent
    }

    fn was_resized(&self) -> bool {
        self.world.borrow().resized
    }

    fn clear_resized_flag(&mut self) {
        self.world.borrow_mut().resized = false;
    }

    fn wait_for_events(&mut self) {
        let mut w = self.world.borrow_mut();
        w.events.push(Event::WaitForEvents);
        let next = w
            .pending_extents
            .pop_front()
            .expect("wait_for_events called with no scripted extent");
        w.extent = next;
    }
}

pub struct MockDevice {
    world: SharedWorld,
}

impl DeviceContext for MockDevice {
    type CommandBuffer = MockCommandBuffer;
    type RenderPass = MockRenderPass;
    type Framebuffer = MockFramebuffer;

    fn wait_idle(&self) -> RenderResult<()> {
        self.world.borrow_mut().events.push(Event::WaitIdle);
        Ok(())
    }

    fn allocate_command_buffers(&self, count: usize) -> RenderResult<Vec<MockCommandBuffer>> {
        let mut w = self.world.borrow_mut();
        w.events.push(Event::Allocate(count));
        let mut buffers = Vec::with_capacity(count);
        for _ in 0..count {
            w.next_handle += 1;
            buffers.push(MockCommandBuffer(w.next_handle));
        }
        w.live_buffers.extend_from_slice(&buffers);
        Ok(buffers)
    }

    fn free_command_buffers(&self, buffers: &[MockCommandBuffer]) {
        let mut w = self.world.borrow_mut();
        w.live_buffers.retain(|b| !buffers.contains(b));
        w.events.push(Event::Free(buffers.to_vec()));
    }

    fn begin_recording(&self, buffer: MockCommandBuffer) -> RenderResult<()> {
        let mut w = self.world.borrow_mut();
        if !w.live_buffers.contains(&buffer) {
            return Err(FrameError::DeviceLost(format!("{:?} was freed", buffer)));
        }
        w.events.push(Event::BeginRecording(buffer));
        Ok(())
    }

    fn end_recording(&self, buffer: MockCommandBuffer) -> RenderResult<()> {
        self.world
            .borrow_mut()
            .events
            .push(Event::EndRecording(buffer));
        Ok(())
    }

    fn begin_render_pass(
        &self,
        buffer: MockCommandBuffer,
        begin: &RenderPassBegin<MockRenderPass, MockFramebuffer>,
    ) {
        self.world.borrow_mut().events.push(Event::BeginRenderPass {
            buffer,
            begin: *begin,
        });
    }

    fn end_render_pass(&self, buffer: MockCommandBuffer) {
        self.world
            .borrow_mut()
            .events
            .push(Event::EndRenderPass(buffer));
    }
}

pub struct MockChain {
    world: SharedWorld,
    generation: u32,
    slots: usize,
    extent: Extent,
    color_format: u32,
    next_slot: usize,
}

impl PresentationChain for MockChain {
    type Device = MockDevice;

    fn construct(
        device: &MockDevice,
        extent: Extent,
        previous: Option<&Self>,
    ) -> RenderResult<Self> {
        assert!(!extent.is_zero(), "chain constructed with zero extent");
        let mut w = device.world.borrow_mut();
        let alive = w.chains_alive;
        w.events.push(Event::Construct {
            extent,
            seeded: previous.is_some(),
            alive,
        });
        if let Some(err) = w.fail_construct.take() {
            return Err(err);
        }

        // Seeding with an incompatible chain is a backend error.
        if let Some(previous) = previous {
            if previous.color_format != w.color_format {
                return Err(FrameError::SurfaceConfiguration(
                    "colour format changed".to_string(),
                ));
            }
        }

        w.generation += 1;
        w.chains_alive += 1;
        let slots = w.slot_counts.pop_front().unwrap_or(DEFAULT_SLOTS);
        Ok(MockChain {
            world: device.world.clone(),
            generation: w.generation,
            slots,
            extent,
            color_format: w.color_format,
            next_slot: 0,
        })
    }

    fn is_compatible(&self, device: &MockDevice) -> RenderResult<bool> {
        Ok(self.color_format == device.world.borrow().color_format)
    }

    fn acquire_next_image(&mut self) -> RenderResult<(usize, ChainStatus)> {
        let mut w = self.world.borrow_mut();
        w.events.push(Event::Acquire);
        let status = w.acquire_script.pop_front().unwrap_or(ChainStatus::Ready);
        if status == ChainStatus::OutOfDate {
            return Ok((0, status));
        }
        let slot = self.next_slot;
        self.next_slot = (self.next_slot + 1) % self.slots;
        Ok((slot, status))
    }

    fn submit(&mut self, buffer: MockCommandBuffer, slot: usize) -> RenderResult<ChainStatus> {
        let mut w = self.world.borrow_mut();
        if let Some(err) = w.fail_submit.take() {
            return Err(err);
        }
        w.events.push(Event::Submit(buffer, slot));
        Ok(w.submit_script.pop_front().unwrap_or(ChainStatus::Ready))
    }

    fn render_pass(&self) -> MockRenderPass {
        MockRenderPass {
            generation: self.generation,
        }
    }

    fn framebuffer(&self, slot: usize) -> RenderResult<MockFramebuffer> {
        if slot >= self.slots {
            return Err(FrameError::IndexOutOfRange {
                index: slot,
                len: self.slots,
            });
        }
        Ok(MockFramebuffer {
            generation: self.generation,
            slot,
        })
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn slot_count(&self) -> usize {
        self.slots
    }
}

impl Drop for MockChain {
    fn drop(&mut self) {
        self.world.borrow_mut().chains_alive -= 1;
    }
}
