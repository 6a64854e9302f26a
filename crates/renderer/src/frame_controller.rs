//! Per-frame lifecycle and presentation chain rebuilds.
//!
//! # Overview
//!
//! The [`FrameController`] drives one frame per loop iteration:
//!
//! ```text
//!            begin_frame (Ready / Suboptimal)
//!   Idle ───────────────────────────────────────▶ Recording
//!    ▲  │                                             │
//!    │  │ begin_frame (OutOfDate)                     │ begin_render_pass
//!    │  ▼                                             │ participants record
//!   Rebuilding ◀──── end_frame (stale or resized) ────┤ end_render_pass
//!    │                                                │
//!    └──────────────────▶ Idle ◀──── end_frame ───────┘
//! ```
//!
//! It owns the presentation chain and the command buffer pool outright and
//! replaces the chain as a whole whenever it goes stale or the window is
//! resized. A rebuild never happens while a frame is being recorded, and
//! never against a zero-sized surface: the controller blocks on the surface
//! provider until it has a usable size again.
//!
//! # Example
//!
//! ```no_run
//! use swapframe_renderer::{FrameController, PresentationChain, RenderResult, SurfaceProvider};
//!
//! fn run<S: SurfaceProvider, C: PresentationChain>(
//!     controller: &mut FrameController<S, C>,
//! ) -> RenderResult<()> {
//!     if let Some(cb) = controller.begin_frame()? {
//!         controller.begin_render_pass(cb)?;
//!         // record draws into `cb`
//!         controller.end_render_pass(cb)?;
//!         controller.end_frame()?;
//!     }
//!     Ok(())
//! }
//! ```

use tracing::{debug, info, trace, warn};

use crate::backend::{
    ChainStatus, CommandBufferOf, DeviceContext, PresentationChain, RenderPassBegin, RenderPassOf,
};
use crate::command_pool::CommandBufferPool;
use crate::error::{FrameError, RenderResult};
use crate::participant::{FrameContext, RenderPassParticipant};
use crate::surface::{Extent, SurfaceProvider};

/// Where the controller is in the frame lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame open; `begin_frame` is the only valid frame call.
    Idle,
    /// A command buffer is being recorded for the open frame.
    Recording,
    /// The presentation chain is being replaced.
    Rebuilding,
}

/// State of the one frame between `begin_frame` and `end_frame`.
#[derive(Debug, Clone, Copy)]
struct FrameSession<B> {
    slot: usize,
    command_buffer: B,
    acquired_suboptimal: bool,
    render_pass_open: bool,
}

/// Orchestrates acquire, record, submit and present.
///
/// Field order is drop order: the chain goes first, then the device context
/// its resources were created from, then the surface.
pub struct FrameController<S, C>
where
    S: SurfaceProvider,
    C: PresentationChain,
{
    chain: Option<C>,
    pool: CommandBufferPool<CommandBufferOf<C>>,
    device: C::Device,
    surface: S,
    session: Option<FrameSession<CommandBufferOf<C>>>,
    state: FrameState,
    rebuild_count: u64,
    frame_count: u64,
}

impl<S, C> FrameController<S, C>
where
    S: SurfaceProvider,
    C: PresentationChain,
{
    /// Builds the first presentation chain and its command buffers.
    ///
    /// Blocks while the surface extent is zero. Any resize reported before
    /// this point is already reflected in the new chain, so the flag is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::SurfaceConfiguration`] if the surface cannot
    /// be presented to, or the device error.
    pub fn new(surface: S, device: C::Device) -> RenderResult<Self> {
        let mut controller = Self {
            chain: None,
            pool: CommandBufferPool::new(),
            device,
            surface,
            session: None,
            state: FrameState::Idle,
            rebuild_count: 0,
            frame_count: 0,
        };

        controller.recreate_chain()?;
        controller.surface.clear_resized_flag();

        info!(
            "Frame controller ready: {} slot(s) at {}",
            controller.slot_count(),
            controller.extent()
        );
        Ok(controller)
    }

    /// Opens a frame and returns the command buffer to record into.
    ///
    /// Returns `Ok(None)` when the chain turned out to be stale, or an
    /// earlier rebuild failed; it has been rebuilt and the caller should
    /// simply try again next iteration.
    ///
    /// # Errors
    ///
    /// - [`FrameError::ProtocolViolation`] if a frame is already open
    /// - [`FrameError::DeviceLost`] if acquisition or recording fails
    pub fn begin_frame(&mut self) -> RenderResult<Option<CommandBufferOf<C>>> {
        if self.session.is_some() {
            return Err(FrameError::protocol(
                "begin_frame called while a frame is already in progress",
            ));
        }

        if self.chain.is_none() {
            warn!("No presentation chain after a failed rebuild, retrying");
            self.rebuild()?;
            return Ok(None);
        }

        let (slot, status) = self.chain_mut()?.acquire_next_image()?;
        if status == ChainStatus::OutOfDate {
            debug!("Presentation chain out of date on acquire, skipping frame");
            self.rebuild()?;
            return Ok(None);
        }

        let command_buffer = self.pool.get(slot)?;
        self.device.begin_recording(command_buffer)?;

        self.session = Some(FrameSession {
            slot,
            command_buffer,
            acquired_suboptimal: status == ChainStatus::SuboptimalButUsable,
            render_pass_open: false,
        });
        self.state = FrameState::Recording;
        trace!("Frame {} recording into slot {}", self.frame_count, slot);

        Ok(Some(command_buffer))
    }

    /// Opens the render pass on the frame's framebuffer with the fixed
    /// clear values and a full-extent viewport and scissor.
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] when no frame is open, `buffer`
    /// is not the frame's buffer, or the pass is already open.
    pub fn begin_render_pass(&mut self, buffer: CommandBufferOf<C>) -> RenderResult<()> {
        let session = open_session(&mut self.session, buffer, "begin_render_pass")?;
        if session.render_pass_open {
            return Err(FrameError::protocol("render pass is already open"));
        }

        let chain = self
            .chain
            .as_ref()
            .ok_or_else(|| FrameError::protocol("no presentation chain"))?;
        let begin = RenderPassBegin::new(
            chain.render_pass(),
            chain.framebuffer(session.slot)?,
            chain.extent(),
        );

        self.device.begin_render_pass(buffer, &begin);
        session.render_pass_open = true;
        Ok(())
    }

    /// Closes the render pass opened by [`begin_render_pass`](Self::begin_render_pass).
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] when no frame is open, `buffer`
    /// is not the frame's buffer, or the pass is not open.
    pub fn end_render_pass(&mut self, buffer: CommandBufferOf<C>) -> RenderResult<()> {
        let session = open_session(&mut self.session, buffer, "end_render_pass")?;
        if !session.render_pass_open {
            return Err(FrameError::protocol(
                "end_render_pass called without begin_render_pass",
            ));
        }

        self.device.end_render_pass(buffer);
        session.render_pass_open = false;
        Ok(())
    }

    /// Opens the render pass, lets every participant record, and closes it.
    ///
    /// # Errors
    ///
    /// The first participant error, or any protocol error from the render
    /// pass calls. The pass is left open when a participant fails; the
    /// frame must be abandoned.
    pub fn record_render_pass(
        &mut self,
        buffer: CommandBufferOf<C>,
        participants: &mut [&mut dyn RenderPassParticipant<C::Device>],
    ) -> RenderResult<()> {
        self.begin_render_pass(buffer)?;
        {
            let frame = self.frame_context()?;
            for participant in participants.iter_mut() {
                participant.record(&frame)?;
            }
        }
        self.end_render_pass(buffer)
    }

    /// Ends recording, submits and presents the open frame, then rebuilds
    /// the chain if it went stale or the surface was resized.
    ///
    /// The frame is closed whether or not this succeeds.
    ///
    /// # Errors
    ///
    /// - [`FrameError::ProtocolViolation`] if no frame is open or the render
    ///   pass was left open
    /// - [`FrameError::DeviceLost`] if recording, submission or presentation
    ///   fails
    pub fn end_frame(&mut self) -> RenderResult<()> {
        let session = self
            .session
            .take()
            .ok_or_else(|| FrameError::protocol("end_frame called without begin_frame"))?;
        self.state = FrameState::Idle;

        if session.render_pass_open {
            return Err(FrameError::protocol(
                "end_frame called with the render pass still open",
            ));
        }

        self.device.end_recording(session.command_buffer)?;
        let status = self
            .chain_mut()?
            .submit(session.command_buffer, session.slot)?;
        self.frame_count += 1;

        // Cleared by the rebuild, so a failed one is retried next frame.
        let resized = self.surface.was_resized();

        if status.needs_rebuild() || session.acquired_suboptimal || resized {
            debug!(
                "Rebuild after frame (status {:?}, suboptimal acquire {}, resized {})",
                status, session.acquired_suboptimal, resized
            );
            self.rebuild()?;
        }

        Ok(())
    }

    /// Render pass every framebuffer of the current chain is built for.
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] if a failed rebuild left the
    /// controller without a chain.
    pub fn current_render_pass(&self) -> RenderResult<RenderPassOf<C>> {
        Ok(self.chain_ref()?.render_pass())
    }

    /// Width over height of the current chain.
    pub fn current_aspect_ratio(&self) -> f32 {
        self.extent().aspect_ratio()
    }

    /// Buffer being recorded for the open frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] when no frame is open.
    pub fn current_command_buffer(&self) -> RenderResult<CommandBufferOf<C>> {
        self.session
            .as_ref()
            .map(|s| s.command_buffer)
            .ok_or_else(|| FrameError::protocol("no frame in progress"))
    }

    /// Slot acquired for the open frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] when no frame is open.
    pub fn current_slot(&self) -> RenderResult<usize> {
        self.session
            .as_ref()
            .map(|s| s.slot)
            .ok_or_else(|| FrameError::protocol("no frame in progress"))
    }

    /// View of the open frame handed to render pass participants.
    ///
    /// # Errors
    ///
    /// [`FrameError::ProtocolViolation`] when no frame is open.
    pub fn frame_context(&self) -> RenderResult<FrameContext<'_, C::Device>> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| FrameError::protocol("no frame in progress"))?;
        let chain = self.chain_ref()?;
        Ok(FrameContext {
            device: &self.device,
            command_buffer: session.command_buffer,
            render_pass: chain.render_pass(),
            slot: session.slot,
            extent: chain.extent(),
            frame_index: self.frame_count,
        })
    }

    #[inline]
    pub fn is_frame_in_progress(&self) -> bool {
        self.session.is_some()
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Extent of the current chain; zero if there is none.
    pub fn extent(&self) -> Extent {
        self.chain.as_ref().map(C::extent).unwrap_or_default()
    }

    /// Slot count of the current chain; zero if there is none.
    pub fn slot_count(&self) -> usize {
        self.chain.as_ref().map_or(0, C::slot_count)
    }

    /// Chains built after the initial one.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Frames successfully submitted.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn command_buffers(&self) -> &CommandBufferPool<CommandBufferOf<C>> {
        &self.pool
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn device(&self) -> &C::Device {
        &self.device
    }

    /// Blocks until the device is idle, e.g. before tearing down resources
    /// that recorded commands refer to.
    ///
    /// # Errors
    ///
    /// Returns the device error.
    pub fn wait_idle(&self) -> RenderResult<()> {
        self.device.wait_idle()
    }

    fn chain_ref(&self) -> RenderResult<&C> {
        self.chain
            .as_ref()
            .ok_or_else(|| FrameError::protocol("no presentation chain"))
    }

    fn chain_mut(&mut self) -> RenderResult<&mut C> {
        self.chain
            .as_mut()
            .ok_or_else(|| FrameError::protocol("no presentation chain"))
    }

    fn rebuild(&mut self) -> RenderResult<()> {
        if self.session.is_some() {
            return Err(FrameError::protocol(
                "presentation chain rebuild requested during a frame",
            ));
        }

        self.state = FrameState::Rebuilding;
        let result = self.recreate_chain();
        self.state = FrameState::Idle;
        result?;

        // The new chain already matches the surface size.
        self.surface.clear_resized_flag();
        self.rebuild_count += 1;
        info!(
            "Presentation chain rebuilt: {} slot(s) at {} (rebuild #{})",
            self.slot_count(),
            self.extent(),
            self.rebuild_count
        );
        Ok(())
    }

    /// Replaces the chain with one matching the current surface.
    ///
    /// A compatible old chain seeds the new one and is dropped only once
    /// the new one exists, so a failed construction leaves it in place.
    /// When the surface formats changed the old chain (and its render
    /// pass) is dropped first and the new one is built unseeded.
    fn recreate_chain(&mut self) -> RenderResult<()> {
        let mut extent = self.surface.current_extent();
        while extent.is_zero() {
            debug!("Surface extent is {}, waiting for events", extent);
            self.surface.wait_for_events();
            extent = self.surface.current_extent();
        }

        self.device.wait_idle()?;

        let compatible = match &self.chain {
            Some(chain) => chain.is_compatible(&self.device)?,
            None => true,
        };
        if !compatible {
            info!("Surface formats changed, replacing the render pass");
            self.chain = None;
        }

        let chain = C::construct(&self.device, extent, self.chain.as_ref())?;
        if chain.extent() != extent {
            warn!(
                "Presentation chain built at {} instead of requested {}",
                chain.extent(),
                extent
            );
        }

        let slots = chain.slot_count();
        self.chain = Some(chain);
        self.pool.ensure_size(&self.device, slots)
    }
}

impl<S, C> Drop for FrameController<S, C>
where
    S: SurfaceProvider,
    C: PresentationChain,
{
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            warn!("wait_idle failed during shutdown: {}", e);
        }
        self.pool.free_all(&self.device);
        self.chain = None;
        debug!(
            "Frame controller destroyed after {} frame(s), {} rebuild(s)",
            self.frame_count, self.rebuild_count
        );
    }
}

/// The open session, provided `buffer` is its command buffer.
fn open_session<'a, B: Copy + Eq + std::fmt::Debug>(
    session: &'a mut Option<FrameSession<B>>,
    buffer: B,
    operation: &str,
) -> RenderResult<&'a mut FrameSession<B>> {
    let session = session
        .as_mut()
        .ok_or_else(|| FrameError::protocol(format!("{} called with no frame in progress", operation)))?;
    if session.command_buffer != buffer {
        return Err(FrameError::protocol(format!(
            "{} called with {:?}, but the frame is recording {:?}",
            operation, buffer, session.command_buffer
        )));
    }
    Ok(session)
}
