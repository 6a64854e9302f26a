//! Frame lifecycle errors.
//!
//! Staleness of the presentation chain is not an error: it is reported as a
//! [`ChainStatus`](crate::backend::ChainStatus) and resolved by rebuilding.
//! Everything here terminates the render loop.

use ash::vk;
use swapframe_rhi::RhiError;
use thiserror::Error;

/// Errors raised by the frame controller and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The device/surface combination cannot be presented to. Raised while
    /// building a presentation chain, never from acquire, submit or present.
    #[error("Surface configuration error: {0}")]
    SurfaceConfiguration(String),

    /// Submission, presentation, acquisition, allocation, recording or idle
    /// wait failed, including loss of the surface.
    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// The frame state machine was driven out of order.
    #[error("Frame protocol violation: {0}")]
    ProtocolViolation(String),

    /// A slot or command buffer index was out of bounds.
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl FrameError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// Classifies a failure while building a presentation chain.
    ///
    /// Capability mismatches between device and surface become
    /// [`SurfaceConfiguration`](Self::SurfaceConfiguration); everything else
    /// converts as usual.
    pub(crate) fn construction(err: RhiError) -> Self {
        match err {
            RhiError::VulkanError(
                result @ (vk::Result::ERROR_FORMAT_NOT_SUPPORTED
                | vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR
                | vk::Result::ERROR_INITIALIZATION_FAILED),
            ) => Self::SurfaceConfiguration(format!("{:?}", result)),
            other => other.into(),
        }
    }
}

/// Result type alias for frame operations.
pub type RenderResult<T> = std::result::Result<T, FrameError>;

impl From<RhiError> for FrameError {
    fn from(err: RhiError) -> Self {
        match err {
            RhiError::VulkanError(result) => result.into(),
            RhiError::NoSuitableGpu | RhiError::SurfaceError(_) | RhiError::SwapchainError(_) => {
                Self::SurfaceConfiguration(err.to_string())
            }
            RhiError::InvalidArgument(_) | RhiError::ShaderError(_) => {
                Self::ProtocolViolation(err.to_string())
            }
            RhiError::LoadingError(_) | RhiError::AllocatorError(_) => {
                Self::DeviceLost(err.to_string())
            }
        }
    }
}

impl From<vk::Result> for FrameError {
    fn from(result: vk::Result) -> Self {
        match result {
            // Finite waits are never issued here, so these indicate misuse.
            vk::Result::TIMEOUT | vk::Result::NOT_READY => {
                Self::ProtocolViolation(format!("unexpected status {:?}", result))
            }
            other => Self::DeviceLost(format!("{:?}", other)),
        }
    }
}
