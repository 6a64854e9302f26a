//! Vulkan implementation of the backend contracts.
//!
//! [`VulkanContext`] owns the instance, surface, logical device and command
//! pool. [`VulkanChain`] owns the swapchain and everything sized to it.

mod chain;
mod context;

pub use chain::VulkanChain;
pub use context::VulkanContext;

use ash::vk;

use crate::backend::ChainStatus;
use crate::error::{FrameError, RenderResult};

/// Maps an acquire/present result onto the chain status.
///
/// `Ok(true)` is the suboptimal flag `ash` returns alongside success. Any
/// other failure, surface loss included, is fatal.
pub(crate) fn chain_status(result: Result<bool, vk::Result>) -> RenderResult<ChainStatus> {
    match result {
        Ok(false) => Ok(ChainStatus::Ready),
        Ok(true) => Ok(ChainStatus::SuboptimalButUsable),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(ChainStatus::OutOfDate),
        Err(e) => Err(FrameError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_status_mapping() {
        assert_eq!(chain_status(Ok(false)), Ok(ChainStatus::Ready));
        assert_eq!(chain_status(Ok(true)), Ok(ChainStatus::SuboptimalButUsable));
        assert_eq!(
            chain_status(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            Ok(ChainStatus::OutOfDate)
        );
    }

    #[test]
    fn test_chain_status_errors() {
        assert!(matches!(
            chain_status(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(FrameError::DeviceLost(_))
        ));
        assert!(matches!(
            chain_status(Err(vk::Result::ERROR_SURFACE_LOST_KHR)),
            Err(FrameError::DeviceLost(_))
        ));
        assert!(matches!(
            chain_status(Err(vk::Result::ERROR_FULL_SCREEN_EXCLUSIVE_MODE_LOST_EXT)),
            Err(FrameError::DeviceLost(_))
        ));
        assert!(matches!(
            chain_status(Err(vk::Result::TIMEOUT)),
            Err(FrameError::ProtocolViolation(_))
        ));
    }
}
