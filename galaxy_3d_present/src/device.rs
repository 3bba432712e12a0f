/// PresentationDevice trait - the native calls a presentation chain needs
///
/// The chain never talks to a driver directly. Everything it needs from the
/// physical device (capability queries) and from the logical device
/// (swapchain creation, image enumeration, acquisition) goes through this
/// trait, which is implemented by the Vulkan backend and by the test mock.

use ash::vk;
use std::ffi::CStr;

use crate::capabilities::{AppliedCompression, SurfaceFormatCompression};
use crate::error::Result;

/// Device extension required to control swapchain image compression
pub const COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION: &CStr = c"VK_EXT_image_compression_control_swapchain";

/// Instance extension required to enumerate surface formats with chained properties
pub const SURFACE_CAPABILITIES_2_EXTENSION: &CStr = c"VK_KHR_get_surface_capabilities2";

/// Compression control attached to a swapchain creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionControl {
    pub flags: vk::ImageCompressionFlagsEXT,
    /// Fixed-rate flags for the single image plane (FIXED_RATE_EXPLICIT only)
    pub fixed_rate: Option<vk::ImageCompressionFixedRateFlagsEXT>,
}

/// Backend-neutral swapchain creation descriptor
#[derive(Debug, Clone)]
pub struct SwapchainDescriptor {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub image_format: vk::Format,
    pub image_color_space: vk::ColorSpaceKHR,
    pub image_extent: vk::Extent2D,
    pub image_array_layers: u32,
    pub image_usage: vk::ImageUsageFlags,
    pub image_sharing_mode: vk::SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
    /// Swapchain being replaced (null for first-time creation)
    pub old_swapchain: vk::SwapchainKHR,
    /// Present only when compression control is available on the device
    pub compression: Option<CompressionControl>,
}

/// Outcome of acquiring the next presentable image
///
/// `Suboptimal` and `OutOfDate` are not failures: the caller decides whether
/// to recreate the chain (see `PresentationChain::handle_surface_changes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// Image is ready to be rendered to
    Ready(u32),
    /// Image can be used but the swapchain no longer matches the surface exactly
    Suboptimal(u32),
    /// The swapchain must be recreated before presenting again
    OutOfDate,
    /// No image became available within the timeout
    Timeout,
    /// No image is available and the timeout was zero
    NotReady,
}

impl AcquireStatus {
    /// Index of the acquired image, if one was acquired
    pub fn image_index(&self) -> Option<u32> {
        match self {
            AcquireStatus::Ready(index) | AcquireStatus::Suboptimal(index) => Some(*index),
            _ => None,
        }
    }

    /// Whether the caller should recreate the chain
    pub fn needs_recreation(&self) -> bool {
        matches!(self, AcquireStatus::Suboptimal(_) | AcquireStatus::OutOfDate)
    }
}

/// Native entry points used by `PresentationChain`
///
/// Query methods return `Err(Error::QueryFailed)` when the driver reports a
/// failure. `create_swapchain` returns the raw result code so the chain can
/// attach it to `Error::SwapchainCreationFailed`.
pub trait PresentationDevice: Send + Sync {
    /// Whether a device extension was enabled at device creation
    fn is_extension_enabled(&self, name: &CStr) -> bool;

    /// Whether an instance extension was enabled at instance creation
    fn is_instance_extension_enabled(&self, name: &CStr) -> bool;

    fn surface_capabilities(&self, surface: vk::SurfaceKHR) -> Result<vk::SurfaceCapabilitiesKHR>;

    fn surface_formats(&self, surface: vk::SurfaceKHR) -> Result<Vec<vk::SurfaceFormatKHR>>;

    fn surface_present_modes(&self, surface: vk::SurfaceKHR) -> Result<Vec<vk::PresentModeKHR>>;

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties;

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> std::result::Result<vk::SwapchainKHR, vk::Result>;

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// First half of the count-then-fill image enumeration
    fn swapchain_image_count(&self, swapchain: vk::SwapchainKHR) -> Result<u32>;

    /// Second half: fill `images` and return how many were written
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR, images: &mut [vk::Image]) -> Result<usize>;

    /// Raw acquire; `Ok((index, suboptimal))` or the failing result code
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> std::result::Result<(u32, bool), vk::Result>;

    /// Compression actually applied to a swapchain image
    fn applied_compression(&self, image: vk::Image) -> AppliedCompression;

    /// Surface formats with their compression properties
    ///
    /// Only called once both compression extensions are known to be enabled.
    fn surface_formats_with_compression(
        &self,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<SurfaceFormatCompression>>;
}
