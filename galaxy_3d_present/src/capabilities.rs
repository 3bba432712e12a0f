/// Capability snapshots reported by the physical device for a surface

use ash::vk;

/// Everything the surface supports, captured once per negotiation pass
#[derive(Debug, Clone)]
pub struct SupportedCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// `width == u32::MAX` means the surface size is decided by the swapchain
    pub current_extent: vk::Extent2D,
    pub min_image_extent: vk::Extent2D,
    pub max_image_extent: vk::Extent2D,
    pub max_image_array_layers: u32,
    pub supported_transforms: vk::SurfaceTransformFlagsKHR,
    pub current_transform: vk::SurfaceTransformFlagsKHR,
    pub supported_composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub supported_usage_flags: vk::ImageUsageFlags,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Optimal-tiling features of the negotiated format (empty until the format is chosen)
    pub format_features: vk::FormatFeatureFlags,
}

impl SupportedCapabilities {
    /// Build a snapshot from the raw surface capabilities and enumerations
    pub fn from_surface(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        surface_formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> Self {
        Self {
            min_image_count: capabilities.min_image_count,
            max_image_count: capabilities.max_image_count,
            current_extent: capabilities.current_extent,
            min_image_extent: capabilities.min_image_extent,
            max_image_extent: capabilities.max_image_extent,
            max_image_array_layers: capabilities.max_image_array_layers,
            supported_transforms: capabilities.supported_transforms,
            current_transform: capabilities.current_transform,
            supported_composite_alpha: capabilities.supported_composite_alpha,
            supported_usage_flags: capabilities.supported_usage_flags,
            surface_formats,
            present_modes,
            format_features: vk::FormatFeatureFlags::empty(),
        }
    }
}

/// Compression actually applied to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedCompression {
    pub flags: vk::ImageCompressionFlagsEXT,
    pub fixed_rate_flags: vk::ImageCompressionFixedRateFlagsEXT,
}

/// A surface format together with the compression it supports
#[derive(Debug, Clone, Copy)]
pub struct SurfaceFormatCompression {
    pub surface_format: vk::SurfaceFormatKHR,
    pub compression: AppliedCompression,
}
