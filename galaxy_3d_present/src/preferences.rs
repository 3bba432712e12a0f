/// Presentation preferences - what the caller would like the swapchain to be
///
/// Every value is a request: negotiation may degrade it to the closest
/// supported one. `ChainUpdate` is the recreation counterpart where each
/// field is optional and unset fields are carried over from the chain being
/// replaced.

use ash::vk;
use rustc_hash::FxHashSet;

/// Requested swapchain configuration
#[derive(Debug, Clone)]
pub struct PresentationPreferences {
    /// Requested present mode
    pub present_mode: vk::PresentModeKHR,
    /// Fallback present modes, in order of preference
    pub present_mode_priority: Vec<vk::PresentModeKHR>,
    /// Requested (format, color space) pair
    pub surface_format: vk::SurfaceFormatKHR,
    /// Fallback surface formats, in order of preference
    pub surface_format_priority: Vec<vk::SurfaceFormatKHR>,
    /// Requested extent (0x0 lets the surface decide)
    pub extent: vk::Extent2D,
    /// Requested minimum number of images
    pub image_count: u32,
    /// Requested array layer count
    pub array_layers: u32,
    /// Requested pre-transform
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// Requested composite alpha bit
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    /// Requested image usage (single-bit flags)
    pub image_usage: FxHashSet<vk::ImageUsageFlags>,
    /// Requested compression mode
    pub compression: vk::ImageCompressionFlagsEXT,
    /// Requested fixed-rate compression (only used with FIXED_RATE_EXPLICIT)
    pub compression_fixed_rate: vk::ImageCompressionFixedRateFlagsEXT,
}

impl PresentationPreferences {
    pub fn with_present_mode(mut self, present_mode: vk::PresentModeKHR) -> Self {
        self.present_mode = present_mode;
        self
    }

    pub fn with_present_mode_priority(mut self, priority: Vec<vk::PresentModeKHR>) -> Self {
        self.present_mode_priority = priority;
        self
    }

    pub fn with_surface_format(mut self, surface_format: vk::SurfaceFormatKHR) -> Self {
        self.surface_format = surface_format;
        self
    }

    pub fn with_surface_format_priority(mut self, priority: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.surface_format_priority = priority;
        self
    }

    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    pub fn with_image_count(mut self, image_count: u32) -> Self {
        self.image_count = image_count;
        self
    }

    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    pub fn with_pre_transform(mut self, transform: vk::SurfaceTransformFlagsKHR) -> Self {
        self.pre_transform = transform;
        self
    }

    pub fn with_composite_alpha(mut self, composite_alpha: vk::CompositeAlphaFlagsKHR) -> Self {
        self.composite_alpha = composite_alpha;
        self
    }

    /// Replace the requested usage set; duplicates collapse
    pub fn with_image_usage<I>(mut self, usage: I) -> Self
    where
        I: IntoIterator<Item = vk::ImageUsageFlags>,
    {
        self.image_usage = usage.into_iter().collect();
        self
    }

    pub fn with_compression(
        mut self,
        compression: vk::ImageCompressionFlagsEXT,
        fixed_rate: vk::ImageCompressionFixedRateFlagsEXT,
    ) -> Self {
        self.compression = compression;
        self.compression_fixed_rate = fixed_rate;
        self
    }
}

impl Default for PresentationPreferences {
    fn default() -> Self {
        let srgb = |format| vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };

        Self {
            present_mode: vk::PresentModeKHR::FIFO,
            present_mode_priority: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            surface_format: srgb(vk::Format::R8G8B8A8_SRGB),
            surface_format_priority: vec![
                srgb(vk::Format::R8G8B8A8_SRGB),
                srgb(vk::Format::B8G8R8A8_SRGB),
                srgb(vk::Format::R8G8B8A8_UNORM),
                srgb(vk::Format::B8G8R8A8_UNORM),
            ],
            extent: vk::Extent2D { width: 0, height: 0 },
            image_count: 3,
            array_layers: 1,
            pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT,
            image_usage: [
                vk::ImageUsageFlags::COLOR_ATTACHMENT,
                vk::ImageUsageFlags::TRANSFER_SRC,
            ]
            .into_iter()
            .collect(),
            compression: vk::ImageCompressionFlagsEXT::DEFAULT,
            compression_fixed_rate: vk::ImageCompressionFixedRateFlagsEXT::NONE,
        }
    }
}

/// Changes to apply when recreating a chain; `None` keeps the predecessor's value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainUpdate {
    pub extent: Option<vk::Extent2D>,
    pub image_count: Option<u32>,
    pub pre_transform: Option<vk::SurfaceTransformFlagsKHR>,
    pub image_usage: Option<FxHashSet<vk::ImageUsageFlags>>,
    pub compression: Option<(vk::ImageCompressionFlagsEXT, vk::ImageCompressionFixedRateFlagsEXT)>,
}

impl ChainUpdate {
    pub fn extent(width: u32, height: u32) -> Self {
        Self { extent: Some(vk::Extent2D { width, height }), ..Self::default() }
    }

    pub fn image_count(image_count: u32) -> Self {
        Self { image_count: Some(image_count), ..Self::default() }
    }

    pub fn image_usage<I>(usage: I) -> Self
    where
        I: IntoIterator<Item = vk::ImageUsageFlags>,
    {
        Self { image_usage: Some(usage.into_iter().collect()), ..Self::default() }
    }

    pub fn extent_and_transform(extent: vk::Extent2D, transform: vk::SurfaceTransformFlagsKHR) -> Self {
        Self {
            extent: Some(extent),
            pre_transform: Some(transform),
            ..Self::default()
        }
    }

    pub fn compression(
        compression: vk::ImageCompressionFlagsEXT,
        fixed_rate: vk::ImageCompressionFixedRateFlagsEXT,
    ) -> Self {
        Self { compression: Some((compression, fixed_rate)), ..Self::default() }
    }

    /// Fill every unset field from `base`
    pub fn apply_to(self, base: PresentationPreferences) -> PresentationPreferences {
        let (compression, compression_fixed_rate) = self
            .compression
            .unwrap_or((base.compression, base.compression_fixed_rate));

        PresentationPreferences {
            extent: self.extent.unwrap_or(base.extent),
            image_count: self.image_count.unwrap_or(base.image_count),
            pre_transform: self.pre_transform.unwrap_or(base.pre_transform),
            image_usage: self.image_usage.unwrap_or(base.image_usage),
            compression,
            compression_fixed_rate,
            ..base
        }
    }
}

#[cfg(test)]
#[path = "preferences_tests.rs"]
mod tests;
