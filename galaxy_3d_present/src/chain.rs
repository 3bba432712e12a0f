/// PresentationChain - a negotiated swapchain and its images
///
/// A chain is built in one pass: query the surface, negotiate every axis,
/// create the native swapchain, fetch its images. It is never modified
/// afterwards. Resizing or changing any other setting builds a new chain
/// that hands the old swapchain to the driver as `old_swapchain`; the caller
/// drops the superseded chain once the new one is in place.

use ash::vk;
use rustc_hash::FxHashSet;
use std::sync::Arc;

use crate::capabilities::{AppliedCompression, SupportedCapabilities, SurfaceFormatCompression};
use crate::device::{
    AcquireStatus, CompressionControl, PresentationDevice, SwapchainDescriptor,
    COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION, SURFACE_CAPABILITIES_2_EXTENSION,
};
use crate::error::{Error, Result};
use crate::negotiation::{
    choose_composite_alpha, choose_extent, choose_image_array_layers, choose_image_count,
    choose_image_usage, choose_present_mode, choose_surface_format, choose_transform,
    composite_image_usage, is_undefined_extent, native_orientation_extent,
};
use crate::preferences::{ChainUpdate, PresentationPreferences};
use crate::{engine_error, engine_info, engine_warn};

// ============================================================================
// Resolved properties
// ============================================================================

/// The configuration a chain was actually created with
///
/// Every field comes from the set the surface reported as supported.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedProperties {
    pub old_swapchain: vk::SwapchainKHR,
    pub image_count: u32,
    pub extent: vk::Extent2D,
    pub array_layers: u32,
    pub surface_format: vk::SurfaceFormatKHR,
    pub image_usage: vk::ImageUsageFlags,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

impl ResolvedProperties {
    /// Run every per-axis negotiation in order
    ///
    /// Order: image count, extent, surface format, array layers, image
    /// usage, transform, composite alpha, present mode. The usage step needs
    /// the features of the chosen format, which `format_features` provides;
    /// they are also stored back into `capabilities`.
    ///
    /// Returns the properties and the validated usage set.
    pub fn negotiate<F>(
        preferences: &PresentationPreferences,
        capabilities: &mut SupportedCapabilities,
        format_features: F,
    ) -> Result<(Self, FxHashSet<vk::ImageUsageFlags>)>
    where
        F: FnOnce(vk::Format) -> vk::FormatFeatureFlags,
    {
        let image_count = choose_image_count(
            preferences.image_count,
            capabilities.min_image_count,
            capabilities.max_image_count,
        );

        let extent = choose_extent(
            preferences.extent,
            capabilities.min_image_extent,
            capabilities.max_image_extent,
            capabilities.current_extent,
        );

        let surface_format = choose_surface_format(
            preferences.surface_format,
            &capabilities.surface_formats,
            &preferences.surface_format_priority,
        )?;

        let array_layers = choose_image_array_layers(
            preferences.array_layers,
            capabilities.max_image_array_layers,
        );

        capabilities.format_features = format_features(surface_format.format);
        let image_usage_flags = choose_image_usage(
            &preferences.image_usage,
            capabilities.supported_usage_flags,
            capabilities.format_features,
        )?;

        let pre_transform = choose_transform(
            preferences.pre_transform,
            capabilities.supported_transforms,
            capabilities.current_transform,
        );

        let composite_alpha = choose_composite_alpha(
            preferences.composite_alpha,
            capabilities.supported_composite_alpha,
        )?;

        let present_mode = choose_present_mode(
            preferences.present_mode,
            &capabilities.present_modes,
            &preferences.present_mode_priority,
        );

        let properties = Self {
            old_swapchain: vk::SwapchainKHR::null(),
            image_count,
            extent,
            array_layers,
            surface_format,
            image_usage: composite_image_usage(&image_usage_flags),
            pre_transform,
            composite_alpha,
            present_mode,
        };

        Ok((properties, image_usage_flags))
    }

    /// Creation descriptor for these properties
    pub fn descriptor(&self, surface: vk::SurfaceKHR) -> SwapchainDescriptor {
        SwapchainDescriptor {
            surface,
            min_image_count: self.image_count,
            image_format: self.surface_format.format,
            image_color_space: self.surface_format.color_space,
            image_extent: self.extent,
            image_array_layers: self.array_layers,
            image_usage: self.image_usage,
            image_sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: self.pre_transform,
            composite_alpha: self.composite_alpha,
            present_mode: self.present_mode,
            clipped: true,
            old_swapchain: self.old_swapchain,
            compression: None,
        }
    }
}

// ============================================================================
// Owned swapchain handle
// ============================================================================

/// Native swapchain handle destroyed on drop
///
/// A null handle (fresh from [`OwnedSwapchain::release`]) makes drop a no-op.
pub struct OwnedSwapchain {
    device: Arc<dyn PresentationDevice>,
    handle: vk::SwapchainKHR,
}

impl OwnedSwapchain {
    pub fn new(device: Arc<dyn PresentationDevice>, handle: vk::SwapchainKHR) -> Self {
        Self { device, handle }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle == vk::SwapchainKHR::null()
    }

    /// Give up ownership; the caller becomes responsible for destroying the handle
    pub fn release(&mut self) -> vk::SwapchainKHR {
        std::mem::replace(&mut self.handle, vk::SwapchainKHR::null())
    }
}

impl Drop for OwnedSwapchain {
    fn drop(&mut self) {
        if !self.is_null() {
            self.device.destroy_swapchain(self.handle);
        }
    }
}

// ============================================================================
// Presentation chain
// ============================================================================

/// A negotiated swapchain, its images, and the preferences it was built from
pub struct PresentationChain {
    device: Arc<dyn PresentationDevice>,
    /// Borrowed: the surface is owned by whoever created it
    surface: vk::SurfaceKHR,
    swapchain: OwnedSwapchain,
    images: Vec<vk::Image>,
    properties: ResolvedProperties,
    present_mode_priority: Vec<vk::PresentModeKHR>,
    surface_format_priority: Vec<vk::SurfaceFormatKHR>,
    image_usage_flags: FxHashSet<vk::ImageUsageFlags>,
    /// May be downgraded during construction to what the device can do
    requested_compression: vk::ImageCompressionFlagsEXT,
    requested_compression_fixed_rate: vk::ImageCompressionFixedRateFlagsEXT,
}

impl PresentationChain {
    /// Create a chain for `surface`
    ///
    /// # Arguments
    ///
    /// * `device` - Device used for capability queries and swapchain creation
    /// * `surface` - Target surface (not owned by the chain)
    /// * `preferences` - Requested configuration
    ///
    /// # Errors
    ///
    /// Fails when a query fails, when no legal composite alpha or image
    /// usage exists, or when the driver refuses to create the swapchain.
    pub fn new(
        device: Arc<dyn PresentationDevice>,
        surface: vk::SurfaceKHR,
        preferences: PresentationPreferences,
    ) -> Result<Self> {
        Self::create(device, surface, preferences, vk::SwapchainKHR::null())
    }

    /// Build a replacement chain; unset fields of `update` keep this chain's values
    ///
    /// `self` stays valid and keeps owning its swapchain. Drop it once the
    /// new chain is in use.
    pub fn recreate(&self, update: ChainUpdate) -> Result<Self> {
        let preferences = update.apply_to(self.current_preferences());
        Self::create(Arc::clone(&self.device), self.surface, preferences, self.handle())
    }

    /// Replacement chain with a new extent (e.g. after a window resize)
    pub fn recreate_with_extent(&self, extent: vk::Extent2D) -> Result<Self> {
        self.recreate(ChainUpdate::extent(extent.width, extent.height))
    }

    /// Replacement chain with a different number of images
    pub fn recreate_with_image_count(&self, image_count: u32) -> Result<Self> {
        self.recreate(ChainUpdate::image_count(image_count))
    }

    /// Replacement chain with a different image usage set
    pub fn recreate_with_image_usage(&self, image_usage: &FxHashSet<vk::ImageUsageFlags>) -> Result<Self> {
        self.recreate(ChainUpdate::image_usage(image_usage.iter().copied()))
    }

    /// Replacement chain with a new extent and pre-transform
    pub fn recreate_with_extent_and_transform(
        &self,
        extent: vk::Extent2D,
        transform: vk::SurfaceTransformFlagsKHR,
    ) -> Result<Self> {
        self.recreate(ChainUpdate::extent_and_transform(extent, transform))
    }

    /// Replacement chain with a different compression request
    pub fn recreate_with_compression(
        &self,
        compression: vk::ImageCompressionFlagsEXT,
        fixed_rate: vk::ImageCompressionFixedRateFlagsEXT,
    ) -> Result<Self> {
        self.recreate(ChainUpdate::compression(compression, fixed_rate))
    }

    /// React to a surface change (typically after an out-of-date or suboptimal acquire)
    ///
    /// Returns a replacement chain when the surface's current extent no
    /// longer matches this chain, or unconditionally when `force` is set.
    /// Returns `None` when the surface leaves the extent to the swapchain
    /// or nothing changed.
    pub fn handle_surface_changes(&self, force: bool) -> Result<Option<Self>> {
        let capabilities = self.device.surface_capabilities(self.surface)?;

        if is_undefined_extent(capabilities.current_extent) {
            return Ok(None);
        }

        let transform = self.properties.pre_transform;
        let extent = native_orientation_extent(capabilities.current_extent, transform);
        let unchanged = extent.width == self.properties.extent.width
            && extent.height == self.properties.extent.height;

        if unchanged && !force {
            return Ok(None);
        }

        engine_info!("galaxy3d::present",
            "Surface changed, recreating swapchain with extent ({}, {})", extent.width, extent.height);
        self.recreate_with_extent_and_transform(extent, transform).map(Some)
    }

    /// Preferences that reproduce this chain exactly
    pub fn current_preferences(&self) -> PresentationPreferences {
        PresentationPreferences {
            present_mode: self.properties.present_mode,
            present_mode_priority: self.present_mode_priority.clone(),
            surface_format: self.properties.surface_format,
            surface_format_priority: self.surface_format_priority.clone(),
            extent: self.properties.extent,
            image_count: self.properties.image_count,
            array_layers: self.properties.array_layers,
            pre_transform: self.properties.pre_transform,
            composite_alpha: self.properties.composite_alpha,
            image_usage: self.image_usage_flags.clone(),
            compression: self.requested_compression,
            compression_fixed_rate: self.requested_compression_fixed_rate,
        }
    }

    fn create(
        device: Arc<dyn PresentationDevice>,
        surface: vk::SurfaceKHR,
        preferences: PresentationPreferences,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        let surface_capabilities = device.surface_capabilities(surface)?;

        let surface_formats = device.surface_formats(surface)?;
        engine_info!("galaxy3d::present", "Surface supports the following surface formats:");
        for surface_format in &surface_formats {
            engine_info!("galaxy3d::present",
                "  \t{:?}, {:?}", surface_format.format, surface_format.color_space);
        }

        let present_modes = device.surface_present_modes(surface)?;
        engine_info!("galaxy3d::present", "Surface supports the following present modes:");
        for present_mode in &present_modes {
            engine_info!("galaxy3d::present", "  \t{:?}", present_mode);
        }

        let mut capabilities =
            SupportedCapabilities::from_surface(&surface_capabilities, surface_formats, present_modes);

        let (mut properties, image_usage_flags) =
            ResolvedProperties::negotiate(&preferences, &mut capabilities, |format| {
                device.format_properties(format).optimal_tiling_features
            })?;
        properties.old_swapchain = old_swapchain;

        let mut requested_compression = preferences.compression;
        let mut requested_compression_fixed_rate = preferences.compression_fixed_rate;
        let compression_control = device.is_extension_enabled(COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION);

        let mut descriptor = properties.descriptor(surface);
        if compression_control {
            let fixed_rate = if requested_compression == vk::ImageCompressionFlagsEXT::FIXED_RATE_EXPLICIT {
                // Multi-planar formats are not supported: one plane only
                Some(requested_compression_fixed_rate)
            } else {
                if requested_compression == vk::ImageCompressionFlagsEXT::DISABLED {
                    engine_warn!("galaxy3d::present",
                        "Disabling default (lossless) compression, which can negatively impact performance");
                }
                None
            };

            descriptor.compression = Some(CompressionControl {
                flags: requested_compression,
                fixed_rate,
            });
        } else if requested_compression != vk::ImageCompressionFlagsEXT::DEFAULT {
            engine_warn!("galaxy3d::present",
                "Compression cannot be controlled because {:?} is not enabled",
                COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION);
            requested_compression = vk::ImageCompressionFlagsEXT::DEFAULT;
            requested_compression_fixed_rate = vk::ImageCompressionFixedRateFlagsEXT::NONE;
        }

        let handle = device.create_swapchain(&descriptor).map_err(|result| {
            engine_error!("galaxy3d::present", "Cannot create swapchain: {:?}", result);
            Error::SwapchainCreationFailed(result)
        })?;
        let swapchain = OwnedSwapchain::new(Arc::clone(&device), handle);

        let image_count = device.swapchain_image_count(handle)?;
        let mut images = vec![vk::Image::null(); image_count as usize];
        let written = device.swapchain_images(handle, &mut images)?;
        images.truncate(written);

        if compression_control
            && requested_compression == vk::ImageCompressionFlagsEXT::FIXED_RATE_EXPLICIT
        {
            if let Some(&first_image) = images.first() {
                let applied = device.applied_compression(first_image).fixed_rate_flags;

                if applied != requested_compression_fixed_rate {
                    engine_warn!("galaxy3d::present",
                        "Requested fixed-rate compression ({:?}) was not applied, instead images use {:?}",
                        requested_compression_fixed_rate, applied);

                    requested_compression_fixed_rate = applied;
                    if applied == vk::ImageCompressionFixedRateFlagsEXT::NONE {
                        requested_compression = vk::ImageCompressionFlagsEXT::DEFAULT;
                    }
                } else {
                    engine_info!("galaxy3d::present", "Applied fixed-rate compression: {:?}", applied);
                }
            }
        }

        Ok(Self {
            device,
            surface,
            swapchain,
            images,
            properties,
            present_mode_priority: preferences.present_mode_priority,
            surface_format_priority: preferences.surface_format_priority,
            image_usage_flags,
            requested_compression,
            requested_compression_fixed_rate,
        })
    }

    /// List the surface formats that support fixed-rate compression
    ///
    /// Needs the device extension `VK_EXT_image_compression_control_swapchain`
    /// and the instance extension `VK_KHR_get_surface_capabilities2`. When
    /// either is missing a warning is logged and the list is empty.
    pub fn query_supported_fixed_rate_compression(
        device: &dyn PresentationDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<SurfaceFormatCompression>> {
        if !device.is_extension_enabled(COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION) {
            engine_warn!("galaxy3d::present",
                "To query fixed-rate compression support, device extension {:?} must be enabled",
                COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION);
            return Ok(Vec::new());
        }

        if !device.is_instance_extension_enabled(SURFACE_CAPABILITIES_2_EXTENSION) {
            engine_warn!("galaxy3d::present",
                "To query fixed-rate compression support, instance extension {:?} must be enabled",
                SURFACE_CAPABILITIES_2_EXTENSION);
            return Ok(Vec::new());
        }

        device.surface_formats_with_compression(surface)
    }

    /// Acquire the next image, waiting without timeout
    ///
    /// `semaphore` and/or `fence` are signaled when the image is ready.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore, fence: vk::Fence) -> Result<AcquireStatus> {
        self.acquire_next_image_with_timeout(u64::MAX, semaphore, fence)
    }

    /// Acquire the next image, waiting at most `timeout` nanoseconds
    pub fn acquire_next_image_with_timeout(
        &self,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<AcquireStatus> {
        match self.device.acquire_next_image(self.handle(), timeout, semaphore, fence) {
            Ok((index, false)) => Ok(AcquireStatus::Ready(index)),
            Ok((index, true)) => Ok(AcquireStatus::Suboptimal(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireStatus::OutOfDate),
            Err(vk::Result::TIMEOUT) => Ok(AcquireStatus::Timeout),
            Err(vk::Result::NOT_READY) => Ok(AcquireStatus::NotReady),
            Err(result) => {
                engine_error!("galaxy3d::present", "Failed to acquire next swapchain image: {:?}", result);
                Err(Error::AcquireFailed(result))
            }
        }
    }

    // ===== ACCESSORS =====

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain.handle()
    }

    pub fn is_valid(&self) -> bool {
        !self.swapchain.is_null()
    }

    pub fn device(&self) -> &Arc<dyn PresentationDevice> {
        &self.device
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn properties(&self) -> &ResolvedProperties {
        &self.properties
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.properties.extent
    }

    pub fn format(&self) -> vk::Format {
        self.properties.surface_format.format
    }

    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        self.properties.surface_format
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Minimum image count the swapchain was created with (the driver may create more)
    pub fn image_count(&self) -> u32 {
        self.properties.image_count
    }

    pub fn transform(&self) -> vk::SurfaceTransformFlagsKHR {
        self.properties.pre_transform
    }

    pub fn composite_alpha(&self) -> vk::CompositeAlphaFlagsKHR {
        self.properties.composite_alpha
    }

    /// Combined image usage flags
    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.properties.image_usage
    }

    /// Validated usage flags as a set
    pub fn image_usage_flags(&self) -> &FxHashSet<vk::ImageUsageFlags> {
        &self.image_usage_flags
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.properties.present_mode
    }

    pub fn present_mode_priority(&self) -> &[vk::PresentModeKHR] {
        &self.present_mode_priority
    }

    pub fn surface_format_priority(&self) -> &[vk::SurfaceFormatKHR] {
        &self.surface_format_priority
    }

    pub fn requested_compression(&self) -> vk::ImageCompressionFlagsEXT {
        self.requested_compression
    }

    pub fn requested_compression_fixed_rate(&self) -> vk::ImageCompressionFixedRateFlagsEXT {
        self.requested_compression_fixed_rate
    }

    /// Compression the driver applied to the first image
    pub fn applied_compression(&self) -> AppliedCompression {
        self.images
            .first()
            .map(|&image| self.device.applied_compression(image))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
