/// VulkanPresentationDevice - PresentationDevice backed by ash
///
/// Wraps a `VulkanContext` with the extension loaders a presentation chain
/// needs. Optional loaders are only created when the matching extension
/// was enabled on the instance or device.

use ash::vk;
use galaxy_3d_present::galaxy3d::present::{
    AppliedCompression, PresentationDevice, SurfaceFormatCompression, SwapchainDescriptor,
};
use galaxy_3d_present::galaxy3d::{Error, Result};
use galaxy_3d_present::engine_warn;
use std::ffi::CStr;
use std::sync::Arc;

use crate::vulkan_context::VulkanContext;

pub struct VulkanPresentationDevice {
    context: Arc<VulkanContext>,
    swapchain_loader: ash::khr::swapchain::Device,
    surface_capabilities2_loader: Option<ash::khr::get_surface_capabilities2::Instance>,
    compression_loader: Option<ash::ext::image_compression_control::Device>,
}

fn query_failed(what: &'static str) -> impl Fn(vk::Result) -> Error {
    move |result| Error::QueryFailed { what, result }
}

impl VulkanPresentationDevice {
    pub fn new(context: Arc<VulkanContext>) -> Self {
        let instance = context.instance();
        let device = context.device();

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);

        let surface_capabilities2_loader = context
            .instance_extensions()
            .iter()
            .any(|name| name.as_c_str() == ash::khr::get_surface_capabilities2::NAME)
            .then(|| ash::khr::get_surface_capabilities2::Instance::new(context.entry(), instance));

        let compression_loader = context
            .device_extensions()
            .iter()
            .any(|name| name.as_c_str() == ash::ext::image_compression_control::NAME)
            .then(|| ash::ext::image_compression_control::Device::new(instance, device));

        Self {
            context,
            swapchain_loader,
            surface_capabilities2_loader,
            compression_loader,
        }
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Whether `queue_family` can present to `surface`
    pub fn is_present_supported(&self, queue_family: u32, surface: vk::SurfaceKHR) -> Result<bool> {
        unsafe {
            self.context
                .surface_loader()
                .get_physical_device_surface_support(self.context.physical_device(), queue_family, surface)
        }
        .map_err(query_failed("surface support"))
    }

    /// Queue an image for presentation; `Ok(true)` means the swapchain is suboptimal
    pub fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> std::result::Result<bool, vk::Result> {
        let swapchains = [swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain_loader
                .queue_present(self.context.present_queue(), &present_info)
        }
    }
}

impl PresentationDevice for VulkanPresentationDevice {
    fn is_extension_enabled(&self, name: &CStr) -> bool {
        self.context.device_extensions().iter().any(|e| e.as_c_str() == name)
    }

    fn is_instance_extension_enabled(&self, name: &CStr) -> bool {
        self.context.instance_extensions().iter().any(|e| e.as_c_str() == name)
    }

    fn surface_capabilities(&self, surface: vk::SurfaceKHR) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.context
                .surface_loader()
                .get_physical_device_surface_capabilities(self.context.physical_device(), surface)
        }
        .map_err(query_failed("surface capabilities"))
    }

    fn surface_formats(&self, surface: vk::SurfaceKHR) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.context
                .surface_loader()
                .get_physical_device_surface_formats(self.context.physical_device(), surface)
        }
        .map_err(query_failed("surface formats"))
    }

    fn surface_present_modes(&self, surface: vk::SurfaceKHR) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.context
                .surface_loader()
                .get_physical_device_surface_present_modes(self.context.physical_device(), surface)
        }
        .map_err(query_failed("surface present modes"))
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.context
                .instance()
                .get_physical_device_format_properties(self.context.physical_device(), format)
        }
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.context
                .instance()
                .get_physical_device_memory_properties(self.context.physical_device())
        }
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> std::result::Result<vk::SwapchainKHR, vk::Result> {
        // One plane only: multi-planar formats are not supported for fixed-rate compression
        let mut fixed_rate_flags = [descriptor
            .compression
            .and_then(|compression| compression.fixed_rate)
            .unwrap_or_default()];
        let mut compression_control = vk::ImageCompressionControlEXT::default();

        if let Some(compression) = descriptor.compression {
            compression_control.flags = compression.flags;
            if compression.fixed_rate.is_some() {
                compression_control = compression_control.fixed_rate_flags(&mut fixed_rate_flags);
            }
        }

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(descriptor.surface)
            .min_image_count(descriptor.min_image_count)
            .image_format(descriptor.image_format)
            .image_color_space(descriptor.image_color_space)
            .image_extent(descriptor.image_extent)
            .image_array_layers(descriptor.image_array_layers)
            .image_usage(descriptor.image_usage)
            .image_sharing_mode(descriptor.image_sharing_mode)
            .pre_transform(descriptor.pre_transform)
            .composite_alpha(descriptor.composite_alpha)
            .present_mode(descriptor.present_mode)
            .clipped(descriptor.clipped)
            .old_swapchain(descriptor.old_swapchain);

        if descriptor.compression.is_some() {
            create_info = create_info.push_next(&mut compression_control);
        }

        unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe {
            self.swapchain_loader.destroy_swapchain(swapchain, None);
        }
    }

    fn swapchain_image_count(&self, swapchain: vk::SwapchainKHR) -> Result<u32> {
        let mut count = 0;
        unsafe {
            (self.swapchain_loader.fp().get_swapchain_images_khr)(
                self.swapchain_loader.device(),
                swapchain,
                &mut count,
                std::ptr::null_mut(),
            )
        }
        .result()
        .map_err(query_failed("swapchain images"))?;
        Ok(count)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR, images: &mut [vk::Image]) -> Result<usize> {
        let mut count = images.len() as u32;
        unsafe {
            (self.swapchain_loader.fp().get_swapchain_images_khr)(
                self.swapchain_loader.device(),
                swapchain,
                &mut count,
                images.as_mut_ptr(),
            )
        }
        .result()
        .map_err(query_failed("swapchain images"))?;
        Ok(count as usize)
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> std::result::Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, semaphore, fence)
        }
    }

    fn applied_compression(&self, image: vk::Image) -> AppliedCompression {
        let Some(loader) = &self.compression_loader else {
            return AppliedCompression::default();
        };

        let subresource = vk::ImageSubresource2EXT::default().image_subresource(vk::ImageSubresource {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            array_layer: 0,
        });
        let mut compression_properties = vk::ImageCompressionPropertiesEXT::default();
        let mut layout = vk::SubresourceLayout2EXT::default().push_next(&mut compression_properties);

        unsafe {
            loader.get_image_subresource_layout2(image, &subresource, &mut layout);
        }

        AppliedCompression {
            flags: compression_properties.image_compression_flags,
            fixed_rate_flags: compression_properties.image_compression_fixed_rate_flags,
        }
    }

    fn surface_formats_with_compression(
        &self,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<SurfaceFormatCompression>> {
        let Some(loader) = &self.surface_capabilities2_loader else {
            engine_warn!("galaxy3d::vulkan",
                "{:?} is not enabled, cannot enumerate surface formats with compression",
                ash::khr::get_surface_capabilities2::NAME);
            return Ok(Vec::new());
        };

        let physical_device = self.context.physical_device();
        let surface_info = vk::PhysicalDeviceSurfaceInfo2KHR::default().surface(surface);

        let count = unsafe { loader.get_physical_device_surface_formats2_len(physical_device, &surface_info) }
            .map_err(query_failed("surface formats with compression"))?;

        let mut compression_properties = vec![vk::ImageCompressionPropertiesEXT::default(); count];
        let mut surface_formats: Vec<vk::SurfaceFormat2KHR> = compression_properties
            .iter_mut()
            .map(|properties| vk::SurfaceFormat2KHR::default().push_next(properties))
            .collect();

        unsafe { loader.get_physical_device_surface_formats2(physical_device, &surface_info, &mut surface_formats) }
            .map_err(query_failed("surface formats with compression"))?;

        let formats: Vec<vk::SurfaceFormatKHR> =
            surface_formats.iter().map(|format| format.surface_format).collect();
        drop(surface_formats);

        Ok(formats
            .into_iter()
            .zip(compression_properties)
            .map(|(surface_format, properties)| SurfaceFormatCompression {
                surface_format,
                compression: AppliedCompression {
                    flags: properties.image_compression_flags,
                    fixed_rate_flags: properties.image_compression_fixed_rate_flags,
                },
            })
            .collect())
    }
}
