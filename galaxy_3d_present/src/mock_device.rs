/// Mock presentation device for unit tests (no GPU required)
///
/// Serves scripted surface capabilities and records every swapchain it
/// creates and destroys, so chain construction and recreation can be
/// checked end to end.

use ash::vk;
use ash::vk::Handle;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::capabilities::{AppliedCompression, SurfaceFormatCompression};
use crate::device::{PresentationDevice, SwapchainDescriptor};
use crate::error::{Error, Result};

pub struct MockPresentationDevice {
    pub capabilities: Mutex<vk::SurfaceCapabilitiesKHR>,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Optimal-tiling features reported for every format
    pub format_features: vk::FormatFeatureFlags,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub device_extensions: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    /// When set, swapchain creation fails with this code
    pub create_failure: Option<vk::Result>,
    /// When set, the image count query fails with this code
    pub image_query_failure: Option<vk::Result>,
    pub images_per_swapchain: u32,
    pub applied_compression: AppliedCompression,
    pub acquire_result: std::result::Result<(u32, bool), vk::Result>,
    pub compression_formats: Vec<SurfaceFormatCompression>,
    pub created: Mutex<Vec<SwapchainDescriptor>>,
    pub destroyed: Mutex<Vec<vk::SwapchainKHR>>,
    next_handle: AtomicU64,
}

pub fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

pub fn default_capabilities() -> vk::SurfaceCapabilitiesKHR {
    let mut capabilities = vk::SurfaceCapabilitiesKHR::default();
    capabilities.min_image_count = 2;
    capabilities.max_image_count = 8;
    capabilities.current_extent = vk::Extent2D { width: 800, height: 600 };
    capabilities.min_image_extent = vk::Extent2D { width: 1, height: 1 };
    capabilities.max_image_extent = vk::Extent2D { width: 4096, height: 4096 };
    capabilities.max_image_array_layers = 1;
    capabilities.supported_transforms =
        vk::SurfaceTransformFlagsKHR::IDENTITY | vk::SurfaceTransformFlagsKHR::ROTATE_90;
    capabilities.current_transform = vk::SurfaceTransformFlagsKHR::IDENTITY;
    capabilities.supported_composite_alpha =
        vk::CompositeAlphaFlagsKHR::OPAQUE | vk::CompositeAlphaFlagsKHR::INHERIT;
    capabilities.supported_usage_flags = vk::ImageUsageFlags::COLOR_ATTACHMENT
        | vk::ImageUsageFlags::TRANSFER_SRC
        | vk::ImageUsageFlags::TRANSFER_DST
        | vk::ImageUsageFlags::SAMPLED
        | vk::ImageUsageFlags::STORAGE;
    capabilities
}

impl MockPresentationDevice {
    pub fn new() -> Self {
        Self {
            capabilities: Mutex::new(default_capabilities()),
            surface_formats: vec![
                surface_format(vk::Format::B8G8R8A8_SRGB),
                surface_format(vk::Format::B8G8R8A8_UNORM),
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            format_features: vk::FormatFeatureFlags::COLOR_ATTACHMENT
                | vk::FormatFeatureFlags::SAMPLED_IMAGE,
            memory_properties: vk::PhysicalDeviceMemoryProperties::default(),
            device_extensions: Vec::new(),
            instance_extensions: Vec::new(),
            create_failure: None,
            image_query_failure: None,
            images_per_swapchain: 3,
            applied_compression: AppliedCompression::default(),
            acquire_result: Ok((0, false)),
            compression_formats: Vec::new(),
            created: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn with_device_extension(mut self, name: &CStr) -> Self {
        self.device_extensions.push(name.to_owned());
        self
    }

    pub fn with_instance_extension(mut self, name: &CStr) -> Self {
        self.instance_extensions.push(name.to_owned());
        self
    }

    pub fn set_current_extent(&self, width: u32, height: u32) {
        self.capabilities.lock().unwrap().current_extent = vk::Extent2D { width, height };
    }

    pub fn update_capabilities<F: FnOnce(&mut vk::SurfaceCapabilitiesKHR)>(&self, f: F) {
        f(&mut self.capabilities.lock().unwrap());
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last_descriptor(&self) -> SwapchainDescriptor {
        self.created.lock().unwrap().last().cloned().unwrap()
    }

    pub fn destroyed_handles(&self) -> Vec<vk::SwapchainKHR> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl PresentationDevice for MockPresentationDevice {
    fn is_extension_enabled(&self, name: &CStr) -> bool {
        self.device_extensions.iter().any(|e| e.as_c_str() == name)
    }

    fn is_instance_extension_enabled(&self, name: &CStr) -> bool {
        self.instance_extensions.iter().any(|e| e.as_c_str() == name)
    }

    fn surface_capabilities(&self, _surface: vk::SurfaceKHR) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(*self.capabilities.lock().unwrap())
    }

    fn surface_formats(&self, _surface: vk::SurfaceKHR) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.surface_formats.clone())
    }

    fn surface_present_modes(&self, _surface: vk::SurfaceKHR) -> Result<Vec<vk::PresentModeKHR>> {
        Ok(self.present_modes.clone())
    }

    fn format_properties(&self, _format: vk::Format) -> vk::FormatProperties {
        let mut properties = vk::FormatProperties::default();
        properties.optimal_tiling_features = self.format_features;
        properties
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.memory_properties
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> std::result::Result<vk::SwapchainKHR, vk::Result> {
        if let Some(result) = self.create_failure {
            return Err(result);
        }
        self.created.lock().unwrap().push(descriptor.clone());
        Ok(vk::SwapchainKHR::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed)))
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.destroyed.lock().unwrap().push(swapchain);
    }

    fn swapchain_image_count(&self, _swapchain: vk::SwapchainKHR) -> Result<u32> {
        match self.image_query_failure {
            Some(result) => Err(Error::QueryFailed { what: "swapchain images", result }),
            None => Ok(self.images_per_swapchain),
        }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR, images: &mut [vk::Image]) -> Result<usize> {
        let count = images.len().min(self.images_per_swapchain as usize);
        for (index, image) in images.iter_mut().take(count).enumerate() {
            *image = vk::Image::from_raw(swapchain.as_raw() * 100 + index as u64 + 1);
        }
        Ok(count)
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        _timeout: u64,
        _semaphore: vk::Semaphore,
        _fence: vk::Fence,
    ) -> std::result::Result<(u32, bool), vk::Result> {
        self.acquire_result
    }

    fn applied_compression(&self, _image: vk::Image) -> AppliedCompression {
        self.applied_compression
    }

    fn surface_formats_with_compression(
        &self,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<SurfaceFormatCompression>> {
        Ok(self.compression_formats.clone())
    }
}
