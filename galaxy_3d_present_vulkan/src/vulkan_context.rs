/// VulkanContext - instance, surface and logical device for presentation
///
/// Owns every Vulkan object a presentation chain depends on but does not
/// create itself. Destruction order in `Drop`: device, surface, debug
/// messenger, instance. A failed bootstrap destroys whatever it had
/// already created, in the same order. Chains keep the context alive through
/// `VulkanPresentationDevice`, so it always outlives their swapchains.

use ash::vk;
use galaxy_3d_present::galaxy3d::physical_device::{is_extension_supported, DriverVersion};
use galaxy_3d_present::galaxy3d::{Error, Result};
use galaxy_3d_present::{engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};

/// Bootstrap configuration
#[derive(Debug, Clone)]
pub struct VulkanContextConfig {
    /// Enable VK_LAYER_KHRONOS_validation (only honored with the `vulkan-validation` feature)
    pub enable_validation: bool,
    pub app_name: String,
    pub app_version: u32,
    /// Enable the image compression control extensions when the driver has them
    pub request_compression_control: bool,
}

impl Default for VulkanContextConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(feature = "vulkan-validation"),
            app_name: "Galaxy3D Application".to_string(),
            app_version: vk::make_api_version(0, 1, 0, 0),
            request_compression_control: true,
        }
    }
}

pub struct VulkanContext {
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    present_queue: vk::Queue,
    present_queue_family: u32,
    instance_extensions: Vec<CString>,
    device_extensions: Vec<CString>,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

fn init_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!("galaxy3d::vulkan", "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

/// Objects created so far by `VulkanContext::new`, destroyed if a later step fails
struct PartialBootstrap {
    instance: ash::Instance,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    armed: bool,
}

impl PartialBootstrap {
    fn new(instance: &ash::Instance) -> Self {
        Self {
            instance: instance.clone(),
            debug_messenger: None,
            surface: None,
            armed: true,
        }
    }

    /// Every step succeeded: ownership moves to the context
    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialBootstrap {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        engine_warn!("galaxy3d::vulkan", "Vulkan bootstrap failed, destroying partially created objects");
        unsafe {
            if let Some((loader, surface)) = &self.surface {
                loader.destroy_surface(*surface, None);
            }
            if let Some((loader, messenger)) = &self.debug_messenger {
                loader.destroy_debug_utils_messenger(*messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn owned_names(names: &[*const std::ffi::c_char]) -> Vec<CString> {
    names
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) }.to_owned())
        .collect()
}

impl VulkanContext {
    /// Create the instance, a surface for `window`, and a logical device able to present to it
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Bootstrap configuration
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: VulkanContextConfig,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.clone())
                .map_err(|e| init_failed("Invalid application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(config.app_version)
                .engine_name(c"Galaxy3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // ===== INSTANCE EXTENSIONS =====
            let display_handle = window.display_handle()
                .map_err(|e| init_failed("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("Failed to get required extensions", e))?
                .to_vec();

            let available_instance_extensions = entry
                .enumerate_instance_extension_properties(None)
                .map_err(|e| init_failed("Failed to enumerate instance extensions", e))?;

            if config.request_compression_control {
                let name = ash::khr::get_surface_capabilities2::NAME;
                if is_extension_supported(&available_instance_extensions, name) {
                    extension_names.push(name.as_ptr());
                } else {
                    engine_warn!("galaxy3d::vulkan", "Instance extension {:?} is not available", name);
                }
            }

            let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
            if config.enable_validation && !validation {
                engine_warn!("galaxy3d::vulkan",
                    "Validation requested but the crate was built without the vulkan-validation feature");
            }
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;
            let instance_extensions = owned_names(&extension_names);
            let mut bootstrap = PartialBootstrap::new(&instance);

            let (debug_utils_loader, debug_messenger) = if validation {
                Self::create_debug_messenger(&entry, &instance)?
            } else {
                (None, None)
            };
            bootstrap.debug_messenger = debug_utils_loader.clone().zip(debug_messenger);

            // ===== SURFACE =====
            let window_handle = window.window_handle()
                .map_err(|e| init_failed("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("Failed to create surface", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            bootstrap.surface = Some((surface_loader.clone(), surface));

            // ===== PHYSICAL DEVICE =====
            let (physical_device, graphics_queue_family, present_queue_family, available_device_extensions) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let properties = instance.get_physical_device_properties(physical_device);
            let driver = DriverVersion::decode(properties.vendor_id, properties.driver_version);
            engine_info!("galaxy3d::vulkan", "Using GPU {:?} (driver {}.{}.{})",
                properties.device_name_as_c_str().unwrap_or(c"unknown"),
                driver.major, driver.minor, driver.patch);

            // ===== LOGICAL DEVICE =====
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_queue_family)
                    .queue_priorities(&queue_priorities),
            ];
            if present_queue_family != graphics_queue_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_queue_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let mut device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];

            let mut compression_features = vk::PhysicalDeviceImageCompressionControlFeaturesEXT::default();
            let mut swapchain_compression_features =
                vk::PhysicalDeviceImageCompressionControlSwapchainFeaturesEXT::default();
            let compression_control = config.request_compression_control
                && Self::supports_compression_control(
                    &instance,
                    physical_device,
                    &available_device_extensions,
                );

            if compression_control {
                device_extension_names.push(ash::ext::image_compression_control::NAME.as_ptr());
                device_extension_names.push(ash::ext::image_compression_control_swapchain::NAME.as_ptr());
                compression_features = compression_features.image_compression_control(true);
                swapchain_compression_features =
                    swapchain_compression_features.image_compression_control_swapchain(true);
            } else if config.request_compression_control {
                engine_warn!("galaxy3d::vulkan",
                    "Image compression control is not supported by this device");
            }

            let mut device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);
            if compression_control {
                device_create_info = device_create_info
                    .push_next(&mut compression_features)
                    .push_next(&mut swapchain_compression_features);
            }

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;
            let device_extensions = owned_names(&device_extension_names);
            bootstrap.complete();

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);
            let present_queue = device.get_device_queue(present_queue_family, 0);

            Ok(Self {
                entry,
                instance,
                surface_loader,
                surface,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family,
                present_queue,
                present_queue_family,
                instance_extensions,
                device_extensions,
                debug_utils_loader,
                debug_messenger,
            })
        }
    }

    /// First GPU with the swapchain extension, a graphics queue and a queue able to present
    ///
    /// Returns the device, the graphics and present queue families, and the
    /// device's extension list.
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32, Vec<vk::ExtensionProperties>)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;

        for physical_device in physical_devices {
            let extensions = match instance.enumerate_device_extension_properties(physical_device) {
                Ok(extensions) => extensions,
                Err(_) => continue,
            };
            if !is_extension_supported(&extensions, ash::khr::swapchain::NAME) {
                continue;
            }

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS));

            let present_family = (0..queue_families.len() as u32).find(|&i| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            });

            if let (Some(graphics), Some(present)) = (graphics_family, present_family) {
                return Ok((physical_device, graphics as u32, present, extensions));
            }
        }

        engine_error!("galaxy3d::vulkan", "No Vulkan-capable GPU can present to this surface");
        Err(Error::InitializationFailed(
            "No Vulkan-capable GPU can present to this surface".to_string(),
        ))
    }

    /// Whether both compression extensions and their features are available
    unsafe fn supports_compression_control(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        available: &[vk::ExtensionProperties],
    ) -> bool {
        if !is_extension_supported(available, ash::ext::image_compression_control::NAME)
            || !is_extension_supported(available, ash::ext::image_compression_control_swapchain::NAME)
        {
            return false;
        }

        let mut compression = vk::PhysicalDeviceImageCompressionControlFeaturesEXT::default();
        let mut swapchain_compression = vk::PhysicalDeviceImageCompressionControlSwapchainFeaturesEXT::default();
        let mut features = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut compression)
            .push_next(&mut swapchain_compression);
        instance.get_physical_device_features2(physical_device, &mut features);

        compression.image_compression_control == vk::TRUE
            && swapchain_compression.image_compression_control_swapchain == vk::TRUE
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| init_failed("Failed to create debug messenger", e))?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    // ===== ACCESSORS =====

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    /// Surface created for the window (owned by the context)
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn present_queue_family(&self) -> u32 {
        self.present_queue_family
    }

    pub fn instance_extensions(&self) -> &[CString] {
        &self.instance_extensions
    }

    pub fn device_extensions(&self) -> &[CString] {
        &self.device_extensions
    }

    /// Block until the device is idle (call before dropping chains that may still be in use)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.map_err(|e| Error::QueryFailed {
            what: "device idle",
            result: e,
        })
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let (Some(loader), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
