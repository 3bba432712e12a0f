/// Vulkan debug messenger - routes validation layer messages to the engine logger
///
/// Only compiled with the `vulkan-validation` feature.

use ash::vk;
use galaxy_3d_present::{engine_error, engine_info, engine_warn};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};

static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);
static VALIDATION_WARNINGS: AtomicU32 = AtomicU32::new(0);

/// Validation messages received since process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
}

pub fn validation_stats() -> ValidationStats {
    ValidationStats {
        errors: VALIDATION_ERRORS.load(Ordering::Relaxed),
        warnings: VALIDATION_WARNINGS.load(Ordering::Relaxed),
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::ffi::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Debug messenger callback
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        engine_error!("galaxy3d::vulkan", "[{}] {}: {}", type_str, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        VALIDATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
        engine_warn!("galaxy3d::vulkan", "[{}] {}: {}", type_str, message_id_name, message);
    } else {
        engine_info!("galaxy3d::vulkan", "[{}] {}: {}", type_str, message_id_name, message);
    }

    vk::FALSE
}
