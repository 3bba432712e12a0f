//! Unit tests for physical_device.rs

use crate::error::Error;
use crate::physical_device::*;
use ash::vk;

fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
    let mut properties = vk::PhysicalDeviceMemoryProperties::default();
    properties.memory_type_count = types.len() as u32;
    for (index, flags) in types.iter().enumerate() {
        properties.memory_types[index].property_flags = *flags;
    }
    properties
}

fn typical_properties() -> vk::PhysicalDeviceMemoryProperties {
    memory_properties(&[
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
    ])
}

// ============================================================================
// MEMORY TYPE LOOKUP
// ============================================================================

#[test]
fn test_memory_type_index_first_match() {
    let properties = typical_properties();
    assert_eq!(
        memory_type_index(&properties, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL),
        Some(0)
    );
    assert_eq!(
        memory_type_index(&properties, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE),
        Some(1)
    );
}

#[test]
fn test_memory_type_index_respects_type_bits() {
    let properties = typical_properties();
    assert_eq!(
        memory_type_index(&properties, 0b100, vk::MemoryPropertyFlags::DEVICE_LOCAL),
        Some(2)
    );
    assert_eq!(
        memory_type_index(&properties, 0b001, vk::MemoryPropertyFlags::HOST_VISIBLE),
        None
    );
}

#[test]
fn test_memory_type_index_ignores_types_past_count() {
    let mut properties = typical_properties();
    properties.memory_types[5].property_flags = vk::MemoryPropertyFlags::LAZILY_ALLOCATED;
    assert_eq!(
        memory_type_index(&properties, u32::MAX, vk::MemoryPropertyFlags::LAZILY_ALLOCATED),
        None
    );
}

#[test]
fn test_find_memory_type_success() {
    let properties = typical_properties();
    let flags = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
    assert_eq!(find_memory_type(&properties, 0b111, flags), Ok(1));
}

#[test]
fn test_find_memory_type_not_found_is_error() {
    let properties = typical_properties();
    let result = find_memory_type(&properties, 0b011, vk::MemoryPropertyFlags::PROTECTED);
    assert_eq!(
        result,
        Err(Error::MemoryTypeNotFound {
            type_bits: 0b011,
            flags: vk::MemoryPropertyFlags::PROTECTED,
        })
    );
}

// ============================================================================
// DRIVER VERSION
// ============================================================================

#[test]
fn test_driver_version_nvidia() {
    // 535.104.5
    let packed = (535 << 22) | (104 << 14) | (5 << 6);
    assert_eq!(
        DriverVersion::decode(VENDOR_ID_NVIDIA, packed),
        DriverVersion { major: 535, minor: 104, patch: 5 }
    );
}

#[test]
fn test_driver_version_intel() {
    let packed = (96 << 14) | 4953;
    assert_eq!(
        DriverVersion::decode(VENDOR_ID_INTEL, packed),
        DriverVersion { major: 96, minor: 4953, patch: 0 }
    );
}

#[test]
fn test_driver_version_standard_packing() {
    let packed = vk::make_api_version(0, 23, 1, 7);
    assert_eq!(
        DriverVersion::decode(0x1002, packed),
        DriverVersion { major: 23, minor: 1, patch: 7 }
    );
}

#[test]
fn test_driver_version_standard_packing_large_major() {
    // Qualcomm-style 512.3.0
    let packed = (512 << 22) | (3 << 12);
    assert_eq!(
        DriverVersion::decode(0x5143, packed),
        DriverVersion { major: 512, minor: 3, patch: 0 }
    );
}

// ============================================================================
// EXTENSION LOOKUP
// ============================================================================

fn extension(name: &std::ffi::CStr) -> vk::ExtensionProperties {
    let mut properties = vk::ExtensionProperties::default();
    for (dst, src) in properties.extension_name.iter_mut().zip(name.to_bytes()) {
        *dst = *src as std::ffi::c_char;
    }
    properties
}

#[test]
fn test_is_extension_supported() {
    let available = [extension(c"VK_KHR_swapchain"), extension(c"VK_EXT_image_compression_control")];

    assert!(is_extension_supported(&available, c"VK_KHR_swapchain"));
    assert!(is_extension_supported(&available, c"VK_EXT_image_compression_control"));
    assert!(!is_extension_supported(&available, c"VK_EXT_image_compression_control_swapchain"));
    assert!(!is_extension_supported(&[], c"VK_KHR_swapchain"));
}
