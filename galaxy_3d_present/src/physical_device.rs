//! Physical-device lookups
//!
//! Small helpers over data the physical device reports: memory type
//! selection, driver version decoding, and extension lookup.

use ash::vk;
use std::ffi::CStr;

use crate::error::{Error, Result};
use crate::engine_error;

/// Index of the first memory type allowed by `type_bits` that has all of `flags`
///
/// Returns `None` when no such type exists. See [`find_memory_type`] for the
/// variant that treats a missing type as an error.
pub fn memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = (memory_properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);

    memory_properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            (type_bits >> index) & 1 == 1 && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
}

/// Like [`memory_type_index`], but a missing memory type is an error
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Result<u32> {
    memory_type_index(memory_properties, type_bits, flags).ok_or_else(|| {
        engine_error!("galaxy3d::present",
            "Could not find a matching memory type (bits {:#x}, flags {:?})", type_bits, flags);
        Error::MemoryTypeNotFound { type_bits, flags }
    })
}

/// Driver version decoded according to the vendor's packing scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// PCI vendor id of NVIDIA
pub const VENDOR_ID_NVIDIA: u32 = 0x10DE;
/// PCI vendor id of Intel
pub const VENDOR_ID_INTEL: u32 = 0x8086;

impl DriverVersion {
    /// Decode `VkPhysicalDeviceProperties::driverVersion`
    pub fn decode(vendor_id: u32, driver_version: u32) -> Self {
        match vendor_id {
            VENDOR_ID_NVIDIA => Self {
                major: (driver_version >> 22) & 0x3ff,
                minor: (driver_version >> 14) & 0x0ff,
                patch: (driver_version >> 6) & 0x0ff,
            },
            VENDOR_ID_INTEL => Self {
                major: (driver_version >> 14) & 0x3ffff,
                minor: driver_version & 0x3ffff,
                patch: 0,
            },
            // Legacy VK_VERSION packing: unlike api_version_major, no variant
            // bits are masked off, so majors of 128 and above survive
            _ => Self {
                major: driver_version >> 22,
                minor: (driver_version >> 12) & 0x3ff,
                patch: driver_version & 0xfff,
            },
        }
    }
}

/// Whether `name` appears in a list of extension properties
pub fn is_extension_supported(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available
        .iter()
        .any(|extension| extension.extension_name_as_c_str().is_ok_and(|extension_name| extension_name == name))
}

#[cfg(test)]
#[path = "physical_device_tests.rs"]
mod tests;
