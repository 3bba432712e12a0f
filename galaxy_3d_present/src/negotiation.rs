/// Capability negotiation - pick one legal value per swapchain axis
///
/// Every function here is pure apart from logging: it takes the caller's
/// request and the set the surface reports, and returns the best supported
/// value. A request that cannot be honored is degraded and logged as a
/// warning. Only composite alpha and image usage can fail outright.

use ash::vk;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::{engine_info, engine_warn};

/// Fallback order for composite alpha when the requested bit is unsupported
pub const COMPOSITE_ALPHA_PRIORITY: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];

/// Fallback order for image usage when none of the requested flags survive validation
pub const IMAGE_USAGE_PRIORITY: [vk::ImageUsageFlags; 4] = [
    vk::ImageUsageFlags::COLOR_ATTACHMENT,
    vk::ImageUsageFlags::STORAGE,
    vk::ImageUsageFlags::SAMPLED,
    vk::ImageUsageFlags::TRANSFER_DST,
];

/// Present mode every conformant implementation supports
pub const BASELINE_PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

/// `current_extent.width` value meaning "the swapchain decides the surface size"
pub const UNDEFINED_EXTENT: u32 = u32::MAX;

/// Whether a surface's current extent leaves the size up to the swapchain
pub fn is_undefined_extent(current_extent: vk::Extent2D) -> bool {
    current_extent.width == UNDEFINED_EXTENT
}

/// Clamp the requested image count into `[min, max]` (`max == 0` means no upper bound)
pub fn choose_image_count(requested: u32, min_image_count: u32, max_image_count: u32) -> u32 {
    let mut count = requested;
    if max_image_count != 0 {
        count = count.min(max_image_count);
    }
    count.max(min_image_count)
}

/// Clamp the requested array layer count into `[1, max]`
pub fn choose_image_array_layers(requested: u32, max_image_array_layers: u32) -> u32 {
    requested.min(max_image_array_layers).max(1)
}

/// Resolve the image extent
///
/// When the surface reports an undefined current extent the request is used
/// verbatim. A zero-sized request falls back to the current extent.
pub fn choose_extent(
    requested: vk::Extent2D,
    min_image_extent: vk::Extent2D,
    max_image_extent: vk::Extent2D,
    current_extent: vk::Extent2D,
) -> vk::Extent2D {
    if is_undefined_extent(current_extent) {
        return requested;
    }

    if requested.width < 1 || requested.height < 1 {
        engine_warn!("galaxy3d::present",
            "Image extent ({}, {}) not supported. Selecting ({}, {}).",
            requested.width, requested.height, current_extent.width, current_extent.height);
        return current_extent;
    }

    vk::Extent2D {
        width: requested.width
            .max(min_image_extent.width)
            .min(max_image_extent.width),
        height: requested.height
            .max(min_image_extent.height)
            .min(max_image_extent.height),
    }
}

/// Resolve the present mode: exact match, then the priority list, then FIFO
pub fn choose_present_mode(
    requested: vk::PresentModeKHR,
    available: &[vk::PresentModeKHR],
    priority: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if available.contains(&requested) {
        engine_info!("galaxy3d::present", "Present mode selected: {:?}", requested);
        return requested;
    }

    let chosen = priority
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(BASELINE_PRESENT_MODE);

    engine_warn!("galaxy3d::present",
        "Present mode '{:?}' not supported. Selecting '{:?}'.", requested, chosen);
    chosen
}

fn same_surface_format(a: &vk::SurfaceFormatKHR, b: &vk::SurfaceFormatKHR) -> bool {
    a.format == b.format && a.color_space == b.color_space
}

/// Resolve the surface format: exact (format, color space) pair, then the
/// priority list, then the first format the surface reports
pub fn choose_surface_format(
    requested: vk::SurfaceFormatKHR,
    available: &[vk::SurfaceFormatKHR],
    priority: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR> {
    if let Some(found) = available.iter().find(|f| same_surface_format(f, &requested)) {
        engine_info!("galaxy3d::present",
            "Surface format selected: {:?}, {:?}", found.format, found.color_space);
        return Ok(*found);
    }

    let from_priority = priority
        .iter()
        .find_map(|wanted| available.iter().find(|f| same_surface_format(f, wanted)));

    let chosen = match from_priority.or_else(|| available.first()) {
        Some(format) => *format,
        None => return Err(Error::NoSurfaceFormats),
    };

    engine_warn!("galaxy3d::present",
        "Surface format ({:?}, {:?}) not supported. Selecting ({:?}, {:?}).",
        requested.format, requested.color_space, chosen.format, chosen.color_space);
    Ok(chosen)
}

/// Resolve the pre-transform, falling back to the surface's current transform
///
/// The request must be a single supported bit; combined bits are treated as
/// unsupported.
pub fn choose_transform(
    requested: vk::SurfaceTransformFlagsKHR,
    supported: vk::SurfaceTransformFlagsKHR,
    current: vk::SurfaceTransformFlagsKHR,
) -> vk::SurfaceTransformFlagsKHR {
    if requested.as_raw().count_ones() == 1 && supported.contains(requested) {
        return requested;
    }

    engine_warn!("galaxy3d::present",
        "Surface transform '{:?}' not supported. Selecting '{:?}'.", requested, current);
    current
}

/// Resolve the composite alpha mode
///
/// Like the transform, the request must be a single supported bit. Fails
/// with [`Error::NoCompatibleCompositeAlpha`] when the surface supports none
/// of the known modes.
pub fn choose_composite_alpha(
    requested: vk::CompositeAlphaFlagsKHR,
    supported: vk::CompositeAlphaFlagsKHR,
) -> Result<vk::CompositeAlphaFlagsKHR> {
    if requested.as_raw().count_ones() == 1 && supported.contains(requested) {
        return Ok(requested);
    }

    let chosen = COMPOSITE_ALPHA_PRIORITY
        .iter()
        .copied()
        .find(|alpha| supported.contains(*alpha))
        .ok_or(Error::NoCompatibleCompositeAlpha)?;

    engine_warn!("galaxy3d::present",
        "Composite alpha '{:?}' not supported. Selecting '{:?}'.", requested, chosen);
    Ok(chosen)
}

/// Whether `format_features` allow the chosen format to be used with `usage`
///
/// Only storage usage has a format-feature requirement, including when it is
/// combined with other bits.
pub fn validate_format_feature(
    usage: vk::ImageUsageFlags,
    format_features: vk::FormatFeatureFlags,
) -> bool {
    if usage.contains(vk::ImageUsageFlags::STORAGE) {
        format_features.contains(vk::FormatFeatureFlags::STORAGE_IMAGE)
    } else {
        true
    }
}

fn usage_is_legal(
    usage: vk::ImageUsageFlags,
    supported: vk::ImageUsageFlags,
    format_features: vk::FormatFeatureFlags,
) -> bool {
    !usage.is_empty() && supported.contains(usage) && validate_format_feature(usage, format_features)
}

/// Validate the requested usage flags against the surface and the chosen format
///
/// Flags failing either check are dropped. If nothing is left, the first
/// legal entry of [`IMAGE_USAGE_PRIORITY`] is used instead.
pub fn choose_image_usage(
    requested: &FxHashSet<vk::ImageUsageFlags>,
    supported: vk::ImageUsageFlags,
    format_features: vk::FormatFeatureFlags,
) -> Result<FxHashSet<vk::ImageUsageFlags>> {
    let mut validated = FxHashSet::default();
    for &flag in requested {
        if usage_is_legal(flag, supported, format_features) {
            validated.insert(flag);
        } else {
            engine_warn!("galaxy3d::present",
                "Image usage ({:?}) requested but not supported.", flag);
        }
    }

    if validated.is_empty() {
        if let Some(fallback) = IMAGE_USAGE_PRIORITY
            .iter()
            .copied()
            .find(|&usage| usage_is_legal(usage, supported, format_features))
        {
            validated.insert(fallback);
        }
    }

    if validated.is_empty() {
        return Err(Error::NoCompatibleImageUsage);
    }

    engine_info!("galaxy3d::present",
        "Image usage flags: {:?}", composite_image_usage(&validated));
    Ok(validated)
}

/// Bitwise OR of a usage set
pub fn composite_image_usage(flags: &FxHashSet<vk::ImageUsageFlags>) -> vk::ImageUsageFlags {
    flags
        .iter()
        .fold(vk::ImageUsageFlags::empty(), |acc, &flag| acc | flag)
}

/// Extent in the identity orientation for a given pre-transform
///
/// With a 90 or 270 degree pre-rotation the swapchain keeps the native
/// (unrotated) size, so width and height are swapped.
pub fn native_orientation_extent(
    extent: vk::Extent2D,
    transform: vk::SurfaceTransformFlagsKHR,
) -> vk::Extent2D {
    if transform == vk::SurfaceTransformFlagsKHR::ROTATE_90
        || transform == vk::SurfaceTransformFlagsKHR::ROTATE_270
    {
        vk::Extent2D { width: extent.height, height: extent.width }
    } else {
        extent
    }
}

#[cfg(test)]
#[path = "negotiation_tests.rs"]
mod tests;
