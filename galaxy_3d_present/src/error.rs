//! Error types for the presentation layer
//!
//! Degraded-but-successful negotiations are never errors (they are logged).
//! Only the cases below abort construction of a presentation chain.

use ash::vk;
use std::fmt;

/// Result type for presentation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Presentation errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan loader, window handles, etc.)
    BackendError(String),

    /// Initialization failed (instance, device, surface)
    InitializationFailed(String),

    /// The surface reports no formats at all
    NoSurfaceFormats,

    /// No composite alpha mode is supported by the surface
    NoCompatibleCompositeAlpha,

    /// No image usage is both supported by the surface and compatible with the chosen format
    NoCompatibleImageUsage,

    /// The native swapchain creation call failed
    SwapchainCreationFailed(vk::Result),

    /// Acquiring the next swapchain image failed with a non-recoverable status
    AcquireFailed(vk::Result),

    /// A capability or image query failed
    QueryFailed {
        what: &'static str,
        result: vk::Result,
    },

    /// No memory type matches the requested type bits and property flags
    MemoryTypeNotFound {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::NoSurfaceFormats => write!(f, "Surface reports no supported formats"),
            Error::NoCompatibleCompositeAlpha => write!(f, "No compatible composite alpha found"),
            Error::NoCompatibleImageUsage => write!(f, "No compatible image usage found"),
            Error::SwapchainCreationFailed(result) => {
                write!(f, "Cannot create swapchain: {:?}", result)
            }
            Error::AcquireFailed(result) => {
                write!(f, "Failed to acquire next swapchain image: {:?}", result)
            }
            Error::QueryFailed { what, result } => {
                write!(f, "Failed to query {}: {:?}", what, result)
            }
            Error::MemoryTypeNotFound { type_bits, flags } => write!(
                f,
                "Could not find a matching memory type (bits {:#x}, flags {:?})",
                type_bits, flags
            ),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// The native result code attached to this error, if any
    pub fn vk_result(&self) -> Option<vk::Result> {
        match self {
            Error::SwapchainCreationFailed(result) => Some(*result),
            Error::AcquireFailed(result) => Some(*result),
            Error::QueryFailed { result, .. } => Some(*result),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
