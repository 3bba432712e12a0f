/*!
# Galaxy 3D Present

Presentation-chain (swapchain) management for the Galaxy 3D engine.

A [`PresentationChain`](galaxy3d::present::PresentationChain) reconciles what
the application asks for with what the surface and device actually support,
one axis at a time, then creates the native swapchain and its images. Requests
that cannot be honored are degraded to the closest supported value and logged.

## Architecture

- **PresentationDevice**: native entry points a chain needs (queries, creation, acquisition)
- **PresentationPreferences / ChainUpdate**: requested configuration and recreation deltas
- **negotiation**: pure per-axis selection functions
- **PresentationChain**: the negotiated swapchain, immutable once built

The Vulkan implementation of `PresentationDevice` lives in `galaxy_3d_present_vulkan`.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
mod capabilities;
mod preferences;
mod negotiation;
mod device;
mod chain;
mod physical_device;

#[cfg(test)]
mod mock_device;
#[cfg(test)]
mod test_logger;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine services (global logger)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Presentation sub-module
    pub mod present {
        pub use crate::capabilities::{AppliedCompression, SupportedCapabilities, SurfaceFormatCompression};
        pub use crate::chain::{OwnedSwapchain, PresentationChain, ResolvedProperties};
        pub use crate::device::{
            AcquireStatus, CompressionControl, PresentationDevice, SwapchainDescriptor,
            COMPRESSION_CONTROL_SWAPCHAIN_EXTENSION, SURFACE_CAPABILITIES_2_EXTENSION,
        };
        pub use crate::preferences::{ChainUpdate, PresentationPreferences};
    }

    // Per-axis negotiation functions
    pub mod negotiation {
        pub use crate::negotiation::*;
    }

    // Physical-device lookups
    pub mod physical_device {
        pub use crate::physical_device::*;
    }
}

// Re-export the Vulkan bindings used throughout the public API
pub use ash;
