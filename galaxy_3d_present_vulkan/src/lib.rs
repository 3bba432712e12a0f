/*!
# Galaxy 3D Present - Vulkan Backend

Vulkan implementation of the `PresentationDevice` trait from `galaxy_3d_present`,
using the Ash library for Vulkan bindings.

```no_run
use std::sync::Arc;
use galaxy_3d_present::galaxy3d::present::{PresentationChain, PresentationPreferences};
use galaxy_3d_present_vulkan::{VulkanContext, VulkanContextConfig, VulkanPresentationDevice};

# fn run<W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle>(window: &W)
#     -> galaxy_3d_present::galaxy3d::Result<()> {
let context = Arc::new(VulkanContext::new(window, VulkanContextConfig::default())?);
let surface = context.surface();
let device = Arc::new(VulkanPresentationDevice::new(context));

let chain = PresentationChain::new(device, surface, PresentationPreferences::default())?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_presentation_device;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_context::{VulkanContext, VulkanContextConfig};
pub use vulkan_presentation_device::VulkanPresentationDevice;

#[cfg(feature = "vulkan-validation")]
pub use debug::{validation_stats, ValidationStats};
