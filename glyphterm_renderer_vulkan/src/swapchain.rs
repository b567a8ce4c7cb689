//! Swapchain and surface management
//!
//! Presentation plumbing for the terminal renderer: surface creation, the
//! FIFO swapchain, image acquisition and presentation. Out-of-date results
//! are surfaced as [`Error::SurfaceOutOfDate`] so the renderer can rebuild
//! its presentation resources and retry.

use ash::vk;
use glyphterm_engine::{term_debug, term_err, term_error, term_info, Error, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::context::VulkanContext;

/// Outcome of a present call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Image presented, swapchain still matches the surface.
    Presented,
    /// Image presented but the swapchain no longer matches the surface
    /// exactly; the caller should rebuild before the next frame.
    Suboptimal,
}

/// Surface + swapchain pair, rebuilt together on resize.
pub struct SwapchainBundle {
    context: Arc<VulkanContext>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl SwapchainBundle {
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        context: Arc<VulkanContext>,
        window: &W,
    ) -> Result<Self> {
        unsafe {
            let display_handle = window.display_handle().map_err(|e| {
                term_error!("glyphterm::swapchain", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                term_error!("glyphterm::swapchain", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let surface = ash_window::create_surface(
                &context.entry,
                &context.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                term_error!("glyphterm::swapchain", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader =
                ash::khr::surface::Instance::new(&context.entry, &context.instance);
            let swapchain_loader =
                ash::khr::swapchain::Device::new(&context.instance, &context.device);

            let mut bundle = Self {
                context,
                surface,
                surface_loader,
                swapchain_loader,
                swapchain: vk::SwapchainKHR::null(),
                images: Vec::new(),
                format: vk::Format::UNDEFINED,
                extent: vk::Extent2D::default(),
            };
            bundle.build_swapchain()?;
            Ok(bundle)
        }
    }

    /// Pick the surface format: the first reported format, unless the
    /// surface leaves the choice to us by reporting UNDEFINED.
    fn choose_format(formats: &[vk::SurfaceFormatKHR]) -> (vk::Format, vk::ColorSpaceKHR) {
        match formats.first() {
            Some(f) if f.format != vk::Format::UNDEFINED => (f.format, f.color_space),
            Some(f) => (vk::Format::R8G8B8A8_UNORM, f.color_space),
            None => (vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        }
    }

    fn choose_composite_alpha(
        caps: &vk::SurfaceCapabilitiesKHR,
    ) -> vk::CompositeAlphaFlagsKHR {
        let preferred = [
            vk::CompositeAlphaFlagsKHR::OPAQUE,
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
            vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
            vk::CompositeAlphaFlagsKHR::INHERIT,
        ];
        preferred
            .into_iter()
            .find(|&mode| caps.supported_composite_alpha.contains(mode))
            .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
    }

    fn build_swapchain(&mut self) -> Result<()> {
        unsafe {
            let caps = self
                .surface_loader
                .get_physical_device_surface_capabilities(
                    self.context.physical_device,
                    self.surface,
                )
                .map_err(|e| {
                    term_err!(
                        "glyphterm::swapchain",
                        "Failed to get surface capabilities: {:?}",
                        e
                    )
                })?;

            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.context.physical_device, self.surface)
                .map_err(|e| {
                    term_err!("glyphterm::swapchain", "Failed to query surface formats: {:?}", e)
                })?;
            let (format, color_space) = Self::choose_format(&formats);

            let pre_transform = if caps
                .supported_transforms
                .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
            {
                vk::SurfaceTransformFlagsKHR::IDENTITY
            } else {
                caps.current_transform
            };

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(caps.min_image_count)
                .image_format(format)
                .image_color_space(color_space)
                .image_extent(caps.current_extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(pre_transform)
                .composite_alpha(Self::choose_composite_alpha(&caps))
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    term_err!("glyphterm::swapchain", "Failed to create swapchain: {:?}", e)
                })?;
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }

            self.swapchain = swapchain;
            self.images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    term_err!("glyphterm::swapchain", "Failed to get swapchain images: {:?}", e)
                })?;
            self.format = format;
            self.extent = caps.current_extent;

            term_info!(
                "glyphterm::swapchain",
                "Swapchain created: {} images, {:?}, {}x{}",
                self.images.len(),
                format,
                self.extent.width,
                self.extent.height
            );
            Ok(())
        }
    }

    /// Recreate the swapchain against the current surface state, chaining the
    /// old swapchain so in-flight presents can complete. The caller must have
    /// drained GPU work that uses the old images.
    pub fn recreate(&mut self) -> Result<()> {
        term_debug!("glyphterm::swapchain", "Recreating swapchain");
        self.build_swapchain()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next swapchain image, signaling `semaphore` when it is
    /// ready. Maps ERROR_OUT_OF_DATE_KHR to [`Error::SurfaceOutOfDate`].
    pub fn acquire_next_image(&mut self, semaphore: vk::Semaphore) -> Result<u32> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            ) {
                Ok((image_index, _suboptimal)) => Ok(image_index),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SurfaceOutOfDate),
                Err(e) => Err(term_err!(
                    "glyphterm::swapchain",
                    "Failed to acquire swapchain image: {:?}",
                    e
                )),
            }
        }
    }

    /// Present `image_index`, waiting on `wait_semaphore`. Maps
    /// ERROR_OUT_OF_DATE_KHR to [`Error::SurfaceOutOfDate`] and reports
    /// SUBOPTIMAL_KHR so the caller can rebuild after the fact.
    pub fn present(
        &mut self,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentOutcome> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self
                .swapchain_loader
                .queue_present(self.context.graphics_queue, &present_info)
            {
                Ok(false) => Ok(PresentOutcome::Presented),
                Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SurfaceOutOfDate),
                Err(e) => Err(term_err!(
                    "glyphterm::swapchain",
                    "Failed to present swapchain image: {:?}",
                    e
                )),
            }
        }
    }
}

impl Drop for SwapchainBundle {
    fn drop(&mut self) {
        unsafe {
            self.context.device.device_wait_idle().ok();
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
