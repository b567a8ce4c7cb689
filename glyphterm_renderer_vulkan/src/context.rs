//! VulkanContext - shared GPU state for all renderer resources
//!
//! Owns the instance, logical device, graphics queue and memory allocator.
//! Every GPU-side object in this crate holds an `Arc<VulkanContext>`, so the
//! device outlives all resources created from it and is destroyed last.

use ash::vk;
use glyphterm_engine::{term_debug, term_error, term_info, term_warn, Error, RendererConfig, Result};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::HasDisplayHandle;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

/// Shared GPU context for all Vulkan resources.
///
/// Shared via `Arc` by swapchain, buffers, the glyph atlas and the sync pool
/// to avoid duplicating device/allocator/queue references in each resource.
pub struct VulkanContext {
    /// Vulkan entry point (kept alive for surface loader creation)
    pub entry: ash::Entry,

    /// Vulkan instance
    pub instance: ash::Instance,

    /// Selected physical device (first enumerated)
    pub physical_device: vk::PhysicalDevice,

    /// Device limits of the selected physical device
    pub limits: vk::PhysicalDeviceLimits,

    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety).
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed.
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission and presentation
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Whether VK_EXT_mesh_shader was found and enabled on the device
    pub mesh_shader_enabled: bool,

    /// Debug utils loader (for validation layers)
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if data.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        unsafe { std::ffi::CStr::from_ptr((*data).p_message) }.to_string_lossy()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        term_error!("glyphterm::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        term_warn!("glyphterm::validation", "{}", message);
    } else {
        term_debug!("glyphterm::validation", "{}", message);
    }

    vk::FALSE
}

impl VulkanContext {
    /// Create the instance, pick the first physical device, and create the
    /// logical device with synchronization2 and maintenance4 enabled.
    ///
    /// VK_EXT_mesh_shader is enabled when the device advertises it; the
    /// caller checks [`VulkanContext::mesh_shader_enabled`] to pick the draw
    /// path.
    pub fn new<W: HasDisplayHandle>(window: &W, config: &RendererConfig) -> Result<Arc<Self>> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                term_error!("glyphterm::context", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Glyphterm Application")
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Glyphterm")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                term_error!("glyphterm::context", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        term_error!(
                            "glyphterm::context",
                            "Failed to get required extensions: {}",
                            e
                        );
                        Error::InitializationFailed(format!(
                            "Failed to get required extensions: {}",
                            e
                        ))
                    })?
                    .to_vec();

            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                term_error!("glyphterm::context", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(debug_callback));
                let messenger = loader
                    .create_debug_utils_messenger(&messenger_info, None)
                    .map_err(|e| {
                        term_error!(
                            "glyphterm::context",
                            "Failed to create debug messenger: {:?}",
                            e
                        );
                        Error::InitializationFailed(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        ))
                    })?;
                (Some(loader), Some(messenger))
            } else {
                (None, None)
            };

            // First enumerated device; glyph rendering has no preference
            // between integrated and discrete GPUs.
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                term_error!(
                    "glyphterm::context",
                    "Failed to enumerate physical devices: {:?}",
                    e
                );
                Error::InitializationFailed(format!(
                    "Failed to enumerate physical devices: {:?}",
                    e
                ))
            })?;
            let physical_device = physical_devices.into_iter().next().ok_or_else(|| {
                term_error!("glyphterm::context", "No Vulkan-capable GPU found");
                Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
            })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = std::ffi::CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned();
            term_info!("glyphterm::context", "Using GPU: {}", device_name);

            // First queue family with graphics support; it also presents on
            // every driver this renderer targets.
            let queue_families =
                instance.get_physical_device_queue_family_properties(physical_device);
            let graphics_queue_family = queue_families
                .iter()
                .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32)
                .ok_or_else(|| {
                    term_error!("glyphterm::context", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            let mesh_shader_available = instance
                .enumerate_device_extension_properties(physical_device)
                .map(|exts| {
                    exts.iter().any(|ext| {
                        std::ffi::CStr::from_ptr(ext.extension_name.as_ptr())
                            == ash::ext::mesh_shader::NAME
                    })
                })
                .unwrap_or(false);

            let queue_priorities = [1.0f32];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];

            let mut device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
            if mesh_shader_available {
                device_extension_names.push(ash::ext::mesh_shader::NAME.as_ptr());
            }

            let mut sync2_features =
                vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);
            let mut maintenance4_features =
                vk::PhysicalDeviceMaintenance4Features::default().maintenance4(true);
            let mut mesh_shader_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::default()
                .task_shader(true)
                .mesh_shader(true);

            let mut device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut sync2_features)
                .push_next(&mut maintenance4_features);
            if mesh_shader_available {
                device_create_info = device_create_info.push_next(&mut mesh_shader_features);
            }

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    term_error!("glyphterm::context", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                term_error!("glyphterm::context", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            term_info!(
                "glyphterm::context",
                "Device created (queue family {}, mesh shaders: {})",
                graphics_queue_family,
                mesh_shader_available
            );

            Ok(Arc::new(Self {
                entry,
                instance,
                physical_device,
                limits: properties.limits,
                device,
                allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
                graphics_queue,
                graphics_queue_family,
                mesh_shader_enabled: mesh_shader_available,
                debug_utils_loader,
                debug_messenger,
            }))
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            // The allocator borrows the device; free it first.
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            if let (Some(loader), Some(messenger)) =
                (self.debug_utils_loader.as_ref(), self.debug_messenger.take())
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        term_debug!("glyphterm::context", "Vulkan context destroyed");
    }
}
