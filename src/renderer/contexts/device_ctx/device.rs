use std::ffi::{c_char, CStr};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use ash::vk;
use color_eyre::eyre::{eyre, OptionExt};
use color_eyre::Result;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use crate::renderer::contexts::device_ctx::instance::RenderInstance;
use crate::renderer::contexts::device_ctx::queue::{self, Queue};
use crate::renderer::contexts::device_ctx::target::Surface;
use crate::renderer::contexts::device_ctx::transfer_ctx::TransferContext;

/// Logical device with its single graphics/present queue and memory allocator
pub struct RenderDevice {
    pub logical: Arc<ash::Device>,
    pub physical: vk::PhysicalDevice,
    pub graphics_queue: Arc<Queue>,

    // Both hold device objects, so they go before the device itself
    memory_allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    transfer_context: ManuallyDrop<TransferContext>,

    instance: ash::Instance,
}

impl RenderDevice {
    pub fn new(
        ins: &RenderInstance,
        surface: &Surface,
    ) -> Result<Self> {
        let (physical_device, family_index) =
            Self::select_physical_device(&ins.instance, surface)?;
        let supported = SupportedFeatures::query(&ins.instance, physical_device);

        let logical_device = Self::create_logical_device(
            &ins.instance,
            physical_device,
            family_index,
            &supported,
        )?;
        let graphics_queue = unsafe {
            let queue = logical_device.get_device_queue(family_index, 0);
            Arc::new(Queue::new(family_index, queue))
        };

        let memory_allocator = Allocator::new(&AllocatorCreateDesc {
            instance: ins.instance.clone(),
            device: logical_device.clone(),
            physical_device,
            debug_settings: gpu_allocator::AllocatorDebugSettings {
                log_memory_information: true,
                log_leaks_on_shutdown: true,
                store_stack_traces: false,
                log_allocations: false,
                log_frees: false,
                log_stack_traces: false,
            },
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        });
        let memory_allocator = match memory_allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { logical_device.destroy_device(None) };
                return Err(e.into());
            }
        };

        let logical_device = Arc::new(logical_device);
        let transfer_context = match TransferContext::new(
            graphics_queue.clone(),
            logical_device.clone(),
        ) {
            Ok(ctx) => ctx,
            Err(e) => {
                drop(memory_allocator);
                unsafe { logical_device.destroy_device(None) };
                return Err(e);
            }
        };

        Ok(Self {
            logical: logical_device,
            physical: physical_device,
            graphics_queue,

            memory_allocator: ManuallyDrop::new(Arc::new(Mutex::new(memory_allocator))),
            transfer_context: ManuallyDrop::new(transfer_context),

            instance: ins.instance.clone(),
        })
    }

    pub fn memory_allocator(&self) -> Arc<Mutex<Allocator>> {
        Arc::clone(&*self.memory_allocator)
    }

    pub fn transfer_context(&self) -> &TransferContext {
        &self.transfer_context
    }

    pub fn format_features(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical, format)
        }
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.logical.device_wait_idle()? };
        Ok(())
    }

    fn select_physical_device(
        instance: &ash::Instance,
        surface: &Surface,
    ) -> Result<(vk::PhysicalDevice, u32)> {
        let devices = unsafe { instance.enumerate_physical_devices()? };

        devices
            .into_iter()
            .filter(|device| {
                let props = unsafe { instance.get_physical_device_properties(*device) };
                let name = props
                    .device_name_as_c_str()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                if props.api_version < vk::API_VERSION_1_3 {
                    log::debug!("Skipping {}: Vulkan 1.3 not supported", name);
                    return false;
                }
                if let Some(ext) = Self::missing_extension(instance, *device) {
                    log::debug!("Skipping {}: device extension {:?} not supported", name, ext);
                    return false;
                }
                let missing = SupportedFeatures::query(instance, *device).missing();
                if !missing.is_empty() {
                    log::debug!("Skipping {}: missing features {:?}", name, missing);
                    return false;
                }
                true
            })
            .filter_map(|device| {
                let families = unsafe {
                    instance.get_physical_device_queue_family_properties(device)
                };
                queue::find_graphics_family(&families, |index| {
                    surface.supports_present(device, index)
                })
                .map(|family| (device, family))
            })
            .min_by_key(|(device, _)| {
                let props = unsafe { instance.get_physical_device_properties(*device) };
                device_type_rank(props.device_type)
            })
            .map(|(device, family)| {
                let props = unsafe { instance.get_physical_device_properties(device) };
                if let Ok(name) = props.device_name_as_c_str() {
                    log::info!("Using physical device {:?}", name);
                }
                (device, family)
            })
            .ok_or_eyre("No suitable physical device found")
    }

    fn missing_extension(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
    ) -> Option<&'static CStr> {
        let supported = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .unwrap_or_default()
        };
        Self::get_required_device_extensions()
            .into_iter()
            .find(|required| {
                !supported
                    .iter()
                    .filter_map(|ext| ext.extension_name_as_c_str().ok())
                    .any(|name| name == *required)
            })
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        supported: &SupportedFeatures,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos = [
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family_index)
                .queue_priorities(&queue_priorities),
        ];

        let enabled_extension_names = Self::get_required_device_extensions()
            .iter()
            .map(|ext| ext.as_ptr())
            .collect::<Vec<*const c_char>>();

        // The printf instrumentation writes from vertex and fragment stages
        let features = vk::PhysicalDeviceFeatures::default()
            .shader_int64(true)
            .fragment_stores_and_atomics(supported.fragment_stores_and_atomics)
            .vertex_pipeline_stores_and_atomics(supported.vertex_pipeline_stores_and_atomics);
        let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default()
            .buffer_device_address(true)
            .scalar_block_layout(true);
        let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .features(features)
            .push_next(&mut vulkan12_features)
            .push_next(&mut vulkan13_features);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&enabled_extension_names)
            .push_next(&mut features2);

        unsafe {
            instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| eyre!("Failed to create logical device: {}", e))
        }
    }

    fn get_required_device_extensions() -> Vec<&'static CStr> {
        vec![
            ash::khr::swapchain::NAME,

            #[cfg(target_os = "macos")]
            ash::khr::portability_subset::NAME,
        ]
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.logical.device_wait_idle() {
                log::error!("Failed to wait for device idle: {}", e);
            }
            ManuallyDrop::drop(&mut self.transfer_context);
            if Arc::strong_count(&*self.memory_allocator) > 1 {
                log::error!("Memory allocator outlives the device");
            }
            ManuallyDrop::drop(&mut self.memory_allocator);
            self.logical.destroy_device(None);
        }
    }
}

/// Device features the renderer depends on, as reported by the driver
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SupportedFeatures {
    pub buffer_device_address: bool,
    pub scalar_block_layout: bool,
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
    pub shader_int64: bool,
    pub fragment_stores_and_atomics: bool,
    pub vertex_pipeline_stores_and_atomics: bool,
}

impl SupportedFeatures {
    pub fn query(instance: &ash::Instance, device: vk::PhysicalDevice) -> Self {
        let mut vulkan12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut vulkan13 = vk::PhysicalDeviceVulkan13Features::default();
        let core = {
            let mut features2 = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut vulkan12)
                .push_next(&mut vulkan13);
            unsafe { instance.get_physical_device_features2(device, &mut features2) };
            features2.features
        };

        Self {
            buffer_device_address: vulkan12.buffer_device_address == vk::TRUE,
            scalar_block_layout: vulkan12.scalar_block_layout == vk::TRUE,
            dynamic_rendering: vulkan13.dynamic_rendering == vk::TRUE,
            synchronization2: vulkan13.synchronization2 == vk::TRUE,
            shader_int64: core.shader_int64 == vk::TRUE,
            fragment_stores_and_atomics: core.fragment_stores_and_atomics == vk::TRUE,
            vertex_pipeline_stores_and_atomics: core.vertex_pipeline_stores_and_atomics == vk::TRUE,
        }
    }

    /// Names of required features the device lacks. Stores and atomics are
    /// optional and never reported.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.buffer_device_address, "bufferDeviceAddress"),
            (self.scalar_block_layout, "scalarBlockLayout"),
            (self.dynamic_rendering, "dynamicRendering"),
            (self.synchronization2, "synchronization2"),
            (self.shader_int64, "shaderInt64"),
        ]
        .into_iter()
        .filter(|(supported, _)| !supported)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Lower is preferred
fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 3,
        vk::PhysicalDeviceType::OTHER => 4,
        _ => 5,
    }
}
