use std::ffi::{c_char, CStr};
use std::sync::Arc;
use ash::vk;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;
use crate::renderer::contexts::device_ctx::target::Surface;
use crate::renderer::debug_printf::{DebugMessenger, LogSink, PrintfLayerSettings, VALIDATION_LAYER_NAME};

/// Initializes Vulkan and keeps the Vulkan instance alive.
///
/// When the validation layer is present it is configured for GPU printf and a
/// [`DebugMessenger`] forwards the prints to the log sink.
pub struct RenderInstance {
    messenger: Option<DebugMessenger>,
    pub instance: ash::Instance,
    pub entry: ash::Entry,
}

impl RenderInstance {
    pub fn new(
        window: &Window,
        printf: Option<PrintfLayerSettings>,
        printf_required: bool,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let printf = match printf {
            Some(settings) => {
                let support = Self::layer_support(&entry)?;
                Self::printf_usable(support, printf_required)?.then_some(settings)
            }
            None => None,
        };

        let instance = Self::create_instance(&entry, window, printf.as_ref())?;

        let messenger = if printf.is_some() {
            match DebugMessenger::register(&entry, &instance, sink) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            messenger,
            instance,
            entry,
        })
    }

    pub fn printf_enabled(&self) -> bool {
        self.messenger.is_some()
    }

    pub fn create_surface(&self, window: &Window) -> Result<Surface> {
        let surface = unsafe {
            ash_window::create_surface(
                &self.entry,
                &self.instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?
        };
        let loader = ash::khr::surface::Instance::new(&self.entry, &self.instance);
        Ok(Surface::new(surface, loader))
    }

    fn create_instance(
        entry: &ash::Entry,
        window: &Window,
        printf: Option<&PrintfLayerSettings>,
    ) -> Result<ash::Instance> {
        let application_info = vk::ApplicationInfo::default()
            .application_name(c"shader-printf")
            .api_version(vk::API_VERSION_1_3);

        let enabled_layer_names = if printf.is_some() {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            Vec::new()
        };
        let enabled_extension_names = Self::get_required_instance_extensions(
            window,
            printf.is_some(),
        )?
            .iter()
            .map(|ext| ext.as_ptr())
            .collect::<Vec<*const c_char>>();

        // The values must outlive instance creation
        let setting_values = printf.map(PrintfLayerSettings::values);
        let settings = setting_values.as_ref().map(|values| values.settings());
        let mut layer_settings_info = vk::LayerSettingsCreateInfoEXT::default()
            .settings(settings.as_ref().map_or(&[][..], |s| s.as_slice()));

        let mut instance_info = vk::InstanceCreateInfo::default()
            .application_info(&application_info)
            .enabled_layer_names(&enabled_layer_names)
            .enabled_extension_names(&enabled_extension_names);
        if settings.is_some() {
            instance_info = instance_info.push_next(&mut layer_settings_info);
        }

        #[cfg(target_os = "macos")]
        let instance_info = instance_info
            .flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR);

        let instance = unsafe { entry.create_instance(&instance_info, None)? };
        log::info!(
            "Vulkan instance created (shader printf {})",
            if printf.is_some() { "on" } else { "off" },
        );
        Ok(instance)
    }

    fn get_required_instance_extensions(
        window: &Window,
        printf: bool,
    ) -> Result<Vec<&'static CStr>> {
        let mut exts = ash_window::enumerate_required_extensions(
            window.display_handle()?.as_raw()
        )?
            .iter()
            .map(|ext| unsafe {
                CStr::from_ptr(*ext)
            })
            .collect::<Vec<_>>();

        if printf {
            exts.push(ash::ext::debug_utils::NAME);
            exts.push(ash::ext::layer_settings::NAME);
        }

        #[cfg(target_os = "macos")]
        {
            exts.push(ash::khr::portability_enumeration::NAME);
            exts.push(ash::khr::get_physical_device_properties2::NAME);
        }

        Ok(exts)
    }

    fn layer_support(entry: &ash::Entry) -> Result<LayerSupport> {
        if !Self::validation_layer_supported(entry)? {
            return Ok(LayerSupport::Missing);
        }
        let layer_extensions = Self::layer_extensions(entry)?;
        if Self::layer_provides(&layer_extensions, ash::ext::layer_settings::NAME) {
            Ok(LayerSupport::Ready)
        } else {
            Ok(LayerSupport::NoLayerSettings)
        }
    }

    /// Whether printf can be switched on. Without it the sample either stops
    /// or, when printf is optional, runs and reports printf as unavailable.
    fn printf_usable(support: LayerSupport, required: bool) -> Result<bool> {
        let problem = match support {
            LayerSupport::Ready => return Ok(true),
            LayerSupport::Missing => "is not installed",
            LayerSupport::NoLayerSettings => "does not provide VK_EXT_layer_settings",
        };
        if required {
            return Err(eyre!(
                "Validation layer {:?} {}, shader printf cannot be enabled \
                 (pass --printf-optional to run without it)",
                VALIDATION_LAYER_NAME,
                problem,
            ));
        }
        log::warn!(
            "Validation layer {:?} {}, shader printf output is disabled",
            VALIDATION_LAYER_NAME,
            problem,
        );
        Ok(false)
    }

    fn layer_provides(layer_extensions: &[String], name: &CStr) -> bool {
        name.to_str()
            .map(|name| layer_extensions.iter().any(|ext| ext == name))
            .unwrap_or(false)
    }

    fn layer_extensions(entry: &ash::Entry) -> Result<Vec<String>> {
        let props = unsafe {
            entry.enumerate_instance_extension_properties(Some(VALIDATION_LAYER_NAME))?
        };
        Ok(props
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn validation_layer_supported(entry: &ash::Entry) -> Result<bool> {
        let supported_layers = unsafe { entry.enumerate_instance_layer_properties()? };
        Ok(supported_layers
            .iter()
            .filter_map(|props| props.layer_name_as_c_str().ok())
            .any(|name| name == VALIDATION_LAYER_NAME))
    }
}

/// What the installed validation layer offers for shader printf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerSupport {
    Missing,
    /// Too old to accept the printf settings
    NoLayerSettings,
    Ready,
}

impl Drop for RenderInstance {
    fn drop(&mut self) {
        // The callback must be gone before the instance it belongs to
        drop(self.messenger.take());
        debug_assert!(!DebugMessenger::is_registered());
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_extension_lookup_matches_exact_names() {
        let exts = vec![
            "VK_EXT_debug_report".to_string(),
            "VK_EXT_layer_settings".to_string(),
        ];
        assert!(RenderInstance::layer_provides(&exts, ash::ext::layer_settings::NAME));
        assert!(!RenderInstance::layer_provides(&exts, ash::ext::debug_utils::NAME));
        assert!(!RenderInstance::layer_provides(&[], ash::ext::layer_settings::NAME));
    }

    #[test]
    fn printf_needs_a_layer_that_takes_settings() {
        assert!(RenderInstance::printf_usable(LayerSupport::Ready, true).unwrap());
        assert!(RenderInstance::printf_usable(LayerSupport::Ready, false).unwrap());

        let err = RenderInstance::printf_usable(LayerSupport::NoLayerSettings, true).unwrap_err();
        assert!(err.to_string().contains("VK_EXT_layer_settings"));
        assert!(RenderInstance::printf_usable(LayerSupport::Missing, true).is_err());
    }

    #[test]
    fn optional_printf_degrades_to_disabled() {
        assert!(!RenderInstance::printf_usable(LayerSupport::NoLayerSettings, false).unwrap());
        assert!(!RenderInstance::printf_usable(LayerSupport::Missing, false).unwrap());
    }
}
