use std::ffi::{CStr, c_char, c_void};
use ash::vk;

pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

const GPU_BASED_DEBUG_PRINTF: &CStr = c"GPU_BASED_DEBUG_PRINTF";

/// Options handed to the validation layer before the instance is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintfLayerSettings {
    /// Also print the layer's own metadata for each message
    pub verbose: bool,
    /// Let the layer write to stdout on its own; off because the messenger
    /// already forwards everything to the log
    pub to_stdout: bool,
    /// Bytes reserved on the device for printf output per submission
    pub buffer_size: i32,
}

impl Default for PrintfLayerSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            to_stdout: false,
            buffer_size: 1024,
        }
    }
}

/// Backing storage for the values the `vk::LayerSettingEXT` entries point at
pub struct LayerSettingValues {
    validate_gpu_based: [*const c_char; 1],
    printf_verbose: vk::Bool32,
    printf_to_stdout: vk::Bool32,
    printf_buffer_size: i32,
}

impl PrintfLayerSettings {
    pub fn values(&self) -> LayerSettingValues {
        LayerSettingValues {
            validate_gpu_based: [GPU_BASED_DEBUG_PRINTF.as_ptr()],
            printf_verbose: self.verbose.into(),
            printf_to_stdout: self.to_stdout.into(),
            printf_buffer_size: self.buffer_size,
        }
    }
}

impl LayerSettingValues {
    pub fn settings(&self) -> [vk::LayerSettingEXT<'_>; 4] {
        [
            setting(
                c"validate_gpu_based",
                vk::LayerSettingTypeEXT::STRING,
                self.validate_gpu_based.len() as u32,
                self.validate_gpu_based.as_ptr() as *const c_void,
            ),
            setting(
                c"printf_verbose",
                vk::LayerSettingTypeEXT::BOOL32,
                1,
                &self.printf_verbose as *const vk::Bool32 as *const c_void,
            ),
            setting(
                c"printf_to_stdout",
                vk::LayerSettingTypeEXT::BOOL32,
                1,
                &self.printf_to_stdout as *const vk::Bool32 as *const c_void,
            ),
            setting(
                c"printf_buffer_size",
                vk::LayerSettingTypeEXT::INT32,
                1,
                &self.printf_buffer_size as *const i32 as *const c_void,
            ),
        ]
    }
}

fn setting<'a>(
    name: &'static CStr,
    ty: vk::LayerSettingTypeEXT,
    value_count: u32,
    p_values: *const c_void,
) -> vk::LayerSettingEXT<'a> {
    vk::LayerSettingEXT {
        p_layer_name: VALIDATION_LAYER_NAME.as_ptr(),
        p_setting_name: name.as_ptr(),
        ty,
        value_count,
        p_values,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(settings: &'a [vk::LayerSettingEXT<'a>], name: &str) -> &'a vk::LayerSettingEXT<'a> {
        settings
            .iter()
            .find(|s| unsafe { CStr::from_ptr(s.p_setting_name) }.to_str() == Ok(name))
            .unwrap_or_else(|| panic!("missing setting {name}"))
    }

    #[test]
    fn defaults_enable_gpu_printf_without_stdout_mirroring() {
        let values = PrintfLayerSettings::default().values();
        let settings = values.settings();

        for s in &settings {
            assert_eq!(unsafe { CStr::from_ptr(s.p_layer_name) }, VALIDATION_LAYER_NAME);
            assert_eq!(s.value_count, 1);
        }

        let gpu_based = find(&settings, "validate_gpu_based");
        assert_eq!(gpu_based.ty, vk::LayerSettingTypeEXT::STRING);
        let first = unsafe { *(gpu_based.p_values as *const *const c_char) };
        assert_eq!(unsafe { CStr::from_ptr(first) }, c"GPU_BASED_DEBUG_PRINTF");

        let verbose = find(&settings, "printf_verbose");
        assert_eq!(verbose.ty, vk::LayerSettingTypeEXT::BOOL32);
        assert_eq!(unsafe { *(verbose.p_values as *const vk::Bool32) }, vk::FALSE);

        let to_stdout = find(&settings, "printf_to_stdout");
        assert_eq!(unsafe { *(to_stdout.p_values as *const vk::Bool32) }, vk::FALSE);

        let buffer_size = find(&settings, "printf_buffer_size");
        assert_eq!(buffer_size.ty, vk::LayerSettingTypeEXT::INT32);
        assert_eq!(unsafe { *(buffer_size.p_values as *const i32) }, 1024);
    }

    #[test]
    fn custom_buffer_size_is_forwarded() {
        let values = PrintfLayerSettings {
            buffer_size: 4096,
            verbose: true,
            ..Default::default()
        }
        .values();
        let settings = values.settings();
        assert_eq!(unsafe { *(find(&settings, "printf_buffer_size").p_values as *const i32) }, 4096);
        assert_eq!(unsafe { *(find(&settings, "printf_verbose").p_values as *const vk::Bool32) }, vk::TRUE);
    }
}
