use std::sync::Arc;
use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;

/// Shader module that only needs to live until its pipeline is created
pub struct ShaderModule {
    pub module: vk::ShaderModule,
    device: Arc<ash::Device>,
}

impl ShaderModule {
    pub fn new(code: &[u32], device: Arc<ash::Device>) -> Result<Self> {
        let shader_module_info = vk::ShaderModuleCreateInfo::default()
            .code(code);

        let module = unsafe {
            device
                .create_shader_module(&shader_module_info, None)
                .wrap_err("Failed to create shader module")?
        };

        Ok(Self { module, device })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
