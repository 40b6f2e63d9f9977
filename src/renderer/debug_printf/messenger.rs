use std::ffi::{CStr, c_void};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::debug_printf::{LogSink, forward_message};

static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Claim on the one messenger registration allowed per process
struct RegistrationSlot(());

impl RegistrationSlot {
    fn acquire() -> Result<Self> {
        if REGISTERED.swap(true, Ordering::AcqRel) {
            return Err(eyre!("A shader printf messenger is already registered"));
        }
        Ok(Self(()))
    }
}

impl Drop for RegistrationSlot {
    fn drop(&mut self) {
        REGISTERED.store(false, Ordering::Release);
    }
}

/// Scoped registration of the shader printf callback.
///
/// Dropping it unregisters the callback, so it must be dropped before the
/// instance it was created from is destroyed.
pub struct DebugMessenger {
    messenger: vk::DebugUtilsMessengerEXT,
    loader: ash::ext::debug_utils::Instance,
    // Boxed so the address handed to the layer as user data never moves
    _sink: Box<Arc<dyn LogSink>>,
    _slot: RegistrationSlot,
}

impl DebugMessenger {
    pub fn register(
        entry: &ash::Entry,
        instance: &ash::Instance,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let slot = RegistrationSlot::acquire()?;
        let sink = Box::new(sink);
        let user_data = &*sink as *const Arc<dyn LogSink> as *mut c_void;

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = messenger_create_info().user_data(user_data);
        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|e| eyre!("Failed to register shader printf messenger: {}", e))?
        };
        log::debug!("Shader printf messenger registered");

        Ok(Self {
            messenger,
            loader,
            _sink: sink,
            _slot: slot,
        })
    }

    pub fn is_registered() -> bool {
        REGISTERED.load(Ordering::Acquire)
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
        log::debug!("Shader printf messenger unregistered");
    }
}

fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO)
        .message_type(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION)
        .pfn_user_callback(Some(printf_callback))
}

/// Never aborts the Vulkan call that produced the message
unsafe extern "system" fn printf_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || p_user_data.is_null() {
        return vk::FALSE;
    }
    let data = unsafe { &*p_callback_data };
    if data.p_message.is_null() {
        return vk::FALSE;
    }

    let message = unsafe { CStr::from_ptr(data.p_message) }.to_string_lossy();
    let sink = unsafe { &*(p_user_data as *const Arc<dyn LogSink>) };
    forward_message(sink.as_ref(), message_severity, &message);

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::debug_printf::SampleLog;

    #[test]
    fn only_one_registration_slot_at_a_time() {
        let slot = RegistrationSlot::acquire().unwrap();
        assert!(DebugMessenger::is_registered());
        assert!(RegistrationSlot::acquire().is_err());
        drop(slot);
        assert!(!DebugMessenger::is_registered());
        let again = RegistrationSlot::acquire();
        assert!(again.is_ok());
    }

    #[test]
    fn filters_informational_validation_messages() {
        let info = messenger_create_info();
        assert_eq!(info.message_severity, vk::DebugUtilsMessageSeverityFlagsEXT::INFO);
        assert_eq!(info.message_type, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION);
        assert!(info.pfn_user_callback.is_some());
    }

    #[test]
    fn callback_forwards_cleaned_message_and_continues() {
        let log = Arc::new(SampleLog::new(4));
        let sink: Box<Arc<dyn LogSink>> = Box::new(log.clone());
        let message = c"Validation Information: [ WARNING-DEBUG-PRINTF ]\nMy shader print: x=5";
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };

        let result = unsafe {
            printf_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                &*sink as *const Arc<dyn LogSink> as *mut c_void,
            )
        };

        assert_eq!(result, vk::FALSE);
        assert_eq!(log.last().unwrap().text, "My shader print: x=5");
    }

    #[test]
    fn callback_ignores_missing_message() {
        let log = Arc::new(SampleLog::new(4));
        let sink: Box<Arc<dyn LogSink>> = Box::new(log.clone());
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();

        let result = unsafe {
            printf_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                &*sink as *const Arc<dyn LogSink> as *mut c_void,
            )
        };

        assert_eq!(result, vk::FALSE);
        assert!(log.lines().is_empty());
    }
}
