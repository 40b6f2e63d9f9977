use ash::vk;

/// Queue used for graphics, presentation and one-shot transfers
pub struct Queue {
    pub family_index: u32,
    pub handle: vk::Queue,
}

impl Queue {
    pub fn new(
        family_index: u32,
        handle: vk::Queue,
    ) -> Self {
        Self {
            family_index,
            handle,
        }
    }
}

/// Find a queue family that supports graphics and, when `supports_present`
/// says so, presentation to the surface
pub fn find_graphics_family<F>(
    families: &[vk::QueueFamilyProperties],
    supports_present: F,
) -> Option<u32>
where
    F: Fn(u32) -> bool,
{
    families
        .iter()
        .enumerate()
        .position(|(i, family)| {
            family.queue_count > 0
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && supports_present(i as u32)
        })
        .map(|i| i as u32)
}
