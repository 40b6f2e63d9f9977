use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Raw GPU-visible address of a buffer's contents.
///
/// Shaders use it to reach a buffer without a descriptor. On the host it is an
/// opaque value: it cannot be dereferenced and it never owns the memory it
/// points to. The buffer that handed it out must outlive every frame that
/// reads it.
#[repr(transparent)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    pub const NULL: Self = Self(0);

    pub fn from_raw(address: vk::DeviceAddress) -> Self {
        Self(address)
    }

    pub fn raw(self) -> vk::DeviceAddress {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Byte layout of one field of a shared structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

/// Implemented by every structure declared in `shaders/device_host.rs`
pub trait SharedLayout: Pod {
    const NAME: &'static str;
    const FIELDS: &'static [FieldLayout];

    fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

macro_rules! shared_structs {
    ($(
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident : $ty:ident),* $(,)?
        }
    )*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            #[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
            pub struct $name {
                $(pub $field: $ty,)*
            }

            impl SharedLayout for $name {
                const NAME: &'static str = stringify!($name);
                const FIELDS: &'static [FieldLayout] = &[
                    $(FieldLayout {
                        name: stringify!($field),
                        offset: std::mem::offset_of!($name, $field),
                        size: std::mem::size_of::<$ty>(),
                    },)*
                ];
            }

            // The GLSL side packs members back to back (scalar block layout),
            // so the Rust side must not insert any padding of its own.
            const _: () = assert!(
                std::mem::size_of::<$name>() == 0 $(+ std::mem::size_of::<$ty>())*,
                concat!(stringify!($name), " contains implicit padding"),
            );
            const _: () = assert!(
                std::mem::size_of::<$name>() % 8 == 0,
                concat!(stringify!($name), " must be padded to a multiple of 8 bytes"),
            );
        )*

        /// Name, field table and size of every shared structure, in declaration order
        pub const SHARED_LAYOUTS: &[(&str, &[FieldLayout], usize)] = &[
            $((stringify!($name), <$name as SharedLayout>::FIELDS, std::mem::size_of::<$name>()),)*
        ];
    };
}

include!("../../shaders/device_host.rs");

// Vulkan only guarantees 128 bytes of push constant space
const _: () = assert!(std::mem::size_of::<PushConstant>() <= 128);
