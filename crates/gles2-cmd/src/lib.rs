//! Wire protocol for the GLES2 command buffer.
//!
//! The client serializes GL calls as fixed-layout command structs into a shared ring of 4-byte
//! entries; the service (`gles2-decoder`) validates and executes them. Everything in this crate is
//! plain data shared by both sides.

/// Declares a contiguous opcode range: an id enum plus the [`cmd::Command`] impls tying each
/// struct to its opcode, name and arity.
macro_rules! command_set {
    ($(#[$meta:meta])* $id:ident = $first:expr; { $($name:ident: $flags:ident,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $id {
            $($name,)*
        }

        impl $id {
            pub const ALL: &'static [$id] = &[$(Self::$name,)*];
            pub const FIRST: u32 = $first;

            pub fn from_u32(opcode: u32) -> Option<Self> {
                let index = opcode.checked_sub(Self::FIRST)?;
                Self::ALL.get(index as usize).copied()
            }

            pub fn opcode(self) -> u32 {
                Self::FIRST + self as u32
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }

            pub fn info(self) -> $crate::cmd::CommandInfo {
                match self {
                    $(Self::$name => <$name as $crate::cmd::Command>::info(),)*
                }
            }
        }

        $(
            impl $crate::cmd::Command for $name {
                const OPCODE: u32 = $first + $id::$name as u32;
                const NAME: &'static str = stringify!($name);
                const ARG_FLAGS: $crate::cmd::ArgFlags = $crate::cmd::ArgFlags::$flags;
            }
        )*
    };
}

/// Implements `Pod` for commands without arguments, which the derive does not cover.
macro_rules! empty_command {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            #[derive(Debug, Default, Copy, Clone, PartialEq)]
            pub struct $name {}

            // SAFETY: zero-sized with no fields.
            unsafe impl bytemuck::Zeroable for $name {}
            // SAFETY: zero-sized with no fields.
            unsafe impl bytemuck::Pod for $name {}
        )*
    };
}

pub mod cmd;
pub mod common;
pub mod gl;
pub mod gles2;
pub mod util;
pub mod writer;

pub use cmd::{
    ArgFlags, CmdPacket, CmdParseError, CmdStream, CmdWord, Command, CommandHeader, CommandInfo,
    ENTRY_SIZE, FIRST_GLES2_COMMAND,
};
pub use common::CommonCommandId;
pub use gles2::CommandId;
pub use writer::CmdWriter;
