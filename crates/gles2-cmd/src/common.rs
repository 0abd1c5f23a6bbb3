//! Commands shared by every command-buffer client, independent of GL: flow control and buckets.

use bytemuck::{Pod, Zeroable};

empty_command!(Noop);

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SetToken {
    pub token: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SetBucketSize {
    pub bucket_id: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SetBucketData {
    pub bucket_id: u32,
    pub offset: u32,
    pub size: u32,
    pub shared_memory_id: u32,
    pub shared_memory_offset: u32,
}

/// Followed by `size` bytes of inline data.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SetBucketDataImmediate {
    pub bucket_id: u32,
    pub offset: u32,
    pub size: u32,
}

/// Writes the bucket size as a `u32` into shared memory.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GetBucketSize {
    pub bucket_id: u32,
    pub shared_memory_id: u32,
    pub shared_memory_offset: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GetBucketData {
    pub bucket_id: u32,
    pub offset: u32,
    pub size: u32,
    pub shared_memory_id: u32,
    pub shared_memory_offset: u32,
}

command_set! {
    /// Opcodes of the common command set, starting at 0.
    CommonCommandId = 0; {
        Noop: AtLeastN,
        SetToken: Fixed,
        SetBucketSize: Fixed,
        SetBucketData: Fixed,
        SetBucketDataImmediate: AtLeastN,
        GetBucketSize: Fixed,
        GetBucketData: Fixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{ArgFlags, Command};

    #[test]
    fn common_opcodes_start_at_zero() {
        assert_eq!(Noop::OPCODE, 0);
        assert_eq!(GetBucketData::OPCODE, 6);
        assert_eq!(CommonCommandId::from_u32(4), Some(CommonCommandId::SetBucketDataImmediate));
        assert_eq!(CommonCommandId::from_u32(7), None);
    }

    #[test]
    fn arity_comes_from_struct_layout() {
        assert_eq!(Noop::ARG_COUNT, 0);
        assert_eq!(Noop::ARG_FLAGS, ArgFlags::AtLeastN);
        assert_eq!(SetBucketData::ARG_COUNT, 5);
        assert_eq!(SetBucketDataImmediate::info().arg_count, 3);
    }
}
