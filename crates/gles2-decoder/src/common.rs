//! Execution of the common (non-GL) command set, plus the shared-memory and bucket accessors every
//! GLES2 handler goes through.

use std::rc::Rc;

use bytemuck::Pod;
use gles2_cmd::common::*;
use gles2_cmd::gles2::sized_result_size;
use gles2_cmd::{CmdWord, Command, CommonCommandId};

use crate::bucket::{Bucket, BucketTable};
use crate::error::{CmdError, DecodeResult};
use crate::shared_memory::{CommandBufferEngine, SharedMemory};

pub struct CommonDecoder {
    buckets: BucketTable,
    engine: Rc<dyn CommandBufferEngine>,
}

impl CommonDecoder {
    pub fn new(engine: Rc<dyn CommandBufferEngine>) -> Self {
        Self {
            buckets: BucketTable::new(),
            engine,
        }
    }

    pub fn engine(&self) -> &Rc<dyn CommandBufferEngine> {
        &self.engine
    }

    pub fn bucket(&self, id: u32) -> Option<&Bucket> {
        self.buckets.get(id)
    }

    pub fn create_bucket(&mut self, id: u32) -> &mut Bucket {
        self.buckets.create(id)
    }

    pub fn clear_buckets(&mut self) {
        self.buckets.clear();
    }

    /// Executes one common command. `args` holds exactly `arg_count` entries.
    pub fn decode_common_command(&mut self, opcode: u32, arg_count: u32, args: &[CmdWord]) -> DecodeResult {
        let id = CommonCommandId::from_u32(opcode).ok_or(CmdError::UnknownCommand(opcode))?;
        let info = id.info();
        info.immediate_data_size(arg_count)
            .ok_or(CmdError::InvalidArguments)?;
        let args = args.get(..arg_count as usize).ok_or(CmdError::OutOfBounds)?;
        let data: &[u8] = bytemuck::cast_slice(&args[info.arg_count as usize..]);

        match id {
            CommonCommandId::Noop => Ok(()),
            CommonCommandId::SetToken => {
                let c = parse::<SetToken>(args)?;
                self.engine.set_token(c.token);
                Ok(())
            }
            CommonCommandId::SetBucketSize => {
                let c = parse::<SetBucketSize>(args)?;
                self.buckets
                    .create(c.bucket_id)
                    .set_size(c.size as usize)
                    .map_err(|_| CmdError::InvalidArguments)
            }
            CommonCommandId::SetBucketData => {
                let c = parse::<SetBucketData>(args)?;
                let bytes = self.read_bytes(c.shared_memory_id, c.shared_memory_offset, c.size)?;
                self.set_bucket_range(c.bucket_id, c.offset, &bytes)
            }
            CommonCommandId::SetBucketDataImmediate => {
                let c = parse::<SetBucketDataImmediate>(args)?;
                let bytes = data.get(..c.size as usize).ok_or(CmdError::OutOfBounds)?;
                self.set_bucket_range(c.bucket_id, c.offset, bytes)
            }
            CommonCommandId::GetBucketSize => {
                let c = parse::<GetBucketSize>(args)?;
                let size = self
                    .buckets
                    .get(c.bucket_id)
                    .ok_or(CmdError::InvalidArguments)?
                    .size() as u32;
                self.write_shared(c.shared_memory_id, c.shared_memory_offset, &size)
            }
            CommonCommandId::GetBucketData => {
                let c = parse::<GetBucketData>(args)?;
                let bytes = self
                    .buckets
                    .get(c.bucket_id)
                    .and_then(|b| b.data(c.offset as usize, c.size as usize))
                    .ok_or(CmdError::InvalidArguments)?
                    .to_vec();
                self.write_bytes(c.shared_memory_id, c.shared_memory_offset, &bytes)
            }
        }
    }

    fn set_bucket_range(&mut self, bucket_id: u32, offset: u32, bytes: &[u8]) -> DecodeResult {
        let bucket = self
            .buckets
            .get_mut(bucket_id)
            .ok_or(CmdError::InvalidArguments)?;
        if bucket.set_data(offset as usize, bytes) {
            Ok(())
        } else {
            Err(CmdError::InvalidArguments)
        }
    }

    fn region(&self, shm_id: u32) -> Result<Rc<dyn SharedMemory>, CmdError> {
        self.engine.shared_memory(shm_id).ok_or(CmdError::OutOfBounds)
    }

    /// Fails with `OutOfBounds` unless `size` bytes at `offset` lie inside region `shm_id`.
    pub fn check_region(&self, shm_id: u32, offset: u32, size: usize) -> DecodeResult {
        let region = self.region(shm_id)?;
        match (offset as usize).checked_add(size) {
            Some(end) if end <= region.size() => Ok(()),
            _ => Err(CmdError::OutOfBounds),
        }
    }

    pub fn read_bytes(&self, shm_id: u32, offset: u32, size: u32) -> Result<Vec<u8>, CmdError> {
        self.check_region(shm_id, offset, size as usize)?;
        let mut bytes = vec![0u8; size as usize];
        self.region(shm_id)?
            .read(offset as usize, &mut bytes)
            .map_err(|_| CmdError::OutOfBounds)?;
        Ok(bytes)
    }

    /// Like [`read_bytes`](Self::read_bytes), but `(0, 0)` reads as a null pointer.
    pub fn read_optional_bytes(&self, shm_id: u32, offset: u32, size: u32) -> Result<Option<Vec<u8>>, CmdError> {
        if shm_id == 0 && offset == 0 {
            return Ok(None);
        }
        self.read_bytes(shm_id, offset, size).map(Some)
    }

    pub fn write_bytes(&self, shm_id: u32, offset: u32, bytes: &[u8]) -> DecodeResult {
        self.region(shm_id)?
            .write(offset as usize, bytes)
            .map_err(|_| CmdError::OutOfBounds)
    }

    pub fn read_shared<T: Pod>(&self, shm_id: u32, offset: u32) -> Result<T, CmdError> {
        let bytes = self.read_bytes(shm_id, offset, core::mem::size_of::<T>() as u32)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    pub fn write_shared<T: Pod>(&self, shm_id: u32, offset: u32, value: &T) -> DecodeResult {
        self.write_bytes(shm_id, offset, bytemuck::bytes_of(value))
    }

    /// Reads `n` client ids. A negative or oversized `n` is `OutOfBounds`.
    pub fn read_ids(&self, shm_id: u32, offset: u32, n: i32) -> Result<Vec<u32>, CmdError> {
        let size = u32::try_from(n)
            .ok()
            .and_then(|n| n.checked_mul(4))
            .ok_or(CmdError::OutOfBounds)?;
        let bytes = self.read_bytes(shm_id, offset, size)?;
        Ok(words_from_bytes(&bytes))
    }

    /// Validates a sized-result out-parameter able to hold `max_count` values. The count field
    /// must have been zeroed by the client.
    pub fn begin_sized_result(&self, shm_id: u32, offset: u32, max_count: usize) -> DecodeResult {
        let size = sized_result_size(max_count).ok_or(CmdError::OutOfBounds)?;
        self.check_region(shm_id, offset, size)?;
        if self.read_shared::<u32>(shm_id, offset)? != 0 {
            return Err(CmdError::InvalidArguments);
        }
        Ok(())
    }

    /// Writes the values and then the count of a sized result.
    pub fn finish_sized_result(&self, shm_id: u32, offset: u32, values: &[u32]) -> DecodeResult {
        let value_offset = offset.checked_add(4).ok_or(CmdError::OutOfBounds)?;
        self.write_bytes(shm_id, value_offset, bytemuck::cast_slice(values))?;
        self.write_shared(shm_id, offset, &(values.len() as u32))
    }
}

fn parse<C: Command>(args: &[CmdWord]) -> Result<C, CmdError> {
    C::from_args(args).ok_or(CmdError::OutOfBounds)
}

/// Splits native-endian bytes into 4-byte words, ignoring a trailing partial word.
pub(crate) fn words_from_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
