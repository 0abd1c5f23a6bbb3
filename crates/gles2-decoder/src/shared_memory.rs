//! Client shared memory as seen by the decoder.
//!
//! Commands reference memory as `(shm_id, offset)` plus a size implied by the command. The
//! decoder never hands out references into shared memory: inputs are copied out before they are
//! validated, so a client writing concurrently cannot change bytes after the check.

use core::fmt;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedMemoryError {
    pub offset: usize,
    pub len: usize,
}

impl fmt::Display for SharedMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shared memory access out of bounds: offset=0x{:x}, len=0x{:x}",
            self.offset, self.len
        )
    }
}

impl std::error::Error for SharedMemoryError {}

pub trait SharedMemory {
    fn size(&self) -> usize;
    fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), SharedMemoryError>;
    fn write(&self, offset: usize, src: &[u8]) -> Result<(), SharedMemoryError>;
}

/// Heap-backed shared memory for in-process clients and tests.
#[derive(Clone, Debug)]
pub struct VecSharedMemory {
    mem: RefCell<Vec<u8>>,
}

impl VecSharedMemory {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            mem: RefCell::new(vec![0u8; size_bytes]),
        }
    }

    pub fn as_slice(&self) -> Ref<'_, [u8]> {
        Ref::map(self.mem.borrow(), |v| v.as_slice())
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, SharedMemoryError> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.mem.borrow().len())
            .ok_or(SharedMemoryError { offset, len })?;
        Ok(offset..end)
    }
}

impl SharedMemory for VecSharedMemory {
    fn size(&self) -> usize {
        self.mem.borrow().len()
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), SharedMemoryError> {
        let range = self.range(offset, dst.len())?;
        dst.copy_from_slice(&self.mem.borrow()[range]);
        Ok(())
    }

    fn write(&self, offset: usize, src: &[u8]) -> Result<(), SharedMemoryError> {
        let range = self.range(offset, src.len())?;
        self.mem.borrow_mut()[range].copy_from_slice(src);
        Ok(())
    }
}

/// What the decoder needs from the command buffer engine that feeds it.
pub trait CommandBufferEngine {
    fn shared_memory(&self, shm_id: u32) -> Option<Rc<dyn SharedMemory>>;

    /// Publishes the last token the client asked to be signalled.
    fn set_token(&self, token: u32);
}

/// In-process engine: a table of registered shared memory regions.
#[derive(Default)]
pub struct SharedMemoryRegistry {
    regions: RefCell<HashMap<u32, Rc<dyn SharedMemory>>>,
    token: Cell<u32>,
}

impl SharedMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, shm_id: u32, memory: Rc<dyn SharedMemory>) {
        self.regions.borrow_mut().insert(shm_id, memory);
    }

    pub fn unregister(&self, shm_id: u32) -> Option<Rc<dyn SharedMemory>> {
        self.regions.borrow_mut().remove(&shm_id)
    }

    pub fn token(&self) -> u32 {
        self.token.get()
    }
}

impl CommandBufferEngine for SharedMemoryRegistry {
    fn shared_memory(&self, shm_id: u32) -> Option<Rc<dyn SharedMemory>> {
        self.regions.borrow().get(&shm_id).cloned()
    }

    fn set_token(&self, token: u32) {
        self.token.set(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_writes_are_bounds_checked() {
        let mem = VecSharedMemory::new(8);
        mem.write(4, &[1, 2, 3, 4]).expect("in bounds");
        let mut buf = [0u8; 4];
        mem.read(4, &mut buf).expect("in bounds");
        assert_eq!(buf, [1, 2, 3, 4]);

        assert_eq!(
            mem.write(5, &[0; 4]),
            Err(SharedMemoryError { offset: 5, len: 4 })
        );
        assert!(mem.read(usize::MAX, &mut buf).is_err());
    }

    #[test]
    fn registry_hands_out_registered_regions() {
        let registry = SharedMemoryRegistry::new();
        registry.register(1, Rc::new(VecSharedMemory::new(16)));
        assert_eq!(registry.shared_memory(1).map(|m| m.size()), Some(16));
        assert!(registry.shared_memory(2).is_none());
        registry.set_token(9);
        assert_eq!(registry.token(), 9);
        assert!(registry.unregister(1).is_some());
        assert!(registry.shared_memory(1).is_none());
    }
}
