//! Client-driven id reservation in the share group's namespaces.

use gles2_cmd::gles2::*;

use super::GlesDecoder;
use crate::error::{CmdError, DecodeResult, GlError};

impl GlesDecoder {
    pub(super) fn handle_gen_shared_ids(&mut self, c: &GenSharedIds, _: &[u8]) -> DecodeResult {
        if c.n < 0 {
            self.set_gl_error(GlError::InvalidValue, "GenSharedIds: n < 0");
            return Ok(());
        }
        let size = (c.n as usize).checked_mul(4).ok_or(CmdError::OutOfBounds)?;
        self.common
            .check_region(c.ids_shm_id, c.ids_shm_offset, size)?;
        let group = self.group.clone();
        let Some(mut allocator) = group.id_allocator(c.namespace_id) else {
            self.set_gl_error(GlError::InvalidEnum, "GenSharedIds: namespace");
            return Ok(());
        };
        let mut ids = Vec::with_capacity(c.n as usize);
        if c.id_offset == 0 {
            ids.extend((0..c.n).map(|_| allocator.allocate_id()));
        } else {
            let mut desired = c.id_offset;
            for _ in 0..c.n {
                let id = allocator.allocate_id_at_or_above(desired);
                ids.push(id);
                desired = id.saturating_add(1);
            }
        }
        drop(allocator);
        self.common
            .write_bytes(c.ids_shm_id, c.ids_shm_offset, bytemuck::cast_slice(&ids))
    }

    pub(super) fn handle_delete_shared_ids(&mut self, c: &DeleteSharedIds, _: &[u8]) -> DecodeResult {
        if c.n < 0 {
            self.set_gl_error(GlError::InvalidValue, "DeleteSharedIds: n < 0");
            return Ok(());
        }
        let ids = self.shared_ids(c.n, c.ids_shm_id, c.ids_shm_offset)?;
        let group = self.group.clone();
        let Some(mut allocator) = group.id_allocator(c.namespace_id) else {
            self.set_gl_error(GlError::InvalidEnum, "DeleteSharedIds: namespace");
            return Ok(());
        };
        for id in ids {
            allocator.free_id(id);
        }
        Ok(())
    }

    pub(super) fn handle_register_shared_ids(
        &mut self,
        c: &RegisterSharedIds,
        _: &[u8],
    ) -> DecodeResult {
        if c.n < 0 {
            self.set_gl_error(GlError::InvalidValue, "RegisterSharedIds: n < 0");
            return Ok(());
        }
        let ids = self.shared_ids(c.n, c.ids_shm_id, c.ids_shm_offset)?;
        let group = self.group.clone();
        let Some(mut allocator) = group.id_allocator(c.namespace_id) else {
            self.set_gl_error(GlError::InvalidEnum, "RegisterSharedIds: namespace");
            return Ok(());
        };
        for (registered, &id) in ids.iter().enumerate() {
            if !allocator.mark_as_used(id) {
                for &undo in &ids[..registered] {
                    allocator.free_id(undo);
                }
                drop(allocator);
                self.set_gl_error(GlError::InvalidValue, "RegisterSharedIds: id already in use");
                return Ok(());
            }
        }
        Ok(())
    }
}
