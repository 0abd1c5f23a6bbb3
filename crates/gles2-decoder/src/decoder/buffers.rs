use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;

use super::GlesDecoder;
use crate::error::{CmdError, DecodeResult, GlError};
use crate::resources::service_id_of;

impl GlesDecoder {
    pub(super) fn handle_bind_buffer(&mut self, c: &BindBuffer, _: &[u8]) -> DecodeResult {
        if !self.validators.buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glBindBuffer: target");
            return Ok(());
        }
        let buffer = match c.buffer {
            0 => None,
            id => match self.group.buffers.get(id) {
                Some(buffer) => Some(buffer),
                None => {
                    let service_id = self.gl.gen_buffer();
                    let Some(buffer) = self.group.buffers.create(id, service_id) else {
                        self.gl.delete_buffer(service_id);
                        self.set_gl_error(GlError::InvalidOperation, "glBindBuffer: id in use");
                        return Ok(());
                    };
                    self.group.mark_id_used(id_namespaces::BUFFERS, id);
                    Some(buffer)
                }
            },
        };
        if let Some(buffer) = &buffer {
            let bound_target = buffer.state().target();
            if bound_target != 0 && bound_target != c.target {
                self.set_gl_error(
                    GlError::InvalidOperation,
                    "glBindBuffer: buffer bound to more than 1 target",
                );
                return Ok(());
            }
            buffer.state_mut().set_target(c.target);
        }
        self.gl.bind_buffer(c.target, service_id_of(buffer.as_ref()));
        match c.target {
            GL_ARRAY_BUFFER => self.state.bound_array_buffer = buffer,
            _ => self.state.bound_element_array_buffer = buffer,
        }
        Ok(())
    }

    pub(super) fn handle_buffer_data(&mut self, c: &BufferData, _: &[u8]) -> DecodeResult {
        if c.size < 0 {
            self.set_gl_error(GlError::InvalidValue, "glBufferData: size < 0");
            return Ok(());
        }
        let data = match self
            .common
            .read_optional_bytes(c.data_shm_id, c.data_shm_offset, c.size as u32)?
        {
            Some(data) => data,
            None => {
                let mut zeros = Vec::new();
                if zeros.try_reserve_exact(c.size as usize).is_err() {
                    self.set_gl_error(GlError::OutOfMemory, "glBufferData: out of memory");
                    return Ok(());
                }
                zeros.resize(c.size as usize, 0);
                zeros
            }
        };
        self.do_buffer_data(c.target, &data, c.usage);
        Ok(())
    }

    pub(super) fn handle_buffer_data_immediate(
        &mut self,
        c: &BufferDataImmediate,
        data: &[u8],
    ) -> DecodeResult {
        if c.size < 0 {
            self.set_gl_error(GlError::InvalidValue, "glBufferData: size < 0");
            return Ok(());
        }
        let data = data.get(..c.size as usize).ok_or(CmdError::OutOfBounds)?;
        self.do_buffer_data(c.target, data, c.usage);
        Ok(())
    }

    /// Replaces the data store of the buffer bound to `target`. The shadow size only changes if
    /// the backend accepted the allocation.
    fn do_buffer_data(&mut self, target: GLenum, data: &[u8], usage: GLenum) {
        if !self.validators.buffer_target.is_valid(target) {
            self.set_gl_error(GlError::InvalidEnum, "glBufferData: target");
            return;
        }
        if !self.validators.buffer_usage.is_valid(usage) {
            self.set_gl_error(GlError::InvalidEnum, "glBufferData: usage");
            return;
        }
        let Some(buffer) = self.state.bound_buffer(target).filter(|b| !b.is_deleted()).cloned() else {
            self.set_gl_error(GlError::InvalidOperation, "glBufferData: no buffer bound");
            return;
        };
        self.copy_real_gl_errors();
        self.gl.buffer_data(target, data, usage);
        if self.peek_gl_error() == GL_NO_ERROR {
            buffer.state_mut().set_data(data, usage);
        }
    }

    pub(super) fn handle_buffer_sub_data(&mut self, c: &BufferSubData, _: &[u8]) -> DecodeResult {
        if c.size < 0 {
            self.set_gl_error(GlError::InvalidValue, "glBufferSubData: size < 0");
            return Ok(());
        }
        let data = self
            .common
            .read_bytes(c.data_shm_id, c.data_shm_offset, c.size as u32)?;
        self.do_buffer_sub_data(c.target, c.offset, &data);
        Ok(())
    }

    pub(super) fn handle_buffer_sub_data_immediate(
        &mut self,
        c: &BufferSubDataImmediate,
        data: &[u8],
    ) -> DecodeResult {
        if c.size < 0 {
            self.set_gl_error(GlError::InvalidValue, "glBufferSubData: size < 0");
            return Ok(());
        }
        let data = data.get(..c.size as usize).ok_or(CmdError::OutOfBounds)?;
        self.do_buffer_sub_data(c.target, c.offset, data);
        Ok(())
    }

    fn do_buffer_sub_data(&mut self, target: GLenum, offset: GLintptr, data: &[u8]) {
        if !self.validators.buffer_target.is_valid(target) {
            self.set_gl_error(GlError::InvalidEnum, "glBufferSubData: target");
            return;
        }
        let Some(buffer) = self.state.bound_buffer(target).filter(|b| !b.is_deleted()).cloned() else {
            self.set_gl_error(GlError::InvalidOperation, "glBufferSubData: no buffer bound");
            return;
        };
        if !buffer.state().range_in_bounds(offset, data.len() as i32) {
            self.set_gl_error(GlError::InvalidValue, "glBufferSubData: out of range");
            return;
        }
        self.gl.buffer_sub_data(target, offset as usize, data);
        buffer.state_mut().set_range(offset as u32, data);
    }

    pub(super) fn handle_gen_buffers(&mut self, c: &GenBuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.buffers_shm_id, c.buffers_shm_offset)?;
        self.gen_objects(|g| &g.buffers, id_namespaces::BUFFERS, &ids, |gl| gl.gen_buffer())
    }

    pub(super) fn handle_gen_buffers_immediate(
        &mut self,
        c: &GenBuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.gen_objects(|g| &g.buffers, id_namespaces::BUFFERS, &ids, |gl| gl.gen_buffer())
    }

    pub(super) fn handle_delete_buffers(&mut self, c: &DeleteBuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.buffers_shm_id, c.buffers_shm_offset)?;
        self.delete_objects(|g| &g.buffers, id_namespaces::BUFFERS, &ids);
        Ok(())
    }

    pub(super) fn handle_delete_buffers_immediate(
        &mut self,
        c: &DeleteBuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.delete_objects(|g| &g.buffers, id_namespaces::BUFFERS, &ids);
        Ok(())
    }

    pub(super) fn handle_is_buffer(&mut self, c: &IsBuffer, _: &[u8]) -> DecodeResult {
        let exists = self.group.buffers.contains(c.buffer);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    pub(super) fn handle_get_buffer_parameteriv(
        &mut self,
        c: &GetBufferParameteriv,
        _: &[u8],
    ) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glGetBufferParameteriv: target");
            return Ok(());
        }
        if !self.validators.buffer_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetBufferParameteriv: pname");
            return Ok(());
        }
        let Some(buffer) = self.state.bound_buffer(c.target).filter(|b| !b.is_deleted()).cloned() else {
            self.set_gl_error(GlError::InvalidOperation, "glGetBufferParameteriv: no buffer bound");
            return Ok(());
        };
        let value = match c.pname {
            GL_BUFFER_SIZE => buffer.state().size(),
            _ => buffer.state().usage(),
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }

    pub(super) fn handle_get_max_value_in_buffer(
        &mut self,
        c: &GetMaxValueInBuffer,
        _: &[u8],
    ) -> DecodeResult {
        self.write_result(c.result_shm_id, c.result_shm_offset, 0)?;
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, "GetMaxValueInBuffer: count < 0");
            return Ok(());
        }
        let Some(buffer) = self.group.buffers.get(c.buffer_id) else {
            self.set_gl_error(GlError::InvalidValue, "GetMaxValueInBuffer: unknown buffer");
            return Ok(());
        };
        let max = buffer
            .state_mut()
            .max_value_for_range(c.offset, c.count as u32, c.ty);
        match max {
            Some(max) => self.write_result(c.result_shm_id, c.result_shm_offset, max),
            None => {
                self.set_gl_error(GlError::InvalidOperation, "GetMaxValueInBuffer: range out of bounds");
                Ok(())
            }
        }
    }
}
