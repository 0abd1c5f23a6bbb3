use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_cmd::util::gl_type_size;

use super::{immediate_values, GlesDecoder};
use crate::error::{CmdError, DecodeResult, GlError};

/// Strides above this are rejected, matching what GLES2 drivers accept.
const MAX_VERTEX_ATTRIB_STRIDE: GLsizei = 255;

impl GlesDecoder {
    pub(super) fn handle_enable_vertex_attrib_array(
        &mut self,
        c: &EnableVertexAttribArray,
        _: &[u8],
    ) -> DecodeResult {
        if self.vertex_attribs.set_enabled(c.index, true) {
            self.gl.enable_vertex_attrib_array(c.index);
        } else {
            self.set_gl_error(GlError::InvalidValue, "glEnableVertexAttribArray: index out of range");
        }
        Ok(())
    }

    pub(super) fn handle_disable_vertex_attrib_array(
        &mut self,
        c: &DisableVertexAttribArray,
        _: &[u8],
    ) -> DecodeResult {
        if self.vertex_attribs.set_enabled(c.index, false) {
            self.gl.disable_vertex_attrib_array(c.index);
        } else {
            self.set_gl_error(GlError::InvalidValue, "glDisableVertexAttribArray: index out of range");
        }
        Ok(())
    }

    pub(super) fn handle_vertex_attrib_pointer(&mut self, c: &VertexAttribPointer, _: &[u8]) -> DecodeResult {
        const OP: &str = "glVertexAttribPointer";
        let Some(buffer) = self
            .state
            .bound_array_buffer
            .as_ref()
            .filter(|b| !b.is_deleted())
            .cloned()
        else {
            self.set_gl_error(GlError::InvalidOperation, format!("{OP}: no array buffer bound"));
            return Ok(());
        };
        if !self.validators.vertex_attrib_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: type"));
            return Ok(());
        }
        if c.indx >= self.vertex_attribs.max_vertex_attribs() {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: index out of range"));
            return Ok(());
        }
        if !(1..=4).contains(&c.size) {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: size"));
            return Ok(());
        }
        if !(0..=MAX_VERTEX_ATTRIB_STRIDE).contains(&c.stride) {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: stride"));
            return Ok(());
        }
        let type_size = gl_type_size(c.ty);
        if c.offset % type_size != 0 {
            self.set_gl_error(GlError::InvalidOperation, format!("{OP}: offset not aligned"));
            return Ok(());
        }
        if c.stride as u32 % type_size != 0 {
            self.set_gl_error(GlError::InvalidOperation, format!("{OP}: stride not aligned"));
            return Ok(());
        }
        let normalized = c.normalized != 0;
        self.gl
            .vertex_attrib_pointer(c.indx, c.size, c.ty, normalized, c.stride, c.offset);
        self.vertex_attribs.set_pointer(
            c.indx,
            Some(buffer),
            c.size,
            c.ty,
            normalized,
            c.stride,
            c.offset,
        );
        Ok(())
    }

    /// Sets the constant value a disabled attribute feeds to the shader.
    fn set_vertex_attrib_value(&mut self, index: GLuint, value: [GLfloat; 4], op: &str) {
        if index >= self.vertex_attribs.max_vertex_attribs() {
            self.set_gl_error(GlError::InvalidValue, format!("{op}: index out of range"));
            return;
        }
        self.vertex_attribs.set_value(index, value);
        self.gl.vertex_attrib_4f(index, value);
    }

    pub(super) fn handle_vertex_attrib_1f(&mut self, c: &VertexAttrib1f, _: &[u8]) -> DecodeResult {
        self.set_vertex_attrib_value(c.indx, [c.x, 0.0, 0.0, 1.0], "glVertexAttrib1f");
        Ok(())
    }

    pub(super) fn handle_vertex_attrib_2f(&mut self, c: &VertexAttrib2f, _: &[u8]) -> DecodeResult {
        self.set_vertex_attrib_value(c.indx, [c.x, c.y, 0.0, 1.0], "glVertexAttrib2f");
        Ok(())
    }

    pub(super) fn handle_vertex_attrib_3f(&mut self, c: &VertexAttrib3f, _: &[u8]) -> DecodeResult {
        self.set_vertex_attrib_value(c.indx, [c.x, c.y, c.z, 1.0], "glVertexAttrib3f");
        Ok(())
    }

    pub(super) fn handle_vertex_attrib_4f(&mut self, c: &VertexAttrib4f, _: &[u8]) -> DecodeResult {
        self.set_vertex_attrib_value(c.indx, [c.x, c.y, c.z, c.w], "glVertexAttrib4f");
        Ok(())
    }

    pub(super) fn handle_vertex_attrib_4fv_immediate(
        &mut self,
        c: &VertexAttrib4fvImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let values: Vec<GLfloat> = immediate_values(data, 4).ok_or(CmdError::OutOfBounds)?;
        let value = [values[0], values[1], values[2], values[3]];
        self.set_vertex_attrib_value(c.indx, value, "glVertexAttrib4fv");
        Ok(())
    }

    /// Values of one `GetVertexAttrib*` query. `f64` holds every client id exactly.
    fn vertex_attrib_values(&mut self, index: GLuint, pname: GLenum, op: &str) -> Option<Vec<f64>> {
        if !self.validators.vertex_attribute.is_valid(pname) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: pname"));
            return None;
        }
        let Some(info) = self.vertex_attribs.get(index) else {
            self.set_gl_error(GlError::InvalidValue, format!("{op}: index out of range"));
            return None;
        };
        let scalar = match pname {
            GL_CURRENT_VERTEX_ATTRIB => return Some(info.value().iter().map(|&v| f64::from(v)).collect()),
            GL_VERTEX_ATTRIB_ARRAY_BUFFER_BINDING => f64::from(info.buffer_client_id()),
            GL_VERTEX_ATTRIB_ARRAY_ENABLED => f64::from(u8::from(info.enabled())),
            GL_VERTEX_ATTRIB_ARRAY_SIZE => f64::from(info.size()),
            GL_VERTEX_ATTRIB_ARRAY_STRIDE => f64::from(info.gl_stride()),
            GL_VERTEX_ATTRIB_ARRAY_TYPE => f64::from(info.ty()),
            _ => f64::from(u8::from(info.normalized())),
        };
        Some(vec![scalar])
    }

    pub(super) fn handle_get_vertex_attribfv(&mut self, c: &GetVertexAttribfv, _: &[u8]) -> DecodeResult {
        self.common.begin_sized_result(
            c.params_shm_id,
            c.params_shm_offset,
            num_values_for_vertex_attrib(c.pname),
        )?;
        let Some(values) = self.vertex_attrib_values(c.index, c.pname, "glGetVertexAttribfv") else {
            return Ok(());
        };
        let bits: Vec<u32> = values.iter().map(|&v| (v as GLfloat).to_bits()).collect();
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &bits)
    }

    pub(super) fn handle_get_vertex_attribiv(&mut self, c: &GetVertexAttribiv, _: &[u8]) -> DecodeResult {
        self.common.begin_sized_result(
            c.params_shm_id,
            c.params_shm_offset,
            num_values_for_vertex_attrib(c.pname),
        )?;
        let Some(values) = self.vertex_attrib_values(c.index, c.pname, "glGetVertexAttribiv") else {
            return Ok(());
        };
        let ints: Vec<u32> = values.iter().map(|&v| v.round() as i64 as GLint as u32).collect();
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &ints)
    }

    pub(super) fn handle_get_vertex_attrib_pointerv(
        &mut self,
        c: &GetVertexAttribPointerv,
        _: &[u8],
    ) -> DecodeResult {
        self.common
            .begin_sized_result(c.pointer_shm_id, c.pointer_shm_offset, 1)?;
        if !self.validators.vertex_pointer.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetVertexAttribPointerv: pname");
            return Ok(());
        }
        let Some(info) = self.vertex_attribs.get(c.index) else {
            self.set_gl_error(GlError::InvalidValue, "glGetVertexAttribPointerv: index out of range");
            return Ok(());
        };
        let offset = info.offset();
        self.common
            .finish_sized_result(c.pointer_shm_id, c.pointer_shm_offset, &[offset])
    }
}

fn num_values_for_vertex_attrib(pname: GLenum) -> usize {
    if pname == GL_CURRENT_VERTEX_ATTRIB {
        4
    } else {
        1
    }
}
