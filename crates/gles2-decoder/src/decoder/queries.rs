use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_cmd::util::{compute_image_data_size, num_values_returned_for_get};

use super::GlesDecoder;
use crate::error::{CmdError, DecodeResult, GlError};
use crate::resources::client_id_of;

/// Which `glGet*v` flavor is being answered.
#[derive(Clone, Copy, PartialEq, Eq)]
enum GetKind {
    Boolean,
    Float,
    Integer,
}

impl GlesDecoder {
    pub(super) fn handle_get_error(&mut self, c: &GetError, _: &[u8]) -> DecodeResult {
        self.common
            .check_region(c.result_shm_id, c.result_shm_offset, 4)?;
        let mut error = self.gl.get_error();
        if error == GL_NO_ERROR {
            error = self
                .error_bits
                .take_one()
                .map_or(GL_NO_ERROR, |e| e.to_gl());
        }
        self.write_result(c.result_shm_id, c.result_shm_offset, error)
    }

    pub(super) fn handle_get_booleanv(&mut self, c: &GetBooleanv, _: &[u8]) -> DecodeResult {
        self.get_values(c.pname, c.params_shm_id, c.params_shm_offset, GetKind::Boolean)
    }

    pub(super) fn handle_get_floatv(&mut self, c: &GetFloatv, _: &[u8]) -> DecodeResult {
        self.get_values(c.pname, c.params_shm_id, c.params_shm_offset, GetKind::Float)
    }

    pub(super) fn handle_get_integerv(&mut self, c: &GetIntegerv, _: &[u8]) -> DecodeResult {
        self.get_values(c.pname, c.params_shm_id, c.params_shm_offset, GetKind::Integer)
    }

    fn get_values(&mut self, pname: GLenum, shm_id: u32, shm_offset: u32, kind: GetKind) -> DecodeResult {
        let count = num_values_returned_for_get(pname) as usize;
        self.common
            .begin_sized_result(shm_id, shm_offset, count.max(1))?;
        if count == 0 {
            self.set_gl_error(GlError::InvalidEnum, "glGet: pname");
            return Ok(());
        }

        let values = match self.shadowed_values(pname) {
            Some(values) => values,
            None => {
                self.copy_real_gl_errors();
                let values = match kind {
                    GetKind::Float => {
                        let mut params = vec![0.0; count];
                        self.gl.get_floatv(pname, &mut params);
                        params.into_iter().map(f64::from).collect()
                    }
                    GetKind::Boolean | GetKind::Integer => {
                        let mut params = vec![0; count];
                        self.gl.get_integerv(pname, &mut params);
                        params.into_iter().map(f64::from).collect()
                    }
                };
                if self.peek_gl_error() != GL_NO_ERROR {
                    return Ok(());
                }
                values
            }
        };

        let words: Vec<u32> = values
            .iter()
            .take(count)
            .map(|&v| match kind {
                GetKind::Boolean => u32::from(v != 0.0),
                GetKind::Float => (v as GLfloat).to_bits(),
                GetKind::Integer => v.round() as i64 as GLint as u32,
            })
            .collect();
        self.common
            .finish_sized_result(shm_id, shm_offset, &words)
    }

    /// State the decoder answers itself: bindings in client ids, and everything the backend
    /// may not agree on because the decoder substitutes its own objects.
    fn shadowed_values(&self, pname: GLenum) -> Option<Vec<f64>> {
        let state = &self.state;
        let limits = self.group.limits();
        let one = |v: u32| Some(vec![f64::from(v)]);
        match pname {
            GL_ACTIVE_TEXTURE => one(GL_TEXTURE0 + state.active_texture_unit as u32),
            GL_ARRAY_BUFFER_BINDING => one(client_id_of(state.bound_array_buffer.as_ref())),
            GL_ELEMENT_ARRAY_BUFFER_BINDING => {
                one(client_id_of(state.bound_element_array_buffer.as_ref()))
            }
            GL_FRAMEBUFFER_BINDING => one(client_id_of(state.bound_framebuffer.as_ref())),
            GL_RENDERBUFFER_BINDING => one(client_id_of(state.bound_renderbuffer.as_ref())),
            GL_CURRENT_PROGRAM => one(client_id_of(state.current_program.as_ref())),
            GL_TEXTURE_BINDING_2D => one(client_id_of(state.bound_texture(GL_TEXTURE_2D))),
            GL_TEXTURE_BINDING_CUBE_MAP => {
                one(client_id_of(state.bound_texture(GL_TEXTURE_CUBE_MAP)))
            }
            GL_PACK_ALIGNMENT => one(state.pack_alignment as u32),
            GL_UNPACK_ALIGNMENT => one(state.unpack_alignment as u32),
            GL_MAX_VERTEX_ATTRIBS => one(limits.max_vertex_attribs),
            GL_MAX_TEXTURE_IMAGE_UNITS | GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS => {
                one(limits.max_texture_units)
            }
            GL_MAX_TEXTURE_SIZE => one(limits.max_texture_size),
            GL_MAX_CUBE_MAP_TEXTURE_SIZE => one(limits.max_cube_map_texture_size),
            GL_MAX_RENDERBUFFER_SIZE => one(limits.max_renderbuffer_size),
            GL_MAX_VARYING_VECTORS => one(limits.max_varying_vectors),
            GL_MAX_VERTEX_UNIFORM_VECTORS => one(limits.max_vertex_uniform_vectors),
            GL_MAX_FRAGMENT_UNIFORM_VECTORS => one(limits.max_fragment_uniform_vectors),
            GL_COLOR_WRITEMASK => Some(state.color_mask.iter().map(|&m| f64::from(u8::from(m))).collect()),
            GL_DEPTH_WRITEMASK => one(u32::from(state.depth_mask)),
            GL_STENCIL_WRITEMASK => one(state.stencil_mask_front),
            GL_STENCIL_BACK_WRITEMASK => one(state.stencil_mask_back),
            GL_COLOR_CLEAR_VALUE => Some(state.clear_color.iter().map(|&v| f64::from(v)).collect()),
            GL_DEPTH_CLEAR_VALUE => Some(vec![f64::from(state.clear_depth)]),
            GL_STENCIL_CLEAR_VALUE => Some(vec![f64::from(state.clear_stencil)]),
            cap if self.validators.capability.is_valid(cap) => one(u32::from(state.is_enabled(cap))),
            _ => None,
        }
    }

    pub(super) fn handle_get_string(&mut self, c: &GetString, _: &[u8]) -> DecodeResult {
        if !self.validators.string_type.is_valid(c.name) {
            self.set_gl_error(GlError::InvalidEnum, "glGetString: name");
            return Ok(());
        }
        let value = if c.name == GL_EXTENSIONS {
            self.group.features().extensions_string()
        } else {
            self.gl.get_string(c.name)
        };
        self.common.create_bucket(c.bucket_id).set_from_string(&value);
        Ok(())
    }

    pub(super) fn handle_read_pixels(&mut self, c: &ReadPixels, _: &[u8]) -> DecodeResult {
        const OP: &str = "glReadPixels";
        if c.width < 0 || c.height < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: dimensions < 0"));
            return Ok(());
        }
        let (width, height) = (c.width as u32, c.height as u32);
        let alignment = self.state.pack_alignment as u32;
        let size = compute_image_data_size(width, height, c.format, c.ty, alignment)
            .ok_or(CmdError::OutOfBounds)?;
        self.common
            .check_region(c.pixels_shm_id, c.pixels_shm_offset, size as usize)?;
        self.common
            .check_region(c.result_shm_id, c.result_shm_offset, 4)?;
        self.write_result(c.result_shm_id, c.result_shm_offset, 0)?;

        if !self.validators.read_pixel_format.is_valid(c.format) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: format"));
            return Ok(());
        }
        if !self.validators.pixel_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: type"));
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        if !self.check_framebuffer_complete(OP) {
            return Ok(());
        }

        // Pixels outside the read source come back as zeros.
        let mut pixels = vec![0u8; size as usize];
        let (fb_width, fb_height) = self.read_framebuffer_size();
        let x0 = i64::from(c.x).max(0);
        let y0 = i64::from(c.y).max(0);
        let x1 = (i64::from(c.x) + i64::from(c.width)).min(i64::from(fb_width));
        let y1 = (i64::from(c.y) + i64::from(c.height)).min(i64::from(fb_height));

        let unclipped = x0 == i64::from(c.x)
            && y0 == i64::from(c.y)
            && x1 - x0 == i64::from(c.width)
            && y1 - y0 == i64::from(c.height);

        self.copy_real_gl_errors();
        if unclipped {
            self.gl
                .read_pixels(c.x, c.y, c.width, c.height, c.format, c.ty, &mut pixels);
        } else if x0 < x1 && y0 < y1 {
            let padded_row = compute_image_data_size(width, 2, c.format, c.ty, alignment)
                .zip(compute_image_data_size(width, 1, c.format, c.ty, alignment))
                .map(|(two, one)| (two - one) as usize)
                .ok_or(CmdError::OutOfBounds)?;
            let group_size = compute_image_data_size(1, 1, c.format, c.ty, 1)
                .ok_or(CmdError::OutOfBounds)? as usize;
            let span = (x1 - x0) as usize;
            let mut row = vec![0u8; span * group_size];
            for y in y0..y1 {
                self.gl.read_pixels(
                    x0 as GLint,
                    y as GLint,
                    span as GLsizei,
                    1,
                    c.format,
                    c.ty,
                    &mut row,
                );
                let at = (y - i64::from(c.y)) as usize * padded_row
                    + (x0 - i64::from(c.x)) as usize * group_size;
                if let Some(dst) = pixels.get_mut(at..at + row.len()) {
                    dst.copy_from_slice(&row);
                }
            }
        }
        if self.peek_gl_error() != GL_NO_ERROR {
            return Ok(());
        }
        self.common
            .write_bytes(c.pixels_shm_id, c.pixels_shm_offset, &pixels)?;
        self.write_result(c.result_shm_id, c.result_shm_offset, 1)
    }
}
