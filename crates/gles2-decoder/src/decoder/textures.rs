use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_cmd::util::{bind_target_for_texture_target, compute_image_data_size, is_power_of_two, max_levels_for_size};

use super::GlesDecoder;
use crate::error::{CmdError, DecodeResult, GlError};
use crate::resources::{Attachment, LevelInfo, Texture};
use crate::validators::Validators;

impl GlesDecoder {
    pub(super) fn handle_active_texture(&mut self, c: &ActiveTexture, _: &[u8]) -> DecodeResult {
        let unit = c.texture.wrapping_sub(GL_TEXTURE0) as usize;
        if unit >= self.state.texture_units.len() {
            self.set_gl_error(GlError::InvalidEnum, "glActiveTexture: unit out of range");
            return Ok(());
        }
        self.state.active_texture_unit = unit;
        self.gl.active_texture(c.texture);
        Ok(())
    }

    pub(super) fn handle_bind_texture(&mut self, c: &BindTexture, _: &[u8]) -> DecodeResult {
        if !self.validators.texture_bind_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glBindTexture: target");
            return Ok(());
        }
        let texture = match c.texture {
            0 => self.group.default_texture(c.target),
            id => match self.group.textures.get(id) {
                Some(texture) => Some(texture),
                None => {
                    let service_id = self.gl.gen_texture();
                    let Some(texture) = self.group.textures.create(id, service_id) else {
                        self.gl.delete_texture(service_id);
                        self.set_gl_error(GlError::InvalidOperation, "glBindTexture: id in use");
                        return Ok(());
                    };
                    self.group.mark_id_used(id_namespaces::TEXTURES, id);
                    Some(texture)
                }
            },
        };
        let Some(texture) = texture else {
            return Ok(());
        };
        let bound_target = texture.state().target();
        if bound_target != 0 && bound_target != c.target {
            self.set_gl_error(
                GlError::InvalidOperation,
                "glBindTexture: texture bound to more than 1 target",
            );
            return Ok(());
        }
        if bound_target == 0 {
            texture.state_mut().set_target(c.target);
        }
        self.gl.bind_texture(c.target, texture.service_id());
        self.state.active_unit_mut().set_bound(c.target, Some(texture));
        Ok(())
    }

    pub(super) fn handle_gen_textures(&mut self, c: &GenTextures, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.textures_shm_id, c.textures_shm_offset)?;
        self.gen_objects(|g| &g.textures, id_namespaces::TEXTURES, &ids, |gl| gl.gen_texture())
    }

    pub(super) fn handle_gen_textures_immediate(
        &mut self,
        c: &GenTexturesImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.gen_objects(|g| &g.textures, id_namespaces::TEXTURES, &ids, |gl| gl.gen_texture())
    }

    pub(super) fn handle_delete_textures(&mut self, c: &DeleteTextures, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.textures_shm_id, c.textures_shm_offset)?;
        self.delete_textures(&ids);
        Ok(())
    }

    pub(super) fn handle_delete_textures_immediate(
        &mut self,
        c: &DeleteTexturesImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.delete_textures(&ids);
        Ok(())
    }

    /// Deleted textures fall back to the default texture on every unit, and are detached from the
    /// bound framebuffer, as the backend does.
    fn delete_textures(&mut self, ids: &[u32]) {
        for texture in self.delete_objects(|g| &g.textures, id_namespaces::TEXTURES, ids) {
            for unit in &mut self.state.texture_units {
                unit.unbind(&texture, &self.group);
            }
            if let Some(fb) = self.state.bound_framebuffer.clone() {
                let mut fb = fb.state_mut();
                for attachment in [GL_COLOR_ATTACHMENT0, GL_DEPTH_ATTACHMENT, GL_STENCIL_ATTACHMENT] {
                    let attached = matches!(
                        fb.attachment(attachment),
                        Some(Attachment::Texture { texture: t, .. }) if Rc::ptr_eq(t, &texture)
                    );
                    if attached {
                        fb.attach(attachment, None);
                    }
                }
            }
        }
    }

    pub(super) fn handle_is_texture(&mut self, c: &IsTexture, _: &[u8]) -> DecodeResult {
        let exists = self.group.textures.contains(c.texture);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    /// Bytes a pixel upload of the given shape reads. Negative sizes read nothing and are
    /// rejected later with a GL error.
    fn upload_size(&self, width: GLsizei, height: GLsizei, format: GLenum, ty: GLenum) -> Result<u32, CmdError> {
        if width < 0 || height < 0 {
            return Ok(0);
        }
        compute_image_data_size(
            width as u32,
            height as u32,
            format,
            ty,
            self.state.unpack_alignment as u32,
        )
        .ok_or(CmdError::OutOfBounds)
    }

    /// Whether a `width` x `height` image fits `level` of `target`.
    fn texture_size_valid(&self, target: GLenum, level: GLint, width: GLsizei, height: GLsizei) -> bool {
        if level < 0 || width < 0 || height < 0 {
            return false;
        }
        let limits = self.group.limits();
        let max_size = if target == GL_TEXTURE_2D {
            limits.max_texture_size
        } else {
            limits.max_cube_map_texture_size
        };
        if level >= max_levels_for_size(max_size) as GLint {
            return false;
        }
        let max_at_level = (max_size >> level).max(1) as GLsizei;
        if width > max_at_level || height > max_at_level {
            return false;
        }
        if level > 0
            && !self.group.features().npot_textures
            && (!is_power_of_two(width as u32) || !is_power_of_two(height as u32))
        {
            return false;
        }
        target == GL_TEXTURE_2D || width == height
    }

    /// The non-deleted texture bound on the active unit for the bind target of `target`.
    fn texture_for_target(&mut self, target: GLenum, op: &str) -> Option<Rc<Texture>> {
        let bind_target = bind_target_for_texture_target(target);
        let texture = self
            .state
            .bound_texture(bind_target)
            .filter(|t| !t.is_deleted())
            .cloned();
        if texture.is_none() {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: unknown texture for target"));
        }
        texture
    }

    pub(super) fn handle_tex_image_2d(&mut self, c: &TexImage2D, _: &[u8]) -> DecodeResult {
        let size = self.upload_size(c.width, c.height, c.format, c.ty)?;
        let pixels = self
            .common
            .read_optional_bytes(c.pixels_shm_id, c.pixels_shm_offset, size)?;
        let args = TexImage2DImmediate {
            target: c.target,
            level: c.level,
            internalformat: c.internalformat,
            width: c.width,
            height: c.height,
            border: c.border,
            format: c.format,
            ty: c.ty,
        };
        self.do_tex_image_2d(&args, pixels.as_deref().unwrap_or(&[]));
        Ok(())
    }

    pub(super) fn handle_tex_image_2d_immediate(
        &mut self,
        c: &TexImage2DImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let size = self.upload_size(c.width, c.height, c.format, c.ty)?;
        let pixels = data.get(..size as usize).ok_or(CmdError::OutOfBounds)?;
        self.do_tex_image_2d(c, pixels);
        Ok(())
    }

    /// Specifies a level. Empty `pixels` allocates the level without uploading.
    fn do_tex_image_2d(&mut self, c: &TexImage2DImmediate, pixels: &[u8]) {
        if !self.validators.texture_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glTexImage2D: target");
            return;
        }
        if !self.validators.texture_format.is_valid(c.format) {
            self.set_gl_error(GlError::InvalidEnum, "glTexImage2D: format");
            return;
        }
        if !self.validators.pixel_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, "glTexImage2D: type");
            return;
        }
        let internal_format = c.internalformat as GLenum;
        if !self.validators.texture_internal_format.is_valid(internal_format) {
            self.set_gl_error(GlError::InvalidValue, "glTexImage2D: internal_format");
            return;
        }
        if internal_format != c.format || !Validators::format_type_combination_valid(c.format, c.ty) {
            self.set_gl_error(
                GlError::InvalidOperation,
                "glTexImage2D: format and type do not match internal_format",
            );
            return;
        }
        if !self.texture_size_valid(c.target, c.level, c.width, c.height) || c.border != 0 {
            self.set_gl_error(GlError::InvalidValue, "glTexImage2D: dimensions out of range");
            return;
        }
        let Some(texture) = self.texture_for_target(c.target, "glTexImage2D") else {
            return;
        };

        self.copy_real_gl_errors();
        self.gl.tex_image_2d(
            c.target,
            c.level,
            internal_format,
            c.width,
            c.height,
            c.format,
            c.ty,
            pixels,
        );
        if self.peek_gl_error() == GL_NO_ERROR {
            texture.state_mut().set_level_info(
                c.target,
                c.level,
                LevelInfo {
                    valid: true,
                    internal_format,
                    width: c.width as u32,
                    height: c.height as u32,
                    format: c.format,
                    ty: c.ty,
                },
            );
        }
    }

    pub(super) fn handle_tex_sub_image_2d(&mut self, c: &TexSubImage2D, _: &[u8]) -> DecodeResult {
        let size = self.upload_size(c.width, c.height, c.format, c.ty)?;
        let pixels = self
            .common
            .read_bytes(c.pixels_shm_id, c.pixels_shm_offset, size)?;
        let args = TexSubImage2DImmediate {
            target: c.target,
            level: c.level,
            xoffset: c.xoffset,
            yoffset: c.yoffset,
            width: c.width,
            height: c.height,
            format: c.format,
            ty: c.ty,
        };
        self.do_tex_sub_image_2d(&args, &pixels);
        Ok(())
    }

    pub(super) fn handle_tex_sub_image_2d_immediate(
        &mut self,
        c: &TexSubImage2DImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let size = self.upload_size(c.width, c.height, c.format, c.ty)?;
        let pixels = data.get(..size as usize).ok_or(CmdError::OutOfBounds)?;
        self.do_tex_sub_image_2d(c, pixels);
        Ok(())
    }

    fn do_tex_sub_image_2d(&mut self, c: &TexSubImage2DImmediate, pixels: &[u8]) {
        if !self.validators.texture_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glTexSubImage2D: target");
            return;
        }
        if !self.validators.texture_format.is_valid(c.format) {
            self.set_gl_error(GlError::InvalidEnum, "glTexSubImage2D: format");
            return;
        }
        if !self.validators.pixel_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, "glTexSubImage2D: type");
            return;
        }
        if c.width < 0 || c.height < 0 {
            self.set_gl_error(GlError::InvalidValue, "glTexSubImage2D: size < 0");
            return;
        }
        let Some(texture) = self.texture_for_target(c.target, "glTexSubImage2D") else {
            return;
        };
        let Some(level) = texture.state().level_info(c.target, c.level).copied() else {
            self.set_gl_error(GlError::InvalidOperation, "glTexSubImage2D: level does not exist");
            return;
        };
        if !sub_rect_in_level(&level, c.xoffset, c.yoffset, c.width, c.height) {
            self.set_gl_error(GlError::InvalidValue, "glTexSubImage2D: bad dimensions");
            return;
        }
        if c.format != level.format || c.ty != level.ty {
            self.set_gl_error(
                GlError::InvalidOperation,
                "glTexSubImage2D: format and type do not match the level",
            );
            return;
        }
        self.gl.tex_sub_image_2d(
            c.target, c.level, c.xoffset, c.yoffset, c.width, c.height, c.format, c.ty, pixels,
        );
    }

    pub(super) fn handle_copy_tex_image_2d(&mut self, c: &CopyTexImage2D, _: &[u8]) -> DecodeResult {
        if !self.validators.texture_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glCopyTexImage2D: target");
            return Ok(());
        }
        if !self.validators.texture_internal_format.is_valid(c.internalformat) {
            self.set_gl_error(GlError::InvalidEnum, "glCopyTexImage2D: internal_format");
            return Ok(());
        }
        if !self.texture_size_valid(c.target, c.level, c.width, c.height) || c.border != 0 {
            self.set_gl_error(GlError::InvalidValue, "glCopyTexImage2D: dimensions out of range");
            return Ok(());
        }
        let Some(texture) = self.texture_for_target(c.target, "glCopyTexImage2D") else {
            return Ok(());
        };
        if !self.check_framebuffer_complete("glCopyTexImage2D") {
            return Ok(());
        }

        self.copy_real_gl_errors();
        self.gl.copy_tex_image_2d(
            c.target,
            c.level,
            c.internalformat,
            c.x,
            c.y,
            c.width,
            c.height,
        );
        if self.peek_gl_error() == GL_NO_ERROR {
            texture.state_mut().set_level_info(
                c.target,
                c.level,
                LevelInfo {
                    valid: true,
                    internal_format: c.internalformat,
                    width: c.width as u32,
                    height: c.height as u32,
                    format: c.internalformat,
                    ty: GL_UNSIGNED_BYTE,
                },
            );
        }
        Ok(())
    }

    pub(super) fn handle_copy_tex_sub_image_2d(
        &mut self,
        c: &CopyTexSubImage2D,
        _: &[u8],
    ) -> DecodeResult {
        if !self.validators.texture_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glCopyTexSubImage2D: target");
            return Ok(());
        }
        if c.width < 0 || c.height < 0 {
            self.set_gl_error(GlError::InvalidValue, "glCopyTexSubImage2D: size < 0");
            return Ok(());
        }
        let Some(texture) = self.texture_for_target(c.target, "glCopyTexSubImage2D") else {
            return Ok(());
        };
        let Some(level) = texture.state().level_info(c.target, c.level).copied() else {
            self.set_gl_error(GlError::InvalidOperation, "glCopyTexSubImage2D: level does not exist");
            return Ok(());
        };
        if !sub_rect_in_level(&level, c.xoffset, c.yoffset, c.width, c.height) {
            self.set_gl_error(GlError::InvalidValue, "glCopyTexSubImage2D: bad dimensions");
            return Ok(());
        }
        if !self.check_framebuffer_complete("glCopyTexSubImage2D") {
            return Ok(());
        }
        self.gl.copy_tex_sub_image_2d(
            c.target, c.level, c.xoffset, c.yoffset, c.x, c.y, c.width, c.height,
        );
        Ok(())
    }

    pub(super) fn handle_tex_parameteri(&mut self, c: &TexParameteri, _: &[u8]) -> DecodeResult {
        if self.update_tex_parameter(c.target, c.pname, c.param as GLenum, "glTexParameteri") {
            self.gl.tex_parameteri(c.target, c.pname, c.param);
        }
        Ok(())
    }

    pub(super) fn handle_tex_parameterf(&mut self, c: &TexParameterf, _: &[u8]) -> DecodeResult {
        if self.update_tex_parameter(c.target, c.pname, c.param as GLenum, "glTexParameterf") {
            self.gl.tex_parameterf(c.target, c.pname, c.param);
        }
        Ok(())
    }

    /// Validates a texture parameter and records it on the bound texture.
    fn update_tex_parameter(&mut self, target: GLenum, pname: GLenum, value: GLenum, op: &str) -> bool {
        if !self.validators.texture_bind_target.is_valid(target) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: target"));
            return false;
        }
        if !self.validators.texture_parameter.is_valid(pname) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: pname"));
            return false;
        }
        let value_ok = match pname {
            GL_TEXTURE_MIN_FILTER => self.validators.texture_min_filter_mode.is_valid(value),
            GL_TEXTURE_MAG_FILTER => self.validators.texture_mag_filter_mode.is_valid(value),
            _ => self.validators.texture_wrap_mode.is_valid(value),
        };
        if !value_ok {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: param"));
            return false;
        }
        let Some(texture) = self.texture_for_target(target, op) else {
            return false;
        };
        let mut state = texture.state_mut();
        match pname {
            GL_TEXTURE_MIN_FILTER => state.min_filter = value,
            GL_TEXTURE_MAG_FILTER => state.mag_filter = value,
            GL_TEXTURE_WRAP_S => state.wrap_s = value,
            _ => state.wrap_t = value,
        }
        true
    }

    pub(super) fn handle_generate_mipmap(&mut self, c: &GenerateMipmap, _: &[u8]) -> DecodeResult {
        if !self.validators.texture_bind_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glGenerateMipmap: target");
            return Ok(());
        }
        let Some(texture) = self.texture_for_target(c.target, "glGenerateMipmap") else {
            return Ok(());
        };
        let can_generate = {
            let state = texture.state();
            let base_ok = if c.target == GL_TEXTURE_2D {
                state.level_info(GL_TEXTURE_2D, 0).is_some()
            } else {
                state.cube_complete()
            };
            base_ok && (self.group.features().npot_textures || !state.is_npot())
        };
        if !can_generate {
            self.set_gl_error(GlError::InvalidOperation, "glGenerateMipmap: base level incomplete");
            return Ok(());
        }
        self.copy_real_gl_errors();
        self.gl.generate_mipmap(c.target);
        if self.peek_gl_error() == GL_NO_ERROR {
            texture.state_mut().mark_mipmaps_generated();
        }
        Ok(())
    }

    pub(super) fn handle_get_tex_parameteriv(&mut self, c: &GetTexParameteriv, _: &[u8]) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.texture_bind_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glGetTexParameteriv: target");
            return Ok(());
        }
        if !self.validators.texture_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetTexParameteriv: pname");
            return Ok(());
        }
        let Some(texture) = self.texture_for_target(c.target, "glGetTexParameteriv") else {
            return Ok(());
        };
        let value = {
            let state = texture.state();
            match c.pname {
                GL_TEXTURE_MIN_FILTER => state.min_filter,
                GL_TEXTURE_MAG_FILTER => state.mag_filter,
                GL_TEXTURE_WRAP_S => state.wrap_s,
                _ => state.wrap_t,
            }
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }

    pub(super) fn handle_get_tex_level_parameteriv(
        &mut self,
        c: &GetTexLevelParameteriv,
        _: &[u8],
    ) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.texture_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glGetTexLevelParameteriv: target");
            return Ok(());
        }
        if !self.validators.texture_level_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetTexLevelParameteriv: pname");
            return Ok(());
        }
        let Some(texture) = self.texture_for_target(c.target, "glGetTexLevelParameteriv") else {
            return Ok(());
        };
        let Some(level) = texture.state().level_info(c.target, c.level).copied() else {
            self.set_gl_error(GlError::InvalidValue, "glGetTexLevelParameteriv: level does not exist");
            return Ok(());
        };
        let value = match c.pname {
            GL_TEXTURE_WIDTH => level.width,
            GL_TEXTURE_HEIGHT => level.height,
            _ => level.internal_format,
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }

    pub(super) fn handle_pixel_storei(&mut self, c: &PixelStorei, _: &[u8]) -> DecodeResult {
        if !self.validators.pixel_store.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glPixelStorei: pname");
            return Ok(());
        }
        if !self.validators.pixel_store_alignment.is_valid(c.param) {
            self.set_gl_error(GlError::InvalidValue, "glPixelStorei: param");
            return Ok(());
        }
        self.gl.pixel_storei(c.pname, c.param);
        match c.pname {
            GL_PACK_ALIGNMENT => self.state.pack_alignment = c.param,
            _ => self.state.unpack_alignment = c.param,
        }
        Ok(())
    }
}

fn sub_rect_in_level(level: &LevelInfo, x: GLint, y: GLint, width: GLsizei, height: GLsizei) -> bool {
    let (x, y, w, h) = (i64::from(x), i64::from(y), i64::from(width), i64::from(height));
    x >= 0 && y >= 0 && x + w <= i64::from(level.width) && y + h <= i64::from(level.height)
}
