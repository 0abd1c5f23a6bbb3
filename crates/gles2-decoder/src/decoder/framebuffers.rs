use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;

use super::GlesDecoder;
use crate::error::{DecodeResult, GlError};
use crate::resources::{service_id_of, Attachment, Framebuffer};

impl GlesDecoder {
    pub(super) fn handle_bind_framebuffer(&mut self, c: &BindFramebuffer, _: &[u8]) -> DecodeResult {
        if !self.validators.frame_buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glBindFramebuffer: target");
            return Ok(());
        }
        let framebuffer = match c.framebuffer {
            0 => None,
            id => match self.group.framebuffers.get(id) {
                Some(fb) => Some(fb),
                None => {
                    let service_id = self.gl.gen_framebuffer();
                    let Some(fb) = self.group.framebuffers.create(id, service_id) else {
                        self.gl.delete_framebuffer(service_id);
                        self.set_gl_error(GlError::InvalidOperation, "glBindFramebuffer: id in use");
                        return Ok(());
                    };
                    self.group.mark_id_used(id_namespaces::FRAMEBUFFERS, id);
                    Some(fb)
                }
            },
        };
        let service_id = match &framebuffer {
            Some(fb) => fb.service_id(),
            None => self.default_framebuffer(),
        };
        self.gl.bind_framebuffer(c.target, service_id);
        self.state.bound_framebuffer = framebuffer;
        Ok(())
    }

    pub(super) fn handle_bind_renderbuffer(&mut self, c: &BindRenderbuffer, _: &[u8]) -> DecodeResult {
        if !self.validators.render_buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glBindRenderbuffer: target");
            return Ok(());
        }
        let renderbuffer = match c.renderbuffer {
            0 => None,
            id => match self.group.renderbuffers.get(id) {
                Some(rb) => Some(rb),
                None => {
                    let service_id = self.gl.gen_renderbuffer();
                    let Some(rb) = self.group.renderbuffers.create(id, service_id) else {
                        self.gl.delete_renderbuffer(service_id);
                        self.set_gl_error(GlError::InvalidOperation, "glBindRenderbuffer: id in use");
                        return Ok(());
                    };
                    self.group.mark_id_used(id_namespaces::RENDERBUFFERS, id);
                    Some(rb)
                }
            },
        };
        self.gl
            .bind_renderbuffer(c.target, service_id_of(renderbuffer.as_ref()));
        self.state.bound_renderbuffer = renderbuffer;
        Ok(())
    }

    pub(super) fn handle_gen_framebuffers(&mut self, c: &GenFramebuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.framebuffers_shm_id, c.framebuffers_shm_offset)?;
        self.gen_objects(
            |g| &g.framebuffers,
            id_namespaces::FRAMEBUFFERS,
            &ids,
            |gl| gl.gen_framebuffer(),
        )
    }

    pub(super) fn handle_gen_framebuffers_immediate(
        &mut self,
        c: &GenFramebuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.gen_objects(
            |g| &g.framebuffers,
            id_namespaces::FRAMEBUFFERS,
            &ids,
            |gl| gl.gen_framebuffer(),
        )
    }

    pub(super) fn handle_gen_renderbuffers(&mut self, c: &GenRenderbuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.renderbuffers_shm_id, c.renderbuffers_shm_offset)?;
        self.gen_objects(
            |g| &g.renderbuffers,
            id_namespaces::RENDERBUFFERS,
            &ids,
            |gl| gl.gen_renderbuffer(),
        )
    }

    pub(super) fn handle_gen_renderbuffers_immediate(
        &mut self,
        c: &GenRenderbuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.gen_objects(
            |g| &g.renderbuffers,
            id_namespaces::RENDERBUFFERS,
            &ids,
            |gl| gl.gen_renderbuffer(),
        )
    }

    pub(super) fn handle_delete_framebuffers(&mut self, c: &DeleteFramebuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.framebuffers_shm_id, c.framebuffers_shm_offset)?;
        self.delete_framebuffers(&ids);
        Ok(())
    }

    pub(super) fn handle_delete_framebuffers_immediate(
        &mut self,
        c: &DeleteFramebuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.delete_framebuffers(&ids);
        Ok(())
    }

    /// Deleting the bound framebuffer falls back to the default one, which for an offscreen
    /// context is the offscreen target.
    fn delete_framebuffers(&mut self, ids: &[u32]) {
        let removed = self.delete_objects(|g| &g.framebuffers, id_namespaces::FRAMEBUFFERS, ids);
        let bound_removed = self
            .state
            .bound_framebuffer
            .as_ref()
            .is_some_and(|bound| removed.iter().any(|fb| Rc::ptr_eq(fb, bound)));
        if bound_removed {
            self.state.bound_framebuffer = None;
            let default = self.default_framebuffer();
            self.gl.bind_framebuffer(GL_FRAMEBUFFER, default);
        }
    }

    pub(super) fn handle_delete_renderbuffers(&mut self, c: &DeleteRenderbuffers, _: &[u8]) -> DecodeResult {
        let ids = self.shared_ids(c.n, c.renderbuffers_shm_id, c.renderbuffers_shm_offset)?;
        self.delete_renderbuffers(&ids);
        Ok(())
    }

    pub(super) fn handle_delete_renderbuffers_immediate(
        &mut self,
        c: &DeleteRenderbuffersImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let ids = Self::immediate_ids(c.n, data)?;
        self.delete_renderbuffers(&ids);
        Ok(())
    }

    fn delete_renderbuffers(&mut self, ids: &[u32]) {
        for rb in self.delete_objects(|g| &g.renderbuffers, id_namespaces::RENDERBUFFERS, ids) {
            if self
                .state
                .bound_renderbuffer
                .as_ref()
                .is_some_and(|bound| Rc::ptr_eq(bound, &rb))
            {
                self.state.bound_renderbuffer = None;
            }
            if let Some(fb) = self.state.bound_framebuffer.clone() {
                let mut fb = fb.state_mut();
                for attachment in [GL_COLOR_ATTACHMENT0, GL_DEPTH_ATTACHMENT, GL_STENCIL_ATTACHMENT] {
                    let attached = matches!(
                        fb.attachment(attachment),
                        Some(Attachment::Renderbuffer(r)) if Rc::ptr_eq(r, &rb)
                    );
                    if attached {
                        fb.attach(attachment, None);
                    }
                }
            }
        }
    }

    pub(super) fn handle_is_framebuffer(&mut self, c: &IsFramebuffer, _: &[u8]) -> DecodeResult {
        let exists = self.group.framebuffers.contains(c.framebuffer);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    pub(super) fn handle_is_renderbuffer(&mut self, c: &IsRenderbuffer, _: &[u8]) -> DecodeResult {
        let exists = self.group.renderbuffers.contains(c.renderbuffer);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    /// The client framebuffer that attachment commands modify.
    fn framebuffer_for_attach(&mut self, target: GLenum, attachment: GLenum, op: &str) -> Option<Rc<Framebuffer>> {
        if !self.validators.frame_buffer_target.is_valid(target) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: target"));
            return None;
        }
        if !self.validators.attachment.is_valid(attachment) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: attachment"));
            return None;
        }
        let fb = self
            .state
            .bound_framebuffer
            .as_ref()
            .filter(|fb| !fb.is_deleted())
            .cloned();
        if fb.is_none() {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: no framebuffer bound"));
        }
        fb
    }

    pub(super) fn handle_framebuffer_renderbuffer(
        &mut self,
        c: &FramebufferRenderbuffer,
        _: &[u8],
    ) -> DecodeResult {
        const OP: &str = "glFramebufferRenderbuffer";
        if !self.validators.render_buffer_target.is_valid(c.renderbuffertarget) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: renderbuffertarget"));
            return Ok(());
        }
        let Some(fb) = self.framebuffer_for_attach(c.target, c.attachment, OP) else {
            return Ok(());
        };
        let renderbuffer = match c.renderbuffer {
            0 => None,
            id => match self.group.renderbuffers.get(id) {
                Some(rb) => Some(rb),
                None => {
                    self.set_gl_error(GlError::InvalidOperation, format!("{OP}: unknown renderbuffer"));
                    return Ok(());
                }
            },
        };
        self.copy_real_gl_errors();
        self.gl.framebuffer_renderbuffer(
            c.target,
            c.attachment,
            c.renderbuffertarget,
            service_id_of(renderbuffer.as_ref()),
        );
        if self.peek_gl_error() == GL_NO_ERROR {
            fb.state_mut()
                .attach(c.attachment, renderbuffer.map(Attachment::Renderbuffer));
        }
        Ok(())
    }

    pub(super) fn handle_framebuffer_texture_2d(
        &mut self,
        c: &FramebufferTexture2D,
        _: &[u8],
    ) -> DecodeResult {
        const OP: &str = "glFramebufferTexture2D";
        if !self.validators.texture_target.is_valid(c.textarget) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: textarget"));
            return Ok(());
        }
        let Some(fb) = self.framebuffer_for_attach(c.target, c.attachment, OP) else {
            return Ok(());
        };
        let texture = match c.texture {
            0 => None,
            id => match self.group.textures.get(id) {
                Some(texture) => Some(texture),
                None => {
                    self.set_gl_error(GlError::InvalidOperation, format!("{OP}: unknown texture"));
                    return Ok(());
                }
            },
        };
        if texture.is_some() && c.level != 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: level must be 0"));
            return Ok(());
        }
        self.copy_real_gl_errors();
        self.gl.framebuffer_texture_2d(
            c.target,
            c.attachment,
            c.textarget,
            service_id_of(texture.as_ref()),
            c.level,
        );
        if self.peek_gl_error() == GL_NO_ERROR {
            let attachment = texture.map(|texture| Attachment::Texture {
                texture,
                target: c.textarget,
                level: c.level,
            });
            fb.state_mut().attach(c.attachment, attachment);
        }
        Ok(())
    }

    pub(super) fn handle_renderbuffer_storage(&mut self, c: &RenderbufferStorage, _: &[u8]) -> DecodeResult {
        if !self.validators.render_buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glRenderbufferStorage: target");
            return Ok(());
        }
        if !self.validators.render_buffer_format.is_valid(c.internalformat) {
            self.set_gl_error(GlError::InvalidEnum, "glRenderbufferStorage: internalformat");
            return Ok(());
        }
        let max = self.group.limits().max_renderbuffer_size as i64;
        if c.width < 0 || c.height < 0 || i64::from(c.width) > max || i64::from(c.height) > max {
            self.set_gl_error(GlError::InvalidValue, "glRenderbufferStorage: size out of range");
            return Ok(());
        }
        let Some(rb) = self
            .state
            .bound_renderbuffer
            .as_ref()
            .filter(|rb| !rb.is_deleted())
            .cloned()
        else {
            self.set_gl_error(GlError::InvalidOperation, "glRenderbufferStorage: no renderbuffer bound");
            return Ok(());
        };
        self.copy_real_gl_errors();
        self.gl
            .renderbuffer_storage(c.target, c.internalformat, c.width, c.height);
        if self.peek_gl_error() == GL_NO_ERROR {
            let mut state = rb.state_mut();
            state.internal_format = c.internalformat;
            state.width = c.width as u32;
            state.height = c.height as u32;
        }
        Ok(())
    }

    pub(super) fn handle_check_framebuffer_status(
        &mut self,
        c: &CheckFramebufferStatus,
        _: &[u8],
    ) -> DecodeResult {
        self.common
            .check_region(c.result_shm_id, c.result_shm_offset, 4)?;
        if !self.validators.frame_buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glCheckFramebufferStatus: target");
            return Ok(());
        }
        let status = self.gl.check_framebuffer_status(c.target);
        self.write_result(c.result_shm_id, c.result_shm_offset, status)
    }

    pub(super) fn handle_get_framebuffer_attachment_parameteriv(
        &mut self,
        c: &GetFramebufferAttachmentParameteriv,
        _: &[u8],
    ) -> DecodeResult {
        const OP: &str = "glGetFramebufferAttachmentParameteriv";
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.frame_buffer_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: pname"));
            return Ok(());
        }
        if self.framebuffer_for_attach(c.target, c.attachment, OP).is_none() {
            return Ok(());
        }
        self.copy_real_gl_errors();
        let mut value = self
            .gl
            .get_framebuffer_attachment_parameteriv(c.target, c.attachment, c.pname);
        if c.pname == GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME {
            let object_type = self.gl.get_framebuffer_attachment_parameteriv(
                c.target,
                c.attachment,
                GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE,
            ) as GLenum;
            let service_id = value as u32;
            let client_id = match object_type {
                GL_TEXTURE => self.group.textures.get_client_id(service_id),
                GL_RENDERBUFFER => self.group.renderbuffers.get_client_id(service_id),
                _ => None,
            };
            value = client_id.unwrap_or(0) as GLint;
        }
        if self.peek_gl_error() != GL_NO_ERROR {
            return Ok(());
        }
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value as u32])
    }

    pub(super) fn handle_get_renderbuffer_parameteriv(
        &mut self,
        c: &GetRenderbufferParameteriv,
        _: &[u8],
    ) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.render_buffer_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glGetRenderbufferParameteriv: target");
            return Ok(());
        }
        if !self.validators.render_buffer_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetRenderbufferParameteriv: pname");
            return Ok(());
        }
        let Some(rb) = self
            .state
            .bound_renderbuffer
            .as_ref()
            .filter(|rb| !rb.is_deleted())
            .cloned()
        else {
            self.set_gl_error(
                GlError::InvalidOperation,
                "glGetRenderbufferParameteriv: no renderbuffer bound",
            );
            return Ok(());
        };
        let value = {
            let state = rb.state();
            match c.pname {
                GL_RENDERBUFFER_WIDTH => state.width,
                GL_RENDERBUFFER_HEIGHT => state.height,
                _ => state.internal_format,
            }
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }
}
