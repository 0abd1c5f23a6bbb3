//! The offscreen render target of contexts without a window surface, and the swap that
//! publishes it to a parent context.
//!
//! Resizes are deferred: [`GlesDecoder::resize_offscreen_frame_buffer`] only records the size,
//! and storage is reallocated once at the next swap so a frame in flight is never truncated.

use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::gles2::SwapBuffers;

use super::{GlesDecoder, ParentLink, ParentShared};
use crate::error::{CmdError, DecodeResult};
use crate::gl_api::{GlApi, ServiceId, Size};
use crate::guards::{
    ScopedDefaultGlContext, ScopedFramebufferBinder, ScopedGlErrorSuppressor,
    ScopedRenderbufferBinder, ScopedTexture2dBinder,
};
use crate::resources::{service_id_of, LevelInfo};

/// Where an offscreen target is in its allocation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffscreenPhase {
    /// Objects exist but no storage has been allocated yet.
    Uninitialized,
    /// A new size is pending until the next swap.
    Sized,
    /// Storage is allocated and attached but not yet cleared.
    Attached,
    /// Complete, cleared and matching the requested size.
    Ready,
}

#[derive(Debug)]
pub(super) struct OffscreenTarget {
    framebuffer: ServiceId,
    color_texture: ServiceId,
    /// Packed depth-stencil storage, or depth only when `stencil` is non-zero.
    depth: ServiceId,
    stencil: ServiceId,
    /// Copy of the last swapped frame, only created for a parent link.
    saved_texture: ServiceId,
    allocated: Size,
    pending: Size,
    phase: OffscreenPhase,
}

impl OffscreenTarget {
    pub(super) fn create(gl: &mut dyn GlApi, size: Size) -> Self {
        let packed = gl.capabilities().packed_depth_stencil;
        Self {
            framebuffer: gl.gen_framebuffer(),
            color_texture: gl.gen_texture(),
            depth: gl.gen_renderbuffer(),
            stencil: if packed { 0 } else { gl.gen_renderbuffer() },
            saved_texture: 0,
            allocated: Size::default(),
            pending: clamp_size(size),
            phase: OffscreenPhase::Uninitialized,
        }
    }

    pub(super) fn delete(self, gl: &mut dyn GlApi) {
        gl.delete_framebuffer(self.framebuffer);
        for texture in [self.color_texture, self.saved_texture] {
            if texture != 0 {
                gl.delete_texture(texture);
            }
        }
        for renderbuffer in [self.depth, self.stencil] {
            if renderbuffer != 0 {
                gl.delete_renderbuffer(renderbuffer);
            }
        }
    }

    pub(super) fn framebuffer(&self) -> ServiceId {
        self.framebuffer
    }

    pub(super) fn allocated_size(&self) -> Size {
        self.allocated
    }

    /// Gives up the saved texture without deleting it; it now belongs to the parent's group.
    pub(super) fn release_saved_texture(&mut self) {
        self.saved_texture = 0;
    }

    fn is_current(&self) -> bool {
        self.phase == OffscreenPhase::Ready && self.allocated == self.pending
    }
}

/// Zero-sized surfaces are not allocatable.
fn clamp_size(size: Size) -> Size {
    Size::new(size.width.max(1), size.height.max(1))
}

/// Clears all buffers of the bound framebuffer to black, transparent, depth 1 and stencil 0.
fn clear_all_buffers(gl: &mut dyn GlApi) {
    gl.disable(GL_SCISSOR_TEST);
    gl.clear_color([0.0; 4]);
    gl.color_mask([true; 4]);
    gl.clear_depth(1.0);
    gl.depth_mask(true);
    gl.clear_stencil(0);
    gl.stencil_mask_separate(GL_FRONT_AND_BACK, u32::MAX);
    gl.clear(GL_COLOR_BUFFER_BIT | GL_DEPTH_BUFFER_BIT | GL_STENCIL_BUFFER_BIT);
}

impl GlesDecoder {
    /// Requests a new offscreen size, applied at the next swap. Returns false for an onscreen
    /// context.
    pub fn resize_offscreen_frame_buffer(&mut self, size: Size) -> bool {
        let Some(target) = self.offscreen.as_mut() else {
            return false;
        };
        target.pending = clamp_size(size);
        if !target.is_current() && target.phase != OffscreenPhase::Uninitialized {
            target.phase = OffscreenPhase::Sized;
        }
        tracing::trace!(
            width = target.pending.width,
            height = target.pending.height,
            "offscreen resize requested"
        );
        true
    }

    /// `None` for an onscreen context.
    pub fn offscreen_phase(&self) -> Option<OffscreenPhase> {
        self.offscreen.as_ref().map(|t| t.phase)
    }

    /// Size the offscreen storage is currently allocated at.
    pub fn offscreen_size(&self) -> Option<Size> {
        self.offscreen.as_ref().map(|t| t.allocated)
    }

    /// Creates the saved texture and registers it as `texture_id` in the parent's share group.
    pub(super) fn register_with_parent(&mut self, shared: &Rc<ParentShared>, texture_id: u32) {
        let unit0 = self.unit0_texture_2d();
        let active = self.state.active_texture_unit as u32;
        let Some(target) = self.offscreen.as_mut() else {
            return;
        };
        let saved = self.gl.gen_texture();
        {
            let mut tex = ScopedTexture2dBinder::new(&mut *self.gl, saved, unit0, active);
            tex.tex_parameteri(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR as GLint);
            tex.tex_parameteri(GL_TEXTURE_2D, GL_TEXTURE_WRAP_S, GL_CLAMP_TO_EDGE as GLint);
            tex.tex_parameteri(GL_TEXTURE_2D, GL_TEXTURE_WRAP_T, GL_CLAMP_TO_EDGE as GLint);
        }
        target.saved_texture = saved;

        if let Some(texture) = shared.group.textures.create(texture_id, saved) {
            let mut state = texture.state_mut();
            state.set_target(GL_TEXTURE_2D);
            state.min_filter = GL_LINEAR;
            state.wrap_s = GL_CLAMP_TO_EDGE;
            state.wrap_t = GL_CLAMP_TO_EDGE;
        }
        shared.group.mark_id_used(id_namespaces::TEXTURES, texture_id);
        self.parent = Some(ParentLink {
            parent: Rc::downgrade(shared),
            texture_id,
        });
        tracing::debug!(texture_id, "registered saved texture with parent");
    }

    /// The parent's share group, if the link exists and the parent is still alive.
    fn live_parent(&self) -> Option<(Rc<ParentShared>, u32)> {
        let link = self.parent.as_ref()?;
        Some((link.parent.upgrade()?, link.texture_id))
    }

    /// Reallocates offscreen storage if a different size is pending. On failure returns the
    /// framebuffer status that made the target unusable.
    pub(super) fn update_offscreen_frame_buffer_size(&mut self) -> Result<(), GLenum> {
        let Some(target) = self.offscreen.as_mut() else {
            return Ok(());
        };
        if target.is_current() {
            return Ok(());
        }
        let size = target.pending;
        let (width, height) = (size.width as GLsizei, size.height as GLsizei);
        let (framebuffer, color, depth, stencil, saved) = (
            target.framebuffer,
            target.color_texture,
            target.depth,
            target.stencil,
            target.saved_texture,
        );
        target.allocated = Size::default();

        let unit0 = self.unit0_texture_2d();
        let active = self.state.active_texture_unit as u32;
        let client_renderbuffer = service_id_of(self.state.bound_renderbuffer.as_ref());
        let client_framebuffer = self.bound_framebuffer_service_id();

        let status = {
            let mut quiet =
                ScopedGlErrorSuppressor::new(&mut *self.gl, &mut self.error_bits, "offscreen resize");
            {
                let mut tex = ScopedTexture2dBinder::new(&mut *quiet, color, unit0, active);
                tex.tex_parameteri(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR as GLint);
                tex.tex_image_2d(
                    GL_TEXTURE_2D,
                    0,
                    GL_RGBA,
                    width,
                    height,
                    GL_RGBA,
                    GL_UNSIGNED_BYTE,
                    &[],
                );
            }
            {
                let mut rb = ScopedRenderbufferBinder::new(&mut *quiet, depth, client_renderbuffer);
                if stencil == 0 {
                    rb.renderbuffer_storage(GL_RENDERBUFFER, GL_DEPTH24_STENCIL8, width, height);
                } else {
                    rb.renderbuffer_storage(GL_RENDERBUFFER, GL_DEPTH_COMPONENT16, width, height);
                    rb.bind_renderbuffer(GL_RENDERBUFFER, stencil);
                    rb.renderbuffer_storage(GL_RENDERBUFFER, GL_STENCIL_INDEX8, width, height);
                }
            }
            let mut fb = ScopedFramebufferBinder::new(&mut *quiet, framebuffer, client_framebuffer);
            fb.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, color, 0);
            fb.framebuffer_renderbuffer(GL_FRAMEBUFFER, GL_DEPTH_ATTACHMENT, GL_RENDERBUFFER, depth);
            let stencil_attachment = if stencil == 0 { depth } else { stencil };
            fb.framebuffer_renderbuffer(
                GL_FRAMEBUFFER,
                GL_STENCIL_ATTACHMENT,
                GL_RENDERBUFFER,
                stencil_attachment,
            );
            fb.check_framebuffer_status(GL_FRAMEBUFFER)
        };
        if status != GL_FRAMEBUFFER_COMPLETE {
            tracing::warn!(status, width, height, "offscreen framebuffer incomplete after resize");
            return Err(status);
        }
        if let Some(target) = self.offscreen.as_mut() {
            target.phase = OffscreenPhase::Attached;
        }

        self.clear_offscreen_target(framebuffer);

        if saved != 0 {
            if let Some((parent, texture_id)) = self.live_parent() {
                {
                    let mut tex = ScopedTexture2dBinder::new(&mut *self.gl, saved, unit0, active);
                    tex.tex_image_2d(
                        GL_TEXTURE_2D,
                        0,
                        GL_RGBA,
                        width,
                        height,
                        GL_RGBA,
                        GL_UNSIGNED_BYTE,
                        &[],
                    );
                }
                if let Some(texture) = parent.group.textures.get(texture_id) {
                    texture.state_mut().set_level_info(
                        GL_TEXTURE_2D,
                        0,
                        LevelInfo {
                            valid: true,
                            internal_format: GL_RGBA,
                            width: size.width,
                            height: size.height,
                            format: GL_RGBA,
                            ty: GL_UNSIGNED_BYTE,
                        },
                    );
                }
            }
        }

        if let Some(target) = self.offscreen.as_mut() {
            target.allocated = size;
            target.phase = OffscreenPhase::Ready;
        }
        tracing::debug!(width = size.width, height = size.height, "offscreen target reallocated");
        Ok(())
    }

    /// Clears freshly allocated storage in the pristine default context. Without one, the clear
    /// happens here and the client's clear state is put back from the shadow.
    fn clear_offscreen_target(&mut self, framebuffer: ServiceId) {
        let client_framebuffer = self.bound_framebuffer_service_id();
        {
            let mut ctx = ScopedDefaultGlContext::new(&mut *self.gl);
            if ctx.switched() {
                let mut fb = ScopedFramebufferBinder::new(&mut *ctx, framebuffer, 0);
                clear_all_buffers(&mut *fb);
                return;
            }
        }

        {
            let mut fb = ScopedFramebufferBinder::new(&mut *self.gl, framebuffer, client_framebuffer);
            clear_all_buffers(&mut *fb);
        }
        let state = &self.state;
        if state.is_enabled(GL_SCISSOR_TEST) {
            self.gl.enable(GL_SCISSOR_TEST);
        }
        self.gl.clear_color(state.clear_color);
        self.gl.color_mask(state.color_mask);
        self.gl.clear_depth(state.clear_depth);
        self.gl.depth_mask(state.depth_mask);
        self.gl.clear_stencil(state.clear_stencil);
        self.gl.stencil_mask_separate(GL_FRONT, state.stencil_mask_front);
        self.gl.stencil_mask_separate(GL_BACK, state.stencil_mask_back);
    }

    pub(super) fn handle_swap_buffers(&mut self, _: &SwapBuffers, _: &[u8]) -> DecodeResult {
        if self.offscreen.is_some() {
            if let Err(status) = self.update_offscreen_frame_buffer_size() {
                tracing::warn!(status, "could not reallocate offscreen target, context lost");
                return Err(CmdError::LostContext);
            }
            self.copy_to_saved_texture();
        } else {
            self.gl.swap_buffers();
        }
        if let Some(callback) = self.swap_callback.as_mut() {
            callback();
        }
        Ok(())
    }

    /// Publishes the rendered frame to the parent by copying it into the saved texture.
    fn copy_to_saved_texture(&mut self) {
        let Some(target) = self.offscreen.as_ref() else {
            return;
        };
        if target.saved_texture == 0 || self.live_parent().is_none() {
            return;
        }
        let (framebuffer, saved, size) = (target.framebuffer, target.saved_texture, target.allocated);
        let unit0 = self.unit0_texture_2d();
        let active = self.state.active_texture_unit as u32;
        let client_framebuffer = self.bound_framebuffer_service_id();

        let mut quiet = ScopedGlErrorSuppressor::new(&mut *self.gl, &mut self.error_bits, "swap copy");
        let mut fb = ScopedFramebufferBinder::new(&mut *quiet, framebuffer, client_framebuffer);
        let mut tex = ScopedTexture2dBinder::new(&mut *fb, saved, unit0, active);
        tex.copy_tex_sub_image_2d(
            GL_TEXTURE_2D,
            0,
            0,
            0,
            0,
            0,
            size.width as GLsizei,
            size.height as GLsizei,
        );
    }
}
