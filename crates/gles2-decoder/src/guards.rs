//! Scoped save/restore helpers around internal backend work.
//!
//! Each guard borrows the backend for its lifetime and derefs to it, so the guarded work is done
//! through the guard. The restore target is captured at construction; `Drop` puts it back on every
//! exit path.

use core::ops::{Deref, DerefMut};

use gles2_cmd::gl::*;

use crate::error::ErrorBits;
use crate::gl_api::{GlApi, ServiceId};

/// Moves pending backend errors into the shadow bits on entry, and reports any error raised by
/// the guarded internal calls on exit.
pub struct ScopedGlErrorSuppressor<'a> {
    gl: &'a mut dyn GlApi,
    what: &'static str,
}

impl<'a> ScopedGlErrorSuppressor<'a> {
    pub fn new(gl: &'a mut dyn GlApi, error_bits: &mut ErrorBits, what: &'static str) -> Self {
        copy_real_gl_errors(gl, error_bits);
        Self { gl, what }
    }
}

/// Drains the backend error queue into `error_bits`.
pub fn copy_real_gl_errors(gl: &mut dyn GlApi, error_bits: &mut ErrorBits) {
    loop {
        let err = gl.get_error();
        if err == GL_NO_ERROR {
            break;
        }
        error_bits.record(err);
    }
}

impl<'a> Deref for ScopedGlErrorSuppressor<'a> {
    type Target = dyn GlApi + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl<'a> DerefMut for ScopedGlErrorSuppressor<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}

impl Drop for ScopedGlErrorSuppressor<'_> {
    fn drop(&mut self) {
        loop {
            let err = self.gl.get_error();
            if err == GL_NO_ERROR {
                break;
            }
            tracing::error!(error = err, what = self.what, "internal GL call raised an error");
            debug_assert!(
                err == GL_OUT_OF_MEMORY,
                "{}: internal GL call raised {err:#x}",
                self.what
            );
        }
    }
}

/// Binds a texture to `GL_TEXTURE_2D` on unit 0 and restores unit 0's binding and the active
/// unit afterwards.
pub struct ScopedTexture2dBinder<'a> {
    gl: &'a mut dyn GlApi,
    restore_texture: ServiceId,
    restore_active_unit: u32,
}

impl<'a> ScopedTexture2dBinder<'a> {
    /// `restore_texture` is the service id bound to `GL_TEXTURE_2D` on unit 0 and
    /// `restore_active_unit` the active unit index, as the client left them.
    pub fn new(
        gl: &'a mut dyn GlApi,
        texture: ServiceId,
        restore_texture: ServiceId,
        restore_active_unit: u32,
    ) -> Self {
        gl.active_texture(GL_TEXTURE0);
        gl.bind_texture(GL_TEXTURE_2D, texture);
        Self {
            gl,
            restore_texture,
            restore_active_unit,
        }
    }
}

impl<'a> Deref for ScopedTexture2dBinder<'a> {
    type Target = dyn GlApi + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl<'a> DerefMut for ScopedTexture2dBinder<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}

impl Drop for ScopedTexture2dBinder<'_> {
    fn drop(&mut self) {
        self.gl.bind_texture(GL_TEXTURE_2D, self.restore_texture);
        self.gl.active_texture(GL_TEXTURE0 + self.restore_active_unit);
    }
}

pub struct ScopedRenderbufferBinder<'a> {
    gl: &'a mut dyn GlApi,
    restore: ServiceId,
}

impl<'a> ScopedRenderbufferBinder<'a> {
    pub fn new(gl: &'a mut dyn GlApi, renderbuffer: ServiceId, restore: ServiceId) -> Self {
        gl.bind_renderbuffer(GL_RENDERBUFFER, renderbuffer);
        Self { gl, restore }
    }
}

impl<'a> Deref for ScopedRenderbufferBinder<'a> {
    type Target = dyn GlApi + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl<'a> DerefMut for ScopedRenderbufferBinder<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}

impl Drop for ScopedRenderbufferBinder<'_> {
    fn drop(&mut self) {
        self.gl.bind_renderbuffer(GL_RENDERBUFFER, self.restore);
    }
}

pub struct ScopedFramebufferBinder<'a> {
    gl: &'a mut dyn GlApi,
    restore: ServiceId,
}

impl<'a> ScopedFramebufferBinder<'a> {
    pub fn new(gl: &'a mut dyn GlApi, framebuffer: ServiceId, restore: ServiceId) -> Self {
        gl.bind_framebuffer(GL_FRAMEBUFFER, framebuffer);
        Self { gl, restore }
    }
}

impl<'a> Deref for ScopedFramebufferBinder<'a> {
    type Target = dyn GlApi + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl<'a> DerefMut for ScopedFramebufferBinder<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}

impl Drop for ScopedFramebufferBinder<'_> {
    fn drop(&mut self) {
        self.gl.bind_framebuffer(GL_FRAMEBUFFER, self.restore);
    }
}

/// Makes the backend's pristine default context current, and the decoder's context current
/// again on drop. When there is no default context nothing is switched; check
/// [`ScopedDefaultGlContext::switched`].
pub struct ScopedDefaultGlContext<'a> {
    gl: &'a mut dyn GlApi,
    switched: bool,
}

impl<'a> ScopedDefaultGlContext<'a> {
    pub fn new(gl: &'a mut dyn GlApi) -> Self {
        let switched = gl.make_default_context_current();
        Self { gl, switched }
    }

    pub fn switched(&self) -> bool {
        self.switched
    }
}

impl<'a> Deref for ScopedDefaultGlContext<'a> {
    type Target = dyn GlApi + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl<'a> DerefMut for ScopedDefaultGlContext<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}

impl Drop for ScopedDefaultGlContext<'_> {
    fn drop(&mut self) {
        if self.switched && !self.gl.make_current() {
            tracing::warn!("failed to make the decoder context current again");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soft_gl::SoftGl;

    #[test]
    fn texture_binder_restores_unit_and_binding() {
        let probe = SoftGl::new_offscreen();
        let mut gl = probe.clone();
        let tex_a = gl.gen_texture();
        let tex_b = gl.gen_texture();
        gl.active_texture(GL_TEXTURE0);
        gl.bind_texture(GL_TEXTURE_2D, tex_a);
        gl.active_texture(GL_TEXTURE0 + 3);

        let before = (probe.active_texture_unit(), probe.texture_binding(0, GL_TEXTURE_2D));
        {
            let mut binder = ScopedTexture2dBinder::new(&mut gl, tex_b, tex_a, 3);
            assert_eq!(probe.texture_binding(0, GL_TEXTURE_2D), tex_b);
            binder.tex_parameteri(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_LINEAR as GLint);
            binder.active_texture(GL_TEXTURE0 + 5);
        }
        let after = (probe.active_texture_unit(), probe.texture_binding(0, GL_TEXTURE_2D));
        assert_eq!(before, after);
    }

    #[test]
    fn framebuffer_and_renderbuffer_binders_restore() {
        let probe = SoftGl::new_offscreen();
        let mut gl = probe.clone();
        let fb = gl.gen_framebuffer();
        let rb = gl.gen_renderbuffer();
        {
            let mut fb_binder = ScopedFramebufferBinder::new(&mut gl, fb, 0);
            assert_eq!(probe.framebuffer_binding(), fb);
            let rb_binder = ScopedRenderbufferBinder::new(&mut *fb_binder, rb, 0);
            assert_eq!(probe.renderbuffer_binding(), rb);
            drop(rb_binder);
            assert_eq!(probe.renderbuffer_binding(), 0);
        }
        assert_eq!(probe.framebuffer_binding(), 0);
    }

    #[test]
    fn suppressor_moves_pending_errors_to_shadow_bits() {
        let probe = SoftGl::new_offscreen();
        let mut gl = probe.clone();
        gl.bind_buffer(0x1234, 0);
        let mut bits = ErrorBits::empty();
        {
            let mut quiet = ScopedGlErrorSuppressor::new(&mut gl, &mut bits, "test");
            quiet.flush();
        }
        assert!(bits.contains(ErrorBits::INVALID_ENUM));
        assert_eq!(gl.get_error(), GL_NO_ERROR);
    }

    #[test]
    fn default_context_switch_is_undone() {
        let probe = SoftGl::new_offscreen();
        let mut gl = probe.clone();
        {
            let ctx = ScopedDefaultGlContext::new(&mut gl);
            assert!(ctx.switched());
            assert!(probe.default_context_current());
        }
        assert!(!probe.default_context_current());

        let mut lonely = SoftGl::builder().default_context(false).build();
        let ctx = ScopedDefaultGlContext::new(&mut lonely);
        assert!(!ctx.switched());
    }
}
