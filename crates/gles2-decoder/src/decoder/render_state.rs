use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;

use super::GlesDecoder;
use crate::error::{DecodeResult, GlError};

const CLEAR_MASK: GLbitfield = GL_COLOR_BUFFER_BIT | GL_DEPTH_BUFFER_BIT | GL_STENCIL_BUFFER_BIT;

impl GlesDecoder {
    pub(super) fn handle_enable(&mut self, c: &Enable, _: &[u8]) -> DecodeResult {
        self.set_capability(c.cap, true, "glEnable");
        Ok(())
    }

    pub(super) fn handle_disable(&mut self, c: &Disable, _: &[u8]) -> DecodeResult {
        self.set_capability(c.cap, false, "glDisable");
        Ok(())
    }

    fn set_capability(&mut self, cap: GLenum, enabled: bool, op: &str) {
        if !self.validators.capability.is_valid(cap) {
            self.set_gl_error(GlError::InvalidEnum, format!("{op}: cap"));
            return;
        }
        self.state.enabled.insert(cap, enabled);
        if enabled {
            self.gl.enable(cap);
        } else {
            self.gl.disable(cap);
        }
    }

    pub(super) fn handle_is_enabled(&mut self, c: &IsEnabled, _: &[u8]) -> DecodeResult {
        self.write_result(c.result_shm_id, c.result_shm_offset, 0)?;
        if !self.validators.capability.is_valid(c.cap) {
            self.set_gl_error(GlError::InvalidEnum, "glIsEnabled: cap");
            return Ok(());
        }
        let enabled = self.state.is_enabled(c.cap);
        self.write_result(c.result_shm_id, c.result_shm_offset, enabled as u32)
    }

    pub(super) fn handle_clear_color(&mut self, c: &ClearColor, _: &[u8]) -> DecodeResult {
        let rgba = [c.red, c.green, c.blue, c.alpha].map(|v| v.clamp(0.0, 1.0));
        self.state.clear_color = rgba;
        self.gl.clear_color(rgba);
        Ok(())
    }

    pub(super) fn handle_clear_depthf(&mut self, c: &ClearDepthf, _: &[u8]) -> DecodeResult {
        let depth = c.depth.clamp(0.0, 1.0);
        self.state.clear_depth = depth;
        self.gl.clear_depth(depth);
        Ok(())
    }

    pub(super) fn handle_clear_stencil(&mut self, c: &ClearStencil, _: &[u8]) -> DecodeResult {
        self.state.clear_stencil = c.s;
        self.gl.clear_stencil(c.s);
        Ok(())
    }

    pub(super) fn handle_color_mask(&mut self, c: &ColorMask, _: &[u8]) -> DecodeResult {
        let mask = [c.red, c.green, c.blue, c.alpha].map(|v| v != 0);
        self.state.color_mask = mask;
        self.gl.color_mask(mask);
        Ok(())
    }

    pub(super) fn handle_depth_mask(&mut self, c: &DepthMask, _: &[u8]) -> DecodeResult {
        let flag = c.flag != 0;
        self.state.depth_mask = flag;
        self.gl.depth_mask(flag);
        Ok(())
    }

    pub(super) fn handle_stencil_mask(&mut self, c: &StencilMask, _: &[u8]) -> DecodeResult {
        self.state.stencil_mask_front = c.mask;
        self.state.stencil_mask_back = c.mask;
        self.gl.stencil_mask_separate(GL_FRONT_AND_BACK, c.mask);
        Ok(())
    }

    pub(super) fn handle_stencil_mask_separate(
        &mut self,
        c: &StencilMaskSeparate,
        _: &[u8],
    ) -> DecodeResult {
        if !self.validators.face_type.is_valid(c.face) {
            self.set_gl_error(GlError::InvalidEnum, "glStencilMaskSeparate: face");
            return Ok(());
        }
        if c.face != GL_BACK {
            self.state.stencil_mask_front = c.mask;
        }
        if c.face != GL_FRONT {
            self.state.stencil_mask_back = c.mask;
        }
        self.gl.stencil_mask_separate(c.face, c.mask);
        Ok(())
    }

    pub(super) fn handle_clear(&mut self, c: &Clear, _: &[u8]) -> DecodeResult {
        if c.mask & !CLEAR_MASK != 0 {
            self.set_gl_error(GlError::InvalidValue, "glClear: invalid mask bits");
            return Ok(());
        }
        if self.check_framebuffer_complete("glClear") {
            self.gl.clear(c.mask);
        }
        Ok(())
    }

    pub(super) fn handle_viewport(&mut self, c: &Viewport, _: &[u8]) -> DecodeResult {
        if c.width < 0 || c.height < 0 {
            self.set_gl_error(GlError::InvalidValue, "glViewport: size < 0");
            return Ok(());
        }
        self.gl.viewport(c.x, c.y, c.width, c.height);
        Ok(())
    }

    pub(super) fn handle_scissor(&mut self, c: &Scissor, _: &[u8]) -> DecodeResult {
        if c.width < 0 || c.height < 0 {
            self.set_gl_error(GlError::InvalidValue, "glScissor: size < 0");
            return Ok(());
        }
        self.gl.scissor(c.x, c.y, c.width, c.height);
        Ok(())
    }

    pub(super) fn handle_blend_color(&mut self, c: &BlendColor, _: &[u8]) -> DecodeResult {
        let rgba = [c.red, c.green, c.blue, c.alpha].map(|v| v.clamp(0.0, 1.0));
        self.gl.blend_color(rgba);
        Ok(())
    }

    pub(super) fn handle_blend_equation(&mut self, c: &BlendEquation, _: &[u8]) -> DecodeResult {
        if !self.validators.equation.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, "glBlendEquation: mode");
            return Ok(());
        }
        self.gl.blend_equation(c.mode);
        Ok(())
    }

    pub(super) fn handle_blend_func(&mut self, c: &BlendFunc, _: &[u8]) -> DecodeResult {
        if !self.validators.src_blend_factor.is_valid(c.sfactor) {
            self.set_gl_error(GlError::InvalidEnum, "glBlendFunc: sfactor");
            return Ok(());
        }
        if !self.validators.dst_blend_factor.is_valid(c.dfactor) {
            self.set_gl_error(GlError::InvalidEnum, "glBlendFunc: dfactor");
            return Ok(());
        }
        self.gl.blend_func(c.sfactor, c.dfactor);
        Ok(())
    }

    pub(super) fn handle_cull_face(&mut self, c: &CullFace, _: &[u8]) -> DecodeResult {
        if !self.validators.face_type.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, "glCullFace: mode");
            return Ok(());
        }
        self.gl.cull_face(c.mode);
        Ok(())
    }

    pub(super) fn handle_depth_func(&mut self, c: &DepthFunc, _: &[u8]) -> DecodeResult {
        if !self.validators.cmp_function.is_valid(c.func) {
            self.set_gl_error(GlError::InvalidEnum, "glDepthFunc: func");
            return Ok(());
        }
        self.gl.depth_func(c.func);
        Ok(())
    }

    pub(super) fn handle_depth_rangef(&mut self, c: &DepthRangef, _: &[u8]) -> DecodeResult {
        self.gl
            .depth_range(c.z_near.clamp(0.0, 1.0), c.z_far.clamp(0.0, 1.0));
        Ok(())
    }

    pub(super) fn handle_front_face(&mut self, c: &FrontFace, _: &[u8]) -> DecodeResult {
        if !self.validators.face_mode.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, "glFrontFace: mode");
            return Ok(());
        }
        self.gl.front_face(c.mode);
        Ok(())
    }

    pub(super) fn handle_hint(&mut self, c: &Hint, _: &[u8]) -> DecodeResult {
        if !self.validators.hint_target.is_valid(c.target) {
            self.set_gl_error(GlError::InvalidEnum, "glHint: target");
            return Ok(());
        }
        if !self.validators.hint_mode.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, "glHint: mode");
            return Ok(());
        }
        self.gl.hint(c.target, c.mode);
        Ok(())
    }

    pub(super) fn handle_line_width(&mut self, c: &LineWidth, _: &[u8]) -> DecodeResult {
        if c.width.is_nan() || c.width <= 0.0 {
            self.set_gl_error(GlError::InvalidValue, "glLineWidth: width <= 0");
            return Ok(());
        }
        self.gl.line_width(c.width);
        Ok(())
    }

    pub(super) fn handle_polygon_offset(&mut self, c: &PolygonOffset, _: &[u8]) -> DecodeResult {
        self.gl.polygon_offset(c.factor, c.units);
        Ok(())
    }

    pub(super) fn handle_sample_coverage(&mut self, c: &SampleCoverage, _: &[u8]) -> DecodeResult {
        self.gl
            .sample_coverage(c.value.clamp(0.0, 1.0), c.invert != 0);
        Ok(())
    }

    pub(super) fn handle_stencil_func(&mut self, c: &StencilFunc, _: &[u8]) -> DecodeResult {
        if !self.validators.cmp_function.is_valid(c.func) {
            self.set_gl_error(GlError::InvalidEnum, "glStencilFunc: func");
            return Ok(());
        }
        self.gl.stencil_func(c.func, c.reference, c.mask);
        Ok(())
    }

    pub(super) fn handle_stencil_op(&mut self, c: &StencilOp, _: &[u8]) -> DecodeResult {
        for (op, name) in [(c.fail, "fail"), (c.zfail, "zfail"), (c.zpass, "zpass")] {
            if !self.validators.stencil_op.is_valid(op) {
                self.set_gl_error(GlError::InvalidEnum, format!("glStencilOp: {name}"));
                return Ok(());
            }
        }
        self.gl.stencil_op(c.fail, c.zfail, c.zpass);
        Ok(())
    }

    pub(super) fn handle_finish(&mut self, _: &Finish, _: &[u8]) -> DecodeResult {
        self.gl.finish();
        Ok(())
    }

    pub(super) fn handle_flush(&mut self, _: &Flush, _: &[u8]) -> DecodeResult {
        self.gl.flush();
        Ok(())
    }
}
