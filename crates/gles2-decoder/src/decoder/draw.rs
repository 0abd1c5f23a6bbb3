//! Draw-time validation and the temporary state a draw needs on top of the client's.
//!
//! Before every draw the decoder proves that each enabled vertex attribute the program consumes
//! can be fetched for every vertex the draw may touch. The backend never bounds-checks these
//! reads itself.

use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_cmd::util::bind_target_for_sampler_type;

use super::GlesDecoder;
use crate::error::{DecodeResult, GlError};
use crate::gl_api::GlApi;
use crate::resources::service_id_of;

/// A texture unit whose client binding was swapped for a black texture during a draw.
struct SubstitutedUnit {
    unit: u32,
    target: GLenum,
}

/// Temporary backend state installed for one draw.
struct DrawSetup {
    attrib0_simulated: bool,
    substituted: Vec<SubstitutedUnit>,
}

impl GlesDecoder {
    pub(super) fn handle_draw_arrays(&mut self, c: &DrawArrays, _: &[u8]) -> DecodeResult {
        const OP: &str = "glDrawArrays";
        if !self.validators.draw_mode.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: mode"));
            return Ok(());
        }
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: count < 0"));
            return Ok(());
        }
        if c.first < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: first < 0"));
            return Ok(());
        }
        if c.count == 0 {
            return Ok(());
        }
        let Some(max_vertex) = c.first.checked_add(c.count - 1) else {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: first + count overflows"));
            return Ok(());
        };
        if !self.check_framebuffer_complete(OP) {
            return Ok(());
        }
        self.draw(max_vertex as u32, OP, |gl| gl.draw_arrays(c.mode, c.first, c.count));
        Ok(())
    }

    pub(super) fn handle_draw_elements(&mut self, c: &DrawElements, _: &[u8]) -> DecodeResult {
        const OP: &str = "glDrawElements";
        let Some(buffer) = self
            .state
            .bound_element_array_buffer
            .as_ref()
            .filter(|b| !b.is_deleted())
            .cloned()
        else {
            self.set_gl_error(GlError::InvalidOperation, format!("{OP}: no element array buffer bound"));
            return Ok(());
        };
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: count < 0"));
            return Ok(());
        }
        if !self.validators.draw_mode.is_valid(c.mode) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: mode"));
            return Ok(());
        }
        if !self.validators.index_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, format!("{OP}: type"));
            return Ok(());
        }
        if c.count == 0 {
            return Ok(());
        }
        if !self.check_framebuffer_complete(OP) {
            return Ok(());
        }
        let max_vertex = buffer
            .state_mut()
            .max_value_for_range(c.index_offset, c.count as u32, c.ty);
        let Some(max_vertex) = max_vertex else {
            self.set_gl_error(GlError::InvalidOperation, format!("{OP}: range out of bounds for buffer"));
            return Ok(());
        };
        self.draw(max_vertex, OP, |gl| {
            gl.draw_elements(c.mode, c.count, c.ty, c.index_offset)
        });
        Ok(())
    }

    /// Validates attribute access up to `max_vertex`, then issues `call` with attribute 0 and
    /// sampler bindings patched as needed, restoring them afterwards.
    fn draw(&mut self, max_vertex: u32, op: &str, call: impl FnOnce(&mut dyn GlApi)) {
        if !self.is_draw_valid(max_vertex, op) {
            return;
        }
        let Some(setup) = self.prepare_draw(max_vertex) else {
            return;
        };
        call(&mut *self.gl);
        self.restore_after_draw(setup);
    }

    /// Whether every enabled attribute can serve vertices `0..=max_vertex`. With no usable
    /// program the draw is skipped without an error.
    fn is_draw_valid(&mut self, max_vertex: u32, op: &str) -> bool {
        let Some(program) = self.current_program() else {
            return false;
        };
        let failure = {
            let program = program.state();
            if !program.link_status {
                Some("program not linked")
            } else {
                self.vertex_attribs.enabled_attribs().find_map(|info| {
                    if program.is_attrib_used(info.index()) {
                        (!info.can_access(max_vertex))
                            .then_some("attempt to access out of range vertices")
                    } else {
                        info.buffer()
                            .filter(|b| !b.is_deleted())
                            .is_none()
                            .then_some("attempt to render with no buffer attached to enabled attrib")
                    }
                })
            }
        };
        match failure {
            Some(reason) => {
                self.set_gl_error(GlError::InvalidOperation, format!("{op}: {reason}"));
                false
            }
            None => true,
        }
    }

    fn prepare_draw(&mut self, max_vertex: u32) -> Option<DrawSetup> {
        let attrib0_simulated = self.simulate_attrib0(max_vertex)?;
        let substituted = self.set_black_texture_for_non_renderable_textures();
        Some(DrawSetup {
            attrib0_simulated,
            substituted,
        })
    }

    fn restore_after_draw(&mut self, setup: DrawSetup) {
        if !setup.substituted.is_empty() {
            self.restore_state_for_non_renderable_textures(&setup.substituted);
        }
        if setup.attrib0_simulated {
            self.restore_state_for_simulated_attrib0();
        }
    }

    /// Feeds attribute 0 from a scratch buffer holding its constant value when the backend
    /// cannot draw with it disabled. Returns whether the scratch buffer is in use, or `None`
    /// if it could not be allocated and the draw must be dropped.
    fn simulate_attrib0(&mut self, max_vertex: u32) -> Option<bool> {
        if !self.group.features().needs_attrib0_emulation {
            return Some(false);
        }
        let Some(info) = self.vertex_attribs.get(0) else {
            return Some(false);
        };
        if info.enabled() {
            return Some(false);
        }
        let value = info.value();
        let used = self
            .current_program()
            .is_some_and(|p| p.state().is_attrib_used(0));
        if !used {
            return Some(false);
        }

        let size_needed = (u64::from(max_vertex) + 1) * 16;
        let Ok(size_needed) = u32::try_from(size_needed) else {
            self.set_gl_error(GlError::OutOfMemory, "simulating attrib 0");
            return None;
        };
        if self.attrib0.service_id == 0 {
            self.attrib0.service_id = self.gl.gen_buffer();
        }
        self.gl.bind_buffer(GL_ARRAY_BUFFER, self.attrib0.service_id);

        if size_needed > self.attrib0.size {
            self.copy_real_gl_errors();
            self.gl
                .buffer_data(GL_ARRAY_BUFFER, &vec![0; size_needed as usize], GL_DYNAMIC_DRAW);
            if self.peek_gl_error() != GL_NO_ERROR {
                self.set_gl_error(GlError::OutOfMemory, "simulating attrib 0");
                let client = service_id_of(self.state.bound_array_buffer.as_ref());
                self.gl.bind_buffer(GL_ARRAY_BUFFER, client);
                return None;
            }
            tracing::debug!(size = size_needed, "attrib 0 buffer reallocated");
            self.attrib0.size = size_needed;
            self.attrib0.filled = 0;
            self.attrib0.value = None;
        }
        if self.attrib0.value != Some(value) || size_needed > self.attrib0.filled {
            let vertices = size_needed as usize / 16;
            let data: Vec<f32> = value.iter().copied().cycle().take(vertices * 4).collect();
            self.gl
                .buffer_sub_data(GL_ARRAY_BUFFER, 0, bytemuck::cast_slice(&data));
            self.attrib0.value = Some(value);
            self.attrib0.filled = size_needed;
        }
        self.gl.vertex_attrib_pointer(0, 4, GL_FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(0);
        Some(true)
    }

    /// Puts attribute 0 back the way the client configured it.
    fn restore_state_for_simulated_attrib0(&mut self) {
        let Some(info) = self.vertex_attribs.get(0) else {
            return;
        };
        let (buffer, size, ty, normalized, stride, offset) = (
            service_id_of(info.buffer()),
            info.size(),
            info.ty(),
            info.normalized(),
            info.gl_stride(),
            info.offset(),
        );
        self.gl.bind_buffer(GL_ARRAY_BUFFER, buffer);
        self.gl
            .vertex_attrib_pointer(0, size, ty, normalized, stride, offset);
        self.gl.disable_vertex_attrib_array(0);
        let client = service_id_of(self.state.bound_array_buffer.as_ref());
        self.gl.bind_buffer(GL_ARRAY_BUFFER, client);
    }

    /// Binds the black texture on every sampler unit whose client texture cannot be sampled.
    fn set_black_texture_for_non_renderable_textures(&mut self) -> Vec<SubstitutedUnit> {
        let Some(program) = self.current_program() else {
            return Vec::new();
        };
        let npot = self.group.features().npot_textures;
        let mut substituted: Vec<SubstitutedUnit> = Vec::new();
        for uniform in program.state().sampler_uniforms() {
            let Some(target) = bind_target_for_sampler_type(uniform.ty) else {
                continue;
            };
            for &unit in &uniform.texture_units {
                let Some(texture_unit) = self.state.texture_units.get(unit as usize) else {
                    continue;
                };
                let renderable = texture_unit
                    .bound(target)
                    .is_some_and(|t| t.state().can_render(npot));
                let seen = substituted
                    .iter()
                    .any(|s| s.unit == unit && s.target == target);
                if !renderable && !seen {
                    substituted.push(SubstitutedUnit { unit, target });
                }
            }
        }
        for s in &substituted {
            let black = match s.target {
                GL_TEXTURE_2D => self.black_texture_2d,
                _ => self.black_texture_cube_map,
            };
            self.gl.active_texture(GL_TEXTURE0 + s.unit);
            self.gl.bind_texture(s.target, black);
        }
        if !substituted.is_empty() {
            self.gl
                .active_texture(GL_TEXTURE0 + self.state.active_texture_unit as u32);
        }
        substituted
    }

    fn restore_state_for_non_renderable_textures(&mut self, substituted: &[SubstitutedUnit]) {
        for s in substituted {
            let client = service_id_of(
                self.state
                    .texture_units
                    .get(s.unit as usize)
                    .and_then(|u| u.bound(s.target)),
            );
            self.gl.active_texture(GL_TEXTURE0 + s.unit);
            self.gl.bind_texture(s.target, client);
        }
        self.gl
            .active_texture(GL_TEXTURE0 + self.state.active_texture_unit as u32);
    }
}
