//! Client-visible shadow of per-context GL state.
//!
//! Everything here mirrors what the backend would report, but in client ids, so queries can be
//! answered without a round trip and without leaking service ids.

use std::collections::BTreeMap;
use std::rc::Rc;

use gles2_cmd::gl::*;

use crate::context_group::ContextGroup;
use crate::resources::{Buffer, Framebuffer, Program, Renderbuffer, Texture};

#[derive(Debug, Clone)]
pub struct TextureUnit {
    /// Target of the last bind on this unit.
    pub bind_target: GLenum,
    pub bound_texture_2d: Option<Rc<Texture>>,
    pub bound_texture_cube_map: Option<Rc<Texture>>,
}

impl TextureUnit {
    fn new(group: &ContextGroup) -> Self {
        Self {
            bind_target: GL_TEXTURE_2D,
            bound_texture_2d: group.default_texture(GL_TEXTURE_2D),
            bound_texture_cube_map: group.default_texture(GL_TEXTURE_CUBE_MAP),
        }
    }

    pub fn bound(&self, target: GLenum) -> Option<&Rc<Texture>> {
        match target {
            GL_TEXTURE_2D => self.bound_texture_2d.as_ref(),
            GL_TEXTURE_CUBE_MAP => self.bound_texture_cube_map.as_ref(),
            _ => None,
        }
    }

    pub fn set_bound(&mut self, target: GLenum, texture: Option<Rc<Texture>>) {
        match target {
            GL_TEXTURE_2D => self.bound_texture_2d = texture,
            GL_TEXTURE_CUBE_MAP => self.bound_texture_cube_map = texture,
            _ => return,
        }
        self.bind_target = target;
    }

    /// Drops bindings to `texture`, falling back to the default texture of the target.
    pub fn unbind(&mut self, texture: &Rc<Texture>, group: &ContextGroup) {
        for target in [GL_TEXTURE_2D, GL_TEXTURE_CUBE_MAP] {
            if self.bound(target).is_some_and(|t| Rc::ptr_eq(t, texture)) {
                let fallback = group.default_texture(target);
                match target {
                    GL_TEXTURE_2D => self.bound_texture_2d = fallback,
                    _ => self.bound_texture_cube_map = fallback,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextState {
    pub active_texture_unit: usize,
    pub texture_units: Vec<TextureUnit>,
    pub bound_array_buffer: Option<Rc<Buffer>>,
    pub bound_element_array_buffer: Option<Rc<Buffer>>,
    pub bound_framebuffer: Option<Rc<Framebuffer>>,
    pub bound_renderbuffer: Option<Rc<Renderbuffer>>,
    pub current_program: Option<Rc<Program>>,

    pub pack_alignment: GLint,
    pub unpack_alignment: GLint,

    pub clear_color: [GLfloat; 4],
    pub clear_depth: GLfloat,
    pub clear_stencil: GLint,
    pub color_mask: [bool; 4],
    pub depth_mask: bool,
    pub stencil_mask_front: GLuint,
    pub stencil_mask_back: GLuint,

    /// Capability toggles, keyed by capability enum.
    pub enabled: BTreeMap<GLenum, bool>,
}

impl ContextState {
    pub fn new(group: &ContextGroup, capabilities: &[GLenum]) -> Self {
        let units = group.limits().max_texture_units as usize;
        Self {
            active_texture_unit: 0,
            texture_units: (0..units).map(|_| TextureUnit::new(group)).collect(),
            bound_array_buffer: None,
            bound_element_array_buffer: None,
            bound_framebuffer: None,
            bound_renderbuffer: None,
            current_program: None,
            pack_alignment: 4,
            unpack_alignment: 4,
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            color_mask: [true; 4],
            depth_mask: true,
            stencil_mask_front: !0,
            stencil_mask_back: !0,
            enabled: capabilities.iter().map(|&cap| (cap, cap == GL_DITHER)).collect(),
        }
    }

    pub fn active_unit(&self) -> &TextureUnit {
        &self.texture_units[self.active_texture_unit]
    }

    pub fn active_unit_mut(&mut self) -> &mut TextureUnit {
        &mut self.texture_units[self.active_texture_unit]
    }

    /// The texture bound to `target` (a bind target) on the active unit.
    pub fn bound_texture(&self, target: GLenum) -> Option<&Rc<Texture>> {
        self.active_unit().bound(target)
    }

    pub fn bound_buffer(&self, target: GLenum) -> Option<&Rc<Buffer>> {
        match target {
            GL_ARRAY_BUFFER => self.bound_array_buffer.as_ref(),
            GL_ELEMENT_ARRAY_BUFFER => self.bound_element_array_buffer.as_ref(),
            _ => None,
        }
    }

    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.enabled.get(&cap).copied().unwrap_or(false)
    }

    /// Drops every binding so the objects can be released.
    pub fn clear_bindings(&mut self) {
        for unit in &mut self.texture_units {
            unit.bound_texture_2d = None;
            unit.bound_texture_cube_map = None;
        }
        self.bound_array_buffer = None;
        self.bound_element_array_buffer = None;
        self.bound_framebuffer = None;
        self.bound_renderbuffer = None;
        self.current_program = None;
    }
}
