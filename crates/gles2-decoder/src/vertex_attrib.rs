//! Per-context vertex attribute state.
//!
//! Slots live in a fixed array. Two index lists partition them into enabled and disabled so that
//! draw validation only walks the enabled ones; a position table makes moving a slot between the
//! lists O(1).

use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::util::gl_type_size;

use crate::resources::{client_id_of, Buffer};

/// Number of whole elements of `component_bytes` that fit in a buffer of `buffer_size` bytes when
/// the first starts at `offset` and successive ones are `stride` bytes apart.
pub fn accessible_element_count(buffer_size: u32, offset: u32, stride: u32, component_bytes: u32) -> u32 {
    if offset > buffer_size || stride == 0 {
        return 0;
    }
    let usable = buffer_size - offset;
    if usable < component_bytes {
        return 0;
    }
    (usable - component_bytes) / stride + 1
}

#[derive(Debug, Clone)]
pub struct VertexAttribInfo {
    index: u32,
    enabled: bool,
    size: i32,
    ty: GLenum,
    normalized: bool,
    /// Stride as the client supplied it (0 = tightly packed).
    gl_stride: i32,
    /// Stride used for address computation; never 0.
    real_stride: u32,
    offset: u32,
    buffer: Option<Rc<Buffer>>,
    value: [f32; 4],
}

impl VertexAttribInfo {
    fn new(index: u32) -> Self {
        Self {
            index,
            enabled: false,
            size: 4,
            ty: GL_FLOAT,
            normalized: false,
            gl_stride: 0,
            real_stride: 16,
            offset: 0,
            buffer: None,
            value: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn ty(&self) -> GLenum {
        self.ty
    }

    pub fn normalized(&self) -> bool {
        self.normalized
    }

    pub fn gl_stride(&self) -> i32 {
        self.gl_stride
    }

    pub fn real_stride(&self) -> u32 {
        self.real_stride
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn buffer(&self) -> Option<&Rc<Buffer>> {
        self.buffer.as_ref()
    }

    /// Client id of the attached buffer, 0 if none or deleted.
    pub fn buffer_client_id(&self) -> u32 {
        client_id_of(self.buffer.as_ref())
    }

    pub fn value(&self) -> [f32; 4] {
        self.value
    }

    pub fn component_bytes(&self) -> u32 {
        gl_type_size(self.ty) * self.size as u32
    }

    /// Whether vertex `index` can be fetched without reading past the end of the buffer.
    /// Disabled attributes use their constant value and never touch a buffer.
    pub fn can_access(&self, index: u32) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(buffer) = self.buffer.as_ref().filter(|b| !b.is_deleted()) else {
            return false;
        };
        let buffer_size = buffer.state().size();
        index < accessible_element_count(buffer_size, self.offset, self.real_stride, self.component_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct VertexAttribManager {
    attribs: Vec<VertexAttribInfo>,
    enabled: Vec<u32>,
    disabled: Vec<u32>,
    /// Position of each slot within whichever list currently holds it.
    position: Vec<usize>,
}

impl VertexAttribManager {
    pub fn new(max_vertex_attribs: u32) -> Self {
        Self {
            attribs: (0..max_vertex_attribs).map(VertexAttribInfo::new).collect(),
            enabled: Vec::new(),
            disabled: (0..max_vertex_attribs).collect(),
            position: (0..max_vertex_attribs as usize).collect(),
        }
    }

    pub fn max_vertex_attribs(&self) -> u32 {
        self.attribs.len() as u32
    }

    pub fn get(&self, index: u32) -> Option<&VertexAttribInfo> {
        self.attribs.get(index as usize)
    }

    pub fn enabled_attribs(&self) -> impl Iterator<Item = &VertexAttribInfo> {
        self.enabled.iter().map(|&i| &self.attribs[i as usize])
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }

    /// Moves a slot to the enabled or disabled list. Returns false for out-of-range indices.
    pub fn set_enabled(&mut self, index: u32, enabled: bool) -> bool {
        let Some(info) = self.attribs.get_mut(index as usize) else {
            return false;
        };
        if info.enabled == enabled {
            return true;
        }
        info.enabled = enabled;
        let (from, to) = if enabled {
            (&mut self.disabled, &mut self.enabled)
        } else {
            (&mut self.enabled, &mut self.disabled)
        };
        let pos = self.position[index as usize];
        from.swap_remove(pos);
        if let Some(&moved) = from.get(pos) {
            self.position[moved as usize] = pos;
        }
        self.position[index as usize] = to.len();
        to.push(index);
        true
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_pointer(
        &mut self,
        index: u32,
        buffer: Option<Rc<Buffer>>,
        size: i32,
        ty: GLenum,
        normalized: bool,
        gl_stride: i32,
        offset: u32,
    ) {
        let Some(info) = self.attribs.get_mut(index as usize) else {
            return;
        };
        let real_stride = if gl_stride != 0 {
            gl_stride as u32
        } else {
            gl_type_size(ty) * size as u32
        };
        info.buffer = buffer;
        info.size = size;
        info.ty = ty;
        info.normalized = normalized;
        info.gl_stride = gl_stride;
        info.real_stride = real_stride.max(1);
        info.offset = offset;
    }

    pub fn set_value(&mut self, index: u32, value: [f32; 4]) {
        if let Some(info) = self.attribs.get_mut(index as usize) {
            info.value = value;
        }
    }

    /// Drops every buffer reference, as on context teardown.
    pub fn clear_buffers(&mut self) {
        for info in &mut self.attribs {
            info.buffer = None;
        }
    }
}
