//! Client id to service object tables.
//!
//! Every resource kind uses the same table: a map from client id to a shared [`Resource`] plus a
//! reverse index from service id. Deleting an id removes it from both maps and marks the resource
//! deleted; bindings that still hold an `Rc` keep a valid (but deleted) object until they are
//! replaced.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::util::{bind_target_for_texture_target, face_index, is_power_of_two};

use crate::gl_api::{GlApi, ServiceId};

/// Kind-specific metadata stored alongside a service object.
pub trait ResourceKind: Default {
    const KIND: &'static str;

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId);
}

#[derive(Debug)]
pub struct Resource<T> {
    client_id: u32,
    service_id: ServiceId,
    deleted: Cell<bool>,
    state: RefCell<T>,
}

impl<T> Resource<T> {
    pub fn new(client_id: u32, service_id: ServiceId, state: T) -> Self {
        Self {
            client_id,
            service_id,
            deleted: Cell::new(false),
            state: RefCell::new(state),
        }
    }

    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    pub fn state(&self) -> Ref<'_, T> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, T> {
        self.state.borrow_mut()
    }
}

/// Client id reported for a binding slot: 0 when empty or when the object has been deleted.
pub fn client_id_of<T>(slot: Option<&Rc<Resource<T>>>) -> u32 {
    slot.filter(|r| !r.is_deleted())
        .map_or(0, |r| r.client_id())
}

/// Service id to bind for a slot. Deleted objects were already unbound by the backend.
pub fn service_id_of<T>(slot: Option<&Rc<Resource<T>>>) -> ServiceId {
    slot.filter(|r| !r.is_deleted())
        .map_or(0, |r| r.service_id())
}

#[derive(Debug)]
pub struct ResourceTable<T> {
    by_client: RefCell<HashMap<u32, Rc<Resource<T>>>>,
    by_service: RefCell<HashMap<ServiceId, u32>>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            by_client: RefCell::new(HashMap::new()),
            by_service: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: ResourceKind> ResourceTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client_id`. Returns `None` if the id is already taken.
    pub fn create(&self, client_id: u32, service_id: ServiceId) -> Option<Rc<Resource<T>>> {
        let mut by_client = self.by_client.borrow_mut();
        if by_client.contains_key(&client_id) {
            return None;
        }
        let resource = Rc::new(Resource::new(client_id, service_id, T::default()));
        by_client.insert(client_id, resource.clone());
        self.by_service.borrow_mut().insert(service_id, client_id);
        Some(resource)
    }

    pub fn get(&self, client_id: u32) -> Option<Rc<Resource<T>>> {
        self.by_client
            .borrow()
            .get(&client_id)
            .filter(|r| !r.is_deleted())
            .cloned()
    }

    pub fn contains(&self, client_id: u32) -> bool {
        self.get(client_id).is_some()
    }

    /// Removes `client_id` and marks the object deleted. Outstanding references stay valid.
    pub fn remove(&self, client_id: u32) -> Option<Rc<Resource<T>>> {
        let resource = self.by_client.borrow_mut().remove(&client_id)?;
        resource.deleted.set(true);
        self.by_service.borrow_mut().remove(&resource.service_id);
        Some(resource)
    }

    pub fn get_client_id(&self, service_id: ServiceId) -> Option<u32> {
        self.by_service.borrow().get(&service_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_client.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletes every remaining service object and empties the table.
    pub fn destroy_all(&self, gl: &mut dyn GlApi) {
        let entries: Vec<_> = self.by_client.borrow_mut().drain().collect();
        self.by_service.borrow_mut().clear();
        for (_, resource) in entries {
            resource.deleted.set(true);
            if resource.service_id != 0 {
                T::delete_service_object(gl, resource.service_id);
            }
        }
    }
}

/// Ranges remembered per buffer by `max_value_for_range` before the cache starts over.
const MAX_CACHED_RANGES: usize = 256;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferState {
    size: u32,
    usage: GLenum,
    /// The only target this buffer may be bound to, once bound.
    target: GLenum,
    /// Copy of the contents, kept for element arrays so index ranges can be checked.
    shadow: Option<Vec<u8>>,
    max_value_cache: HashMap<(u32, u32, GLenum), u32>,
}

impl BufferState {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn usage(&self) -> GLenum {
        self.usage
    }

    pub fn target(&self) -> GLenum {
        self.target
    }

    pub fn set_target(&mut self, target: GLenum) {
        self.target = target;
    }

    /// Records a new data store. `data` holds exactly `size` bytes.
    pub fn set_data(&mut self, data: &[u8], usage: GLenum) {
        self.size = data.len() as u32;
        self.usage = usage;
        self.max_value_cache.clear();
        self.shadow = (self.target == GL_ELEMENT_ARRAY_BUFFER).then(|| data.to_vec());
    }

    /// Whether `[offset, offset + size)` lies inside the data store.
    pub fn range_in_bounds(&self, offset: i32, size: i32) -> bool {
        if offset < 0 || size < 0 {
            return false;
        }
        (offset as u32)
            .checked_add(size as u32)
            .is_some_and(|end| end <= self.size)
    }

    /// Updates the shadow copy after a validated sub-data upload.
    pub fn set_range(&mut self, offset: u32, data: &[u8]) {
        if let Some(shadow) = self.shadow.as_mut() {
            let start = offset as usize;
            if let Some(dst) = shadow.get_mut(start..start + data.len()) {
                dst.copy_from_slice(data);
            }
        }
        self.max_value_cache.clear();
    }

    /// Largest index read by `count` indices of `ty` starting at byte `offset`. `None` when the
    /// range is misaligned, out of bounds, or the buffer keeps no shadow copy.
    pub fn max_value_for_range(&mut self, offset: u32, count: u32, ty: GLenum) -> Option<u32> {
        let elem = gles2_cmd::util::index_type_size(ty)?;
        if offset % elem != 0 {
            return None;
        }
        let end = count.checked_mul(elem)?.checked_add(offset)?;
        if end > self.size {
            return None;
        }
        if let Some(&cached) = self.max_value_cache.get(&(offset, count, ty)) {
            return Some(cached);
        }
        let bytes = self.shadow.as_ref()?.get(offset as usize..end as usize)?;
        let max = match ty {
            GL_UNSIGNED_BYTE => bytes.iter().copied().map(u32::from).max(),
            _ => bytes
                .chunks_exact(2)
                .map(|c| u32::from(u16::from_ne_bytes([c[0], c[1]])))
                .max(),
        }
        .unwrap_or(0);
        if self.max_value_cache.len() >= MAX_CACHED_RANGES {
            self.max_value_cache.clear();
        }
        self.max_value_cache.insert((offset, count, ty), max);
        Some(max)
    }
}

impl ResourceKind for BufferState {
    const KIND: &'static str = "buffer";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_buffer(service_id);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub valid: bool,
    pub internal_format: GLenum,
    pub width: u32,
    pub height: u32,
    pub format: GLenum,
    pub ty: GLenum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureState {
    target: GLenum,
    /// Indexed by face, then level.
    levels: Vec<Vec<LevelInfo>>,
    pub min_filter: GLenum,
    pub mag_filter: GLenum,
    pub wrap_s: GLenum,
    pub wrap_t: GLenum,
    npot: bool,
    texture_complete: bool,
    cube_complete: bool,
}

impl Default for TextureState {
    fn default() -> Self {
        Self {
            target: 0,
            levels: Vec::new(),
            min_filter: GL_NEAREST_MIPMAP_LINEAR,
            mag_filter: GL_LINEAR,
            wrap_s: GL_REPEAT,
            wrap_t: GL_REPEAT,
            npot: false,
            texture_complete: false,
            cube_complete: false,
        }
    }
}

impl TextureState {
    pub fn target(&self) -> GLenum {
        self.target
    }

    pub fn set_target(&mut self, target: GLenum) {
        self.target = target;
        let faces = if target == GL_TEXTURE_CUBE_MAP { 6 } else { 1 };
        self.levels.resize_with(faces, Vec::new);
    }

    pub fn level_info(&self, target: GLenum, level: i32) -> Option<&LevelInfo> {
        let face = face_index(target)?;
        let level = usize::try_from(level).ok()?;
        self.levels
            .get(face)?
            .get(level)
            .filter(|info| info.valid)
    }

    pub fn set_level_info(&mut self, target: GLenum, level: i32, info: LevelInfo) {
        let (Some(face), Ok(level)) = (face_index(target), usize::try_from(level)) else {
            return;
        };
        if self.target == 0 {
            self.set_target(bind_target_for_texture_target(target));
        }
        let Some(levels) = self.levels.get_mut(face) else {
            return;
        };
        if levels.len() <= level {
            levels.resize(level + 1, LevelInfo::default());
        }
        levels[level] = LevelInfo { valid: true, ..info };
        self.update();
    }

    /// Fills in every level below level 0 of every face, as `GenerateMipmap` does.
    pub fn mark_mipmaps_generated(&mut self) {
        for levels in &mut self.levels {
            let Some(&base) = levels.first().filter(|l| l.valid) else {
                continue;
            };
            let count = gles2_cmd::util::max_levels_for_size(base.width.max(base.height)) as usize;
            levels.resize(count, LevelInfo::default());
            let (mut w, mut h) = (base.width, base.height);
            for info in levels.iter_mut().skip(1) {
                w = (w / 2).max(1);
                h = (h / 2).max(1);
                *info = LevelInfo {
                    width: w,
                    height: h,
                    ..base
                };
            }
        }
        self.update();
    }

    pub fn needs_mips(&self) -> bool {
        self.min_filter != GL_NEAREST && self.min_filter != GL_LINEAR
    }

    pub fn is_npot(&self) -> bool {
        self.npot
    }

    pub fn cube_complete(&self) -> bool {
        self.cube_complete
    }

    /// Whether the backend will sample this texture. NPOT textures need clamping, no mips, or
    /// the NPOT extension; mipmapped filtering needs a complete chain.
    pub fn can_render(&self, npot_supported: bool) -> bool {
        if self.target == 0 {
            return false;
        }
        let Some(base) = self.levels.first().and_then(|l| l.first()) else {
            return false;
        };
        if !base.valid || base.width == 0 || base.height == 0 {
            return false;
        }
        if self.npot
            && !npot_supported
            && (self.needs_mips() || self.wrap_s != GL_CLAMP_TO_EDGE || self.wrap_t != GL_CLAMP_TO_EDGE)
        {
            return false;
        }
        if self.target == GL_TEXTURE_CUBE_MAP && !self.cube_complete {
            return false;
        }
        !self.needs_mips() || self.texture_complete
    }

    fn update(&mut self) {
        let Some(base) = self.levels.first().and_then(|l| l.first()).copied() else {
            self.npot = false;
            self.texture_complete = false;
            self.cube_complete = false;
            return;
        };
        self.npot = base.valid && (!is_power_of_two(base.width) || !is_power_of_two(base.height));

        self.cube_complete = self.target == GL_TEXTURE_CUBE_MAP
            && base.valid
            && base.width == base.height
            && self.levels.len() == 6
            && self.levels.iter().all(|face| {
                face.first().is_some_and(|l| {
                    l.valid
                        && l.width == base.width
                        && l.height == base.height
                        && l.internal_format == base.internal_format
                        && l.ty == base.ty
                })
            });

        let needed = gles2_cmd::util::max_levels_for_size(base.width.max(base.height)) as usize;
        self.texture_complete = base.valid
            && self.levels.iter().all(|face| {
                let Some(first) = face.first() else {
                    return false;
                };
                let (mut w, mut h) = (first.width, first.height);
                (0..needed).all(|level| {
                    let ok = face.get(level).is_some_and(|l| {
                        l.valid
                            && l.width == w
                            && l.height == h
                            && l.internal_format == base.internal_format
                            && l.ty == base.ty
                    });
                    w = (w / 2).max(1);
                    h = (h / 2).max(1);
                    ok
                })
            });
    }
}

impl ResourceKind for TextureState {
    const KIND: &'static str = "texture";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_texture(service_id);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShaderState {
    pub shader_type: GLenum,
    pub source: Option<String>,
    pub compile_status: bool,
    pub info_log: String,
}

impl ResourceKind for ShaderState {
    const KIND: &'static str = "shader";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_shader(service_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttribInfo {
    pub name: String,
    pub size: i32,
    pub ty: GLenum,
    pub location: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    /// Name without any `[0]` suffix.
    pub name: String,
    pub is_array: bool,
    pub size: i32,
    pub ty: GLenum,
    /// Location of each array element.
    pub element_locations: Vec<i32>,
    /// Texture unit of each element, for sampler uniforms.
    pub texture_units: Vec<u32>,
}

impl UniformInfo {
    pub fn is_sampler(&self) -> bool {
        matches!(self.ty, GL_SAMPLER_2D | GL_SAMPLER_CUBE)
    }

    /// Name as reported by `GetActiveUniform`.
    pub fn reported_name(&self) -> String {
        if self.is_array {
            format!("{}[0]", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProgramState {
    pub link_status: bool,
    pub validate_status: bool,
    pub info_log: String,
    pub attached_shaders: Vec<Rc<Resource<ShaderState>>>,
    attribs: Vec<AttribInfo>,
    uniforms: Vec<UniformInfo>,
    sampler_indices: Vec<usize>,
}

impl ProgramState {
    pub fn attribs(&self) -> &[AttribInfo] {
        &self.attribs
    }

    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    pub fn sampler_uniforms(&self) -> impl Iterator<Item = &UniformInfo> {
        self.sampler_indices.iter().map(|&i| &self.uniforms[i])
    }

    pub fn is_attrib_used(&self, location: u32) -> bool {
        self.attribs.iter().any(|a| a.location == location as i32)
    }

    pub fn attrib_location(&self, name: &str) -> i32 {
        self.attribs
            .iter()
            .find(|a| a.name == name)
            .map_or(-1, |a| a.location)
    }

    /// Location of `name`, which may carry an element subscript (`lights[2]`).
    pub fn uniform_location(&self, name: &str) -> i32 {
        let (base, element) = match name.strip_suffix(']').and_then(|n| n.rsplit_once('[')) {
            Some((base, index)) => match index.parse::<usize>() {
                Ok(index) => (base, index),
                Err(_) => return -1,
            },
            None => (name, 0),
        };
        self.uniforms
            .iter()
            .find(|u| u.name == base)
            .and_then(|u| u.element_locations.get(element))
            .copied()
            .unwrap_or(-1)
    }

    /// Finds the uniform owning `location` and the element index within it.
    pub fn uniform_by_location(&self, location: i32) -> Option<(&UniformInfo, usize)> {
        self.uniforms.iter().find_map(|u| {
            u.element_locations
                .iter()
                .position(|&l| l == location)
                .map(|element| (u, element))
        })
    }

    /// Records the texture units assigned to a sampler uniform, starting at `location`.
    pub fn set_samplers(&mut self, location: i32, units: &[i32]) {
        for uniform in &mut self.uniforms {
            if let Some(start) = uniform.element_locations.iter().position(|&l| l == location) {
                if uniform.is_sampler() {
                    for (slot, &unit) in uniform.texture_units[start..].iter_mut().zip(units) {
                        *slot = unit as u32;
                    }
                }
                return;
            }
        }
    }

    pub fn max_attrib_name_length(&self) -> usize {
        self.attribs.iter().map(|a| a.name.len() + 1).max().unwrap_or(0)
    }

    pub fn max_uniform_name_length(&self) -> usize {
        self.uniforms
            .iter()
            .map(|u| u.reported_name().len() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn clear_reflection(&mut self) {
        self.attribs.clear();
        self.uniforms.clear();
        self.sampler_indices.clear();
    }

    /// Rebuilds the attribute and uniform tables from the backend after a link.
    pub fn update_reflection(&mut self, gl: &mut dyn GlApi, service_id: ServiceId) {
        self.clear_reflection();
        let num_attribs = gl.get_programiv(service_id, GL_ACTIVE_ATTRIBUTES).max(0) as u32;
        for index in 0..num_attribs {
            let Some(var) = gl.get_active_attrib(service_id, index) else {
                continue;
            };
            let location = gl.get_attrib_location(service_id, &var.name);
            self.attribs.push(AttribInfo {
                name: var.name,
                size: var.size,
                ty: var.ty,
                location,
            });
        }

        let num_uniforms = gl.get_programiv(service_id, GL_ACTIVE_UNIFORMS).max(0) as u32;
        for index in 0..num_uniforms {
            let Some(var) = gl.get_active_uniform(service_id, index) else {
                continue;
            };
            let (name, is_array) = match var.name.strip_suffix("[0]") {
                Some(base) => (base.to_string(), true),
                None => (var.name.clone(), var.size > 1),
            };
            let element_locations = if is_array {
                (0..var.size)
                    .map(|i| gl.get_uniform_location(service_id, &format!("{name}[{i}]")))
                    .collect()
            } else {
                vec![gl.get_uniform_location(service_id, &name)]
            };
            let uniform = UniformInfo {
                name,
                is_array,
                size: var.size,
                ty: var.ty,
                texture_units: vec![0; element_locations.len()],
                element_locations,
            };
            if uniform.is_sampler() {
                self.sampler_indices.push(self.uniforms.len());
            }
            self.uniforms.push(uniform);
        }
    }
}

impl ResourceKind for ProgramState {
    const KIND: &'static str = "program";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_program(service_id);
    }
}

#[derive(Debug, Clone)]
pub enum Attachment {
    Renderbuffer(Rc<Resource<RenderbufferState>>),
    Texture {
        texture: Rc<Resource<TextureState>>,
        target: GLenum,
        level: i32,
    },
}

impl Attachment {
    pub fn size(&self) -> Option<(u32, u32)> {
        match self {
            Attachment::Renderbuffer(rb) => {
                let state = rb.state();
                Some((state.width, state.height))
            }
            Attachment::Texture {
                texture,
                target,
                level,
            } => texture
                .state()
                .level_info(*target, *level)
                .map(|info| (info.width, info.height)),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FramebufferState {
    attachments: HashMap<GLenum, Attachment>,
}

impl FramebufferState {
    pub fn attach(&mut self, attachment: GLenum, object: Option<Attachment>) {
        match object {
            Some(object) => {
                self.attachments.insert(attachment, object);
            }
            None => {
                self.attachments.remove(&attachment);
            }
        }
    }

    pub fn attachment(&self, attachment: GLenum) -> Option<&Attachment> {
        self.attachments.get(&attachment)
    }

    /// Size of the color attachment, which bounds reads and copies.
    pub fn color_size(&self) -> Option<(u32, u32)> {
        self.attachments.get(&GL_COLOR_ATTACHMENT0)?.size()
    }
}

impl ResourceKind for FramebufferState {
    const KIND: &'static str = "framebuffer";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_framebuffer(service_id);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderbufferState {
    pub internal_format: GLenum,
    pub width: u32,
    pub height: u32,
}

impl ResourceKind for RenderbufferState {
    const KIND: &'static str = "renderbuffer";

    fn delete_service_object(gl: &mut dyn GlApi, service_id: ServiceId) {
        gl.delete_renderbuffer(service_id);
    }
}

pub type Buffer = Resource<BufferState>;
pub type Texture = Resource<TextureState>;
pub type Shader = Resource<ShaderState>;
pub type Program = Resource<ProgramState>;
pub type Framebuffer = Resource<FramebufferState>;
pub type Renderbuffer = Resource<RenderbufferState>;
