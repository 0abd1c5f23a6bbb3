//! In-memory [`GlApi`] implementation.
//!
//! `SoftGl` keeps real object tables, bindings and error queues but no pixels: every image is a
//! single solid color, which is enough to follow clears, copies and reads through the pipeline.
//! Every entry point is logged so callers can see exactly what reached the backend.
//!
//! Handles are cheap clones sharing one context; [`SoftGl::shared_context`] makes a new context
//! in the same share group.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::util::{bind_target_for_texture_target, compute_image_data_size, face_index};

use crate::gl_api::{ActiveVariable, GlApi, GlCapabilities, ServiceId, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftImage {
    pub width: u32,
    pub height: u32,
    pub internal_format: GLenum,
    /// RGBA of every texel.
    pub fill: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftAttrib {
    pub enabled: bool,
    pub buffer: ServiceId,
    pub size: GLint,
    pub ty: GLenum,
    pub normalized: bool,
    pub stride: GLsizei,
    pub offset: u32,
    pub value: [GLfloat; 4],
}

impl Default for SoftAttrib {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer: 0,
            size: 4,
            ty: GL_FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
            value: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub mode: GLenum,
    pub count: GLsizei,
    pub program: ServiceId,
    /// `(2D, cube map)` binding of every texture unit at draw time.
    pub textures: Vec<[ServiceId; 2]>,
    pub attrib0: SoftAttrib,
    /// Contents of the buffer feeding attribute 0, if any.
    pub attrib0_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClearRecord {
    pub framebuffer: ServiceId,
    pub mask: GLbitfield,
    pub color: [u8; 4],
    pub scissor_test: bool,
    pub color_mask: [bool; 4],
    pub default_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoftAttachment {
    Texture { id: ServiceId, target: GLenum, level: GLint },
    Renderbuffer(ServiceId),
}

#[derive(Debug, Default, Clone)]
struct SoftBuffer {
    target: GLenum,
    data: Vec<u8>,
    usage: GLenum,
}

#[derive(Debug, Default, Clone)]
struct SoftTexture {
    target: GLenum,
    levels: HashMap<(usize, GLint), SoftImage>,
    params: HashMap<GLenum, GLint>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SoftRenderbuffer {
    pub internal_format: GLenum,
    pub width: u32,
    pub height: u32,
    pub fill: [u8; 4],
}

#[derive(Debug, Default, Clone)]
struct SoftFramebuffer {
    attachments: HashMap<GLenum, SoftAttachment>,
}

#[derive(Debug, Default, Clone)]
struct SoftShader {
    ty: GLenum,
    source: String,
    compiled: bool,
    log: String,
    delete_pending: bool,
    attach_count: u32,
}

#[derive(Debug, Clone)]
struct Declared {
    name: String,
    size: GLint,
    ty: GLenum,
    location: GLint,
}

#[derive(Debug, Default, Clone)]
struct SoftProgram {
    shaders: Vec<ServiceId>,
    bound_attribs: HashMap<String, GLuint>,
    linked: bool,
    validated: bool,
    log: String,
    attribs: Vec<Declared>,
    uniforms: Vec<Declared>,
    uniform_values: HashMap<GLint, Vec<GLfloat>>,
}

#[derive(Debug, Clone, PartialEq)]
enum QueryValue {
    Ints(Vec<GLint>),
    Floats(Vec<GLfloat>),
}

#[derive(Debug, Default)]
struct ShareGroup {
    next_id: ServiceId,
    buffers: HashMap<ServiceId, SoftBuffer>,
    textures: HashMap<ServiceId, SoftTexture>,
    renderbuffers: HashMap<ServiceId, SoftRenderbuffer>,
    framebuffers: HashMap<ServiceId, SoftFramebuffer>,
    shaders: HashMap<ServiceId, SoftShader>,
    programs: HashMap<ServiceId, SoftProgram>,
    memory_limit: Option<usize>,
}

impl ShareGroup {
    fn new() -> Self {
        let mut group = Self {
            next_id: 1,
            ..Self::default()
        };
        // Texture 0 is the default texture object.
        group.textures.insert(0, SoftTexture::default());
        group
    }

    fn alloc_id(&mut self) -> ServiceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn memory_used(&self) -> usize {
        let buffers: usize = self.buffers.values().map(|b| b.data.len()).sum();
        let textures: usize = self
            .textures
            .values()
            .flat_map(|t| t.levels.values())
            .map(|i| i.width as usize * i.height as usize * 4)
            .sum();
        let renderbuffers: usize = self
            .renderbuffers
            .values()
            .map(|r| r.width as usize * r.height as usize * 4)
            .sum();
        buffers + textures + renderbuffers
    }

    /// Whether growing memory use by `added` bytes (after releasing `released`) fits the limit.
    fn fits(&self, added: usize, released: usize) -> bool {
        match self.memory_limit {
            Some(limit) => self.memory_used().saturating_sub(released) + added <= limit,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Bindings {
    errors: Vec<GLenum>,
    array_buffer: ServiceId,
    element_array_buffer: ServiceId,
    active_unit: u32,
    units: Vec<[ServiceId; 2]>,
    framebuffer: ServiceId,
    renderbuffer: ServiceId,
    program: ServiceId,
    attribs: Vec<SoftAttrib>,
    enabled: BTreeSet<GLenum>,
    clear_color: [GLfloat; 4],
    clear_depth: GLfloat,
    clear_stencil: GLint,
    color_mask: [bool; 4],
    depth_mask: bool,
    stencil_mask: [GLuint; 2],
    viewport: [GLint; 4],
    scissor: [GLint; 4],
    pack_alignment: GLint,
    unpack_alignment: GLint,
    misc: HashMap<GLenum, QueryValue>,
}

impl Bindings {
    fn new(caps: &GlCapabilities, surface: Size) -> Self {
        let ints = |v: &[GLenum]| QueryValue::Ints(v.iter().map(|&x| x as GLint).collect());
        let misc = HashMap::from([
            (GL_BLEND_SRC_RGB, ints(&[GL_ONE])),
            (GL_BLEND_SRC_ALPHA, ints(&[GL_ONE])),
            (GL_BLEND_DST_RGB, ints(&[GL_ZERO])),
            (GL_BLEND_DST_ALPHA, ints(&[GL_ZERO])),
            (GL_BLEND_EQUATION_RGB, ints(&[GL_FUNC_ADD])),
            (GL_BLEND_EQUATION_ALPHA, ints(&[GL_FUNC_ADD])),
            (GL_BLEND_COLOR, QueryValue::Floats(vec![0.0; 4])),
            (GL_CULL_FACE_MODE, ints(&[GL_BACK])),
            (GL_DEPTH_FUNC, ints(&[GL_LESS])),
            (GL_DEPTH_RANGE, QueryValue::Floats(vec![0.0, 1.0])),
            (GL_FRONT_FACE, ints(&[GL_CCW])),
            (GL_GENERATE_MIPMAP_HINT, ints(&[GL_DONT_CARE])),
            (GL_LINE_WIDTH, QueryValue::Floats(vec![1.0])),
            (GL_POLYGON_OFFSET_FACTOR, QueryValue::Floats(vec![0.0])),
            (GL_POLYGON_OFFSET_UNITS, QueryValue::Floats(vec![0.0])),
            (GL_SAMPLE_COVERAGE_VALUE, QueryValue::Floats(vec![1.0])),
            (GL_SAMPLE_COVERAGE_INVERT, ints(&[GL_FALSE])),
            (GL_STENCIL_FUNC, ints(&[GL_ALWAYS])),
            (GL_STENCIL_REF, ints(&[0])),
            (GL_STENCIL_VALUE_MASK, QueryValue::Ints(vec![-1])),
            (GL_STENCIL_FAIL, ints(&[GL_KEEP])),
            (GL_STENCIL_PASS_DEPTH_FAIL, ints(&[GL_KEEP])),
            (GL_STENCIL_PASS_DEPTH_PASS, ints(&[GL_KEEP])),
        ]);
        let (w, h) = (surface.width as GLint, surface.height as GLint);
        Self {
            errors: Vec::new(),
            array_buffer: 0,
            element_array_buffer: 0,
            active_unit: 0,
            units: vec![[0; 2]; caps.max_texture_units as usize],
            framebuffer: 0,
            renderbuffer: 0,
            program: 0,
            attribs: vec![SoftAttrib::default(); caps.max_vertex_attribs as usize],
            enabled: BTreeSet::from([GL_DITHER]),
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            color_mask: [true; 4],
            depth_mask: true,
            stencil_mask: [!0; 2],
            viewport: [0, 0, w, h],
            scissor: [0, 0, w, h],
            pack_alignment: 4,
            unpack_alignment: 4,
            misc,
        }
    }

    fn error(&mut self, code: GLenum) {
        if !self.errors.contains(&code) {
            self.errors.push(code);
        }
    }

    fn unit_slot(&mut self, target: GLenum) -> Option<&mut ServiceId> {
        let unit = self.units.get_mut(self.active_unit as usize)?;
        match target {
            GL_TEXTURE_2D => Some(&mut unit[0]),
            GL_TEXTURE_CUBE_MAP => Some(&mut unit[1]),
            _ => None,
        }
    }

    fn bound_texture(&self, bind_target: GLenum) -> ServiceId {
        let unit = self.units.get(self.active_unit as usize).copied().unwrap_or_default();
        if bind_target == GL_TEXTURE_2D {
            unit[0]
        } else {
            unit[1]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Current {
    Primary,
    Default,
}

#[derive(Debug)]
struct Contexts {
    caps: GlCapabilities,
    offscreen: bool,
    surface: Size,
    backbuffer_fill: [u8; 4],
    has_default: bool,
    fail_make_current: bool,
    current: Current,
    primary: Bindings,
    default: Bindings,
    calls: Vec<&'static str>,
    draws: Vec<DrawRecord>,
    clears: Vec<ClearRecord>,
    swaps: usize,
}

impl Contexts {
    fn cur(&mut self) -> &mut Bindings {
        match self.current {
            Current::Primary => &mut self.primary,
            Current::Default => &mut self.default,
        }
    }

    fn cur_ref(&self) -> &Bindings {
        match self.current {
            Current::Primary => &self.primary,
            Current::Default => &self.default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoftGlBuilder {
    caps: GlCapabilities,
    offscreen: bool,
    surface: Size,
    default_context: bool,
}

impl SoftGlBuilder {
    pub fn capabilities(mut self, caps: GlCapabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn desktop_gl(mut self, desktop: bool) -> Self {
        self.caps.is_desktop_gl = desktop;
        self
    }

    pub fn offscreen(mut self, offscreen: bool) -> Self {
        self.offscreen = offscreen;
        self
    }

    pub fn surface_size(mut self, size: Size) -> Self {
        self.surface = size;
        self
    }

    pub fn default_context(mut self, present: bool) -> Self {
        self.default_context = present;
        self
    }

    pub fn build(self) -> SoftGl {
        SoftGl::from_parts(self, Rc::new(RefCell::new(ShareGroup::new())))
    }
}

#[derive(Debug, Clone)]
pub struct SoftGl {
    group: Rc<RefCell<ShareGroup>>,
    ctx: Rc<RefCell<Contexts>>,
    builder: SoftGlBuilder,
}

impl SoftGl {
    /// Capabilities roomy enough for typical tests.
    pub fn default_capabilities() -> GlCapabilities {
        GlCapabilities {
            max_vertex_attribs: 16,
            max_texture_units: 8,
            max_texture_size: 2048,
            max_cube_map_texture_size: 2048,
            max_renderbuffer_size: 2048,
            max_varying_vectors: 8,
            max_vertex_uniform_vectors: 128,
            max_fragment_uniform_vectors: 16,
            is_desktop_gl: false,
            packed_depth_stencil: true,
            npot_textures: false,
        }
    }

    pub fn builder() -> SoftGlBuilder {
        SoftGlBuilder {
            caps: Self::default_capabilities(),
            offscreen: true,
            surface: Size::new(1, 1),
            default_context: true,
        }
    }

    pub fn new_offscreen() -> Self {
        Self::builder().build()
    }

    pub fn new_onscreen(size: Size) -> Self {
        Self::builder().offscreen(false).surface_size(size).build()
    }

    fn from_parts(builder: SoftGlBuilder, group: Rc<RefCell<ShareGroup>>) -> Self {
        let ctx = Contexts {
            caps: builder.caps,
            offscreen: builder.offscreen,
            surface: builder.surface,
            backbuffer_fill: [0; 4],
            has_default: builder.default_context,
            fail_make_current: false,
            current: Current::Primary,
            primary: Bindings::new(&builder.caps, builder.surface),
            default: Bindings::new(&builder.caps, builder.surface),
            calls: Vec::new(),
            draws: Vec::new(),
            clears: Vec::new(),
            swaps: 0,
        };
        Self {
            group,
            ctx: Rc::new(RefCell::new(ctx)),
            builder,
        }
    }

    /// A new context (with its own default context) sharing this one's objects.
    pub fn shared_context(&self) -> SoftGl {
        Self::from_parts(self.builder.clone(), self.group.clone())
    }

    fn call<R>(&self, name: &'static str, f: impl FnOnce(&mut Contexts, &mut ShareGroup) -> R) -> R {
        let mut ctx = self.ctx.borrow_mut();
        let mut group = self.group.borrow_mut();
        ctx.calls.push(name);
        f(&mut ctx, &mut group)
    }

    // Test controls.

    pub fn set_memory_limit(&self, limit: Option<usize>) {
        self.group.borrow_mut().memory_limit = limit;
    }

    pub fn set_fail_make_current(&self, fail: bool) {
        self.ctx.borrow_mut().fail_make_current = fail;
    }

    /// Queues `code` on the current context as if a GL call had raised it.
    pub fn inject_error(&self, code: GLenum) {
        self.ctx.borrow_mut().cur().error(code);
    }

    // Probes.

    pub fn calls(&self) -> Vec<&'static str> {
        self.ctx.borrow().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.ctx.borrow().calls.iter().filter(|c| **c == name).count()
    }

    pub fn clear_call_log(&self) {
        self.ctx.borrow_mut().calls.clear();
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.ctx.borrow().draws.clone()
    }

    pub fn clears(&self) -> Vec<ClearRecord> {
        self.ctx.borrow().clears.clone()
    }

    pub fn swap_count(&self) -> usize {
        self.ctx.borrow().swaps
    }

    pub fn default_context_current(&self) -> bool {
        self.ctx.borrow().current == Current::Default
    }

    pub fn pending_errors(&self) -> Vec<GLenum> {
        self.ctx.borrow().primary.errors.clone()
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.ctx.borrow().primary.active_unit
    }

    pub fn texture_binding(&self, unit: u32, target: GLenum) -> ServiceId {
        let ctx = self.ctx.borrow();
        let slot = ctx.primary.units.get(unit as usize).copied().unwrap_or_default();
        if target == GL_TEXTURE_2D {
            slot[0]
        } else {
            slot[1]
        }
    }

    pub fn buffer_binding(&self, target: GLenum) -> ServiceId {
        let ctx = self.ctx.borrow();
        match target {
            GL_ARRAY_BUFFER => ctx.primary.array_buffer,
            _ => ctx.primary.element_array_buffer,
        }
    }

    pub fn framebuffer_binding(&self) -> ServiceId {
        self.ctx.borrow().primary.framebuffer
    }

    pub fn renderbuffer_binding(&self) -> ServiceId {
        self.ctx.borrow().primary.renderbuffer
    }

    pub fn current_program(&self) -> ServiceId {
        self.ctx.borrow().primary.program
    }

    pub fn attrib(&self, index: u32) -> Option<SoftAttrib> {
        self.ctx.borrow().primary.attribs.get(index as usize).copied()
    }

    pub fn capability_enabled(&self, cap: GLenum) -> bool {
        self.ctx.borrow().primary.enabled.contains(&cap)
    }

    pub fn clear_color(&self) -> [GLfloat; 4] {
        self.ctx.borrow().primary.clear_color
    }

    pub fn color_mask(&self) -> [bool; 4] {
        self.ctx.borrow().primary.color_mask
    }

    pub fn buffer_contents(&self, id: ServiceId) -> Option<Vec<u8>> {
        self.group.borrow().buffers.get(&id).map(|b| b.data.clone())
    }

    pub fn texture_level(&self, id: ServiceId, target: GLenum, level: GLint) -> Option<SoftImage> {
        let face = face_index(target)?;
        self.group
            .borrow()
            .textures
            .get(&id)?
            .levels
            .get(&(face, level))
            .copied()
    }

    pub fn renderbuffer(&self, id: ServiceId) -> Option<SoftRenderbuffer> {
        self.group.borrow().renderbuffers.get(&id).copied()
    }

    pub fn uniform_value(&self, program: ServiceId, location: GLint) -> Option<Vec<GLfloat>> {
        self.group
            .borrow()
            .programs
            .get(&program)?
            .uniform_values
            .get(&location)
            .cloned()
    }

    pub fn backbuffer_fill(&self) -> [u8; 4] {
        self.ctx.borrow().backbuffer_fill
    }

    /// Number of live objects in the share group, the default texture excluded.
    pub fn object_count(&self) -> usize {
        let g = self.group.borrow();
        g.buffers.len()
            + (g.textures.len() - 1)
            + g.renderbuffers.len()
            + g.framebuffers.len()
            + g.shaders.len()
            + g.programs.len()
    }
}

fn to_u8(c: GLfloat) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn glsl_type(name: &str) -> Option<GLenum> {
    Some(match name {
        "float" => GL_FLOAT,
        "vec2" => GL_FLOAT_VEC2,
        "vec3" => GL_FLOAT_VEC3,
        "vec4" => GL_FLOAT_VEC4,
        "int" => GL_INT,
        "ivec2" => GL_INT_VEC2,
        "ivec3" => GL_INT_VEC3,
        "ivec4" => GL_INT_VEC4,
        "bool" => GL_BOOL,
        "bvec2" => GL_BOOL_VEC2,
        "bvec3" => GL_BOOL_VEC3,
        "bvec4" => GL_BOOL_VEC4,
        "mat2" => GL_FLOAT_MAT2,
        "mat3" => GL_FLOAT_MAT3,
        "mat4" => GL_FLOAT_MAT4,
        "sampler2D" => GL_SAMPLER_2D,
        "samplerCube" => GL_SAMPLER_CUBE,
        _ => return None,
    })
}

/// Collects `qualifier`-declared variables (`attribute` or `uniform`) from GLSL source.
fn scan_declarations(source: &str, qualifier: &str) -> Vec<(String, GLint, GLenum)> {
    let mut out = Vec::new();
    for statement in source.split(';') {
        let statement = statement.rsplit(['{', '}']).next().unwrap_or_default();
        let mut tokens = statement
            .split_whitespace()
            .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp"));
        if tokens.next() != Some(qualifier) {
            continue;
        }
        let Some(ty) = tokens.next().and_then(glsl_type) else {
            continue;
        };
        let rest: String = tokens.collect::<Vec<_>>().join("");
        for declarator in rest.split(',').filter(|d| !d.is_empty()) {
            let (name, size) = match declarator.strip_suffix(']').and_then(|d| d.split_once('[')) {
                Some((name, len)) => (name.to_string(), len.parse().unwrap_or(1)),
                None => (declarator.to_string(), 1),
            };
            out.push((name, size, ty));
        }
    }
    out
}

impl SoftGl {
    fn link(group: &mut ShareGroup, program: ServiceId, max_attribs: u32) {
        let Some(prog) = group.programs.get(&program) else {
            return;
        };
        let shaders: Vec<SoftShader> = prog
            .shaders
            .iter()
            .filter_map(|id| group.shaders.get(id).cloned())
            .collect();
        let bound = prog.bound_attribs.clone();

        let vertex = shaders.iter().find(|s| s.ty == GL_VERTEX_SHADER);
        let fragment = shaders.iter().find(|s| s.ty == GL_FRAGMENT_SHADER);
        let failure = match (vertex, fragment) {
            (Some(v), Some(f)) if v.compiled && f.compiled => None,
            (Some(_), Some(_)) => Some("Link failed: attached shader is not compiled"),
            _ => Some("Link failed: missing vertex or fragment shader"),
        };

        let mut attribs = Vec::new();
        let mut uniforms: Vec<Declared> = Vec::new();
        if let (None, Some(vertex)) = (failure, vertex) {
            let declared = scan_declarations(&vertex.source, "attribute");
            let mut taken: BTreeSet<GLint> = declared
                .iter()
                .filter_map(|(name, _, _)| bound.get(name).map(|&l| l as GLint))
                .collect();
            for (name, size, ty) in declared {
                let location = match bound.get(&name) {
                    Some(&l) => l as GLint,
                    None => {
                        let free = (0..max_attribs as GLint).find(|l| !taken.contains(l)).unwrap_or(-1);
                        taken.insert(free);
                        free
                    }
                };
                attribs.push(Declared {
                    name,
                    size,
                    ty,
                    location,
                });
            }
            let mut next_location = 0;
            for shader in &shaders {
                for (name, size, ty) in scan_declarations(&shader.source, "uniform") {
                    if uniforms.iter().any(|u| u.name == name) {
                        continue;
                    }
                    uniforms.push(Declared {
                        name,
                        size,
                        ty,
                        location: next_location,
                    });
                    next_location += size;
                }
            }
        }

        if let Some(prog) = group.programs.get_mut(&program) {
            prog.linked = failure.is_none();
            prog.log = failure.unwrap_or_default().to_string();
            prog.attribs = attribs;
            prog.uniforms = uniforms;
            prog.uniform_values.clear();
        }
    }

    fn uniform_location(prog: &SoftProgram, name: &str) -> GLint {
        let (base, element) = match name.strip_suffix(']').and_then(|n| n.rsplit_once('[')) {
            Some((base, index)) => match index.parse::<GLint>() {
                Ok(index) => (base, index),
                Err(_) => return -1,
            },
            None => (name, 0),
        };
        prog.uniforms
            .iter()
            .find(|u| u.name == base && element < u.size)
            .map_or(-1, |u| u.location + element)
    }

    fn set_uniform(ctx: &mut Contexts, group: &mut ShareGroup, location: GLint, values: Vec<GLfloat>) {
        let program = ctx.cur_ref().program;
        let Some(prog) = group.programs.get_mut(&program) else {
            ctx.cur().error(GL_INVALID_OPERATION);
            return;
        };
        if location == -1 {
            return;
        }
        let owned = prog
            .uniforms
            .iter()
            .any(|u| location >= u.location && location < u.location + u.size);
        if !owned {
            ctx.cur().error(GL_INVALID_OPERATION);
            return;
        }
        prog.uniform_values.insert(location, values);
    }

    /// Size and fill of the color buffer of the bound framebuffer.
    fn read_source(ctx: &Contexts, group: &ShareGroup) -> Option<(u32, u32, [u8; 4])> {
        let fb = ctx.cur_ref().framebuffer;
        if fb == 0 {
            return Some((ctx.surface.width, ctx.surface.height, ctx.backbuffer_fill));
        }
        match group.framebuffers.get(&fb)?.attachments.get(&GL_COLOR_ATTACHMENT0)? {
            SoftAttachment::Texture { id, target, level } => {
                let image = group.textures.get(id)?.levels.get(&(face_index(*target)?, *level))?;
                Some((image.width, image.height, image.fill))
            }
            SoftAttachment::Renderbuffer(id) => {
                let rb = group.renderbuffers.get(id)?;
                Some((rb.width, rb.height, rb.fill))
            }
        }
    }

    fn attachment_size(group: &ShareGroup, attachment: &SoftAttachment) -> Option<(u32, u32)> {
        match attachment {
            SoftAttachment::Texture { id, target, level } => {
                let image = group.textures.get(id)?.levels.get(&(face_index(*target)?, *level))?;
                Some((image.width, image.height))
            }
            SoftAttachment::Renderbuffer(id) => {
                let rb = group.renderbuffers.get(id)?;
                (rb.internal_format != 0).then_some((rb.width, rb.height))
            }
        }
    }

    fn framebuffer_status(ctx: &Contexts, group: &ShareGroup) -> GLenum {
        let fb = ctx.cur_ref().framebuffer;
        if fb == 0 {
            return GL_FRAMEBUFFER_COMPLETE;
        }
        let Some(framebuffer) = group.framebuffers.get(&fb) else {
            return GL_FRAMEBUFFER_UNSUPPORTED;
        };
        if framebuffer.attachments.is_empty() {
            return GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        let mut size = None;
        for attachment in framebuffer.attachments.values() {
            match Self::attachment_size(group, attachment) {
                Some((w, h)) if w > 0 && h > 0 => {
                    if size.is_some_and(|s| s != (w, h)) {
                        return GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
                    }
                    size = Some((w, h));
                }
                _ => return GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            }
        }
        GL_FRAMEBUFFER_COMPLETE
    }

    fn query(ctx: &Contexts, pname: GLenum) -> Option<QueryValue> {
        let caps = &ctx.caps;
        let b = ctx.cur_ref();
        let int = |v: u32| Some(QueryValue::Ints(vec![v as GLint]));
        match pname {
            GL_MAX_VERTEX_ATTRIBS => int(caps.max_vertex_attribs),
            GL_MAX_TEXTURE_IMAGE_UNITS | GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS => int(caps.max_texture_units),
            GL_MAX_VERTEX_TEXTURE_IMAGE_UNITS => int(0),
            GL_MAX_TEXTURE_SIZE => int(caps.max_texture_size),
            GL_MAX_CUBE_MAP_TEXTURE_SIZE => int(caps.max_cube_map_texture_size),
            GL_MAX_RENDERBUFFER_SIZE => int(caps.max_renderbuffer_size),
            GL_MAX_VARYING_VECTORS => int(caps.max_varying_vectors),
            GL_MAX_VERTEX_UNIFORM_VECTORS => int(caps.max_vertex_uniform_vectors),
            GL_MAX_FRAGMENT_UNIFORM_VECTORS => int(caps.max_fragment_uniform_vectors),
            GL_MAX_VIEWPORT_DIMS => Some(QueryValue::Ints(vec![caps.max_texture_size as GLint; 2])),
            GL_RED_BITS | GL_GREEN_BITS | GL_BLUE_BITS | GL_ALPHA_BITS | GL_STENCIL_BITS => int(8),
            GL_DEPTH_BITS => int(24),
            GL_SUBPIXEL_BITS => int(4),
            GL_SAMPLES | GL_SAMPLE_BUFFERS | GL_NUM_COMPRESSED_TEXTURE_FORMATS | GL_NUM_SHADER_BINARY_FORMATS => int(0),
            GL_SHADER_COMPILER => int(1),
            GL_IMPLEMENTATION_COLOR_READ_FORMAT => int(GL_RGBA),
            GL_IMPLEMENTATION_COLOR_READ_TYPE => int(GL_UNSIGNED_BYTE),
            GL_ARRAY_BUFFER_BINDING => int(b.array_buffer),
            GL_ELEMENT_ARRAY_BUFFER_BINDING => int(b.element_array_buffer),
            GL_FRAMEBUFFER_BINDING => int(b.framebuffer),
            GL_RENDERBUFFER_BINDING => int(b.renderbuffer),
            GL_CURRENT_PROGRAM => int(b.program),
            GL_ACTIVE_TEXTURE => int(GL_TEXTURE0 + b.active_unit),
            GL_TEXTURE_BINDING_2D => int(b.bound_texture(GL_TEXTURE_2D)),
            GL_TEXTURE_BINDING_CUBE_MAP => int(b.bound_texture(GL_TEXTURE_CUBE_MAP)),
            GL_PACK_ALIGNMENT => int(b.pack_alignment as u32),
            GL_UNPACK_ALIGNMENT => int(b.unpack_alignment as u32),
            GL_VIEWPORT => Some(QueryValue::Ints(b.viewport.to_vec())),
            GL_SCISSOR_BOX => Some(QueryValue::Ints(b.scissor.to_vec())),
            GL_COLOR_CLEAR_VALUE => Some(QueryValue::Floats(b.clear_color.to_vec())),
            GL_DEPTH_CLEAR_VALUE => Some(QueryValue::Floats(vec![b.clear_depth])),
            GL_STENCIL_CLEAR_VALUE => Some(QueryValue::Ints(vec![b.clear_stencil])),
            GL_COLOR_WRITEMASK => Some(QueryValue::Ints(b.color_mask.iter().map(|&m| m as GLint).collect())),
            GL_DEPTH_WRITEMASK => int(b.depth_mask as u32),
            GL_STENCIL_WRITEMASK => int(b.stencil_mask[0]),
            GL_STENCIL_BACK_WRITEMASK => int(b.stencil_mask[1]),
            GL_BLEND | GL_CULL_FACE | GL_DEPTH_TEST | GL_DITHER | GL_POLYGON_OFFSET_FILL
            | GL_SAMPLE_ALPHA_TO_COVERAGE | GL_SAMPLE_COVERAGE | GL_SCISSOR_TEST | GL_STENCIL_TEST => {
                int(b.enabled.contains(&pname) as u32)
            }
            _ => b.misc.get(&pname).cloned(),
        }
    }

    fn set_misc(ctx: &mut Contexts, pname: GLenum, value: QueryValue) {
        ctx.cur().misc.insert(pname, value);
    }

    fn set_misc_enums(ctx: &mut Contexts, pnames: &[GLenum], values: &[GLenum]) {
        for (&pname, &value) in pnames.iter().zip(values) {
            Self::set_misc(ctx, pname, QueryValue::Ints(vec![value as GLint]));
        }
    }

    fn bound_buffer_mut<'g>(ctx: &mut Contexts, group: &'g mut ShareGroup, target: GLenum) -> Option<&'g mut SoftBuffer> {
        let id = match target {
            GL_ARRAY_BUFFER => ctx.cur_ref().array_buffer,
            GL_ELEMENT_ARRAY_BUFFER => ctx.cur_ref().element_array_buffer,
            _ => {
                ctx.cur().error(GL_INVALID_ENUM);
                return None;
            }
        };
        match group.buffers.get_mut(&id) {
            Some(buffer) if id != 0 => Some(buffer),
            _ => {
                ctx.cur().error(GL_INVALID_OPERATION);
                None
            }
        }
    }

    fn bound_texture_mut<'g>(ctx: &mut Contexts, group: &'g mut ShareGroup, target: GLenum) -> Option<&'g mut SoftTexture> {
        if face_index(target).is_none() {
            ctx.cur().error(GL_INVALID_ENUM);
            return None;
        }
        let id = ctx.cur_ref().bound_texture(bind_target_for_texture_target(target));
        let texture = group.textures.get_mut(&id)?;
        Some(texture)
    }

    fn fill_from_pixels(format: GLenum, ty: GLenum, pixels: &[u8]) -> [u8; 4] {
        if ty != GL_UNSIGNED_BYTE {
            return [0; 4];
        }
        match (format, pixels) {
            (GL_RGBA, [r, g, b, a, ..]) => [*r, *g, *b, *a],
            (GL_RGB, [r, g, b, ..]) => [*r, *g, *b, 255],
            (GL_LUMINANCE, [l, ..]) => [*l, *l, *l, 255],
            (GL_LUMINANCE_ALPHA, [l, a, ..]) => [*l, *l, *l, *a],
            (GL_ALPHA, [a, ..]) => [0, 0, 0, *a],
            _ => [0; 4],
        }
    }
}

impl GlApi for SoftGl {
    fn make_current(&mut self) -> bool {
        self.call("make_current", |ctx, _| {
            if ctx.fail_make_current {
                return false;
            }
            ctx.current = Current::Primary;
            true
        })
    }

    fn make_default_context_current(&mut self) -> bool {
        self.call("make_default_context_current", |ctx, _| {
            if !ctx.has_default {
                return false;
            }
            ctx.current = Current::Default;
            true
        })
    }

    fn is_offscreen(&self) -> bool {
        self.ctx.borrow().offscreen
    }

    fn surface_size(&self) -> Size {
        self.ctx.borrow().surface
    }

    fn swap_buffers(&mut self) {
        self.call("swap_buffers", |ctx, _| ctx.swaps += 1)
    }

    fn capabilities(&self) -> GlCapabilities {
        self.ctx.borrow().caps
    }

    fn get_error(&mut self) -> GLenum {
        // Not logged: drained constantly and never interesting.
        let mut ctx = self.ctx.borrow_mut();
        let errors = &mut ctx.cur().errors;
        if errors.is_empty() {
            GL_NO_ERROR
        } else {
            errors.remove(0)
        }
    }

    fn get_string(&mut self, name: GLenum) -> String {
        self.call("get_string", |ctx, _| {
            match name {
                GL_VENDOR => "gles2-decoder",
                GL_RENDERER => "SoftGl",
                GL_VERSION => "OpenGL ES 2.0 SoftGl",
                GL_SHADING_LANGUAGE_VERSION => "OpenGL ES GLSL ES 1.00",
                GL_EXTENSIONS => {
                    return match (ctx.caps.packed_depth_stencil, ctx.caps.npot_textures) {
                        (true, true) => "GL_OES_packed_depth_stencil GL_OES_texture_npot",
                        (true, false) => "GL_OES_packed_depth_stencil",
                        (false, true) => "GL_OES_texture_npot",
                        (false, false) => "",
                    }
                    .to_string()
                }
                _ => {
                    ctx.cur().error(GL_INVALID_ENUM);
                    ""
                }
            }
            .to_string()
        })
    }

    fn get_integerv(&mut self, pname: GLenum, params: &mut [GLint]) {
        self.call("get_integerv", |ctx, _| match Self::query(ctx, pname) {
            Some(QueryValue::Ints(values)) => {
                for (dst, v) in params.iter_mut().zip(values) {
                    *dst = v;
                }
            }
            Some(QueryValue::Floats(values)) => {
                for (dst, v) in params.iter_mut().zip(values) {
                    *dst = v.round() as GLint;
                }
            }
            None => ctx.cur().error(GL_INVALID_ENUM),
        })
    }

    fn get_floatv(&mut self, pname: GLenum, params: &mut [GLfloat]) {
        self.call("get_floatv", |ctx, _| match Self::query(ctx, pname) {
            Some(QueryValue::Ints(values)) => {
                for (dst, v) in params.iter_mut().zip(values) {
                    *dst = v as GLfloat;
                }
            }
            Some(QueryValue::Floats(values)) => {
                for (dst, v) in params.iter_mut().zip(values) {
                    *dst = v;
                }
            }
            None => ctx.cur().error(GL_INVALID_ENUM),
        })
    }

    fn finish(&mut self) {
        self.call("finish", |_, _| ())
    }

    fn flush(&mut self) {
        self.call("flush", |_, _| ())
    }

    fn gen_buffer(&mut self) -> ServiceId {
        self.call("gen_buffer", |_, group| {
            let id = group.alloc_id();
            group.buffers.insert(id, SoftBuffer::default());
            id
        })
    }

    fn delete_buffer(&mut self, id: ServiceId) {
        self.call("delete_buffer", |ctx, group| {
            if group.buffers.remove(&id).is_none() {
                return;
            }
            let b = ctx.cur();
            for slot in [&mut b.array_buffer, &mut b.element_array_buffer] {
                if *slot == id {
                    *slot = 0;
                }
            }
            for attrib in &mut b.attribs {
                if attrib.buffer == id {
                    attrib.buffer = 0;
                }
            }
        })
    }

    fn bind_buffer(&mut self, target: GLenum, id: ServiceId) {
        self.call("bind_buffer", |ctx, group| {
            if id != 0 {
                let buffer = group.buffers.entry(id).or_default();
                if buffer.target != 0 && buffer.target != target {
                    ctx.cur().error(GL_INVALID_OPERATION);
                    return;
                }
                buffer.target = target;
            }
            match target {
                GL_ARRAY_BUFFER => ctx.cur().array_buffer = id,
                GL_ELEMENT_ARRAY_BUFFER => ctx.cur().element_array_buffer = id,
                _ => ctx.cur().error(GL_INVALID_ENUM),
            }
        })
    }

    fn buffer_data(&mut self, target: GLenum, data: &[u8], usage: GLenum) {
        self.call("buffer_data", |ctx, group| {
            let current = match Self::bound_buffer_mut(ctx, group, target) {
                Some(buffer) => buffer.data.len(),
                None => return,
            };
            if !group.fits(data.len(), current) {
                ctx.cur().error(GL_OUT_OF_MEMORY);
                return;
            }
            if let Some(buffer) = Self::bound_buffer_mut(ctx, group, target) {
                buffer.data = data.to_vec();
                buffer.usage = usage;
            }
        })
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        self.call("buffer_sub_data", |ctx, group| {
            let Some(buffer) = Self::bound_buffer_mut(ctx, group, target) else {
                return;
            };
            match buffer.data.get_mut(offset..offset.saturating_add(data.len())) {
                Some(dst) => dst.copy_from_slice(data),
                None => ctx.cur().error(GL_INVALID_VALUE),
            }
        })
    }

    fn gen_texture(&mut self) -> ServiceId {
        self.call("gen_texture", |_, group| {
            let id = group.alloc_id();
            group.textures.insert(id, SoftTexture::default());
            id
        })
    }

    fn delete_texture(&mut self, id: ServiceId) {
        self.call("delete_texture", |ctx, group| {
            if id == 0 || group.textures.remove(&id).is_none() {
                return;
            }
            for unit in &mut ctx.cur().units {
                for slot in unit.iter_mut() {
                    if *slot == id {
                        *slot = 0;
                    }
                }
            }
            let fb = ctx.cur_ref().framebuffer;
            if let Some(framebuffer) = group.framebuffers.get_mut(&fb) {
                framebuffer
                    .attachments
                    .retain(|_, a| !matches!(a, SoftAttachment::Texture { id: t, .. } if *t == id));
            }
        })
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.call("active_texture", |ctx, _| {
            let index = unit.wrapping_sub(GL_TEXTURE0);
            if index as usize >= ctx.cur_ref().units.len() {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            }
            ctx.cur().active_unit = index;
        })
    }

    fn bind_texture(&mut self, target: GLenum, id: ServiceId) {
        self.call("bind_texture", |ctx, group| {
            if target != GL_TEXTURE_2D && target != GL_TEXTURE_CUBE_MAP {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            }
            if id != 0 {
                let texture = group.textures.entry(id).or_default();
                if texture.target != 0 && texture.target != target {
                    ctx.cur().error(GL_INVALID_OPERATION);
                    return;
                }
                texture.target = target;
            }
            if let Some(slot) = ctx.cur().unit_slot(target) {
                *slot = id;
            }
        })
    }

    fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) {
        self.call("tex_image_2d", |ctx, group| {
            let Some(face) = face_index(target) else {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            };
            let (w, h) = (width.max(0) as u32, height.max(0) as u32);
            let released = match Self::bound_texture_mut(ctx, group, target) {
                Some(tex) => tex
                    .levels
                    .get(&(face, level))
                    .map_or(0, |i| i.width as usize * i.height as usize * 4),
                None => return,
            };
            if !group.fits(w as usize * h as usize * 4, released) {
                ctx.cur().error(GL_OUT_OF_MEMORY);
                return;
            }
            let fill = Self::fill_from_pixels(format, ty, pixels);
            if let Some(tex) = Self::bound_texture_mut(ctx, group, target) {
                tex.levels.insert(
                    (face, level),
                    SoftImage {
                        width: w,
                        height: h,
                        internal_format,
                        fill,
                    },
                );
            }
        })
    }

    fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        xoffset: GLint,
        yoffset: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) {
        self.call("tex_sub_image_2d", |ctx, group| {
            let Some(face) = face_index(target) else {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            };
            let Some(tex) = Self::bound_texture_mut(ctx, group, target) else {
                return;
            };
            let Some(image) = tex.levels.get_mut(&(face, level)) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            let fits = xoffset >= 0
                && yoffset >= 0
                && (xoffset as i64 + width as i64) <= image.width as i64
                && (yoffset as i64 + height as i64) <= image.height as i64;
            if !fits {
                ctx.cur().error(GL_INVALID_VALUE);
                return;
            }
            if width as u32 == image.width && height as u32 == image.height {
                image.fill = Self::fill_from_pixels(format, ty, pixels);
            }
        })
    }

    fn copy_tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        _x: GLint,
        _y: GLint,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.call("copy_tex_image_2d", |ctx, group| {
            let Some(face) = face_index(target) else {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            };
            if Self::framebuffer_status(ctx, group) != GL_FRAMEBUFFER_COMPLETE {
                ctx.cur().error(GL_INVALID_FRAMEBUFFER_OPERATION);
                return;
            }
            let fill = Self::read_source(ctx, group).map_or([0; 4], |(_, _, fill)| fill);
            if let Some(tex) = Self::bound_texture_mut(ctx, group, target) {
                tex.levels.insert(
                    (face, level),
                    SoftImage {
                        width: width.max(0) as u32,
                        height: height.max(0) as u32,
                        internal_format,
                        fill,
                    },
                );
            }
        })
    }

    fn copy_tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        xoffset: GLint,
        yoffset: GLint,
        _x: GLint,
        _y: GLint,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.call("copy_tex_sub_image_2d", |ctx, group| {
            let Some(face) = face_index(target) else {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            };
            if Self::framebuffer_status(ctx, group) != GL_FRAMEBUFFER_COMPLETE {
                ctx.cur().error(GL_INVALID_FRAMEBUFFER_OPERATION);
                return;
            }
            let fill = Self::read_source(ctx, group).map_or([0; 4], |(_, _, fill)| fill);
            let Some(tex) = Self::bound_texture_mut(ctx, group, target) else {
                return;
            };
            let Some(image) = tex.levels.get_mut(&(face, level)) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            let fits = xoffset >= 0
                && yoffset >= 0
                && (xoffset as i64 + width as i64) <= image.width as i64
                && (yoffset as i64 + height as i64) <= image.height as i64;
            if !fits {
                ctx.cur().error(GL_INVALID_VALUE);
                return;
            }
            image.fill = fill;
        })
    }

    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        self.call("tex_parameteri", |ctx, group| {
            let id = ctx.cur_ref().bound_texture(target);
            match group.textures.get_mut(&id) {
                Some(tex) => {
                    tex.params.insert(pname, param);
                }
                None => ctx.cur().error(GL_INVALID_OPERATION),
            }
        })
    }

    fn tex_parameterf(&mut self, target: GLenum, pname: GLenum, param: GLfloat) {
        self.call("tex_parameterf", |ctx, group| {
            let id = ctx.cur_ref().bound_texture(target);
            match group.textures.get_mut(&id) {
                Some(tex) => {
                    tex.params.insert(pname, param as GLint);
                }
                None => ctx.cur().error(GL_INVALID_OPERATION),
            }
        })
    }

    fn generate_mipmap(&mut self, target: GLenum) {
        self.call("generate_mipmap", |ctx, group| {
            let id = ctx.cur_ref().bound_texture(target);
            let Some(tex) = group.textures.get_mut(&id) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            let bases: Vec<(usize, SoftImage)> = tex
                .levels
                .iter()
                .filter(|((_, level), _)| *level == 0)
                .map(|((face, _), image)| (*face, *image))
                .collect();
            for (face, base) in bases {
                let (mut w, mut h, mut level) = (base.width, base.height, 0);
                while w > 1 || h > 1 {
                    w = (w / 2).max(1);
                    h = (h / 2).max(1);
                    level += 1;
                    tex.levels.insert(
                        (face, level),
                        SoftImage {
                            width: w,
                            height: h,
                            ..base
                        },
                    );
                }
            }
        })
    }

    fn pixel_storei(&mut self, pname: GLenum, param: GLint) {
        self.call("pixel_storei", |ctx, _| match pname {
            GL_PACK_ALIGNMENT => ctx.cur().pack_alignment = param,
            GL_UNPACK_ALIGNMENT => ctx.cur().unpack_alignment = param,
            _ => ctx.cur().error(GL_INVALID_ENUM),
        })
    }

    fn gen_framebuffer(&mut self) -> ServiceId {
        self.call("gen_framebuffer", |_, group| {
            let id = group.alloc_id();
            group.framebuffers.insert(id, SoftFramebuffer::default());
            id
        })
    }

    fn delete_framebuffer(&mut self, id: ServiceId) {
        self.call("delete_framebuffer", |ctx, group| {
            if group.framebuffers.remove(&id).is_some() && ctx.cur_ref().framebuffer == id {
                ctx.cur().framebuffer = 0;
            }
        })
    }

    fn bind_framebuffer(&mut self, target: GLenum, id: ServiceId) {
        self.call("bind_framebuffer", |ctx, group| {
            if target != GL_FRAMEBUFFER {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            }
            if id != 0 {
                group.framebuffers.entry(id).or_default();
            }
            ctx.cur().framebuffer = id;
        })
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        textarget: GLenum,
        texture: ServiceId,
        level: GLint,
    ) {
        self.call("framebuffer_texture_2d", |ctx, group| {
            let fb = ctx.cur_ref().framebuffer;
            let Some(framebuffer) = group.framebuffers.get_mut(&fb).filter(|_| target == GL_FRAMEBUFFER && fb != 0) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            if texture == 0 {
                framebuffer.attachments.remove(&attachment);
            } else {
                framebuffer.attachments.insert(
                    attachment,
                    SoftAttachment::Texture {
                        id: texture,
                        target: textarget,
                        level,
                    },
                );
            }
        })
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        _renderbuffer_target: GLenum,
        renderbuffer: ServiceId,
    ) {
        self.call("framebuffer_renderbuffer", |ctx, group| {
            let fb = ctx.cur_ref().framebuffer;
            let Some(framebuffer) = group.framebuffers.get_mut(&fb).filter(|_| target == GL_FRAMEBUFFER && fb != 0) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            if renderbuffer == 0 {
                framebuffer.attachments.remove(&attachment);
            } else {
                framebuffer
                    .attachments
                    .insert(attachment, SoftAttachment::Renderbuffer(renderbuffer));
            }
        })
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        self.call("check_framebuffer_status", |ctx, group| {
            if target != GL_FRAMEBUFFER {
                ctx.cur().error(GL_INVALID_ENUM);
                return 0;
            }
            Self::framebuffer_status(ctx, group)
        })
    }

    fn get_framebuffer_attachment_parameteriv(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        pname: GLenum,
    ) -> GLint {
        self.call("get_framebuffer_attachment_parameteriv", |ctx, group| {
            let fb = ctx.cur_ref().framebuffer;
            let Some(framebuffer) = group.framebuffers.get(&fb).filter(|_| target == GL_FRAMEBUFFER && fb != 0) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return 0;
            };
            let attached = framebuffer.attachments.get(&attachment).copied();
            match (pname, attached) {
                (GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE, None) => GL_NONE as GLint,
                (GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE, Some(SoftAttachment::Texture { .. })) => GL_TEXTURE as GLint,
                (GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE, Some(SoftAttachment::Renderbuffer(_))) => {
                    GL_RENDERBUFFER as GLint
                }
                (GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME, Some(SoftAttachment::Texture { id, .. }))
                | (GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME, Some(SoftAttachment::Renderbuffer(id))) => id as GLint,
                (GL_FRAMEBUFFER_ATTACHMENT_TEXTURE_LEVEL, Some(SoftAttachment::Texture { level, .. })) => level,
                (GL_FRAMEBUFFER_ATTACHMENT_TEXTURE_CUBE_MAP_FACE, Some(SoftAttachment::Texture { target, .. })) => {
                    if target == GL_TEXTURE_2D {
                        0
                    } else {
                        target as GLint
                    }
                }
                _ => {
                    ctx.cur().error(GL_INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn gen_renderbuffer(&mut self) -> ServiceId {
        self.call("gen_renderbuffer", |_, group| {
            let id = group.alloc_id();
            group.renderbuffers.insert(id, SoftRenderbuffer::default());
            id
        })
    }

    fn delete_renderbuffer(&mut self, id: ServiceId) {
        self.call("delete_renderbuffer", |ctx, group| {
            if group.renderbuffers.remove(&id).is_none() {
                return;
            }
            if ctx.cur_ref().renderbuffer == id {
                ctx.cur().renderbuffer = 0;
            }
            let fb = ctx.cur_ref().framebuffer;
            if let Some(framebuffer) = group.framebuffers.get_mut(&fb) {
                framebuffer
                    .attachments
                    .retain(|_, a| *a != SoftAttachment::Renderbuffer(id));
            }
        })
    }

    fn bind_renderbuffer(&mut self, target: GLenum, id: ServiceId) {
        self.call("bind_renderbuffer", |ctx, group| {
            if target != GL_RENDERBUFFER {
                ctx.cur().error(GL_INVALID_ENUM);
                return;
            }
            if id != 0 {
                group.renderbuffers.entry(id).or_default();
            }
            ctx.cur().renderbuffer = id;
        })
    }

    fn renderbuffer_storage(
        &mut self,
        target: GLenum,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.call("renderbuffer_storage", |ctx, group| {
            let id = ctx.cur_ref().renderbuffer;
            if target != GL_RENDERBUFFER || id == 0 {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            }
            let (w, h) = (width.max(0) as u32, height.max(0) as u32);
            let released = group
                .renderbuffers
                .get(&id)
                .map_or(0, |r| r.width as usize * r.height as usize * 4);
            if !group.fits(w as usize * h as usize * 4, released) {
                ctx.cur().error(GL_OUT_OF_MEMORY);
                return;
            }
            if let Some(rb) = group.renderbuffers.get_mut(&id) {
                *rb = SoftRenderbuffer {
                    internal_format,
                    width: w,
                    height: h,
                    fill: [0; 4],
                };
            }
        })
    }

    fn create_shader(&mut self, ty: GLenum) -> ServiceId {
        self.call("create_shader", |_, group| {
            let id = group.alloc_id();
            group.shaders.insert(
                id,
                SoftShader {
                    ty,
                    ..SoftShader::default()
                },
            );
            id
        })
    }

    fn delete_shader(&mut self, id: ServiceId) {
        self.call("delete_shader", |_, group| {
            let attached = match group.shaders.get_mut(&id) {
                Some(shader) => {
                    shader.delete_pending = true;
                    shader.attach_count > 0
                }
                None => return,
            };
            if !attached {
                group.shaders.remove(&id);
            }
        })
    }

    fn shader_source(&mut self, id: ServiceId, source: &str) {
        self.call("shader_source", |ctx, group| match group.shaders.get_mut(&id) {
            Some(shader) => shader.source = source.to_string(),
            None => ctx.cur().error(GL_INVALID_VALUE),
        })
    }

    fn compile_shader(&mut self, id: ServiceId) {
        self.call("compile_shader", |ctx, group| match group.shaders.get_mut(&id) {
            Some(shader) => {
                shader.compiled = shader.source.contains("void main");
                shader.log = if shader.compiled {
                    String::new()
                } else {
                    "ERROR: 0:1: 'main' : function not found".to_string()
                };
            }
            None => ctx.cur().error(GL_INVALID_VALUE),
        })
    }

    fn get_shaderiv(&mut self, id: ServiceId, pname: GLenum) -> GLint {
        self.call("get_shaderiv", |ctx, group| {
            let Some(shader) = group.shaders.get(&id) else {
                ctx.cur().error(GL_INVALID_VALUE);
                return 0;
            };
            match pname {
                GL_SHADER_TYPE => shader.ty as GLint,
                GL_DELETE_STATUS => shader.delete_pending as GLint,
                GL_COMPILE_STATUS => shader.compiled as GLint,
                GL_INFO_LOG_LENGTH => {
                    if shader.log.is_empty() {
                        0
                    } else {
                        shader.log.len() as GLint + 1
                    }
                }
                GL_SHADER_SOURCE_LENGTH => {
                    if shader.source.is_empty() {
                        0
                    } else {
                        shader.source.len() as GLint + 1
                    }
                }
                _ => {
                    ctx.cur().error(GL_INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn get_shader_info_log(&mut self, id: ServiceId) -> String {
        self.call("get_shader_info_log", |_, group| {
            group.shaders.get(&id).map(|s| s.log.clone()).unwrap_or_default()
        })
    }

    fn create_program(&mut self) -> ServiceId {
        self.call("create_program", |_, group| {
            let id = group.alloc_id();
            group.programs.insert(id, SoftProgram::default());
            id
        })
    }

    fn delete_program(&mut self, id: ServiceId) {
        self.call("delete_program", |_, group| {
            if let Some(program) = group.programs.remove(&id) {
                for shader_id in program.shaders {
                    let remove = match group.shaders.get_mut(&shader_id) {
                        Some(shader) => {
                            shader.attach_count = shader.attach_count.saturating_sub(1);
                            shader.delete_pending && shader.attach_count == 0
                        }
                        None => false,
                    };
                    if remove {
                        group.shaders.remove(&shader_id);
                    }
                }
            }
        })
    }

    fn attach_shader(&mut self, program: ServiceId, shader: ServiceId) {
        self.call("attach_shader", |ctx, group| {
            let (Some(prog), Some(sh)) = (group.programs.get_mut(&program), group.shaders.get_mut(&shader)) else {
                ctx.cur().error(GL_INVALID_VALUE);
                return;
            };
            if prog.shaders.contains(&shader) {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            }
            prog.shaders.push(shader);
            sh.attach_count += 1;
        })
    }

    fn detach_shader(&mut self, program: ServiceId, shader: ServiceId) {
        self.call("detach_shader", |ctx, group| {
            let Some(prog) = group.programs.get_mut(&program) else {
                ctx.cur().error(GL_INVALID_VALUE);
                return;
            };
            let Some(pos) = prog.shaders.iter().position(|&s| s == shader) else {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            };
            prog.shaders.remove(pos);
            let remove = match group.shaders.get_mut(&shader) {
                Some(sh) => {
                    sh.attach_count = sh.attach_count.saturating_sub(1);
                    sh.delete_pending && sh.attach_count == 0
                }
                None => false,
            };
            if remove {
                group.shaders.remove(&shader);
            }
        })
    }

    fn bind_attrib_location(&mut self, program: ServiceId, index: GLuint, name: &str) {
        self.call("bind_attrib_location", |ctx, group| match group.programs.get_mut(&program) {
            Some(prog) => {
                prog.bound_attribs.insert(name.to_string(), index);
            }
            None => ctx.cur().error(GL_INVALID_VALUE),
        })
    }

    fn link_program(&mut self, program: ServiceId) {
        self.call("link_program", |ctx, group| {
            if !group.programs.contains_key(&program) {
                ctx.cur().error(GL_INVALID_VALUE);
                return;
            }
            Self::link(group, program, ctx.caps.max_vertex_attribs);
        })
    }

    fn validate_program(&mut self, program: ServiceId) {
        self.call("validate_program", |ctx, group| match group.programs.get_mut(&program) {
            Some(prog) => {
                prog.validated = prog.linked;
                prog.log = if prog.linked {
                    String::new()
                } else {
                    "Validation failed: program is not linked".to_string()
                };
            }
            None => ctx.cur().error(GL_INVALID_VALUE),
        })
    }

    fn get_programiv(&mut self, program: ServiceId, pname: GLenum) -> GLint {
        self.call("get_programiv", |ctx, group| {
            let Some(prog) = group.programs.get(&program) else {
                ctx.cur().error(GL_INVALID_VALUE);
                return 0;
            };
            match pname {
                GL_LINK_STATUS => prog.linked as GLint,
                GL_VALIDATE_STATUS => prog.validated as GLint,
                GL_DELETE_STATUS => 0,
                GL_ATTACHED_SHADERS => prog.shaders.len() as GLint,
                GL_ACTIVE_ATTRIBUTES => prog.attribs.len() as GLint,
                GL_ACTIVE_UNIFORMS => prog.uniforms.len() as GLint,
                GL_INFO_LOG_LENGTH => {
                    if prog.log.is_empty() {
                        0
                    } else {
                        prog.log.len() as GLint + 1
                    }
                }
                _ => {
                    ctx.cur().error(GL_INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn get_program_info_log(&mut self, program: ServiceId) -> String {
        self.call("get_program_info_log", |_, group| {
            group.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
        })
    }

    fn get_active_attrib(&mut self, program: ServiceId, index: GLuint) -> Option<ActiveVariable> {
        self.call("get_active_attrib", |_, group| {
            let attrib = group.programs.get(&program)?.attribs.get(index as usize)?;
            Some(ActiveVariable {
                name: attrib.name.clone(),
                size: attrib.size,
                ty: attrib.ty,
            })
        })
    }

    fn get_active_uniform(&mut self, program: ServiceId, index: GLuint) -> Option<ActiveVariable> {
        self.call("get_active_uniform", |_, group| {
            let uniform = group.programs.get(&program)?.uniforms.get(index as usize)?;
            let name = if uniform.size > 1 {
                format!("{}[0]", uniform.name)
            } else {
                uniform.name.clone()
            };
            Some(ActiveVariable {
                name,
                size: uniform.size,
                ty: uniform.ty,
            })
        })
    }

    fn get_attrib_location(&mut self, program: ServiceId, name: &str) -> GLint {
        self.call("get_attrib_location", |_, group| {
            group
                .programs
                .get(&program)
                .filter(|p| p.linked)
                .and_then(|p| p.attribs.iter().find(|a| a.name == name))
                .map_or(-1, |a| a.location)
        })
    }

    fn get_uniform_location(&mut self, program: ServiceId, name: &str) -> GLint {
        self.call("get_uniform_location", |_, group| {
            group
                .programs
                .get(&program)
                .filter(|p| p.linked)
                .map_or(-1, |p| Self::uniform_location(p, name))
        })
    }

    fn use_program(&mut self, program: ServiceId) {
        self.call("use_program", |ctx, group| {
            if program != 0 && !group.programs.get(&program).is_some_and(|p| p.linked) {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            }
            ctx.cur().program = program;
        })
    }

    fn uniform_iv(&mut self, location: GLint, _components: usize, values: &[GLint]) {
        self.call("uniform_iv", |ctx, group| {
            Self::set_uniform(ctx, group, location, values.iter().map(|&v| v as GLfloat).collect())
        })
    }

    fn uniform_fv(&mut self, location: GLint, _components: usize, values: &[GLfloat]) {
        self.call("uniform_fv", |ctx, group| {
            Self::set_uniform(ctx, group, location, values.to_vec())
        })
    }

    fn uniform_matrix4fv(&mut self, location: GLint, _transpose: bool, values: &[GLfloat]) {
        self.call("uniform_matrix4fv", |ctx, group| {
            Self::set_uniform(ctx, group, location, values.to_vec())
        })
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.call("enable_vertex_attrib_array", |ctx, _| {
            match ctx.cur().attribs.get_mut(index as usize) {
                Some(attrib) => attrib.enabled = true,
                None => ctx.cur().error(GL_INVALID_VALUE),
            }
        })
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.call("disable_vertex_attrib_array", |ctx, _| {
            match ctx.cur().attribs.get_mut(index as usize) {
                Some(attrib) => attrib.enabled = false,
                None => ctx.cur().error(GL_INVALID_VALUE),
            }
        })
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: u32,
    ) {
        self.call("vertex_attrib_pointer", |ctx, _| {
            let b = ctx.cur();
            let buffer = b.array_buffer;
            match b.attribs.get_mut(index as usize) {
                Some(attrib) => {
                    attrib.buffer = buffer;
                    attrib.size = size;
                    attrib.ty = ty;
                    attrib.normalized = normalized;
                    attrib.stride = stride;
                    attrib.offset = offset;
                }
                None => b.error(GL_INVALID_VALUE),
            }
        })
    }

    fn vertex_attrib_4f(&mut self, index: GLuint, value: [GLfloat; 4]) {
        self.call("vertex_attrib_4f", |ctx, _| match ctx.cur().attribs.get_mut(index as usize) {
            Some(attrib) => attrib.value = value,
            None => ctx.cur().error(GL_INVALID_VALUE),
        })
    }

    fn enable(&mut self, cap: GLenum) {
        self.call("enable", |ctx, _| {
            ctx.cur().enabled.insert(cap);
        })
    }

    fn disable(&mut self, cap: GLenum) {
        self.call("disable", |ctx, _| {
            ctx.cur().enabled.remove(&cap);
        })
    }

    fn clear_color(&mut self, rgba: [GLfloat; 4]) {
        self.call("clear_color", |ctx, _| ctx.cur().clear_color = rgba)
    }

    fn clear_depth(&mut self, depth: GLfloat) {
        self.call("clear_depth", |ctx, _| ctx.cur().clear_depth = depth)
    }

    fn clear_stencil(&mut self, s: GLint) {
        self.call("clear_stencil", |ctx, _| ctx.cur().clear_stencil = s)
    }

    fn color_mask(&mut self, rgba: [bool; 4]) {
        self.call("color_mask", |ctx, _| ctx.cur().color_mask = rgba)
    }

    fn depth_mask(&mut self, flag: bool) {
        self.call("depth_mask", |ctx, _| ctx.cur().depth_mask = flag)
    }

    fn stencil_mask_separate(&mut self, face: GLenum, mask: GLuint) {
        self.call("stencil_mask_separate", |ctx, _| {
            let b = ctx.cur();
            if face != GL_BACK {
                b.stencil_mask[0] = mask;
            }
            if face != GL_FRONT {
                b.stencil_mask[1] = mask;
            }
        })
    }

    fn clear(&mut self, mask: GLbitfield) {
        self.call("clear", |ctx, group| {
            if Self::framebuffer_status(ctx, group) != GL_FRAMEBUFFER_COMPLETE {
                ctx.cur().error(GL_INVALID_FRAMEBUFFER_OPERATION);
                return;
            }
            let b = ctx.cur_ref().clone();
            let color = b.clear_color.map(to_u8);
            let apply = |old: [u8; 4]| {
                let mut out = old;
                for i in 0..4 {
                    if b.color_mask[i] {
                        out[i] = color[i];
                    }
                }
                out
            };
            if mask & GL_COLOR_BUFFER_BIT != 0 {
                if b.framebuffer == 0 {
                    ctx.backbuffer_fill = apply(ctx.backbuffer_fill);
                } else if let Some(attachment) = group
                    .framebuffers
                    .get(&b.framebuffer)
                    .and_then(|f| f.attachments.get(&GL_COLOR_ATTACHMENT0))
                    .copied()
                {
                    match attachment {
                        SoftAttachment::Texture { id, target, level } => {
                            let image = face_index(target).and_then(|face| {
                                group.textures.get_mut(&id)?.levels.get_mut(&(face, level))
                            });
                            if let Some(image) = image {
                                image.fill = apply(image.fill);
                            }
                        }
                        SoftAttachment::Renderbuffer(id) => {
                            if let Some(rb) = group.renderbuffers.get_mut(&id) {
                                rb.fill = apply(rb.fill);
                            }
                        }
                    }
                }
            }
            let default_context = ctx.current == Current::Default;
            ctx.clears.push(ClearRecord {
                framebuffer: b.framebuffer,
                mask,
                color,
                scissor_test: b.enabled.contains(&GL_SCISSOR_TEST),
                color_mask: b.color_mask,
                default_context,
            });
        })
    }

    fn viewport(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.call("viewport", |ctx, _| ctx.cur().viewport = [x, y, width, height])
    }

    fn scissor(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.call("scissor", |ctx, _| ctx.cur().scissor = [x, y, width, height])
    }

    fn blend_color(&mut self, rgba: [GLfloat; 4]) {
        self.call("blend_color", |ctx, _| {
            Self::set_misc(ctx, GL_BLEND_COLOR, QueryValue::Floats(rgba.to_vec()))
        })
    }

    fn blend_equation(&mut self, mode: GLenum) {
        self.call("blend_equation", |ctx, _| {
            Self::set_misc_enums(ctx, &[GL_BLEND_EQUATION_RGB, GL_BLEND_EQUATION_ALPHA], &[mode, mode])
        })
    }

    fn blend_func(&mut self, sfactor: GLenum, dfactor: GLenum) {
        self.call("blend_func", |ctx, _| {
            Self::set_misc_enums(
                ctx,
                &[GL_BLEND_SRC_RGB, GL_BLEND_SRC_ALPHA, GL_BLEND_DST_RGB, GL_BLEND_DST_ALPHA],
                &[sfactor, sfactor, dfactor, dfactor],
            )
        })
    }

    fn cull_face(&mut self, mode: GLenum) {
        self.call("cull_face", |ctx, _| Self::set_misc_enums(ctx, &[GL_CULL_FACE_MODE], &[mode]))
    }

    fn depth_func(&mut self, func: GLenum) {
        self.call("depth_func", |ctx, _| Self::set_misc_enums(ctx, &[GL_DEPTH_FUNC], &[func]))
    }

    fn depth_range(&mut self, z_near: GLfloat, z_far: GLfloat) {
        self.call("depth_range", |ctx, _| {
            Self::set_misc(ctx, GL_DEPTH_RANGE, QueryValue::Floats(vec![z_near, z_far]))
        })
    }

    fn front_face(&mut self, mode: GLenum) {
        self.call("front_face", |ctx, _| Self::set_misc_enums(ctx, &[GL_FRONT_FACE], &[mode]))
    }

    fn hint(&mut self, target: GLenum, mode: GLenum) {
        self.call("hint", |ctx, _| Self::set_misc_enums(ctx, &[target], &[mode]))
    }

    fn line_width(&mut self, width: GLfloat) {
        self.call("line_width", |ctx, _| {
            Self::set_misc(ctx, GL_LINE_WIDTH, QueryValue::Floats(vec![width]))
        })
    }

    fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) {
        self.call("polygon_offset", |ctx, _| {
            Self::set_misc(ctx, GL_POLYGON_OFFSET_FACTOR, QueryValue::Floats(vec![factor]));
            Self::set_misc(ctx, GL_POLYGON_OFFSET_UNITS, QueryValue::Floats(vec![units]));
        })
    }

    fn sample_coverage(&mut self, value: GLfloat, invert: bool) {
        self.call("sample_coverage", |ctx, _| {
            Self::set_misc(ctx, GL_SAMPLE_COVERAGE_VALUE, QueryValue::Floats(vec![value]));
            Self::set_misc(ctx, GL_SAMPLE_COVERAGE_INVERT, QueryValue::Ints(vec![invert as GLint]));
        })
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        self.call("stencil_func", |ctx, _| {
            Self::set_misc_enums(ctx, &[GL_STENCIL_FUNC], &[func]);
            Self::set_misc(ctx, GL_STENCIL_REF, QueryValue::Ints(vec![reference]));
            Self::set_misc(ctx, GL_STENCIL_VALUE_MASK, QueryValue::Ints(vec![mask as GLint]));
        })
    }

    fn stencil_op(&mut self, fail: GLenum, zfail: GLenum, zpass: GLenum) {
        self.call("stencil_op", |ctx, _| {
            Self::set_misc_enums(
                ctx,
                &[GL_STENCIL_FAIL, GL_STENCIL_PASS_DEPTH_FAIL, GL_STENCIL_PASS_DEPTH_PASS],
                &[fail, zfail, zpass],
            )
        })
    }

    fn draw_arrays(&mut self, mode: GLenum, _first: GLint, count: GLsizei) {
        self.call("draw_arrays", |ctx, group| record_draw(ctx, group, mode, count))
    }

    fn draw_elements(&mut self, mode: GLenum, count: GLsizei, _ty: GLenum, _offset: u32) {
        self.call("draw_elements", |ctx, group| record_draw(ctx, group, mode, count))
    }

    fn read_pixels(
        &mut self,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        dst: &mut [u8],
    ) {
        self.call("read_pixels", |ctx, group| {
            if Self::framebuffer_status(ctx, group) != GL_FRAMEBUFFER_COMPLETE {
                ctx.cur().error(GL_INVALID_FRAMEBUFFER_OPERATION);
                return;
            }
            let Some((fw, fh, fill)) = Self::read_source(ctx, group) else {
                return;
            };
            let channels: &[usize] = match format {
                GL_RGBA => &[0, 1, 2, 3],
                GL_RGB => &[0, 1, 2],
                GL_ALPHA => &[3],
                _ => {
                    ctx.cur().error(GL_INVALID_ENUM);
                    return;
                }
            };
            if ty != GL_UNSIGNED_BYTE || width < 0 || height < 0 {
                ctx.cur().error(GL_INVALID_OPERATION);
                return;
            }
            let alignment = ctx.cur_ref().pack_alignment.max(1) as u32;
            let row_bytes = width as usize * channels.len();
            let Some(one_row) = compute_image_data_size(width as u32, 2, format, ty, alignment) else {
                return;
            };
            let stride = one_row as usize - row_bytes;
            for row in 0..height {
                let py = y as i64 + row as i64;
                if py < 0 || py >= fh as i64 {
                    continue;
                }
                for col in 0..width {
                    let px = x as i64 + col as i64;
                    if px < 0 || px >= fw as i64 {
                        continue;
                    }
                    let at = row as usize * stride + col as usize * channels.len();
                    if let Some(pixel) = dst.get_mut(at..at + channels.len()) {
                        for (out, &c) in pixel.iter_mut().zip(channels) {
                            *out = fill[c];
                        }
                    }
                }
            }
        })
    }
}

fn record_draw(ctx: &mut Contexts, group: &ShareGroup, mode: GLenum, count: GLsizei) {
    if SoftGl::framebuffer_status(ctx, group) != GL_FRAMEBUFFER_COMPLETE {
        ctx.cur().error(GL_INVALID_FRAMEBUFFER_OPERATION);
        return;
    }
    let b = ctx.cur_ref();
    let attrib0 = b.attribs.first().copied().unwrap_or_default();
    let attrib0_data = group.buffers.get(&attrib0.buffer).map(|buf| buf.data.clone());
    let record = DrawRecord {
        mode,
        count,
        program: b.program,
        textures: b.units.clone(),
        attrib0,
        attrib0_data,
    };
    ctx.draws.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "attribute vec4 a_position;\nattribute vec2 a_uv;\nuniform mat4 u_mvp;\nvoid main() { gl_Position = u_mvp * a_position; }";
    const FS: &str = "precision mediump float;\nuniform sampler2D u_tex;\nuniform vec4 u_tint[2];\nvoid main() { gl_FragColor = u_tint[0]; }";

    fn linked_program(gl: &mut SoftGl) -> ServiceId {
        let vs = gl.create_shader(GL_VERTEX_SHADER);
        gl.shader_source(vs, VS);
        gl.compile_shader(vs);
        let fs = gl.create_shader(GL_FRAGMENT_SHADER);
        gl.shader_source(fs, FS);
        gl.compile_shader(fs);
        let program = gl.create_program();
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.bind_attrib_location(program, 3, "a_uv");
        gl.link_program(program);
        program
    }

    #[test]
    fn declarations_are_scanned_with_arrays_and_precision() {
        let decls = scan_declarations(FS, "uniform");
        assert_eq!(
            decls,
            vec![
                ("u_tex".to_string(), 1, GL_SAMPLER_2D),
                ("u_tint".to_string(), 2, GL_FLOAT_VEC4),
            ]
        );
        assert!(scan_declarations("uniform lowp float a, b;", "uniform").len() == 2);
    }

    #[test]
    fn link_assigns_bound_attribs_first() {
        let mut gl = SoftGl::new_offscreen();
        let program = linked_program(&mut gl);
        assert_eq!(gl.get_programiv(program, GL_LINK_STATUS), 1);
        assert_eq!(gl.get_attrib_location(program, "a_uv"), 3);
        assert_eq!(gl.get_attrib_location(program, "a_position"), 0);
        assert_eq!(gl.get_uniform_location(program, "u_tint[1]"), 3);
        let tint = gl.get_active_uniform(program, 2).expect("third uniform");
        assert_eq!(tint.name, "u_tint[0]");
        assert_eq!(tint.size, 2);
    }

    #[test]
    fn link_fails_without_fragment_shader() {
        let mut gl = SoftGl::new_offscreen();
        let vs = gl.create_shader(GL_VERTEX_SHADER);
        gl.shader_source(vs, VS);
        gl.compile_shader(vs);
        let program = gl.create_program();
        gl.attach_shader(program, vs);
        gl.link_program(program);
        assert_eq!(gl.get_programiv(program, GL_LINK_STATUS), 0);
        assert!(gl.get_program_info_log(program).contains("missing"));
        gl.use_program(program);
        assert_eq!(gl.get_error(), GL_INVALID_OPERATION);
    }

    #[test]
    fn clear_fills_color_attachment_and_reads_back() {
        let mut gl = SoftGl::new_offscreen();
        let tex = gl.gen_texture();
        gl.bind_texture(GL_TEXTURE_2D, tex);
        gl.tex_image_2d(GL_TEXTURE_2D, 0, GL_RGBA, 2, 2, GL_RGBA, GL_UNSIGNED_BYTE, &[]);
        let fb = gl.gen_framebuffer();
        gl.bind_framebuffer(GL_FRAMEBUFFER, fb);
        gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, tex, 0);
        assert_eq!(gl.check_framebuffer_status(GL_FRAMEBUFFER), GL_FRAMEBUFFER_COMPLETE);

        GlApi::clear_color(&mut gl, [1.0, 0.0, 0.0, 1.0]);
        gl.clear(GL_COLOR_BUFFER_BIT);
        let mut pixels = [0u8; 12];
        gl.read_pixels(1, 0, 2, 1, GL_RGBA, GL_UNSIGNED_BYTE, &mut pixels);
        assert_eq!(pixels, [255, 0, 0, 255, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn mismatched_attachments_are_incomplete() {
        let mut gl = SoftGl::new_offscreen();
        let tex = gl.gen_texture();
        gl.bind_texture(GL_TEXTURE_2D, tex);
        gl.tex_image_2d(GL_TEXTURE_2D, 0, GL_RGBA, 2, 2, GL_RGBA, GL_UNSIGNED_BYTE, &[]);
        let rb = gl.gen_renderbuffer();
        gl.bind_renderbuffer(GL_RENDERBUFFER, rb);
        gl.renderbuffer_storage(GL_RENDERBUFFER, GL_DEPTH_COMPONENT16, 4, 4);
        let fb = gl.gen_framebuffer();
        gl.bind_framebuffer(GL_FRAMEBUFFER, fb);
        assert_eq!(
            gl.check_framebuffer_status(GL_FRAMEBUFFER),
            GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );
        gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, tex, 0);
        gl.framebuffer_renderbuffer(GL_FRAMEBUFFER, GL_DEPTH_ATTACHMENT, GL_RENDERBUFFER, rb);
        assert_eq!(
            gl.check_framebuffer_status(GL_FRAMEBUFFER),
            GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS
        );
        gl.clear(GL_COLOR_BUFFER_BIT);
        assert_eq!(gl.get_error(), GL_INVALID_FRAMEBUFFER_OPERATION);
    }

    #[test]
    fn memory_limit_raises_out_of_memory() {
        let mut gl = SoftGl::new_offscreen();
        gl.set_memory_limit(Some(64));
        let buffer = gl.gen_buffer();
        gl.bind_buffer(GL_ARRAY_BUFFER, buffer);
        gl.buffer_data(GL_ARRAY_BUFFER, &[0; 64], GL_STATIC_DRAW);
        assert_eq!(gl.get_error(), GL_NO_ERROR);
        gl.buffer_data(GL_ARRAY_BUFFER, &[0; 65], GL_STATIC_DRAW);
        assert_eq!(gl.get_error(), GL_OUT_OF_MEMORY);
        assert_eq!(gl.buffer_contents(buffer).map(|d| d.len()), Some(64));
    }

    #[test]
    fn shared_contexts_share_objects_but_not_bindings() {
        let mut a = SoftGl::new_offscreen();
        let mut b = a.shared_context();
        let buffer = a.gen_buffer();
        a.bind_buffer(GL_ARRAY_BUFFER, buffer);
        assert_eq!(b.buffer_binding(GL_ARRAY_BUFFER), 0);
        b.bind_buffer(GL_ARRAY_BUFFER, buffer);
        b.buffer_data(GL_ARRAY_BUFFER, &[1, 2, 3], GL_STATIC_DRAW);
        assert_eq!(a.buffer_contents(buffer), Some(vec![1, 2, 3]));
        assert_eq!(b.get_error(), GL_NO_ERROR);
    }
}
