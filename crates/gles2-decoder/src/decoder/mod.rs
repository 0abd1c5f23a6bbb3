//! The GLES2 command decoder.
//!
//! [`GlesDecoder`] validates each command against its shadow state, translates client ids into
//! service ids and drives a [`GlApi`] backend. Validation failures that GL itself would report
//! are recorded as synthesized GL errors and surface through `GetError`; protocol violations
//! (bad arity, out-of-range shared memory, bad buckets) abort the command with a [`CmdError`].

mod attribs;
mod buffers;
mod dispatch;
mod draw;
mod framebuffers;
mod offscreen;
mod programs;
mod queries;
mod render_state;
mod shared_ids;
mod textures;

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use gles2_cmd::gl::*;
use gles2_cmd::{CmdStream, CmdWord, FIRST_GLES2_COMMAND};

use crate::common::CommonDecoder;
use crate::config::DecoderConfig;
use crate::context_group::ContextGroup;
use crate::error::{CmdError, DecodeResult, ErrorBits, GlError, InitError, StreamError};
use crate::gl_api::{GlApi, ServiceId, Size};
use crate::guards::copy_real_gl_errors;
use crate::resources::{service_id_of, Program, Resource, ResourceKind, ResourceTable, Shader};
use crate::shared_memory::CommandBufferEngine;
use crate::state::ContextState;
use crate::translator::ShaderTranslator;
use crate::validators::Validators;
use crate::vertex_attrib::VertexAttribManager;

pub use offscreen::OffscreenPhase;

use offscreen::OffscreenTarget;

/// What a child decoder needs from its parent: the parent's share group, where the child's
/// saved texture is registered.
#[derive(Debug)]
struct ParentShared {
    group: Rc<ContextGroup>,
}

/// Weak handle to a decoder, passed to [`GlesDecoder::initialize`] of its children. It stops
/// resolving once the parent is destroyed.
#[derive(Debug, Clone)]
pub struct ParentHandle(Weak<ParentShared>);

impl ParentHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// The child side of a parent link.
struct ParentLink {
    parent: Weak<ParentShared>,
    texture_id: u32,
}

/// Scratch buffer backing attribute 0 when the backend cannot draw with it disabled.
#[derive(Debug, Default)]
struct Attrib0Buffer {
    service_id: ServiceId,
    /// Allocated size in bytes.
    size: u32,
    /// Bytes at the front currently holding `value`.
    filled: u32,
    value: Option<[f32; 4]>,
}

pub struct GlesDecoder {
    gl: Box<dyn GlApi>,
    group: Rc<ContextGroup>,
    common: CommonDecoder,
    config: DecoderConfig,
    validators: Validators,
    state: ContextState,
    vertex_attribs: VertexAttribManager,
    error_bits: ErrorBits,
    last_error_message: Option<String>,
    translator: Option<Box<dyn ShaderTranslator>>,
    attrib0: Attrib0Buffer,
    black_texture_2d: ServiceId,
    black_texture_cube_map: ServiceId,
    offscreen: Option<OffscreenTarget>,
    parent: Option<ParentLink>,
    shared: Option<Rc<ParentShared>>,
    swap_callback: Option<Box<dyn FnMut()>>,
    initialized: bool,
}

impl GlesDecoder {
    pub fn new(
        gl: Box<dyn GlApi>,
        group: Rc<ContextGroup>,
        engine: Rc<dyn CommandBufferEngine>,
        config: DecoderConfig,
    ) -> Self {
        let validators = Validators::new(group.features());
        let state = ContextState::new(&group, validators.capability.values());
        let vertex_attribs = VertexAttribManager::new(group.limits().max_vertex_attribs);
        Self {
            shared: Some(Rc::new(ParentShared { group: group.clone() })),
            gl,
            group,
            common: CommonDecoder::new(engine),
            config,
            validators,
            state,
            vertex_attribs,
            error_bits: ErrorBits::empty(),
            last_error_message: None,
            translator: None,
            attrib0: Attrib0Buffer::default(),
            black_texture_2d: 0,
            black_texture_cube_map: 0,
            offscreen: None,
            parent: None,
            swap_callback: None,
            initialized: false,
        }
    }

    /// Prepares the decoder for commands: makes its context current, creates internal objects
    /// and, on an offscreen backend, allocates the offscreen target at `size`.
    ///
    /// With a `parent`, the offscreen target's saved color texture is registered in the parent's
    /// share group under `parent_texture_id`, so the parent can sample what this context swaps.
    pub fn initialize(
        &mut self,
        size: Size,
        parent: Option<&ParentHandle>,
        parent_texture_id: u32,
    ) -> Result<(), InitError> {
        if self.initialized {
            return Err(InitError::AlreadyInitialized);
        }
        if !self.gl.make_current() {
            return Err(InitError::MakeCurrentFailed);
        }
        let parent_shared = match parent {
            Some(handle) => {
                let shared = handle.0.upgrade().ok_or(InitError::ParentGone)?;
                if parent_texture_id == 0 || shared.group.textures.contains(parent_texture_id) {
                    return Err(InitError::ParentTextureIdInUse(parent_texture_id));
                }
                Some(shared)
            }
            None => None,
        };

        self.group.add_decoder();
        self.initialized = true;
        self.create_black_textures();

        if self.gl.is_offscreen() {
            let target = OffscreenTarget::create(&mut *self.gl, size);
            self.gl.bind_framebuffer(GL_FRAMEBUFFER, target.framebuffer());
            self.offscreen = Some(target);

            if let Some(shared) = parent_shared {
                self.register_with_parent(&shared, parent_texture_id);
            }

            if let Err(status) = self.update_offscreen_frame_buffer_size() {
                tracing::error!(status, "offscreen target is incomplete");
                self.destroy();
                return Err(InitError::OffscreenIncomplete(status));
            }
        } else if parent_shared.is_some() {
            tracing::warn!("ignoring parent link of an onscreen context");
        }

        tracing::debug!(
            width = size.width,
            height = size.height,
            offscreen = self.offscreen.is_some(),
            "decoder initialized"
        );
        Ok(())
    }

    /// Releases everything the decoder created. If the context cannot be made current the
    /// backend objects are abandoned. Safe to call more than once.
    pub fn destroy(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;
        let have_context = self.gl.make_current();

        if let Some(link) = self.parent.take() {
            match link.parent.upgrade() {
                Some(parent) => {
                    parent.group.textures.remove(link.texture_id);
                    parent.group.free_id(id_namespaces::TEXTURES, link.texture_id);
                }
                None => {
                    if let Some(target) = self.offscreen.as_mut() {
                        target.release_saved_texture();
                    }
                }
            }
        }

        if have_context {
            if let Some(target) = self.offscreen.take() {
                target.delete(&mut *self.gl);
            }
            for texture in [self.black_texture_2d, self.black_texture_cube_map] {
                if texture != 0 {
                    self.gl.delete_texture(texture);
                }
            }
            if self.attrib0.service_id != 0 {
                self.gl.delete_buffer(self.attrib0.service_id);
            }
        } else {
            tracing::warn!("destroying decoder without a current context");
            self.offscreen = None;
        }
        self.black_texture_2d = 0;
        self.black_texture_cube_map = 0;
        self.attrib0 = Attrib0Buffer::default();

        self.state.clear_bindings();
        self.vertex_attribs.clear_buffers();
        self.common.clear_buckets();
        self.shared = None;
        self.group.remove_decoder(&mut *self.gl);
    }

    pub fn make_current(&mut self) -> bool {
        self.gl.make_current()
    }

    /// A handle children can use to link to this decoder. Dead once this decoder is destroyed.
    pub fn parent_handle(&self) -> ParentHandle {
        ParentHandle(self.shared.as_ref().map_or_else(Weak::new, Rc::downgrade))
    }

    /// Invoked after every successful `SwapBuffers`.
    pub fn set_swap_buffers_callback(&mut self, callback: impl FnMut() + 'static) {
        self.swap_callback = Some(Box::new(callback));
    }

    pub fn set_shader_translator(&mut self, translator: impl ShaderTranslator + 'static) {
        self.translator = Some(Box::new(translator));
    }

    pub fn group(&self) -> &Rc<ContextGroup> {
        &self.group
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn vertex_attribs(&self) -> &VertexAttribManager {
        &self.vertex_attribs
    }

    pub fn common(&self) -> &CommonDecoder {
        &self.common
    }

    /// Synthesized errors not yet returned by `GetError`.
    pub fn pending_errors(&self) -> ErrorBits {
        self.error_bits
    }

    /// Message attached to the most recent synthesized error.
    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error_message.as_deref()
    }

    /// Executes one command. `args` must hold at least `arg_count` entries; the header itself is
    /// not included.
    pub fn decode_command(&mut self, opcode: u32, arg_count: u32, args: &[CmdWord]) -> DecodeResult {
        if opcode < FIRST_GLES2_COMMAND {
            return self.common.decode_common_command(opcode, arg_count, args);
        }
        let entry = dispatch::lookup(opcode).ok_or(CmdError::UnknownCommand(opcode))?;
        entry
            .info
            .immediate_data_size(arg_count)
            .ok_or(CmdError::InvalidArguments)?;
        let args = args.get(..arg_count as usize).ok_or(CmdError::OutOfBounds)?;
        let data: &[u8] = bytemuck::cast_slice(&args[entry.info.arg_count as usize..]);

        if self.config.debug {
            tracing::debug!(cmd = entry.name, arg_count, "decode");
        }
        let result = (entry.handler)(self, args, data);
        if self.config.debug {
            loop {
                let err = self.gl.get_error();
                if err == GL_NO_ERROR {
                    break;
                }
                tracing::warn!(cmd = entry.name, error = err, "backend raised a GL error");
                self.error_bits.record(err);
            }
        }
        if let Err(error) = result {
            tracing::debug!(cmd = entry.name, %error, "command failed");
        }
        result
    }

    /// Executes every command in `words`, stopping at the first failure. Returns the number of
    /// commands executed.
    pub fn decode_stream(&mut self, words: &[CmdWord]) -> Result<usize, StreamError> {
        let mut executed = 0;
        for packet in CmdStream::new(words) {
            let packet = packet?;
            let header = packet.header;
            self.decode_command(header.command, header.arg_count(), packet.args)
                .map_err(|error| StreamError::Command {
                    opcode: header.command,
                    at_word: packet.at_word,
                    error,
                })?;
            executed += 1;
        }
        Ok(executed)
    }

    fn set_gl_error(&mut self, error: GlError, message: impl Into<String>) {
        let message = message.into();
        if self.config.log_synthesized_gl_errors {
            tracing::warn!(error = ?error, %message, "synthesized GL error");
        } else {
            tracing::debug!(error = ?error, %message, "synthesized GL error");
        }
        self.error_bits.insert(error.bit());
        self.last_error_message = Some(message);
    }

    fn copy_real_gl_errors(&mut self) {
        copy_real_gl_errors(&mut *self.gl, &mut self.error_bits);
    }

    /// Drains backend errors raised by the previous call into the shadow bits. Returns the first
    /// one, or `GL_NO_ERROR`.
    fn peek_gl_error(&mut self) -> GLenum {
        let first = self.gl.get_error();
        if first != GL_NO_ERROR {
            self.error_bits.record(first);
            self.copy_real_gl_errors();
        }
        first
    }

    /// Looks up a program, reporting a shader id as `GL_INVALID_OPERATION` and anything else as
    /// `GL_INVALID_VALUE`.
    fn program_not_shader(&mut self, client_id: u32, op: &str) -> Option<Rc<Program>> {
        if let Some(program) = self.group.programs.get(client_id) {
            return Some(program);
        }
        if self.group.shaders.contains(client_id) {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: shader passed for program"));
        } else {
            self.set_gl_error(GlError::InvalidValue, format!("{op}: unknown program"));
        }
        None
    }

    fn shader_not_program(&mut self, client_id: u32, op: &str) -> Option<Rc<Shader>> {
        if let Some(shader) = self.group.shaders.get(client_id) {
            return Some(shader);
        }
        if self.group.programs.contains(client_id) {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: program passed for shader"));
        } else {
            self.set_gl_error(GlError::InvalidValue, format!("{op}: unknown shader"));
        }
        None
    }

    /// The current program, unless there is none or it has been deleted.
    fn current_program(&self) -> Option<Rc<Program>> {
        self.state
            .current_program
            .as_ref()
            .filter(|p| !p.is_deleted())
            .cloned()
    }

    /// The service id that client framebuffer 0 refers to.
    fn default_framebuffer(&self) -> ServiceId {
        self.offscreen.as_ref().map_or(0, OffscreenTarget::framebuffer)
    }

    /// The service id of the framebuffer the client currently has bound.
    fn bound_framebuffer_service_id(&self) -> ServiceId {
        match self.state.bound_framebuffer.as_ref().filter(|fb| !fb.is_deleted()) {
            Some(fb) => fb.service_id(),
            None => self.default_framebuffer(),
        }
    }

    /// Service id bound to `GL_TEXTURE_2D` on unit 0, as the client left it.
    fn unit0_texture_2d(&self) -> ServiceId {
        service_id_of(self.state.texture_units.first().and_then(|u| u.bound_texture_2d.as_ref()))
    }

    /// Fails with `GL_INVALID_FRAMEBUFFER_OPERATION` when a client framebuffer is bound and
    /// incomplete.
    fn check_framebuffer_complete(&mut self, op: &str) -> bool {
        if self.state.bound_framebuffer.as_ref().is_some_and(|fb| !fb.is_deleted())
            && self.gl.check_framebuffer_status(GL_FRAMEBUFFER) != GL_FRAMEBUFFER_COMPLETE
        {
            self.set_gl_error(
                GlError::InvalidFramebufferOperation,
                format!("{op}: framebuffer incomplete"),
            );
            return false;
        }
        true
    }

    /// Size of whatever reads and copies currently source from.
    fn read_framebuffer_size(&self) -> (u32, u32) {
        if let Some(fb) = self.state.bound_framebuffer.as_ref().filter(|fb| !fb.is_deleted()) {
            return fb.state().color_size().unwrap_or((0, 0));
        }
        match &self.offscreen {
            Some(target) => {
                let size = target.allocated_size();
                (size.width, size.height)
            }
            None => {
                let size = self.gl.surface_size();
                (size.width, size.height)
            }
        }
    }

    fn create_black_textures(&mut self) {
        const BLACK: [u8; 4] = [0, 0, 0, 255];
        let unit0 = self.unit0_texture_2d();
        let tex_2d = self.gl.gen_texture();
        let tex_cube = self.gl.gen_texture();

        self.gl.active_texture(GL_TEXTURE0);
        self.gl.bind_texture(GL_TEXTURE_2D, tex_2d);
        self.gl
            .tex_image_2d(GL_TEXTURE_2D, 0, GL_RGBA, 1, 1, GL_RGBA, GL_UNSIGNED_BYTE, &BLACK);
        self.gl.bind_texture(GL_TEXTURE_2D, unit0);

        let unit0_cube = service_id_of(
            self.state
                .texture_units
                .first()
                .and_then(|u| u.bound_texture_cube_map.as_ref()),
        );
        self.gl.bind_texture(GL_TEXTURE_CUBE_MAP, tex_cube);
        for face in CUBE_MAP_FACES {
            self.gl
                .tex_image_2d(face, 0, GL_RGBA, 1, 1, GL_RGBA, GL_UNSIGNED_BYTE, &BLACK);
        }
        self.gl.bind_texture(GL_TEXTURE_CUBE_MAP, unit0_cube);
        self.gl
            .active_texture(GL_TEXTURE0 + self.state.active_texture_unit as u32);

        self.black_texture_2d = tex_2d;
        self.black_texture_cube_map = tex_cube;
    }
}

impl Drop for GlesDecoder {
    fn drop(&mut self) {
        self.destroy();
    }
}

const CUBE_MAP_FACES: [GLenum; 6] = [
    GL_TEXTURE_CUBE_MAP_POSITIVE_X,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_X,
    GL_TEXTURE_CUBE_MAP_POSITIVE_Y,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_Y,
    GL_TEXTURE_CUBE_MAP_POSITIVE_Z,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_Z,
];

/// Reads `n` 4-byte values from immediate data. `None` when `n` is negative or the
/// data is too short.
fn immediate_values<T: bytemuck::Pod>(data: &[u8], n: i64) -> Option<Vec<T>> {
    let n = usize::try_from(n).ok()?;
    let bytes = data.get(..n.checked_mul(4)?)?;
    Some(
        bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect(),
    )
}

/// Reads a client string from `len` leading bytes of immediate data.
fn immediate_string(data: &[u8], len: u32) -> Result<String, CmdError> {
    let bytes = data.get(..len as usize).ok_or(CmdError::OutOfBounds)?;
    Ok(client_string(bytes))
}

/// Client strings are arbitrary bytes; stop at the first NUL and replace invalid UTF-8.
fn client_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl GlesDecoder {
    /// Registers the client ids of a `Gen*` command. An id that is 0, repeated or already in use
    /// fails the whole command before anything is created.
    fn gen_objects<T: ResourceKind>(
        &mut self,
        table: fn(&ContextGroup) -> &ResourceTable<T>,
        namespace: u32,
        ids: &[u32],
        gen: fn(&mut dyn GlApi) -> ServiceId,
    ) -> DecodeResult {
        let group = self.group.clone();
        let mut seen = HashSet::with_capacity(ids.len());
        if ids
            .iter()
            .any(|&id| id == 0 || !seen.insert(id) || table(&group).contains(id))
        {
            return Err(CmdError::InvalidArguments);
        }
        for &id in ids {
            let service_id = gen(&mut *self.gl);
            if table(&group).create(id, service_id).is_none() {
                T::delete_service_object(&mut *self.gl, service_id);
                return Err(CmdError::InvalidArguments);
            }
            group.mark_id_used(namespace, id);
        }
        Ok(())
    }

    /// Deletes the named objects, skipping unknown ids. Returns the removed objects so callers
    /// can drop bindings to them.
    fn delete_objects<T: ResourceKind>(
        &mut self,
        table: fn(&ContextGroup) -> &ResourceTable<T>,
        namespace: u32,
        ids: &[u32],
    ) -> Vec<Rc<Resource<T>>> {
        let group = self.group.clone();
        let mut removed = Vec::new();
        for &id in ids.iter().filter(|&&id| id != 0) {
            if let Some(resource) = table(&group).remove(id) {
                group.free_id(namespace, id);
                T::delete_service_object(&mut *self.gl, resource.service_id());
                removed.push(resource);
            }
        }
        removed
    }

    /// Ids of a `Gen*`/`Delete*` command, from shared memory.
    fn shared_ids(&self, n: GLsizei, shm_id: u32, shm_offset: u32) -> Result<Vec<u32>, CmdError> {
        self.common.read_ids(shm_id, shm_offset, n)
    }

    /// Ids of an immediate `Gen*`/`Delete*` command.
    fn immediate_ids(n: GLsizei, data: &[u8]) -> Result<Vec<u32>, CmdError> {
        immediate_values(data, i64::from(n)).ok_or(CmdError::OutOfBounds)
    }

    fn write_result(&self, shm_id: u32, shm_offset: u32, value: u32) -> DecodeResult {
        self.common.write_shared(shm_id, shm_offset, &value)
    }
}
