//! The graphics API the decoder drives.
//!
//! Calls map one-to-one onto GL entry points, with Rust slices in place of pointer/length pairs.
//! Arguments reaching this trait have already been validated by the decoder; implementations
//! still report their own failures (allocation, driver limits) through [`GlApi::get_error`].

use gles2_cmd::gl::*;

/// A handle owned by the backend. 0 names the default object.
pub type ServiceId = u32;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlCapabilities {
    pub max_vertex_attribs: u32,
    pub max_texture_units: u32,
    pub max_texture_size: u32,
    pub max_cube_map_texture_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_varying_vectors: u32,
    pub max_vertex_uniform_vectors: u32,
    pub max_fragment_uniform_vectors: u32,
    /// Desktop GL rather than GLES; affects attribute 0 handling.
    pub is_desktop_gl: bool,
    pub packed_depth_stencil: bool,
    pub npot_textures: bool,
}

impl Default for GlCapabilities {
    /// The minimums GLES 2.0 guarantees.
    fn default() -> Self {
        Self {
            max_vertex_attribs: 8,
            max_texture_units: 8,
            max_texture_size: 64,
            max_cube_map_texture_size: 16,
            max_renderbuffer_size: 1,
            max_varying_vectors: 8,
            max_vertex_uniform_vectors: 128,
            max_fragment_uniform_vectors: 16,
            is_desktop_gl: false,
            packed_depth_stencil: false,
            npot_textures: false,
        }
    }
}

/// One entry of a program's active attribute or uniform table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub size: GLint,
    pub ty: GLenum,
}

pub trait GlApi {
    // Context and surface.
    fn make_current(&mut self) -> bool;
    /// Makes the pristine default context current. Returns false when there is none.
    fn make_default_context_current(&mut self) -> bool;
    fn is_offscreen(&self) -> bool;
    fn surface_size(&self) -> Size;
    fn swap_buffers(&mut self);
    fn capabilities(&self) -> GlCapabilities;

    // Errors and queries.
    fn get_error(&mut self) -> GLenum;
    fn get_string(&mut self, name: GLenum) -> String;
    fn get_integerv(&mut self, pname: GLenum, params: &mut [GLint]);
    fn get_floatv(&mut self, pname: GLenum, params: &mut [GLfloat]);
    fn finish(&mut self);
    fn flush(&mut self);

    // Buffers.
    fn gen_buffer(&mut self) -> ServiceId;
    fn delete_buffer(&mut self, id: ServiceId);
    fn bind_buffer(&mut self, target: GLenum, id: ServiceId);
    fn buffer_data(&mut self, target: GLenum, data: &[u8], usage: GLenum);
    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]);

    // Textures.
    fn gen_texture(&mut self) -> ServiceId;
    fn delete_texture(&mut self, id: ServiceId);
    fn active_texture(&mut self, unit: GLenum);
    fn bind_texture(&mut self, target: GLenum, id: ServiceId);
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
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
    );
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
    );
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        xoffset: GLint,
        yoffset: GLint,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
    );
    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_parameterf(&mut self, target: GLenum, pname: GLenum, param: GLfloat);
    fn generate_mipmap(&mut self, target: GLenum);
    fn pixel_storei(&mut self, pname: GLenum, param: GLint);

    // Framebuffers and renderbuffers.
    fn gen_framebuffer(&mut self) -> ServiceId;
    fn delete_framebuffer(&mut self, id: ServiceId);
    fn bind_framebuffer(&mut self, target: GLenum, id: ServiceId);
    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        textarget: GLenum,
        texture: ServiceId,
        level: GLint,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        renderbuffer_target: GLenum,
        renderbuffer: ServiceId,
    );
    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum;
    fn get_framebuffer_attachment_parameteriv(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        pname: GLenum,
    ) -> GLint;
    fn gen_renderbuffer(&mut self) -> ServiceId;
    fn delete_renderbuffer(&mut self, id: ServiceId);
    fn bind_renderbuffer(&mut self, target: GLenum, id: ServiceId);
    fn renderbuffer_storage(
        &mut self,
        target: GLenum,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    );

    // Shaders and programs.
    fn create_shader(&mut self, ty: GLenum) -> ServiceId;
    fn delete_shader(&mut self, id: ServiceId);
    fn shader_source(&mut self, id: ServiceId, source: &str);
    fn compile_shader(&mut self, id: ServiceId);
    fn get_shaderiv(&mut self, id: ServiceId, pname: GLenum) -> GLint;
    fn get_shader_info_log(&mut self, id: ServiceId) -> String;
    fn create_program(&mut self) -> ServiceId;
    fn delete_program(&mut self, id: ServiceId);
    fn attach_shader(&mut self, program: ServiceId, shader: ServiceId);
    fn detach_shader(&mut self, program: ServiceId, shader: ServiceId);
    fn bind_attrib_location(&mut self, program: ServiceId, index: GLuint, name: &str);
    fn link_program(&mut self, program: ServiceId);
    fn validate_program(&mut self, program: ServiceId);
    fn get_programiv(&mut self, program: ServiceId, pname: GLenum) -> GLint;
    fn get_program_info_log(&mut self, program: ServiceId) -> String;
    fn get_active_attrib(&mut self, program: ServiceId, index: GLuint) -> Option<ActiveVariable>;
    fn get_active_uniform(&mut self, program: ServiceId, index: GLuint) -> Option<ActiveVariable>;
    fn get_attrib_location(&mut self, program: ServiceId, name: &str) -> GLint;
    fn get_uniform_location(&mut self, program: ServiceId, name: &str) -> GLint;
    fn use_program(&mut self, program: ServiceId);

    // Uniforms. `values.len()` is a multiple of `components`.
    fn uniform_iv(&mut self, location: GLint, components: usize, values: &[GLint]);
    fn uniform_fv(&mut self, location: GLint, components: usize, values: &[GLfloat]);
    fn uniform_matrix4fv(&mut self, location: GLint, transpose: bool, values: &[GLfloat]);

    // Vertex attributes.
    fn enable_vertex_attrib_array(&mut self, index: GLuint);
    fn disable_vertex_attrib_array(&mut self, index: GLuint);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: u32,
    );
    fn vertex_attrib_4f(&mut self, index: GLuint, value: [GLfloat; 4]);

    // Fixed-function state.
    fn enable(&mut self, cap: GLenum);
    fn disable(&mut self, cap: GLenum);
    fn clear_color(&mut self, rgba: [GLfloat; 4]);
    fn clear_depth(&mut self, depth: GLfloat);
    fn clear_stencil(&mut self, s: GLint);
    fn color_mask(&mut self, rgba: [bool; 4]);
    fn depth_mask(&mut self, flag: bool);
    fn stencil_mask_separate(&mut self, face: GLenum, mask: GLuint);
    fn clear(&mut self, mask: GLbitfield);
    fn viewport(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn scissor(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn blend_color(&mut self, rgba: [GLfloat; 4]);
    fn blend_equation(&mut self, mode: GLenum);
    fn blend_func(&mut self, sfactor: GLenum, dfactor: GLenum);
    fn cull_face(&mut self, mode: GLenum);
    fn depth_func(&mut self, func: GLenum);
    fn depth_range(&mut self, z_near: GLfloat, z_far: GLfloat);
    fn front_face(&mut self, mode: GLenum);
    fn hint(&mut self, target: GLenum, mode: GLenum);
    fn line_width(&mut self, width: GLfloat);
    fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat);
    fn sample_coverage(&mut self, value: GLfloat, invert: bool);
    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint);
    fn stencil_op(&mut self, fail: GLenum, zfail: GLenum, zpass: GLenum);

    // Drawing and readback.
    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei);
    fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, offset: u32);
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        dst: &mut [u8],
    );
}
