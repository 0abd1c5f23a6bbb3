//! Enum membership checks applied to command arguments before they reach the backend.

use gles2_cmd::gl::*;

use crate::config::FeatureInfo;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueValidator<T> {
    valid: Vec<T>,
}

impl<T: Copy + PartialEq> ValueValidator<T> {
    pub fn new(values: &[T]) -> Self {
        Self {
            valid: values.to_vec(),
        }
    }

    pub fn add_value(&mut self, value: T) {
        if !self.valid.contains(&value) {
            self.valid.push(value);
        }
    }

    pub fn is_valid(&self, value: T) -> bool {
        self.valid.contains(&value)
    }

    pub fn values(&self) -> &[T] {
        &self.valid
    }
}

const CUBE_FACES: [GLenum; 6] = [
    GL_TEXTURE_CUBE_MAP_POSITIVE_X,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_X,
    GL_TEXTURE_CUBE_MAP_POSITIVE_Y,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_Y,
    GL_TEXTURE_CUBE_MAP_POSITIVE_Z,
    GL_TEXTURE_CUBE_MAP_NEGATIVE_Z,
];

const BLEND_FACTORS: [GLenum; 14] = [
    GL_ZERO,
    GL_ONE,
    GL_SRC_COLOR,
    GL_ONE_MINUS_SRC_COLOR,
    GL_DST_COLOR,
    GL_ONE_MINUS_DST_COLOR,
    GL_SRC_ALPHA,
    GL_ONE_MINUS_SRC_ALPHA,
    GL_DST_ALPHA,
    GL_ONE_MINUS_DST_ALPHA,
    GL_CONSTANT_COLOR,
    GL_ONE_MINUS_CONSTANT_COLOR,
    GL_CONSTANT_ALPHA,
    GL_ONE_MINUS_CONSTANT_ALPHA,
];

/// One validator per kind of enum argument.
#[derive(Debug, Clone)]
pub struct Validators {
    pub attachment: ValueValidator<GLenum>,
    pub buffer_parameter: ValueValidator<GLenum>,
    pub buffer_target: ValueValidator<GLenum>,
    pub buffer_usage: ValueValidator<GLenum>,
    pub capability: ValueValidator<GLenum>,
    pub cmp_function: ValueValidator<GLenum>,
    pub draw_mode: ValueValidator<GLenum>,
    pub dst_blend_factor: ValueValidator<GLenum>,
    pub equation: ValueValidator<GLenum>,
    pub face_mode: ValueValidator<GLenum>,
    pub face_type: ValueValidator<GLenum>,
    pub frame_buffer_parameter: ValueValidator<GLenum>,
    pub frame_buffer_target: ValueValidator<GLenum>,
    pub hint_mode: ValueValidator<GLenum>,
    pub hint_target: ValueValidator<GLenum>,
    pub index_type: ValueValidator<GLenum>,
    pub pixel_store: ValueValidator<GLenum>,
    pub pixel_store_alignment: ValueValidator<GLint>,
    pub pixel_type: ValueValidator<GLenum>,
    pub program_parameter: ValueValidator<GLenum>,
    pub read_pixel_format: ValueValidator<GLenum>,
    pub render_buffer_format: ValueValidator<GLenum>,
    pub render_buffer_parameter: ValueValidator<GLenum>,
    pub render_buffer_target: ValueValidator<GLenum>,
    pub shader_parameter: ValueValidator<GLenum>,
    pub shader_type: ValueValidator<GLenum>,
    pub src_blend_factor: ValueValidator<GLenum>,
    pub stencil_op: ValueValidator<GLenum>,
    pub string_type: ValueValidator<GLenum>,
    pub texture_bind_target: ValueValidator<GLenum>,
    pub texture_format: ValueValidator<GLenum>,
    pub texture_internal_format: ValueValidator<GLenum>,
    pub texture_level_parameter: ValueValidator<GLenum>,
    pub texture_mag_filter_mode: ValueValidator<GLenum>,
    pub texture_min_filter_mode: ValueValidator<GLenum>,
    pub texture_parameter: ValueValidator<GLenum>,
    pub texture_target: ValueValidator<GLenum>,
    pub texture_wrap_mode: ValueValidator<GLenum>,
    pub vertex_attrib_type: ValueValidator<GLenum>,
    pub vertex_attribute: ValueValidator<GLenum>,
    pub vertex_pointer: ValueValidator<GLenum>,
}

impl Validators {
    pub fn new(features: &FeatureInfo) -> Self {
        let mut texture_target = ValueValidator::new(&[GL_TEXTURE_2D]);
        for face in CUBE_FACES {
            texture_target.add_value(face);
        }

        let mut render_buffer_format = ValueValidator::new(&[
            GL_RGBA4,
            GL_RGB565,
            GL_RGB5_A1,
            GL_DEPTH_COMPONENT16,
            GL_STENCIL_INDEX8,
        ]);
        if features.packed_depth_stencil {
            render_buffer_format.add_value(GL_DEPTH24_STENCIL8);
        }

        let mut src_blend_factor = ValueValidator::new(&BLEND_FACTORS);
        src_blend_factor.add_value(GL_SRC_ALPHA_SATURATE);

        let formats = [GL_ALPHA, GL_LUMINANCE, GL_LUMINANCE_ALPHA, GL_RGB, GL_RGBA];

        Self {
            attachment: ValueValidator::new(&[
                GL_COLOR_ATTACHMENT0,
                GL_DEPTH_ATTACHMENT,
                GL_STENCIL_ATTACHMENT,
            ]),
            buffer_parameter: ValueValidator::new(&[GL_BUFFER_SIZE, GL_BUFFER_USAGE]),
            buffer_target: ValueValidator::new(&[GL_ARRAY_BUFFER, GL_ELEMENT_ARRAY_BUFFER]),
            buffer_usage: ValueValidator::new(&[GL_STREAM_DRAW, GL_STATIC_DRAW, GL_DYNAMIC_DRAW]),
            capability: ValueValidator::new(&[
                GL_BLEND,
                GL_CULL_FACE,
                GL_DEPTH_TEST,
                GL_DITHER,
                GL_POLYGON_OFFSET_FILL,
                GL_SAMPLE_ALPHA_TO_COVERAGE,
                GL_SAMPLE_COVERAGE,
                GL_SCISSOR_TEST,
                GL_STENCIL_TEST,
            ]),
            cmp_function: ValueValidator::new(&[
                GL_NEVER,
                GL_LESS,
                GL_EQUAL,
                GL_LEQUAL,
                GL_GREATER,
                GL_NOTEQUAL,
                GL_GEQUAL,
                GL_ALWAYS,
            ]),
            draw_mode: ValueValidator::new(&[
                GL_POINTS,
                GL_LINE_STRIP,
                GL_LINE_LOOP,
                GL_LINES,
                GL_TRIANGLE_STRIP,
                GL_TRIANGLE_FAN,
                GL_TRIANGLES,
            ]),
            dst_blend_factor: ValueValidator::new(&BLEND_FACTORS),
            equation: ValueValidator::new(&[GL_FUNC_ADD, GL_FUNC_SUBTRACT, GL_FUNC_REVERSE_SUBTRACT]),
            face_mode: ValueValidator::new(&[GL_CW, GL_CCW]),
            face_type: ValueValidator::new(&[GL_FRONT, GL_BACK, GL_FRONT_AND_BACK]),
            frame_buffer_parameter: ValueValidator::new(&[
                GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE,
                GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME,
                GL_FRAMEBUFFER_ATTACHMENT_TEXTURE_LEVEL,
                GL_FRAMEBUFFER_ATTACHMENT_TEXTURE_CUBE_MAP_FACE,
            ]),
            frame_buffer_target: ValueValidator::new(&[GL_FRAMEBUFFER]),
            hint_mode: ValueValidator::new(&[GL_FASTEST, GL_NICEST, GL_DONT_CARE]),
            hint_target: ValueValidator::new(&[GL_GENERATE_MIPMAP_HINT]),
            index_type: ValueValidator::new(&[GL_UNSIGNED_BYTE, GL_UNSIGNED_SHORT]),
            pixel_store: ValueValidator::new(&[GL_PACK_ALIGNMENT, GL_UNPACK_ALIGNMENT]),
            pixel_store_alignment: ValueValidator::new(&[1, 2, 4, 8]),
            pixel_type: ValueValidator::new(&[
                GL_UNSIGNED_BYTE,
                GL_UNSIGNED_SHORT_5_6_5,
                GL_UNSIGNED_SHORT_4_4_4_4,
                GL_UNSIGNED_SHORT_5_5_5_1,
            ]),
            program_parameter: ValueValidator::new(&[
                GL_DELETE_STATUS,
                GL_LINK_STATUS,
                GL_VALIDATE_STATUS,
                GL_INFO_LOG_LENGTH,
                GL_ATTACHED_SHADERS,
                GL_ACTIVE_ATTRIBUTES,
                GL_ACTIVE_ATTRIBUTE_MAX_LENGTH,
                GL_ACTIVE_UNIFORMS,
                GL_ACTIVE_UNIFORM_MAX_LENGTH,
            ]),
            read_pixel_format: ValueValidator::new(&[GL_ALPHA, GL_RGB, GL_RGBA]),
            render_buffer_format,
            render_buffer_parameter: ValueValidator::new(&[
                GL_RENDERBUFFER_WIDTH,
                GL_RENDERBUFFER_HEIGHT,
                GL_RENDERBUFFER_INTERNAL_FORMAT,
            ]),
            render_buffer_target: ValueValidator::new(&[GL_RENDERBUFFER]),
            shader_parameter: ValueValidator::new(&[
                GL_SHADER_TYPE,
                GL_DELETE_STATUS,
                GL_COMPILE_STATUS,
                GL_INFO_LOG_LENGTH,
                GL_SHADER_SOURCE_LENGTH,
            ]),
            shader_type: ValueValidator::new(&[GL_VERTEX_SHADER, GL_FRAGMENT_SHADER]),
            src_blend_factor,
            stencil_op: ValueValidator::new(&[
                GL_KEEP,
                GL_ZERO,
                GL_REPLACE,
                GL_INCR,
                GL_INCR_WRAP,
                GL_DECR,
                GL_DECR_WRAP,
                GL_INVERT,
            ]),
            string_type: ValueValidator::new(&[
                GL_VENDOR,
                GL_RENDERER,
                GL_VERSION,
                GL_SHADING_LANGUAGE_VERSION,
                GL_EXTENSIONS,
            ]),
            texture_bind_target: ValueValidator::new(&[GL_TEXTURE_2D, GL_TEXTURE_CUBE_MAP]),
            texture_format: ValueValidator::new(&formats),
            texture_internal_format: ValueValidator::new(&formats),
            texture_level_parameter: ValueValidator::new(&[
                GL_TEXTURE_WIDTH,
                GL_TEXTURE_HEIGHT,
                GL_TEXTURE_INTERNAL_FORMAT,
            ]),
            texture_mag_filter_mode: ValueValidator::new(&[GL_NEAREST, GL_LINEAR]),
            texture_min_filter_mode: ValueValidator::new(&[
                GL_NEAREST,
                GL_LINEAR,
                GL_NEAREST_MIPMAP_NEAREST,
                GL_LINEAR_MIPMAP_NEAREST,
                GL_NEAREST_MIPMAP_LINEAR,
                GL_LINEAR_MIPMAP_LINEAR,
            ]),
            texture_parameter: ValueValidator::new(&[
                GL_TEXTURE_MAG_FILTER,
                GL_TEXTURE_MIN_FILTER,
                GL_TEXTURE_WRAP_S,
                GL_TEXTURE_WRAP_T,
            ]),
            texture_target,
            texture_wrap_mode: ValueValidator::new(&[GL_CLAMP_TO_EDGE, GL_MIRRORED_REPEAT, GL_REPEAT]),
            vertex_attrib_type: ValueValidator::new(&[
                GL_BYTE,
                GL_UNSIGNED_BYTE,
                GL_SHORT,
                GL_UNSIGNED_SHORT,
                GL_FLOAT,
                GL_FIXED,
            ]),
            vertex_attribute: ValueValidator::new(&[
                GL_VERTEX_ATTRIB_ARRAY_BUFFER_BINDING,
                GL_VERTEX_ATTRIB_ARRAY_ENABLED,
                GL_VERTEX_ATTRIB_ARRAY_SIZE,
                GL_VERTEX_ATTRIB_ARRAY_STRIDE,
                GL_VERTEX_ATTRIB_ARRAY_TYPE,
                GL_VERTEX_ATTRIB_ARRAY_NORMALIZED,
                GL_CURRENT_VERTEX_ATTRIB,
            ]),
            vertex_pointer: ValueValidator::new(&[GL_VERTEX_ATTRIB_ARRAY_POINTER]),
        }
    }

    /// Whether `format`/`ty` is a legal pixel transfer combination.
    pub fn format_type_combination_valid(format: GLenum, ty: GLenum) -> bool {
        match ty {
            GL_UNSIGNED_SHORT_5_6_5 => format == GL_RGB,
            GL_UNSIGNED_SHORT_4_4_4_4 | GL_UNSIGNED_SHORT_5_5_5_1 => format == GL_RGBA,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl_api::GlCapabilities;

    #[test]
    fn packed_depth_stencil_extends_renderbuffer_formats() {
        let plain = Validators::new(&FeatureInfo::from_capabilities(&GlCapabilities::default()));
        assert!(!plain.render_buffer_format.is_valid(GL_DEPTH24_STENCIL8));

        let caps = GlCapabilities {
            packed_depth_stencil: true,
            ..GlCapabilities::default()
        };
        let packed = Validators::new(&FeatureInfo::from_capabilities(&caps));
        assert!(packed.render_buffer_format.is_valid(GL_DEPTH24_STENCIL8));
        assert!(packed.render_buffer_format.is_valid(GL_RGBA4));
    }

    #[test]
    fn texture_targets_include_cube_faces_only_for_images() {
        let v = Validators::new(&FeatureInfo::from_capabilities(&GlCapabilities::default()));
        assert!(v.texture_target.is_valid(GL_TEXTURE_CUBE_MAP_NEGATIVE_Y));
        assert!(!v.texture_target.is_valid(GL_TEXTURE_CUBE_MAP));
        assert!(v.texture_bind_target.is_valid(GL_TEXTURE_CUBE_MAP));
        assert!(!v.texture_bind_target.is_valid(GL_TEXTURE_CUBE_MAP_POSITIVE_X));
    }

    #[test]
    fn saturate_is_source_only() {
        let v = Validators::new(&FeatureInfo::from_capabilities(&GlCapabilities::default()));
        assert!(v.src_blend_factor.is_valid(GL_SRC_ALPHA_SATURATE));
        assert!(!v.dst_blend_factor.is_valid(GL_SRC_ALPHA_SATURATE));
        assert!(Validators::format_type_combination_valid(GL_RGB, GL_UNSIGNED_SHORT_5_6_5));
        assert!(!Validators::format_type_combination_valid(GL_RGBA, GL_UNSIGNED_SHORT_5_6_5));
    }
}
