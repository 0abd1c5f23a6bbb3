//! Size and enum helpers shared by client and service.

use crate::gl::*;

/// Size in bytes of one component of `ty` as used by vertex attributes, index buffers and
/// pixel transfers. Unknown types report 0.
pub fn gl_type_size(ty: GLenum) -> u32 {
    match ty {
        GL_BYTE | GL_UNSIGNED_BYTE => 1,
        GL_SHORT | GL_UNSIGNED_SHORT => 2,
        GL_INT | GL_UNSIGNED_INT | GL_FLOAT | GL_FIXED => 4,
        GL_UNSIGNED_SHORT_5_6_5 | GL_UNSIGNED_SHORT_4_4_4_4 | GL_UNSIGNED_SHORT_5_5_5_1 => 2,
        _ => 0,
    }
}

/// Element size of an index buffer type, or `None` for types `DrawElements` does not accept.
pub fn index_type_size(ty: GLenum) -> Option<u32> {
    match ty {
        GL_UNSIGNED_BYTE => Some(1),
        GL_UNSIGNED_SHORT => Some(2),
        _ => None,
    }
}

pub fn components_per_format(format: GLenum) -> u32 {
    match format {
        GL_ALPHA | GL_LUMINANCE | GL_DEPTH_COMPONENT => 1,
        GL_LUMINANCE_ALPHA => 2,
        GL_RGB => 3,
        GL_RGBA => 4,
        _ => 0,
    }
}

/// Bytes per pixel of `format`/`ty`. Packed types store a whole pixel in one component.
pub fn compute_image_group_size(format: GLenum, ty: GLenum) -> u32 {
    match ty {
        GL_UNSIGNED_SHORT_5_6_5 | GL_UNSIGNED_SHORT_4_4_4_4 | GL_UNSIGNED_SHORT_5_5_5_1 => 2,
        _ => gl_type_size(ty) * components_per_format(format),
    }
}

/// Bytes needed to transfer a `width` x `height` image where every row but the last is padded
/// to `alignment`. Returns `None` on arithmetic overflow.
pub fn compute_image_data_size(
    width: u32,
    height: u32,
    format: GLenum,
    ty: GLenum,
    alignment: u32,
) -> Option<u32> {
    let row_size = width.checked_mul(compute_image_group_size(format, ty))?;
    if height <= 1 {
        return height.checked_mul(row_size);
    }
    let alignment = alignment.max(1);
    let padded_row_size = row_size.checked_add(alignment - 1)? / alignment * alignment;
    (height - 1)
        .checked_mul(padded_row_size)?
        .checked_add(row_size)
}

/// Number of values `glGet*v` writes for `pname`. Unknown names report 0.
pub fn num_values_returned_for_get(pname: GLenum) -> u32 {
    match pname {
        GL_COLOR_CLEAR_VALUE | GL_COLOR_WRITEMASK | GL_BLEND_COLOR | GL_VIEWPORT | GL_SCISSOR_BOX => 4,
        GL_DEPTH_RANGE | GL_MAX_VIEWPORT_DIMS => 2,
        GL_ACTIVE_TEXTURE
        | GL_ALPHA_BITS
        | GL_ARRAY_BUFFER_BINDING
        | GL_BLEND
        | GL_BLEND_DST_ALPHA
        | GL_BLEND_DST_RGB
        | GL_BLEND_EQUATION_ALPHA
        | GL_BLEND_EQUATION_RGB
        | GL_BLEND_SRC_ALPHA
        | GL_BLEND_SRC_RGB
        | GL_BLUE_BITS
        | GL_CULL_FACE
        | GL_CULL_FACE_MODE
        | GL_CURRENT_PROGRAM
        | GL_DEPTH_BITS
        | GL_DEPTH_CLEAR_VALUE
        | GL_DEPTH_FUNC
        | GL_DEPTH_TEST
        | GL_DEPTH_WRITEMASK
        | GL_DITHER
        | GL_ELEMENT_ARRAY_BUFFER_BINDING
        | GL_FRAMEBUFFER_BINDING
        | GL_FRONT_FACE
        | GL_GENERATE_MIPMAP_HINT
        | GL_GREEN_BITS
        | GL_IMPLEMENTATION_COLOR_READ_FORMAT
        | GL_IMPLEMENTATION_COLOR_READ_TYPE
        | GL_LINE_WIDTH
        | GL_MAX_COMBINED_TEXTURE_IMAGE_UNITS
        | GL_MAX_CUBE_MAP_TEXTURE_SIZE
        | GL_MAX_FRAGMENT_UNIFORM_VECTORS
        | GL_MAX_RENDERBUFFER_SIZE
        | GL_MAX_TEXTURE_IMAGE_UNITS
        | GL_MAX_TEXTURE_SIZE
        | GL_MAX_VARYING_VECTORS
        | GL_MAX_VERTEX_ATTRIBS
        | GL_MAX_VERTEX_TEXTURE_IMAGE_UNITS
        | GL_MAX_VERTEX_UNIFORM_VECTORS
        | GL_NUM_COMPRESSED_TEXTURE_FORMATS
        | GL_NUM_SHADER_BINARY_FORMATS
        | GL_PACK_ALIGNMENT
        | GL_POLYGON_OFFSET_FACTOR
        | GL_POLYGON_OFFSET_FILL
        | GL_POLYGON_OFFSET_UNITS
        | GL_RED_BITS
        | GL_RENDERBUFFER_BINDING
        | GL_SAMPLE_ALPHA_TO_COVERAGE
        | GL_SAMPLE_BUFFERS
        | GL_SAMPLE_COVERAGE
        | GL_SAMPLE_COVERAGE_INVERT
        | GL_SAMPLE_COVERAGE_VALUE
        | GL_SAMPLES
        | GL_SCISSOR_TEST
        | GL_SHADER_COMPILER
        | GL_STENCIL_BACK_WRITEMASK
        | GL_STENCIL_BITS
        | GL_STENCIL_CLEAR_VALUE
        | GL_STENCIL_FAIL
        | GL_STENCIL_FUNC
        | GL_STENCIL_PASS_DEPTH_FAIL
        | GL_STENCIL_PASS_DEPTH_PASS
        | GL_STENCIL_REF
        | GL_STENCIL_TEST
        | GL_STENCIL_VALUE_MASK
        | GL_STENCIL_WRITEMASK
        | GL_SUBPIXEL_BITS
        | GL_TEXTURE_BINDING_2D
        | GL_TEXTURE_BINDING_CUBE_MAP
        | GL_UNPACK_ALIGNMENT => 1,
        _ => 0,
    }
}

pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Number of mip levels a texture of `size` texels can have.
pub fn max_levels_for_size(size: u32) -> u32 {
    32 - size.max(1).leading_zeros()
}

/// Maps a cube face index (0..6) to its `GL_TEXTURE_CUBE_MAP_*` target.
pub fn cube_face_target(face: usize) -> GLenum {
    GL_TEXTURE_CUBE_MAP_POSITIVE_X + face as GLenum
}

/// Maps a face or 2D target to its slot in a texture's level table.
pub fn face_index(target: GLenum) -> Option<usize> {
    match target {
        GL_TEXTURE_2D => Some(0),
        GL_TEXTURE_CUBE_MAP_POSITIVE_X..=GL_TEXTURE_CUBE_MAP_NEGATIVE_Z => {
            Some((target - GL_TEXTURE_CUBE_MAP_POSITIVE_X) as usize)
        }
        _ => None,
    }
}

/// Bind target of a texture target (faces bind as the cube map).
pub fn bind_target_for_texture_target(target: GLenum) -> GLenum {
    if target == GL_TEXTURE_2D {
        GL_TEXTURE_2D
    } else {
        GL_TEXTURE_CUBE_MAP
    }
}

/// Bind target sampled by a sampler uniform type.
pub fn bind_target_for_sampler_type(ty: GLenum) -> Option<GLenum> {
    match ty {
        GL_SAMPLER_2D => Some(GL_TEXTURE_2D),
        GL_SAMPLER_CUBE => Some(GL_TEXTURE_CUBE_MAP),
        _ => None,
    }
}
