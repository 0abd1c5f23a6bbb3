//! Opcode to handler table.

use std::sync::OnceLock;

use gles2_cmd::gles2::*;
use gles2_cmd::{CmdWord, Command, CommandInfo, FIRST_GLES2_COMMAND};

use super::GlesDecoder;
use crate::error::{CmdError, DecodeResult};

type Handler = Box<dyn Fn(&mut GlesDecoder, &[CmdWord], &[u8]) -> DecodeResult + Send + Sync>;

pub(super) struct DispatchEntry {
    pub name: &'static str,
    pub info: CommandInfo,
    /// Called with exactly `arg_count` argument entries and the immediate data bytes.
    pub handler: Handler,
}

pub(super) fn lookup(opcode: u32) -> Option<&'static DispatchEntry> {
    let index = opcode.checked_sub(FIRST_GLES2_COMMAND)?;
    table().get(index as usize)?.as_ref()
}

fn table() -> &'static [Option<DispatchEntry>] {
    static TABLE: OnceLock<Vec<Option<DispatchEntry>>> = OnceLock::new();
    TABLE.get_or_init(build)
}

fn entry<C: Command>(
    handler: fn(&mut GlesDecoder, &C, &[u8]) -> DecodeResult,
) -> (u32, DispatchEntry) {
    let entry = DispatchEntry {
        name: C::NAME,
        info: C::info(),
        handler: Box::new(move |decoder: &mut GlesDecoder, args: &[CmdWord], data: &[u8]| {
            let cmd = C::from_args(args).ok_or(CmdError::OutOfBounds)?;
            handler(decoder, &cmd, data)
        }),
    };
    (C::OPCODE, entry)
}

fn build() -> Vec<Option<DispatchEntry>> {
    let entries = vec![
        entry::<ActiveTexture>(GlesDecoder::handle_active_texture),
        entry::<AttachShader>(GlesDecoder::handle_attach_shader),
        entry::<BindAttribLocationImmediate>(GlesDecoder::handle_bind_attrib_location_immediate),
        entry::<BindAttribLocationBucket>(GlesDecoder::handle_bind_attrib_location_bucket),
        entry::<BindBuffer>(GlesDecoder::handle_bind_buffer),
        entry::<BindFramebuffer>(GlesDecoder::handle_bind_framebuffer),
        entry::<BindRenderbuffer>(GlesDecoder::handle_bind_renderbuffer),
        entry::<BindTexture>(GlesDecoder::handle_bind_texture),
        entry::<BlendColor>(GlesDecoder::handle_blend_color),
        entry::<BlendEquation>(GlesDecoder::handle_blend_equation),
        entry::<BlendFunc>(GlesDecoder::handle_blend_func),
        entry::<BufferData>(GlesDecoder::handle_buffer_data),
        entry::<BufferDataImmediate>(GlesDecoder::handle_buffer_data_immediate),
        entry::<BufferSubData>(GlesDecoder::handle_buffer_sub_data),
        entry::<BufferSubDataImmediate>(GlesDecoder::handle_buffer_sub_data_immediate),
        entry::<CheckFramebufferStatus>(GlesDecoder::handle_check_framebuffer_status),
        entry::<Clear>(GlesDecoder::handle_clear),
        entry::<ClearColor>(GlesDecoder::handle_clear_color),
        entry::<ClearDepthf>(GlesDecoder::handle_clear_depthf),
        entry::<ClearStencil>(GlesDecoder::handle_clear_stencil),
        entry::<ColorMask>(GlesDecoder::handle_color_mask),
        entry::<CompileShader>(GlesDecoder::handle_compile_shader),
        entry::<CopyTexImage2D>(GlesDecoder::handle_copy_tex_image_2d),
        entry::<CopyTexSubImage2D>(GlesDecoder::handle_copy_tex_sub_image_2d),
        entry::<CreateProgram>(GlesDecoder::handle_create_program),
        entry::<CreateShader>(GlesDecoder::handle_create_shader),
        entry::<CullFace>(GlesDecoder::handle_cull_face),
        entry::<DeleteBuffers>(GlesDecoder::handle_delete_buffers),
        entry::<DeleteBuffersImmediate>(GlesDecoder::handle_delete_buffers_immediate),
        entry::<DeleteFramebuffers>(GlesDecoder::handle_delete_framebuffers),
        entry::<DeleteFramebuffersImmediate>(GlesDecoder::handle_delete_framebuffers_immediate),
        entry::<DeleteProgram>(GlesDecoder::handle_delete_program),
        entry::<DeleteRenderbuffers>(GlesDecoder::handle_delete_renderbuffers),
        entry::<DeleteRenderbuffersImmediate>(GlesDecoder::handle_delete_renderbuffers_immediate),
        entry::<DeleteShader>(GlesDecoder::handle_delete_shader),
        entry::<DeleteTextures>(GlesDecoder::handle_delete_textures),
        entry::<DeleteTexturesImmediate>(GlesDecoder::handle_delete_textures_immediate),
        entry::<DepthFunc>(GlesDecoder::handle_depth_func),
        entry::<DepthMask>(GlesDecoder::handle_depth_mask),
        entry::<DepthRangef>(GlesDecoder::handle_depth_rangef),
        entry::<DetachShader>(GlesDecoder::handle_detach_shader),
        entry::<Disable>(GlesDecoder::handle_disable),
        entry::<DisableVertexAttribArray>(GlesDecoder::handle_disable_vertex_attrib_array),
        entry::<DrawArrays>(GlesDecoder::handle_draw_arrays),
        entry::<DrawElements>(GlesDecoder::handle_draw_elements),
        entry::<Enable>(GlesDecoder::handle_enable),
        entry::<EnableVertexAttribArray>(GlesDecoder::handle_enable_vertex_attrib_array),
        entry::<Finish>(GlesDecoder::handle_finish),
        entry::<Flush>(GlesDecoder::handle_flush),
        entry::<FramebufferRenderbuffer>(GlesDecoder::handle_framebuffer_renderbuffer),
        entry::<FramebufferTexture2D>(GlesDecoder::handle_framebuffer_texture_2d),
        entry::<FrontFace>(GlesDecoder::handle_front_face),
        entry::<GenBuffers>(GlesDecoder::handle_gen_buffers),
        entry::<GenBuffersImmediate>(GlesDecoder::handle_gen_buffers_immediate),
        entry::<GenerateMipmap>(GlesDecoder::handle_generate_mipmap),
        entry::<GenFramebuffers>(GlesDecoder::handle_gen_framebuffers),
        entry::<GenFramebuffersImmediate>(GlesDecoder::handle_gen_framebuffers_immediate),
        entry::<GenRenderbuffers>(GlesDecoder::handle_gen_renderbuffers),
        entry::<GenRenderbuffersImmediate>(GlesDecoder::handle_gen_renderbuffers_immediate),
        entry::<GenTextures>(GlesDecoder::handle_gen_textures),
        entry::<GenTexturesImmediate>(GlesDecoder::handle_gen_textures_immediate),
        entry::<GenSharedIds>(GlesDecoder::handle_gen_shared_ids),
        entry::<DeleteSharedIds>(GlesDecoder::handle_delete_shared_ids),
        entry::<RegisterSharedIds>(GlesDecoder::handle_register_shared_ids),
        entry::<GetActiveAttrib>(GlesDecoder::handle_get_active_attrib),
        entry::<GetActiveUniform>(GlesDecoder::handle_get_active_uniform),
        entry::<GetAttachedShaders>(GlesDecoder::handle_get_attached_shaders),
        entry::<GetAttribLocationImmediate>(GlesDecoder::handle_get_attrib_location_immediate),
        entry::<GetAttribLocationBucket>(GlesDecoder::handle_get_attrib_location_bucket),
        entry::<GetBooleanv>(GlesDecoder::handle_get_booleanv),
        entry::<GetBufferParameteriv>(GlesDecoder::handle_get_buffer_parameteriv),
        entry::<GetError>(GlesDecoder::handle_get_error),
        entry::<GetFloatv>(GlesDecoder::handle_get_floatv),
        entry::<GetFramebufferAttachmentParameteriv>(GlesDecoder::handle_get_framebuffer_attachment_parameteriv),
        entry::<GetIntegerv>(GlesDecoder::handle_get_integerv),
        entry::<GetMaxValueInBuffer>(GlesDecoder::handle_get_max_value_in_buffer),
        entry::<GetProgramiv>(GlesDecoder::handle_get_programiv),
        entry::<GetProgramInfoLog>(GlesDecoder::handle_get_program_info_log),
        entry::<GetRenderbufferParameteriv>(GlesDecoder::handle_get_renderbuffer_parameteriv),
        entry::<GetShaderiv>(GlesDecoder::handle_get_shaderiv),
        entry::<GetShaderInfoLog>(GlesDecoder::handle_get_shader_info_log),
        entry::<GetShaderSource>(GlesDecoder::handle_get_shader_source),
        entry::<GetString>(GlesDecoder::handle_get_string),
        entry::<GetTexLevelParameteriv>(GlesDecoder::handle_get_tex_level_parameteriv),
        entry::<GetTexParameteriv>(GlesDecoder::handle_get_tex_parameteriv),
        entry::<GetUniformLocationImmediate>(GlesDecoder::handle_get_uniform_location_immediate),
        entry::<GetUniformLocationBucket>(GlesDecoder::handle_get_uniform_location_bucket),
        entry::<GetVertexAttribfv>(GlesDecoder::handle_get_vertex_attribfv),
        entry::<GetVertexAttribiv>(GlesDecoder::handle_get_vertex_attribiv),
        entry::<GetVertexAttribPointerv>(GlesDecoder::handle_get_vertex_attrib_pointerv),
        entry::<Hint>(GlesDecoder::handle_hint),
        entry::<IsBuffer>(GlesDecoder::handle_is_buffer),
        entry::<IsEnabled>(GlesDecoder::handle_is_enabled),
        entry::<IsFramebuffer>(GlesDecoder::handle_is_framebuffer),
        entry::<IsProgram>(GlesDecoder::handle_is_program),
        entry::<IsRenderbuffer>(GlesDecoder::handle_is_renderbuffer),
        entry::<IsShader>(GlesDecoder::handle_is_shader),
        entry::<IsTexture>(GlesDecoder::handle_is_texture),
        entry::<LineWidth>(GlesDecoder::handle_line_width),
        entry::<LinkProgram>(GlesDecoder::handle_link_program),
        entry::<PixelStorei>(GlesDecoder::handle_pixel_storei),
        entry::<PolygonOffset>(GlesDecoder::handle_polygon_offset),
        entry::<ReadPixels>(GlesDecoder::handle_read_pixels),
        entry::<RenderbufferStorage>(GlesDecoder::handle_renderbuffer_storage),
        entry::<SampleCoverage>(GlesDecoder::handle_sample_coverage),
        entry::<Scissor>(GlesDecoder::handle_scissor),
        entry::<ShaderSource>(GlesDecoder::handle_shader_source),
        entry::<ShaderSourceImmediate>(GlesDecoder::handle_shader_source_immediate),
        entry::<ShaderSourceBucket>(GlesDecoder::handle_shader_source_bucket),
        entry::<StencilFunc>(GlesDecoder::handle_stencil_func),
        entry::<StencilMask>(GlesDecoder::handle_stencil_mask),
        entry::<StencilMaskSeparate>(GlesDecoder::handle_stencil_mask_separate),
        entry::<StencilOp>(GlesDecoder::handle_stencil_op),
        entry::<SwapBuffers>(GlesDecoder::handle_swap_buffers),
        entry::<TexImage2D>(GlesDecoder::handle_tex_image_2d),
        entry::<TexImage2DImmediate>(GlesDecoder::handle_tex_image_2d_immediate),
        entry::<TexParameterf>(GlesDecoder::handle_tex_parameterf),
        entry::<TexParameteri>(GlesDecoder::handle_tex_parameteri),
        entry::<TexSubImage2D>(GlesDecoder::handle_tex_sub_image_2d),
        entry::<TexSubImage2DImmediate>(GlesDecoder::handle_tex_sub_image_2d_immediate),
        entry::<Uniform1f>(GlesDecoder::handle_uniform_1f),
        entry::<Uniform1i>(GlesDecoder::handle_uniform_1i),
        entry::<Uniform1ivImmediate>(GlesDecoder::handle_uniform_1iv_immediate),
        entry::<Uniform2f>(GlesDecoder::handle_uniform_2f),
        entry::<Uniform3f>(GlesDecoder::handle_uniform_3f),
        entry::<Uniform4f>(GlesDecoder::handle_uniform_4f),
        entry::<Uniform4fvImmediate>(GlesDecoder::handle_uniform_4fv_immediate),
        entry::<UniformMatrix4fvImmediate>(GlesDecoder::handle_uniform_matrix_4fv_immediate),
        entry::<UseProgram>(GlesDecoder::handle_use_program),
        entry::<ValidateProgram>(GlesDecoder::handle_validate_program),
        entry::<VertexAttrib1f>(GlesDecoder::handle_vertex_attrib_1f),
        entry::<VertexAttrib2f>(GlesDecoder::handle_vertex_attrib_2f),
        entry::<VertexAttrib3f>(GlesDecoder::handle_vertex_attrib_3f),
        entry::<VertexAttrib4f>(GlesDecoder::handle_vertex_attrib_4f),
        entry::<VertexAttrib4fvImmediate>(GlesDecoder::handle_vertex_attrib_4fv_immediate),
        entry::<VertexAttribPointer>(GlesDecoder::handle_vertex_attrib_pointer),
        entry::<Viewport>(GlesDecoder::handle_viewport),
    ];

    let mut table: Vec<Option<DispatchEntry>> = (0..CommandId::ALL.len()).map(|_| None).collect();
    for (opcode, entry) in entries {
        let slot = &mut table[(opcode - FIRST_GLES2_COMMAND) as usize];
        debug_assert!(slot.is_none(), "{} registered twice", entry.name);
        *slot = Some(entry);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_handler() {
        for id in CommandId::ALL {
            let entry = lookup(id.opcode()).unwrap_or_else(|| panic!("no handler for {}", id.name()));
            assert_eq!(entry.name, id.name());
            assert_eq!(entry.info, id.info());
        }
        assert!(lookup(FIRST_GLES2_COMMAND - 1).is_none());
        assert!(lookup(FIRST_GLES2_COMMAND + CommandId::ALL.len() as u32).is_none());
    }
}
