use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;

use super::{client_string, immediate_string, immediate_values, GlesDecoder};
use crate::error::{CmdError, DecodeResult, GlError};
use crate::resources::Program;

/// Which GL types a `glUniform*` entry point may write.
fn accepts_int(ty: GLenum) -> bool {
    matches!(ty, GL_INT | GL_BOOL | GL_SAMPLER_2D | GL_SAMPLER_CUBE)
}

fn accepts_float(components: usize) -> fn(GLenum) -> bool {
    fn scalar(ty: GLenum) -> bool {
        matches!(ty, GL_FLOAT | GL_BOOL)
    }
    fn vec2(ty: GLenum) -> bool {
        matches!(ty, GL_FLOAT_VEC2 | GL_BOOL_VEC2)
    }
    fn vec3(ty: GLenum) -> bool {
        matches!(ty, GL_FLOAT_VEC3 | GL_BOOL_VEC3)
    }
    fn vec4(ty: GLenum) -> bool {
        matches!(ty, GL_FLOAT_VEC4 | GL_BOOL_VEC4)
    }
    match components {
        1 => scalar,
        2 => vec2,
        3 => vec3,
        _ => vec4,
    }
}

/// A validated uniform write: how many array elements it may touch and whether it feeds
/// texture units.
struct UniformWrite {
    program: Rc<Program>,
    elements: usize,
    is_sampler: bool,
}

impl GlesDecoder {
    pub(super) fn handle_create_shader(&mut self, c: &CreateShader, _: &[u8]) -> DecodeResult {
        if !self.validators.shader_type.is_valid(c.ty) {
            self.set_gl_error(GlError::InvalidEnum, "glCreateShader: type");
            return Ok(());
        }
        if self.program_or_shader_id_taken(c.client_id) {
            return Err(CmdError::InvalidArguments);
        }
        let service_id = self.gl.create_shader(c.ty);
        let Some(shader) = self.group.shaders.create(c.client_id, service_id) else {
            self.gl.delete_shader(service_id);
            return Err(CmdError::InvalidArguments);
        };
        shader.state_mut().shader_type = c.ty;
        self.group
            .mark_id_used(id_namespaces::PROGRAMS_AND_SHADERS, c.client_id);
        Ok(())
    }

    pub(super) fn handle_create_program(&mut self, c: &CreateProgram, _: &[u8]) -> DecodeResult {
        if self.program_or_shader_id_taken(c.client_id) {
            return Err(CmdError::InvalidArguments);
        }
        let service_id = self.gl.create_program();
        if self.group.programs.create(c.client_id, service_id).is_none() {
            self.gl.delete_program(service_id);
            return Err(CmdError::InvalidArguments);
        }
        self.group
            .mark_id_used(id_namespaces::PROGRAMS_AND_SHADERS, c.client_id);
        Ok(())
    }

    /// Programs and shaders share one client namespace.
    fn program_or_shader_id_taken(&self, client_id: u32) -> bool {
        client_id == 0
            || self.group.programs.contains(client_id)
            || self.group.shaders.contains(client_id)
    }

    pub(super) fn handle_delete_shader(&mut self, c: &DeleteShader, _: &[u8]) -> DecodeResult {
        if c.shader == 0 {
            return Ok(());
        }
        let Some(shader) = self.shader_not_program(c.shader, "glDeleteShader") else {
            return Ok(());
        };
        self.group.shaders.remove(c.shader);
        self.group
            .free_id(id_namespaces::PROGRAMS_AND_SHADERS, c.shader);
        self.gl.delete_shader(shader.service_id());
        Ok(())
    }

    pub(super) fn handle_delete_program(&mut self, c: &DeleteProgram, _: &[u8]) -> DecodeResult {
        if c.program == 0 {
            return Ok(());
        }
        let Some(program) = self.program_not_shader(c.program, "glDeleteProgram") else {
            return Ok(());
        };
        self.group.programs.remove(c.program);
        self.group
            .free_id(id_namespaces::PROGRAMS_AND_SHADERS, c.program);
        self.gl.delete_program(program.service_id());
        Ok(())
    }

    pub(super) fn handle_is_program(&mut self, c: &IsProgram, _: &[u8]) -> DecodeResult {
        let exists = self.group.programs.contains(c.program);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    pub(super) fn handle_is_shader(&mut self, c: &IsShader, _: &[u8]) -> DecodeResult {
        let exists = self.group.shaders.contains(c.shader);
        self.write_result(c.result_shm_id, c.result_shm_offset, exists as u32)
    }

    pub(super) fn handle_shader_source(&mut self, c: &ShaderSource, _: &[u8]) -> DecodeResult {
        let bytes = self
            .common
            .read_bytes(c.data_shm_id, c.data_shm_offset, c.data_size)?;
        self.set_shader_source(c.shader, client_string(&bytes));
        Ok(())
    }

    pub(super) fn handle_shader_source_immediate(
        &mut self,
        c: &ShaderSourceImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let source = immediate_string(data, c.data_size)?;
        self.set_shader_source(c.shader, source);
        Ok(())
    }

    pub(super) fn handle_shader_source_bucket(
        &mut self,
        c: &ShaderSourceBucket,
        _: &[u8],
    ) -> DecodeResult {
        let source = self.bucket_string(c.data_bucket_id)?;
        self.set_shader_source(c.shader, source);
        Ok(())
    }

    /// The source is kept until `CompileShader`, where it goes through the translator.
    fn set_shader_source(&mut self, shader: u32, source: String) {
        if let Some(shader) = self.shader_not_program(shader, "glShaderSource") {
            shader.state_mut().source = Some(source);
        }
    }

    /// Reads a bucket as a client string. A missing bucket is a protocol error.
    fn bucket_string(&self, bucket_id: u32) -> Result<String, CmdError> {
        let bucket = self
            .common
            .bucket(bucket_id)
            .ok_or(CmdError::InvalidArguments)?;
        let bytes = bucket
            .data(0, bucket.size())
            .ok_or(CmdError::InvalidArguments)?;
        Ok(client_string(bytes))
    }

    pub(super) fn handle_compile_shader(&mut self, c: &CompileShader, _: &[u8]) -> DecodeResult {
        let Some(shader) = self.shader_not_program(c.shader, "glCompileShader") else {
            return Ok(());
        };
        let (shader_type, source) = {
            let state = shader.state();
            (state.shader_type, state.source.clone().unwrap_or_default())
        };
        let translated = match self.translator.as_mut() {
            Some(translator) => translator.translate(shader_type, &source),
            None => Ok(source),
        };
        match translated {
            Ok(object_code) => {
                let service_id = shader.service_id();
                self.gl.shader_source(service_id, &object_code);
                self.gl.compile_shader(service_id);
                let compiled = self.gl.get_shaderiv(service_id, GL_COMPILE_STATUS) != 0;
                let info_log = self.gl.get_shader_info_log(service_id);
                let mut state = shader.state_mut();
                state.compile_status = compiled;
                state.info_log = info_log;
            }
            Err(info_log) => {
                tracing::debug!(shader = c.shader, "shader translation failed");
                let mut state = shader.state_mut();
                state.compile_status = false;
                state.info_log = info_log;
            }
        }
        Ok(())
    }

    pub(super) fn handle_attach_shader(&mut self, c: &AttachShader, _: &[u8]) -> DecodeResult {
        let Some(program) = self.program_not_shader(c.program, "glAttachShader") else {
            return Ok(());
        };
        let Some(shader) = self.shader_not_program(c.shader, "glAttachShader") else {
            return Ok(());
        };
        let conflict = {
            let state = program.state();
            let shader_type = shader.state().shader_type;
            state.attached_shaders.iter().any(|attached| {
                Rc::ptr_eq(attached, &shader) || attached.state().shader_type == shader_type
            })
        };
        if conflict {
            self.set_gl_error(
                GlError::InvalidOperation,
                "glAttachShader: shader of this type already attached",
            );
            return Ok(());
        }
        self.gl.attach_shader(program.service_id(), shader.service_id());
        program.state_mut().attached_shaders.push(shader);
        Ok(())
    }

    pub(super) fn handle_detach_shader(&mut self, c: &DetachShader, _: &[u8]) -> DecodeResult {
        let Some(program) = self.program_not_shader(c.program, "glDetachShader") else {
            return Ok(());
        };
        let Some(shader) = self.shader_not_program(c.shader, "glDetachShader") else {
            return Ok(());
        };
        let position = program
            .state()
            .attached_shaders
            .iter()
            .position(|attached| Rc::ptr_eq(attached, &shader));
        let Some(position) = position else {
            self.set_gl_error(GlError::InvalidOperation, "glDetachShader: shader not attached");
            return Ok(());
        };
        self.gl.detach_shader(program.service_id(), shader.service_id());
        program.state_mut().attached_shaders.remove(position);
        Ok(())
    }

    pub(super) fn handle_link_program(&mut self, c: &LinkProgram, _: &[u8]) -> DecodeResult {
        let Some(program) = self.program_not_shader(c.program, "glLinkProgram") else {
            return Ok(());
        };
        let service_id = program.service_id();
        self.copy_real_gl_errors();
        self.gl.link_program(service_id);
        let linked = self.gl.get_programiv(service_id, GL_LINK_STATUS) != 0;
        let info_log = self.gl.get_program_info_log(service_id);
        let mut state = program.state_mut();
        state.link_status = linked;
        state.info_log = info_log;
        if linked {
            state.update_reflection(&mut *self.gl, service_id);
        } else {
            state.clear_reflection();
        }
        tracing::debug!(
            program = c.program,
            linked,
            attribs = state.attribs().len(),
            uniforms = state.uniforms().len(),
            "program linked"
        );
        Ok(())
    }

    pub(super) fn handle_validate_program(&mut self, c: &ValidateProgram, _: &[u8]) -> DecodeResult {
        let Some(program) = self.program_not_shader(c.program, "glValidateProgram") else {
            return Ok(());
        };
        let service_id = program.service_id();
        self.gl.validate_program(service_id);
        let valid = self.gl.get_programiv(service_id, GL_VALIDATE_STATUS) != 0;
        let info_log = self.gl.get_program_info_log(service_id);
        let mut state = program.state_mut();
        state.validate_status = valid;
        state.info_log = info_log;
        Ok(())
    }

    pub(super) fn handle_use_program(&mut self, c: &UseProgram, _: &[u8]) -> DecodeResult {
        let program = match c.program {
            0 => None,
            id => {
                let Some(program) = self.program_not_shader(id, "glUseProgram") else {
                    return Ok(());
                };
                if !program.state().link_status {
                    self.set_gl_error(GlError::InvalidOperation, "glUseProgram: program not linked");
                    return Ok(());
                }
                Some(program)
            }
        };
        self.gl
            .use_program(program.as_ref().map_or(0, |p| p.service_id()));
        self.state.current_program = program;
        Ok(())
    }

    pub(super) fn handle_get_shaderiv(&mut self, c: &GetShaderiv, _: &[u8]) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.shader_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetShaderiv: pname");
            return Ok(());
        }
        let Some(shader) = self.shader_not_program(c.shader, "glGetShaderiv") else {
            return Ok(());
        };
        let value = {
            let state = shader.state();
            match c.pname {
                GL_SHADER_TYPE => state.shader_type,
                GL_COMPILE_STATUS => state.compile_status as u32,
                GL_INFO_LOG_LENGTH => string_query_length(&state.info_log),
                GL_SHADER_SOURCE_LENGTH => state
                    .source
                    .as_deref()
                    .map_or(0, string_query_length),
                _ => shader.is_deleted() as u32,
            }
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }

    pub(super) fn handle_get_programiv(&mut self, c: &GetProgramiv, _: &[u8]) -> DecodeResult {
        self.common
            .begin_sized_result(c.params_shm_id, c.params_shm_offset, 1)?;
        if !self.validators.program_parameter.is_valid(c.pname) {
            self.set_gl_error(GlError::InvalidEnum, "glGetProgramiv: pname");
            return Ok(());
        }
        let Some(program) = self.program_not_shader(c.program, "glGetProgramiv") else {
            return Ok(());
        };
        let value = {
            let state = program.state();
            match c.pname {
                GL_LINK_STATUS => state.link_status as u32,
                GL_VALIDATE_STATUS => state.validate_status as u32,
                GL_INFO_LOG_LENGTH => string_query_length(&state.info_log),
                GL_ATTACHED_SHADERS => state.attached_shaders.len() as u32,
                GL_ACTIVE_ATTRIBUTES => state.attribs().len() as u32,
                GL_ACTIVE_ATTRIBUTE_MAX_LENGTH => state.max_attrib_name_length() as u32,
                GL_ACTIVE_UNIFORMS => state.uniforms().len() as u32,
                GL_ACTIVE_UNIFORM_MAX_LENGTH => state.max_uniform_name_length() as u32,
                _ => program.is_deleted() as u32,
            }
        };
        self.common
            .finish_sized_result(c.params_shm_id, c.params_shm_offset, &[value])
    }

    pub(super) fn handle_get_shader_info_log(&mut self, c: &GetShaderInfoLog, _: &[u8]) -> DecodeResult {
        self.common.create_bucket(c.bucket_id).clear();
        if let Some(shader) = self.shader_not_program(c.shader, "glGetShaderInfoLog") {
            let log = shader.state().info_log.clone();
            self.common.create_bucket(c.bucket_id).set_from_string(&log);
        }
        Ok(())
    }

    pub(super) fn handle_get_program_info_log(
        &mut self,
        c: &GetProgramInfoLog,
        _: &[u8],
    ) -> DecodeResult {
        self.common.create_bucket(c.bucket_id).clear();
        if let Some(program) = self.program_not_shader(c.program, "glGetProgramInfoLog") {
            let log = program.state().info_log.clone();
            self.common.create_bucket(c.bucket_id).set_from_string(&log);
        }
        Ok(())
    }

    pub(super) fn handle_get_shader_source(&mut self, c: &GetShaderSource, _: &[u8]) -> DecodeResult {
        self.common.create_bucket(c.bucket_id).clear();
        if let Some(shader) = self.shader_not_program(c.shader, "glGetShaderSource") {
            let source = shader.state().source.clone().unwrap_or_default();
            self.common.create_bucket(c.bucket_id).set_from_string(&source);
        }
        Ok(())
    }

    pub(super) fn handle_get_attached_shaders(
        &mut self,
        c: &GetAttachedShaders,
        _: &[u8],
    ) -> DecodeResult {
        let max_count = c.result_size.saturating_sub(4) as usize / 4;
        self.common
            .begin_sized_result(c.result_shm_id, c.result_shm_offset, max_count)?;
        let Some(program) = self.program_not_shader(c.program, "glGetAttachedShaders") else {
            return Ok(());
        };
        let ids: Vec<u32> = program
            .state()
            .attached_shaders
            .iter()
            .take(max_count)
            .map(|shader| shader.client_id())
            .collect();
        self.common
            .finish_sized_result(c.result_shm_id, c.result_shm_offset, &ids)
    }

    pub(super) fn handle_get_active_attrib(&mut self, c: &GetActiveAttrib, _: &[u8]) -> DecodeResult {
        self.begin_active_info(c.result_shm_id, c.result_shm_offset)?;
        let Some(program) = self.program_not_shader(c.program, "glGetActiveAttrib") else {
            return Ok(());
        };
        let attrib = program.state().attribs().get(c.index as usize).cloned();
        let Some(attrib) = attrib else {
            self.set_gl_error(GlError::InvalidValue, "glGetActiveAttrib: index out of range");
            return Ok(());
        };
        self.common
            .create_bucket(c.name_bucket_id)
            .set_from_string(&attrib.name);
        self.finish_active_info(c.result_shm_id, c.result_shm_offset, attrib.size, attrib.ty)
    }

    pub(super) fn handle_get_active_uniform(&mut self, c: &GetActiveUniform, _: &[u8]) -> DecodeResult {
        self.begin_active_info(c.result_shm_id, c.result_shm_offset)?;
        let Some(program) = self.program_not_shader(c.program, "glGetActiveUniform") else {
            return Ok(());
        };
        let uniform = program
            .state()
            .uniforms()
            .get(c.index as usize)
            .map(|u| (u.reported_name(), u.size, u.ty));
        let Some((name, size, ty)) = uniform else {
            self.set_gl_error(GlError::InvalidValue, "glGetActiveUniform: index out of range");
            return Ok(());
        };
        self.common.create_bucket(c.name_bucket_id).set_from_string(&name);
        self.finish_active_info(c.result_shm_id, c.result_shm_offset, size, ty)
    }

    fn begin_active_info(&self, shm_id: u32, shm_offset: u32) -> DecodeResult {
        let result: ActiveInfoResult = self.common.read_shared(shm_id, shm_offset)?;
        if result.success != 0 {
            return Err(CmdError::InvalidArguments);
        }
        Ok(())
    }

    fn finish_active_info(&self, shm_id: u32, shm_offset: u32, size: GLint, ty: GLenum) -> DecodeResult {
        let result = ActiveInfoResult { success: 1, size, ty };
        self.common.write_shared(shm_id, shm_offset, &result)
    }

    pub(super) fn handle_bind_attrib_location_immediate(
        &mut self,
        c: &BindAttribLocationImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let name = immediate_string(data, c.data_size)?;
        self.bind_attrib_location(c.program, c.index, &name);
        Ok(())
    }

    pub(super) fn handle_bind_attrib_location_bucket(
        &mut self,
        c: &BindAttribLocationBucket,
        _: &[u8],
    ) -> DecodeResult {
        let name = self.bucket_string(c.name_bucket_id)?;
        self.bind_attrib_location(c.program, c.index, &name);
        Ok(())
    }

    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str) {
        if index >= self.vertex_attribs.max_vertex_attribs() {
            self.set_gl_error(GlError::InvalidValue, "glBindAttribLocation: index out of range");
            return;
        }
        if name.starts_with("gl_") {
            self.set_gl_error(GlError::InvalidOperation, "glBindAttribLocation: reserved prefix");
            return;
        }
        if let Some(program) = self.program_not_shader(program, "glBindAttribLocation") {
            self.gl
                .bind_attrib_location(program.service_id(), index, name);
        }
    }

    pub(super) fn handle_get_attrib_location_immediate(
        &mut self,
        c: &GetAttribLocationImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let name = immediate_string(data, c.data_size)?;
        self.get_location(c.program, &name, c.location_shm_id, c.location_shm_offset, false)
    }

    pub(super) fn handle_get_attrib_location_bucket(
        &mut self,
        c: &GetAttribLocationBucket,
        _: &[u8],
    ) -> DecodeResult {
        let name = self.bucket_string(c.name_bucket_id)?;
        self.get_location(c.program, &name, c.location_shm_id, c.location_shm_offset, false)
    }

    pub(super) fn handle_get_uniform_location_immediate(
        &mut self,
        c: &GetUniformLocationImmediate,
        data: &[u8],
    ) -> DecodeResult {
        let name = immediate_string(data, c.data_size)?;
        self.get_location(c.program, &name, c.location_shm_id, c.location_shm_offset, true)
    }

    pub(super) fn handle_get_uniform_location_bucket(
        &mut self,
        c: &GetUniformLocationBucket,
        _: &[u8],
    ) -> DecodeResult {
        let name = self.bucket_string(c.name_bucket_id)?;
        self.get_location(c.program, &name, c.location_shm_id, c.location_shm_offset, true)
    }

    /// Answers an attribute or uniform location query from the program's reflection tables. The
    /// out-parameter must hold -1 beforehand.
    fn get_location(
        &mut self,
        program: u32,
        name: &str,
        shm_id: u32,
        shm_offset: u32,
        uniform: bool,
    ) -> DecodeResult {
        let op = if uniform { "glGetUniformLocation" } else { "glGetAttribLocation" };
        let current: i32 = self.common.read_shared(shm_id, shm_offset)?;
        if current != -1 {
            return Err(CmdError::InvalidArguments);
        }
        let Some(program) = self.program_not_shader(program, op) else {
            return Ok(());
        };
        if !program.state().link_status {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: program not linked"));
            return Ok(());
        }
        let location = if uniform {
            program.state().uniform_location(name)
        } else {
            program.state().attrib_location(name)
        };
        self.common.write_shared(shm_id, shm_offset, &location)
    }

    /// Validates a `glUniform*` call against the current program. `None` means nothing should be
    /// written, either because an error was raised or because the location is -1.
    fn prepare_uniform(
        &mut self,
        location: GLint,
        count: GLsizei,
        op: &str,
        accepts: fn(GLenum) -> bool,
    ) -> Option<UniformWrite> {
        if count < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{op}: count < 0"));
            return None;
        }
        let Some(program) = self.current_program() else {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: no program in use"));
            return None;
        };
        if location == -1 {
            return None;
        }
        let found = program
            .state()
            .uniform_by_location(location)
            .map(|(info, element)| (info.ty, info.is_array, info.size, element, info.is_sampler()));
        let Some((ty, is_array, size, element, is_sampler)) = found else {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: unknown location"));
            return None;
        };
        if !accepts(ty) {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: wrong uniform function for type"));
            return None;
        }
        if count > 1 && !is_array {
            self.set_gl_error(GlError::InvalidOperation, format!("{op}: count > 1 for non-array"));
            return None;
        }
        let remaining = (size.max(1) as usize).saturating_sub(element);
        Some(UniformWrite {
            program,
            elements: remaining.min(count as usize),
            is_sampler,
        })
    }

    fn uniform_ints(&mut self, location: GLint, values: &[GLint], op: &str) {
        let Some(write) = self.prepare_uniform(location, values.len() as GLsizei, op, accepts_int) else {
            return;
        };
        let values = &values[..write.elements];
        if write.is_sampler {
            let units = self.group.limits().max_texture_units as GLint;
            if values.iter().any(|&unit| unit < 0 || unit >= units) {
                self.set_gl_error(GlError::InvalidValue, format!("{op}: texture unit out of range"));
                return;
            }
            write.program.state_mut().set_samplers(location, values);
        }
        self.gl.uniform_iv(location, 1, values);
    }

    fn uniform_floats(&mut self, location: GLint, components: usize, values: &[GLfloat], op: &str) {
        let count = (values.len() / components) as GLsizei;
        let Some(write) = self.prepare_uniform(location, count, op, accepts_float(components)) else {
            return;
        };
        self.gl
            .uniform_fv(location, components, &values[..write.elements * components]);
    }

    pub(super) fn handle_uniform_1i(&mut self, c: &Uniform1i, _: &[u8]) -> DecodeResult {
        self.uniform_ints(c.location, &[c.x], "glUniform1i");
        Ok(())
    }

    pub(super) fn handle_uniform_1iv_immediate(
        &mut self,
        c: &Uniform1ivImmediate,
        data: &[u8],
    ) -> DecodeResult {
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, "glUniform1iv: count < 0");
            return Ok(());
        }
        let values: Vec<GLint> =
            immediate_values(data, i64::from(c.count)).ok_or(CmdError::OutOfBounds)?;
        self.uniform_ints(c.location, &values, "glUniform1iv");
        Ok(())
    }

    pub(super) fn handle_uniform_1f(&mut self, c: &Uniform1f, _: &[u8]) -> DecodeResult {
        self.uniform_floats(c.location, 1, &[c.x], "glUniform1f");
        Ok(())
    }

    pub(super) fn handle_uniform_2f(&mut self, c: &Uniform2f, _: &[u8]) -> DecodeResult {
        self.uniform_floats(c.location, 2, &[c.x, c.y], "glUniform2f");
        Ok(())
    }

    pub(super) fn handle_uniform_3f(&mut self, c: &Uniform3f, _: &[u8]) -> DecodeResult {
        self.uniform_floats(c.location, 3, &[c.x, c.y, c.z], "glUniform3f");
        Ok(())
    }

    pub(super) fn handle_uniform_4f(&mut self, c: &Uniform4f, _: &[u8]) -> DecodeResult {
        self.uniform_floats(c.location, 4, &[c.x, c.y, c.z, c.w], "glUniform4f");
        Ok(())
    }

    pub(super) fn handle_uniform_4fv_immediate(
        &mut self,
        c: &Uniform4fvImmediate,
        data: &[u8],
    ) -> DecodeResult {
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, "glUniform4fv: count < 0");
            return Ok(());
        }
        let values: Vec<GLfloat> =
            immediate_values(data, i64::from(c.count) * 4).ok_or(CmdError::OutOfBounds)?;
        self.uniform_floats(c.location, 4, &values, "glUniform4fv");
        Ok(())
    }

    pub(super) fn handle_uniform_matrix_4fv_immediate(
        &mut self,
        c: &UniformMatrix4fvImmediate,
        data: &[u8],
    ) -> DecodeResult {
        const OP: &str = "glUniformMatrix4fv";
        if c.count < 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: count < 0"));
            return Ok(());
        }
        let values: Vec<GLfloat> =
            immediate_values(data, i64::from(c.count) * 16).ok_or(CmdError::OutOfBounds)?;
        if c.transpose != 0 {
            self.set_gl_error(GlError::InvalidValue, format!("{OP}: transpose must be false"));
            return Ok(());
        }
        let Some(write) =
            self.prepare_uniform(c.location, c.count, OP, |ty| ty == GL_FLOAT_MAT4)
        else {
            return Ok(());
        };
        self.gl
            .uniform_matrix4fv(c.location, false, &values[..write.elements * 16]);
        Ok(())
    }
}

/// Length reported for a string query: including the terminator, or 0 when empty.
fn string_query_length(s: &str) -> u32 {
    if s.is_empty() {
        0
    } else {
        s.len() as u32 + 1
    }
}
