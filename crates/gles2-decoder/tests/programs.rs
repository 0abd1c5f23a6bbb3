mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::CmdError;
use pretty_assertions::assert_eq;

const PROGRAM: u32 = 10;

fn program_param(h: &mut Harness, program: u32, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetProgramiv {
        program,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

fn shader_param(h: &mut Harness, shader: u32, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetShaderiv {
        shader,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

fn linked(h: &mut Harness) {
    h.program(PROGRAM, VS, FS);
    h.assert_no_error();
    h.run(&UseProgram { program: PROGRAM });
}

#[test]
fn compile_and_link_report_status() {
    let mut h = Harness::new();
    h.program(PROGRAM, VS, FS);
    h.assert_no_error();
    assert_eq!(shader_param(&mut h, PROGRAM + 1, GL_COMPILE_STATUS), vec![1]);
    assert_eq!(shader_param(&mut h, PROGRAM + 1, GL_SHADER_TYPE), vec![GL_VERTEX_SHADER]);
    assert_eq!(program_param(&mut h, PROGRAM, GL_LINK_STATUS), vec![1]);
    assert_eq!(program_param(&mut h, PROGRAM, GL_ACTIVE_ATTRIBUTES), vec![1]);
    assert_eq!(program_param(&mut h, PROGRAM, GL_ACTIVE_UNIFORMS), vec![3]);
    assert_eq!(
        program_param(&mut h, PROGRAM, GL_ACTIVE_UNIFORM_MAX_LENGTH),
        vec!["u_tint[0]".len() as u32 + 1]
    );
    assert_eq!(h.attrib_location(PROGRAM, "a_position"), 0);
    assert_eq!(h.uniform_location(PROGRAM, "u_tint[1]"), 3);
    assert_eq!(h.uniform_location(PROGRAM, "missing"), -1);
}

#[test]
fn failed_compile_keeps_the_log() {
    let mut h = Harness::new();
    h.shader(1, GL_FRAGMENT_SHADER, "precision mediump float;");
    assert_eq!(shader_param(&mut h, 1, GL_COMPILE_STATUS), vec![0]);
    let log_len = shader_param(&mut h, 1, GL_INFO_LOG_LENGTH)[0];
    assert!(log_len > 1);

    h.run(&GetShaderInfoLog {
        shader: 1,
        bucket_id: 4,
    });
    let log = h.bucket_string(4).expect("bucket 4");
    assert_eq!(log.len() as u32 + 1, log_len);

    h.run(&GetShaderSource {
        shader: 1,
        bucket_id: 5,
    });
    assert_eq!(h.bucket_string(5).as_deref(), Some("precision mediump float;"));
}

#[test]
fn translator_failures_never_reach_the_backend() {
    let mut h = Harness::new();
    h.decoder
        .set_shader_translator(|_ty: GLenum, source: &str| -> Result<String, String> {
            if source.contains("forbidden") {
                Err("ERROR: forbidden identifier".to_string())
            } else {
                Ok(source.to_string())
            }
        });
    h.shader(1, GL_VERTEX_SHADER, "void main() { forbidden(); }");
    assert_eq!(shader_param(&mut h, 1, GL_COMPILE_STATUS), vec![0]);
    assert_eq!(h.gl.call_count("compile_shader"), 0);
    h.run(&GetShaderInfoLog {
        shader: 1,
        bucket_id: 1,
    });
    assert_eq!(h.bucket_string(1).as_deref(), Some("ERROR: forbidden identifier"));

    h.shader(2, GL_VERTEX_SHADER, VS);
    assert_eq!(shader_param(&mut h, 2, GL_COMPILE_STATUS), vec![1]);
}

#[test]
fn programs_and_shaders_share_one_namespace() {
    let mut h = Harness::new();
    h.run(&CreateShader {
        ty: GL_VERTEX_SHADER,
        client_id: 3,
    });
    assert_eq!(h.exec(&CreateProgram { client_id: 3 }), Err(CmdError::InvalidArguments));
    assert_eq!(
        h.exec(&CreateShader {
            ty: GL_FRAGMENT_SHADER,
            client_id: 3
        }),
        Err(CmdError::InvalidArguments)
    );
    assert_eq!(h.exec(&CreateProgram { client_id: 0 }), Err(CmdError::InvalidArguments));

    // Shader passed where a program is expected.
    h.run(&LinkProgram { program: 3 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    h.run(&LinkProgram { program: 99 });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
}

#[test]
fn one_shader_per_stage() {
    let mut h = Harness::new();
    h.shader(1, GL_VERTEX_SHADER, VS);
    h.shader(2, GL_VERTEX_SHADER, VS);
    h.run(&CreateProgram { client_id: 3 });
    h.run(&AttachShader { program: 3, shader: 1 });
    h.run(&AttachShader { program: 3, shader: 2 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    h.run(&AttachShader { program: 3, shader: 1 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.write_u32(DATA, 0);
    h.run(&GetAttachedShaders {
        program: 3,
        result_shm_id: SHM,
        result_shm_offset: DATA,
        result_size: 4 + 2 * 4,
    });
    assert_eq!(h.read_sized_result(DATA), vec![1]);

    h.run(&DetachShader { program: 3, shader: 2 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
}

#[test]
fn unlinked_programs_cannot_be_used_or_queried() {
    let mut h = Harness::new();
    h.shader(1, GL_VERTEX_SHADER, VS);
    h.run(&CreateProgram { client_id: 2 });
    h.run(&AttachShader { program: 2, shader: 1 });
    h.run(&LinkProgram { program: 2 });
    assert_eq!(program_param(&mut h, 2, GL_LINK_STATUS), vec![0]);

    h.run(&UseProgram { program: 2 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert_eq!(h.get_integer(GL_CURRENT_PROGRAM), 0);

    assert_eq!(h.uniform_location(2, "u_mvp"), -1);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.run(&GetProgramInfoLog {
        program: 2,
        bucket_id: 1,
    });
    assert!(!h.bucket_string(1).unwrap_or_default().is_empty());
}

#[test]
fn location_out_parameter_must_be_cleared() {
    let mut h = Harness::new();
    h.program(PROGRAM, VS, FS);
    h.write_u32(RESULT, 0);
    let name = "u_mvp";
    let result = h.exec_with_data(
        &GetUniformLocationImmediate {
            program: PROGRAM,
            location_shm_id: SHM,
            location_shm_offset: RESULT,
            data_size: name.len() as u32,
        },
        name.as_bytes(),
    );
    assert_eq!(result, Err(CmdError::InvalidArguments));
}

#[test]
fn bound_attrib_locations_apply_at_link() {
    let mut h = Harness::new();
    h.shader(1, GL_VERTEX_SHADER, VS);
    h.shader(2, GL_FRAGMENT_SHADER, FS);
    h.run(&CreateProgram { client_id: 3 });
    h.run(&AttachShader { program: 3, shader: 1 });
    h.run(&AttachShader { program: 3, shader: 2 });

    let name = "a_position";
    h.run_with_data(
        &BindAttribLocationImmediate {
            program: 3,
            index: 5,
            data_size: name.len() as u32,
        },
        name.as_bytes(),
    );
    let reserved = "gl_Vertex";
    h.run_with_data(
        &BindAttribLocationImmediate {
            program: 3,
            index: 1,
            data_size: reserved.len() as u32,
        },
        reserved.as_bytes(),
    );
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    h.run_with_data(
        &BindAttribLocationImmediate {
            program: 3,
            index: 16,
            data_size: name.len() as u32,
        },
        name.as_bytes(),
    );
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    h.run(&LinkProgram { program: 3 });
    assert_eq!(h.attrib_location(3, "a_position"), 5);
}

#[test]
fn active_uniforms_report_array_names() {
    let mut h = Harness::new();
    h.program(PROGRAM, VS, FS);
    let index = (0..3)
        .find(|&i| {
            h.write_bytes(DATA, &[0; 12]);
            h.run(&GetActiveUniform {
                program: PROGRAM,
                index: i,
                name_bucket_id: 1,
                result_shm_id: SHM,
                result_shm_offset: DATA,
            });
            h.bucket_string(1).as_deref() == Some("u_tint[0]")
        })
        .expect("u_tint is active");
    assert!(index < 3);
    assert_eq!(h.read_u32(DATA), 1);
    assert_eq!(h.read_u32(DATA + 4), 2);
    assert_eq!(h.read_u32(DATA + 8), GL_FLOAT_VEC4);

    h.write_bytes(DATA, &[0; 12]);
    h.run(&GetActiveUniform {
        program: PROGRAM,
        index: 3,
        name_bucket_id: 1,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    assert_eq!(h.read_u32(DATA), 0);
}

#[test]
fn uniform_arrays_are_clipped_to_their_size() {
    let mut h = Harness::new();
    linked(&mut h);
    let program = h.gl.current_program();
    let tint = h.uniform_location(PROGRAM, "u_tint");
    let tint1 = h.uniform_location(PROGRAM, "u_tint[1]");

    let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
    h.run_with_data(
        &Uniform4fvImmediate {
            location: tint1,
            count: 3,
        },
        &f32_bytes(&values),
    );
    h.assert_no_error();
    assert_eq!(h.gl.uniform_value(program, tint1), Some(values[..4].to_vec()));

    h.run_with_data(
        &Uniform4fvImmediate {
            location: tint,
            count: 2,
        },
        &f32_bytes(&values[..8]),
    );
    h.assert_no_error();
    assert_eq!(h.gl.uniform_value(program, tint), Some(values[..8].to_vec()));
}

#[test]
fn uniform_type_and_count_are_checked() {
    let mut h = Harness::new();
    h.run(&Uniform1f { location: 0, x: 1.0 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    linked(&mut h);
    let tint = h.uniform_location(PROGRAM, "u_tint");
    let mvp = h.uniform_location(PROGRAM, "u_mvp");

    h.run(&Uniform1f { location: tint, x: 1.0 });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.run(&Uniform4f {
        location: 42,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 0.0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    // Location -1 is silently ignored.
    h.run(&Uniform4f {
        location: -1,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 0.0,
    });
    h.assert_no_error();

    let identity: Vec<f32> = (0..16).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }).collect();
    h.run_with_data(
        &UniformMatrix4fvImmediate {
            location: mvp,
            count: 1,
            transpose: 1,
        },
        &f32_bytes(&identity),
    );
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    let mut two = identity.clone();
    two.extend_from_slice(&identity);
    h.run_with_data(
        &UniformMatrix4fvImmediate {
            location: mvp,
            count: 2,
            transpose: 0,
        },
        &f32_bytes(&two),
    );
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.run_with_data(
        &UniformMatrix4fvImmediate {
            location: mvp,
            count: 1,
            transpose: 0,
        },
        &f32_bytes(&identity),
    );
    h.assert_no_error();
    assert_eq!(h.gl.uniform_value(h.gl.current_program(), mvp), Some(identity));
}

#[test]
fn sampler_uniforms_take_valid_units() {
    let mut h = Harness::new();
    linked(&mut h);
    let sampler = h.uniform_location(PROGRAM, "u_tex");

    h.run(&Uniform1i { location: sampler, x: 8 });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    h.run(&Uniform1i { location: sampler, x: 2 });
    h.assert_no_error();
    let program = h.decoder.group().programs.get(PROGRAM).expect("program");
    let units = program
        .state()
        .sampler_uniforms()
        .map(|u| u.texture_units.clone())
        .collect::<Vec<_>>();
    assert_eq!(units, vec![vec![2]]);
}

#[test]
fn deleting_the_current_program_keeps_it_bound_as_zero() {
    let mut h = Harness::new();
    linked(&mut h);
    assert_eq!(h.get_integer(GL_CURRENT_PROGRAM), PROGRAM as i32);
    h.run(&DeleteProgram { program: PROGRAM });
    assert_eq!(h.get_integer(GL_CURRENT_PROGRAM), 0);

    h.run(&IsProgram {
        program: PROGRAM,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.read_u32(DATA), 0);
    h.assert_no_error();
}
