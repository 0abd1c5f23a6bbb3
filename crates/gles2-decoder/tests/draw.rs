mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::{Size, SoftGl};
use pretty_assertions::assert_eq;

const PROGRAM: u32 = 10;

/// A linked, current program with `a_position` fed from a buffer of `vertices` vec4s.
fn ready_to_draw(h: &mut Harness, vertices: usize) {
    h.program(PROGRAM, VS, FS);
    h.run(&UseProgram { program: PROGRAM });
    h.vec4_array(0, 1, vertices);
    h.assert_no_error();
}

#[test]
fn valid_draw_reaches_the_backend() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();

    let draws = h.gl.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, GL_TRIANGLES);
    assert_eq!(draws[0].count, 3);
    assert_eq!(draws[0].program, h.gl.current_program());
}

#[test]
fn out_of_range_vertices_are_rejected() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.draw_arrays(1, 3).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert!(h.gl.draws().is_empty());

    h.draw_arrays(1, 2).expect("draw");
    h.assert_no_error();
    assert_eq!(h.gl.draws().len(), 1);
}

#[test]
fn enabled_attrib_without_buffer_blocks_the_draw() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.run(&EnableVertexAttribArray { index: 5 });
    h.draw_arrays(0, 3).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert!(h.gl.draws().is_empty());
}

#[test]
fn draw_argument_checks() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.run(&DrawArrays {
        mode: GL_TEXTURE_2D,
        first: 0,
        count: 3,
    });
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);
    h.draw_arrays(0, -1).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    h.draw_arrays(-1, 1).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    h.draw_arrays(0, 0).expect("draw");
    h.assert_no_error();
    assert!(h.gl.draws().is_empty());
}

#[test]
fn draw_without_a_usable_program() {
    let mut h = Harness::new();
    h.vec4_array(0, 1, 3);
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();

    h.program(PROGRAM, VS, FS);
    h.run(&UseProgram { program: PROGRAM });
    // Relinking with a broken shader leaves the program current but unlinked.
    h.run_with_data(
        &ShaderSourceImmediate {
            shader: PROGRAM + 2,
            data_size: 5,
        },
        b"broke",
    );
    h.run(&CompileShader { shader: PROGRAM + 2 });
    h.run(&LinkProgram { program: PROGRAM });
    h.draw_arrays(0, 3).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert!(h.gl.draws().is_empty());
}

#[test]
fn incomplete_framebuffer_refuses_draws() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.run(&BindFramebuffer {
        target: GL_FRAMEBUFFER,
        framebuffer: 4,
    });
    h.draw_arrays(0, 3).expect("draw");
    assert_eq!(h.gl_error(), GL_INVALID_FRAMEBUFFER_OPERATION);
    assert!(h.gl.draws().is_empty());
}

#[test]
fn draw_elements_checks_the_index_range() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.run(&DrawElements {
        mode: GL_TRIANGLES,
        count: 3,
        ty: GL_UNSIGNED_SHORT,
        index_offset: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.bind_buffer(GL_ELEMENT_ARRAY_BUFFER, 2);
    let indices: [u16; 6] = [0, 1, 2, 2, 1, 3];
    h.buffer_data(GL_ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&indices));

    h.run(&DrawElements {
        mode: GL_TRIANGLES,
        count: 3,
        ty: GL_UNSIGNED_SHORT,
        index_offset: 0,
    });
    h.assert_no_error();
    assert_eq!(h.gl.draws().len(), 1);

    // The second triangle references vertex 3.
    h.run(&DrawElements {
        mode: GL_TRIANGLES,
        count: 3,
        ty: GL_UNSIGNED_SHORT,
        index_offset: 6,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    // Past the end of the index buffer.
    h.run(&DrawElements {
        mode: GL_TRIANGLES,
        count: 6,
        ty: GL_UNSIGNED_SHORT,
        index_offset: 2,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert_eq!(h.gl.draws().len(), 1);
}

#[test]
fn attrib0_is_fed_from_a_scratch_buffer_on_desktop_gl() {
    let gl = SoftGl::builder().desktop_gl(true).build();
    let mut h = Harness::with_gl(gl, Size::new(4, 4));
    h.program(PROGRAM, VS, FS);
    h.run(&UseProgram { program: PROGRAM });
    h.run(&VertexAttrib4f {
        indx: 0,
        x: 1.0,
        y: 2.0,
        z: 3.0,
        w: 4.0,
    });
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();

    let draws = h.gl.draws();
    assert_eq!(draws.len(), 1);
    let draw = &draws[0];
    assert!(draw.attrib0.enabled);
    assert_ne!(draw.attrib0.buffer, 0);
    let expected: Vec<f32> = [1.0, 2.0, 3.0, 4.0].repeat(3);
    assert_eq!(draw.attrib0_data, Some(f32_bytes(&expected)));

    // Client state is back after the draw.
    let attrib0 = h.gl.attrib(0).expect("attrib 0");
    assert!(!attrib0.enabled);
    assert_eq!(h.gl.buffer_binding(GL_ARRAY_BUFFER), 0);
}

#[test]
fn attrib0_is_left_alone_on_es_backends() {
    let mut h = Harness::new();
    h.program(PROGRAM, VS, FS);
    h.run(&UseProgram { program: PROGRAM });
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();
    let draws = h.gl.draws();
    assert_eq!(draws.len(), 1);
    assert!(!draws[0].attrib0.enabled);
}

#[test]
fn non_renderable_textures_sample_black() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 5,
    });
    h.tex_image_rgba(0, 4, 4, [255, 0, 0, 255]);
    let client = h.gl.texture_binding(0, GL_TEXTURE_2D);

    // A single level with a mipmapping min filter is incomplete.
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();
    let substituted = h.gl.draws()[0].textures[0][0];
    assert_ne!(substituted, client);
    assert_ne!(substituted, 0);
    assert_eq!(h.gl.texture_binding(0, GL_TEXTURE_2D), client);

    h.run(&TexParameteri {
        target: GL_TEXTURE_2D,
        pname: GL_TEXTURE_MIN_FILTER,
        param: GL_LINEAR as i32,
    });
    h.draw_arrays(0, 3).expect("draw");
    assert_eq!(h.gl.draws()[1].textures[0][0], client);
}

#[test]
fn substitution_restores_the_active_unit() {
    let mut h = Harness::new();
    ready_to_draw(&mut h, 3);
    let sampler = h.uniform_location(PROGRAM, "u_tex");
    h.run(&Uniform1i { location: sampler, x: 3 });
    h.run(&ActiveTexture {
        texture: GL_TEXTURE0 + 1,
    });
    h.draw_arrays(0, 3).expect("draw");
    h.assert_no_error();

    let draw = &h.gl.draws()[0];
    assert_ne!(draw.textures[3][0], 0);
    assert_eq!(h.gl.texture_binding(3, GL_TEXTURE_2D), 0);
    assert_eq!(h.gl.active_texture_unit(), 1);
}

fn vertex_attribiv(h: &mut Harness, index: u32, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetVertexAttribiv {
        index,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

#[test]
fn vertex_attrib_buffer_binding_keeps_large_client_ids() {
    let mut h = Harness::new();
    let id = 16_777_217;
    h.vec4_array(1, id, 3);
    h.assert_no_error();
    assert_eq!(vertex_attribiv(&mut h, 1, GL_VERTEX_ATTRIB_ARRAY_BUFFER_BINDING), vec![id]);
    assert_eq!(vertex_attribiv(&mut h, 1, GL_VERTEX_ATTRIB_ARRAY_ENABLED), vec![1]);
    assert_eq!(vertex_attribiv(&mut h, 1, GL_VERTEX_ATTRIB_ARRAY_SIZE), vec![4]);
    assert_eq!(vertex_attribiv(&mut h, 1, GL_VERTEX_ATTRIB_ARRAY_TYPE), vec![GL_FLOAT]);
}
