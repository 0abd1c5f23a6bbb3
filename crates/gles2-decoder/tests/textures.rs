mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::CmdError;
use pretty_assertions::assert_eq;

fn level_param(h: &mut Harness, level: i32, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetTexLevelParameteriv {
        target: GL_TEXTURE_2D,
        level,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

#[test]
fn tex_image_records_level_info() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 2,
    });
    h.tex_image_rgba(0, 4, 2, [10, 20, 30, 40]);
    h.assert_no_error();

    assert_eq!(level_param(&mut h, 0, GL_TEXTURE_WIDTH), vec![4]);
    assert_eq!(level_param(&mut h, 0, GL_TEXTURE_HEIGHT), vec![2]);
    let service_id = h.decoder.group().textures.get(2).expect("texture 2").service_id();
    let image = h.gl.texture_level(service_id, GL_TEXTURE_2D, 0).expect("level 0");
    assert_eq!((image.width, image.height, image.fill), (4, 2, [10, 20, 30, 40]));

    assert_eq!(level_param(&mut h, 1, GL_TEXTURE_WIDTH), Vec::<u32>::new());
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
}

#[test]
fn tex_image_rejects_bad_shapes() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });

    // Larger than the maximum texture size.
    h.run(&TexImage2D {
        target: GL_TEXTURE_2D,
        level: 0,
        internalformat: GL_RGBA as i32,
        width: 4096,
        height: 1,
        border: 0,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels_shm_id: 0,
        pixels_shm_offset: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    // NPOT sizes are only allowed at level 0 without the extension.
    h.run(&TexImage2D {
        target: GL_TEXTURE_2D,
        level: 1,
        internalformat: GL_RGBA as i32,
        width: 3,
        height: 3,
        border: 0,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels_shm_id: 0,
        pixels_shm_offset: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    // Internal format has to match the format.
    h.run(&TexImage2D {
        target: GL_TEXTURE_2D,
        level: 0,
        internalformat: GL_RGB as i32,
        width: 2,
        height: 2,
        border: 0,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels_shm_id: 0,
        pixels_shm_offset: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.run(&TexImage2D {
        target: GL_TEXTURE_2D,
        level: 0,
        internalformat: GL_RGBA as i32,
        width: 2,
        height: 2,
        border: 1,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels_shm_id: 0,
        pixels_shm_offset: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    assert!(h.decoder.group().textures.get(1).expect("texture 1").state().level_info(GL_TEXTURE_2D, 0).is_none());
}

#[test]
fn tex_image_pixels_must_be_in_shared_memory() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });
    let result = h.exec(&TexImage2D {
        target: GL_TEXTURE_2D,
        level: 0,
        internalformat: GL_RGBA as i32,
        width: 64,
        height: 64,
        border: 0,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels_shm_id: SHM,
        pixels_shm_offset: SHM_SIZE as u32 - 64,
    });
    assert_eq!(result, Err(CmdError::OutOfBounds));

    // Immediate payload shorter than the image.
    let result = h.exec_with_data(
        &TexImage2DImmediate {
            target: GL_TEXTURE_2D,
            level: 0,
            internalformat: GL_RGBA as i32,
            width: 2,
            height: 2,
            border: 0,
            format: GL_RGBA,
            ty: GL_UNSIGNED_BYTE,
        },
        &[0; 8],
    );
    assert_eq!(result, Err(CmdError::OutOfBounds));
}

#[test]
fn sub_image_needs_an_existing_level_and_fitting_rect() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });
    h.run_with_data(
        &TexSubImage2DImmediate {
            target: GL_TEXTURE_2D,
            level: 0,
            xoffset: 0,
            yoffset: 0,
            width: 1,
            height: 1,
            format: GL_RGBA,
            ty: GL_UNSIGNED_BYTE,
        },
        &[0; 4],
    );
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.tex_image_rgba(0, 2, 2, [0; 4]);
    h.run_with_data(
        &TexSubImage2DImmediate {
            target: GL_TEXTURE_2D,
            level: 0,
            xoffset: 1,
            yoffset: 1,
            width: 2,
            height: 1,
            format: GL_RGBA,
            ty: GL_UNSIGNED_BYTE,
        },
        &[0; 8],
    );
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    h.run_with_data(
        &TexSubImage2DImmediate {
            target: GL_TEXTURE_2D,
            level: 0,
            xoffset: 0,
            yoffset: 0,
            width: 2,
            height: 2,
            format: GL_RGBA,
            ty: GL_UNSIGNED_BYTE,
        },
        &[5; 16],
    );
    h.assert_no_error();
    let service_id = h.gl.texture_binding(0, GL_TEXTURE_2D);
    assert_eq!(h.gl.texture_level(service_id, GL_TEXTURE_2D, 0).map(|i| i.fill), Some([5; 4]));
}

#[test]
fn textures_stay_on_their_first_target() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });
    h.run(&BindTexture {
        target: GL_TEXTURE_CUBE_MAP,
        texture: 1,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert_eq!(h.get_integer(GL_TEXTURE_BINDING_CUBE_MAP), 0);
    assert_eq!(h.get_integer(GL_TEXTURE_BINDING_2D), 1);
}

#[test]
fn active_texture_is_bounded_by_unit_count() {
    let mut h = Harness::new();
    h.run(&ActiveTexture {
        texture: GL_TEXTURE0 + 3,
    });
    assert_eq!(h.get_integer(GL_ACTIVE_TEXTURE), (GL_TEXTURE0 + 3) as i32);
    assert_eq!(h.gl.active_texture_unit(), 3);

    h.run(&ActiveTexture {
        texture: GL_TEXTURE0 + 8,
    });
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);
    assert_eq!(h.get_integer(GL_ACTIVE_TEXTURE), (GL_TEXTURE0 + 3) as i32);
}

#[test]
fn parameters_are_validated_and_shadowed() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });
    h.run(&TexParameteri {
        target: GL_TEXTURE_2D,
        pname: GL_TEXTURE_MIN_FILTER,
        param: GL_LINEAR as i32,
    });
    h.run(&TexParameteri {
        target: GL_TEXTURE_2D,
        pname: GL_TEXTURE_WRAP_S,
        param: GL_LINEAR as i32,
    });
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);

    h.write_u32(DATA, 0);
    h.run(&GetTexParameteriv {
        target: GL_TEXTURE_2D,
        pname: GL_TEXTURE_MIN_FILTER,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    assert_eq!(h.read_sized_result(DATA), vec![GL_LINEAR]);
    h.write_u32(DATA, 0);
    h.run(&GetTexParameteriv {
        target: GL_TEXTURE_2D,
        pname: GL_TEXTURE_WRAP_S,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    assert_eq!(h.read_sized_result(DATA), vec![GL_REPEAT]);
}

#[test]
fn generate_mipmap_completes_the_chain() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 1,
    });
    h.run(&GenerateMipmap {
        target: GL_TEXTURE_2D,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.tex_image_rgba(0, 4, 4, [1, 2, 3, 4]);
    h.run(&GenerateMipmap {
        target: GL_TEXTURE_2D,
    });
    h.assert_no_error();
    assert_eq!(level_param(&mut h, 2, GL_TEXTURE_WIDTH), vec![1]);
    let texture = h.decoder.group().textures.get(1).expect("texture 1");
    assert!(texture.state().can_render(false));
}

#[test]
fn deleting_a_bound_texture_falls_back_to_default() {
    let mut h = Harness::new();
    h.gen_texture(7);
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 7,
    });
    h.run_with_data(&DeleteTexturesImmediate { n: 1 }, &7u32.to_ne_bytes());
    assert_eq!(h.get_integer(GL_TEXTURE_BINDING_2D), 0);
    assert!(!h.decoder.group().textures.contains(7));

    // The id is free again.
    h.gen_texture(7);
    h.assert_no_error();
}

#[test]
fn pixel_store_alignment_must_be_a_power_of_two() {
    let mut h = Harness::new();
    h.run(&PixelStorei {
        pname: GL_UNPACK_ALIGNMENT,
        param: 2,
    });
    h.run(&PixelStorei {
        pname: GL_PACK_ALIGNMENT,
        param: 3,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    assert_eq!(h.get_integer(GL_UNPACK_ALIGNMENT), 2);
    assert_eq!(h.get_integer(GL_PACK_ALIGNMENT), 4);
}
