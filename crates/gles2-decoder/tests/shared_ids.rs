mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::{CmdError, Size};
use pretty_assertions::assert_eq;

fn gen_shared(h: &mut Harness, namespace_id: u32, id_offset: u32, n: i32) -> Vec<u32> {
    h.run(&GenSharedIds {
        namespace_id,
        id_offset,
        n,
        ids_shm_id: SHM,
        ids_shm_offset: DATA,
    });
    (0..n as u32).map(|i| h.read_u32(DATA + i * 4)).collect()
}

fn register_shared(h: &mut Harness, namespace_id: u32, ids: &[u32]) {
    h.write_bytes(DATA, bytemuck::cast_slice(ids));
    h.run(&RegisterSharedIds {
        namespace_id,
        n: ids.len() as i32,
        ids_shm_id: SHM,
        ids_shm_offset: DATA,
    });
}

fn delete_shared(h: &mut Harness, namespace_id: u32, ids: &[u32]) {
    h.write_bytes(DATA, bytemuck::cast_slice(ids));
    h.run(&DeleteSharedIds {
        namespace_id,
        n: ids.len() as i32,
        ids_shm_id: SHM,
        ids_shm_offset: DATA,
    });
}

#[test]
fn generated_ids_skip_ones_in_use() {
    let mut h = Harness::new();
    h.gen_buffer(3);
    assert_eq!(gen_shared(&mut h, id_namespaces::BUFFERS, 0, 3), vec![1, 2, 4]);
    assert_eq!(gen_shared(&mut h, id_namespaces::BUFFERS, 10, 2), vec![10, 11]);
    // Other namespaces are untouched.
    assert_eq!(gen_shared(&mut h, id_namespaces::TEXTURES, 0, 1), vec![1]);
}

#[test]
fn deleted_ids_are_handed_out_again() {
    let mut h = Harness::new();
    let ids = gen_shared(&mut h, id_namespaces::RENDERBUFFERS, 0, 2);
    delete_shared(&mut h, id_namespaces::RENDERBUFFERS, &ids[..1]);
    assert_eq!(gen_shared(&mut h, id_namespaces::RENDERBUFFERS, 0, 1), vec![ids[0]]);
}

#[test]
fn register_is_all_or_nothing() {
    let mut h = Harness::new();
    register_shared(&mut h, id_namespaces::FRAMEBUFFERS, &[4]);
    h.assert_no_error();

    register_shared(&mut h, id_namespaces::FRAMEBUFFERS, &[5, 4]);
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    // 5 was rolled back.
    register_shared(&mut h, id_namespaces::FRAMEBUFFERS, &[5]);
    h.assert_no_error();
}

#[test]
fn bad_namespace_and_counts() {
    let mut h = Harness::new();
    gen_shared(&mut h, id_namespaces::COUNT, 0, 1);
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);

    h.run(&GenSharedIds {
        namespace_id: id_namespaces::BUFFERS,
        id_offset: 0,
        n: -1,
        ids_shm_id: SHM,
        ids_shm_offset: DATA,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    let result = h.exec(&GenSharedIds {
        namespace_id: id_namespaces::BUFFERS,
        id_offset: 0,
        n: 4,
        ids_shm_id: SHM,
        ids_shm_offset: SHM_SIZE as u32 - 8,
    });
    assert_eq!(result, Err(CmdError::OutOfBounds));
    // Nothing was reserved by the failed command.
    assert_eq!(gen_shared(&mut h, id_namespaces::BUFFERS, 0, 1), vec![1]);
}

#[test]
fn decoders_in_one_group_share_namespaces() {
    let mut first = Harness::new();
    let mut second = Harness::with_group(first.gl.shared_context(), first.decoder.group().clone());
    second
        .decoder
        .initialize(Size::new(1, 1), None, 0)
        .expect("second decoder initializes");

    assert_eq!(gen_shared(&mut first, id_namespaces::TEXTURES, 0, 2), vec![1, 2]);
    assert_eq!(gen_shared(&mut second, id_namespaces::TEXTURES, 0, 1), vec![3]);

    // Objects created through one decoder are visible to the other.
    first.gen_buffer(7);
    assert!(second.decoder.group().buffers.contains(7));
    let result = second.exec_with_data(&GenBuffersImmediate { n: 1 }, &7u32.to_ne_bytes());
    assert_eq!(result, Err(CmdError::InvalidArguments));
}
