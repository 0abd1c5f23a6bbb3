mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::CmdError;
use pretty_assertions::assert_eq;

#[test]
fn bind_creates_unknown_ids_and_uploads_data() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 3);
    h.buffer_data(GL_ARRAY_BUFFER, &[1, 2, 3, 4, 5, 6, 7, 8]);
    h.assert_no_error();

    let buffer = h.decoder.group().buffers.get(3).expect("created by bind");
    assert_eq!(buffer.state().size(), 8);
    assert_eq!(
        h.gl.buffer_contents(buffer.service_id()),
        Some(vec![1, 2, 3, 4, 5, 6, 7, 8])
    );
    assert_eq!(h.get_integer(GL_ARRAY_BUFFER_BINDING), 3);
    assert_eq!(h.gl.buffer_binding(GL_ARRAY_BUFFER), buffer.service_id());
}

#[test]
fn buffers_stay_on_their_first_target() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.bind_buffer(GL_ELEMENT_ARRAY_BUFFER, 1);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
    assert_eq!(h.get_integer(GL_ELEMENT_ARRAY_BUFFER_BINDING), 0);
}

#[test]
fn buffer_data_without_binding_is_invalid_operation() {
    let mut h = Harness::new();
    h.buffer_data(GL_ARRAY_BUFFER, &[0; 4]);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.run_with_data(
        &BufferDataImmediate {
            target: GL_ARRAY_BUFFER,
            size: 4,
            usage: GL_TEXTURE_2D,
        },
        &[0; 4],
    );
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);
}

#[test]
fn sub_data_must_fit_the_store() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.buffer_data(GL_ARRAY_BUFFER, &[0; 8]);

    h.run_with_data(
        &BufferSubDataImmediate {
            target: GL_ARRAY_BUFFER,
            offset: 4,
            size: 4,
        },
        &[9, 9, 9, 9],
    );
    h.assert_no_error();
    let service_id = h.gl.buffer_binding(GL_ARRAY_BUFFER);
    assert_eq!(h.gl.buffer_contents(service_id), Some(vec![0, 0, 0, 0, 9, 9, 9, 9]));

    h.run_with_data(
        &BufferSubDataImmediate {
            target: GL_ARRAY_BUFFER,
            offset: 6,
            size: 4,
        },
        &[1, 1, 1, 1],
    );
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    assert_eq!(h.gl.buffer_contents(service_id), Some(vec![0, 0, 0, 0, 9, 9, 9, 9]));
}

#[test]
fn buffer_data_from_shared_memory_and_null() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.write_bytes(DATA, &[7; 12]);
    h.run(&BufferData {
        target: GL_ARRAY_BUFFER,
        size: 12,
        data_shm_id: SHM,
        data_shm_offset: DATA,
        usage: GL_DYNAMIC_DRAW,
    });
    let service_id = h.gl.buffer_binding(GL_ARRAY_BUFFER);
    assert_eq!(h.gl.buffer_contents(service_id), Some(vec![7; 12]));

    h.run(&BufferData {
        target: GL_ARRAY_BUFFER,
        size: 6,
        data_shm_id: 0,
        data_shm_offset: 0,
        usage: GL_DYNAMIC_DRAW,
    });
    assert_eq!(h.gl.buffer_contents(service_id), Some(vec![0; 6]));

    let result = h.exec(&BufferData {
        target: GL_ARRAY_BUFFER,
        size: 16,
        data_shm_id: SHM,
        data_shm_offset: SHM_SIZE as u32 - 8,
        usage: GL_DYNAMIC_DRAW,
    });
    assert_eq!(result, Err(CmdError::OutOfBounds));
    h.assert_no_error();
}

#[test]
fn oversized_shared_memory_sources_are_out_of_bounds() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.buffer_data(GL_ARRAY_BUFFER, &[5; 4]);
    let result = h.exec(&BufferData {
        target: GL_ARRAY_BUFFER,
        size: i32::MAX,
        data_shm_id: SHM,
        data_shm_offset: DATA,
        usage: GL_STATIC_DRAW,
    });
    assert_eq!(result, Err(CmdError::OutOfBounds));
    h.assert_no_error();
    let service_id = h.gl.buffer_binding(GL_ARRAY_BUFFER);
    assert_eq!(h.gl.buffer_contents(service_id), Some(vec![5; 4]));
}

#[test]
fn deleted_buffers_read_back_as_unbound() {
    let mut h = Harness::new();
    h.gen_buffer(4);
    h.bind_buffer(GL_ARRAY_BUFFER, 4);
    let service_id = h.gl.buffer_binding(GL_ARRAY_BUFFER);
    h.run_with_data(&DeleteBuffersImmediate { n: 1 }, &4u32.to_ne_bytes());

    assert_eq!(h.get_integer(GL_ARRAY_BUFFER_BINDING), 0);
    assert_eq!(h.gl.buffer_contents(service_id), None);

    h.run(&IsBuffer {
        buffer: 4,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.read_u32(DATA), 0);
    h.assert_no_error();
}

#[test]
fn generating_an_id_in_use_fails_the_whole_command() {
    let mut h = Harness::new();
    h.gen_buffer(2);
    let ids = [1u32, 2];
    let result = h.exec_with_data(&GenBuffersImmediate { n: 2 }, bytemuck::cast_slice(&ids));
    assert_eq!(result, Err(CmdError::InvalidArguments));
    assert!(!h.decoder.group().buffers.contains(1));

    let result = h.exec_with_data(&GenBuffersImmediate { n: 1 }, &0u32.to_ne_bytes());
    assert_eq!(result, Err(CmdError::InvalidArguments));
}

#[test]
fn buffer_parameters_come_from_the_shadow() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.buffer_data(GL_ARRAY_BUFFER, &[0; 20]);
    h.write_u32(DATA, 0);
    h.run(&GetBufferParameteriv {
        target: GL_ARRAY_BUFFER,
        pname: GL_BUFFER_SIZE,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    assert_eq!(h.read_sized_result(DATA), vec![20]);

    h.write_u32(DATA, 0);
    h.run(&GetBufferParameteriv {
        target: GL_ARRAY_BUFFER,
        pname: GL_BUFFER_USAGE,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    assert_eq!(h.read_sized_result(DATA), vec![GL_STATIC_DRAW]);

    // A result slot that was not cleared is a protocol error.
    let result = h.exec(&GetBufferParameteriv {
        target: GL_ARRAY_BUFFER,
        pname: GL_BUFFER_SIZE,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    assert_eq!(result, Err(CmdError::InvalidArguments));
}

#[test]
fn max_value_in_element_buffer() {
    let mut h = Harness::new();
    h.bind_buffer(GL_ELEMENT_ARRAY_BUFFER, 1);
    let indices: [u16; 4] = [3, 9, 2, 5];
    h.buffer_data(GL_ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&indices));

    h.run(&GetMaxValueInBuffer {
        buffer_id: 1,
        count: 4,
        ty: GL_UNSIGNED_SHORT,
        offset: 0,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.read_u32(DATA), 9);

    h.run(&GetMaxValueInBuffer {
        buffer_id: 1,
        count: 2,
        ty: GL_UNSIGNED_SHORT,
        offset: 4,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.read_u32(DATA), 5);

    h.run(&GetMaxValueInBuffer {
        buffer_id: 1,
        count: 4,
        ty: GL_UNSIGNED_SHORT,
        offset: 2,
        result_shm_id: SHM,
        result_shm_offset: DATA,
    });
    assert_eq!(h.read_u32(DATA), 0);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
}
