#![allow(dead_code)]

use std::rc::Rc;

use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_cmd::writer::CmdWriter;
use gles2_cmd::{CmdWord, Command, CommandHeader};
use gles2_decoder::{
    CmdError, ContextGroup, DecodeResult, DecoderConfig, GlApi, GlesDecoder, SharedMemory,
    SharedMemoryRegistry, SoftGl, Size, VecSharedMemory,
};

pub const SHM: u32 = 1;
pub const SHM_SIZE: usize = 1 << 16;
/// Offset of the scratch result slot.
pub const RESULT: u32 = 0;
/// Offset of the scratch data area.
pub const DATA: u32 = 256;

pub const VS: &str = "attribute vec4 a_position;\nuniform mat4 u_mvp;\nvoid main() { gl_Position = u_mvp * a_position; }";
pub const FS: &str = "precision mediump float;\nuniform sampler2D u_tex;\nuniform vec4 u_tint[2];\nvoid main() { gl_FragColor = u_tint[0]; }";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A decoder over [`SoftGl`] with one registered shared memory region.
pub struct Harness {
    pub decoder: GlesDecoder,
    /// Shares state with the decoder's backend.
    pub gl: SoftGl,
    pub shm: Rc<VecSharedMemory>,
    pub engine: Rc<SharedMemoryRegistry>,
}

impl Harness {
    /// An initialized offscreen decoder of size 4x4.
    pub fn new() -> Self {
        Self::with_gl(SoftGl::new_offscreen(), Size::new(4, 4))
    }

    pub fn with_gl(gl: SoftGl, size: Size) -> Self {
        let mut h = Self::uninitialized(gl);
        h.decoder
            .initialize(size, None, 0)
            .expect("decoder initializes");
        h
    }

    pub fn uninitialized(gl: SoftGl) -> Self {
        let group = ContextGroup::new(&gl.capabilities());
        Self::with_group(gl, group)
    }

    pub fn with_group(gl: SoftGl, group: Rc<ContextGroup>) -> Self {
        init_tracing();
        let shm = Rc::new(VecSharedMemory::new(SHM_SIZE));
        let engine = Rc::new(SharedMemoryRegistry::new());
        engine.register(SHM, shm.clone());
        let decoder = GlesDecoder::new(
            Box::new(gl.clone()),
            group,
            engine.clone(),
            DecoderConfig::default(),
        );
        Self {
            decoder,
            gl,
            shm,
            engine,
        }
    }

    pub fn exec<C: Command>(&mut self, cmd: &C) -> DecodeResult {
        self.exec_with_data(cmd, &[])
    }

    pub fn exec_with_data<C: Command>(&mut self, cmd: &C, data: &[u8]) -> DecodeResult {
        let mut writer = CmdWriter::new();
        writer.push_with_data(cmd, data);
        self.exec_words(&writer.finish())
    }

    /// Executes a single encoded command, header included.
    pub fn exec_words(&mut self, words: &[CmdWord]) -> DecodeResult {
        let header = CommandHeader::from_word(words[0]);
        self.decoder
            .decode_command(header.command, header.arg_count(), &words[1..])
    }

    pub fn run<C: Command>(&mut self, cmd: &C) {
        self.exec(cmd)
            .unwrap_or_else(|e| panic!("{} failed: {e}", C::NAME));
    }

    pub fn run_with_data<C: Command>(&mut self, cmd: &C, data: &[u8]) {
        self.exec_with_data(cmd, data)
            .unwrap_or_else(|e| panic!("{} failed: {e}", C::NAME));
    }

    /// Pops one error through `GetError`, as a client would.
    pub fn gl_error(&mut self) -> GLenum {
        self.run(&GetError {
            result_shm_id: SHM,
            result_shm_offset: RESULT,
        });
        self.read_u32(RESULT)
    }

    pub fn assert_no_error(&mut self) {
        let err = self.gl_error();
        assert_eq!(err, GL_NO_ERROR, "unexpected GL error {err:#x}: {:?}", self.decoder.last_error_message());
    }

    pub fn read_u32(&self, offset: u32) -> u32 {
        let mut bytes = [0u8; 4];
        self.shm
            .read(offset as usize, &mut bytes)
            .expect("offset in range");
        u32::from_ne_bytes(bytes)
    }

    pub fn read_i32(&self, offset: u32) -> i32 {
        self.read_u32(offset) as i32
    }

    pub fn write_u32(&self, offset: u32, value: u32) {
        self.shm
            .write(offset as usize, &value.to_ne_bytes())
            .expect("offset in range");
    }

    pub fn read_bytes(&self, offset: u32, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.shm
            .read(offset as usize, &mut bytes)
            .expect("range in bounds");
        bytes
    }

    pub fn write_bytes(&self, offset: u32, bytes: &[u8]) {
        self.shm
            .write(offset as usize, bytes)
            .expect("range in bounds");
    }

    /// Values of a sized result at `offset`: a count followed by that many words.
    pub fn read_sized_result(&self, offset: u32) -> Vec<u32> {
        let count = self.read_u32(offset);
        (0..count).map(|i| self.read_u32(offset + 4 + i * 4)).collect()
    }

    pub fn bucket_string(&self, bucket_id: u32) -> Option<String> {
        self.decoder
            .common()
            .bucket(bucket_id)
            .and_then(|b| b.as_string())
    }

    pub fn get_integer(&mut self, pname: GLenum) -> i32 {
        self.write_u32(RESULT, 0);
        self.run(&GetIntegerv {
            pname,
            params_shm_id: SHM,
            params_shm_offset: RESULT,
        });
        self.read_i32(RESULT + 4)
    }

    pub fn gen_buffer(&mut self, id: u32) {
        self.run_with_data(&GenBuffersImmediate { n: 1 }, &id.to_ne_bytes());
    }

    pub fn bind_buffer(&mut self, target: GLenum, id: u32) {
        self.run(&BindBuffer { target, buffer: id });
    }

    pub fn buffer_data(&mut self, target: GLenum, data: &[u8]) {
        self.run_with_data(
            &BufferDataImmediate {
                target,
                size: data.len() as i32,
                usage: GL_STATIC_DRAW,
            },
            data,
        );
    }

    pub fn gen_texture(&mut self, id: u32) {
        self.run_with_data(&GenTexturesImmediate { n: 1 }, &id.to_ne_bytes());
    }

    /// Uploads a `width` x `height` RGBA level filled with `rgba` to the bound 2D texture.
    pub fn tex_image_rgba(&mut self, level: i32, width: i32, height: i32, rgba: [u8; 4]) {
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        self.run_with_data(
            &TexImage2DImmediate {
                target: GL_TEXTURE_2D,
                level,
                internalformat: GL_RGBA as i32,
                width,
                height,
                border: 0,
                format: GL_RGBA,
                ty: GL_UNSIGNED_BYTE,
            },
            &pixels,
        );
    }

    pub fn shader(&mut self, id: u32, ty: GLenum, source: &str) {
        self.run(&CreateShader { ty, client_id: id });
        self.run_with_data(
            &ShaderSourceImmediate {
                shader: id,
                data_size: source.len() as u32,
            },
            source.as_bytes(),
        );
        self.run(&CompileShader { shader: id });
    }

    /// Creates, compiles and links program `id` from shaders `id + 1` and `id + 2`.
    pub fn program(&mut self, id: u32, vs: &str, fs: &str) {
        self.shader(id + 1, GL_VERTEX_SHADER, vs);
        self.shader(id + 2, GL_FRAGMENT_SHADER, fs);
        self.run(&CreateProgram { client_id: id });
        self.run(&AttachShader {
            program: id,
            shader: id + 1,
        });
        self.run(&AttachShader {
            program: id,
            shader: id + 2,
        });
        self.run(&LinkProgram { program: id });
    }

    pub fn uniform_location(&mut self, program: u32, name: &str) -> i32 {
        self.write_u32(RESULT, u32::MAX);
        self.run_with_data(
            &GetUniformLocationImmediate {
                program,
                location_shm_id: SHM,
                location_shm_offset: RESULT,
                data_size: name.len() as u32,
            },
            name.as_bytes(),
        );
        self.read_i32(RESULT)
    }

    pub fn attrib_location(&mut self, program: u32, name: &str) -> i32 {
        self.write_u32(RESULT, u32::MAX);
        self.run_with_data(
            &GetAttribLocationImmediate {
                program,
                location_shm_id: SHM,
                location_shm_offset: RESULT,
                data_size: name.len() as u32,
            },
            name.as_bytes(),
        );
        self.read_i32(RESULT)
    }

    /// Points attribute `index` at buffer `id` holding `vertices` tightly packed vec4s.
    pub fn vec4_array(&mut self, index: u32, id: u32, vertices: usize) {
        self.bind_buffer(GL_ARRAY_BUFFER, id);
        self.buffer_data(GL_ARRAY_BUFFER, &vec![0u8; vertices * 16]);
        self.run(&VertexAttribPointer {
            indx: index,
            size: 4,
            ty: GL_FLOAT,
            normalized: 0,
            stride: 0,
            offset: 0,
        });
        self.run(&EnableVertexAttribArray { index });
    }

    pub fn draw_arrays(&mut self, first: i32, count: i32) -> DecodeResult {
        self.exec(&DrawArrays {
            mode: GL_TRIANGLES,
            first,
            count,
        })
    }
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

pub fn expect_cmd_error(result: DecodeResult, expected: CmdError) {
    assert_eq!(result, Err(expected));
}
