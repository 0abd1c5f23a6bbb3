#![no_main]

use std::rc::Rc;

use arbitrary::{Arbitrary, Unstructured};
use gles2_cmd::cmd::ArgFlags;
use gles2_cmd::common::CommonCommandId;
use gles2_cmd::gles2::CommandId;
use gles2_cmd::writer::CmdWriter;
use gles2_decoder::{
    ContextGroup, DecoderConfig, GlApi, GlesDecoder, SharedMemoryRegistry, Size, SoftGl,
    StreamError, VecSharedMemory,
};
use libfuzzer_sys::fuzz_target;

/// Upper bound on the number of commands per testcase.
const MAX_COMMANDS: usize = 64;

/// Extra argument entries appended to variable-size commands.
const MAX_EXTRA_ARGS: usize = 16;

const SHM_ID: u32 = 1;
const SHM_SIZE: usize = 64 * 1024;

/// One well-framed command. Arguments are 16-bit so sizes, counts and offsets stay small enough
/// that a testcase never asks the backend for gigabytes.
#[derive(Debug)]
struct FuzzCommand {
    opcode: u32,
    args: Vec<u32>,
}

impl<'a> Arbitrary<'a> for FuzzCommand {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let (opcode, info) = if u.ratio(1, 8)? {
            let id = *u.choose(CommonCommandId::ALL)?;
            (id.opcode(), id.info())
        } else {
            let id = *u.choose(CommandId::ALL)?;
            (id.opcode(), id.info())
        };
        let extra = match info.arg_flags {
            ArgFlags::Fixed => 0,
            ArgFlags::AtLeastN => u.int_in_range(0..=MAX_EXTRA_ARGS)?,
        };
        let count = info.arg_count as usize + extra;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let arg = match u.int_in_range(0..=3u8)? {
                // Shared memory id, so offsets actually resolve.
                0 => SHM_ID,
                // Negative counts and sizes.
                1 => u32::from(u.arbitrary::<u8>()?).wrapping_neg(),
                _ => u32::from(u.arbitrary::<u16>()?),
            };
            args.push(arg);
        }
        Ok(Self { opcode, args })
    }
}

#[derive(Debug)]
struct Input {
    onscreen: bool,
    desktop_gl: bool,
    commands: Vec<FuzzCommand>,
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let onscreen = u.arbitrary()?;
        let desktop_gl = u.arbitrary()?;
        let len = u.int_in_range(0..=MAX_COMMANDS)?;
        let mut commands = Vec::with_capacity(len);
        for _ in 0..len {
            commands.push(u.arbitrary()?);
        }
        Ok(Self {
            onscreen,
            desktop_gl,
            commands,
        })
    }
}

fuzz_target!(|input: Input| {
    let mut builder = SoftGl::builder().desktop_gl(input.desktop_gl);
    if input.onscreen {
        builder = builder.offscreen(false).surface_size(Size::new(8, 8));
    }
    let gl = builder.build();
    // Keep the backend's allocations bounded regardless of what the stream requests.
    gl.set_memory_limit(Some(16 * 1024 * 1024));

    let engine = Rc::new(SharedMemoryRegistry::new());
    engine.register(SHM_ID, Rc::new(VecSharedMemory::new(SHM_SIZE)));
    let group = ContextGroup::new(&gl.capabilities());
    let mut decoder = GlesDecoder::new(
        Box::new(gl.clone()),
        group,
        engine,
        DecoderConfig::default(),
    );
    if decoder.initialize(Size::new(4, 4), None, 0).is_err() {
        return;
    }

    let mut w = CmdWriter::new();
    for cmd in &input.commands {
        w.push_raw(cmd.opcode, &cmd.args);
    }
    let words = w.finish();

    // Commands are framed by the writer, so only handler errors may stop the stream.
    match decoder.decode_stream(&words) {
        Ok(executed) => assert_eq!(executed, input.commands.len()),
        Err(StreamError::Command { at_word, .. }) => assert!(at_word < words.len()),
        Err(StreamError::Parse(err)) => panic!("writer produced an unparsable stream: {err}"),
    }

    decoder.destroy();
});
