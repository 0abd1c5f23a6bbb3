#![no_main]

use gles2_cmd::cmd::{CmdStream, CmdWord};
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_LEN: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_LEN)];
    let words: Vec<CmdWord> = data
        .chunks_exact(4)
        .map(|c| CmdWord::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mut stream = CmdStream::new(&words);
    let mut expected_at = 0usize;
    for packet in stream.by_ref() {
        let Ok(packet) = packet else {
            break;
        };
        // Packets tile the buffer with no gaps or overlap.
        assert_eq!(packet.at_word, expected_at);
        assert_eq!(packet.args.len(), packet.header.arg_count() as usize);
        expected_at += packet.header.size as usize;
    }
    assert!(stream.position() <= words.len());
    assert!(stream.next().is_none());
});
