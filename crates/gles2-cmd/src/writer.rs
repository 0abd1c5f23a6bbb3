use crate::cmd::{CmdWord, Command, CommandHeader};

/// Builds a command stream on the client side.
#[derive(Debug, Default)]
pub struct CmdWriter {
    words: Vec<CmdWord>,
}

impl CmdWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[CmdWord] {
        &self.words
    }

    pub fn finish(self) -> Vec<CmdWord> {
        self.words
    }

    /// Appends a fixed-size command.
    pub fn push<C: Command>(&mut self, cmd: &C) {
        self.push_with_data(cmd, &[]);
    }

    /// Appends a command followed by `data` as immediate payload, zero padded to whole entries.
    pub fn push_with_data<C: Command>(&mut self, cmd: &C, data: &[u8]) {
        let fixed = bytemuck::bytes_of(cmd);
        let data_words = data.len().div_ceil(4);
        let size = 1 + C::ARG_COUNT as usize + data_words;
        self.words
            .push(CommandHeader::new(C::OPCODE, size as u32).to_word());
        push_bytes(&mut self.words, fixed);
        push_bytes(&mut self.words, data);
    }

    /// Appends an arbitrary header and argument words, bypassing the typed structs. Used to
    /// produce malformed commands.
    pub fn push_raw(&mut self, opcode: u32, args: &[CmdWord]) {
        self.words
            .push(CommandHeader::new(opcode, 1 + args.len() as u32).to_word());
        self.words.extend_from_slice(args);
    }
}

fn push_bytes(words: &mut Vec<CmdWord>, bytes: &[u8]) {
    for chunk in bytes.chunks(4) {
        let mut tmp = [0u8; 4];
        tmp[..chunk.len()].copy_from_slice(chunk);
        words.push(u32::from_ne_bytes(tmp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::CmdStream;
    use crate::gles2::{BindBuffer, ShaderSourceImmediate};
    use crate::gl::GL_ARRAY_BUFFER;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_command_layout() {
        let mut w = CmdWriter::new();
        w.push(&BindBuffer {
            target: GL_ARRAY_BUFFER,
            buffer: 7,
        });
        let words = w.finish();
        assert_eq!(words.len(), 3);
        let header = CommandHeader::from_word(words[0]);
        assert_eq!(header.command, BindBuffer::OPCODE);
        assert_eq!(header.size, 3);
        assert_eq!(&words[1..], &[GL_ARRAY_BUFFER, 7]);
    }

    #[test]
    fn immediate_payload_is_padded() {
        let mut w = CmdWriter::new();
        let src = b"void main(){}";
        w.push_with_data(
            &ShaderSourceImmediate {
                shader: 1,
                data_size: src.len() as u32,
            },
            src,
        );
        let words = w.finish();
        let packets: Vec<_> = CmdStream::new(&words)
            .collect::<Result<_, _>>()
            .expect("parse");
        assert_eq!(packets.len(), 1);
        // 2 fixed args + ceil(13 / 4) data words.
        assert_eq!(packets[0].args.len(), 2 + 4);
        let data: &[u8] = bytemuck::cast_slice(&packets[0].args[2..]);
        assert_eq!(&data[..src.len()], src);
        assert_eq!(&data[src.len()..], &[0, 0, 0]);
    }
}
