//! Command framing: headers, arity descriptors and stream parsing.
//!
//! A command is a run of 4-byte entries. The first entry packs the total size (in entries,
//! header included) and the opcode; the remaining `size - 1` entries are the arguments, followed
//! by inline data for "immediate" variants.

use bytemuck::Pod;

pub type CmdWord = u32;

/// Bytes per command buffer entry.
pub const ENTRY_SIZE: u32 = 4;

/// Opcodes below this value belong to the common (non-GL) command set.
pub const FIRST_GLES2_COMMAND: u32 = 256;

const SIZE_BITS: u32 = 21;
const COMMAND_BITS: u32 = 11;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandHeader {
    /// Total size of the command in entries, header included.
    pub size: u32,
    pub command: u32,
}

impl CommandHeader {
    pub const MAX_SIZE: u32 = (1 << SIZE_BITS) - 1;
    pub const MAX_COMMAND: u32 = (1 << COMMAND_BITS) - 1;

    pub fn new(command: u32, size: u32) -> Self {
        debug_assert!(size <= Self::MAX_SIZE);
        debug_assert!(command <= Self::MAX_COMMAND);
        Self { size, command }
    }

    pub fn from_word(word: CmdWord) -> Self {
        Self {
            size: word & Self::MAX_SIZE,
            command: word >> SIZE_BITS,
        }
    }

    pub fn to_word(self) -> CmdWord {
        (self.size & Self::MAX_SIZE) | ((self.command & Self::MAX_COMMAND) << SIZE_BITS)
    }

    /// Number of argument entries following the header.
    pub fn arg_count(self) -> u32 {
        self.size.saturating_sub(1)
    }
}

/// Whether a command takes exactly its declared number of arguments or at least that many
/// (with the remainder carrying immediate data).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgFlags {
    Fixed,
    AtLeastN,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub arg_flags: ArgFlags,
    pub arg_count: u32,
}

impl CommandInfo {
    /// Checks a received argument count against the declared arity and returns the number of
    /// immediate data bytes that trail the fixed arguments.
    pub fn immediate_data_size(&self, arg_count: u32) -> Option<u32> {
        let ok = match self.arg_flags {
            ArgFlags::Fixed => arg_count == self.arg_count,
            ArgFlags::AtLeastN => arg_count >= self.arg_count,
        };
        if !ok {
            return None;
        }
        (arg_count - self.arg_count).checked_mul(ENTRY_SIZE)
    }
}

/// A fixed-layout command. Implementors are `#[repr(C)]` structs made only of 4-byte fields so
/// the struct maps one field per entry.
pub trait Command: Pod {
    const OPCODE: u32;
    const NAME: &'static str;
    const ARG_FLAGS: ArgFlags;
    const ARG_COUNT: u32 = (core::mem::size_of::<Self>() / ENTRY_SIZE as usize) as u32;

    fn info() -> CommandInfo {
        CommandInfo {
            arg_flags: Self::ARG_FLAGS,
            arg_count: Self::ARG_COUNT,
        }
    }

    /// Reads the fixed arguments out of `args`. Returns `None` when fewer entries than the
    /// declared arity are present.
    fn from_args(args: &[CmdWord]) -> Option<Self> {
        let fixed = args.get(..Self::ARG_COUNT as usize)?;
        Some(bytemuck::pod_read_unaligned(bytemuck::cast_slice(fixed)))
    }
}

#[derive(Debug)]
pub struct CmdPacket<'a> {
    pub header: CommandHeader,
    /// Offset of the header entry within the stream.
    pub at_word: usize,
    pub args: &'a [CmdWord],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdParseError {
    ZeroSize {
        at_word: usize,
    },
    TruncatedArgs {
        command: u32,
        size: u32,
        remaining_words: usize,
        at_word: usize,
    },
}

impl std::fmt::Display for CmdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CmdParseError::ZeroSize { at_word } => {
                write!(f, "zero-sized command header at word {at_word}")
            }
            CmdParseError::TruncatedArgs {
                command,
                size,
                remaining_words,
                at_word,
            } => write!(
                f,
                "truncated command {command:#x} at word {at_word}: size {size} entries, only {remaining_words} remaining"
            ),
        }
    }
}

impl std::error::Error for CmdParseError {}

/// Splits a buffer of entries into commands. Stops yielding after the first error.
pub struct CmdStream<'a> {
    words: &'a [CmdWord],
    cursor: usize,
    failed: bool,
}

impl<'a> CmdStream<'a> {
    pub fn new(words: &'a [CmdWord]) -> Self {
        Self {
            words,
            cursor: 0,
            failed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failed || self.cursor >= self.words.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for CmdStream<'a> {
    type Item = Result<CmdPacket<'a>, CmdParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let at_word = self.cursor;
        let header = CommandHeader::from_word(self.words[at_word]);
        if header.size == 0 {
            self.failed = true;
            return Some(Err(CmdParseError::ZeroSize { at_word }));
        }

        let remaining = self.words.len() - at_word;
        let end = match at_word.checked_add(header.size as usize) {
            Some(end) if end <= self.words.len() => end,
            _ => {
                self.failed = true;
                return Some(Err(CmdParseError::TruncatedArgs {
                    command: header.command,
                    size: header.size,
                    remaining_words: remaining,
                    at_word,
                }));
            }
        };

        self.cursor = end;
        Some(Ok(CmdPacket {
            header,
            at_word,
            args: &self.words[at_word + 1..end],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_size_in_low_bits() {
        let header = CommandHeader::new(300, 5);
        let word = header.to_word();
        assert_eq!(word & CommandHeader::MAX_SIZE, 5);
        assert_eq!(word >> 21, 300);
        assert_eq!(CommandHeader::from_word(word), header);
        assert_eq!(header.arg_count(), 4);
    }

    #[test]
    fn fixed_arity_rejects_extra_args() {
        let info = CommandInfo {
            arg_flags: ArgFlags::Fixed,
            arg_count: 2,
        };
        assert_eq!(info.immediate_data_size(2), Some(0));
        assert_eq!(info.immediate_data_size(1), None);
        assert_eq!(info.immediate_data_size(3), None);
    }

    #[test]
    fn at_least_arity_reports_trailing_bytes() {
        let info = CommandInfo {
            arg_flags: ArgFlags::AtLeastN,
            arg_count: 2,
        };
        assert_eq!(info.immediate_data_size(1), None);
        assert_eq!(info.immediate_data_size(2), Some(0));
        assert_eq!(info.immediate_data_size(5), Some(12));
    }

    #[test]
    fn stream_splits_commands() {
        let words = [
            CommandHeader::new(256, 3).to_word(),
            1,
            2,
            CommandHeader::new(257, 1).to_word(),
        ];
        let packets: Vec<_> = CmdStream::new(&words)
            .collect::<Result<_, _>>()
            .expect("parse");
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].header.command, 256);
        assert_eq!(packets[0].args, &[1, 2]);
        assert_eq!(packets[1].at_word, 3);
        assert!(packets[1].args.is_empty());
    }

    #[test]
    fn stream_reports_truncation_once() {
        let words = [CommandHeader::new(256, 4).to_word(), 1];
        let mut stream = CmdStream::new(&words);
        match stream.next() {
            Some(Err(CmdParseError::TruncatedArgs {
                size: 4,
                remaining_words: 2,
                at_word: 0,
                ..
            })) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn stream_rejects_zero_size() {
        let words = [0u32];
        let mut stream = CmdStream::new(&words);
        assert_eq!(
            stream.next().map(|r| r.map(|p| p.at_word)),
            Some(Err(CmdParseError::ZeroSize { at_word: 0 }))
        );
    }
}
