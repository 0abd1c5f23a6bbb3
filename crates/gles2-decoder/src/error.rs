use bitflags::bitflags;
use gles2_cmd::gl::*;
use gles2_cmd::CmdParseError;

/// Outcome of a command other than success. Every variant aborts the offending command only;
/// none of them leave shadow state partially updated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CmdError {
    #[error("unknown command {0:#x}")]
    UnknownCommand(u32),
    #[error("invalid arguments")]
    InvalidArguments,
    #[error("shared memory or bucket access out of bounds")]
    OutOfBounds,
    #[error("invalid size")]
    InvalidSize,
    #[error("context lost")]
    LostContext,
}

pub type DecodeResult = Result<(), CmdError>;

/// Why [`decode_stream`](crate::GlesDecoder::decode_stream) stopped early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Parse(#[from] CmdParseError),
    #[error("command {opcode:#x} at word {at_word} failed: {error}")]
    Command {
        opcode: u32,
        at_word: usize,
        error: CmdError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("could not make the context current")]
    MakeCurrentFailed,
    #[error("parent texture id {0} is already in use")]
    ParentTextureIdInUse(u32),
    #[error("parent decoder has been destroyed")]
    ParentGone,
    #[error("offscreen target is incomplete (status {0:#x})")]
    OffscreenIncomplete(u32),
    #[error("decoder is already initialized")]
    AlreadyInitialized,
}

/// Client-visible GL error raised by validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
    InvalidFramebufferOperation,
}

impl GlError {
    pub fn from_gl(code: GLenum) -> Option<Self> {
        Some(match code {
            GL_INVALID_ENUM => Self::InvalidEnum,
            GL_INVALID_VALUE => Self::InvalidValue,
            GL_INVALID_OPERATION => Self::InvalidOperation,
            GL_OUT_OF_MEMORY => Self::OutOfMemory,
            GL_INVALID_FRAMEBUFFER_OPERATION => Self::InvalidFramebufferOperation,
            _ => return None,
        })
    }

    pub fn to_gl(self) -> GLenum {
        match self {
            Self::InvalidEnum => GL_INVALID_ENUM,
            Self::InvalidValue => GL_INVALID_VALUE,
            Self::InvalidOperation => GL_INVALID_OPERATION,
            Self::OutOfMemory => GL_OUT_OF_MEMORY,
            Self::InvalidFramebufferOperation => GL_INVALID_FRAMEBUFFER_OPERATION,
        }
    }

    pub fn bit(self) -> ErrorBits {
        match self {
            Self::InvalidEnum => ErrorBits::INVALID_ENUM,
            Self::InvalidValue => ErrorBits::INVALID_VALUE,
            Self::InvalidOperation => ErrorBits::INVALID_OPERATION,
            Self::OutOfMemory => ErrorBits::OUT_OF_MEMORY,
            Self::InvalidFramebufferOperation => ErrorBits::INVALID_FRAMEBUFFER_OPERATION,
        }
    }
}

bitflags! {
    /// Pending client-visible errors, one bit per GL error code as GL itself keeps them.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ErrorBits: u32 {
        const INVALID_ENUM = 1 << 0;
        const INVALID_VALUE = 1 << 1;
        const INVALID_OPERATION = 1 << 2;
        const OUT_OF_MEMORY = 1 << 3;
        const INVALID_FRAMEBUFFER_OPERATION = 1 << 4;
    }
}

impl ErrorBits {
    /// Records a raw GL error code. Unknown codes are ignored.
    pub fn record(&mut self, code: GLenum) {
        if let Some(err) = GlError::from_gl(code) {
            self.insert(err.bit());
        }
    }

    /// Removes and returns the lowest pending error.
    pub fn take_one(&mut self) -> Option<GlError> {
        let err = [
            GlError::InvalidEnum,
            GlError::InvalidValue,
            GlError::InvalidOperation,
            GlError::OutOfMemory,
            GlError::InvalidFramebufferOperation,
        ]
        .into_iter()
        .find(|err| self.contains(err.bit()))?;
        self.remove(err.bit());
        Some(err)
    }
}
