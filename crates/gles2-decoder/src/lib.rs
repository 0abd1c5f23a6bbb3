//! Service side of the GLES2 command buffer.
//!
//! A [`GlesDecoder`] takes command entries written by an untrusted client, validates every
//! argument and shared-memory reference, keeps a shadow of the GL state the client can observe,
//! and replays the surviving calls against a [`GlApi`] backend. Client-visible GL errors are
//! synthesized from the shadow; protocol violations surface as [`CmdError`].
//!
//! Decoders created over the same [`ContextGroup`] share object tables and id namespaces, like
//! GL share groups. [`SoftGl`] is an in-memory backend used by the tests and the fuzz target.

mod bucket;
mod common;
mod decoder;
mod guards;
mod state;
mod validators;

pub mod config;
pub mod context_group;
pub mod error;
pub mod gl_api;
pub mod id_allocator;
pub mod resources;
pub mod shared_memory;
pub mod soft_gl;
pub mod translator;
pub mod vertex_attrib;

pub use bucket::Bucket;
pub use common::CommonDecoder;
pub use config::{DecoderConfig, FeatureInfo, Limits};
pub use context_group::ContextGroup;
pub use decoder::{GlesDecoder, OffscreenPhase, ParentHandle};
pub use error::{CmdError, DecodeResult, ErrorBits, GlError, InitError, StreamError};
pub use gl_api::{ActiveVariable, GlApi, GlCapabilities, ServiceId, Size};
pub use shared_memory::{
    CommandBufferEngine, SharedMemory, SharedMemoryError, SharedMemoryRegistry, VecSharedMemory,
};
pub use soft_gl::{ClearRecord, DrawRecord, SoftGl, SoftGlBuilder};
pub use state::{ContextState, TextureUnit};
pub use translator::ShaderTranslator;
