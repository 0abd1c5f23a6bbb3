//! Decoder configuration and the feature set derived from backend capabilities.
//!
//! Diagnostics can be switched on without recompiling:
//! - `GLES2_DECODER_DEBUG=1` logs every decoded command and drains backend errors after each one.
//! - `GLES2_DECODER_LOG_GL_ERRORS=1` logs every GL error the decoder synthesizes.

use crate::gl_api::GlCapabilities;

pub(crate) const DEBUG_ENV: &str = "GLES2_DECODER_DEBUG";
pub(crate) const LOG_GL_ERRORS_ENV: &str = "GLES2_DECODER_LOG_GL_ERRORS";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    pub debug: bool,
    pub log_synthesized_gl_errors: bool,
}

impl DecoderConfig {
    /// Reads the diagnostic switches. `1`, `true`, `yes` and `on` enable one, in any case.
    pub fn from_env() -> Self {
        let enabled = |name: &str| {
            std::env::var(name).is_ok_and(|value| {
                let value = value.trim().to_ascii_lowercase();
                matches!(value.as_str(), "1" | "true" | "yes" | "on")
            })
        };
        Self {
            debug: enabled(DEBUG_ENV),
            log_synthesized_gl_errors: enabled(LOG_GL_ERRORS_ENV),
        }
    }
}

/// Implementation limits shared by every context of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_vertex_attribs: u32,
    pub max_texture_units: u32,
    pub max_texture_size: u32,
    pub max_cube_map_texture_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_varying_vectors: u32,
    pub max_vertex_uniform_vectors: u32,
    pub max_fragment_uniform_vectors: u32,
}

impl Limits {
    pub fn from_capabilities(caps: &GlCapabilities) -> Self {
        Self {
            max_vertex_attribs: caps.max_vertex_attribs,
            max_texture_units: caps.max_texture_units,
            max_texture_size: caps.max_texture_size,
            max_cube_map_texture_size: caps.max_cube_map_texture_size,
            max_renderbuffer_size: caps.max_renderbuffer_size,
            max_varying_vectors: caps.max_varying_vectors,
            max_vertex_uniform_vectors: caps.max_vertex_uniform_vectors,
            max_fragment_uniform_vectors: caps.max_fragment_uniform_vectors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInfo {
    /// Desktop GL needs attribute 0 enabled as an array; emulate constant values there.
    pub needs_attrib0_emulation: bool,
    pub packed_depth_stencil: bool,
    pub npot_textures: bool,
    extensions: Vec<&'static str>,
}

impl FeatureInfo {
    pub fn from_capabilities(caps: &GlCapabilities) -> Self {
        let mut extensions = Vec::new();
        if caps.packed_depth_stencil {
            extensions.push("GL_OES_packed_depth_stencil");
        }
        if caps.npot_textures {
            extensions.push("GL_OES_texture_npot");
        }
        Self {
            needs_attrib0_emulation: caps.is_desktop_gl,
            packed_depth_stencil: caps.packed_depth_stencil,
            npot_textures: caps.npot_textures,
            extensions,
        }
    }

    pub fn extensions_string(&self) -> String {
        self.extensions.join(" ")
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| *ext == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_switches_read_truthy_values() {
        std::env::set_var(DEBUG_ENV, " Yes ");
        std::env::set_var(LOG_GL_ERRORS_ENV, "0");
        let config = DecoderConfig::from_env();
        assert!(config.debug);
        assert!(!config.log_synthesized_gl_errors);

        std::env::set_var(LOG_GL_ERRORS_ENV, "ON");
        std::env::remove_var(DEBUG_ENV);
        let config = DecoderConfig::from_env();
        assert!(!config.debug);
        assert!(config.log_synthesized_gl_errors);
        std::env::remove_var(LOG_GL_ERRORS_ENV);
    }

    #[test]
    fn desktop_backends_need_attrib0_emulation() {
        let caps = GlCapabilities {
            is_desktop_gl: true,
            packed_depth_stencil: true,
            ..GlCapabilities::default()
        };
        let features = FeatureInfo::from_capabilities(&caps);
        assert!(features.needs_attrib0_emulation);
        assert!(features.has_extension("GL_OES_packed_depth_stencil"));
        assert!(!features.has_extension("GL_OES_texture_npot"));
        assert_eq!(features.extensions_string(), "GL_OES_packed_depth_stencil");
    }
}
