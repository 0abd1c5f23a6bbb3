use gles2_cmd::gl::GLenum;

/// Turns client GLSL ES into source the backend accepts.
///
/// On failure the returned string becomes the shader's info log and the backend never sees the
/// source.
pub trait ShaderTranslator {
    fn translate(&mut self, shader_type: GLenum, source: &str) -> Result<String, String>;
}

impl<F> ShaderTranslator for F
where
    F: FnMut(GLenum, &str) -> Result<String, String>,
{
    fn translate(&mut self, shader_type: GLenum, source: &str) -> Result<String, String> {
        self(shader_type, source)
    }
}
