//! GLES2 command structs.
//!
//! Field order is the wire order. `*_shm_id`/`*_shm_offset` pairs name a region of client shared
//! memory; `(0, 0)` stands for a null pointer where the GL call accepts one. Commands suffixed
//! `Immediate` carry their variable-length payload inline after the fixed fields; commands
//! suffixed `Bucket` reference a bucket filled beforehand with the common bucket commands.

use bytemuck::{Pod, Zeroable};

use crate::cmd::FIRST_GLES2_COMMAND;

macro_rules! gles2_cmd {
    ($($(#[$meta:meta])* $name:ident { $($field:ident: $ty:ty),* $(,)? })*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            #[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
            pub struct $name {
                $(pub $field: $ty,)*
            }
        )*
    };
}

empty_command!(Finish, Flush, SwapBuffers);

gles2_cmd! {
    ActiveTexture { texture: u32 }
    AttachShader { program: u32, shader: u32 }
    /// Followed by `data_size` bytes of attribute name.
    BindAttribLocationImmediate { program: u32, index: u32, data_size: u32 }
    BindAttribLocationBucket { program: u32, index: u32, name_bucket_id: u32 }
    BindBuffer { target: u32, buffer: u32 }
    BindFramebuffer { target: u32, framebuffer: u32 }
    BindRenderbuffer { target: u32, renderbuffer: u32 }
    BindTexture { target: u32, texture: u32 }
    BlendColor { red: f32, green: f32, blue: f32, alpha: f32 }
    BlendEquation { mode: u32 }
    BlendFunc { sfactor: u32, dfactor: u32 }
    BufferData { target: u32, size: i32, data_shm_id: u32, data_shm_offset: u32, usage: u32 }
    /// Followed by `size` bytes of data.
    BufferDataImmediate { target: u32, size: i32, usage: u32 }
    BufferSubData { target: u32, offset: i32, size: i32, data_shm_id: u32, data_shm_offset: u32 }
    /// Followed by `size` bytes of data.
    BufferSubDataImmediate { target: u32, offset: i32, size: i32 }
    CheckFramebufferStatus { target: u32, result_shm_id: u32, result_shm_offset: u32 }
    Clear { mask: u32 }
    ClearColor { red: f32, green: f32, blue: f32, alpha: f32 }
    ClearDepthf { depth: f32 }
    ClearStencil { s: i32 }
    ColorMask { red: u32, green: u32, blue: u32, alpha: u32 }
    CompileShader { shader: u32 }
    CopyTexImage2D {
        target: u32, level: i32, internalformat: u32,
        x: i32, y: i32, width: i32, height: i32, border: i32,
    }
    CopyTexSubImage2D {
        target: u32, level: i32, xoffset: i32, yoffset: i32,
        x: i32, y: i32, width: i32, height: i32,
    }
    CreateProgram { client_id: u32 }
    CreateShader { ty: u32, client_id: u32 }
    CullFace { mode: u32 }
    DeleteBuffers { n: i32, buffers_shm_id: u32, buffers_shm_offset: u32 }
    /// Followed by `n` client ids.
    DeleteBuffersImmediate { n: i32 }
    DeleteFramebuffers { n: i32, framebuffers_shm_id: u32, framebuffers_shm_offset: u32 }
    DeleteFramebuffersImmediate { n: i32 }
    DeleteProgram { program: u32 }
    DeleteRenderbuffers { n: i32, renderbuffers_shm_id: u32, renderbuffers_shm_offset: u32 }
    DeleteRenderbuffersImmediate { n: i32 }
    DeleteShader { shader: u32 }
    DeleteTextures { n: i32, textures_shm_id: u32, textures_shm_offset: u32 }
    DeleteTexturesImmediate { n: i32 }
    DepthFunc { func: u32 }
    DepthMask { flag: u32 }
    DepthRangef { z_near: f32, z_far: f32 }
    DetachShader { program: u32, shader: u32 }
    Disable { cap: u32 }
    DisableVertexAttribArray { index: u32 }
    DrawArrays { mode: u32, first: i32, count: i32 }
    DrawElements { mode: u32, count: i32, ty: u32, index_offset: u32 }
    Enable { cap: u32 }
    EnableVertexAttribArray { index: u32 }
    FramebufferRenderbuffer {
        target: u32, attachment: u32, renderbuffertarget: u32, renderbuffer: u32,
    }
    FramebufferTexture2D { target: u32, attachment: u32, textarget: u32, texture: u32, level: i32 }
    FrontFace { mode: u32 }
    GenBuffers { n: i32, buffers_shm_id: u32, buffers_shm_offset: u32 }
    /// Followed by `n` client ids chosen by the client.
    GenBuffersImmediate { n: i32 }
    GenerateMipmap { target: u32 }
    GenFramebuffers { n: i32, framebuffers_shm_id: u32, framebuffers_shm_offset: u32 }
    GenFramebuffersImmediate { n: i32 }
    GenRenderbuffers { n: i32, renderbuffers_shm_id: u32, renderbuffers_shm_offset: u32 }
    GenRenderbuffersImmediate { n: i32 }
    GenTextures { n: i32, textures_shm_id: u32, textures_shm_offset: u32 }
    GenTexturesImmediate { n: i32 }
    /// Allocates ids from a shared namespace. `id_offset == 0` allocates the lowest free ids.
    GenSharedIds { namespace_id: u32, id_offset: u32, n: i32, ids_shm_id: u32, ids_shm_offset: u32 }
    DeleteSharedIds { namespace_id: u32, n: i32, ids_shm_id: u32, ids_shm_offset: u32 }
    RegisterSharedIds { namespace_id: u32, n: i32, ids_shm_id: u32, ids_shm_offset: u32 }
    /// Result is [`ActiveInfoResult`]; the name is written to `name_bucket_id`.
    GetActiveAttrib {
        program: u32, index: u32, name_bucket_id: u32, result_shm_id: u32, result_shm_offset: u32,
    }
    GetActiveUniform {
        program: u32, index: u32, name_bucket_id: u32, result_shm_id: u32, result_shm_offset: u32,
    }
    /// Result is a sized result of client shader ids.
    GetAttachedShaders { program: u32, result_shm_id: u32, result_shm_offset: u32, result_size: u32 }
    /// Followed by `data_size` bytes of attribute name. The location out-parameter must hold -1.
    GetAttribLocationImmediate {
        program: u32, location_shm_id: u32, location_shm_offset: u32, data_size: u32,
    }
    GetAttribLocationBucket {
        program: u32, name_bucket_id: u32, location_shm_id: u32, location_shm_offset: u32,
    }
    GetBooleanv { pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetBufferParameteriv { target: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetError { result_shm_id: u32, result_shm_offset: u32 }
    GetFloatv { pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetFramebufferAttachmentParameteriv {
        target: u32, attachment: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32,
    }
    GetIntegerv { pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetMaxValueInBuffer {
        buffer_id: u32, count: i32, ty: u32, offset: u32, result_shm_id: u32, result_shm_offset: u32,
    }
    GetProgramiv { program: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetProgramInfoLog { program: u32, bucket_id: u32 }
    GetRenderbufferParameteriv {
        target: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32,
    }
    GetShaderiv { shader: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetShaderInfoLog { shader: u32, bucket_id: u32 }
    GetShaderSource { shader: u32, bucket_id: u32 }
    GetString { name: u32, bucket_id: u32 }
    GetTexLevelParameteriv {
        target: u32, level: i32, pname: u32, params_shm_id: u32, params_shm_offset: u32,
    }
    GetTexParameteriv { target: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    /// Followed by `data_size` bytes of uniform name. The location out-parameter must hold -1.
    GetUniformLocationImmediate {
        program: u32, location_shm_id: u32, location_shm_offset: u32, data_size: u32,
    }
    GetUniformLocationBucket {
        program: u32, name_bucket_id: u32, location_shm_id: u32, location_shm_offset: u32,
    }
    GetVertexAttribfv { index: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetVertexAttribiv { index: u32, pname: u32, params_shm_id: u32, params_shm_offset: u32 }
    GetVertexAttribPointerv { index: u32, pname: u32, pointer_shm_id: u32, pointer_shm_offset: u32 }
    Hint { target: u32, mode: u32 }
    IsBuffer { buffer: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsEnabled { cap: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsFramebuffer { framebuffer: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsProgram { program: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsRenderbuffer { renderbuffer: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsShader { shader: u32, result_shm_id: u32, result_shm_offset: u32 }
    IsTexture { texture: u32, result_shm_id: u32, result_shm_offset: u32 }
    LineWidth { width: f32 }
    LinkProgram { program: u32 }
    PixelStorei { pname: u32, param: i32 }
    PolygonOffset { factor: f32, units: f32 }
    /// `result` receives a `u32` that is non-zero when pixels were written.
    ReadPixels {
        x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32,
        pixels_shm_id: u32, pixels_shm_offset: u32, result_shm_id: u32, result_shm_offset: u32,
    }
    RenderbufferStorage { target: u32, internalformat: u32, width: i32, height: i32 }
    SampleCoverage { value: f32, invert: u32 }
    Scissor { x: i32, y: i32, width: i32, height: i32 }
    ShaderSource { shader: u32, data_shm_id: u32, data_shm_offset: u32, data_size: u32 }
    /// Followed by `data_size` bytes of source.
    ShaderSourceImmediate { shader: u32, data_size: u32 }
    ShaderSourceBucket { shader: u32, data_bucket_id: u32 }
    StencilFunc { func: u32, reference: i32, mask: u32 }
    StencilMask { mask: u32 }
    StencilMaskSeparate { face: u32, mask: u32 }
    StencilOp { fail: u32, zfail: u32, zpass: u32 }
    TexImage2D {
        target: u32, level: i32, internalformat: i32, width: i32, height: i32, border: i32,
        format: u32, ty: u32, pixels_shm_id: u32, pixels_shm_offset: u32,
    }
    /// Followed by the pixel data.
    TexImage2DImmediate {
        target: u32, level: i32, internalformat: i32, width: i32, height: i32, border: i32,
        format: u32, ty: u32,
    }
    TexParameterf { target: u32, pname: u32, param: f32 }
    TexParameteri { target: u32, pname: u32, param: i32 }
    TexSubImage2D {
        target: u32, level: i32, xoffset: i32, yoffset: i32, width: i32, height: i32,
        format: u32, ty: u32, pixels_shm_id: u32, pixels_shm_offset: u32,
    }
    TexSubImage2DImmediate {
        target: u32, level: i32, xoffset: i32, yoffset: i32, width: i32, height: i32,
        format: u32, ty: u32,
    }
    Uniform1f { location: i32, x: f32 }
    Uniform1i { location: i32, x: i32 }
    /// Followed by `count` ints.
    Uniform1ivImmediate { location: i32, count: i32 }
    Uniform2f { location: i32, x: f32, y: f32 }
    Uniform3f { location: i32, x: f32, y: f32, z: f32 }
    Uniform4f { location: i32, x: f32, y: f32, z: f32, w: f32 }
    /// Followed by `count * 4` floats.
    Uniform4fvImmediate { location: i32, count: i32 }
    /// Followed by `count * 16` floats.
    UniformMatrix4fvImmediate { location: i32, count: i32, transpose: u32 }
    UseProgram { program: u32 }
    ValidateProgram { program: u32 }
    VertexAttrib1f { indx: u32, x: f32 }
    VertexAttrib2f { indx: u32, x: f32, y: f32 }
    VertexAttrib3f { indx: u32, x: f32, y: f32, z: f32 }
    VertexAttrib4f { indx: u32, x: f32, y: f32, z: f32, w: f32 }
    /// Followed by 4 floats.
    VertexAttrib4fvImmediate { indx: u32 }
    VertexAttribPointer {
        indx: u32, size: i32, ty: u32, normalized: u32, stride: i32, offset: u32,
    }
    Viewport { x: i32, y: i32, width: i32, height: i32 }
}

command_set! {
    /// Opcodes of the GLES2 command set, starting at [`FIRST_GLES2_COMMAND`].
    CommandId = FIRST_GLES2_COMMAND; {
        ActiveTexture: Fixed,
        AttachShader: Fixed,
        BindAttribLocationImmediate: AtLeastN,
        BindAttribLocationBucket: Fixed,
        BindBuffer: Fixed,
        BindFramebuffer: Fixed,
        BindRenderbuffer: Fixed,
        BindTexture: Fixed,
        BlendColor: Fixed,
        BlendEquation: Fixed,
        BlendFunc: Fixed,
        BufferData: Fixed,
        BufferDataImmediate: AtLeastN,
        BufferSubData: Fixed,
        BufferSubDataImmediate: AtLeastN,
        CheckFramebufferStatus: Fixed,
        Clear: Fixed,
        ClearColor: Fixed,
        ClearDepthf: Fixed,
        ClearStencil: Fixed,
        ColorMask: Fixed,
        CompileShader: Fixed,
        CopyTexImage2D: Fixed,
        CopyTexSubImage2D: Fixed,
        CreateProgram: Fixed,
        CreateShader: Fixed,
        CullFace: Fixed,
        DeleteBuffers: Fixed,
        DeleteBuffersImmediate: AtLeastN,
        DeleteFramebuffers: Fixed,
        DeleteFramebuffersImmediate: AtLeastN,
        DeleteProgram: Fixed,
        DeleteRenderbuffers: Fixed,
        DeleteRenderbuffersImmediate: AtLeastN,
        DeleteShader: Fixed,
        DeleteTextures: Fixed,
        DeleteTexturesImmediate: AtLeastN,
        DepthFunc: Fixed,
        DepthMask: Fixed,
        DepthRangef: Fixed,
        DetachShader: Fixed,
        Disable: Fixed,
        DisableVertexAttribArray: Fixed,
        DrawArrays: Fixed,
        DrawElements: Fixed,
        Enable: Fixed,
        EnableVertexAttribArray: Fixed,
        Finish: Fixed,
        Flush: Fixed,
        FramebufferRenderbuffer: Fixed,
        FramebufferTexture2D: Fixed,
        FrontFace: Fixed,
        GenBuffers: Fixed,
        GenBuffersImmediate: AtLeastN,
        GenerateMipmap: Fixed,
        GenFramebuffers: Fixed,
        GenFramebuffersImmediate: AtLeastN,
        GenRenderbuffers: Fixed,
        GenRenderbuffersImmediate: AtLeastN,
        GenTextures: Fixed,
        GenTexturesImmediate: AtLeastN,
        GenSharedIds: Fixed,
        DeleteSharedIds: Fixed,
        RegisterSharedIds: Fixed,
        GetActiveAttrib: Fixed,
        GetActiveUniform: Fixed,
        GetAttachedShaders: Fixed,
        GetAttribLocationImmediate: AtLeastN,
        GetAttribLocationBucket: Fixed,
        GetBooleanv: Fixed,
        GetBufferParameteriv: Fixed,
        GetError: Fixed,
        GetFloatv: Fixed,
        GetFramebufferAttachmentParameteriv: Fixed,
        GetIntegerv: Fixed,
        GetMaxValueInBuffer: Fixed,
        GetProgramiv: Fixed,
        GetProgramInfoLog: Fixed,
        GetRenderbufferParameteriv: Fixed,
        GetShaderiv: Fixed,
        GetShaderInfoLog: Fixed,
        GetShaderSource: Fixed,
        GetString: Fixed,
        GetTexLevelParameteriv: Fixed,
        GetTexParameteriv: Fixed,
        GetUniformLocationImmediate: AtLeastN,
        GetUniformLocationBucket: Fixed,
        GetVertexAttribfv: Fixed,
        GetVertexAttribiv: Fixed,
        GetVertexAttribPointerv: Fixed,
        Hint: Fixed,
        IsBuffer: Fixed,
        IsEnabled: Fixed,
        IsFramebuffer: Fixed,
        IsProgram: Fixed,
        IsRenderbuffer: Fixed,
        IsShader: Fixed,
        IsTexture: Fixed,
        LineWidth: Fixed,
        LinkProgram: Fixed,
        PixelStorei: Fixed,
        PolygonOffset: Fixed,
        ReadPixels: Fixed,
        RenderbufferStorage: Fixed,
        SampleCoverage: Fixed,
        Scissor: Fixed,
        ShaderSource: Fixed,
        ShaderSourceImmediate: AtLeastN,
        ShaderSourceBucket: Fixed,
        StencilFunc: Fixed,
        StencilMask: Fixed,
        StencilMaskSeparate: Fixed,
        StencilOp: Fixed,
        SwapBuffers: Fixed,
        TexImage2D: Fixed,
        TexImage2DImmediate: AtLeastN,
        TexParameterf: Fixed,
        TexParameteri: Fixed,
        TexSubImage2D: Fixed,
        TexSubImage2DImmediate: AtLeastN,
        Uniform1f: Fixed,
        Uniform1i: Fixed,
        Uniform1ivImmediate: AtLeastN,
        Uniform2f: Fixed,
        Uniform3f: Fixed,
        Uniform4f: Fixed,
        Uniform4fvImmediate: AtLeastN,
        UniformMatrix4fvImmediate: AtLeastN,
        UseProgram: Fixed,
        ValidateProgram: Fixed,
        VertexAttrib1f: Fixed,
        VertexAttrib2f: Fixed,
        VertexAttrib3f: Fixed,
        VertexAttrib4f: Fixed,
        VertexAttrib4fvImmediate: AtLeastN,
        VertexAttribPointer: Fixed,
        Viewport: Fixed,
    }
}

/// Out-parameter layout of `GetActiveAttrib` / `GetActiveUniform`.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct ActiveInfoResult {
    /// Must be 0 before the call; set to 1 on success.
    pub success: i32,
    pub size: i32,
    pub ty: u32,
}

impl ActiveInfoResult {
    pub const SIZE_BYTES: usize = core::mem::size_of::<Self>();
}

/// Size in bytes of a sized result holding `count` 4-byte values: a `u32` count followed by the
/// values.
pub fn sized_result_size(count: usize) -> Option<usize> {
    count.checked_mul(4)?.checked_add(4)
}
