mod common;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use pretty_assertions::assert_eq;

const FRAMEBUFFER: u32 = 4;
const RENDERBUFFER: u32 = 5;

fn bind_framebuffer(h: &mut Harness, framebuffer: u32) {
    h.run(&BindFramebuffer {
        target: GL_FRAMEBUFFER,
        framebuffer,
    });
}

fn renderbuffer_storage(h: &mut Harness, id: u32, format: GLenum, width: i32, height: i32) {
    h.run(&BindRenderbuffer {
        target: GL_RENDERBUFFER,
        renderbuffer: id,
    });
    h.run(&RenderbufferStorage {
        target: GL_RENDERBUFFER,
        internalformat: format,
        width,
        height,
    });
}

fn attach_renderbuffer(h: &mut Harness, attachment: GLenum, renderbuffer: u32) {
    h.run(&FramebufferRenderbuffer {
        target: GL_FRAMEBUFFER,
        attachment,
        renderbuffertarget: GL_RENDERBUFFER,
        renderbuffer,
    });
}

fn status(h: &mut Harness) -> GLenum {
    h.write_u32(RESULT, 0);
    h.run(&CheckFramebufferStatus {
        target: GL_FRAMEBUFFER,
        result_shm_id: SHM,
        result_shm_offset: RESULT,
    });
    h.read_u32(RESULT)
}

fn attachment_param(h: &mut Harness, attachment: GLenum, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetFramebufferAttachmentParameteriv {
        target: GL_FRAMEBUFFER,
        attachment,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

fn renderbuffer_param(h: &mut Harness, pname: GLenum) -> Vec<u32> {
    h.write_u32(DATA, 0);
    h.run(&GetRenderbufferParameteriv {
        target: GL_RENDERBUFFER,
        pname,
        params_shm_id: SHM,
        params_shm_offset: DATA,
    });
    h.read_sized_result(DATA)
}

#[test]
fn binding_creates_framebuffers_on_demand() {
    let mut h = Harness::new();
    h.run(&IsFramebuffer {
        framebuffer: FRAMEBUFFER,
        result_shm_id: SHM,
        result_shm_offset: RESULT,
    });
    assert_eq!(h.read_u32(RESULT), 0);

    bind_framebuffer(&mut h, FRAMEBUFFER);
    h.assert_no_error();
    assert_eq!(h.get_integer(GL_FRAMEBUFFER_BINDING), FRAMEBUFFER as i32);
    h.run(&IsFramebuffer {
        framebuffer: FRAMEBUFFER,
        result_shm_id: SHM,
        result_shm_offset: RESULT,
    });
    assert_eq!(h.read_u32(RESULT), 1);
    assert_eq!(status(&mut h), GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT);
}

#[test]
fn renderbuffer_storage_is_shadowed() {
    let mut h = Harness::new();
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA4, 16, 8);
    h.assert_no_error();
    assert_eq!(renderbuffer_param(&mut h, GL_RENDERBUFFER_WIDTH), vec![16]);
    assert_eq!(renderbuffer_param(&mut h, GL_RENDERBUFFER_HEIGHT), vec![8]);
    assert_eq!(
        renderbuffer_param(&mut h, GL_RENDERBUFFER_INTERNAL_FORMAT),
        vec![GL_RGBA4]
    );
}

#[test]
fn renderbuffer_storage_argument_checks() {
    let mut h = Harness::new();
    h.run(&RenderbufferStorage {
        target: GL_RENDERBUFFER,
        internalformat: GL_RGBA4,
        width: 1,
        height: 1,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA, 1, 1);
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA4, -1, 1);
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    let too_big = h.get_integer(GL_MAX_RENDERBUFFER_SIZE) + 1;
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA4, too_big, 1);
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);
    assert_eq!(renderbuffer_param(&mut h, GL_RENDERBUFFER_WIDTH), vec![0]);
}

#[test]
fn complete_framebuffer_reports_client_names() {
    let mut h = Harness::new();
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA4, 4, 4);
    bind_framebuffer(&mut h, FRAMEBUFFER);
    attach_renderbuffer(&mut h, GL_COLOR_ATTACHMENT0, RENDERBUFFER);
    h.assert_no_error();
    assert_eq!(status(&mut h), GL_FRAMEBUFFER_COMPLETE);

    assert_eq!(
        attachment_param(&mut h, GL_COLOR_ATTACHMENT0, GL_FRAMEBUFFER_ATTACHMENT_OBJECT_TYPE),
        vec![GL_RENDERBUFFER]
    );
    // The backend's name is translated back to the client id.
    assert_eq!(
        attachment_param(&mut h, GL_COLOR_ATTACHMENT0, GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME),
        vec![RENDERBUFFER]
    );
}

#[test]
fn texture_attachments() {
    let mut h = Harness::new();
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 7,
    });
    h.tex_image_rgba(0, 4, 4, [0, 0, 0, 255]);
    bind_framebuffer(&mut h, FRAMEBUFFER);

    h.run(&FramebufferTexture2D {
        target: GL_FRAMEBUFFER,
        attachment: GL_COLOR_ATTACHMENT0,
        textarget: GL_TEXTURE_2D,
        texture: 7,
        level: 1,
    });
    assert_eq!(h.gl_error(), GL_INVALID_VALUE);

    h.run(&FramebufferTexture2D {
        target: GL_FRAMEBUFFER,
        attachment: GL_COLOR_ATTACHMENT0,
        textarget: GL_TEXTURE_2D,
        texture: 99,
        level: 0,
    });
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    h.run(&FramebufferTexture2D {
        target: GL_FRAMEBUFFER,
        attachment: GL_COLOR_ATTACHMENT0,
        textarget: GL_TEXTURE_2D,
        texture: 7,
        level: 0,
    });
    h.assert_no_error();
    assert_eq!(status(&mut h), GL_FRAMEBUFFER_COMPLETE);
    assert_eq!(
        attachment_param(&mut h, GL_COLOR_ATTACHMENT0, GL_FRAMEBUFFER_ATTACHMENT_OBJECT_NAME),
        vec![7]
    );

    let fb = h.decoder.group().framebuffers.get(FRAMEBUFFER).expect("framebuffer");
    assert_eq!(fb.state().color_size(), Some((4, 4)));
}

#[test]
fn attaching_needs_a_bound_framebuffer() {
    let mut h = Harness::new();
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_RGBA4, 4, 4);
    attach_renderbuffer(&mut h, GL_COLOR_ATTACHMENT0, RENDERBUFFER);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);

    bind_framebuffer(&mut h, FRAMEBUFFER);
    attach_renderbuffer(&mut h, GL_TEXTURE_2D, RENDERBUFFER);
    assert_eq!(h.gl_error(), GL_INVALID_ENUM);
    attach_renderbuffer(&mut h, GL_COLOR_ATTACHMENT0, 42);
    assert_eq!(h.gl_error(), GL_INVALID_OPERATION);
}

#[test]
fn deleting_an_attached_renderbuffer_detaches_it() {
    let mut h = Harness::new();
    renderbuffer_storage(&mut h, RENDERBUFFER, GL_DEPTH_COMPONENT16, 4, 4);
    bind_framebuffer(&mut h, FRAMEBUFFER);
    attach_renderbuffer(&mut h, GL_DEPTH_ATTACHMENT, RENDERBUFFER);
    h.assert_no_error();

    h.run_with_data(&DeleteRenderbuffersImmediate { n: 1 }, &RENDERBUFFER.to_ne_bytes());
    h.assert_no_error();
    assert_eq!(h.get_integer(GL_RENDERBUFFER_BINDING), 0);
    let fb = h.decoder.group().framebuffers.get(FRAMEBUFFER).expect("framebuffer");
    assert!(fb.state().attachment(GL_DEPTH_ATTACHMENT).is_none());
    assert_eq!(status(&mut h), GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT);
}

#[test]
fn deleting_the_bound_framebuffer_falls_back_to_the_default() {
    let mut h = Harness::new();
    bind_framebuffer(&mut h, FRAMEBUFFER);
    h.run_with_data(&DeleteFramebuffersImmediate { n: 1 }, &FRAMEBUFFER.to_ne_bytes());
    h.assert_no_error();
    assert_eq!(h.get_integer(GL_FRAMEBUFFER_BINDING), 0);
    assert!(!h.decoder.group().framebuffers.contains(FRAMEBUFFER));
    // The offscreen target is complete and drawable again.
    assert_eq!(status(&mut h), GL_FRAMEBUFFER_COMPLETE);
}
