mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::*;
use gles2_cmd::gl::*;
use gles2_cmd::gles2::*;
use gles2_decoder::{CmdError, ContextGroup, GlApi, InitError, OffscreenPhase, Size, SoftGl};
use pretty_assertions::assert_eq;

const PARENT_TEXTURE: u32 = 20;

fn clear_to(h: &mut Harness, rgba: [f32; 4]) {
    h.run(&ClearColor {
        red: rgba[0],
        green: rgba[1],
        blue: rgba[2],
        alpha: rgba[3],
    });
    h.run(&Clear {
        mask: GL_COLOR_BUFFER_BIT,
    });
}

/// A parent decoder and a child on a context sharing its backend objects.
fn parent_and_child() -> (Harness, Harness) {
    let parent = Harness::new();
    let child_gl = parent.gl.shared_context();
    let group = ContextGroup::new(&child_gl.capabilities());
    let mut child = Harness::with_group(child_gl, group);
    child
        .decoder
        .initialize(
            Size::new(2, 2),
            Some(&parent.decoder.parent_handle()),
            PARENT_TEXTURE,
        )
        .expect("child initializes");
    (parent, child)
}

#[test]
fn resize_is_deferred_until_swap() {
    let mut h = Harness::new();
    assert_eq!(h.decoder.offscreen_phase(), Some(OffscreenPhase::Ready));
    assert_eq!(h.decoder.offscreen_size(), Some(Size::new(4, 4)));

    assert!(h.decoder.resize_offscreen_frame_buffer(Size::new(8, 2)));
    assert_eq!(h.decoder.offscreen_phase(), Some(OffscreenPhase::Sized));
    assert_eq!(h.decoder.offscreen_size(), Some(Size::new(4, 4)));

    h.run(&SwapBuffers {});
    assert_eq!(h.decoder.offscreen_phase(), Some(OffscreenPhase::Ready));
    assert_eq!(h.decoder.offscreen_size(), Some(Size::new(8, 2)));
    h.assert_no_error();
}

#[test]
fn resizing_to_the_current_size_is_a_no_op() {
    let mut h = Harness::new();
    assert!(h.decoder.resize_offscreen_frame_buffer(Size::new(4, 4)));
    assert_eq!(h.decoder.offscreen_phase(), Some(OffscreenPhase::Ready));
    h.gl.clear_call_log();
    h.run(&SwapBuffers {});
    assert_eq!(h.gl.call_count("tex_image_2d"), 0);
}

/// Backend calls of one reallocation round: (texture uploads, renderbuffer allocations).
fn reallocation_calls(h: &Harness) -> (usize, usize) {
    (h.gl.call_count("tex_image_2d"), h.gl.call_count("renderbuffer_storage"))
}

#[test]
fn several_resizes_before_a_swap_reallocate_once() {
    let mut single = Harness::new();
    single.gl.clear_call_log();
    single.decoder.resize_offscreen_frame_buffer(Size::new(6, 5));
    single.run(&SwapBuffers {});
    let one_round = reallocation_calls(&single);
    assert_eq!(one_round.0, 1);
    assert!(one_round.1 >= 1);

    let mut h = Harness::new();
    h.gl.clear_call_log();
    for size in [Size::new(8, 2), Size::new(3, 3), Size::new(6, 5)] {
        assert!(h.decoder.resize_offscreen_frame_buffer(size));
        assert_eq!(h.decoder.offscreen_size(), Some(Size::new(4, 4)));
    }
    assert_eq!(reallocation_calls(&h), (0, 0));

    h.run(&SwapBuffers {});
    assert_eq!(h.decoder.offscreen_phase(), Some(OffscreenPhase::Ready));
    assert_eq!(h.decoder.offscreen_size(), Some(Size::new(6, 5)));
    assert_eq!(reallocation_calls(&h), one_round);
    h.assert_no_error();

    h.gl.clear_call_log();
    h.run(&SwapBuffers {});
    assert_eq!(reallocation_calls(&h), (0, 0));
}

#[test]
fn zero_sizes_are_clamped() {
    let mut h = Harness::new();
    h.decoder.resize_offscreen_frame_buffer(Size::new(0, 3));
    h.run(&SwapBuffers {});
    assert_eq!(h.decoder.offscreen_size(), Some(Size::new(1, 3)));
}

#[test]
fn onscreen_swap_presents_the_surface() {
    let gl = SoftGl::new_onscreen(Size::new(16, 16));
    let mut h = Harness::with_gl(gl, Size::new(16, 16));
    assert_eq!(h.decoder.offscreen_phase(), None);
    assert!(!h.decoder.resize_offscreen_frame_buffer(Size::new(2, 2)));

    h.run(&SwapBuffers {});
    h.run(&SwapBuffers {});
    assert_eq!(h.gl.swap_count(), 2);
}

#[test]
fn swap_callback_runs_after_each_swap() {
    let mut h = Harness::new();
    let swaps = Rc::new(Cell::new(0));
    let counter = swaps.clone();
    h.decoder
        .set_swap_buffers_callback(move || counter.set(counter.get() + 1));
    h.run(&SwapBuffers {});
    h.run(&SwapBuffers {});
    assert_eq!(swaps.get(), 2);
    assert_eq!(h.gl.swap_count(), 0);
}

#[test]
fn failed_reallocation_loses_the_context() {
    let mut h = Harness::with_gl(SoftGl::new_offscreen(), Size::new(1, 1));
    let swaps = Rc::new(Cell::new(0));
    let counter = swaps.clone();
    h.decoder
        .set_swap_buffers_callback(move || counter.set(counter.get() + 1));

    // Room for an 8x8 color texture but not the matching depth buffer.
    h.gl.set_memory_limit(Some(400));
    h.decoder.resize_offscreen_frame_buffer(Size::new(8, 8));
    assert_eq!(h.exec(&SwapBuffers {}), Err(CmdError::LostContext));
    assert_eq!(swaps.get(), 0);
    // The failure is not reported to the client as a GL error.
    assert!(h.decoder.pending_errors().is_empty());
}

#[test]
fn swap_publishes_the_frame_to_the_parent() {
    let (parent, mut child) = parent_and_child();
    let texture = parent
        .decoder
        .group()
        .textures
        .get(PARENT_TEXTURE)
        .expect("saved texture registered with parent");
    let level = texture
        .state()
        .level_info(GL_TEXTURE_2D, 0)
        .map(|l| (l.width, l.height));
    assert_eq!(level, Some((2, 2)));

    clear_to(&mut child, [0.0, 1.0, 0.0, 1.0]);
    child.run(&SwapBuffers {});
    let image = parent
        .gl
        .texture_level(texture.service_id(), GL_TEXTURE_2D, 0)
        .expect("saved texture storage");
    assert_eq!(image.fill, [0, 255, 0, 255]);

    // A resize carries over to the parent's view of the texture.
    child.decoder.resize_offscreen_frame_buffer(Size::new(4, 1));
    child.run(&SwapBuffers {});
    let level = texture
        .state()
        .level_info(GL_TEXTURE_2D, 0)
        .map(|l| (l.width, l.height));
    assert_eq!(level, Some((4, 1)));
}

#[test]
fn destroying_the_child_unregisters_the_texture() {
    let (parent, mut child) = parent_and_child();
    assert!(parent.decoder.group().textures.contains(PARENT_TEXTURE));
    child.decoder.destroy();
    assert!(!parent.decoder.group().textures.contains(PARENT_TEXTURE));
}

#[test]
fn child_survives_its_parent() {
    let (mut parent, mut child) = parent_and_child();
    parent.decoder.destroy();
    clear_to(&mut child, [1.0, 0.0, 0.0, 1.0]);
    child.run(&SwapBuffers {});
    child.decoder.destroy();
    assert_eq!(child.gl.object_count(), 0);
}

#[test]
fn parent_texture_id_must_be_free() {
    let mut parent = Harness::new();
    parent.gen_texture(3);

    for id in [0, 3] {
        let child_gl = parent.gl.shared_context();
        let group = ContextGroup::new(&child_gl.capabilities());
        let mut child = Harness::with_group(child_gl, group);
        let result = child
            .decoder
            .initialize(Size::new(1, 1), Some(&parent.decoder.parent_handle()), id);
        assert_eq!(result, Err(InitError::ParentTextureIdInUse(id)));
    }
}

#[test]
fn dead_parent_handle_is_rejected() {
    let mut parent = Harness::new();
    let handle = parent.decoder.parent_handle();
    parent.decoder.destroy();

    let child_gl = parent.gl.shared_context();
    let group = ContextGroup::new(&child_gl.capabilities());
    let mut child = Harness::with_group(child_gl, group);
    let result = child
        .decoder
        .initialize(Size::new(1, 1), Some(&handle), PARENT_TEXTURE);
    assert_eq!(result, Err(InitError::ParentGone));
}

#[test]
fn initialization_failures() {
    let gl = SoftGl::new_offscreen();
    gl.set_fail_make_current(true);
    let mut h = Harness::uninitialized(gl.clone());
    assert_eq!(
        h.decoder.initialize(Size::new(1, 1), None, 0),
        Err(InitError::MakeCurrentFailed)
    );

    gl.set_fail_make_current(false);
    h.decoder
        .initialize(Size::new(1, 1), None, 0)
        .expect("initializes once current");
    assert_eq!(
        h.decoder.initialize(Size::new(1, 1), None, 0),
        Err(InitError::AlreadyInitialized)
    );
}

#[test]
fn destroy_releases_every_backend_object() {
    let mut h = Harness::new();
    h.gen_buffer(1);
    h.bind_buffer(GL_ARRAY_BUFFER, 1);
    h.run(&BindTexture {
        target: GL_TEXTURE_2D,
        texture: 2,
    });
    h.program(10, VS, FS);
    assert!(h.gl.object_count() > 0);

    h.decoder.destroy();
    assert_eq!(h.gl.object_count(), 0);
    // Destroying twice is harmless.
    h.decoder.destroy();
}
