//! State shared by every decoder of a share group: resource tables, id namespaces and limits.
//!
//! All decoders of a group run on one thread, so the group is handed around as an `Rc` and its
//! tables use interior mutability.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;

use gles2_cmd::gl::{id_namespaces, GL_TEXTURE_2D, GL_TEXTURE_CUBE_MAP};

use crate::config::{FeatureInfo, Limits};
use crate::gl_api::{GlApi, GlCapabilities};
use crate::id_allocator::IdAllocator;
use crate::resources::{
    BufferState, FramebufferState, ProgramState, RenderbufferState, Resource, ResourceTable,
    ShaderState, Texture, TextureState,
};

#[derive(Debug)]
pub struct ContextGroup {
    limits: Limits,
    features: FeatureInfo,
    pub buffers: ResourceTable<BufferState>,
    pub framebuffers: ResourceTable<FramebufferState>,
    pub renderbuffers: ResourceTable<RenderbufferState>,
    pub textures: ResourceTable<TextureState>,
    pub programs: ResourceTable<ProgramState>,
    pub shaders: ResourceTable<ShaderState>,
    id_allocators: RefCell<[IdAllocator; id_namespaces::COUNT as usize]>,
    /// What texture unit bindings of 0 refer to. Service id 0 is the backend's default texture.
    default_texture_2d: Rc<Texture>,
    default_texture_cube_map: Rc<Texture>,
    decoders: Cell<usize>,
}

impl ContextGroup {
    pub fn new(caps: &GlCapabilities) -> Rc<Self> {
        let default_texture = |target| {
            let texture = Rc::new(Resource::new(0, 0, TextureState::default()));
            texture.state_mut().set_target(target);
            texture
        };
        Rc::new(Self {
            limits: Limits::from_capabilities(caps),
            features: FeatureInfo::from_capabilities(caps),
            buffers: ResourceTable::new(),
            framebuffers: ResourceTable::new(),
            renderbuffers: ResourceTable::new(),
            textures: ResourceTable::new(),
            programs: ResourceTable::new(),
            shaders: ResourceTable::new(),
            id_allocators: RefCell::new(Default::default()),
            default_texture_2d: default_texture(GL_TEXTURE_2D),
            default_texture_cube_map: default_texture(GL_TEXTURE_CUBE_MAP),
            decoders: Cell::new(0),
        })
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn features(&self) -> &FeatureInfo {
        &self.features
    }

    /// The id allocator of `namespace`, or `None` for an unknown namespace.
    pub fn id_allocator(&self, namespace: u32) -> Option<RefMut<'_, IdAllocator>> {
        if namespace >= id_namespaces::COUNT {
            return None;
        }
        Some(RefMut::map(self.id_allocators.borrow_mut(), |ids| {
            &mut ids[namespace as usize]
        }))
    }

    /// Marks `id` used in `namespace`. Returns false on collision.
    pub fn mark_id_used(&self, namespace: u32, id: u32) -> bool {
        self.id_allocator(namespace)
            .is_some_and(|mut ids| ids.mark_as_used(id))
    }

    pub fn free_id(&self, namespace: u32, id: u32) {
        if let Some(mut ids) = self.id_allocator(namespace) {
            ids.free_id(id);
        }
    }

    pub fn default_texture(&self, target: u32) -> Option<Rc<Texture>> {
        match target {
            GL_TEXTURE_2D => Some(self.default_texture_2d.clone()),
            GL_TEXTURE_CUBE_MAP => Some(self.default_texture_cube_map.clone()),
            _ => None,
        }
    }

    pub fn decoder_count(&self) -> usize {
        self.decoders.get()
    }

    pub(crate) fn add_decoder(&self) {
        self.decoders.set(self.decoders.get() + 1);
    }

    /// Drops one decoder. The last one out deletes every object the group still owns.
    pub(crate) fn remove_decoder(&self, gl: &mut dyn GlApi) {
        let remaining = self.decoders.get().saturating_sub(1);
        self.decoders.set(remaining);
        if remaining == 0 {
            tracing::debug!("destroying context group resources");
            self.programs.destroy_all(gl);
            self.shaders.destroy_all(gl);
            self.framebuffers.destroy_all(gl);
            self.renderbuffers.destroy_all(gl);
            self.textures.destroy_all(gl);
            self.buffers.destroy_all(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_independent() {
        let group = ContextGroup::new(&GlCapabilities::default());
        assert!(group.mark_id_used(id_namespaces::BUFFERS, 5));
        assert!(group.mark_id_used(id_namespaces::TEXTURES, 5));
        assert!(!group.mark_id_used(id_namespaces::BUFFERS, 5));
        assert!(!group.mark_id_used(id_namespaces::COUNT, 1));
        group.free_id(id_namespaces::BUFFERS, 5);
        assert!(group.mark_id_used(id_namespaces::BUFFERS, 5));
    }

    #[test]
    fn default_textures_use_service_id_zero() {
        let group = ContextGroup::new(&GlCapabilities::default());
        let tex = group.default_texture(GL_TEXTURE_CUBE_MAP).expect("cube default");
        assert_eq!(tex.service_id(), 0);
        assert_eq!(tex.state().target(), GL_TEXTURE_CUBE_MAP);
        assert!(group.default_texture(0).is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Create(u8),
            Remove(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![any::<u8>().prop_map(Op::Create), any::<u8>().prop_map(Op::Remove)]
        }

        proptest! {
            #[test]
            fn lookups_track_create_and_remove(ops in proptest::collection::vec(op(), 0..64)) {
                let group = ContextGroup::new(&GlCapabilities::default());
                let mut live = std::collections::HashSet::new();
                let mut held = Vec::new();
                for (service, op) in ops.into_iter().enumerate() {
                    match op {
                        Op::Create(id) => {
                            let created = group.buffers.create(u32::from(id), service as u32 + 1);
                            prop_assert_eq!(created.is_some(), live.insert(id));
                            held.extend(created);
                        }
                        Op::Remove(id) => {
                            prop_assert_eq!(group.buffers.remove(u32::from(id)).is_some(), live.remove(&id));
                        }
                    }
                }
                for id in 0..=u8::MAX {
                    prop_assert_eq!(group.buffers.get(u32::from(id)).is_some(), live.contains(&id));
                }
                // Held references never dangle; a removed or replaced one is just flagged.
                for buffer in &held {
                    let current = group.buffers.get(buffer.client_id());
                    prop_assert_eq!(
                        buffer.is_deleted(),
                        current.map_or(true, |b| !Rc::ptr_eq(&b, buffer))
                    );
                }
            }
        }
    }
}
