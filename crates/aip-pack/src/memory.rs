use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use aip_types::{Bitstream, DigitalObject, Handle, ObjectKind};

use crate::error::{PackResult, PackerError};
use crate::repository::Repository;

/// A mutating call made against an [`InMemoryRepository`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepositoryCall {
    Create(Handle),
    Clear(Handle),
    SetMetadata {
        handle: Handle,
        field: String,
        value: String,
    },
    RegisterField(String),
    SetLogo(Handle),
    AddBitstream(Handle),
    Update(Handle),
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Handle, DigitalObject>,
    fields: BTreeSet<String>,
    calls: Vec<RepositoryCall>,
}

/// In-memory repository tree for tests and embedding.
///
/// Every mutating call is recorded so tests can assert exactly what a restore
/// did.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object snapshot as-is, without recording a call.
    pub fn insert(&self, object: DigitalObject) {
        let mut state = self.state.write().expect("lock poisoned");
        state.objects.insert(object.handle.clone(), object);
    }

    /// Remove an object, unlinking it from its parent.
    pub fn remove(&self, handle: &Handle) -> Option<DigitalObject> {
        let mut state = self.state.write().expect("lock poisoned");
        let removed = state.objects.remove(handle)?;
        if let Some(parent) = removed.parent.as_ref().and_then(|p| state.objects.get_mut(p)) {
            parent.children.retain(|c| c != handle);
        }
        Some(removed)
    }

    /// Register metadata fields without recording calls.
    pub fn with_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.write().expect("lock poisoned");
            state.fields.extend(fields.into_iter().map(Into::into));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded mutating calls, oldest first.
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.state.read().expect("lock poisoned").calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.write().expect("lock poisoned").calls.clear();
    }

    /// Number of `set_metadata` calls made for `handle`.
    pub fn set_metadata_count(&self, handle: &Handle) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RepositoryCall::SetMetadata { handle: h, .. } if h == handle))
            .count()
    }

    fn with_object<T>(
        &self,
        handle: &Handle,
        call: RepositoryCall,
        f: impl FnOnce(&mut DigitalObject) -> T,
    ) -> PackResult<T> {
        let mut state = self.state.write().expect("lock poisoned");
        let object = state
            .objects
            .get_mut(handle)
            .ok_or_else(|| PackerError::NotFound(handle.clone()))?;
        let out = f(object);
        state.calls.push(call);
        Ok(out)
    }
}

impl Repository for InMemoryRepository {
    fn find(&self, handle: &Handle) -> PackResult<Option<DigitalObject>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.objects.get(handle).cloned())
    }

    fn create(
        &self,
        kind: ObjectKind,
        handle: &Handle,
        parent: Option<&Handle>,
    ) -> PackResult<DigitalObject> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.objects.contains_key(handle) {
            return Err(PackerError::AlreadyExists(handle.clone()));
        }
        let mut object = DigitalObject::new(kind, handle.clone());
        if let Some(parent) = parent {
            let owner = state
                .objects
                .get_mut(parent)
                .ok_or_else(|| PackerError::MissingParent(parent.clone()))?;
            owner.children.push(handle.clone());
            object.parent = Some(parent.clone());
        }
        state.objects.insert(handle.clone(), object.clone());
        state.calls.push(RepositoryCall::Create(handle.clone()));
        Ok(object)
    }

    fn clear(&self, handle: &Handle) -> PackResult<()> {
        self.with_object(handle, RepositoryCall::Clear(handle.clone()), |object| {
            object.metadata.clear();
            object.bitstreams.clear();
            object.logo = None;
        })
    }

    fn set_metadata(&self, handle: &Handle, field: &str, value: &str) -> PackResult<()> {
        let call = RepositoryCall::SetMetadata {
            handle: handle.clone(),
            field: field.to_string(),
            value: value.to_string(),
        };
        self.with_object(handle, call, |object| {
            object.metadata.insert(field.to_string(), value.to_string());
        })
    }

    fn field_registered(&self, field: &str) -> PackResult<bool> {
        Ok(self.state.read().expect("lock poisoned").fields.contains(field))
    }

    fn register_field(&self, field: &str) -> PackResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.fields.insert(field.to_string());
        state.calls.push(RepositoryCall::RegisterField(field.to_string()));
        Ok(())
    }

    fn set_logo(&self, handle: &Handle, logo: Bitstream) -> PackResult<()> {
        self.with_object(handle, RepositoryCall::SetLogo(handle.clone()), |object| {
            object.logo = Some(logo);
        })
    }

    fn add_bitstream(&self, handle: &Handle, bitstream: Bitstream) -> PackResult<()> {
        self.with_object(handle, RepositoryCall::AddBitstream(handle.clone()), |object| {
            object.bitstreams.retain(|b| b.id != bitstream.id);
            object.bitstreams.push(bitstream);
        })
    }

    fn update(&self, handle: &Handle) -> PackResult<()> {
        self.with_object(handle, RepositoryCall::Update(handle.clone()), |_| ())
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryRepository")
            .field("objects", &state.objects.len())
            .field("fields", &state.fields.len())
            .finish()
    }
}
