//! Owned native handles.
//!
//! Every wrapper in this crate holds exactly one [`Handle`]. A handle owns one
//! native reference: cloning it retains the object, dropping it releases the
//! object. Two clones therefore alias the same native resource with an
//! explicit shared count, and the resource is destroyed by the runtime when
//! the last reference goes away.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::runtime::{ComputeRuntime, NativeObject, Status};

/// One owned reference to a native object.
pub struct Handle<T: NativeObject> {
    raw: T,
    runtime: Arc<dyn ComputeRuntime>,
}

impl<T: NativeObject> Handle<T> {
    /// Takes ownership of the reference a creation call returned.
    pub(crate) fn adopt(runtime: Arc<dyn ComputeRuntime>, raw: T) -> Self {
        Self { raw, runtime }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> T {
        self.raw
    }

    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ComputeRuntime> {
        &self.runtime
    }

    /// Takes an additional native reference, reporting a failed retain.
    pub fn try_clone(&self) -> Result<Self, Status> {
        self.runtime.retain(self.raw.to_object())?;
        Ok(Self {
            raw: self.raw,
            runtime: Arc::clone(&self.runtime),
        })
    }
}

impl<T: NativeObject> Clone for Handle<T> {
    fn clone(&self) -> Self {
        if let Err(status) = self.runtime.retain(self.raw.to_object()) {
            log::error!("Failed to retain {:?}: {status}", self.raw);
        }
        Self {
            raw: self.raw,
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<T: NativeObject> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Err(status) = self.runtime.release(self.raw.to_object()) {
            log::warn!("Failed to release {:?}: {status}", self.raw);
        }
    }
}

impl<T: NativeObject> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl<T: NativeObject> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}

impl<T: NativeObject + PartialEq> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: NativeObject + Eq> Eq for Handle<T> {}

impl<T: NativeObject + Hash> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
