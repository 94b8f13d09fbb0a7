//! Program objects.

use std::sync::Arc;

use crate::handle::Handle;
use crate::runtime::RawProgram;

/// A program object created from one source fragment. Not built.
#[derive(Debug, Clone)]
pub struct Program {
    handle: Handle<RawProgram>,
    source: Arc<str>,
}

impl Program {
    pub(crate) fn new(handle: Handle<RawProgram>, source: Arc<str>) -> Self {
        Self { handle, source }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawProgram {
        self.handle.raw()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &Handle<RawProgram> {
        &self.handle
    }

    /// The source text the program was created from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}
