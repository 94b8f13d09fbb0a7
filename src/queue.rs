//! Command queues.

use crate::handle::Handle;
use crate::platform::Device;
use crate::runtime::{QueueProperties, RawQueue};

/// A work-submission channel bound to one device of its context.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    handle: Handle<RawQueue>,
    device: Device,
    properties: QueueProperties,
}

impl CommandQueue {
    pub(crate) fn new(handle: Handle<RawQueue>, device: Device, properties: QueueProperties) -> Self {
        Self {
            handle,
            device,
            properties,
        }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawQueue {
        self.handle.raw()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &Handle<RawQueue> {
        &self.handle
    }

    /// The device commands are submitted to.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn properties(&self) -> QueueProperties {
        self.properties
    }

    #[must_use]
    pub fn is_out_of_order(&self) -> bool {
        self.properties
            .contains(QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE)
    }
}
