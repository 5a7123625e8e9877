use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::modal_model::ModalModel;

/// A `SharedModel` hands one modal model to several threads.  Queries take
/// the read lock; a structural edit takes the write lock for its whole
/// duration, mirror fan-out included, so readers never see a half-mirrored
/// group.
#[derive(Clone)]
pub struct SharedModel {
    inner: Arc<RwLock<ModalModel>>,
}

impl SharedModel {
    pub fn new(model: ModalModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ModalModel> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ModalModel> {
        self.inner.write()
    }
}

impl From<ModalModel> for SharedModel {
    fn from(model: ModalModel) -> Self {
        Self::new(model)
    }
}
