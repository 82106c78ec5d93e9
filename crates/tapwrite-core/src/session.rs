//! Per-editor session context.
//!
//! Everything an upload needs from the host lives here instead of in
//! process-wide state, so two editors on one page never share an uploader.

use std::rc::Rc;

use crate::capability::{ImageDeleter, ImageUploader};
use crate::platform::ImagePlatform;

pub struct EditorSession<P: ImagePlatform> {
    platform: Rc<P>,
    uploader: Option<Rc<dyn ImageUploader<P::File>>>,
    deleter: Option<Rc<dyn ImageDeleter>>,
}

impl<P: ImagePlatform> Clone for EditorSession<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            uploader: self.uploader.clone(),
            deleter: self.deleter.clone(),
        }
    }
}

impl<P: ImagePlatform> EditorSession<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform: Rc::new(platform),
            uploader: None,
            deleter: None,
        }
    }

    pub fn with_uploader(mut self, uploader: impl ImageUploader<P::File> + 'static) -> Self {
        self.uploader = Some(Rc::new(uploader));
        self
    }

    pub fn with_deleter(mut self, deleter: impl ImageDeleter + 'static) -> Self {
        self.deleter = Some(Rc::new(deleter));
        self
    }

    pub fn set_uploader(&mut self, uploader: Option<Rc<dyn ImageUploader<P::File>>>) {
        self.uploader = uploader;
    }

    pub fn set_deleter(&mut self, deleter: Option<Rc<dyn ImageDeleter>>) {
        self.deleter = deleter;
    }

    pub fn platform(&self) -> Rc<P> {
        self.platform.clone()
    }

    pub fn uploader(&self) -> Option<Rc<dyn ImageUploader<P::File>>> {
        self.uploader.clone()
    }

    pub fn deleter(&self) -> Option<Rc<dyn ImageDeleter>> {
        self.deleter.clone()
    }
}
