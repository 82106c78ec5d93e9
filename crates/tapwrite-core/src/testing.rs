//! In-memory platform and view used by the crate's tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use smol_str::{SmolStr, format_smolstr};
use tokio::sync::oneshot;

use crate::capability::UploadFuture;
use crate::error::UploadError;
use crate::model::{Document, Schema, Token};
use crate::platform::{ImageFile, ImagePlatform, PlatformError, PlatformFuture};
use crate::session::EditorSession;
use crate::state::{EditorState, Transaction};
use crate::upload::EditorView;

#[derive(Clone, Debug, PartialEq)]
pub struct MemFile {
    pub name: SmolStr,
    pub mime: SmolStr,
}

impl MemFile {
    pub fn png(name: &str) -> Self {
        Self {
            name: name.into(),
            mime: "image/png".into(),
        }
    }

    pub fn text(name: &str) -> Self {
        Self {
            name: name.into(),
            mime: "text/plain".into(),
        }
    }
}

impl ImageFile for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime
    }
}

#[derive(Default)]
pub struct MemPlatform {
    pub released: RefCell<Vec<SmolStr>>,
    pub fail_preload: bool,
    pub picked: RefCell<Option<MemFile>>,
}

impl ImagePlatform for MemPlatform {
    type File = MemFile;

    fn create_preview(&self, file: &MemFile) -> Result<SmolStr, PlatformError> {
        Ok(format_smolstr!("blob:{}", file.name))
    }

    fn release_preview(&self, preview: &str) {
        self.released.borrow_mut().push(preview.into());
    }

    fn preload(&self, url: &str) -> PlatformFuture<Result<(), PlatformError>> {
        let result = if self.fail_preload {
            Err(PlatformError(format!("failed to load {url}")))
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn pick_image(&self) -> PlatformFuture<Option<MemFile>> {
        let file = self.picked.borrow_mut().take();
        Box::pin(async move { file })
    }
}

/// Uploads that resolve only when the test says so, oldest or newest first.
#[derive(Clone, Default)]
pub struct ManualUploads {
    waiting: Rc<RefCell<VecDeque<oneshot::Sender<Result<Option<String>, UploadError>>>>>,
}

impl ManualUploads {
    pub fn uploader(&self) -> impl Fn(&MemFile) -> UploadFuture + 'static {
        let waiting = self.waiting.clone();
        move |_file: &MemFile| -> UploadFuture {
            let (tx, rx) = oneshot::channel();
            waiting.borrow_mut().push_back(tx);
            Box::pin(async move {
                rx.await
                    .map_err(|_| UploadError::Rejected("upload dropped".into()))?
            })
        }
    }

    pub fn pending(&self) -> usize {
        self.waiting.borrow().len()
    }

    /// Resolve the oldest pending upload.
    pub fn resolve(&self, result: Result<Option<String>, UploadError>) {
        let tx = self.waiting.borrow_mut().pop_front();
        if let Some(tx) = tx {
            let _ = tx.send(result);
        }
    }

    /// Resolve the most recently started pending upload.
    pub fn resolve_newest(&self, result: Result<Option<String>, UploadError>) {
        let tx = self.waiting.borrow_mut().pop_back();
        if let Some(tx) = tx {
            let _ = tx.send(result);
        }
    }
}

pub struct TestView {
    pub state: EditorState,
    pub session: EditorSession<MemPlatform>,
    pub editable: bool,
}

impl TestView {
    pub fn new(tokens: Vec<Token>, session: EditorSession<MemPlatform>) -> Self {
        let doc = Document::from_tokens(tokens, Schema::default()).unwrap();
        Self {
            state: EditorState::new(doc),
            session,
            editable: true,
        }
    }

    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }
}

impl EditorView for TestView {
    type Platform = MemPlatform;

    fn state(&self) -> &EditorState {
        &self.state
    }

    fn dispatch(&mut self, tr: Transaction) {
        self.state = self.state.apply(tr).unwrap();
    }

    fn session(&self) -> &EditorSession<MemPlatform> {
        &self.session
    }

    fn is_editable(&self) -> bool {
        self.editable
    }
}

/// Image sources in document order.
pub fn image_srcs(doc: &Document) -> Vec<String> {
    doc.tokens()
        .iter()
        .filter_map(|t| match t {
            Token::Image(attrs) => attrs.src.as_ref().map(|s| s.to_string()),
            _ => None,
        })
        .collect()
}
