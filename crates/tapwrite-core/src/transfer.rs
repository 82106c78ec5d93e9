//! Paste and drop classification.
//!
//! Browser clipboard and drag events are reduced to a [`DataTransfer`] and
//! classified here, so the rules about which content uploads, which passes
//! through to default handling, and which gets swallowed are testable
//! without a DOM.

use smol_str::SmolStr;

use crate::html::contains_image;
use crate::platform::ImageFile;
use crate::upload::UploadMode;

/// One item of a clipboard or drag payload.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferItem<F> {
    /// MIME type of the item, e.g. `image/png` or `text/html`.
    pub mime_type: SmolStr,
    /// The file behind the item, if the host could produce one.
    pub file: Option<F>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataTransfer<F> {
    pub html: Option<String>,
    pub items: Vec<TransferItem<F>>,
}

impl<F> Default for DataTransfer<F> {
    fn default() -> Self {
        Self {
            html: None,
            items: Vec::new(),
        }
    }
}

impl<F> DataTransfer<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_item(mut self, mime_type: impl Into<SmolStr>, file: Option<F>) -> Self {
        self.items.push(TransferItem {
            mime_type: mime_type.into(),
            file,
        });
        self
    }

    fn has_image_items(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.mime_type.to_ascii_lowercase().contains("image"))
    }
}

/// What to do with a paste or drop.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferOutcome<F> {
    /// Let default handling insert the content.
    PassThrough,
    /// Consume the event and insert nothing.
    Swallow,
    /// Consume the event and upload this file.
    Upload { file: F, mode: UploadMode },
}

impl<F> TransferOutcome<F> {
    /// Whether the host event should be prevented.
    pub fn is_handled(&self) -> bool {
        !matches!(self, TransferOutcome::PassThrough)
    }
}

/// Classify a paste.
///
/// With `disabled`, pasted HTML containing images and raw image items are
/// swallowed. Otherwise the first image item uploads; an image item the host
/// could not turn into a file is swallowed.
pub fn classify_paste<F: Clone>(transfer: &DataTransfer<F>, disabled: bool) -> TransferOutcome<F> {
    if disabled {
        let html_has_image = transfer.html.as_deref().is_some_and(contains_image);
        if html_has_image || transfer.has_image_items() {
            tracing::debug!(target: "tapwrite::transfer", "image paste blocked");
            return TransferOutcome::Swallow;
        }
        return TransferOutcome::PassThrough;
    }

    let Some(item) = transfer
        .items
        .iter()
        .find(|item| item.mime_type.starts_with("image"))
    else {
        return TransferOutcome::PassThrough;
    };
    match &item.file {
        Some(file) => TransferOutcome::Upload {
            file: file.clone(),
            mode: UploadMode::Paste,
        },
        None => TransferOutcome::Swallow,
    }
}

/// Classify a drop. Only the first image file uploads.
pub fn classify_drop<F: ImageFile + Clone>(transfer: &DataTransfer<F>, disabled: bool) -> TransferOutcome<F> {
    let mut files = transfer.items.iter().filter_map(|item| item.file.as_ref()).peekable();
    if files.peek().is_none() {
        return TransferOutcome::PassThrough;
    }
    let Some(image) = files.find(|file| file.is_image()) else {
        return TransferOutcome::PassThrough;
    };
    if disabled {
        tracing::debug!(target: "tapwrite::transfer", "image drop blocked");
        return TransferOutcome::Swallow;
    }
    TransferOutcome::Upload {
        file: image.clone(),
        mode: UploadMode::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFile;

    fn png(name: &str) -> Option<MemFile> {
        Some(MemFile::png(name))
    }

    #[test]
    fn paste_uploads_first_image() {
        let transfer = DataTransfer::new()
            .with_item("text/plain", None)
            .with_item("image/png", png("one.png"))
            .with_item("image/png", png("two.png"));
        assert_eq!(
            classify_paste(&transfer, false),
            TransferOutcome::Upload {
                file: MemFile::png("one.png"),
                mode: UploadMode::Paste
            }
        );
    }

    #[test]
    fn paste_without_images_passes_through() {
        let transfer: DataTransfer<MemFile> = DataTransfer::new()
            .with_html("<p>hi</p>")
            .with_item("text/html", None);
        assert_eq!(classify_paste(&transfer, false), TransferOutcome::PassThrough);
        assert_eq!(classify_paste(&transfer, true), TransferOutcome::PassThrough);
    }

    #[test]
    fn image_item_without_file_is_swallowed() {
        let transfer: DataTransfer<MemFile> = DataTransfer::new().with_item("image/png", None);
        assert_eq!(classify_paste(&transfer, false), TransferOutcome::Swallow);
    }

    #[test]
    fn disabled_paste_swallows_images() {
        let html: DataTransfer<MemFile> =
            DataTransfer::new().with_html(r#"<p>look</p><img src="https://x/y.png">"#);
        assert_eq!(classify_paste(&html, true), TransferOutcome::Swallow);
        // The same HTML pastes normally when uploads are allowed.
        assert_eq!(classify_paste(&html, false), TransferOutcome::PassThrough);

        let file = DataTransfer::new().with_item("image/png", png("a.png"));
        assert_eq!(classify_paste(&file, true), TransferOutcome::Swallow);
    }

    #[test]
    fn drop_uploads_first_image_file() {
        let transfer = DataTransfer::new()
            .with_item("text/plain", Some(MemFile::text("notes.txt")))
            .with_item("image/jpeg", png("photo.png"))
            .with_item("image/png", png("second.png"));
        let outcome = classify_drop(&transfer, false);
        assert!(outcome.is_handled());
        assert_eq!(
            outcome,
            TransferOutcome::Upload {
                file: MemFile::png("photo.png"),
                mode: UploadMode::Drop
            }
        );
    }

    #[test]
    fn drop_of_non_images_passes_through() {
        let none: DataTransfer<MemFile> = DataTransfer::new().with_html("<p>dragged</p>");
        assert_eq!(classify_drop(&none, false), TransferOutcome::PassThrough);

        let text = DataTransfer::new().with_item("text/plain", Some(MemFile::text("a.txt")));
        assert_eq!(classify_drop(&text, false), TransferOutcome::PassThrough);
        assert_eq!(classify_drop(&text, true), TransferOutcome::PassThrough);
    }

    #[test]
    fn disabled_drop_swallows_images() {
        let transfer = DataTransfer::new().with_item("image/png", png("a.png"));
        assert_eq!(classify_drop(&transfer, true), TransferOutcome::Swallow);
    }
}
