//! Platform abstraction traits for image handling.
//!
//! These traits define the interface between the upload pipeline and the
//! host environment (browser, tests, native shells). The browser
//! implementation uses object URLs, `HTMLImageElement::decode` and a hidden
//! file input; tests use in-memory fakes.

use futures_util::future::LocalBoxFuture;
use smol_str::SmolStr;

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Future returned by platform operations. The host event loop is
/// single-threaded, so it need not be `Send`.
pub type PlatformFuture<T> = LocalBoxFuture<'static, T>;

/// A file handed to the editor by the host.
pub trait ImageFile {
    fn name(&self) -> &str;

    /// MIME type as reported by the host, e.g. `image/png`.
    fn mime_type(&self) -> &str;

    /// Whether the MIME type names an image (case-insensitive).
    fn is_image(&self) -> bool {
        self.mime_type().to_ascii_lowercase().contains("image")
    }
}

/// Platform services the upload pipeline needs.
pub trait ImagePlatform {
    type File: ImageFile + Clone + 'static;

    /// Create a local preview URL for a file.
    fn create_preview(&self, file: &Self::File) -> Result<SmolStr, PlatformError>;

    /// Release a preview URL created by `create_preview`.
    fn release_preview(&self, preview: &str);

    /// Resolve once the image at `url` has loaded.
    fn preload(&self, url: &str) -> PlatformFuture<Result<(), PlatformError>>;

    /// Ask the user for one image file. Resolves to `None` if they cancel.
    fn pick_image(&self) -> PlatformFuture<Option<Self::File>>;
}
