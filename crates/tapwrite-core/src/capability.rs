//! Host-supplied upload and delete capabilities.

use futures_util::future::LocalBoxFuture;

use crate::error::UploadError;

/// Resolves to the uploaded image URL, or `None` if the host produced none.
pub type UploadFuture = LocalBoxFuture<'static, Result<Option<String>, UploadError>>;

/// Uploads a file and reports where it ended up. Called once per upload,
/// never retried.
pub trait ImageUploader<F> {
    fn upload(&self, file: &F) -> UploadFuture;
}

impl<F, T> ImageUploader<F> for T
where
    T: Fn(&F) -> UploadFuture,
{
    fn upload(&self, file: &F) -> UploadFuture {
        self(file)
    }
}

/// Deletes a previously uploaded image. Fire-and-forget: failures are the
/// implementation's to log.
pub trait ImageDeleter {
    fn delete_image(&self, src: &str);
}

impl<T> ImageDeleter for T
where
    T: Fn(&str),
{
    fn delete_image(&self, src: &str) {
        self(src)
    }
}
