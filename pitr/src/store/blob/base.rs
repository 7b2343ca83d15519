use std::future::Future;
use tokio::io::AsyncRead;

use crate::error::PitrResult;

/// Owned reader over the content of a stored object.
pub type BlobReader = Box<dyn AsyncRead + Unpin + Send>;

/// This trait represents an object store holding archived binlogs.
///
/// Objects are addressed by name and a write fully replaces any previous object with the same
/// name, so writing the same object twice is harmless.
pub trait BlobStore {
    /// Returns a reader over the object named `name`.
    ///
    /// A missing object is reported with [`crate::error::ErrorKind::ObjectNotFound`] so callers
    /// can tell it apart from any other storage failure.
    fn get_object(&self, name: &str) -> impl Future<Output = PitrResult<BlobReader>> + Send;

    /// Uploads the whole content of `reader` under `name` and returns the number of bytes stored.
    ///
    /// Implementations must stream the content instead of buffering it entirely, and must not
    /// leave a complete object behind when the upload or the reader fails.
    fn put_object<R>(&self, name: &str, reader: R) -> impl Future<Output = PitrResult<u64>> + Send
    where
        R: AsyncRead + Unpin + Send;
}
