//! Named object storage for bundles.

use crate::{Chunks, Error};
use bytes::Bytes;
use futures::stream::BoxStream;
use std::future::Future;

mod directory;
pub use directory::Directory;
mod memory;
pub use memory::Memory;

/// Body of a stored object, read in chunks.
pub type Body = BoxStream<'static, Result<Bytes, Error>>;

/// An object store holding bundles by name.
pub trait Store: Clone + Send + Sync + 'static {
    /// Whether an object named `name` has been committed.
    fn exists(&self, name: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Open a committed object, failing with [Error::NotFound] if it does not exist.
    fn open(&self, name: &str) -> impl Future<Output = Result<Body, Error>> + Send;

    /// Write `body` under `name`, replacing any existing object.
    ///
    /// The object becomes visible only if `body` ends without error. If `body` yields an error
    /// (or the returned future is dropped), nothing is committed.
    fn write<B: Chunks>(&self, name: &str, body: B)
        -> impl Future<Output = Result<(), Error>> + Send;
}

/// A [Store] that can enumerate its objects.
pub trait List: Store {
    /// Names of all committed objects, in no particular order.
    fn list(&self) -> impl Future<Output = Result<Vec<String>, Error>> + Send;
}
