//! The bundler seam.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::BundleError;

/// Boxed future returned by [`Bundler::bundle`].
pub type BundleFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BundleError>> + Send + 'a>>;

/// Trait abstracting the external bundler.
///
/// Production code uses [`CommandBundler`](crate::CommandBundler); tests can
/// provide an implementation that writes canned output or fails on demand.
pub trait Bundler: Send + Sync {
    /// Compile `entry` into a single script written to `output`.
    ///
    /// Implementations must not report success before `output` is fully
    /// written.
    fn bundle<'a>(&'a self, entry: &'a Path, output: &'a Path) -> BundleFuture<'a>;
}
