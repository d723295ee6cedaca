//! Bundler invocation for devloop.
//!
//! The bundler itself is an external collaborator: given an entry module it
//! produces a single compiled script, or fails. This crate provides:
//!
//! - [`Bundler`] trait, the seam between devloop and the actual tool
//! - [`CommandBundler`], which runs the tool as a sub-process
//! - [`BundlerAdapter`], which owns the fixed entry/output pair and swaps a
//!   finished build into place without touching the served artifact on failure
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use devloop_bundler::{BundlerAdapter, CommandBundler};
//!
//! let bundler = Arc::new(CommandBundler::from_config(&config.bundle_resolved));
//! let adapter = BundlerAdapter::new(bundler, entry, output);
//! adapter.rebuild().await?;
//! ```

mod adapter;
mod bundler;
mod command;
mod error;

pub use adapter::BundlerAdapter;
pub use bundler::{BundleFuture, Bundler};
pub use command::CommandBundler;
pub use error::BundleError;
