//! Snapshot sources.
//!
//! A [`SnapshotSource`] lists the connections visible to the host right now.
//! The collector calls it once per cycle and never holds on to the result.
//!
//! - [`ProcNetSource`] reads `/proc/net/{tcp,tcp6,udp,udp6}` (feature `procfs`)
//! - [`StaticSource`] returns a fixed list
//! - [`from_fn`] wraps a closure

#[cfg(feature = "procfs")]
pub mod procfs;

#[cfg(feature = "procfs")]
pub use procfs::ProcNetSource;

use std::sync::Arc;

use crate::error::Result;
use crate::types::Connection;

/// Provider of connection snapshots.
pub trait SnapshotSource {
    /// List the current connections.
    ///
    /// Failures should be reported as
    /// [`Error::SourceUnavailable`](crate::Error::SourceUnavailable).
    fn connections(&self) -> Result<Vec<Connection>>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn connections(&self) -> Result<Vec<Connection>> {
        (**self).connections()
    }
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    fn connections(&self) -> Result<Vec<Connection>> {
        (**self).connections()
    }
}

/// Source that returns the same connections every time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSource {
    connections: Vec<Connection>,
}

impl StaticSource {
    /// Create a source over a fixed list.
    pub fn new(connections: Vec<Connection>) -> Self {
        Self { connections }
    }
}

impl FromIterator<Connection> for StaticSource {
    fn from_iter<I: IntoIterator<Item = Connection>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl SnapshotSource for StaticSource {
    fn connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.clone())
    }
}

/// Source backed by a closure. Created by [`from_fn`].
#[derive(Debug, Clone)]
pub struct FromFn<F>(F);

/// Create a source that calls `f` for every snapshot.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn() -> Result<Vec<Connection>>,
{
    FromFn(f)
}

impl<F> SnapshotSource for FromFn<F>
where
    F: Fn() -> Result<Vec<Connection>>,
{
    fn connections(&self) -> Result<Vec<Connection>> {
        (self.0)()
    }
}
