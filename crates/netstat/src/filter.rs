//! Remote allow-list filtering.

use std::collections::HashSet;

use crate::types::{Connection, RemoteKey};

/// Decides whether a connection is counted at all.
///
/// With no allow-list every connection passes. With one, only connections
/// whose [`RemoteKey`] is listed pass. An empty allow-list is the same as
/// none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFilter {
    allowed: Option<HashSet<RemoteKey>>,
}

impl RemoteFilter {
    /// A filter that admits every connection.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A filter that admits only the listed remotes.
    pub fn allow_list<I, K>(remotes: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<RemoteKey>,
    {
        let allowed: HashSet<RemoteKey> = remotes.into_iter().map(Into::into).collect();
        Self {
            allowed: (!allowed.is_empty()).then_some(allowed),
        }
    }

    /// Check whether the filter restricts anything.
    pub fn is_restricted(&self) -> bool {
        self.allowed.is_some()
    }

    /// Check whether a remote key passes.
    pub fn admits_key(&self, key: &str) -> bool {
        self.allowed.as_ref().is_none_or(|set| set.contains(key))
    }

    /// Check whether a connection passes.
    pub fn admits(&self, conn: &Connection) -> bool {
        match &self.allowed {
            None => true,
            Some(set) => set.contains(&conn.remote_key()),
        }
    }
}
