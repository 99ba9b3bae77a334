//! In-process reservations for (project, platform, version) triples.
//!
//! An ingest takes a reservation before writing any bytes and holds it until
//! the catalog append has succeeded or failed, so two concurrent uploads of
//! the same version cannot both reach storage.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use depot_core::Platform;
use std::sync::Arc;
use uuid::Uuid;

type VersionKey = (Uuid, Platform, String);

/// Shared set of in-flight versions.
#[derive(Clone, Debug, Default)]
pub struct VersionLocks {
    held: Arc<DashMap<VersionKey, ()>>,
}

impl VersionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a version, or `None` if another ingest holds it.
    pub fn try_reserve(
        &self,
        project_id: Uuid,
        platform: Platform,
        version: &str,
    ) -> Option<Reservation> {
        let key = (project_id, platform, version.to_string());
        match self.held.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Reservation {
                    held: self.held.clone(),
                    key,
                })
            }
        }
    }

    pub fn is_reserved(&self, project_id: Uuid, platform: Platform, version: &str) -> bool {
        self.held
            .contains_key(&(project_id, platform, version.to_string()))
    }

    /// Number of versions currently reserved.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Releases its version when dropped.
#[derive(Debug)]
pub struct Reservation {
    held: Arc<DashMap<VersionKey, ()>>,
    key: VersionKey,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.held.remove(&self.key);
    }
}
