use common::{ids::Id, leases::LeaseRecord};
use std::collections::HashMap;

/// Leases owned by this connector's layer, keyed by the camera they proxy.
#[derive(Debug, Clone, Default)]
pub struct LeaseIndex {
    by_source: HashMap<String, LeaseRecord>,
}

impl LeaseIndex {
    /// Keeps only leases on `own_layer` with a non-empty `source_id`.
    /// A later lease for the same source replaces an earlier one.
    pub fn build(leases: impl IntoIterator<Item = LeaseRecord>, own_layer: &Id) -> Self {
        let mut by_source = HashMap::new();
        for lease in leases {
            if !lease.is_owned_by(own_layer) {
                continue;
            }
            let Some(source_id) = lease.source_id.clone().filter(|s| !s.trim().is_empty()) else {
                continue;
            };
            by_source.insert(source_id, lease);
        }
        Self { by_source }
    }

    pub fn get(&self, camera_id: &str) -> Option<&LeaseRecord> {
        self.by_source.get(camera_id)
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.by_source.contains_key(camera_id)
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}
