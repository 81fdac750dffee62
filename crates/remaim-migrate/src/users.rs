//! Mapping source user names to destination user PHIDs.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use remaim_core::{DestinationTracker, Result};
use tracing::debug;

/// Run-scoped cache of `real name -> PHID`.
///
/// Names are looked up in batches and only once per run. The cache only
/// ever grows.
pub struct UserDirectory {
    destination: Arc<dyn DestinationTracker>,
    cache: HashMap<String, String>,
}

impl UserDirectory {
    pub fn new(destination: Arc<dyn DestinationTracker>) -> Self {
        Self {
            destination,
            cache: HashMap::new(),
        }
    }

    /// PHIDs for the given names. Names without a destination user are
    /// left out.
    pub async fn resolve(&mut self, names: &[String]) -> Result<HashMap<String, String>> {
        let unknown: BTreeSet<&String> = names
            .iter()
            .filter(|name| !name.is_empty() && !self.cache.contains_key(*name))
            .collect();

        if !unknown.is_empty() {
            let query: Vec<String> = unknown.into_iter().cloned().collect();
            debug!(count = query.len(), "Looking up destination users");

            let found = self.destination.query_users_by_real_name(query).await?;
            self.cache
                .extend(found.into_iter().map(|user| (user.real_name, user.phid)));
        }

        Ok(names
            .iter()
            .filter_map(|name| {
                self.cache
                    .get(name)
                    .map(|phid| (name.clone(), phid.clone()))
            })
            .collect())
    }

    /// PHIDs in the order of `names`, unknown users dropped.
    pub async fn resolve_ordered(&mut self, names: &[String]) -> Result<Vec<String>> {
        let found = self.resolve(names).await?;
        let mut seen = BTreeSet::new();
        Ok(names
            .iter()
            .filter_map(|name| found.get(name))
            .filter(|phid| seen.insert(phid.as_str()))
            .cloned()
            .collect())
    }

    pub async fn resolve_one(&mut self, name: &str) -> Result<Option<String>> {
        let mut found = self.resolve(&[name.to_string()]).await?;
        Ok(found.remove(name))
    }

    /// Number of users known so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
