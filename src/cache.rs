use crate::error;
use crate::index;
use crate::normalize;
use crate::provider;

pub type Constituents = std::sync::Arc<Vec<index::ConstituentRecord>>;

/// Key of one cached constituent list: `"{source}_{code}"`.
pub fn cache_key(source: index::IndexSource, code: &str) -> String {
    format!("{}_{}", source, code)
}

/// Process-lifetime memo of normalized constituent lists and provider catalogues.
///
/// Created once at startup and shared by reference; entries are never
/// evicted or refreshed. The lock only guards map reads and inserts, so two
/// callers missing on the same key may both hit the provider. The second
/// insert overwrites an identical value.
pub struct ConstituentCache {
    provider: std::sync::Arc<dyn provider::IndexDataProvider>,
    entries: std::sync::RwLock<std::collections::HashMap<String, Constituents>>,
    listings: std::sync::RwLock<ListingMemo>,
}

type ListingMemo = std::collections::HashMap<index::IndexSource, std::sync::Arc<Vec<index::IndexListing>>>;

impl ConstituentCache {
    pub fn new(provider: std::sync::Arc<dyn provider::IndexDataProvider>) -> Self {
        Self {
            provider,
            entries: std::sync::RwLock::new(std::collections::HashMap::new()),
            listings: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Returns the constituents of `code`, fetching and normalizing them on a miss.
    ///
    /// Failed fetches are not remembered; the next call tries again.
    pub fn get_or_fetch(&self, source: index::IndexSource, code: &str) -> error::Result<Constituents> {
        let key = cache_key(source, code);
        if let Some(hit) = self.read_entries().get(&key) {
            log::debug!("Cache hit for {}", key);
            return Ok(std::sync::Arc::clone(hit));
        }

        log::debug!("Cache miss for {}", key);
        let start = std::time::Instant::now();
        let raw = self
            .provider
            .fetch_raw_constituents(source, code)
            .map_err(|e| error::OverlapError::fetch(source, code, &e))?;
        let records = std::sync::Arc::new(normalize::normalize(raw, source, code)?);
        log::info!(
            "Fetched {} constituents for {} in {:.3}s",
            records.len(),
            key,
            start.elapsed().as_secs_f64()
        );

        self.write_entries().insert(key, std::sync::Arc::clone(&records));
        Ok(records)
    }

    /// Returns the provider's index catalogue, memoized per source.
    pub fn index_list(&self, source: index::IndexSource) -> error::Result<std::sync::Arc<Vec<index::IndexListing>>> {
        let cached = self
            .listings
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&source)
            .cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let listings = self
            .provider
            .fetch_index_list(source)
            .map_err(|e| error::OverlapError::IndexListFetch {
                index_source: source,
                cause: format!("{:#}", e),
            })?;
        let listings = std::sync::Arc::new(listings);
        self.listings
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(source, std::sync::Arc::clone(&listings));

        Ok(listings)
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means another request panicked mid-insert; the map itself is intact.
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, std::collections::HashMap<String, Constituents>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, std::collections::HashMap<String, Constituents>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
