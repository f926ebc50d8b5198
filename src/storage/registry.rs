//! Crawl store registry
//!
//! Opens one store per crawl snapshot at startup and discovers which crawl
//! each store holds by decoding its first key. The resulting [`Catalog`] is
//! immutable for the life of the process: picking up a new snapshot
//! requires a restart.

use crate::storage::error::{display_location, RegistryError, RegistryResult};
use crate::storage::key;
use crate::storage::sqlite::SqliteStore;
use crate::storage::store::OrderedStore;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to an opened crawl store
pub type StoreHandle = Arc<dyn OrderedStore>;

/// Immutable mapping of crawl id to store handle
#[derive(Clone, Default)]
pub struct Catalog {
    stores: BTreeMap<String, StoreHandle>,
}

impl Catalog {
    /// Open the SQLite stores at `locations` and build the catalog
    pub fn register<P: AsRef<Path>>(locations: &[P]) -> RegistryResult<Self> {
        let mut stores: Vec<StoreHandle> = Vec::with_capacity(locations.len());

        for location in locations {
            let path = location.as_ref();
            let store = SqliteStore::open(path)
                .map_err(|e| RegistryError::store(display_location(path), e))?;
            stores.push(Arc::new(store));
        }

        Self::from_stores(stores)
    }

    /// Build the catalog from already opened stores
    pub fn from_stores(stores: impl IntoIterator<Item = StoreHandle>) -> RegistryResult<Self> {
        let mut catalog: BTreeMap<String, StoreHandle> = BTreeMap::new();

        for store in stores {
            let crawl = discover_crawl(store.as_ref())?;

            if let Some(existing) = catalog.get(&crawl) {
                return Err(RegistryError::DuplicateCrawl {
                    crawl,
                    first: existing.location().to_string(),
                    second: store.location().to_string(),
                });
            }

            tracing::info!("Store at {} holds crawl {}", store.location(), crawl);
            catalog.insert(crawl, store);
        }

        Ok(Self { stores: catalog })
    }

    /// Registered crawl ids, sorted
    pub fn crawl_ids(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    /// Store holding `crawl`
    pub fn store_for(&self, crawl: &str) -> RegistryResult<StoreHandle> {
        self.stores
            .get(crawl)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownCrawl(crawl.to_string()))
    }

    pub fn contains(&self, crawl: &str) -> bool {
        self.stores.contains_key(crawl)
    }

    /// (crawl id, store location) pairs, sorted by crawl id
    pub fn locations(&self) -> Vec<(String, String)> {
        self.stores
            .iter()
            .map(|(crawl, store)| (crawl.clone(), store.location().to_string()))
            .collect()
    }

    /// Iterate (crawl id, store) pairs in crawl id order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StoreHandle)> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.locations()).finish()
    }
}

/// Read the crawl id a store holds from its first and last keys
fn discover_crawl(store: &dyn OrderedStore) -> RegistryResult<String> {
    let location = store.location().to_string();

    let first = store
        .first_key()
        .map_err(|e| RegistryError::store(location.clone(), e))?
        .ok_or_else(|| RegistryError::EmptyStore(location.clone()))?;
    let first_crawl = crawl_of(&location, &first)?;

    let last = store
        .last_key()
        .map_err(|e| RegistryError::store(location.clone(), e))?
        .ok_or_else(|| RegistryError::EmptyStore(location.clone()))?;
    let last_crawl = crawl_of(&location, &last)?;

    if first_crawl != last_crawl {
        return Err(RegistryError::MixedCrawls {
            location,
            first: first_crawl,
            last: last_crawl,
        });
    }

    Ok(first_crawl)
}

fn crawl_of(location: &str, raw: &[u8]) -> RegistryResult<String> {
    match key::decode(raw) {
        Ok(decoded) if !decoded.crawl.is_empty() => Ok(decoded.crawl),
        _ => Err(RegistryError::MalformedKey {
            location: location.to_string(),
            key: String::from_utf8_lossy(raw).into_owned(),
        }),
    }
}
