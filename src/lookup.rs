use crate::cache::BoundedCache;
use anyhow::Context;
use log::debug;
use std::sync::Arc;

/// A slow source of string payloads keyed by a two-part identifier.
pub trait Fetcher {
    fn fetch(&self, primary: &str, secondary: &str) -> anyhow::Result<String>;
}

impl<F> Fetcher for F
where
    F: Fn(&str, &str) -> anyhow::Result<String>,
{
    fn fetch(&self, primary: &str, secondary: &str) -> anyhow::Result<String> {
        self(primary, secondary)
    }
}

/// Puts a [`BoundedCache`] in front of a [`Fetcher`].
///
/// Lookups are served from the cache while the entry is live; otherwise the
/// fetcher is called and a non-empty payload is cached. Fetch failures are
/// returned as-is and leave the cache untouched.
#[derive(Debug)]
pub struct CachedLookup<F> {
    fetcher: F,
    cache: Arc<BoundedCache>,
}

impl<F: Fetcher> CachedLookup<F> {
    pub fn new(fetcher: F, cache: Arc<BoundedCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<BoundedCache> {
        &self.cache
    }

    pub fn get(&self, primary: &str, secondary: &str) -> anyhow::Result<String> {
        if let Some(hit) = self.cache.get(primary, secondary)? {
            return Ok(hit);
        }

        debug!("cache miss for {primary}-{secondary}, fetching");
        let payload = self
            .fetcher
            .fetch(primary, secondary)
            .with_context(|| format!("fetching {primary}-{secondary}"))?;
        if !payload.is_empty() {
            self.cache.put(primary, secondary, &payload)?;
        }
        Ok(payload)
    }
}
