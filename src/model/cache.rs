//! Asset prefetch cache: asset id -> delivery URL
//!
//! Entries are only ever appended; nothing is evicted for the lifetime of the
//! app session. The cache builds URLs, it never fetches them.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::Track;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Audio,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub id: String,
}

impl AssetRef {
    pub fn artwork(track: &Track) -> Self {
        Self { kind: AssetKind::Image, id: track.img_id.clone() }
    }

    pub fn audio(track: &Track) -> Self {
        Self { kind: AssetKind::Audio, id: track.file_id.clone() }
    }
}

/// Turns an asset id into a URL the rendering layer or audio device can fetch
pub trait AssetDelivery: Send + Sync {
    fn url_for(&self, asset: &AssetRef) -> String;
}

/// Delivery through the `/api/image-proxy` and `/api/audio-proxy` endpoints
pub struct ProxyDelivery {
    base_url: String,
}

impl ProxyDelivery {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

impl AssetDelivery for ProxyDelivery {
    fn url_for(&self, asset: &AssetRef) -> String {
        let endpoint = match asset.kind {
            AssetKind::Image => "image-proxy",
            AssetKind::Audio => "audio-proxy",
        };
        format!(
            "{}/api/{}?fileid={}",
            self.base_url,
            endpoint,
            urlencoding::encode(&asset.id)
        )
    }
}

pub struct AssetCache {
    delivery: Arc<dyn AssetDelivery>,
    urls: HashMap<AssetRef, String>,
}

impl AssetCache {
    pub fn new(delivery: Arc<dyn AssetDelivery>) -> Self {
        Self {
            delivery,
            urls: HashMap::new(),
        }
    }

    /// Store a URL for `asset` unless one is already cached. Returns true when added.
    pub fn ensure(&mut self, asset: AssetRef) -> bool {
        if self.urls.contains_key(&asset) {
            return false;
        }
        let url = self.delivery.url_for(&asset);
        self.urls.insert(asset, url);
        true
    }

    pub fn ensure_many<I>(&mut self, assets: I) -> usize
    where
        I: IntoIterator<Item = AssetRef>,
    {
        let added = assets
            .into_iter()
            .filter(|asset| self.ensure(asset.clone()))
            .count();
        if added > 0 {
            tracing::trace!(added, total = self.urls.len(), "Asset URLs cached");
        }
        added
    }

    pub fn ensure_artwork<'a, I>(&mut self, tracks: I) -> usize
    where
        I: IntoIterator<Item = &'a Track>,
    {
        self.ensure_many(tracks.into_iter().map(AssetRef::artwork))
    }

    /// Cached URL, computing it on first use
    pub fn resolve(&mut self, asset: AssetRef) -> String {
        self.urls
            .entry(asset)
            .or_insert_with_key(|asset| self.delivery.url_for(asset))
            .clone()
    }

    pub fn get(&self, asset: &AssetRef) -> Option<&str> {
        self.urls.get(asset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how many URLs were built
    #[derive(Default)]
    struct CountingDelivery {
        pub calls: AtomicUsize,
    }

    impl AssetDelivery for CountingDelivery {
        fn url_for(&self, asset: &AssetRef) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("test://{:?}/{}", asset.kind, asset.id)
        }
    }

    fn image(id: &str) -> AssetRef {
        AssetRef { kind: AssetKind::Image, id: id.to_string() }
    }

    #[test]
    fn proxy_urls_are_percent_encoded() {
        let delivery = ProxyDelivery::new("http://host");
        assert_eq!(
            delivery.url_for(&image("a b")),
            "http://host/api/image-proxy?fileid=a%20b"
        );
        let audio = AssetRef { kind: AssetKind::Audio, id: "f1".to_string() };
        assert_eq!(delivery.url_for(&audio), "http://host/api/audio-proxy?fileid=f1");
    }

    #[test]
    fn ensure_never_reissues_a_cached_url() {
        let delivery = Arc::new(CountingDelivery::default());
        let mut cache = AssetCache::new(delivery.clone());

        assert!(cache.ensure(image("1")));
        assert!(!cache.ensure(image("1")));
        assert_eq!(cache.ensure_many([image("1"), image("2"), image("3")]), 2);

        assert_eq!(delivery.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn resolve_is_idempotent() {
        let delivery = Arc::new(CountingDelivery::default());
        let mut cache = AssetCache::new(delivery.clone());

        let first = cache.resolve(image("7"));
        let second = cache.resolve(image("7"));
        assert_eq!(first, second);
        assert_eq!(cache.get(&image("7")), Some(first.as_str()));
        assert_eq!(delivery.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_id_different_kind_are_distinct() {
        let mut cache = AssetCache::new(Arc::new(ProxyDelivery::new("http://h")));
        cache.ensure(image("x"));
        assert!(cache.ensure(AssetRef { kind: AssetKind::Audio, id: "x".to_string() }));
    }
}
