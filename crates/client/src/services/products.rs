//! Product catalog service with in-memory caching.
//!
//! Catalog reads are the only cached responses in the client: products
//! change rarely, and browse screens hammer the same listings. 5-minute TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use bramble_core::{ProductId, RegionId};

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Product, ProductEnvelope, ProductsEnvelope};

/// Cache key for catalog reads. Prices vary per region, so the region id is
/// part of every key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product { id: ProductId, region: RegionId },
    Products { region: RegionId },
}

/// Cached value types.
#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

/// Client for the product browse endpoints.
///
/// Cheaply cloneable; the cache is shared between clones.
#[derive(Clone)]
pub struct ProductService {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductService {
    /// Cache capacity (entries).
    const CACHE_CAPACITY: u64 = 1000;

    /// Cache time-to-live.
    const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Create a new product service over the shared API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(Self::CACHE_CAPACITY)
            .time_to_live(Self::CACHE_TTL)
            .build();

        Self { api, cache }
    }

    /// List products priced for a region.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_products(&self, region_id: &RegionId) -> Result<Arc<Vec<Product>>> {
        let key = CacheKey::Products {
            region: region_id.clone(),
        };

        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            debug!(region_id = %region_id, "cache hit for product list");
            return Ok(products);
        }

        let envelope: ProductsEnvelope = self
            .api
            .get("/store/products", &[("region_id", region_id.as_str())])
            .await?;

        let products = Arc::new(envelope.products);
        self.cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Fetch one product priced for a region.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    pub async fn get_product(
        &self,
        product_id: &ProductId,
        region_id: &RegionId,
    ) -> Result<Product> {
        let key = CacheKey::Product {
            id: product_id.clone(),
            region: region_id.clone(),
        };

        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!(product_id = %product_id, "cache hit for product");
            return Ok(*product);
        }

        let envelope: ProductEnvelope = self
            .api
            .get(
                &format!("/store/products/{product_id}"),
                &[("region_id", region_id.as_str())],
            )
            .await?;

        self.cache
            .insert(key, CacheValue::Product(Box::new(envelope.product.clone())))
            .await;

        Ok(envelope.product)
    }
}
