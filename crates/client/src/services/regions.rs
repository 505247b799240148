//! Region listing wrapper.

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Region, RegionsEnvelope};

/// List all regions the backend serves.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_regions(api: &ApiClient) -> Result<Vec<Region>> {
    let envelope: RegionsEnvelope = api.get("/store/regions", &[]).await?;
    Ok(envelope.regions)
}
