//! Customer profile endpoint wrappers.

use serde_json::json;

use bramble_core::Email;

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Customer, CustomerEnvelope, ProfileUpdate};

/// Fetch the authenticated customer's profile.
///
/// # Errors
///
/// Returns [`SessionExpired`](crate::StoreError::SessionExpired) if no valid
/// token accompanies the request, or another error if the request fails.
pub async fn get_profile(api: &ApiClient) -> Result<Customer> {
    let envelope: CustomerEnvelope = api.get("/store/customers/me", &[]).await?;
    Ok(envelope.customer)
}

/// Update the authenticated customer's profile.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn update_profile(api: &ApiClient, update: &ProfileUpdate) -> Result<Customer> {
    let envelope: CustomerEnvelope = api.post("/store/customers/me", update).await?;
    Ok(envelope.customer)
}

/// Create the store-customer record after auth registration.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn create_store_customer(
    api: &ApiClient,
    email: &Email,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Customer> {
    let envelope: CustomerEnvelope = api
        .post(
            "/store/customers",
            &json!({
                "email": email.as_str(),
                "first_name": first_name,
                "last_name": last_name,
            }),
        )
        .await?;
    Ok(envelope.customer)
}
