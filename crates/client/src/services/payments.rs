//! Payment collection/session endpoint wrappers.

use serde_json::json;
use tracing::debug;

use bramble_core::{CartId, PaymentCollectionId, PaymentProviderId};

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{PaymentCollection, PaymentCollectionEnvelope};

/// Create a payment collection for a cart.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn create_payment_collection(
    api: &ApiClient,
    cart_id: &CartId,
) -> Result<PaymentCollection> {
    let envelope: PaymentCollectionEnvelope = api
        .post("/store/payment-collections", &json!({ "cart_id": cart_id }))
        .await?;
    debug!(
        cart_id = %cart_id,
        payment_collection_id = %envelope.payment_collection.id,
        "created payment collection"
    );
    Ok(envelope.payment_collection)
}

/// Initialize a payment session for the chosen provider.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn initialize_payment_session(
    api: &ApiClient,
    collection_id: &PaymentCollectionId,
    provider_id: &PaymentProviderId,
) -> Result<PaymentCollection> {
    let envelope: PaymentCollectionEnvelope = api
        .post(
            &format!("/store/payment-collections/{collection_id}/payment-sessions"),
            &json!({ "provider_id": provider_id }),
        )
        .await?;
    debug!(
        payment_collection_id = %collection_id,
        provider_id = %provider_id,
        "initialized payment session"
    );
    Ok(envelope.payment_collection)
}
