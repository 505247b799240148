//! Cart endpoint wrappers.

use serde_json::json;
use tracing::debug;

use bramble_core::{CartId, LineItemId, RegionId, ShippingOptionId, VariantId};

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{
    Address, Cart, CartEnvelope, CompleteCartResponse, ShippingOption, ShippingOptionsEnvelope,
};

/// Create a cart in the given region.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn create_cart(api: &ApiClient, region_id: &RegionId) -> Result<Cart> {
    let envelope: CartEnvelope = api
        .post("/store/carts", &json!({ "region_id": region_id }))
        .await?;
    debug!(cart_id = %envelope.cart.id, region_id = %region_id, "created cart");
    Ok(envelope.cart)
}

/// Fetch a cart by id.
///
/// # Errors
///
/// Returns an error if the request fails or the cart does not exist.
pub async fn get_cart(api: &ApiClient, cart_id: &CartId) -> Result<Cart> {
    let envelope: CartEnvelope = api.get(&format!("/store/carts/{cart_id}"), &[]).await?;
    Ok(envelope.cart)
}

/// Add a variant to the cart.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn add_line_item(
    api: &ApiClient,
    cart_id: &CartId,
    variant_id: &VariantId,
    quantity: u32,
) -> Result<Cart> {
    let envelope: CartEnvelope = api
        .post(
            &format!("/store/carts/{cart_id}/line-items"),
            &json!({ "variant_id": variant_id, "quantity": quantity }),
        )
        .await?;
    debug!(cart_id = %cart_id, variant_id = %variant_id, quantity, "added line item");
    Ok(envelope.cart)
}

/// Set a line item's quantity.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn update_line_item(
    api: &ApiClient,
    cart_id: &CartId,
    line_item_id: &LineItemId,
    quantity: u32,
) -> Result<Cart> {
    let envelope: CartEnvelope = api
        .post(
            &format!("/store/carts/{cart_id}/line-items/{line_item_id}"),
            &json!({ "quantity": quantity }),
        )
        .await?;
    debug!(cart_id = %cart_id, line_item_id = %line_item_id, quantity, "updated line item");
    Ok(envelope.cart)
}

/// Delete a line item.
///
/// The response body is discarded; callers refetch the cart afterwards
/// rather than trusting the delete response.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn remove_line_item(
    api: &ApiClient,
    cart_id: &CartId,
    line_item_id: &LineItemId,
) -> Result<()> {
    api.delete(&format!("/store/carts/{cart_id}/line-items/{line_item_id}"))
        .await?;
    debug!(cart_id = %cart_id, line_item_id = %line_item_id, "removed line item");
    Ok(())
}

/// Set the cart's shipping address.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn update_shipping_address(
    api: &ApiClient,
    cart_id: &CartId,
    address: &Address,
) -> Result<Cart> {
    let envelope: CartEnvelope = api
        .post(
            &format!("/store/carts/{cart_id}"),
            &json!({ "shipping_address": address }),
        )
        .await?;
    Ok(envelope.cart)
}

/// List the shipping options available for a cart.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_shipping_options(api: &ApiClient, cart_id: &CartId) -> Result<Vec<ShippingOption>> {
    let envelope: ShippingOptionsEnvelope = api
        .get("/store/shipping-options", &[("cart_id", cart_id.as_str())])
        .await?;
    debug!(cart_id = %cart_id, count = envelope.shipping_options.len(), "listed shipping options");
    Ok(envelope.shipping_options)
}

/// Attach a shipping method (by option id) to the cart.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn add_shipping_method(
    api: &ApiClient,
    cart_id: &CartId,
    option_id: &ShippingOptionId,
) -> Result<Cart> {
    let envelope: CartEnvelope = api
        .post(
            &format!("/store/carts/{cart_id}/shipping-methods"),
            &json!({ "option_id": option_id }),
        )
        .await?;
    Ok(envelope.cart)
}

/// Complete the cart into an order.
///
/// # Errors
///
/// Returns an error if the request fails. A completion the backend rejects
/// comes back as `Ok` with `kind == "cart"` and an error message.
pub async fn complete_cart(api: &ApiClient, cart_id: &CartId) -> Result<CompleteCartResponse> {
    let response: CompleteCartResponse = api
        .post_empty(&format!("/store/carts/{cart_id}/complete"))
        .await?;
    debug!(cart_id = %cart_id, kind = %response.kind, "completed cart");
    Ok(response)
}
