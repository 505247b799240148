//! Order endpoint wrappers. Orders are read-only from the client.

use bramble_core::OrderId;

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{Order, OrderEnvelope, OrdersEnvelope};

/// Fetch one order by id.
///
/// # Errors
///
/// Returns an error if the request fails or the order does not exist.
pub async fn get_order(api: &ApiClient, order_id: &OrderId) -> Result<Order> {
    let envelope: OrderEnvelope = api.get(&format!("/store/orders/{order_id}"), &[]).await?;
    Ok(envelope.order)
}

/// List the authenticated customer's orders.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_orders(api: &ApiClient) -> Result<Vec<Order>> {
    let envelope: OrdersEnvelope = api.get("/store/orders", &[]).await?;
    Ok(envelope.orders)
}
