//! Wire types for the commerce backend's store APIs.
//!
//! Every entity here is server-authoritative. Totals are never computed
//! client-side; each struct is replaced wholesale by the next server
//! response. Fields the flows never read are simply not modeled.

use serde::{Deserialize, Serialize};

use bramble_core::{
    CartId, CustomerId, FulfillmentStatus, LineItemId, OrderId, PaymentCollectionId,
    PaymentProviderId, PaymentStatus, ProductId, RegionId, ShippingOptionId, VariantId,
};

// =============================================================================
// Cart
// =============================================================================

/// A shipping or billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code, lowercase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One product variant + quantity entry within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// Per-unit price in the cart currency's major unit.
    #[serde(default)]
    pub unit_price: f64,
}

/// A shipping method already attached to a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: f64,
}

/// One payment attempt within a payment collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub provider_id: PaymentProviderId,
    #[serde(default)]
    pub status: Option<String>,
}

/// Backend construct representing payment attempts against a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub id: PaymentCollectionId,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_sessions: Option<Vec<PaymentSession>>,
}

/// Server-side mutable cart, replaced wholesale on every mutation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    #[serde(default)]
    pub payment_collection: Option<PaymentCollection>,
    #[serde(default)]
    pub item_total: f64,
    #[serde(default)]
    pub shipping_total: f64,
    #[serde(default)]
    pub discount_total: f64,
    #[serde(default)]
    pub tax_total: f64,
    #[serde(default)]
    pub total: f64,
}

impl Cart {
    /// The shipping address country code, if an address with one is set.
    #[must_use]
    pub fn shipping_country_code(&self) -> Option<&str> {
        self.shipping_address
            .as_ref()
            .and_then(|a| a.country_code.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// The attached payment collection id, if any.
    #[must_use]
    pub fn payment_collection_id(&self) -> Option<&PaymentCollectionId> {
        self.payment_collection.as_ref().map(|pc| &pc.id)
    }

    /// Find a line item by id.
    #[must_use]
    pub fn find_item(&self, line_item_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == line_item_id)
    }
}

// =============================================================================
// Region
// =============================================================================

/// A country within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, lowercase.
    pub iso_2: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A backend-defined currency/country grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub currency_code: String,
    #[serde(default)]
    pub countries: Vec<Country>,
}

// =============================================================================
// Customer
// =============================================================================

/// The authenticated customer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Profile fields a customer can update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// A completed order, fetched read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub display_id: Option<i64>,
    #[serde(default)]
    pub status: Option<bramble_core::OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub total: f64,
}

// =============================================================================
// Shipping & Payment Options
// =============================================================================

/// A shipping option offered for a cart, as the backend serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: f64,
}

/// The `{id, label, price}` shape the checkout flow renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingOptionSummary {
    pub id: ShippingOptionId,
    pub label: String,
    pub price: f64,
}

impl From<ShippingOption> for ShippingOptionSummary {
    fn from(option: ShippingOption) -> Self {
        Self {
            label: option.name.unwrap_or_else(|| option.id.to_string()),
            id: option.id,
            price: option.amount,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// Region-priced variant price, as the backend serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedPrice {
    pub calculated_amount: f64,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// A purchasable product variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub calculated_price: Option<CalculatedPrice>,
}

/// A browsable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

// =============================================================================
// Response Envelopes
// =============================================================================

/// `{ "cart": ... }`
#[derive(Debug, Deserialize)]
pub struct CartEnvelope {
    pub cart: Cart,
}

/// `{ "customer": ... }`
#[derive(Debug, Deserialize)]
pub struct CustomerEnvelope {
    pub customer: Customer,
}

/// `{ "regions": [...] }`
#[derive(Debug, Deserialize)]
pub struct RegionsEnvelope {
    pub regions: Vec<Region>,
}

/// `{ "order": ... }`
#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    pub order: Order,
}

/// `{ "orders": [...] }`
#[derive(Debug, Deserialize)]
pub struct OrdersEnvelope {
    pub orders: Vec<Order>,
}

/// `{ "shipping_options": [...] }`
#[derive(Debug, Deserialize)]
pub struct ShippingOptionsEnvelope {
    pub shipping_options: Vec<ShippingOption>,
}

/// `{ "payment_collection": ... }`
#[derive(Debug, Deserialize)]
pub struct PaymentCollectionEnvelope {
    pub payment_collection: PaymentCollection,
}

/// `{ "product": ... }`
#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

/// `{ "products": [...], "count": n }`
#[derive(Debug, Deserialize)]
pub struct ProductsEnvelope {
    pub products: Vec<Product>,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Login / register response. The token is optional on the wire; sign-in
/// treats its absence as an error.
#[derive(Debug, Deserialize)]
pub struct AuthTokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Response to a cart-complete request: either the placed order, or the
/// cart again with an error message.
#[derive(Debug, Deserialize)]
pub struct CompleteCartResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub cart: Option<Cart>,
    #[serde(default)]
    pub error: Option<CompleteCartError>,
}

/// Error detail on a failed cart completion.
#[derive(Debug, Deserialize)]
pub struct CompleteCartError {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_deserializes_sparse_response() {
        // Freshly created carts come back with almost nothing set.
        let cart: Cart = serde_json::from_str(r#"{"id":"cart_01"}"#).expect("deserialize");
        assert_eq!(cart.id.as_str(), "cart_01");
        assert!(cart.items.is_empty());
        assert!(cart.shipping_address.is_none());
        assert!((cart.total - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shipping_country_code_ignores_empty() {
        let mut cart: Cart = serde_json::from_str(r#"{"id":"cart_01"}"#).expect("deserialize");
        assert!(cart.shipping_country_code().is_none());

        cart.shipping_address = Some(Address {
            country_code: Some(String::new()),
            ..Address::default()
        });
        assert!(cart.shipping_country_code().is_none());

        cart.shipping_address = Some(Address {
            country_code: Some("fr".to_string()),
            ..Address::default()
        });
        assert_eq!(cart.shipping_country_code(), Some("fr"));
    }

    #[test]
    fn test_shipping_option_summary_mapping() {
        let option = ShippingOption {
            id: bramble_core::ShippingOptionId::new("so_1"),
            name: Some("Standard Shipping".to_string()),
            amount: 4.5,
        };
        let summary = ShippingOptionSummary::from(option);
        assert_eq!(summary.label, "Standard Shipping");
        assert!((summary.price - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shipping_option_summary_label_falls_back_to_id() {
        let option = ShippingOption {
            id: bramble_core::ShippingOptionId::new("so_2"),
            name: None,
            amount: 0.0,
        };
        assert_eq!(ShippingOptionSummary::from(option).label, "so_2");
    }

    #[test]
    fn test_address_serializes_only_set_fields() {
        let address = Address {
            country_code: Some("de".to_string()),
            ..Address::default()
        };
        let json = serde_json::to_value(&address).expect("serialize");
        assert_eq!(json, serde_json::json!({"country_code": "de"}));
    }

    #[test]
    fn test_complete_cart_response_order_variant() {
        let raw = r#"{"type":"order","order":{"id":"order_01","total":25.0}}"#;
        let response: CompleteCartResponse = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(response.kind, "order");
        assert_eq!(
            response.order.expect("order present").id.as_str(),
            "order_01"
        );
    }

    #[test]
    fn test_complete_cart_response_cart_variant() {
        let raw = r#"{"type":"cart","cart":{"id":"cart_01"},"error":{"message":"no payment"}}"#;
        let response: CompleteCartResponse = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(response.kind, "cart");
        assert_eq!(
            response.error.and_then(|e| e.message).as_deref(),
            Some("no payment")
        );
    }
}
