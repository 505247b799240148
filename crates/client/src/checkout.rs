//! Checkout sequencing.
//!
//! Four dependent server calls stand between a filled cart and a placed
//! order: save address, pick a shipping method, create a payment
//! collection, initialize a payment session. Each step is gated on the
//! prior step's server-confirmed result; a step invoked out of order
//! returns a `Precondition` error naming what is missing.

use tracing::{debug, error};

use bramble_core::{OrderId, PaymentProviderId, ShippingOptionId};

use crate::error::{Result, StoreError};
use crate::http::ApiClient;
use crate::services::{carts, payments};
use crate::state::CartState;
use crate::types::{Address, Cart, ShippingOptionSummary};

/// Per-checkout flow controller.
///
/// Holds the transient shipping-option list; the cart itself lives in the
/// shared [`CartState`] so the rest of the app observes every step.
pub struct CheckoutFlow {
    api: ApiClient,
    cart: CartState,
    shipping_options: Vec<ShippingOptionSummary>,
    /// Country code the current option list was fetched for. Repeating an
    /// identical address does not refetch.
    options_for_country: Option<String>,
}

impl CheckoutFlow {
    /// Start a checkout flow over the shared cart container.
    #[must_use]
    pub fn new(api: ApiClient, cart: CartState) -> Self {
        Self {
            api,
            cart,
            shipping_options: Vec::new(),
            options_for_country: None,
        }
    }

    /// Shipping options loaded for the current address, `{id, label, price}`.
    #[must_use]
    pub fn shipping_options(&self) -> &[ShippingOptionSummary] {
        &self.shipping_options
    }

    /// Step 1: save the shipping address to the cart.
    ///
    /// On success the server-returned cart becomes current, and shipping
    /// options are (re)loaded if the address carries a country code the
    /// options were not already fetched for.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error if no cart exists, `CartBusy` if a
    /// mutation is in flight, or an error if a backend call fails.
    pub async fn save_address(&mut self, address: &Address) -> Result<()> {
        let cart = self.cart.update_shipping_address(address).await?;
        self.refresh_shipping_options(&cart).await
    }

    /// Step 2 (effect): fetch shipping options once the cart's shipping
    /// address has a non-empty country code.
    ///
    /// Idempotent for a repeated identical address.
    async fn refresh_shipping_options(&mut self, cart: &Cart) -> Result<()> {
        let Some(country) = cart.shipping_country_code() else {
            return Ok(());
        };

        if self.options_for_country.as_deref() == Some(country) {
            return Ok(());
        }

        let options = carts::list_shipping_options(&self.api, &cart.id).await?;
        debug!(country, count = options.len(), "loaded shipping options");

        self.shipping_options = options.into_iter().map(Into::into).collect();
        self.options_for_country = Some(country.to_string());
        Ok(())
    }

    /// Step 3: attach the chosen shipping method, then make sure a payment
    /// collection exists for the cart.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error if no options were loaded, `CartBusy`
    /// if a mutation is in flight, or an error if a backend call fails.
    pub async fn select_shipping_method(&mut self, option_id: &ShippingOptionId) -> Result<()> {
        if self.shipping_options.is_empty() {
            return Err(StoreError::precondition("no shipping options loaded"));
        }

        self.cart.add_shipping_method(option_id).await?;
        self.ensure_payment_collection().await
    }

    /// Step 4: create a payment collection once the cart has a shipping
    /// method, then refetch the cart so local state is a whole server
    /// object. No-op if a collection already exists.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error if no shipping method is attached,
    /// `CartBusy` if a mutation is in flight, or an error if a backend
    /// call fails.
    pub async fn ensure_payment_collection(&mut self) -> Result<()> {
        let cart = self.cart.require()?;

        if cart.payment_collection_id().is_some() {
            return Ok(());
        }
        if cart.shipping_methods.is_empty() {
            return Err(StoreError::precondition("no shipping method selected"));
        }

        payments::create_payment_collection(&self.api, &cart.id).await?;
        self.cart.refresh().await?;
        Ok(())
    }

    /// Step 5: initialize a payment session for the chosen provider and
    /// merge the returned collection into the held cart.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error if no payment collection exists, or
    /// an error if the backend call fails.
    pub async fn init_payment_session(&mut self, provider_id: &PaymentProviderId) -> Result<()> {
        let cart = self.cart.require()?;
        let collection_id = cart
            .payment_collection_id()
            .cloned()
            .ok_or_else(|| StoreError::precondition("no payment collection"))?;

        let collection =
            payments::initialize_payment_session(&self.api, &collection_id, provider_id).await?;
        self.cart.set_payment_collection(collection)
    }

    /// Step 6: complete the cart into an order.
    ///
    /// On success the active cart is cleared and the order id returned.
    /// Failure is logged and returned; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns a `Precondition` error if no payment collection exists,
    /// [`StoreError::OrderRejected`] if the backend declines the
    /// completion, or an error if the request fails.
    pub async fn place_order(&mut self) -> Result<OrderId> {
        let cart = self.cart.require()?;
        if cart.payment_collection_id().is_none() {
            return Err(StoreError::precondition("no payment collection"));
        }

        let response = carts::complete_cart(&self.api, &cart.id).await?;

        if let Some(order) = response.order {
            self.cart.clear()?;
            debug!(order_id = %order.id, "order placed");
            return Ok(order.id);
        }

        let message = response
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "cart completion rejected".to_string());
        error!(cart_id = %cart.id, message, "order placement failed");
        Err(StoreError::OrderRejected(message))
    }
}
