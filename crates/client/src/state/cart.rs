//! Cart synchronization.
//!
//! The container owns the single in-memory cart. Every mutation issues one
//! request and, on success, replaces the whole cart with the server
//! response - totals are never recomputed client-side. Only the cart id is
//! persisted; the full cart is refetched on restore.
//!
//! One mutation may be in flight at a time. A second mutation started
//! while one is running fails fast with [`StoreError::CartBusy`] instead of
//! racing last-write-wins on the shared state.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use bramble_core::{LineItemId, Price, RegionId, ShippingOptionId, VariantId};

use crate::error::{Result, StoreError};
use crate::http::ApiClient;
use crate::services::carts;
use crate::storage::{CART_ID_KEY, KeyValueStore};
use crate::types::{Address, Cart, PaymentCollection};

/// Active-cart state container.
///
/// Cheaply cloneable; clones share the same cart state and the same
/// in-flight-mutation guard.
#[derive(Clone)]
pub struct CartState {
    inner: Arc<CartStateInner>,
}

struct CartStateInner {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    cart: Mutex<Option<Cart>>,
    /// In-flight mutation guard. `try_lock` failure means another mutation
    /// is running; callers get [`StoreError::CartBusy`].
    mutation: tokio::sync::Mutex<()>,
}

impl CartState {
    /// Create a cart container over the shared API client and the general
    /// on-device store.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(CartStateInner {
                api,
                store,
                cart: Mutex::new(None),
                mutation: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// The current cart, if any.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.lock_cart().clone()
    }

    /// The current cart, or a `Precondition` error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Precondition`] if no cart exists yet.
    pub fn require(&self) -> Result<Cart> {
        self.cart()
            .ok_or_else(|| StoreError::precondition("no active cart"))
    }

    /// App-start restore: fetch the full cart for a cached id, if any.
    ///
    /// Failure is logged, not surfaced - the cart stays unset and the UI
    /// shows an empty cart.
    pub async fn restore(&self) {
        let cart_id = match self.inner.store.get(CART_ID_KEY) {
            Ok(Some(id)) => bramble_core::CartId::new(id),
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "failed to read cached cart id");
                return;
            }
        };

        match carts::get_cart(&self.inner.api, &cart_id).await {
            Ok(cart) => {
                *self.lock_cart() = Some(cart);
            }
            Err(err) => {
                warn!(cart_id = %cart_id, error = %err, "failed to restore cart");
            }
        }
    }

    /// Add a variant to the cart, creating the cart first if none exists.
    ///
    /// Cart creation requires a resolved region; the new cart's id is
    /// persisted before the line item is added.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CartBusy`] if another mutation is in flight,
    /// or an error if either backend call fails.
    pub async fn add_item(
        &self,
        region_id: &RegionId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart> {
        let _guard = self.acquire_guard()?;

        let cart_id = match self.cart() {
            Some(cart) => cart.id,
            None => {
                let cart = carts::create_cart(&self.inner.api, region_id).await?;
                let id = cart.id.clone();
                self.replace(cart)?;
                id
            }
        };

        let cart = carts::add_line_item(&self.inner.api, &cart_id, variant_id, quantity).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    /// Increase a line item's quantity by one.
    ///
    /// The target quantity is read optimistically from the pre-mutation
    /// cart; the server response then confirms it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CartBusy`] if another mutation is in flight,
    /// a `Precondition` error if the item is not in the cart, or an error
    /// if the backend call fails.
    pub async fn increment(&self, line_item_id: &LineItemId) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        let item = cart
            .find_item(line_item_id)
            .ok_or_else(|| StoreError::precondition("line item not in cart"))?;

        self.update_quantity_inner(&cart.id, line_item_id, item.quantity + 1)
            .await
    }

    /// Decrease a line item's quantity by one.
    ///
    /// When the quantity is already 1, the item is removed (never updated
    /// to zero) and the cart is refetched in full.
    ///
    /// # Errors
    ///
    /// Same as [`CartState::increment`].
    pub async fn decrement(&self, line_item_id: &LineItemId) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        let item = cart
            .find_item(line_item_id)
            .ok_or_else(|| StoreError::precondition("line item not in cart"))?;

        if item.quantity <= 1 {
            self.remove_inner(&cart.id, line_item_id).await
        } else {
            self.update_quantity_inner(&cart.id, line_item_id, item.quantity - 1)
                .await
        }
    }

    /// Remove a line item, then refetch the full cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CartBusy`] if another mutation is in flight,
    /// or an error if either backend call fails.
    pub async fn remove_item(&self, line_item_id: &LineItemId) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        self.remove_inner(&cart.id, line_item_id).await
    }

    /// Set the cart's shipping address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CartBusy`] if another mutation is in flight,
    /// or an error if the backend call fails.
    pub async fn update_shipping_address(&self, address: &Address) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        let cart = carts::update_shipping_address(&self.inner.api, &cart.id, address).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    /// Attach a shipping method to the cart.
    ///
    /// # Errors
    ///
    /// Same as [`CartState::update_shipping_address`].
    pub async fn add_shipping_method(&self, option_id: &ShippingOptionId) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        let cart = carts::add_shipping_method(&self.inner.api, &cart.id, option_id).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    /// Refetch the current cart from the server and replace local state.
    ///
    /// # Errors
    ///
    /// Same as [`CartState::update_shipping_address`].
    pub async fn refresh(&self) -> Result<Cart> {
        let _guard = self.acquire_guard()?;
        let cart = self.require()?;
        let cart = carts::get_cart(&self.inner.api, &cart.id).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    /// Merge a payment collection into the locally held cart.
    ///
    /// This is the single place the cart is mutated client-side without a
    /// full server object replacing it: the payment-session step returns
    /// only the collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Precondition`] if no cart exists.
    pub fn set_payment_collection(&self, collection: PaymentCollection) -> Result<()> {
        let mut cart = self.lock_cart();
        match cart.as_mut() {
            Some(cart) => {
                cart.payment_collection = Some(collection);
                Ok(())
            }
            None => Err(StoreError::precondition("no active cart")),
        }
    }

    /// Drop the local cart and its persisted id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted id cannot be removed; the
    /// in-memory cart is cleared regardless.
    pub fn clear(&self) -> Result<()> {
        *self.lock_cart() = None;
        self.inner.store.remove(CART_ID_KEY)?;
        Ok(())
    }

    /// Cosmetic discount preview over the item subtotal, display-only.
    ///
    /// Authoritative discounted totals come from the server on the next
    /// mutation response.
    #[must_use]
    pub fn discount_preview(&self, rate: f64) -> Option<Price> {
        let cart = self.cart()?;
        let currency = cart.currency_code.unwrap_or_else(|| "usd".to_string());
        Some(Price::new(cart.item_total, currency).discount_preview(rate))
    }

    async fn update_quantity_inner(
        &self,
        cart_id: &bramble_core::CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let cart =
            carts::update_line_item(&self.inner.api, cart_id, line_item_id, quantity).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    async fn remove_inner(
        &self,
        cart_id: &bramble_core::CartId,
        line_item_id: &LineItemId,
    ) -> Result<Cart> {
        carts::remove_line_item(&self.inner.api, cart_id, line_item_id).await?;
        // The delete response body is not trusted; refetch the whole cart.
        let cart = carts::get_cart(&self.inner.api, cart_id).await?;
        self.replace(cart.clone())?;
        Ok(cart)
    }

    /// Replace local cart state with a server-returned cart and persist
    /// its id.
    fn replace(&self, cart: Cart) -> Result<()> {
        self.inner.store.set(CART_ID_KEY, cart.id.as_str())?;
        *self.lock_cart() = Some(cart);
        Ok(())
    }

    fn acquire_guard(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.inner
            .mutation
            .try_lock()
            .map_err(|_| StoreError::CartBusy)
    }

    fn lock_cart(&self) -> std::sync::MutexGuard<'_, Option<Cart>> {
        self.inner.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
