//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. The backend issues
//! opaque string identifiers (e.g. `cart_01HXYZ...`), so IDs wrap `String`.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use bramble_core::define_id;
/// define_id!(CartId);
/// define_id!(OrderId);
///
/// let cart_id = CartId::new("cart_01H");
/// let order_id = OrderId::new("order_01H");
///
/// // These are different types, so this won't compile:
/// // let _: CartId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(CartId);
define_id!(LineItemId);
define_id!(RegionId);
define_id!(CustomerId);
define_id!(OrderId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(ShippingOptionId);
define_id!(PaymentCollectionId);
define_id!(PaymentProviderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let id = CartId::new("cart_01HXYZ");
        assert_eq!(id.as_str(), "cart_01HXYZ");
        assert_eq!(id.to_string(), "cart_01HXYZ");
        assert_eq!(String::from(id), "cart_01HXYZ");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = VariantId::new("variant_123");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"variant_123\"");

        let back: VariantId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_equality() {
        assert_eq!(OrderId::new("order_1"), OrderId::from("order_1"));
        assert_ne!(OrderId::new("order_1"), OrderId::new("order_2"));
    }
}
