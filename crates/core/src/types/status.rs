//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Order payment status.
///
/// Maps to the backend's payment status values (snake_case on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Authorized,
    PartiallyAuthorized,
    Captured,
    PartiallyCaptured,
    PartiallyRefunded,
    Refunded,
    Canceled,
    RequiresAction,
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    PartiallyDelivered,
    Delivered,
    Canceled,
}

/// Overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Draft,
    Archived,
    Canceled,
    RequiresAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_format() {
        let json = serde_json::to_string(&PaymentStatus::NotPaid).expect("serialize");
        assert_eq!(json, "\"not_paid\"");

        let status: PaymentStatus =
            serde_json::from_str("\"requires_action\"").expect("deserialize");
        assert_eq!(status, PaymentStatus::RequiresAction);
    }

    #[test]
    fn test_fulfillment_status_wire_format() {
        let status: FulfillmentStatus =
            serde_json::from_str("\"partially_shipped\"").expect("deserialize");
        assert_eq!(status, FulfillmentStatus::PartiallyShipped);
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }
}
