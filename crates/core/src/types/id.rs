//! Newtype IDs for type-safe entity references.
//!
//! The platform hands out opaque global IDs as strings. The `define_id!`
//! macro wraps them so a checkout ID can never be passed where an order ID
//! is expected.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe ID wrapper around an opaque platform ID.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use coastline_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new("gid://platform/Widget/1");
/// let gadget = GadgetId::new("gid://platform/Gadget/1");
///
/// // These are different types, so this won't compile:
/// // let _: WidgetId = gadget;
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
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying ID string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
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
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(CheckoutId);
define_id!(OrderId);
define_id!(TransactionId);
define_id!(CustomerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_roundtrip() {
        let id = CheckoutId::new("gid://platform/Checkout/42");
        assert_eq!(id.to_string(), "gid://platform/Checkout/42");
        assert_eq!(id.as_str(), "gid://platform/Checkout/42");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = OrderId::new("gid://platform/Order/7");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"gid://platform/Order/7\"");

        let back: OrderId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Equality only within the same ID type; cross-type comparison is a
        // compile error, which is the point of the macro.
        let a = TransactionId::new("t-1");
        let b = TransactionId::new("t-1");
        assert_eq!(a, b);
    }
}
