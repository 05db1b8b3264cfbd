//! Opaque description and query payloads.
//!
//! Descriptions (what an agent or service offers) and queries (constraints
//! over descriptions) are built by the schema/query layer outside this
//! crate. The session runtime carries them to and from the node unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

macro_rules! opaque_payload {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Value);

        impl $name {
            /// Wrap an already structured value.
            pub fn new(value: Value) -> Self {
                Self(value)
            }

            /// Build from anything serializable.
            pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
                Ok(Self(serde_json::to_value(value)?))
            }

            /// Deserialize the payload into a concrete type.
            pub fn parse_into<T: DeserializeOwned>(&self) -> Result<T> {
                Ok(T::deserialize(&self.0)?)
            }

            /// Borrow the structured value.
            pub fn as_value(&self) -> &Value {
                &self.0
            }

            /// Unwrap the structured value.
            pub fn into_value(self) -> Value {
                self.0
            }
        }

        impl From<Value> for $name {
            fn from(value: Value) -> Self {
                Self(value)
            }
        }
    };
}

opaque_payload!(
    /// Description of an agent or service, as registered with the node.
    Description
);

opaque_payload!(
    /// Search query, as evaluated by the node.
    Query
);
