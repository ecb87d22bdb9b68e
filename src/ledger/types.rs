// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire types for the ledger wallet JSON-RPC API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Payload argument name carrying the destination port (routing tag).
pub const DESTINATION_PORT_ARG: &str = "D";

/// Payload argument name carrying the comment (correlation tag).
pub const COMMENT_ARG: &str = "C";

/// Asset ID of the ledger's native coin (all-zero hash).
pub const BASE_ASSET: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Type tag of a payload argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "U")]
    Uint64,
    #[serde(rename = "I")]
    Int64,
    #[serde(rename = "H")]
    Hash,
    #[serde(rename = "A")]
    Address,
    #[serde(rename = "T")]
    Time,
    #[serde(rename = "F")]
    Float,
}

/// A named, typed value embedded in an integrated address or a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub datatype: DataType,
    pub value: Value,
}

impl Argument {
    pub fn uint64(name: &str, value: u64) -> Self {
        Self {
            name: name.to_string(),
            datatype: DataType::Uint64,
            value: Value::from(value),
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            datatype: DataType::String,
            value: Value::from(value),
        }
    }
}

/// Argument list as carried in `payload_rpc` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(pub Vec<Argument>);

impl Arguments {
    /// Routing + correlation arguments for a checkout address.
    pub fn checkout(routing_tag: u64, correlation_tag: &str) -> Self {
        Self(vec![
            Argument::uint64(DESTINATION_PORT_ARG, routing_tag),
            Argument::string(COMMENT_ARG, correlation_tag),
        ])
    }

    fn find(&self, name: &str, datatype: DataType) -> Option<&Value> {
        self.0
            .iter()
            .find(|arg| arg.name == name && arg.datatype == datatype)
            .map(|arg| &arg.value)
    }

    pub fn destination_port(&self) -> Option<u64> {
        self.find(DESTINATION_PORT_ARG, DataType::Uint64)
            .and_then(Value::as_u64)
    }

    pub fn comment(&self) -> Option<&str> {
        self.find(COMMENT_ARG, DataType::String)
            .and_then(Value::as_str)
    }
}

/// The two tags a checkout address must carry to be matchable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckoutTags {
    /// Destination port
    pub routing: u64,
    /// Comment
    pub correlation: String,
}

/// A decoded integrated address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratedAddress {
    /// Underlying wallet address
    pub address: String,
    #[serde(rename = "payload_rpc", default, deserialize_with = "null_as_default")]
    pub arguments: Arguments,
}

impl IntegratedAddress {
    /// Both tags, or `None` when either is missing.
    pub fn tags(&self) -> Option<CheckoutTags> {
        Some(CheckoutTags {
            routing: self.arguments.destination_port()?,
            correlation: self.arguments.comment()?.to_string(),
        })
    }
}

/// One entry of the wallet's transfer log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferEntry {
    #[serde(default)]
    pub txid: String,
    #[serde(default)]
    pub height: u64,
    /// Atomic units
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub incoming: bool,
    #[serde(default)]
    pub sender: String,
    #[serde(rename = "dstport", default)]
    pub destination_port: u64,
    #[serde(rename = "payload_rpc", default, deserialize_with = "null_as_default")]
    pub payload: Arguments,
}

impl TransferEntry {
    pub fn comment(&self) -> Option<&str> {
        self.payload.comment()
    }

    /// Whether this transfer pays the checkout identified by `tags`.
    pub fn matches(&self, tags: &CheckoutTags) -> bool {
        self.destination_port == tags.routing && self.comment() == Some(tags.correlation.as_str())
    }
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkout_arguments_wire_format() {
        let args = Arguments::checkout(7777, "order-42");
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(
            json,
            json!([
                {"name": "D", "datatype": "U", "value": 7777},
                {"name": "C", "datatype": "S", "value": "order-42"}
            ])
        );
    }

    #[test]
    fn tags_require_both_arguments() {
        let full = IntegratedAddress {
            address: "dero1qbase".to_string(),
            arguments: Arguments::checkout(7777, "order-42"),
        };
        assert_eq!(
            full.tags(),
            Some(CheckoutTags {
                routing: 7777,
                correlation: "order-42".to_string()
            })
        );

        let no_port = IntegratedAddress {
            address: "dero1qbase".to_string(),
            arguments: Arguments(vec![Argument::string(COMMENT_ARG, "order-42")]),
        };
        assert_eq!(no_port.tags(), None);

        // A port sent with the wrong type does not count
        let wrong_type = IntegratedAddress {
            address: "dero1qbase".to_string(),
            arguments: Arguments(vec![
                Argument::string(DESTINATION_PORT_ARG, "7777"),
                Argument::string(COMMENT_ARG, "order-42"),
            ]),
        };
        assert_eq!(wrong_type.tags(), None);
    }

    #[test]
    fn transfer_entry_parses_wallet_json() {
        let entry: TransferEntry = serde_json::from_value(json!({
            "height": 1200,
            "txid": "ab12",
            "amount": 50000,
            "incoming": true,
            "dstport": 7777,
            "srcport": 0,
            "payload_rpc": [
                {"name": "C", "datatype": "S", "value": "order-42"}
            ]
        }))
        .unwrap();

        assert_eq!(entry.destination_port, 7777);
        assert_eq!(entry.comment(), Some("order-42"));

        let tags = CheckoutTags {
            routing: 7777,
            correlation: "order-42".to_string(),
        };
        assert!(entry.matches(&tags));

        let other = CheckoutTags {
            correlation: "order-43".to_string(),
            ..tags
        };
        assert!(!entry.matches(&other));
    }

    #[test]
    fn null_payload_is_empty() {
        let entry: TransferEntry =
            serde_json::from_value(json!({"dstport": 1, "payload_rpc": null})).unwrap();
        assert!(entry.payload.0.is_empty());
        assert_eq!(entry.comment(), None);
    }
}
