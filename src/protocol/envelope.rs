//! Envelope wire format
//!
//! One envelope carries a request from a participant and, on the way back,
//! the coordinator's response. Both legs use the same JSON shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Protocol discriminator carried by every envelope on the channel.
pub const CHANNEL_TAG: &str = "memored";

/// Identifier of the participant that sent an envelope.
pub type ParticipantId = u32;

/// Correlation id, unique per origin and assigned in increasing order.
pub type CorrelationId = u64;

// == Operation ==
/// Cache operation requested by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Store,
    Remove,
    Clean,
    Size,
    Keys,
    /// Anything this build does not understand
    #[serde(other)]
    Unknown,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Store => "store",
            Operation::Remove => "remove",
            Operation::Clean => "clean",
            Operation::Size => "size",
            Operation::Keys => "keys",
            Operation::Unknown => "unknown",
        }
    }
}

// == Request Params ==
/// Arguments of a request. Unused fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// TTL in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl RequestParams {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }
}

// == Response Params ==
/// Results of a request. Which fields are set depends on the operation:
///
/// - read: `value` and `expirationTime`, both absent on a miss
/// - store: `expirationTime` when a TTL was given
/// - size: `size`
/// - keys: `keys`
/// - remove / clean: nothing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

// == Envelope ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub channel: String,
    pub origin: ParticipantId,
    pub id: CorrelationId,
    pub operation: Operation,
    #[serde(default)]
    pub request_params: RequestParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_params: Option<ResponseParams>,
}

impl Envelope {
    /// Builds a request envelope on the memored channel.
    pub fn request(
        origin: ParticipantId,
        id: CorrelationId,
        operation: Operation,
        request_params: RequestParams,
    ) -> Self {
        Self {
            channel: CHANNEL_TAG.to_string(),
            origin,
            id,
            operation,
            request_params,
            response_params: None,
        }
    }

    /// Turns a request into its response, keeping origin and id.
    pub fn into_response(mut self, response_params: ResponseParams) -> Self {
        self.response_params = Some(response_params);
        self
    }

    /// True when the envelope belongs to this protocol.
    pub fn is_ours(&self) -> bool {
        self.channel == CHANNEL_TAG
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}
