//! Role-based dispatch
//!
//! [`SharedCache`] is the public operation surface. In the participant role
//! every operation becomes a request to the coordinator; in the coordinator
//! role only `size`, `keys` and `reset` are served, straight from the local
//! store. Anything else is refused with a warning and
//! [`CacheError::RoleViolation`].

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cache::ttl_millis;
use crate::coordinator::CoordinatorHandle;
use crate::diagnostics::Diagnostics;
use crate::error::{CacheError, Result};
use crate::participant::Participant;
use crate::protocol::{Operation, RequestParams, ResponseParams};
use crate::role::Role;

// == Hit ==
/// A live cache entry as seen by a reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub value: Value,
    /// Unix milliseconds, absent for entries without TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<u64>,
}

impl Hit {
    /// Read response mapping: `(value, expirationTime)`, none when `value`
    /// is absent.
    pub(crate) fn from_response(response: ResponseParams) -> Option<Self> {
        response.value.map(|value| Self {
            value,
            expiration_time: response.expiration_time,
        })
    }
}

fn store_params(key: String, value: Value, ttl: Option<Duration>) -> RequestParams {
    RequestParams {
        key: Some(key),
        value: Some(value),
        ttl: ttl.map(ttl_millis),
    }
}

#[derive(Debug, Clone)]
enum Node {
    Coordinator(CoordinatorHandle),
    Participant(Participant),
}

// == Shared Cache ==
/// Cache handle bound to a role.
#[derive(Debug, Clone)]
pub struct SharedCache {
    node: Node,
    diagnostics: Diagnostics,
}

impl SharedCache {
    pub(crate) fn coordinator(handle: CoordinatorHandle, diagnostics: Diagnostics) -> Self {
        Self {
            node: Node::Coordinator(handle),
            diagnostics,
        }
    }

    pub(crate) fn participant(participant: Participant, diagnostics: Diagnostics) -> Self {
        Self {
            node: Node::Participant(participant),
            diagnostics,
        }
    }

    pub fn role(&self) -> Role {
        match self.node {
            Node::Coordinator(_) => Role::Coordinator,
            Node::Participant(_) => Role::Participant,
        }
    }

    /// Returns the participant behind this handle, or refuses `operation`.
    pub(crate) fn participant_only(&self, operation: &'static str) -> Result<&Participant> {
        match &self.node {
            Node::Participant(participant) => Ok(participant),
            Node::Coordinator(_) => Err(self.refuse(operation)),
        }
    }

    fn refuse(&self, operation: &'static str) -> CacheError {
        let role = self.role();
        self.diagnostics.warn(format!(
            "Memored::{}# Cannot call this function from the {} role",
            operation, role
        ));
        CacheError::RoleViolation { operation, role }
    }

    // == Read ==
    /// Reads `key`. Missing and expired keys resolve to `None`.
    pub async fn read(&self, key: impl Into<String>) -> Result<Option<Hit>> {
        let participant = self.participant_only("read")?;
        let response = participant
            .request(Operation::Read, RequestParams::key(key))
            .await?;
        Ok(Hit::from_response(response))
    }

    // == Store ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Returns the expiration time (Unix milliseconds) when a TTL is given.
    pub async fn store(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<Option<u64>> {
        let participant = self.participant_only("store")?;
        let response = participant
            .request(Operation::Store, store_params(key.into(), value, ttl))
            .await?;
        Ok(response.expiration_time)
    }

    /// Stores without waiting for, or keeping track of, the response.
    pub async fn store_detached(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let participant = self.participant_only("store")?;
        participant
            .send(Operation::Store, store_params(key.into(), value, ttl), None)
            .await
    }

    // == Remove ==
    /// Removes `key`; removing an absent key is not an error.
    pub async fn remove(&self, key: impl Into<String>) -> Result<()> {
        let participant = self.participant_only("remove")?;
        participant
            .request(Operation::Remove, RequestParams::key(key))
            .await?;
        Ok(())
    }

    pub async fn remove_detached(&self, key: impl Into<String>) -> Result<()> {
        let participant = self.participant_only("remove")?;
        participant
            .send(Operation::Remove, RequestParams::key(key), None)
            .await
    }

    // == Clean ==
    /// Empties the cache.
    pub async fn clean(&self) -> Result<()> {
        let participant = self.participant_only("clean")?;
        participant
            .request(Operation::Clean, RequestParams::default())
            .await?;
        Ok(())
    }

    pub async fn clean_detached(&self) -> Result<()> {
        let participant = self.participant_only("clean")?;
        participant
            .send(Operation::Clean, RequestParams::default(), None)
            .await
    }

    // == Size ==
    /// Number of stored entries, counting expired entries not yet removed.
    pub async fn size(&self) -> Result<usize> {
        let response = self.query(Operation::Size).await?;
        Ok(response.size.unwrap_or_default())
    }

    // == Keys ==
    /// Snapshot of the stored keys, including expired ones not yet removed.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let response = self.query(Operation::Keys).await?;
        Ok(response.keys.unwrap_or_default())
    }

    async fn query(&self, operation: Operation) -> Result<ResponseParams> {
        match &self.node {
            Node::Coordinator(handle) => handle.query(operation).await,
            Node::Participant(participant) => {
                participant.request(operation, RequestParams::default()).await
            }
        }
    }

    // == Reset ==
    /// Stops the purge scheduler and empties the store. Coordinator only.
    pub async fn reset(&self) -> Result<()> {
        match &self.node {
            Node::Coordinator(handle) => handle.reset().await,
            Node::Participant(_) => Err(self.refuse("reset")),
        }
    }
}
