//! Message protocol
//!
//! Envelopes exchanged between participants and the coordinator, and the
//! per-participant table that matches responses to pending requests.

mod correlation;
mod envelope;

pub use correlation::{Continuation, CorrelationTable};
pub use envelope::{
    CorrelationId, Envelope, Operation, ParticipantId, RequestParams, ResponseParams,
    CHANNEL_TAG,
};
