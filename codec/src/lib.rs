//! Snapshot delta composition and replication for the snapdelta codec.
//!
//! This crate ties together bitstream, wire, and schema:
//!
//! - Entity states laid out by a [`schema::Schema`]
//! - Per-entity field deltas against an agreed baseline
//! - Snapshot delta bodies and complete snapshot messages
//! - Baseline history with explicit acknowledgement
//! - A sender/receiver pair driving a [`Transport`]
//!
//! # Design Principles
//!
//! - **Correctness first** - A receiver holding the same baseline rebuilds
//!   exactly the quantized state the sender encoded.
//! - **Atomic messages** - A message is fully written or not at all, and a
//!   bad message never affects the next one.
//! - **Deterministic** - Same inputs produce same outputs.

mod baseline;
mod delta;
mod error;
mod limits;
mod message;
mod scratch;
mod session;
mod snapshot;
mod types;

pub use baseline::{BaselineError, BaselineStore};
pub use delta::{
    decode_entity_delta, decode_fields, decode_full_snapshot, decode_snapshot_delta,
    encode_entity_delta, encode_fields, encode_full_snapshot, encode_snapshot_delta,
    encode_snapshot_delta_with_scratch,
};
pub use error::{CodecError, CodecResult, LimitKind, ValueReason};
pub use limits::CodecLimits;
pub use message::{
    decode_snapshot_message, encode_delta_snapshot_message, encode_full_snapshot_message,
    encode_snapshot_message, DecodedMessage, MessageKind,
};
pub use scratch::CodecScratch;
pub use session::{SnapshotReceiver, SnapshotSender, Transport};
pub use snapshot::{quantize_value, EntityState, FieldValue, Snapshot};
pub use types::{EntitySlot, SnapshotTick};
pub use wire::Limits as WireLimits;
