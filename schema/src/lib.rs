//! Entity field schema and scalar quantizers for the snapdelta codec.
//!
//! This crate defines how entity state is laid out for replication:
//! - A flat, ordered list of typed leaf fields shared by encoder and decoder
//! - Builders that flatten vectors, boxes, colors and arrays into leaves
//! - Half-float and 16-bit angle quantizers
//! - Deterministic schema hashing
//!
//! # Design Principles
//!
//! - **Explicit schemas** - No reflection on arbitrary Rust types.
//! - **One order** - Field order in the schema is the wire order, on both sides.
//! - **Deterministic hashing** - Schema hash is stable given the same definition.

mod error;
mod field;
mod hash;
mod quant;
mod schema;

pub use error::{SchemaError, SchemaResult};
pub use field::{enum_width, FieldDef, FieldKind, FloatCodec};
pub use hash::schema_hash;
pub use quant::{
    angle_to_u16, float_to_half, half_to_float, normalize_angle, u16_to_angle, ANGLE_PRECISION,
    ANGLE_STEPS,
};
pub use schema::{Schema, SchemaBuilder, MAX_SCHEMA_FIELDS};
