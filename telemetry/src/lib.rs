//! Activity telemetry encoding.
//!
//! Turns the loosely typed JSON records posted by the tablet client into
//! line protocol measurements. Nothing in this crate performs I/O; the
//! network side lives in the `relay` crate.

pub mod activity;
pub mod coerce;
pub mod encoder;
pub mod errors;
pub mod line_protocol;
pub mod record;
pub mod sanitize;

pub use encoder::{ActivityNames, EncoderOptions, GpsPolicy, LineEncoder, encode_probe};
pub use errors::ValidationError;
pub use line_protocol::{FieldValue, MeasurementLine, to_payload};
pub use record::TelemetryRecord;
pub use sanitize::sanitize;
