use crate::activity;
use crate::coerce::{now_nanos, parse_coordinate, parse_int_or, parse_timestamp};
use crate::errors::ValidationError;
use crate::line_protocol::{FieldValue, MeasurementLine};
use crate::record::TelemetryRecord;
use crate::sanitize::{sanitize, sanitize_str};
use serde::Deserialize;

pub const ACTIVITY_MEASUREMENT: &str = "mpu_activity";
pub const GPS_MEASUREMENT: &str = "mpu_gps";

/// Where coordinates end up when a record carries a usable position.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GpsPolicy {
    /// A second `mpu_gps` line with its own tag subset.
    #[default]
    Separate,
    /// `lat`/`lon` float fields on the activity line.
    Inline,
}

/// Source of the `activity_name` tag.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityNames {
    /// Only the name sent by the client is used.
    #[default]
    Client,
    /// Fall back to the built-in catalog when the client sends no name.
    CatalogFallback,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderOptions {
    pub gps: GpsPolicy,
    pub activity_names: ActivityNames,
}

/// Builds measurement lines from telemetry records.
#[derive(Clone, Debug, Default)]
pub struct LineEncoder {
    options: EncoderOptions,
}

impl LineEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }

    /// Encodes a record into one line, or two when a separate GPS line is due.
    pub fn encode(
        &self,
        record: &TelemetryRecord,
    ) -> Result<Vec<MeasurementLine>, ValidationError> {
        self.encode_at(record, now_nanos())
    }

    /// Same as [`LineEncoder::encode`], with `now` used when the record has no
    /// timestamp of its own.
    pub fn encode_at(
        &self,
        record: &TelemetryRecord,
        now: i64,
    ) -> Result<Vec<MeasurementLine>, ValidationError> {
        let code = record
            .activity_code()
            .ok_or(ValidationError::MissingActivityCode)?;

        let timestamp = parse_timestamp(record.timestamp.as_ref()).unwrap_or(now);
        let value = parse_int_or(Some(code), 0);

        let mpu = sanitize(record.mpu.as_ref());
        let site = sanitize(record.site.as_ref());
        let operator = sanitize(record.operator.as_ref());
        let slot = sanitize(record.slot.as_ref());
        let activity_code = sanitize(Some(code));
        let activity_name = self.activity_name(record, value);
        let activity_type = record.activity_type().map(|v| sanitize(Some(v)));

        let mut activity = MeasurementLine::new(ACTIVITY_MEASUREMENT, timestamp)
            .tag("mpu", mpu.clone())
            .tag("site", site.clone())
            .tag("operator", operator.clone())
            .tag("shift", sanitize(record.shift.as_ref()))
            .tag("date", sanitize(record.date.as_ref()))
            .tag("slot", slot.clone())
            .tag("activity_code", activity_code.clone());

        if let Some(name) = &activity_name {
            activity = activity.tag("activity_name", name.clone());
        }
        if let Some(kind) = &activity_type {
            activity = activity.tag("activity_type", kind.clone());
        }
        if let Some(device) = record.device() {
            activity = activity.tag("device", sanitize(Some(device)));
        }

        activity = activity.field("value", FieldValue::Integer(value));

        // Dockets are high cardinality, keep them out of the tag set.
        if let Some(docket) = record.docket() {
            activity = activity.field("docket", FieldValue::String(sanitize(Some(docket))));
        }

        let Some((lat, lon)) = position(record) else {
            return Ok(vec![activity]);
        };

        match self.options.gps {
            GpsPolicy::Inline => Ok(vec![
                activity
                    .field("lat", FieldValue::Float(lat))
                    .field("lon", FieldValue::Float(lon)),
            ]),
            GpsPolicy::Separate => {
                let mut gps = MeasurementLine::new(GPS_MEASUREMENT, timestamp)
                    .tag("site", site)
                    .tag("mpu", mpu)
                    .tag("operator", operator)
                    .tag("slot", slot)
                    .tag("activity_code", activity_code);
                if let Some(name) = activity_name {
                    gps = gps.tag("activity_name", name);
                }
                if let Some(kind) = activity_type {
                    gps = gps.tag("activity_type", kind);
                }
                let gps = gps
                    .field("lat", FieldValue::Float(lat))
                    .field("lon", FieldValue::Float(lon));

                Ok(vec![activity, gps])
            }
        }
    }

    fn activity_name(&self, record: &TelemetryRecord, code: i64) -> Option<String> {
        if let Some(name) = record.activity_name() {
            return Some(sanitize(Some(name)));
        }
        match self.options.activity_names {
            ActivityNames::Client => None,
            ActivityNames::CatalogFallback => activity::activity_name(code).map(str::to_string),
        }
    }
}

// A position is only usable when both coordinates parse and it is not 0,0,
// which the tablet reports before it has a fix.
fn position(record: &TelemetryRecord) -> Option<(f64, f64)> {
    let lat = parse_coordinate(record.lat.as_ref());
    let lon = parse_coordinate(record.lon.as_ref());

    match (lat, lon) {
        (Some(lat), Some(lon)) if lat != 0.0 || lon != 0.0 => Some((lat, lon)),
        (Some(_), Some(_)) => None,
        _ => {
            if record.lat.is_some() || record.lon.is_some() {
                tracing::debug!(lat = ?record.lat, lon = ?record.lon, "ignoring unusable position");
            }
            None
        }
    }
}

/// Builds the connectivity probe line, `<measurement>,source=<source> value=1 <now>`.
pub fn encode_probe(measurement: &str, source: &str) -> MeasurementLine {
    encode_probe_at(measurement, source, now_nanos())
}

pub fn encode_probe_at(measurement: &str, source: &str, now: i64) -> MeasurementLine {
    MeasurementLine::new(measurement, now)
        .tag("source", sanitize_str(source))
        .field("value", FieldValue::Float(1.0))
}
