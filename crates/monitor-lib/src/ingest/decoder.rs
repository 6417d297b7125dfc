//! Record decoding
//!
//! Partial frames are routine right after attaching to a live stream, so a
//! malformed frame is reported as a value and counted, never raised.

use crate::error::DecodeError;
use crate::models::TelemetryRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Parses candidate frames into telemetry records
#[derive(Debug, Default)]
pub struct RecordDecoder {
    decoded: AtomicU64,
    rejected: AtomicU64,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly parse one frame.
    ///
    /// Absent fields are left missing, unknown fields are ignored, and any
    /// syntax or type error rejects the whole frame.
    pub fn decode(&self, frame: &[u8]) -> Result<TelemetryRecord, DecodeError> {
        match serde_json::from_slice::<TelemetryRecord>(frame) {
            Ok(record) => {
                self.decoded.fetch_add(1, Ordering::Relaxed);
                Ok(record)
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                let err = DecodeError::new(e, frame);
                debug!(error = %err.source, frame = %err.preview, "Rejected malformed frame");
                Err(err)
            }
        }
    }

    pub fn decoded_count(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_FRAME: &str = r#"{"voltage":221.4,"current":1.82,"power":310.2,"energy":0.41,
        "frequency":50.0,"pf":0.77,"voltage_alert":0,"pf_alert":1,"motor_temp":48.5,
        "ambient_temp":29.1,"temp_alert":0,"hotspot":0,"bearing_temp":41.0,"delta_temp":19.4,
        "dust":0.12,"dust_alert":0,"soiling_loss":1.5,"vibration_rms_mm_s":2.31,
        "vibration_alert":0,"unbalance":0.08,"bearing_health":87}"#;

    #[test]
    fn test_decodes_full_record() {
        let decoder = RecordDecoder::new();
        let record = decoder.decode(FULL_FRAME.as_bytes()).unwrap();

        assert_eq!(record.voltage, Some(221.4));
        assert_eq!(record.vibration_rms_mm_s, Some(2.31));
        assert_eq!(record.pf_alert, Some(1.0));
        assert_eq!(record.bearing_health, Some(87.0));
        assert_eq!(record.reported_fields(), 21);
        assert_eq!(decoder.decoded_count(), 1);
    }

    #[test]
    fn test_boolean_flags_decode_as_numbers() {
        let decoder = RecordDecoder::new();
        let record = decoder
            .decode(br#"{"vibration_rms_mm_s":2.3,"temp_alert":true,"hotspot":true,"dust_alert":false}"#)
            .unwrap();
        assert_eq!(record.temp_alert, Some(1.0));
        assert_eq!(record.hotspot, Some(1.0));
        assert_eq!(record.dust_alert, Some(0.0));
        assert_eq!(record.vibration_rms_mm_s, Some(2.3));
    }

    #[test]
    fn test_missing_fields_stay_missing() {
        let decoder = RecordDecoder::new();
        let record = decoder.decode(br#"{"voltage":220}"#).unwrap();
        assert_eq!(record.voltage, Some(220.0));
        assert_eq!(record.vibration_rms_mm_s, None);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let decoder = RecordDecoder::new();
        let record = decoder
            .decode(br#"{"vibration_rms_mm_s":1.1,"firmware":"2.0.1","rpm":1450}"#)
            .unwrap();
        assert_eq!(record.vibration_rms_mm_s, Some(1.1));
    }

    #[test]
    fn test_partial_frame_is_rejected() {
        let decoder = RecordDecoder::new();
        // Tail of a record cut off when attaching mid-stream
        let err = decoder.decode(br#"{2.31,"vibration_alert":0}"#).unwrap_err();
        assert!(err.to_string().contains("malformed frame"));
        assert_eq!(decoder.rejected_count(), 1);
        assert_eq!(decoder.decoded_count(), 0);
    }

    #[test]
    fn test_wrong_value_type_is_rejected() {
        let decoder = RecordDecoder::new();
        assert!(decoder.decode(br#"{"voltage":"high"}"#).is_err());
        assert!(decoder.decode(br#"{"vibration_alert":"yes"}"#).is_err());
        assert_eq!(decoder.rejected_count(), 2);
    }

    #[test]
    fn test_flat_cut_of_nested_object_is_rejected() {
        let decoder = RecordDecoder::new();
        assert!(decoder.decode(br#"{"meta":{"id":1}"#).is_err());
    }
}
