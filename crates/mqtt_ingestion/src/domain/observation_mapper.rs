use crate::domain::{DecodedReading, FieldBinding, ReadingValue};
use common::domain::{ObservationDraft, ObservationResult};
use tracing::{debug, warn};

/// Turn a decoded reading into observation drafts, one per bound field.
///
/// Drafts follow the binding order. Fields bound but absent from the reading
/// are skipped; so are fields the decoder could not read and values that do
/// not fit the binding's result type.
pub fn map_reading(fields: &[FieldBinding], reading: &DecodedReading) -> Vec<ObservationDraft> {
    let mut drafts = Vec::with_capacity(fields.len());

    for binding in fields {
        if reading.undecodable.iter().any(|f| f == &binding.field) {
            warn!(field = %binding.field, "field value could not be decoded, skipping");
            continue;
        }

        let Some(value) = reading.get(&binding.field) else {
            debug!(field = %binding.field, "field not present in reading");
            continue;
        };

        let result = to_result(value);
        if !result.fits(binding.result_type) {
            warn!(
                field = %binding.field,
                datastream_id = %binding.datastream_id,
                expected = %binding.result_type,
                actual = result.kind(),
                "field value does not fit the bound datastream, skipping"
            );
            continue;
        }

        drafts.push(ObservationDraft {
            id: None,
            datastream_id: binding.datastream_id,
            result_time: reading.timestamp,
            result,
            parameters: None,
        });
    }

    drafts
}

fn to_result(value: &ReadingValue) -> ObservationResult {
    match value {
        ReadingValue::Numeric(v) => ObservationResult::Numeric(*v),
        ReadingValue::Text(v) => ObservationResult::Text(v.clone()),
        ReadingValue::Boolean(v) => ObservationResult::Boolean(*v),
    }
}
