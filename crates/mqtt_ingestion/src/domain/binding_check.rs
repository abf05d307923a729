use crate::domain::{IngestionError, TopicRegistry};
use common::domain::DatastreamRepository;
use tracing::{info, warn};

/// Check every field binding against the catalog before ingestion starts.
///
/// A binding whose declared result type differs from its datastream's is a
/// configuration error. A datastream missing from the catalog only warns: it
/// may be created later, and until then its writes fail the foreign key.
pub async fn verify_bindings(
    registry: &TopicRegistry,
    datastreams: &dyn DatastreamRepository,
) -> Result<(), IngestionError> {
    let mut checked = 0;

    for binding in registry.bindings() {
        for field in &binding.fields {
            match datastreams.get_datastream(field.datastream_id).await? {
                None => warn!(
                    topic = %binding.topic,
                    field = %field.field,
                    datastream_id = %field.datastream_id,
                    "bound datastream not in catalog"
                ),
                Some(datastream) if datastream.observation_result_type != field.result_type => {
                    return Err(IngestionError::Configuration(format!(
                        "field '{}' on '{}' is bound as {} but datastream {} declares {}",
                        field.field,
                        binding.topic,
                        field.result_type,
                        datastream.id,
                        datastream.observation_result_type
                    )));
                }
                Some(_) => checked += 1,
            }
        }
    }

    info!(checked, "topic bindings verified against catalog");
    Ok(())
}
