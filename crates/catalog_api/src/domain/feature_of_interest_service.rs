use common::domain::{
    CreateFeatureOfInterestRepoInput, DomainError, DomainResult, FeatureOfInterest,
    FeatureOfInterestRepository, FeatureType, UpdateFeatureOfInterestRepoInput,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Validate)]
pub struct CreateFeatureOfInterestRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub feature_type: FeatureType,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(skip)]
    pub location: Option<serde_json::Value>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
    #[garde(inner(length(min = 1, max = 2048)))]
    pub media_links: Vec<String>,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateFeatureOfInterestRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub feature_type: Option<FeatureType>,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(skip)]
    pub location: Option<serde_json::Value>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
    #[garde(inner(inner(length(min = 1, max = 2048))))]
    pub media_links: Option<Vec<String>>,
}

pub struct FeatureOfInterestService {
    feature_repository: Arc<dyn FeatureOfInterestRepository>,
}

impl FeatureOfInterestService {
    pub fn new(feature_repository: Arc<dyn FeatureOfInterestRepository>) -> Self {
        Self { feature_repository }
    }

    #[instrument(skip(self, request), fields(feature_name = %request.name))]
    pub async fn create_feature_of_interest(
        &self,
        request: CreateFeatureOfInterestRequest,
    ) -> DomainResult<FeatureOfInterest> {
        common::garde::validate_struct(&request)?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        debug!(feature_of_interest_id = %id, "creating feature of interest");

        self.feature_repository
            .create_feature_of_interest(CreateFeatureOfInterestRepoInput {
                id,
                name: request.name,
                description: request.description,
                feature_type: request.feature_type,
                reference: request.reference,
                location: request.location,
                properties: request.properties,
                media_links: request.media_links,
            })
            .await
    }

    #[instrument(skip(self), fields(feature_of_interest_id = %id))]
    pub async fn get_feature_of_interest(&self, id: Uuid) -> DomainResult<FeatureOfInterest> {
        self.feature_repository
            .get_feature_of_interest(id)
            .await?
            .ok_or_else(|| DomainError::FeatureOfInterestNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_features_of_interest(&self) -> DomainResult<Vec<FeatureOfInterest>> {
        self.feature_repository.list_features_of_interest().await
    }

    #[instrument(skip(self, request), fields(feature_of_interest_id = %request.id))]
    pub async fn update_feature_of_interest(
        &self,
        request: UpdateFeatureOfInterestRequest,
    ) -> DomainResult<FeatureOfInterest> {
        common::garde::validate_struct(&request)?;

        self.feature_repository
            .update_feature_of_interest(UpdateFeatureOfInterestRepoInput {
                id: request.id,
                name: request.name,
                description: request.description,
                feature_type: request.feature_type,
                reference: request.reference,
                location: request.location,
                properties: request.properties,
                media_links: request.media_links,
            })
            .await
    }

    #[instrument(skip(self), fields(feature_of_interest_id = %id))]
    pub async fn delete_feature_of_interest(&self, id: Uuid) -> DomainResult<()> {
        self.feature_repository.delete_feature_of_interest(id).await
    }
}
