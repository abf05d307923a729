use common::domain::{
    CreateObservedPropertyRepoInput, DomainError, DomainResult, ObservedProperty,
    ObservedPropertyRepository, PropertyDomain, ResultType, UpdateObservedPropertyRepoInput,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Validate)]
pub struct CreateObservedPropertyRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub domain: PropertyDomain,
    #[garde(length(min = 1, max = 2048))]
    pub property_definition: Option<String>,
    #[garde(length(min = 1, max = 2048))]
    pub unit_definition: Option<String>,
    #[garde(length(min = 1, max = 32))]
    pub unit_symbol: Option<String>,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(inner(length(min = 1, max = 64)))]
    pub keywords: Vec<String>,
    #[garde(skip)]
    pub value_type: ResultType,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateObservedPropertyRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub domain: Option<PropertyDomain>,
    #[garde(length(min = 1, max = 2048))]
    pub property_definition: Option<String>,
    #[garde(length(min = 1, max = 2048))]
    pub unit_definition: Option<String>,
    #[garde(length(min = 1, max = 32))]
    pub unit_symbol: Option<String>,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(inner(inner(length(min = 1, max = 64))))]
    pub keywords: Option<Vec<String>>,
    #[garde(skip)]
    pub value_type: Option<ResultType>,
}

/// Domain service for the phenomena datastreams measure
pub struct ObservedPropertyService {
    observed_property_repository: Arc<dyn ObservedPropertyRepository>,
}

impl ObservedPropertyService {
    pub fn new(observed_property_repository: Arc<dyn ObservedPropertyRepository>) -> Self {
        Self {
            observed_property_repository,
        }
    }

    #[instrument(skip(self, request), fields(observed_property_name = %request.name))]
    pub async fn create_observed_property(
        &self,
        request: CreateObservedPropertyRequest,
    ) -> DomainResult<ObservedProperty> {
        common::garde::validate_struct(&request)?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        debug!(observed_property_id = %id, domain = %request.domain, "creating observed property");

        self.observed_property_repository
            .create_observed_property(CreateObservedPropertyRepoInput {
                id,
                name: request.name,
                description: request.description,
                domain: request.domain,
                property_definition: request.property_definition,
                unit_definition: request.unit_definition,
                unit_symbol: request.unit_symbol,
                reference: request.reference,
                keywords: request.keywords,
                value_type: request.value_type,
            })
            .await
    }

    #[instrument(skip(self), fields(observed_property_id = %id))]
    pub async fn get_observed_property(&self, id: Uuid) -> DomainResult<ObservedProperty> {
        self.observed_property_repository
            .get_observed_property(id)
            .await?
            .ok_or_else(|| DomainError::ObservedPropertyNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_observed_properties(&self) -> DomainResult<Vec<ObservedProperty>> {
        self.observed_property_repository
            .list_observed_properties()
            .await
    }

    #[instrument(skip(self, request), fields(observed_property_id = %request.id))]
    pub async fn update_observed_property(
        &self,
        request: UpdateObservedPropertyRequest,
    ) -> DomainResult<ObservedProperty> {
        common::garde::validate_struct(&request)?;

        self.observed_property_repository
            .update_observed_property(UpdateObservedPropertyRepoInput {
                id: request.id,
                name: request.name,
                description: request.description,
                domain: request.domain,
                property_definition: request.property_definition,
                unit_definition: request.unit_definition,
                unit_symbol: request.unit_symbol,
                reference: request.reference,
                keywords: request.keywords,
                value_type: request.value_type,
            })
            .await
    }

    /// Fails with ObservedPropertyInUse while a datastream references it
    #[instrument(skip(self), fields(observed_property_id = %id))]
    pub async fn delete_observed_property(&self, id: Uuid) -> DomainResult<()> {
        self.observed_property_repository
            .delete_observed_property(id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::MockObservedPropertyRepository;

    fn request(unit_symbol: &str) -> CreateObservedPropertyRequest {
        CreateObservedPropertyRequest {
            id: None,
            name: "Air temperature".to_string(),
            description: None,
            domain: PropertyDomain::EnvironmentalBasics,
            property_definition: None,
            unit_definition: None,
            unit_symbol: Some(unit_symbol.to_string()),
            reference: None,
            keywords: vec!["temperature".to_string()],
            value_type: ResultType::Float,
        }
    }

    #[tokio::test]
    async fn test_create_observed_property() {
        let mut mock_repo = MockObservedPropertyRepository::new();
        mock_repo
            .expect_create_observed_property()
            .withf(|input: &CreateObservedPropertyRepoInput| {
                input.unit_symbol.as_deref() == Some("°C") && input.value_type == ResultType::Float
            })
            .times(1)
            .returning(|input| {
                Ok(ObservedProperty {
                    id: input.id,
                    name: input.name,
                    description: input.description,
                    domain: input.domain,
                    property_definition: input.property_definition,
                    unit_definition: input.unit_definition,
                    unit_symbol: input.unit_symbol,
                    reference: input.reference,
                    keywords: input.keywords,
                    value_type: input.value_type,
                    created_at: None,
                })
            });

        let service = ObservedPropertyService::new(Arc::new(mock_repo));
        let property = service.create_observed_property(request("°C")).await.unwrap();

        assert_eq!(property.domain, PropertyDomain::EnvironmentalBasics);
    }

    #[tokio::test]
    async fn test_empty_unit_symbol_is_rejected() {
        let mut mock_repo = MockObservedPropertyRepository::new();
        mock_repo.expect_create_observed_property().times(0);

        let service = ObservedPropertyService::new(Arc::new(mock_repo));
        let result = service.create_observed_property(request("")).await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
