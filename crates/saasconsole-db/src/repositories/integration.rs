use super::{from_row, query_all, string, to_row};
use crate::store::{FilterOp, ItemKey, ItemStore, Query};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{Integration, Status};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for connected integrations (`PK = COMPANY#<cid>`, `SK = INTEGRATION#<id>`)
#[derive(Clone)]
pub struct IntegrationRepository {
    store: Arc<dyn ItemStore>,
}

impl IntegrationRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn key(company_id: Uuid, integration_id: Uuid) -> ItemKey {
        ItemKey::new(keys::company(company_id), keys::integration(integration_id))
    }

    #[tracing::instrument(skip(self), fields(db.entity = "integration", db.operation = "select"))]
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<Integration>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::table(keys::company(company_id))
                .sort_begins_with(PREFIX_INTEGRATION)
                .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_COMPANY_INTEGRATION))),
        )
        .await
    }

    /// Integrations currently connected.
    pub async fn list_connected(&self, company_id: Uuid) -> Result<Vec<Integration>, AppError> {
        Ok(self
            .list(company_id)
            .await?
            .into_iter()
            .filter(|i| i.status == Status::Active)
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "integration", db.operation = "select", db.record_id = %integration_id))]
    pub async fn get(
        &self,
        company_id: Uuid,
        integration_id: Uuid,
    ) -> Result<Option<Integration>, AppError> {
        self.store
            .get(&Self::key(company_id, integration_id))
            .await?
            .map(from_row)
            .transpose()
    }

    pub async fn require(&self, company_id: Uuid, integration_id: Uuid) -> Result<Integration, AppError> {
        self.get(company_id, integration_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Integration {}", integration_id)))
    }

    /// Store a connected integration; a slug can be connected once per company.
    #[tracing::instrument(skip(self, integration), fields(db.entity = "integration", db.operation = "insert", db.record_id = %integration.integration_id))]
    pub async fn connect(&self, integration: &Integration) -> Result<(), AppError> {
        let connected = self.list_connected(integration.company_id).await?;
        if connected.iter().any(|i| i.slug == integration.slug) {
            return Err(AppError::Unprocessable(format!(
                "Integration '{}' is already connected",
                integration.slug
            )));
        }
        let row = to_row(
            integration,
            keys::company(integration.company_id),
            keys::integration(integration.integration_id),
            ENTITY_TYPE_COMPANY_INTEGRATION,
        )?;
        self.store.put(row).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "integration", db.operation = "delete", db.record_id = %integration_id))]
    pub async fn disconnect(&self, company_id: Uuid, integration_id: Uuid) -> Result<(), AppError> {
        self.store.delete(&Self::key(company_id, integration_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use chrono::Utc;

    fn integration(company_id: Uuid, slug: &str) -> Integration {
        Integration {
            integration_id: Uuid::new_v4(),
            company_id,
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            status: Status::Active,
            connected_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_connect_list_disconnect() {
        let repo = IntegrationRepository::new(store());
        let company = Uuid::new_v4();
        let slack = integration(company, "slack");
        repo.connect(&slack).await.unwrap();
        repo.connect(&integration(company, "jira")).await.unwrap();

        assert!(matches!(
            repo.connect(&integration(company, "slack")).await,
            Err(AppError::Unprocessable(_))
        ));
        assert_eq!(repo.list(company).await.unwrap().len(), 2);

        repo.disconnect(company, slack.integration_id).await.unwrap();
        let left = repo.list_connected(company).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].slug, "jira");
    }
}
