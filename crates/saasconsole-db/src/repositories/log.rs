use super::{paginate, string, to_row};
use crate::store::{FilterOp, IndexName, ItemStore, Query};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{LogAction, LogRecord, Paginated};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for audit log rows (`PK = LOG#<id>`, `SK = COMPANY#<cid>`)
#[derive(Clone)]
pub struct LogRepository {
    store: Arc<dyn ItemStore>,
}

impl LogRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, record), fields(db.entity = "log", db.operation = "insert", db.record_id = %record.log_id))]
    pub async fn put(&self, record: &LogRecord) -> Result<(), AppError> {
        let row = to_row(
            record,
            keys::log(record.log_id),
            keys::company(record.company_id),
            ENTITY_TYPE_LOG,
        )?;
        self.store.put(row).await?;
        Ok(())
    }

    /// Logs of a company, newest first.
    #[tracing::instrument(skip(self, cursor), fields(db.entity = "log", db.operation = "select"))]
    pub async fn list(
        &self,
        company_id: Uuid,
        action: Option<LogAction>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Paginated<LogRecord>, AppError> {
        let mut query = Query::index(IndexName::GetLogs, company_id.to_string())
            .filter(ATTR_TYPE, FilterOp::Eq(string(ENTITY_TYPE_LOG)))
            .descending();
        if let Some(action) = action {
            query = query.filter("LogAction", FilterOp::Eq(string(action.as_str())));
        }
        paginate(self.store.as_ref(), query, limit, cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use chrono::{Duration, Utc};
    use saasconsole_core::models::{LogInfo, LogType};

    fn record(company_id: Uuid, action: LogAction, minutes_ago: i64) -> LogRecord {
        LogRecord {
            log_id: Uuid::new_v4(),
            company_id,
            user_id: Uuid::new_v4(),
            log_type: LogType::Company,
            log_action: action,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            log_info: LogInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_logs_are_newest_first_and_filterable() {
        let repo = LogRepository::new(store());
        let company = Uuid::new_v4();
        repo.put(&record(company, LogAction::EstablishCompany, 30)).await.unwrap();
        repo.put(&record(company, LogAction::UpdateCompany, 20)).await.unwrap();
        repo.put(&record(company, LogAction::AddRole, 10)).await.unwrap();
        repo.put(&record(Uuid::new_v4(), LogAction::AddRole, 5)).await.unwrap();

        let page = repo.list(company, None, 2, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].log_action, LogAction::AddRole);
        assert_eq!(page.items[1].log_action, LogAction::UpdateCompany);

        let rest = repo
            .list(company, None, 2, page.last_evaluated_key.as_deref())
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].log_action, LogAction::EstablishCompany);
        assert!(rest.last_evaluated_key.is_none());

        let filtered = repo
            .list(company, Some(LogAction::UpdateCompany), 10, None)
            .await
            .unwrap();
        assert_eq!(filtered.items.len(), 1);
    }
}
