use chrono::Utc;
use saasconsole_core::models::{LogAction, LogInfo, LogRecord, LogType};
use saasconsole_db::LogRepository;
use uuid::Uuid;

/// Appends audit records for company mutations.
#[derive(Clone)]
pub struct AuditLogger {
    logs: LogRepository,
}

impl AuditLogger {
    pub fn new(logs: LogRepository) -> Self {
        Self { logs }
    }

    /// Write one record. A failed write is logged and swallowed: the mutation
    /// it describes has already happened.
    pub async fn record(
        &self,
        actor: Uuid,
        company_id: Uuid,
        log_type: LogType,
        action: LogAction,
        info: LogInfo,
    ) {
        let record = LogRecord {
            log_id: Uuid::now_v7(),
            company_id,
            user_id: actor,
            log_type,
            log_action: action,
            created_at: Utc::now(),
            log_info: info,
        };

        tracing::info!(
            target: "audit",
            log_id = %record.log_id,
            company_id = %company_id,
            user_id = %actor,
            action = %action,
            "Audit event"
        );

        if let Err(e) = self.logs.put(&record).await {
            tracing::warn!(
                error = %e,
                company_id = %company_id,
                action = %action,
                "Failed to write audit log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saasconsole_core::models::LogModuleParams;
    use saasconsole_db::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_is_listed_for_company() {
        let logs = LogRepository::new(Arc::new(MemoryStore::new()));
        let audit = AuditLogger::new(logs.clone());
        let company = Uuid::new_v4();
        audit
            .record(
                Uuid::new_v4(),
                company,
                LogType::Group,
                LogAction::AddGroup,
                LogInfo {
                    group: Some(LogModuleParams::named(Uuid::new_v4(), "Ops")),
                    ..Default::default()
                },
            )
            .await;

        let page = logs.list(company, None, 10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].log_action, LogAction::AddGroup);
    }
}
