use super::{from_row, query_all, string, strings, to_row};
use crate::store::{FilterOp, IndexName, ItemKey, ItemStore, Query, SortCondition, UpdateRequest};
use chrono::{DateTime, Utc};
use saasconsole_core::constants::*;
use saasconsole_core::keys;
use saasconsole_core::models::{timestamp, CronJob, Job, Status};
use saasconsole_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for scheduled jobs.
///
/// Rows are keyed `PK = JOB#<run date>#<id>`, `SK = JOB#<job type>` and carry the
/// run time in `SearchKey`, so due jobs come out of `GetRoles` with a single
/// `<= now` sort condition.
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn ItemStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn job_key(job: &Job) -> ItemKey {
        ItemKey::new(keys::job_partition(job.run_at, job.job_id), keys::job_sort(&job.job_type))
    }

    fn cron_key(job: &CronJob) -> ItemKey {
        ItemKey::new(
            keys::job_partition(job.run_at, job.job_id),
            keys::job_sort(JOB_GROUP_MEMBERS),
        )
    }

    fn open_statuses() -> FilterOp {
        FilterOp::In(strings([Status::Active.as_str(), Status::Pending.as_str()]))
    }

    #[tracing::instrument(skip(self, job), fields(db.entity = "job", db.operation = "insert", db.record_id = %job.job_id))]
    pub async fn put_job(&self, job: &Job) -> Result<(), AppError> {
        let key = Self::job_key(job);
        let mut row = to_row(job, key.pk, key.sk, ENTITY_TYPE_JOB)?;
        row.insert(ATTR_SEARCH_KEY.to_string(), string(timestamp::format(&job.run_at)));
        row.insert(ATTR_EMAIL.to_string(), string(job.job_data.email.to_lowercase()));
        self.store.put(row).await?;
        Ok(())
    }

    /// An open job of `job_type` already scheduled for `email` in the company.
    #[tracing::instrument(skip(self), fields(db.entity = "job", db.operation = "select"))]
    pub async fn find_job(
        &self,
        company_id: Uuid,
        job_type: &str,
        email: &str,
    ) -> Result<Option<Job>, AppError> {
        let jobs: Vec<Job> = query_all(
            self.store.as_ref(),
            Query::index(IndexName::GetRoles, ENTITY_TYPE_JOB)
                .filter(ATTR_COMPANY_ID, FilterOp::Eq(string(company_id.to_string())))
                .filter("JobType", FilterOp::Eq(string(job_type)))
                .filter(ATTR_EMAIL, FilterOp::Eq(string(email.trim().to_lowercase())))
                .filter(ATTR_STATUS, Self::open_statuses()),
        )
        .await?;
        Ok(jobs.into_iter().next())
    }

    /// Open jobs whose run time is at or before `now`, oldest first.
    #[tracing::instrument(skip(self), fields(db.entity = "job", db.operation = "select"))]
    pub async fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::index(IndexName::GetRoles, ENTITY_TYPE_JOB)
                .sort(SortCondition::LessOrEqual(timestamp::format(&now)))
                .filter(ATTR_STATUS, Self::open_statuses()),
        )
        .await
    }

    #[tracing::instrument(skip(self, job), fields(db.entity = "job", db.operation = "update", db.record_id = %job.job_id))]
    pub async fn set_job_status(
        &self,
        job: &Job,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.store
            .update(
                &Self::job_key(job),
                UpdateRequest::new()
                    .set(ATTR_STATUS, status.as_str())
                    .set(ATTR_UPDATED_AT, timestamp::format(&now)),
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job.job_id)))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, job), fields(db.entity = "cron_job", db.operation = "insert", db.record_id = %job.job_id))]
    pub async fn put_cron_job(&self, job: &CronJob) -> Result<(), AppError> {
        let key = Self::cron_key(job);
        let mut row = to_row(job, key.pk, key.sk, ENTITY_TYPE_CRON_JOB)?;
        row.insert(ATTR_SEARCH_KEY.to_string(), string(timestamp::format(&job.run_at)));
        self.store.put(row).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.entity = "cron_job", db.operation = "select"))]
    pub async fn due_cron_jobs(&self, now: DateTime<Utc>) -> Result<Vec<CronJob>, AppError> {
        query_all(
            self.store.as_ref(),
            Query::index(IndexName::GetRoles, ENTITY_TYPE_CRON_JOB)
                .sort(SortCondition::LessOrEqual(timestamp::format(&now)))
                .filter(ATTR_STATUS, Self::open_statuses()),
        )
        .await
    }

    #[tracing::instrument(skip(self, job), fields(db.entity = "cron_job", db.operation = "update", db.record_id = %job.job_id))]
    pub async fn set_cron_status(
        &self,
        job: &CronJob,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.store
            .update(
                &Self::cron_key(job),
                UpdateRequest::new()
                    .set(ATTR_STATUS, status.as_str())
                    .set(ATTR_UPDATED_AT, timestamp::format(&now)),
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cron job {}", job.job_id)))?;
        Ok(())
    }

    pub async fn get_job(&self, job: &Job) -> Result<Option<Job>, AppError> {
        self.store
            .get(&Self::job_key(job))
            .await?
            .map(from_row)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use chrono::Duration;
    use saasconsole_core::models::{CronJobType, JobData, JobUser};

    fn job(company_id: Uuid, email: &str, run_at: DateTime<Utc>) -> Job {
        Job {
            job_id: Uuid::new_v4(),
            company_id,
            job_type: "DELETE_SLACK_ACCOUNT".into(),
            job_data: JobData {
                email: email.into(),
                integration_id: Uuid::new_v4(),
                integration_account: String::new(),
                number_of_days: 3,
            },
            status: Status::Active,
            run_at,
            current_user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_due_jobs_respect_run_time_and_status() {
        let repo = JobRepository::new(store());
        let company = Uuid::new_v4();
        let now = Utc::now();
        let due = job(company, "ada@example.com", now - Duration::hours(1));
        let later = job(company, "bob@example.com", now + Duration::days(2));
        repo.put_job(&due).await.unwrap();
        repo.put_job(&later).await.unwrap();

        let found = repo.due_jobs(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].job_id, due.job_id);

        repo.set_job_status(&due, Status::Done, now).await.unwrap();
        assert!(repo.due_jobs(now).await.unwrap().is_empty());
        assert_eq!(
            repo.get_job(&due).await.unwrap().map(|j| j.status),
            Some(Status::Done)
        );
    }

    #[tokio::test]
    async fn test_find_job_matches_email_case_insensitively() {
        let repo = JobRepository::new(store());
        let company = Uuid::new_v4();
        let scheduled = job(company, "Ada@Example.com", Utc::now() + Duration::days(1));
        repo.put_job(&scheduled).await.unwrap();

        let found = repo
            .find_job(company, "DELETE_SLACK_ACCOUNT", "ada@example.com")
            .await
            .unwrap();
        assert_eq!(found.map(|j| j.job_id), Some(scheduled.job_id));
        assert!(repo
            .find_job(company, "DELETE_JIRA_ACCOUNT", "ada@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_job(Uuid::new_v4(), "DELETE_SLACK_ACCOUNT", "ada@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cron_jobs_become_due() {
        let repo = JobRepository::new(store());
        let now = Utc::now();
        let cron = CronJob {
            job_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            job_type: CronJobType::AddGroupMembers,
            users: vec![JobUser {
                user_id: Uuid::new_v4(),
                email: "ada@example.com".into(),
            }],
            status: Status::Pending,
            selected_date: now,
            number_of_days: 0,
            run_at: now,
            current_user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: None,
        };
        repo.put_cron_job(&cron).await.unwrap();

        assert!(repo.due_cron_jobs(now - Duration::minutes(1)).await.unwrap().is_empty());
        assert_eq!(repo.due_cron_jobs(now).await.unwrap().len(), 1);
        // Plain jobs and cron jobs live under different types.
        assert!(repo.due_jobs(now).await.unwrap().is_empty());

        repo.set_cron_status(&cron, Status::Done, now).await.unwrap();
        assert!(repo.due_cron_jobs(now).await.unwrap().is_empty());
    }
}
