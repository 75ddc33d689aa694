//! Runner for deferred integration-account removals and group-membership jobs.

use crate::state::AppState;
use chrono::{DateTime, Utc};
use saasconsole_core::models::{
    CronJob, CronJobType, Job, LogAction, LogInfo, LogModuleParams, LogType, Status,
};
use saasconsole_core::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// What one pass over the due jobs did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SchedulerRun {
    pub jobs_done: usize,
    pub jobs_skipped: usize,
    pub jobs_failed: usize,
    pub cron_jobs_done: usize,
}

pub struct JobScheduler {
    shutdown_tx: mpsc::Sender<()>,
}

impl JobScheduler {
    /// Spawn the polling loop.
    pub fn start(state: Arc<AppState>, poll_interval_seconds: u64) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let poll = Duration::from_secs(poll_interval_seconds.max(1));

        tokio::spawn(async move {
            Self::worker_loop(state, poll, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    async fn worker_loop(state: Arc<AppState>, poll: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut poll_interval = interval(poll);
        tracing::info!(poll_interval_seconds = poll.as_secs(), "Job scheduler started");

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    match run_due(&state, Utc::now()).await {
                        Ok(run) if run != SchedulerRun::default() => {
                            tracing::info!(?run, "Scheduled jobs processed");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Error processing scheduled jobs"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Job scheduler shutting down");
                    break;
                }
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(error = %e, "Failed to send shutdown signal to job scheduler");
        }
    }
}

enum JobOutcome {
    Done,
    Skipped,
    Failed,
}

/// Run every job and cron job due at `now`.
pub async fn run_due(state: &AppState, now: DateTime<Utc>) -> Result<SchedulerRun, AppError> {
    let mut run = SchedulerRun::default();

    for job in state.db.jobs.due_jobs(now).await? {
        match run_removal_job(state, &job, now).await {
            Ok(JobOutcome::Done) => run.jobs_done += 1,
            Ok(JobOutcome::Skipped) => run.jobs_skipped += 1,
            Ok(JobOutcome::Failed) => run.jobs_failed += 1,
            Err(e) => {
                tracing::error!(error = %e, job_id = %job.job_id, "Scheduled removal failed");
                run.jobs_failed += 1;
            }
        }
    }

    for job in state.db.jobs.due_cron_jobs(now).await? {
        match run_cron_job(state, &job, now).await {
            Ok(()) => run.cron_jobs_done += 1,
            Err(e) => {
                tracing::error!(error = %e, job_id = %job.job_id, "Cron job failed");
            }
        }
    }

    Ok(run)
}

/// Remove one account from an integration. Failed removals stay open and are
/// retried on the next pass.
#[tracing::instrument(skip(state, job, now), fields(job_id = %job.job_id, job_type = %job.job_type))]
async fn run_removal_job(
    state: &AppState,
    job: &Job,
    now: DateTime<Utc>,
) -> Result<JobOutcome, AppError> {
    let member = state
        .db
        .memberships
        .find_by_email(job.company_id, &job.job_data.email)
        .await?;
    let skip = match &member {
        Some(m) => m.status == Status::Deleted || m.is_owner(),
        None => false,
    };
    let integration = state
        .db
        .integrations
        .get(job.company_id, job.job_data.integration_id)
        .await?;

    let Some(integration) = integration.filter(|_| !skip) else {
        tracing::info!("Nothing to remove, closing job");
        state.db.jobs.set_job_status(job, Status::Done, now).await?;
        return Ok(JobOutcome::Skipped);
    };

    if let Err(e) = state
        .integration_cleanup
        .remove_user(
            &integration,
            &job.job_data.email,
            Some(job.job_data.integration_account.as_str()).filter(|a| !a.is_empty()),
        )
        .await
    {
        tracing::warn!(error = %e, "Integration account removal failed, will retry");
        return Ok(JobOutcome::Failed);
    }

    let user = member
        .as_ref()
        .map(|m| m.log_entry())
        .unwrap_or_else(|| LogModuleParams::named(&job.job_data.email, job.job_data.email.clone()));
    state
        .audit
        .record(
            job.current_user_id,
            job.company_id,
            LogType::Integration,
            LogAction::RemoveCompanyMembersIntegrationAccess,
            LogInfo {
                users: vec![user],
                integration: Some(integration.log_entry()),
                ..Default::default()
            },
        )
        .await;
    state.db.jobs.set_job_status(job, Status::Done, now).await?;
    Ok(JobOutcome::Done)
}

#[tracing::instrument(skip(state, job, now), fields(job_id = %job.job_id, group_id = %job.group_id))]
async fn run_cron_job(state: &AppState, job: &CronJob, now: DateTime<Utc>) -> Result<(), AppError> {
    let Some(group) = state.db.groups.get(job.company_id, job.group_id).await? else {
        tracing::warn!("Group no longer exists, rejecting cron job");
        state.db.jobs.set_cron_status(job, Status::Rejected, now).await?;
        return Ok(());
    };

    let user_ids: Vec<_> = job.users.iter().map(|u| u.user_id).collect();
    let action = match job.job_type {
        CronJobType::AddGroupMembers => {
            state
                .db
                .groups
                .add_members(
                    job.company_id,
                    job.group_id,
                    &user_ids,
                    Some(job.current_user_id),
                    now,
                )
                .await?;
            LogAction::AddGroupMembers
        }
        CronJobType::RemoveGroupMembers => {
            state.db.groups.remove_members(job.group_id, &user_ids).await?;
            LogAction::RemoveGroupMembers
        }
    };

    state
        .audit
        .record(
            job.current_user_id,
            job.company_id,
            LogType::Group,
            action,
            LogInfo {
                group: Some(group.log_entry()),
                users: job
                    .users
                    .iter()
                    .map(|u| LogModuleParams::named(u.user_id, u.email.clone()))
                    .collect(),
                ..Default::default()
            },
        )
        .await;
    state.db.jobs.set_cron_status(job, Status::Done, now).await?;
    Ok(())
}
