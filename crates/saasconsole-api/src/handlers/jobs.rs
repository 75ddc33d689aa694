use crate::auth::SessionContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use saasconsole_core::models::{
    CreateCronJobRequest, CreateRemoveUserJobRequest, CronJob, CronJobType, Job, JobData,
    Permission, ScheduledRemovals, Status,
};
use saasconsole_core::validation::normalize_email;
use saasconsole_core::AppError;
use saasconsole_infra::ErrorResponse;
use std::sync::Arc;
use uuid::Uuid;

/// Midnight UTC of today, `days` days ahead.
fn run_date(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc() + Duration::days(i64::from(days))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/remove-jobs",
    tag = "jobs",
    request_body = CreateRemoveUserJobRequest,
    responses(
        (status = 201, description = "Removals scheduled", body = ScheduledRemovals),
        (status = 404, description = "Integration not found", body = ErrorResponse),
        (status = 409, description = "Every user already has a removal scheduled", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(integration_id = %req.integration_id, count = req.users.len()))]
pub async fn schedule_removals(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateRemoveUserJobRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    state
        .permissions
        .require(actor, company_id, Permission::RemoveCompanyMember)
        .await?;
    let integration = state
        .db
        .integrations
        .require(company_id, req.integration_id)
        .await?;
    let job_type = integration.removal_job_type();

    let now = Utc::now();
    let run_at = run_date(now, req.number_of_days);
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();

    for target in req.users {
        let email = normalize_email(&target.email);
        if state
            .db
            .jobs
            .find_job(company_id, &job_type, &email)
            .await?
            .is_some()
            || jobs.iter().any(|j: &Job| j.job_data.email == email)
        {
            skipped.push(email);
            continue;
        }
        jobs.push(Job {
            job_id: Uuid::now_v7(),
            company_id,
            job_type: job_type.clone(),
            job_data: JobData {
                email,
                integration_id: integration.integration_id,
                integration_account: target.integration_account,
                number_of_days: req.number_of_days,
            },
            status: Status::Pending,
            run_at,
            current_user_id: actor,
            created_at: now,
            updated_at: None,
        });
    }

    if jobs.is_empty() {
        return Err(AppError::RequestAlreadySubmitted.into());
    }
    for job in &jobs {
        state.db.jobs.put_job(job).await?;
    }

    tracing::info!(
        scheduled = jobs.len(),
        skipped = skipped.len(),
        %run_at,
        "Integration account removals scheduled"
    );
    Ok((StatusCode::CREATED, Json(ScheduledRemovals { jobs, skipped })))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/cron-jobs",
    tag = "jobs",
    request_body = CreateCronJobRequest,
    responses(
        (status = 201, description = "Group membership change scheduled", body = CronJob),
        (status = 403, description = "Missing group member permission", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, req), fields(group_id = %req.group_id, job_type = ?req.job_type))]
pub async fn schedule_group_change(
    State(state): State<Arc<AppState>>,
    ctx: SessionContext,
    ValidatedJson(req): ValidatedJson<CreateCronJobRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let company_id = ctx.company()?;
    let actor = ctx.user_id();
    let permission = match req.job_type {
        CronJobType::AddGroupMembers => Permission::AddGroupMember,
        CronJobType::RemoveGroupMembers => Permission::RemoveGroupMember,
    };
    state
        .permissions
        .require(actor, company_id, permission)
        .await?;
    state.db.groups.require(company_id, req.group_id).await?;

    let now = Utc::now();
    let job = CronJob {
        job_id: Uuid::now_v7(),
        company_id,
        group_id: req.group_id,
        job_type: req.job_type,
        users: req.users,
        status: Status::Pending,
        selected_date: now,
        number_of_days: req.number_of_days,
        run_at: run_date(now, req.number_of_days),
        current_user_id: actor,
        created_at: now,
        updated_at: None,
    };
    state.db.jobs.put_cron_job(&job).await?;

    Ok((StatusCode::CREATED, Json(job)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_date_is_midnight_days_ahead() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 17, 45, 0).unwrap();
        assert_eq!(
            run_date(now, 3),
            Utc.with_ymd_and_hms(2024, 3, 13, 0, 0, 0).unwrap()
        );
        assert_eq!(
            run_date(now, 0),
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
        );
    }
}
