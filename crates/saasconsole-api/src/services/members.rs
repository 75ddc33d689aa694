//! Removing members from a company.
//!
//! Shared by the single and bulk removal endpoints and the bulk status update.

use crate::state::AppState;
use chrono::Utc;
use saasconsole_core::models::{CompanyUser, LogAction, LogInfo, LogType};
use saasconsole_core::AppError;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct RemovalOutcome {
    pub removed: Vec<CompanyUser>,
    /// `"<slug>-error"` to the failures on that integration, one
    /// `"<email>: <message>"` entry per member, joined with `"; "`
    pub integration_errors: BTreeMap<String, String>,
}

/// The caller and the company owner are never valid targets of a
/// membership change made by someone else.
fn ensure_changeable(actor: Uuid, member: &CompanyUser) -> Result<(), AppError> {
    if member.user_id == actor {
        return Err(AppError::Unprocessable(
            "You cannot change your own membership".to_string(),
        ));
    }
    if member.is_owner() {
        return Err(AppError::Unprocessable(
            "The company owner's membership cannot be changed".to_string(),
        ));
    }
    Ok(())
}

/// Load every target and check it before touching anything.
pub async fn changeable_members(
    state: &AppState,
    actor: Uuid,
    company_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<CompanyUser>, AppError> {
    let mut members = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        let member = state.db.memberships.require(company_id, user_id).await?;
        ensure_changeable(actor, &member)?;
        members.push(member);
    }
    Ok(members)
}

/// Soft-delete members and drop their group, department and role rows in the company.
///
/// Writes are sequential; a failure part-way leaves earlier members removed.
#[tracing::instrument(skip(state, user_ids), fields(company_id = %company_id, count = user_ids.len()))]
pub async fn remove_members(
    state: &AppState,
    actor: Uuid,
    company_id: Uuid,
    user_ids: &[Uuid],
    remove_integration_accounts: bool,
) -> Result<RemovalOutcome, AppError> {
    let targets = changeable_members(state, actor, company_id, user_ids).await?;
    let now = Utc::now();
    let mut outcome = RemovalOutcome::default();

    for member in targets {
        let removed = state
            .db
            .memberships
            .remove(company_id, member.user_id, actor, now)
            .await?;
        let groups = state
            .db
            .groups
            .remove_user_from_company(member.user_id, company_id)
            .await?;
        let departments = state
            .db
            .departments
            .remove_user_from_company(member.user_id, company_id)
            .await?;
        let roles = state
            .db
            .roles
            .remove_user_from_company(member.user_id, company_id)
            .await?;

        if let Some(user) = state.db.users.get(member.user_id).await? {
            if user.active_company == Some(company_id) {
                state
                    .db
                    .users
                    .set_active_company(user.user_id, None, now)
                    .await?;
            }
        }

        tracing::info!(
            user_id = %member.user_id,
            groups = groups,
            departments = departments,
            roles = roles,
            "Member removed from company"
        );
        outcome.removed.push(removed);
    }

    if remove_integration_accounts && !outcome.removed.is_empty() {
        let integrations = state.db.integrations.list_connected(company_id).await?;
        for integration in &integrations {
            for member in &outcome.removed {
                if let Err(e) = state
                    .integration_cleanup
                    .remove_user(integration, &member.email, None)
                    .await
                {
                    tracing::warn!(
                        error = %e,
                        integration.slug = %integration.slug,
                        user_id = %member.user_id,
                        "Integration account removal failed"
                    );
                    let failure = format!("{}: {}", member.email, e);
                    outcome
                        .integration_errors
                        .entry(format!("{}-error", integration.slug))
                        .and_modify(|messages| {
                            messages.push_str("; ");
                            messages.push_str(&failure);
                        })
                        .or_insert(failure);
                }
            }
        }
    }

    state
        .audit
        .record(
            actor,
            company_id,
            LogType::User,
            LogAction::RemoveCompanyMembers,
            LogInfo {
                users: outcome.removed.iter().map(CompanyUser::log_entry).collect(),
                ..Default::default()
            },
        )
        .await;

    Ok(outcome)
}
