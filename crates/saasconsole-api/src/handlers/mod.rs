pub mod companies;
pub mod departments;
pub mod groups;
pub mod integrations;
pub mod jobs;
pub mod logs;
pub mod notifications;
pub mod requests;
pub mod roles;
pub mod users;

use crate::state::AppState;
use saasconsole_core::constants::DEFAULT_PAGE_LIMIT;
use saasconsole_core::models::{CompanyUser, PageQuery, Paginated, Status};
use saasconsole_core::validation::parse_status;
use saasconsole_core::AppError;
use saasconsole_db::MemberFilter;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Query of the member listings
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    /// Comma-separated statuses, e.g. `ACTIVE,PENDING`; all when absent
    #[serde(default)]
    pub status: Option<String>,
}

impl MemberListQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            cursor: self.cursor.clone(),
            search: self.search.clone(),
        }
    }

    fn filter(&self) -> Result<MemberFilter, AppError> {
        let statuses = match self.status.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_status)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(MemberFilter {
            statuses,
            search: self.page().search_text(),
        })
    }
}

pub(crate) async fn list_members(
    state: &AppState,
    company_id: Uuid,
    query: &MemberListQuery,
) -> Result<Paginated<CompanyUser>, AppError> {
    let page = query.page();
    state
        .db
        .memberships
        .list(
            company_id,
            &query.filter()?,
            page.clamped_limit(),
            page.cursor.as_deref(),
        )
        .await
}

/// Present members of the company for each id; unknown or DELETED ids are 404.
pub(crate) async fn present_members(
    state: &AppState,
    company_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<CompanyUser>, AppError> {
    let mut members = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        match state.db.memberships.get(company_id, user_id).await? {
            Some(member) if member.status != Status::Deleted => members.push(member),
            _ => return Err(AppError::UserNotFound(user_id.to_string())),
        }
    }
    Ok(members)
}
