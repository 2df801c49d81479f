use crate::{ApiError, ApiResult, AppState};
use adinsights_core::{Account, AccountId, FieldSet, Insight, PlatformId};
use adinsights_report::{export, ExportFormat, Report};
use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// -------- Directory --------

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.identity.name,
        "email": state.identity.email,
        "linkedin": state.identity.linkedin,
    }))
}

pub async fn api_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the advertising reports API",
        "endpoints": [
            "/api/platforms",
            "/api/accounts?platform={platform}",
            "/api/fields?platform={platform}",
            "/api/insights?platform={platform}&account={account}&fields={field1,field2,etc}",
            "/platform",
            "/{platform}",
            "/{platform}/resumo",
            "/geral",
            "/geral/resumo",
        ]
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

// -------- Upstream passthrough --------

/// `/platforms` exactly as upstream returned it
pub async fn api_platforms(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(state.resolver().raw_platforms().await?))
}

#[derive(Debug, Deserialize)]
pub struct PlatformQuery {
    pub platform: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    pub platform: Option<String>,
    pub account: Option<String>,
    /// Comma separated; defaults to the platform's full field list
    pub fields: Option<String>,
}

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} query parameter is required", name)))
}

pub async fn api_accounts(
    State(state): State<AppState>,
    Query(params): Query<PlatformQuery>,
) -> ApiResult<Json<Vec<Account>>> {
    let platform = required(params.platform, "platform")?;
    let platform = state.resolver().require_platform(&platform).await?;
    Ok(Json(state.resolver().list_accounts(&platform.id).await?))
}

pub async fn api_fields(
    State(state): State<AppState>,
    Query(params): Query<PlatformQuery>,
) -> ApiResult<Json<FieldSet>> {
    let platform = required(params.platform, "platform")?;
    let platform = state.resolver().require_platform(&platform).await?;
    Ok(Json(state.resolver().list_fields(&platform.id).await?))
}

pub async fn api_insights(
    State(state): State<AppState>,
    Query(params): Query<InsightsQuery>,
) -> ApiResult<Json<Vec<Insight>>> {
    let platform = required(params.platform, "platform")?;
    let account = AccountId::new(required(params.account, "account")?);
    let platform = state.resolver().require_platform(&platform).await?;

    let requested: FieldSet = params
        .fields
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    let fields = if requested.is_empty() {
        state.resolver().list_fields(&platform.id).await?
    } else {
        requested
    };

    Ok(Json(
        state
            .resolver()
            .fetch_insights(&platform.id, &account, &fields)
            .await?,
    ))
}

// -------- Platforms --------

pub async fn platform_list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let platforms = state.resolver().list_platform_ids().await?;
    Ok(Json(json!({ "available_platforms": platforms })))
}

#[derive(Debug, Serialize)]
pub struct PlatformDetail {
    pub platform: PlatformId,
    pub label: Option<String>,
    pub accounts: Vec<Account>,
    pub fields: FieldSet,
}

/// Validated platform with its accounts and field list
pub async fn platform_detail(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<PlatformDetail>> {
    let platform = state.resolver().require_platform(&platform).await?;
    let accounts = state
        .resolver()
        .list_accounts(&platform.id)
        .await
        .map_err(|e| e.context(format!("Error retrieving accounts for {}", platform.id)))?;
    let fields = state
        .resolver()
        .list_fields(&platform.id)
        .await
        .map_err(|e| e.context(format!("Error retrieving fields for {}", platform.id)))?;

    Ok(Json(PlatformDetail {
        platform: platform.id,
        label: platform.label,
        accounts,
        fields,
    }))
}

// -------- Reports --------

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// csv (default) or json
    pub format: Option<String>,
}

impl ReportQuery {
    fn format(&self) -> ApiResult<ExportFormat> {
        match self.format.as_deref() {
            None | Some("") => Ok(ExportFormat::Csv),
            Some(format) => Ok(format.parse::<ExportFormat>()?),
        }
    }
}

fn render(report: &Report, format: ExportFormat) -> ApiResult<Response> {
    let body = export(report, format)?;
    let mut response = (
        [(CONTENT_TYPE, HeaderValue::from_static(format.content_type()))],
        body,
    )
        .into_response();

    if format == ExportFormat::Csv {
        let disposition = format!("attachment;filename={}", report.kind().csv_file_name());
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}

/// Per-account totals for one platform. Any upstream failure aborts.
pub async fn platform_summary(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<Response> {
    let format = params.format()?;
    let platform = state.resolver().require_platform(&platform).await?;
    let report = state.reports.platform_summary(&platform.id).await?;
    render(&report, format)
}

/// Raw insights of every platform on the union of all field sets
pub async fn general_report(
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<Response> {
    let format = params.format()?;
    let report = state.reports.general_report().await?;
    render(&report, format)
}

/// Per-platform totals on the union of all field sets
pub async fn general_summary(
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<Response> {
    let format = params.format()?;
    let report = state.reports.general_summary().await?;
    render(&report, format)
}
