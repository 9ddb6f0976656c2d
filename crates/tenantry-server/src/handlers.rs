//! Organization and admin HTTP handlers

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Instant;

use tenantry_core::{AdminId, Error, MigrationReport, OrganizationId, OrganizationPatch, Result};
use tenantry_lifecycle::{CreateOrganization, UpdateOrganization};
use tenantry_observability::{Metrics, Operation};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::AuthenticatedAdmin;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub organization_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrganizationResponse {
    pub ok: bool,
    pub organization_name: String,
    pub collection_name: String,
    pub admin_user_id: AdminId,
    pub org_id: OrganizationId,
}

#[derive(Debug, Deserialize)]
pub struct GetOrganizationQuery {
    pub organization_name: String,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub organization_name: String,
    pub collection_name: String,
    pub admin_user_id: Option<AdminId>,
    pub org_id: OrganizationId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub organization_name: String,
    pub new_organization_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Organization fields changed by an update
#[derive(Debug, Default, Serialize)]
pub struct UpdatedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OrganizationPatch> for UpdatedFields {
    fn from(patch: OrganizationPatch) -> Self {
        Self {
            organization_name: patch.name,
            slug: patch.slug,
            collection_name: patch.region_name,
            updated_at: patch.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateOrganizationResponse {
    pub ok: bool,
    pub updated: UpdatedFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationReport>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteOrganizationRequest {
    pub organization_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Service running" }))
}

pub async fn create_organization(
    State(state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> std::result::Result<(StatusCode, Json<CreateOrganizationResponse>), ApiError> {
    let started = Instant::now();
    let result = async {
        require_name(&request.organization_name)?;
        require_email(&request.email)?;
        require_password(&request.password)?;

        state
            .lifecycle
            .create(CreateOrganization {
                name: request.organization_name,
                admin_email: request.email,
                admin_password: request.password,
            })
            .await
    }
    .await;
    observe(&state.metrics, Operation::Create, started, &result);

    let created = result?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrganizationResponse {
            ok: true,
            organization_name: created.organization_name,
            collection_name: created.region_name,
            admin_user_id: created.admin_id,
            org_id: created.org_id,
        }),
    ))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Query(query): Query<GetOrganizationQuery>,
) -> std::result::Result<Json<OrganizationResponse>, ApiError> {
    let started = Instant::now();
    let result = async {
        require_name(&query.organization_name)?;
        state.lifecycle.get(&query.organization_name).await
    }
    .await;
    observe(&state.metrics, Operation::Get, started, &result);

    let org = result?;
    Ok(Json(OrganizationResponse {
        organization_name: org.name,
        collection_name: org.region_name,
        admin_user_id: org.admin_id,
        org_id: org.id,
        created_at: org.created_at,
    }))
}

pub async fn update_organization(
    State(state): State<AppState>,
    Json(request): Json<UpdateOrganizationRequest>,
) -> std::result::Result<Json<UpdateOrganizationResponse>, ApiError> {
    let started = Instant::now();
    let result = async {
        require_name(&request.organization_name)?;
        if let Some(email) = present(&request.email) {
            require_email(email)?;
        }
        // Passwords are hashed verbatim, so check the untrimmed value
        if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
            require_password(password)?;
        }

        state
            .lifecycle
            .update(UpdateOrganization {
                organization_name: request.organization_name,
                new_organization_name: request.new_organization_name,
                email: request.email,
                password: request.password,
            })
            .await
    }
    .await;
    observe(&state.metrics, Operation::Update, started, &result);

    match &result {
        Ok(outcome) => {
            if let Some(report) = &outcome.migration {
                state.metrics.record_migration(
                    report.scanned,
                    report.written,
                    report.failed,
                    report.batches,
                );
            }
        }
        Err(Error::MigrationAborted(report)) => {
            state.metrics.record_migration_aborted(
                report.scanned,
                report.written,
                report.failed,
                report.batches,
            );
        }
        Err(_) => {}
    }

    let outcome = result?;
    Ok(Json(UpdateOrganizationResponse {
        ok: true,
        updated: outcome.updated.into(),
        migration: outcome.migration,
    }))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    AuthenticatedAdmin(principal): AuthenticatedAdmin,
    Json(request): Json<DeleteOrganizationRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let result = async {
        require_name(&request.organization_name)?;
        state
            .lifecycle
            .delete(&request.organization_name, principal.org_id)
            .await
    }
    .await;
    observe(&state.metrics, Operation::Delete, started, &result);

    result?;
    Ok(Json(json!({
        "ok": true,
        "deleted_org": request.organization_name,
    })))
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> std::result::Result<Json<LoginResponse>, ApiError> {
    let result = async {
        require_email(&request.email)?;
        require_password(&request.password)?;
        state.auth.login(&request.email, &request.password).await
    }
    .await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    state.metrics.record_login(outcome);

    let login = result?;
    Ok(Json(LoginResponse {
        access_token: login.access_token,
        token_type: "bearer",
        expires_in: login.expires_in,
    }))
}

fn observe<T>(metrics: &Metrics, operation: Operation, started: Instant, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics.record_operation(operation, outcome, started.elapsed().as_secs_f64());
}

/// Optional request field, with an empty string meaning "not supplied"
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidRequest(
            "organization_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<()> {
    if is_plausible_email(email.trim()) {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!("invalid email address: {}", email)))
    }
}

fn require_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// One `@`, a non-empty local part and a dotted domain with no empty labels.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
