use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{dsl::exists, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::domain::contracts::{
    find_template, render, templates, ContractTemplate, RenderedContract,
};
use crate::extract::{Json, Path, Query};
use crate::models::{Contract, NewContract};
use crate::schema::{contracts, projects};
use crate::state::AppState;
use crate::utils::time::to_iso;
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

#[derive(Deserialize)]
pub struct GenerateContractRequest {
    pub template_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub project_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ContractListQuery {
    pub project_id: Option<Uuid>,
    pub template_id: Option<String>,
}

#[derive(Serialize)]
pub struct ContractPreviewResponse {
    pub template_id: &'static str,
    pub identifier: String,
    pub title: String,
    pub html: String,
    pub fields: Value,
}

#[derive(Serialize)]
pub struct ContractSummary {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub template_id: String,
    pub identifier: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ContractResponse {
    #[serde(flatten)]
    pub summary: ContractSummary,
    pub fields: Value,
    pub html: String,
}

pub async fn list_templates(_user: AuthenticatedUser) -> Json<&'static [ContractTemplate]> {
    Json(templates())
}

pub async fn get_template(
    Path(template_id): Path<String>,
    _user: AuthenticatedUser,
) -> AppResult<Json<&'static ContractTemplate>> {
    Ok(Json(find_template(&template_id)?))
}

pub async fn preview_contract(
    _user: AuthenticatedUser,
    Json(payload): Json<GenerateContractRequest>,
) -> AppResult<Json<ContractPreviewResponse>> {
    let template = find_template(payload.template_id.trim())?;
    let rendered = render(template, &payload.fields, Utc::now())?;
    Ok(Json(to_preview(template, rendered)))
}

pub async fn create_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<GenerateContractRequest>,
) -> AppResult<(StatusCode, Json<ContractResponse>)> {
    let template = find_template(payload.template_id.trim())?;
    let rendered = render(template, &payload.fields, Utc::now())?;

    let mut conn = state.db()?;

    if let Some(project_id) = payload.project_id {
        let owned: bool = diesel::select(exists(
            projects::table
                .filter(projects::id.eq(project_id))
                .filter(projects::owner_id.eq(user.user_id)),
        ))
        .get_result(&mut conn)?;
        if !owned {
            return Err(AppError::bad_request("project does not exist"));
        }
    }

    let new_contract = NewContract {
        id: Uuid::new_v4(),
        owner_id: user.user_id,
        project_id: payload.project_id,
        template_id: template.id.to_string(),
        identifier: rendered.identifier,
        title: rendered.title,
        fields: serde_json::to_value(&rendered.fields)?,
        html: rendered.html,
    };
    diesel::insert_into(contracts::table)
        .values(&new_contract)
        .execute(&mut conn)?;

    let contract: Contract = contracts::table.find(new_contract.id).first(&mut conn)?;
    info!(
        contract_id = %contract.id,
        identifier = %contract.identifier,
        template_id = %contract.template_id,
        "generated contract"
    );

    Ok((StatusCode::CREATED, Json(to_contract_response(contract))))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    Query(params): Query<ContractListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ContractSummary>>> {
    let mut conn = state.db()?;

    let mut query = contracts::table
        .filter(contracts::owner_id.eq(user.user_id))
        .into_boxed();
    if let Some(project_id) = params.project_id {
        query = query.filter(contracts::project_id.eq(project_id));
    }
    if let Some(template_id) = params.template_id.as_deref().filter(|t| !t.is_empty()) {
        query = query.filter(contracts::template_id.eq(template_id.to_string()));
    }

    let rows: Vec<Contract> = query
        .order((contracts::created_at.desc(), contracts::id.asc()))
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|c| to_contract_response(c).summary)
            .collect(),
    ))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ContractResponse>> {
    let mut conn = state.db()?;
    let contract: Contract = contracts::table
        .find(contract_id)
        .filter(contracts::owner_id.eq(user.user_id))
        .first(&mut conn)?;
    Ok(Json(to_contract_response(contract)))
}

pub async fn delete_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(
        contracts::table
            .filter(contracts::id.eq(contract_id))
            .filter(contracts::owner_id.eq(user.user_id)),
    )
    .execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn to_preview(
    template: &'static ContractTemplate,
    rendered: RenderedContract,
) -> ContractPreviewResponse {
    ContractPreviewResponse {
        template_id: template.id,
        identifier: rendered.identifier,
        title: rendered.title,
        html: rendered.html,
        fields: Value::Object(
            rendered
                .fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        ),
    }
}

fn to_contract_response(contract: Contract) -> ContractResponse {
    ContractResponse {
        summary: ContractSummary {
            id: contract.id,
            project_id: contract.project_id,
            template_id: contract.template_id,
            identifier: contract.identifier,
            title: contract.title,
            created_at: to_iso(contract.created_at),
        },
        fields: contract.fields,
        html: contract.html,
    }
}
