//! Medication catalogue endpoints.
//!
//! - `GET /api/medicamentos` — list, optional `?search=`
//! - `POST /api/medicamentos`, `PUT|DELETE /api/medicamentos/:id`
//! - `GET /api/medicamentos/export`, `POST /api/medicamentos/import` — CSV
//! - `POST /api/medicamentos/seed` — load the standard catalogue into an empty table

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, DataResponse, ExportResponse, ImportRequest, ImportResponse, ListResponse,
    MessageResponse, SearchQuery,
};
use crate::csv_exchange;
use crate::db;
use crate::models::{Medication, NewMedication};

#[derive(Debug, Deserialize)]
pub struct MedicationInput {
    #[serde(rename = "denominacao_generica", default)]
    pub generic_name: Option<String>,
    #[serde(rename = "concentracao", default)]
    pub strength: Option<String>,
    #[serde(rename = "apresentacao", default)]
    pub dosage_form: Option<String>,
}

impl MedicationInput {
    fn validate(self) -> Result<NewMedication, ApiError> {
        let generic_name = self
            .generic_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Denominação genérica é obrigatória".into()))?;
        Ok(NewMedication {
            generic_name,
            strength: self.strength,
            dosage_form: self.dosage_form,
        })
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<Medication>>, ApiError> {
    let conn = ctx.open_db()?;
    let medications = db::list_medications(&conn, query.search.as_deref())?;
    Ok(Json(ListResponse::new(medications)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<MedicationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Medication>>), ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let conn = ctx.open_db()?;
    let medication = db::insert_medication(&conn, &new)?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(medication, "Medicamento cadastrado com sucesso")),
    ))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    payload: Result<Json<MedicationInput>, JsonRejection>,
) -> Result<Json<DataResponse<Medication>>, ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let conn = ctx.open_db()?;
    let medication = db::update_medication(&conn, id, &new)?;
    Ok(Json(DataResponse::new(medication, "Medicamento atualizado com sucesso")))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.open_db()?;
    db::delete_medication(&conn, id)?;
    Ok(Json(MessageResponse::new("Medicamento excluído com sucesso")))
}

pub async fn export(State(ctx): State<ApiContext>) -> Result<Json<ExportResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let data = csv_exchange::export_medications_csv(&conn)?;
    Ok(Json(ExportResponse {
        success: true,
        data,
        filename: csv_exchange::export_filename("medicamentos", chrono::Local::now().naive_local()),
    }))
}

pub async fn import(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let Json(request) = payload?;
    let conn = ctx.open_db()?;
    let report = csv_exchange::import_medications_csv(&conn, &request.csv_content)?;

    Ok(Json(ImportResponse {
        success: true,
        message: format!("Importação concluída: {} medicamentos importados", report.imported),
        report,
    }))
}

pub async fn seed(State(ctx): State<ApiContext>) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let count = db::seed_medications(&conn)?;
    Ok(Json(MessageResponse::new(format!(
        "{count} medicamentos de teste adicionados com sucesso"
    ))))
}
