//! Patient endpoints.
//!
//! - `GET /api/pacientes` — list, optional `?search=`
//! - `POST /api/pacientes` — create
//! - `PUT /api/pacientes/:id` — replace
//! - `DELETE /api/pacientes/:id` — delete (refused while prescriptions exist)
//! - `GET /api/pacientes/export`, `POST /api/pacientes/import` — CSV

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
use crate::models::{NewPatient, Patient};

#[derive(Debug, Deserialize)]
pub struct PatientInput {
    #[serde(rename = "nome_completo", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(rename = "data_nascimento", default)]
    pub birth_date: Option<String>,
}

impl PatientInput {
    fn validate(self) -> Result<NewPatient, ApiError> {
        let full_name = self
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Nome é obrigatório".into()))?;

        let birth_date = match self.birth_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| ApiError::BadRequest(format!("Data de nascimento inválida ({raw})")))?,
            ),
        };

        Ok(NewPatient {
            full_name,
            cpf: self.cpf,
            birth_date,
        })
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<Patient>>, ApiError> {
    let conn = ctx.open_db()?;
    let patients = db::list_patients(&conn, query.search.as_deref())?;
    Ok(Json(ListResponse::new(patients)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Patient>>), ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let conn = ctx.open_db()?;
    let patient = db::insert_patient(&conn, &new)?;
    tracing::info!(patient_id = patient.id, "Patient created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(patient, "Paciente cadastrado com sucesso")),
    ))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<DataResponse<Patient>>, ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let conn = ctx.open_db()?;
    let patient = db::update_patient(&conn, id, &new)?;
    Ok(Json(DataResponse::new(patient, "Paciente atualizado com sucesso")))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.open_db()?;
    db::delete_patient(&conn, id)?;
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(Json(MessageResponse::new("Paciente excluído com sucesso")))
}

pub async fn export(State(ctx): State<ApiContext>) -> Result<Json<ExportResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let data = csv_exchange::export_patients_csv(&conn)?;
    Ok(Json(ExportResponse {
        success: true,
        data,
        filename: csv_exchange::export_filename("pacientes", chrono::Local::now().naive_local()),
    }))
}

pub async fn import(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let Json(request) = payload?;
    let conn = ctx.open_db()?;
    let report = csv_exchange::import_patients_csv(&conn, &request.csv_content)?;

    Ok(Json(ImportResponse {
        success: true,
        message: format!(
            "Importação concluída: {} importados, {} duplicados ignorados",
            report.imported, report.duplicated
        ),
        report,
    }))
}
