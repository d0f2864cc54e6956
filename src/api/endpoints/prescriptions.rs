//! Prescription endpoints.
//!
//! - `GET /api/receitas` — list, newest first
//! - `POST /api/receitas` — store a prescription
//! - `DELETE /api/receitas/:id`
//! - `GET /api/receitas/:id/pdf` — render a stored prescription
//! - `POST /api/receitas/generate` — render without storing

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DataResponse, ListResponse, MessageResponse};
use crate::db;
use crate::models::{NewPrescription, NewPrescriptionItem, Prescription};
use crate::prescription::{PatientInfo, PrescriptionRequest};

/// Upper bound on `num_receitas`: one year of monthly copies.
pub const MAX_REPEAT_COUNT: u32 = 12;

#[derive(Debug, Deserialize)]
pub struct PrescriptionInput {
    #[serde(rename = "paciente_id", default)]
    pub patient_id: Option<i64>,
    #[serde(rename = "data_inicial", default)]
    pub start_date: Option<String>,
    #[serde(rename = "num_receitas", default)]
    pub repeat_count: Option<u32>,
    #[serde(rename = "observacoes", default)]
    pub observations: Option<String>,
    #[serde(rename = "medicamentos", default)]
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct ItemInput {
    #[serde(rename = "medicamento_id")]
    pub medication_id: i64,
    #[serde(rename = "posologia", default)]
    pub posology: Option<String>,
    #[serde(rename = "instrucoes", default)]
    pub instructions: Option<String>,
}

impl PrescriptionInput {
    fn validate(self) -> Result<NewPrescription, ApiError> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| ApiError::BadRequest("Paciente é obrigatório".into()))?;
        if self.items.is_empty() {
            return Err(ApiError::BadRequest(
                "Pelo menos um medicamento é obrigatório".into(),
            ));
        }
        let start_date = match self.start_date.as_deref().map(str::trim) {
            None | Some("") => return Err(ApiError::BadRequest("Data inicial é obrigatória".into())),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ApiError::BadRequest(format!("Data inicial inválida ({raw})")))?,
        };
        let repeat_count = self.repeat_count.unwrap_or(1);
        if repeat_count == 0 {
            return Err(ApiError::BadRequest(
                "Número de receitas deve ser pelo menos 1".into(),
            ));
        }
        if repeat_count > MAX_REPEAT_COUNT {
            return Err(ApiError::BadRequest(format!(
                "Número de receitas deve ser no máximo {MAX_REPEAT_COUNT}"
            )));
        }

        Ok(NewPrescription {
            patient_id,
            start_date,
            repeat_count,
            observations: self.observations,
            items: self
                .items
                .into_iter()
                .map(|item| NewPrescriptionItem {
                    medication_id: item.medication_id,
                    posology: item.posology,
                    instructions: item.instructions,
                })
                .collect(),
        })
    }
}

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ListResponse<Prescription>>, ApiError> {
    let conn = ctx.open_db()?;
    let prescriptions = db::list_prescriptions(&conn)?;
    Ok(Json(ListResponse::new(prescriptions)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PrescriptionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<Prescription>>), ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let conn = ctx.open_db()?;
    let prescription = db::insert_prescription(&conn, &new)?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(prescription, "Receita criada com sucesso")),
    ))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.open_db()?;
    db::delete_prescription(&conn, id)?;
    tracing::info!(prescription_id = id, "Prescription deleted");
    Ok(Json(MessageResponse::new("Receita excluída com sucesso")))
}

/// `GET /api/receitas/:id/pdf`
pub async fn pdf(State(ctx): State<ApiContext>, Path(id): Path<i64>) -> Result<Response, ApiError> {
    let request = {
        let conn = ctx.open_db()?;
        db::get_prescription(&conn, id)?
            .ok_or_else(|| ApiError::NotFound("Receita não encontrada".into()))?
            .to_request()?
    };
    ctx.render_pdf(request).await
}

/// `POST /api/receitas/generate` — same input as `create`, nothing is stored.
pub async fn generate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PrescriptionInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;

    let request = {
        let conn = ctx.open_db()?;
        inline_request(&conn, new)?
    };
    ctx.render_pdf(request).await
}

/// Resolves an unsaved prescription against the catalogue.
fn inline_request(conn: &Connection, new: NewPrescription) -> Result<PrescriptionRequest, ApiError> {
    let patient = db::get_patient(conn, new.patient_id)?
        .ok_or_else(|| ApiError::NotFound("Paciente não encontrado".into()))?;

    let mut medications = Vec::with_capacity(new.items.len());
    for item in new.items {
        let medication = db::get_medication(conn, item.medication_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("Medicamento ID {} não encontrado", item.medication_id))
        })?;
        medications.push(medication.entry(item.posology, item.instructions));
    }

    Ok(PrescriptionRequest::new(
        PatientInfo::from(&patient),
        medications,
        Some(new.start_date),
        new.repeat_count,
        new.observations,
    )?)
}
