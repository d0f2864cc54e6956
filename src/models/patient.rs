use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::prescription::PatientInfo;

/// A registered patient. Field names on the wire follow the clinic's
/// existing JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(rename = "nome_completo")]
    pub full_name: String,
    pub cpf: Option<String>,
    #[serde(rename = "data_nascimento")]
    pub birth_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

/// Validated fields for creating or replacing a patient.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub full_name: String,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl From<&Patient> for PatientInfo {
    fn from(patient: &Patient) -> Self {
        PatientInfo {
            name: patient.full_name.clone(),
            birth_date: patient.birth_date,
            document_number: patient.cpf.clone(),
        }
    }
}
