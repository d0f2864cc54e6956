use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Medication, Patient};
use crate::prescription::{PatientInfo, PrescriptionRequest, RenderError};

/// A stored prescription with its patient and items joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    #[serde(rename = "paciente_id")]
    pub patient_id: i64,
    #[serde(rename = "paciente")]
    pub patient: Option<Patient>,
    #[serde(rename = "data_inicial")]
    pub start_date: NaiveDate,
    #[serde(rename = "num_receitas")]
    pub repeat_count: u32,
    #[serde(rename = "observacoes")]
    pub observations: Option<String>,
    #[serde(rename = "medicamentos")]
    pub items: Vec<PrescriptionItem>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: i64,
    #[serde(rename = "receita_id")]
    pub prescription_id: i64,
    #[serde(rename = "medicamento_id")]
    pub medication_id: i64,
    #[serde(rename = "medicamento")]
    pub medication: Option<Medication>,
    #[serde(rename = "posologia")]
    pub posology: Option<String>,
    #[serde(rename = "instrucoes")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPrescription {
    pub patient_id: i64,
    pub start_date: NaiveDate,
    pub repeat_count: u32,
    pub observations: Option<String>,
    pub items: Vec<NewPrescriptionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPrescriptionItem {
    pub medication_id: i64,
    pub posology: Option<String>,
    pub instructions: Option<String>,
}

impl Prescription {
    /// Compositor input assembled from the stored record.
    pub fn to_request(&self) -> Result<PrescriptionRequest, RenderError> {
        let patient = self
            .patient
            .as_ref()
            .map(PatientInfo::from)
            .unwrap_or_else(|| PatientInfo {
                name: String::new(),
                birth_date: None,
                document_number: None,
            });
        let medications = self
            .items
            .iter()
            .filter_map(|item| {
                item.medication
                    .as_ref()
                    .map(|m| m.entry(item.posology.clone(), item.instructions.clone()))
            })
            .collect();

        PrescriptionRequest::new(
            patient,
            medications,
            Some(self.start_date),
            self.repeat_count,
            self.observations.clone(),
        )
    }
}
