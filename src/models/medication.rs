use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::prescription::MedicationEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    #[serde(rename = "denominacao_generica")]
    pub generic_name: String,
    #[serde(rename = "concentracao")]
    pub strength: Option<String>,
    #[serde(rename = "apresentacao")]
    pub dosage_form: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMedication {
    pub generic_name: String,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
}

impl Medication {
    /// Compositor entry for this medication with per-prescription dosing.
    pub fn entry(&self, posology: Option<String>, instructions: Option<String>) -> MedicationEntry {
        MedicationEntry {
            denomination: self.generic_name.clone(),
            strength: self.strength.clone(),
            dosage_form: self.dosage_form.clone(),
            posology,
            instructions,
        }
    }
}
