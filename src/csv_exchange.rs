//! CSV export and import of the patient and medication registers.
//!
//! Columns are looked up by header name, so extra or reordered columns are
//! tolerated. Import runs in a single transaction; bad rows are reported by
//! line number (the header is line 1) and skipped.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::models::{NewMedication, NewPatient};

pub const PATIENT_HEADERS: [&str; 3] = ["Nome Completo", "CPF", "Data Nascimento"];
pub const MEDICATION_HEADERS: [&str; 3] = ["Denominação Genérica", "Concentração", "Apresentação"];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Conteúdo CSV não fornecido")]
    MissingContent,
}

/// Outcome of an import. `duplicated` only counts patients skipped by CPF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub duplicated: usize,
    pub errors: Vec<String>,
}

/// `<kind>_<YYYYMMDD_HHMMSS>.csv`
pub fn export_filename(kind: &str, at: NaiveDateTime) -> String {
    format!("{kind}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, CsvError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ─── Patients ───────────────────────────────────────────────

pub fn export_patients_csv(conn: &Connection) -> Result<String, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PATIENT_HEADERS)?;
    for patient in db::list_patients(conn, None)? {
        let birth = patient
            .birth_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        writer.write_record([
            patient.full_name.as_str(),
            patient.cpf.as_deref().unwrap_or_default(),
            birth.as_str(),
        ])?;
    }
    finish(writer)
}

pub fn import_patients_csv(conn: &Connection, content: &str) -> Result<ImportReport, CsvError> {
    let mut rows = Rows::parse(content)?;
    let mut report = ImportReport::default();

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    while let Some((line, row)) = rows.next_row(&mut report) {
        let name = row.field(PATIENT_HEADERS[0]);
        let cpf = row.field(PATIENT_HEADERS[1]);
        let birth = row.field(PATIENT_HEADERS[2]);

        if name.is_empty() {
            report.errors.push(format!("Linha {line}: Nome é obrigatório"));
            continue;
        }
        if !cpf.is_empty() && db::find_patient_by_cpf(&tx, cpf)?.is_some() {
            report.duplicated += 1;
            continue;
        }
        let birth_date = if birth.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(birth, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    report.errors.push(format!("Linha {line}: Data inválida ({birth})"));
                    continue;
                }
            }
        };

        let patient = NewPatient {
            full_name: name.to_string(),
            cpf: Some(cpf.to_string()),
            birth_date,
        };
        match db::insert_patient(&tx, &patient) {
            Ok(_) => report.imported += 1,
            Err(e) => report.errors.push(format!("Linha {line}: {e}")),
        }
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        imported = report.imported,
        duplicated = report.duplicated,
        errors = report.errors.len(),
        "Patient CSV import finished"
    );
    Ok(report)
}

// ─── Medications ────────────────────────────────────────────

pub fn export_medications_csv(conn: &Connection) -> Result<String, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(MEDICATION_HEADERS)?;
    for med in db::list_medications(conn, None)? {
        writer.write_record([
            med.generic_name.as_str(),
            med.strength.as_deref().unwrap_or_default(),
            med.dosage_form.as_deref().unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

pub fn import_medications_csv(conn: &Connection, content: &str) -> Result<ImportReport, CsvError> {
    let mut rows = Rows::parse(content)?;
    let mut report = ImportReport::default();

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    while let Some((line, row)) = rows.next_row(&mut report) {
        let name = row.field(MEDICATION_HEADERS[0]);
        if name.is_empty() {
            report
                .errors
                .push(format!("Linha {line}: Denominação genérica é obrigatória"));
            continue;
        }
        let med = NewMedication {
            generic_name: name.to_string(),
            strength: Some(row.field(MEDICATION_HEADERS[1]).to_string()),
            dosage_form: Some(row.field(MEDICATION_HEADERS[2]).to_string()),
        };
        match db::insert_medication(&tx, &med) {
            Ok(_) => report.imported += 1,
            Err(e) => report.errors.push(format!("Linha {line}: {e}")),
        }
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        imported = report.imported,
        errors = report.errors.len(),
        "Medication CSV import finished"
    );
    Ok(report)
}

// ─── Reading ────────────────────────────────────────────────

/// Header-keyed record reader over in-memory CSV text.
struct Rows<'a> {
    headers: csv::StringRecord,
    records: csv::StringRecordsIntoIter<&'a [u8]>,
    line: usize,
}

struct Row<'r> {
    headers: &'r csv::StringRecord,
    record: csv::StringRecord,
}

impl Row<'_> {
    /// Trimmed value of the named column, empty when the column is absent.
    fn field(&self, name: &str) -> &str {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .unwrap_or_default()
    }
}

impl<'a> Rows<'a> {
    fn parse(content: &'a str) -> Result<Self, CsvError> {
        if content.trim().is_empty() {
            return Err(CsvError::MissingContent);
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        Ok(Self {
            headers,
            records: reader.into_records(),
            line: 1,
        })
    }

    /// Next parseable row with its line number; unparseable rows are
    /// recorded in `report` and skipped.
    fn next_row(&mut self, report: &mut ImportReport) -> Option<(usize, Row<'_>)> {
        loop {
            let next = self.records.next()?;
            self.line += 1;
            match next {
                Ok(record) => {
                    return Some((
                        self.line,
                        Row {
                            headers: &self.headers,
                            record,
                        },
                    ))
                }
                Err(e) => report.errors.push(format!("Linha {}: {e}", self.line)),
            }
        }
    }
}
