use rusqlite::{params, Connection, OptionalExtension, Row};

use super::non_blank;
use crate::db::DatabaseError;
use crate::models::{NewPatient, Patient};

const PATIENT_COLUMNS: &str = "id, full_name, cpf, birth_date, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        cpf: row.get(2)?,
        birth_date: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Patients ordered by name, optionally filtered by a case-insensitive name fragment.
pub fn list_patients(conn: &Connection, search: Option<&str>) -> Result<Vec<Patient>, DatabaseError> {
    let pattern = format!("%{}%", search.unwrap_or_default().trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE LOWER(full_name) LIKE LOWER(?1)
         ORDER BY full_name COLLATE NOCASE, id"
    ))?;
    let rows = stmt.query_map(params![pattern], patient_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn find_patient_by_cpf(conn: &Connection, cpf: &str) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE cpf = ?1"),
            params![cpf.trim()],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

fn ensure_cpf_free(conn: &Connection, cpf: Option<&str>, except_id: Option<i64>) -> Result<(), DatabaseError> {
    if let Some(cpf) = cpf {
        if let Some(existing) = find_patient_by_cpf(conn, cpf)? {
            if Some(existing.id) != except_id {
                return Err(DatabaseError::ConstraintViolation("CPF já cadastrado".into()));
            }
        }
    }
    Ok(())
}

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<Patient, DatabaseError> {
    let cpf = non_blank(patient.cpf.as_deref());
    ensure_cpf_free(conn, cpf.as_deref(), None)?;

    conn.execute(
        "INSERT INTO patients (full_name, cpf, birth_date) VALUES (?1, ?2, ?3)",
        params![patient.full_name.trim(), cpf, patient.birth_date],
    )?;
    let id = conn.last_insert_rowid();
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

pub fn update_patient(conn: &Connection, id: i64, patient: &NewPatient) -> Result<Patient, DatabaseError> {
    if get_patient(conn, id)?.is_none() {
        return Err(DatabaseError::not_found("patient", id));
    }
    let cpf = non_blank(patient.cpf.as_deref());
    ensure_cpf_free(conn, cpf.as_deref(), Some(id))?;

    conn.execute(
        "UPDATE patients SET full_name = ?1, cpf = ?2, birth_date = ?3 WHERE id = ?4",
        params![patient.full_name.trim(), cpf, patient.birth_date, id],
    )?;
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

/// Deletes a patient. Patients with prescriptions on file are kept.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    if get_patient(conn, id)?.is_none() {
        return Err(DatabaseError::not_found("patient", id));
    }
    let prescriptions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM prescriptions WHERE patient_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if prescriptions > 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Não é possível excluir paciente com receitas cadastradas".into(),
        ));
    }
    conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    Ok(())
}
