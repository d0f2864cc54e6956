use rusqlite::{params, Connection, OptionalExtension};

use super::non_blank;
use super::{get_medication, get_patient};
use crate::db::DatabaseError;
use crate::models::{Medication, NewPrescription, Prescription, PrescriptionItem};

struct PrescriptionRow {
    id: i64,
    patient_id: i64,
    start_date: chrono::NaiveDate,
    repeat_count: u32,
    observations: Option<String>,
    created_at: chrono::NaiveDateTime,
}

const PRESCRIPTION_COLUMNS: &str =
    "id, patient_id, start_date, repeat_count, observations, created_at";

fn prescription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        start_date: row.get(2)?,
        repeat_count: row.get(3)?,
        observations: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Items of one prescription in insertion order, medications joined in.
fn fetch_items(conn: &Connection, prescription_id: i64) -> Result<Vec<PrescriptionItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.prescription_id, i.medication_id, i.posology, i.instructions,
                m.id, m.generic_name, m.strength, m.dosage_form, m.created_at
         FROM prescription_items i
         LEFT JOIN medications m ON m.id = i.medication_id
         WHERE i.prescription_id = ?1
         ORDER BY i.id",
    )?;
    let rows = stmt.query_map(params![prescription_id], |row| {
        let medication_id: Option<i64> = row.get(5)?;
        let medication = match medication_id {
            Some(_) => Some(medication_from_offset(row)?),
            None => None,
        };
        Ok(PrescriptionItem {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            medication_id: row.get(2)?,
            posology: row.get(3)?,
            instructions: row.get(4)?,
            medication,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn medication_from_offset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(5)?,
        generic_name: row.get(6)?,
        strength: row.get(7)?,
        dosage_form: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn assemble(conn: &Connection, row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: row.id,
        patient_id: row.patient_id,
        patient: get_patient(conn, row.patient_id)?,
        start_date: row.start_date,
        repeat_count: row.repeat_count,
        observations: row.observations,
        items: fetch_items(conn, row.id)?,
        created_at: row.created_at,
    })
}

/// All prescriptions, newest first.
pub fn list_prescriptions(conn: &Connection) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([], prescription_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(|row| assemble(conn, row)).collect()
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
            params![id],
            prescription_row,
        )
        .optional()?;
    row.map(|row| assemble(conn, row)).transpose()
}

/// Stores a prescription and its items atomically.
///
/// The patient and every referenced medication must exist; the item list
/// must not be empty.
pub fn insert_prescription(conn: &Connection, new: &NewPrescription) -> Result<Prescription, DatabaseError> {
    if new.items.is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "Pelo menos um medicamento é obrigatório".into(),
        ));
    }
    if new.repeat_count == 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Número de receitas deve ser pelo menos 1".into(),
        ));
    }
    if get_patient(conn, new.patient_id)?.is_none() {
        return Err(DatabaseError::not_found("patient", new.patient_id));
    }
    for item in &new.items {
        if get_medication(conn, item.medication_id)?.is_none() {
            return Err(DatabaseError::not_found("medication", item.medication_id));
        }
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO prescriptions (patient_id, start_date, repeat_count, observations)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            new.patient_id,
            new.start_date,
            new.repeat_count,
            non_blank(new.observations.as_deref()),
        ],
    )?;
    let id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO prescription_items (prescription_id, medication_id, posology, instructions)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for item in &new.items {
            stmt.execute(params![
                id,
                item.medication_id,
                non_blank(item.posology.as_deref()),
                non_blank(item.instructions.as_deref()),
            ])?;
        }
    }
    tx.commit()?;

    tracing::info!(prescription_id = id, items = new.items.len(), "Prescription stored");
    get_prescription(conn, id)?.ok_or_else(|| DatabaseError::not_found("prescription", id))
}

/// Deletes a prescription; its items go with it.
pub fn delete_prescription(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("prescription", id));
    }
    Ok(())
}
