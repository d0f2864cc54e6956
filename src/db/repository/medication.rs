use rusqlite::{params, Connection, OptionalExtension, Row};

use super::non_blank;
use crate::db::DatabaseError;
use crate::models::{Medication, NewMedication};

/// Starter catalogue loaded by `seed_medications`: (generic name, strength, dosage form).
pub const STANDARD_MEDICATIONS: [(&str, &str, &str); 15] = [
    ("Sertralina", "50 mg", "Comprimidos"),
    ("Clonazepam", "2 mg", "Comprimidos"),
    ("Omeprazol", "20 mg", "Cápsulas"),
    ("Fluoxetina", "20 mg", "Cápsulas"),
    ("Diazepam", "5 mg", "Comprimidos"),
    ("Losartana", "50 mg", "Comprimidos"),
    ("Metformina", "850 mg", "Comprimidos"),
    ("Sinvastatina", "20 mg", "Comprimidos"),
    ("Atenolol", "25 mg", "Comprimidos"),
    ("Captopril", "25 mg", "Comprimidos"),
    ("Hidroclorotiazida", "25 mg", "Comprimidos"),
    ("Paracetamol", "500 mg", "Comprimidos"),
    ("Ibuprofeno", "600 mg", "Comprimidos"),
    ("Dipirona", "500 mg", "Comprimidos"),
    ("Amoxicilina", "500 mg", "Cápsulas"),
];

const MEDICATION_COLUMNS: &str = "id, generic_name, strength, dosage_form, created_at";

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(0)?,
        generic_name: row.get(1)?,
        strength: row.get(2)?,
        dosage_form: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Medications ordered by generic name, optionally filtered by a name fragment.
pub fn list_medications(conn: &Connection, search: Option<&str>) -> Result<Vec<Medication>, DatabaseError> {
    let pattern = format!("%{}%", search.unwrap_or_default().trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications
         WHERE LOWER(generic_name) LIKE LOWER(?1)
         ORDER BY generic_name COLLATE NOCASE, id"
    ))?;
    let rows = stmt.query_map(params![pattern], medication_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_medication(conn: &Connection, id: i64) -> Result<Option<Medication>, DatabaseError> {
    let medication = conn
        .query_row(
            &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"),
            params![id],
            medication_from_row,
        )
        .optional()?;
    Ok(medication)
}

pub fn count_medications(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM medications", [], |row| row.get(0))?;
    Ok(count)
}

pub fn insert_medication(conn: &Connection, med: &NewMedication) -> Result<Medication, DatabaseError> {
    conn.execute(
        "INSERT INTO medications (generic_name, strength, dosage_form) VALUES (?1, ?2, ?3)",
        params![
            med.generic_name.trim(),
            non_blank(med.strength.as_deref()),
            non_blank(med.dosage_form.as_deref()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_medication(conn, id)?.ok_or_else(|| DatabaseError::not_found("medication", id))
}

pub fn update_medication(conn: &Connection, id: i64, med: &NewMedication) -> Result<Medication, DatabaseError> {
    let changed = conn.execute(
        "UPDATE medications SET generic_name = ?1, strength = ?2, dosage_form = ?3 WHERE id = ?4",
        params![
            med.generic_name.trim(),
            non_blank(med.strength.as_deref()),
            non_blank(med.dosage_form.as_deref()),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("medication", id));
    }
    get_medication(conn, id)?.ok_or_else(|| DatabaseError::not_found("medication", id))
}

/// Deletes a medication. Medications referenced by a prescription are kept.
pub fn delete_medication(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    if get_medication(conn, id)?.is_none() {
        return Err(DatabaseError::not_found("medication", id));
    }
    let in_use: i64 = conn.query_row(
        "SELECT COUNT(*) FROM prescription_items WHERE medication_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if in_use > 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Não é possível excluir medicamento usado em receitas".into(),
        ));
    }
    conn.execute("DELETE FROM medications WHERE id = ?1", params![id])?;
    Ok(())
}

/// Loads `STANDARD_MEDICATIONS` into an empty catalogue. Returns how many were added.
pub fn seed_medications(conn: &Connection) -> Result<usize, DatabaseError> {
    if count_medications(conn)? > 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Banco já possui medicamentos cadastrados".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO medications (generic_name, strength, dosage_form) VALUES (?1, ?2, ?3)",
        )?;
        for (name, strength, form) in STANDARD_MEDICATIONS {
            stmt.execute(params![name, strength, form])?;
        }
    }
    tx.commit()?;

    tracing::info!(count = STANDARD_MEDICATIONS.len(), "Seeded medication catalogue");
    Ok(STANDARD_MEDICATIONS.len())
}
