use chrono::NaiveDate;

/// Download name for a rendered prescription.
///
/// Keeps alphanumerics (any script), spaces, `-` and `_`; trims trailing
/// whitespace; spaces become `_`.
pub fn derive_filename(patient_name: &str, start_date: NaiveDate, repeat_count: u32) -> String {
    let cleaned: String = patient_name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_end().replace(' ', "_");
    let date = start_date.format("%Y%m%d");

    if repeat_count == 1 {
        format!("receita_{cleaned}_{date}.pdf")
    } else {
        format!("receitas_{cleaned}_{date}_{repeat_count}meses.pdf")
    }
}
