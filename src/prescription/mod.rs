//! Prescription document compositor.
//!
//! Turns a patient, an ordered medication list and a start date into a
//! paginated A4 prescription. Repeated renders emit one dated copy per month
//! of treatment, `COPY_INTERVAL_DAYS` apart, separated by page breaks.
//!
//! Pipeline: `Compositor::render` → [`Document`] (element story) →
//! `paginate` (page layout) → `pdf` (bytes into a caller-supplied sink).

pub mod document;
pub mod filename;
pub mod paginate;
pub mod pdf;
pub mod styles;

use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use document::{Document, Element, LogoImage};
pub use filename::derive_filename;
pub use styles::StyleTable;

/// Fixed spacing between repeated copies. A day count, not a calendar month.
pub const COPY_INTERVAL_DAYS: u64 = 30;

pub const PDF_MIME: &str = "application/pdf";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("At least one medication is required")]
    EmptyMedications,

    #[error("Prescription start date is required")]
    MissingStartDate,

    #[error("Repeat count must be at least 1, got {0}")]
    InvalidRepeatCount(u32),

    #[error("Copy date out of range: {start} + {days} days")]
    DateOutOfRange { start: NaiveDate, days: u64 },

    #[error("PDF build failed: {0}")]
    Pdf(String),

    #[error("Cannot write PDF: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Input types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub document_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub denomination: String,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub posology: Option<String>,
    pub instructions: Option<String>,
}

/// Everything one render needs. Both the stored-prescription path and the
/// inline "generate" path build one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRequest {
    pub patient: PatientInfo,
    pub medications: Vec<MedicationEntry>,
    pub start_date: NaiveDate,
    pub repeat_count: u32,
    pub observations: Option<String>,
}

/// Trimmed text, or `None` when nothing but whitespace remains.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl MedicationEntry {
    fn normalized(self) -> Self {
        Self {
            denomination: self.denomination.trim().to_string(),
            strength: non_blank(self.strength),
            dosage_form: non_blank(self.dosage_form),
            posology: non_blank(self.posology),
            instructions: non_blank(self.instructions),
        }
    }
}

impl PrescriptionRequest {
    /// Validates the render guards up front and trims free-text fields, so a
    /// stored prescription and an equivalent inline one render the same.
    pub fn new(
        patient: PatientInfo,
        medications: Vec<MedicationEntry>,
        start_date: Option<NaiveDate>,
        repeat_count: u32,
        observations: Option<String>,
    ) -> Result<Self, RenderError> {
        if medications.is_empty() {
            return Err(RenderError::EmptyMedications);
        }
        let start_date = start_date.ok_or(RenderError::MissingStartDate)?;
        if repeat_count == 0 {
            return Err(RenderError::InvalidRepeatCount(repeat_count));
        }
        Ok(Self {
            patient,
            medications: medications.into_iter().map(MedicationEntry::normalized).collect(),
            start_date,
            repeat_count,
            observations: non_blank(observations),
        })
    }

    pub fn filename(&self) -> String {
        derive_filename(&self.patient.name, self.start_date, self.repeat_count)
    }
}

// ─── Compositor ───────────────────────────────────────────────────────────────

/// Renders prescriptions with a shared style table.
///
/// Holds no per-call state; one instance can serve any number of renders.
#[derive(Debug, Clone)]
pub struct Compositor<'s> {
    styles: &'s StyleTable,
    logo_path: Option<PathBuf>,
}

impl<'s> Compositor<'s> {
    pub fn new(styles: &'s StyleTable, logo_path: Option<PathBuf>) -> Self {
        Self { styles, logo_path }
    }

    /// One prescription dated `date`.
    pub fn render_single(
        &self,
        patient: &PatientInfo,
        medications: &[MedicationEntry],
        date: NaiveDate,
        observations: Option<&str>,
    ) -> Result<Document<'s>, RenderError> {
        self.render_repeated(patient, medications, 1, date, observations)
    }

    /// `repeat_count` copies; copy `i` is dated `start_date + 30 * i` days.
    pub fn render_repeated(
        &self,
        patient: &PatientInfo,
        medications: &[MedicationEntry],
        repeat_count: u32,
        start_date: NaiveDate,
        observations: Option<&str>,
    ) -> Result<Document<'s>, RenderError> {
        if medications.is_empty() {
            return Err(RenderError::EmptyMedications);
        }
        if repeat_count == 0 {
            return Err(RenderError::InvalidRepeatCount(repeat_count));
        }

        let copy_dates = (0..u64::from(repeat_count))
            .map(|i| {
                let days = COPY_INTERVAL_DAYS * i;
                start_date
                    .checked_add_days(Days::new(days))
                    .ok_or(RenderError::DateOutOfRange { start: start_date, days })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let logo = self.logo_path.as_deref().and_then(LogoImage::load);

        let mut story = Vec::new();
        for (i, date) in copy_dates.iter().enumerate() {
            if i > 0 {
                story.push(Element::PageBreak);
            }
            story.extend(document::compose_copy(
                patient,
                medications,
                *date,
                observations,
                logo.as_ref(),
            ));
        }

        tracing::debug!(copies = copy_dates.len(), elements = story.len(), "Prescription composed");

        Ok(Document {
            styles: self.styles,
            title: format!("Receita - {}", patient.name),
            story,
            copy_dates,
        })
    }

    pub fn render(&self, request: &PrescriptionRequest) -> Result<Document<'s>, RenderError> {
        self.render_repeated(
            &request.patient,
            &request.medications,
            request.repeat_count,
            request.start_date,
            request.observations.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::document::{Cell, Logo, Paragraph, DOCUMENT_TITLE, OBSERVATIONS_HEADING};
    use super::paginate::{DrawOp, CONTENT_WIDTH_MM, MARGIN_MM};
    use super::styles::StyleId;
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn patient() -> PatientInfo {
        PatientInfo {
            name: "Maria Souza".into(),
            birth_date: Some(date(1980, 5, 20)),
            document_number: Some("123.456.789-00".into()),
        }
    }

    fn medications() -> Vec<MedicationEntry> {
        vec![
            MedicationEntry {
                denomination: "Sertralina".into(),
                strength: Some("50 mg".into()),
                dosage_form: Some("Comprimidos".into()),
                posology: Some("1 comprimido pela manhã".into()),
                instructions: Some("Uso contínuo".into()),
            },
            MedicationEntry {
                denomination: "Omeprazol".into(),
                strength: Some("20 mg".into()),
                dosage_form: Some("Cápsulas".into()),
                posology: None,
                instructions: None,
            },
        ]
    }

    fn no_logo(styles: &StyleTable) -> Compositor<'_> {
        Compositor::new(styles, None)
    }

    fn count_paragraphs(doc: &Document<'_>, pred: impl Fn(&Paragraph) -> bool) -> usize {
        doc.story
            .iter()
            .filter(|e| matches!(e, Element::Paragraph(p) if pred(p)))
            .count()
    }

    #[test]
    fn single_and_repeated_once_are_identical() {
        let styles = StyleTable::standard();
        let compositor = no_logo(&styles);
        let start = date(2024, 3, 1);
        let single = compositor
            .render_single(&patient(), &medications(), start, Some("Retornar em 30 dias"))
            .unwrap();
        let repeated = compositor
            .render_repeated(&patient(), &medications(), 1, start, Some("Retornar em 30 dias"))
            .unwrap();

        assert_eq!(single.story, repeated.story);
        assert_eq!(single.page_count(), 1);
        assert_eq!(repeated.page_count(), 1);
        assert_eq!(single.page_breaks(), 0);
    }

    #[test]
    fn repeated_copies_are_thirty_days_apart() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_repeated(&patient(), &medications(), 3, date(2024, 1, 15), None)
            .unwrap();

        assert_eq!(doc.copies(), 3);
        assert_eq!(doc.page_breaks(), 2);
        assert_eq!(
            doc.copy_dates,
            vec![date(2024, 1, 15), date(2024, 2, 14), date(2024, 3, 15)]
        );
        assert_eq!(count_paragraphs(&doc, |p| p.text == DOCUMENT_TITLE), 3);
        assert!(!matches!(doc.story.last(), Some(Element::PageBreak)));
    }

    #[test]
    fn repeated_copies_land_on_their_own_pages() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_repeated(&patient(), &medications(), 2, date(2024, 3, 1), None)
            .unwrap();
        let pages = doc.layout();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains_text("Perobal, 01/03/2024"));
        assert!(pages[1].contains_text("Perobal, 31/03/2024"));
        assert!(!pages[0].contains_text("31/03/2024"));
    }

    #[test]
    fn offset_is_fixed_days_not_calendar_months() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_repeated(&patient(), &medications(), 2, date(2024, 1, 31), None)
            .unwrap();
        assert_eq!(doc.copy_dates[1], date(2024, 3, 1));
    }

    #[test]
    fn blank_observations_produce_no_section() {
        let styles = StyleTable::standard();
        let compositor = no_logo(&styles);
        let start = date(2024, 3, 1);
        let none = compositor.render_single(&patient(), &medications(), start, None).unwrap();

        for blank in ["", "   "] {
            let doc = compositor
                .render_single(&patient(), &medications(), start, Some(blank))
                .unwrap();
            assert_eq!(doc.story, none.story);
            assert_eq!(count_paragraphs(&doc, |p| p.text == OBSERVATIONS_HEADING), 0);
            assert_eq!(count_paragraphs(&doc, |p| p.style == StyleId::Observations), 0);
        }
    }

    #[test]
    fn observations_produce_heading_and_text() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_single(&patient(), &medications(), date(2024, 3, 1), Some("Take with food"))
            .unwrap();
        assert_eq!(count_paragraphs(&doc, |p| p.text == OBSERVATIONS_HEADING), 1);
        assert_eq!(
            count_paragraphs(&doc, |p| p.style == StyleId::Observations && p.text == "Take with food"),
            1
        );
    }

    #[test]
    fn missing_logo_yields_placeholder() {
        let styles = StyleTable::standard();
        let tmp = tempfile::tempdir().unwrap();
        let compositor = Compositor::new(&styles, Some(tmp.path().join("perobal_logo.png")));
        let doc = compositor
            .render_single(&patient(), &medications(), date(2024, 3, 1), None)
            .unwrap();

        let Some(Element::Table(header)) = doc.story.first() else { panic!("header table expected") };
        assert!(matches!(&header.rows[0][0], Cell::Logo(Logo::Placeholder(_))));
        assert!(doc.layout()[0].contains_text("LOGO AQUI"));
        assert_eq!(&doc.to_pdf_bytes().unwrap()[0..4], b"%PDF");
    }

    #[test]
    fn empty_medications_rejected() {
        let styles = StyleTable::standard();
        let err = no_logo(&styles)
            .render_single(&patient(), &[], date(2024, 3, 1), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyMedications));
    }

    #[test]
    fn zero_repeat_count_rejected() {
        let styles = StyleTable::standard();
        let err = no_logo(&styles)
            .render_repeated(&patient(), &medications(), 0, date(2024, 3, 1), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidRepeatCount(0)));
    }

    #[test]
    fn request_guards() {
        assert!(matches!(
            PrescriptionRequest::new(patient(), vec![], Some(date(2024, 3, 1)), 1, None),
            Err(RenderError::EmptyMedications)
        ));
        assert!(matches!(
            PrescriptionRequest::new(patient(), medications(), None, 1, None),
            Err(RenderError::MissingStartDate)
        ));
        assert!(matches!(
            PrescriptionRequest::new(patient(), medications(), Some(date(2024, 3, 1)), 0, None),
            Err(RenderError::InvalidRepeatCount(0))
        ));
    }

    #[test]
    fn render_request_matches_direct_call() {
        let styles = StyleTable::standard();
        let compositor = no_logo(&styles);
        let request = PrescriptionRequest::new(
            patient(),
            medications(),
            Some(date(2024, 1, 15)),
            3,
            Some("Obs".into()),
        )
        .unwrap();

        let via_request = compositor.render(&request).unwrap();
        let direct = compositor
            .render_repeated(&patient(), &medications(), 3, date(2024, 1, 15), Some("Obs"))
            .unwrap();
        assert_eq!(via_request.story, direct.story);
        assert_eq!(request.filename(), "receitas_Maria_Souza_20240115_3meses.pdf");
    }

    #[test]
    fn many_medications_overflow_onto_more_pages() {
        let styles = StyleTable::standard();
        let meds: Vec<MedicationEntry> = (0..25)
            .map(|i| MedicationEntry {
                denomination: format!("Medicamento {i}"),
                strength: Some("10 mg".into()),
                dosage_form: None,
                posology: Some("1x ao dia".into()),
                instructions: Some("Em jejum".into()),
            })
            .collect();
        let doc = no_logo(&styles)
            .render_single(&patient(), &meds, date(2024, 3, 1), None)
            .unwrap();
        assert!(doc.page_count() > 1);
        assert_eq!(doc.page_breaks(), 0);
    }

    #[test]
    fn pdf_bytes_and_temp_file() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_repeated(&patient(), &medications(), 2, date(2024, 3, 1), Some("Obs"))
            .unwrap();

        let bytes = doc.to_pdf_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");

        let tmp = tempfile::tempdir().unwrap();
        let file = doc.write_temp_file_in(tmp.path()).unwrap();
        let on_disk = std::fs::read(file.path()).unwrap();
        assert_eq!(&on_disk[0..4], b"%PDF");
        assert!(file.path().extension().is_some_and(|ext| ext == "pdf"));
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_single(&patient(), &medications(), date(2024, 3, 1), None)
            .unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let err = doc.write_temp_file_in(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let styles = StyleTable::standard();
        let p = patient();
        let meds = medications();
        let _ = no_logo(&styles).render_repeated(&p, &meds, 2, date(2024, 3, 1), None).unwrap();
        assert_eq!(p, patient());
        assert_eq!(meds, medications());
    }

    #[test]
    fn header_date_ends_at_right_margin() {
        let styles = StyleTable::standard();
        let doc = no_logo(&styles)
            .render_single(&patient(), &medications(), date(2024, 3, 1), None)
            .unwrap();
        let pages = doc.layout();
        let (x, size) = pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { text, x, size, .. } if text == "Perobal, 01/03/2024" => Some((*x, *size)),
                _ => None,
            })
            .unwrap();
        let style = styles.get(StyleId::HeaderDate);
        assert_eq!(size, style.size);
        let right_edge = x + style.text_width_mm("Perobal, 01/03/2024");
        assert!((right_edge - (MARGIN_MM + CONTENT_WIDTH_MM)).abs() < 0.01, "right edge {right_edge}");
    }

    #[test]
    fn request_trims_free_text() {
        let mut meds = medications();
        meds[0].posology = Some("  1 comprimido pela manhã\n".into());
        meds[1].instructions = Some("   ".into());
        let request = PrescriptionRequest::new(
            patient(),
            meds,
            Some(date(2024, 3, 1)),
            1,
            Some("Tomar com água\n\n".into()),
        )
        .unwrap();
        assert_eq!(request.observations.as_deref(), Some("Tomar com água"));
        assert_eq!(request.medications[0].posology.as_deref(), Some("1 comprimido pela manhã"));
        assert_eq!(request.medications[1].instructions, None);

        let blank = PrescriptionRequest::new(patient(), medications(), Some(date(2024, 3, 1)), 1, Some(" \n".into()))
            .unwrap();
        assert_eq!(blank.observations, None);
    }
}
