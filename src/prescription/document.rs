//! Prescription story: the ordered flow of paragraphs, tables, spacers and
//! page breaks that makes up one document. Pagination and PDF output live in
//! `paginate` and `pdf`.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::image_crate::ImageDecoder;
use tempfile::NamedTempFile;

use super::paginate::{paginate, PageLayout};
use super::styles::{StyleId, StyleTable};
use super::{MedicationEntry, PatientInfo, RenderError};

// ─── Template text ────────────────────────────────────────────────────────────

pub const INSTITUTION_TITLE: &str = "PREFEITURA MUNICIPAL DE PEROBAL";
pub const INSTITUTION_SUBTITLE: &str = "Secretaria Municipal de Saúde";
pub const INSTITUTION_MOTTO: &str = "Cidade de todos";
pub const CITY_NAME: &str = "Perobal";
pub const DOCUMENT_TITLE: &str = "RECEITA MÉDICA";
pub const LOGO_PLACEHOLDER: &str = "LOGO AQUI";
pub const MEDICATIONS_HEADING: &str = "Medicamentos:";
pub const OBSERVATIONS_HEADING: &str = "Observações:";
pub const SIGNATURE_LINE: &str = "______________________________________";
pub const SIGNATURE_LABEL: &str = "Assinatura do Médico";
pub const REGISTRATION_LABEL: &str = "CRM:";
pub const INSTITUTION_ADDRESS: &str =
    "Rua Jaracatiá, 1060 - Telefax (044)3625-1225 - CEP. 87538-000 - PEROBAL - PARANÁ";

pub const LOGO_WIDTH_MM: f32 = 50.0;
pub const LOGO_HEIGHT_MM: f32 = 15.0;

const HEADER_COLUMNS_MM: [f32; 3] = [50.0, 80.0, 40.0];
const PATIENT_COLUMNS_MM: [f32; 2] = [95.0, 75.0];

// ─── Story elements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub style: StyleId,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: StyleId) -> Self {
        Self { text: text.into(), style }
    }
}

/// Decoded-once logo resource. Holds the PNG bytes and pixel size.
#[derive(Debug, PartialEq)]
pub struct LogoImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl LogoImage {
    /// Reads and validates a PNG logo. Any failure yields `None` and a warning.
    pub fn load(path: &Path) -> Option<Arc<LogoImage>> {
        let png = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Logo not loaded, using placeholder");
                return None;
            }
        };
        match PngDecoder::new(Cursor::new(png.as_slice())) {
            Ok(decoder) => {
                let (width_px, height_px) = decoder.dimensions();
                Some(Arc::new(LogoImage { png, width_px, height_px }))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Logo is not a valid PNG, using placeholder");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Logo {
    Image(Arc<LogoImage>),
    Placeholder(Paragraph),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(Paragraph),
    Logo(Logo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub column_widths: Vec<f32>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Paragraph(Paragraph),
    /// Vertical gap in millimetres.
    Spacer(f32),
    Table(Table),
    PageBreak,
}

// ─── Section builders ─────────────────────────────────────────────────────────

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn header(date: NaiveDate, logo: Option<&Arc<LogoImage>>) -> Vec<Element> {
    let logo_cell = match logo {
        Some(image) => Cell::Logo(Logo::Image(Arc::clone(image))),
        None => Cell::Logo(Logo::Placeholder(Paragraph::new(LOGO_PLACEHOLDER, StyleId::HeaderTitle))),
    };
    let dated = Paragraph::new(format!("{CITY_NAME}, {}", format_date(date)), StyleId::HeaderDate);
    let centered = |text: &str, style| vec![Cell::Empty, Cell::Text(Paragraph::new(text, style)), Cell::Empty];

    vec![
        Element::Table(Table {
            column_widths: HEADER_COLUMNS_MM.to_vec(),
            rows: vec![
                vec![logo_cell, Cell::Empty, Cell::Text(dated)],
                centered(INSTITUTION_TITLE, StyleId::HeaderTitle),
                centered(INSTITUTION_SUBTITLE, StyleId::HeaderSubtitle),
                centered(INSTITUTION_MOTTO, StyleId::Address),
            ],
        }),
        Element::Spacer(5.0),
        Element::Paragraph(Paragraph::new(DOCUMENT_TITLE, StyleId::DocumentTitle)),
        Element::Spacer(5.0),
    ]
}

fn patient_block(patient: &PatientInfo) -> Vec<Element> {
    let birth = patient.birth_date.map(format_date).unwrap_or_default();
    let document = patient.document_number.as_deref().unwrap_or_default();
    let label = |text: String| Cell::Text(Paragraph::new(text, StyleId::Label));

    vec![
        Element::Table(Table {
            column_widths: PATIENT_COLUMNS_MM.to_vec(),
            rows: vec![
                vec![
                    label(format!("Paciente: {}", patient.name)),
                    label(format!("Data de Nascimento: {birth}")),
                ],
                vec![label(format!("CPF/RG: {document}")), Cell::Empty],
            ],
        }),
        Element::Spacer(10.0),
    ]
}

/// Display line for one entry: denomination, then strength, then ` - ` and dosage form.
pub fn medication_line(entry: &MedicationEntry) -> String {
    let mut line = entry.denomination.clone();
    if let Some(strength) = entry.strength.as_deref().filter(|s| !s.trim().is_empty()) {
        line.push(' ');
        line.push_str(strength);
    }
    if let Some(form) = entry.dosage_form.as_deref().filter(|s| !s.trim().is_empty()) {
        line.push_str(" - ");
        line.push_str(form);
    }
    line
}

fn medication_block(medications: &[MedicationEntry]) -> Vec<Element> {
    let mut elements = vec![
        Element::Paragraph(Paragraph::new(MEDICATIONS_HEADING, StyleId::Label)),
        Element::Spacer(2.0),
    ];

    for (i, entry) in medications.iter().enumerate() {
        elements.push(Element::Paragraph(Paragraph::new(
            format!("{}. {}", i + 1, medication_line(entry)),
            StyleId::MedicationItem,
        )));
        if !is_blank(entry.posology.as_deref()) {
            elements.push(Element::Paragraph(Paragraph::new(
                format!("Posologia: {}", entry.posology.as_deref().unwrap_or_default()),
                StyleId::MedicationDetail,
            )));
        }
        if !is_blank(entry.instructions.as_deref()) {
            elements.push(Element::Paragraph(Paragraph::new(
                format!("Instruções: {}", entry.instructions.as_deref().unwrap_or_default()),
                StyleId::MedicationDetail,
            )));
        }
        elements.push(Element::Spacer(5.0));
    }
    elements
}

fn observations_block(observations: Option<&str>) -> Vec<Element> {
    match observations {
        Some(text) if !text.trim().is_empty() => vec![
            Element::Spacer(10.0),
            Element::Paragraph(Paragraph::new(OBSERVATIONS_HEADING, StyleId::Label)),
            Element::Paragraph(Paragraph::new(text, StyleId::Observations)),
        ],
        _ => Vec::new(),
    }
}

fn signature_footer() -> Vec<Element> {
    vec![
        Element::Spacer(40.0),
        Element::Paragraph(Paragraph::new(SIGNATURE_LINE, StyleId::Normal)),
        Element::Paragraph(Paragraph::new(SIGNATURE_LABEL, StyleId::Normal)),
        Element::Spacer(5.0),
        Element::Paragraph(Paragraph::new(REGISTRATION_LABEL, StyleId::Normal)),
        Element::Spacer(20.0),
        Element::Paragraph(Paragraph::new(INSTITUTION_ADDRESS, StyleId::Footer)),
    ]
}

/// The complete element flow of one dated prescription copy.
pub fn compose_copy(
    patient: &PatientInfo,
    medications: &[MedicationEntry],
    date: NaiveDate,
    observations: Option<&str>,
    logo: Option<&Arc<LogoImage>>,
) -> Vec<Element> {
    let mut story = header(date, logo);
    story.extend(patient_block(patient));
    story.extend(medication_block(medications));
    story.extend(observations_block(observations));
    story.extend(signature_footer());
    story
}

// ─── Document ─────────────────────────────────────────────────────────────────

/// A composed prescription, ready to paginate and write.
#[derive(Debug, Clone)]
pub struct Document<'s> {
    pub(crate) styles: &'s StyleTable,
    pub title: String,
    pub story: Vec<Element>,
    pub copy_dates: Vec<NaiveDate>,
}

impl<'s> Document<'s> {
    pub fn copies(&self) -> usize {
        self.copy_dates.len()
    }

    pub fn page_breaks(&self) -> usize {
        self.story.iter().filter(|e| matches!(e, Element::PageBreak)).count()
    }

    /// Lays the story out on A4 pages.
    pub fn layout(&self) -> Vec<PageLayout> {
        paginate(&self.story, self.styles)
    }

    pub fn page_count(&self) -> usize {
        self.layout().len()
    }

    /// Writes the PDF to any byte sink.
    pub fn write_pdf<W: Write>(&self, sink: W) -> Result<(), RenderError> {
        let pages = self.layout();
        super::pdf::write_pages(&self.title, &pages, sink)
    }

    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        self.write_pdf(&mut bytes)?;
        Ok(bytes)
    }

    /// Writes the PDF to a fresh temporary file in the system temp directory.
    ///
    /// The file is removed if writing fails. On success the caller owns the
    /// handle and decides when the file goes away.
    pub fn write_temp_file(&self) -> Result<NamedTempFile, RenderError> {
        self.write_temp_file_in(&std::env::temp_dir())
    }

    pub fn write_temp_file_in(&self, dir: &Path) -> Result<NamedTempFile, RenderError> {
        let mut file = tempfile::Builder::new()
            .prefix("receita_")
            .suffix(".pdf")
            .tempfile_in(dir)?;
        self.write_pdf(file.as_file_mut())?;
        Ok(file)
    }
}
