//! Paragraph styles for the prescription template.
//!
//! The table is built once at startup with [`StyleTable::standard`] and shared
//! read-only by every render.

/// Points to millimetres.
pub const PT_TO_MM: f32 = 0.352_778;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
}

/// Named style slots used by the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleId {
    Normal,
    HeaderDate,
    HeaderTitle,
    HeaderSubtitle,
    Address,
    DocumentTitle,
    Label,
    MedicationItem,
    MedicationDetail,
    Observations,
    Footer,
}

/// Font and spacing for one paragraph. Sizes are in points, spacing in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub font: FontFace,
    pub size: f32,
    pub leading: f32,
    pub align: Align,
    pub left_indent: f32,
    pub space_before: f32,
    pub space_after: f32,
}

impl ParagraphStyle {
    fn new(font: FontFace, size: f32, align: Align) -> Self {
        Self {
            font,
            size,
            leading: size * 1.2,
            align,
            left_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
        }
    }

    /// Line height in millimetres.
    pub fn leading_mm(&self) -> f32 {
        self.leading * PT_TO_MM
    }

    /// Rough average glyph advance for the built-in Helvetica faces, in millimetres.
    pub fn char_width_mm(&self) -> f32 {
        let em = self.size * PT_TO_MM;
        match self.font {
            FontFace::Regular => em * 0.50,
            FontFace::Bold => em * 0.55,
        }
    }

    /// Estimated rendered width of `text`.
    pub fn text_width_mm(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width_mm()
    }

    /// How many characters fit on one line of `width` millimetres.
    pub fn chars_per_line(&self, width: f32) -> usize {
        let usable = (width - self.left_indent).max(self.char_width_mm());
        ((usable / self.char_width_mm()).floor() as usize).max(1)
    }
}

/// Immutable set of paragraph styles.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTable {
    normal: ParagraphStyle,
    header_date: ParagraphStyle,
    header_title: ParagraphStyle,
    header_subtitle: ParagraphStyle,
    address: ParagraphStyle,
    document_title: ParagraphStyle,
    label: ParagraphStyle,
    medication_item: ParagraphStyle,
    medication_detail: ParagraphStyle,
    observations: ParagraphStyle,
    footer: ParagraphStyle,
}

impl StyleTable {
    /// The institutional prescription template styles.
    pub fn standard() -> Self {
        let normal = ParagraphStyle::new(FontFace::Regular, 10.0, Align::Left);

        Self {
            normal,
            header_date: ParagraphStyle {
                align: Align::Right,
                ..normal
            },
            header_title: ParagraphStyle::new(FontFace::Bold, 14.0, Align::Center),
            header_subtitle: ParagraphStyle::new(FontFace::Regular, 12.0, Align::Center),
            address: ParagraphStyle::new(FontFace::Regular, 8.0, Align::Center),
            document_title: ParagraphStyle {
                space_after: 10.0 * PT_TO_MM,
                ..ParagraphStyle::new(FontFace::Bold, 12.0, Align::Center)
            },
            label: ParagraphStyle::new(FontFace::Bold, 10.0, Align::Left),
            medication_item: ParagraphStyle::new(FontFace::Bold, 10.0, Align::Left),
            medication_detail: ParagraphStyle {
                left_indent: 15.0 * PT_TO_MM,
                ..ParagraphStyle::new(FontFace::Regular, 9.0, Align::Left)
            },
            observations: ParagraphStyle {
                space_before: 10.0 * PT_TO_MM,
                ..normal
            },
            footer: ParagraphStyle {
                space_before: 20.0 * PT_TO_MM,
                ..ParagraphStyle::new(FontFace::Regular, 8.0, Align::Center)
            },
        }
    }

    pub fn get(&self, id: StyleId) -> &ParagraphStyle {
        match id {
            StyleId::Normal => &self.normal,
            StyleId::HeaderDate => &self.header_date,
            StyleId::HeaderTitle => &self.header_title,
            StyleId::HeaderSubtitle => &self.header_subtitle,
            StyleId::Address => &self.address,
            StyleId::DocumentTitle => &self.document_title,
            StyleId::Label => &self.label,
            StyleId::MedicationItem => &self.medication_item,
            StyleId::MedicationDetail => &self.medication_detail,
            StyleId::Observations => &self.observations,
            StyleId::Footer => &self.footer,
        }
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::standard()
    }
}
