//! PDF output via `printpdf`: draws laid-out pages with the built-in
//! Helvetica faces and embeds the logo when it decodes.

use std::io::{BufWriter, Cursor, Write};

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::*;

use super::document::{LogoImage, LOGO_PLACEHOLDER};
use super::paginate::{DrawOp, PageLayout, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::styles::FontFace;
use super::RenderError;

const LOGO_DPI: f32 = 300.0;
const PLACEHOLDER_SIZE: f32 = 14.0;

fn pdf_error<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> RenderError {
    move |e| RenderError::Pdf(format!("{context}: {e}"))
}

/// Draws `pages` into a new PDF and writes it to `sink`.
pub fn write_pages<W: Write>(title: &str, pages: &[PageLayout], sink: W) -> Result<(), RenderError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error("PDF font error"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error("PDF font error"))?;

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for op in &page.ops {
            match op {
                DrawOp::Text { text, font, size, x, y } => {
                    let face = match font {
                        FontFace::Regular => &regular,
                        FontFace::Bold => &bold,
                    };
                    layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), face);
                }
                DrawOp::Logo { image, x, y, width, height } => {
                    if let Err(e) = draw_logo(&layer, image, *x, *y, *width, *height) {
                        tracing::warn!(error = %e, "Logo could not be embedded, drawing placeholder");
                        layer.use_text(LOGO_PLACEHOLDER, PLACEHOLDER_SIZE, Mm(*x), Mm(*y), &bold);
                    }
                }
            }
        }
    }

    let mut buf = BufWriter::new(sink);
    doc.save(&mut buf).map_err(pdf_error("PDF save error"))?;
    buf.flush()?;
    Ok(())
}

fn draw_logo(
    layer: &PdfLayerReference,
    logo: &LogoImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Result<(), String> {
    let decoder = PngDecoder::new(Cursor::new(logo.png.as_slice())).map_err(|e| e.to_string())?;
    let image = Image::try_from(decoder).map_err(|e| e.to_string())?;

    // Natural size at LOGO_DPI, then stretched to the target box.
    let natural_width = logo.width_px.max(1) as f32 / LOGO_DPI * 25.4;
    let natural_height = logo.height_px.max(1) as f32 / LOGO_DPI * 25.4;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            scale_x: Some(width / natural_width),
            scale_y: Some(height / natural_height),
            dpi: Some(LOGO_DPI),
            ..Default::default()
        },
    );
    Ok(())
}
