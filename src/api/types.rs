//! Shared state and response envelopes for the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::Notify;

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::csv_exchange::ImportReport;
use crate::db;
use crate::prescription::{Compositor, PrescriptionRequest, StyleTable, PDF_MIME};

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub db_path: Arc<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub styles: Arc<StyleTable>,
    pub shutdown: Arc<Notify>,
}

impl ApiContext {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db_path: Arc::new(config.db_path.clone()),
            logo_path: Some(config.logo_path()),
            styles: Arc::new(StyleTable::standard()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// One connection per request; SQLite handles the locking.
    pub fn open_db(&self) -> Result<Connection, ApiError> {
        db::open_database(&self.db_path).map_err(ApiError::from)
    }

    pub fn compositor(&self) -> Compositor<'_> {
        Compositor::new(&self.styles, self.logo_path.clone())
    }

    /// Renders on the blocking pool and answers with the PDF as an attachment.
    pub async fn render_pdf(&self, request: PrescriptionRequest) -> Result<Response, ApiError> {
        let ctx = self.clone();
        let filename = request.filename();
        let bytes = tokio::task::spawn_blocking(move || {
            let document = ctx.compositor().render(&request)?;
            document.to_pdf_bytes()
        })
        .await??;

        tracing::info!(%filename, size = bytes.len(), "Prescription PDF rendered");
        Ok(pdf_response(bytes, &filename))
    }
}

// ═══════════════════════════════════════════════════════════
// Response envelopes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            total: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: &'static str,
}

impl<T> DataResponse<T> {
    pub fn new(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// CSV text plus a suggested download name.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub report: ImportReport,
}

#[derive(Debug, serde::Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub csv_content: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// PDF delivery
// ═══════════════════════════════════════════════════════════

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987
/// UTF-8 name for clients that understand it.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

pub fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PDF_MIME.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_filename_passes_through() {
        assert_eq!(
            content_disposition("receita_Maria_Souza_20240115.pdf"),
            "attachment; filename=\"receita_Maria_Souza_20240115.pdf\"; \
             filename*=UTF-8''receita_Maria_Souza_20240115.pdf"
        );
    }

    #[test]
    fn accented_filename_is_percent_encoded() {
        let value = content_disposition("receita_João_20240301.pdf");
        assert!(value.contains("filename=\"receita_Jo_o_20240301.pdf\""));
        assert!(value.contains("filename*=UTF-8''receita_Jo%C3%A3o_20240301.pdf"));
    }

    #[test]
    fn list_response_counts_items() {
        let list = ListResponse::new(vec![1, 2, 3]);
        assert!(list.success);
        assert_eq!(list.total, 3);
    }
}
