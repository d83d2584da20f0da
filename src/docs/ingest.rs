use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::types::{DocFormat, Document};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file format '{0}' (supported: .pdf, .txt, .docx)")]
    Unsupported(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not extract text from {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Build a [`Document`] from uploaded bytes. The ID is the blake3 hash of
/// the raw bytes, so re-uploading the same file yields the same ID.
pub fn ingest_bytes(name: &str, bytes: &[u8]) -> Result<Document> {
    let format = DocFormat::from_file_name(name)
        .ok_or_else(|| IngestError::Unsupported(extension_of(name)))?;
    let text = extract(format, name, bytes)?;
    let id = blake3::hash(bytes).to_hex().to_string();

    info!(doc_id = %id, name, ?format, chars = text.len(), "document ingested");
    Ok(Document {
        id,
        name: name.to_string(),
        format,
        text,
        loaded_at: chrono::Utc::now().timestamp(),
    })
}

/// Read and ingest a document from disk.
#[cfg_attr(not(test), allow(dead_code))]
pub fn ingest_path(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if DocFormat::from_file_name(&name).is_none() {
        return Err(IngestError::Unsupported(extension_of(&name)));
    }
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ingest_bytes(&name, &bytes)
}

/// Extract whitespace-normalized text from a file in the given format.
pub fn extract(format: DocFormat, name: &str, bytes: &[u8]) -> Result<String> {
    let unreadable = |reason: String| IngestError::Unreadable {
        name: name.to_string(),
        reason,
    };

    let raw = match format {
        DocFormat::Txt => {
            String::from_utf8(bytes.to_vec()).map_err(|e| unreadable(e.to_string()))?
        }
        DocFormat::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| unreadable(e.to_string()))?
        }
        DocFormat::Docx => docx_text(bytes).map_err(unreadable)?,
    };

    let text = normalize_whitespace(&raw);
    debug!(name, raw_len = raw.len(), clean_len = text.len(), "text extracted");
    Ok(text)
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn docx_text(bytes: &[u8]) -> std::result::Result<String, String> {
    use docx_rs::{DocumentChild, TableCellContent, TableChild, TableRowChild};

    let docx = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;
    let mut text = String::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                push_paragraph(&mut text, p);
                text.push('\n');
            }
            DocumentChild::Table(table) => {
                for TableChild::TableRow(row) in &table.rows {
                    for TableRowChild::TableCell(cell) in &row.cells {
                        for content in &cell.children {
                            if let TableCellContent::Paragraph(p) = content {
                                push_paragraph(&mut text, p);
                            }
                        }
                        text.push('\t');
                    }
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    Ok(text)
}

fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
    use docx_rs::{ParagraphChild, RunChild};

    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    out.push_str(&t.text);
                }
            }
        }
    }
}

fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| name.to_string())
}
