use serde::{Deserialize, Serialize};

/// Content-addressed document ID (blake3 hex hash of the uploaded bytes).
pub type DocId = String;

/// Formats accepted by the ingester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocFormat {
    Pdf,
    Txt,
    Docx,
}

impl DocFormat {
    pub const SUPPORTED: &'static [&'static str] = &[".pdf", ".txt", ".docx"];

    /// Resolve a format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

/// A loaded document: extracted plain text plus what we know about its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub name: String,
    pub format: DocFormat,
    pub text: String,
    pub loaded_at: i64,
}

impl Document {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// First `max_chars` characters, for previews.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }
}
