use std::path::Path;

pub const MIME: &str = "application/pdf";
pub const EXTENSION: &str = "pdf";

pub const MAGIC: &[u8] = b"%PDF-";

/// MIME type as a browser would report it for a picked file: guessed from the extension only.
pub fn mime_of(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EXTENSION))
}

pub fn looks_like_pdf(content: &[u8]) -> bool {
    content.starts_with(MAGIC)
}

/// Name of the curriculum file the AI pipeline writes under `data/summaries/`.
pub fn curriculum_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    format!("{}_curriculum.json", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_of() {
        assert_eq!(mime_of(Path::new("notes.pdf")), MIME);
        assert_eq!(mime_of(Path::new("NOTES.PDF")), MIME);
        assert_eq!(mime_of(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_of(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn test_extension() {
        assert!(has_pdf_extension("a.pdf"));
        assert!(has_pdf_extension("a.Pdf"));
        assert!(!has_pdf_extension("a.pdf.exe"));
        assert!(!has_pdf_extension("pdf"));
    }

    #[test]
    fn test_magic() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn test_curriculum_name() {
        assert_eq!(curriculum_name("lecture 1.pdf"), "lecture 1_curriculum.json");
    }
}
