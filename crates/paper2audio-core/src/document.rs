//! Front-matter and section heuristics over a paper's plain-text layer.
//!
//! These are deliberately naive: no font or layout analysis, no column
//! detection. The title is the first non-blank line and the authors line is
//! the second, which is wrong for multi-line titles or running headers. The
//! prompt content depends on exactly this behaviour, so it stays as is.

use std::path::Path;

use crate::backend::{ExtractionError, PdfBackend};

/// Maximum number of words kept after the "abstract" marker.
pub const ABSTRACT_MAX_WORDS: usize = 400;

/// Section keywords searched for in the body, in canonical order.
pub const HEADING_KEYWORDS: &[&str] = &[
    "introduction",
    "background",
    "related work",
    "method",
    "methods",
    "approach",
    "evaluation",
    "results",
    "discussion",
    "limitations",
    "conclusion",
    "future work",
];

/// Extracted representation of one paper.
///
/// Every field is derived from a single extraction pass in
/// [`Document::from_text`]; nothing is mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    title: String,
    authors: String,
    abstract_text: String,
    headings: Vec<&'static str>,
    body: String,
}

impl Document {
    /// Run the front-matter and heading heuristics over raw extracted text.
    pub fn from_text(raw: impl Into<String>) -> Self {
        let body = raw.into();
        let (title, authors) = sniff_front_matter(&body);
        let abstract_text = find_abstract(&body);
        let headings = sniff_headings(&body);
        Self {
            title,
            authors,
            abstract_text,
            headings,
            body,
        }
    }

    /// First non-blank line of the text (best effort).
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Second non-blank line of the text (best effort).
    pub fn authors(&self) -> &str {
        &self.authors
    }

    /// Up to [`ABSTRACT_MAX_WORDS`] words following the first "abstract",
    /// joined by single spaces. Empty if the marker never occurs.
    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    /// Matched [`HEADING_KEYWORDS`], in keyword-list order.
    pub fn headings(&self) -> &[&'static str] {
        &self.headings
    }

    /// The full extracted text, unprocessed.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Extract the text layer of `path` with `backend` and build a [`Document`].
pub fn extract(path: &Path, backend: &dyn PdfBackend) -> Result<Document, ExtractionError> {
    let raw = backend.extract_text(path)?;
    tracing::debug!(path = %path.display(), chars = raw.len(), "extracted text layer");
    Ok(Document::from_text(raw))
}

fn sniff_front_matter(text: &str) -> (String, String) {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let title = lines.next().unwrap_or_default().to_string();
    let authors = lines.next().unwrap_or_default().to_string();
    (title, authors)
}

fn find_abstract(text: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let Some(idx) = lower.find("abstract") else {
        return String::new();
    };
    text[idx + "abstract".len()..]
        .split_whitespace()
        .take(ABSTRACT_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn sniff_headings(text: &str) -> Vec<&'static str> {
    let lower = text.to_ascii_lowercase();
    HEADING_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_title_and_authors_are_first_two_nonblank_lines() {
        let doc = Document::from_text("\n\n  Deep Widgets  \n\n Ada Lovelace, Alan Turing \nBody");
        assert_eq!(doc.title(), "Deep Widgets");
        assert_eq!(doc.authors(), "Ada Lovelace, Alan Turing");
    }

    #[test]
    fn test_front_matter_missing_lines_are_empty() {
        let doc = Document::from_text("Only one line");
        assert_eq!(doc.title(), "Only one line");
        assert_eq!(doc.authors(), "");

        let empty = Document::from_text("   \n\n");
        assert_eq!(empty.title(), "");
        assert_eq!(empty.authors(), "");
    }

    #[test]
    fn test_abstract_capped_at_400_words() {
        let words: Vec<String> = (0..500).map(|i| format!("w{i}")).collect();
        let text = format!("Title\nAuthors\nABSTRACT\n{}", words.join(" "));
        let doc = Document::from_text(text);
        let got: Vec<&str> = doc.abstract_text().split(' ').collect();
        assert_eq!(got.len(), 400);
        assert_eq!(got[0], "w0");
        assert_eq!(got[399], "w399");
    }

    #[test]
    fn test_abstract_uses_first_case_insensitive_match() {
        let doc = Document::from_text("T\nA\nAbstract:  we   study\nthings.\nabstract again");
        assert_eq!(doc.abstract_text(), ": we study things. abstract again");
    }

    #[test]
    fn test_abstract_absent() {
        let doc = Document::from_text("Title\nAuthors\nIntroduction only");
        assert_eq!(doc.abstract_text(), "");
    }

    #[test]
    fn test_abstract_after_non_ascii_prefix() {
        let doc = Document::from_text("Über Widgets\nJosé Núñez\nAbstract — résumé here");
        assert_eq!(doc.abstract_text(), "— résumé here");
    }

    #[test]
    fn test_headings_in_canonical_order() {
        let doc = Document::from_text("Results came first. Then the Introduction.");
        assert_eq!(doc.headings(), &["introduction", "results"]);
    }

    #[test]
    fn test_headings_substring_matches() {
        // "methods" also contains "method"; both keywords are reported.
        let doc = Document::from_text("METHODS\nRelated Work\nFuture work and limitations");
        assert_eq!(
            doc.headings(),
            &["related work", "method", "methods", "limitations", "future work"]
        );
    }

    #[test]
    fn test_body_is_unprocessed() {
        let raw = "  Title \n\nAuthors\n  body   text ";
        let doc = Document::from_text(raw);
        assert_eq!(doc.body(), raw);
    }

    struct FixedText(&'static str);

    impl PdfBackend for FixedText {
        fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    struct Unreadable;

    impl PdfBackend for Unreadable {
        fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
            Err(ExtractionError::Open(format!("{} is not a PDF", path.display())))
        }
    }

    #[test]
    fn test_extract_via_backend() {
        let doc = extract(&PathBuf::from("paper.pdf"), &FixedText("Title\nAuthors")).unwrap();
        assert_eq!(doc.title(), "Title");
        assert_eq!(doc.authors(), "Authors");
    }

    #[test]
    fn test_extract_propagates_backend_error() {
        let err = extract(&PathBuf::from("junk.pdf"), &Unreadable).unwrap_err();
        assert!(matches!(err, ExtractionError::Open(ref m) if m.contains("junk.pdf")));
    }
}
