use std::path::{Path, PathBuf};

use super::types::Document;
use super::StorageError;

/// File extensions (lowercase, without the dot) accepted by the loader.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Read one guideline document as text. PDF pages are joined with a blank line.
pub fn load_document(path: &Path) -> Result<String, StorageError> {
    match extension_of(path).as_str() {
        "pdf" => load_pdf(path),
        "txt" | "md" => std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
        other => Err(StorageError::UnsupportedFormat {
            extension: if other.is_empty() {
                String::new()
            } else {
                format!(".{other}")
            },
            path: path.to_path_buf(),
        }),
    }
}

fn load_pdf(path: &Path) -> Result<String, StorageError> {
    let bytes = std::fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        StorageError::PdfParsing {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;
    tracing::debug!(file = %path.display(), pages = pages.len(), "PDF text extracted");
    Ok(pages.join("\n\n"))
}

/// Load every supported file directly inside `dir`, in file-name order.
/// Other files are ignored.
pub fn load_all_documents(dir: &Path) -> Result<Vec<Document>, StorageError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let text = load_document(&path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        docs.push(Document { source, text });
    }

    tracing::info!(dir = %dir.display(), documents = docs.len(), "Guideline documents loaded");
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-page PDF with one line of text, built with lopdf.
    fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn loads_text_and_markdown() {
        let tmp = tempfile::tempdir().unwrap();
        let txt = tmp.path().join("a.txt");
        let md = tmp.path().join("b.MD");
        std::fs::write(&txt, "Hypertension guideline").unwrap();
        std::fs::write(&md, "# Diabetes").unwrap();

        assert_eq!(load_document(&txt).unwrap(), "Hypertension guideline");
        assert_eq!(load_document(&md).unwrap(), "# Diabetes");
    }

    #[test]
    fn unsupported_extension_names_it() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.docx");
        std::fs::write(&path, "x").unwrap();

        let err = load_document(&path).unwrap_err();
        match &err {
            StorageError::UnsupportedFormat { extension, .. } => assert_eq!(extension, ".docx"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains(".docx"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_document(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn loads_pdf_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("guide.pdf");
        std::fs::write(&path, make_test_pdf("Hello World")).unwrap();

        let text = load_document(&path).unwrap();
        assert!(
            text.contains("Hello") || text.contains("World"),
            "Expected PDF text, got: {text}"
        );
    }

    #[test]
    fn corrupt_pdf_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 garbage").unwrap();
        assert!(matches!(
            load_document(&path),
            Err(StorageError::PdfParsing { .. })
        ));
    }

    #[test]
    fn directory_load_is_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b_diabetes.txt"), "diabetes").unwrap();
        std::fs::write(tmp.path().join("a_hypertension.md"), "hypertension").unwrap();
        std::fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(tmp.path().join("nested.txt")).unwrap();

        let docs = load_all_documents(tmp.path()).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a_hypertension.md", "b_diabetes.txt"]);
        assert_eq!(docs[1].text, "diabetes");
    }

    #[test]
    fn bundled_guidelines_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/guidelines");
        let docs = load_all_documents(&dir).unwrap();
        assert!(docs.len() >= 3);
        assert!(docs.iter().all(|d| !d.text.trim().is_empty()));
    }
}
