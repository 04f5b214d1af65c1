use std::io::{Cursor, Read};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;

use crate::storage::{FileStore, StorageError, StoredFile};

/// Downloads a document and extracts its plain text.
/// PDF and DOCX parsing run on the blocking pool; anything else is read as UTF-8.
pub async fn extract_text(store: &dyn FileStore, file: &StoredFile) -> Result<String, StorageError> {
    let bytes = store.download(&file.id).await?;
    let name = file.name.clone();

    let text = match file.extension().as_str() {
        "pdf" => {
            let result = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| StorageError::Backend(format!("pdf extraction task failed: {e}")))?;
            result.map_err(|reason| StorageError::Document { name, reason })?
        }
        "docx" => {
            let result = tokio::task::spawn_blocking(move || docx_text(&bytes))
                .await
                .map_err(|e| StorageError::Backend(format!("docx extraction task failed: {e}")))?;
            result.map_err(|reason| StorageError::Document { name, reason })?
        }
        _ => String::from_utf8_lossy(&bytes).into_owned(),
    };

    Ok(text.trim().to_string())
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a DOCX archive: {e}"))?;
    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {e}"))?;

    let mut xml = String::new();
    document_xml
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable word/document.xml: {e}"))?;

    parse_document_xml(&xml)
}

/// Collects `w:t` runs, one line per `w:p` paragraph. Run text is kept
/// untrimmed; whitespace at run boundaries separates words.
fn parse_document_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    text.push_str(&e.decode().unwrap_or_default());
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    text.push_str(&resolve_reference(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {e}")),
            _ => {}
        }
    }

    Ok(text)
}

/// `&amp;`-style and `&#38;`-style references. Unknown entities are kept verbatim.
fn resolve_reference(reference: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return ch.to_string();
    }
    let name = reference.decode().unwrap_or_default();
    match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{name};"),
    }
}
