//! ComicInfo XML serialization and parsing.
//!
//! Serialization uses a fixed element order and UTF-8 throughout, so the
//! output is reproducible byte-for-byte for identical input. That property is
//! what makes re-injection idempotent at the archive layer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::document::ComicInfo;
use crate::{LongboxError, Result};

/// ComicInfo v2.0 schema namespace.
pub const XMLNS: &str =
    "https://raw.githubusercontent.com/anansi-project/comicinfo/refs/heads/main/schema/v2.0/ComicInfo.xsd";

/// Serialize a document to its on-disk XML form. Pure and deterministic.
pub fn serialize(info: &ComicInfo) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(LongboxError::xml)?;

    let mut root = BytesStart::new("ComicInfo");
    root.push_attribute(("xmlns", XMLNS));
    writer
        .write_event(Event::Start(root))
        .map_err(LongboxError::xml)?;

    // Fixed element order; new fields go at the end, never in the middle.
    element(&mut writer, "Series", Some(&info.series))?;
    element(&mut writer, "Number", Some(&info.number))?;
    element(&mut writer, "Title", info.title.as_deref())?;
    element(&mut writer, "Count", info.count.map(|v| v.to_string()).as_deref())?;
    element(&mut writer, "Year", info.year.map(|v| v.to_string()).as_deref())?;
    element(&mut writer, "Month", info.month.map(|v| v.to_string()).as_deref())?;
    element(&mut writer, "Day", info.day.map(|v| v.to_string()).as_deref())?;
    element(&mut writer, "CoverDate", info.cover_date.as_deref())?;
    element(&mut writer, "Summary", info.summary.as_deref())?;
    element(&mut writer, "Notes", info.notes.as_deref())?;
    element(&mut writer, "Writer", info.writer.as_deref())?;
    element(&mut writer, "Penciller", info.penciller.as_deref())?;
    element(&mut writer, "Inker", info.inker.as_deref())?;
    element(&mut writer, "Colorist", info.colorist.as_deref())?;
    element(&mut writer, "Letterer", info.letterer.as_deref())?;
    element(&mut writer, "CoverArtist", info.cover_artist.as_deref())?;
    element(&mut writer, "Editor", info.editor.as_deref())?;
    element(&mut writer, "Publisher", info.publisher.as_deref())?;
    element(&mut writer, "Web", info.web.as_deref())?;
    element(
        &mut writer,
        "PageCount",
        info.page_count.map(|v| v.to_string()).as_deref(),
    )?;
    element(&mut writer, "LanguageISO", info.language_iso.as_deref())?;
    element(&mut writer, "Format", info.format.as_deref())?;
    element(&mut writer, "SourceId", info.source_id.as_deref())?;

    writer
        .write_event(Event::End(BytesEnd::new("ComicInfo")))
        .map_err(LongboxError::xml)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn element(writer: &mut Writer<Vec<u8>>, tag: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(LongboxError::xml)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(LongboxError::xml)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(LongboxError::xml)?;
    Ok(())
}

/// Parse an existing ComicInfo document. Unknown elements are skipped, so
/// documents written by other tools still read.
pub fn read(bytes: &[u8]) -> Result<ComicInfo> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut info = ComicInfo::default();
    let mut buf = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                current = None;
            }
            Ok(Event::Text(e)) => {
                if let Some(tag) = current.as_deref() {
                    let text = e.unescape().map_err(LongboxError::xml)?.into_owned();
                    assign(&mut info, tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(LongboxError::xml(e)),
        }
        buf.clear();
    }

    Ok(info)
}

fn assign(info: &mut ComicInfo, tag: &str, text: String) {
    match tag {
        "Series" => info.series = text,
        "Number" => info.number = text,
        "Title" => info.title = Some(text),
        "Count" => info.count = text.trim().parse().ok(),
        "Year" => info.year = text.trim().parse().ok(),
        "Month" => info.month = text.trim().parse().ok(),
        "Day" => info.day = text.trim().parse().ok(),
        "CoverDate" => info.cover_date = Some(text),
        "Summary" => info.summary = Some(text),
        "Notes" => info.notes = Some(text),
        "Writer" => info.writer = Some(text),
        "Penciller" => info.penciller = Some(text),
        "Inker" => info.inker = Some(text),
        "Colorist" => info.colorist = Some(text),
        "Letterer" => info.letterer = Some(text),
        "CoverArtist" => info.cover_artist = Some(text),
        "Editor" => info.editor = Some(text),
        "Publisher" => info.publisher = Some(text),
        "Web" => info.web = Some(text),
        "PageCount" => info.page_count = text.trim().parse().ok(),
        "LanguageISO" => info.language_iso = Some(text),
        "Format" => info.format = Some(text),
        "SourceId" => info.source_id = Some(text),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ComicInfo {
        ComicInfo {
            series: "Batgirl".into(),
            number: "Annual 1".into(),
            title: Some("Old Enemies & New".into()),
            year: Some(2019),
            month: Some(6),
            summary: Some("Barbara is back <for real>.".into()),
            writer: Some("Jane Doe".into()),
            penciller: Some("John Roe".into()),
            language_iso: Some("en".into()),
            format: Some("Comic".into()),
            source_id: Some("912345".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let info = sample();
        let first = serialize(&info).unwrap();
        let second = serialize(&info).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialize_escapes_and_orders() {
        let xml = String::from_utf8(serialize(&sample()).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<Series>Batgirl</Series>"));
        assert!(xml.contains("<Number>Annual 1</Number>"));
        assert!(xml.contains("Old Enemies &amp; New"));
        assert!(xml.contains("Barbara is back &lt;for real&gt;."));

        // Series precedes Number precedes Year precedes Summary.
        let series = xml.find("<Series>").unwrap();
        let number = xml.find("<Number>").unwrap();
        let year = xml.find("<Year>").unwrap();
        let summary = xml.find("<Summary>").unwrap();
        assert!(series < number && number < year && year < summary);

        // Absent fields are omitted, not emitted empty.
        assert!(!xml.contains("<Inker>"));
        assert!(!xml.contains("<PageCount>"));
    }

    #[test]
    fn test_round_trip() {
        let info = sample();
        let bytes = serialize(&info).unwrap();
        let parsed = read(&bytes).unwrap();

        assert_eq!(parsed.series, info.series);
        assert_eq!(parsed.number, info.number);
        assert_eq!(parsed.title, info.title);
        assert_eq!(parsed.year, info.year);
        assert_eq!(parsed.summary, info.summary);
        assert_eq!(parsed.source_id, info.source_id);
    }

    #[test]
    fn test_read_skips_unknown_elements() {
        let xml = br#"<?xml version="1.0"?>
<ComicInfo>
  <Series>Batgirl</Series>
  <ScanInformation>scanner-x</ScanInformation>
  <Number>2</Number>
</ComicInfo>"#;
        let parsed = read(xml).unwrap();
        assert_eq!(parsed.series, "Batgirl");
        assert_eq!(parsed.number, "2");
    }

    #[test]
    fn test_read_malformed_is_error() {
        assert!(read(b"<ComicInfo><<<").is_err());
    }
}
