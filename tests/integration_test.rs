//! Integration Tests for xlsx2docx
//!
//! End-to-end tests that run the generator against spreadsheets built with
//! rust_xlsxwriter and hand-assembled template archives, then inspect the
//! produced DOCX archive.

use std::io::{Cursor, Read, Write};

use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use xlsx2docx::{GeneratorBuilder, XlsxToDocxError};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Generate a findings tracker with two data rows and severity fills
    pub fn generate_findings_xlsx() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        // Header row
        worksheet.write_string(0, 0, "Severity")?;
        worksheet.write_string(0, 1, "Finding")?;
        worksheet.write_string(0, 2, "Impact")?;
        worksheet.write_string(0, 3, "Proof of Concept")?;
        worksheet.write_string(0, 4, "Evidence")?;

        // Row 1: red severity fill, labeled steps
        let red = Format::new().set_background_color(Color::RGB(0xC00000));
        worksheet.write_string_with_format(1, 0, "High", &red)?;
        worksheet.write_string(1, 1, "SQL Injection")?;
        worksheet.write_string(1, 2, "Data exposure")?;
        worksheet.write_string(1, 3, "Step 1: send payload\nStep 2: observe response")?;
        worksheet.write_string(1, 4, "additional note")?;

        // Row 2: green severity fill, unlabeled description
        let green = Format::new().set_background_color(Color::RGB(0x00B050));
        worksheet.write_string_with_format(2, 0, "Low", &green)?;
        worksheet.write_string(2, 1, "Weak TLS Configuration")?;
        worksheet.write_string(2, 2, "Downgrade risk")?;
        worksheet.write_string(2, 3, "open the login page")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a tracker whose header row lacks the Severity column
    pub fn generate_xlsx_without_severity() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        worksheet.write_string(0, 0, "Finding")?;
        worksheet.write_string(0, 1, "Proof of Concept")?;
        worksheet.write_string(1, 0, "Something")?;
        worksheet.write_string(1, 1, "do a thing")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a tracker with an image reference in the Evidence column
    pub fn generate_xlsx_with_images(evidence: &str) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        worksheet.write_string(0, 0, "Severity")?;
        worksheet.write_string(0, 1, "Finding")?;
        worksheet.write_string(0, 2, "Impact")?;
        worksheet.write_string(0, 3, "Proof of Concept")?;
        worksheet.write_string(0, 4, "Evidence")?;

        let red = Format::new().set_background_color(Color::RGB(0xC00000));
        worksheet.write_string_with_format(1, 0, "High", &red)?;
        worksheet.write_string(1, 1, "XSS")?;
        worksheet.write_string(1, 2, "Session theft")?;
        worksheet.write_string(1, 3, "Step 1: inject script")?;
        worksheet.write_string(1, 4, evidence)?;

        Ok(workbook.save_to_buffer()?)
    }

    const DOCUMENT_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:body>"#,
        r#"<w:p><w:r><w:t>Report intro</w:t></w:r></w:p>"#,
        r#"<w:tbl><w:tblPr/>"#,
        r#"<w:tr><w:tc><w:p><w:r><w:t>Severity</w:t></w:r></w:p></w:tc>"#,
        r#"<w:tc><w:p><w:r><w:t>TEMPLATE_MARKER</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"<w:tr><w:tc><w:p><w:r><w:t>Finding</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"<w:tr><w:tc><w:p><w:r><w:t>Impact</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"<w:tr><w:tc><w:p><w:r><w:t>Proof of Concept</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"</w:tbl>"#,
        r#"<w:p><w:r><w:t>Appendix</w:t></w:r></w:p>"#,
        r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
        r#"<w:pgMar w:top="720" w:right="720" w:bottom="720" w:left="720" w:header="708" w:footer="708" w:gutter="0"/>"#,
        r#"</w:sectPr>"#,
        r#"</w:body></w:document>"#
    );

    const CONTENT_TYPES_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#
    );

    const ROOT_RELS_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
        r#"</Relationships>"#
    );

    const DOCUMENT_RELS_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        r#"</Relationships>"#
    );

    const CORE_XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
        r#"xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
        r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2020-01-01T00:00:00Z</dcterms:modified>"#,
        r#"</cp:coreProperties>"#
    );

    /// Assemble a minimal template DOCX archive
    pub fn generate_template_docx() -> Vec<u8> {
        generate_template_docx_with_document(DOCUMENT_XML)
    }

    pub fn generate_template_docx_with_document(document_xml: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(CONTENT_TYPES_XML.as_bytes()).unwrap();

        writer.start_file("_rels/.rels", options).unwrap();
        writer.write_all(ROOT_RELS_XML.as_bytes()).unwrap();

        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();

        writer
            .start_file("word/_rels/document.xml.rels", options)
            .unwrap();
        writer.write_all(DOCUMENT_RELS_XML.as_bytes()).unwrap();

        writer.start_file("docProps/core.xml", options).unwrap();
        writer.write_all(CORE_XML.as_bytes()).unwrap();

        writer.finish().unwrap().into_inner()
    }

    /// A template whose only table does not match any spreadsheet column
    pub fn generate_mismatched_template_docx() -> Vec<u8> {
        let document = DOCUMENT_XML
            .replace(">Severity<", ">Unrelated<")
            .replace(">Finding<", ">Other<")
            .replace(">Impact<", ">Rows<")
            .replace(">Proof of Concept<", ">Here<");
        generate_template_docx_with_document(&document)
    }
}

/// Read a named part out of a generated archive
fn read_part(archive_bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn part_names(archive_bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(archive_bytes.to_vec())).unwrap();
    archive.file_names().map(str::to_string).collect()
}

fn generate(xlsx: Vec<u8>, template: Vec<u8>) -> (xlsx2docx::GenerationSummary, Vec<u8>) {
    let generator = GeneratorBuilder::new().build().unwrap();
    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate_from_readers(Cursor::new(xlsx), Cursor::new(template), &mut output)
        .unwrap();
    (summary, output.into_inner())
}

#[test]
fn test_end_to_end_generation() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (summary, output) = generate(xlsx, template);

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.sections, 2);
    assert_eq!(summary.images_embedded, 0);
    assert_eq!(summary.images_skipped, 0);

    let document = read_part(&output, "word/document.xml");

    // One titled section per data row, each followed by a page break
    assert!(document.contains(">Table 1</w:t>"));
    assert!(document.contains(">Table 2</w:t>"));
    assert!(document.matches("<w:br w:type=\"page\"/>").count() >= 2);

    // Template content around the matched table is preserved verbatim
    assert!(document.contains("Report intro"));
    assert!(document.contains("Appendix"));
    assert!(document.contains("<w:sectPr>"));

    // The matched template table itself is replaced
    assert!(!document.contains("TEMPLATE_MARKER"));
}

#[test]
fn test_severity_fill_flows_into_shading() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let document = read_part(&output, "word/document.xml");

    // Raw severity fills for the first two rows of each section
    assert!(document.contains("w:fill=\"c00000\""));
    assert!(document.contains("w:fill=\"00b050\""));
    // Lightened variant for the third row (factor 0.4)
    assert!(document.contains("w:fill=\"d96666\""));
}

#[test]
fn test_field_rows_and_values() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let document = read_part(&output, "word/document.xml");

    // First two rows are value-only, later rows are labeled
    assert!(document.contains(">High</w:t>"));
    assert!(document.contains(">SQL Injection</w:t>"));
    assert!(document.contains(">Impact:</w:t>"));
    assert!(document.contains(">Data exposure</w:t>"));
    // The field name of the first two rows never appears as a label
    assert!(!document.contains(">Severity:</w:t>"));
    assert!(!document.contains(">Finding:</w:t>"));
}

#[test]
fn test_step_parsing_in_output() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let document = read_part(&output, "word/document.xml");

    assert!(document.contains(">Proof of Concept:</w:t>"));

    // Row 1 keeps its labels as written
    assert!(document.contains(">Step 1:</w:t>"));
    assert!(document.contains(">send payload</w:t>"));
    assert!(document.contains(">Step 2:</w:t>"));
    assert!(document.contains(">observe response</w:t>"));
    // The trailing unlabeled column continues the running counter
    assert!(document.contains(">Step3:</w:t>"));
    assert!(document.contains(">additional note</w:t>"));

    // Row 2 has no labels, so a single step is synthesized
    assert!(document.contains(">Step1:</w:t>"));
    assert!(document.contains(">open the login page</w:t>"));
}

#[test]
fn test_page_margins_rewritten_to_one_inch() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let document = read_part(&output, "word/document.xml");

    assert!(document.contains("w:top=\"1440\""));
    assert!(!document.contains("w:top=\"720\""));
    // The rest of the section properties are untouched
    assert!(document.contains("<w:pgSz w:w=\"12240\""));
}

#[test]
fn test_core_properties_refreshed() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let core = read_part(&output, "docProps/core.xml");
    assert!(!core.contains("2020-01-01T00:00:00Z"));
    assert!(core.contains("</dcterms:modified>"));
}

#[test]
fn test_missing_severity_column_is_an_error() {
    let xlsx = fixtures::generate_xlsx_without_severity().unwrap();
    let template = fixtures::generate_template_docx();

    let generator = GeneratorBuilder::new().build().unwrap();
    let result = generator.generate_from_readers(
        Cursor::new(xlsx),
        Cursor::new(template),
        Cursor::new(Vec::new()),
    );

    match result {
        Err(XlsxToDocxError::MissingColumn(column)) => assert_eq!(column, "Severity"),
        other => panic!("Expected MissingColumn error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_template_without_matching_table_is_an_error() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_mismatched_template_docx();

    let generator = GeneratorBuilder::new().build().unwrap();
    let result = generator.generate_from_readers(
        Cursor::new(xlsx),
        Cursor::new(template),
        Cursor::new(Vec::new()),
    );

    assert!(matches!(result, Err(XlsxToDocxError::TemplateMismatch(_))));
}

#[test]
fn test_image_embedding() {
    // Write a real PNG into a temporary image root
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("shot.png");
    let image = image::RgbImage::from_pixel(8, 4, image::Rgb([255u8, 0, 0]));
    image.save(&image_path).unwrap();

    let xlsx = fixtures::generate_xlsx_with_images("shot.png").unwrap();
    let template = fixtures::generate_template_docx();

    let generator = GeneratorBuilder::new()
        .with_image_root(dir.path())
        .build()
        .unwrap();
    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate_from_readers(Cursor::new(xlsx), Cursor::new(template), &mut output)
        .unwrap();
    let output = output.into_inner();

    assert_eq!(summary.images_embedded, 1);
    assert_eq!(summary.images_skipped, 0);

    // Media part, relationship, and content type are all wired up
    assert!(part_names(&output).contains(&"word/media/image1.png".to_string()));

    let rels = read_part(&output, "word/_rels/document.xml.rels");
    assert!(rels.contains("Target=\"media/image1.png\""));

    let content_types = read_part(&output, "[Content_Types].xml");
    assert!(content_types.contains("<Default Extension=\"png\" ContentType=\"image/png\"/>"));

    let document = read_part(&output, "word/document.xml");
    assert!(document.contains("r:embed=\"rId2\""));
    // 5.0 inch fixed width, aspect-scaled height (8x4 -> half the width)
    assert!(document.contains("cx=\"4572000\" cy=\"2286000\""));
}

#[test]
fn test_missing_image_is_skipped() {
    let dir = tempfile::tempdir().unwrap();

    let xlsx = fixtures::generate_xlsx_with_images("does_not_exist.png").unwrap();
    let template = fixtures::generate_template_docx();

    let generator = GeneratorBuilder::new()
        .with_image_root(dir.path())
        .build()
        .unwrap();
    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate_from_readers(Cursor::new(xlsx), Cursor::new(template), &mut output)
        .unwrap();

    assert_eq!(summary.images_embedded, 0);
    assert_eq!(summary.images_skipped, 1);

    // No media part or image relationship was added
    let output = output.into_inner();
    assert!(!part_names(&output).iter().any(|n| n.starts_with("word/media/")));
}

#[test]
fn test_folder_prefixed_image_reference_resolves_from_root() {
    // References written against an upload layout carry the staging folder
    // name ("path/<file>") and resolve against the image root as-is
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("path")).unwrap();
    let image = image::RgbImage::from_pixel(8, 4, image::Rgb([0u8, 0, 255]));
    image.save(dir.path().join("path").join("shot.png")).unwrap();

    let xlsx = fixtures::generate_xlsx_with_images("path/shot.png").unwrap();
    let template = fixtures::generate_template_docx();

    let generator = GeneratorBuilder::new()
        .with_image_root(dir.path())
        .build()
        .unwrap();
    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate_from_readers(Cursor::new(xlsx), Cursor::new(template), &mut output)
        .unwrap();

    assert_eq!(summary.images_embedded, 1);
    assert_eq!(summary.images_skipped, 0);
    assert!(part_names(&output.into_inner()).contains(&"word/media/image1.png".to_string()));
}

#[test]
fn test_mixed_image_list_embeds_existing_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("img")).unwrap();
    let image = image::RgbImage::from_pixel(8, 4, image::Rgb([0u8, 255, 0]));
    image.save(dir.path().join("img").join("a.png")).unwrap();

    let xlsx = fixtures::generate_xlsx_with_images("img/a.png, img/missing.png").unwrap();
    let template = fixtures::generate_template_docx();

    let generator = GeneratorBuilder::new()
        .with_image_root(dir.path())
        .build()
        .unwrap();
    let mut output = Cursor::new(Vec::new());
    let summary = generator
        .generate_from_readers(Cursor::new(xlsx), Cursor::new(template), &mut output)
        .unwrap();
    let output = output.into_inner();

    // The existing reference is embedded, the missing one is skipped
    assert_eq!(summary.images_embedded, 1);
    assert_eq!(summary.images_skipped, 1);

    let media_parts = part_names(&output)
        .iter()
        .filter(|n| n.starts_with("word/media/"))
        .count();
    assert_eq!(media_parts, 1);
}

#[test]
fn test_generation_is_deterministic() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();

    let (_, first) = generate(xlsx.clone(), template.clone());
    let (_, second) = generate(xlsx, template);

    // The document body is byte-identical across runs (only the modified
    // timestamp in docProps/core.xml may differ)
    assert_eq!(
        read_part(&first, "word/document.xml"),
        read_part(&second, "word/document.xml")
    );
}

#[test]
fn test_output_is_a_valid_archive_with_all_parts() {
    let xlsx = fixtures::generate_findings_xlsx().unwrap();
    let template = fixtures::generate_template_docx();
    let (_, output) = generate(xlsx, template);

    let names = part_names(&output);
    assert!(names.contains(&"[Content_Types].xml".to_string()));
    assert!(names.contains(&"_rels/.rels".to_string()));
    assert!(names.contains(&"word/document.xml".to_string()));
    assert!(names.contains(&"word/_rels/document.xml.rels".to_string()));
    assert!(names.contains(&"docProps/core.xml".to_string()));
}
