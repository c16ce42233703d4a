//! Writer Module
//!
//! 出力DOCXアーカイブの組み立て。
//!
//! テンプレートの全パートを出現順にコピーし、次のパートのみ書き換えます。
//!
//! - `word/document.xml`: 分割済み本文 + 生成セクション
//! - `word/_rels/document.xml.rels`: 埋め込み画像のリレーションシップを追加
//! - `[Content_Types].xml`: 画像拡張子のDefault宣言を追加
//! - `docProps/core.xml`: 更新日時を刷新
//!
//! 埋め込み画像は`word/media/`以下へ新規パートとして追加します。

use chrono::Utc;
use std::collections::HashSet;
use std::io::{Seek, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::docx::model::Section;
use crate::docx::template::DocxTemplate;
use crate::docx::wml::{render_section, uniform_page_margins, EmbeddedImage, ImageAllocator};
use crate::error::XlsxToDocxError;

const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// 書き込み結果
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteOutcome {
    /// 埋め込んだ画像数
    pub images_embedded: usize,
}

/// 出力DOCXを書き込む
///
/// # 引数
///
/// * `writer` - 出力先（Write + Seekトレイトを実装）
/// * `template` - 分割済みテンプレート
/// * `sections` - 生成するセクションのリスト
///
/// # 戻り値
///
/// * `Ok(WriteOutcome)` - 書き込みに成功した場合
/// * `Err(XlsxToDocxError)` - 書き込みまたは画像読み込みに失敗した場合
pub(crate) fn write_document<W: Write + Seek>(
    writer: W,
    template: &DocxTemplate,
    sections: &[Section],
) -> Result<WriteOutcome, XlsxToDocxError> {
    // 1. セクションをレンダリングし、画像IDを割り当てる
    let mut alloc = ImageAllocator::new(
        template.next_relationship_id(),
        template.next_image_number(),
    );
    let mut rendered = String::new();
    for section in sections {
        rendered.push_str(&render_section(section, &mut alloc));
    }

    // 2. word/document.xml を組み立てる
    let body = &template.body;
    let mut document_xml = Vec::new();
    document_xml.extend_from_slice(&body.prefix);
    document_xml.extend_from_slice(&body.leading);
    document_xml.extend_from_slice(rendered.as_bytes());
    document_xml.extend_from_slice(&rewrite_page_margins(&body.trailing)?);
    document_xml.extend_from_slice(&body.suffix);

    // 3. パートを書き込む
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default();
    let mut wrote_rels = false;

    for (name, content) in &template.parts {
        let new_content: Vec<u8> = match name.as_str() {
            "word/document.xml" => document_xml.clone(),
            "word/_rels/document.xml.rels" => {
                wrote_rels = true;
                splice_relationships(content, &alloc.images)?
            }
            "[Content_Types].xml" => {
                let extensions: HashSet<String> =
                    alloc.images.iter().map(|i| i.extension.clone()).collect();
                ensure_content_type_defaults(content, &extensions)?
            }
            "docProps/core.xml" => refresh_core_modified(content)?,
            _ => content.clone(),
        };

        zip.start_file(name, options)
            .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;
        zip.write_all(&new_content)?;
    }

    // テンプレートがリレーションシップパートを持たない場合は新規作成する
    if !wrote_rels && !alloc.images.is_empty() {
        let fresh = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"</Relationships>"#
        );
        let content = splice_relationships(fresh.as_bytes(), &alloc.images)?;
        zip.start_file("word/_rels/document.xml.rels", options)
            .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;
        zip.write_all(&content)?;
    }

    // 4. 画像パートを追加する
    for image in &alloc.images {
        let bytes = std::fs::read(&image.path).map_err(|e| {
            XlsxToDocxError::Image(format!(
                "failed to read image '{}': {}",
                image.path.display(),
                e
            ))
        })?;
        zip.start_file(format!("word/{}", image.part_name), options)
            .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;
        zip.write_all(&bytes)?;
    }

    zip.finish()
        .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

    Ok(WriteOutcome {
        images_embedded: alloc.images.len(),
    })
}

/// 既存の`w:pgMar`要素を1インチ余白へ書き換える
///
/// `w:pgMar`が存在しない場合（sectPrを持たないテンプレートなど）は
/// 何もしません。
fn rewrite_page_margins(trailing: &[u8]) -> Result<Vec<u8>, XlsxToDocxError> {
    let text = std::str::from_utf8(trailing)?;
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<w:pgMar") {
        let after_start = &rest[start..];
        let end = match after_start.find("/>") {
            Some(end) => end + 2,
            None => break,
        };
        result.push_str(&rest[..start]);
        result.push_str(&uniform_page_margins());
        rest = &after_start[end..];
    }
    result.push_str(rest);

    Ok(result.into_bytes())
}

/// 画像のリレーションシップを`</Relationships>`の直前へ追加する
fn splice_relationships(
    rels: &[u8],
    images: &[EmbeddedImage],
) -> Result<Vec<u8>, XlsxToDocxError> {
    if images.is_empty() {
        return Ok(rels.to_vec());
    }

    let text = std::str::from_utf8(rels)?;
    let closing = text.rfind("</Relationships>").ok_or_else(|| {
        XlsxToDocxError::Xml("relationships part has no closing element".to_string())
    })?;

    let mut result = String::with_capacity(text.len() + images.len() * 96);
    result.push_str(&text[..closing]);
    for image in images {
        result.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
            image.rid, IMAGE_RELATIONSHIP_TYPE, image.part_name
        ));
    }
    result.push_str(&text[closing..]);

    Ok(result.into_bytes())
}

/// 画像拡張子のDefault宣言を`[Content_Types].xml`へ追加する
///
/// 既に同じ拡張子の宣言がある場合は追加しません。
fn ensure_content_type_defaults(
    content_types: &[u8],
    extensions: &HashSet<String>,
) -> Result<Vec<u8>, XlsxToDocxError> {
    if extensions.is_empty() {
        return Ok(content_types.to_vec());
    }

    let text = std::str::from_utf8(content_types)?;
    let closing = text.rfind("</Types>").ok_or_else(|| {
        XlsxToDocxError::Xml("[Content_Types].xml has no closing element".to_string())
    })?;

    let mut additions = String::new();
    let mut sorted: Vec<&String> = extensions.iter().collect();
    sorted.sort();
    for extension in sorted {
        if text.contains(&format!("Extension=\"{}\"", extension)) {
            continue;
        }
        let mime = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            other => {
                return Err(XlsxToDocxError::Image(format!(
                    "unsupported image extension: {}",
                    other
                )))
            }
        };
        additions.push_str(&format!(
            "<Default Extension=\"{}\" ContentType=\"{}\"/>",
            extension, mime
        ));
    }

    let mut result = String::with_capacity(text.len() + additions.len());
    result.push_str(&text[..closing]);
    result.push_str(&additions);
    result.push_str(&text[closing..]);

    Ok(result.into_bytes())
}

/// `docProps/core.xml`の更新日時を現在時刻へ刷新する
///
/// `dcterms:modified`要素が無い場合は何もしません。
fn refresh_core_modified(core: &[u8]) -> Result<Vec<u8>, XlsxToDocxError> {
    let text = std::str::from_utf8(core)?;

    let open_start = match text.find("<dcterms:modified") {
        Some(pos) => pos,
        None => return Ok(core.to_vec()),
    };
    let content_start = match text[open_start..].find('>') {
        Some(pos) => open_start + pos + 1,
        None => return Ok(core.to_vec()),
    };
    let content_end = match text[content_start..].find("</dcterms:modified>") {
        Some(pos) => content_start + pos,
        None => return Ok(core.to_vec()),
    };

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..content_start]);
    result.push_str(&now);
    result.push_str(&text[content_end..]);

    Ok(result.into_bytes())
}
