//! Template Module
//!
//! テンプレートDOCXの読み込みと本文の分割。
//!
//! `word/document.xml`の本文をバイトオフセットで分割し、一致したテーブルの
//! 前後のコンテンツを無変更のまま保持します。生成セクションは一致テーブルの
//! 位置に挿入され、テーブル自体は捨てられます。

use std::collections::HashSet;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxToDocxError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::normalize_name;

/// 本文の分割結果
///
/// `prefix + leading + (生成セクション) + trailing + suffix`の連結が
/// 出力の`word/document.xml`になります。
#[derive(Debug, Clone)]
pub(crate) struct TemplateBody {
    /// ファイル先頭から`<w:body>`開始タグまで
    pub prefix: Vec<u8>,
    /// 一致テーブルより前の本文要素
    pub leading: Vec<u8>,
    /// 一致テーブルより後の本文要素（`w:sectPr`を含む）
    pub trailing: Vec<u8>,
    /// `</w:body>`からファイル末尾まで
    pub suffix: Vec<u8>,
    /// 一致テーブルの各行の1列目テキスト（トリム済み、元の表記を保持）
    pub row_headers: Vec<String>,
}

/// テンプレートDOCX
#[derive(Debug, Clone)]
pub(crate) struct DocxTemplate {
    /// アーカイブ内の全パート（出現順）
    pub parts: Vec<(String, Vec<u8>)>,
    pub body: TemplateBody,
}

/// 本文の最上位要素1つ分のスキャン結果
struct BodyChild {
    start: usize,
    end: usize,
    is_table: bool,
    first_col_texts: Vec<String>,
}

impl DocxTemplate {
    /// リーダーからテンプレートを読み込み、本文を分割する
    ///
    /// # 引数
    ///
    /// * `reader` - DOCXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    /// * `sheet_headers` - スプレッドシートの列名（テーブル照合に使用）
    ///
    /// # 戻り値
    ///
    /// * `Ok(DocxTemplate)` - 読み込みと照合に成功した場合
    /// * `Err(XlsxToDocxError::TemplateMismatch)` - 一致するテーブルが無い場合
    pub fn from_reader<R: Read + Seek>(
        reader: R,
        sheet_headers: &[String],
    ) -> Result<Self, XlsxToDocxError> {
        let security_config = SecurityConfig::default();

        let mut archive =
            ZipArchive::new(reader).map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security_config.max_file_count {
            return Err(XlsxToDocxError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security_config.max_file_count
            )));
        }

        // 全パートを出現順に読み込む（パス検証とサイズチェックを兼ねる）
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

            let file_name = file.name().to_string();
            validate_zip_path(&file_name).map_err(|e| {
                XlsxToDocxError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > security_config.max_file_size {
                return Err(XlsxToDocxError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, security_config.max_file_size
                )));
            }

            total_decompressed_size =
                total_decompressed_size
                    .checked_add(file_size)
                    .ok_or_else(|| {
                        XlsxToDocxError::SecurityViolation(
                            "Total decompressed size calculation overflow".to_string(),
                        )
                    })?;
            if total_decompressed_size > security_config.max_decompressed_size {
                return Err(XlsxToDocxError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, security_config.max_decompressed_size
                )));
            }

            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            parts.push((file_name, content));
        }

        let document_xml = parts
            .iter()
            .find(|(name, _)| name == "word/document.xml")
            .map(|(_, content)| content.clone())
            .ok_or_else(|| {
                XlsxToDocxError::TemplateMismatch(
                    "template archive has no word/document.xml".to_string(),
                )
            })?;

        let body = Self::split_body(&document_xml, sheet_headers)?;

        Ok(Self { parts, body })
    }

    /// パート内容を名前で取得
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part_name, _)| part_name == name)
            .map(|(_, content)| content.as_slice())
    }

    /// 次に使用可能なリレーションシップID番号
    ///
    /// `word/_rels/document.xml.rels`の既存`rIdN`の最大値 + 1を返します。
    pub fn next_relationship_id(&self) -> u32 {
        let mut max_id = 0u32;

        if let Some(rels) = self.part("word/_rels/document.xml.rels") {
            use quick_xml::events::Event;
            use quick_xml::Reader;

            let mut reader = Reader::from_reader(rels);
            let mut buf = Vec::new();

            loop {
                match reader.read_event_into(&mut buf) {
                    Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                        if e.name().as_ref() == b"Relationship" {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"Id" {
                                    if let Ok(id_str) = std::str::from_utf8(&attr.value) {
                                        if let Some(num) = id_str.strip_prefix("rId") {
                                            if let Ok(num) = num.parse::<u32>() {
                                                max_id = max_id.max(num);
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Ok(Event::Eof) | Err(_) => break,
                    _ => {}
                }
            }
        }

        max_id + 1
    }

    /// 次に使用可能なメディア画像番号
    ///
    /// `word/media/imageN.*`の既存Nの最大値 + 1を返します。
    pub fn next_image_number(&self) -> u32 {
        let mut max_num = 0u32;
        for (name, _) in &self.parts {
            if let Some(rest) = name.strip_prefix("word/media/image") {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(num) = digits.parse::<u32>() {
                    max_num = max_num.max(num);
                }
            }
        }
        max_num + 1
    }

    /// `word/document.xml`の本文を分割（プライベート）
    ///
    /// 本文の最上位要素をバイトオフセットで走査し、1列目の先頭セルテキストが
    /// スプレッドシートの列名と一致する最初のテーブルを探します。
    fn split_body(
        document_xml: &[u8],
        sheet_headers: &[String],
    ) -> Result<TemplateBody, XlsxToDocxError> {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(document_xml);
        // バイトオフセットを正確に保つため、テキストのトリムは行わない

        let mut buf = Vec::new();
        let mut in_body = false;
        let mut prefix_end: usize = 0;
        let mut body_end_start: usize = document_xml.len();

        let mut children: Vec<BodyChild> = Vec::new();
        let mut depth: usize = 0;
        let mut child_start: usize = 0;
        let mut child_is_table = false;

        // テーブル走査用の状態
        let mut tbl_nesting: usize = 0;
        let mut row_texts: Vec<String> = Vec::new();
        let mut cell_index: i32 = -1;
        let mut in_t = false;

        loop {
            let pos_before = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    let name = name.as_ref();

                    if !in_body {
                        if name == b"w:body" {
                            in_body = true;
                            prefix_end = reader.buffer_position();
                        }
                    } else if depth == 0 {
                        // 本文の最上位要素の開始
                        child_start = pos_before;
                        child_is_table = name == b"w:tbl";
                        depth = 1;
                        if child_is_table {
                            tbl_nesting = 1;
                            row_texts.clear();
                        }
                    } else {
                        depth += 1;
                        if child_is_table {
                            match name {
                                b"w:tbl" => tbl_nesting += 1,
                                b"w:tr" if tbl_nesting == 1 => {
                                    row_texts.push(String::new());
                                    cell_index = -1;
                                }
                                b"w:tc" if tbl_nesting == 1 => {
                                    cell_index += 1;
                                }
                                b"w:t" if tbl_nesting == 1 && cell_index == 0 => {
                                    in_t = true;
                                }
                                _ => {}
                            }
                        }
                    }
                }
                Ok(Event::Empty(_)) => {
                    if in_body && depth == 0 {
                        // 自己終了タグの最上位要素（例: <w:p/>）
                        children.push(BodyChild {
                            start: pos_before,
                            end: reader.buffer_position(),
                            is_table: false,
                            first_col_texts: Vec::new(),
                        });
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_t {
                        if let Some(row) = row_texts.last_mut() {
                            let text = e.unescape().map_err(|e| {
                                XlsxToDocxError::Xml(format!("XML text error: {}", e))
                            })?;
                            row.push_str(&text);
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.name();
                    let name = name.as_ref();

                    if in_body && depth == 0 && name == b"w:body" {
                        body_end_start = pos_before;
                        break;
                    }

                    if in_body && depth > 0 {
                        if child_is_table {
                            match name {
                                b"w:tbl" => tbl_nesting = tbl_nesting.saturating_sub(1),
                                b"w:t" => in_t = false,
                                _ => {}
                            }
                        }
                        depth -= 1;
                        if depth == 0 {
                            // 最上位要素の終了
                            let texts = if child_is_table {
                                row_texts
                                    .iter()
                                    .map(|t| t.trim().to_string())
                                    .collect()
                            } else {
                                Vec::new()
                            };
                            children.push(BodyChild {
                                start: child_start,
                                end: reader.buffer_position(),
                                is_table: child_is_table,
                                first_col_texts: texts,
                            });
                            child_is_table = false;
                            tbl_nesting = 0;
                            in_t = false;
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxToDocxError::Xml(format!("XML parse error: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        if !in_body {
            return Err(XlsxToDocxError::TemplateMismatch(
                "word/document.xml has no w:body element".to_string(),
            ));
        }

        // 左上セルのテキストがスプレッドシートの列名と一致する最初のテーブルを探す
        let header_set: HashSet<String> =
            sheet_headers.iter().map(|h| normalize_name(h)).collect();
        let matched = children
            .iter()
            .find(|child| {
                child.is_table
                    && child
                        .first_col_texts
                        .first()
                        .map(|t| header_set.contains(&normalize_name(t)))
                        .unwrap_or(false)
            })
            .ok_or_else(|| {
                XlsxToDocxError::TemplateMismatch(
                    "no table in the template matches any spreadsheet column".to_string(),
                )
            })?;

        Ok(TemplateBody {
            prefix: document_xml[..prefix_end].to_vec(),
            leading: document_xml[prefix_end..matched.start].to_vec(),
            trailing: document_xml[matched.end..body_end_start].to_vec(),
            suffix: document_xml[body_end_start..].to_vec(),
            row_headers: matched.first_col_texts.clone(),
        })
    }
}
