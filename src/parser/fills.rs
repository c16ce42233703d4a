//! Fill Parser Module
//!
//! XLSXアーカイブ内のXMLから、calamineで取得不可能なセル塗りつぶし色を
//! 抽出するモジュール。重大度セルの背景色の取得に使用します。
//!
//! 解析対象:
//!
//! - `xl/styles.xml`: `<fills>`（fillId -> 色）と`<cellXfs>`（styleId -> fillId）
//! - `xl/worksheets/sheet*.xml`: セルの`s`属性（セル座標 -> styleId）

use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::color::RgbColor;
use crate::error::XlsxToDocxError;
use crate::security::{validate_zip_path, SecurityConfig};

/// セル塗りつぶし色パーサー
///
/// 最初のワークシートについて、セル座標から塗りつぶし色への対応を保持します。
/// 塗りつぶしの無いセル（fillId 0/1のデフォルトfillを含む）は対応を持ちません。
#[derive(Debug, Clone)]
pub(crate) struct SeverityFillParser {
    /// (絶対行, 列) -> 塗りつぶし色（0始まり）
    cell_fills: HashMap<(u32, u32), RgbColor>,
}

impl SeverityFillParser {
    /// XLSXファイル（ZIPアーカイブ）から塗りつぶし情報を解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(SeverityFillParser)` - 解析に成功した場合
    /// * `Err(XlsxToDocxError)` - アーカイブ不正、またはセキュリティ制限違反の場合
    pub fn new<R: Read + Seek>(xlsx_reader: R) -> Result<Self, XlsxToDocxError> {
        let security_config = SecurityConfig::default();

        let mut archive =
            ZipArchive::new(xlsx_reader).map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security_config.max_file_count {
            return Err(XlsxToDocxError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security_config.max_file_count
            )));
        }

        // セキュリティチェック: 各ファイルのパス検証とサイズチェック
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

            // パストラバーサル対策
            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                XlsxToDocxError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            // ファイルサイズチェック
            let file_size = file.size();
            if file_size > security_config.max_file_size {
                return Err(XlsxToDocxError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, security_config.max_file_size
                )));
            }

            // 展開後のサイズ累計をチェック
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
        }

        // 1. xl/styles.xml を解析（fillId -> 色、styleId -> fillId）
        let (fill_colors, xf_fill_ids) = Self::parse_styles(&mut archive)?;

        // 2. 最初のワークシートを解析（セル座標 -> styleId -> 色）
        let cell_fills =
            Self::parse_first_worksheet(&mut archive, &fill_colors, &xf_fill_ids)?;

        Ok(Self { cell_fills })
    }

    /// テスト用: セル座標 -> 色の対応から直接構築
    #[cfg(test)]
    pub(crate) fn from_cells(cell_fills: HashMap<(u32, u32), RgbColor>) -> Self {
        Self { cell_fills }
    }

    /// セルの塗りつぶし色を取得
    ///
    /// # 引数
    ///
    /// * `row` - 絶対行番号（0始まり）
    /// * `col` - 列番号（0始まり）
    ///
    /// # 戻り値
    ///
    /// * `Some(RgbColor)` - セルに塗りつぶし色がある場合
    /// * `None` - 塗りつぶしが無い、またはセルが存在しない場合
    pub fn fill_color(&self, row: u32, col: u32) -> Option<RgbColor> {
        self.cell_fills.get(&(row, col)).copied()
    }

    /// xl/styles.xml の解析（プライベート）
    ///
    /// `<fills>`と`<cellXfs>`を解析し、fillId -> 色 と styleId -> fillId の
    /// マッピングを構築します。
    #[allow(clippy::type_complexity)]
    fn parse_styles<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(Vec<Option<RgbColor>>, Vec<u32>), XlsxToDocxError> {
        let mut fill_colors: Vec<Option<RgbColor>> = Vec::new();
        let mut xf_fill_ids: Vec<u32> = Vec::new();

        // xl/styles.xml を開く（パストラバーサル対策済み）
        let mut styles_file = match archive.by_name("xl/styles.xml") {
            Ok(file) => file,
            Err(_) => {
                // styles.xmlが存在しない場合は空の結果を返す
                return Ok((fill_colors, xf_fill_ids));
            }
        };

        // ZIPファイルの内容を一度メモリに読み込む
        let mut xml_content = Vec::new();
        styles_file.read_to_end(&mut xml_content)?;

        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut in_fills = false;
        let mut in_fill = false;
        let mut in_cell_xfs = false;
        let mut current_fill_color: Option<RgbColor> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"fills" => {
                        in_fills = true;
                    }
                    b"fill" if in_fills => {
                        in_fill = true;
                        current_fill_color = None;
                    }
                    b"fgColor" if in_fill => {
                        current_fill_color = Self::fg_color_attr(&e)?;
                    }
                    b"cellXfs" => {
                        in_cell_xfs = true;
                    }
                    b"xf" if in_cell_xfs => {
                        xf_fill_ids.push(Self::xf_fill_id(&e)?);
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    // 自己終了の<fill/>もfillIdを1つ消費する
                    b"fill" if in_fills => {
                        fill_colors.push(None);
                    }
                    b"fgColor" if in_fill => {
                        current_fill_color = Self::fg_color_attr(&e)?;
                    }
                    b"xf" if in_cell_xfs => {
                        xf_fill_ids.push(Self::xf_fill_id(&e)?);
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"fills" => {
                        in_fills = false;
                    }
                    b"fill" if in_fill => {
                        fill_colors.push(current_fill_color.take());
                        in_fill = false;
                    }
                    b"cellXfs" => {
                        in_cell_xfs = false;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxToDocxError::Xml(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok((fill_colors, xf_fill_ids))
    }

    /// `<fgColor rgb="AARRGGBB"/>`のrgb属性を解析（プライベート）
    fn fg_color_attr(
        e: &quick_xml::events::BytesStart,
    ) -> Result<Option<RgbColor>, XlsxToDocxError> {
        for attr in e.attributes() {
            let attr = attr
                .map_err(|e| XlsxToDocxError::Xml(format!("XML attribute error: {}", e)))?;
            if attr.key.as_ref() == b"rgb" {
                let rgb_str = std::str::from_utf8(&attr.value)?;
                return Ok(RgbColor::parse(rgb_str));
            }
        }
        Ok(None)
    }

    /// `<xf fillId="..."/>`のfillId属性を解析（省略時は0、プライベート）
    fn xf_fill_id(e: &quick_xml::events::BytesStart) -> Result<u32, XlsxToDocxError> {
        for attr in e.attributes() {
            let attr = attr
                .map_err(|e| XlsxToDocxError::Xml(format!("XML attribute error: {}", e)))?;
            if attr.key.as_ref() == b"fillId" {
                let id_str = std::str::from_utf8(&attr.value)?;
                return Ok(id_str.parse()?);
            }
        }
        Ok(0)
    }

    /// 最初のワークシートXMLの解析（プライベート）
    ///
    /// セルの`s`属性（styleId）を塗りつぶし色へ解決し、
    /// セル座標 -> 色のマッピングを構築します。
    fn parse_first_worksheet<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        fill_colors: &[Option<RgbColor>],
        xf_fill_ids: &[u32],
    ) -> Result<HashMap<(u32, u32), RgbColor>, XlsxToDocxError> {
        let mut cell_fills = HashMap::new();

        // ワークシートXMLファイルを検索し、番号が最小のものを選ぶ
        let mut sheet_files: Vec<String> = Vec::new();
        for i in 0..archive.len() {
            let file_name = archive
                .by_index(i)
                .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?
                .name()
                .to_string();
            if file_name.starts_with("xl/worksheets/sheet") && file_name.ends_with(".xml") {
                sheet_files.push(file_name);
            }
        }
        sheet_files.sort();

        let first_sheet = match sheet_files.first() {
            Some(name) => name.clone(),
            None => return Ok(cell_fills),
        };

        let mut sheet_file = archive
            .by_name(&first_sheet)
            .map_err(|e| XlsxToDocxError::Zip(format!("{}", e)))?;

        let mut xml_content = Vec::new();
        sheet_file.read_to_end(&mut xml_content)?;

        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    // <c r="A2" s="1" t="s"> - 空セルは自己終了タグの場合がある
                    if e.name().as_ref() == b"c" {
                        let mut coord: Option<(u32, u32)> = None;
                        let mut style_id: Option<u32> = None;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                XlsxToDocxError::Xml(format!("XML attribute error: {}", e))
                            })?;
                            match attr.key.as_ref() {
                                b"r" => {
                                    let ref_str = std::str::from_utf8(&attr.value)?;
                                    coord = Self::parse_cell_ref(ref_str);
                                }
                                b"s" => {
                                    let s_str = std::str::from_utf8(&attr.value)?;
                                    style_id = Some(s_str.parse()?);
                                }
                                _ => {}
                            }
                        }

                        // styleId -> fillId -> 色 の解決
                        if let (Some(coord), Some(style_id)) = (coord, style_id) {
                            let color = xf_fill_ids
                                .get(style_id as usize)
                                .and_then(|&fill_id| fill_colors.get(fill_id as usize))
                                .and_then(|c| *c);
                            if let Some(color) = color {
                                cell_fills.insert(coord, color);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxToDocxError::Xml(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok(cell_fills)
    }

    /// セル参照文字列を座標に変換（例: "A1" -> (0, 0)）
    fn parse_cell_ref(ref_str: &str) -> Option<(u32, u32)> {
        let mut col_str = String::new();
        let mut row_str = String::new();

        for ch in ref_str.chars() {
            if ch.is_ascii_alphabetic() {
                col_str.push(ch.to_ascii_uppercase());
            } else if ch.is_ascii_digit() {
                row_str.push(ch);
            }
        }

        if col_str.is_empty() || row_str.is_empty() {
            return None;
        }

        // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
        let col = col_str
            .chars()
            .rev()
            .enumerate()
            .map(|(i, ch)| {
                let val = (ch as u32) - ('A' as u32) + 1;
                val * 26_u32.pow(i as u32)
            })
            .sum::<u32>()
            - 1;

        // 行を数値に変換（1始まりなので0始まりに変換）
        let row = row_str.parse::<u32>().ok()? - 1;

        Some((row, col))
    }
}
