//! Workbook Parser Module
//!
//! calamineを使用した値パスの実装。
//! 最初のワークシートからヘッダー行とデータ行を抽出します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::{Cursor, Read, Seek};

use crate::error::XlsxToDocxError;
use crate::security::SecurityConfig;
use crate::types::{normalize_name, FindingRow};

/// 検出事項シート
///
/// スプレッドシートの最初のワークシートを、ヘッダー行 + データ行として
/// 解釈した結果です。必須列（`Severity` / `Proof of Concept`）のインデックスは
/// 構築時に解決されます。
#[derive(Debug, Clone)]
pub(crate) struct FindingsSheet {
    /// ヘッダー行の列名（トリム済み、元の表記を保持）
    pub headers: Vec<String>,
    /// データ行（ヘッダー行を除く）
    pub rows: Vec<FindingRow>,
    /// ワークシート内でのデータ範囲の開始行（0始まりの絶対行番号）
    ///
    /// calamineの`Range`は先頭の空行を含まないため、書式パスの
    /// `(行, 列)`座標と突き合わせる際のオフセットとして使用します。
    pub start_row: u32,
    /// ワークシート内でのデータ範囲の開始列（0始まりの絶対列番号）
    pub start_col: u32,
    /// `Severity`列のインデックス
    pub severity_col: usize,
    /// `Proof of Concept`列のインデックス。これ以降が末尾列です。
    pub poc_col: usize,
}

impl FindingsSheet {
    /// リーダーからシートを読み込む
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(FindingsSheet)` - 読み込みに成功した場合
    /// * `Err(XlsxToDocxError)` - 形式不正、シートが空、必須列が無い場合
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self, XlsxToDocxError> {
        // セキュリティチェック: 入力ファイルサイズの上限
        let security_config = SecurityConfig::default();

        let mut buffer = Vec::new();
        let bytes_read = reader.read_to_end(&mut buffer)?;

        if bytes_read as u64 > security_config.max_input_file_size {
            return Err(XlsxToDocxError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                bytes_read, security_config.max_input_file_size
            )));
        }

        // calamineでワークブックを開く
        let sheets =
            open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(XlsxToDocxError::Parse)?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxToDocxError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        // 最初のワークシートを使用する
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| XlsxToDocxError::Config("Workbook contains no sheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| XlsxToDocxError::Parse(e.into()))?;

        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        let mut row_iter = range.rows();

        // 1. ヘッダー行の抽出
        let headers: Vec<String> = row_iter
            .next()
            .ok_or_else(|| {
                XlsxToDocxError::Config(format!("Sheet '{}' has no header row", sheet_name))
            })?
            .iter()
            .map(|cell| Self::format_cell(cell).trim().to_string())
            .collect();

        // 2. 必須列の解決（大文字小文字と前後空白を無視）
        let severity_col = Self::find_column(&headers, "severity")
            .ok_or_else(|| XlsxToDocxError::MissingColumn("Severity".to_string()))?;
        let poc_col = Self::find_column(&headers, "proof of concept")
            .ok_or_else(|| XlsxToDocxError::MissingColumn("Proof of Concept".to_string()))?;

        // 3. データ行の抽出
        let rows: Vec<FindingRow> = row_iter
            .enumerate()
            .map(|(index, row)| FindingRow {
                index,
                values: row.iter().map(Self::format_cell).collect(),
            })
            .collect();

        Ok(Self {
            headers,
            rows,
            start_row,
            start_col,
            severity_col,
            poc_col,
        })
    }

    /// データ行インデックスからワークシート上の絶対行番号（0始まり）を計算
    ///
    /// データ範囲の開始行 + ヘッダー行1行分 + データ行インデックス。
    pub fn absolute_row(&self, data_index: usize) -> u32 {
        self.start_row + 1 + data_index as u32
    }

    /// シート列インデックスからワークシート上の絶対列番号（0始まり）を計算
    pub fn absolute_col(&self, col_index: usize) -> u32 {
        self.start_col + col_index as u32
    }

    /// 列名から列インデックスを検索
    ///
    /// # 引数
    ///
    /// * `headers` - ヘッダー行の列名リスト
    /// * `name` - 検索する列名（正規化済みであること）
    fn find_column(headers: &[String], name: &str) -> Option<usize> {
        headers.iter().position(|h| normalize_name(h) == name)
    }

    /// セル値を表示用文字列へ変換
    ///
    /// 小数部を持たない浮動小数点数は整数として表記します
    /// （`1.0` -> `"1"`）。空セルとエラーセルは空文字列になります。
    fn format_cell(cell: &Data) -> String {
        match cell {
            Data::Int(i) => i.to_string(),
            Data::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Data::String(s) => s.clone(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(dt) => dt.as_f64().to_string(),
            Data::Empty => String::new(),
            Data::Error(_) => String::new(),
            _ => String::new(),
        }
    }
}


// ファイル全体の読み込みは統合テスト（tests/）で実際のXLSXを使用して検証します。
