//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsx2docxクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、テンプレート解析、ドキュメント生成中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗など）
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Config`: 設定の検証に失敗したエラー
/// - `MissingColumn`: 必須列（Severity / Proof of Concept）が見つからないエラー
/// - `TemplateMismatch`: テンプレート内に一致するテーブルが存在しないエラー
#[derive(Error, Debug)]
pub enum XlsxToDocxError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// calamineクレートがExcelファイルを解析する際に発生したエラーです。
    /// ファイル形式が不正、破損したファイル、サポートされていない形式などが
    /// 原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    ///
    /// XML解析時にUTF-8文字列への変換に失敗した場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    ///
    /// XLSX/DOCXファイル（ZIPアーカイブ）の処理中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// WordprocessingML / SpreadsheetMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `GeneratorBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// スプレッドシートに必須列が存在しないエラー
    ///
    /// `Severity`列または`Proof of Concept`列がヘッダー行に見つからない場合に
    /// 発生します。列名の照合は大文字小文字を区別せず、前後の空白を無視します。
    #[error("Required column '{0}' not found in the spreadsheet header")]
    MissingColumn(String),

    /// テンプレート内に一致するテーブルが存在しないエラー
    ///
    /// テンプレートDOCXのどのテーブルも、左上セルのテキストがスプレッドシートの
    /// 列名と一致しない場合に発生します。
    #[error("Template mismatch: {0}")]
    TemplateMismatch(String),

    /// 画像ファイルの処理エラー
    ///
    /// 埋め込み対象の画像の寸法取得に失敗した場合などに発生します。
    /// 個々の画像のスキップには使用されません（スキップはログ通知のみ）。
    #[error("Image error: {0}")]
    Image(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    // Ioエラーのテスト
    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: XlsxToDocxError = io_err.into();

        match error {
            XlsxToDocxError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert_eq!(e.to_string(), "File not found");
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_parse_error_display() {
        let parse_err = calamine::Error::Msg("Corrupted file");
        let error: XlsxToDocxError = parse_err.into();

        let error_msg = error.to_string();
        assert!(error_msg.contains("Failed to parse Excel file"));
        assert!(error_msg.contains("Corrupted file"));
    }

    #[test]
    fn test_missing_column_display() {
        let error = XlsxToDocxError::MissingColumn("Severity".to_string());
        let msg = error.to_string();
        assert!(msg.contains("Severity"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_template_mismatch_display() {
        let error = XlsxToDocxError::TemplateMismatch(
            "no table matches any spreadsheet column".to_string(),
        );
        assert!(error.to_string().starts_with("Template mismatch"));
    }

    // エラー変換のテスト（?演算子の動作確認）
    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<(), XlsxToDocxError> {
            let _file = std::fs::File::open("nonexistent_file.xlsx")?;
            Ok(())
        }

        let result = io_operation();
        assert!(result.is_err());

        match result {
            Err(XlsxToDocxError::Io(_)) => {}
            _ => panic!("Expected Io error from ? operator"),
        }
    }

    #[test]
    fn test_all_error_formats() {
        let io_err: XlsxToDocxError = io::Error::other("test io").into();
        assert!(io_err.to_string().starts_with("IO error"));

        let config_err = XlsxToDocxError::Config("test config".to_string());
        assert!(config_err.to_string().starts_with("Configuration error"));

        let zip_err = XlsxToDocxError::Zip("bad archive".to_string());
        assert!(zip_err.to_string().starts_with("ZIP archive error"));

        let xml_err = XlsxToDocxError::Xml("unexpected end".to_string());
        assert!(xml_err.to_string().starts_with("XML parse error"));
    }
}
