//! Builder Module
//!
//! Fluent Builder APIを提供し、`Generator`インスタンスを段階的に構築する。

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::color::DEFAULT_LIGHTEN_FACTOR;
use crate::docx::template::DocxTemplate;
use crate::docx::writer::write_document;
use crate::error::XlsxToDocxError;
use crate::parser::{FindingsSheet, SeverityFillParser};
use crate::section::SectionBuilder;
use crate::security::SecurityConfig;
use crate::types::GenerationSummary;

/// 生成処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct GeneratorConfig {
    /// 画像参照の解決基点ディレクトリ
    pub image_root: PathBuf,

    /// 3行目の背景に使用する明色化のブレンド係数
    pub lighten_factor: f64,

    /// テーブルセルの内側余白（dxa単位）
    pub cell_margin_dxa: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("."),
            lighten_factor: DEFAULT_LIGHTEN_FACTOR,
            cell_margin_dxa: 100,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Generator`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみを
/// オーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsx2docx::GeneratorBuilder;
///
/// # fn main() -> Result<(), xlsx2docx::XlsxToDocxError> {
/// let generator = GeneratorBuilder::new()
///     .with_image_root("uploads/images")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GeneratorBuilder {
    /// 内部設定（構築中）
    config: GeneratorConfig,
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 画像基点ディレクトリ: カレントディレクトリ
    /// - 明色化係数: 0.4
    /// - セル余白: 100 dxa
    pub fn new() -> Self {
        Self {
            config: GeneratorConfig::default(),
        }
    }

    /// 画像参照の解決基点ディレクトリを指定する
    ///
    /// 末尾列の画像参照は相対パスとして、このディレクトリから解決されます。
    ///
    /// # 引数
    ///
    /// * `root` - 基点ディレクトリのパス
    pub fn with_image_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.image_root = root.into();
        self
    }

    /// 明色化のブレンド係数を指定する
    ///
    /// # 引数
    ///
    /// * `factor` - ブレンド係数（0.0で元の色のまま、1.0で白）
    ///
    /// # 制約
    ///
    /// * `0.0 <= factor <= 1.0` でなければならない
    /// * 制約違反の場合、`build()`時に`XlsxToDocxError::Config`を返す
    pub fn with_lighten_factor(mut self, factor: f64) -> Self {
        self.config.lighten_factor = factor;
        self
    }

    /// テーブルセルの内側余白を指定する（dxa単位）
    pub fn with_cell_margin(mut self, margin_dxa: u32) -> Self {
        self.config.cell_margin_dxa = margin_dxa;
        self
    }

    /// 設定を検証し、`Generator`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Generator)` - 設定が有効な場合
    /// * `Err(XlsxToDocxError::Config)` - 設定が無効な場合
    pub fn build(self) -> Result<Generator, XlsxToDocxError> {
        // 1. 明色化係数の検証
        if !(0.0..=1.0).contains(&self.config.lighten_factor)
            || self.config.lighten_factor.is_nan()
        {
            return Err(XlsxToDocxError::Config(format!(
                "Invalid lighten factor: {} (must be in [0.0, 1.0])",
                self.config.lighten_factor
            )));
        }

        // 2. Generatorインスタンス生成
        Ok(Generator::new(self.config))
    }
}

/// 生成処理のファサード
///
/// 検出事項トラッカー（XLSX）とテンプレート（DOCX)から、書式付きの報告書
/// （DOCX）を生成するためのメインエントリーポイントです。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsx2docx::GeneratorBuilder;
///
/// # fn main() -> Result<(), xlsx2docx::XlsxToDocxError> {
/// let generator = GeneratorBuilder::new().build()?;
/// let summary = generator.generate("findings.xlsx", "template.docx", "report.docx")?;
/// println!("Generated {} sections", summary.sections);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Generator {
    /// 生成設定
    config: GeneratorConfig,
}

impl Generator {
    pub(crate) fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// ファイルパス指定で報告書を生成
    ///
    /// # 引数
    ///
    /// * `xlsx_path` - 入力スプレッドシートのパス
    /// * `template_path` - テンプレートDOCXのパス
    /// * `output_path` - 出力DOCXのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(GenerationSummary)` - 生成に成功した場合
    /// * `Err(XlsxToDocxError)` - エラーが発生した場合
    pub fn generate<P: AsRef<Path>, Q: AsRef<Path>, O: AsRef<Path>>(
        &self,
        xlsx_path: P,
        template_path: Q,
        output_path: O,
    ) -> Result<GenerationSummary, XlsxToDocxError> {
        let xlsx = File::open(xlsx_path.as_ref())?;
        let template = File::open(template_path.as_ref())?;
        let output = File::create(output_path.as_ref())?;

        let summary = self.generate_from_readers(xlsx, template, output)?;

        log::info!(
            "Generated document '{}': {} sections, {} images embedded, {} skipped",
            output_path.as_ref().display(),
            summary.sections,
            summary.images_embedded,
            summary.images_skipped
        );

        Ok(summary)
    }

    /// リーダー/ライター指定で報告書を生成
    ///
    /// # 引数
    ///
    /// * `xlsx` - スプレッドシートを読み込むためのリーダー（Read + Seekトレイトを実装）
    /// * `template` - テンプレートを読み込むためのリーダー（Read + Seekトレイトを実装）
    /// * `output` - 出力先のライター（Write + Seekトレイトを実装）
    ///
    /// # 処理フロー
    ///
    /// 1. スプレッドシートの値パス（calamine）
    /// 2. スプレッドシートの書式パス（塗りつぶし色のXML解析）
    /// 3. テンプレートの読み込みと本文分割
    /// 4. 行ごとのセクション構築
    /// 5. 出力アーカイブの組み立て
    pub fn generate_from_readers<R1, R2, W>(
        &self,
        mut xlsx: R1,
        template: R2,
        output: W,
    ) -> Result<GenerationSummary, XlsxToDocxError>
    where
        R1: Read + Seek,
        R2: Read + Seek,
        W: Write + Seek,
    {
        // 1. スプレッドシートをメモリへ読み込む（2パスで再利用するため）
        let security_config = SecurityConfig::default();
        let mut buffer = Vec::new();
        let bytes_read = xlsx.read_to_end(&mut buffer)?;

        if bytes_read as u64 > security_config.max_input_file_size {
            return Err(XlsxToDocxError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                bytes_read, security_config.max_input_file_size
            )));
        }

        // 2. 値パスと書式パス
        let sheet = FindingsSheet::from_reader(Cursor::new(buffer.clone()))?;
        let fills = SeverityFillParser::new(Cursor::new(buffer))?;

        log::debug!(
            "Parsed spreadsheet: {} columns, {} data rows",
            sheet.headers.len(),
            sheet.rows.len()
        );

        // 3. テンプレートの読み込みと本文分割
        let template = DocxTemplate::from_reader(template, &sheet.headers)?;

        log::debug!(
            "Matched template table with {} row labels",
            template.body.row_headers.len()
        );

        // 4. 行ごとのセクション構築
        let built = SectionBuilder::new(&sheet, &fills, &template.body.row_headers, &self.config)
            .build()?;

        // 5. 出力アーカイブの組み立て
        let outcome = write_document(output, &template, &built.sections)?;

        Ok(GenerationSummary {
            rows: sheet.rows.len(),
            sections: built.sections.len(),
            images_embedded: outcome.images_embedded,
            images_skipped: built.images_skipped,
        })
    }
}
