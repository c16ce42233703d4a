//! Section Builder Module
//!
//! 検出事項1行分を、書式付きの単一列テーブルセクションへ変換するモジュール。
//! フィールド行の書式はテンプレート行インデックスで決まります。

use std::path::PathBuf;

use crate::builder::GeneratorConfig;
use crate::color::RgbColor;
use crate::docx::model::{
    Alignment, CellBorders, ImageRun, Paragraph, Run, Section, Table, TableCell, TextRun,
};
use crate::docx::style::{apply_table_borders, format_text_with_bullets};
use crate::docx::wml::{BULLET_INDENT_DXA, PARAGRAPH_SPACING_TWIPS};
use crate::error::XlsxToDocxError;
use crate::parser::{FindingsSheet, SeverityFillParser};
use crate::steps::{
    has_image_extension, looks_like_image_list, looks_like_step, parse_steps, split_image_refs,
};
use crate::types::{normalize_name, FindingRow, Step};

/// 生の重大度色で塗るフィールド行数（`i < 2`）
const RAW_FILL_ROWS: usize = 2;

/// 明色化した重大度色で塗るフィールド行（`i == 2`）
const LIGHT_FILL_ROW: usize = 2;

/// 値の前へ空段落と箇条書きを適用する開始行（`i >= 8`）
const SPACED_FIELDS_FROM: usize = 8;

// フォントサイズ（ハーフポイント単位）
const FIRST_ROW_SIZE: u32 = 22; // 11pt
const SECOND_ROW_SIZE: u32 = 28; // 14pt
const LABEL_SIZE: u32 = 22; // 11pt
const VALUE_SIZE: u32 = 22; // 11pt
const POC_LABEL_SIZE: u32 = 24; // 12pt
const TITLE_SIZE: u32 = 32; // 16pt

/// 画像の埋め込み幅（EMU単位、5.0インチ）
const IMAGE_WIDTH_EMU: u64 = 4_572_000;

/// セクション構築の結果
///
/// 埋め込んだ画像数はアーカイブ組み立て時にwriterが確定するため、
/// ここではスキップ数のみを数えます。
#[derive(Debug)]
pub(crate) struct BuiltSections {
    pub sections: Vec<Section>,
    /// スキップした画像参照数
    pub images_skipped: usize,
}

/// セクションビルダー
///
/// シート・塗りつぶし・テンプレート行ラベルを突き合わせ、行ごとの
/// セクションを構築します。
pub(crate) struct SectionBuilder<'a> {
    sheet: &'a FindingsSheet,
    fills: &'a SeverityFillParser,
    row_headers: &'a [String],
    config: &'a GeneratorConfig,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(
        sheet: &'a FindingsSheet,
        fills: &'a SeverityFillParser,
        row_headers: &'a [String],
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            sheet,
            fills,
            row_headers,
            config,
        }
    }

    /// 全データ行のセクションを行順に構築
    pub fn build(&self) -> Result<BuiltSections, XlsxToDocxError> {
        let mut sections = Vec::with_capacity(self.sheet.rows.len());
        let mut images_skipped = 0;

        for row in &self.sheet.rows {
            let section = self.build_section(row, &mut images_skipped)?;
            sections.push(section);
        }

        Ok(BuiltSections {
            sections,
            images_skipped,
        })
    }

    /// 1行分のセクションを構築
    fn build_section(
        &self,
        row: &FindingRow,
        images_skipped: &mut usize,
    ) -> Result<Section, XlsxToDocxError> {
        // 1. 重大度色とその明色化バリアント
        let severity = self.fills.fill_color(
            self.sheet.absolute_row(row.index),
            self.sheet.absolute_col(self.sheet.severity_col),
        );
        let light = severity.map(|c| c.lighten(self.config.lighten_factor));

        let mut table = Table::default();

        // 2. フィールド行（Proof of Conceptを除く）
        for (i, header) in self.row_headers.iter().enumerate() {
            if normalize_name(header) == "proof of concept" {
                continue;
            }
            table
                .rows
                .push(self.build_field_cell(i, header, row, severity, light));
        }

        // 3. 末尾行（Proof of Concept + 後続列）
        table
            .rows
            .push(self.build_tail_cell(row, severity, images_skipped)?);

        // 4. 罫線（1行目と2行目を融合）
        apply_table_borders(&mut table);

        Ok(Section {
            title: Paragraph::new(Alignment::Center).with_run(Run::Text(
                TextRun::sized(format!("Table {}", row.index + 1), TITLE_SIZE).bold(),
            )),
            table,
        })
    }

    /// フィールド行のセルを構築
    ///
    /// `i`はテンプレート行インデックス（0始まり）。
    fn build_field_cell(
        &self,
        i: usize,
        header: &str,
        row: &FindingRow,
        severity: Option<RgbColor>,
        light: Option<RgbColor>,
    ) -> TableCell {
        // 背景色: 最初の2行は生の重大度色、3行目は明色化、それ以降は無し
        let shading = if severity.is_some() {
            if i < RAW_FILL_ROWS {
                severity
            } else if i == LIGHT_FILL_ROW {
                light
            } else {
                None
            }
        } else {
            None
        };

        let value = self.field_value(header, row);
        let mut paragraphs = Vec::new();

        if i < RAW_FILL_ROWS {
            // 値のみ、太字。1行目11pt、2行目14pt。
            let size = if i == 0 { FIRST_ROW_SIZE } else { SECOND_ROW_SIZE };
            paragraphs.push(
                Paragraph::new(Alignment::Justify)
                    .with_run(Run::Text(TextRun::sized(value, size).bold())),
            );
        } else {
            // フィールド名ラベル + 値
            paragraphs.push(
                Paragraph::new(Alignment::Justify).with_run(Run::Text(
                    TextRun::sized(format!("{}:", header), LABEL_SIZE).bold(),
                )),
            );

            // 視覚的な区切りの空段落
            if i >= SPACED_FIELDS_FROM {
                paragraphs.push(Paragraph::new(Alignment::Justify));
            }

            let apply_bullets = i >= SPACED_FIELDS_FROM;
            self.push_value_paragraphs(&mut paragraphs, &value, apply_bullets, severity);
        }

        TableCell {
            shading,
            margins_dxa: self.config.cell_margin_dxa,
            borders: CellBorders::default(),
            paragraphs,
        }
    }

    /// 値の段落を追加
    ///
    /// 改行を含む値は行ごとに段落へ分割します。`apply_bullets`が真の場合は
    /// 2行目以降へ箇条書きマーカーとインデントを付けます。
    fn push_value_paragraphs(
        &self,
        paragraphs: &mut Vec<Paragraph>,
        value: &str,
        apply_bullets: bool,
        severity: Option<RgbColor>,
    ) {
        let value_run = |text: &str| {
            Run::Text(TextRun::sized(text, VALUE_SIZE).colored(severity))
        };

        if value.contains('\n') {
            let formatted = format_text_with_bullets(value, apply_bullets);
            for (line_idx, line) in formatted.split('\n').enumerate() {
                let mut paragraph = Paragraph::new(Alignment::Justify);
                if line_idx > 0 {
                    paragraph.space_before = Some(PARAGRAPH_SPACING_TWIPS);
                    paragraph.space_after = Some(PARAGRAPH_SPACING_TWIPS);
                    if apply_bullets {
                        paragraph.indent_left_dxa = Some(BULLET_INDENT_DXA);
                    }
                }
                paragraph.runs.push(value_run(line));
                paragraphs.push(paragraph);
            }
        } else {
            let text = if apply_bullets && !value.is_empty() {
                format_text_with_bullets(value, true)
            } else {
                value.to_string()
            };
            paragraphs.push(Paragraph::new(Alignment::Justify).with_run(value_run(&text)));
        }
    }

    /// 末尾行（Proof of Concept + 後続列）のセルを構築
    fn build_tail_cell(
        &self,
        row: &FindingRow,
        severity: Option<RgbColor>,
        images_skipped: &mut usize,
    ) -> Result<TableCell, XlsxToDocxError> {
        let mut paragraphs = vec![Paragraph::new(Alignment::Justify).with_run(Run::Text(
            TextRun::sized("Proof of Concept:", POC_LABEL_SIZE)
                .bold()
                .colored(severity),
        ))];

        // ステップカウンターは行内の全末尾列をまたいで継続する
        let mut counter = 0usize;

        for col in self.sheet.poc_col..self.sheet.headers.len() {
            let value = row.value(col).trim().to_string();
            if value.is_empty() || value.to_lowercase() == "nan" {
                continue;
            }

            let is_first = col == self.sheet.poc_col;
            if is_first || looks_like_step(&value) {
                let steps = parse_steps(&value, &mut counter);
                push_step_paragraphs(&mut paragraphs, &steps);
            } else if looks_like_image_list(&value) {
                for path in split_image_refs(&value) {
                    match self.resolve_image(&path) {
                        Some(image_run) => {
                            paragraphs.push(
                                Paragraph::new(Alignment::Justify)
                                    .with_run(Run::Image(image_run)),
                            );
                        }
                        None => {
                            log::warn!("Skipped image reference: {}", path);
                            *images_skipped += 1;
                        }
                    }
                }
            } else {
                // ステップにも画像にも見えない値は合成ステップとして扱う
                let steps = parse_steps(&value, &mut counter);
                push_step_paragraphs(&mut paragraphs, &steps);
            }
        }

        Ok(TableCell {
            shading: None,
            margins_dxa: self.config.cell_margin_dxa,
            borders: CellBorders::default(),
            paragraphs,
        })
    }

    /// 画像参照を解決し、寸法を取得する
    ///
    /// 存在しないパス・拡張子不一致・寸法の取得失敗は`None`（スキップ）です。
    fn resolve_image(&self, reference: &str) -> Option<ImageRun> {
        if !has_image_extension(reference) {
            return None;
        }

        let path: PathBuf = self.config.image_root.join(reference.trim());
        if !path.is_file() {
            return None;
        }

        let (width, height) = match image::image_dimensions(&path) {
            Ok(dims) => dims,
            Err(e) => {
                log::warn!("Failed to read image dimensions '{}': {}", path.display(), e);
                return None;
            }
        };
        if width == 0 || height == 0 {
            return None;
        }

        // 固定幅5.0インチへ縦横比を維持して拡縮
        let height_emu = IMAGE_WIDTH_EMU * height as u64 / width as u64;
        Some(ImageRun {
            path,
            width_emu: IMAGE_WIDTH_EMU,
            height_emu,
        })
    }

    /// テンプレート行ラベルに対応するシート列の値を取得
    fn field_value(&self, header: &str, row: &FindingRow) -> String {
        let normalized = normalize_name(header);
        self.sheet
            .headers
            .iter()
            .position(|h| normalize_name(h) == normalized)
            .map(|col| row.value(col).trim().to_string())
            .unwrap_or_default()
    }
}

/// ステップの（ラベル段落, 本文段落）ペアを追加
fn push_step_paragraphs(paragraphs: &mut Vec<Paragraph>, steps: &[Step]) {
    for step in steps {
        paragraphs.push(Paragraph::new(Alignment::Justify).with_run(Run::Text(
            TextRun::sized(step.label.clone(), LABEL_SIZE).bold(),
        )));

        let mut content = Paragraph::new(Alignment::Justify)
            .with_run(Run::Text(TextRun::sized(step.body.clone(), VALUE_SIZE)));
        content.space_before = Some(PARAGRAPH_SPACING_TWIPS);
        content.space_after = Some(PARAGRAPH_SPACING_TWIPS);
        paragraphs.push(content);
    }
}
