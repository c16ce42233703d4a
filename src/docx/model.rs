//! Document Model Module
//!
//! 生成するセクションをWordprocessingMLへ変換する前の中間表現。
//! レンダリングと書式決定を分離するための純粋なデータ構造です。

use std::path::PathBuf;

use crate::color::RgbColor;

/// 段落の揃え方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Alignment {
    Center,
    Justify,
}

/// 罫線のスタイル
///
/// `Nil`は「罫線なし」で、各テーブルの1行目と2行目を視覚的に1つのブロックへ
/// 融合するために使用します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BorderStyle {
    Single,
    Nil,
}

/// セルの四辺の罫線
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellBorders {
    pub top: BorderStyle,
    pub bottom: BorderStyle,
    pub left: BorderStyle,
    pub right: BorderStyle,
}

impl Default for CellBorders {
    fn default() -> Self {
        Self {
            top: BorderStyle::Single,
            bottom: BorderStyle::Single,
            left: BorderStyle::Single,
            right: BorderStyle::Single,
        }
    }
}

/// テキストラン
#[derive(Debug, Clone)]
pub(crate) struct TextRun {
    pub text: String,
    pub bold: bool,
    /// フォントサイズ（ハーフポイント単位、`None`で文書デフォルト）
    pub size_half_points: Option<u32>,
    /// 文字色（`None`で自動）
    pub color: Option<RgbColor>,
}

impl TextRun {
    pub fn sized(text: impl Into<String>, size_half_points: u32) -> Self {
        Self {
            text: text.into(),
            bold: false,
            size_half_points: Some(size_half_points),
            color: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn colored(mut self, color: Option<RgbColor>) -> Self {
        self.color = color;
        self
    }
}

/// 埋め込み画像ラン
///
/// 寸法はセクション構築時に画像ファイルから取得し、EMU単位で保持します。
#[derive(Debug, Clone)]
pub(crate) struct ImageRun {
    pub path: PathBuf,
    pub width_emu: u64,
    pub height_emu: u64,
}

/// 段落内のラン
#[derive(Debug, Clone)]
pub(crate) enum Run {
    Text(TextRun),
    Image(ImageRun),
}

/// 段落
///
/// すべての段落は単一行間（line spacing 1.0）でレンダリングされます。
#[derive(Debug, Clone)]
pub(crate) struct Paragraph {
    pub alignment: Alignment,
    /// 左インデント（dxa単位、箇条書き行で使用）
    pub indent_left_dxa: Option<u32>,
    /// 段落前後の間隔（twips単位）
    pub space_before: Option<u32>,
    pub space_after: Option<u32>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(alignment: Alignment) -> Self {
        Self {
            alignment,
            indent_left_dxa: None,
            space_before: None,
            space_after: None,
            runs: Vec::new(),
        }
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }
}

/// テーブルセル（1列テーブルの1行分）
#[derive(Debug, Clone)]
pub(crate) struct TableCell {
    /// 背景色（`None`で塗りつぶしなし）
    pub shading: Option<RgbColor>,
    /// セル内余白（dxa単位、四辺共通）
    pub margins_dxa: u32,
    pub borders: CellBorders,
    pub paragraphs: Vec<Paragraph>,
}

/// 単一列テーブル
///
/// 検出事項1件分のテーブル。各行が1セルを持ちます。
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub rows: Vec<TableCell>,
}

/// 検出事項1件分のセクション
///
/// タイトル段落 + 単一列テーブル + 改ページで構成されます。
#[derive(Debug, Clone)]
pub(crate) struct Section {
    /// タイトル段落（中央揃え、例: `"Table 1"`）
    pub title: Paragraph,
    pub table: Table,
}
