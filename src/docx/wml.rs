//! WML Rendering Module
//!
//! 文書モデルをWordprocessingML断片（`word/document.xml`の本文要素）へ
//! レンダリングするモジュール。quick-xmlのエスケープ以外は文字列組み立てで
//! 実装しています。

use quick_xml::escape::escape;
use std::path::PathBuf;

use crate::docx::model::{
    Alignment, BorderStyle, ImageRun, Paragraph, Run, Section, Table, TableCell, TextRun,
};

/// テーブル幅（dxa単位、6.5インチ = ページ幅8.5 - 左右余白1 + 1）
pub(crate) const TABLE_WIDTH_DXA: u32 = 9360;

/// ページ余白（dxa単位、1インチ）
pub(crate) const PAGE_MARGIN_DXA: u32 = 1440;

/// 箇条書き行の左インデント（dxa単位、0.25インチ)
pub(crate) const BULLET_INDENT_DXA: u32 = 360;

/// 段落前後の間隔（twips単位、2pt）
pub(crate) const PARAGRAPH_SPACING_TWIPS: u32 = 40;

/// 単一行間のline値（twips単位）
const LINE_SINGLE_TWIPS: u32 = 240;

/// 罫線の太さ（1/8pt単位）
const BORDER_SIZE_EIGHTHS: u32 = 4;

/// 埋め込み画像1件分の割り当て結果
///
/// リレーションシップIDとメディアパート名はレンダリング時に確定し、
/// writerがアーカイブ組み立て時に参照します。
#[derive(Debug, Clone)]
pub(crate) struct EmbeddedImage {
    /// リレーションシップID（例: `"rId12"`）
    pub rid: String,
    /// メディアパート名（例: `"media/image3.png"`）
    pub part_name: String,
    /// ファイル拡張子（小文字、例: `"png"`）
    pub extension: String,
    /// 読み込み元のファイルパス
    pub path: PathBuf,
}

/// 画像ID割り当て
///
/// テンプレートが既に持つリレーションシップIDとメディア名に衝突しないよう、
/// writerが計算した開始番号から連番を払い出します。
#[derive(Debug)]
pub(crate) struct ImageAllocator {
    next_rid: u32,
    next_image: u32,
    pub images: Vec<EmbeddedImage>,
}

impl ImageAllocator {
    pub fn new(next_rid: u32, next_image: u32) -> Self {
        Self {
            next_rid,
            next_image,
            images: Vec::new(),
        }
    }

    /// 画像ランへIDを割り当て、ドローイングXMLで使う識別子を返す
    fn allocate(&mut self, image: &ImageRun) -> EmbeddedImage {
        let extension = image
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_lowercase();
        let embedded = EmbeddedImage {
            rid: format!("rId{}", self.next_rid),
            part_name: format!("media/image{}.{}", self.next_image, extension),
            extension,
            path: image.path.clone(),
        };
        self.next_rid += 1;
        self.next_image += 1;
        self.images.push(embedded.clone());
        embedded
    }
}

/// セクション全体（タイトル + テーブル + 改ページ）をレンダリング
pub(crate) fn render_section(section: &Section, alloc: &mut ImageAllocator) -> String {
    let mut xml = String::new();

    // 1. タイトル段落
    xml.push_str(&render_paragraph(&section.title, alloc));

    // 2. テーブル
    xml.push_str(&render_table(&section.table, alloc));

    // 3. 改ページ
    xml.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");

    xml
}

/// 単一列テーブルをレンダリング
fn render_table(table: &Table, alloc: &mut ImageAllocator) -> String {
    let mut xml = String::new();

    xml.push_str("<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/>");
    xml.push_str(&format!(
        "<w:tblW w:w=\"{}\" w:type=\"dxa\"/>",
        TABLE_WIDTH_DXA
    ));
    xml.push_str("<w:jc w:val=\"center\"/><w:tblLayout w:type=\"fixed\"/></w:tblPr>");
    xml.push_str(&format!(
        "<w:tblGrid><w:gridCol w:w=\"{}\"/></w:tblGrid>",
        TABLE_WIDTH_DXA
    ));

    for cell in &table.rows {
        xml.push_str("<w:tr>");
        xml.push_str(&render_cell(cell, alloc));
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

/// テーブルセルをレンダリング
fn render_cell(cell: &TableCell, alloc: &mut ImageAllocator) -> String {
    let mut xml = String::new();

    xml.push_str("<w:tc><w:tcPr>");
    xml.push_str(&format!(
        "<w:tcW w:w=\"{}\" w:type=\"dxa\"/>",
        TABLE_WIDTH_DXA
    ));

    // 罫線（スキーマ順: top, left, bottom, right）
    xml.push_str("<w:tcBorders>");
    xml.push_str(&render_border("top", cell.borders.top));
    xml.push_str(&render_border("left", cell.borders.left));
    xml.push_str(&render_border("bottom", cell.borders.bottom));
    xml.push_str(&render_border("right", cell.borders.right));
    xml.push_str("</w:tcBorders>");

    // 背景色
    if let Some(color) = cell.shading {
        xml.push_str(&format!(
            "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
            color.to_hex()
        ));
    }

    // セル内余白（四辺共通）
    xml.push_str("<w:tcMar>");
    for side in ["top", "left", "bottom", "right"] {
        xml.push_str(&format!(
            "<w:{} w:w=\"{}\" w:type=\"dxa\"/>",
            side, cell.margins_dxa
        ));
    }
    xml.push_str("</w:tcMar>");

    xml.push_str("</w:tcPr>");

    // セルは少なくとも1つの段落を持つ必要がある
    if cell.paragraphs.is_empty() {
        xml.push_str("<w:p/>");
    } else {
        for paragraph in &cell.paragraphs {
            xml.push_str(&render_paragraph(paragraph, alloc));
        }
    }

    xml.push_str("</w:tc>");
    xml
}

fn render_border(side: &str, style: BorderStyle) -> String {
    match style {
        BorderStyle::Single => format!(
            "<w:{} w:val=\"single\" w:sz=\"{}\" w:space=\"0\" w:color=\"000000\"/>",
            side, BORDER_SIZE_EIGHTHS
        ),
        BorderStyle::Nil => format!("<w:{} w:val=\"nil\"/>", side),
    }
}

/// 段落をレンダリング
fn render_paragraph(paragraph: &Paragraph, alloc: &mut ImageAllocator) -> String {
    let mut xml = String::new();

    xml.push_str("<w:p><w:pPr>");

    // 間隔と行間（スキーマ順: spacing, ind, jc）
    let before = paragraph.space_before.unwrap_or(0);
    let after = paragraph.space_after.unwrap_or(0);
    xml.push_str(&format!(
        "<w:spacing w:before=\"{}\" w:after=\"{}\" w:line=\"{}\" w:lineRule=\"auto\"/>",
        before, after, LINE_SINGLE_TWIPS
    ));

    if let Some(indent) = paragraph.indent_left_dxa {
        xml.push_str(&format!("<w:ind w:left=\"{}\"/>", indent));
    }

    let jc = match paragraph.alignment {
        Alignment::Center => "center",
        Alignment::Justify => "both",
    };
    xml.push_str(&format!("<w:jc w:val=\"{}\"/>", jc));

    xml.push_str("</w:pPr>");

    for run in &paragraph.runs {
        match run {
            Run::Text(text_run) => xml.push_str(&render_text_run(text_run)),
            Run::Image(image_run) => xml.push_str(&render_image_run(image_run, alloc)),
        }
    }

    xml.push_str("</w:p>");
    xml
}

/// テキストランをレンダリング
///
/// テキスト中の改行は`<w:br/>`としてレンダリングします。
fn render_text_run(run: &TextRun) -> String {
    let mut xml = String::new();
    xml.push_str("<w:r>");

    let has_props = run.bold || run.size_half_points.is_some() || run.color.is_some();
    if has_props {
        xml.push_str("<w:rPr>");
        if run.bold {
            xml.push_str("<w:b/>");
        }
        if let Some(color) = run.color {
            xml.push_str(&format!("<w:color w:val=\"{}\"/>", color.to_hex()));
        }
        if let Some(size) = run.size_half_points {
            xml.push_str(&format!(
                "<w:sz w:val=\"{}\"/><w:szCs w:val=\"{}\"/>",
                size, size
            ));
        }
        xml.push_str("</w:rPr>");
    }

    for (idx, line) in run.text.split('\n').enumerate() {
        if idx > 0 {
            xml.push_str("<w:br/>");
        }
        xml.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            escape(line)
        ));
    }

    xml.push_str("</w:r>");
    xml
}

/// 画像ランをレンダリング
///
/// インライン画像のドローイングXMLを生成します。名前空間は生成する断片が
/// 自己完結するよう、要素上で直接宣言します。
fn render_image_run(image: &ImageRun, alloc: &mut ImageAllocator) -> String {
    let embedded = alloc.allocate(image);
    let doc_pr_id = alloc.images.len() as u32;
    let name = embedded
        .part_name
        .strip_prefix("media/")
        .unwrap_or(&embedded.part_name);

    format!(
        concat!(
            "<w:r><w:rPr><w:noProof/></w:rPr><w:drawing>",
            "<wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\" ",
            "xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\">",
            "<wp:extent cx=\"{cx}\" cy=\"{cy}\"/>",
            "<wp:docPr id=\"{id}\" name=\"{name}\"/>",
            "<a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">",
            "<a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>",
            "<pic:blipFill><a:blip r:embed=\"{rid}\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"/>",
            "<a:stretch><a:fillRect/></a:stretch></pic:blipFill>",
            "<pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>",
            "</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
        ),
        cx = image.width_emu,
        cy = image.height_emu,
        id = doc_pr_id,
        name = name,
        rid = embedded.rid
    )
}

/// 1インチのページ余白を持つ`w:pgMar`要素
pub(crate) fn uniform_page_margins() -> String {
    format!(
        "<w:pgMar w:top=\"{m}\" w:right=\"{m}\" w:bottom=\"{m}\" w:left=\"{m}\" \
         w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/>",
        m = PAGE_MARGIN_DXA
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RgbColor;
    use crate::docx::model::CellBorders;

    fn plain_run(text: &str) -> TextRun {
        TextRun {
            text: text.to_string(),
            bold: false,
            size_half_points: None,
            color: None,
        }
    }

    fn text_cell(text: &str) -> TableCell {
        TableCell {
            shading: None,
            margins_dxa: 100,
            borders: CellBorders::default(),
            paragraphs: vec![Paragraph::new(Alignment::Justify)
                .with_run(Run::Text(plain_run(text)))],
        }
    }

    #[test]
    fn test_render_section_contains_title_and_page_break() {
        let section = Section {
            title: Paragraph::new(Alignment::Center)
                .with_run(Run::Text(TextRun::sized("Table 1", 32).bold())),
            table: Table {
                rows: vec![text_cell("High")],
            },
        };
        let mut alloc = ImageAllocator::new(1, 1);
        let xml = render_section(&section, &mut alloc);

        assert!(xml.contains("<w:jc w:val=\"center\"/>"));
        assert!(xml.contains("<w:sz w:val=\"32\"/>"));
        assert!(xml.contains(">Table 1</w:t>"));
        assert!(xml.contains("<w:br w:type=\"page\"/>"));
        assert!(xml.starts_with("<w:p>"));
    }

    #[test]
    fn test_render_table_structure() {
        let table = Table {
            rows: vec![text_cell("a"), text_cell("b")],
        };
        let mut alloc = ImageAllocator::new(1, 1);
        let xml = render_table(&table, &mut alloc);

        assert!(xml.contains("<w:tblStyle w:val=\"TableGrid\"/>"));
        assert!(xml.contains("<w:tblW w:w=\"9360\" w:type=\"dxa\"/>"));
        assert!(xml.contains("<w:gridCol w:w=\"9360\"/>"));
        assert_eq!(xml.matches("<w:tr>").count(), 2);
    }

    #[test]
    fn test_render_cell_shading_and_margins() {
        let mut cell = text_cell("x");
        cell.shading = Some(RgbColor::new(0xC0, 0x00, 0x00));
        let mut alloc = ImageAllocator::new(1, 1);
        let xml = render_cell(&cell, &mut alloc);

        assert!(xml.contains("<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"c00000\"/>"));
        assert!(xml.contains("<w:top w:w=\"100\" w:type=\"dxa\"/>"));
    }

    #[test]
    fn test_render_nil_border() {
        let mut cell = text_cell("x");
        cell.borders.bottom = BorderStyle::Nil;
        let mut alloc = ImageAllocator::new(1, 1);
        let xml = render_cell(&cell, &mut alloc);

        assert!(xml.contains("<w:bottom w:val=\"nil\"/>"));
        assert!(xml.contains("<w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>"));
    }

    #[test]
    fn test_render_text_run_escapes_xml() {
        let run = plain_run("a < b & c > d");
        let xml = render_text_run(&run);
        assert!(xml.contains("a &lt; b &amp; c &gt; d"));
    }

    #[test]
    fn test_render_text_run_newline_becomes_br() {
        let run = plain_run("line1\nline2");
        let xml = render_text_run(&run);
        assert!(xml.contains(">line1</w:t><w:br/><w:t"));
    }

    #[test]
    fn test_render_colored_bold_run() {
        let run = TextRun::sized("Impact:", 22)
            .bold()
            .colored(Some(RgbColor::new(0xC0, 0, 0)));
        let xml = render_text_run(&run);
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains("<w:color w:val=\"c00000\"/>"));
        assert!(xml.contains("<w:sz w:val=\"22\"/>"));
    }

    #[test]
    fn test_image_allocator_sequences_ids() {
        let image = ImageRun {
            path: PathBuf::from("shot.PNG"),
            width_emu: 4_572_000,
            height_emu: 3_000_000,
        };
        let mut alloc = ImageAllocator::new(5, 3);
        let xml = render_image_run(&image, &mut alloc);

        assert!(xml.contains("r:embed=\"rId5\""));
        assert!(xml.contains("cx=\"4572000\""));
        assert_eq!(alloc.images.len(), 1);
        assert_eq!(alloc.images[0].part_name, "media/image3.png");
        assert_eq!(alloc.images[0].extension, "png");

        let second = render_image_run(&image, &mut alloc);
        assert!(second.contains("r:embed=\"rId6\""));
        assert_eq!(alloc.images[1].part_name, "media/image4.png");
    }

    #[test]
    fn test_uniform_page_margins() {
        let xml = uniform_page_margins();
        assert!(xml.contains("w:top=\"1440\""));
        assert!(xml.contains("w:left=\"1440\""));
    }
}
