//! Style Utility Module
//!
//! テーブル罫線の適用と箇条書きテキストの整形。
//! どちらも文書モデルに対する純粋な操作で、XMLには触れません。

use crate::docx::model::{BorderStyle, Table};

/// 箇条書きのマーカー（インデント + 中黒）
pub(crate) const BULLET_MARKER: &str = "    \u{2022} ";

/// テーブル全体へ罫線を適用
///
/// すべてのセルの四辺を単線にした上で、1行目の下罫線と2行目の上罫線を
/// `nil`にします。これにより最初の2行が1つのブロックとして表示されます。
pub(crate) fn apply_table_borders(table: &mut Table) {
    for (row_idx, cell) in table.rows.iter_mut().enumerate() {
        cell.borders.top = BorderStyle::Single;
        cell.borders.bottom = BorderStyle::Single;
        cell.borders.left = BorderStyle::Single;
        cell.borders.right = BorderStyle::Single;

        if row_idx == 0 {
            cell.borders.bottom = BorderStyle::Nil;
        }
        if row_idx == 1 {
            cell.borders.top = BorderStyle::Nil;
        }
    }
}

/// 箇条書き整形
///
/// `apply_bullets`が真の場合、改行で分割した2行目以降の各行へ箇条書き
/// マーカーを付けます。1行目にはマーカーを付けません。空行は捨てられます。
/// `apply_bullets`が偽の場合はテキストをそのまま返します。
///
/// # 引数
///
/// * `text` - 整形対象のテキスト
/// * `apply_bullets` - 箇条書きマーカーを付けるかどうか
pub(crate) fn format_text_with_bullets(text: &str, apply_bullets: bool) -> String {
    if !apply_bullets {
        return text.to_string();
    }

    let mut formatted_lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if formatted_lines.is_empty() {
            formatted_lines.push(line.to_string());
        } else {
            formatted_lines.push(format!("{}{}", BULLET_MARKER, line));
        }
    }
    formatted_lines.join("\n")
}
