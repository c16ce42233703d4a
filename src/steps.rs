//! Step Tokenizer Module
//!
//! 証跡（Proof of Concept）列のテキストを`Step N:`ラベルで分割するモジュール。
//! 正規表現クレートを使わず、1パスのスキャナとして実装しています。
//!
//! ラベルの構文: `Step`（大文字小文字を区別しない）+ 任意個のASCII空白 +
//! 1桁以上の数字 + `:`。

use crate::types::Step;

/// テキスト中のステップラベルのバイト範囲を検出
///
/// 重複しないラベルを出現順に返します。
///
/// # 引数
///
/// * `text` - 走査対象のテキスト
///
/// # 戻り値
///
/// * `(開始オフセット, 終了オフセット)`のリスト（終了オフセットは`:`の直後）
fn find_step_labels(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut labels = Vec::new();
    let mut i = 0;

    while i + 4 <= bytes.len() {
        // 1. "step"（大文字小文字無視）の照合
        if !bytes[i..i + 4].eq_ignore_ascii_case(b"step") {
            i += 1;
            continue;
        }

        // 2. 空白の読み飛ばし
        let mut j = i + 4;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }

        // 3. 数字列（1桁以上必須）
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == digits_start {
            i += 4;
            continue;
        }

        // 4. コロン
        if j < bytes.len() && bytes[j] == b':' {
            labels.push((i, j + 1));
            i = j + 1;
        } else {
            i += 4;
        }
    }

    labels
}

/// テキストをステップの並びへ分割
///
/// ラベルが1つも見つからない場合は、テキスト全体を1ステップとして扱い、
/// ランニングカウンターからラベルを合成します。ラベルが見つかった場合は
/// ラベルをそのまま保持し、各ラベルから次のラベルまでを本文とします
/// （最初のラベルより前のテキストは開いているステップが無いため捨てます）。
///
/// カウンターはラベルの有無にかかわらず、出力した1ステップごとに加算されます。
/// 呼び出し側が末尾列をまたいでカウンターを管理します（列ごとにはリセット
/// しません）。
///
/// # 引数
///
/// * `text` - 分割対象のテキスト
/// * `counter` - ステップ番号のランニングカウンター（行の先頭で0にリセット）
///
/// # 戻り値
///
/// * 出現順の`Step`リスト
///
/// # 使用例
///
/// ```
/// use xlsx2docx::parse_steps;
///
/// let mut counter = 0;
/// let steps = parse_steps("Step 1: open the app\nStep 2: log in", &mut counter);
/// assert_eq!(steps.len(), 2);
/// assert_eq!(steps[0].label, "Step 1:");
/// assert_eq!(steps[1].body, "log in");
/// assert_eq!(counter, 2);
///
/// let steps = parse_steps("no label here", &mut counter);
/// assert_eq!(steps[0].label, "Step3:");
/// ```
pub fn parse_steps(text: &str, counter: &mut usize) -> Vec<Step> {
    let labels = find_step_labels(text);
    let mut steps = Vec::new();

    if labels.is_empty() {
        let body = text.trim();
        if body.is_empty() {
            return steps;
        }
        *counter += 1;
        steps.push(Step {
            label: format!("Step{}:", *counter),
            body: body.to_string(),
        });
        return steps;
    }

    for (idx, &(start, end)) in labels.iter().enumerate() {
        let body_end = labels
            .get(idx + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(text.len());
        let body = text[end..body_end].trim();
        *counter += 1;
        steps.push(Step {
            label: text[start..end].to_string(),
            body: body.to_string(),
        });
    }

    steps
}

/// テキストがステップ記述かどうかの判定
///
/// `Step N:`ラベルを含むか、単語として`step`を含む場合に真を返します。
/// 単語境界は英数字以外の文字（またはテキスト端）です。
pub(crate) fn looks_like_step(text: &str) -> bool {
    if !find_step_labels(text).is_empty() {
        return true;
    }

    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        if bytes[i..i + 4].eq_ignore_ascii_case(b"step") {
            let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let after_ok = i + 4 == bytes.len() || !bytes[i + 4].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
        }
        i += 1;
    }
    false
}

/// 画像参照のファイル拡張子判定
///
/// `.png` / `.jpg` / `.jpeg`（大文字小文字無視）で終わる場合に真を返します。
pub(crate) fn has_image_extension(path: &str) -> bool {
    let lower = path.trim().to_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// セル値を画像参照リストへ分割
///
/// カンマ区切りで分割し、各要素の前後の空白を除去します。空要素は捨てます。
pub(crate) fn split_image_refs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// セル値が画像参照リストかどうかの判定
///
/// 値の末尾（カンマ区切りの場合は最後の要素）が画像拡張子で終わる場合に
/// 真を返します。末尾がテキストの値はステップ記述として扱われます。
pub(crate) fn looks_like_image_list(value: &str) -> bool {
    has_image_extension(value)
}
