//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::Serialize;

/// 列名・フィールド名の正規化
///
/// システム全体の名前照合規則: 前後の空白を除去し、小文字へ変換する。
/// スプレッドシートのヘッダー、テンプレートの行ラベル、特別扱いする列名
/// （`severity` / `proof of concept`）の比較はすべてこの関数を通します。
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 検出事項（finding）1件 = スプレッドシートの1データ行
///
/// 行位置以外の識別子を持ちません。読み込み後は不変です。
#[derive(Debug, Clone, PartialEq)]
pub struct FindingRow {
    /// データ行インデックス（ヘッダー行を除く0始まり）
    pub index: usize,
    /// 列順の値。空セルは空文字列。
    pub values: Vec<String>,
}

impl FindingRow {
    /// 列インデックスで値を取得（範囲外は空文字列）
    pub fn value(&self, col: usize) -> &str {
        self.values.get(col).map(String::as_str).unwrap_or("")
    }
}

/// 証跡テキストの1ステップ
///
/// `Step N:`ラベル付き、またはランニングカウンターで合成されたラベルを持つ
/// テキスト単位です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// ステップラベル（例: `"Step 1:"`、合成時は`"Step3:"`）
    pub label: String,
    /// ステップ本文（前後の空白は除去済み）
    pub body: String,
}

/// 生成処理のサマリー
///
/// `Generator::generate`の戻り値。CLIの進捗報告とサーバーのステータス応答に
/// 使用します。
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationSummary {
    /// 処理したデータ行数
    pub rows: usize,
    /// 生成したセクション数（= 行数）
    pub sections: usize,
    /// 埋め込んだ画像数
    pub images_embedded: usize,
    /// スキップした画像参照数（存在しない、または拡張子不一致）
    pub images_skipped: usize,
}
