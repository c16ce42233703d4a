//! Parser Module
//!
//! スプレッドシート解析の2パス実装。
//!
//! - `workbook`: calamineによる値パス（ヘッダーとデータ行の抽出）
//! - `fills`: ZIP + XML直接解析による書式パス（セル塗りつぶし色の抽出）
//!
//! calamineはセルの塗りつぶし色を公開しないため、色はXLSXアーカイブ内の
//! `xl/styles.xml`と`xl/worksheets/*.xml`から直接取得します。

pub(crate) mod fills;
pub(crate) mod workbook;

pub(crate) use fills::SeverityFillParser;
pub(crate) use workbook::FindingsSheet;
