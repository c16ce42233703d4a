//! DOCX Module
//!
//! WordprocessingML（DOCX）の読み書きを実装するモジュール。
//!
//! - `model`: 生成するセクションの文書モデル
//! - `style`: セル書式・罫線・箇条書きのスタイルユーティリティ
//! - `wml`: 文書モデルからWordprocessingML断片へのレンダリング
//! - `template`: テンプレートDOCXの読み込みと本文の分割
//! - `writer`: 出力DOCXアーカイブの組み立て
//!
//! 専用のDOCXクレートは使用せず、XLSX側と同じzip + quick-xmlの構成で
//! アーカイブとXMLを直接扱います。

pub(crate) mod model;
pub(crate) mod style;
pub(crate) mod template;
pub(crate) mod wml;
pub(crate) mod writer;
