//! Color Utility Module
//!
//! 重大度（Severity）セルの塗りつぶし色を扱うためのRGBカラー型を定義する。
//! 色の明色化（lighten）は純関数として実装され、副作用を持ちません。

/// 24bit RGBカラー
///
/// スプレッドシートのセル塗りつぶしから取得した色、およびその明色化バリアントを
/// 表現します。16進表記（`RRGGBB`）との相互変換を提供します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// 新しいRGBカラーを生成
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 16進文字列からRGBカラーを解析
    ///
    /// 先頭の`#`は無視されます。8桁（`AARRGGBB`、openpyxl形式）の場合は
    /// 先頭のアルファ2桁を捨てて下位6桁を使用します。
    /// 6桁/8桁以外の長さ、または16進数として不正な文字列は`None`を返します
    /// （エラーにはしません。色は「存在しない」として扱われます）。
    ///
    /// # 引数
    ///
    /// * `hex` - 16進カラー文字列（例: `"FF0000"`, `"#ff0000"`, `"FFFF0000"`）
    ///
    /// # 戻り値
    ///
    /// * `Some(RgbColor)` - 解析に成功した場合
    /// * `None` - 形式が不正な場合
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');

        // AARRGGBB形式はアルファを捨ててRRGGBBへ
        let hex = match hex.len() {
            6 => hex,
            8 => &hex[2..],
            _ => return None,
        };

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// 色を白方向へ明色化する
    ///
    /// 各チャンネルを`factor`の割合だけ255へ近づけます。結果は255でクランプ
    /// されます。`factor`が[0,1]の範囲であれば、結果は`factor`について単調
    /// 非減少です。
    ///
    /// # 引数
    ///
    /// * `factor` - ブレンド係数（0.0で元の色のまま、1.0で白）
    pub fn lighten(&self, factor: f64) -> Self {
        let blend = |c: u8| -> u8 {
            let c = c as f64;
            let lightened = c + (255.0 - c) * factor;
            lightened.min(255.0) as u8
        };
        Self {
            r: blend(self.r),
            g: blend(self.g),
            b: blend(self.b),
        }
    }

    /// 小文字16進表記（`rrggbb`）へ変換
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// デフォルトのブレンド係数
///
/// 3行目（`i == 2`）の背景に使用する明色化バリアントの係数。
pub const DEFAULT_LIGHTEN_FACTOR: f64 = 0.4;
