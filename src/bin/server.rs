//! Web Upload Server
//!
//! Thin HTTP front end for the report generator. Serves an upload form,
//! stages the uploaded tracker, template, and image folder on disk, runs the
//! CLI binary as a subprocess, and returns the produced document as a
//! download.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::Mutex;

/// 一時保存先ディレクトリ
const UPLOAD_DIR: &str = "uploads";
const IMAGE_DIR: &str = "path";
const OUTPUT_FILE: &str = "Final_output.docx";

/// アップロードの合計サイズ上限（バイト）
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// 共有の作業ディレクトリを直列化するための状態
struct AppState {
    generation: Mutex<()>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let app_state = Arc::new(AppState {
        generation: Mutex::new(()),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_index))
        .route("/generate", post(generate_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind("0.0.0.0:5000").await?;
    println!("Listening on http://0.0.0.0:5000");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    // 作業ディレクトリを共有するため、生成は同時に1件のみ
    let _guard = state.generation.lock().await;

    let mut excel_data: Option<Vec<u8>> = None;
    let mut template_data: Option<Vec<u8>> = None;
    let mut image_files: Vec<(String, Vec<u8>)> = Vec::new();

    // 1. マルチパートフォームの各フィールドを読み込む
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_page(&format!("Failed to read upload: {}", e)),
        };

        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().unwrap_or("").to_string();

        match name.as_str() {
            "excel_file" => {
                if !has_extension(&file_name, &["xlsx"]) {
                    return error_page("Invalid file types! Excel sheet must be .xlsx.");
                }
                match field.bytes().await {
                    Ok(bytes) => excel_data = Some(bytes.to_vec()),
                    Err(e) => return error_page(&format!("Failed to read upload: {}", e)),
                }
            }
            "template_file" => {
                if !has_extension(&file_name, &["docx"]) {
                    return error_page("Invalid file types! The template must be .docx.");
                }
                match field.bytes().await {
                    Ok(bytes) => template_data = Some(bytes.to_vec()),
                    Err(e) => return error_page(&format!("Failed to read upload: {}", e)),
                }
            }
            "image_folder" => {
                if file_name.is_empty() {
                    continue;
                }
                // 拡張子が許可外のファイルは警告してスキップ
                if !has_extension(&file_name, &["png", "jpg", "jpeg"]) {
                    log::warn!("Skipped invalid file: {}", file_name);
                    continue;
                }
                match field.bytes().await {
                    Ok(bytes) => image_files.push((file_name, bytes.to_vec())),
                    Err(e) => return error_page(&format!("Failed to read upload: {}", e)),
                }
            }
            _ => {}
        }
    }

    let excel_data = match excel_data {
        Some(data) if !data.is_empty() => data,
        _ => return error_page("Please upload the Excel sheet and the Word template!"),
    };
    let template_data = match template_data {
        Some(data) if !data.is_empty() => data,
        _ => return error_page("Please upload the Excel sheet and the Word template!"),
    };

    // 2. アップロードをディスクへ保存する
    if let Err(e) = stage_uploads(&excel_data, &template_data, &image_files).await {
        return error_page(&format!("Failed to stage uploads: {}", e));
    }

    // 3. 生成はCLIバイナリのサブプロセスとして実行する
    let cli = match cli_binary_path() {
        Ok(path) => path,
        Err(e) => return error_page(&format!("Generator binary not found: {}", e)),
    };

    // セル中の画像参照はステージング先のフォルダー名を含む「path/...」表記
    // なので、解決基点は作業ディレクトリのまま（CLIのデフォルト）にする
    let output = Command::new(&cli)
        .arg(Path::new(UPLOAD_DIR).join("data.xlsx"))
        .arg(Path::new(UPLOAD_DIR).join("template.docx"))
        .arg(OUTPUT_FILE)
        .output()
        .await;

    match output {
        Ok(result) if result.status.success() => {
            log::info!(
                "Generator output: {}",
                String::from_utf8_lossy(&result.stdout).trim()
            );
        }
        Ok(result) => {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return error_page(&format!("Error generating document: {}", stderr.trim()));
        }
        Err(e) => return error_page(&format!("Failed to run the generator: {}", e)),
    }

    // 4. 生成したファイルをダウンロードとして返す
    let output = match tokio::fs::read(OUTPUT_FILE).await {
        Ok(bytes) => bytes,
        Err(e) => return error_page(&format!("Output file could not be read: {}", e)),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", OUTPUT_FILE),
        )
        .body(axum::body::Body::from(output))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// 同じディレクトリに置かれたCLIバイナリのパスを解決する
fn cli_binary_path() -> std::io::Result<PathBuf> {
    let current = std::env::current_exe()?;
    let dir = current.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "executable has no parent")
    })?;
    let name = format!("xlsx2docx{}", std::env::consts::EXE_SUFFIX);
    Ok(dir.join(name))
}

/// アップロードを固定のファイル名で保存し、画像フォルダを展開する
async fn stage_uploads(
    excel_data: &[u8],
    template_data: &[u8],
    image_files: &[(String, Vec<u8>)],
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(UPLOAD_DIR).await?;
    tokio::fs::write(Path::new(UPLOAD_DIR).join("data.xlsx"), excel_data).await?;
    tokio::fs::write(Path::new(UPLOAD_DIR).join("template.docx"), template_data).await?;

    // 前回の画像を消してから展開する
    if tokio::fs::metadata(IMAGE_DIR).await.is_ok() {
        tokio::fs::remove_dir_all(IMAGE_DIR).await?;
    }
    tokio::fs::create_dir_all(IMAGE_DIR).await?;

    for (file_name, data) in image_files {
        let relative = match sanitize_relative_path(file_name) {
            Some(path) => path,
            None => {
                log::warn!("Skipped unsafe image path: {}", file_name);
                continue;
            }
        };

        let target = Path::new(IMAGE_DIR).join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, data).await?;
    }

    Ok(())
}

/// アップロードされたファイル名を安全な相対パスへ正規化する
///
/// ブラウザはフォルダ名付きのパスを送るため、先頭の`path/`要素を取り除き、
/// 親ディレクトリ参照や絶対パスを含むものは拒否します。
fn sanitize_relative_path(file_name: &str) -> Option<PathBuf> {
    let normalized = file_name.replace('\\', "/");
    let trimmed = normalized
        .strip_prefix("path/")
        .unwrap_or(normalized.as_str());

    let path = Path::new(trimmed);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

fn has_extension(file_name: &str, allowed: &[&str]) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => allowed.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

fn error_page(message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html><html><body><p>{}</p><p><a href=\"/\">Back</a></p></body></html>",
        html_escape(message)
    );
    (StatusCode::BAD_REQUEST, Html(body)).into_response()
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
