//! CLI Tool
//!
//! Command-line front end for generating a findings report document from a
//! tracker spreadsheet and a template document.

use std::process;

use xlsx2docx::{GeneratorBuilder, XlsxToDocxError};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!(
            "Usage: {} <input.xlsx> <template.docx> <output.docx> [options]",
            args[0]
        );
        eprintln!("\nOptions:");
        eprintln!("  --image-root <dir>       Directory to resolve image references against");
        eprintln!("  --lighten-factor <f>     Blend factor for the third row fill (0.0-1.0)");
        eprintln!("  --json                   Print the generation summary as JSON");
        eprintln!("\nExamples:");
        eprintln!("  {} findings.xlsx template.docx report.docx", args[0]);
        eprintln!(
            "  {} findings.xlsx template.docx report.docx --image-root uploads/images",
            args[0]
        );
        process::exit(1);
    }

    let input_path = &args[1];
    let template_path = &args[2];
    let output_path = &args[3];

    // Parse options
    let mut builder = GeneratorBuilder::new();
    let mut json_output = false;
    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--image-root" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --image-root requires a value");
                    process::exit(1);
                }
                builder = builder.with_image_root(&args[i + 1]);
                i += 2;
            }
            "--lighten-factor" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --lighten-factor requires a value");
                    process::exit(1);
                }
                let factor = args[i + 1].parse::<f64>().unwrap_or_else(|_| {
                    eprintln!("Error: Invalid lighten factor: {}", args[i + 1]);
                    process::exit(1);
                });
                builder = builder.with_lighten_factor(factor);
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            _ => {
                eprintln!("Error: Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
    }

    // Generate the report
    let result = builder
        .build()
        .and_then(|generator| generator.generate(input_path, template_path, output_path));

    match result {
        Ok(summary) => {
            if json_output {
                match serde_json::to_string(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: Failed to serialize summary: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!(
                    "Generation completed: {} -> {} ({} sections, {} images embedded, {} skipped)",
                    input_path,
                    output_path,
                    summary.sections,
                    summary.images_embedded,
                    summary.images_skipped
                );
            }
        }
        Err(e) => {
            handle_error(e);
            process::exit(1);
        }
    }
}

fn handle_error(error: XlsxToDocxError) {
    match error {
        XlsxToDocxError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the files exist and you have permission to access them.");
        }
        XlsxToDocxError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The input may not be a valid Excel file or may be corrupted.");
        }
        XlsxToDocxError::Utf8(utf8_err) => {
            eprintln!("UTF-8 Conversion Error: {}", utf8_err);
            eprintln!("A file contains invalid UTF-8 characters.");
        }
        XlsxToDocxError::Zip(msg) => {
            eprintln!("ZIP Archive Error: {}", msg);
            eprintln!("A file may be corrupted or not a valid ZIP archive.");
        }
        XlsxToDocxError::Xml(msg) => {
            eprintln!("XML Error: {}", msg);
            eprintln!("A file contains malformed XML.");
        }
        XlsxToDocxError::ParseInt(parse_int_err) => {
            eprintln!("Number Parse Error: {}", parse_int_err);
            eprintln!("Failed to parse a number in a file.");
        }
        XlsxToDocxError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check the option values.");
        }
        XlsxToDocxError::MissingColumn(column) => {
            eprintln!("Missing Column: '{}'", column);
            eprintln!("The spreadsheet header row must contain this column.");
        }
        XlsxToDocxError::TemplateMismatch(msg) => {
            eprintln!("Template Mismatch: {}", msg);
            eprintln!(
                "The template must contain a table whose first cell matches a spreadsheet column."
            );
        }
        XlsxToDocxError::Image(msg) => {
            eprintln!("Image Error: {}", msg);
            eprintln!("An image file could not be read or decoded.");
        }
        XlsxToDocxError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("A file violates security constraints (e.g., file size limit).");
        }
    }
}
