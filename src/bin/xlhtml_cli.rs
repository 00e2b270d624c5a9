//! CLI tool for xlhtml - renders XLSX sheets as HTML
//!
//! Usage:
//!   xlhtml_cli <input.xlsx>                      # All sheets to stdout
//!   xlhtml_cli <input.xlsx> -o out.html          # Write to a file
//!   xlhtml_cli <input.xlsx> --sheet 2            # Only the third sheet
//!   xlhtml_cli <input.xlsx> --config opts.json   # RenderOptions as JSON

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

use xlhtml::parser::parse_with;
use xlhtml::{HtmlPage, RenderOptions, SheetRenderer};

const USAGE: &str = "Usage: xlhtml_cli <input.xlsx> [-o output.html] [--sheet N] [--config options.json]";

struct Args {
    input: String,
    output: Option<String>,
    sheet: Option<usize>,
    config: Option<String>,
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn parse_args(args: &[String]) -> Args {
    let mut input = None;
    let mut output = None;
    let mut sheet = None;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .cloned()
                .unwrap_or_else(|| fail(&format!("Missing value for {flag}\n{USAGE}")))
        };
        match flag {
            "-o" | "--output" => output = Some(value()),
            "--sheet" => {
                let raw = value();
                sheet = Some(
                    raw.parse()
                        .unwrap_or_else(|_| fail(&format!("Invalid sheet index: {raw}"))),
                );
            }
            "--config" => config = Some(value()),
            "-h" | "--help" => {
                println!("{USAGE}");
                process::exit(0);
            }
            _ if input.is_none() && !flag.starts_with('-') => input = Some(flag.to_string()),
            _ => fail(&format!("Unexpected argument: {flag}\n{USAGE}")),
        }
        i += 1;
    }

    Args {
        input: input.unwrap_or_else(|| fail(USAGE)),
        output,
        sheet,
        config,
    }
}

/// Options whose class prefixes are unique to one sheet, so pages can share
/// a document.
fn scoped_options(options: &RenderOptions, index: usize) -> RenderOptions {
    let mut scoped = options.clone();
    scoped.cell_class_prefix = format!("{}{index}", options.cell_class_prefix);
    scoped.container_class_prefix = format!("{}{index}", options.container_class_prefix);
    scoped.value_class_prefix = format!("{}{index}", options.value_class_prefix);
    scoped
}

fn join_pages(pages: &[HtmlPage]) -> String {
    if let [page] = pages {
        return page
            .to_html()
            .unwrap_or_else(|e| fail(&format!("Error rendering HTML: {e}")));
    }
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n");
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str("\n<hr>\n");
        }
        let body = page
            .body_html()
            .unwrap_or_else(|e| fail(&format!("Error rendering HTML: {e}")));
        out.push_str(&format!("<section>\n<style>\n{}\n</style>\n{body}\n</section>", page.stylesheet()));
    }
    out.push_str("\n</body>\n</html>\n");
    out
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args);

    let options = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(&format!("Error reading {path}: {e}")));
            RenderOptions::from_json_str(&json)
                .unwrap_or_else(|e| fail(&format!("Invalid config {path}: {e}")))
        }
        None => RenderOptions::default(),
    };

    // Read input file
    let data = fs::read(&args.input)
        .unwrap_or_else(|e| fail(&format!("Error reading {}: {e}", args.input)));

    // Parse XLSX
    let workbook = parse_with(&data, options.load_pictures)
        .unwrap_or_else(|e| fail(&format!("Error parsing XLSX: {e}")));

    let pages = match args.sheet {
        Some(index) => vec![SheetRenderer::new(&workbook, &options)
            .render(index)
            .unwrap_or_else(|e| fail(&format!("Error rendering sheet {index}: {e}")))],
        None => (0..workbook.sheets.len())
            .map(|index| {
                let scoped = scoped_options(&options, index);
                SheetRenderer::new(&workbook, &scoped)
                    .render(index)
                    .unwrap_or_else(|e| fail(&format!("Error rendering sheet {index}: {e}")))
            })
            .collect(),
    };
    let html = join_pages(&pages);

    // Output
    match args.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, &html) {
                fail(&format!("Error writing {path}: {e}"));
            }
            eprintln!("Written: {path}");
        }
        None => {
            if let Err(e) = io::stdout().write_all(html.as_bytes()) {
                fail(&format!("Error writing output: {e}"));
            }
        }
    }
}
