//! Rendering of command results
//!
//! Human output is line-oriented with status markers. JSON output prints one
//! document per result: status lines become small objects, item lists become
//! arrays, and informational detail lines are dropped.

use filecast_core::domain::FileItem;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("\u{2713} {message}"),
            OutputFormat::Json => println!("{}", json!({"success": true, "message": message})),
        }
    }

    /// Status for a failure that ends the command without an error exit
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{2717} Error: {message}"),
            OutputFormat::Json => eprintln!("{}", json!({"success": false, "error": message})),
        }
    }

    pub fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {message}"),
            OutputFormat::Json => eprintln!("{}", json!({"level": "warning", "message": message})),
        }
    }

    /// Indented detail line; human output only
    pub fn info(&self, message: &str) {
        if !self.is_json() {
            println!("  {message}");
        }
    }

    /// Pretty JSON document; JSON output only
    pub fn print_json(&self, value: &Value) {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        }
    }

    pub fn print_items(&self, items: &[FileItem]) {
        if self.is_json() {
            self.print_json(&serde_json::to_value(items).unwrap_or_default());
        } else if items.is_empty() {
            self.info("(empty)");
        } else {
            for item in items {
                self.info(&item_row(item));
            }
        }
    }
}

/// One listing row: kind marker, size, content type, name
fn item_row(item: &FileItem) -> String {
    let marker = if item.is_directory() { 'd' } else { '-' };
    let size = item.formatted_size().unwrap_or_default();
    let kind = item.content_type().map(|c| c.as_str()).unwrap_or("");
    format!("{marker} {size:>10}  {kind:<8}  {}", item.name())
}
