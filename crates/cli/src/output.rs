// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Prints `rows` as a JSON array, or as one line per row via
/// `format_row` when `format` is [`OutputFormat::Text`].
pub fn print_rows<T: Serialize>(rows: &[T], format: OutputFormat, format_row: impl Fn(&T) -> String) {
    match format {
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("(none)");
            }
            for row in rows {
                println!("{}", format_row(row));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string()));
        }
    }
}

pub fn print_ok<T: Serialize>(value: &T, format: OutputFormat, text: impl Fn() -> String) {
    match format {
        OutputFormat::Text => println!("{}", text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())),
    }
}
