//! Output formatting utilities for CLI commands.

mod table;

pub use table::{Alignment, Column, Table, TableStyle};

use std::io::{self, Write};

use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Write a value as pretty JSON followed by a newline.
pub fn write_json<T: Serialize, W: Write>(mut writer: W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Print text or JSON depending on `format`.
///
/// `text` is only evaluated for [`OutputFormat::Text`].
pub fn emit<T, F>(format: OutputFormat, value: &T, text: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut out, value),
        OutputFormat::Text => {
            let rendered = text(value);
            write!(out, "{rendered}")?;
            if !rendered.ends_with('\n') {
                writeln!(out)?;
            }
            Ok(())
        }
    }
}
