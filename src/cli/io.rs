//! JSON output for the CLI
//!
//! - Output: one JSON object per line on stdout
//! - Logs and progress go to stderr, never here

use std::io::{self, Write};

use serde::Serialize;

use super::errors::CliResult;

/// Write a completed command's summary to stdout
pub fn write_summary<T: Serialize>(command: &str, summary: &T) -> CliResult<()> {
    let stdout = io::stdout();
    write_summary_to(&mut stdout.lock(), command, summary)
}

/// Write a summary line to any writer
pub fn write_summary_to<W: Write, T: Serialize>(out: &mut W, command: &str, summary: &T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "command": command,
        "data": summary
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::DumpSummary;

    #[test]
    fn test_summary_line() {
        let mut out = Vec::new();
        let summary = DumpSummary {
            documents: 3,
            failed: 0,
            chunks: 1,
            max_queued: 0,
        };
        write_summary_to(&mut out, "dump", &summary).unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["command"], "dump");
        assert_eq!(value["data"]["documents"], 3);
    }
}
