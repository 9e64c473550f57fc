//! Chronological merge of per-simulation log files.
//!
//! Every log line starts with `<seq>| <timestamp>`. Lines are emitted in
//! ascending timestamp order across files, prefixed with the index of the file
//! they came from. Only one pending line per file is held in memory.
//!
//! A line without its own timestamp (a wrapped message, a stack trace)
//! inherits the timestamp of the line before it in the same file. It is
//! written directly after that line instead of being held back until every
//! other file has drained. Lines before a file's first timestamp sort ahead
//! of all timestamped lines.
use anyhow::{Context, Result};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{BufRead, Write};
use std::sync::LazyLock;

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\|\s*([0-9]+)").expect("valid regex"));

/// Timestamp carried by a log line, if it has one.
pub fn line_timestamp(line: &str) -> Option<u64> {
    TIMESTAMP
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Header label for a log directory: a trailing `logs` component is dropped.
pub fn log_label(run_label: &str) -> &str {
    run_label.strip_suffix("/logs").unwrap_or(run_label)
}

struct LogCursor<R> {
    label: String,
    lines: std::io::Lines<R>,
    pending: Option<String>,
    timestamp: Option<u64>,
}

impl<R: BufRead> LogCursor<R> {
    fn new(label: String, reader: R) -> Self {
        Self {
            label,
            lines: reader.lines(),
            pending: None,
            timestamp: None,
        }
    }

    /// Load the next line. Lines without their own timestamp keep the
    /// previous one so continuations stay attached to their entry.
    fn advance(&mut self) -> Result<bool> {
        match self.lines.next() {
            Some(line) => {
                let line = line.with_context(|| format!("failed to read log `{}`", self.label))?;
                if let Some(stamp) = line_timestamp(&line) {
                    self.timestamp = Some(stamp);
                }
                self.pending = Some(line);
                Ok(true)
            }
            None => {
                self.pending = None;
                Ok(false)
            }
        }
    }
}

/// Write the headers and then every line of every log in timestamp order.
/// Ties go to the lower input index.
pub fn interleave_logs<R, W>(out: &mut W, logs: Vec<(String, R)>) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut cursors: Vec<LogCursor<R>> = logs
        .into_iter()
        .map(|(label, reader)| LogCursor::new(label, reader))
        .collect();

    for (index, cursor) in cursors.iter().enumerate() {
        writeln!(out, "{index}| {}", cursor.label)?;
    }

    let mut queue = BinaryHeap::new();
    for (index, cursor) in cursors.iter_mut().enumerate() {
        if cursor.advance()? {
            queue.push(Reverse((cursor.timestamp, index)));
        }
    }

    while let Some(Reverse((_, index))) = queue.pop() {
        let cursor = &mut cursors[index];
        if let Some(line) = cursor.pending.take() {
            writeln!(out, "{index}|{line}")?;
        }
        if cursor.advance()? {
            queue.push(Reverse((cursor.timestamp, index)));
        }
    }
    log::debug!("interleaved {} log files", cursors.len());
    Ok(())
}
