//! Result report output in JSON and JSONL.
//!
//! JSONL streams one `ProcessResult` per line as results arrive and ends
//! with a `{"summary": ...}` line. JSON buffers the results and writes a
//! single `{"results": [...], "summary": {...}}` document on `finish`.

use serde::Serialize;
use std::io::{self, Write};

use crate::types::{BatchSummary, ProcessResult};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One report document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    results: &'a [ProcessResult],
    summary: &'a BatchSummary,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a BatchSummary,
}

/// Writes batch results as a report.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<ProcessResult>,
    results_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            results_written: 0,
        }
    }

    /// Record one result. JSONL writes it immediately; JSON holds it
    /// until `finish`.
    pub fn write_result(&mut self, result: &ProcessResult) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.pending.push(result.clone()),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, result).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.results_written += 1;
        Ok(())
    }

    /// Write the summary (and, for JSON, the buffered results) and flush.
    pub fn finish(&mut self, summary: &BatchSummary) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let pending = std::mem::take(&mut self.pending);
                let report = Report {
                    results: &pending,
                    summary,
                };
                self.write_value(&report)?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, &SummaryLine { summary })
                    .map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()
    }

    /// Write any serializable value as one document, honoring `pretty`.
    pub fn write_value<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Number of results recorded so far.
    pub fn results_written(&self) -> usize {
        self.results_written
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
