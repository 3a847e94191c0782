use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linkprims_frame::Extraction;
use linkprims_reader::Collected;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CollectedOutput<'a> {
    event: &'static str,
    link: &'a str,
    reason: &'static str,
    len: usize,
    discarded: usize,
    scanned: usize,
    elapsed_ms: u64,
    data: String,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    event: &'static str,
    link: &'a str,
    offset: usize,
    wire_size: usize,
    payload_size: usize,
    payload: String,
}

#[derive(Serialize)]
struct MalformedOutput<'a> {
    event: &'static str,
    link: &'a str,
    offset: usize,
    len: usize,
    error: String,
}

/// Timing and outcome of an echo probe.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub link: String,
    pub written: usize,
    pub received: usize,
    pub frames: usize,
    pub malformed: usize,
    pub echo_complete: bool,
    pub write_ms: f64,
    pub finish_ms: f64,
    pub bytes_per_sec: f64,
    pub stop_wait_ms: f64,
    pub stop_confirmed: bool,
}

pub fn print_collected(link: &str, collected: &Collected, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CollectedOutput {
                event: "collected",
                link,
                reason: collected.reason.as_str(),
                len: collected.len(),
                discarded: collected.discarded,
                scanned: collected.scanned,
                elapsed_ms: millis(collected.elapsed) as u64,
                data: preview(&collected.bytes),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["REASON", "LEN", "DISCARDED", "ELAPSED", "DATA"]);
            table.add_row(vec![
                collected.reason.to_string(),
                collected.len().to_string(),
                collected.discarded.to_string(),
                format!("{:.2}s", collected.elapsed.as_secs_f64()),
                preview(&collected.bytes),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{:.2} rv: {} {} ({})",
                collected.elapsed.as_secs_f64(),
                collected.len(),
                preview(&collected.bytes),
                collected.reason
            );
        }
        OutputFormat::Raw => print_raw(&collected.bytes),
    }
}

pub fn print_extraction(link: &str, extraction: &Extraction, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in &extraction.frames {
                print_json(&FrameOutput {
                    event: "frame",
                    link,
                    offset: frame.offset,
                    wire_size: frame.wire_size(),
                    payload_size: frame.payload.len(),
                    payload: preview(&frame.payload),
                });
            }
            for bad in &extraction.malformed {
                print_json(&MalformedOutput {
                    event: "malformed",
                    link,
                    offset: bad.offset,
                    len: bad.raw.len(),
                    error: bad.error.to_string(),
                });
            }
        }
        OutputFormat::Table => {
            if extraction.is_empty() {
                return;
            }
            let mut table = new_table(vec!["OFFSET", "STATUS", "SIZE", "PAYLOAD"]);
            for frame in &extraction.frames {
                table.add_row(vec![
                    frame.offset.to_string(),
                    "decoded".to_string(),
                    frame.payload.len().to_string(),
                    preview(&frame.payload),
                ]);
            }
            for bad in &extraction.malformed {
                table.add_row(vec![
                    bad.offset.to_string(),
                    "malformed".to_string(),
                    bad.raw.len().to_string(),
                    bad.error.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in &extraction.frames {
                println!(" Decoded: {} {}", frame.payload.len(), preview(&frame.payload));
            }
            for bad in &extraction.malformed {
                println!(" Error decoding: {} ({})", bad.raw.len(), bad.error);
            }
            if !extraction.trailing.is_empty() {
                println!(" Drop: {}", extraction.trailing.len());
            }
        }
        OutputFormat::Raw => {
            for payload in extraction.payloads() {
                print_raw(payload);
            }
        }
    }
}

pub fn print_probe(report: &ProbeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            let rows = [
                ("link", report.link.clone()),
                ("written", report.written.to_string()),
                ("received", report.received.to_string()),
                ("frames", report.frames.to_string()),
                ("malformed", report.malformed.to_string()),
                ("echo_complete", report.echo_complete.to_string()),
                ("write", format!("{:.2}ms", report.write_ms)),
                ("finish", format!("{:.2}ms", report.finish_ms)),
                ("rate", format!("{:.3} B/s", report.bytes_per_sec)),
                ("stop_wait", format!("{:.2}ms", report.stop_wait_ms)),
                ("stop_confirmed", report.stop_confirmed.to_string()),
            ];
            for (field, value) in rows {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "  {:.2} for write. {:.2} to finish. rate {:.3}",
                report.write_ms / 1000.0,
                report.finish_ms / 1000.0,
                report.bytes_per_sec
            );
            println!(
                "  echo {} ({} of {} bytes)",
                if report.echo_complete { "complete" } else { "incomplete" },
                report.received,
                report.written
            );
            println!(
                "  wait_stop used {:.2}{}",
                report.stop_wait_ms / 1000.0,
                if report.stop_confirmed { "" } else { " (not confirmed)" }
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Printable rendering of received bytes; non-ASCII and control bytes are escaped.
fn preview(data: &[u8]) -> String {
    data.escape_ascii().to_string()
}
