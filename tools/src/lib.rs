//! Inspection and maintenance tools for snapdelta demos.
//!
//! - Summarize a demo's metadata and records
//! - Identify snapshot frames and their sections
//! - Parse `key=value` metadata assignments

use std::io::Read;

use bitstream::ByteReader;
use demo::{DemoConfig, DemoError, DemoMetadata, DemoPlayer, DemoRead, DemoResult};
use serde::Serialize;
use wire::SectionTag;

/// Summary of a whole demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoReport {
    pub metadata: Vec<(String, String)>,
    pub metadata_max_size: usize,
    pub records: Vec<RecordReport>,
    /// Sum of record payload sizes.
    pub payload_bytes: u64,
    /// `false` if the demo ended without the end-of-stream marker.
    pub complete: bool,
}

/// Summary of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub index: u64,
    pub len: usize,
    /// Present if the record parses as a snapshot frame.
    pub frame: Option<FrameReport>,
}

/// Header and section summary of a snapshot frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub kind: &'static str,
    pub tick: u32,
    pub baseline_tick: u32,
    pub schema_hash: u64,
    /// Whether the frame matches the supplied schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_matches: Option<bool>,
    pub config_strings: usize,
    pub entity_entries: usize,
    pub sections: Vec<SectionReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub tag: &'static str,
    pub len: usize,
}

/// Reads every record of a demo.
///
/// A demo cut short is reported as incomplete rather than as an error.
pub fn inspect_demo<R: Read>(
    reader: R,
    config: &DemoConfig,
    schema_hash: Option<u64>,
) -> DemoResult<DemoReport> {
    let mut player = DemoPlayer::open(reader, config)?;
    let mut msg = bitstream::MessageBuffer::new(config.max_message_size);
    let mut records = Vec::new();
    let mut payload_bytes = 0u64;
    let complete = loop {
        match player.read_message(&mut msg) {
            Ok(DemoRead::Message) => {
                payload_bytes += msg.cursize() as u64;
                records.push(RecordReport {
                    index: records.len() as u64,
                    len: msg.cursize(),
                    frame: inspect_frame(msg.as_bytes(), &config.wire, schema_hash),
                });
            }
            Ok(DemoRead::EndOfStream) => break true,
            Err(DemoError::Truncated { records: read }) => {
                tracing::warn!(records = read, "demo ends without end marker");
                break false;
            }
            Err(err) => return Err(err),
        }
    };
    Ok(DemoReport {
        metadata: player
            .metadata()
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
        metadata_max_size: player.metadata_max_size(),
        records,
        payload_bytes,
        complete,
    })
}

/// Summarizes `bytes` as a snapshot frame, or `None` if it is not one.
pub fn inspect_frame(
    bytes: &[u8],
    limits: &wire::Limits,
    schema_hash: Option<u64>,
) -> Option<FrameReport> {
    let message = wire::decode_message(bytes, limits).ok()?;
    let header = message.header;
    let kind = if header.flags.is_bootstrap() {
        "bootstrap"
    } else if header.flags.is_delta_snapshot() {
        "delta"
    } else {
        "full"
    };
    let config_strings = message
        .section(SectionTag::ConfigStrings)
        .and_then(|body| ByteReader::new(body).read_varu32().ok())
        .unwrap_or(0);
    let entity_entries = message
        .section(SectionTag::Entities)
        .and_then(|body| ByteReader::new(body).read_varu32().ok())
        .unwrap_or(0);
    let sections = message
        .sections
        .iter()
        .map(|section| SectionReport {
            tag: section_name(section.tag),
            len: section.body.len(),
        })
        .collect();
    Some(FrameReport {
        kind,
        tick: header.tick,
        baseline_tick: header.baseline_tick,
        schema_hash: header.schema_hash,
        schema_matches: schema_hash.map(|hash| hash == header.schema_hash),
        config_strings: config_strings as usize,
        entity_entries: entity_entries as usize,
        sections,
    })
}

const fn section_name(tag: SectionTag) -> &'static str {
    match tag {
        SectionTag::ConfigStrings => "config_strings",
        SectionTag::Entities => "entities",
    }
}

/// Renders a report for terminal output.
#[must_use]
pub fn format_report(report: &DemoReport) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "metadata ({} of {} bytes):",
        report
            .metadata
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum::<usize>(),
        report.metadata_max_size
    );
    for (key, value) in &report.metadata {
        let _ = writeln!(out, "  {key} = {value}");
    }
    let _ = writeln!(
        out,
        "records: {} ({} bytes){}",
        report.records.len(),
        report.payload_bytes,
        if report.complete { "" } else { " [truncated]" }
    );
    for record in &report.records {
        match &record.frame {
            Some(frame) => {
                let mismatch = if frame.schema_matches == Some(false) {
                    " schema mismatch"
                } else {
                    ""
                };
                let _ = writeln!(
                    out,
                    "  #{:<5} {:>6} bytes  {:<9} tick {} base {}  entries {}  config {}{mismatch}",
                    record.index,
                    record.len,
                    frame.kind,
                    frame.tick,
                    frame.baseline_tick,
                    frame.entity_entries,
                    frame.config_strings,
                );
            }
            None => {
                let _ = writeln!(out, "  #{:<5} {:>6} bytes  raw", record.index, record.len);
            }
        }
    }
    out
}

/// Parses a `key=value` argument. An empty value removes the key.
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected key=value, got '{arg}'")),
    }
}

/// Applies parsed assignments to `metadata`.
pub fn apply_assignments(
    metadata: &mut DemoMetadata,
    assignments: &[(String, String)],
) -> Result<(), demo::MetadataError> {
    for (key, value) in assignments {
        if value.is_empty() {
            metadata.remove(key);
        } else {
            metadata.set(key.as_str(), value.as_str())?;
        }
    }
    Ok(())
}
