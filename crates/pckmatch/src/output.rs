use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pckmatch_convert::Value;
use pckmatch_find::{IndexEntry, IndexHeader};
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
struct FrameOutput {
    index: usize,
    size: usize,
    hex: String,
}

#[derive(Serialize)]
struct FieldOutput<'a> {
    name: &'a str,
    kind: &'a str,
    value: &'a Value,
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    index: usize,
    size: usize,
    fields: Vec<FieldOutput<'a>>,
}

/// Prints frames as they arrive; the table format is flushed by `finish`.
pub struct FramePrinter {
    format: OutputFormat,
    table: Table,
    rows: usize,
}

impl FramePrinter {
    pub fn new(format: OutputFormat, header: &[&str]) -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header.to_vec());
        Self {
            format,
            table,
            rows: 0,
        }
    }

    pub fn frame(&mut self, index: usize, frame: &[u8]) {
        match self.format {
            OutputFormat::Json => print_json(&FrameOutput {
                index,
                size: frame.len(),
                hex: hex::encode(frame),
            }),
            OutputFormat::Table => self.row(vec![
                index.to_string(),
                frame.len().to_string(),
                hex::encode(frame),
            ]),
            OutputFormat::Pretty => {
                println!("frame={index} size={} data={}", frame.len(), preview(frame));
            }
            OutputFormat::Raw => print_raw(frame),
        }
    }

    pub fn fields(&mut self, index: usize, size: usize, entries: &[(&str, &Value)]) {
        match self.format {
            OutputFormat::Json => print_json(&DecodedOutput {
                index,
                size,
                fields: entries
                    .iter()
                    .map(|(name, value)| FieldOutput {
                        name,
                        kind: value.type_name(),
                        value,
                    })
                    .collect(),
            }),
            OutputFormat::Table => {
                for (name, value) in entries {
                    self.row(vec![
                        index.to_string(),
                        (*name).to_string(),
                        value.type_name().to_string(),
                        value.to_string(),
                    ]);
                }
            }
            OutputFormat::Pretty => {
                let line: Vec<String> = entries
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                println!("frame={index} size={size} {}", line.join(" "));
            }
            OutputFormat::Raw => {
                for (name, value) in entries {
                    println!("{name}\t{value}");
                }
            }
        }
    }

    pub fn finish(self) -> usize {
        if matches!(self.format, OutputFormat::Table) && self.rows > 0 {
            println!("{}", self.table);
        }
        self.rows
    }

    fn row(&mut self, cells: Vec<String>) {
        self.table.add_row(cells);
        self.rows += 1;
    }
}

#[derive(Serialize)]
struct IndexOutput<'a> {
    path: &'a str,
    records: usize,
    keys: u32,
    key_size: usize,
    pos_size: usize,
    version: &'a str,
    size: u32,
}

pub fn print_index(path: &str, records: usize, header: &IndexHeader, format: OutputFormat) {
    let out = IndexOutput {
        path,
        records,
        keys: header.key_count,
        key_size: header.key_size,
        pos_size: header.pos_size,
        version: &header.version,
        size: header.idx_end,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["INDEX", "RECORDS", "KEYS", "KEY SIZE", "POS SIZE", "VERSION"])
                .add_row(vec![
                    out.path.to_string(),
                    out.records.to_string(),
                    out.keys.to_string(),
                    out.key_size.to_string(),
                    out.pos_size.to_string(),
                    out.version.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!(
            "index={} records={} keys={} key_size={} pos_size={} version={} size={}",
            out.path, out.records, out.keys, out.key_size, out.pos_size, out.version, out.size
        ),
    }
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    key: &'a str,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<String>,
}

pub fn print_lookup(key: &str, hit: Option<(&IndexEntry, &[u8])>, format: OutputFormat) {
    let out = LookupOutput {
        key,
        found: hit.is_some(),
        entry_key: hit.map(|(entry, _)| hex::encode(&entry.key)),
        position: hit.map(|(entry, _)| entry.position),
        record: hit.map(|(_, record)| String::from_utf8_lossy(record).into_owned()),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["KEY", "ENTRY", "POSITION", "RECORD"])
                .add_row(vec![
                    out.key.to_string(),
                    out.entry_key.clone().unwrap_or_else(|| "-".into()),
                    out.position.map_or_else(|| "-".into(), |p| p.to_string()),
                    out.record.clone().unwrap_or_else(|| "-".into()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match &out.record {
            Some(record) => println!("key={} record={record}", out.key),
            None => println!("key={} not found", out.key),
        },
        OutputFormat::Raw => {
            if let Some((_, record)) = hit {
                print_raw(record);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn preview(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => hex::encode(data),
    }
}
