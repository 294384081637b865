use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use pckmatch_split::{Framing, ScanConfig, Splitter, DEFAULT_MAX_BUFFER};

use crate::exit::{io_error, split_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod find;
pub mod index;
pub mod split;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cut a stream into frames and print them.
    Split(SplitArgs),
    /// Cut a stream into frames and decode each one with a layout.
    #[command(name = "match")]
    Match(MatchArgs),
    /// Build a sorted key index file.
    Index(IndexArgs),
    /// Look up a key in an index file.
    Find(FindArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Split(args) => split::run(args, format),
        Command::Match(args) => decode::run(args, format),
        Command::Index(args) => index::run(args, format),
        Command::Find(args) => find::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct FramingArgs {
    /// Layout file providing the framing rule.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["start", "end", "size"])]
    pub layout: Option<PathBuf>,
    /// Token opening each frame.
    #[arg(long, requires = "end")]
    pub start: Option<String>,
    /// Token closing each frame.
    #[arg(long, conflicts_with = "size")]
    pub end: Option<String>,
    /// Fixed frame size in bytes.
    #[arg(long)]
    pub size: Option<usize>,
    /// Emit a short fixed-size frame after this long (e.g. 500ms, 2s).
    #[arg(long, requires = "size")]
    pub interval: Option<String>,
    /// Read --start and --end as hex digits.
    #[arg(long)]
    pub hex: bool,
}

impl FramingArgs {
    pub fn splitter(&self) -> CliResult<Splitter> {
        if let Some(path) = &self.layout {
            let layout = pckmatch_layout::Layout::from_file(path)
                .map_err(|err| crate::exit::layout_error("layout load failed", err))?;
            return layout
                .splitter()
                .map_err(|err| crate::exit::layout_error("invalid layout framing", err));
        }

        let framing = if let Some(size) = self.size {
            let interval = self.interval.as_deref().map(parse_interval).transpose()?;
            Framing::fixed(size, interval)
        } else if let Some(end) = &self.end {
            let end = self.token("end", end)?;
            let start = self
                .start
                .as_deref()
                .map(|start| self.token("start", start))
                .transpose()?;
            Framing::from_tokens(start.as_deref(), &end)
        } else {
            return Err(CliError::new(
                USAGE,
                "one of --layout, --end or --size is required",
            ));
        };
        framing
            .map(|framing| framing.splitter())
            .map_err(|err| split_error("invalid framing", err))
    }

    fn token(&self, role: &str, text: &str) -> CliResult<Vec<u8>> {
        if !self.hex {
            return Ok(text.as_bytes().to_vec());
        }
        hex::decode(text)
            .map_err(|err| CliError::new(USAGE, format!("invalid --{role} hex token {text:?}: {err}")))
    }
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input file. Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,
    #[command(flatten)]
    pub framing: FramingArgs,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Maximum bytes buffered while looking for a frame boundary.
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER)]
    pub max_buffer: usize,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Input file. Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,
    /// Layout file with the framing rule and message fields.
    #[arg(long, value_name = "FILE", required = true)]
    pub layout: PathBuf,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Maximum bytes buffered while looking for a frame boundary.
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER)]
    pub max_buffer: usize,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Records file, one record per line.
    #[arg(long, value_name = "FILE")]
    pub records: PathBuf,
    /// Keys file, one `HEXKEY RECORD_LINE` pair per line (lines from 0).
    #[arg(long, value_name = "FILE")]
    pub keys: PathBuf,
    /// Index file to write.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
    /// Key width in bytes (1-31).
    #[arg(long, default_value_t = 4)]
    pub key_size: usize,
    /// Record offset width in bytes (2-4).
    #[arg(long, default_value_t = 4)]
    pub pos_size: usize,
    /// Version stamp, eight hex digits. Defaults to today as YYMMDD00.
    #[arg(long)]
    pub stamp: Option<String>,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Index file.
    pub index: PathBuf,
    /// Key to look up, in hex unless --text is given.
    pub key: String,
    /// Take the key as text.
    #[arg(long)]
    pub text: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read + Send>> {
    match path {
        None => Ok(Box::new(std::io::stdin())),
        Some(path) if path == Path::new("-") => Ok(Box::new(std::io::stdin())),
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

pub(crate) fn scan_config(max_buffer: usize) -> ScanConfig {
    ScanConfig {
        max_buffer_size: max_buffer,
        ..ScanConfig::default()
    }
}

fn parse_interval(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid interval: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "interval must be greater than zero"));
    }

    Ok(match unit {
        "s" => Duration::from_secs(value),
        _ => Duration::from_millis(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framing(hex: bool, start: Option<&str>, end: Option<&str>, size: Option<usize>) -> FramingArgs {
        FramingArgs {
            layout: None,
            start: start.map(str::to_owned),
            end: end.map(str::to_owned),
            size,
            interval: None,
            hex,
        }
    }

    #[test]
    fn interval_units() {
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("40").unwrap(), Duration::from_millis(40));
        assert_eq!(parse_interval("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_interval("soon").unwrap_err().code, USAGE);
    }

    #[test]
    fn framing_from_flags() {
        let splitter = framing(true, Some("7e"), Some("7e"), None).splitter().unwrap();
        assert_eq!(splitter.framing(), &Framing::same_token(vec![0x7e]).unwrap());

        let splitter = framing(false, None, Some("\n"), None).splitter().unwrap();
        assert_eq!(splitter.framing(), &Framing::end_only(b"\n".to_vec()).unwrap());

        let splitter = framing(false, None, None, Some(8)).splitter().unwrap();
        assert_eq!(splitter.framing(), &Framing::fixed(8, None).unwrap());
    }

    #[test]
    fn framing_errors_are_usage() {
        assert_eq!(framing(false, None, None, None).splitter().unwrap_err().code, USAGE);
        assert_eq!(framing(true, None, Some("xy"), None).splitter().unwrap_err().code, USAGE);
        assert_eq!(framing(false, None, None, Some(0)).splitter().unwrap_err().code, USAGE);
    }
}
