use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pckmatch_find::{Builder, BuilderConfig, KeyPair};
use tracing::info;

use crate::cmd::IndexArgs;
use crate::exit::{find_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_index, OutputFormat};

pub fn run(args: IndexArgs, format: OutputFormat) -> CliResult<i32> {
    let records = read_lines(&args.records)?;
    let keys = parse_keys(&read_lines(&args.keys)?)?;

    let builder = Builder::new(BuilderConfig {
        key_size: args.key_size,
        pos_size: args.pos_size,
        version: args.stamp,
    })
    .map_err(|err| find_error("invalid index sizes", err))?;

    let out_context = format!("write {}", args.output.display());
    let file = File::create(&args.output).map_err(|err| io_error(&out_context, err))?;
    let mut writer = BufWriter::new(file);
    let header = builder
        .build(&mut writer, &records, &keys)
        .map_err(|err| find_error("index build failed", err))?;
    writer.flush().map_err(|err| io_error(&out_context, err))?;

    info!(records = records.len(), keys = keys.len(), "index written");
    print_index(
        &args.output.display().to_string(),
        records.len(),
        &header,
        format,
    );
    Ok(SUCCESS)
}

fn read_lines(path: &Path) -> CliResult<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_owned())
        .collect())
}

/// Parse `HEXKEY RECORD` lines. Blank lines and `#` comments are skipped.
fn parse_keys(lines: &[String]) -> CliResult<Vec<KeyPair>> {
    let mut keys = Vec::with_capacity(lines.len());
    for (n, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let invalid = |reason: &str| {
            CliError::new(DATA_INVALID, format!("keys line {}: {reason}: {line:?}", n + 1))
        };
        let mut parts = line.split_whitespace();
        let (Some(key), Some(record), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected `HEXKEY RECORD`"));
        };
        let key = hex::decode(key).map_err(|_| invalid("key is not hex"))?;
        let record = record
            .parse::<usize>()
            .map_err(|_| invalid("record is not a line number"))?;
        keys.push(KeyPair::new(key, record));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_lines() {
        let lines: Vec<String> = ["# prefix record", "", "0d2b 1", "00ff\t0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let keys = parse_keys(&lines).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].key.as_ref(), &[0x0d, 0x2b]);
        assert_eq!(keys[0].record, 1);
        assert_eq!(keys[1].record, 0);
    }

    #[test]
    fn rejects_malformed_key_lines() {
        for bad in ["zz 1", "0a", "0a x", "0a 1 2"] {
            let err = parse_keys(&[bad.to_string()]).unwrap_err();
            assert_eq!(err.code, DATA_INVALID);
            assert!(err.message.contains("line 1"));
        }
    }
}
