use std::fs::File;
use std::io::BufReader;

use pckmatch_find::{Finder, Lookup};
use tracing::debug;

use crate::cmd::FindArgs;
use crate::exit::{find_error, io_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_lookup, OutputFormat};

pub fn run(args: FindArgs, format: OutputFormat) -> CliResult<i32> {
    let target = if args.text {
        args.key.as_bytes().to_vec()
    } else {
        hex::decode(&args.key)
            .map_err(|err| CliError::new(USAGE, format!("key {:?} is not hex: {err}", args.key)))?
    };

    let file = File::open(&args.index)
        .map_err(|err| io_error(&format!("open {}", args.index.display()), err))?;
    let mut finder =
        Finder::open(BufReader::new(file)).map_err(|err| find_error("open index failed", err))?;

    match finder.search(&target) {
        Lookup::Hit(entry) => {
            let record = finder
                .record(entry.position)
                .map_err(|err| find_error("read record failed", err))?;
            print_lookup(&args.key, Some((&entry, &record[..])), format);
            Ok(SUCCESS)
        }
        miss => {
            debug!(key = %args.key, outcome = ?miss, "key not covered by index");
            print_lookup(&args.key, None, format);
            Ok(FAILURE)
        }
    }
}
