use pckmatch_split::FrameScanner;
use tracing::info;

use crate::cmd::{open_input, scan_config, SplitArgs};
use crate::exit::{split_error, CliResult, SUCCESS};
use crate::output::{FramePrinter, OutputFormat};

pub fn run(args: SplitArgs, format: OutputFormat) -> CliResult<i32> {
    let splitter = args.framing.splitter()?;
    let input = open_input(args.input.as_deref())?;
    let scanner = FrameScanner::with_splitter(input, splitter, scan_config(args.max_buffer));

    let mut printer = FramePrinter::new(format, &["FRAME", "SIZE", "DATA"]);
    let mut frames = 0usize;
    for frame in scanner {
        let frame = frame.map_err(|err| split_error("read failed", err))?;
        printer.frame(frames, &frame);
        frames += 1;
        if args.count.is_some_and(|count| frames >= count) {
            break;
        }
    }
    printer.finish();

    info!(frames, "split finished");
    Ok(SUCCESS)
}
