use pckmatch_layout::Layout;
use pckmatch_split::FrameScanner;
use tracing::{info, warn};

use crate::cmd::{open_input, scan_config, MatchArgs};
use crate::exit::{layout_error, split_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{FramePrinter, OutputFormat};

pub fn run(args: MatchArgs, format: OutputFormat) -> CliResult<i32> {
    let layout =
        Layout::from_file(&args.layout).map_err(|err| layout_error("layout load failed", err))?;
    let splitter = layout
        .splitter()
        .map_err(|err| layout_error("invalid layout framing", err))?;
    let mut record = layout
        .record()
        .map_err(|err| layout_error("invalid layout fields", err))?;

    let input = open_input(args.input.as_deref())?;
    let scanner = FrameScanner::with_splitter(input, splitter, scan_config(args.max_buffer));

    let mut printer = FramePrinter::new(format, &["FRAME", "FIELD", "KIND", "VALUE"]);
    let (mut frames, mut failed) = (0usize, 0usize);
    for frame in scanner {
        let frame = frame.map_err(|err| split_error("read failed", err))?;
        let index = frames;
        frames += 1;

        let decoded = layout
            .body(&frame)
            .and_then(|body| record.decode(&body).map_err(Into::into));
        match decoded {
            Ok(()) => printer.fields(index, frame.len(), &record.entries()),
            Err(err) => {
                warn!(frame = index, error = %err, "frame did not decode");
                failed += 1;
            }
        }

        if args.count.is_some_and(|count| frames >= count) {
            break;
        }
    }
    printer.finish();

    info!(frames, failed, "match finished");
    Ok(if failed > 0 { DATA_INVALID } else { SUCCESS })
}
