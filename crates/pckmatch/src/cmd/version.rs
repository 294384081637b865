use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("pckmatch {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("PCKMATCH_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("os: {}", std::env::consts::OS);
    println!("arch: {}", std::env::consts::ARCH);
    println!(
        "features: layout={}, async={}, cli=true",
        cfg!(feature = "layout"),
        cfg!(feature = "async")
    );
    println!("layout schema: embedded ({} bytes)", pckmatch_layout::LAYOUT_SCHEMA.len());

    Ok(SUCCESS)
}
