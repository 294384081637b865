use std::fmt;
use std::io;

use pckmatch_convert::ConvertError;
use pckmatch_find::FindError;
use pckmatch_layout::LayoutError;
use pckmatch_split::SplitError;

// sysexits-style codes
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_INPUT: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => NO_INPUT,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn split_error(context: &str, err: SplitError) -> CliError {
    match err {
        SplitError::Io(source) => io_error(context, source),
        SplitError::BufferOverflow { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(USAGE, format!("{context}: {other}")),
    }
}

pub fn convert_error(context: &str, err: ConvertError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn layout_error(context: &str, err: LayoutError) -> CliError {
    match err {
        LayoutError::Split(err) => split_error(context, err),
        LayoutError::LoadFailed(_) => CliError::new(NO_INPUT, format!("{context}: {err}")),
        LayoutError::CompileFailed(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn find_error(context: &str, err: FindError) -> CliError {
    match err {
        FindError::Io(source) => io_error(context, source),
        FindError::InvalidSizes { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
