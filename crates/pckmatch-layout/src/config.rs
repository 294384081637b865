/// Bounds applied while loading layout documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutLimits {
    /// Maximum bytes read from a layout file.
    pub max_file_size: usize,
    /// Maximum number of entries in `fields`.
    pub max_fields: usize,
}

impl Default for LayoutLimits {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024,
            max_fields: 256,
        }
    }
}
