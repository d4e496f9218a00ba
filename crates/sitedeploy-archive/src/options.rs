#[cfg(unix)]
const DEFAULT_DIR_MODE: u32 = 0o755;
#[cfg(not(unix))]
const DEFAULT_DIR_MODE: u32 = 0;

#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o644;
#[cfg(not(unix))]
const DEFAULT_FILE_MODE: u32 = 0;

#[derive(Clone, Copy, Debug)]
pub struct ExtractOptions {
    /// Mode for the staging root and for parent directories a tar entry
    /// implies but does not list.
    pub dir_mode: u32,
    /// Mode of the staged file in single-file mode, and the fallback for
    /// tar entries whose header mode is unreadable.
    pub file_mode: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self {
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }
}
