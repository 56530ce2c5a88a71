//! Engine tuning knobs.

/// Default page size for registration listings.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 100;

/// Default number of QR hashes tried before giving up on a registration.
pub const DEFAULT_MAX_QR_ATTEMPTS: u32 = 5;

/// Default number of optimistic write attempts for read-modify-write updates.
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Registrations fetched per listing page
    pub list_page_size: usize,
    /// QR hashes tried per `create` before reporting a conflict
    pub max_qr_attempts: u32,
    /// Optimistic attempts for version-guarded updates
    pub write_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            max_qr_attempts: DEFAULT_MAX_QR_ATTEMPTS,
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Builder-style page size setter; zero is raised to one.
    #[must_use]
    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size.max(1);
        self
    }

    /// Builder-style QR attempt limit; zero is raised to one.
    #[must_use]
    pub fn with_max_qr_attempts(mut self, attempts: u32) -> Self {
        self.max_qr_attempts = attempts.max(1);
        self
    }
}
