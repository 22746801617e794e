//! Shared constants used across the application.

/// Maximum number of reveal rounds per revealer pass.
pub const MAX_REVEAL_ROUNDS: usize = 50;

/// Scroll offset applied after each reveal round, in pixels.
pub const REVEAL_SCROLL_STEP: i64 = 400;

/// Number of full-height jumps in the bulk auto-scroll step.
pub const AUTO_SCROLL_JUMPS: usize = 5;

/// Maximum "load more" activations per listing page.
pub const MAX_LOAD_MORE_ATTEMPTS: usize = 20;

/// Maximum infinite-scroll steps per listing page.
pub const MAX_SCROLL_ATTEMPTS: usize = 20;

/// Largest integer treated as a stray counter when it sits alone on a line.
pub const STRAY_COUNTER_DIGITS: usize = 4;

/// Browser user agents picked from when no override is configured.
///
/// These are realistic desktop strings so the session does not advertise
/// itself as automation.
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
];
