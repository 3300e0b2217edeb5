//! Where an expired session is reported.

/// Receives the login entry point once a session ends irrecoverably.
pub trait SessionObserver: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Logs the redirect; the CLI and headless callers use this.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn navigate(&self, path: &str) {
        tracing::warn!(login_path = %path, "Session expired, sign in again");
    }
}
