use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Per-username login-attempt counter with a fixed lockout window.
///
/// The window opens at the first attempt. Every attempt is counted when it
/// starts, so concurrent attempts cannot exceed `max_attempts`; a successful
/// login calls `reset`. Expired windows are dropped on every acquire.
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, Attempts>>,
}

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    first_at: Instant,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Counts an attempt for `username`, or `Err(retry_after)` while it is
    /// locked out.
    pub fn try_acquire(&self, username: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let window = self.window;
        let mut attempts = self.lock();
        attempts.retain(|_, entry| now < entry.first_at + window);

        let entry = attempts.entry(username.to_string()).or_insert(Attempts {
            count: 0,
            first_at: now,
        });
        if entry.count >= self.max_attempts {
            return Err(entry.first_at + window - now);
        }
        entry.count += 1;
        Ok(())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.lock().len()
    }

    pub fn reset(&self, username: &str) {
        self.lock().remove(username);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Attempts>> {
        // A poisoned map only holds counters; keep using it.
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
