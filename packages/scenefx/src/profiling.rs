//! Build timing for diagnosing slow scene setup.
//!
//! Dissolve sampling and grass placement run inside [`timed`]. Timing is off
//! by default and toggled at runtime with [`set_profiling_enabled`].

use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to enable/disable build timing.
static PROFILING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Check if profiling is currently enabled.
pub fn is_profiling_enabled() -> bool {
    PROFILING_ENABLED.load(Ordering::Relaxed)
}

/// Enable or disable build timing.
pub fn set_profiling_enabled(enabled: bool) {
    PROFILING_ENABLED.store(enabled, Ordering::Relaxed);
    if enabled {
        log::info!("Performance profiling ENABLED");
    } else {
        log::info!("Performance profiling DISABLED");
    }
}

#[cfg(target_arch = "wasm32")]
mod timing {
    use super::is_profiling_enabled;
    use web_sys::console;

    /// Execute a closure wrapped in `console.time`/`console.timeEnd`.
    pub fn timed<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
        if is_profiling_enabled() {
            console::time_with_label(label);
            let result = f();
            console::time_end_with_label(label);
            result
        } else {
            f()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod timing {
    use super::is_profiling_enabled;
    use std::time::Instant;

    /// Execute a closure and log how long it took.
    pub fn timed<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
        if is_profiling_enabled() {
            let start = Instant::now();
            let result = f();
            let elapsed = start.elapsed();
            log::info!("[PERF] {}: {:.2}ms", label, elapsed.as_secs_f64() * 1000.0);
            result
        } else {
            f()
        }
    }
}

pub use timing::timed;
