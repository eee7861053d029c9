//! Async runtime for a single notification run.

use std::future::Future;

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// Shutdown does not wait for blocking tasks. An SMTP send abandoned at its
/// deadline keeps its thread, and the process must still be able to exit.
pub fn block_on<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn returns_output() {
        assert_eq!(block_on(async { 7 }).unwrap(), 7);
    }

    #[test]
    fn does_not_wait_for_stuck_blocking_task() {
        let started = Instant::now();
        block_on(async {
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(10)));
            tokio::time::sleep(Duration::from_millis(10)).await;
        })
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
