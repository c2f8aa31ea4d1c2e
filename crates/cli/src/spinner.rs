//! Progress indicator as a self-contained task handle.
//!
//! Purely decorative: the spinner holds no reference into orchestrator
//! or session state, and stopping it is explicit.

use std::io::Write;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub struct Spinner {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Spinner {
    /// Start rendering `label` on stderr until [`stop`] is called.
    ///
    /// [`stop`]: Spinner::stop
    pub fn start(label: &str) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let label = label.to_string();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut frame = 0usize;
            loop {
                if *stopped.borrow() {
                    break;
                }
                eprint!(
                    "\rcodevet is {label} {} ({}s)",
                    FRAMES[frame % FRAMES.len()],
                    started.elapsed().as_secs()
                );
                let _ = std::io::stderr().flush();
                frame += 1;

                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
                    _ = stopped.changed() => {}
                }
            }
            eprint!("\r{}\r", " ".repeat(50));
            let _ = std::io::stderr().flush();
        });

        Self { stop, handle }
    }

    /// Stop the spinner and wait for the line to be cleared.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_stop_completes() {
        let spinner = Spinner::start("thinking");
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        spinner.stop().await;
    }

    #[tokio::test]
    async fn immediate_stop_does_not_hang() {
        Spinner::start("reviewing").stop().await;
    }
}
