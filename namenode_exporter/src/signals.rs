//! Shutdown notice.
//!
//! [`signal`] returns a [`Watcher`] and a [`Broadcaster`]. The binary keeps
//! the broadcaster and fires it on SIGINT or SIGTERM. The HTTP server and
//! every connection it serves hold a [`Watcher`]; the accept loop stops and
//! open connections drain once it fires.
//!
//! The notice is a latched flag, not a message. A watcher cloned after the
//! broadcast still observes it.

use tokio::sync::watch;

/// Create a linked watcher and broadcaster pair.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    let (sender, receiver) = watch::channel(false);
    (Watcher { receiver }, Broadcaster { sender })
}

/// The sending half. Consumed by [`Broadcaster::signal`].
#[derive(Debug)]
pub struct Broadcaster {
    sender: watch::Sender<bool>,
}

impl Broadcaster {
    /// Latch the notice. Returns how many watchers were alive to see it.
    #[allow(clippy::must_use_candidate)]
    pub fn signal(self) -> usize {
        self.sender.send_replace(true);
        self.sender.receiver_count()
    }
}

/// The receiving half. Clone freely.
#[derive(Debug, Clone)]
pub struct Watcher {
    receiver: watch::Receiver<bool>,
}

impl Watcher {
    /// Wait for the notice. Returns immediately if it was already sent.
    ///
    /// A broadcaster dropped without signaling counts as a notice: nothing
    /// could ever fire it afterwards.
    pub async fn recv(&mut self) {
        // Err means the broadcaster is gone.
        let _ = self.receiver.wait_for(|fired| *fired).await;
    }
}
