use crate::core::ProofOfWork;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// A proof search running on its own thread.
///
/// The search only reads the tip's proof, so it never touches the ledger.
/// Dropping the miner raises its stop flag.
pub struct Miner {
    generation: u64,
    stop: Arc<AtomicBool>,
}

impl Miner {
    /// Start searching for a proof on top of `last_proof`; `on_done` receives
    /// the proof, or `None` if the search was stopped first.
    pub fn spawn<F>(generation: u64, pow: ProofOfWork, last_proof: u64, on_done: F) -> Miner
    where
        F: FnOnce(Option<u64>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        debug!("Miner {generation}: searching on top of proof {last_proof}");
        thread::spawn(move || on_done(pow.run_until(last_proof, &flag)));
        Miner { generation, stop }
    }

    pub fn get_generation(&self) -> u64 {
        self.generation
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}
