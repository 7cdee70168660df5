use crate::utils::sha256_hex;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// Candidates tried between two looks at the stop flag
const STOP_CHECK_INTERVAL: u64 = 1024;

/// Prefix-match proof-of-work: `sha256(last_proof ++ proof)` must start with
/// `difficulty` hex zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOfWork {
    /// Number of leading hex zeros every node requires
    pub const DIFFICULTY: usize = 4;

    pub fn new() -> ProofOfWork {
        ProofOfWork {
            difficulty: Self::DIFFICULTY,
        }
    }

    /// Relaxed target so searches finish instantly in tests
    #[cfg(test)]
    pub(crate) fn with_difficulty(difficulty: usize) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn validate(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        let hash = sha256_hex(guess.as_bytes());
        hash.bytes().take(self.difficulty).all(|b| b == b'0')
    }

    /// Smallest valid proof, searching upward from zero with no bound.
    pub fn run(&self, last_proof: u64) -> u64 {
        let mut proof = 0;
        while !self.validate(last_proof, proof) {
            proof += 1;
        }
        debug!("Proof {proof} found for last proof {last_proof}");
        proof
    }

    /// Same search as [`ProofOfWork::run`], abandoned once `stop` is raised.
    pub fn run_until(&self, last_proof: u64, stop: &AtomicBool) -> Option<u64> {
        let mut proof = 0;
        loop {
            if proof % STOP_CHECK_INTERVAL == 0 && stop.load(Ordering::Relaxed) {
                debug!("Proof search for last proof {last_proof} stopped at {proof}");
                return None;
            }
            if self.validate(last_proof, proof) {
                return Some(proof);
            }
            proof += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_difficulty_is_fixed() {
        assert_eq!(ProofOfWork::new().get_difficulty(), 4);
        assert_eq!(ProofOfWork::default(), ProofOfWork::new());
    }

    #[test]
    fn test_validate_matches_hash_prefix() {
        let pow = ProofOfWork::new();
        for proof in 0..2000u64 {
            let hash = sha256_hex(format!("100{proof}").as_bytes());
            assert_eq!(pow.validate(100, proof), hash.starts_with("0000"));
        }
    }

    #[test]
    fn test_run_finds_smallest_proof() {
        for difficulty in 1..=2 {
            let pow = ProofOfWork::with_difficulty(difficulty);
            for last_proof in [0u64, 7, 100, 35293] {
                let proof = pow.run(last_proof);
                assert!(pow.validate(last_proof, proof));
                assert!((0..proof).all(|p| !pow.validate(last_proof, p)));
            }
        }
    }

    #[test]
    fn test_run_with_real_difficulty() {
        let pow = ProofOfWork::new();
        let proof = pow.run(100);
        let hash = sha256_hex(format!("100{proof}").as_bytes());
        assert!(hash.starts_with("0000"));
    }

    #[test]
    fn test_run_until_agrees_with_run() {
        let pow = ProofOfWork::with_difficulty(2);
        let stop = AtomicBool::new(false);
        assert_eq!(pow.run_until(42, &stop), Some(pow.run(42)));
    }

    #[test]
    fn test_run_until_honours_stop_flag() {
        // Unreachable target: 64 zeros never happens in practice
        let pow = ProofOfWork::with_difficulty(64);
        let stop = AtomicBool::new(true);
        assert_eq!(pow.run_until(1, &stop), None);
    }
}
