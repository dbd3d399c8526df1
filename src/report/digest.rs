use log::debug;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{ProofReceipt, ProofService, ProveFinalRequest, ProveMoveRequest, ReportError};

/// Offline proof service.
///
/// The receipt is the hex SHA-256 of the request's JSON body, prefixed with
/// the endpoint name so move and final receipts never collide. Identical
/// requests always yield identical receipts.
///
/// ```
/// use succinct_2048::report::{DigestProver, ProofService, ProveFinalRequest};
///
/// let mut prover = DigestProver::new();
/// let req = ProveFinalRequest { username: "alice".into(), final_point: 1024 };
/// let receipt = prover.prove_final(&req).unwrap();
/// assert_eq!(receipt.proof_hash.len(), 64);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProver;

impl DigestProver {
    pub fn new() -> Self {
        Self
    }

    fn digest<T: Serialize>(endpoint: &str, body: &T) -> Result<ProofReceipt, ReportError> {
        let json = serde_json::to_vec(body)?;
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update([0u8]);
        hasher.update(&json);
        let proof_hash = hex::encode(hasher.finalize());
        debug!("{endpoint}: {proof_hash}");
        Ok(ProofReceipt { proof_hash })
    }
}

impl ProofService for DigestProver {
    fn prove_move(&mut self, request: &ProveMoveRequest) -> Result<ProofReceipt, ReportError> {
        Self::digest("prove-interaction", request)
    }

    fn prove_final(&mut self, request: &ProveFinalRequest) -> Result<ProofReceipt, ReportError> {
        Self::digest("prove-final", request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;

    #[test]
    fn receipts_are_deterministic_and_distinct() {
        let mut prover = DigestProver::new();
        let a = ProveFinalRequest { username: "alice".into(), final_point: 512 };
        let b = ProveFinalRequest { username: "alice".into(), final_point: 516 };
        let first = prover.prove_final(&a).unwrap();
        assert_eq!(first, prover.prove_final(&a).unwrap());
        assert_ne!(first, prover.prove_final(&b).unwrap());
        assert!(first.proof_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn move_and_final_receipts_differ() {
        let mut prover = DigestProver::new();
        let mv = ProveMoveRequest { username: "alice".into(), direction: Direction::Left, timestamp: 1 };
        let fin = ProveFinalRequest { username: "alice".into(), final_point: 1 };
        assert_ne!(prover.prove_move(&mv).unwrap(), prover.prove_final(&fin).unwrap());
    }
}
