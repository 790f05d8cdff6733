//! # ZK Compliance Prover
//!
//! Optional privacy-preserving layer: proves that a trader's KYC record
//! satisfies a policy without revealing the exact level, jurisdiction or
//! expiry. Proof generation and verification are delegated to an external
//! backend injected at construction time; when no backend is configured the
//! whole layer is disabled and the rest of the crate is unaffected.
//!
//! Verification never propagates an error upward; any backend failure is
//! normalized into `{valid: false, error: <message>}`.

use crate::types::{Jurisdiction, KycLevel};
use async_trait::async_trait;
use log::debug;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Circuit identifier the KYC policy witness is proven under.
pub const KYC_POLICY_CIRCUIT_ID: &str = "meridian-kyc-policy-v1";

/// Fixed message for verification attempts without a configured backend.
pub const VERIFICATION_UNAVAILABLE: &str = "ZK verification not available";

/// Output of a backend proof generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProof {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<Vec<u8>>,
}

/// Minimal capability interface an external prover must provide.
#[async_trait]
pub trait ZkProverBackend: Send + Sync {
    async fn generate_proof(
        &self,
        circuit_id: &str,
        witness: &[u8],
    ) -> anyhow::Result<GeneratedProof>;

    async fn verify_proof(
        &self,
        circuit_id: &str,
        proof: &[u8],
        public_inputs: &[Vec<u8>],
    ) -> anyhow::Result<bool>;
}

/// Prover capability: present or absent, decided at construction.
#[derive(Clone)]
pub enum ProverBackend {
    Disabled,
    Configured(Arc<dyn ZkProverBackend>),
}

/// A compliance proof artifact. Opaque beyond its structural shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkComplianceProof {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<Vec<u8>>,
    pub circuit_id: String,
    pub kyc_level_commitment: [u8; 32],
    pub jurisdiction_commitment: [u8; 32],
}

/// Verification outcome. Never an `Err`; see module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofVerification {
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ZkProverError {
    #[error("ZK proving not available: no prover backend configured")]
    ProvingUnavailable,
    #[error("Prover backend error: {0}")]
    Backend(String),
}

fn commitment(tag: &[u8], value: u8, kyc_commitment: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update([value]);
    hasher.update(kyc_commitment);
    hasher.finalize().into()
}

/// Generates and verifies KYC policy compliance proofs.
pub struct ZkComplianceProver {
    backend: ProverBackend,
}

impl ZkComplianceProver {
    pub fn new(backend: ProverBackend) -> Self {
        Self { backend }
    }

    /// Prover with no backend; every proving call fails with
    /// `ProvingUnavailable` and every verification reports invalid.
    pub fn disabled() -> Self {
        Self::new(ProverBackend::Disabled)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend, ProverBackend::Configured(_))
    }

    /// Witness bytes binding all six policy inputs plus the record's KYC
    /// commitment. Fixed little-endian layout so the same inputs always
    /// produce the same witness.
    fn build_witness(
        kyc_level: KycLevel,
        jurisdiction: Jurisdiction,
        expiry_at: i64,
        min_level: KycLevel,
        allowed_jurisdictions: u8,
        now: i64,
        kyc_commitment: &[u8; 32],
    ) -> Vec<u8> {
        let mut witness = Vec::with_capacity(52);
        witness.push(kyc_level.ordinal());
        witness.push(jurisdiction as u8);
        witness.extend_from_slice(&expiry_at.to_le_bytes());
        witness.push(min_level.ordinal());
        witness.push(allowed_jurisdictions);
        witness.extend_from_slice(&now.to_le_bytes());
        witness.extend_from_slice(kyc_commitment);
        witness
    }

    /// Generate a proof that the private inputs (level, jurisdiction,
    /// expiry) satisfy the public policy (minimum level, jurisdiction mask,
    /// clock) without revealing them.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_compliance_proof(
        &self,
        kyc_level: KycLevel,
        jurisdiction: Jurisdiction,
        expiry_at: i64,
        min_level: KycLevel,
        allowed_jurisdictions: u8,
        now: i64,
        kyc_commitment: [u8; 32],
    ) -> Result<ZkComplianceProof, ZkProverError> {
        let backend = match &self.backend {
            ProverBackend::Configured(backend) => backend,
            ProverBackend::Disabled => return Err(ZkProverError::ProvingUnavailable),
        };

        let witness = Self::build_witness(
            kyc_level,
            jurisdiction,
            expiry_at,
            min_level,
            allowed_jurisdictions,
            now,
            &kyc_commitment,
        );
        let kyc_level_commitment = commitment(b"kyc_level", kyc_level.ordinal(), &kyc_commitment);
        let jurisdiction_commitment =
            commitment(b"jurisdiction", jurisdiction as u8, &kyc_commitment);
        debug!(
            "generating compliance proof (level commitment {})",
            hex::encode(kyc_level_commitment)
        );

        let generated = backend
            .generate_proof(KYC_POLICY_CIRCUIT_ID, &witness)
            .await
            .map_err(|e| ZkProverError::Backend(e.to_string()))?;

        Ok(ZkComplianceProof {
            proof_bytes: generated.proof,
            public_inputs: generated.public_inputs,
            circuit_id: KYC_POLICY_CIRCUIT_ID.to_string(),
            kyc_level_commitment,
            jurisdiction_commitment,
        })
    }

    /// Verify a compliance proof. All failure modes (no backend, backend
    /// error, backend rejection) are reported in the result, never raised.
    pub async fn verify_compliance_proof(&self, proof: &ZkComplianceProof) -> ProofVerification {
        let backend = match &self.backend {
            ProverBackend::Configured(backend) => backend,
            ProverBackend::Disabled => {
                return ProofVerification {
                    valid: false,
                    error: Some(VERIFICATION_UNAVAILABLE.to_string()),
                }
            }
        };
        match backend
            .verify_proof(&proof.circuit_id, &proof.proof_bytes, &proof.public_inputs)
            .await
        {
            Ok(true) => ProofVerification {
                valid: true,
                error: None,
            },
            Ok(false) => ProofVerification {
                valid: false,
                error: Some("proof rejected".to_string()),
            },
            Err(e) => {
                let message = e.to_string();
                ProofVerification {
                    valid: false,
                    error: Some(if message.is_empty() {
                        "unknown verification error".to_string()
                    } else {
                        message
                    }),
                }
            }
        }
    }
}
