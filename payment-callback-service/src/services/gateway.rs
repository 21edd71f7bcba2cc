//! Verification of the gateway's return signature.

use secrecy::{ExposeSecret, Secret};
use service_core::utils::signature::{canonical_query, keyed_digest, verify_keyed_digest};
use std::collections::BTreeMap;

pub const SIGN_PARAM: &str = "sign";

/// Decides whether a set of return parameters really came from the gateway.
pub trait GatewayVerifier: Send + Sync {
    fn verify(&self, params: &BTreeMap<String, String>) -> bool;
}

/// Keyed-hash verifier over the canonical parameter string.
pub struct HmacGatewayVerifier {
    key: Secret<String>,
}

impl HmacGatewayVerifier {
    pub fn new(key: Secret<String>) -> Self {
        Self { key }
    }

    /// Signature the gateway would attach to `params`.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> Result<String, anyhow::Error> {
        keyed_digest(self.key.expose_secret(), &canonical(params))
    }
}

impl GatewayVerifier for HmacGatewayVerifier {
    fn verify(&self, params: &BTreeMap<String, String>) -> bool {
        let Some(signature) = params.get(SIGN_PARAM).filter(|s| !s.is_empty()) else {
            return false;
        };

        match verify_keyed_digest(self.key.expose_secret(), &canonical(params), signature) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "Gateway signature could not be computed");
                false
            }
        }
    }
}

fn canonical(params: &BTreeMap<String, String>) -> String {
    canonical_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
