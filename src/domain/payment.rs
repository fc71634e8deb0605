//! Payment challenge and authorization value types.

use serde::{Deserialize, Serialize};

/// The 402 challenge: what the client must sign to pay for one mint.
///
/// Derived fresh per request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    pub scheme: String,
    pub network: String,
    pub asset_address: String,
    pub payee_address: String,
    pub amount_minor_units: u64,
    pub asset_name: String,
    pub asset_domain_version: String,
    pub max_timeout_seconds: u64,
}

impl PaymentChallenge {
    /// Encode as the `X-Payment-Options` header value.
    pub fn to_options_header(&self) -> String {
        format!(
            "scheme=\"{}\", network=\"{}\", token=\"{}\", payee=\"{}\", amount=\"{}\"",
            self.scheme, self.network, self.asset_address, self.payee_address, self.amount_minor_units
        )
    }
}

/// The signed, off-chain transfer authorization the client returns.
///
/// Arrives in one header, decoded from the client's opaque payload; discarded
/// once the settlement outcome for this request is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorization {
    pub from_address: String,
    pub to_address: String,
    pub value_minor_units: u64,
    pub nonce: String,
    pub valid_after: i64,
    pub valid_before: i64,
    pub signature: String,
    pub chain_id: u64,
    pub asset_contract_address: String,
}

impl PaymentAuthorization {
    /// Decode from the base64-ish opaque `X-Payment` header value.
    ///
    /// The wire format is a base64-encoded JSON object with the same field
    /// names as this struct (camelCase, matched via serde).
    pub fn decode(header_value: &str) -> Result<Self, String> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(header_value.trim())
            .map_err(|e| format!("invalid base64: {e}"))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("invalid payment authorization: {e}"))
    }

    /// Structural invariants enforced downstream of decode, before the
    /// authorization is ever sent to the facilitator.
    pub fn check_invariants(&self, challenge: &PaymentChallenge, now: i64) -> Result<(), String> {
        if !(self.valid_after <= now && now <= self.valid_before) {
            return Err("authorization outside its validity window".into());
        }
        if self.to_address.to_lowercase() != challenge.payee_address.to_lowercase() {
            return Err("authorization payee does not match challenge".into());
        }
        if self.value_minor_units < challenge.amount_minor_units {
            return Err("authorization value below required amount".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_challenge() -> PaymentChallenge {
        PaymentChallenge {
            scheme: "exact".into(),
            network: "bsc".into(),
            asset_address: "0xasset".into(),
            payee_address: "0xpayee".into(),
            amount_minor_units: 10_000_000,
            asset_name: "USD Coin".into(),
            asset_domain_version: "2".into(),
            max_timeout_seconds: 300,
        }
    }

    #[test]
    fn options_header_begins_with_scheme_and_network() {
        let header = sample_challenge().to_options_header();
        assert!(header.starts_with("scheme=\"exact\", network=\"bsc\""));
    }

    #[test]
    fn invariants_reject_window_violation() {
        let challenge = sample_challenge();
        let auth = PaymentAuthorization {
            from_address: "0xpayer".into(),
            to_address: "0xpayee".into(),
            value_minor_units: 10_000_000,
            nonce: "0xnonce".into(),
            valid_after: 100,
            valid_before: 200,
            signature: "0xsig".into(),
            chain_id: 56,
            asset_contract_address: "0xasset".into(),
        };
        assert!(auth.check_invariants(&challenge, 50).is_err());
        assert!(auth.check_invariants(&challenge, 150).is_ok());
    }

    #[test]
    fn invariants_reject_underpayment() {
        let challenge = sample_challenge();
        let mut auth = PaymentAuthorization {
            from_address: "0xpayer".into(),
            to_address: "0xpayee".into(),
            value_minor_units: 1,
            nonce: "0xnonce".into(),
            valid_after: 0,
            valid_before: i64::MAX,
            signature: "0xsig".into(),
            chain_id: 56,
            asset_contract_address: "0xasset".into(),
        };
        assert!(auth.check_invariants(&challenge, 10).is_err());
        auth.value_minor_units = challenge.amount_minor_units;
        assert!(auth.check_invariants(&challenge, 10).is_ok());
    }
}
