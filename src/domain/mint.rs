//! Mint request body and derived capacity snapshot.

use serde::{Deserialize, Serialize};

/// Body of `POST /mint` and `POST /internal/mint/<secret>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub token_address: String,
    pub recipients: Vec<String>,
}

impl MintRequest {
    /// Lowercased, trimmed token address used for every cache/counter lookup.
    pub fn token_key(&self) -> String {
        self.token_address.trim().to_lowercase()
    }

    /// Structural validation: nonempty token, 1..=100 recipients.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_address.trim().is_empty() {
            return Err("tokenAddress must not be empty".into());
        }
        if self.recipients.is_empty() || self.recipients.len() > 100 {
            return Err("recipients must contain between 1 and 100 entries".into());
        }
        Ok(())
    }
}

/// Snapshot of a token's mint capacity, computed fresh per admission.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapacityInfo {
    pub max_mint_count: u64,
    pub current_mint_count: u64,
    pub pending_count: u64,
}

impl CapacityInfo {
    pub fn available_slots(&self) -> u64 {
        self.max_mint_count
            .saturating_sub(self.current_mint_count)
            .saturating_sub(self.pending_count)
    }

    pub fn percentage_used(&self) -> f64 {
        if self.max_mint_count == 0 {
            return 100.0;
        }
        let used = self.current_mint_count + self.pending_count;
        (used as f64 / self.max_mint_count as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_token() {
        let req = MintRequest {
            token_address: "   ".into(),
            recipients: vec!["0x01".into()],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_many_recipients() {
        let req = MintRequest {
            token_address: "0xaa".into(),
            recipients: (0..101).map(|i| format!("0x{i}")).collect(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_one_recipient() {
        let req = MintRequest {
            token_address: "0xAA".into(),
            recipients: vec!["0x01".into()],
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.token_key(), "0xaa");
    }

    #[test]
    fn available_slots_matches_spec_example() {
        let info = CapacityInfo {
            max_mint_count: 100,
            current_mint_count: 95,
            pending_count: 3,
        };
        assert_eq!(info.available_slots(), 2);
    }

    #[test]
    fn available_slots_never_underflows() {
        let info = CapacityInfo {
            max_mint_count: 10,
            current_mint_count: 8,
            pending_count: 5,
        };
        assert_eq!(info.available_slots(), 0);
    }
}
