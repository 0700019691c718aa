// src/client/rotator.rs

//! Round-robin API credential rotation.

use std::collections::HashMap;

use crate::error::{AppError, Result};

/// Last-observed rate-limit state for one credential.
#[derive(Debug, Clone)]
pub struct QuotaObservation {
    pub remaining: u64,
    pub reset_at: String,
}

/// Ordered credential list plus the per-credential quota map.
///
/// Rotation is strictly round-robin: observed quota decides *whether* to
/// rotate, never which credential comes next.
pub struct TokenRotator {
    tokens: Vec<String>,
    current_index: usize,
    threshold: u64,
    quotas: HashMap<String, QuotaObservation>,
}

impl TokenRotator {
    pub fn new(tokens: Vec<String>, threshold: u64) -> Self {
        Self {
            tokens,
            current_index: 0,
            threshold,
            quotas: HashMap::new(),
        }
    }

    /// The credential to use for the next request.
    pub fn current(&self) -> Result<&str> {
        self.tokens
            .get(self.current_index)
            .map(String::as_str)
            .ok_or_else(|| AppError::config("No API tokens configured"))
    }

    /// Move to the next credential and return it.
    pub fn advance(&mut self) -> Result<&str> {
        if self.tokens.is_empty() {
            return Err(AppError::config("No API tokens configured"));
        }
        self.current_index = (self.current_index + 1) % self.tokens.len();
        log::info!("Switched to API token #{}", self.current_index + 1);
        self.current()
    }

    /// Store the quota carried by the latest response, keyed by the
    /// current credential. Informational only.
    pub fn record_quota(&mut self, remaining: u64, reset_at: &str) -> Result<()> {
        let token = self.current()?.to_string();
        self.quotas.insert(
            token,
            QuotaObservation {
                remaining,
                reset_at: reset_at.to_string(),
            },
        );
        Ok(())
    }

    /// Whether the observed remaining quota calls for rotating away.
    pub fn should_rotate(&self, remaining: u64) -> bool {
        remaining <= self.threshold
    }

    /// Number of configured credentials.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Last quota observation for a credential, if any.
    pub fn observed(&self, token: &str) -> Option<&QuotaObservation> {
        self.quotas.get(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotator() -> TokenRotator {
        TokenRotator::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            100,
        )
    }

    #[test]
    fn advance_wraps_after_full_cycle() {
        let mut rotator = rotator();
        let first = rotator.current().unwrap().to_string();
        for _ in 0..3 {
            rotator.advance().unwrap();
        }
        assert_eq!(rotator.current().unwrap(), first);
    }

    #[test]
    fn current_after_k_advances_is_k_mod_n() {
        let mut rotator = rotator();
        for expected in ["b", "c", "a", "b", "c"] {
            assert_eq!(rotator.advance().unwrap(), expected);
        }
    }

    #[test]
    fn empty_token_list_is_a_configuration_error() {
        let mut rotator = TokenRotator::new(Vec::new(), 100);
        assert!(matches!(rotator.current(), Err(AppError::Config(_))));
        assert!(matches!(rotator.advance(), Err(AppError::Config(_))));
    }

    #[test]
    fn should_rotate_at_or_below_threshold() {
        let rotator = rotator();
        assert!(rotator.should_rotate(100));
        assert!(rotator.should_rotate(0));
        assert!(!rotator.should_rotate(101));
    }

    #[test]
    fn record_quota_keys_by_current_credential() {
        let mut rotator = rotator();
        rotator
            .record_quota(4200, "2024-05-01T00:00:00Z")
            .unwrap();
        assert_eq!(rotator.observed("a").unwrap().remaining, 4200);
        assert!(rotator.observed("b").is_none());
    }
}
