//! Error handling for the balance history pipeline
//!
//! Defines the domain error kinds and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for history rebuilds
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = PortfolioError::Validation("ticker IVVB11 mixes currencies".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: ticker IVVB11 mixes currencies"
        );
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> =
            Err(anyhow::anyhow!("original error")).context("failed to rebuild daily balances");
        match result {
            Err(e) => {
                assert!(e.to_string().contains("failed to rebuild daily balances"));
                let debug_msg = format!("{:?}", e);
                assert!(debug_msg.contains("original error"));
            }
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_domain_errors_downcast_through_anyhow() {
        let err: anyhow::Error = PortfolioError::Parse("unknown index 'xyz'".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<PortfolioError>(),
            Some(PortfolioError::Parse(_))
        ));
    }
}
