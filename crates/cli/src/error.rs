//! Structured errors for the chaincache binary.

use chaincache_core::Error;

/// Errors reported by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid command arguments (e.g., a value that is not JSON).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No cached value for the requested key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Command output could not be rendered.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),

    #[error(transparent)]
    Cache(#[from] Error),
}

/// Render command output the way every command prints it.
pub fn to_json<T: serde::Serialize>(output: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(output).map_err(|e| CliError::OutputFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_passes_through() {
        let err: CliError = Error::InvalidName("..".into()).into();
        assert_eq!(err.to_string(), "INVALID_NAME: ..");
    }

    #[test]
    fn test_unserializable_output_is_not_input_error() {
        let output: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();
        let err = to_json(&output).unwrap_err();
        assert!(matches!(err, CliError::OutputFailed(_)));
        assert!(err.to_string().starts_with("OUTPUT_FAILED"));
    }

    #[test]
    fn test_cache_miss_display() {
        let err = CliError::CacheMiss("contracts/0xABC".into());
        assert!(err.to_string().starts_with("CACHE_MISS"));
    }
}
