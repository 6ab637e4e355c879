use thiserror::Error;

/// Reasons an effect stopped abnormally.
///
/// Failures never unwind the store: they are reported to the observability
/// hub and the effect is dropped from the active table.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("Effect failed: {0}")]
    Failed(#[from] anyhow::Error),

    #[error("Effect panicked: {message}")]
    Panicked { message: String },

    #[error("No async runtime available to run effect")]
    NoRuntime,
}

impl EffectError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        EffectError::Failed(anyhow::anyhow!("{}", message))
    }

    /// Short classification used in observability events.
    pub fn kind(&self) -> &'static str {
        match self {
            EffectError::Failed(_) => "failed",
            EffectError::Panicked { .. } => "panicked",
            EffectError::NoRuntime => "no_runtime",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_convert_with_question_mark() {
        fn produce() -> Result<(), EffectError> {
            Err(anyhow::anyhow!("socket closed"))?;
            Ok(())
        }

        let err = produce().unwrap_err();
        assert_eq!(err.kind(), "failed");
        assert_eq!(err.to_string(), "Effect failed: socket closed");
    }

    #[test]
    fn msg_builds_failed_variant() {
        let err = EffectError::msg("boom");
        assert!(matches!(err, EffectError::Failed(_)));
    }
}
