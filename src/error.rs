/// Errors that abort a single fight's analysis.
///
/// Recoverable conditions (an unresolvable rune desync, missing dead-zone
/// markers) are never errors; they surface as data in the result. What ends
/// up here means the simulator or an analyzer broke its own contract.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A rune was asked to be both Blood-tapped and Death-converted.
    #[error("rune invariant violated on {rune}: {detail}")]
    RuneInvariant { rune: &'static str, detail: &'static str },

    /// Two analyzers emitted the same top-level report key.
    #[error("report key '{0}' emitted by more than one analyzer")]
    ReportKeyCollision(String),

    #[error("unknown spec profile '{0}'")]
    UnknownSpecProfile(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
