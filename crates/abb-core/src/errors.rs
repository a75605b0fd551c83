/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// handle failures consistently. Note that API-level and transport-level
/// fetch failures are *not* errors: they travel as failure snapshots
/// (`billing::types::FetchFailure`) so callers branch on data instead of
/// control flow. `Error` is reserved for configuration problems and
/// genuinely unexpected conditions (malformed payloads, adapter bugs).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
