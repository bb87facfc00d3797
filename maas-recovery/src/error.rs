use std::time::Duration;
use thiserror::Error;

/// Outcome taxonomy for a recovery run. Each variant carries enough context
/// for the caller to decide whether another attempt is worthwhile.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The provider rejected or failed a control-plane request.
    #[error("provider request failed: {0}")]
    Provider(#[from] anyhow::Error),

    /// A status wait ran past its deadline.
    #[error("timed out after {waited:?} waiting for instance {instance_id} to reach \"{target}\" (last seen: {last_state:?})")]
    WaitTimeout {
        instance_id: String,
        target: String,
        last_state: Option<String>,
        waited: Duration,
    },

    /// The declared data-volume size did not parse as `<integer><unit>`.
    #[error("malformed data volume size {0:?}: expected an integer with a trailing unit, e.g. \"20G\"")]
    MalformedSize(String),

    /// The instance reached "running" but never got a public address.
    #[error("instance {instance_id} is running but has no public address")]
    MissingAddress { instance_id: String },

    /// The instance left the expected state between the wait and the final
    /// address check.
    #[error("instance {instance_id} left \"running\" during the address check (state: {state})")]
    StateChanged { instance_id: String, state: String },

    /// Every attempt failed; the last cause is attached.
    #[error("can't create an instance after {attempts} attempt(s)")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Option<Box<RecoveryError>>,
    },
}
