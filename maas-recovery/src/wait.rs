use crate::error::RecoveryError;
use maas_providers::CloudProvider;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Fixed delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on a single status wait.
pub const WAIT_DEADLINE: Duration = Duration::from_secs(600);

/// How a status wait paces itself and when it gives up.
#[derive(Clone, Copy, Debug)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            deadline: WAIT_DEADLINE,
        }
    }
}

/// Poll the instance status until it reads exactly `target` (case-sensitive).
///
/// A missing status keeps the wait alive: fresh instances can be briefly
/// invisible to reservation lookups. Exceeding the deadline is a
/// [`RecoveryError::WaitTimeout`], distinct from a provider error.
pub async fn wait_for_state(
    provider: &dyn CloudProvider,
    instance_id: &str,
    target: &str,
    policy: WaitPolicy,
) -> Result<(), RecoveryError> {
    let started = Instant::now();
    let mut last_state: Option<String> = None;

    loop {
        if let Some(state) = provider.get_instance_state(instance_id).await? {
            if state == target {
                return Ok(());
            }
            last_state = Some(state);
        }

        if started.elapsed() >= policy.deadline {
            return Err(RecoveryError::WaitTimeout {
                instance_id: instance_id.to_string(),
                target: target.to_string(),
                last_state,
                waited: started.elapsed(),
            });
        }
        sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_polls_every_five_seconds() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert!(policy.deadline > policy.interval);
    }
}
