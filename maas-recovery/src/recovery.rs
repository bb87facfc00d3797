use crate::bdm;
use crate::config::Settings;
use crate::error::RecoveryError;
use crate::logger::ActionLog;
use crate::user_data;
use crate::wait::{wait_for_state, WaitPolicy};
use maas_providers::{CloudProvider, InstanceView, LaunchRequest};
use serde_json::json;
use std::time::Instant;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// Terminal statuses, matched exactly (case-sensitive).
pub const STOPPED: &str = "stopped";
pub const RUNNING: &str = "running";

/// Stop an instance and wait until the provider reports it "stopped".
pub async fn stop_instance(
    provider: &dyn CloudProvider,
    instance_id: &str,
    policy: WaitPolicy,
    log: &ActionLog,
) -> Result<(), RecoveryError> {
    let log_id = log.record("STOP_INSTANCE", "in_progress", instance_id, None);
    let started = Instant::now();
    println!("🔌 Stopping instance {}...", instance_id);

    let result = async {
        provider.stop_instances(&[instance_id.to_string()]).await?;
        wait_for_state(provider, instance_id, STOPPED, policy).await
    }
    .await;

    let duration_ms = started.elapsed().as_millis() as i64;
    match &result {
        Ok(_) => {
            println!("✅ Instance {} stopped", instance_id);
            log.complete(log_id, "success", duration_ms, None);
        }
        Err(e) => {
            eprintln!("❌ Failed to stop instance {}: {}", instance_id, e);
            log.complete(log_id, "failed", duration_ms, Some(e.to_string().as_str()));
        }
    }
    result
}

/// Replace `instance_id` with a fresh instance whose data volume is sourced
/// from `snapshot_id`, and wait until it is running with a public address.
pub async fn launch_replacement(
    provider: &dyn CloudProvider,
    settings: &Settings,
    snapshot_id: Option<&str>,
    instance_id: &str,
    policy: WaitPolicy,
    log: &ActionLog,
) -> Result<InstanceView, RecoveryError> {
    // The old instance has to release its data volume first. A failure here
    // is logged but does not abort the run: the replacement can still boot
    // and the operator reconciles the old instance by hand.
    if let Err(e) = stop_instance(provider, instance_id, policy, log).await {
        eprintln!(
            "⚠️ Could not confirm instance {} stopped: {} - continuing with launch",
            instance_id, e
        );
    }

    let mapping = bdm::build_device_mapping(
        &settings.data_volume_size,
        &settings.data_volume_type,
        settings.data_volume_rate,
        snapshot_id,
    )?;

    let script = user_data::build_recovery_user_data(&settings.recovery_payload);
    tracing::debug!("rendered recovery user data:\n{}", script);

    let request = LaunchRequest {
        image_id: settings.image_id.clone(),
        instance_type: settings.instance_type.clone(),
        key_name: settings.key_name.clone(),
        security_group_ids: settings.security_group_ids.clone(),
        subnet_id: settings.subnet_id.clone(),
        block_devices: mapping,
        user_data: script,
    };

    let log_id = log.record_with_metadata(
        "RUN_INSTANCE",
        "in_progress",
        instance_id,
        None,
        Some(json!({
            "image_id": request.image_id,
            "instance_type": request.instance_type,
            "snapshot_id": snapshot_id,
            "user_data_length": request.user_data.len(),
        })),
    );
    let started = Instant::now();

    let new_instance_id = match provider.run_instance(&request).await {
        Ok(id) => {
            log.complete(log_id, "success", started.elapsed().as_millis() as i64, Some(id.as_str()));
            id
        }
        Err(e) => {
            log.complete(
                log_id,
                "failed",
                started.elapsed().as_millis() as i64,
                Some(e.to_string().as_str()),
            );
            return Err(RecoveryError::Provider(e));
        }
    };

    println!("⏳ Waiting for instance {} to reach \"running\"...", new_instance_id);
    wait_for_state(provider, &new_instance_id, RUNNING, policy).await?;

    // Re-read so the address check and the status check hold at the same
    // moment.
    let Some(view) = provider.describe_instance(&new_instance_id).await? else {
        return Err(RecoveryError::StateChanged {
            instance_id: new_instance_id,
            state: "not-found".to_string(),
        });
    };
    if view.public_ip.as_deref().map_or(true, |ip| ip.is_empty()) {
        return Err(RecoveryError::MissingAddress {
            instance_id: new_instance_id,
        });
    }
    if view.state != RUNNING {
        return Err(RecoveryError::StateChanged {
            instance_id: new_instance_id,
            state: view.state,
        });
    }

    println!(
        "✅ Instance {} is running at {}",
        view.instance_id,
        view.public_ip.as_deref().unwrap_or("")
    );
    Ok(view)
}

/// Drive [`launch_replacement`] until it succeeds or the attempt budget runs
/// out. Attempts are immediate (no backoff); the counter advances every
/// iteration, so a persistent failure surfaces after `max_attempts` with the
/// last cause attached.
pub async fn create_instance(
    provider: &dyn CloudProvider,
    settings: &Settings,
    snapshot_id: Option<&str>,
    instance_id: &str,
    max_attempts: u32,
    policy: WaitPolicy,
    log: &ActionLog,
) -> Result<InstanceView, RecoveryError> {
    let mut last: Option<RecoveryError> = None;

    for attempt in 1..=max_attempts {
        println!(
            "🔁 Recovery attempt {}/{} for instance {}",
            attempt, max_attempts, instance_id
        );
        match launch_replacement(provider, settings, snapshot_id, instance_id, policy, log).await {
            Ok(view) => return Ok(view),
            Err(e) => {
                eprintln!("❌ Attempt {}/{} failed: {}", attempt, max_attempts, e);
                last = Some(e);
            }
        }
    }

    Err(RecoveryError::AttemptsExhausted {
        attempts: max_attempts,
        last: last.map(Box::new),
    })
}
