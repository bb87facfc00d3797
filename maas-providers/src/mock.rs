use crate::{CloudProvider, InstanceView, LaunchRequest, DATA_DEVICE};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

const MOCK_PUBLIC_IP: &str = "203.0.113.10";

#[derive(Clone, Debug)]
struct MockInstance {
    state: String,
    target_state: Option<String>,
    /// Describe calls that still observe the pre-transition state.
    pending_polls: u32,
    public_ip: Option<String>,
    data_volume_id: Option<String>,
    describe_calls: u32,
}

#[derive(Default)]
struct MockState {
    instances: HashMap<String, MockInstance>,
    last_launch: Option<LaunchRequest>,
    run_calls: u32,
    stop_calls: u32,
}

/// In-memory provider for tests and local runs. Instances transition after a
/// configurable number of describe calls; failures are injectable per
/// operation.
pub struct MockProvider {
    state: Mutex<MockState>,
    polls_until_stopped: u32,
    polls_until_running: u32,
    assign_public_ip: bool,
    fail_run_instances: bool,
    fail_stop_instances: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            polls_until_stopped: 0,
            polls_until_running: 0,
            assign_public_ip: true,
            fail_run_instances: false,
            fail_stop_instances: false,
        }
    }

    /// Describe calls that keep reporting "stopping" before "stopped".
    pub fn with_polls_until_stopped(mut self, polls: u32) -> Self {
        self.polls_until_stopped = polls;
        self
    }

    /// Describe calls that keep reporting "pending" before "running".
    pub fn with_polls_until_running(mut self, polls: u32) -> Self {
        self.polls_until_running = polls;
        self
    }

    /// Never assign a public address, even once running.
    pub fn without_public_ip(mut self) -> Self {
        self.assign_public_ip = false;
        self
    }

    pub fn failing_run_instances(mut self) -> Self {
        self.fail_run_instances = true;
        self
    }

    pub fn failing_stop_instances(mut self) -> Self {
        self.fail_stop_instances = true;
        self
    }

    /// Register a pre-existing instance in the given state.
    pub async fn seed_instance(&self, instance_id: &str, state: &str) {
        let mut guard = self.state.lock().await;
        guard.instances.insert(
            instance_id.to_string(),
            MockInstance {
                state: state.to_string(),
                target_state: None,
                pending_polls: 0,
                public_ip: if state == "running" {
                    Some(MOCK_PUBLIC_IP.to_string())
                } else {
                    None
                },
                data_volume_id: None,
                describe_calls: 0,
            },
        );
    }

    pub async fn last_launch_request(&self) -> Option<LaunchRequest> {
        self.state.lock().await.last_launch.clone()
    }

    pub async fn describe_calls(&self, instance_id: &str) -> u32 {
        self.state
            .lock()
            .await
            .instances
            .get(instance_id)
            .map(|instance| instance.describe_calls)
            .unwrap_or(0)
    }

    pub async fn run_calls(&self) -> u32 {
        self.state.lock().await.run_calls
    }

    pub async fn stop_calls(&self) -> u32 {
        self.state.lock().await.stop_calls
    }

    fn tick(instance: &mut MockInstance, assign_public_ip: bool) {
        if let Some(target) = instance.target_state.clone() {
            if instance.pending_polls > 0 {
                instance.pending_polls -= 1;
            } else {
                instance.state = target;
                instance.target_state = None;
                if instance.state == "running" && assign_public_ip {
                    instance.public_ip = Some(MOCK_PUBLIC_IP.to_string());
                }
            }
        }
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn run_instance(&self, req: &LaunchRequest) -> Result<String> {
        let mut guard = self.state.lock().await;
        guard.run_calls += 1;
        if self.fail_run_instances {
            return Err(anyhow::anyhow!("MockProvider: RunInstances rejected"));
        }

        let instance_id = format!("i-{}", uuid::Uuid::new_v4().simple());
        let data_volume_id = if req.block_devices.contains_key(DATA_DEVICE) {
            Some(format!("vol-{}", uuid::Uuid::new_v4().simple()))
        } else {
            None
        };
        guard.instances.insert(
            instance_id.clone(),
            MockInstance {
                state: "pending".to_string(),
                target_state: Some("running".to_string()),
                pending_polls: self.polls_until_running,
                public_ip: None,
                data_volume_id,
                describe_calls: 0,
            },
        );
        guard.last_launch = Some(req.clone());
        Ok(instance_id)
    }

    async fn stop_instances(&self, instance_ids: &[String]) -> Result<bool> {
        let mut guard = self.state.lock().await;
        guard.stop_calls += 1;
        if self.fail_stop_instances {
            return Err(anyhow::anyhow!("MockProvider: StopInstances rejected"));
        }
        for instance_id in instance_ids {
            let instance = guard
                .instances
                .get_mut(instance_id)
                .ok_or_else(|| anyhow::anyhow!("MockProvider: unknown instance {}", instance_id))?;
            instance.state = "stopping".to_string();
            instance.target_state = Some("stopped".to_string());
            instance.pending_polls = self.polls_until_stopped;
        }
        Ok(true)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceView>> {
        let mut guard = self.state.lock().await;
        let assign_public_ip = self.assign_public_ip;
        let Some(instance) = guard.instances.get_mut(instance_id) else {
            return Ok(None);
        };
        instance.describe_calls += 1;
        Self::tick(instance, assign_public_ip);
        Ok(Some(InstanceView {
            instance_id: instance_id.to_string(),
            state: instance.state.clone(),
            public_ip: instance.public_ip.clone(),
            data_volume_id: instance.data_volume_id.clone(),
        }))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}
