use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Device path of the root (boot) volume.
pub const ROOT_DEVICE: &str = "/dev/sda1";

/// Device path of the data volume. The recovered data volume is always
/// attached here; describe results report its volume id under this path.
pub const DATA_DEVICE: &str = "/dev/xvdf";

/// Volume type that takes a provisioned rate (IOPS). Other types ignore it.
pub const RATE_PROVISIONED_TYPE: &str = "io1";

/// Descriptor for one virtual device in a launch request. `None` fields are
/// left to the provider's defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BlockDeviceSpec {
    pub size_gb: Option<i32>,
    pub volume_type: Option<String>,
    pub iops: Option<i32>,
    pub delete_on_termination: Option<bool>,
    pub snapshot_id: Option<String>,
}

/// Device path -> descriptor, specified at instance-launch time.
pub type BlockDeviceMapping = BTreeMap<String, BlockDeviceSpec>;

/// Everything a provider needs to boot a replacement instance.
#[derive(Clone, Debug, Serialize)]
pub struct LaunchRequest {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub security_group_ids: Vec<String>,
    pub subnet_id: String,
    pub block_devices: BlockDeviceMapping,
    pub user_data: String,
}

/// Provider-owned instance state as observed by polling. The provider owns
/// the lifecycle; callers only ever read this snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct InstanceView {
    pub instance_id: String,
    pub state: String,
    pub public_ip: Option<String>,
    /// Volume id attached at [`DATA_DEVICE`], when the instance has one.
    pub data_volume_id: Option<String>,
}

#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Request a new instance; returns the provider's instance id.
    async fn run_instance(&self, req: &LaunchRequest) -> Result<String>;

    async fn stop_instances(&self, instance_ids: &[String]) -> Result<bool>;

    /// One reservation lookup. `None` when the provider does not know the id
    /// (yet) - fresh instances can be briefly invisible to describe calls.
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceView>>;

    // Default implementations go through describe so providers only have to
    // implement the single lookup.
    async fn get_instance_state(&self, instance_id: &str) -> Result<Option<String>> {
        Ok(self.describe_instance(instance_id).await?.map(|view| view.state))
    }

    async fn get_instance_ip(&self, instance_id: &str) -> Result<Option<String>> {
        Ok(self
            .describe_instance(instance_id)
            .await?
            .and_then(|view| view.public_ip))
    }
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "ec2")]
pub mod ec2;
