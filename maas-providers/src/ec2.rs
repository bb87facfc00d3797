use crate::{BlockDeviceMapping, CloudProvider, InstanceView, LaunchRequest, DATA_DEVICE};
use anyhow::Result;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::{EbsBlockDevice, InstanceType, VolumeType};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub struct Ec2Provider {
    client: aws_sdk_ec2::Client,
    region: String,
}

impl Ec2Provider {
    /// Connect to a region with static credentials. The SDK owns the wire
    /// protocol and request signing.
    pub async fn connect(region: &str, access_key_id: &str, secret_access_key: &str) -> Self {
        let region = region.trim().to_string();
        let credentials = Credentials::new(
            access_key_id.trim(),
            secret_access_key.trim(),
            None,
            None,
            "maas-recovery",
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        Self {
            client: aws_sdk_ec2::Client::new(&config),
            region,
        }
    }

    fn sdk_block_device_mappings(
        mapping: &BlockDeviceMapping,
    ) -> Vec<aws_sdk_ec2::types::BlockDeviceMapping> {
        mapping
            .iter()
            .map(|(device, spec)| {
                let mut ebs = EbsBlockDevice::builder();
                if let Some(size_gb) = spec.size_gb {
                    ebs = ebs.volume_size(size_gb);
                }
                if let Some(ref volume_type) = spec.volume_type {
                    ebs = ebs.volume_type(VolumeType::from(volume_type.as_str()));
                }
                if let Some(iops) = spec.iops {
                    ebs = ebs.iops(iops);
                }
                if let Some(delete) = spec.delete_on_termination {
                    ebs = ebs.delete_on_termination(delete);
                }
                if let Some(ref snapshot_id) = spec.snapshot_id {
                    ebs = ebs.snapshot_id(snapshot_id);
                }
                aws_sdk_ec2::types::BlockDeviceMapping::builder()
                    .device_name(device)
                    .ebs(ebs.build())
                    .build()
            })
            .collect()
    }
}

#[async_trait]
impl CloudProvider for Ec2Provider {
    async fn run_instance(&self, req: &LaunchRequest) -> Result<String> {
        eprintln!(
            "🔵 [EC2 API] RunInstances - type={}, image={}, region={}, subnet={}",
            req.instance_type, req.image_id, self.region, req.subnet_id
        );
        eprintln!(
            "🔵 [EC2 API] Block device mappings: {}",
            serde_json::to_string_pretty(&req.block_devices).unwrap_or_default()
        );

        let resp = self
            .client
            .run_instances()
            .image_id(&req.image_id)
            .instance_type(InstanceType::from(req.instance_type.as_str()))
            .key_name(&req.key_name)
            .set_security_group_ids(Some(req.security_group_ids.clone()))
            .subnet_id(&req.subnet_id)
            .set_block_device_mappings(Some(Self::sdk_block_device_mappings(&req.block_devices)))
            .user_data(BASE64.encode(req.user_data.as_bytes()))
            .min_count(1)
            .max_count(1)
            .send()
            .await
            .map_err(|e| {
                eprintln!("❌ [EC2 API] RunInstances failed: {}", DisplayErrorContext(&e));
                anyhow::anyhow!("EC2 RunInstances failed: {}", DisplayErrorContext(&e))
            })?;

        let instance = resp
            .instances()
            .first()
            .ok_or_else(|| anyhow::anyhow!("EC2 RunInstances returned an empty reservation"))?;
        let instance_id = instance
            .instance_id()
            .ok_or_else(|| anyhow::anyhow!("no instance id in RunInstances reservation"))?
            .to_string();

        eprintln!(
            "✅ [EC2 API] Instance created: id={}, state={}",
            instance_id,
            instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str())
                .unwrap_or("unknown")
        );
        Ok(instance_id)
    }

    async fn stop_instances(&self, instance_ids: &[String]) -> Result<bool> {
        eprintln!("🔵 [EC2 API] StopInstances - ids={:?}", instance_ids);
        let resp = self
            .client
            .stop_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| {
                eprintln!("❌ [EC2 API] StopInstances failed: {}", DisplayErrorContext(&e));
                anyhow::anyhow!("EC2 StopInstances failed: {}", DisplayErrorContext(&e))
            })?;
        eprintln!(
            "✅ [EC2 API] StopInstances accepted for {} instance(s)",
            resp.stopping_instances().len()
        );
        Ok(!resp.stopping_instances().is_empty())
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceView>> {
        let resp = match self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                // Freshly launched instances can be invisible to describe
                // calls for a short window.
                let not_found = e
                    .as_service_error()
                    .and_then(|service_error| service_error.code())
                    .is_some_and(|code| code.contains("InvalidInstanceID"));
                if not_found {
                    eprintln!(
                        "⚠️ [EC2 API] DescribeInstances: instance {} not visible yet",
                        instance_id
                    );
                    return Ok(None);
                }
                return Err(anyhow::anyhow!(
                    "EC2 DescribeInstances failed: {}",
                    DisplayErrorContext(&e)
                ));
            }
        };

        let Some(instance) = resp
            .reservations()
            .first()
            .and_then(|reservation| reservation.instances().first())
        else {
            eprintln!(
                "⚠️ [EC2 API] DescribeInstances returned no reservation for {}",
                instance_id
            );
            return Ok(None);
        };

        let state = instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string();

        let data_volume_id = instance
            .block_device_mappings()
            .iter()
            .find(|mapping| mapping.device_name() == Some(DATA_DEVICE))
            .and_then(|mapping| mapping.ebs())
            .and_then(|ebs| ebs.volume_id())
            .map(|id| id.to_string());

        Ok(Some(InstanceView {
            instance_id: instance
                .instance_id()
                .unwrap_or(instance_id)
                .to_string(),
            state,
            public_ip: instance.public_ip_address().map(|ip| ip.to_string()),
            data_volume_id,
        }))
    }
}
