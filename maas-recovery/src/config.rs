use std::env;

/// Static launch settings for the replacement instance, consumed as-is from
/// the environment. Provider credentials are read separately by the provider
/// manager.
#[derive(Clone, Debug)]
pub struct Settings {
    pub instance_type: String,
    /// Declared size with a trailing unit character, e.g. "20G".
    pub data_volume_size: String,
    pub data_volume_rate: i32,
    pub data_volume_type: String,
    pub image_id: String,
    pub key_name: String,
    pub security_group_ids: Vec<String>,
    pub subnet_id: String,
    /// Operator-supplied line handed through to the boot script.
    pub recovery_payload: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            instance_type: require("INSTANCE_TYPE")?,
            data_volume_size: require("DATA_VOLUME_SIZE")?,
            data_volume_rate: env::var("DATA_VOLUME_RATE")
                .unwrap_or_default()
                .trim()
                .parse()
                .unwrap_or(0),
            data_volume_type: require("DATA_VOLUME_TYPE")?,
            image_id: require("AWS_AMI_IMAGE_ID")?,
            key_name: require("AWS_KEY_NAME")?,
            security_group_ids: require("AWS_SECURITY_GROUPS")?
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            subnet_id: require("AWS_SUBNET_ID")?,
            recovery_payload: env::var("RECOVERY_PAYLOAD").unwrap_or_default(),
        })
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    let value = env::var(key).map_err(|_| anyhow::anyhow!("{} must be set", key))?;
    Ok(value.trim().to_string())
}
