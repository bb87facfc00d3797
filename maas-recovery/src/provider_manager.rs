use maas_providers::CloudProvider;
use std::env;

pub struct ProviderManager;

impl ProviderManager {
    pub fn current_provider_name() -> String {
        env::var("PROVIDER").unwrap_or_else(|_| "ec2".to_string())
    }

    pub async fn get_provider(provider_name: &str) -> Option<Box<dyn CloudProvider>> {
        match provider_name.to_lowercase().as_str() {
            #[cfg(feature = "provider-ec2")]
            "ec2" => {
                let region = env::var("AWS_REGION").ok().map(|s| s.trim().to_string())?;
                let access_key_id = env::var("AWS_ACCESS_KEY_ID")
                    .ok()
                    .map(|s| s.trim().to_string())?;
                // Prefer *_FILE for secrets (Docker/K8s friendly), fallback to env var.
                let secret_key_file = env::var("AWS_SECRET_ACCESS_KEY_FILE")
                    .unwrap_or_else(|_| "/run/secrets/aws_secret_access_key".to_string());
                let secret_access_key = std::fs::read_to_string(&secret_key_file)
                    .ok()
                    .or_else(|| env::var("AWS_SECRET_ACCESS_KEY").ok())
                    .map(|s| s.trim().to_string())?;
                if region.is_empty() || access_key_id.is_empty() || secret_access_key.is_empty() {
                    return None;
                }
                Some(Box::new(
                    maas_providers::ec2::Ec2Provider::connect(
                        &region,
                        &access_key_id,
                        &secret_access_key,
                    )
                    .await,
                ))
            }
            #[cfg(feature = "provider-mock")]
            "mock" => Some(Box::new(maas_providers::mock::MockProvider::new())),
            // Add other providers here.
            other => {
                eprintln!("❌ Unknown or disabled provider '{}'", other);
                None
            }
        }
    }
}
