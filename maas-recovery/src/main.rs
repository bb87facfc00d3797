use dotenv::dotenv;
use std::error::Error as _;

use maas_recovery::config::Settings;
use maas_recovery::logger::ActionLog;
use maas_recovery::provider_manager::ProviderManager;
use maas_recovery::recovery::{self, DEFAULT_MAX_ATTEMPTS};
use maas_recovery::wait::WaitPolicy;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (snapshot_arg, instance_id) = match (args.next(), args.next()) {
        (Some(snapshot), Some(instance)) => (snapshot, instance),
        _ => {
            eprintln!("Usage: maas-recovery <snapshot-id|-> <instance-id>");
            std::process::exit(2);
        }
    };
    let snapshot_id = match snapshot_arg.as_str() {
        "-" | "" => None,
        snapshot => Some(snapshot.to_string()),
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Bad configuration: {}", e);
            std::process::exit(2);
        }
    };

    let provider_name = ProviderManager::current_provider_name();
    let Some(provider) = ProviderManager::get_provider(&provider_name).await else {
        eprintln!(
            "❌ Provider '{}' is not configured (check PROVIDER and credentials)",
            provider_name
        );
        std::process::exit(2);
    };

    let log = ActionLog::new();
    println!(
        "🔄 Recovering instance {} (snapshot: {})",
        instance_id,
        snapshot_id.as_deref().unwrap_or("none")
    );

    match recovery::create_instance(
        provider.as_ref(),
        &settings,
        snapshot_id.as_deref(),
        &instance_id,
        DEFAULT_MAX_ATTEMPTS,
        WaitPolicy::default(),
        &log,
    )
    .await
    {
        Ok(view) => {
            println!(
                "✅ Recovered: instance {} running at {}",
                view.instance_id,
                view.public_ip.as_deref().unwrap_or("")
            );
            if let Some(volume_id) = view.data_volume_id.as_deref() {
                println!("💾 Data volume attached: {}", volume_id);
            }
        }
        Err(e) => {
            eprintln!("❌ Recovery failed: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("   caused by: {}", cause);
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}
