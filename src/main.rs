use anyhow::Context;
use clap::Parser;
use urllist_sync::core::reporter;
use urllist_sync::domain::model::DeployOutcome;
use urllist_sync::utils::logger;
use urllist_sync::{
    CliConfig, ConfigLayer, LocalStorage, ReqwestTransport, RunConfig, RunStatus, SyncEngine,
    SyncError, TomlConfig,
};

fn load_config(cli: &CliConfig) -> urllist_sync::Result<RunConfig> {
    let file_layer = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path.display());
            TomlConfig::from_file(path)?.to_layer()
        }
        None => ConfigLayer::default(),
    };

    // 命令列參數優先於設定檔
    RunConfig::from_layer(cli.to_layer().or(file_layer))
}

fn exit_with(error: &SyncError) -> ! {
    tracing::error!(
        "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 {}", error.recovery_suggestion());

    std::process::exit(error.exit_code());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            exit_with(&e);
        }
    };
    tracing::debug!("Run config: mode={}, list='{}', tenant={}", config.mode, config.list_name, config.tenant);

    let source = config.source.clone();
    let engine = SyncEngine::new(config, ReqwestTransport::new(), LocalStorage::default());

    if cli.dry_run {
        tracing::info!("🧪 Dry run: no list API calls will be made");
        match engine.plan_only().await {
            Ok(prepared) => {
                println!(
                    "{}",
                    reporter::render_plan(&source, &prepared.normalized, &prepared.plan)
                );
                return Ok(());
            }
            Err(e) => exit_with(&e),
        }
    }

    let summary = match engine.run().await {
        Ok(summary) => summary,
        Err(e) => exit_with(&e),
    };

    let output = if cli.json {
        reporter::to_json(&summary).context("rendering run summary as JSON")?
    } else {
        reporter::render(&summary)
    };
    println!("{}", output);

    if summary.status == RunStatus::DeployFailed {
        let reason = match &summary.deploy {
            DeployOutcome::Failed(reason) => reason.clone(),
            _ => String::new(),
        };
        let error = SyncError::Deploy { reason };
        eprintln!("⚠️ {}", error.user_friendly_message());
        eprintln!("💡 {}", error.recovery_suggestion());
        std::process::exit(error.exit_code());
    }

    tracing::info!("✅ Sync completed successfully!");
    Ok(())
}
