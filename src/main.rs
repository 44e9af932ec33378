use clap::Parser;
use contact_relay::config::cli::{Command, UploadArgs, ValidateArgs};
use contact_relay::utils::error::ErrorSeverity;
use contact_relay::utils::{logger, validation::Validate};
use contact_relay::{
    read_rows_from_path, server, BatchDispatcher, Cli, DispatchSettings, EventTransformer,
    HttpTransport, RelayConfig, RelayError, RowValidator, UploadOrchestrator,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match &cli.command {
        Command::Serve(_) => logger::init_server_logger(&config.logging.level, config.logging.json),
        _ => logger::init_cli_logger(cli.verbose),
    }

    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let result = match &cli.command {
        Command::Upload(args) => run_upload(&config, args).await,
        Command::Validate(args) => run_validate(&config, args),
        Command::Serve(_) => server::serve(&config).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

fn run_validate(config: &RelayConfig, args: &ValidateArgs) -> contact_relay::Result<()> {
    let rows = read_rows_from_path(&args.file)?;
    let validator = RowValidator::new(config.facility_registry()?);

    let report = validator.validate_rows(&rows);
    if report.valid() {
        println!("✅ {} rows are valid", rows.len());
        return Ok(());
    }

    for message in report.messages() {
        println!("{}", message);
    }
    Err(RelayError::ValidationError {
        message: format!("{} problems found in {} rows", report.errors.len(), rows.len()),
    })
}

async fn run_upload(config: &RelayConfig, args: &UploadArgs) -> contact_relay::Result<()> {
    let target_url = config
        .upload
        .target_url
        .clone()
        .ok_or_else(|| RelayError::MissingConfigError {
            field: "upload.target_url".to_string(),
        })?;

    let file_name = args.file_name.clone().unwrap_or_else(|| {
        args.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string())
    });

    tracing::info!("📁 Reading rows from {}", args.file.display());
    let rows = read_rows_from_path(&args.file)?;

    let transport = HttpTransport::from_config(&config.dispatch)?;
    let dispatcher =
        BatchDispatcher::new(transport).with_settings(DispatchSettings::from(&config.dispatch));
    let orchestrator = UploadOrchestrator::new(
        RowValidator::new(config.facility_registry()?),
        EventTransformer::new(config.upload.event_type),
        dispatcher,
    );

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - events are printed, not sent");
        return match orchestrator.prepare(&rows, &file_name) {
            Ok(events) => {
                println!("{}", serde_json::to_string_pretty(&events)?);
                Ok(())
            }
            Err(report) => {
                for message in report.messages() {
                    println!("{}", message);
                }
                Err(RelayError::ValidationError {
                    message: format!("{} problems found", report.errors.len()),
                })
            }
        };
    }

    let on_progress = |processed: usize, total: usize| {
        tracing::info!("📊 Progress: {}/{} events delivered", processed, total);
    };

    let result = orchestrator
        .run(
            &rows,
            &file_name,
            &target_url,
            config.dispatch.batch_size,
            Some(&on_progress),
        )
        .await?;

    for issue in &result.errors {
        println!("{}", issue.message);
    }

    if result.event_ids.is_empty() {
        return Err(RelayError::ValidationError {
            message: format!("{} problems found, nothing was sent", result.errors.len()),
        });
    }

    println!(
        "✅ Sent {}/{} rows to {}",
        result.processed_rows,
        result.event_ids.len(),
        target_url
    );

    if !result.success {
        return Err(RelayError::DeliveryError {
            failed: result.errors.len(),
            total: result.event_ids.len(),
        });
    }

    Ok(())
}
