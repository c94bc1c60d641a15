use clap::Parser;
use command_module::app::builtin_registry;
use command_module::utils::error::ErrorSeverity;
use command_module::utils::{logger, validation::Validate};
use command_module::{BatchConfig, BatchRunner, CliConfig, ModuleError};
use std::sync::Arc;

fn main() {
    let cli = CliConfig::parse();

    if let Err(e) = run(&cli) {
        tracing::error!(
            "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn run(cli: &CliConfig) -> Result<(), ModuleError> {
    if let Err(e) = cli.validate() {
        logger::init_logger(cli.verbose, None, cli.json_logs);
        return Err(e);
    }

    let registry = builtin_registry()?;

    if cli.list {
        logger::init_logger(cli.verbose, None, cli.json_logs);
        for name in registry.names() {
            let Some(factory) = registry.get(name) else {
                continue;
            };
            println!("{:<12} {}", name, factory.description().unwrap_or(""));
            for parameter in factory.parameters() {
                println!(
                    "    {:<12} {:<13} {}{}",
                    parameter.name,
                    parameter.direction.to_string(),
                    parameter.type_name,
                    if parameter.required { " (required)" } else { "" }
                );
            }
        }
        return Ok(());
    }

    let path = cli.config.as_deref().ok_or_else(|| ModuleError::MissingConfigError {
        field: "config".to_string(),
    })?;
    let config = match BatchConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger(cli.verbose, None, cli.json_logs);
            return Err(e);
        }
    };
    logger::init_logger(cli.verbose, config.log_level(), cli.json_logs || config.json_logs());

    tracing::info!("Starting batch '{}' from {}", config.batch.name, path.display());
    config.validate()?;
    config.validate_against(&registry)?;

    let runner = BatchRunner::new(Arc::new(registry))
        .fail_fast(config.fail_fast())
        .with_monitoring(cli.monitor || config.monitoring_enabled());

    let results = runner.execute(&config.steps)?;
    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }

    let summary = BatchRunner::summary(&results);
    tracing::info!("✅ Batch '{}' finished: {:?}", config.batch.name, summary);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
