//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{InterfaceBlueprint, TransportKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    listener: String,
    input_dir: String,
    endpoint: String,
    test_name_overrides: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    listener: blueprint.listener.endpoint(),
                    input_dir: blueprint.directories.input.display().to_string(),
                    endpoint: blueprint.delivery.resolved_endpoint(),
                    test_name_overrides: blueprint.mapping.test_names.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &InterfaceBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let delivery = &blueprint.delivery;

    if delivery.token.is_none() && delivery.token_env.is_none() && delivery.token_file.is_none() {
        warnings.push("No delivery credential configured - requests are sent without a bearer token".to_string());
    }

    if delivery.token.is_some() {
        warnings.push("delivery.token stores the credential in the config file - prefer token_env or token_file".to_string());
    }

    if delivery.endpoint.is_none() && delivery.user_name.is_none() {
        warnings.push(format!(
            "delivery.user_name is not set - using default tenant {}",
            delivery.tenant()
        ));
    }

    if delivery.resolved_endpoint().starts_with("http://") {
        warnings.push("Delivery endpoint is not HTTPS - the bearer token is sent in clear text".to_string());
    }

    if delivery.timeout_secs == 0 {
        warnings.push("delivery.timeout_secs is 0 - a stalled backend blocks the pass indefinitely".to_string());
    }

    if blueprint.audit.path.is_none() {
        warnings.push("audit.path is not set - status records go to the log output only".to_string());
    }

    if blueprint.listener.transport == TransportKind::Tcp && blueprint.listener.tcp_host == "0.0.0.0" {
        warnings.push("Listener binds all interfaces - restrict tcp_host to the instrument network".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Listener: {}", summary.listener);
            println!("  Input directory: {}", summary.input_dir);
            println!("  Endpoint: {}", summary.endpoint);
            println!("  Test name overrides: {}", summary.test_name_overrides);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
