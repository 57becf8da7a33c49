//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{InterfaceBlueprint, TransportKind};
use protocol::DEFAULT_TEST_NAMES;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    listener: ListenerInfo,
    directories: BTreeMap<&'static str, String>,
    delivery: DeliveryInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_names: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit_log: Option<String>,
}

#[derive(Serialize)]
struct ListenerInfo {
    transport: String,
    endpoint: String,
    file_prefix: String,
}

#[derive(Serialize)]
struct DeliveryInfo {
    endpoint: String,
    tenant: String,
    credential: String,
    timeout_secs: u64,
    call_mode: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

/// Where the bearer token comes from, without its value
fn describe_credential(blueprint: &InterfaceBlueprint) -> String {
    let delivery = &blueprint.delivery;
    match (&delivery.token, &delivery.token_env, &delivery.token_file) {
        (Some(_), _, _) => "static token".to_string(),
        (_, Some(var), _) => format!("environment variable {var}"),
        (_, _, Some(path)) => format!("token file {}", path.display()),
        _ => "none".to_string(),
    }
}

/// Built-in translations overlaid with the configured ones
fn effective_test_names(blueprint: &InterfaceBlueprint) -> BTreeMap<String, String> {
    let mut names: BTreeMap<String, String> = DEFAULT_TEST_NAMES
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();
    names.extend(blueprint.mapping.test_names.clone());
    names
}

fn build_config_info(blueprint: &InterfaceBlueprint, args: &InfoArgs) -> ConfigInfo {
    let transport = match blueprint.listener.transport {
        TransportKind::Tcp => "tcp",
        TransportKind::Serial => "serial",
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        listener: ListenerInfo {
            transport: transport.to_string(),
            endpoint: blueprint.listener.endpoint(),
            file_prefix: blueprint.listener.file_prefix.clone(),
        },
        directories: blueprint
            .directories
            .named()
            .into_iter()
            .map(|(field, path)| (field, path.display().to_string()))
            .collect(),
        delivery: DeliveryInfo {
            endpoint: blueprint.delivery.resolved_endpoint(),
            tenant: blueprint.delivery.tenant().to_string(),
            credential: describe_credential(blueprint),
            timeout_secs: blueprint.delivery.timeout_secs,
            call_mode: format!("{:?}", blueprint.mapping.call_mode),
        },
        test_names: args.mapping.then(|| effective_test_names(blueprint)),
        audit_log: blueprint
            .audit
            .path
            .as_ref()
            .map(|path| path.display().to_string()),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               ASTM Bridge Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Listener");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Transport: {}", info.listener.transport);
    println!("   ├─ Endpoint: {}", info.listener.endpoint);
    println!("   └─ File prefix: {}", info.listener.file_prefix);

    println!("\n📁 Directories");
    let last = info.directories.len().saturating_sub(1);
    for (i, (field, path)) in info.directories.iter().enumerate() {
        let prefix = if i == last { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, field, path);
    }

    println!("\n📤 Delivery");
    println!("   ├─ Endpoint: {}", info.delivery.endpoint);
    println!("   ├─ Tenant: {}", info.delivery.tenant);
    println!("   ├─ Credential: {}", info.delivery.credential);
    println!("   ├─ Call mode: {}", info.delivery.call_mode);
    println!("   └─ Timeout: {} s", info.delivery.timeout_secs);

    if let Some(ref names) = info.test_names {
        println!("\n🧪 Test Names ({})", names.len());
        let last = names.len().saturating_sub(1);
        for (i, (code, name)) in names.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("   {} {} → {}", prefix, code, name);
        }
    }

    match &info.audit_log {
        Some(path) => println!("\n📝 Status log: {}", path),
        None => println!("\n📝 Status log: tracing output only"),
    }

    println!();
}
