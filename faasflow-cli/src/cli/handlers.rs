//! Configuration handling

use anyhow::{Context, Result};
use faasflow_core::models::Configuration;
use std::path::{Path, PathBuf};

/// Resolve the configuration file, falling back to the XDG default
fn resolve_config_path(config_file: Option<&Path>) -> Result<PathBuf> {
    match config_file {
        Some(path) => Ok(path.to_path_buf()),
        None => Configuration::default_config_path(),
    }
}

/// Load and validate the configuration used by a run
///
/// A missing file yields the defaults. When no path was given and the
/// config directory cannot be determined, the defaults are used as well.
pub fn load_configuration(config_file: Option<&Path>) -> Result<Configuration> {
    let config = match resolve_config_path(config_file) {
        Ok(path) => Configuration::load_from_file(&path)?,
        Err(e) if config_file.is_none() => {
            tracing::debug!(error = %e, "No config directory, using defaults");
            Configuration::default()
        }
        Err(e) => return Err(e),
    };

    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("Invalid configuration: {}", errors.join("; ")))?;

    Ok(config)
}

/// Handle `config --init`: write defaults, or re-save an existing file
pub async fn handle_config_init(config_file: Option<PathBuf>) -> Result<()> {
    println!("⚙️  Initializing faasflow configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config_path = resolve_config_path(config_file.as_deref())
        .context("Failed to get default config path")?;
    println!("📄 Config file: {}", config_path.display());

    let config = if config_path.exists() {
        println!("⚠️  Configuration file already exists. Loading existing values...");
        Configuration::load_from_file(&config_path).context("Failed to load existing config")?
    } else {
        println!("✨ Creating new configuration with defaults...");
        Configuration::default()
    };

    println!("\n🔍 Validating configuration...");
    match config.validate() {
        Ok(()) => println!("✅ Configuration is valid"),
        Err(errors) => {
            println!("❌ Configuration validation failed:");
            for error in &errors {
                println!("   - {}", error);
            }
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("\n💾 Saving configuration to {}...", config_path.display());
    config
        .save_to_file(&config_path)
        .context("Failed to save configuration")?;

    println!("✅ Configuration saved successfully!");
    println!("\n📋 Configuration summary:");
    println!("   Gateway: {}", config.gateway);
    println!(
        "   Namespace: {}",
        config.namespace.as_deref().unwrap_or("none")
    );
    println!("   Content type: {}", config.content_type);
    println!("   HTTP method: {}", config.http_method);
    println!(
        "   TLS verification: {}",
        if config.tls_insecure { "disabled" } else { "enabled" }
    );
    println!(
        "   Max steps: {}",
        config
            .max_steps
            .map(|steps| steps.to_string())
            .unwrap_or_else(|| "unbounded".to_string())
    );
    println!("   Log level: {:?}", config.log_level);

    Ok(())
}
