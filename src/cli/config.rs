//! CLI command for managing nodeops configuration.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use nodeops::config::{Config, TargetConfig};

#[derive(Args)]
#[command(about = "Manage nodeops configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// List all configured targets
    ListTargets,

    /// Add or update a named target
    AddTarget {
        /// Name for the target (e.g., "controller", "minio")
        name: String,

        /// Hostname or IP address
        #[arg(long)]
        host: String,

        /// SSH username
        #[arg(long)]
        user: String,

        /// SSH port
        #[arg(long, default_value = "22")]
        port: u16,

        /// Path to SSH private key
        #[arg(long)]
        ssh_key: Option<String>,
    },

    /// Remove a named target
    RemoveTarget {
        /// Name of the target to remove
        name: String,
    },

    /// Initialize a new configuration file with example targets
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show => self.show_config(),
            ConfigAction::Path => self.show_path(),
            ConfigAction::ListTargets => self.list_targets(),
            ConfigAction::AddTarget {
                name,
                host,
                user,
                port,
                ssh_key,
            } => self.add_target(name, host, user, *port, ssh_key.clone()),
            ConfigAction::RemoveTarget { name } => self.remove_target(name),
            ConfigAction::Init { force } => self.init_config(*force),
        }
    }

    fn show_config(&self) -> Result<()> {
        let config = Config::load()?;
        print!("{}", serde_yaml::to_string(&config)?);
        Ok(())
    }

    fn show_path(&self) -> Result<()> {
        match Config::default_path() {
            Some(path) => {
                println!("Configuration file path: {}", path.display());
                if path.exists() {
                    println!("Status: File exists");
                } else {
                    println!("Status: File does not exist (built-in defaults apply)");
                }
            }
            None => println!("Could not determine configuration directory"),
        }
        Ok(())
    }

    fn list_targets(&self) -> Result<()> {
        let config = Config::load()?;

        if config.targets.is_empty() {
            println!("No targets configured.");
            return Ok(());
        }

        println!("Configured targets:");
        println!();
        for (name, target) in &config.targets {
            let key = target.ssh_key.as_deref().unwrap_or("(password/agent)");
            println!("  {} - {} (key: {})", name, target.connection_string(), key);
        }
        Ok(())
    }

    fn add_target(
        &self,
        name: &str,
        host: &str,
        user: &str,
        port: u16,
        ssh_key: Option<String>,
    ) -> Result<()> {
        let mut config = Config::load()?;

        if config.get_target(name).is_some() {
            println!("Warning: Target '{}' already exists, updating...", name);
        }

        let mut target = TargetConfig::new(host.to_string(), user.to_string()).with_port(port);
        if let Some(key) = ssh_key {
            target = target.with_ssh_key(key);
        }

        config.set_target(name.to_string(), target);
        config.save()?;

        println!("Added target '{}'", name);
        Ok(())
    }

    fn remove_target(&self, name: &str) -> Result<()> {
        let mut config = Config::load()?;

        if config.remove_target(name).is_some() {
            config.save()?;
            println!("Removed target '{}'", name);
        } else {
            println!("Target '{}' not found", name);
        }
        Ok(())
    }

    fn init_config(&self, force: bool) -> Result<()> {
        let path = Config::default_path()
            .ok_or_else(|| anyhow!("Could not determine configuration directory"))?;

        if path.exists() && !force {
            println!("Configuration file already exists at: {}", path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let mut config = Config::default();
        config.set_target(
            "controller".to_string(),
            TargetConfig::new("k8s-cp-01.example.com".to_string(), "ops".to_string()),
        );
        config.set_target(
            "minio".to_string(),
            TargetConfig::new("minio-01.example.com".to_string(), "ops".to_string())
                .with_ssh_key("~/.ssh/id_ed25519".to_string()),
        );
        config.save_to(&path)?;

        println!("Created configuration file at: {}", path.display());
        println!();
        println!("Example targets have been added. Edit the file to describe your hosts:");
        println!("  nodeops config show");
        println!();
        println!("Or add targets via CLI:");
        println!("  nodeops config add-target controller --host cp.example.com --user ops");
        Ok(())
    }
}
