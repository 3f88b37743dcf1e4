// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agentry_core::domain::lifecycle::LifecycleStatus;
use agentry_core::domain::system::SystemFilter;

use super::agent::{colored_status, print_counts};
use crate::embedded::EmbeddedServices;

#[derive(Subcommand)]
pub enum SystemCommand {
    /// List systems
    List {
        #[arg(long)]
        status: Option<LifecycleStatus>,

        #[arg(long)]
        category: Option<String>,

        /// Only built-in (true) or only user-defined (false) systems
        #[arg(long)]
        built_in: Option<bool>,
    },

    /// Show a system (YAML)
    Show {
        #[arg(value_name = "SYSTEM_ID")]
        system_id: String,
    },

    /// Delete a user-defined system
    Delete {
        #[arg(value_name = "SYSTEM_ID")]
        system_id: String,
    },

    /// Count systems per status
    Stats,
}

pub async fn handle_command(command: SystemCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = EmbeddedServices::new(config_path).await?;

    match command {
        SystemCommand::List {
            status,
            category,
            built_in,
        } => {
            let systems = services
                .systems
                .list_systems(SystemFilter {
                    status,
                    category,
                    built_in,
                })
                .await?;

            if systems.is_empty() {
                println!("{}", "No systems found".yellow());
                return Ok(());
            }

            println!("{} systems found:", systems.len());
            println!(
                "{:<38} {:<24} {:<12} {:<10} {}",
                "ID", "NAME", "CATEGORY", "STATUS", "AGENTS"
            );
            for system in systems {
                let name = if system.built_in {
                    format!("{} (built-in)", system.name)
                } else {
                    system.name.clone()
                };
                println!(
                    "{:<38} {:<24} {:<12} {:<10} {}",
                    system.id,
                    name.bold(),
                    system.category,
                    colored_status(system.status),
                    system.agent_ids.len()
                );
            }
            Ok(())
        }
        SystemCommand::Show { system_id } => {
            let system = services
                .systems
                .get_system(&system_id)
                .await?
                .with_context(|| format!("System not found: {}", system_id))?;
            println!("{}", serde_yaml::to_string(&system)?);
            Ok(())
        }
        SystemCommand::Delete { system_id } => {
            if services.systems.delete_system(&system_id).await? {
                println!("{}", format!("✓ System {} deleted", system_id).green());
            } else {
                println!("{}", format!("System {} not found", system_id).yellow());
            }
            Ok(())
        }
        SystemCommand::Stats => {
            let counts = services.systems.status_counts().await?;
            print_counts("Systems", &counts);
            Ok(())
        }
    }
}
