// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-only views over execution history

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use agentry_core::domain::execution::{Execution, ExecutionStatus};

use crate::embedded::EmbeddedServices;

#[derive(Subcommand)]
pub enum ExecutionCommand {
    /// Show one execution as JSON
    Show {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: String,
    },

    /// List executions, newest first
    List {
        /// Only executions of this system
        #[arg(long)]
        system: Option<String>,

        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn handle_command(command: ExecutionCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = EmbeddedServices::new(config_path).await?;

    match command {
        ExecutionCommand::Show { execution_id } => {
            let execution = services
                .get_execution(&execution_id)
                .await?
                .with_context(|| format!("Execution not found: {}", execution_id))?;
            println!("{}", serde_json::to_string_pretty(&execution)?);
            Ok(())
        }
        ExecutionCommand::List { system, limit } => {
            let executions = services.list_executions(system.as_deref(), limit).await?;
            if executions.is_empty() {
                println!("{}", "No executions found".yellow());
                return Ok(());
            }

            println!("{:<38} {:<38} {:<10} {}", "ID", "SYSTEM", "STATUS", "STARTED");
            for execution in executions {
                print_row(&execution);
            }
            Ok(())
        }
    }
}

fn print_row(execution: &Execution) {
    let status = match execution.status {
        ExecutionStatus::Pending => "pending".dimmed(),
        ExecutionStatus::Running => "running".cyan(),
        ExecutionStatus::Completed => "completed".green(),
        ExecutionStatus::Failed => "failed".red(),
    };
    let started = execution
        .started_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<38} {:<38} {:<10} {}",
        execution.id, execution.system_id, status, started
    );
    if let Some(failure) = &execution.error {
        println!("    {}", format!("{:?}: {}", failure.kind, failure.message).red());
    }
}
