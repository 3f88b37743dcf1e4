// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use agentry_core::domain::agent::{AgentFilter, CustomAgent, NewAgent};
use agentry_core::domain::lifecycle::{LifecycleStatus, StatusCounts};

use crate::embedded::EmbeddedServices;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List agents
    List {
        /// Only agents in this status (draft, active, archived)
        #[arg(long)]
        status: Option<LifecycleStatus>,

        /// Only agents with this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show agent configuration (YAML)
    Show {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Create an agent, from flags or a YAML/JSON file
    Create {
        /// Agent definition file
        #[arg(short, long, value_name = "FILE", conflicts_with = "name")]
        file: Option<PathBuf>,

        #[arg(long, required_unless_present = "file")]
        name: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        system_prompt: String,
    },

    /// Move a draft agent to active
    Activate {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Archive an active agent, or restore an archived one
    Archive {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Delete an agent permanently
    Delete {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Count agents per status
    Stats,
}

pub async fn handle_command(command: AgentCommand, config_path: Option<PathBuf>) -> Result<()> {
    let services = EmbeddedServices::new(config_path).await?;

    match command {
        AgentCommand::List { status, owner } => list_agents(&services, status, owner).await,
        AgentCommand::Show { agent_id } => show_agent(&services, &agent_id).await,
        AgentCommand::Create {
            file,
            name,
            description,
            system_prompt,
        } => {
            let draft = match file {
                Some(path) => read_definition(&path)?,
                None => NewAgent {
                    name: name.unwrap_or_default(),
                    description,
                    system_prompt,
                    ..Default::default()
                },
            };
            create_agent(&services, draft).await
        }
        AgentCommand::Activate { agent_id } => {
            let agent = services.agents.activate_agent(&agent_id).await?;
            println!("{}", format!("✓ Agent {} is now {}", agent.id, agent.status).green());
            Ok(())
        }
        AgentCommand::Archive { agent_id } => {
            let agent = services.agents.toggle_archive_agent(&agent_id).await?;
            println!("{}", format!("✓ Agent {} is now {}", agent.id, agent.status).green());
            Ok(())
        }
        AgentCommand::Delete { agent_id } => delete_agent(&services, &agent_id).await,
        AgentCommand::Stats => {
            let counts = services.agents.status_counts().await?;
            print_counts("Agents", &counts);
            Ok(())
        }
    }
}

fn read_definition(path: &Path) -> Result<NewAgent> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read agent definition: {:?}", path))?;
    // YAML is a superset of JSON, so one parser covers both
    serde_yaml::from_str(&content).context("Failed to parse agent definition")
}

async fn list_agents(
    services: &EmbeddedServices,
    status: Option<LifecycleStatus>,
    owner: Option<String>,
) -> Result<()> {
    let agents = services
        .agents
        .list_agents(AgentFilter { status, owner })
        .await?;

    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", agents.len());
    println!("{:<38} {:<24} {:<10} {}", "ID", "NAME", "STATUS", "UPDATED");
    for agent in agents {
        println!(
            "{:<38} {:<24} {:<10} {}",
            agent.id,
            agent.name.bold(),
            colored_status(agent.status),
            agent.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn show_agent(services: &EmbeddedServices, agent_id: &str) -> Result<()> {
    let agent: CustomAgent = services
        .agents
        .get_agent(agent_id)
        .await?
        .with_context(|| format!("Agent not found: {}", agent_id))?;
    println!("{}", serde_yaml::to_string(&agent)?);
    Ok(())
}

async fn create_agent(services: &EmbeddedServices, draft: NewAgent) -> Result<()> {
    let agent = services.agents.create_agent(draft).await?;
    println!(
        "{}",
        format!("✓ Agent '{}' created with ID {}", agent.name, agent.id).green()
    );
    Ok(())
}

async fn delete_agent(services: &EmbeddedServices, agent_id: &str) -> Result<()> {
    if services.agents.delete_agent(agent_id).await? {
        println!("{}", format!("✓ Agent {} deleted", agent_id).green());
    } else {
        println!("{}", format!("Agent {} not found", agent_id).yellow());
    }
    Ok(())
}

pub(crate) fn colored_status(status: LifecycleStatus) -> colored::ColoredString {
    match status {
        LifecycleStatus::Draft => status.as_str().yellow(),
        LifecycleStatus::Active => status.as_str().green(),
        LifecycleStatus::Archived => status.as_str().dimmed(),
    }
}

pub(crate) fn print_counts(label: &str, counts: &StatusCounts) {
    println!("{}", format!("{}:", label).bold());
    println!("  draft:    {}", counts.draft);
    println!("  active:   {}", counts.active);
    println!("  archived: {}", counts.archived);
    println!("  total:    {}", counts.total);
}
