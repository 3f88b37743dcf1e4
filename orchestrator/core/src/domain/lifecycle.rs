// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Status lifecycle shared by agents and systems.
//!
//! ```text
//! draft --activate--> active <--toggle_archive--> archived
//! ```
//!
//! There is no way back to `draft`, and `draft` cannot be archived directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 3] = [Self::Draft, Self::Active, Self::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    /// `draft -> active`; any other starting state is rejected
    pub fn activate(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Draft => Ok(Self::Active),
            other => Err(LifecycleError {
                from: other,
                action: "activate",
            }),
        }
    }

    /// `active <-> archived`; drafts must be activated first
    pub fn toggle_archive(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Active => Ok(Self::Archived),
            Self::Archived => Ok(Self::Active),
            Self::Draft => Err(LifecycleError {
                from: self,
                action: "toggle archive",
            }),
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot {action} from status '{from}'")]
pub struct LifecycleError {
    pub from: LifecycleStatus,
    pub action: &'static str,
}

/// Per-status tallies produced by the services' `status_counts`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub active: usize,
    pub archived: usize,
    pub total: usize,
}

impl StatusCounts {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = LifecycleStatus>,
    {
        statuses.into_iter().fold(Self::default(), |mut counts, status| {
            match status {
                LifecycleStatus::Draft => counts.draft += 1,
                LifecycleStatus::Active => counts.active += 1,
                LifecycleStatus::Archived => counts.archived += 1,
            }
            counts.total += 1;
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_only_from_draft() {
        assert_eq!(LifecycleStatus::Draft.activate(), Ok(LifecycleStatus::Active));
        assert!(LifecycleStatus::Active.activate().is_err());
        assert!(LifecycleStatus::Archived.activate().is_err());
    }

    #[test]
    fn test_toggle_archive_round_trip() {
        let archived = LifecycleStatus::Active.toggle_archive().unwrap();
        assert_eq!(archived, LifecycleStatus::Archived);
        assert_eq!(archived.toggle_archive().unwrap(), LifecycleStatus::Active);
        assert!(LifecycleStatus::Draft.toggle_archive().is_err());
    }

    #[test]
    fn test_tally() {
        let counts = StatusCounts::tally([
            LifecycleStatus::Draft,
            LifecycleStatus::Active,
            LifecycleStatus::Active,
        ]);
        assert_eq!(counts.draft, 1);
        assert_eq!(counts.active, 2);
        assert_eq!(counts.archived, 0);
        assert_eq!(counts.total, 3);
    }
}
