// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::system::System;

/// Opaque runner of a system's logic
///
/// The tracker treats any `Err` as a failure cause and any `Ok` value as the
/// success result, without further interpretation.
#[async_trait]
pub trait SystemExecutor: Send + Sync {
    async fn execute(
        &self,
        system: &System,
        input: &Value,
        variables: &Map<String, Value>,
        project_path: Option<&str>,
    ) -> anyhow::Result<Value>;
}
