// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use recall_core::Fallible;
use recall_core::fail;
use recall_core::recorder::DEFAULT_MAX_ATTEMPTS;
use serde::Deserialize;

/// The config file looked for in the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_FILE: &str = "recall.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database.
    pub database: PathBuf,
    /// How many due cards to return when no limit is given.
    pub due_limit: usize,
    /// How many times a review is attempted when it races another one.
    pub max_review_attempts: usize,
    pub weak_material_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("recall.db"),
            due_limit: 100,
            max_review_attempts: DEFAULT_MAX_ATTEMPTS,
            weak_material_limit: 10,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        if config.max_review_attempts == 0 {
            return fail("max_review_attempts must be at least 1.");
        }
        Ok(config)
    }

    /// Reads the config file at `path`. With no explicit path, a missing
    /// default file just means defaults.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return fail(format!("config file {} does not exist.", path.display()));
                }
                Self::parse(&read_to_string(path)?)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    log::debug!("Using config file {DEFAULT_CONFIG_FILE}");
                    Self::parse(&read_to_string(path)?)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
