//! Enemy roster loading.
//!
//! A roster file lists one stat block per enemy kind:
//!
//! ```toml
//! [[enemies]]
//! name = "MeanSlime"
//! overall_health = 40.0
//! follow_speed = 2.5
//! ```
//!
//! Blocks are validated on load and shared as `Rc<AgentConfig>` between every
//! agent of the same kind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use warden_common::WardenError;

use crate::config::AgentConfig;

/// Errors that can occur during roster loading.
#[derive(Debug, Error)]
pub enum RosterError {
    /// File not found.
    #[error("Roster file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read roster file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse roster TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A stat block failed validation.
    #[error("Invalid enemy '{name}': {source}")]
    Invalid {
        /// Kind name of the offending block
        name: String,
        /// Validation failure
        source: WardenError,
    },

    /// Two blocks share a name.
    #[error("Duplicate enemy name: {0}")]
    DuplicateName(String),
}

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

/// On-disk roster layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFile {
    /// Stat blocks in authoring order
    #[serde(default)]
    pub enemies: Vec<AgentConfig>,
}

/// Registry of enemy kinds by name.
#[derive(Debug, Clone, Default)]
pub struct EnemyRoster {
    by_name: HashMap<String, Rc<AgentConfig>>,
    order: Vec<String>,
}

impl EnemyRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a roster from TOML text.
    pub fn from_toml_str(content: &str) -> RosterResult<Self> {
        let file: RosterFile = toml::from_str(content)?;
        let mut roster = Self::new();
        for config in file.enemies {
            roster.register(config)?;
        }
        debug!("Parsed roster with {} enemies", roster.len());
        Ok(roster)
    }

    /// Loads a roster from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RosterResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RosterError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let roster = Self::from_toml_str(&content)?;
        info!("Loaded {} enemies from {}", roster.len(), path.display());
        Ok(roster)
    }

    /// Validates and adds a stat block.
    pub fn register(&mut self, config: AgentConfig) -> RosterResult<Rc<AgentConfig>> {
        config.validate().map_err(|source| RosterError::Invalid {
            name: config.name.clone(),
            source,
        })?;

        if self.by_name.contains_key(&config.name) {
            return Err(RosterError::DuplicateName(config.name));
        }

        let name = config.name.clone();
        let shared = Rc::new(config);
        self.order.push(name.clone());
        self.by_name.insert(name, Rc::clone(&shared));
        Ok(shared)
    }

    /// Looks up a stat block by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<AgentConfig>> {
        self.by_name.get(name).cloned()
    }

    /// Kind names in authoring order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
