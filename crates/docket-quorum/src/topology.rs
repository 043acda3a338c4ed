//! # Ledger Topology — One Primary, N Redundants
//!
//! A deployment registers against a fixed set of ledgers: exactly one
//! primary, whose contract state is authoritative, and any number of
//! redundant ledgers that corroborate it. The topology is declared in a
//! YAML document and validated structurally before any backend starts:
//!
//! ```yaml
//! ledgers:
//!   - id: primary-a
//!     role: primary
//!     explorer_base_url: "https://explorer.example.org"
//!   - id: redundant-b
//!     role: redundant
//! quorum:
//!   redundant_required: 1
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use docket_core::{LedgerId, ValidationError};
use docket_ledger::{InProcessLedger, LedgerBackend};

use crate::policy::QuorumPolicy;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while loading or assembling a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The configuration names no primary ledger.
    #[error("topology must declare exactly one primary ledger, found none")]
    NoPrimary,

    /// The configuration names more than one primary ledger.
    #[error("topology must declare exactly one primary ledger, found {0}")]
    MultiplePrimaries(usize),

    /// The same ledger identifier appears twice.
    #[error("ledger {0} is declared more than once")]
    DuplicateLedger(String),

    /// A declared identifier fails ledger-id validation.
    #[error(transparent)]
    InvalidLedgerId(#[from] ValidationError),

    /// An explorer base URL does not parse.
    #[error("invalid explorer base URL for ledger {ledger}: {source}")]
    InvalidExplorerUrl {
        /// Ledger whose entry carried the URL.
        ledger: String,
        /// The parse failure.
        source: url::ParseError,
    },

    /// The configuration file does not exist.
    #[error("topology file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The configuration file is not valid YAML for this schema.
    #[error("failed to parse topology file {path}: {source}")]
    YamlParse {
        /// The offending file.
        path: PathBuf,
        /// The underlying parser error.
        source: serde_yaml::Error,
    },

    /// Any other I/O failure while reading the file.
    #[error("i/o error reading topology: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration schema
// ---------------------------------------------------------------------------

/// Role of a ledger within a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRole {
    /// The authoritative ledger. Exactly one per topology.
    Primary,
    /// A corroborating ledger.
    Redundant,
}

/// One ledger declaration in the topology file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Ledger identifier, validated against the ledger-id format.
    pub id: String,
    /// Primary or redundant.
    pub role: LedgerRole,
    /// Public explorer base; confirmation links are built as
    /// `{explorer_base_url}/tx/{tx_id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_base_url: Option<String>,
}

/// The topology file as written by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// All ledgers this deployment writes to and reads from.
    pub ledgers: Vec<LedgerEntry>,
    /// Durability threshold. Defaults to primary-plus-one when redundant
    /// ledgers exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorum: Option<QuorumPolicy>,
}

impl TopologyConfig {
    /// Parse a topology from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::YamlParse`] on malformed YAML and the
    /// structural errors from [`TopologyConfig::validate`].
    pub fn from_yaml_str(text: &str) -> Result<Self, TopologyError> {
        let config: Self = serde_yaml::from_str(text).map_err(|source| TopologyError::YamlParse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a topology file.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::FileNotFound`] when the path is missing,
    /// [`TopologyError::YamlParse`] on malformed YAML, and the structural
    /// errors from [`TopologyConfig::validate`].
    pub fn from_yaml_file(path: &Path) -> Result<Self, TopologyError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TopologyError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                TopologyError::Io(e)
            }
        })?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|source| TopologyError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation: exactly one primary, no duplicate
    /// identifiers, every identifier and explorer URL well-formed.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let primaries = self
            .ledgers
            .iter()
            .filter(|entry| entry.role == LedgerRole::Primary)
            .count();
        match primaries {
            0 => return Err(TopologyError::NoPrimary),
            1 => {}
            n => return Err(TopologyError::MultiplePrimaries(n)),
        }

        let mut seen = std::collections::BTreeSet::new();
        for entry in &self.ledgers {
            LedgerId::new(entry.id.clone())?;
            if !seen.insert(entry.id.as_str()) {
                return Err(TopologyError::DuplicateLedger(entry.id.clone()));
            }
            if let Some(raw) = &entry.explorer_base_url {
                Url::parse(raw).map_err(|source| TopologyError::InvalidExplorerUrl {
                    ledger: entry.id.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// The quorum policy: explicit if configured, otherwise the default
    /// for the declared number of redundant ledgers.
    pub fn quorum_policy(&self) -> QuorumPolicy {
        self.quorum.unwrap_or_else(|| {
            let redundants = self
                .ledgers
                .iter()
                .filter(|entry| entry.role == LedgerRole::Redundant)
                .count();
            QuorumPolicy::for_topology(redundants)
        })
    }

    /// Spin up an in-process ledger per entry and assemble the topology.
    ///
    /// This is the development and test path; production deployments
    /// substitute real backend adapters for the same declarations.
    ///
    /// # Errors
    ///
    /// Returns the same structural errors as [`TopologyConfig::validate`].
    pub fn build_in_process(&self) -> Result<LedgerTopology, TopologyError> {
        self.validate()?;
        let mut primary: Option<Arc<dyn LedgerBackend>> = None;
        let mut redundants: Vec<Arc<dyn LedgerBackend>> = Vec::new();
        let mut explorers = BTreeMap::new();

        for entry in &self.ledgers {
            let ledger_id = LedgerId::new(entry.id.clone())?;
            if let Some(raw) = &entry.explorer_base_url {
                let url = Url::parse(raw).map_err(|source| TopologyError::InvalidExplorerUrl {
                    ledger: entry.id.clone(),
                    source,
                })?;
                explorers.insert(ledger_id.clone(), url);
            }
            let backend: Arc<dyn LedgerBackend> = Arc::new(InProcessLedger::new(ledger_id));
            match entry.role {
                LedgerRole::Primary => primary = Some(backend),
                LedgerRole::Redundant => redundants.push(backend),
            }
        }

        // validate() guarantees exactly one primary.
        let primary = primary.ok_or(TopologyError::NoPrimary)?;
        let mut topology = LedgerTopology::new(primary, redundants)?;
        topology.explorers = explorers;
        Ok(topology)
    }
}

// ---------------------------------------------------------------------------
// The assembled topology
// ---------------------------------------------------------------------------

/// Backend handles for one deployment: the primary first, then the
/// redundants in declaration order.
pub struct LedgerTopology {
    primary: Arc<dyn LedgerBackend>,
    redundants: Vec<Arc<dyn LedgerBackend>>,
    explorers: BTreeMap<LedgerId, Url>,
}

impl LedgerTopology {
    /// Assemble a topology from live backends.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::DuplicateLedger`] when two backends share
    /// an identifier.
    pub fn new(
        primary: Arc<dyn LedgerBackend>,
        redundants: Vec<Arc<dyn LedgerBackend>>,
    ) -> Result<Self, TopologyError> {
        let mut seen = std::collections::BTreeSet::new();
        seen.insert(primary.ledger_id().clone());
        for backend in &redundants {
            if !seen.insert(backend.ledger_id().clone()) {
                return Err(TopologyError::DuplicateLedger(
                    backend.ledger_id().as_str().to_owned(),
                ));
            }
        }
        Ok(Self {
            primary,
            redundants,
            explorers: BTreeMap::new(),
        })
    }

    /// Attach an explorer base for one ledger.
    pub fn with_explorer(mut self, ledger_id: LedgerId, base: Url) -> Self {
        self.explorers.insert(ledger_id, base);
        self
    }

    /// The authoritative ledger.
    pub fn primary(&self) -> &Arc<dyn LedgerBackend> {
        &self.primary
    }

    /// The corroborating ledgers, in declaration order.
    pub fn redundants(&self) -> &[Arc<dyn LedgerBackend>] {
        &self.redundants
    }

    /// Every ledger, primary first.
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn LedgerBackend>> {
        std::iter::once(&self.primary).chain(self.redundants.iter())
    }

    /// Look up a backend by identifier.
    pub fn get(&self, ledger_id: &LedgerId) -> Option<&Arc<dyn LedgerBackend>> {
        self.all().find(|backend| backend.ledger_id() == ledger_id)
    }

    /// Explorer base for a ledger, when configured.
    pub fn explorer_base(&self, ledger_id: &LedgerId) -> Option<&Url> {
        self.explorers.get(ledger_id)
    }

    /// Total number of ledgers.
    pub fn len(&self) -> usize {
        1 + self.redundants.len()
    }

    /// A topology always has its primary, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for LedgerTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redundants: Vec<&str> = self
            .redundants
            .iter()
            .map(|backend| backend.ledger_id().as_str())
            .collect();
        f.debug_struct("LedgerTopology")
            .field("primary", &self.primary.ledger_id().as_str())
            .field("redundants", &redundants)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
