//! YAML pipeline definitions
//!
//! A pipeline file lists nodes, the wires between their channels and the
//! channels exposed as pipeline output.
//!
//! Example format:
//! ```yaml
//! nodes:
//!   - id: source
//!     type: extract
//!     uri: https://example.com/data.json
//!     output_field: _raw
//!     cache: { path: data.cache, ttl: 3600 }
//!   - id: tag
//!     type: override
//!     data: { status: ok }
//! wires:
//!   - { from: source, to: tag }
//! outputs:
//!   - { node: tag }
//! ```
//!
//! Without wires, nodes are chained in the order they are listed and the
//! last node's main output is exposed.

use crate::error::EtlError;
use crate::etl::{
    Channel, Extractor, IdentityTransformer, NodeId, Pipeline, PipelineBuilder, Transformer,
};
use crate::extract::{CacheConfig, CachedFileExtract, ExtractConfig, FileExtract};
use crate::row::{FieldFilter, Row, TOPIC_FIELD};
use crate::storage::NdjsonReader;
use crate::transform::{Clean, Condition, Filter, Log, LogConfig, Override, Stop};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn main_channel() -> String {
    Channel::MAIN.to_string()
}

fn topic_field() -> String {
    TOPIC_FIELD.to_string()
}

/// Whole pipeline file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub wires: Vec<WireConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// One node, identified by a name unique within the file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Node type and its settings, selected by the `type` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Whole content of a file or remote resource, optionally cached
    Extract {
        uri: String,
        #[serde(default = "topic_field")]
        output_field: String,
        #[serde(default)]
        cache: Option<CacheSettings>,
    },
    /// One row per line of an NDJSON file
    Ndjson { path: PathBuf },
    Log {
        /// Only display these keys
        #[serde(default)]
        fields: Option<Vec<String>>,
        /// Only display keys matching this regex
        #[serde(default)]
        pattern: Option<String>,
        #[serde(default)]
        when: Option<Matcher>,
    },
    Stop,
    Override { data: Row },
    Clean,
    /// Keep rows where `field` equals `equals`, or holds `field` when `equals` is unset
    Filter {
        field: String,
        #[serde(default)]
        equals: Option<Value>,
        /// Channel receiving rejected rows (dropped when unset)
        #[serde(default)]
        reject: Option<String>,
    },
    Identity,
}

/// Cache file settings, `ttl` in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    pub path: PathBuf,
    pub ttl: u64,
}

/// Row condition: `field` equals `equals`, or is present when `equals` is unset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Matcher {
    pub field: String,
    #[serde(default)]
    pub equals: Option<Value>,
}

impl Matcher {
    pub fn condition(&self) -> Condition {
        let field = self.field.clone();
        match self.equals.clone() {
            Some(expected) => Arc::new(move |row: &Row| row.find(&field) == Some(&expected)),
            None => Arc::new(move |row: &Row| row.contains(&field)),
        }
    }
}

/// Wire from an output channel of one node to an input channel of another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireConfig {
    pub from: String,
    #[serde(default = "main_channel")]
    pub channel: String,
    pub to: String,
    #[serde(default = "main_channel")]
    pub input: String,
}

/// Channel exposed as pipeline output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub node: String,
    #[serde(default = "main_channel")]
    pub channel: String,
}

enum Built {
    Source(Box<dyn Extractor>),
    Transform(Box<dyn Transformer>),
}

impl NodeKind {
    fn instantiate(&self) -> Result<Built> {
        let built = match self {
            Self::Extract {
                uri,
                output_field,
                cache,
            } => {
                let config = ExtractConfig::new(uri.as_str()).output_field(output_field.as_str());
                match cache {
                    Some(cache) => Built::Source(Box::new(CachedFileExtract::new(
                        config,
                        CacheConfig::new(&cache.path, Duration::from_secs(cache.ttl)),
                    ))),
                    None => Built::Source(Box::new(FileExtract::new(config))),
                }
            }
            Self::Ndjson { path } => Built::Source(Box::new(NdjsonReader::new(path))),
            Self::Log {
                fields,
                pattern,
                when,
            } => {
                let mut config = LogConfig::default();
                match (fields, pattern) {
                    (Some(_), Some(_)) => {
                        return Err(EtlError::configuration(
                            "log node takes either 'fields' or 'pattern', not both",
                        )
                        .into());
                    }
                    (Some(fields), None) => {
                        config = config.fields(fields.iter().cloned().collect());
                    }
                    (None, Some(pattern)) => {
                        let filter = FieldFilter::pattern(pattern).map_err(|err| {
                            EtlError::configuration(format!("invalid field pattern '{pattern}': {err}"))
                        })?;
                        config = config.fields(filter);
                    }
                    (None, None) => {}
                }
                config.condition = when.as_ref().map(Matcher::condition);
                Built::Transform(Box::new(Log::new(config)))
            }
            Self::Stop => Built::Transform(Box::new(Stop)),
            Self::Override { data } => Built::Transform(Box::new(Override::new(data.clone()))),
            Self::Clean => Built::Transform(Box::new(Clean)),
            Self::Filter {
                field,
                equals,
                reject,
            } => {
                let matcher = Matcher {
                    field: field.clone(),
                    equals: equals.clone(),
                };
                let mut filter = Filter::from_condition(matcher.condition());
                if let Some(reject) = reject {
                    filter = filter.reject_to(reject.clone());
                }
                Built::Transform(Box::new(filter))
            }
            Self::Identity => Built::Transform(Box::new(IdentityTransformer)),
        };
        Ok(built)
    }
}

impl PipelineConfig {
    /// Load a pipeline file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse pipeline file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|err| EtlError::configuration(err.to_string()))?;
        Ok(config)
    }

    /// Instantiate every node and wire them into a validated pipeline
    ///
    /// # Errors
    /// Returns a configuration error for duplicate or unknown node ids and
    /// invalid node settings, and a routing error for channel problems
    pub fn build(&self) -> Result<Pipeline> {
        if self.nodes.is_empty() {
            return Err(EtlError::configuration("pipeline has no nodes").into());
        }

        let mut builder = PipelineBuilder::new();
        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        let mut emits_main = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let built = node
                .kind
                .instantiate()
                .with_context(|| format!("Invalid node '{}'", node.id))?;
            let id = match built {
                Built::Source(source) => {
                    emits_main.push(true);
                    builder.add_boxed_source(source)
                }
                Built::Transform(transformer) => {
                    emits_main.push(transformer.output_channels().contains(&Channel::main()));
                    builder.add_boxed(transformer)
                }
            };
            if ids.insert(node.id.as_str(), id).is_some() {
                return Err(
                    EtlError::configuration(format!("duplicate node id '{}'", node.id)).into(),
                );
            }
        }

        let resolve = |name: &str| -> Result<NodeId> {
            ids.get(name)
                .copied()
                .ok_or_else(|| EtlError::configuration(format!("unknown node id '{name}'")).into())
        };

        if self.wires.is_empty() {
            let chain: Vec<NodeId> = self
                .nodes
                .iter()
                .map(|node| resolve(&node.id))
                .collect::<Result<_>>()?;
            builder.chain(&chain);
            if self.outputs.is_empty() && emits_main.last() == Some(&true) {
                if let Some(&last) = chain.last() {
                    builder.output(last);
                }
            }
        } else {
            for wire in &self.wires {
                builder.connect_channel(
                    resolve(&wire.from)?,
                    wire.channel.clone(),
                    resolve(&wire.to)?,
                    wire.input.clone(),
                );
            }
        }

        for output in &self.outputs {
            builder.output_channel(resolve(&output.node)?, output.channel.clone());
        }

        builder.build()
    }
}
