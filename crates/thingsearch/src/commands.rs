//! Subcommands.
//!
//! Inputs are JSON files; `-` reads from stdin. Results are printed as JSON.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use thingsearch_persistence::backends::{InMemorySearchIndex, SearchOutcome};
use thingsearch_persistence::read::{SearchRequest, ThingSearchQueryCompiler};
use thingsearch_persistence::write::{EventTranslator, PolicyRules, ThingEvent, apply_event};
use thingsearch_persistence::SearchConfig;

/// The available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile a search request into an aggregation pipeline
    Compile {
        /// Search request JSON file
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },

    /// Translate a thing event into index updates
    Translate {
        /// Thing event JSON file
        #[arg(long, default_value = "-")]
        event: PathBuf,

        /// Policy read rules JSON file; without it nothing is readable
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Replay thing events into an in-memory index and run a search
    Search {
        /// Thing events, one JSON document per line
        #[arg(long)]
        events: PathBuf,

        /// Policy read rules JSON file; without it nothing is readable
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Search request JSON file
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
}

impl Command {
    /// Runs the command and returns its output document.
    pub async fn run(&self, config: &SearchConfig) -> anyhow::Result<Value> {
        match self {
            Command::Compile { request } => compile(config, &read_json(request)?),
            Command::Translate { event, policy } => {
                translate(config, &read_json(event)?, &read_rules(policy.as_deref())?)
            }
            Command::Search {
                events,
                policy,
                request,
            } => {
                let events = parse_events(&read_input(events)?)?;
                let rules = read_rules(policy.as_deref())?;
                search(config, &events, &rules, &read_json(request)?).await
            }
        }
    }
}

/// Compiles a request into its pipeline documents.
pub fn compile(config: &SearchConfig, request: &SearchRequest) -> anyhow::Result<Value> {
    let compiler = ThingSearchQueryCompiler::new(config.clone());
    let aggregation = compiler.compile(request)?;
    Ok(Value::Array(aggregation.to_pipeline()))
}

/// Translates an event into the bulk write documents of both collections.
pub fn translate(
    config: &SearchConfig,
    event: &ThingEvent,
    rules: &PolicyRules,
) -> anyhow::Result<Value> {
    let batch = EventTranslator::new(config).translate(event, rules)?;
    let policy_updates = batch
        .policy_updates
        .iter()
        .map(|update| update.to_document_update().map(|update| update.to_document()))
        .collect::<Result<Vec<_>, _>>()?;

    let thing_updates = batch
        .thing_updates
        .iter()
        .map(|update| update.to_document())
        .collect();

    let mut output = Map::new();
    output.insert("thingId".to_string(), json!(batch.thing_id));
    output.insert("revision".to_string(), json!(batch.revision));
    output.insert(config.things_collection.clone(), Value::Array(thing_updates));
    output.insert(config.policies_collection.clone(), Value::Array(policy_updates));
    Ok(Value::Object(output))
}

/// Applies the events in order, then runs the request.
pub async fn search(
    config: &SearchConfig,
    events: &[ThingEvent],
    rules: &PolicyRules,
    request: &SearchRequest,
) -> anyhow::Result<Value> {
    let index = InMemorySearchIndex::new(config.clone());
    let translator = EventTranslator::new(config);

    for (position, event) in events.iter().enumerate() {
        let result = apply_event(&index, &translator, event, rules).await;
        if let Some(err) = result.error() {
            bail!(
                "event {} ({} of {}) could not be applied: {}",
                position + 1,
                event.kind(),
                event.thing_id,
                err
            );
        }
    }
    info!(
        events = events.len(),
        things = index.thing_count(),
        "Replayed thing events"
    );

    let aggregation = ThingSearchQueryCompiler::new(config.clone()).compile(request)?;
    Ok(match index.search(&aggregation)? {
        SearchOutcome::Ids(ids) => json!({ "ids": ids }),
        SearchOutcome::Count(count) => json!({ "count": count }),
    })
}

/// Parses newline-delimited events, skipping blank lines.
pub fn parse_events(input: &str) -> anyhow::Result<Vec<ThingEvent>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid thing event on line {}", number + 1))
        })
        .collect()
}

fn read_rules(path: Option<&Path>) -> anyhow::Result<PolicyRules> {
    match path {
        Some(path) => read_json(path),
        None => Ok(PolicyRules::new()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let input = read_input(path)?;
    serde_json::from_str(&input).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        debug!("Reading from stdin");
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        return Ok(input);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
