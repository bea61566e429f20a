//! Export loading.
//!
//! This module reads the JSON usage exports written by the provider sync
//! tool and converts them into typed daily records. A path may name a single
//! export file or a directory of them.

use crate::models::{DailyRecord, ModelUsage, Provider, TokenCounts};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors raised while loading exports.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No .json exports found in {0}")]
    NoExports(PathBuf),

    #[error("Failed to walk input directory")]
    Walk(#[from] walkdir::Error),
}

/// Raw token/cost fields of one day, as written by the exporter.
///
/// Every field is lenient: values of the wrong type read as missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDailyRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, alias = "input_tokens", deserialize_with = "lenient_count")]
    pub input_tokens: Option<u64>,
    #[serde(default, alias = "output_tokens", deserialize_with = "lenient_count")]
    pub output_tokens: Option<u64>,
    #[serde(
        default,
        alias = "cacheCreationInputTokens",
        alias = "cache_creation_tokens",
        deserialize_with = "lenient_count"
    )]
    pub cache_creation_tokens: Option<u64>,
    #[serde(
        default,
        alias = "cacheReadInputTokens",
        alias = "cache_read_tokens",
        deserialize_with = "lenient_count"
    )]
    pub cache_read_tokens: Option<u64>,
    #[serde(default, alias = "total_tokens", deserialize_with = "lenient_count")]
    pub total_tokens: Option<u64>,
    #[serde(
        default,
        alias = "cost",
        alias = "costUSD",
        alias = "total_cost",
        deserialize_with = "lenient_cost"
    )]
    pub total_cost: Option<f64>,
    #[serde(default, alias = "models", deserialize_with = "lenient_names")]
    pub models_used: Vec<String>,
    #[serde(default, deserialize_with = "lenient_breakdowns")]
    pub model_breakdowns: Vec<RawModelBreakdown>,
}

/// Per-model slice of a raw day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModelBreakdown {
    #[serde(default, alias = "model", deserialize_with = "lenient_text")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub output_tokens: Option<u64>,
    #[serde(default, alias = "cacheCreationInputTokens", deserialize_with = "lenient_count")]
    pub cache_creation_tokens: Option<u64>,
    #[serde(default, alias = "cacheReadInputTokens", deserialize_with = "lenient_count")]
    pub cache_read_tokens: Option<u64>,
    #[serde(
        default,
        alias = "totalCost",
        alias = "costUSD",
        deserialize_with = "lenient_cost"
    )]
    pub cost: Option<f64>,
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_cost<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite()))
}

/// Strings pass through; numbers keep their text so a bad date can be reported.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_breakdowns<'de, D>(deserializer: D) -> Result<Vec<RawModelBreakdown>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| RawModelBreakdown::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A provider section: either `{ "daily": [...] }` or a bare array.
///
/// Records stay as raw JSON so one malformed day can be skipped on its own.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawProviderSection {
    Object {
        #[serde(default)]
        daily: Option<Vec<Value>>,
    },
    Array(Vec<Value>),
}

impl RawProviderSection {
    fn into_daily(self) -> Vec<Value> {
        match self {
            RawProviderSection::Object { daily } => daily.unwrap_or_default(),
            RawProviderSection::Array(daily) => daily,
        }
    }
}

/// A complete export document.
///
/// Provider sections are kept as raw JSON until `provider_records` checks
/// the key, so sections from unknown tools never fail the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default, deserialize_with = "lenient_text")]
    pub generated_at: Option<String>,
    pub providers: BTreeMap<String, Value>,
}

impl ExportDocument {
    /// Fold another document into this one; same-named providers are concatenated.
    pub fn absorb(&mut self, other: ExportDocument) {
        for (key, section) in other.providers {
            match self.providers.remove(&key) {
                Some(existing) => {
                    let mut daily = section_daily(&key, &existing);
                    daily.extend(section_daily(&key, &section));
                    self.providers.insert(key, Value::Array(daily));
                }
                None => {
                    self.providers.insert(key, section);
                }
            }
        }

        self.generated_at = match (self.generated_at.take(), other.generated_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Typed records per provider.
    ///
    /// Unknown providers, malformed sections and records with unusable dates
    /// are skipped.
    pub fn provider_records(&self) -> Vec<(Provider, Vec<DailyRecord>)> {
        let mut out: BTreeMap<Provider, Vec<DailyRecord>> = BTreeMap::new();

        for (key, section) in &self.providers {
            let provider: Provider = match key.parse() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping provider section '{}': {}", key, e);
                    continue;
                }
            };

            let raw = match RawProviderSection::deserialize(section) {
                Ok(section) => section.into_daily(),
                Err(e) => {
                    warn!("Skipping malformed {} section: {}", provider, e);
                    continue;
                }
            };

            let records = out.entry(provider).or_default();
            for value in &raw {
                let record = match RawDailyRecord::deserialize(value) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Skipping malformed {} record: {}", provider, e);
                        continue;
                    }
                };
                match convert_record(&record) {
                    Some(r) => records.push(r),
                    None => warn!(
                        "Skipping {} record with invalid date: {:?}",
                        provider, record.date
                    ),
                }
            }
            debug!("{}: {} daily records", provider, records.len());
        }

        out.into_iter().collect()
    }
}

fn section_daily(key: &str, section: &Value) -> Vec<Value> {
    match RawProviderSection::deserialize(section) {
        Ok(section) => section.into_daily(),
        Err(e) => {
            warn!("Dropping malformed '{}' section while merging: {}", key, e);
            Vec::new()
        }
    }
}

/// Parse `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its UTC date.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

fn convert_record(raw: &RawDailyRecord) -> Option<DailyRecord> {
    let date = parse_record_date(raw.date.as_deref()?)?;

    let tokens = TokenCounts {
        input_tokens: raw.input_tokens.unwrap_or(0),
        output_tokens: raw.output_tokens.unwrap_or(0),
        cache_creation_tokens: raw.cache_creation_tokens.unwrap_or(0),
        cache_read_tokens: raw.cache_read_tokens.unwrap_or(0),
    };

    let breakdowns: Vec<ModelUsage> = raw
        .model_breakdowns
        .iter()
        .filter_map(|b| {
            let model = b.model_name.as_deref()?.trim();
            if model.is_empty() {
                return None;
            }
            Some(ModelUsage {
                model: model.to_string(),
                tokens: TokenCounts {
                    input_tokens: b.input_tokens.unwrap_or(0),
                    output_tokens: b.output_tokens.unwrap_or(0),
                    cache_creation_tokens: b.cache_creation_tokens.unwrap_or(0),
                    cache_read_tokens: b.cache_read_tokens.unwrap_or(0),
                },
                cost: b.cost.unwrap_or(0.0),
            })
        })
        .collect();

    let mut record = DailyRecord::new(date);
    record.tokens = tokens;
    record.total_tokens = raw.total_tokens.unwrap_or(0).max(tokens.total());
    record.cost = raw.total_cost.unwrap_or(0.0);

    let names: Vec<String> = raw
        .models_used
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .chain(breakdowns.iter().map(|b| b.model.clone()))
        .collect();
    crate::models::union_models(&mut record.models, &names);
    crate::models::merge_breakdowns(&mut record.breakdowns, &breakdowns);

    Some(record)
}

/// Read a single export file.
///
/// A file holding just one provider section is keyed by its file stem
/// (e.g. `codex.json`).
pub fn load_export(path: &Path) -> Result<ExportDocument, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&content).map_err(parse_error)?;

    if value.get("providers").is_some() {
        return ExportDocument::deserialize(&value).map_err(parse_error);
    }

    let key = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let mut doc = ExportDocument::default();
    doc.providers.insert(key, value);
    Ok(doc)
}

/// Load a file, or every `*.json` export under a directory.
pub fn load_path(path: &Path) -> Result<ExportDocument, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    if path.is_file() {
        info!("Loading export: {}", path.display());
        return load_export(path);
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

    for entry in walker {
        let entry = entry?;
        let is_json = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(LoadError::NoExports(path.to_path_buf()));
    }

    files.sort();
    info!("Loading {} exports from {}", files.len(), path.display());

    let mut merged = ExportDocument::default();
    for file in &files {
        debug!("Reading {}", file.display());
        merged.absorb(load_export(file)?);
    }

    Ok(merged)
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.'))
}
