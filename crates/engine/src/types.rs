//! Value model for the memory store engine.
//!
//! Slugs, category paths, memory paths, memory metadata, and the
//! input/result types of the domain operations. Everything here is pure:
//! no I/O, no suspension points.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::DomainError;

/// Serde helper for ISO-8601 UTC timestamps with seconds precision, the
/// on-disk form used by front-matter and index documents.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    /// `Option<DateTime<Utc>>` variant for optional fields.
    pub mod opt {
        use super::*;
        use serde::Deserialize;

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw {
                None => Ok(None),
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
            }
        }
    }
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug pattern"))
}

/// A lowercase, hyphen-separated path segment.
///
/// Construction normalizes (trim + ASCII lowercase) and then validates
/// against `^[a-z0-9]+(?:-[a-z0-9]+)*$`: no leading/trailing/double
/// hyphens, no uppercase, underscores, or whitespace survive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::InvalidSlug {
                slug: raw.to_string(),
                reason: "slug is empty".to_string(),
            });
        }
        if !slug_pattern().is_match(&normalized) {
            return Err(DomainError::InvalidSlug {
                slug: raw.to_string(),
                reason: "slug must match [a-z0-9]+(-[a-z0-9]+)*".to_string(),
            });
        }
        Ok(Slug(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Slug::new(&raw)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> String {
        slug.0
    }
}

impl FromStr for Slug {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Slug::new(raw)
    }
}

/// An ordered sequence of slugs naming a category. The empty sequence is
/// the root.
///
/// Parsing drops empty segments (`a//b` normalizes to `a/b`) and filters
/// segments that fail slug validation after normalization; a non-root
/// input reduced to nothing is `INVALID_PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryPath {
    segments: Vec<Slug>,
}

// Ordering is by canonical string form, the order index entries and
// listings are returned in.
impl Ord for CategoryPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for CategoryPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl CategoryPath {
    pub fn root() -> Self {
        CategoryPath { segments: vec![] }
    }

    pub fn new(segments: Vec<Slug>) -> Self {
        CategoryPath { segments }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let stripped = trimmed.trim_matches('/');
        if stripped.is_empty() {
            return Ok(CategoryPath::root());
        }
        let mut segments = Vec::new();
        for piece in stripped.split('/') {
            if piece.trim().is_empty() {
                continue;
            }
            if let Ok(slug) = Slug::new(piece) {
                segments.push(slug);
            }
        }
        if segments.is_empty() {
            return Err(DomainError::InvalidPath {
                path: raw.to_string(),
                reason: "no valid path segments remain".to_string(),
            });
        }
        Ok(CategoryPath { segments })
    }

    pub fn segments(&self) -> &[Slug] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parent path; the root's parent is the root itself.
    pub fn parent(&self) -> CategoryPath {
        if self.segments.is_empty() {
            return CategoryPath::root();
        }
        CategoryPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// The leaf segment, if any.
    pub fn leaf(&self) -> Option<&Slug> {
        self.segments.last()
    }

    pub fn join(&self, child: Slug) -> CategoryPath {
        let mut segments = self.segments.clone();
        segments.push(child);
        CategoryPath { segments }
    }

    /// Whether this path lies within `scope` (inclusive). The root scope
    /// matches every path.
    pub fn is_child_of(&self, scope: &CategoryPath) -> bool {
        if scope.is_root() {
            return true;
        }
        if self.segments.len() < scope.segments.len() {
            return false;
        }
        self.segments[..scope.segments.len()] == scope.segments[..]
    }

    /// Every ancestor from the immediate parent up to (and including) the
    /// root, nearest first.
    pub fn ancestors(&self) -> Vec<CategoryPath> {
        let mut out = Vec::with_capacity(self.segments.len());
        let mut current = self.clone();
        while !current.is_root() {
            current = current.parent();
            out.push(current.clone());
        }
        out
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str("/")?;
            }
            f.write_str(segment.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl TryFrom<String> for CategoryPath {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        CategoryPath::parse(&raw)
    }
}

impl From<CategoryPath> for String {
    fn from(path: CategoryPath) -> String {
        path.to_string()
    }
}

impl FromStr for CategoryPath {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        CategoryPath::parse(raw)
    }
}

/// A category path plus a leaf slug addressing one memory document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemoryPath {
    pub category: CategoryPath,
    pub leaf: Slug,
}

impl Ord for MemoryPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for MemoryPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl MemoryPath {
    pub fn new(category: CategoryPath, leaf: Slug) -> Self {
        MemoryPath { category, leaf }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let stripped = raw.trim().trim_matches('/');
        let pieces: Vec<&str> = stripped
            .split('/')
            .filter(|piece| !piece.trim().is_empty())
            .collect();
        let (leaf_raw, category_raw) = match pieces.split_last() {
            Some(split) => split,
            None => {
                return Err(DomainError::InvalidPath {
                    path: raw.to_string(),
                    reason: "a memory path cannot be the root".to_string(),
                })
            }
        };
        // The leaf must validate as-is; filtering never reassigns it.
        let leaf = Slug::new(leaf_raw).map_err(|_| DomainError::InvalidPath {
            path: raw.to_string(),
            reason: format!("'{leaf_raw}' is not a valid memory name"),
        })?;
        let category = if category_raw.is_empty() {
            CategoryPath::root()
        } else {
            CategoryPath::parse(&category_raw.join("/"))?
        };
        Ok(MemoryPath { category, leaf })
    }

    pub fn depth(&self) -> usize {
        self.category.depth() + 1
    }

    pub fn is_child_of(&self, scope: &CategoryPath) -> bool {
        self.category.is_child_of(scope)
    }
}

impl fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_root() {
            f.write_str(self.leaf.as_str())
        } else {
            write!(f, "{}/{}", self.category, self.leaf)
        }
    }
}

impl TryFrom<String> for MemoryPath {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        MemoryPath::parse(&raw)
    }
}

impl From<MemoryPath> for String {
    fn from(path: MemoryPath) -> String {
        path.to_string()
    }
}

impl FromStr for MemoryPath {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        MemoryPath::parse(raw)
    }
}

/// Origin of a memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemorySource {
    Agent,
    User,
    Import,
    System,
    Other(String),
}

impl Default for MemorySource {
    fn default() -> Self {
        MemorySource::Agent
    }
}

impl MemorySource {
    pub fn as_str(&self) -> &str {
        match self {
            MemorySource::Agent => "agent",
            MemorySource::User => "user",
            MemorySource::Import => "import",
            MemorySource::System => "system",
            MemorySource::Other(other) => other,
        }
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MemorySource {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "agent" => MemorySource::Agent,
            "user" => MemorySource::User,
            "import" => MemorySource::Import,
            "system" => MemorySource::System,
            _ => MemorySource::Other(raw),
        }
    }
}

impl From<MemorySource> for String {
    fn from(source: MemorySource) -> String {
        source.as_str().to_string()
    }
}

/// Structured front-matter of a memory document.
///
/// Unknown front-matter keys are preserved in `extra` so external writers'
/// fields survive a round trip through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: MemorySource,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(
        default,
        with = "timestamp::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl MemoryMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        MemoryMetadata {
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            source: MemorySource::default(),
            citations: Vec::new(),
            expires_at: None,
            summary: None,
            extra: BTreeMap::new(),
        }
    }

    /// Whether the memory is expired at `now`. Absent expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }
}

/// A memory document: path, metadata, and UTF-8 content body.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub path: MemoryPath,
    pub metadata: MemoryMetadata,
    pub content: String,
}

/// Tag set semantics: drop empty strings, dedupe keeping first occurrence.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Canonical content form: no trailing newlines. The document codec adds
/// exactly one back when writing a non-empty body.
pub fn normalize_content(content: &str) -> String {
    content.trim_end_matches('\n').to_string()
}

/// Input to `create_memory`.
#[derive(Debug, Clone, Default)]
pub struct CreateMemoryInput {
    pub content: String,
    pub tags: Vec<String>,
    pub source: MemorySource,
    pub citations: Vec<String>,
    pub summary: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Three-state field update: keep the stored value, clear it, or set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Update<T> {
    fn default() -> Self {
        Update::Keep
    }
}

impl<T> Update<T> {
    /// Apply this update over the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Update::Keep => current,
            Update::Clear => None,
            Update::Set(value) => Some(value),
        }
    }
}

/// Input to `update_memory`. Omitted (`None`/`Keep`) fields preserve the
/// stored value; `content` set to any string (including `""`) replaces.
#[derive(Debug, Clone, Default)]
pub struct UpdateMemoryInput {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source: Option<MemorySource>,
    pub citations: Option<Vec<String>>,
    pub summary: Update<String>,
    pub expires_at: Update<DateTime<Utc>>,
}

/// Options for `get_memory`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetMemoryOptions {
    pub include_expired: bool,
    pub now: Option<DateTime<Utc>>,
}

/// Options for `list_memories`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListMemoriesOptions {
    pub include_expired: bool,
    pub now: Option<DateTime<Utc>>,
}

/// Options for `prune_expired_memories`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PruneOptions {
    pub dry_run: bool,
    pub now: Option<DateTime<Utc>>,
}

/// Options for `get_recent_memories`.
#[derive(Debug, Clone, Default)]
pub struct RecentOptions {
    pub category: Option<CategoryPath>,
    pub limit: Option<usize>,
    pub include_expired: bool,
    pub now: Option<DateTime<Utc>>,
}

/// Default and maximum `limit` for recency queries.
pub const RECENT_DEFAULT_LIMIT: usize = 5;
pub const RECENT_MAX_LIMIT: usize = 100;

/// One entry returned by `get_recent_memories`.
#[derive(Debug, Clone, Serialize)]
pub struct RecentMemory {
    pub path: MemoryPath,
    pub content: String,
    #[serde(
        with = "timestamp::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    pub token_estimate: u64,
    pub tags: Vec<String>,
}

/// Result of `prune_expired_memories`.
#[derive(Debug, Clone, Serialize)]
pub struct PruneResult {
    pub pruned: Vec<MemoryPath>,
    pub dry_run: bool,
}

/// Result of `create_category`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCategoryResult {
    pub path: CategoryPath,
    pub created: bool,
}

/// Result of a scoped reindex: counts plus non-fatal repair warnings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexResult {
    pub categories_indexed: usize,
    pub memories_indexed: usize,
    pub warnings: Vec<String>,
}

/// Maximum category description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
