//! The `Chunk` data model and its two closed enumerations.
//!
//! A chunk's `id` is a pure function of `(source_file, start_byte, end_byte,
//! commit_sha)` — unlike the teacher's chunker, which assigns a random
//! `Uuid::new_v4()`, this id must be stable across re-ingestion of the same
//! byte range at the same commit. We reuse the teacher's SHA-256 hashing
//! tool for that derivation instead of minting a random id.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Java,
    Python,
    Javascript,
    Typescript,
    Go,
    Csharp,
    Cpp,
    C,
    Ruby,
    Kotlin,
    Unknown,
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "rust" => Language::Rust,
            "java" => Language::Java,
            "python" => Language::Python,
            "javascript" => Language::Javascript,
            "typescript" => Language::Typescript,
            "go" => Language::Go,
            "csharp" => Language::Csharp,
            "cpp" => Language::Cpp,
            "c" => Language::C,
            "ruby" => Language::Ruby,
            "kotlin" => Language::Kotlin,
            _ => Language::Unknown,
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Go => "go",
            Language::Csharp => "csharp",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Ruby => "ruby",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Class,
    Interface,
    Method,
    Function,
    Struct,
    Enum,
    Trait,
    Module,
    Field,
    Unknown,
}

impl FromStr for EntityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "class" => EntityType::Class,
            "interface" => EntityType::Interface,
            "method" => EntityType::Method,
            "function" => EntityType::Function,
            "struct" => EntityType::Struct,
            "enum" => EntityType::Enum,
            "trait" => EntityType::Trait,
            "module" => EntityType::Module,
            "field" => EntityType::Field,
            _ => EntityType::Unknown,
        })
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityType::Class => "class",
            EntityType::Interface => "interface",
            EntityType::Method => "method",
            EntityType::Function => "function",
            EntityType::Struct => "struct",
            EntityType::Enum => "enum",
            EntityType::Trait => "trait",
            EntityType::Module => "module",
            EntityType::Field => "field",
            EntityType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A single indexed unit of source code: one entity (or entity fragment)
/// spanning a contiguous byte range of one file at one commit.
///
/// `attributes` is a free-form label→string map. By convention (see
/// `DESIGN.md`) ingestion populates `attributes["repository"]` with the
/// owning repository url/identifier so `KeywordIndex` can facet-filter on
/// it, and may populate `attributes["signature"]` for a boosted keyword
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub language: Language,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub source_file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u64,
    pub end_byte: u64,
    pub attributes: HashMap<String, String>,
    pub doc_summary: Option<String>,
}

impl Chunk {
    /// Derive the stable id for a byte range. Exposed so ingestion
    /// coordinators and tests can compute the same id a `Chunk::new` call
    /// would, without constructing a full chunk.
    pub fn derive_id(source_file: &str, start_byte: u64, end_byte: u64, commit_sha: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_file.as_bytes());
        hasher.update([0u8]);
        hasher.update(start_byte.to_le_bytes());
        hasher.update(end_byte.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(commit_sha.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Build a chunk, deriving its id and validating the invariants
    /// `spec.md` §3 places on `Chunk`: non-empty `content`, `start_line <=
    /// end_line`, `start_byte <= end_byte`, non-empty `source_file`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        content: String,
        language: Language,
        entity_type: EntityType,
        entity_name: String,
        source_file: String,
        start_line: u32,
        end_line: u32,
        start_byte: u64,
        end_byte: u64,
        commit_sha: &str,
        attributes: HashMap<String, String>,
        doc_summary: Option<String>,
    ) -> Result<Chunk, SearchError> {
        if content.is_empty() {
            return Err(SearchError::InvalidArgument(
                "chunk content must not be empty".into(),
            ));
        }
        if source_file.is_empty() {
            return Err(SearchError::InvalidArgument(
                "chunk source_file must not be empty".into(),
            ));
        }
        if start_line > end_line {
            return Err(SearchError::InvalidArgument(format!(
                "chunk start_line {start_line} exceeds end_line {end_line}"
            )));
        }
        if start_byte > end_byte {
            return Err(SearchError::InvalidArgument(format!(
                "chunk start_byte {start_byte} exceeds end_byte {end_byte}"
            )));
        }

        let id = Chunk::derive_id(&source_file, start_byte, end_byte, commit_sha);

        Ok(Chunk {
            id,
            content,
            language,
            entity_type,
            entity_name,
            source_file,
            start_line,
            end_line,
            start_byte,
            end_byte,
            attributes,
            doc_summary,
        })
    }

    pub fn repository(&self) -> Option<&str> {
        self.attributes.get("repository").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_through_lowercase() {
        for (s, variant) in [
            ("rust", Language::Rust),
            ("CSHARP", Language::Csharp),
            ("Cpp", Language::Cpp),
            ("kotlin", Language::Kotlin),
        ] {
            assert_eq!(Language::from_str(s).unwrap(), variant);
            assert_eq!(variant.to_string(), variant.to_string());
            assert_eq!(Language::from_str(&variant.to_string()).unwrap(), variant);
        }
    }

    #[test]
    fn unknown_language_maps_to_unknown_variant() {
        assert_eq!(Language::from_str("cobol").unwrap(), Language::Unknown);
    }

    #[test]
    fn entity_type_round_trips() {
        for s in ["class", "interface", "method", "function", "struct", "enum", "trait", "module", "field"] {
            let variant = EntityType::from_str(s).unwrap();
            assert_eq!(EntityType::from_str(&variant.to_string()).unwrap(), variant);
        }
    }

    #[test]
    fn id_is_deterministic_given_same_inputs() {
        let a = Chunk::derive_id("src/lib.rs", 10, 200, "abc123");
        let b = Chunk::derive_id("src/lib.rs", 10, 200, "abc123");
        assert_eq!(a, b);
    }

    #[test]
    fn id_changes_when_commit_changes() {
        let a = Chunk::derive_id("src/lib.rs", 10, 200, "abc123");
        let b = Chunk::derive_id("src/lib.rs", 10, 200, "def456");
        assert_ne!(a, b);
    }

    fn build(content: &str) -> Result<Chunk, SearchError> {
        Chunk::new(
            content.to_string(),
            Language::Rust,
            EntityType::Function,
            "do_thing".to_string(),
            "src/lib.rs".to_string(),
            1,
            10,
            0,
            100,
            "abc123",
            HashMap::new(),
            None,
        )
    }

    #[test]
    fn rejects_empty_content() {
        assert!(matches!(build(""), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_inverted_byte_range() {
        let res = Chunk::new(
            "fn x() {}".to_string(),
            Language::Rust,
            EntityType::Function,
            "x".to_string(),
            "src/lib.rs".to_string(),
            1,
            1,
            100,
            10,
            "abc123",
            HashMap::new(),
            None,
        );
        assert!(matches!(res, Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn repository_reads_from_attributes() {
        let mut attrs = HashMap::new();
        attrs.insert("repository".to_string(), "github.com/acme/widget".to_string());
        let chunk = Chunk::new(
            "fn x() {}".to_string(),
            Language::Rust,
            EntityType::Function,
            "x".to_string(),
            "src/lib.rs".to_string(),
            1,
            1,
            0,
            9,
            "abc123",
            attrs,
            None,
        )
        .unwrap();
        assert_eq!(chunk.repository(), Some("github.com/acme/widget"));
    }
}
