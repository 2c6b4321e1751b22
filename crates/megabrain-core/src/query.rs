//! Parses a free-text query string into residual keyword text, facet
//! filters, and at most one structural predicate.
//!
//! Tokens are split on whitespace, except inside double-quoted phrases,
//! which survive intact (quotes included) into the residual text regardless
//! of what they look like — `"implements:Foo"` is a literal phrase, not a
//! predicate, because the token begins with a quote character rather than a
//! recognized prefix.
//!
//! Recognized prefixes (case-insensitive): `implements:`, `extends:`,
//! `usages:`, `language:`, `entity_type:`, `repository:`. Only the first
//! structural predicate (`implements:`/`extends:`/`usages:`) encountered
//! wins; any later one is demoted to residual text untouched.

use std::fmt;
use std::str::FromStr;

use crate::chunk::{EntityType, Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    Implements,
    Extends,
    Usages,
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PredicateKind::Implements => "implements",
            PredicateKind::Extends => "extends",
            PredicateKind::Usages => "usages",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralPredicate {
    pub kind: PredicateKind,
    pub target_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub language: Option<Language>,
    pub entity_type: Option<EntityType>,
    pub repository: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub residual_text: String,
    pub facets: Facets,
    pub structural_predicate: Option<StructuralPredicate>,
}

impl ParsedQuery {
    /// Reconstruct a canonical query string from the parsed triple. Used by
    /// the parse → serialize → parse round-trip property: the triple
    /// produced by parsing this string again must equal `self`, not that the
    /// string is byte-identical to whatever was originally typed.
    ///
    /// The real `structural_predicate` is emitted *before* `residual_text`,
    /// never after. `residual_text` can itself contain a demoted
    /// predicate-looking token (e.g. `extends:Thread` when `implements:` was
    /// the first one seen) — only the first occurrence in the string wins, so
    /// if that demoted token were serialized ahead of the real predicate it
    /// would win the reparse instead and the round-trip would land on the
    /// wrong predicate kind.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(pred) = &self.structural_predicate {
            parts.push(format!("{}:{}", pred.kind, pred.target_name));
        }
        if let Some(language) = self.facets.language {
            parts.push(format!("language:{language}"));
        }
        if let Some(entity_type) = self.facets.entity_type {
            parts.push(format!("entity_type:{entity_type}"));
        }
        if let Some(repository) = &self.facets.repository {
            parts.push(format!("repository:{repository}"));
        }
        if !self.residual_text.is_empty() {
            parts.push(self.residual_text.clone());
        }
        parts.join(" ")
    }
}

fn tokenize(query_text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in query_text.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn strip_prefix_ci<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    if token.len() < prefix.len() {
        return None;
    }
    let (head, tail) = token.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) {
        Some(tail)
    } else {
        None
    }
}

pub fn parse(query_text: &str) -> ParsedQuery {
    let mut residual_tokens: Vec<String> = Vec::new();
    let mut facets = Facets::default();
    let mut structural_predicate: Option<StructuralPredicate> = None;

    for token in tokenize(query_text) {
        if token.starts_with('"') {
            residual_tokens.push(token);
            continue;
        }

        if let Some(value) = strip_prefix_ci(&token, "language:") {
            if !value.is_empty() {
                facets.language = Some(Language::from_str(value).unwrap());
                continue;
            }
        }
        if let Some(value) = strip_prefix_ci(&token, "entity_type:") {
            if !value.is_empty() {
                facets.entity_type = Some(EntityType::from_str(value).unwrap());
                continue;
            }
        }
        if let Some(value) = strip_prefix_ci(&token, "repository:") {
            if !value.is_empty() {
                facets.repository = Some(value.to_string());
                continue;
            }
        }
        if structural_predicate.is_none() {
            if let Some(value) = strip_prefix_ci(&token, "implements:") {
                if !value.is_empty() {
                    structural_predicate = Some(StructuralPredicate {
                        kind: PredicateKind::Implements,
                        target_name: value.to_string(),
                    });
                    continue;
                }
            }
            if let Some(value) = strip_prefix_ci(&token, "extends:") {
                if !value.is_empty() {
                    structural_predicate = Some(StructuralPredicate {
                        kind: PredicateKind::Extends,
                        target_name: value.to_string(),
                    });
                    continue;
                }
            }
            if let Some(value) = strip_prefix_ci(&token, "usages:") {
                if !value.is_empty() {
                    structural_predicate = Some(StructuralPredicate {
                        kind: PredicateKind::Usages,
                        target_name: value.to_string(),
                    });
                    continue;
                }
            }
        }

        residual_tokens.push(token);
    }

    ParsedQuery {
        residual_text: residual_tokens.join(" "),
        facets,
        structural_predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_query_has_no_facets_or_predicate() {
        let parsed = parse("retry logic for http client");
        assert_eq!(parsed.residual_text, "retry logic for http client");
        assert_eq!(parsed.facets, Facets::default());
        assert!(parsed.structural_predicate.is_none());
    }

    #[test]
    fn recognizes_language_and_entity_type_facets() {
        let parsed = parse("retry language:rust entity_type:function");
        assert_eq!(parsed.residual_text, "retry");
        assert_eq!(parsed.facets.language, Some(Language::Rust));
        assert_eq!(parsed.facets.entity_type, Some(EntityType::Function));
    }

    #[test]
    fn recognizes_case_insensitive_prefixes() {
        let parsed = parse("LANGUAGE:Rust Entity_Type:Class");
        assert_eq!(parsed.facets.language, Some(Language::Rust));
        assert_eq!(parsed.facets.entity_type, Some(EntityType::Class));
    }

    #[test]
    fn recognizes_structural_predicate() {
        let parsed = parse("implements:Runnable");
        assert_eq!(
            parsed.structural_predicate,
            Some(StructuralPredicate {
                kind: PredicateKind::Implements,
                target_name: "Runnable".to_string(),
            })
        );
        assert_eq!(parsed.residual_text, "");
    }

    #[test]
    fn only_first_structural_predicate_wins() {
        let parsed = parse("implements:Runnable extends:Thread");
        assert_eq!(parsed.structural_predicate.as_ref().unwrap().kind, PredicateKind::Implements);
        assert_eq!(parsed.residual_text, "extends:Thread");
    }

    #[test]
    fn quoted_phrase_is_never_treated_as_a_predicate() {
        let parsed = parse("\"implements:Foo\" bar");
        assert!(parsed.structural_predicate.is_none());
        assert_eq!(parsed.residual_text, "\"implements:Foo\" bar");
    }

    #[test]
    fn quoted_phrase_with_space_stays_one_token_in_residual() {
        let parsed = parse("\"hybrid search\" language:rust");
        assert_eq!(parsed.residual_text, "\"hybrid search\"");
        assert_eq!(parsed.facets.language, Some(Language::Rust));
    }

    #[test]
    fn round_trips_through_to_query_string() {
        let original = parse("retry logic implements:Runnable language:rust repository:acme/widget");
        let serialized = original.to_query_string();
        let reparsed = parse(&serialized);
        assert_eq!(original, reparsed);
    }

    #[test]
    fn round_trips_plain_query() {
        let original = parse("just some words");
        let reparsed = parse(&original.to_query_string());
        assert_eq!(original, reparsed);
    }

    #[test]
    fn round_trips_when_residual_carries_a_demoted_predicate() {
        let original = parse("implements:Runnable extends:Thread");
        let serialized = original.to_query_string();
        let reparsed = parse(&serialized);
        assert_eq!(original, reparsed);
        assert_eq!(reparsed.structural_predicate.as_ref().unwrap().kind, PredicateKind::Implements);
        assert_eq!(reparsed.residual_text, "extends:Thread");
    }
}
