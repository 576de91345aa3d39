//! Per-field directives and the field-metadata token grammar.
//!
//! Metadata strings are comma-separated tokens in any order, e.g.
//! `"tag:2,class:application,explicit,optional"`. Recognized tokens:
//!
//! - `tag:N`: tag number override
//! - `class:universal|application|context|private`: class override
//! - `explicit`: wrap the native TLV instead of replacing its identifier
//! - `optional`: the field may be absent
//! - `omit-empty`: skip emission when the value is empty
//! - `default:NAME`: registered default value for the field
//! - `constraint:[^|$]NAME`: registered constraint; `^` marks it
//!   encode-only, `$` decode-only (repeat the token for several)
//! - `choices:NAME`: registered choices set for a CHOICE field
//! - `automatic`: automatic tagging inside this SEQUENCE/SET
//! - `indefinite`: indefinite-length emission (BER only)
//! - `components-of`: inline the fields of a nested SEQUENCE
//! - `sequence`: encode a collection as SEQUENCE OF instead of SET OF
//! - `identifier:KEYWORD`: adapter keyword for host-typed fields
//! - `absent`: the field must not appear on the wire

use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::Class;

/// Resolved per-field directives plus derived recursion state.
///
/// Options are copied per recursion level; children never mutate parent
/// state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub tag: Option<u32>,
    pub class: Option<Class>,
    pub explicit: bool,
    pub optional: bool,
    pub omit_empty: bool,
    pub default_value: Option<String>,
    pub constraints: Vec<String>,
    pub choices: Option<String>,
    pub automatic: bool,
    pub indefinite: bool,
    pub components_of: bool,
    pub sequence: bool,
    pub identifier: Option<String>,
    pub absent: bool,
    /// Current recursion depth, maintained by the structural codecs.
    pub depth: u32,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated metadata string.
    pub fn parse(meta: &str) -> Result<Self> {
        let mut opts = Self::default();
        for token in meta.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once(':') {
                None => match token.to_ascii_lowercase().as_str() {
                    "explicit" => opts.explicit = true,
                    "optional" => opts.optional = true,
                    "omit-empty" | "omitempty" => opts.omit_empty = true,
                    "automatic" => opts.automatic = true,
                    "indefinite" => opts.indefinite = true,
                    "components-of" => opts.components_of = true,
                    "sequence" => opts.sequence = true,
                    "absent" => opts.absent = true,
                    _ => return Err(Error::UnknownOption(token.to_string())),
                },
                Some((key, value)) => {
                    let value = value.trim();
                    match key.trim().to_ascii_lowercase().as_str() {
                        "tag" => {
                            let tag = value
                                .parse::<u32>()
                                .map_err(|_| Error::UnknownOption(token.to_string()))?;
                            opts.tag = Some(tag);
                        }
                        "class" => opts.class = Some(parse_class(value)?),
                        "default" => opts.default_value = Some(value.to_string()),
                        "constraint" => opts.constraints.push(value.to_string()),
                        "choices" => opts.choices = Some(value.to_string()),
                        "identifier" => opts.identifier = Some(value.to_ascii_lowercase()),
                        _ => return Err(Error::UnknownOption(token.to_string())),
                    }
                }
            }
        }
        Ok(opts)
    }

    /// Checks rule-dependent directives before a pass starts.
    pub fn validate(&self, rule: EncodingRule) -> Result<()> {
        if self.indefinite && !rule.allows_indefinite() {
            return Err(Error::OptionIncompatibleWithRule { option: "indefinite", rule });
        }
        Ok(())
    }

    /// Fresh options for one recursion level deeper. Field-local
    /// directives do not propagate; ambient mode flags do.
    pub fn child(&self) -> Self {
        Self {
            automatic: self.automatic,
            indefinite: self.indefinite,
            depth: self.depth + 1,
            ..Self::default()
        }
    }

    /// True when a (class, tag) override is in force.
    pub fn has_override(&self) -> bool {
        self.tag.is_some()
    }

    /// Class in force for an override; context-specific unless set.
    pub fn override_class(&self) -> Class {
        self.class.unwrap_or(Class::ContextSpecific)
    }
}

fn parse_class(value: &str) -> Result<Class> {
    match value.to_ascii_lowercase().as_str() {
        "universal" => Ok(Class::Universal),
        "application" => Ok(Class::Application),
        "context" | "context-specific" => Ok(Class::ContextSpecific),
        "private" => Ok(Class::Private),
        other => Err(Error::UnknownOption(format!("class:{other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_token_set() {
        let opts = Options::parse(
            "tag:7,class:application,explicit,optional,omit-empty,default:version,\
             constraint:^uppercase,constraint:$bounded,choices:status,automatic,\
             components-of,sequence,identifier:printable,absent",
        )
        .unwrap();
        assert_eq!(opts.tag, Some(7));
        assert_eq!(opts.class, Some(Class::Application));
        assert!(opts.explicit && opts.optional && opts.omit_empty);
        assert_eq!(opts.default_value.as_deref(), Some("version"));
        assert_eq!(opts.constraints, ["^uppercase", "$bounded"]);
        assert_eq!(opts.choices.as_deref(), Some("status"));
        assert!(opts.automatic && opts.components_of && opts.sequence && opts.absent);
        assert_eq!(opts.identifier.as_deref(), Some("printable"));
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        assert!(matches!(Options::parse("bogus"), Err(Error::UnknownOption(_))));
        assert!(matches!(Options::parse("tag:x"), Err(Error::UnknownOption(_))));
        assert!(matches!(Options::parse("class:imaginary"), Err(Error::UnknownOption(_))));
    }

    #[test]
    fn empty_and_whitespace_tokens_are_ignored() {
        let opts = Options::parse(" , explicit ,, tag: 3 ").unwrap();
        assert!(opts.explicit);
        assert_eq!(opts.tag, Some(3));
    }

    #[test]
    fn indefinite_requires_ber() {
        let opts = Options::parse("indefinite").unwrap();
        assert!(opts.validate(EncodingRule::Ber).is_ok());
        assert!(matches!(
            opts.validate(EncodingRule::Der),
            Err(Error::OptionIncompatibleWithRule { option: "indefinite", rule: EncodingRule::Der })
        ));
    }

    #[test]
    fn child_resets_field_directives() {
        let mut opts = Options::parse("tag:1,explicit,automatic").unwrap();
        opts.depth = 2;
        let child = opts.child();
        assert_eq!(child.depth, 3);
        assert!(child.automatic);
        assert_eq!(child.tag, None);
        assert!(!child.explicit);
    }

    #[test]
    fn override_class_defaults_to_context() {
        let opts = Options::parse("tag:0").unwrap();
        assert!(opts.has_override());
        assert_eq!(opts.override_class(), Class::ContextSpecific);
    }
}
