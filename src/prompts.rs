//! Prompting styles and the instruction templates rendered for the generator.

use crate::error::{HydeError, Result};
use std::fmt;
use std::str::FromStr;

/// Persona/task variant controlling how the generation instruction is phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptStyle {
    WebSearch,
    WebSearchNovice,
    WebSearchIntermediate,
    WebSearchProficient,
    WebSearchExpert,
    SciFact,
    ArguAna,
    TrecCovid,
    Fiqa,
    DbpediaEntity,
    TrecNews,
}

impl PromptStyle {
    /// Styles compared by the similarity experiment, in enumeration order.
    pub const WEB_SEARCH_LEVELS: [PromptStyle; 5] = [
        PromptStyle::WebSearch,
        PromptStyle::WebSearchNovice,
        PromptStyle::WebSearchIntermediate,
        PromptStyle::WebSearchProficient,
        PromptStyle::WebSearchExpert,
    ];

    pub const ALL: [PromptStyle; 11] = [
        PromptStyle::WebSearch,
        PromptStyle::WebSearchNovice,
        PromptStyle::WebSearchIntermediate,
        PromptStyle::WebSearchProficient,
        PromptStyle::WebSearchExpert,
        PromptStyle::SciFact,
        PromptStyle::ArguAna,
        PromptStyle::TrecCovid,
        PromptStyle::Fiqa,
        PromptStyle::DbpediaEntity,
        PromptStyle::TrecNews,
    ];

    /// Label used on the command line, in config and as results JSON keys.
    pub fn label(&self) -> &'static str {
        match self {
            PromptStyle::WebSearch => "web search",
            PromptStyle::WebSearchNovice => "web search novice",
            PromptStyle::WebSearchIntermediate => "web search intermediate",
            PromptStyle::WebSearchProficient => "web search proficient",
            PromptStyle::WebSearchExpert => "web search expert",
            PromptStyle::SciFact => "scifact",
            PromptStyle::ArguAna => "arguana",
            PromptStyle::TrecCovid => "trec-covid",
            PromptStyle::Fiqa => "fiqa",
            PromptStyle::DbpediaEntity => "dbpedia-entity",
            PromptStyle::TrecNews => "trec-news",
        }
    }

    /// Instruction template; `{}` is replaced by the query.
    fn template(&self) -> &'static str {
        match self {
            PromptStyle::WebSearch | PromptStyle::DbpediaEntity => {
                "Please write a passage to answer the question.\nQuestion: {}\nPassage:"
            }
            PromptStyle::WebSearchNovice => {
                "Please write a passage to answer the question, written by someone who is a novice on the topic.\nQuestion: {}\nPassage:"
            }
            PromptStyle::WebSearchIntermediate => {
                "Please write a passage to answer the question, written by someone with intermediate knowledge of the topic.\nQuestion: {}\nPassage:"
            }
            PromptStyle::WebSearchProficient => {
                "Please write a passage to answer the question, written by someone who is proficient in the topic.\nQuestion: {}\nPassage:"
            }
            PromptStyle::WebSearchExpert => {
                "Please write a passage to answer the question, written by an expert on the topic.\nQuestion: {}\nPassage:"
            }
            PromptStyle::SciFact => {
                "Please write a scientific paper passage to support/refute the claim.\nClaim: {}\nPassage:"
            }
            PromptStyle::ArguAna => {
                "Please write a counter argument for the passage.\nPassage: {}\nCounter Argument:"
            }
            PromptStyle::TrecCovid => {
                "Please write a scientific paper passage to answer the question.\nQuestion: {}\nPassage:"
            }
            PromptStyle::Fiqa => {
                "Please write a financial article passage to answer the question.\nQuestion: {}\nPassage:"
            }
            PromptStyle::TrecNews => {
                "Please write a news passage about the topic.\nTopic: {}\nPassage:"
            }
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PromptStyle {
    type Err = HydeError;

    /// Exact label match; unknown labels never fall back to a default template.
    fn from_str(s: &str) -> Result<Self> {
        PromptStyle::ALL
            .iter()
            .copied()
            .find(|style| style.label() == s.trim())
            .ok_or_else(|| HydeError::InvalidStyle(s.to_string()))
    }
}

/// Renders the generation instruction for one prompting style.
#[derive(Debug, Clone, Copy)]
pub struct Promptor {
    style: PromptStyle,
}

impl Promptor {
    pub fn new(style: PromptStyle) -> Self {
        Self { style }
    }

    /// Build a promptor from a style label, failing on unknown labels.
    pub fn from_label(label: &str) -> Result<Self> {
        Ok(Self::new(label.parse()?))
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    /// Pure function of (style, query).
    pub fn render(&self, query: &str) -> String {
        self.style.template().replacen("{}", query, 1)
    }
}
