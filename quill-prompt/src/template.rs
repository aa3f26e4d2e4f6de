use std::collections::HashMap;

use quill_context::{CompletionKind, PromptMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindFilter {
    All(AllKinds),
    Set(Vec<CompletionKind>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllKinds {
    #[serde(rename = "all")]
    All,
}

impl KindFilter {
    pub fn matches(&self, kind: CompletionKind) -> bool {
        match self {
            KindFilter::All(_) => true,
            KindFilter::Set(set) => set.contains(&kind),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    pub mode_templates: HashMap<PromptMode, String>,
    pub completion_kinds: KindFilter,
    #[serde(default)]
    pub max_tokens_per_mode: HashMap<PromptMode, u32>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub is_builtin: bool,
}

fn default_temperature() -> f32 {
    0.8
}

impl Template {
    pub fn body_for_mode(&self, mode: PromptMode) -> Option<&str> {
        self.mode_templates.get(&mode).map(String::as_str)
    }

    pub fn max_tokens_for_mode(&self, mode: PromptMode) -> Option<u32> {
        self.max_tokens_per_mode.get(&mode).copied()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateFile {
    pub template: Vec<Template>,
}
