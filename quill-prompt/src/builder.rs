use std::collections::HashMap;

use quill_context::{CompletionKind, ContextWindow, PromptMode};

use crate::analysis::analyze;
use crate::guidance::{max_output_tokens, type_specific_guidance};
use crate::registry::TemplateRegistry;

#[derive(Debug, Clone, Default)]
pub struct ProjectMeta {
    pub style: Option<String>,
    pub genre: Option<String>,
    pub perspective: Option<String>,
}

impl ProjectMeta {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(style) = &self.style {
            parts.push(format!("style: {style}"));
        }
        if let Some(genre) = &self.genre {
            parts.push(format!("genre: {genre}"));
        }
        if let Some(perspective) = &self.perspective {
            parts.push(format!("perspective: {perspective}"));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct RagChunk {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PromptInputs<'a> {
    pub window: &'a ContextWindow,
    pub mode: PromptMode,
    pub rag_context: &'a [RagChunk],
    pub template_id: Option<&'a str>,
    pub project_meta: ProjectMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub struct PromptBuilder {
    registry: TemplateRegistry,
}

impl PromptBuilder {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, inputs: &PromptInputs<'_>) -> BuiltPrompt {
        let template = self.registry.resolve(inputs.template_id);
        let body = template
            .body_for_mode(inputs.mode)
            .or_else(|| template.body_for_mode(PromptMode::Balanced))
            .unwrap_or_default()
            .to_string();

        let cap = inputs.mode.prompt_char_cap();
        let mut context_text = inputs.window.text.clone();
        let mut rag_section = render_rag_section(inputs.rag_context, inputs.mode);
        let mut context_analysis = analyze(&inputs.window.text).render();

        let mut prompt = render(&body, &vars(inputs, &context_text, &rag_section, &context_analysis));

        if char_len(&prompt) > cap && !rag_section.is_empty() {
            rag_section = String::new();
            prompt = render(&body, &vars(inputs, &context_text, &rag_section, &context_analysis));
        }

        if char_len(&prompt) > cap {
            context_text = shrink_to_fit(&context_text, cap);
            prompt = render(&body, &vars(inputs, &context_text, &rag_section, &context_analysis));
        }

        if char_len(&prompt) > cap && !context_analysis.is_empty() {
            context_analysis = String::new();
            prompt = render(&body, &vars(inputs, &context_text, &rag_section, &context_analysis));
        }

        if char_len(&prompt) > cap {
            prompt = prompt.chars().take(cap).collect();
        }

        let max_tokens = template
            .max_tokens_for_mode(inputs.mode)
            .unwrap_or_else(|| max_output_tokens(inputs.window.kind, inputs.mode));

        BuiltPrompt { prompt, max_tokens, temperature: template.temperature }
    }
}

fn vars<'a>(
    inputs: &'a PromptInputs<'_>,
    context_text: &'a str,
    rag_section: &'a str,
    context_analysis: &'a str,
) -> HashMap<&'static str, String> {
    let mut map = HashMap::new();
    map.insert("context_text", context_text.to_string());
    map.insert("type_specific_guidance", type_specific_guidance(inputs.window.kind, inputs.mode));
    map.insert("context_analysis", context_analysis.to_string());
    map.insert("rag_section", rag_section.to_string());
    map.insert("project_meta", inputs.project_meta.render());
    map
}

fn render_rag_section(chunks: &[RagChunk], mode: PromptMode) -> String {
    if chunks.is_empty() {
        return String::new();
    }
    let label = match mode {
        PromptMode::Fast => "reference",
        PromptMode::Balanced => "project reference",
        PromptMode::Full => "project reference material",
    };
    let body = chunks
        .iter()
        .map(|c| format!("[{}]\n{}", c.source, c.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("```{label}\n{body}\n```")
}

fn render(body: &str, vars: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                out.push_str(vars.get(key).map(String::as_str).unwrap_or(""));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim().to_string()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Keeps the tail of `text` (closest to the cursor) and drops the front.
fn shrink_to_fit(text: &str, cap: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= cap {
        return text.to_string();
    }
    chars[chars.len() - cap..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_context::extract_window;
    use quill_doc::Rope;

    fn window(text: &str, mode: PromptMode) -> ContextWindow {
        let rope = Rope::from_str(text);
        extract_window(&rope, rope.len_chars(), mode)
    }

    #[test]
    fn unknown_variables_render_empty() {
        let vars = HashMap::new();
        assert_eq!(render("before {{nope}} after", &vars), "before  after");
    }

    #[test]
    fn known_variable_is_substituted() {
        let mut vars = HashMap::new();
        vars.insert("context_text", "hello".to_string());
        assert_eq!(render("{{context_text}} world", &vars), "hello world");
    }

    #[test]
    fn builds_within_char_cap_for_fast_mode() {
        let registry = TemplateRegistry::builtin_only().unwrap();
        let builder = PromptBuilder::new(registry);
        let window = window(&"word ".repeat(5000), PromptMode::Fast);
        let inputs = PromptInputs {
            window: &window,
            mode: PromptMode::Fast,
            rag_context: &[],
            template_id: None,
            project_meta: ProjectMeta::default(),
        };
        let built = builder.build(&inputs);
        assert!(built.prompt.chars().count() <= PromptMode::Fast.prompt_char_cap());
    }

    #[test]
    fn overflow_drops_rag_before_shrinking_window() {
        let registry = TemplateRegistry::builtin_only().unwrap();
        let builder = PromptBuilder::new(registry);
        let window = window("A short sentence to continue.", PromptMode::Fast);
        let rag = vec![RagChunk { source: "notes".into(), text: "x".repeat(3000) }];
        let inputs = PromptInputs {
            window: &window,
            mode: PromptMode::Fast,
            rag_context: &rag,
            template_id: None,
            project_meta: ProjectMeta::default(),
        };
        let built = builder.build(&inputs);
        assert!(!built.prompt.contains("```reference"));
        assert!(built.prompt.contains("A short sentence"));
    }
}
