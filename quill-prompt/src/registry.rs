use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::PromptError;
use crate::template::{Template, TemplateFile};

const BUILTIN_TOML: &str = include_str!("templates/builtin.toml");
const DEFAULT_TEMPLATE_ID: &str = "default";

#[derive(Debug, Default)]
struct TemplateSet {
    by_id: HashMap<String, Arc<Template>>,
}

/// Read-mostly, copy-on-write template store: lookups never block a
/// concurrent reload.
pub struct TemplateRegistry {
    templates: ArcSwap<TemplateSet>,
    user_dir: Option<std::path::PathBuf>,
}

impl TemplateRegistry {
    /// Loads just the embedded built-ins.
    pub fn builtin_only() -> Result<Self, PromptError> {
        let registry = Self { templates: ArcSwap::from_pointee(TemplateSet::default()), user_dir: None };
        registry.replace(parse_templates(BUILTIN_TOML, "<builtin>")?);
        Ok(registry)
    }

    /// Loads built-ins, then every `*.toml` file in `user_dir`, later files
    /// overriding earlier ones (and built-ins) by `id`.
    pub fn load(user_dir: &Path) -> Result<Self, PromptError> {
        let registry = Self {
            templates: ArcSwap::from_pointee(TemplateSet::default()),
            user_dir: Some(user_dir.to_path_buf()),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Re-reads the user templates directory and atomically swaps the
    /// active set. Lookups in flight during the swap still see the old
    /// set; no lookup ever observes a half-updated registry.
    pub fn reload(&self) -> Result<(), PromptError> {
        let mut templates = parse_templates(BUILTIN_TOML, "<builtin>")?;

        if let Some(dir) = &self.user_dir {
            let mut paths: Vec<_> = fs::read_dir(dir)
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
                .collect();
            paths.sort();

            for path in paths {
                let text = fs::read_to_string(&path).map_err(|source| PromptError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let path_label = path.display().to_string();
                for template in parse_templates(&text, &path_label)? {
                    templates.insert(template.id.clone(), template);
                }
            }
        }

        self.replace(templates.into_values().collect());
        Ok(())
    }

    fn replace(&self, templates: Vec<Template>) {
        let mut by_id = HashMap::with_capacity(templates.len());
        for template in templates {
            by_id.insert(template.id.clone(), Arc::new(template));
        }
        self.templates.store(Arc::new(TemplateSet { by_id }));
    }

    /// Resolves `id` to a template, falling back to the built-in default
    /// when the id is missing, unknown, or was never set.
    pub fn resolve(&self, id: Option<&str>) -> Arc<Template> {
        let set = self.templates.load();
        if let Some(id) = id {
            if let Some(template) = set.by_id.get(id) {
                return template.clone();
            }
            log::warn!("unknown template id {id:?}, falling back to {DEFAULT_TEMPLATE_ID:?}");
        }
        set.by_id
            .get(DEFAULT_TEMPLATE_ID)
            .cloned()
            .expect("builtin.toml always defines the default template")
    }
}

fn parse_templates(text: &str, label: &str) -> Result<HashMap<String, Template>, PromptError> {
    let file: TemplateFile = toml::from_str(text).map_err(|source| PromptError::Parse {
        path: label.to_string(),
        source,
    })?;
    Ok(file.template.into_iter().map(|t| (t.id.clone(), t)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_default_resolves_without_user_dir() {
        let registry = TemplateRegistry::builtin_only().unwrap();
        let template = registry.resolve(None);
        assert_eq!(template.id, "default");
    }

    #[test]
    fn unknown_id_falls_back_to_default() {
        let registry = TemplateRegistry::builtin_only().unwrap();
        let template = registry.resolve(Some("does-not-exist"));
        assert_eq!(template.id, "default");
    }

    #[test]
    fn user_template_overrides_builtin_by_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("custom.toml"),
            r#"
            [[template]]
            id = "default"
            name = "Custom default"
            category = "general"
            completion_kinds = "all"

            [template.mode_templates]
            fast = "custom fast body"
            balanced = "custom balanced body"
            full = "custom full body"
            "#,
        )
        .unwrap();

        let registry = TemplateRegistry::load(dir.path()).unwrap();
        let template = registry.resolve(None);
        assert_eq!(template.name, "Custom default");
    }

    #[test]
    fn reload_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::load(dir.path()).unwrap();
        assert!(registry.resolve(Some("extra")).id == "default");

        fs::write(
            dir.path().join("extra.toml"),
            r#"
            [[template]]
            id = "extra"
            name = "Extra"
            category = "general"
            completion_kinds = "all"

            [template.mode_templates]
            fast = "x"
            balanced = "x"
            full = "x"
            "#,
        )
        .unwrap();
        registry.reload().unwrap();
        assert_eq!(registry.resolve(Some("extra")).id, "extra");
    }
}
