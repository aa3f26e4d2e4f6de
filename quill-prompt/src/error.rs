use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read template file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse template file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}
