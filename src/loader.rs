// Document loading
// Reads JSON or YAML files and optionally substitutes them

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::environment::Environment;
use crate::substitute::Substitution;
use crate::value::Value;

/// Loader errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Cannot infer the file type of {0}")]
    UnknownFormat(PathBuf),

    #[error("File type '{0}' is not implemented")]
    NotImplemented(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Yaml,
}

impl FromStr for FileType {
    type Err = LoadError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "json" => Ok(FileType::Json),
            "yaml" | "yml" => Ok(FileType::Yaml),
            other => Err(LoadError::NotImplemented(other.to_string())),
        }
    }
}

impl FileType {
    /// Infer the format from the last `.`-separated part of the file name
    pub fn detect(path: &Path) -> Result<Self, LoadError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LoadError::UnknownFormat(path.to_path_buf()))?;
        match name.rsplit_once('.') {
            Some((_, extension)) => extension.parse(),
            None => Err(LoadError::UnknownFormat(path.to_path_buf())),
        }
    }

    pub fn parse(self, text: &str) -> Result<Value, LoadError> {
        let value = match self {
            FileType::Json => serde_json::from_str(text)?,
            FileType::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(value)
    }
}

/// Options for [`load`]
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit format token; inferred from the file name when absent
    pub file_type: Option<String>,
    /// Substitute the document after parsing
    pub parse: bool,
    pub context: Value,
    /// Context overrides, keyed by pointer without the leading `/`
    pub values: IndexMap<String, Value>,
    pub environment: Environment,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            file_type: None,
            parse: true,
            context: Value::empty_object(),
            values: IndexMap::new(),
            environment: Environment::default(),
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_value(mut self, pointer: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(pointer.into(), value.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Load a JSON or YAML document and, unless disabled, substitute it
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> crate::Result<Value> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::NotAFile(path.to_path_buf()).into());
    }

    let file_type = match &options.file_type {
        Some(token) => token.parse::<FileType>()?,
        None => FileType::detect(path)?,
    };
    debug!(path = %path.display(), ?file_type, "loading document");

    let text = fs::read_to_string(path).map_err(LoadError::from)?;
    let document = file_type.parse(&text)?;
    if !options.parse {
        return Ok(document);
    }

    let overrides = options
        .values
        .iter()
        .map(|(pointer, value)| (pointer.as_str(), value.clone()));
    Substitution::new()
        .with_context(options.context.clone())
        .with_environment(options.environment.clone())
        .with_overrides(overrides)?
        .apply(&document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_tokens() {
        assert_eq!("json".parse::<FileType>().unwrap(), FileType::Json);
        assert_eq!("yaml".parse::<FileType>().unwrap(), FileType::Yaml);
        assert_eq!("yml".parse::<FileType>().unwrap(), FileType::Yaml);
        assert!(matches!(
            "toml".parse::<FileType>(),
            Err(LoadError::NotImplemented(token)) if token == "toml"
        ));
    }

    #[test]
    fn test_detect() {
        assert_eq!(FileType::detect(Path::new("a/b.json")).unwrap(), FileType::Json);
        assert_eq!(FileType::detect(Path::new("b.tar.yml")).unwrap(), FileType::Yaml);
        assert!(matches!(
            FileType::detect(Path::new("a/anonymous")),
            Err(LoadError::UnknownFormat(_))
        ));
        assert!(matches!(
            FileType::detect(Path::new("notes.txt")),
            Err(LoadError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_parse_formats() {
        let json = FileType::Json.parse(r#"{"a": [1, "x"]}"#).unwrap();
        let yaml = FileType::Yaml.parse("a:\n  - 1\n  - x\n").unwrap();
        assert_eq!(json, yaml);
        assert!(matches!(FileType::Json.parse("{"), Err(LoadError::Json(_))));
    }
}
