use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ShakeError {
    #[error("failed to extract archive {path}: {cause}")]
    #[diagnostic(help("check that the file is a readable shake.zip and the output root is writable"))]
    Extraction { path: Utf8PathBuf, cause: String },

    #[error("failed to reproject layer {path}: {cause}")]
    Reprojection { path: Utf8PathBuf, cause: String },

    #[error("failed to copy database template to {path}: {cause}")]
    #[diagnostic(help("the scenario output directory must not exist before a conversion"))]
    TemplateCopy { path: Utf8PathBuf, cause: String },

    #[error("failed to rename database {path}: {cause}")]
    Rename { path: Utf8PathBuf, cause: String },

    #[error("invalid scenario name: {0:?}")]
    InvalidScenario(String),

    #[error("output root is required (use --output-root or set output_root in the config file)")]
    MissingOutputRoot,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ShakeError {
    pub fn extraction(path: impl Into<Utf8PathBuf>, cause: impl ToString) -> Self {
        ShakeError::Extraction {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn reprojection(path: impl Into<Utf8PathBuf>, cause: impl ToString) -> Self {
        ShakeError::Reprojection {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn template_copy(path: impl Into<Utf8PathBuf>, cause: impl ToString) -> Self {
        ShakeError::TemplateCopy {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn rename(path: impl Into<Utf8PathBuf>, cause: impl ToString) -> Self {
        ShakeError::Rename {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Stable label used in JSON results.
    pub fn kind(&self) -> &'static str {
        match self {
            ShakeError::Extraction { .. } => "extraction_error",
            ShakeError::Reprojection { .. } => "reprojection_error",
            ShakeError::TemplateCopy { .. } => "template_copy_error",
            ShakeError::Rename { .. } => "rename_error",
            ShakeError::InvalidScenario(_) => "invalid_scenario",
            ShakeError::MissingOutputRoot => "missing_output_root",
            ShakeError::ConfigRead(_) => "config_read",
            ShakeError::ConfigParse(_) => "config_parse",
            ShakeError::Filesystem(_) => "filesystem",
        }
    }

    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            ShakeError::Extraction { path, .. }
            | ShakeError::Reprojection { path, .. }
            | ShakeError::TemplateCopy { path, .. }
            | ShakeError::Rename { path, .. } => Some(path),
            ShakeError::ConfigRead(path) => Some(path),
            _ => None,
        }
    }
}
