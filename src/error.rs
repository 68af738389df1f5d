//! Domain errors raised while loading, registering, and binding handlers.
//!
//! Anything not covered here travels as a plain `anyhow::Error`.  Domain errors are wrapped in
//! `anyhow::Error` too and recovered with `downcast_ref` when a batch gets reported.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Code {
    // Commands
    #[error("guild commands collection does not exist")]
    CommandCollectionNotExist,
    #[error("command is not in Discord API")]
    CommandNotExistOnApi,
    #[error("command is not loaded")]
    CommandUnknown,
    #[error("missing body in a command")]
    CommandMissingBody,
    #[error("missing body.name in a command")]
    CommandMissingName,
    #[error("missing body.description in a chat input command")]
    CommandMissingDescription,
    #[error("missing option in a sub command/sub command group")]
    OptionMissing,
    #[error("type is not recognized")]
    TypeUnrecognized,
    #[error("permission is not recognized")]
    PermissionUnrecognized,
    #[error("handler is not registered")]
    HandlerUnknown,
    #[error("name is already used in this scope")]
    NameDuplicated,
    #[error("guild folder name is not a guild id")]
    GuildIdInvalid,
    #[error("manifest is not valid TOML")]
    ManifestInvalid,

    // Interactions
    #[error("missing data in a button/select_menu")]
    InteractionMissingData,
    #[error("missing data.custom_id in a button/select_menu")]
    InteractionMissingId,
    #[error("missing data.url in a button")]
    InteractionMissingUrl,

    // Events
    #[error("handler file is missing in a event folder")]
    EventMissingHandler,
    #[error("event is not a supported gateway event")]
    EventUnsupported,
}

/// Error with a fixed code and severity, plus whatever it was about (file, name, id)
#[derive(Debug, thiserror::Error)]
pub struct DomainError {
    pub severity: Severity,
    pub code: Code,
    pub subject: Option<String>,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{} ({})", self.code, subject),
            None => write!(f, "{}", self.code),
        }
    }
}

impl DomainError {
    pub fn error(code: Code, subject: impl fmt::Display) -> Self {
        Self {
            severity: Severity::Error,
            code,
            subject: Some(subject.to_string()),
        }
    }

    pub fn warn(code: Code, subject: impl fmt::Display) -> Self {
        Self {
            severity: Severity::Warn,
            code,
            subject: Some(subject.to_string()),
        }
    }
}

/// Returns the domain code carried by an error, if it is a domain error
pub fn code_of(err: &anyhow::Error) -> Option<Code> {
    err.downcast_ref::<DomainError>().map(|e| e.code)
}

/// Outcome of a loop over many files or commands.  A failing item never stops the loop; its
/// error lands here instead.
pub struct Batch<T> {
    pub loaded: T,
    pub errors: Vec<anyhow::Error>,
}

impl<T: Default> Default for Batch<T> {
    fn default() -> Self {
        Self {
            loaded: T::default(),
            errors: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    pub fn new(loaded: T) -> Self {
        Self {
            loaded,
            errors: Vec::new(),
        }
    }

    pub fn fail(&mut self, err: impl Into<anyhow::Error>) {
        self.errors.push(err.into());
    }

    #[cfg(test)]
    pub fn codes(&self) -> Vec<Code> {
        self.errors.iter().filter_map(code_of).collect()
    }
}
