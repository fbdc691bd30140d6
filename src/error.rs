use std::fmt;

/// The request an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authenticate,
    ListLocations,
    ListDevices,
    ListGroups,
    ListScenes,
    GetDeviceState,
    GetGroupState,
    SetDeviceState,
    SetGroupState,
    SetSceneState,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::ListLocations => "list_locations",
            Operation::ListDevices => "list_devices",
            Operation::ListGroups => "list_groups",
            Operation::ListScenes => "list_scenes",
            Operation::GetDeviceState => "get_device_state",
            Operation::GetGroupState => "get_group_state",
            Operation::SetDeviceState => "set_device_state",
            Operation::SetGroupState => "set_group_state",
            Operation::SetSceneState => "set_scene_state",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum Error {
    /// Credentials rejected, token missing, or the session call itself failed.
    Authentication {
        operation: Operation,
        message: String,
        source: Option<reqwest::Error>,
    },
    Transport {
        operation: Operation,
        source: reqwest::Error,
    },
    Protocol {
        operation: Operation,
        message: String,
    },
    NotFound {
        kind: &'static str,
        pid: String,
    },
    /// The entity kind has no such capability (e.g. dimming a scene).
    Unsupported {
        kind: &'static str,
        operation: &'static str,
    },
    Config(String),
    Io(std::io::Error),
}

impl Error {
    pub(crate) fn auth(operation: Operation, message: impl Into<String>) -> Self {
        Error::Authentication {
            operation,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn protocol(operation: Operation, message: impl Into<String>) -> Self {
        Error::Protocol {
            operation,
            message: message.into(),
        }
    }

    /// True when the underlying HTTP exchange hit the configured timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport { source, .. } => source.is_timeout(),
            Error::Authentication {
                source: Some(source),
                ..
            } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Authentication { operation, .. }
            | Error::Transport { operation, .. }
            | Error::Protocol { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication {
                operation, message, ..
            } => write!(f, "authentication failed in {operation}: {message}"),
            Error::Transport { operation, source } => {
                if source.is_timeout() {
                    write!(f, "{operation} timed out: {source}")
                } else {
                    write!(f, "{operation} failed: {source}")
                }
            }
            Error::Protocol { operation, message } => {
                write!(f, "protocol error in {operation}: {message}")
            }
            Error::NotFound { kind, pid } => write!(f, "{kind} not found: {pid}"),
            Error::Unsupported { kind, operation } => {
                write!(f, "{operation} is not supported by {kind}s")
            }
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Authentication {
                source: Some(e), ..
            } => Some(e),
            Error::Transport { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
