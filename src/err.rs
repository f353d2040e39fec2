use std::convert::From;
use std::error::Error;
use std::fmt;

use serde_json;

/// Errors from adopting a persisted state snapshot
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum StateErr {
    UnsupportedVersion(u32),
    MalformedSnapshot,
}

impl Error for StateErr {
    fn description(&self) -> &str {
        match *self {
            StateErr::UnsupportedVersion(_) => "unsupported snapshot version",
            StateErr::MalformedSnapshot => "malformed snapshot",
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        None
    }
}

impl fmt::Display for StateErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StateErr::UnsupportedVersion(version) => {
                write!(f, "unsupported snapshot version '{}'", version)
            }
            StateErr::MalformedSnapshot => write!(f, "malformed snapshot"),
        }
    }
}

impl From<serde_json::Error> for StateErr {
    fn from(_: serde_json::Error) -> StateErr {
        StateErr::MalformedSnapshot
    }
}
