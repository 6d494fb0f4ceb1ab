//! `rsp:Signal` body: out-of-band pipeline control (terminate/ctrl-c).

use serde::{Deserialize, Serialize};

use crate::action::{SIGNAL_CODE_CTRL_C, SIGNAL_CODE_TERMINATE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBody {
    #[serde(rename = "rsp:Signal")]
    pub signal: Signal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "@CommandId")]
    pub command_id: String,
    #[serde(rename = "rsp:Code")]
    pub code: String,
}

impl Signal {
    pub fn terminate(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            code: SIGNAL_CODE_TERMINATE.to_string(),
        }
    }

    pub fn ctrl_c(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            code: SIGNAL_CODE_CTRL_C.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResponseBody {}
