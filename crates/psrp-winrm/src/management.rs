//! WS-Management (DMTF DSP0226) header values layered on top of WS-Addressing:
//! `ResourceURI`, `SelectorSet`, `OptionSet`, `OperationTimeout`, session/operation ids.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `w:Selector` entries identifying a specific resource instance (e.g. the
/// shell id once a shell has been created).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    #[serde(rename = "w:Selector", default)]
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "$text")]
    pub value: String,
}

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.selectors.push(Selector {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.selectors
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.value.as_str())
    }

    pub fn shell_id(shell_id: impl Into<String>) -> Self {
        Self::new().with("ShellId", shell_id)
    }
}

/// `w:Option` entries, e.g. `WINRS_CONSOLEMODE_STDIN`/`WINRS_SKIP_CMD_SHELL`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    #[serde(rename = "w:Option", default)]
    pub options: Vec<WsOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsOption {
    #[serde(rename = "@Name")]
    pub name: String,
    #[serde(rename = "@MustComply", skip_serializing_if = "Option::is_none")]
    pub must_comply: Option<bool>,
    #[serde(rename = "$text")]
    pub value: String,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(WsOption {
            name: name.into(),
            must_comply: Some(true),
            value: value.into(),
        });
        self
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.options.into_iter().map(|o| (o.name, o.value)).collect()
    }
}

/// An xs:duration value, e.g. `PT60S`. Only whole-second resolution is
/// needed for WinRM operation timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsDuration(pub Duration);

impl std::fmt::Display for WsDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PT{}S", self.0.as_secs())
    }
}

impl Serialize for WsDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WsDuration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits: String = s
            .trim_start_matches("PT")
            .trim_end_matches('S')
            .chars()
            .collect();
        let secs: u64 = digits.parse().map_err(serde::de::Error::custom)?;
        Ok(WsDuration(Duration::from_secs(secs)))
    }
}
