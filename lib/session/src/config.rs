use ahash::AHashMap;
use handknn_core::{Error, Label, Result};
use std::time::Duration;
use crate::collaborator::EstimationConfig;

/// Display names for labels, keyed by the label's rendered value
#[derive(Debug, Clone, Default)]
pub struct ClassNames {
    names: AHashMap<String, String>,
}

impl ClassNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name numeric class ids `0, 1, 2, ...` in order
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (i.to_string(), name.into()))
            .collect();
        Self { names }
    }

    pub fn insert(&mut self, label: impl Into<Label>, name: impl Into<String>) {
        self.names.insert(label.into().to_string(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name of `label`, falling back to the label itself.
    /// `Label::Integer(1)` and `Label::String("1")` share a name.
    pub fn display(&self, label: &Label) -> String {
        let key = label.to_string();
        self.names.get(&key).cloned().unwrap_or(key)
    }
}

/// Configuration for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub estimation: EstimationConfig,
    pub class_names: ClassNames,
    /// Label reported when there is nothing to classify
    pub none_label: String,
    /// Pacing of the frame loop
    pub frame_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            estimation: EstimationConfig::default(),
            class_names: ClassNames::default(),
            none_label: "none".to_string(),
            // One display frame at 60 Hz
            frame_interval: Duration::from_micros(16_667),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "frame_interval must be greater than zero".to_string(),
            ));
        }
        if self.none_label.is_empty() {
            return Err(Error::InvalidConfig("none_label must not be empty".to_string()));
        }
        Ok(())
    }
}
