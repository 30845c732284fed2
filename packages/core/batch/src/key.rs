use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Identify one in-flight reassembly
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchKey {
    pub correlation_id: String,
    pub batch_name: String,
}

impl BatchKey {
    pub fn new<C: Into<String>, B: Into<String>>(correlation_id: C, batch_name: B) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            batch_name: batch_name.into(),
        }
    }
}

impl Display for BatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.correlation_id, self.batch_name)
    }
}
