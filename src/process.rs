//! Process flow for the crew.

use serde::{Deserialize, Serialize};

/// How the crew sequences its tasks.
///
/// The pipeline is strictly sequential: each stage consumes the complete
/// output of the previous one, so this is the only supported process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    #[default]
    Sequential,
}
