//! Run configuration (§10.4): the settings a single engraving run needs,
//! independent of how they were supplied (CLI flags today; a config-file
//! layer is an external collaborator per §1, not implemented here).

use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub layout: LayoutConfig,
    pub max_recoverable_errors: Option<usize>,
    pub write_midi: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            max_recoverable_errors: Some(200),
            write_midi: false,
        }
    }
}
