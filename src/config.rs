use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on upward parent-pointer hops when resolving the receiver
    /// of a scoping-function literal (`let`, `also`, `run`, `apply`, `with`).
    ///
    /// This is a safety cutoff against pathological lambda nesting, not a
    /// semantically meaningful constant: raising it trades traversal cost for
    /// prediction depth. When the walk exhausts the budget the predictor
    /// gives up on that reference and returns it unchanged.
    pub max_parent_hops: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parent_hops: 25,
        }
    }
}
