use crate::utils::id_generator::IdGenerator;

/// Finite default for the per-node visit bound. Generous enough for real
/// revision loops, small enough that a runaway cycle fails fast.
pub const DEFAULT_VISIT_LIMIT: u32 = 25;

/// Knobs for one executor instance.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum times any single node may run within one execution; the
    /// guard that makes cyclic graphs terminate.
    pub visit_limit: u32,
    /// Persist a checkpoint after every committed merge when a
    /// checkpointer is configured.
    pub autosave: bool,
    /// Run id for reports and checkpoints; generated when `None`.
    pub run_id: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            visit_limit: DEFAULT_VISIT_LIMIT,
            autosave: true,
            run_id: Some(IdGenerator::new().generate_run_id()),
        }
    }
}

impl RuntimeConfig {
    pub fn with_visit_limit(mut self, limit: u32) -> Self {
        self.visit_limit = limit.max(1);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}
