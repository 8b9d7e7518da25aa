use uuid::Uuid;

/// Produces unique run identifiers for reports and checkpoints.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_prefixed_and_unique() {
        let ids = IdGenerator::new();
        let a = ids.generate_run_id();
        let b = ids.generate_run_id();
        assert!(a.starts_with("run-"));
        assert_ne!(a, b);
    }
}
