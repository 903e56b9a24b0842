use std::fmt;

use fnv::FnvHashSet;

/// Non-fatal conditions observed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A filter removed every interaction. The run continues with the empty result.
    DegenerateResult { stage: String, iterations: usize },
    /// A matrix had to be converted between CSR and CSC storage.
    StorageConversion { operation: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::DegenerateResult { stage, iterations } =>
                write!(f, "{}: matrix is empty after {} iteration(s)", stage, iterations),
            Warning::StorageConversion { operation } =>
                write!(f, "{}: converted matrix storage, this needs a full copy", operation),
        }
    }
}

/// State owned by a single pipeline run. Holds the warnings raised so far and remembers which
/// one-time warnings were already logged.
#[derive(Debug, Default)]
pub struct RunContext {
    warnings: Vec<Warning>,
    warned_once: FnvHashSet<String>,
}

impl RunContext {

    pub fn new() -> Self {
        RunContext::default()
    }

    pub fn degenerate(&mut self, stage: &str, iterations: usize) {
        let warning = Warning::DegenerateResult { stage: stage.to_string(), iterations };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Storage conversions are expected inside the k-core loop, so only the first one per
    /// operation is reported.
    pub fn storage_conversion(&mut self, operation: &str) {
        if self.warned_once.insert(operation.to_string()) {
            let warning = Warning::StorageConversion { operation: operation.to_string() };
            debug!("{}", warning);
            self.warnings.push(warning);
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_degenerate_result(&self) -> bool {
        self.warnings.iter().any(|warning| match warning {
            Warning::DegenerateResult { .. } => true,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {

    use crate::context::{RunContext, Warning};

    #[test]
    fn storage_conversion_reported_once() {
        let mut ctx = RunContext::new();

        ctx.storage_conversion("k-cores");
        ctx.storage_conversion("k-cores");
        ctx.storage_conversion("feature pruning");

        assert_eq!(ctx.warnings().len(), 2);
        assert!(!ctx.has_degenerate_result());
    }

    #[test]
    fn degenerate_results_accumulate() {
        let mut ctx = RunContext::new();

        ctx.degenerate("k-cores", 2);
        ctx.degenerate("k-cores", 3);

        assert!(ctx.has_degenerate_result());
        assert_eq!(
            ctx.warnings()[0],
            Warning::DegenerateResult { stage: "k-cores".to_string(), iterations: 2 }
        );
        assert_eq!(ctx.warnings().len(), 2);
    }
}
