use log::info;

/// Outcome of a batch job. Failures are recorded, never swallowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_updated(&mut self) {
        self.processed += 1;
        self.updated += 1;
    }

    pub fn record_skipped(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, key: &str, error: impl std::fmt::Display) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(format!("{}: {}", key, error));
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.processed += other.processed;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

/// Periodic progress logging for long-running loops
pub struct BatchProgress {
    job: &'static str,
    log_every: usize,
    last_logged: usize,
}

impl BatchProgress {
    pub fn new(job: &'static str, log_every: usize) -> Self {
        Self {
            job,
            log_every: log_every.max(1),
            last_logged: 0,
        }
    }

    pub fn observe(&mut self, report: &BatchReport) {
        if should_log(report.processed, self.last_logged, self.log_every) {
            self.last_logged = report.processed;
            info!(
                "  → {}: {} processed ({} updated, {} skipped, {} failed)",
                self.job, report.processed, report.updated, report.skipped, report.failed
            );
        }
    }

    pub fn finish(&self, report: &BatchReport) {
        info!(
            "{} complete: {} processed, {} updated, {} skipped, {} failed",
            self.job, report.processed, report.updated, report.skipped, report.failed
        );
    }
}

fn should_log(current: usize, last_logged: usize, log_every: usize) -> bool {
    current >= last_logged + log_every
}
