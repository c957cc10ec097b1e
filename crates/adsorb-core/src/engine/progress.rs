/// Events emitted while an evaluation runs.
///
/// A phase is one relaxation stage. Inside it the optimizer reports one
/// [`Progress::OptimizerStep`] per BFGS iteration, so a consumer can render both a
/// step count and the current force residual.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart {
        name: &'static str,
    },
    PhaseFinish,

    RelaxationStart {
        max_steps: u64,
        fmax: f64,
    },
    OptimizerStep {
        step: u64,
        energy: f64,
        max_force: f64,
    },
    RelaxationFinish {
        converged: bool,
        steps: u64,
    },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Optional sink for [`Progress`] events. Reporting without a callback is a no-op.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::PhaseFinish);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        reporter.report(Progress::PhaseStart { name: "Relaxing" });
        reporter.report(Progress::RelaxationFinish {
            converged: true,
            steps: 3,
        });
        drop(reporter);
        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                Progress::PhaseStart { name: "Relaxing" },
                Progress::RelaxationFinish {
                    converged: true,
                    steps: 3
                },
            ]
        );
    }
}
