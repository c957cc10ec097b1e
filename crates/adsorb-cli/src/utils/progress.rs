use adsorbent_search::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Draws each relaxation stage as a step bar on stderr, with the current energy and
/// force residual in the message.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    stage: Arc<Mutex<&'static str>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(Self::spinner_style());
        pb.finish_and_clear();
        Self {
            pb: Arc::new(Mutex::new(pb)),
            stage: Arc::new(Mutex::new("")),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        let stage = self.stage.clone();

        Box::new(move |progress: Progress| {
            let (Ok(pb), Ok(mut stage)) = (pb.lock(), stage.lock()) else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    *stage = name;
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name);
                }
                Progress::RelaxationStart { max_steps, fmax } => {
                    pb.disable_steady_tick();
                    pb.set_length(max_steps);
                    pb.set_position(0);
                    pb.set_style(Self::bar_style());
                    pb.set_message(format!("{} (fmax {})", *stage, fmax));
                }
                Progress::OptimizerStep {
                    step,
                    energy,
                    max_force,
                } => {
                    pb.set_position(step);
                    pb.set_message(format!(
                        "{}: E = {:.4} eV, |F|max = {:.4} eV/Å",
                        *stage, energy, max_force
                    ));
                }
                Progress::RelaxationFinish { converged, steps } => {
                    let outcome = if converged { "converged" } else { "step limit" };
                    pb.set_position(steps);
                    pb.set_message(format!("{}: {} after {} steps", *stage, outcome, steps));
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    pb.finish();
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("[{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("Failed to create bar style template")
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden() -> CliProgressHandler {
        CliProgressHandler::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn handler_starts_finished_and_empty() {
        let handler = hidden();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn optimizer_steps_move_the_bar() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Adsorbent Relaxation",
        });
        callback(Progress::RelaxationStart {
            max_steps: 100,
            fmax: 0.01,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(100));
            assert_eq!(pb.position(), 0);
            assert!(pb.message().starts_with("Adsorbent Relaxation"));
        }

        callback(Progress::OptimizerStep {
            step: 7,
            energy: -1.5,
            max_force: 0.2,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 7);
            assert!(pb.message().contains("-1.5000 eV"));
        }

        callback(Progress::RelaxationFinish {
            converged: true,
            steps: 8,
        });
        callback(Progress::PhaseFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 8);
        assert_eq!(
            pb.message(),
            "Adsorbent Relaxation: converged after 8 steps"
        );
    }

    #[test]
    fn callback_can_be_used_from_another_thread() {
        let handler = hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Adsorbate Relaxation",
            });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert!(handler.pb.lock().unwrap().is_finished());
    }
}
