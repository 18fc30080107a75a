use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use memdyn::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders phases as spinners and the integration loop as a step bar whose
/// message tracks the latest energy and force norm.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        bar.disable_steady_tick();
        bar.finish_and_clear();

        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();

        Box::new(move |progress: Progress| {
            let Ok(bar) = bar.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(Self::spinner_style());
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    bar.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    bar.disable_steady_tick();
                    bar.finish_with_message("✓ Done");
                }
                Progress::TaskStart { total_steps } => {
                    bar.disable_steady_tick();
                    bar.reset();
                    bar.set_length(total_steps);
                    bar.set_position(0);
                    bar.set_style(Self::step_style());
                }
                Progress::TaskIncrement => {
                    bar.inc(1);
                }
                Progress::TaskFinish => {
                    // Runs usually stop before the step limit; show where.
                    bar.set_length(bar.position());
                    bar.finish();
                }
                Progress::Status {
                    step,
                    energy,
                    force_norm,
                    ..
                } => {
                    bar.set_message(Self::status_message(step, energy, force_norm));
                }
                Progress::Message(msg) => {
                    if !bar.is_finished() {
                        bar.println(format!("  {}", msg));
                    } else {
                        bar.set_message(msg);
                    }
                }
            }
        })
    }

    fn status_message(step: u64, energy: f64, force_norm: f64) -> String {
        format!("step {} E={:.6e} |F|={:.3e}", step, energy, force_norm)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn step_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<40} [{bar:30.cyan/blue}] {pos}/{len} ({rate})")
            .expect("Failed to create step bar style template")
            .with_key(
                "rate",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1} steps/s", state.per_sec());
                },
            )
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

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let bar = handler.bar.lock().unwrap();
        assert_eq!(bar.length(), Some(0));
        assert!(bar.is_finished());
    }

    #[test]
    fn integration_events_drive_the_step_bar() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Integration",
        });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.message(), "Integration");
            assert!(!bar.is_finished());
        }

        callback(Progress::TaskStart { total_steps: 100 });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.length(), Some(100));
            assert_eq!(bar.position(), 0);
        }

        callback(Progress::Status {
            step: 0,
            time: 0.0,
            energy: 12.5,
            force_norm: 0.25,
        });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.position(), 2);
            assert_eq!(bar.message(), "step 0 E=1.250000e1 |F|=2.500e-1");
        }

        callback(Progress::TaskFinish);
        {
            let bar = handler.bar.lock().unwrap();
            assert!(bar.is_finished());
            assert_eq!(bar.length(), Some(2));
        }

        callback(Progress::PhaseFinish);
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.message(), "✓ Done");
        }
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Relaxation",
            });
            callback(Progress::Message("constraint multipliers updated".to_string()));
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "✓ Done");
    }
}
