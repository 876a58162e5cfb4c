//! Acquisition of phase-shift sets on a worker thread.
//!
//! The worker owns the camera and the actuator. It reports every transition
//! through [`AcquisitionEvent`]s and polls a stop channel while settling and
//! between frames.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::interferometry::acquisition::types::{
    AcquisitionConfig, AcquisitionEvent, AcquisitionState, Camera, PhaseStepper, progress,
};
use crate::interferometry::common::{AnalysisError, Result};
use crate::interferometry::frames::{FRAMES_PER_SET, PhaseShiftSet};

/// Waits `wait`, returning early with `true` if a stop arrives.
fn stop_during(stop: &Receiver<()>, wait: Duration) -> bool {
    match stop.recv_timeout(wait) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(wait);
            false
        }
    }
}

fn stop_pending(stop: &Receiver<()>) -> bool {
    matches!(stop.try_recv(), Ok(()))
}

pub struct Acquisition<C: Camera, P: PhaseStepper> {
    camera: C,
    stepper: P,
    config: AcquisitionConfig,
    state: AcquisitionState,
}

impl<C: Camera, P: PhaseStepper> Acquisition<C, P> {
    pub fn new(camera: C, stepper: P, config: AcquisitionConfig) -> Self {
        Self {
            camera,
            stepper,
            config,
            state: AcquisitionState::Idle,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Runs the acquisition on the calling thread.
    ///
    /// Returns the completed sets, or `AcquisitionStopped` if a stop signal
    /// arrived first. Sets completed before the stop are still reported
    /// through `SetReady` events.
    pub fn run(&mut self, stop: &Receiver<()>, events: &Sender<AcquisitionEvent>) -> Result<Vec<PhaseShiftSet>> {
        let _span = info_span!("acquisition", sets = self.config.sets).entered();
        if self.config.sets == 0 {
            return Err(AnalysisError::InsufficientFrames(0));
        }

        let result = self.camera.start().and_then(|()| self.acquire_sets(stop, events));
        let camera_stopped = self.camera.stop();

        let result = result.and_then(|sets| camera_stopped.map(|()| sets));
        match &result {
            Ok(sets) => {
                self.state = AcquisitionState::Ready;
                info!(sets = sets.len(), "Acquisition finished");
                let _ = events.send(AcquisitionEvent::Finished { sets: sets.len() });
            }
            Err(AnalysisError::AcquisitionStopped) => {}
            Err(e) => {
                self.state = AcquisitionState::Failed;
                warn!(error = %e, "Acquisition failed");
                let _ = events.send(AcquisitionEvent::Failed(e.to_string()));
            }
        }
        result
    }

    fn acquire_sets(&mut self, stop: &Receiver<()>, events: &Sender<AcquisitionEvent>) -> Result<Vec<PhaseShiftSet>> {
        let sets = self.config.sets;
        let _ = events.send(AcquisitionEvent::Started { sets });
        let mut completed = Vec::with_capacity(sets);

        for set in 0..sets {
            let mut frames = Vec::with_capacity(FRAMES_PER_SET);
            for (frame, &voltage) in self.config.voltages.iter().enumerate() {
                self.state = AcquisitionState::Acquiring { set, frame };
                if stop_pending(stop) {
                    return self.stopped(completed.len(), events);
                }
                self.stepper.move_to(voltage)?;
                if stop_during(stop, self.config.settle_time) {
                    return self.stopped(completed.len(), events);
                }
                frames.push(self.camera.capture()?);

                let progress = progress(set, frame, sets);
                debug!(set, frame, voltage, progress, "Frame captured");
                let _ = events.send(AcquisitionEvent::FrameCaptured { set, frame, progress });
            }

            let frames = PhaseShiftSet::new(frames)?;
            let _ = events.send(AcquisitionEvent::SetReady {
                set,
                frames: frames.clone(),
            });
            completed.push(frames);
        }
        Ok(completed)
    }

    fn stopped(&mut self, completed_sets: usize, events: &Sender<AcquisitionEvent>) -> Result<Vec<PhaseShiftSet>> {
        self.state = AcquisitionState::Stopped;
        info!(completed_sets, "Acquisition stopped");
        let _ = events.send(AcquisitionEvent::Stopped { completed_sets });
        Err(AnalysisError::AcquisitionStopped)
    }
}

impl<C: Camera + 'static, P: PhaseStepper + 'static> Acquisition<C, P> {
    /// Moves the acquisition onto a worker thread.
    pub fn spawn(mut self) -> AcquisitionHandle {
        let (stop_tx, stop_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = thread::spawn(move || self.run(&stop_rx, &event_tx));
        AcquisitionHandle {
            events: event_rx,
            stop: stop_tx,
            worker,
        }
    }
}

pub struct AcquisitionHandle {
    events: Receiver<AcquisitionEvent>,
    stop: Sender<()>,
    worker: JoinHandle<Result<Vec<PhaseShiftSet>>>,
}

impl AcquisitionHandle {
    pub fn events(&self) -> &Receiver<AcquisitionEvent> {
        &self.events
    }

    /// Next event without blocking, `None` when nothing is pending.
    pub fn poll_event(&self) -> Option<AcquisitionEvent> {
        self.events.try_recv().ok()
    }

    /// Asks the worker to stop at the next frame boundary or settle wait.
    pub fn stop(&self) {
        let _ = self.stop.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> Result<Vec<PhaseShiftSet>> {
        self.worker
            .join()
            .map_err(|_| AnalysisError::DeviceError("acquisition worker panicked".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::interferometry::common::{Grid, IntensityImage};

    struct MockCamera {
        captured: usize,
        fail_at: Option<usize>,
    }

    impl Camera for MockCamera {
        fn capture(&mut self) -> Result<IntensityImage> {
            if self.fail_at == Some(self.captured) {
                return Err(AnalysisError::DeviceError("sensor timeout".to_string()));
            }
            self.captured += 1;
            Grid::filled(4, 3, self.captured as f64)
        }
    }

    #[derive(Clone, Default)]
    struct MockStepper {
        voltages: Arc<Mutex<Vec<f64>>>,
    }

    impl PhaseStepper for MockStepper {
        fn move_to(&mut self, voltage: f64) -> Result<()> {
            self.voltages.lock().unwrap().push(voltage);
            Ok(())
        }
    }

    fn acquisition(sets: usize, settle_time: Duration, fail_at: Option<usize>) -> (Acquisition<MockCamera, MockStepper>, MockStepper) {
        let stepper = MockStepper::default();
        let config = AcquisitionConfig {
            settle_time,
            sets,
            ..AcquisitionConfig::default()
        };
        let camera = MockCamera { captured: 0, fail_at };
        (Acquisition::new(camera, stepper.clone(), config), stepper)
    }

    #[test]
    fn acquires_requested_sets_in_order() {
        let (mut acquisition, stepper) = acquisition(2, Duration::ZERO, None);
        let (_stop_tx, stop_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        assert_eq!(acquisition.state(), AcquisitionState::Idle);

        let sets = acquisition.run(&stop_rx, &event_tx).unwrap();
        assert_eq!(acquisition.state(), AcquisitionState::Ready);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].frames()[0][(0, 0)], 6.0);
        assert_eq!(stepper.voltages.lock().unwrap().len(), 10);
        assert_eq!(stepper.voltages.lock().unwrap()[..5], crate::interferometry::acquisition::DEFAULT_VOLTAGES);

        let events: Vec<_> = event_rx.try_iter().collect();
        assert!(matches!(events.first(), Some(AcquisitionEvent::Started { sets: 2 })));
        assert!(matches!(events.last(), Some(AcquisitionEvent::Finished { sets: 2 })));
        let progress: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                AcquisitionEvent::FrameCaptured { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn stop_signal_ends_acquisition() {
        let (mut acquisition, _) = acquisition(3, Duration::ZERO, None);
        let (stop_tx, stop_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        stop_tx.send(()).unwrap();

        assert!(matches!(
            acquisition.run(&stop_rx, &event_tx),
            Err(AnalysisError::AcquisitionStopped)
        ));
        assert_eq!(acquisition.state(), AcquisitionState::Stopped);
        assert!(event_rx
            .try_iter()
            .any(|event| matches!(event, AcquisitionEvent::Stopped { completed_sets: 0 })));
    }

    #[test]
    fn device_error_fails_acquisition() {
        let (mut acquisition, _) = acquisition(1, Duration::ZERO, Some(2));
        let (_stop_tx, stop_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        assert!(matches!(
            acquisition.run(&stop_rx, &event_tx),
            Err(AnalysisError::DeviceError(_))
        ));
        assert_eq!(acquisition.state(), AcquisitionState::Failed);
        assert!(matches!(event_rx.try_iter().last(), Some(AcquisitionEvent::Failed(_))));
    }

    #[test]
    fn zero_sets_is_rejected() {
        let (mut acquisition, _) = acquisition(0, Duration::ZERO, None);
        let (_stop_tx, stop_rx) = mpsc::channel();
        let (event_tx, _event_rx) = mpsc::channel();
        assert!(matches!(
            acquisition.run(&stop_rx, &event_tx),
            Err(AnalysisError::InsufficientFrames(0))
        ));
    }

    #[test]
    fn spawned_worker_can_be_stopped() {
        let (acquisition, _) = acquisition(50, Duration::from_millis(20), None);
        let handle = acquisition.spawn();
        match handle.events().recv_timeout(Duration::from_secs(5)) {
            Ok(AcquisitionEvent::Started { sets: 50 }) => {}
            other => panic!("unexpected first event: {other:?}"),
        }
        handle.stop();
        assert!(matches!(handle.join(), Err(AnalysisError::AcquisitionStopped)));
    }

    #[test]
    fn spawned_worker_delivers_sets() {
        let (acquisition, _) = acquisition(1, Duration::ZERO, None);
        let handle = acquisition.spawn();
        let sets = handle.join().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].shape(), (4, 3));
    }
}
