//! Slot discipline tests for `PresentationEngine` against a recording
//! backend.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use gsync_core::config::PresentationConfig;
use gsync_core::{Clock, Sleeper};
use gsync_pacing::{
    FrameContext, FrameLoop, FrameRateController, InputCommands, InputSource, SyncModes,
};
use gsync_renderer::{
    AcquiredImage, EngineError, EngineResult, PresentBackend, PresentationEngine, SlotState,
};
use gsync_rhi::vk;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Wait(usize),
    Reset(usize),
    Acquire { slot: usize, image: u32 },
    Record { slot: usize, image: u32 },
    Submit { slot: usize, image: u32 },
    Present { slot: usize, image: u32 },
    WaitIdle,
    Rebuild(bool),
    Destroy,
}

type Log = Rc<RefCell<Vec<Call>>>;

struct MockBackend {
    log: Log,
    ring: usize,
    rebuild_ring: Option<usize>,
    script: VecDeque<u32>,
    rng: StdRng,
    held: HashSet<u32>,
    wait_error: Option<vk::Result>,
    acquire_error: Option<vk::Result>,
    suboptimal: bool,
    timeouts: Vec<u64>,
}

impl MockBackend {
    fn new(log: &Log, ring: usize) -> Self {
        Self {
            log: log.clone(),
            ring,
            rebuild_ring: None,
            script: VecDeque::new(),
            rng: StdRng::seed_from_u64(0),
            held: HashSet::new(),
            wait_error: None,
            acquire_error: None,
            suboptimal: false,
            timeouts: Vec::new(),
        }
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl PresentBackend for MockBackend {
    fn ring_size(&self) -> usize {
        self.ring
    }

    fn wait_slot_fence(&mut self, slot: usize, timeout_ns: u64) -> EngineResult<()> {
        self.timeouts.push(timeout_ns);
        if let Some(result) = self.wait_error {
            return Err(EngineError::from_vk(result));
        }
        self.push(Call::Wait(slot));
        Ok(())
    }

    fn reset_slot_fence(&mut self, slot: usize) -> EngineResult<()> {
        self.push(Call::Reset(slot));
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> EngineResult<AcquiredImage> {
        if let Some(result) = self.acquire_error {
            return Err(EngineError::from_vk(result));
        }
        let image = match self.script.pop_front() {
            Some(image) => image,
            None => {
                let free: Vec<u32> = (0..self.ring as u32)
                    .filter(|i| !self.held.contains(i))
                    .collect();
                free[self.rng.gen_range(0..free.len())]
            }
        };
        self.held.insert(image);
        self.push(Call::Acquire { slot, image });
        Ok(AcquiredImage {
            index: image,
            suboptimal: self.suboptimal,
        })
    }

    fn record_frame(&mut self, slot: usize, image: u32, _position: f32) -> EngineResult<()> {
        self.push(Call::Record { slot, image });
        Ok(())
    }

    fn submit_frame(&mut self, slot: usize, image: u32) -> EngineResult<()> {
        self.push(Call::Submit { slot, image });
        Ok(())
    }

    fn present_image(&mut self, slot: usize, image: u32) -> EngineResult<bool> {
        self.held.remove(&image);
        self.push(Call::Present { slot, image });
        Ok(self.suboptimal)
    }

    fn wait_idle(&mut self) -> EngineResult<()> {
        self.push(Call::WaitIdle);
        Ok(())
    }

    fn rebuild(&mut self, vsync: bool) -> EngineResult<()> {
        if let Some(ring) = self.rebuild_ring {
            self.ring = ring;
        }
        self.push(Call::Rebuild(vsync));
        Ok(())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.push(Call::Destroy);
    }
}

#[derive(Default)]
struct RecordingSleeper {
    sleeps: Rc<RefCell<Vec<f64>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep_secs(&mut self, secs: f64) {
        self.sleeps.borrow_mut().push(secs);
    }
}

fn engine_with(backend: MockBackend) -> PresentationEngine<MockBackend, RecordingSleeper> {
    PresentationEngine::with_sleeper(
        backend,
        &PresentationConfig::default(),
        RecordingSleeper::default(),
    )
}

fn position_of(log: &[Call], wanted: Call) -> usize {
    log.iter()
        .position(|&call| call == wanted)
        .unwrap_or_else(|| panic!("{:?} not in log {:?}", wanted, log))
}

/// Replays a log and panics on any synchronization violation.
fn check_discipline(log: &[Call], ring: usize) {
    let mut unwaited_submit = vec![false; ring];
    let mut in_flight_image: Vec<Option<u32>> = vec![None; ring];
    let mut acquired = HashSet::new();

    for (i, &call) in log.iter().enumerate() {
        match call {
            Call::Wait(slot) => {
                assert!(
                    unwaited_submit[slot],
                    "call {}: slot {} waited without a submission since its last wait",
                    i, slot
                );
                unwaited_submit[slot] = false;
                in_flight_image[slot] = None;
            }
            Call::Acquire { image, .. } => {
                assert!(acquired.insert(image), "call {}: image {} acquired twice", i, image);
            }
            Call::Record { slot, image } => {
                assert!(!unwaited_submit[slot], "call {}: slot {} reused in flight", i, slot);
                for (other, owned) in in_flight_image.iter().enumerate() {
                    assert!(
                        other == slot || *owned != Some(image),
                        "call {}: image {} still in flight on slot {}",
                        i,
                        image,
                        other
                    );
                }
            }
            Call::Submit { slot, image } => {
                unwaited_submit[slot] = true;
                in_flight_image[slot] = Some(image);
            }
            Call::Present { image, .. } => {
                assert!(
                    acquired.remove(&image),
                    "call {}: image {} presented without a pending acquire",
                    i,
                    image
                );
            }
            Call::Reset(_) | Call::WaitIdle | Call::Rebuild(_) | Call::Destroy => {}
        }
    }
}

#[test]
fn random_frame_sequences_keep_slot_discipline() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let ring = rng.gen_range(2..=3);
        let frames = rng.gen_range(ring + 1..ring * 8);

        let log: Log = Rc::default();
        let mut backend = MockBackend::new(&log, ring);
        backend.rng = StdRng::seed_from_u64(seed ^ 0x5eed);
        let mut engine = engine_with(backend);

        for frame in 0..frames {
            engine.render_and_present(frame as f32 * 0.01).unwrap();
        }
        engine.shutdown().unwrap();

        let log = log.borrow();
        check_discipline(&log, ring);

        let presents = log
            .iter()
            .filter(|call| matches!(call, Call::Present { .. }))
            .count();
        assert_eq!(presents, frames, "seed {}", seed);
    }
}

#[test]
fn shutdown_waits_both_fences_before_destroying() {
    let log: Log = Rc::default();
    let mut engine = engine_with(MockBackend::new(&log, 3));

    engine.render_and_present(0.0).unwrap();
    engine.render_and_present(0.1).unwrap();
    engine.shutdown().unwrap();

    let log = log.borrow();
    let destroy = position_of(&log, Call::Destroy);
    assert!(position_of(&log, Call::Wait(0)) < destroy);
    assert!(position_of(&log, Call::Wait(1)) < destroy);
    assert!(!log.contains(&Call::Wait(2)));
    assert_eq!(destroy, log.len() - 1);
}

#[test]
fn drop_without_shutdown_still_drains() {
    let log: Log = Rc::default();
    {
        let mut engine = engine_with(MockBackend::new(&log, 2));
        engine.render_and_present(0.0).unwrap();
    }

    let log = log.borrow();
    assert!(position_of(&log, Call::Wait(0)) < position_of(&log, Call::Destroy));
}

#[test]
fn fresh_slots_are_not_waited() {
    let log: Log = Rc::default();
    let mut engine = engine_with(MockBackend::new(&log, 2));

    engine.render_and_present(0.0).unwrap();
    engine.render_and_present(0.0).unwrap();
    assert!(!log.borrow().iter().any(|call| matches!(call, Call::Wait(_))));

    engine.render_and_present(0.0).unwrap();
    assert_eq!(log.borrow().iter().filter(|c| **c == Call::Wait(0)).count(), 1);
}

#[test]
fn wait_resets_before_acquire() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.script = VecDeque::from([0, 1, 0]);
    let mut engine = engine_with(backend);

    for _ in 0..3 {
        engine.render_and_present(0.0).unwrap();
    }

    let log = log.borrow();
    let third_frame = &log[log.len() - 6..];
    assert_eq!(
        third_frame,
        &[
            Call::Wait(0),
            Call::Reset(0),
            Call::Acquire { slot: 0, image: 0 },
            Call::Record { slot: 0, image: 0 },
            Call::Submit { slot: 0, image: 0 },
            Call::Present { slot: 0, image: 0 },
        ]
    );
}

#[test]
fn image_owned_by_another_slot_is_waited() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 3);
    backend.script = VecDeque::from([0, 1, 0]);
    let mut engine = engine_with(backend);

    for _ in 0..3 {
        engine.render_and_present(0.0).unwrap();
    }

    let log = log.borrow();
    let acquire = position_of(&log, Call::Acquire { slot: 2, image: 0 });
    assert_eq!(log[acquire + 1], Call::Wait(0));
    assert_eq!(log[acquire + 2], Call::Record { slot: 2, image: 0 });
    assert_eq!(engine.slot_state(0), Some(SlotState::Idle));
    assert_eq!(engine.slot_state(2), Some(SlotState::Presented { image: 0 }));
}

#[test]
fn fence_timeout_comes_from_config() {
    let log: Log = Rc::default();
    let config = PresentationConfig {
        fence_timeout_ns: 1_000_000,
        ..PresentationConfig::default()
    };
    let mut engine = PresentationEngine::with_sleeper(
        MockBackend::new(&log, 2),
        &config,
        RecordingSleeper::default(),
    );

    for _ in 0..3 {
        engine.render_and_present(0.0).unwrap();
    }
    assert_eq!(engine.backend().unwrap().timeouts, vec![1_000_000]);
}

#[test]
fn wait_timeout_is_fatal() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.wait_error = Some(vk::Result::TIMEOUT);
    let mut engine = engine_with(backend);

    // Neither slot has been submitted yet, so nothing is waited.
    engine.render_and_present(0.0).unwrap();
    engine.render_and_present(0.0).unwrap();

    let error = engine.render_and_present(0.0).unwrap_err();
    assert!(matches!(error, EngineError::WaitTimeout));
    assert!(error.is_fatal());
    assert_eq!(engine.frames_rendered(), 2);
}

#[test]
fn lost_surface_stops_the_frame_before_recording() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.acquire_error = Some(vk::Result::ERROR_OUT_OF_DATE_KHR);
    let mut engine = engine_with(backend);

    let error = engine.render_and_present(0.0).unwrap_err();
    assert!(matches!(error, EngineError::SurfaceLost(_)));
    assert!(
        !log
            .borrow()
            .iter()
            .any(|call| matches!(call, Call::Record { .. } | Call::Submit { .. }))
    );
    assert_eq!(engine.slot_state(0), Some(SlotState::Idle));
}

fn ignore(_: &FrameContext, _: &FrameRateController, _: &SyncModes) {}

#[test]
fn device_lost_ends_the_frame_loop() {
    struct Quiet;
    impl InputSource for Quiet {
        fn poll(&mut self) -> InputCommands {
            InputCommands::default()
        }
    }

    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.wait_error = Some(vk::Result::ERROR_DEVICE_LOST);
    let mut engine = engine_with(backend);

    let mut t = 0.0;
    let clock = Clock::new(move || {
        t += 0.01;
        t
    });
    let mut frame_loop = FrameLoop::new(
        clock,
        FrameRateController::new(60.0),
        SyncModes::new(true, false, false),
        5.0,
    );

    let mut sleeper = RecordingSleeper::default();
    let result = frame_loop.run(&mut Quiet, &mut engine, &mut sleeper, &mut ignore);

    assert!(matches!(result, Err(EngineError::DeviceLost)));
    assert_eq!(frame_loop.frames(), 2);
}

#[test]
fn vsync_toggle_drains_then_rebuilds() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.rebuild_ring = Some(3);
    let mut engine = engine_with(backend);

    engine.render_and_present(0.0).unwrap();
    engine.render_and_present(0.0).unwrap();
    engine.set_vsync(false).unwrap();

    {
        let log = log.borrow();
        let rebuild = position_of(&log, Call::Rebuild(false));
        assert!(position_of(&log, Call::Wait(0)) < rebuild);
        assert!(position_of(&log, Call::Wait(1)) < rebuild);
        assert_eq!(log[rebuild - 1], Call::WaitIdle);
    }
    assert_eq!(engine.ring_size(), 3);

    let before = log.borrow().len();
    engine.render_and_present(0.0).unwrap();
    let log = log.borrow();
    assert_eq!(log[before], Call::Reset(0));
    assert!(!log[before..].iter().any(|call| matches!(call, Call::Wait(_))));
}

#[test]
fn throttle_sleeps_after_each_present() {
    let log: Log = Rc::default();
    let config = PresentationConfig {
        present_throttle_ms: Some(5),
        ..PresentationConfig::default()
    };
    let sleeper = RecordingSleeper::default();
    let sleeps = sleeper.sleeps.clone();
    let mut engine = PresentationEngine::with_sleeper(MockBackend::new(&log, 2), &config, sleeper);

    engine.render_and_present(0.0).unwrap();
    engine.render_and_present(0.0).unwrap();
    assert_eq!(*sleeps.borrow(), vec![0.005, 0.005]);
}

#[test]
fn no_throttle_by_default() {
    let log: Log = Rc::default();
    let sleeper = RecordingSleeper::default();
    let sleeps = sleeper.sleeps.clone();
    let mut engine =
        PresentationEngine::with_sleeper(MockBackend::new(&log, 2), &PresentationConfig::default(), sleeper);

    engine.render_and_present(0.0).unwrap();
    assert!(sleeps.borrow().is_empty());
}

#[test]
fn suboptimal_is_not_an_error() {
    let log: Log = Rc::default();
    let mut backend = MockBackend::new(&log, 2);
    backend.suboptimal = true;
    let mut engine = engine_with(backend);

    for _ in 0..4 {
        engine.render_and_present(0.0).unwrap();
    }
    assert_eq!(engine.frames_rendered(), 4);
}
