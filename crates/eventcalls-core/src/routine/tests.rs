use super::*;
use crate::event::DataEvent;
use crossbeam::channel::{self, Receiver, Sender};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, OnceLock};
use std::time::{Duration, Instant};

/// Endpoint fed from a test script; blocks after the script until closed
struct ScriptedEndpoint {
    script: Receiver<EndpointResult<ReadOutcome>>,
    feeder: Sender<EndpointResult<ReadOutcome>>,
    close_tx: Sender<()>,
    close_rx: Receiver<()>,
    open_error: Mutex<Option<EndpointError>>,
    opens: AtomicUsize,
    closed: std::sync::atomic::AtomicBool,
    written: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedEndpoint {
    fn new(items: Vec<EndpointResult<ReadOutcome>>) -> Self {
        let (feeder, script) = channel::unbounded();
        for item in items {
            feeder.send(item).unwrap();
        }
        let (close_tx, close_rx) = channel::bounded(1);
        Self {
            script,
            feeder,
            close_tx,
            close_rx,
            open_error: Mutex::new(None),
            opens: AtomicUsize::new(0),
            closed: std::sync::atomic::AtomicBool::new(false),
            written: Mutex::new(Vec::new()),
        }
    }

    fn chunks(chunks: &[&[u8]]) -> Self {
        let mut items: Vec<_> = chunks
            .iter()
            .map(|c| Ok(ReadOutcome::Data(DataEvent::new(c.to_vec()))))
            .collect();
        items.push(Ok(ReadOutcome::EndOfStream));
        Self::new(items)
    }

    fn blocking() -> Self {
        Self::new(Vec::new())
    }

    fn failing_open(err: EndpointError) -> Self {
        let endpoint = Self::new(Vec::new());
        *endpoint.open_error.lock() = Some(err);
        endpoint
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Endpoint for ScriptedEndpoint {
    fn open(&self) -> EndpointResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.open_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn read_chunk(&self) -> EndpointResult<ReadOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(ReadOutcome::EndOfStream);
        }
        channel::select! {
            recv(self.script) -> item => item.unwrap_or(Ok(ReadOutcome::EndOfStream)),
            recv(self.close_rx) -> _ => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn write(&self, data: &[u8]) -> EndpointResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EndpointError::Closed);
        }
        self.written.lock().push(data.to_vec());
        Ok(())
    }

    fn close(&self) -> EndpointResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.close_tx.try_send(());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Init,
    Data(Vec<u8>),
    Final(Option<String>),
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn events(&self) -> Vec<Seen> {
        self.events.lock().clone()
    }

    fn finals(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Seen::Final(_)))
            .count()
    }
}

impl Handler for Recorder {
    fn on_initialized(&mut self, _event: InitEvent) {
        self.events.lock().push(Seen::Init);
    }

    fn on_data(&mut self, event: DataEvent) {
        self.events.lock().push(Seen::Data(event.into_bytes()));
    }

    fn on_finalized(&mut self, event: FinalEvent) {
        self.events
            .lock()
            .push(Seen::Final(event.cause().map(|c| c.to_string())));
    }
}

fn wait_for_state<E: Endpoint + 'static, H: Handler + 'static>(
    routine: &Routine<E, H>,
    state: RoutineState,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while routine.state() != state {
        assert!(Instant::now() < deadline, "timed out waiting for {}", state);
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_chunks_then_eof_sequence() {
    let recorder = Recorder::default();
    let routine = Routine::new(ScriptedEndpoint::chunks(&[b"ab", b"cd"]), recorder.clone());
    assert_eq!(routine.state(), RoutineState::Idle);

    routine.start().unwrap();
    wait_for_state(&routine, RoutineState::Stopped);
    routine.stop();

    assert_eq!(
        recorder.events(),
        vec![
            Seen::Init,
            Seen::Data(b"ab".to_vec()),
            Seen::Data(b"cd".to_vec()),
            Seen::Final(None),
        ]
    );
}

#[test]
fn test_open_failure_only_finalizes() {
    let recorder = Recorder::default();
    let routine = Routine::new(
        ScriptedEndpoint::failing_open(EndpointError::ConnectFailed("refused".into())),
        recorder.clone(),
    );

    routine.start().unwrap();

    assert_eq!(routine.state(), RoutineState::Stopped);
    assert!(!routine.is_running());
    assert_eq!(
        recorder.events(),
        vec![Seen::Final(Some("Connect failed: refused".to_string()))]
    );
}

#[test]
fn test_start_twice_opens_once() {
    let routine = Routine::new(ScriptedEndpoint::blocking(), Recorder::default());
    routine.start().unwrap();
    routine.start().unwrap();

    assert!(routine.is_running());
    assert_eq!(routine.endpoint().opens(), 1);
    routine.stop();
}

#[test]
fn test_concurrent_start_single_winner() {
    let recorder = Recorder::default();
    let routine = Arc::new(Routine::new(ScriptedEndpoint::blocking(), recorder.clone()));
    let barrier = Arc::new(Barrier::new(4));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let routine = Arc::clone(&routine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                routine.start().unwrap();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(routine.endpoint().opens(), 1);
    assert_eq!(recorder.events(), vec![Seen::Init]);
    routine.stop();
    assert_eq!(recorder.finals(), 1);
}

#[test]
fn test_stop_unblocks_reader_and_finalizes_before_return() {
    let recorder = Recorder::default();
    let routine = Routine::new(ScriptedEndpoint::blocking(), recorder.clone());
    routine.start().unwrap();
    assert!(routine.is_running());

    routine.stop();

    assert_eq!(routine.state(), RoutineState::Stopped);
    assert_eq!(recorder.events(), vec![Seen::Init, Seen::Final(None)]);
}

#[test]
fn test_stop_after_self_termination_is_noop() {
    let recorder = Recorder::default();
    let routine = Routine::new(ScriptedEndpoint::chunks(&[b"x"]), recorder.clone());
    routine.start().unwrap();
    wait_for_state(&routine, RoutineState::Stopped);

    routine.stop();
    routine.stop();

    assert_eq!(recorder.finals(), 1);
}

#[test]
fn test_stop_on_idle_is_noop() {
    let recorder = Recorder::default();
    let routine = Routine::new(ScriptedEndpoint::blocking(), recorder.clone());
    routine.stop();
    assert_eq!(routine.state(), RoutineState::Idle);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_not_restartable() {
    let routine = Routine::new(ScriptedEndpoint::blocking(), Recorder::default());
    routine.start().unwrap();
    routine.stop();
    routine.start().unwrap();

    assert_eq!(routine.state(), RoutineState::Stopped);
    assert_eq!(routine.endpoint().opens(), 1);
}

#[test]
fn test_read_error_reaches_finalize() {
    let recorder = Recorder::default();
    let endpoint = ScriptedEndpoint::new(vec![
        Ok(ReadOutcome::Data(DataEvent::new(b"a".to_vec()))),
        Err(EndpointError::Other("line noise".into())),
    ]);
    let routine = Routine::new(endpoint, recorder.clone());
    routine.start().unwrap();
    wait_for_state(&routine, RoutineState::Stopped);
    routine.stop();

    assert_eq!(
        recorder.events(),
        vec![
            Seen::Init,
            Seen::Data(b"a".to_vec()),
            Seen::Final(Some("Error: line noise".to_string())),
        ]
    );
}

#[test]
fn test_write_after_stop_surfaces_endpoint_error() {
    let recorder = Recorder::default();
    let routine = Routine::new(ScriptedEndpoint::blocking(), recorder.clone());
    routine.start().unwrap();
    routine.write(b"before").unwrap();
    routine.stop();

    let err = routine.write(b"after").unwrap_err();
    assert!(matches!(err, EndpointError::Closed));
    assert_eq!(recorder.events(), vec![Seen::Init, Seen::Final(None)]);
    assert_eq!(*routine.endpoint().written.lock(), vec![b"before".to_vec()]);
}

#[test]
fn test_write_before_start_is_passed_through() {
    let routine = Routine::new(ScriptedEndpoint::blocking(), Recorder::default());
    routine.write(b"early").unwrap();
    assert_eq!(*routine.endpoint().written.lock(), vec![b"early".to_vec()]);
}

#[test]
fn test_stop_from_on_data_does_not_deadlock() {
    let slot: Arc<OnceLock<RoutineHandle<ScriptedEndpoint>>> = Arc::new(OnceLock::new());
    let finals = Arc::new(AtomicUsize::new(0));
    let handler_slot = Arc::clone(&slot);
    let handler_finals = Arc::clone(&finals);

    let handler = crate::CallbackHandler::new()
        .with_data(move |_| {
            if let Some(handle) = handler_slot.get() {
                handle.stop();
            }
        })
        .with_finalized(move |_| {
            handler_finals.fetch_add(1, Ordering::SeqCst);
        });

    let endpoint = ScriptedEndpoint::blocking();
    let feeder = endpoint.feeder.clone();
    let routine = Routine::new(endpoint, handler);
    slot.set(routine.handle()).unwrap();

    routine.start().unwrap();
    feeder
        .send(Ok(ReadOutcome::Data(DataEvent::new(b"bye".to_vec()))))
        .unwrap();

    wait_for_state(&routine, RoutineState::Stopped);
    routine.stop();
    assert_eq!(finals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_from_on_initialized_does_not_deadlock() {
    let slot: Arc<OnceLock<RoutineHandle<ScriptedEndpoint>>> = Arc::new(OnceLock::new());
    let handler_slot = Arc::clone(&slot);
    let recorder = Recorder::default();
    let inner = recorder.clone();

    let handler = crate::CallbackHandler::new()
        .with_initialized(move |_| {
            if let Some(handle) = handler_slot.get() {
                handle.stop();
            }
        })
        .with_finalized(move |evt| {
            inner
                .events
                .lock()
                .push(Seen::Final(evt.cause().map(|c| c.to_string())));
        });

    let routine = Routine::new(ScriptedEndpoint::blocking(), handler);
    slot.set(routine.handle()).unwrap();
    routine.start().unwrap();

    assert_eq!(routine.state(), RoutineState::Stopped);
    assert_eq!(recorder.events(), vec![Seen::Final(None)]);
}

#[test]
fn test_concurrent_writes_do_not_trigger_callbacks() {
    let recorder = Recorder::default();
    let routine = Arc::new(Routine::new(ScriptedEndpoint::blocking(), recorder.clone()));
    routine.start().unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let writers: Vec<_> = (0..2)
        .map(|_| {
            let handle = routine.handle();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.write(b"x")
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap().unwrap();
    }

    assert_eq!(*routine.endpoint().written.lock(), vec![b"x".to_vec(), b"x".to_vec()]);
    assert_eq!(recorder.events(), vec![Seen::Init]);
    routine.stop();
}

#[test]
fn test_panicking_handler_is_finalized() {
    let finals = Arc::new(Mutex::new(Vec::new()));
    let inner = Arc::clone(&finals);
    let handler = crate::CallbackHandler::new()
        .with_data(|_| panic!("bad chunk"))
        .with_finalized(move |evt| inner.lock().push(evt.into_cause()));

    let routine = Routine::new(ScriptedEndpoint::chunks(&[b"boom"]), handler);
    routine.start().unwrap();
    wait_for_state(&routine, RoutineState::Stopped);
    routine.stop();

    let finals = finals.lock();
    assert_eq!(finals.len(), 1);
    assert!(matches!(
        &finals[0],
        Some(EndpointError::ReaderPanicked(msg)) if msg == "bad chunk"
    ));
}

#[test]
fn test_panicking_on_initialized_is_finalized() {
    let finals = Arc::new(Mutex::new(Vec::new()));
    let inner = Arc::clone(&finals);
    let handler = crate::CallbackHandler::new()
        .with_initialized(|_| panic!("init boom"))
        .with_finalized(move |evt| inner.lock().push(evt.into_cause()));

    let routine = Routine::new(ScriptedEndpoint::blocking(), handler);
    routine.start().unwrap();

    assert_eq!(routine.state(), RoutineState::Stopped);
    assert!(routine.endpoint().closed.load(Ordering::SeqCst));

    let (done_tx, done_rx) = channel::bounded(1);
    let handle = routine.handle();
    thread::spawn(move || {
        handle.stop();
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(3)).is_ok());

    let finals = finals.lock();
    assert_eq!(finals.len(), 1);
    assert!(matches!(
        &finals[0],
        Some(EndpointError::ReaderPanicked(msg)) if msg == "init boom"
    ));
}

#[test]
fn test_read_failure_racing_stop_finalizes_once() {
    for _ in 0..50 {
        let recorder = Recorder::default();
        let endpoint = ScriptedEndpoint::blocking();
        let feeder = endpoint.feeder.clone();
        let routine = Routine::new(endpoint, recorder.clone());
        routine.start().unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let failing = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                feeder
                    .send(Err(EndpointError::Other("link dropped".into())))
                    .unwrap();
            })
        };
        let stopping = {
            let barrier = Arc::clone(&barrier);
            let handle = routine.handle();
            thread::spawn(move || {
                barrier.wait();
                handle.stop();
            })
        };
        failing.join().unwrap();
        stopping.join().unwrap();
        routine.stop();

        assert_eq!(recorder.finals(), 1);
        assert_eq!(routine.state(), RoutineState::Stopped);
    }
}

#[test]
fn test_concurrent_stops_wait_for_reader_exit() {
    let handler = crate::CallbackHandler::new()
        .with_finalized(|_| thread::sleep(Duration::from_millis(20)));
    let routine = Arc::new(Routine::new(ScriptedEndpoint::blocking(), handler));
    routine.start().unwrap();

    let barrier = Arc::new(Barrier::new(3));
    let stoppers: Vec<_> = (0..3)
        .map(|_| {
            let routine = Arc::clone(&routine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                routine.handle().stop();
                // The reader's clone of the handler is gone once it has exited
                Arc::strong_count(&routine.handler)
            })
        })
        .collect();

    for stopper in stoppers {
        assert_eq!(stopper.join().unwrap(), 1);
    }
    assert_eq!(routine.state(), RoutineState::Stopped);
}

#[test]
fn test_drop_stops_running_routine() {
    let recorder = Recorder::default();
    {
        let routine = Routine::new(ScriptedEndpoint::blocking(), recorder.clone());
        routine.start().unwrap();
    }
    assert_eq!(recorder.events(), vec![Seen::Init, Seen::Final(None)]);
}

#[test]
fn test_spawn_starts_immediately() {
    let routine = Routine::spawn(ScriptedEndpoint::blocking(), Recorder::default()).unwrap();
    assert!(routine.is_running());
    assert_eq!(routine.handle().state(), RoutineState::Running);
    routine.stop();
    assert!(!routine.handle().is_running());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_chunks_delivered_in_order(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..16), 0..24)
    ) {
        let refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
        let recorder = Recorder::default();
        let routine = Routine::new(ScriptedEndpoint::chunks(&refs), recorder.clone());
        routine.start().unwrap();
        wait_for_state(&routine, RoutineState::Stopped);
        routine.stop();

        let mut expected = vec![Seen::Init];
        expected.extend(chunks.iter().cloned().map(Seen::Data));
        expected.push(Seen::Final(None));
        prop_assert_eq!(recorder.events(), expected);
    }
}
