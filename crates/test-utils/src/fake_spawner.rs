use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use runboard::exec::{DataCallback, ExitCallback, ProcessHandle, ProcessSpawner, SpawnRequest};

#[derive(Default)]
struct ProcessState {
    on_data: Option<DataCallback>,
    on_exit: Option<ExitCallback>,
    killed: bool,
    resizes: Vec<u16>,
}

/// Test-side remote control of one fake process.
///
/// `emit` and `exit` invoke the callbacks the launcher attached, exactly as
/// a real process would from its pump task.
#[derive(Clone)]
pub struct FakeProcessController {
    request: SpawnRequest,
    state: Arc<Mutex<ProcessState>>,
}

impl FakeProcessController {
    pub fn request(&self) -> &SpawnRequest {
        &self.request
    }

    /// Deliver one output chunk. Dropped when no data listener is attached.
    pub fn emit(&self, text: &str) {
        let callback = lock(&self.state).on_data.take();
        if let Some(mut callback) = callback {
            callback(text.to_string());
            lock(&self.state).on_data = Some(callback);
        }
    }

    /// Deliver the exit code. Works even after `kill`, to simulate a late
    /// exit racing the stop.
    pub fn exit(&self, code: i32) {
        let callback = lock(&self.state).on_exit.take();
        if let Some(callback) = callback {
            callback(code);
        }
    }

    pub fn was_killed(&self) -> bool {
        lock(&self.state).killed
    }

    pub fn resizes(&self) -> Vec<u16> {
        lock(&self.state).resizes.clone()
    }

    pub fn has_exit_listener(&self) -> bool {
        lock(&self.state).on_exit.is_some()
    }
}

struct FakeProcess {
    live_output: bool,
    state: Arc<Mutex<ProcessState>>,
}

impl ProcessHandle for FakeProcess {
    fn on_data(&mut self, callback: DataCallback) -> bool {
        if self.live_output {
            lock(&self.state).on_data = Some(callback);
        }
        self.live_output
    }

    fn on_exit(&mut self, callback: ExitCallback) {
        lock(&self.state).on_exit = Some(callback);
    }

    fn resize(&mut self, cols: u16) {
        lock(&self.state).resizes.push(cols);
    }

    fn kill(&mut self) {
        lock(&self.state).killed = true;
    }
}

#[derive(Default)]
struct SpawnerState {
    spawned: Vec<FakeProcessController>,
    fail_next: Option<String>,
    no_live_output: bool,
}

/// A spawner that never starts real processes. It records every request
/// and hands out [`FakeProcessController`]s to drive them.
#[derive(Clone, Default)]
pub struct FakeSpawner {
    inner: Arc<Mutex<SpawnerState>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes whose `on_data` reports "no live output".
    pub fn without_live_output() -> Self {
        let spawner = Self::default();
        lock(&spawner.inner).no_live_output = true;
        spawner
    }

    /// Make the next spawn fail with `message`.
    pub fn fail_next(&self, message: &str) {
        lock(&self.inner).fail_next = Some(message.to_string());
    }

    pub fn spawned(&self) -> Vec<FakeProcessController> {
        lock(&self.inner).spawned.clone()
    }

    pub fn spawn_count(&self) -> usize {
        lock(&self.inner).spawned.len()
    }

    pub fn last(&self) -> Option<FakeProcessController> {
        lock(&self.inner).spawned.last().cloned()
    }

    pub fn requests(&self) -> Vec<SpawnRequest> {
        lock(&self.inner)
            .spawned
            .iter()
            .map(|c| c.request.clone())
            .collect()
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(&self, request: SpawnRequest) -> anyhow::Result<Box<dyn ProcessHandle>> {
        let mut inner = lock(&self.inner);
        if let Some(message) = inner.fail_next.take() {
            return Err(anyhow!("{message}"));
        }

        let state = Arc::new(Mutex::new(ProcessState::default()));
        inner.spawned.push(FakeProcessController {
            request,
            state: Arc::clone(&state),
        });

        Ok(Box::new(FakeProcess {
            live_output: !inner.no_live_output,
            state,
        }))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
