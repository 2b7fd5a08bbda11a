use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vxflow::dag::{ScheduledTask, TaskId, TaskKind};
use vxflow::exec::{RunnerError, RunnerErrorKind, RunnerFuture, TaskRunner};
use vxflow::fs::mock::MockFileSystem;
use vxflow::fs::FileSystem;
use vxflow::oracle::ArtifactLayout;

/// A fake runner that:
/// - records which tasks were run
/// - tracks how many invocations overlap
/// - checks every dependency artifact is already published
/// - publishes the task's artifact into a `MockFileSystem` on success
///
/// Failures and panics can be injected per task or per kind.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fs: MockFileSystem,
    layout: ArtifactLayout,
    delay: Duration,
    invocations: Mutex<Vec<TaskId>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    fail_ids: Mutex<BTreeSet<TaskId>>,
    fail_kinds: Mutex<BTreeSet<TaskKind>>,
    panic_ids: Mutex<BTreeSet<TaskId>>,
}

impl FakeRunner {
    pub fn new(fs: MockFileSystem, layout: ArtifactLayout) -> Self {
        Self::with_delay(fs, layout, Duration::from_millis(1))
    }

    pub fn with_delay(fs: MockFileSystem, layout: ArtifactLayout, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fs,
                layout,
                delay,
                invocations: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_ids: Mutex::new(BTreeSet::new()),
                fail_kinds: Mutex::new(BTreeSet::new()),
                panic_ids: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    pub fn fail_on(&self, id: TaskId) {
        self.inner.fail_ids.lock().unwrap().insert(id);
    }

    pub fn fail_kind(&self, kind: TaskKind) {
        self.inner.fail_kinds.lock().unwrap().insert(kind);
    }

    pub fn panic_on(&self, id: TaskId) {
        self.inner.panic_ids.lock().unwrap().insert(id);
    }

    pub fn invocations(&self) -> Vec<TaskId> {
        self.inner.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.inner.invocations.lock().unwrap().len()
    }

    /// Highest number of simultaneously running invocations seen.
    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the active counter even if the runner panics.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Inner {
    async fn run(&self, task: ScheduledTask) -> Result<(), RunnerError> {
        let id = task.id.clone();
        self.invocations.lock().unwrap().push(id.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        for dep in &task.deps {
            if !self.fs.exists(&self.layout.path_for(dep)) {
                return Err(RunnerError::new(
                    id,
                    RunnerErrorKind::Publish,
                    format!("dependency {dep} was not published"),
                ));
            }
        }

        tokio::time::sleep(self.delay).await;

        if self.panic_ids.lock().unwrap().contains(&id) {
            panic!("injected panic in {id}");
        }

        let should_fail = self.fail_ids.lock().unwrap().contains(&id)
            || self.fail_kinds.lock().unwrap().contains(&id.kind());
        if should_fail {
            return Err(RunnerError::new(id, RunnerErrorKind::Exit(1), "injected failure"));
        }

        self.fs
            .write(&self.layout.path_for(&id), b"artifact")
            .map_err(|e| RunnerError::new(id.clone(), RunnerErrorKind::Publish, e.to_string()))
    }
}

impl TaskRunner for FakeRunner {
    fn execute(&self, task: ScheduledTask) -> RunnerFuture {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.run(task).await })
    }
}
