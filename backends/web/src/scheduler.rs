use futures::future::LocalBoxFuture;
use waterdom_core::Scheduler;

/// Runs reactive tasks on the browser's microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebScheduler;

impl Scheduler for WebScheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
