//! Core-pinned thread placement for the dual-core ESP32.
//!
//! The sampling session runs on the application core so its cadence is
//! never disturbed by WiFi/lwIP on the protocol core; the pub-sub
//! service goes the other way. ESP-IDF exposes placement through
//! `esp_pthread_set_cfg()`, which configures the *next* thread created
//! from the calling thread, so the config→spawn pair here must not be
//! interleaved with other spawns. Off-device a [`TaskSpec`] degrades to
//! a plain named thread.

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): WiFi, lwIP, the pub-sub service.
    Pro = 0,
    /// Core 1 (APP_CPU): measurement threads.
    App = 1,
}

/// Placement of one preemptive thread.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// FreeRTOS task name; must carry its null terminator.
    pub name: &'static str,
}

impl TaskSpec {
    fn label(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn `f` on its own thread placed per `spec`.
pub fn spawn(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> std::thread::JoinHandle<()> {
    #[cfg(target_os = "espidf")]
    arm_next_spawn(&spec);

    log::info!(
        "Spawning '{}' ({:?}, pri={}, stack={}KB)",
        spec.label(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    let builder = std::thread::Builder::new().name(spec.label().into());
    #[cfg(not(target_os = "espidf"))]
    let builder = builder.stack_size(spec.stack_kb * 1024);

    builder.spawn(f).expect("task_pin: thread creation failed")
}

/// Stage `spec` as the pthread configuration for the next spawn from
/// this thread.
#[cfg(target_os = "espidf")]
fn arm_next_spawn(spec: &TaskSpec) {
    use esp_idf_svc::sys;

    // SAFETY: fills a default config then hands it back to ESP-IDF; the
    // name pointer is 'static and null-terminated per TaskSpec.
    unsafe {
        let mut cfg = sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        let ret = sys::esp_pthread_set_cfg(&cfg);
        assert!(
            ret == sys::ESP_OK as i32,
            "esp_pthread_set_cfg failed: {ret}"
        );
    }
}
