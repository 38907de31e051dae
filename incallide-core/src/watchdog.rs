//! Once-a-second check that the host app is still running.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::{error::HostError, surface::applescript::HostApp};

pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// A host application process that can be observed and started
pub trait AppProcess: Send {
    fn name(&self) -> &str;
    fn is_running(&self) -> bool;
    fn launch(&self) -> Result<(), HostError>;
}

impl AppProcess for HostApp {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_running(&self) -> bool {
        HostApp::is_running(self)
    }

    fn launch(&self) -> Result<(), HostError> {
        HostApp::launch(self)
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Running,
    /// Running again after being down
    Recovered,
    /// Down, and this was the first check to notice
    Quit,
    /// Down, and a launch was started
    Relaunched,
    /// Down with no auto-launch; already reported
    StillDown,
    LaunchFailed,
}

pub struct AppWatchdog<A: AppProcess> {
    app: A,
    auto_launch: bool,
    was_running: bool,
}

impl<A: AppProcess> AppWatchdog<A> {
    /// The app is assumed running so a first check that finds it down
    /// reports [`WatchEvent::Quit`].
    pub fn new(app: A, auto_launch: bool) -> Self {
        Self {
            app,
            auto_launch,
            was_running: true,
        }
    }

    pub fn check(&mut self) -> WatchEvent {
        let running = self.app.is_running();
        let was_running = std::mem::replace(&mut self.was_running, running);

        if running {
            if was_running {
                return WatchEvent::Running;
            }
            log::info!("{} is running again", self.app.name());
            return WatchEvent::Recovered;
        }

        if !self.auto_launch {
            if was_running {
                log::warn!("{} is not running; commands fail until it starts", self.app.name());
                return WatchEvent::Quit;
            }
            return WatchEvent::StillDown;
        }
        if was_running {
            log::warn!("{} is not running, launching it", self.app.name());
        }

        match self.app.launch() {
            Ok(()) => WatchEvent::Relaunched,
            Err(err) => {
                log::error!("Could not launch {}: {}", self.app.name(), err);
                WatchEvent::LaunchFailed
            }
        }
    }

    /// Run [`Self::check`] on its own thread every `interval` until stopped.
    pub fn spawn(mut self, interval: Duration) -> std::io::Result<WatchdogHandle>
    where
        A: 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = std::thread::Builder::new()
            .name("app-watchdog".into())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                self.check();
                loop {
                    crossbeam_channel::select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            self.check();
                        }
                    }
                }
            })?;
        Ok(WatchdogHandle { stop_tx, thread })
    }
}

pub struct WatchdogHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl WatchdogHandle {
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            log::error!("App watchdog panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    #[derive(Clone, Default)]
    struct FakeApp {
        running: Arc<AtomicBool>,
        launches: Arc<AtomicUsize>,
        launch_fails: bool,
        starts_on_launch: bool,
    }

    impl FakeApp {
        fn running() -> Self {
            let app = Self::default();
            app.running.store(true, Ordering::SeqCst);
            app
        }

        fn set_running(&self, running: bool) {
            self.running.store(running, Ordering::SeqCst);
        }

        fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }
    }

    impl AppProcess for FakeApp {
        fn name(&self) -> &str {
            "FakePlayer"
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn launch(&self) -> Result<(), HostError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.launch_fails {
                return Err(HostError::Failed("no such app".into()));
            }
            if self.starts_on_launch {
                self.set_running(true);
            }
            Ok(())
        }
    }

    #[test]
    fn quit_is_reported_once_without_auto_launch() {
        let app = FakeApp::running();
        let mut watchdog = AppWatchdog::new(app.clone(), false);

        assert_eq!(watchdog.check(), WatchEvent::Running);
        app.set_running(false);
        assert_eq!(watchdog.check(), WatchEvent::Quit);
        assert_eq!(watchdog.check(), WatchEvent::StillDown);
        assert_eq!(watchdog.check(), WatchEvent::StillDown);
        assert_eq!(app.launches(), 0);

        app.set_running(true);
        assert_eq!(watchdog.check(), WatchEvent::Recovered);
        assert_eq!(watchdog.check(), WatchEvent::Running);
    }

    #[test]
    fn auto_launch_relaunches_a_quit_app() {
        let app = FakeApp {
            starts_on_launch: true,
            ..FakeApp::running()
        };
        let mut watchdog = AppWatchdog::new(app.clone(), true);

        app.set_running(false);
        assert_eq!(watchdog.check(), WatchEvent::Relaunched);
        assert_eq!(app.launches(), 1);
        assert_eq!(watchdog.check(), WatchEvent::Recovered);
        assert_eq!(watchdog.check(), WatchEvent::Running);
        assert_eq!(app.launches(), 1);
    }

    #[test]
    fn app_down_at_startup_is_launched_on_first_check() {
        let app = FakeApp {
            starts_on_launch: true,
            ..FakeApp::default()
        };
        let mut watchdog = AppWatchdog::new(app.clone(), true);
        assert_eq!(watchdog.check(), WatchEvent::Relaunched);
        assert_eq!(app.launches(), 1);
    }

    #[test]
    fn failed_launch_is_retried_next_check() {
        let app = FakeApp {
            launch_fails: true,
            ..FakeApp::default()
        };
        let mut watchdog = AppWatchdog::new(app.clone(), true);
        assert_eq!(watchdog.check(), WatchEvent::LaunchFailed);
        assert_eq!(watchdog.check(), WatchEvent::LaunchFailed);
        assert_eq!(app.launches(), 2);
    }

    #[test]
    fn spawned_watchdog_relaunches_until_stopped() {
        let app = FakeApp::default();

        let handle = AppWatchdog::new(app.clone(), true)
            .spawn(Duration::from_millis(10))
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        handle.stop();

        let launches = app.launches();
        assert!(launches >= 2, "expected repeated launches, got {}", launches);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(app.launches(), launches);
    }
}
