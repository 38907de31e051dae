use crate::{
    commands::Command,
    error::{BridgeError, HostError},
    observers::{ObserverId, ObserverList},
    surface::ControlSurface,
    track::clamp_volume,
};

/// What happened to a command.
///
/// Failures are not errors to the caller: they come back as
/// [`CommandOutcome::Swallowed`] after being logged.
#[derive(Debug)]
pub enum CommandOutcome {
    Applied,
    /// Nothing to apply; the caller should answer with a snapshot
    SnapshotRequested,
    Swallowed(BridgeError),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub handled: usize,
    pub failed: usize,
}

pub type CommandObserver = Box<dyn Fn(&Command) + Send>;

/// Applies commands to whichever surface was selected at startup
pub struct CommandBridge {
    volume_step: u8,
    observers: ObserverList<CommandObserver>,
    stats: CommandStats,
}

impl CommandBridge {
    pub fn new(volume_step: u8) -> Self {
        Self {
            volume_step,
            observers: ObserverList::new(),
            stats: CommandStats::default(),
        }
    }

    /// Register a callback run for every command before it is applied
    pub fn add_observer(&mut self, observer: CommandObserver) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub fn stats(&self) -> CommandStats {
        self.stats
    }

    /// Apply one command. Never fails and never retries.
    pub fn execute(&mut self, surface: &mut dyn ControlSurface, command: Command) -> CommandOutcome {
        self.stats.handled += 1;
        for (_, observer) in self.observers.iter() {
            observer(&command);
        }

        let result = match command {
            Command::RequestState => return CommandOutcome::SnapshotRequested,
            Command::PlayPause => surface.play_pause(),
            Command::Next => surface.next(),
            Command::Previous => surface.previous(),
            Command::VolumeUp | Command::VolumeDown | Command::VolumeDelta(_) => {
                let delta = command.volume_delta(self.volume_step).unwrap_or(0);
                self.change_volume(surface, delta)
            }
        };

        match result {
            Ok(()) => {
                log::debug!("Applied {} via {}", command, surface.name());
                CommandOutcome::Applied
            }
            Err(err) => {
                self.stats.failed += 1;
                let err = BridgeError::CommandExecution(err);
                log::warn!("Dropping {} on {} surface: {}", command, surface.name(), err);
                CommandOutcome::Swallowed(err)
            }
        }
    }

    fn change_volume(&self, surface: &mut dyn ControlSurface, delta: i32) -> Result<(), HostError> {
        let current = surface.volume()?;
        let target = clamp_volume(current, delta);
        if target == current {
            return Ok(());
        }
        surface.set_volume(target)
    }
}
