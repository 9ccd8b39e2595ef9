//! Control command parsing

use std::fmt;

/// A control command recognised on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Register the service
    Install,
    /// Remove the service registration
    Uninstall,
    /// Ask the control manager to start the service
    Start,
    /// Ask the control manager to stop the service
    Stop,
    /// Run the service body in the foreground
    Console,
    /// Print usage
    Usage,
}

impl ControlCommand {
    /// Execution order of the management commands
    pub const ORDER: [ControlCommand; 4] = [Self::Install, Self::Start, Self::Stop, Self::Uninstall];

    /// Match a single argument, ignoring case
    pub fn from_arg(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        [
            Self::Install,
            Self::Uninstall,
            Self::Start,
            Self::Stop,
            Self::Console,
        ]
        .into_iter()
        .find(|cmd| cmd.as_str().eq_ignore_ascii_case(arg))
    }

    /// Command word
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Console => "console",
            Self::Usage => "usage",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The commands selected by one invocation, in execution order
///
/// `console` wins over everything else. Management commands always run in
/// the order install, start, stop, uninstall, whatever order they were given
/// in. Duplicates collapse. Without any recognised argument the set is
/// `[Usage]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    commands: Vec<ControlCommand>,
}

impl CommandSet {
    /// Build the set from raw arguments; unknown arguments are ignored
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let found: Vec<ControlCommand> = args
            .into_iter()
            .filter_map(|arg| ControlCommand::from_arg(arg.as_ref()))
            .collect();

        if found.contains(&ControlCommand::Console) {
            return Self {
                commands: vec![ControlCommand::Console],
            };
        }

        let commands: Vec<ControlCommand> = ControlCommand::ORDER
            .into_iter()
            .filter(|cmd| found.contains(cmd))
            .collect();

        if commands.is_empty() {
            Self {
                commands: vec![ControlCommand::Usage],
            }
        } else {
            Self { commands }
        }
    }

    /// Commands in execution order
    pub fn commands(&self) -> &[ControlCommand] {
        &self.commands
    }

    /// Whether this invocation runs the service in the foreground
    pub fn is_console(&self) -> bool {
        self.commands == [ControlCommand::Console]
    }

    /// Whether nothing was recognised
    pub fn is_usage(&self) -> bool {
        self.commands == [ControlCommand::Usage]
    }
}
