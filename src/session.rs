//! Per-run session: the install log, the operator front end and the command
//! runner, owned together and handed to every stage by `&mut` reference.

use crate::command_args::CommandArgs;
use crate::command_runner::{CommandResult, CommandRunner, FailPolicy, Invocation, Progress};
use crate::error::Result;
use crate::install_log::InstallLog;
use crate::reporter::Reporter;

pub struct Session {
    log: InstallLog,
    reporter: Box<dyn Reporter>,
    runner: CommandRunner,
}

impl Session {
    pub fn new(log: InstallLog, reporter: Box<dyn Reporter>, runner: CommandRunner) -> Self {
        Self {
            log,
            reporter,
            runner,
        }
    }

    pub fn log(&self) -> &InstallLog {
        &self.log
    }

    pub fn reporter(&mut self) -> &mut dyn Reporter {
        self.reporter.as_mut()
    }

    pub fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// Run an invocation under the given policy. See `CommandRunner::execute`.
    pub fn execute(
        &mut self,
        invocation: &Invocation,
        policy: FailPolicy,
        progress: Progress,
    ) -> Result<Option<CommandResult>> {
        self.runner
            .execute(invocation, policy, progress, &self.log, self.reporter.as_mut())
    }

    pub fn execute_args<A: CommandArgs>(
        &mut self,
        args: &A,
        policy: FailPolicy,
        progress: Progress,
    ) -> Result<Option<CommandResult>> {
        self.execute(&args.to_invocation(), policy, progress)
    }

    /// Hand the terminal to an interactive tool.
    pub fn run_interactive<A: CommandArgs>(&mut self, args: &A) -> Result<()> {
        self.runner
            .run_interactive(&args.to_invocation(), &self.log, self.reporter.as_mut())
    }
}
