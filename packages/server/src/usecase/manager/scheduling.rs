//! Command execution, deferral, the job queue, listeners and timers.

use tokio::time::Instant;

use crate::{
    domain::{Job, MessageKind},
    usecase::{
        command::{Command, CommandId, CommandKind, Execute},
        error::{CommandError, ManagerError},
        listener::{Listener, ListenerId},
        timer::{self, Timer, TimerId},
    },
};

use super::Manager;

impl Manager {
    /// Run a command now, or schedule it on a one-shot timer when it has a delay.
    pub fn run(&mut self, command: Command) -> Result<(), CommandError> {
        if command.delay() > 0 {
            tracing::debug!(
                command = %command.kind(),
                delay_ms = command.delay(),
                "Command delayed"
            );
            self.add_timer(timer::delayed_command(command));
            return Ok(());
        }
        tracing::trace!(command = %command.kind(), id = %command.id(), "Running command");
        command.execute(self)
    }

    /// Queue a command for the next tick.
    ///
    /// The command never runs as part of the current tick. The event loop drains queued
    /// commands at the start of the following tick; the posted `RunQueued` wakes it when
    /// it is idle.
    pub fn next(&mut self, command: Command) -> CommandId {
        let id = command.id();
        self.pending.push_back(command);
        self.handle.run_queued();
        id
    }

    /// Remove a queued command before it runs. Returns `false` if it is not queued.
    pub fn abort(&mut self, id: CommandId) -> bool {
        match self.pending.iter().position(|c| c.id() == id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Set a command's delay in milliseconds and run it.
    pub fn delay(&mut self, mut command: Command, delay: u64) -> Result<(), CommandError> {
        command.set_delay(delay);
        self.run(command)
    }

    /// Run every command that was queued before this call, in FIFO order.
    ///
    /// Each command is taken off the queue before it runs, so a failing command is
    /// logged and not retried. Commands queued while draining wait for the next drain.
    pub fn run_queued(&mut self) -> usize {
        let batch = self.pending.len();
        let mut ran = 0;
        for _ in 0..batch {
            let Some(command) = self.pending.pop_front() else {
                break;
            };
            let kind = command.kind();
            ran += 1;
            if let Err(e) = self.run(command) {
                tracing::warn!(command = %kind, error = %e, "Queued command failed");
            }
        }
        ran
    }

    /// Build and run the command a queue job names, then delete the job.
    ///
    /// The job is deleted whatever happens, including when its command type is unknown,
    /// so a bad job is consumed once instead of being retried forever.
    pub fn work(&mut self, job: &Job) -> Result<(), ManagerError> {
        let command = job
            .payload()
            .map_err(CommandError::from)
            .and_then(|payload| {
                let name = payload.job.unwrap_or_default();
                CommandKind::from_name(&name)?.build(payload.data)
            });

        let result = match command {
            Ok(command) => {
                tracing::debug!(job = %job.id(), command = %command.kind(), "Working job");
                self.run(command)
            }
            Err(e) => {
                tracing::warn!(job = %job.id(), error = %e, "Malformed job");
                Err(e)
            }
        };

        if let Err(e) = self.queue.delete(job) {
            tracing::warn!(job = %job.id(), error = %e, "Failed to delete job");
        }
        result.map_err(ManagerError::from)
    }

    /// Pop at most one job from the configured queue and work it.
    ///
    /// An empty queue is the normal idle case.
    pub fn poll_queue(&mut self) -> Result<(), CommandError> {
        let Some(job) = self.queue.pop(&self.config.queue)? else {
            return Ok(());
        };
        if let Err(e) = self.work(&job) {
            tracing::warn!(job = %job.id(), error = %e, "Job failed");
        }
        Ok(())
    }

    /// Bind a command to a message through a new single-binding listener.
    pub fn listen(&mut self, message: MessageKind, command: CommandKind) -> ListenerId {
        self.listener(Listener::new("Manager").on(message, command))
    }

    pub fn listener(&mut self, listener: Listener) -> ListenerId {
        tracing::debug!(listener = %listener.name(), "Listener attached");
        self.listeners.add(listener)
    }

    /// Detach a listener. Unknown ids are ignored.
    pub fn silence(&mut self, id: ListenerId) -> Option<Listener> {
        self.listeners.remove(id)
    }

    /// Add a timer; auto-starting timers start now.
    pub fn add_timer(&mut self, timer: Timer) -> TimerId {
        self.timers.add(timer, Instant::now())
    }

    /// Make a timer one-shot, then add it.
    pub fn once(&mut self, mut timer: Timer) -> TimerId {
        timer.set_once(true);
        self.add_timer(timer)
    }

    pub fn start_timer(&mut self, id: TimerId) -> bool {
        self.timers
            .get_mut(id)
            .is_some_and(|timer| timer.start(Instant::now()))
    }

    pub fn pause_timer(&mut self, id: TimerId) -> bool {
        self.timers
            .get_mut(id)
            .is_some_and(|timer| timer.pause(Instant::now()))
    }

    pub fn resume_timer(&mut self, id: TimerId) -> bool {
        self.timers
            .get_mut(id)
            .is_some_and(|timer| timer.resume(Instant::now()))
    }

    /// Stop and remove a timer before its next fire.
    pub fn cancel(&mut self, id: TimerId) -> Option<Timer> {
        self.timers.remove(id)
    }

    /// Earliest deadline among running timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Run the commands of every timer due at `now`. Returns how many fired.
    pub fn fire_due_timers(&mut self, now: Instant) -> usize {
        let fired = self.timers.fire_due(now);
        let count = fired.len();
        for (name, command) in fired {
            let kind = command.kind();
            if let Err(e) = self.run(command) {
                tracing::warn!(timer = %name, command = %kind, error = %e, "Timer command failed");
            }
        }
        count
    }
}
