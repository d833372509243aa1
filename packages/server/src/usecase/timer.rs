//! Timers driven by deadlines inside the event loop.
//!
//! A timer never runs on its own task. The loop asks [`Timers::next_deadline`] how long it
//! may sleep and calls [`Timers::fire_due`] when that deadline passes, so timer commands
//! only ever run between two events.

use std::{fmt, time::Duration};

use tokio::time::Instant;
use uuid::Uuid;

use super::command::{BroadcastCurrentUptime, Command, GetJob, StopServer};

/// Shortest period a recurring timer re-arms with.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(Uuid);

impl TimerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a timer runs when it fires.
pub enum TimerAction {
    /// Run this command (a fresh copy on every fire of a recurring timer).
    Command(Command),
    /// Build a new command on every fire.
    Factory(Box<dyn Fn() -> Command + Send>),
}

impl TimerAction {
    fn build(&self, once: bool) -> Command {
        match self {
            Self::Command(command) if once => {
                let mut command = command.clone();
                command.set_delay(0);
                command
            }
            Self::Command(command) => command.renewed(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => f.debug_tuple("Command").field(&command.kind()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Added but never started
    Created,
    Running { deadline: Instant },
    /// Remaining time until the next fire is frozen
    Paused { remaining: Duration },
    /// Terminal
    Stopped,
}

#[derive(Debug)]
pub struct Timer {
    id: TimerId,
    name: String,
    interval: Duration,
    action: TimerAction,
    once: bool,
    auto_start: bool,
    state: TimerState,
}

impl Timer {
    /// A recurring timer that stays in `Created` until started.
    pub fn new(name: impl Into<String>, interval: Duration, action: TimerAction) -> Self {
        Self {
            id: TimerId::generate(),
            name: name.into(),
            interval,
            action,
            once: false,
            auto_start: false,
            state: TimerState::Created,
        }
    }

    /// Fire a single time, then stop.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Start as soon as the timer is added to a registry.
    pub fn auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn set_once(&mut self, once: bool) {
        self.once = once;
    }

    pub fn starts_automatically(&self) -> bool {
        self.auto_start
    }

    pub fn is_started(&self) -> bool {
        matches!(
            self.state,
            TimerState::Running { .. } | TimerState::Paused { .. }
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimerState::Paused { .. })
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TimerState::Stopped
    }

    /// Started and not paused.
    pub fn is_active(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Running { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Arm the timer one interval from `now`. Only a `Created` timer can start.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state != TimerState::Created {
            return false;
        }
        self.state = TimerState::Running {
            deadline: now + self.interval,
        };
        true
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Running { deadline } => {
                self.state = TimerState::Paused {
                    remaining: deadline.saturating_duration_since(now),
                };
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Paused { remaining } => {
                self.state = TimerState::Running {
                    deadline: now + remaining,
                };
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Produce the command for this fire and re-arm or stop.
    fn fire(&mut self, now: Instant) -> Command {
        let command = self.action.build(self.once);
        self.state = match self.state {
            _ if self.once => TimerState::Stopped,
            TimerState::Running { deadline } => {
                // A zero interval would stay due forever and starve the loop
                let interval = self.interval.max(MIN_INTERVAL);
                let next = deadline + interval;
                TimerState::Running {
                    deadline: if next > now { next } else { now + interval },
                }
            }
            state => state,
        };
        command
    }
}

/// Every timer owned by the Manager.
#[derive(Debug, Default)]
pub struct Timers {
    items: Vec<Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a timer, starting it right away if it auto-starts.
    pub fn add(&mut self, mut timer: Timer, now: Instant) -> TimerId {
        if timer.starts_automatically() {
            timer.start(now);
        }
        let id = timer.id();
        self.items.push(timer);
        id
    }

    /// Stop a timer and delete it. Absent ids are ignored.
    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let index = self.items.iter().position(|t| t.id() == id)?;
        let mut timer = self.items.remove(index);
        timer.stop();
        Some(timer)
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.items.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.items.iter_mut().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.items.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Timer> {
        self.items.iter().filter(|t| t.is_active())
    }

    /// Not started yet, or paused.
    pub fn inactive(&self) -> impl Iterator<Item = &Timer> {
        self.items.iter().filter(|t| !t.is_active())
    }

    pub fn paused(&self) -> impl Iterator<Item = &Timer> {
        self.items.iter().filter(|t| t.is_paused())
    }

    pub fn unpaused(&self) -> impl Iterator<Item = &Timer> {
        self.items.iter().filter(|t| !t.is_paused())
    }

    /// Earliest deadline among running timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.items.iter().filter_map(Timer::deadline).min()
    }

    /// Fire every timer whose deadline is at or before `now`, earliest first.
    ///
    /// Recurring timers are re-armed; one-shot timers are removed from the registry.
    pub fn fire_due(&mut self, now: Instant) -> Vec<(String, Command)> {
        let mut due: Vec<(Instant, usize)> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, timer)| {
                timer
                    .deadline()
                    .filter(|deadline| *deadline <= now)
                    .map(|deadline| (deadline, index))
            })
            .collect();
        due.sort();

        let fired = due
            .into_iter()
            .map(|(_, index)| {
                let timer = &mut self.items[index];
                tracing::trace!(timer = %timer.id(), name = %timer.name(), "Timer fired");
                (timer.name().to_string(), timer.fire(now))
            })
            .collect();

        self.items.retain(|t| !t.is_stopped());
        fired
    }
}

/// Name of the one-shot timer wrapping a delayed command.
pub const DELAYED_COMMAND: &str = "DelayedCommand";

/// Poll the external queue every `interval`.
pub fn queue_worker(interval: Duration) -> Timer {
    Timer::new("QueueWorker", interval, TimerAction::Command(GetJob.into())).auto_start()
}

/// Run `command` once after its delay.
pub fn delayed_command(command: Command) -> Timer {
    let delay = Duration::from_millis(command.delay());
    Timer::new(DELAYED_COMMAND, delay, TimerAction::Command(command))
        .once()
        .auto_start()
}

/// Broadcast the uptime every `interval`. `start` is in seconds since the epoch.
pub fn current_uptime(interval: Duration, start: f64) -> Timer {
    let factory = move || Command::from(BroadcastCurrentUptime { start });
    Timer::new("CurrentUptime", interval, TimerAction::Factory(Box::new(factory))).auto_start()
}

/// Stop the server after `interval` so a supervisor can restart it.
pub fn auto_restart(interval: Duration) -> Timer {
    Timer::new("AutoRestartServer", interval, TimerAction::Command(StopServer.into())).auto_start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::command::{Action, CommandKind};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_created_timer_has_no_deadline() {
        // テスト項目: 開始していないタイマーは発火しない
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        let timer = Timer::new("manual", ms(10), TimerAction::Command(StopServer.into()));

        // when (操作):
        timers.add(timer, now);

        // then (期待する結果):
        assert_eq!(timers.next_deadline(), None);
        assert!(timers.fire_due(now + ms(1000)).is_empty());
        assert_eq!(timers.inactive().count(), 1);
    }

    #[test]
    fn test_auto_start_on_add() {
        // テスト項目: 自動開始タイマーは追加と同時に開始する
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();

        // when (操作):
        let id = timers.add(queue_worker(ms(100)), now);

        // then (期待する結果):
        assert!(timers.get(id).unwrap().is_active());
        assert_eq!(timers.next_deadline(), Some(now + ms(100)));
    }

    #[test]
    fn test_zero_interval_rearms_in_the_future() {
        // テスト項目: 間隔 0 の繰り返しタイマーも発火後は未来の期限で再設定される
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.add(auto_restart(Duration::ZERO), now);

        // when (操作):
        let fired = timers.fire_due(now);

        // then (期待する結果):
        assert_eq!(fired.len(), 1);
        assert_eq!(timers.next_deadline(), Some(now + MIN_INTERVAL));
        assert!(timers.fire_due(now).is_empty());
    }

    #[test]
    fn test_recurring_timer_rearms() {
        // テスト項目: 繰り返しタイマーは発火後に次の期限が設定される
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.add(queue_worker(ms(100)), now);

        // when (操作):
        let early = timers.fire_due(now + ms(99));
        let fired = timers.fire_due(now + ms(100));

        // then (期待する結果):
        assert!(early.is_empty());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1.kind(), CommandKind::GetJob);
        assert_eq!(timers.next_deadline(), Some(now + ms(200)));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_once_timer_removes_itself() {
        // テスト項目: 単発タイマーは1回発火したらレジストリから消える
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        let command = Command::from(StopServer).with_delay(5000);
        let command_id = command.id();
        timers.add(delayed_command(command), now);

        // when (操作):
        let fired = timers.fire_due(now + ms(5000));

        // then (期待する結果):
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, DELAYED_COMMAND);
        assert_eq!(fired[0].1.id(), command_id);
        assert_eq!(fired[0].1.delay(), 0);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_pause_freezes_remaining_time() {
        // テスト項目: 一時停止中は発火せず、再開後に残り時間で発火する
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        let id = timers.add(auto_restart(ms(100)), now);

        // when (操作):
        timers.get_mut(id).unwrap().pause(now + ms(30));
        let while_paused = timers.fire_due(now + ms(500));
        timers.get_mut(id).unwrap().resume(now + ms(500));

        // then (期待する結果):
        assert!(while_paused.is_empty());
        assert_eq!(timers.paused().count(), 0);
        assert_eq!(timers.next_deadline(), Some(now + ms(570)));
    }

    #[test]
    fn test_paused_timer_filters() {
        // テスト項目: active / inactive / paused / unpaused の絞り込み
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        let running = timers.add(queue_worker(ms(100)), now);
        let paused = timers.add(auto_restart(ms(100)), now);
        timers.add(
            Timer::new("manual", ms(100), TimerAction::Command(StopServer.into())),
            now,
        );
        timers.get_mut(paused).unwrap().pause(now);

        // then (期待する結果):
        let active: Vec<TimerId> = timers.active().map(Timer::id).collect();
        let paused_ids: Vec<TimerId> = timers.paused().map(Timer::id).collect();
        assert_eq!(active, vec![running]);
        assert_eq!(timers.inactive().count(), 2);
        assert_eq!(paused_ids, vec![paused]);
        assert_eq!(timers.unpaused().count(), 2);
    }

    #[test]
    fn test_remove_stops_and_deletes() {
        // テスト項目: 削除したタイマーは停止状態になり、二重削除は何もしない
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        let id = timers.add(queue_worker(ms(100)), now);

        // when (操作):
        let removed = timers.remove(id);
        let removed_again = timers.remove(id);

        // then (期待する結果):
        assert!(removed.unwrap().is_stopped());
        assert!(removed_again.is_none());
        assert!(timers.fire_due(now + ms(1000)).is_empty());
    }

    #[test]
    fn test_stopped_timer_cannot_restart() {
        // テスト項目: 停止は終端状態で再開始できない
        // given (前提条件):
        let now = Instant::now();
        let mut timer = queue_worker(ms(100));
        timer.start(now);
        timer.stop();

        // when (操作):
        let started = timer.start(now);

        // then (期待する結果):
        assert!(!started);
        assert!(timer.is_stopped());
    }

    #[test]
    fn test_factory_builds_fresh_command_each_fire() {
        // テスト項目: コマンド生成クロージャは発火ごとに新しいコマンドを作る
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.add(current_uptime(ms(1000), 42.0), now);

        // when (操作):
        let first = timers.fire_due(now + ms(1000));
        let second = timers.fire_due(now + ms(2000));

        // then (期待する結果):
        assert_ne!(first[0].1.id(), second[0].1.id());
        assert_eq!(
            first[0].1.action(),
            &Action::BroadcastCurrentUptime(BroadcastCurrentUptime { start: 42.0 })
        );
    }

    #[test]
    fn test_fire_due_runs_earliest_first() {
        // テスト項目: 同時に期限を迎えたタイマーは期限の早い順に発火する
        // given (前提条件):
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.add(delayed_command(Command::from(StopServer).with_delay(30)), now);
        timers.add(delayed_command(Command::from(GetJob).with_delay(10)), now);

        // when (操作):
        let fired = timers.fire_due(now + ms(50));

        // then (期待する結果):
        let kinds: Vec<CommandKind> = fired.iter().map(|(_, c)| c.kind()).collect();
        assert_eq!(kinds, vec![CommandKind::GetJob, CommandKind::StopServer]);
    }
}
