use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tracker_core::{update, AppViewModel, Msg, SessionState, TaskId, TrackerState};
use tracker_engine::{EngineHandle, SessionEvent};
use tracker_logging::{set_poll_tick, tracker_debug, tracker_info};

use super::config::Cli;
use super::console::commands::{self, Command, HELP};
use super::console::render;
use super::effects::EffectRunner;
use super::hooks::TerminalHooks;
use super::{logging, persistence};

const TICK_INTERVAL: Duration = Duration::from_millis(75);
const RENDER_INTERVAL: Duration = Duration::from_millis(50);

enum Input {
    Tick,
    Line(String),
    StdinClosed,
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(cli.log, cli.verbose);
    tracker_info!("Tracker console starting against {}", cli.base_url);

    let engine = EngineHandle::new(cli.client_settings())?;
    let session_events = engine.subscribe_session_events();

    let mut hooks = TerminalHooks::new();
    hooks.register(|task_id, state| {
        println!("Task {task_id} finished: {}", state.as_str());
    });
    let runner = EffectRunner::new(engine, hooks, cli.state_dir.clone());

    let (input_tx, input_rx) = mpsc::channel::<Input>();
    spawn_ticker(input_tx.clone());
    spawn_stdin_reader(input_tx);

    let (view_tx, view_rx) = watch::channel(AppViewModel::default());
    let renderer = spawn_renderer(view_rx);

    let mut coordinator = Coordinator {
        state: TrackerState::new(cli.poll_settings()),
        runner,
        session_events,
        view_tx,
        origin: Instant::now(),
        last_poll: 0,
    };

    if cli.token.is_some() {
        let mut initial = persistence::load_tasks(&cli.state_dir);
        initial.extend(cli.tasks.iter().filter_map(|raw| TaskId::parse(raw)));
        let now = coordinator.now();
        coordinator.dispatch(Msg::SessionStarted { now });
        for task_id in initial {
            coordinator.dispatch(Msg::AddTask(task_id));
        }
    }
    coordinator.publish(true);
    println!("{HELP}");

    while let Ok(input) = input_rx.recv() {
        match input {
            Input::Tick => {
                let now = coordinator.now();
                coordinator.dispatch(Msg::Tick { now });
            }
            Input::Line(line) if line.trim().is_empty() => {}
            Input::Line(line) => match commands::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => coordinator.command(command),
                Err(err) => println!("{err}"),
            },
            Input::StdinClosed => break,
        }
        coordinator.pump();
    }

    tracker_info!("Tracker console exiting");
    drop(coordinator);
    let _ = renderer.join();
    Ok(())
}

/// Owns the tracker state. All messages go through [`Coordinator::dispatch`].
struct Coordinator {
    state: TrackerState,
    runner: EffectRunner,
    session_events: broadcast::Receiver<SessionEvent>,
    view_tx: watch::Sender<AppViewModel>,
    origin: Instant,
    last_poll: u64,
}

impl Coordinator {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        let polls = self.state.polls_fired();
        if polls != self.last_poll {
            self.last_poll = polls;
            set_poll_tick(polls);
        }

        self.runner.run(effects);
        self.publish(false);
    }

    /// Feeds engine completions back into the state and reports session signals.
    ///
    /// Teardown itself is driven by the `Unauthorized` results; the session
    /// channel only tells the user which endpoint refused the token.
    fn pump(&mut self) {
        for msg in self.runner.drain_events() {
            self.dispatch(msg);
        }
        loop {
            match self.session_events.try_recv() {
                Ok(SessionEvent::Unauthorized { endpoint }) => {
                    tracker_debug!("Unauthorized signal from {}", endpoint);
                    println!(
                        "Backend refused the session at {endpoint}. Use `login <token>` to resume."
                    );
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn command(&mut self, command: Command) {
        match command {
            Command::Add(task_id) => self.dispatch(Msg::AddTask(task_id)),
            Command::Dismiss(task_id) => self.dispatch(Msg::RemoveTask(task_id)),
            Command::Stop(task_id) => self.dispatch(Msg::StopClicked(task_id)),
            Command::List => self.publish(true),
            Command::Login(token) => {
                if self.state.session() == SessionState::Active {
                    println!("Already logged in.");
                    return;
                }
                if token.is_some() {
                    self.runner.engine().set_token(token);
                }
                let now = self.now();
                self.dispatch(Msg::SessionStarted { now });
            }
            Command::Logout => {
                self.dispatch(Msg::Logout);
                self.runner.engine().set_token(None);
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }

    /// Sends the current view to the renderer when it changed, or always when `force` is set.
    fn publish(&mut self, force: bool) {
        if self.state.consume_dirty() || force {
            self.view_tx.send_replace(self.state.view());
        }
    }
}

fn spawn_ticker(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        while tx.send(Input::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });
}

fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::StdinClosed);
    });
}

/// Prints every view published on the feed. Exits when the coordinator is dropped.
fn spawn_renderer(mut view_rx: watch::Receiver<AppViewModel>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(changed) = view_rx.has_changed() {
            if changed {
                let view = view_rx.borrow_and_update().clone();
                let mut out = io::stdout().lock();
                let _ = writeln!(out);
                for line in render::render(&view) {
                    let _ = writeln!(out, "{line}");
                }
                let _ = out.flush();
            }
            thread::sleep(RENDER_INTERVAL);
        }
    })
}
