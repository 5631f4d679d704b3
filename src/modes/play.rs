//! Inference loop for a trained policy
//!
//! An [`InferenceSession`] owns the environment, the policy and the render
//! surface. Every tick queries the policy, steps the environment and renders
//! the result. When an episode ends a notice is emitted and the environment is
//! reset, so the loop itself never stops unless given a tick budget.
//!
//! # Example
//!
//! ```rust,ignore
//! use ml_lab::modes::{PlayConfig, PlayMode};
//! use ml_lab::rl::{InferenceBackend, default_device};
//!
//! let config = PlayConfig::default(); // loads `snake_dqn`
//! let mut play_mode = PlayMode::<InferenceBackend>::new(config, default_device())?;
//! play_mode.run().await?;
//! ```

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use crossterm::ExecutableCommand;
use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::CrosstermBackend,
    text::Line,
    widgets::{Paragraph, Widget},
};
use std::{
    fmt,
    future::Future,
    pin::pin,
    io::{Stdout, Write, stdout},
    path::PathBuf,
    time::Duration,
};
use tokio::time::interval;

use crate::render::{BoardStatus, Renderer};
use crate::rl::{
    ActorCriticNetwork, Environment, Policy, SnakeEnvironment, load_metadata, load_policy,
};

/// Message emitted when an episode ends and the environment is reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The environment reported a negative alive count
    GameOver,
    /// The environment set its terminated flag
    Terminated,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameOver => f.write_str("Game Over! Resetting the environment."),
            Self::Terminated => f.write_str("Game terminated! Resetting the environment."),
        }
    }
}

/// Inference loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// The last step ended the episode; the next transition resets
    EpisodeEnded(Notice),
}

impl LoopState {
    /// State after a step reporting `alive_snakes` and `terminated`
    ///
    /// A negative alive count takes precedence over the terminated flag.
    pub fn after_step(alive_snakes: i32, terminated: bool) -> Self {
        if alive_snakes < 0 {
            Self::EpisodeEnded(Notice::GameOver)
        } else if terminated {
            Self::EpisodeEnded(Notice::Terminated)
        } else {
            Self::Running
        }
    }
}

/// Render surface for the inference loop
pub trait FrameSink<E: ?Sized> {
    /// Draw the environment after a step
    fn render(&mut self, env: &E) -> Result<()>;

    /// Show a notice to the user
    fn notice(&mut self, notice: Notice) -> Result<()>;
}

impl<E: ?Sized, S: FrameSink<E> + ?Sized> FrameSink<E> for Box<S> {
    fn render(&mut self, env: &E) -> Result<()> {
        (**self).render(env)
    }

    fn notice(&mut self, notice: Notice) -> Result<()> {
        (**self).notice(notice)
    }
}

/// Surface that draws nothing and prints notices to stdout
#[derive(Debug, Default)]
pub struct HeadlessSink;

impl<E: ?Sized> FrameSink<E> for HeadlessSink {
    fn render(&mut self, _env: &E) -> Result<()> {
        Ok(())
    }

    fn notice(&mut self, notice: Notice) -> Result<()> {
        let mut out = stdout().lock();
        writeln!(out, "{notice}").context("Failed to write notice")?;
        Ok(())
    }
}

/// Surface that draws the board in an inline terminal viewport
///
/// Notices are printed above the viewport so they scroll with the terminal
/// history while the board stays in place.
pub struct TerminalSink {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    renderer: Renderer,
    status: BoardStatus,
}

impl TerminalSink {
    pub fn new(grid_height: usize) -> Result<Self> {
        let terminal = Terminal::with_options(
            CrosstermBackend::new(stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(Renderer::height_for(grid_height)),
            },
        )
        .context("Failed to create terminal")?;

        Ok(Self {
            terminal,
            renderer: Renderer::new(),
            status: BoardStatus::default(),
        })
    }
}

impl<B: Backend> FrameSink<SnakeEnvironment<B>> for TerminalSink {
    fn render(&mut self, env: &SnakeEnvironment<B>) -> Result<()> {
        let renderer = &self.renderer;
        let status = &self.status;
        self.terminal
            .draw(|frame| renderer.render(frame, env.state(), status))
            .context("Failed to draw frame")?;
        Ok(())
    }

    fn notice(&mut self, notice: Notice) -> Result<()> {
        self.status.episode += 1;
        self.terminal
            .insert_before(1, |buf| {
                let area = buf.area;
                Paragraph::new(Line::from(notice.to_string())).render(area, buf);
            })
            .context("Failed to print notice")?;
        Ok(())
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        // Leave the cursor below the last frame
        let _ = self.terminal.show_cursor();
        let _ = stdout().execute(crossterm::cursor::MoveToNextLine(1));
    }
}

/// Owner of the environment, policy and render surface for one inference run
pub struct InferenceSession<E: Environment, P, S> {
    env: E,
    policy: P,
    sink: S,
    observation: E::Observation,
    state: LoopState,
    deterministic: bool,
    ticks: u64,
    /// Resets after episode ends; the initial reset is not counted
    resets: usize,
}

impl<E, P, S> InferenceSession<E, P, S>
where
    E: Environment,
    P: Policy<E::Observation>,
    S: FrameSink<E>,
{
    /// Reset the environment and start in `Running`
    pub fn new(mut env: E, policy: P, sink: S, deterministic: bool) -> Self {
        let observation = env.reset();
        Self {
            env,
            policy,
            sink,
            observation,
            state: LoopState::Running,
            deterministic,
            ticks: 0,
            resets: 0,
        }
    }

    /// Run one predict, step and render cycle
    ///
    /// Returns the notice emitted when the step ended the episode.
    pub fn tick(&mut self) -> Result<Option<Notice>> {
        let action = self
            .policy
            .predict(&self.observation, self.deterministic)
            .context("Policy query failed")?;

        let transition = self.env.step(action);
        self.observation = transition.observation;
        self.sink.render(&self.env)?;
        self.ticks += 1;

        self.state = LoopState::after_step(transition.alive_snakes, transition.terminated);

        match self.state {
            LoopState::Running => Ok(None),
            LoopState::EpisodeEnded(notice) => {
                tracing::info!(tick = self.ticks, "{notice}");
                self.sink.notice(notice)?;

                self.observation = self.env.reset();
                self.resets += 1;
                self.state = LoopState::Running;

                Ok(Some(notice))
            }
        }
    }

    /// Tick until `max_ticks` is reached, or forever when it is `None`
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<()> {
        loop {
            if max_ticks.is_some_and(|max| self.ticks >= max) {
                return Ok(());
            }
            self.tick()?;
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Configuration for play mode
#[derive(Debug, Clone, PartialEq)]
pub struct PlayConfig {
    /// Base path of the saved model
    pub model_path: PathBuf,

    /// Take the most likely action instead of sampling
    pub deterministic: bool,

    /// Stop after this many ticks; `None` runs until interrupted
    pub max_ticks: Option<u64>,

    /// Pause between ticks
    pub frame_delay: Duration,

    /// Draw the board; notices are printed either way
    pub render: bool,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("snake_dqn"),
            deterministic: false,
            max_ticks: None,
            frame_delay: Duration::from_millis(100),
            render: true,
        }
    }
}

/// Session driving a loaded network on the snake board
pub type SnakeSession<B> = InferenceSession<
    SnakeEnvironment<B>,
    ActorCriticNetwork<B>,
    Box<dyn FrameSink<SnakeEnvironment<B>>>,
>;

/// Play mode: load a saved policy and run it on the board it was trained on
pub struct PlayMode<B: Backend> {
    session: SnakeSession<B>,
    config: PlayConfig,
}

impl<B: Backend> PlayMode<B> {
    pub fn new(config: PlayConfig, device: B::Device) -> Result<Self> {
        let metadata = load_metadata(&config.model_path)
            .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

        let env = SnakeEnvironment::<B>::make(metadata.game_config.clone(), device.clone())
            .context("Failed to create environment")?;

        let (network, _) = load_policy::<B>(&config.model_path, env.observation_shape(), &device)
            .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

        let sink: Box<dyn FrameSink<SnakeEnvironment<B>>> = if config.render {
            Box::new(TerminalSink::new(metadata.game_config.grid_height)?)
        } else {
            Box::new(HeadlessSink)
        };

        let session = InferenceSession::new(env, network, sink, config.deterministic);

        Ok(Self { session, config })
    }

    /// Tick on a timer until the tick budget runs out or Ctrl+C is pressed
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Tick on a timer until the tick budget runs out or `stop` completes
    ///
    /// `stop` is polled across ticks, so a signal that fires while a tick is
    /// running ends the loop before the next one.
    pub async fn run_until<F: Future>(&mut self, stop: F) -> Result<()> {
        let mut tick_timer = interval(self.config.frame_delay.max(Duration::from_millis(1)));
        let mut stop = pin!(stop);

        loop {
            if self
                .config
                .max_ticks
                .is_some_and(|max| self.session.ticks() >= max)
            {
                break;
            }

            tokio::select! {
                _ = tick_timer.tick() => {
                    self.session.tick()?;
                }

                _ = &mut stop => {
                    break;
                }
            }
        }

        tracing::info!(
            ticks = self.session.ticks(),
            resets = self.session.resets(),
            "inference loop stopped"
        );

        Ok(())
    }

    pub fn session(&self) -> &SnakeSession<B> {
        &self.session
    }
}
