use anyhow::Result;
use clap::{Parser, ValueEnum};
use ml_lab::data::TimeRange;
use ml_lab::modes::{PlayConfig, PlayMode, PlotConfig, PlotMode, TrainConfig, TrainMode};
use ml_lab::rl::{InferenceBackend, TrainingBackend, default_device};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ml_lab")]
#[command(version, about = "PPO snake agent and sensor-data viewer")]
struct Cli {
    /// What to run
    #[arg(long, default_value = "snake")]
    mode: Mode,

    /// Training config as JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Environment steps to train for
    #[arg(long)]
    total_timesteps: Option<usize>,

    /// Where the trained model is saved
    #[arg(long)]
    save_path: Option<PathBuf>,

    /// Model to load in play mode
    #[arg(long, default_value = "snake_dqn")]
    model_path: PathBuf,

    /// Always take the most likely action
    #[arg(long)]
    deterministic: bool,

    /// Stop the inference loop after this many steps
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Delay between inference steps in milliseconds
    #[arg(long, default_value = "100")]
    frame_delay_ms: u64,

    /// Print episode notices only, without drawing the board
    #[arg(long)]
    no_render: bool,

    /// CSV file for plot mode
    #[arg(long, default_value = "testfile_somnox_labeled.csv")]
    csv: PathBuf,

    /// Column plotted against time
    #[arg(long, default_value = "somnox_ay")]
    column: String,

    /// Start of the time window (inclusive)
    #[arg(long, default_value = "68580")]
    start: f64,

    /// End of the time window (inclusive)
    #[arg(long, default_value = "373384")]
    end: f64,

    /// Also write the chart to an SVG file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export only, without opening the viewer
    #[arg(long)]
    no_viewer: bool,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Train, save, then watch the trained agent
    Snake,
    /// Train a PPO agent and save it
    Train,
    /// Run a saved agent
    Play,
    /// Show the sensor-data chart
    Plot,
}

impl Cli {
    fn train_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };

        if let Some(steps) = self.total_timesteps {
            config.total_timesteps = steps;
        }
        if let Some(path) = &self.save_path {
            config.save_path = path.clone();
        }

        Ok(config)
    }

    fn play_config(&self, model_path: PathBuf) -> PlayConfig {
        PlayConfig {
            model_path,
            deterministic: self.deterministic,
            max_ticks: self.max_ticks,
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            render: !self.no_render,
        }
    }

    fn plot_config(&self) -> PlotConfig {
        PlotConfig {
            csv_path: self.csv.clone(),
            value_column: self.column.clone(),
            range: TimeRange::new(self.start, self.end),
            export: self.export.clone(),
            interactive: !self.no_viewer,
            ..PlotConfig::default()
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}

fn train(config: TrainConfig) -> Result<PathBuf> {
    let save_path = config.save_path.clone();
    let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
    train_mode.run()?;
    Ok(save_path)
}

async fn play(config: PlayConfig) -> Result<()> {
    let mut play_mode = PlayMode::<InferenceBackend>::new(config, default_device())?;
    play_mode.run().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.mode {
        Mode::Snake => {
            let model_path = train(cli.train_config()?)?;
            play(cli.play_config(model_path)).await?;
        }
        Mode::Train => {
            train(cli.train_config()?)?;
        }
        Mode::Play => {
            play(cli.play_config(cli.model_path.clone())).await?;
        }
        Mode::Plot => {
            let mut plot_mode = PlotMode::new(cli.plot_config())?;
            plot_mode.run().await?;
        }
    }

    Ok(())
}
