use ml_lab::modes::{PlayConfig, PlayMode, TrainConfig, TrainMode};
use ml_lab::rl::{InferenceBackend, Policy, TrainingBackend, default_device, load_policy};
use ml_lab::rl::{Environment, SnakeEnvironment};
use std::time::Duration;
use tempfile::TempDir;

fn tiny_training(dir: &TempDir) -> TrainConfig {
    let mut config = TrainConfig::new(48, dir.path().join("snake_dqn"));
    config.ppo_config.update_frequency = 16;
    config.ppo_config.batch_size = 8;
    config.ppo_config.n_epochs = 1;
    config
}

#[test]
fn trained_model_round_trips() {
    let dir = TempDir::new().unwrap();
    let config = tiny_training(&dir);
    let save_path = config.save_path.clone();

    let mut train_mode = TrainMode::<TrainingBackend>::new(config.clone(), default_device()).unwrap();
    train_mode.run().unwrap();
    assert_eq!(train_mode.total_steps(), 48);

    let device = default_device();
    let mut env =
        SnakeEnvironment::<InferenceBackend>::with_seed(config.game_config.clone(), 3, default_device());
    let observation = env.reset();

    let (first, metadata) =
        load_policy::<InferenceBackend>(&save_path, env.observation_shape(), &device).unwrap();
    let (second, _) =
        load_policy::<InferenceBackend>(&save_path, env.observation_shape(), &device).unwrap();

    assert_eq!(metadata.total_timesteps, 48);
    assert_eq!(metadata.updates, 3);
    assert_eq!(metadata.game_config, config.game_config);
    assert_eq!(
        first.predict(&observation, true).unwrap(),
        second.predict(&observation, true).unwrap()
    );
}

#[tokio::test]
async fn play_mode_runs_saved_model_headless() {
    let dir = TempDir::new().unwrap();
    let config = tiny_training(&dir);
    let save_path = config.save_path.clone();
    TrainMode::<TrainingBackend>::new(config, default_device())
        .unwrap()
        .run()
        .unwrap();

    let play_config = PlayConfig {
        model_path: save_path,
        max_ticks: Some(25),
        frame_delay: Duration::from_millis(1),
        render: false,
        ..PlayConfig::default()
    };
    let mut play_mode = PlayMode::<InferenceBackend>::new(play_config, default_device()).unwrap();
    play_mode.run().await.unwrap();

    assert_eq!(play_mode.session().ticks(), 25);
}

#[test]
fn play_mode_without_model_fails() {
    let dir = TempDir::new().unwrap();
    let config = PlayConfig {
        model_path: dir.path().join("missing"),
        render: false,
        ..PlayConfig::default()
    };

    assert!(PlayMode::<InferenceBackend>::new(config, default_device()).is_err());
}
