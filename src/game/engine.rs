use super::{
    action::{Action, Direction},
    config::GameConfig,
    state::{CollisionType, GameState, Position, Snake},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Extra information about a step, from the controlled snake's point of view
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepInfo {
    /// Whether the controlled snake ate food this step
    pub ate_food: bool,
    /// How the controlled snake died, if it did
    pub collision_type: Option<CollisionType>,
    /// Episode cut by `max_episode_steps` rather than by the game
    pub truncated: bool,
    /// No free cell left to place food on
    pub board_full: bool,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for each snake, indexed like `GameState::snakes`
    pub rewards: Vec<f32>,
    /// Snakes still alive after the step
    pub alive_snakes: usize,
    /// Whether the episode has ended
    pub terminated: bool,
    pub info: StepInfo,
}

impl StepResult {
    /// Reward of the controlled snake
    pub fn reward(&self) -> f32 {
        self.rewards.first().copied().unwrap_or(0.0)
    }
}

/// The game engine that handles all game logic
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Engine with a fixed food-placement seed
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Start a new episode
    ///
    /// Snakes spawn on distinct rows, heads in the middle column, heading right.
    pub fn reset(&mut self) -> GameState {
        let n = self.config.n_snakes.max(1);
        let width = self.config.grid_width;
        let height = self.config.grid_height;
        let head_x = (width / 2) as i32;

        let snakes = (0..n)
            .map(|i| {
                let y = if n == 1 {
                    height / 2
                } else {
                    (i + 1) * height / (n + 1)
                };
                Snake::new(
                    Position::new(head_x, y as i32),
                    Direction::Right,
                    self.config.initial_snake_length,
                )
            })
            .collect();

        let mut state = GameState::new(snakes, None, width, height);
        state.food = self.spawn_food(&state);
        state
    }

    /// Advance every living snake by one cell.
    ///
    /// `actions[i]` steers snake `i`; snakes without an action keep their heading.
    pub fn step(&mut self, state: &mut GameState, actions: &[Action]) -> StepResult {
        let n = state.snakes.len();

        if state.done || !state.is_alive() {
            return StepResult {
                rewards: vec![0.0; n],
                alive_snakes: state.alive_count(),
                terminated: true,
                info: StepInfo::default(),
            };
        }

        // Update direction based on action (prevent 180° turns)
        for (i, snake) in state.snakes.iter_mut().enumerate() {
            if !snake.alive {
                continue;
            }
            if let Action::Move(new_direction) = actions.get(i).copied().unwrap_or_default() {
                if !snake.direction.is_opposite(new_direction) {
                    snake.direction = new_direction;
                }
            }
        }

        let heads: Vec<Option<Position>> = state
            .snakes
            .iter()
            .map(|snake| {
                snake
                    .alive
                    .then(|| snake.head().moved_in_direction(snake.direction))
            })
            .collect();

        // Collisions are judged against the board before anyone moves
        let collisions: Vec<Option<CollisionType>> = (0..n)
            .map(|i| heads[i].and_then(|head| self.check_collision(state, &heads, i, head)))
            .collect();

        let mut rewards = vec![0.0; n];
        let mut ate_any = false;
        let mut info = StepInfo::default();

        for i in 0..n {
            let Some(new_head) = heads[i] else {
                continue;
            };
            let snake = &mut state.snakes[i];

            if let Some(collision) = collisions[i] {
                snake.alive = false;
                rewards[i] = self.config.death_penalty;
                if i == 0 {
                    info.collision_type = Some(collision);
                }
                continue;
            }

            let ate_food = state.food == Some(new_head);
            snake.move_snake(ate_food);
            rewards[i] = self.config.step_reward;

            if ate_food {
                snake.score += 1;
                rewards[i] += self.config.food_reward;
                ate_any = true;
                if i == 0 {
                    info.ate_food = true;
                }
            }
        }

        if ate_any {
            state.food = self.spawn_food(state);
        }
        state.steps += 1;

        info.board_full = state.food.is_none();
        let mut terminated = !state.is_alive() || info.board_full;

        if !terminated
            && self
                .config
                .max_episode_steps
                .is_some_and(|limit| state.steps >= limit)
        {
            info.truncated = true;
            terminated = true;
        }

        state.done = terminated;

        StepResult {
            rewards,
            alive_snakes: state.alive_count(),
            terminated,
            info,
        }
    }

    /// Check whether snake `idx` moving its head to `pos` collides
    fn check_collision(
        &self,
        state: &GameState,
        heads: &[Option<Position>],
        idx: usize,
        pos: Position,
    ) -> Option<CollisionType> {
        if !state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        if state.snakes[idx].collides_with_body(pos) {
            return Some(CollisionType::SelfCollision);
        }

        let hits_other = state.snakes.iter().enumerate().any(|(j, other)| {
            j != idx && other.alive && (other.body.contains(&pos) || heads[j] == Some(pos))
        });

        hits_other.then_some(CollisionType::OtherSnake)
    }

    /// Pick a random free cell for the food
    fn spawn_food(&mut self, state: &GameState) -> Option<Position> {
        state.free_cells().choose(&mut self.rng).copied()
    }
}
