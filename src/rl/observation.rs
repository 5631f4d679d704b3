use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::game::{GameState, Position};

/// Number of observation planes
pub const OBSERVATION_CHANNELS: usize = 4;

const HEAD: usize = 0;
const BODY: usize = 1;
const FOOD: usize = 2;
const OTHERS: usize = 3;

/// Shape `[channels, height, width]` of observations for a board
pub fn observation_shape(grid_height: usize, grid_width: usize) -> [usize; 3] {
    [OBSERVATION_CHANNELS, grid_height, grid_width]
}

/// Create a 4-channel observation tensor from game state
///
/// Channels:
/// - 0: controlled snake head
/// - 1: controlled snake body (excluding head)
/// - 2: food
/// - 3: every other living snake
///
/// Returns: Tensor<B, 3> with shape [4, height, width]
pub fn create_observation<B: Backend>(state: &GameState, device: &B::Device) -> Tensor<B, 3> {
    let data = TensorData::new(
        encode_planes(state),
        observation_shape(state.grid_height, state.grid_width),
    );
    Tensor::from_data(data, device)
}

/// Flat row-major planes behind [`create_observation`]
pub fn encode_planes(state: &GameState) -> Vec<f32> {
    let plane = state.grid_height * state.grid_width;
    let mut data = vec![0.0; OBSERVATION_CHANNELS * plane];

    let mut mark = |channel: usize, pos: Position| {
        if state.is_in_bounds(pos) {
            let idx = channel * plane + pos.y as usize * state.grid_width + pos.x as usize;
            data[idx] = 1.0;
        }
    };

    for (i, snake) in state.snakes.iter().enumerate() {
        if !snake.alive {
            continue;
        }
        if i == 0 {
            mark(HEAD, snake.head());
            for &pos in snake.body_segments() {
                mark(BODY, pos);
            }
        } else {
            for &pos in &snake.body {
                mark(OTHERS, pos);
            }
        }
    }

    if let Some(food) = state.food {
        mark(FOOD, food);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Direction, Snake};
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type TestBackend = NdArray<f32>;

    fn plane_sum(data: &[f32], channel: usize, plane: usize) -> f32 {
        data[channel * plane..(channel + 1) * plane].iter().sum()
    }

    #[test]
    fn test_observation_shape() {
        let device = NdArrayDevice::default();
        let snake = Snake::new(Position::new(3, 3), Direction::Right, 1);
        let state = GameState::single(snake, Position::new(5, 5), 7, 7);

        let obs = create_observation::<TestBackend>(&state, &device);

        assert_eq!(obs.dims(), [4, 7, 7]);
    }

    #[test]
    fn test_head_body_and_food_planes() {
        let snake = Snake::new(Position::new(3, 3), Direction::Right, 3);
        let state = GameState::single(snake, Position::new(6, 1), 7, 7);
        let data = encode_planes(&state);
        let plane = 49;

        assert_eq!(data[HEAD * plane + 3 * 7 + 3], 1.0);
        assert_eq!(plane_sum(&data, HEAD, plane), 1.0);

        assert_eq!(data[BODY * plane + 3 * 7 + 2], 1.0);
        assert_eq!(data[BODY * plane + 3 * 7 + 3], 0.0);
        assert_eq!(plane_sum(&data, BODY, plane), 2.0);

        assert_eq!(data[FOOD * plane + 7 + 6], 1.0);
        assert_eq!(plane_sum(&data, FOOD, plane), 1.0);

        assert_eq!(plane_sum(&data, OTHERS, plane), 0.0);
    }

    #[test]
    fn test_other_snakes_plane() {
        let controlled = Snake::new(Position::new(3, 1), Direction::Right, 1);
        let other = Snake::new(Position::new(3, 5), Direction::Right, 2);
        let mut dead = Snake::new(Position::new(3, 3), Direction::Right, 2);
        dead.alive = false;
        let state = GameState::new(vec![controlled, other, dead], None, 7, 7);

        let data = encode_planes(&state);

        assert_eq!(plane_sum(&data, OTHERS, 49), 2.0);
        assert_eq!(plane_sum(&data, FOOD, 49), 0.0);
    }

    #[test]
    fn test_dead_controlled_snake_leaves_planes_empty() {
        let mut snake = Snake::new(Position::new(3, 3), Direction::Right, 2);
        snake.alive = false;
        let state = GameState::single(snake, Position::new(0, 0), 7, 7);

        let data = encode_planes(&state);

        assert_eq!(plane_sum(&data, HEAD, 49), 0.0);
        assert_eq!(plane_sum(&data, BODY, 49), 0.0);
    }

    #[test]
    fn test_non_square_grid() {
        let device = NdArrayDevice::default();
        let snake = Snake::new(Position::new(4, 2), Direction::Right, 1);
        let state = GameState::single(snake, Position::new(8, 4), 10, 5);

        let obs = create_observation::<TestBackend>(&state, &device);
        assert_eq!(obs.dims(), [4, 5, 10]);
    }

    #[test]
    fn test_observation_values_binary() {
        let snake = Snake::new(Position::new(3, 3), Direction::Right, 3);
        let state = GameState::single(snake, Position::new(1, 1), 7, 7);

        assert!(encode_planes(&state).iter().all(|&v| v == 0.0 || v == 1.0));
    }
}
