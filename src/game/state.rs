use super::action::Direction;

/// A cell on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }
}

/// One snake on the board
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: Vec<Position>,
    /// Current direction of movement
    pub direction: Direction,
    /// Dead snakes stay in the state but no longer occupy the board
    pub alive: bool,
    /// Food eaten this episode
    pub score: u32,
}

impl Snake {
    /// Create a snake at `head` with `length` segments trailing behind it
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let (dx, dy) = direction.delta();
        let body = (0..length.max(1) as i32)
            .map(|i| head.moved_by(-dx * i, -dy * i))
            .collect();

        Self {
            body,
            direction,
            alive: true,
            score: 0,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Body segments excluding the head
    pub fn body_segments(&self) -> &[Position] {
        &self.body[1..]
    }

    /// Check if position collides with snake body (excluding head)
    pub fn collides_with_body(&self, pos: Position) -> bool {
        self.body_segments().contains(&pos)
    }

    /// Advance one cell in the current direction, keeping the tail when growing
    pub fn move_snake(&mut self, should_grow: bool) {
        let new_head = self.head().moved_in_direction(self.direction);
        self.body.insert(0, new_head);

        if !should_grow {
            self.body.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that killed a snake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Left the grid
    Wall,
    /// Ran into its own body
    SelfCollision,
    /// Ran into another snake, or into the cell another head moved to
    OtherSnake,
}

/// Complete board state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// All snakes; index 0 is the controlled one
    pub snakes: Vec<Snake>,
    /// `None` once the board has no free cell left
    pub food: Option<Position>,
    pub grid_width: usize,
    pub grid_height: usize,
    pub steps: u32,
    /// Set once the episode has ended; further steps are no-ops
    pub done: bool,
}

impl GameState {
    pub fn new(snakes: Vec<Snake>, food: Option<Position>, grid_width: usize, grid_height: usize) -> Self {
        Self {
            snakes,
            food,
            grid_width,
            grid_height,
            steps: 0,
            done: false,
        }
    }

    /// State with a single snake, as used by most tests and the default config
    pub fn single(snake: Snake, food: Position, grid_width: usize, grid_height: usize) -> Self {
        Self::new(vec![snake], Some(food), grid_width, grid_height)
    }

    /// The controlled snake
    pub fn snake(&self) -> &Snake {
        &self.snakes[0]
    }

    pub fn snake_mut(&mut self) -> &mut Snake {
        &mut self.snakes[0]
    }

    /// Whether the controlled snake is alive
    pub fn is_alive(&self) -> bool {
        self.snakes.first().is_some_and(|snake| snake.alive)
    }

    /// Score of the controlled snake
    pub fn score(&self) -> u32 {
        self.snakes.first().map_or(0, |snake| snake.score)
    }

    pub fn alive_count(&self) -> usize {
        self.snakes.iter().filter(|snake| snake.alive).count()
    }

    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.x < self.grid_width as i32
            && pos.y >= 0
            && pos.y < self.grid_height as i32
    }

    /// Check if a position is occupied by any living snake
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.snakes
            .iter()
            .filter(|snake| snake.alive)
            .any(|snake| snake.body.contains(&pos))
    }

    /// Cells not covered by a living snake, in row-major order
    pub fn free_cells(&self) -> Vec<Position> {
        (0..self.grid_height as i32)
            .flat_map(|y| (0..self.grid_width as i32).map(move |x| Position::new(x, y)))
            .filter(|&pos| !self.is_occupied(pos))
            .collect()
    }
}
