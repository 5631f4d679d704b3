/// Heading of a snake on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Directions in discrete action order
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns true if turning from self to other would be a 180-degree turn
    pub fn is_opposite(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Up, Direction::Down)
                | (Direction::Down, Direction::Up)
                | (Direction::Left, Direction::Right)
                | (Direction::Right, Direction::Left)
        )
    }

    /// Grid delta (dx, dy); y grows downwards
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// What a snake does on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Turn towards a direction (ignored if it reverses the snake)
    Move(Direction),
    /// Keep the current heading
    #[default]
    Continue,
}

impl Action {
    /// Map a discrete policy output to an action.
    ///
    /// Indices follow [`Direction::ALL`]; anything out of range keeps the heading.
    pub fn from_index(idx: usize) -> Self {
        Direction::ALL
            .get(idx)
            .map(|&direction| Action::Move(direction))
            .unwrap_or(Action::Continue)
    }
}

impl From<Direction> for Action {
    fn from(direction: Direction) -> Self {
        Action::Move(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_directions() {
        assert!(Direction::Up.is_opposite(Direction::Down));
        assert!(Direction::Left.is_opposite(Direction::Right));
        assert!(!Direction::Up.is_opposite(Direction::Left));
        assert!(!Direction::Right.is_opposite(Direction::Right));
    }

    #[test]
    fn test_action_from_index() {
        assert_eq!(Action::from_index(0), Action::Move(Direction::Up));
        assert_eq!(Action::from_index(1), Action::Move(Direction::Down));
        assert_eq!(Action::from_index(2), Action::Move(Direction::Left));
        assert_eq!(Action::from_index(3), Action::Move(Direction::Right));
        assert_eq!(Action::from_index(4), Action::Continue);
        assert_eq!(Action::from_index(usize::MAX), Action::Continue);
    }

    #[test]
    fn test_default_action_keeps_heading() {
        assert_eq!(Action::default(), Action::Continue);
    }
}
