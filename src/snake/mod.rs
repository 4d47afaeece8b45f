use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::ThreadRng;
use rand::Rng;
use tracing::debug;

use crate::basic::board::{occupied_indices, random_free_spot};
use crate::basic::{Dir, GridDim, GridPoint};
use crate::prefs::SnakePrefs;
pub use collisions::Collision;

pub mod collisions;
pub mod control;

pub const INITIAL_LEN: usize = 3;
pub const INITIAL_DIR: Dir = Dir::Right;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum State {
    Running,
    Paused,
    GameOver,
}

/// What happened during one simulation step
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Tick {
    /// The game is not running
    Idle,
    Moved,
    Ate,
    Crashed(Collision),
    /// The snake covers the whole board, nowhere left for food
    BoardFull,
}

#[derive(Copy, Clone, Debug)]
pub struct Rules {
    pub dim: GridDim,
    pub initial_interval: Duration,
    pub interval_step: Duration,
    pub min_interval: Duration,
}

impl From<&SnakePrefs> for Rules {
    fn from(prefs: &SnakePrefs) -> Self {
        Self {
            dim: GridDim(prefs.grid_size),
            initial_interval: Duration::from_millis(prefs.initial_interval_ms),
            interval_step: Duration::from_millis(prefs.interval_step_ms),
            min_interval: Duration::from_millis(prefs.min_interval_ms),
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::from(&SnakePrefs::default())
    }
}

pub struct GameState<R: Rng = ThreadRng> {
    rules: Rules,

    /// Head first, no duplicate cells
    body: VecDeque<GridPoint>,
    dir: Dir,
    /// Turns requested but not yet applied, at most one is
    /// applied per tick
    dir_queue: VecDeque<Dir>,

    food: GridPoint,
    score: u32,
    state: State,

    rng: R,
}

impl GameState<ThreadRng> {
    pub fn new(rules: Rules) -> Self {
        Self::with_rng(rules, rand::thread_rng())
    }
}

impl<R: Rng> GameState<R> {
    /// How many turns a player can queue up ahead of the snake
    const DIR_QUEUE_LIMIT: usize = 3;

    pub fn with_rng(rules: Rules, rng: R) -> Self {
        let mut game = Self {
            rules,
            body: VecDeque::new(),
            dir: INITIAL_DIR,
            dir_queue: VecDeque::with_capacity(Self::DIR_QUEUE_LIMIT),
            // replaced in restart()
            food: GridPoint { x: 0, y: 0 },
            score: 0,
            state: State::Running,
            rng,
        };
        game.restart();
        game
    }

    /// Head in the middle of the board, body extending to the left
    pub fn initial_body(dim: GridDim) -> VecDeque<GridPoint> {
        let head = dim.center();
        (0..INITIAL_LEN as isize)
            .map(|i| GridPoint { x: head.x - i, y: head.y })
            .collect()
    }

    pub fn restart(&mut self) {
        self.body = Self::initial_body(self.rules.dim);
        self.dir = INITIAL_DIR;
        self.dir_queue.clear();
        self.score = 0;
        self.state = State::Running;
        match self.random_food_spot() {
            Some(food) => self.food = food,
            None => self.state = State::GameOver,
        }
        debug!("snake restarted on a {} board", self.rules.dim);
    }

    fn random_food_spot(&mut self) -> Option<GridPoint> {
        let occupied = occupied_indices(&self.body, self.rules.dim);
        random_free_spot(&occupied, self.rules.dim, &mut self.rng)
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != State::Running {
            return Tick::Idle;
        }

        if let Some(dir) = self.dir_queue.pop_front() {
            self.dir = dir;
        }

        let new_head = self.head().translate(self.dir);
        if let Some(collision) = collisions::find_collision(new_head, &self.body, self.rules.dim) {
            debug!("crashed ({:?}) at {:?} with score {}", collision, new_head, self.score);
            self.state = State::GameOver;
            return Tick::Crashed(collision);
        }

        self.body.push_front(new_head);
        if !collisions::check_food_collision(new_head, self.food) {
            self.body.pop_back();
            return Tick::Moved;
        }

        // keep the tail, the snake grows by one
        self.score += 1;
        match self.random_food_spot() {
            Some(food) => {
                self.food = food;
                Tick::Ate
            }
            None => {
                self.state = State::GameOver;
                Tick::BoardFull
            }
        }
    }

    /// Buffer a change of direction for the next ticks, returns
    /// whether it was accepted. Turning back onto the last accepted
    /// direction (or repeating it) is refused.
    pub fn steer(&mut self, new_dir: Dir) -> bool {
        if self.state != State::Running || self.dir_queue.len() >= Self::DIR_QUEUE_LIMIT {
            return false;
        }

        let last_dir = self.dir_queue.back().copied().unwrap_or(self.dir);
        if new_dir == last_dir || new_dir.is_reverse_of(last_dir) {
            return false;
        }
        self.dir_queue.push_back(new_dir);
        true
    }

    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            State::Running => State::Paused,
            State::Paused => State::Running,
            State::GameOver => State::GameOver,
        }
    }

    /// Time between two ticks, shrinks as the score grows
    pub fn tick_interval(&self) -> Duration {
        let speedup = self
            .rules
            .interval_step
            .checked_mul(self.score)
            .unwrap_or(Duration::MAX);
        self.rules
            .initial_interval
            .saturating_sub(speedup)
            .max(self.rules.min_interval)
    }

    pub fn head(&self) -> GridPoint {
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<GridPoint> {
        &self.body
    }

    #[cfg(test)]
    pub fn dir(&self) -> Dir {
        self.dir
    }

    pub fn food(&self) -> GridPoint {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.state == State::Paused
    }

    pub fn is_game_over(&self) -> bool {
        self.state == State::GameOver
    }

    pub fn dim(&self) -> GridDim {
        self.rules.dim
    }
}

#[cfg(test)]
impl<R: Rng> GameState<R> {
    fn set_body(&mut self, cells: &[(isize, isize)], dir: Dir) {
        self.body = cells.iter().copied().map(GridPoint::from).collect();
        self.dir = dir;
        self.dir_queue.clear();
    }

    fn set_food(&mut self, food: (isize, isize)) {
        self.food = GridPoint::from(food);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use Dir::*;

    fn game() -> GameState<StdRng> {
        GameState::with_rng(Rules::default(), StdRng::seed_from_u64(42))
    }

    fn cells(game: &GameState<StdRng>) -> Vec<(isize, isize)> {
        game.body().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_initial_state() {
        let game = game();
        assert_eq!(cells(&game), vec![(10, 10), (9, 10), (8, 10)]);
        assert_eq!(game.dir(), Right);
        assert_eq!(game.score(), 0);
        assert_eq!(game.state(), State::Running);
        assert!(!game.body().contains(&game.food()));
        assert_eq!(game.tick_interval(), Duration::from_millis(150));
    }

    #[test]
    fn test_head_moves_one_cell() {
        for dir in [Up, Down, Right] {
            let mut game = game();
            game.set_food((0, 0));
            let head = game.head();
            game.steer(dir);
            assert_eq!(game.tick(), Tick::Moved);
            assert_eq!(game.head(), head.translate(dir), "{:?}", dir);
            assert_eq!(game.body().len(), INITIAL_LEN);
            assert_eq!(game.body()[1], head);
        }
    }

    #[test]
    fn test_reverse_refused() {
        let mut game = game();
        assert!(!game.steer(Left), "reversing onto the body must be refused");
        assert!(!game.steer(Right), "repeating the direction is a no-op");
        assert!(game.steer(Up));
        // checked against the last queued turn, not the current direction
        assert!(!game.steer(Down));
        assert!(game.steer(Left));
    }

    #[test]
    fn test_turns_applied_one_per_tick() {
        let mut game = game();
        game.set_food((0, 0));
        assert!(game.steer(Up));
        assert!(game.steer(Left));
        // buffered, not applied yet
        assert_eq!(game.dir(), Right);

        game.tick();
        assert_eq!(game.dir(), Up);
        assert_eq!(cells(&game)[0], (10, 9));
        game.tick();
        assert_eq!(game.dir(), Left);
        assert_eq!(cells(&game)[0], (9, 9));
    }

    #[test]
    fn test_queue_limit() {
        let mut game = game();
        assert!(game.steer(Up));
        assert!(game.steer(Left));
        assert!(game.steer(Down));
        assert!(!game.steer(Right));
    }

    #[test]
    fn test_wall_crash() {
        let mut game = game();
        game.set_body(&[(19, 5), (18, 5), (17, 5)], Right);
        game.set_food((0, 0));
        assert_eq!(game.tick(), Tick::Crashed(Collision::Wall));
        assert!(game.is_game_over());
        // nothing moves after game over
        assert_eq!(game.tick(), Tick::Idle);
        assert_eq!(game.head(), GridPoint::from((19, 5)));
        assert!(!game.steer(Up));
    }

    #[test]
    fn test_self_crash() {
        let mut game = game();
        game.set_body(&[(5, 5), (5, 6), (6, 6), (6, 5), (6, 4)], Right);
        game.set_food((0, 0));
        assert_eq!(game.tick(), Tick::Crashed(Collision::Itself { segment_index: 3 }));
        assert!(game.is_game_over());
    }

    #[test]
    fn test_eat() {
        let mut game = game();
        game.set_food((11, 10));
        assert_eq!(game.tick(), Tick::Ate);
        assert_eq!(game.score(), 1);
        assert_eq!(cells(&game), vec![(11, 10), (10, 10), (9, 10), (8, 10)]);
        assert!(!game.body().contains(&game.food()), "food placed on the snake");
        assert_eq!(game.tick_interval(), Duration::from_millis(145));
    }

    #[test]
    fn test_interval_floor() {
        let mut game = game();
        for _ in 0..30 {
            let ahead = game.head().translate(game.dir());
            if !game.dim().contains(ahead) {
                game.set_body(&[(0, 0), (0, 1), (0, 2)], Right);
                continue;
            }
            game.set_food((ahead.x, ahead.y));
            assert_eq!(game.tick(), Tick::Ate);
        }
        assert!(game.score() >= 14);
        assert_eq!(game.tick_interval(), Duration::from_millis(80));
    }

    #[test]
    fn test_huge_interval_step() {
        let rules = Rules {
            interval_step: Duration::from_secs(u64::MAX / 2),
            ..Rules::default()
        };
        let mut game = GameState::with_rng(rules, StdRng::seed_from_u64(42));
        for (x, score) in [(11, 1), (12, 2), (13, 3)] {
            game.set_food((x, 10));
            assert_eq!(game.tick(), Tick::Ate);
            assert_eq!(game.score(), score);
            assert_eq!(game.tick_interval(), Duration::from_millis(80));
        }
    }

    #[test]
    fn test_body_has_no_duplicates() {
        let mut game = game();
        let turns = [Up, Left, Down, Right];
        for i in 0..200 {
            if game.is_game_over() {
                game.restart();
            }
            if i % 3 == 0 {
                game.steer(turns[(i / 3) % 4]);
            }
            game.tick();
            assert!(game.body().iter().all_unique(), "duplicate cell in {:?}", game.body());
            assert!(!game.body().contains(&game.food()));
        }
    }

    #[test]
    fn test_pause() {
        let mut game = game();
        game.toggle_pause();
        assert!(game.is_paused());
        let head = game.head();
        assert_eq!(game.tick(), Tick::Idle);
        assert!(!game.steer(Up));
        assert_eq!(game.head(), head);

        game.toggle_pause();
        assert_eq!(game.state(), State::Running);

        game.set_body(&[(19, 5), (18, 5), (17, 5)], Right);
        game.tick();
        game.toggle_pause();
        assert!(game.is_game_over(), "pausing a finished game does nothing");
    }

    #[test]
    fn test_restart_resets() {
        let mut game = game();
        game.set_food((11, 10));
        game.tick();
        game.steer(Up);
        game.set_body(&[(19, 5), (18, 5), (17, 5), (16, 5)], Right);
        game.tick();
        assert!(game.is_game_over());

        game.restart();
        assert_eq!(game.state(), State::Running);
        assert_eq!(game.score(), 0);
        assert_eq!(game.dir(), Right);
        assert_eq!(cells(&game), vec![(10, 10), (9, 10), (8, 10)]);
        assert!(!game.body().contains(&game.food()));
    }

    #[test]
    fn test_board_full() {
        let rules = Rules { dim: GridDim(2), ..Rules::default() };
        let mut game = GameState::with_rng(rules, StdRng::seed_from_u64(3));
        game.set_body(&[(0, 1), (0, 0), (1, 0)], Down);
        game.set_food((1, 1));
        game.steer(Right);
        assert_eq!(game.tick(), Tick::BoardFull);
        assert!(game.is_game_over());
        assert_eq!(game.score(), 1);
    }
}
