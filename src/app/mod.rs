use std::mem;
use std::ops::{Deref, DerefMut};

use ggez::conf::{WindowMode, WindowSetup};
use ggez::event::{EventHandler, ErrorOrigin};
use ggez::input::keyboard::{KeyCode, KeyInput};
use ggez::Context;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::prefs::Prefs;
pub use snake_screen::SnakeScreen;
pub use wake_screen::WakeScreen;

mod message;
mod palette;
mod prompt;
mod snake_screen;
mod wake_screen;

pub enum Screen {
    Wake(WakeScreen),
    Snake(SnakeScreen),
}

impl Deref for Screen {
    type Target = dyn EventHandler<Error>;

    fn deref(&self) -> &Self::Target {
        use Screen::*;
        match self {
            Wake(x) => x,
            Snake(x) => x,
        }
    }
}

impl DerefMut for Screen {
    fn deref_mut(&mut self) -> &mut Self::Target {
        use Screen::*;
        match self {
            Wake(x) => x,
            Snake(x) => x,
        }
    }
}

impl Screen {
    fn leave(&mut self) {
        if let Screen::Snake(snake) = self {
            snake.leave();
        }
    }

    /// Hidden screens still get this every frame
    fn background_update(&mut self) {
        if let Screen::Wake(wake) = self {
            wake.poll_timer();
        }
    }

    /// Typing into a prompt, tab must not switch away
    fn is_capturing_text(&self) -> bool {
        matches!(self, Screen::Wake(wake) if wake.has_prompt())
    }
}

/// Both screens live for the whole session, tab swaps the visible one
pub struct App {
    screen: Screen,
    parked: Screen,
}

impl App {
    pub fn new(first: Screen, second: Screen) -> Self {
        Self { screen: first, parked: second }
    }

    pub fn window_mode(prefs: &Prefs) -> WindowMode {
        let board = SnakeScreen::board_size(prefs);
        WindowMode::default()
            .dimensions(board.x.max(720.), board.y.max(600.))
            .resizable(false)
    }

    pub fn window_setup() -> WindowSetup {
        WindowSetup::default().title("Wake Up Warrior").vsync(true)
    }

    fn switch_screen(&mut self) {
        self.screen.leave();
        mem::swap(&mut self.screen, &mut self.parked);
        debug!(
            "switched to the {} screen",
            match self.screen {
                Screen::Wake(_) => "wake-up",
                Screen::Snake(_) => "snake",
            }
        );
    }
}

impl EventHandler<Error> for App {
    fn update(&mut self, ctx: &mut Context) -> Result {
        self.parked.background_update();
        self.screen.update(ctx)
    }

    fn draw(&mut self, ctx: &mut Context) -> Result {
        self.screen.draw(ctx)
    }

    fn key_down_event(&mut self, ctx: &mut Context, input: KeyInput, repeated: bool) -> Result {
        if input.keycode == Some(KeyCode::Tab) && !self.screen.is_capturing_text() {
            if !repeated {
                self.switch_screen();
            }
            return Ok(());
        }
        self.screen.key_down_event(ctx, input, repeated)
    }

    fn text_input_event(&mut self, ctx: &mut Context, character: char) -> Result {
        self.screen.text_input_event(ctx, character)
    }

    fn on_error(&mut self, _ctx: &mut Context, origin: ErrorOrigin, e: Error) -> bool {
        error!("{:?} failed: {:?}", origin, e);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::wake::SystemClock;

    #[test]
    fn test_switching_pauses_the_game() {
        let prefs = Prefs::default();
        let wake = WakeScreen::new(
            Box::new(LocalBackend::in_memory("alice".into())),
            Box::new(SystemClock),
            &prefs,
        );
        let mut app = App::new(Screen::Snake(SnakeScreen::new(&prefs)), Screen::Wake(wake));

        app.switch_screen();
        assert!(matches!(app.screen, Screen::Wake(_)));
        match &app.parked {
            Screen::Snake(snake) => assert!(snake.game().is_paused()),
            Screen::Wake(_) => panic!("snake screen should be parked"),
        }

        // the new user is asked for a name, tab is text now
        assert!(app.screen.is_capturing_text());
        app.switch_screen();
        assert!(matches!(app.screen, Screen::Snake(_)));
    }
}
