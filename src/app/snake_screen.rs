use std::time::Duration;

use ggez::event::EventHandler;
use ggez::graphics::{Canvas, DrawParam, Mesh, MeshBuilder, Quad, Rect, TextAlign};
use ggez::input::keyboard::{KeyCode, KeyInput};
use ggez::Context;
use tracing::info;

use crate::app::message::{draw_text, Message, MessageID, Messages, Position};
use crate::app::palette::Palette;
use crate::basic::{Dir, GridDim, GridPoint, Point};
use crate::error::{Error, Result};
use crate::prefs::Prefs;
use crate::snake::control::GameControl;
use crate::snake::{Collision, GameState, Rules, State, Tick};

pub struct SnakeScreen {
    game: GameState,
    control: GameControl,

    cell_size: f32,
    /// Top-left corner of the board in the window
    offset: Point,
    palette: Palette,

    /// Built on the first frame, the board never moves
    grid_mesh: Option<Mesh>,

    best_score: u32,
    show_fps: bool,
    message_duration: Duration,
    messages: Messages,
}

impl SnakeScreen {
    pub const HEADER: f32 = 48.;
    pub const MARGIN: f32 = 16.;

    pub fn new(prefs: &Prefs) -> Self {
        let rules = Rules::from(&prefs.snake);
        Self {
            game: GameState::new(rules),
            control: GameControl::new(),

            cell_size: prefs.snake.cell_size,
            offset: Point { x: Self::MARGIN, y: Self::HEADER },
            palette: Palette::dark(),

            grid_mesh: None,

            best_score: 0,
            show_fps: prefs.display.show_fps,
            message_duration: prefs.display.message_duration(),
            messages: Messages::default(),
        }
    }

    /// Window size needed to show the whole board
    pub fn board_size(prefs: &Prefs) -> Point {
        let side = prefs.snake.grid_size as f32 * prefs.snake.cell_size;
        Point {
            x: side + 2. * Self::MARGIN,
            y: side + Self::HEADER + Self::MARGIN,
        }
    }

    #[cfg(test)]
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Called when switching away, a running game waits for the
    /// player to come back
    pub fn leave(&mut self) {
        if self.game.state() == State::Running {
            self.game.toggle_pause();
        }
        self.control.reset();
    }

    fn advance(&mut self) {
        while self.control.can_update(self.game.tick_interval()) {
            match self.game.tick() {
                Tick::Idle | Tick::Moved | Tick::Ate => {}
                Tick::Crashed(collision) => {
                    let text = match collision {
                        Collision::Wall => "Ouch, a wall",
                        Collision::Itself { .. } => "You bit yourself",
                    };
                    self.game_over(text);
                }
                Tick::BoardFull => self.game_over("The board is full, you win!"),
            }
        }
    }

    fn game_over(&mut self, text: &str) {
        self.control.reset();
        let score = self.game.score();
        if score > self.best_score {
            self.best_score = score;
        }
        info!("game over with score {} (best {})", score, self.best_score);
        self.messages.notify(text, self.palette.crashed_color, self.message_duration);
    }

    fn steer_key(keycode: KeyCode) -> Option<Dir> {
        use KeyCode::*;
        match keycode {
            Up | W => Some(Dir::Up),
            Down | S => Some(Dir::Down),
            Left | A => Some(Dir::Left),
            Right | D => Some(Dir::Right),
            _ => None,
        }
    }

    /// Everything but quitting, returns false for keys this screen
    /// doesn't use
    pub fn handle_key(&mut self, keycode: KeyCode) -> bool {
        if let Some(dir) = Self::steer_key(keycode) {
            self.game.steer(dir);
            return true;
        }

        match (keycode, self.game.state()) {
            (KeyCode::Space, State::Running | State::Paused) => {
                self.game.toggle_pause();
                self.control.reset();
            }
            (KeyCode::Space | KeyCode::Return, State::GameOver) => {
                self.game.restart();
                self.control.reset();
                self.messages.remove(MessageID::Notification);
            }
            (KeyCode::F, _) => {
                self.show_fps = !self.show_fps;
                if !self.show_fps {
                    self.messages.remove(MessageID::Fps);
                }
            }
            _ => return false,
        }
        true
    }

    /// Show game and graphics fps information in the top-right corner
    fn update_fps_message(&mut self) {
        let tps = self.control.measured_tps();
        let fps = self.control.measured_fps();
        self.messages.set(
            MessageID::Fps,
            Message::new(
                format!("ticks/s: {:.1}  fps: {:.1}", tps, fps),
                Position::TopRight,
                self.palette.dim_text_color,
                None,
            ),
        );
    }

    fn cell_rect(&self, cell: GridPoint, inset: f32) -> Rect {
        let Point { x, y } = self.offset + Point::of_cell(cell, self.cell_size);
        Rect::new(
            x + inset,
            y + inset,
            self.cell_size - 2. * inset,
            self.cell_size - 2. * inset,
        )
    }

    fn build_grid_mesh(&self, ctx: &Context) -> Result<Mesh> {
        let GridDim(side) = self.game.dim();
        let length = side as f32 * self.cell_size;
        let Point { x: left, y: top } = self.offset;

        let mut builder = MeshBuilder::new();
        for i in 0..=side {
            let d = i as f32 * self.cell_size;
            let color = if i == 0 || i == side {
                self.palette.border_color
            } else {
                self.palette.grid_color
            };
            builder.line(
                &[Point { x: left + d, y: top }, Point { x: left + d, y: top + length }],
                self.palette.grid_thickness,
                color,
            )?;
            builder.line(
                &[Point { x: left, y: top + d }, Point { x: left + length, y: top + d }],
                self.palette.grid_thickness,
                color,
            )?;
        }
        Ok(Mesh::from_data(ctx, builder.build()))
    }

    fn draw_board(&mut self, ctx: &Context, canvas: &mut Canvas) -> Result {
        if self.grid_mesh.is_none() {
            self.grid_mesh = Some(self.build_grid_mesh(ctx)?);
        }
        if let Some(mesh) = &self.grid_mesh {
            canvas.draw(mesh, DrawParam::default());
        }

        canvas.draw(
            &Quad,
            DrawParam::default()
                .dest_rect(self.cell_rect(self.game.food(), self.cell_size / 5.))
                .color(self.palette.food_color),
        );

        let snake_palette = match self.game.state() {
            State::Paused => &self.palette.paused_snake,
            _ => &self.palette.snake,
        };
        let len = self.game.body().len();
        for (seg, cell) in self.game.body().iter().enumerate().rev() {
            let color = if seg == 0 && self.game.is_game_over() {
                self.palette.crashed_color
            } else {
                snake_palette.segment_color(seg, len)
            };
            canvas.draw(
                &Quad,
                DrawParam::default().dest_rect(self.cell_rect(*cell, 1.)).color(color),
            );
        }
        Ok(())
    }

    fn draw_header(&self, canvas: &mut Canvas) {
        draw_text(
            canvas,
            format!("Score: {}   Best: {}", self.game.score(), self.best_score),
            Point { x: Self::MARGIN, y: Self::MARGIN },
            Message::FONT_SIZE,
            self.palette.text_color,
            TextAlign::Begin,
        );
    }

    fn draw_overlay(&self, canvas: &mut Canvas) {
        let (title, hint) = match self.game.state() {
            State::Running => return,
            State::Paused => ("Paused", "space to resume, tab for the wake-up screen"),
            State::GameOver => ("Game over", "space to play again"),
        };

        let GridDim(side) = self.game.dim();
        let length = side as f32 * self.cell_size;
        let board = Rect::new(self.offset.x, self.offset.y, length, length);
        canvas.draw(
            &Quad,
            DrawParam::default().dest_rect(board).color(self.palette.overlay_color),
        );

        let center = Point {
            x: self.offset.x + length / 2.,
            y: self.offset.y + length / 2. - 40.,
        };
        draw_text(canvas, title, center, 48., self.palette.text_color, TextAlign::Middle);
        draw_text(
            canvas,
            format!("Score: {}", self.game.score()),
            center + Point { x: 0., y: 56. },
            Message::FONT_SIZE,
            self.palette.text_color,
            TextAlign::Middle,
        );
        draw_text(
            canvas,
            hint,
            center + Point { x: 0., y: 88. },
            16.,
            self.palette.dim_text_color,
            TextAlign::Middle,
        );
    }
}

impl EventHandler<Error> for SnakeScreen {
    fn update(&mut self, ctx: &mut Context) -> Result {
        if self.game.state() == State::Running {
            self.control.feed(ctx.time.delta());
            self.advance();
        }
        Ok(())
    }

    fn draw(&mut self, ctx: &mut Context) -> Result {
        self.control.graphics_frame();
        if self.show_fps {
            self.update_fps_message();
        }

        let mut canvas = Canvas::from_frame(ctx, self.palette.background_color);
        self.draw_header(&mut canvas);
        self.draw_board(ctx, &mut canvas)?;
        self.draw_overlay(&mut canvas);
        self.messages.draw(ctx, &mut canvas);
        canvas.finish(ctx)?;
        Ok(())
    }

    fn key_down_event(&mut self, ctx: &mut Context, input: KeyInput, _repeated: bool) -> Result {
        if let Some(keycode) = input.keycode {
            if keycode == KeyCode::Escape {
                ctx.request_quit();
            } else {
                self.handle_key(keycode);
            }
        }
        Ok(())
    }
}
