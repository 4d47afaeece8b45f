use std::collections::HashMap;
use std::time::{Duration, Instant};

use ggez::graphics::{Canvas, Color, DrawParam, PxScale, Text, TextAlign, TextLayout};
use ggez::Context;

use crate::basic::Point;

/// Finite number of possible messages
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum MessageID {
    /// Persistent fps view
    Fps,
    /// Temporary info after saving, submitting, failing, ...
    Notification,
}

#[derive(Copy, Clone, Debug)]
pub enum Position {
    TopRight,
    BottomMiddle,
}

impl Position {
    fn layout(self) -> TextLayout {
        let (h_align, v_align) = match self {
            Position::TopRight => (TextAlign::End, TextAlign::Begin),
            Position::BottomMiddle => (TextAlign::Middle, TextAlign::End),
        };
        TextLayout { h_align, v_align }
    }

    fn dest(self, margin: f32, (width, height): (f32, f32)) -> Point {
        match self {
            Position::TopRight => Point { x: width - margin, y: margin },
            Position::BottomMiddle => Point { x: width / 2., y: height - margin },
        }
    }
}

pub struct Message {
    pub text: String,
    pub position: Position,
    pub color: Color,
    // None means unlimited duration
    pub disappear: Option<Instant>,
}

impl Message {
    pub const MARGIN: f32 = 12.;
    pub const FONT_SIZE: f32 = 22.;
    /// How long before disappearing a message starts fading out
    const FADE: Duration = Duration::from_millis(300);

    pub fn new<S: ToString>(text: S, position: Position, color: Color, duration: Option<Duration>) -> Self {
        Self {
            text: text.to_string(),
            position,
            color,
            disappear: duration.map(|d| Instant::now() + d),
        }
    }

    /// None once the message has outlived its duration
    pub fn alpha_at(&self, now: Instant) -> Option<f32> {
        let deadline = match self.disappear {
            None => return Some(self.color.a),
            Some(deadline) => deadline,
        };
        let time_left = deadline.checked_duration_since(now)?;
        if time_left >= Self::FADE {
            return Some(self.color.a);
        }
        let linear = time_left.as_secs_f32() / Self::FADE.as_secs_f32();
        Some(self.color.a * ezing::sine_inout(linear))
    }

    fn draw(&self, canvas: &mut Canvas, size: (f32, f32), alpha: f32) {
        let mut text = Text::new(self.text.as_str());
        text.set_scale(PxScale::from(Self::FONT_SIZE))
            .set_layout(self.position.layout());

        let dest = self.position.dest(Self::MARGIN, size);
        let color = Color { a: alpha, ..self.color };
        canvas.draw(&text, DrawParam::default().dest(dest).color(color));
    }
}

/// All messages currently on a screen, at most one per id
#[derive(Default)]
pub struct Messages {
    messages: HashMap<MessageID, Message>,
}

impl Messages {
    /// Display a notification at the bottom with limited duration,
    /// overwrite any previous notification
    pub fn notify<S: ToString>(&mut self, text: S, color: Color, duration: Duration) {
        self.messages.insert(
            MessageID::Notification,
            Message::new(text, Position::BottomMiddle, color, Some(duration)),
        );
    }

    pub fn set(&mut self, id: MessageID, message: Message) {
        self.messages.insert(id, message);
    }

    pub fn remove(&mut self, id: MessageID) {
        self.messages.remove(&id);
    }

    #[cfg(test)]
    pub fn get(&self, id: MessageID) -> Option<&Message> {
        self.messages.get(&id)
    }

    /// Draw messages and remove the ones that have outlived
    /// their durations
    pub fn draw(&mut self, ctx: &Context, canvas: &mut Canvas) {
        let now = Instant::now();
        let size = ctx.gfx.drawable_size();
        self.messages.retain(|_, message| match message.alpha_at(now) {
            Some(alpha) => {
                message.draw(canvas, size, alpha);
                true
            }
            None => false,
        });
    }
}

/// Plain text anywhere on the canvas
pub fn draw_text<S: Into<String>>(
    canvas: &mut Canvas,
    text: S,
    dest: Point,
    font_size: f32,
    color: Color,
    h_align: TextAlign,
) {
    let mut text = Text::new(text.into());
    text.set_scale(PxScale::from(font_size)).set_layout(TextLayout {
        h_align,
        v_align: TextAlign::Begin,
    });
    canvas.draw(&text, DrawParam::default().dest(dest).color(color));
}

#[test]
fn test_fade_out() {
    let start = Instant::now();
    let message = Message::new("saved", Position::TopRight, Color::WHITE, Some(Duration::from_secs(1)));

    assert_eq!(message.alpha_at(start), Some(1.));
    let fading = message.alpha_at(start + Duration::from_millis(850)).unwrap();
    assert!(fading > 0. && fading < 1., "{}", fading);
    assert_eq!(message.alpha_at(start + Duration::from_secs(2)), None);

    let fps = Message::new("u: 60", Position::TopRight, Color::WHITE, None);
    assert_eq!(fps.alpha_at(start + Duration::from_secs(3600)), Some(1.));
}
