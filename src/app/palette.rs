use ggez::graphics::Color;
use hsl::HSL;

macro_rules! gray {
    ($lightness:expr) => {
        Color {
            r: $lightness,
            g: $lightness,
            b: $lightness,
            a: 1.,
        }
    };
}

lazy_static! {
    static ref FOOD_COLOR: Color = Color::from_rgb(255, 64, 64);
    static ref CRASHED_COLOR: Color = Color::from_rgb(255, 0, 128);
    static ref LATE_COLOR: Color = Color::from_rgb(235, 168, 52);
    static ref ON_TIME_COLOR: Color = Color::from_rgb(0, 255, 128);
    static ref WARNING_COLOR: Color = Color::from_rgb(200, 0, 0);
}

/// Segment colors, 0 is the head
pub enum SnakePalette {
    Gradient { head: Color, tail: Color },
    HSLGradient { head_hue: f64, tail_hue: f64, lightness: f64 },
}

impl SnakePalette {
    const HSL_GREEN: (f64, f64) = (150., 90.);

    pub fn gray_gradient() -> Self {
        Self::Gradient { head: gray!(0.72), tail: gray!(0.25) }
    }

    pub fn green() -> Self {
        Self::HSLGradient {
            head_hue: Self::HSL_GREEN.0,
            tail_hue: Self::HSL_GREEN.1,
            lightness: 0.45,
        }
    }

    pub fn segment_color(&self, seg: usize, len: usize) -> Color {
        let head_ratio = if len <= 1 {
            1.
        } else {
            1. - seg as f32 / (len - 1) as f32
        };
        match *self {
            Self::Gradient { head, tail } => {
                let tail_ratio = 1. - head_ratio;
                Color {
                    r: head_ratio * head.r + tail_ratio * tail.r,
                    g: head_ratio * head.g + tail_ratio * tail.g,
                    b: head_ratio * head.b + tail_ratio * tail.b,
                    a: 1.,
                }
            }
            Self::HSLGradient { head_hue, tail_hue, lightness } => {
                let hue = tail_hue + (head_hue - tail_hue) * head_ratio as f64;
                let hsl = HSL { h: hue.rem_euclid(360.), s: 1., l: lightness };
                Color::from(hsl.to_rgb())
            }
        }
    }
}

pub struct Palette {
    pub grid_thickness: f32,

    pub background_color: Color,
    pub grid_color: Color,
    pub border_color: Color,
    pub text_color: Color,
    pub dim_text_color: Color,
    pub overlay_color: Color,

    pub food_color: Color,
    pub crashed_color: Color,
    pub snake: SnakePalette,
    pub paused_snake: SnakePalette,

    pub late_color: Color,
    pub on_time_color: Color,
    pub warning_color: Color,
    pub highlight_color: Color,
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            grid_thickness: 1.,

            background_color: Color::BLACK,
            grid_color: gray!(0.12),
            border_color: gray!(0.5),
            text_color: Color::WHITE,
            dim_text_color: gray!(0.6),
            overlay_color: Color::new(0., 0., 0., 0.6),

            food_color: *FOOD_COLOR,
            crashed_color: *CRASHED_COLOR,
            snake: SnakePalette::green(),
            paused_snake: SnakePalette::gray_gradient(),

            late_color: *LATE_COLOR,
            on_time_color: *ON_TIME_COLOR,
            warning_color: *WARNING_COLOR,
            highlight_color: Color::from_rgb(16, 169, 224),
        }
    }
}

#[test]
fn test_gradient_ends() {
    let palette = SnakePalette::Gradient { head: Color::WHITE, tail: Color::BLACK };
    assert_eq!(palette.segment_color(0, 5), Color::WHITE);
    assert_eq!(palette.segment_color(4, 5), Color::BLACK);
    // a single segment is all head
    assert_eq!(palette.segment_color(0, 1), Color::WHITE);
}
