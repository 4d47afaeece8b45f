use std::path::Path;
use std::time::Duration;

use ggez::event::EventHandler;
use ggez::graphics::{Canvas, Color, DrawParam, Quad, Rect, TextAlign};
use ggez::input::keyboard::{KeyCode, KeyInput, KeyMods};
use ggez::Context;
use tracing::{info, warn};

use crate::app::message::{draw_text, Message, Messages};
use crate::app::palette::Palette;
use crate::app::prompt::{Prompt, PromptEvent, PromptKind};
use crate::backend::{Backend, UserProfile, UserRole};
use crate::basic::Point;
use crate::error::{Error, Result};
use crate::prefs::Prefs;
use crate::wake::timer::{current_time_label, target_time_label};
use crate::wake::{
    format_time_of_day, history, photo_required, Clock, HistoryEntry, Lateness, LatenessTimer,
    PhotoFile, PhotoSubmission, WakeUpSettings,
};

pub struct WakeScreen {
    backend: Box<dyn Backend>,
    clock: Box<dyn Clock>,
    timer: LatenessTimer,

    profile: Option<UserProfile>,
    role: UserRole,
    settings: Option<WakeUpSettings>,
    /// Edited with the keyboard, only sent on return
    draft: WakeUpSettings,
    submissions: Vec<PhotoSubmission>,

    prompt: Option<Prompt>,
    /// The key opening a prompt also arrives as text right after
    skip_char: Option<char>,

    palette: Palette,
    message_duration: Duration,
    messages: Messages,
}

impl WakeScreen {
    const HISTORY_ROWS: usize = 8;
    const LINE: f32 = 30.;
    const LEFT: f32 = 24.;

    pub fn new(backend: Box<dyn Backend>, clock: Box<dyn Clock>, prefs: &Prefs) -> Self {
        let mut screen = Self {
            backend,
            clock,
            timer: LatenessTimer::new(prefs.wake.check_interval()),

            profile: None,
            role: UserRole::Guest,
            settings: None,
            draft: WakeUpSettings::default(),
            submissions: vec![],

            prompt: None,
            skip_char: None,

            palette: Palette::dark(),
            message_duration: prefs.display.message_duration(),
            messages: Messages::default(),
        };
        let result = screen.refresh();
        screen.report(result, "");
        screen
    }

    /// Reload everything from the backend, a caller without a
    /// profile is asked for their name
    pub fn refresh(&mut self) -> Result {
        self.profile = self.backend.get_caller_user_profile()?;
        self.role = self.backend.get_caller_user_role()?;
        self.settings = self.backend.get_wake_up_time()?;
        self.submissions = self.backend.get_photo_submissions()?;
        self.draft = self.settings.unwrap_or_default();
        self.timer.invalidate();

        if self.profile.is_none() && self.prompt.is_none() {
            self.prompt = Some(Prompt::new(PromptKind::ProfileName));
        }
        Ok(())
    }

    /// Backend failures become notifications, the screen keeps going
    fn report(&mut self, result: Result, success: &str) {
        match result {
            Ok(()) => {
                if !success.is_empty() {
                    self.messages
                        .notify(success, self.palette.on_time_color, self.message_duration)
                }
            }
            Err(e) => {
                warn!("{:?}", e);
                self.messages
                    .notify(e.message(), self.palette.warning_color, self.message_duration);
            }
        }
    }

    /// Also called while the screen is hidden so the check keeps
    /// its pace
    pub fn poll_timer(&mut self) -> Option<Lateness> {
        let was_late = self.timer.current().is_late;
        let lateness = self.timer.poll(&*self.clock, self.settings.as_ref())?;
        if lateness.is_late && !was_late {
            info!("{} minutes past the wake-up time", lateness.minutes_late);
        }
        Some(lateness)
    }

    #[cfg(test)]
    pub fn lateness(&self) -> Lateness {
        self.timer.current()
    }

    pub fn photo_required(&self) -> bool {
        photo_required(
            self.timer.current(),
            &self.submissions,
            self.clock.today(),
            self.clock.offset(),
        )
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        history(&self.submissions, self.settings.as_ref(), self.clock.offset())
    }

    #[cfg(test)]
    pub fn draft(&self) -> WakeUpSettings {
        self.draft
    }

    pub fn has_prompt(&self) -> bool {
        self.prompt.is_some()
    }

    /// Wraps around midnight
    pub fn adjust_draft(&mut self, minutes: i64) {
        let (time, _) = self
            .draft
            .wake_up_time
            .overflowing_add_signed(chrono::Duration::minutes(minutes));
        self.draft.wake_up_time = time;
    }

    pub fn save_settings(&mut self) -> Result {
        self.backend.set_wake_up_time(self.draft)?;
        self.settings = self.backend.get_wake_up_time()?;
        self.timer.invalidate();
        info!("wake-up time saved: {}", self.draft);
        Ok(())
    }

    pub fn save_profile(&mut self, name: String) -> Result {
        let email = self.profile.as_ref().and_then(|p| p.email.clone());
        self.backend.save_caller_user_profile(UserProfile { name, email })?;
        self.refresh()
    }

    pub fn submit_photo(&mut self, path: &Path) -> Result {
        let photo = PhotoFile::open(path)?;
        self.backend.submit_photo(photo.to_data_url())?;
        self.submissions = self.backend.get_photo_submissions()?;
        info!("submitted {} ({})", photo.name(), photo.mime());
        Ok(())
    }

    fn open_prompt(&mut self, kind: PromptKind, opened_with: char) {
        self.prompt = Some(Prompt::new(kind));
        self.skip_char = Some(opened_with);
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(skip) = self.skip_char.take() {
            if c.eq_ignore_ascii_case(&skip) {
                return;
            }
        }
        if let Some(prompt) = &mut self.prompt {
            prompt.type_char(c);
        }
    }

    fn prompt_key(&mut self, keycode: KeyCode) {
        let event = match &mut self.prompt {
            Some(prompt) => prompt.key(keycode),
            None => return,
        };
        match event {
            None => {}
            Some(PromptEvent::Cancelled(_)) => self.prompt = None,
            Some(PromptEvent::Submitted(PromptKind::ProfileName, name)) => {
                let result = self.save_profile(name);
                if result.is_ok() {
                    self.prompt = None;
                }
                self.report(result, "Profile saved");
            }
            Some(PromptEvent::Submitted(PromptKind::PhotoPath, path)) => {
                let result = self.submit_photo(Path::new(&path));
                if result.is_ok() {
                    self.prompt = None;
                }
                self.report(result, "Photo submitted, well done");
            }
        }
    }

    /// Everything but quitting, returns false for keys this screen
    /// doesn't use
    pub fn handle_key(&mut self, keycode: KeyCode, mods: KeyMods) -> bool {
        if self.prompt.is_some() {
            self.prompt_key(keycode);
            return true;
        }

        let step = if mods.contains(KeyMods::SHIFT) { 1 } else { 5 };
        match keycode {
            KeyCode::Up => self.adjust_draft(60),
            KeyCode::Down => self.adjust_draft(-60),
            KeyCode::Right => self.adjust_draft(step),
            KeyCode::Left => self.adjust_draft(-step),
            KeyCode::E => self.draft.is_enabled = !self.draft.is_enabled,
            KeyCode::Return | KeyCode::NumpadEnter => {
                let result = self.save_settings();
                self.report(result, "Wake-up time saved");
            }
            KeyCode::P => self.open_prompt(PromptKind::PhotoPath, 'p'),
            KeyCode::N => self.open_prompt(PromptKind::ProfileName, 'n'),
            KeyCode::R => {
                let result = self.refresh();
                self.report(result, "");
            }
            _ => return false,
        }
        true
    }
}

// drawing
impl WakeScreen {
    fn draw_line<S: Into<String>>(
        &self,
        canvas: &mut Canvas,
        row: f32,
        text: S,
        size: f32,
        color: Color,
    ) {
        draw_text(
            canvas,
            text,
            Point { x: Self::LEFT, y: Self::LEFT + row * Self::LINE },
            size,
            color,
            TextAlign::Begin,
        );
    }

    fn draw_status(&self, canvas: &mut Canvas) {
        let palette = &self.palette;
        let who = match &self.profile {
            Some(profile) => format!("{} ({})", profile.name, self.role),
            None => format!("{} (guest)", self.backend.caller()),
        };
        self.draw_line(canvas, 0., "Wake Up Warrior", 32., palette.text_color);
        self.draw_line(canvas, 1.3, who, 18., palette.dim_text_color);

        self.draw_line(
            canvas,
            2.5,
            format!(
                "Now {}   Target {}",
                current_time_label(&*self.clock),
                target_time_label(self.settings.as_ref())
            ),
            Message::FONT_SIZE,
            palette.text_color,
        );

        let lateness = self.timer.current();
        let (status, color) = match self.settings {
            Some(settings) if settings.is_enabled => {
                if lateness.is_late {
                    (format!("Late by {} minutes", lateness.minutes_late), palette.late_color)
                } else {
                    ("On time so far".to_string(), palette.on_time_color)
                }
            }
            Some(_) => ("Challenge disabled".to_string(), palette.dim_text_color),
            None => ("No wake-up time set yet".to_string(), palette.dim_text_color),
        };
        self.draw_line(canvas, 3.5, status, Message::FONT_SIZE, color);

        let unsaved = if Some(self.draft) == self.settings { "" } else { "  (unsaved)" };
        self.draw_line(
            canvas,
            4.8,
            format!(
                "Edit: {} {}{}",
                format_time_of_day(self.draft.wake_up_time),
                if self.draft.is_enabled { "on" } else { "off" },
                unsaved
            ),
            18.,
            palette.highlight_color,
        );
    }

    fn draw_photo_banner(&self, canvas: &mut Canvas, width: f32) {
        let top = Self::LEFT + 6. * Self::LINE;
        let banner = Rect::new(
            Self::LEFT - 8.,
            top - 4.,
            width - 2. * Self::LEFT + 16.,
            2. * Self::LINE,
        );
        canvas.draw(
            &Quad,
            DrawParam::default().dest_rect(banner).color(self.palette.warning_color),
        );
        self.draw_line(
            canvas,
            6.,
            format!("You're {} minutes late! A photo is required", self.timer.current().minutes_late),
            Message::FONT_SIZE,
            self.palette.text_color,
        );
        self.draw_line(
            canvas,
            6.9,
            "Press P and show you're dressed to finish today's challenge",
            16.,
            self.palette.text_color,
        );
    }

    fn draw_history(&self, canvas: &mut Canvas) {
        let first_row = 8.5;
        self.draw_line(canvas, first_row, "History", Message::FONT_SIZE, self.palette.text_color);

        let entries = self.history();
        if entries.is_empty() {
            self.draw_line(canvas, first_row + 1., "No photos yet", 18., self.palette.dim_text_color);
        }
        for (i, entry) in entries.iter().take(Self::HISTORY_ROWS).enumerate() {
            let (text, color) = if entry.is_late() {
                (format!("{} min late", entry.minutes_late), self.palette.late_color)
            } else {
                ("on time".to_string(), self.palette.on_time_color)
            };
            self.draw_line(
                canvas,
                first_row + 1. + i as f32 * 0.8,
                format!("{}   {}", entry.local_time.format("%Y-%m-%d %H:%M"), text),
                18.,
                color,
            );
        }
    }

    fn draw_prompt(&self, canvas: &mut Canvas, prompt: &Prompt, (width, height): (f32, f32)) {
        canvas.draw(
            &Quad,
            DrawParam::default()
                .dest_rect(Rect::new(0., 0., width, height))
                .color(self.palette.overlay_color),
        );
        let center = Point { x: width / 2., y: height / 2. - 40. };
        draw_text(
            canvas,
            prompt.kind().label(),
            center,
            Message::FONT_SIZE,
            self.palette.text_color,
            TextAlign::Middle,
        );
        draw_text(
            canvas,
            format!("{}_", prompt.input()),
            center + Point { x: 0., y: 40. },
            Message::FONT_SIZE,
            self.palette.highlight_color,
            TextAlign::Middle,
        );
        draw_text(
            canvas,
            "return to confirm, escape to cancel",
            center + Point { x: 0., y: 80. },
            16.,
            self.palette.dim_text_color,
            TextAlign::Middle,
        );
    }

    fn draw_help(&self, canvas: &mut Canvas, height: f32) {
        draw_text(
            canvas,
            "arrows: time   E: on/off   return: save   P: photo   N: name   R: reload   tab: snake",
            Point { x: Self::LEFT, y: height - Self::LINE },
            14.,
            self.palette.dim_text_color,
            TextAlign::Begin,
        );
    }
}

impl EventHandler<Error> for WakeScreen {
    fn update(&mut self, _ctx: &mut Context) -> Result {
        self.poll_timer();
        Ok(())
    }

    fn draw(&mut self, ctx: &mut Context) -> Result {
        let size = ctx.gfx.drawable_size();
        let mut canvas = Canvas::from_frame(ctx, self.palette.background_color);

        self.draw_status(&mut canvas);
        if self.photo_required() {
            self.draw_photo_banner(&mut canvas, size.0);
        }
        self.draw_history(&mut canvas);
        self.draw_help(&mut canvas, size.1);
        if let Some(prompt) = &self.prompt {
            self.draw_prompt(&mut canvas, prompt, size);
        }
        self.messages.draw(ctx, &mut canvas);

        canvas.finish(ctx)?;
        Ok(())
    }

    fn key_down_event(&mut self, ctx: &mut Context, input: KeyInput, _repeated: bool) -> Result {
        if let Some(keycode) = input.keycode {
            if keycode == KeyCode::Escape && self.prompt.is_none() {
                ctx.request_quit();
            } else {
                self.handle_key(keycode, input.mods);
            }
        }
        Ok(())
    }

    fn text_input_event(&mut self, _ctx: &mut Context, character: char) -> Result {
        self.type_char(character);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::message::MessageID;
    use crate::backend::LocalBackend;
    use crate::wake::FixedClock;
    use chrono::{FixedOffset, NaiveDate};
    use std::fs;
    use std::rc::Rc;

    fn clock(h: u32, m: u32) -> Rc<FixedClock> {
        let local = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        Rc::new(FixedClock::at_local(local, FixedOffset::east_opt(3600).unwrap()))
    }

    fn screen(clock: &Rc<FixedClock>) -> WakeScreen {
        let backend = LocalBackend::in_memory("alice".into()).with_clock(Box::new(clock.clone()));
        WakeScreen::new(Box::new(backend), Box::new(clock.clone()), &Prefs::default())
    }

    fn type_line(screen: &mut WakeScreen, text: &str) {
        text.chars().for_each(|c| screen.type_char(c));
        screen.handle_key(KeyCode::Return, KeyMods::empty());
    }

    fn notification(screen: &WakeScreen) -> Option<&str> {
        screen
            .messages
            .get(MessageID::Notification)
            .map(|m| m.text.as_str())
    }

    #[test]
    fn test_new_user_is_asked_for_a_name() {
        let clock = clock(6, 0);
        let mut screen = screen(&clock);
        assert!(screen.has_prompt());
        assert_eq!(screen.role, UserRole::Guest);

        type_line(&mut screen, "Alice");
        assert!(!screen.has_prompt());
        assert_eq!(screen.profile.as_ref().map(|p| p.name.as_str()), Some("Alice"));
        assert_eq!(screen.role, UserRole::Admin);
        assert_eq!(notification(&screen), Some("Profile saved"));
    }

    #[test]
    fn test_edit_and_save_wake_up_time() {
        let clock = clock(7, 45);
        let mut screen = screen(&clock);
        type_line(&mut screen, "Alice");
        assert_eq!(screen.poll_timer(), Some(Lateness::ON_TIME));

        // 07:00 by default, back to 06:00 and down to 05:58
        assert_eq!(screen.draft(), WakeUpSettings::default());
        screen.handle_key(KeyCode::Down, KeyMods::empty());
        screen.handle_key(KeyCode::Left, KeyMods::SHIFT);
        screen.handle_key(KeyCode::Left, KeyMods::SHIFT);
        assert_eq!(screen.draft(), WakeUpSettings::new(5, 58, true).unwrap());
        assert_eq!(screen.settings, None);

        screen.handle_key(KeyCode::Return, KeyMods::empty());
        assert_eq!(screen.settings, Some(WakeUpSettings::new(5, 58, true).unwrap()));
        // saving forces a new check
        assert_eq!(
            screen.poll_timer(),
            Some(Lateness { is_late: true, minutes_late: 107 })
        );
    }

    #[test]
    fn test_draft_wraps_around_midnight() {
        let clock = clock(6, 0);
        let mut screen = screen(&clock);
        screen.draft = WakeUpSettings::new(23, 58, true).unwrap();
        screen.adjust_draft(5);
        assert_eq!(screen.draft(), WakeUpSettings::new(0, 3, true).unwrap());
        screen.adjust_draft(-60);
        assert_eq!(screen.draft(), WakeUpSettings::new(23, 3, true).unwrap());
    }

    #[test]
    fn test_late_user_must_submit_a_photo() {
        let clock = clock(7, 0);
        let mut screen = screen(&clock);
        type_line(&mut screen, "Alice");
        screen.handle_key(KeyCode::Return, KeyMods::empty());
        screen.poll_timer();
        assert!(!screen.photo_required());

        clock.advance(chrono::Duration::minutes(20));
        screen.poll_timer();
        assert!(screen.lateness().is_late);
        assert!(screen.photo_required());

        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        let selfie = dir.path().join("dressed.jpg");
        fs::write(&notes, "not a picture").unwrap();
        fs::write(&selfie, [0xff, 0xd8, 0xff]).unwrap();

        screen.handle_key(KeyCode::P, KeyMods::empty());
        type_line(&mut screen, notes.to_str().unwrap());
        assert!(screen.has_prompt(), "a rejected file keeps the prompt open");
        assert!(notification(&screen).unwrap().starts_with("not an image file"));
        assert!(screen.photo_required());

        screen.handle_key(KeyCode::Escape, KeyMods::empty());
        assert!(!screen.has_prompt());
        screen.handle_key(KeyCode::P, KeyMods::empty());
        type_line(&mut screen, selfie.to_str().unwrap());
        assert!(!screen.has_prompt());
        assert!(!screen.photo_required());

        let history = screen.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].minutes_late, 20);
        assert!(history[0].submission.photo_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_guest_cannot_save() {
        let clock = clock(7, 0);
        let mut screen = screen(&clock);
        screen.handle_key(KeyCode::Escape, KeyMods::empty());
        assert!(!screen.has_prompt());

        screen.handle_key(KeyCode::Return, KeyMods::empty());
        assert!(notification(&screen).unwrap().starts_with("not allowed"));
        assert_eq!(screen.settings, None);
    }
}
