use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::backend::{Backend, Principal, UserProfile, UserRole};
use crate::error::{ErrorType, Result};
use crate::wake::{
    compute_lateness, history, photo_required, Clock, PhotoFile, WakeUpSettings,
};

#[derive(Parser, Debug)]
#[command(name = "wake_warrior", version)]
#[command(about = "Get up on time or prove you're dressed, then play some snake")]
pub struct Cli {
    /// Config file, defaults to wake_warrior.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum StartScreen {
    #[default]
    Wake,
    Snake,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the game window (the default)
    Play {
        #[arg(long, value_enum, default_value_t = StartScreen::Wake)]
        screen: StartScreen,
    },
    /// Wake-up time, lateness and today's photo
    Status,
    /// Set the daily wake-up time, HH:MM
    SetWakeTime {
        time: String,
        /// Keep the time but turn the challenge off
        #[arg(long)]
        disable: bool,
    },
    /// Show the profile, or save it when a name is given
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Submit a photo proving you're up and dressed
    SubmitPhoto { file: PathBuf },
    /// Past photos, newest first
    History {
        /// Someone else's history (admin only)
        #[arg(long)]
        of: Option<String>,
    },
    /// Print the caller's role
    Role,
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Every user with a wake-up time
    Records,
    Assign {
        user: String,
        #[arg(value_enum)]
        role: UserRole,
    },
    /// Remove all data of a user
    Delete { user: String },
}

fn print_settings(out: &mut dyn Write, settings: Option<&WakeUpSettings>) -> Result {
    match settings {
        Some(settings) => writeln!(out, "wake-up time: {}", settings)?,
        None => writeln!(out, "wake-up time: not set")?,
    }
    Ok(())
}

fn status(backend: &mut dyn Backend, clock: &dyn Clock, out: &mut dyn Write) -> Result {
    let role = backend.get_caller_user_role()?;
    match backend.get_caller_user_profile()? {
        Some(profile) => writeln!(out, "{} ({}, {})", profile.name, backend.caller(), role)?,
        None => writeln!(out, "{} ({}, no profile yet)", backend.caller(), role)?,
    }

    let settings = backend.get_wake_up_time()?;
    print_settings(out, settings.as_ref())?;

    let now = clock.local_now();
    let lateness = compute_lateness(now, settings.as_ref());
    if lateness.is_late {
        writeln!(out, "now {}, late by {} minutes", now.format("%H:%M"), lateness.minutes_late)?;
    } else {
        writeln!(out, "now {}, on time", now.format("%H:%M"))?;
    }

    let submissions = backend.get_photo_submissions()?;
    if photo_required(lateness, &submissions, clock.today(), clock.offset()) {
        writeln!(out, "a photo is required today, use submit-photo")?;
    }
    Ok(())
}

fn print_history(
    out: &mut dyn Write,
    backend: &mut dyn Backend,
    clock: &dyn Clock,
    of: Option<&str>,
) -> Result {
    let (submissions, settings) = match of {
        None => (backend.get_photo_submissions()?, backend.get_wake_up_time()?),
        Some(user) => {
            let user = Principal::from(user);
            let submissions = backend.get_user_photo_submissions(&user)?;
            let settings = backend
                .get_all_user_records()?
                .into_iter()
                .find(|record| record.user == user)
                .map(|record| record.settings);
            (submissions, settings)
        }
    };

    let entries = history(&submissions, settings.as_ref(), clock.offset());
    if entries.is_empty() {
        writeln!(out, "no photos yet")?;
    }
    for entry in entries {
        let lateness = if entry.is_late() {
            format!("{} min late", entry.minutes_late)
        } else {
            "on time".to_string()
        };
        writeln!(out, "{}  {}", entry.local_time.format("%Y-%m-%d %H:%M"), lateness)?;
    }
    Ok(())
}

/// Everything except `play`, which needs a window
pub fn execute(
    command: &Command,
    backend: &mut dyn Backend,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result {
    match command {
        Command::Play { .. } => {
            return Err(ErrorType::InvalidInput("play opens a window".to_string()).into())
        }
        Command::Status => status(backend, clock, out)?,
        Command::SetWakeTime { time, disable } => {
            let settings = WakeUpSettings::parse(time, !disable)?;
            backend.set_wake_up_time(settings)?;
            print_settings(out, Some(&settings))?;
        }
        Command::Profile { name: None, email: None } => match backend.get_caller_user_profile()? {
            Some(UserProfile { name, email: Some(email) }) => writeln!(out, "{} <{}>", name, email)?,
            Some(UserProfile { name, email: None }) => writeln!(out, "{}", name)?,
            None => writeln!(out, "no profile yet, set one with --name")?,
        },
        Command::Profile { name, email } => {
            let current = backend.get_caller_user_profile()?;
            let name = match (name, &current) {
                (Some(name), _) => name.clone(),
                (None, Some(current)) => current.name.clone(),
                (None, None) => {
                    return Err(ErrorType::InvalidInput("a new profile needs --name".to_string()).into())
                }
            };
            let email = email.clone().or_else(|| current.and_then(|c| c.email));
            backend.save_caller_user_profile(UserProfile { name, email })?;
            writeln!(out, "profile saved, role: {}", backend.get_caller_user_role()?)?;
        }
        Command::SubmitPhoto { file } => {
            let photo = PhotoFile::open(file)?;
            backend.submit_photo(photo.to_data_url())?;
            writeln!(out, "submitted {}", photo.name())?;
        }
        Command::History { of } => print_history(out, backend, clock, of.as_deref())?,
        Command::Role => writeln!(out, "{}", backend.get_caller_user_role()?)?,
        Command::Admin(AdminCommand::Records) => {
            for record in backend.get_all_user_records()? {
                writeln!(out, "{}  {}  {} photos", record.user, record.settings, record.photo_count)?;
            }
        }
        Command::Admin(AdminCommand::Assign { user, role }) => {
            backend.assign_caller_user_role(&Principal::from(user.as_str()), *role)?;
            writeln!(out, "{} is now {}", user, role)?;
        }
        Command::Admin(AdminCommand::Delete { user }) => {
            backend.delete_user_data(&Principal::from(user.as_str()))?;
            writeln!(out, "deleted {}", user)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::wake::FixedClock;
    use chrono::{FixedOffset, NaiveDate};
    use std::rc::Rc;

    struct Session {
        backend: LocalBackend,
        clock: Rc<FixedClock>,
    }

    impl Session {
        fn new() -> Self {
            let local = NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(7, 45, 0)
                .unwrap();
            let clock = Rc::new(FixedClock::at_local(local, FixedOffset::east_opt(0).unwrap()));
            let backend = LocalBackend::in_memory("alice".into()).with_clock(Box::new(clock.clone()));
            Self { backend, clock }
        }

        fn run(&mut self, args: &[&str]) -> Result<String> {
            let cli = Cli::try_parse_from(["wake_warrior"].iter().chain(args))
                .map_err(|e| ErrorType::InvalidInput(e.to_string()))?;
            let mut out = vec![];
            let command = cli.command.unwrap_or(Command::Play { screen: StartScreen::Wake });
            execute(&command, &mut self.backend, &*self.clock, &mut out)?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
    }

    #[test]
    fn test_parse() {
        let cli = Cli::try_parse_from(["wake_warrior", "--user", "bob", "play", "--screen", "snake"]).unwrap();
        assert_eq!(cli.user.as_deref(), Some("bob"));
        assert!(matches!(cli.command, Some(Command::Play { screen: StartScreen::Snake })));

        let cli = Cli::try_parse_from(["wake_warrior"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["wake_warrior", "admin", "assign", "bob", "admin"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Admin(AdminCommand::Assign { role: UserRole::Admin, .. }))
        ));
        assert!(Cli::try_parse_from(["wake_warrior", "admin", "assign", "bob", "boss"]).is_err());
    }

    #[test]
    fn test_late_status() {
        let mut session = Session::new();
        assert_eq!(
            session.run(&["profile"]).unwrap(),
            "no profile yet, set one with --name\n"
        );
        assert_eq!(
            session.run(&["profile", "--name", "Alice"]).unwrap(),
            "profile saved, role: admin\n"
        );
        assert_eq!(
            session.run(&["set-wake-time", "07:00"]).unwrap(),
            "wake-up time: every day at 07:00\n"
        );
        assert_eq!(
            session.run(&["status"]).unwrap(),
            "Alice (alice, admin)\n\
             wake-up time: every day at 07:00\n\
             now 07:45, late by 45 minutes\n\
             a photo is required today, use submit-photo\n"
        );
    }

    #[test]
    fn test_photo_and_history() {
        let mut session = Session::new();
        session.run(&["profile", "--name", "Alice", "--email", "a@example.com"]).unwrap();
        session.run(&["set-wake-time", "07:30"]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("up.png");
        std::fs::write(&photo, b"png").unwrap();
        let out = session.run(&["submit-photo", photo.to_str().unwrap()]).unwrap();
        assert!(out.starts_with("submitted "));

        let e = session.run(&["submit-photo", "notes.txt"]).unwrap_err();
        assert!(matches!(e.kind(), ErrorType::InvalidFileType(_)));

        assert_eq!(session.run(&["history"]).unwrap(), "2024-05-17 07:45  15 min late\n");
        assert!(!session.run(&["status"]).unwrap().contains("photo is required"));
        assert_eq!(session.run(&["profile"]).unwrap(), "Alice <a@example.com>\n");
    }

    #[test]
    fn test_admin_commands() {
        let mut session = Session::new();
        session.run(&["profile", "--name", "Alice"]).unwrap();
        session.backend.set_caller("bob".into());
        session.run(&["profile", "--name", "Bob"]).unwrap();
        session.run(&["set-wake-time", "06:00", "--disable"]).unwrap();
        assert_eq!(session.run(&["role"]).unwrap(), "user\n");

        let e = session.run(&["admin", "records"]).unwrap_err();
        assert!(matches!(e.kind(), ErrorType::Unauthorized(_)));

        session.backend.set_caller("alice".into());
        assert_eq!(
            session.run(&["admin", "records"]).unwrap(),
            "bob  challenge disabled  0 photos\n"
        );
        assert_eq!(session.run(&["history", "--of", "bob"]).unwrap(), "no photos yet\n");
        assert_eq!(session.run(&["admin", "assign", "bob", "admin"]).unwrap(), "bob is now admin\n");
        assert_eq!(session.run(&["admin", "delete", "bob"]).unwrap(), "deleted bob\n");
        assert_eq!(session.run(&["admin", "records"]).unwrap(), "");
    }
}
