//! The backend keeps profiles, wake-up settings and photos per user
//! and decides who may see and change what.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wake::{PhotoSubmission, WakeUpSettings};

pub use local::LocalBackend;
pub use retry::Retrying;

pub mod local;
pub mod retry;

/// Identity of a user as the backend knows it
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[derive(Display, From)]
#[serde(transparent)]
pub struct Principal(String);

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct UserProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[derive(clap::ValueEnum, Display)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[display(fmt = "admin")]
    Admin,
    #[display(fmt = "user")]
    User,
    #[default]
    #[display(fmt = "guest")]
    Guest,
}

/// One row of the admin overview
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct UserRecord {
    pub user: Principal,
    pub settings: WakeUpSettings,
    pub photo_count: usize,
}

pub trait Backend {
    fn caller(&self) -> &Principal;

    fn get_caller_user_profile(&mut self) -> Result<Option<UserProfile>>;
    /// Also registers the caller
    fn save_caller_user_profile(&mut self, profile: UserProfile) -> Result;
    fn get_user_profile(&mut self, user: &Principal) -> Result<Option<UserProfile>>;

    fn get_wake_up_time(&mut self) -> Result<Option<WakeUpSettings>>;
    fn set_wake_up_time(&mut self, settings: WakeUpSettings) -> Result;

    /// `photo_url` is a data URL, the backend records when it arrived
    fn submit_photo(&mut self, photo_url: String) -> Result;
    fn get_photo_submissions(&mut self) -> Result<Vec<PhotoSubmission>>;
    fn get_user_photo_submissions(&mut self, user: &Principal) -> Result<Vec<PhotoSubmission>>;

    fn get_caller_user_role(&mut self) -> Result<UserRole>;
    fn is_caller_admin(&mut self) -> Result<bool>;
    fn assign_caller_user_role(&mut self, user: &Principal, role: UserRole) -> Result;

    fn get_all_user_records(&mut self) -> Result<Vec<UserRecord>>;
    fn delete_user_data(&mut self, user: &Principal) -> Result;
}
