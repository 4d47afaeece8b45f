use tracing::warn;

use crate::backend::{Backend, Principal, UserProfile, UserRecord, UserRole};
use crate::error::{ErrorConversion, Result};
use crate::wake::{PhotoSubmission, WakeUpSettings};

pub const DEFAULT_RETRIES: usize = 1;

/// Repeats calls that failed because the backend was unavailable,
/// any other error is returned straight away
pub struct Retrying<B> {
    inner: B,
    retries: usize,
}

impl<B: Backend> Retrying<B> {
    #[cfg(test)]
    pub fn new(inner: B) -> Self {
        Self::with_retries(inner, DEFAULT_RETRIES)
    }

    pub fn with_retries(inner: B, retries: usize) -> Self {
        Self { inner, retries }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn call<T>(&mut self, op: &'static str, mut f: impl FnMut(&mut B) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match f(&mut self.inner) {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!("{} failed ({}), retry {}/{}", op, e, attempt, self.retries);
                }
                result => return result.with_trace_step(op),
            }
        }
    }
}

impl<B: Backend> Backend for Retrying<B> {
    fn caller(&self) -> &Principal {
        self.inner.caller()
    }

    fn get_caller_user_profile(&mut self) -> Result<Option<UserProfile>> {
        self.call("get_caller_user_profile", |b| b.get_caller_user_profile())
    }

    fn save_caller_user_profile(&mut self, profile: UserProfile) -> Result {
        self.call("save_caller_user_profile", |b| {
            b.save_caller_user_profile(profile.clone())
        })
    }

    fn get_user_profile(&mut self, user: &Principal) -> Result<Option<UserProfile>> {
        self.call("get_user_profile", |b| b.get_user_profile(user))
    }

    fn get_wake_up_time(&mut self) -> Result<Option<WakeUpSettings>> {
        self.call("get_wake_up_time", |b| b.get_wake_up_time())
    }

    fn set_wake_up_time(&mut self, settings: WakeUpSettings) -> Result {
        self.call("set_wake_up_time", |b| b.set_wake_up_time(settings))
    }

    fn submit_photo(&mut self, photo_url: String) -> Result {
        self.call("submit_photo", |b| b.submit_photo(photo_url.clone()))
    }

    fn get_photo_submissions(&mut self) -> Result<Vec<PhotoSubmission>> {
        self.call("get_photo_submissions", |b| b.get_photo_submissions())
    }

    fn get_user_photo_submissions(&mut self, user: &Principal) -> Result<Vec<PhotoSubmission>> {
        self.call("get_user_photo_submissions", |b| {
            b.get_user_photo_submissions(user)
        })
    }

    fn get_caller_user_role(&mut self) -> Result<UserRole> {
        self.call("get_caller_user_role", |b| b.get_caller_user_role())
    }

    fn is_caller_admin(&mut self) -> Result<bool> {
        self.call("is_caller_admin", |b| b.is_caller_admin())
    }

    fn assign_caller_user_role(&mut self, user: &Principal, role: UserRole) -> Result {
        self.call("assign_caller_user_role", |b| {
            b.assign_caller_user_role(user, role)
        })
    }

    fn get_all_user_records(&mut self) -> Result<Vec<UserRecord>> {
        self.call("get_all_user_records", |b| b.get_all_user_records())
    }

    fn delete_user_data(&mut self, user: &Principal) -> Result {
        self.call("delete_user_data", |b| b.delete_user_data(user))
    }
}
