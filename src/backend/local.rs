use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{Backend, Principal, UserProfile, UserRecord, UserRole};
use crate::error::{Error, ErrorConversion, ErrorType, Result};
use crate::wake::{Clock, PhotoSubmission, SystemClock, WakeUpSettings};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
struct UserData {
    role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<WakeUpSettings>,
    photos: Vec<PhotoSubmission>,
}

impl UserData {
    fn role(&self) -> UserRole {
        match self.profile {
            Some(_) => self.role,
            None => UserRole::Guest,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
struct Store {
    users: BTreeMap<Principal, UserData>,
}

impl Store {
    /// A role only takes effect once the user has a profile
    fn role_of(&self, user: &Principal) -> UserRole {
        self.users.get(user).map(UserData::role).unwrap_or_default()
    }

    fn has_admin(&self) -> bool {
        self.users.values().any(|data| data.role() == UserRole::Admin)
    }
}

/// A backend living in this process, optionally kept in a JSON file
/// so the command line and the game window share state
pub struct LocalBackend {
    caller: Principal,
    store: Store,
    path: Option<PathBuf>,
    clock: Box<dyn Clock>,
}

impl LocalBackend {
    pub fn in_memory(caller: Principal) -> Self {
        Self {
            caller,
            store: Store::default(),
            path: None,
            clock: Box::new(SystemClock),
        }
    }

    /// The file is created on the first change, a missing file is an
    /// empty store
    pub fn open(caller: Principal, path: &Path) -> Result<Self> {
        let mut backend = Self {
            path: Some(path.to_path_buf()),
            ..Self::in_memory(caller)
        };
        backend.refresh()?;
        Ok(backend)
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn set_caller(&mut self, caller: Principal) {
        self.caller = caller;
    }

    // another process may have written in the meantime
    fn refresh(&mut self) -> Result {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        self.store = match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json)
                .map_err(Error::from)
                .with_trace_step(format!("parsing {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Store::default(),
            Err(e) => return Err(unavailable(path, e)),
        };
        Ok(())
    }

    fn persist(&self) -> Result {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        let json = serde_json::to_string_pretty(&self.store)?;
        // write then rename so a reader never sees half a file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| unavailable(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| unavailable(path, e))?;
        debug!("saved {} users to {}", self.store.users.len(), path.display());
        Ok(())
    }

    fn caller_role(&self) -> UserRole {
        self.store.role_of(&self.caller)
    }

    fn caller_data(&self) -> Option<&UserData> {
        match self.caller_role() {
            UserRole::Guest => None,
            _ => self.store.users.get(&self.caller),
        }
    }

    fn require_registered(&self, what: &'static str) -> Result<()> {
        match self.caller_role() {
            UserRole::Guest => Err(ErrorType::Unauthorized(what).into()),
            _ => Ok(()),
        }
    }

    fn require_admin(&self, what: &'static str) -> Result<()> {
        match self.caller_role() {
            UserRole::Admin => Ok(()),
            _ => Err(ErrorType::Unauthorized(what).into()),
        }
    }

    fn registered_caller_data(&mut self, what: &'static str) -> Result<&mut UserData> {
        self.require_registered(what)?;
        Ok(self.store.users.entry(self.caller.clone()).or_default())
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> Error {
    ErrorType::Unavailable(format!("{}: {}", path.display(), e)).into()
}

fn clean_profile(profile: UserProfile) -> Result<UserProfile> {
    let name = profile.name.trim();
    if name.is_empty() {
        return Err(ErrorType::InvalidInput("name must not be empty".to_string()).into());
    }
    let email = profile
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());
    Ok(UserProfile { name: name.to_string(), email })
}

impl Backend for LocalBackend {
    fn caller(&self) -> &Principal {
        &self.caller
    }

    fn get_caller_user_profile(&mut self) -> Result<Option<UserProfile>> {
        self.refresh()?;
        Ok(self.caller_data().and_then(|data| data.profile.clone()))
    }

    fn save_caller_user_profile(&mut self, profile: UserProfile) -> Result {
        let profile = clean_profile(profile)?;
        self.refresh()?;

        let first_admin = !self.store.has_admin();
        let data = self.store.users.entry(self.caller.clone()).or_default();
        // a role assigned ahead of registration is kept
        if data.profile.is_none() && data.role == UserRole::Guest {
            data.role = if first_admin { UserRole::Admin } else { UserRole::User };
            info!("registered {} as {}", self.caller, data.role);
        }
        data.profile = Some(profile);
        self.persist()
    }

    fn get_user_profile(&mut self, user: &Principal) -> Result<Option<UserProfile>> {
        self.refresh()?;
        if user != &self.caller {
            self.require_admin("reading another user's profile")?;
        }
        Ok(self.store.users.get(user).and_then(|data| data.profile.clone()))
    }

    fn get_wake_up_time(&mut self) -> Result<Option<WakeUpSettings>> {
        self.refresh()?;
        Ok(self.caller_data().and_then(|data| data.settings))
    }

    fn set_wake_up_time(&mut self, settings: WakeUpSettings) -> Result {
        self.refresh()?;
        self.registered_caller_data("setting a wake-up time without a profile")?
            .settings = Some(settings);
        self.persist()
    }

    fn submit_photo(&mut self, photo_url: String) -> Result {
        self.refresh()?;
        let timestamp = self.clock.now();
        self.registered_caller_data("submitting a photo without a profile")?
            .photos
            .push(PhotoSubmission { photo_url, timestamp });
        debug!("{} submitted a photo at {}", self.caller, timestamp);
        self.persist()
    }

    fn get_photo_submissions(&mut self) -> Result<Vec<PhotoSubmission>> {
        self.refresh()?;
        Ok(self
            .caller_data()
            .map(|data| data.photos.clone())
            .unwrap_or_default())
    }

    fn get_user_photo_submissions(&mut self, user: &Principal) -> Result<Vec<PhotoSubmission>> {
        self.refresh()?;
        self.require_admin("reading another user's photos")?;
        Ok(self
            .store
            .users
            .get(user)
            .map(|data| data.photos.clone())
            .unwrap_or_default())
    }

    fn get_caller_user_role(&mut self) -> Result<UserRole> {
        self.refresh()?;
        Ok(self.caller_role())
    }

    fn is_caller_admin(&mut self) -> Result<bool> {
        Ok(self.get_caller_user_role()? == UserRole::Admin)
    }

    fn assign_caller_user_role(&mut self, user: &Principal, role: UserRole) -> Result {
        self.refresh()?;
        self.require_admin("assigning roles")?;
        self.store.users.entry(user.clone()).or_default().role = role;
        info!("{} assigned {} the role {}", self.caller, user, role);
        self.persist()
    }

    fn get_all_user_records(&mut self) -> Result<Vec<UserRecord>> {
        self.refresh()?;
        self.require_admin("listing users")?;
        Ok(self
            .store
            .users
            .iter()
            .filter_map(|(user, data)| {
                Some(UserRecord {
                    user: user.clone(),
                    settings: data.settings?,
                    photo_count: data.photos.len(),
                })
            })
            .collect())
    }

    fn delete_user_data(&mut self, user: &Principal) -> Result {
        self.refresh()?;
        self.require_admin("deleting users")?;
        if self.store.users.remove(user).is_some() {
            info!("{} deleted the data of {}", self.caller, user);
        }
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake::FixedClock;
    use chrono::{FixedOffset, TimeZone, Utc};
    use std::rc::Rc;

    fn profile(name: &str) -> UserProfile {
        UserProfile { name: name.to_string(), email: None }
    }

    fn clock() -> Rc<FixedClock> {
        Rc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 17, 7, 30, 0).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        ))
    }

    #[test]
    fn test_guest_reads_empty_and_cannot_write() {
        let mut backend = LocalBackend::in_memory("alice".into());

        assert_eq!(backend.get_caller_user_role().unwrap(), UserRole::Guest);
        assert_eq!(backend.get_caller_user_profile().unwrap(), None);
        assert_eq!(backend.get_wake_up_time().unwrap(), None);
        assert!(backend.get_photo_submissions().unwrap().is_empty());

        for e in [
            backend.set_wake_up_time(WakeUpSettings::default()).unwrap_err(),
            backend.submit_photo("data:image/png;base64,".into()).unwrap_err(),
            backend.get_all_user_records().unwrap_err(),
        ] {
            assert!(matches!(e.kind(), ErrorType::Unauthorized(_)), "{:?}", e);
        }
    }

    #[test]
    fn test_first_registrant_is_admin() {
        let mut backend = LocalBackend::in_memory("alice".into());
        backend.save_caller_user_profile(profile("Alice")).unwrap();
        assert!(backend.is_caller_admin().unwrap());

        backend.set_caller("bob".into());
        backend.save_caller_user_profile(profile("Bob")).unwrap();
        assert_eq!(backend.get_caller_user_role().unwrap(), UserRole::User);
        assert!(!backend.is_caller_admin().unwrap());

        // saving again keeps the role
        backend.set_caller("alice".into());
        backend.save_caller_user_profile(profile("Alice B.")).unwrap();
        assert!(backend.is_caller_admin().unwrap());
    }

    #[test]
    fn test_profile_is_cleaned() {
        let mut backend = LocalBackend::in_memory("alice".into());
        let e = backend.save_caller_user_profile(profile("   ")).unwrap_err();
        assert!(matches!(e.kind(), ErrorType::InvalidInput(_)));
        assert_eq!(backend.get_caller_user_role().unwrap(), UserRole::Guest);

        backend
            .save_caller_user_profile(UserProfile {
                name: "  Alice ".to_string(),
                email: Some(" ".to_string()),
            })
            .unwrap();
        assert_eq!(backend.get_caller_user_profile().unwrap(), Some(profile("Alice")));
    }

    #[test]
    fn test_photos_are_timestamped_by_backend() {
        let clock = clock();
        let mut backend = LocalBackend::in_memory("alice".into()).with_clock(Box::new(clock.clone()));
        backend.save_caller_user_profile(profile("Alice")).unwrap();

        backend.submit_photo("data:image/png;base64,AAAA".into()).unwrap();
        clock.advance(chrono::Duration::days(1));
        backend.submit_photo("data:image/png;base64,BBBB".into()).unwrap();

        let photos = backend.get_photo_submissions().unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 17, 7, 30, 0).unwrap());
        assert_eq!(photos[1].timestamp, clock.now());
    }

    #[test]
    fn test_admin_operations() {
        let mut backend = LocalBackend::in_memory("alice".into());
        backend.save_caller_user_profile(profile("Alice")).unwrap();
        backend.set_caller("bob".into());
        backend.save_caller_user_profile(profile("Bob")).unwrap();
        backend.set_wake_up_time(WakeUpSettings::new(6, 0, true).unwrap()).unwrap();
        backend.submit_photo("data:image/png;base64,".into()).unwrap();

        let alice: Principal = "alice".into();
        let bob: Principal = "bob".into();
        for e in [
            backend.get_user_profile(&alice).unwrap_err(),
            backend.get_user_photo_submissions(&alice).map(|_| ()).unwrap_err(),
            backend.assign_caller_user_role(&bob, UserRole::Admin).unwrap_err(),
            backend.delete_user_data(&alice).unwrap_err(),
        ] {
            assert!(matches!(e.kind(), ErrorType::Unauthorized(_)), "{:?}", e);
        }
        assert_eq!(backend.get_user_profile(&bob).unwrap(), Some(profile("Bob")));

        backend.set_caller(alice.clone());
        assert_eq!(
            backend.get_all_user_records().unwrap(),
            vec![UserRecord {
                user: bob.clone(),
                settings: WakeUpSettings::new(6, 0, true).unwrap(),
                photo_count: 1,
            }]
        );
        assert_eq!(backend.get_user_photo_submissions(&bob).unwrap().len(), 1);

        backend.assign_caller_user_role(&bob, UserRole::Admin).unwrap();
        backend.set_caller(bob.clone());
        assert!(backend.is_caller_admin().unwrap());

        backend.delete_user_data(&alice).unwrap();
        assert_eq!(backend.get_user_profile(&alice).unwrap(), None);
    }

    #[test]
    fn test_assigned_role_needs_a_profile() {
        let mut backend = LocalBackend::in_memory("alice".into());
        backend.save_caller_user_profile(profile("Alice")).unwrap();
        let carol: Principal = "carol".into();
        backend.assign_caller_user_role(&carol, UserRole::User).unwrap();
        backend.assign_caller_user_role(&"dave".into(), UserRole::Admin).unwrap();

        // still a guest until the profile is saved
        backend.set_caller(carol.clone());
        assert_eq!(backend.get_caller_user_profile().unwrap(), None);
        assert_eq!(backend.get_caller_user_role().unwrap(), UserRole::Guest);
        for e in [
            backend.set_wake_up_time(WakeUpSettings::default()).unwrap_err(),
            backend.submit_photo("data:image/png;base64,".into()).unwrap_err(),
        ] {
            assert!(matches!(e.kind(), ErrorType::Unauthorized(_)), "{:?}", e);
        }

        backend.save_caller_user_profile(profile("Carol")).unwrap();
        assert_eq!(backend.get_caller_user_role().unwrap(), UserRole::User);
        backend.set_wake_up_time(WakeUpSettings::default()).unwrap();

        // a profile-less admin doesn't count, and gets the role on registering
        backend.set_caller("dave".into());
        assert!(!backend.is_caller_admin().unwrap());
        assert!(backend.get_all_user_records().is_err());
        backend.save_caller_user_profile(profile("Dave")).unwrap();
        assert!(backend.is_caller_admin().unwrap());
    }

    #[test]
    fn test_file_store_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut first = LocalBackend::open("alice".into(), &path).unwrap();
        let mut second = LocalBackend::open("alice".into(), &path).unwrap();
        assert!(!path.exists());

        first.save_caller_user_profile(profile("Alice")).unwrap();
        first.set_wake_up_time(WakeUpSettings::new(6, 15, true).unwrap()).unwrap();
        assert!(path.exists());

        // the second handle sees what the first one wrote
        assert_eq!(
            second.get_wake_up_time().unwrap(),
            Some(WakeUpSettings::new(6, 15, true).unwrap())
        );
        second.set_wake_up_time(WakeUpSettings::new(6, 15, false).unwrap()).unwrap();
        assert!(!first.get_wake_up_time().unwrap().unwrap().is_enabled);
    }

    #[test]
    fn test_corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let e = LocalBackend::open("alice".into(), &path).map(|_| ()).unwrap_err();
        assert!(matches!(e.kind(), ErrorType::Json(_)));
        assert!(!e.is_transient());
    }
}
