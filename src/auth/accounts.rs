use crate::{
    db::{Database, NewUser, User},
    error::{InputError, Result},
    settings::Settings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Validation limits for new accounts.
#[derive(Debug, Clone)]
pub struct AccountRules {
    pub username_max_len: usize,
    pub full_name_max_len: usize,
    pub reserved_usernames: Vec<String>,
}

impl AccountRules {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            username_max_len: settings.username_max_len,
            full_name_max_len: settings.full_name_max_len,
            reserved_usernames: settings.reserved_usernames.clone(),
        }
    }

    /// Length limits count characters, not bytes. Reserved names match
    /// case-insensitively and are only open to admin accounts.
    pub fn validate(&self, user: &NewUser) -> Result<(), InputError> {
        self.check_names(&user.username, &user.full_name, user.is_admin)
    }

    fn check_names(&self, username: &str, full_name: &str, is_admin: bool) -> Result<(), InputError> {
        if username.chars().count() > self.username_max_len {
            return Err(InputError::FieldTooLong {
                field: "username",
                max: self.username_max_len,
            });
        }
        if full_name.chars().count() > self.full_name_max_len {
            return Err(InputError::FieldTooLong {
                field: "full name",
                max: self.full_name_max_len,
            });
        }
        if !is_admin
            && self
                .reserved_usernames
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(username))
        {
            return Err(InputError::ReservedName(username.to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Accounts {
    db: Database,
    rules: AccountRules,
}

impl Accounts {
    pub fn new(db: Database, rules: AccountRules) -> Self {
        Self { db, rules }
    }

    pub async fn create_user(
        &self,
        username: &str,
        full_name: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User> {
        let new_user = NewUser {
            username: username.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
        };
        self.rules.validate(&new_user)?;

        let user = self.db.insert_user(new_user).await?;
        log_info!("created user id={} admin={}", user.id, user.is_admin);
        Ok(user)
    }

    /// Create the admin account unless one already exists. Returns the new
    /// account, or `None` when an admin was already present.
    pub async fn ensure_admin(
        &self,
        username: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let admin = NewUser {
            username: username.to_string(),
            full_name: full_name.to_string(),
            password_hash: password_hash.to_string(),
            is_admin: true,
        };
        self.rules.validate(&admin)?;

        let created = self.db.insert_admin_if_missing(admin).await?;
        if let Some(user) = &created {
            log_info!("created admin user id={}", user.id);
        } else {
            log_debug!("admin user already present");
        }
        Ok(created)
    }

    /// Change username and full name under the same rules as creation.
    /// Keeping the current username is allowed.
    pub async fn update_profile(&self, user_id: i64, username: &str, full_name: &str) -> Result<User> {
        let Some(current) = self.db.get_user(user_id).await? else {
            return Err(InputError::UnknownUser(user_id).into());
        };
        self.rules.check_names(username, full_name, current.is_admin)?;

        let user = self.db.update_user_profile(user_id, username, full_name).await?;
        log_info!("updated profile of user id={}", user.id);
        Ok(user)
    }

    pub async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.db.update_password_hash(user_id, password_hash).await?;
        log_info!("updated password of user id={}", user_id);
        Ok(())
    }
}
