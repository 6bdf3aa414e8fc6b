//! Account registration, profile maintenance and the skills users list on
//! their profiles.

use serde::Deserialize;

use super::context::{signed_in, PortalContext};
use super::domain::{
    Actor, NotificationKind, Profile, Role, SkillId, SkillLevel, User, UserId, UserSkill,
    UserSkillId,
};
use super::errors::{FieldErrors, Missing, PortalError, Resource};
use super::notifications::Notifier;
use super::pagination::{Page, PageRequest};
use super::repository::{NewUser, NewUserSkill, PortalStore};
use super::resource::ResourceService;
use super::validation::{is_email, is_username, shorter_than};

const MIN_USERNAME: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    #[serde(default = "student")]
    pub role: Role,
    #[serde(default)]
    pub profile: Profile,
}

fn student() -> Role {
    Role::Student
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Only the profile fields present in the body are replaced.
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub search: Option<String>,
}

fn check_identity(username: &str, email: &str) -> Result<(), PortalError> {
    let mut fields = FieldErrors::new();
    if shorter_than(username, MIN_USERNAME) {
        fields.add(
            "username",
            format!("username must have at least {MIN_USERNAME} characters"),
            username,
            &["Pick a longer username"],
        );
    } else if !is_username(username) {
        fields.add(
            "username",
            "username may contain only letters, digits and @/./+/-/_",
            username,
            &["Remove spaces and other symbols"],
        );
    }
    if !is_email(email) {
        fields.add(
            "email",
            "enter a valid email address",
            email,
            &["Use an address such as name@university.edu"],
        );
    }
    fields.finish()
}

fn merge_profile(profile: &mut Profile, patch: Profile) {
    let Profile {
        bio,
        phone,
        address,
        website,
        birth_date,
        experience,
        education,
    } = patch;
    if bio.is_some() {
        profile.bio = bio;
    }
    if phone.is_some() {
        profile.phone = phone;
    }
    if address.is_some() {
        profile.address = address;
    }
    if website.is_some() {
        profile.website = website;
    }
    if birth_date.is_some() {
        profile.birth_date = birth_date;
    }
    if experience.is_some() {
        profile.experience = experience;
    }
    if education.is_some() {
        profile.education = education;
    }
}

pub struct UserService<S> {
    ctx: PortalContext<S>,
    notifier: Notifier<S>,
}

impl<S: PortalStore> UserService<S> {
    pub fn new(ctx: PortalContext<S>, notifier: Notifier<S>) -> Self {
        Self { ctx, notifier }
    }

    /// Create an account and greet it with a system notification. Anyone may
    /// register as a student or employer; admin accounts need an admin.
    pub fn register(
        &self,
        actor: Option<&Actor>,
        registration: Registration,
    ) -> Result<User, PortalError> {
        if registration.role == Role::Admin && !actor.is_some_and(Actor::is_admin) {
            return Err(PortalError::permission(
                "only administrators can create administrator accounts",
            ));
        }
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        check_identity(&username, &email)?;

        let user = self.ctx.store.insert_user(NewUser {
            username,
            email,
            role: registration.role,
            profile: registration.profile,
            created_at: self.ctx.now(),
        })?;
        self.notifier.notify(
            user.id,
            NotificationKind::System,
            "Welcome!",
            "Thanks for signing up. You can now browse jobs and apply.",
        )?;
        tracing::info!(user = %user.id, role = user.role.label(), "user registered");
        Ok(user)
    }

    /// The user, provided the actor is that user or an administrator.
    fn editable(&self, actor: &Actor, id: UserId) -> Result<User, PortalError> {
        if actor.id != id && !actor.is_admin() {
            return Err(PortalError::permission("you can only change your own account"));
        }
        self.ctx.user(id)
    }
}

impl<S: PortalStore + 'static> ResourceService for UserService<S> {
    type Id = UserId;
    type Item = User;
    type Create = Registration;
    type Update = UserPatch;
    type Filter = UserFilter;

    const RESOURCE: Resource = Resource::Users;

    fn list(
        &self,
        _actor: Option<&Actor>,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, PortalError> {
        let needle = filter.search.map(|s| s.trim().to_lowercase());
        let users: Vec<User> = self
            .ctx
            .store
            .list_users()?
            .into_iter()
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .filter(|u| {
                needle
                    .as_deref()
                    .map_or(true, |needle| u.username.to_lowercase().contains(needle))
            })
            .collect();
        Ok(Page::paginate(users, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, _actor: Option<&Actor>, id: UserId) -> Result<User, PortalError> {
        self.ctx.user(id)
    }

    fn create(&self, actor: Option<&Actor>, input: Registration) -> Result<User, PortalError> {
        self.register(actor, input)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: UserId,
        input: UserPatch,
    ) -> Result<User, PortalError> {
        let actor = signed_in(actor)?;
        let mut user = self.editable(actor, id)?;
        if (input.role.is_some() || input.is_active.is_some()) && !actor.is_admin() {
            return Err(PortalError::permission(
                "only administrators can change roles or activation",
            ));
        }
        if let Some(username) = input.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = input.email {
            user.email = email.trim().to_string();
        }
        check_identity(&user.username, &user.email)?;
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(active) = input.is_active {
            user.is_active = active;
        }
        if let Some(profile) = input.profile {
            merge_profile(&mut user.profile, profile);
        }
        self.ctx.store.update_user(user.clone())?;
        Ok(user)
    }

    /// Accounts are deactivated, never removed.
    fn destroy(&self, actor: Option<&Actor>, id: UserId) -> Result<(), PortalError> {
        let actor = signed_in(actor)?;
        let mut user = self.editable(actor, id)?;
        user.is_active = false;
        self.ctx.store.update_user(user)?;
        tracing::info!(user = %id, by = %actor.id, "user deactivated");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSkillDraft {
    pub skill: SkillId,
    #[serde(default = "beginner")]
    pub level: SkillLevel,
}

fn beginner() -> SkillLevel {
    SkillLevel::Beginner
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSkillPatch {
    #[serde(default)]
    pub level: Option<SkillLevel>,
    #[serde(default)]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSkillFilter {
    /// Honoured for administrators only; everyone else sees their own skills.
    #[serde(default)]
    pub user: Option<UserId>,
}

pub struct UserSkillService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> UserSkillService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn owned(&self, actor: &Actor, id: UserSkillId) -> Result<UserSkill, PortalError> {
        let link = self
            .ctx
            .store
            .fetch_user_skill(id)?
            .ok_or(PortalError::NotFound(Missing::UserSkill(id)))?;
        if link.user_id != actor.id && !actor.is_admin() {
            return Err(PortalError::permission("this skill belongs to another user"));
        }
        Ok(link)
    }
}

impl<S: PortalStore + 'static> ResourceService for UserSkillService<S> {
    type Id = UserSkillId;
    type Item = UserSkill;
    type Create = UserSkillDraft;
    type Update = UserSkillPatch;
    type Filter = UserSkillFilter;

    const RESOURCE: Resource = Resource::UserSkills;

    fn list(
        &self,
        actor: Option<&Actor>,
        filter: UserSkillFilter,
        page: PageRequest,
    ) -> Result<Page<UserSkill>, PortalError> {
        let actor = signed_in(actor)?;
        let user = match filter.user {
            Some(user) if actor.is_admin() => user,
            _ => actor.id,
        };
        let links = self.ctx.store.user_skills(user)?;
        Ok(Page::paginate(links, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, actor: Option<&Actor>, id: UserSkillId) -> Result<UserSkill, PortalError> {
        self.owned(signed_in(actor)?, id)
    }

    fn create(
        &self,
        actor: Option<&Actor>,
        input: UserSkillDraft,
    ) -> Result<UserSkill, PortalError> {
        let actor = signed_in(actor)?;
        self.ctx
            .store
            .fetch_skill(input.skill)?
            .ok_or(PortalError::NotFound(Missing::Skill(input.skill)))?;
        Ok(self.ctx.store.insert_user_skill(NewUserSkill {
            user_id: actor.id,
            skill_id: input.skill,
            level: input.level,
        })?)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: UserSkillId,
        input: UserSkillPatch,
    ) -> Result<UserSkill, PortalError> {
        let actor = signed_in(actor)?;
        let mut link = self.owned(actor, id)?;
        if let Some(verified) = input.verified {
            if !actor.is_admin() {
                return Err(PortalError::permission(
                    "only administrators can verify skills",
                ));
            }
            link.verified = verified;
        }
        if let Some(level) = input.level {
            link.level = level;
        }
        self.ctx.store.update_user_skill(link.clone())?;
        Ok(link)
    }

    fn destroy(&self, actor: Option<&Actor>, id: UserSkillId) -> Result<(), PortalError> {
        let link = self.owned(signed_in(actor)?, id)?;
        self.ctx.store.delete_user_skill(link.id)?;
        Ok(())
    }
}
