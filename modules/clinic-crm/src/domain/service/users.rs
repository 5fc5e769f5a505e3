use chrono::Utc;
use clinic_db::secure::{AccessScope, SecureEntityExt, TenantGuard, Visibility};
use clinic_security::{Actor, Permission, Role, SecurityContext};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::intake::find_clinic_by_slug;
use super::{Service, require, required_text};
use crate::domain::activity::{self, Activity};
use crate::domain::error::DomainError;
use crate::infra::storage::entities::user;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub role: String,
}

impl Service {
    pub async fn list_users(&self, ctx: &SecurityContext) -> Result<Vec<user::Model>, DomainError> {
        require(ctx, Permission::UsersManage)?;
        Ok(TenantGuard::new(ctx)
            .scoped_collection::<user::Entity>(Visibility::Live)?
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Add a staff account. Emails are unique within a clinic.
    #[instrument(skip(self, ctx, input))]
    pub async fn create_user(&self, ctx: &SecurityContext, input: NewUser) -> Result<user::Model, DomainError> {
        let actor = require(ctx, Permission::UsersManage)?;
        let full_name = required_text("full_name", &input.full_name)?;
        let email = required_text("email", &input.email)?.to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("email", "not an email address"));
        }
        let role: Role = input.role.trim().to_lowercase().parse()?;

        let txn = self.db.begin().await?;
        let taken = TenantGuard::new(ctx)
            .scoped_collection::<user::Entity>(Visibility::Live)?
            .filter(user::Column::Email.eq(email.clone()))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(DomainError::Conflict("user with this email already exists in this clinic".to_owned()));
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(actor.clinic_id),
            full_name: Set(full_name),
            email: Set(email),
            role: Set(role.as_str().to_owned()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Activity::new(actor.clinic_id, activity::USERS_CREATE)
            .by(actor.id)
            .details(format!("Created user {}", user.email))
            .insert(&txn)
            .await?;
        txn.commit().await?;

        info!(user_id = %user.id, role = %role, "user created");
        Ok(user)
    }

    /// Flip `is_active`. Nobody can disable their own account.
    #[instrument(skip(self, ctx))]
    pub async fn toggle_user(&self, ctx: &SecurityContext, id: Uuid) -> Result<user::Model, DomainError> {
        let actor = require(ctx, Permission::UsersManage)?;
        if actor.id == id {
            return Err(DomainError::bad_request("you cannot disable your own account"));
        }

        let txn = self.db.begin().await?;
        let user = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<user::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let active = !user.is_active;
        let mut am: user::ActiveModel = user.into();
        am.is_active = Set(active);
        am.updated_at = Set(Utc::now());
        let user = am.update(&txn).await?;
        Activity::new(actor.clinic_id, activity::USERS_TOGGLE)
            .by(actor.id)
            .details(format!("User {} active={active}", user.email))
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self, ctx))]
    pub async fn update_user_role(&self, ctx: &SecurityContext, id: Uuid, role: &str) -> Result<user::Model, DomainError> {
        let actor = require(ctx, Permission::UsersManage)?;
        let role: Role = role.trim().to_lowercase().parse()?;

        let txn = self.db.begin().await?;
        let user = TenantGuard::new(ctx)
            .get_by_id_or_not_found::<user::Entity, _>(&txn, id, Visibility::Live)
            .await?;
        let mut am: user::ActiveModel = user.into();
        am.role = Set(role.as_str().to_owned());
        am.updated_at = Set(Utc::now());
        let user = am.update(&txn).await?;
        Activity::new(actor.clinic_id, activity::USERS_ROLE_UPDATE)
            .by(actor.id)
            .details(format!("Role updated for {} -> {role}", user.email))
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(user)
    }

    /// Operator lookup behind token issuance: an active staff member of the
    /// clinic with this slug.
    #[instrument(skip(self))]
    pub async fn staff_actor(&self, clinic_slug: &str, email: &str) -> Result<Actor, DomainError> {
        let clinic = find_clinic_by_slug(&self.db, clinic_slug)
            .await?
            .ok_or(DomainError::NotFound)?;
        let user = user::Entity::find()
            .secure()
            .scope_with(&AccessScope::clinic(clinic.id), Visibility::Live)
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !user.is_active {
            return Err(DomainError::forbidden("user is deactivated"));
        }
        let role: Role = user.role.parse()?;
        Ok(Actor::new(user.id, clinic.id, role))
    }

    /// The signed-in user as currently stored: `None` once they are
    /// deactivated or gone. The role comes from the row.
    pub async fn current_actor(&self, user_id: Uuid, clinic_id: Uuid) -> Result<Option<Actor>, DomainError> {
        let user = user::Entity::find()
            .secure()
            .scope_with(&AccessScope::clinic(clinic_id), Visibility::Live)
            .and_id(user_id)?
            .one(&self.db)
            .await?;
        match user {
            Some(user) if user.is_active => Ok(Some(Actor::new(user.id, clinic_id, user.role.parse()?))),
            _ => Ok(None),
        }
    }
}
