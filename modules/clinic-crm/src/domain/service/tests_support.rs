#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shared fixture for the service tests: two clinics on one in-memory
//! `SQLite` database, migrated the same way the server does it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clinic_db::{DbConfig, connect};
use clinic_security::{Actor, Role, SecurityContext};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use super::{NewLead, Service};
use crate::config::CrmConfig;
use crate::infra::providers::{StubVoiceProvider, StubWhatsAppProvider};
use crate::infra::storage::entities::{clinic, lead, user};
use crate::infra::storage::migrations::Migrator;

pub(super) struct Staff {
    pub user: user::Model,
    pub ctx: SecurityContext,
}

pub(super) struct World {
    pub svc: Service,
    pub clinic_a: clinic::Model,
    pub clinic_b: clinic::Model,
    pub admin_a: Staff,
    pub agent_a: Staff,
    pub doctor_a: Staff,
    pub finance_a: Staff,
    pub admin_b: Staff,
}

impl World {
    pub fn db(&self) -> &DatabaseConnection {
        &self.svc.db
    }
}

pub(super) fn base_time() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

pub(super) async fn service_with(config: CrmConfig) -> Service {
    let db = connect(&DbConfig::in_memory()).await.expect("sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    Service::new(
        db,
        Arc::new(config),
        Arc::new(StubWhatsAppProvider),
        Arc::new(StubVoiceProvider),
    )
}

pub(super) async fn world() -> World {
    world_with(CrmConfig::default()).await
}

pub(super) async fn world_with(config: CrmConfig) -> World {
    let svc = service_with(config).await;
    let db = svc.db.clone();
    let t0 = base_time();

    let clinic_a = insert_clinic(&db, "smile-tirana", "Smile Tirana").await;
    let clinic_b = insert_clinic(&db, "dent-roma", "Dent Roma").await;

    let admin_a = insert_staff(&db, clinic_a.id, Role::Admin, "admin@smile.test", t0).await;
    let agent_a = insert_staff(&db, clinic_a.id, Role::Agent, "agent@smile.test", t0 + Duration::seconds(1)).await;
    let doctor_a = insert_staff(&db, clinic_a.id, Role::Doctor, "doctor@smile.test", t0 + Duration::seconds(2)).await;
    let finance_a = insert_staff(&db, clinic_a.id, Role::Finance, "finance@smile.test", t0 + Duration::seconds(3)).await;
    let admin_b = insert_staff(&db, clinic_b.id, Role::Admin, "admin@dent.test", t0).await;

    World {
        svc,
        clinic_a,
        clinic_b,
        admin_a,
        agent_a,
        doctor_a,
        finance_a,
        admin_b,
    }
}

pub(super) async fn insert_clinic(db: &DatabaseConnection, slug: &str, name: &str) -> clinic::Model {
    let now = Utc::now();
    clinic::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        slug: Set(slug.to_owned()),
        logo_url: Set(None),
        country: Set("Albania".to_owned()),
        timezone: Set("Europe/Tirane".to_owned()),
        default_currency: Set("EUR".to_owned()),
        default_language: Set("it".to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub(super) async fn insert_staff(
    db: &DatabaseConnection,
    clinic_id: Uuid,
    role: Role,
    email: &str,
    created_at: DateTime<Utc>,
) -> Staff {
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(clinic_id),
        full_name: Set(email.split('@').next().unwrap_or_default().to_owned()),
        email: Set(email.to_owned()),
        role: Set(role.as_str().to_owned()),
        is_active: Set(true),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(db)
    .await
    .unwrap();
    let ctx = SecurityContext::for_actor(Actor::new(user.id, clinic_id, role));
    Staff { user, ctx }
}

pub(super) fn new_lead(first_name: &str) -> NewLead {
    NewLead {
        first_name: first_name.to_owned(),
        last_name: "Rossi".to_owned(),
        email: Some(format!("{}@mail.test", first_name.to_lowercase())),
        phone: Some("+390600000".to_owned()),
        ..NewLead::default()
    }
}

/// Unassigned lead with a fixed creation time, as intake would leave it.
pub(super) async fn insert_lead_at(
    db: &DatabaseConnection,
    clinic_id: Uuid,
    first_name: &str,
    created_at: DateTime<Utc>,
) -> lead::Model {
    let mut row = new_lead(first_name).into_active_model(clinic_id, None).unwrap();
    row.created_at = Set(created_at);
    row.updated_at = Set(created_at);
    row.insert(db).await.unwrap()
}
