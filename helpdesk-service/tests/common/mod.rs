#![allow(dead_code)]

use std::sync::Arc;

use helpdesk_service::config::HelpdeskConfig;
use helpdesk_service::models::{
    NewOrganization, NewUser, Organization, Role, TicketPriority, TicketView, User,
};
use helpdesk_service::policy::Principal;
use helpdesk_service::services::{CreateTicketInput, MockNotifier};
use helpdesk_service::store::{MemoryStore, Store};
use helpdesk_service::utils::{hash_password, Password};
use helpdesk_service::AppState;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MockNotifier>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MockNotifier::new());
    let state = AppState::new(
        HelpdeskConfig::development(),
        store.clone(),
        notifier.clone(),
    );

    TestApp {
        state,
        store,
        notifier,
    }
}

pub async fn seed_organization(store: &MemoryStore, name: &str) -> Organization {
    let mut tx = store.begin().await.unwrap();
    let organization = tx
        .create_organization(&NewOrganization {
            name: name.to_string(),
            bio: None,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    organization
}

/// Seed a user who can log in with [`PASSWORD`].
pub async fn seed_user(store: &MemoryStore, organization_id: Uuid, email: &str, role: Role) -> User {
    let hash = hash_password(&Password::new(PASSWORD.to_string())).unwrap();
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .create_user(&NewUser {
            name: email.split('@').next().map(str::to_string),
            email: email.to_string(),
            password_hash: Some(hash.into_string()),
            role,
            organization_id,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user
}

/// Acme with a manager, a requester and a developer, plus a manager from a
/// second organization.
pub struct Acme {
    pub org: Organization,
    pub alice: User,
    pub bob: User,
    pub carol: User,
    pub globex: Organization,
    pub mallory: User,
}

impl Acme {
    pub async fn seed(store: &MemoryStore) -> Self {
        let org = seed_organization(store, "Acme").await;
        let alice = seed_user(store, org.id, "alice@acme.com", Role::Manager).await;
        let bob = seed_user(store, org.id, "bob@acme.com", Role::User).await;
        let carol = seed_user(store, org.id, "carol@acme.com", Role::Developer).await;
        let globex = seed_organization(store, "Globex").await;
        let mallory = seed_user(store, globex.id, "mallory@globex.com", Role::Manager).await;

        Self {
            org,
            alice,
            bob,
            carol,
            globex,
            mallory,
        }
    }

    pub fn alice(&self) -> Principal {
        Principal::from(&self.alice)
    }

    pub fn bob(&self) -> Principal {
        Principal::from(&self.bob)
    }

    pub fn carol(&self) -> Principal {
        Principal::from(&self.carol)
    }

    pub fn mallory(&self) -> Principal {
        Principal::from(&self.mallory)
    }
}

pub async fn open_ticket(app: &TestApp, principal: &Principal, title: &str) -> TicketView {
    app.state
        .tickets
        .create(
            principal,
            CreateTicketInput {
                title: title.to_string(),
                description: "Steps to reproduce attached".to_string(),
                priority: TicketPriority::Medium,
                assignee_ids: Vec::new(),
            },
        )
        .await
        .unwrap()
}
