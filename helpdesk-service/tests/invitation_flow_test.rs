mod common;

use chrono::{Duration, Utc};
use common::{test_app, Acme, TestApp};
use helpdesk_service::models::{NewInvitation, Role};
use helpdesk_service::policy::{DenyReason, Principal};
use helpdesk_service::services::{
    AcceptInvitationInput, ConflictReason, CreateInvitationInput, HelpdeskError,
    IssuedInvitation, RegisterOrganizationInput,
};
use helpdesk_service::store::Store;
use helpdesk_service::utils::{hash_token, Password};

async fn invite(
    app: &TestApp,
    principal: &Principal,
    email: &str,
) -> Result<IssuedInvitation, HelpdeskError> {
    app.state
        .invitations
        .create(
            principal,
            CreateInvitationInput {
                email: email.to_string(),
                role: Some(Role::Developer),
                organization_id: None,
            },
        )
        .await
}

fn acceptance(token: &str, email: &str) -> AcceptInvitationInput {
    AcceptInvitationInput {
        token: token.to_string(),
        email: email.to_string(),
        name: Some("Dave".to_string()),
        password: Password::new("a-long-enough-password".to_string()),
    }
}

#[tokio::test]
async fn test_invite_validate_accept() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let issued = invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();
    assert_eq!(issued.organization.id, acme.org.id);
    assert!(issued.accept_url.ends_with(&format!("/auth/register?token={}", issued.token)));
    assert!(issued.expires_at > Utc::now() + Duration::days(6));

    let event = app.notifier.last().unwrap();
    assert_eq!(app.notifier.count(), 1);
    assert_eq!(event.token, issued.token);
    assert_eq!(event.invited_by, acme.alice.id);

    let details = app.state.invitations.validate(&issued.token).await.unwrap();
    assert_eq!(details.email, "dave@acme.com");
    assert_eq!(details.role, Role::Developer);
    assert_eq!(details.organization.name, "Acme");
    assert_eq!(details.inviter.map(|u| u.id), Some(acme.alice.id));

    let user = app
        .state
        .invitations
        .accept(acceptance(&issued.token, " Dave@Acme.com "))
        .await
        .unwrap();
    assert_eq!(user.email, "dave@acme.com");
    assert_eq!(user.role, Role::Developer);
    assert_eq!(user.organization_id, acme.org.id);

    let err = app
        .state
        .invitations
        .accept(acceptance(&issued.token, "dave@acme.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::AlreadyAccepted)));

    let err = app.state.invitations.validate(&issued.token).await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::AlreadyAccepted)));
}

#[tokio::test]
async fn test_only_managers_of_the_organization_invite() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let err = invite(&app, &acme.bob(), "eve@acme.com").await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::NotManager)));

    let err = app
        .state
        .invitations
        .create(
            &acme.mallory(),
            CreateInvitationInput {
                email: "eve@acme.com".to_string(),
                role: None,
                organization_id: Some(acme.org.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::CrossTenant)));

    assert_eq!(app.notifier.count(), 0);
}

#[tokio::test]
async fn test_stale_session_role_is_rechecked() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    // Bob's token still claims MANAGER but the directory says USER.
    let stale = Principal::new(acme.bob.id, Role::Manager, acme.org.id);

    let err = invite(&app, &stale, "eve@acme.com").await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::NotManager)));
}

#[tokio::test]
async fn test_duplicate_invitations_and_existing_accounts_conflict() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let err = invite(&app, &acme.alice(), "carol@acme.com").await.unwrap_err();
    assert!(matches!(
        err,
        HelpdeskError::Conflict(ConflictReason::EmailAlreadyExists)
    ));

    invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();
    let err = invite(&app, &acme.alice(), "DAVE@acme.com").await.unwrap_err();
    assert!(matches!(
        err,
        HelpdeskError::Conflict(ConflictReason::PendingInvitationExists)
    ));
}

#[tokio::test]
async fn test_email_mismatch_leaves_invitation_usable() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;
    let issued = invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();

    let err = app
        .state
        .invitations
        .accept(acceptance(&issued.token, "someone-else@acme.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::EmailMismatch)));

    app.state.invitations.validate(&issued.token).await.unwrap();
    app.state
        .invitations
        .accept(acceptance(&issued.token, "dave@acme.com"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_email_registered_elsewhere_blocks_acceptance_without_consuming() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;
    let issued = invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();

    app.state
        .directory
        .register_organization(RegisterOrganizationInput {
            company_name: "Dave's Garage".to_string(),
            bio: None,
            name: None,
            email: "dave@acme.com".to_string(),
            password: Password::new("another-long-password".to_string()),
        })
        .await
        .unwrap();

    let err = app
        .state
        .invitations
        .accept(acceptance(&issued.token, "dave@acme.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HelpdeskError::Conflict(ConflictReason::EmailAlreadyExists)
    ));

    // Nothing was written: the invitation is still pending.
    app.state.invitations.validate(&issued.token).await.unwrap();
}

#[tokio::test]
async fn test_expired_and_unknown_tokens() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let token = "expired-token-value";
    let mut tx = app.store.begin().await.unwrap();
    tx.create_invitation(&NewInvitation {
        email: "late@acme.com".to_string(),
        token_hash: hash_token(token),
        role: Role::User,
        organization_id: acme.org.id,
        invited_by: acme.alice.id,
        expires_at: Utc::now() - Duration::hours(1),
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let err = app.state.invitations.validate(token).await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::Expired)));

    let err = app
        .state
        .invitations
        .accept(acceptance(token, "late@acme.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Denied(DenyReason::Expired)));

    // An expired invitation no longer blocks a fresh one.
    invite(&app, &acme.alice(), "late@acme.com").await.unwrap();

    let err = app.state.invitations.validate("no-such-token").await.unwrap_err();
    assert!(matches!(err, HelpdeskError::NotFound));
}

#[tokio::test]
async fn test_short_password_is_rejected_before_lookup() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;
    let issued = invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();

    let mut input = acceptance(&issued.token, "dave@acme.com");
    input.password = Password::new("short".to_string());

    let err = app.state.invitations.accept(input).await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Invalid(_)));
    app.state.invitations.validate(&issued.token).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_acceptances_admit_one() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;
    let issued = invite(&app, &acme.alice(), "dave@acme.com").await.unwrap();

    let (first, second) = tokio::join!(
        app.state
            .invitations
            .accept(acceptance(&issued.token, "dave@acme.com")),
        app.state
            .invitations
            .accept(acceptance(&issued.token, "dave@acme.com")),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(HelpdeskError::Denied(DenyReason::AlreadyAccepted))
    )));

    let users = app.state.directory.list_users(&acme.alice()).await.unwrap();
    assert_eq!(users.iter().filter(|u| u.email == "dave@acme.com").count(), 1);
}

#[tokio::test]
async fn test_concurrent_invitations_for_one_email_issue_one() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let (alice_a, alice_b) = (acme.alice(), acme.alice());
    let (first, second) = tokio::join!(
        invite(&app, &alice_a, "dave@acme.com"),
        invite(&app, &alice_b, "Dave@Acme.com"),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(HelpdeskError::Conflict(ConflictReason::PendingInvitationExists))
    )));
    assert_eq!(app.notifier.count(), 1);
}

#[tokio::test]
async fn test_non_ascii_email_case_is_folded() {
    let app = test_app();
    let acme = Acme::seed(&app.store).await;

    let issued = invite(&app, &acme.alice(), "ÉLODIE@acme.com").await.unwrap();
    assert_eq!(issued.email, "élodie@acme.com");

    let err = invite(&app, &acme.alice(), "élodie@acme.com").await.unwrap_err();
    assert!(matches!(
        err,
        HelpdeskError::Conflict(ConflictReason::PendingInvitationExists)
    ));

    let user = app
        .state
        .invitations
        .accept(acceptance(&issued.token, "élodie@ACME.com"))
        .await
        .unwrap();
    assert_eq!(user.email, "élodie@acme.com");

    let session = app
        .state
        .auth
        .login("ÉLODIE@acme.com", &Password::new("a-long-enough-password".to_string()))
        .await
        .unwrap();
    assert_eq!(session.user.id, user.id);
}
