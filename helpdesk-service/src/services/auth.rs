use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::HelpdeskError;
use crate::models::{Role, User, UserSummary};
use crate::policy::Principal;
use crate::store::Store;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Issues and checks HS256 session tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
}

/// Claims for access tokens. Role and organization are a snapshot taken at
/// login and may be stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub org: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn principal(&self) -> Option<Principal> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        Some(Principal::new(user_id, self.role, self.org))
    }
}

impl JwtService {
    pub fn new(secret: &str, access_token_expiry_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_minutes,
        }
    }

    pub fn generate_access_token(&self, user: &User) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            org: user.organization_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub expires_in: i64,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    /// Verified against when there is no real hash to check.
    decoy_hash: Option<PasswordHashString>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService) -> Self {
        let decoy_hash = hash_password(&Password::new(Uuid::new_v4().to_string()))
            .map_err(|e| tracing::warn!(error = %e, "Failed to prepare decoy password hash"))
            .ok();
        Self {
            store,
            jwt,
            decoy_hash,
        }
    }

    /// Unknown email, an account without a password and a wrong password all
    /// fail the same way.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &Password) -> Result<LoginResult, HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let user = tx.find_user_by_email(email).await?;
        tx.commit().await?;

        let Some((user, hash)) =
            user.and_then(|u| u.password_hash.clone().map(|hash| (u, hash)))
        else {
            // Spend the same Argon2 work as a real check.
            if let Some(decoy) = &self.decoy_hash {
                let _ = verify_password(password, decoy);
            }
            return Err(HelpdeskError::Unauthenticated);
        };

        if verify_password(password, &PasswordHashString::new(hash)).is_err() {
            tracing::info!(user_id = %user.id, "Login rejected");
            return Err(HelpdeskError::Unauthenticated);
        }

        let access_token = self.jwt.generate_access_token(&user)?;
        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(LoginResult {
            access_token,
            expires_in: self.jwt.access_token_expiry_seconds(),
            user: user.summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    fn user() -> User {
        User::new(&NewUser {
            name: Some("Bob".to_string()),
            email: "bob@acme.com".to_string(),
            password_hash: None,
            role: Role::User,
            organization_id: Uuid::new_v4(),
        })
    }

    #[test]
    fn test_token_round_trip_yields_principal() {
        let jwt = JwtService::new("an-hs256-secret-that-is-long-enough!", 15);
        let bob = user();

        let token = jwt.generate_access_token(&bob).unwrap();
        let claims = jwt.validate_access_token(&token).unwrap();

        assert_eq!(claims.principal(), Some(Principal::from(&bob)));
        assert_eq!(jwt.access_token_expiry_seconds(), 900);
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let issuer = JwtService::new("an-hs256-secret-that-is-long-enough!", 15);
        let verifier = JwtService::new("a-completely-different-secret-value!", 15);
        let token = issuer.generate_access_token(&user()).unwrap();

        assert!(verifier.validate_access_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_unknown_and_passwordless_accounts_fail_alike() {
        let store = Arc::new(MemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.create_user(&NewUser {
            name: None,
            email: "pending@acme.com".to_string(),
            password_hash: None,
            role: Role::User,
            organization_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let auth = AuthService::new(
            store,
            JwtService::new("an-hs256-secret-that-is-long-enough!", 15),
        );
        assert!(auth.decoy_hash.is_some());

        let password = Password::new("whatever-it-is".to_string());
        for email in ["ghost@acme.com", "pending@acme.com"] {
            let err = auth.login(email, &password).await.unwrap_err();
            assert!(matches!(err, HelpdeskError::Unauthenticated));
        }
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = JwtService::new("an-hs256-secret-that-is-long-enough!", -5);
        let token = jwt.generate_access_token(&user()).unwrap();

        assert!(jwt.validate_access_token(&token).is_err());
    }
}
