//! Tests for auth module
//!
//! These tests verify the identity-reconciliation engine and the local
//! login path end-to-end against an in-memory database:
//! - create vs. link vs. conflict vs. password-claim outcomes
//! - atomicity of client+account creation
//! - session token issuance and sanitized responses

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use super::super::handlers::session_cookie;
    use super::super::models::{
        LoginRequest, PasswordState, PlanType, Provider, RegisterRequest, RegistrationRequest,
    };
    use super::super::service::AuthService;
    use super::super::store::ClientStore;
    use super::super::validators::validate_password_strength;
    use crate::common::migrations::run_migrations;
    use crate::common::{ApiError, Validator};
    use crate::services::{PasswordCodec, TokenIssuer};

    async fn test_pool() -> SqlitePool {
        // Single connection: every handle must see the same in-memory DB
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-session-secret", chrono::Duration::days(1))
    }

    fn service(pool: &SqlitePool) -> AuthService {
        // Minimum bcrypt cost keeps the suite fast
        AuthService::new(
            ClientStore::new(pool.clone()),
            issuer(),
            PasswordCodec::with_cost(4),
        )
    }

    fn local_registration(email: &str, password: &str) -> RegistrationRequest {
        RegistrationRequest {
            email: email.to_string(),
            name: "Test Client".to_string(),
            password: Some(password.to_string()),
            provider: Provider::Local,
            provider_account_id: None,
            plan: PlanType::Free,
        }
    }

    fn oauth_registration(
        email: &str,
        provider: Provider,
        provider_account_id: &str,
    ) -> RegistrationRequest {
        RegistrationRequest {
            email: email.to_string(),
            name: "Test Client".to_string(),
            password: None,
            provider,
            provider_account_id: Some(provider_account_id.to_string()),
            plan: PlanType::Free,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    // ---- Local registration ----

    #[tokio::test]
    async fn test_register_local_new_client_issues_verifiable_token() {
        let pool = test_pool().await;
        let auth = service(&pool);

        let response = auth
            .register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        assert!(response.is_new_user);
        assert_eq!(response.auth_type, "local");
        assert_eq!(response.client.email, "alice@example.com");

        let claims = issuer().verify(&response.token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.sub, response.client.id);

        // Client and its local linked account commit together
        assert_eq!(count(&pool, "clients").await, 1);
        assert_eq!(count(&pool, "linked_accounts").await, 1);
    }

    #[tokio::test]
    async fn test_register_local_duplicate_email_conflicts() {
        let pool = test_pool().await;
        let auth = service(&pool);

        auth.register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        let err = auth
            .register(local_registration("alice@example.com", "another-passphrase"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(count(&pool, "clients").await, 1);
    }

    #[tokio::test]
    async fn test_register_local_rejects_weak_password() {
        let pool = test_pool().await;
        let auth = service(&pool);

        for weak in ["password1", "my123456x", "short"] {
            let err = auth
                .register(local_registration("weak@example.com", weak))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{} accepted", weak);
        }

        assert_eq!(count(&pool, "clients").await, 0);
    }

    #[tokio::test]
    async fn test_oauth_only_client_claims_password_in_place() {
        let pool = test_pool().await;
        let auth = service(&pool);

        auth.register(oauth_registration("alice@example.com", Provider::Google, "g-1"))
            .await
            .unwrap();

        // Local registration over the OAuth-only client claims it
        let response = auth
            .register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        assert!(!response.is_new_user);
        assert_eq!(response.message, "password set for existing account");
        assert_eq!(count(&pool, "clients").await, 1);

        // The claimed password works for local login
        let login_response = auth
            .login(login("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();
        assert_eq!(login_response.client.email, "alice@example.com");
    }

    // ---- OAuth reconciliation ----

    #[tokio::test]
    async fn test_oauth_new_client_created_without_password() {
        let pool = test_pool().await;
        let auth = service(&pool);

        let response = auth
            .register(oauth_registration("alice@example.com", Provider::Google, "g-1"))
            .await
            .unwrap();

        assert!(response.is_new_user);
        assert_eq!(response.auth_type, "oauth");
        assert_eq!(count(&pool, "clients").await, 1);
        assert_eq!(count(&pool, "linked_accounts").await, 1);

        // OAuth-only clients cannot log in locally
        let err = auth
            .login(login("alice@example.com", "whatever-guess"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg == "password not set"));
    }

    #[tokio::test]
    async fn test_oauth_already_linked_performs_no_writes() {
        let pool = test_pool().await;
        let auth = service(&pool);

        let first = auth
            .register(oauth_registration("alice@example.com", Provider::Google, "g-1"))
            .await
            .unwrap();

        let second = auth
            .register(oauth_registration("alice@example.com", Provider::Google, "g-1"))
            .await
            .unwrap();

        assert!(!second.is_new_user);
        assert_eq!(second.message, "login successful");
        assert_eq!(second.client.id, first.client.id);
        assert_eq!(count(&pool, "clients").await, 1);
        assert_eq!(count(&pool, "linked_accounts").await, 1);
    }

    #[tokio::test]
    async fn test_oauth_new_identity_links_to_existing_email() {
        let pool = test_pool().await;
        let auth = service(&pool);

        let first = auth
            .register(oauth_registration("alice@example.com", Provider::Google, "g-1"))
            .await
            .unwrap();

        // Same email arriving from a different provider links, not creates
        let linked = auth
            .register(oauth_registration("alice@example.com", Provider::Github, "gh-9"))
            .await
            .unwrap();

        assert!(!linked.is_new_user);
        assert_eq!(linked.message, "account linked successfully");
        assert_eq!(linked.client.id, first.client.id);
        assert_eq!(count(&pool, "clients").await, 1);
        assert_eq!(count(&pool, "linked_accounts").await, 2);
    }

    #[tokio::test]
    async fn test_same_account_id_on_different_providers_is_distinct() {
        let pool = test_pool().await;
        let auth = service(&pool);

        auth.register(oauth_registration("a@example.com", Provider::Google, "id-7"))
            .await
            .unwrap();
        auth.register(oauth_registration("b@example.com", Provider::Github, "id-7"))
            .await
            .unwrap();

        // (provider, provider_account_id) is the unique pair, not the id alone
        assert_eq!(count(&pool, "clients").await, 2);
        assert_eq!(count(&pool, "linked_accounts").await, 2);
    }

    // ---- Local login ----

    #[tokio::test]
    async fn test_login_unknown_email_is_not_found() {
        let pool = test_pool().await;
        let auth = service(&pool);

        let err = auth
            .login(login("ghost@example.com", "correct-horse-battery"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let pool = test_pool().await;
        let auth = service(&pool);

        auth.register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        let err = auth
            .login(login("alice@example.com", "wrong-guess-entirely"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg == "invalid password"));

        // Same wrong password against a missing email stays NotFound:
        // the two failure modes never swap
        let err = auth
            .login(login("ghost@example.com", "wrong-guess-entirely"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_correct_password_returns_token() {
        let pool = test_pool().await;
        let auth = service(&pool);

        auth.register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        let response = auth
            .login(login("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();

        assert!(!response.is_new_user);
        assert_eq!(response.auth_type, "local");
        let claims = issuer().verify(&response.token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
    }

    // ---- End-to-end scenario ----

    #[tokio::test]
    async fn test_alice_register_login_then_github_links() {
        let pool = test_pool().await;
        let auth = service(&pool);

        // Register locally with a strong password
        let registered = auth
            .register(local_registration("alice@example.com", "correct-horse-battery"))
            .await
            .unwrap();
        assert!(registered.is_new_user);

        // Correct password logs in
        assert!(auth
            .login(login("alice@example.com", "correct-horse-battery"))
            .await
            .is_ok());

        // Wrong password does not
        assert!(matches!(
            auth.login(login("alice@example.com", "not-her-password"))
                .await
                .unwrap_err(),
            ApiError::Unauthorized(_)
        ));

        // A GitHub callback with the same email links to Alice's client
        // rather than creating a duplicate
        let github = auth
            .register(oauth_registration("alice@example.com", Provider::Github, "gh-42"))
            .await
            .unwrap();

        assert!(!github.is_new_user);
        assert_eq!(github.client.id, registered.client.id);
        assert_eq!(count(&pool, "clients").await, 1);
        assert_eq!(count(&pool, "linked_accounts").await, 2);
    }

    // ---- Models and helpers ----

    #[test]
    fn test_provider_parse_round_trip() {
        assert_eq!(Provider::parse("google").unwrap(), Provider::Google);
        assert_eq!(Provider::parse("github").unwrap(), Provider::Github);
        assert_eq!(Provider::parse("local").unwrap(), Provider::Local);
    }

    #[test]
    fn test_unknown_provider_maps_to_internal_error() {
        let err = Provider::parse("myspace").unwrap_err();
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::InternalServer(msg) if msg == "unsupported provider"));
    }

    #[test]
    fn test_password_state_from_stored() {
        assert_eq!(PasswordState::from_stored(None), PasswordState::NotSet);
        assert_eq!(
            PasswordState::from_stored(Some(String::new())),
            PasswordState::NotSet
        );
        assert!(PasswordState::from_stored(Some("$2b$12$abc".to_string())).is_set());
    }

    #[test]
    fn test_password_strength_gate() {
        assert!(validate_password_strength("correct-horse-battery").is_ok());
        assert!(validate_password_strength("password-is-long").is_err());
        assert!(validate_password_strength("abc123456def").is_err());
        assert!(validate_password_strength("tiny").is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok-123", false);
        assert!(cookie.starts_with("authToken=tok-123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800")); // seven days
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        let secure = session_cookie("tok-123", true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_login_request_validation() {
        let valid = login_request("alice@example.com", "pw");
        assert!(valid.validate(&valid).is_valid);

        let bad_email = login_request("not-an-email", "pw");
        let result = bad_email.validate(&bad_email);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "email"));

        let empty_password = login_request("alice@example.com", "");
        assert!(!empty_password.validate(&empty_password).is_valid);
    }

    #[test]
    fn test_register_request_validation() {
        let valid = register_request("alice@example.com", "pw", "Alice");
        assert!(valid.validate(&valid).is_valid);

        let no_name = register_request("alice@example.com", "pw", "  ");
        let result = no_name.validate(&no_name);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "name"));

        let long_name = register_request("alice@example.com", "pw", &"x".repeat(101));
        assert!(!long_name.validate(&long_name).is_valid);
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn register_request(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            plan: None,
        }
    }
}
