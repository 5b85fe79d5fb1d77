use crate::error::AppError;
use crate::model::user::User;
use crate::models::Claims;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_token(user: &User, secret: &str, ttl: usize) -> Result<String, AppError> {
    let claims = Claims {
        user_id: user.id,
        sub: user.email.clone(),
        role: user.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::user::{Credentials, LeaveBalances};

    fn manager() -> User {
        User {
            id: 9,
            name: "Mia".into(),
            email: "mia@example.com".into(),
            credentials: Credentials::Password { hash: "x".into() },
            role: Role::Manager,
            leave_balances: LeaveBalances::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_identity_and_role() {
        let token = generate_token(&manager(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.sub, "mia@example.com");
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&manager(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
