use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    constants::{EMAIL_MAX_LENGTH, FORBIDDEN_USERNAMES, USERNAME_MAX_LENGTH},
    error::{ApiError, QueryError},
    schema::{SignUpForm, User, UserView, Uuid},
};

use super::subscriptions::is_subscribed;

/// Username charset mirrors the storage-level check: word characters plus
/// `. @ + -`, and never a reserved value.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() || username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(ApiError::validation(
            "username",
            &format!("Username must be 1-{USERNAME_MAX_LENGTH} characters"),
        ));
    }

    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if !valid {
        return Err(ApiError::validation(
            "username",
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }

    if FORBIDDEN_USERNAMES.contains(&username) {
        return Err(ApiError::validation("username", "This username is reserved"));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.chars().count() > EMAIL_MAX_LENGTH || !email.contains('@') {
        return Err(ApiError::validation("email", "Enter a valid email address"));
    }

    Ok(())
}

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user, storing the argon2 hash of their password. A duplicate
/// email or username fails as a validation error.
pub async fn register_user(form: &SignUpForm, pool: &Pool<Postgres>) -> Result<Uuid, ApiError> {
    validate_username(&form.username)?;
    validate_email(&form.email)?;
    if form.password.is_empty() {
        return Err(ApiError::validation("password", "This field is required"));
    }

    let password = hash_password(&form.password)?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, password, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(password)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some((id,)) => {
            log::info!("registered user {}", form.username);
            Ok(id)
        }
        None => Err(ApiError::invalid(
            "A user with this email or username already exists",
        )),
    }
}

/// Email is the login key. A wrong email and a wrong password fail with the
/// same error so the response does not leak which one it was.
pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(ApiError::invalid("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password)?;
    if !authenticated {
        return Err(ApiError::invalid("Invalid credentials"));
    }

    generate_jwt_session(&user)
}

/// Stores a new avatar reference, or clears it when `avatar` is `None`.
pub async fn set_avatar(
    user_id: Uuid,
    avatar: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::NotFound(String::from(
            "No user exists with specified id",
        )));
    }

    Ok(())
}

/// Read-side user representation with the viewer-relative subscription flag.
pub async fn present_user(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserView, ApiError> {
    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => {
            return Err(ApiError::NotFound(String::from(
                "No user exists with specified id",
            )))
        }
    };

    let subscribed = match viewer {
        Some(viewer) => is_subscribed(viewer, user_id, pool).await?,
        None => false,
    };

    Ok(UserView {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        avatar: user.avatar,
        is_subscribed: subscribed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_accept_the_word_charset() {
        assert!(validate_username("chef_anna.92+test@kitchen-1").is_ok());
        assert!(validate_username("väinö").is_ok());
    }

    #[test]
    fn usernames_reject_other_punctuation() {
        assert!(validate_username("anna!").is_err());
        assert!(validate_username("anna smith").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn reserved_usernames_are_rejected() {
        assert!(validate_username("me").is_err());
        assert!(validate_username("mee").is_ok());
    }

    #[test]
    fn email_needs_an_at_sign_and_a_sane_length() {
        assert!(validate_email("anna@example.com").is_ok());
        assert!(validate_email("annaexample.com").is_err());
        assert!(validate_email("").is_err());
    }
}
