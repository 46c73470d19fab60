use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKey},
    },
    error::{Error, FieldErrors, HtmlError, QueryError},
    pagination::PageParams,
    schema::{Id, User, UserRead, UserRow},
    validation::{validate_password, Credentials, NewUser, PasswordChange},
};

const USER_READ_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed
";

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates the account with a hashed password. Taken emails and usernames
/// are reported under their field names.
pub async fn register_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let (email_taken, username_taken): (Option<bool>, Option<bool>) = sqlx::query_as(
        "
        SELECT BOOL_OR(LOWER(email) = LOWER($1)), BOOL_OR(username = $2)
        FROM users
        WHERE LOWER(email) = LOWER($1) OR username = $2
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    let mut errors = FieldErrors::new();
    if email_taken.unwrap_or(false) {
        errors.insert(
            String::from("email"),
            vec![String::from("A user with that email already exists.")],
        );
    }
    if username_taken.unwrap_or(false) {
        errors.insert(
            String::from("username"),
            vec![String::from("A user with that username already exists.")],
        );
    }
    if !errors.is_empty() {
        return Err(HtmlError::InvalidRequest.fields(errors));
    }

    let password = hash_password(&user.password)?;
    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", row.id, row.username);
    Ok(row)
}

/// Checks the credentials and signs a new session token.
pub async fn login_user(
    credentials: &Credentials,
    key: &SessionKey,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let invalid = || {
        Error::field(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        )
    };

    let user = get_user_by_email(&credentials.email, pool)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&credentials.password, &user.password) {
        log::debug!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    generate_jwt_session(&user, key)
}

/// One page of users ordered by id, as seen by `viewer`.
pub async fn fetch_users(
    viewer: Option<Id>,
    params: &PageParams,
    pool: &Pool<Postgres>,
) -> Result<(Vec<UserRead>, i64), Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "
        SELECT {USER_READ_COLUMNS}, COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(viewer)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
}

pub async fn get_user_read(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserRead>, Error> {
    let row: Option<UserRead> = sqlx::query_as(&format!(
        "SELECT {USER_READ_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn set_password(
    user_id: Id,
    change: &PasswordChange,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(user_id, pool)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.default())?;

    let mut errors = FieldErrors::new();
    if !verify_password(&change.current_password, &user.password) {
        errors.insert(
            String::from("current_password"),
            vec![String::from("Invalid password.")],
        );
    }
    let rules = validate_password(&change.new_password, &user.username, &user.email);
    if !rules.is_empty() {
        errors.insert(String::from("new_password"), rules);
    }
    if !errors.is_empty() {
        return Err(HtmlError::InvalidRequest.fields(errors));
    }

    let password = hash_password(&change.new_password)?;
    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {user_id} changed their password");
    Ok(())
}
