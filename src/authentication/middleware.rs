use warp::{reject::Rejection, Filter};

use crate::error::{Error, HtmlError};

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

/// Token from an `Authorization: Token <jwt>` or `Authorization: Bearer <jwt>` header.
pub fn parse_authorization(header: &str) -> Result<&str, Error> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") =>
        {
            Ok(token)
        }
        _ => Err(HtmlError::InvalidSession.new("Invalid token header.")),
    }
}

fn session_from_header(header: &str, key: &SessionKey) -> Result<SessionData, Error> {
    let token = parse_authorization(header)?;
    verify_jwt_session(token, key).map(SessionData::from)
}

fn with_key(key: SessionKey) -> impl Filter<Extract = (SessionKey,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || key.clone())
}

/// Requires a valid session, 401 otherwise.
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_key(key))
        .and_then(|header: Option<String>, key: SessionKey| async move {
            let Some(header) = header else {
                return Err(Rejection::from(HtmlError::Unauthorized.default()));
            };
            session_from_header(&header, &key).map_err(Rejection::from)
        })
}

/// Anonymous requests pass through as `None`; a header that is present but
/// invalid still fails with 401.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_key(key))
        .and_then(|header: Option<String>, key: SessionKey| async move {
            match header {
                None => Ok(None),
                Some(header) => session_from_header(&header, &key)
                    .map(Some)
                    .map_err(Rejection::from),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(parse_authorization("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(parse_authorization("token   abc").unwrap(), "abc");
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(parse_authorization("abc.def.ghi").is_err());
        assert!(parse_authorization("Basic dXNlcjpwYXNz").is_err());
        assert!(parse_authorization("Token a b").is_err());
        assert_eq!(parse_authorization("").unwrap_err().code, 401);
    }
}
