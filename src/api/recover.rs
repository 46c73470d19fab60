use std::convert::Infallible;

use warp::{
    reject::Rejection,
    reply::Response,
};

use crate::error::{Error, HtmlError};

/// Turns every rejection into a JSON error reply.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if let Some(error) = err.find::<Error>() {
        error.clone()
    } else if err.is_not_found() {
        HtmlError::NotFound.default()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        HtmlError::InvalidRequest.new(&format!("JSON parse error - {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        HtmlError::PayloadTooLarge.default()
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        HtmlError::InvalidRequest.new("Content-Length header is required.")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        HtmlError::UnsupportedMediaType.default()
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        HtmlError::InvalidRequest.new("Invalid query string.")
    } else if err.find::<warp::reject::InvalidHeader>().is_some() {
        HtmlError::InvalidSession.new("Invalid token header.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        HtmlError::MethodNotAllowed.default()
    } else {
        log::error!("Unhandled rejection: {err:?}");
        HtmlError::InternalServerError.default()
    };

    if error.code >= 500 {
        log::error!("Request failed: {error}");
    }
    Ok(error.into_response())
}
