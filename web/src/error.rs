use std::error::Error as StdError;

use aad_auth::error::{Error as AuthError, ErrorKind, ProviderExchangeErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(AuthError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            ErrorKind::Configuration(kind) => {
                error!("Sign-in is misconfigured: {kind:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
            ErrorKind::Csrf(_) => (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response(),
            ErrorKind::ProviderExchange(exchange_error_kind) => match exchange_error_kind {
                ProviderExchangeErrorKind::MissingCode => {
                    (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
                }
                ProviderExchangeErrorKind::Provider(_) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
                }
                ProviderExchangeErrorKind::Network
                | ProviderExchangeErrorKind::Timeout
                | ProviderExchangeErrorKind::InvalidResponse => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                }
            },
            ErrorKind::Session(kind) => {
                error!("Session store failure: {kind:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<AuthError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
