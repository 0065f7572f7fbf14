use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

use crate::fare::EstimationError;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_not_found_error(&self) -> bool {
        self.code == 104
    }

    pub fn is_route_not_found_error(&self) -> bool {
        self.code == 107
    }

    pub fn is_internal(&self) -> bool {
        (1..=99).contains(&self.code)
    }

    fn status(&self) -> StatusCode {
        match self.code {
            1..=99 => StatusCode::INTERNAL_SERVER_ERROR,
            100 | 103 => StatusCode::CONFLICT,
            104 | 107 => StatusCode::NOT_FOUND,
            105 => StatusCode::UNAUTHORIZED,
            106 => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        let is_unique_violation = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map_or(false, |code| code == "23505");

        if is_unique_violation {
            return conflict_error();
        }

        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        tracing::error!("authorization policy error: {}", err);
        unexpected_error()
    }
}

impl From<EstimationError> for Error {
    fn from(err: EstimationError) -> Self {
        match err {
            EstimationError::RouteNotFound => route_not_found_error(),
            EstimationError::EstimationUnavailable => upstream_error(),
            EstimationError::InvalidDistance | EstimationError::InvalidHour => {
                validation_error(err.to_string())
            }
            EstimationError::InvalidConfig => unexpected_error(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.is_internal() {
            true => "Internal Server Error",
            false => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_invocation_error() -> Error {
    Error {
        code: 100,
        message: "invalid invocation".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

pub fn validation_error(message: impl Into<String>) -> Error {
    Error {
        code: 102,
        message: message.into(),
    }
}

pub fn conflict_error() -> Error {
    Error {
        code: 103,
        message: "resource already exists".into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: 104,
        message: "not found".into(),
    }
}

pub fn unauthenticated_error() -> Error {
    Error {
        code: 105,
        message: "authentication required".into(),
    }
}

pub fn forbidden_error() -> Error {
    Error {
        code: 106,
        message: "forbidden".into(),
    }
}

pub fn route_not_found_error() -> Error {
    Error {
        code: 107,
        message: "route not found".into(),
    }
}

pub fn env_var_error(err: env::VarError) -> Error {
    tracing::error!("environment variable error: {}", err);
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);
    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    tracing::error!("reqwest error: {}", err);
    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

pub fn config_error(message: impl Into<String>) -> Error {
    Error {
        code: 6,
        message: message.into(),
    }
}
