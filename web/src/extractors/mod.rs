pub(crate) mod remote_identity;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
