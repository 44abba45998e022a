pub use http::StatusCode;

/// Anything that may carry an HTTP status. Callers branch on the status rather than on error
/// types, e.g. `409` after an optimistic update means "re-fetch and merge again".
pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }

    fn is_conflict(&self) -> bool {
        self.is_status_code(StatusCode::CONFLICT)
    }

    fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }
}

impl<T, E> HttpStatusCode for std::result::Result<T, E>
where
    T: HttpStatusCode,
    E: HttpStatusCode,
{
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            Ok(t) => t.status_code(),
            Err(e) => e.status_code(),
        }
    }
}
