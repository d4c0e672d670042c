use crate::error::ApiError;

/// Answer for a known path hit with the wrong method.
///
/// Every mutating endpoint is POST-only, so the message names POST.
pub async fn method_not_allowed() -> ApiError {
    ApiError::bad_request("Only POST allowed")
}
