pub mod activity;
pub mod gate;
pub mod response;

pub use activity::{require_admin, track_activity};
pub use gate::{identity_gate, session_token, CurrentSession};
pub use response::{ApiResponse, ApiResult, IntoApiResponse};
