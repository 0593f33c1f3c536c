mod list;
mod update;

use axum::{routing::{get, put}, Router};

use crate::AppState;

pub use list::list_users;
pub use update::update_profile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list::get_users))
        .route("/profile", put(update::put_profile))
}
