pub const APP_NAME: &str = "craft-or-buy";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with every Universalis request.
pub fn user_agent() -> String {
    format!("{APP_NAME}/{APP_VERSION}")
}
