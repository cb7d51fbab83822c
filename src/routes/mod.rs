/// Router Module Index
///
/// Routes are split by who may call them; each module is layered with its own
/// authentication in `create_router`.

/// Anonymous access: health, dealer registration/login/setup, public car feeds.
pub mod public;

/// Dealer dashboard, behind the `AuthDealer` session cookie.
pub mod dealer;

/// Back office, behind the `AdminUser` JWT check.
pub mod admin;
