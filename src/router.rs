//! Route guard
//!
//! Every command belongs to one of four views. Protected views need a
//! session; the login and register views are only for logged-out users.

use std::fmt;

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Settings,
}

impl Route {
    /// Map a path to a route; `/` and unknown paths land on the dashboard
    pub fn parse(path: &str) -> Route {
        let path = path.trim().trim_end_matches('/');
        match path {
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/settings" => Route::Settings,
            _ => Route::Dashboard,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Settings => "/settings",
        }
    }

    /// Requires an active session
    pub fn is_protected(self) -> bool {
        matches!(self, Route::Dashboard | Route::Settings)
    }

    /// Login or registration view
    pub fn is_auth(self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Where a navigation to `requested` actually ends up
pub fn resolve(requested: Route, authenticated: bool) -> Route {
    if requested.is_protected() && !authenticated {
        Route::Login
    } else if requested.is_auth() && authenticated {
        Route::Dashboard
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths() {
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/register/"), Route::Register);
        assert_eq!(Route::parse("/settings"), Route::Settings);
        assert_eq!(Route::parse("/"), Route::Dashboard);
        assert_eq!(Route::parse(""), Route::Dashboard);
        assert_eq!(Route::parse("/nope"), Route::Dashboard);
    }

    #[test]
    fn test_protected_routes_require_session() {
        assert_eq!(resolve(Route::Dashboard, false), Route::Login);
        assert_eq!(resolve(Route::Settings, false), Route::Login);
        assert_eq!(resolve(Route::Dashboard, true), Route::Dashboard);
        assert_eq!(resolve(Route::Settings, true), Route::Settings);
    }

    #[test]
    fn test_auth_routes_redirect_when_logged_in() {
        assert_eq!(resolve(Route::Login, true), Route::Dashboard);
        assert_eq!(resolve(Route::Register, true), Route::Dashboard);
        assert_eq!(resolve(Route::Login, false), Route::Login);
        assert_eq!(resolve(Route::Register, false), Route::Register);
    }

    #[test]
    fn test_unknown_path_while_logged_out_goes_to_login() {
        assert_eq!(resolve(Route::parse("/whatever"), false), Route::Login);
    }
}
