//! Screen implementations. Each screen is a top-level Component.

pub mod dashboard;
pub mod mapping;
pub mod register;
pub mod sign_in;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create all screen components, auth screens included.
///
/// `backend` is the URL label shown on the sign-in panel;
/// `prefill_user` seeds the username field from a stored session or
/// the active profile.
pub fn create_screens(
    backend: String,
    prefill_user: Option<String>,
) -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (
            ScreenId::SignIn,
            Box::new(sign_in::SignInScreen::new(backend, prefill_user)),
        ),
        (
            ScreenId::Register,
            Box::new(register::RegisterScreen::new()),
        ),
        (
            ScreenId::Dashboard,
            Box::new(dashboard::DashboardScreen::new()),
        ),
        (ScreenId::Mapping, Box::new(mapping::MappingScreen::new())),
    ]
}
