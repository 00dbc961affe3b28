//! Screen identifier enum.

use std::fmt;

/// Identifies each TUI screen. Dashboard and Mapping sit in the tab
/// bar and are reachable by number keys; SignIn and Register make up
/// the logged-out world and render full-screen without chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    SignIn,
    Register,
    Dashboard, // 1
    Mapping,   // 2
}

impl ScreenId {
    /// Screens in tab-bar order.
    pub const TABS: [ScreenId; 2] = [Self::Dashboard, Self::Mapping];

    /// Numeric key for tab-bar screens. Auth screens have none.
    pub fn number(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::Mapping => 2,
            Self::SignIn | Self::Register => 0,
        }
    }

    /// Screen from a numeric key. Returns None for out-of-range.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Dashboard),
            2 => Some(Self::Mapping),
            _ => None,
        }
    }

    /// Next tab-bar screen (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::TABS.iter().position(|&s| s == self).unwrap_or(0);
        Self::TABS[(idx + 1) % Self::TABS.len()]
    }

    /// Previous tab-bar screen (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::TABS.iter().position(|&s| s == self).unwrap_or(0);
        Self::TABS[(idx + Self::TABS.len() - 1) % Self::TABS.len()]
    }

    /// True for the logged-out screens that own the whole frame.
    pub fn is_auth(self) -> bool {
        matches!(self, Self::SignIn | Self::Register)
    }

    /// Short label for the tab bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::SignIn => "Sign in",
            Self::Register => "Register",
            Self::Dashboard => "Dashboard",
            Self::Mapping => "Mapping",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
