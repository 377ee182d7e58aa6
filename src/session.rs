use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use colored::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    Matrix,
    Retro,
    Powershell,
    Executive,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Dark,
        Theme::Light,
        Theme::Matrix,
        Theme::Retro,
        Theme::Powershell,
        Theme::Executive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Matrix => "matrix",
            Theme::Retro => "retro",
            Theme::Powershell => "powershell",
            Theme::Executive => "executive",
        }
    }

    /// Colour of the prompt and command echoes.
    pub fn accent(self) -> Color {
        match self {
            Theme::Dark => Color::BrightGreen,
            Theme::Light => Color::Blue,
            Theme::Matrix => Color::Green,
            Theme::Retro => Color::Yellow,
            Theme::Powershell => Color::BrightCyan,
            Theme::Executive => Color::BrightWhite,
        }
    }

    /// Next theme in cycling order, wrapping around.
    pub fn next(self) -> Theme {
        let index = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match Self::ALL.iter().find(|t| t.name() == lower) {
            Some(theme) => Ok(*theme),
            None => bail!("Unknown theme: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    /// Injected browser/extension wallet.
    Browser,
    /// Wallet generated for this session.
    Session,
    /// Wallet restored from a private key.
    Imported,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Browser => f.write_str("browser wallet"),
            WalletKind::Session => f.write_str("session wallet"),
            WalletKind::Imported => f.write_str("imported wallet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WalletState {
    #[default]
    Disconnected,
    Connected { kind: WalletKind, account: String },
}

impl WalletState {
    pub fn account(&self) -> Option<&str> {
        match self {
            WalletState::Connected { account, .. } => Some(account),
            WalletState::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, WalletState::Connected { .. })
    }
}

/// Terminal state visible to command handlers.
///
/// Handlers get a snapshot and hand back a replacement through their
/// `Effect`; nothing mutates a session in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub theme: Theme,
    pub sound: bool,
    pub wallet: WalletState,
}

impl Session {
    pub fn new(theme: Theme, sound: bool) -> Self {
        Self {
            theme,
            sound,
            wallet: WalletState::Disconnected,
        }
    }

    pub fn with_theme(&self, theme: Theme) -> Self {
        Self {
            theme,
            ..self.clone()
        }
    }

    pub fn with_sound(&self, sound: bool) -> Self {
        Self {
            sound,
            ..self.clone()
        }
    }

    pub fn with_wallet(&self, kind: WalletKind, account: impl Into<String>) -> Self {
        Self {
            wallet: WalletState::Connected {
                kind,
                account: account.into(),
            },
            ..self.clone()
        }
    }

    pub fn disconnected(&self) -> Self {
        Self {
            wallet: WalletState::Disconnected,
            ..self.clone()
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Theme::Dark, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_cycle_wraps() {
        assert_eq!(Theme::Dark.next(), Theme::Light);
        assert_eq!(Theme::Executive.next(), Theme::Dark);
    }

    #[test]
    fn test_theme_accents_differ() {
        for (i, a) in Theme::ALL.iter().enumerate() {
            for b in &Theme::ALL[i + 1..] {
                assert_ne!(a.accent(), b.accent(), "{} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("MATRIX".parse::<Theme>().unwrap(), Theme::Matrix);
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn test_transitions_leave_original_untouched() {
        let session = Session::default();
        let connected = session.with_wallet(WalletKind::Session, "0xabc");

        assert!(!session.wallet.is_connected());
        assert_eq!(connected.wallet.account(), Some("0xabc"));
        assert_eq!(connected.theme, session.theme);

        let themed = connected.with_theme(Theme::Retro).with_sound(false);
        assert_eq!(themed.theme, Theme::Retro);
        assert!(!themed.sound);
        assert!(themed.wallet.is_connected());
        assert!(!themed.disconnected().wallet.is_connected());
    }
}
