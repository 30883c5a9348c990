//! Tri-state compatibility settings.
//!
//! Every Deferred carries three settings that tune how continuations are
//! invoked. Each one is a [`Setting`]: either an explicit choice or
//! `Inherit`, in which case the registry default applies, and when that is
//! also `Inherit` the fixed fallback of `true`.
//!
//! Raw TOML structs with `Option<bool>` fields stay private in
//! `remoter-config`; they convert into [`Settings`] at the parse boundary.

use std::fmt;

/// Value used when neither the instance nor the registry decides.
pub const FALLBACK: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Setting {
    #[default]
    Inherit,
    Enabled,
    Disabled,
}

impl Setting {
    /// Resolve against the next layer down, then the fixed fallback.
    #[must_use]
    pub fn resolve(self, inherited: Setting) -> bool {
        match (self, inherited) {
            (Self::Enabled, _) | (Self::Inherit, Self::Enabled) => true,
            (Self::Disabled, _) | (Self::Inherit, Self::Disabled) => false,
            (Self::Inherit, Self::Inherit) => FALLBACK,
        }
    }

    #[must_use]
    pub fn is_inherit(self) -> bool {
        self == Self::Inherit
    }
}

impl From<bool> for Setting {
    fn from(value: bool) -> Self {
        if value { Self::Enabled } else { Self::Disabled }
    }
}

impl From<Option<bool>> for Setting {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Inherit, Self::from)
    }
}

impl From<Setting> for Option<bool> {
    fn from(value: Setting) -> Self {
        match value {
            Setting::Inherit => None,
            Setting::Enabled => Some(true),
            Setting::Disabled => Some(false),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inherit => "inherit",
            Self::Enabled => "true",
            Self::Disabled => "false",
        })
    }
}

/// The three settings, at one layer (instance or registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Arrow-style handlers get the instance appended as a trailing argument.
    pub instance_argument: Setting,
    /// Finally handlers receive the settlement outcome.
    pub finally_argument: Setting,
    /// Chaining returns decorated Deferreds instead of plain futures.
    pub native_composition: Setting,
}

impl Settings {
    /// Resolve every setting of this layer against `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: &Settings) -> ResolvedSettings {
        ResolvedSettings {
            instance_argument: self.instance_argument.resolve(defaults.instance_argument),
            finally_argument: self.finally_argument.resolve(defaults.finally_argument),
            native_composition: self
                .native_composition
                .resolve(defaults.native_composition),
        }
    }
}

/// Effective settings after resolution. No `Inherit` left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub instance_argument: bool,
    pub finally_argument: bool,
    pub native_composition: bool,
}
