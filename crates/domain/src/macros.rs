//! Text conversions for the small enums stored as TEXT columns
//!
//! Each variant gets one canonical lowercase name, used by `Display`, plus
//! any number of aliases accepted when parsing. Parsing ignores ASCII case
//! and surrounding whitespace, so values written by other tools
//! (`"startsWith"`, `" SUM "`) still round-trip.
//!
//! # Example
//!
//! ```rust
//! use dashsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum JobState {
//!     Running,
//!     Completed,
//!     Error,
//! }
//!
//! impl_domain_status_conversions!(JobState {
//!     Running => "running",
//!     Completed => "completed" | "done",
//!     Error => "error",
//! });
//!
//! assert_eq!(JobState::Completed.to_string(), "completed");
//! assert_eq!("DONE".parse::<JobState>(), Ok(JobState::Completed));
//! assert_eq!(JobState::VARIANTS.len(), 3);
//! ```

/// Implements `as_str`, `VARIANTS`, `Display` and `FromStr` for a fieldless
/// enum.
///
/// * `$variant => "name"` - canonical text for the variant
/// * `| "alias"` - extra spellings accepted by `FromStr`
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order.
            pub const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical text form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $(
                    if needle.eq_ignore_ascii_case($str)
                        $(|| needle.eq_ignore_ascii_case($alias))*
                    {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
