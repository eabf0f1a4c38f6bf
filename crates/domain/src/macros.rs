//! Display/FromStr for wire-named enums
//!
//! Enum states are logged and serialized with snake_case names. This macro
//! keeps `Display` and `FromStr` consistent with those names.
//!
//! ```rust
//! use wavelink_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum LinkQuality {
//!     Good,
//!     Poor,
//! }
//!
//! impl_status_conversions!(LinkQuality {
//!     Good => "good",
//!     Poor => "poor",
//! });
//!
//! assert_eq!(LinkQuality::Poor.to_string(), "poor");
//! assert_eq!("GOOD".parse::<LinkQuality>(), Ok(LinkQuality::Good));
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a fieldless enum.
///
/// Names must be lowercase. Parsing errors name the enum and the rejected
/// input.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name of this variant
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
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Idle,
        Backoff,
        ReconnectWaiting,
    }

    impl_status_conversions!(Phase {
        Idle => "idle",
        Backoff => "backoff",
        ReconnectWaiting => "reconnect_waiting",
    });

    #[test]
    fn test_display_uses_wire_name() {
        assert_eq!(Phase::Idle.to_string(), "idle");
        assert_eq!(Phase::ReconnectWaiting.to_string(), "reconnect_waiting");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Phase::from_str("BACKOFF").unwrap(), Phase::Backoff);
        assert_eq!(Phase::from_str("Reconnect_Waiting").unwrap(), Phase::ReconnectWaiting);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = Phase::from_str("reconnecting").unwrap_err();
        assert_eq!(err, "Invalid Phase: reconnecting");
        assert!(Phase::from_str("").is_err());
    }
}
