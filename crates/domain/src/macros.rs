//! Macro for implementing Display and FromStr for label enums
//!
//! Metric kinds and health statuses travel as lowercase labels in documents,
//! config files and tags. The macro keeps the two directions in one table.
//!
//! # Example
//!
//! ```rust
//! use metricsink_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Format {
//!     Bulk,
//!     LineProtocol,
//! }
//!
//! impl_label_conversions!(Format {
//!     Bulk => "bulk",
//!     LineProtocol => "line_protocol",
//! });
//! ```

/// Implements Display and FromStr for label enums
///
/// Parsing is case-insensitive; display always emits the table label.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Lowercase label of this variant
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
