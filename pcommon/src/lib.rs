//! Shared identifiers and future aliases for workspace crates.
//!
//! ```rust
//! use pcommon::{ConversationId, MessageId, UserId};
//!
//! let user = UserId::from("user-1");
//! let conversation = ConversationId::new("conv-1");
//! let message = MessageId::new(7);
//!
//! assert_eq!(user.as_str(), "user-1");
//! assert_eq!(conversation.to_string(), "conv-1");
//! assert_eq!(message.get(), 7);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use pcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod ids {
    //! Cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use pcommon::{ConversationId, UserId};
    //!
    //! let user = UserId::new("alice");
    //! let conversation = ConversationId::from("c-42");
    //!
    //! assert_eq!(user.to_string(), "alice");
    //! assert_eq!(conversation.as_str(), "c-42");
    //! ```

    use std::fmt::{Display, Formatter};

    macro_rules! string_id {
        ($name:ident) => {
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(UserId);
    string_id!(ConversationId);

    /// Monotonic per-store message sequence number.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct MessageId(u64);

    impl MessageId {
        pub fn new(value: u64) -> Self {
            Self(value)
        }

        pub fn get(self) -> u64 {
            self.0
        }
    }

    impl Display for MessageId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

pub use future::BoxFuture;
pub use ids::{ConversationId, MessageId, UserId};

#[cfg(test)]
mod tests {
    use super::{ConversationId, MessageId, UserId};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let user = UserId::new("user-1");
        let conversation = ConversationId::from("conv-1");

        assert_eq!(user.as_str(), "user-1");
        assert_eq!(conversation.as_str(), "conv-1");
        assert_eq!(user.to_string(), "user-1");
        assert_eq!(conversation.to_string(), "conv-1");
    }

    #[test]
    fn message_ids_order_by_sequence() {
        let first = MessageId::new(1);
        let second = MessageId::new(2);

        assert!(first < second);
        assert_eq!(second.to_string(), "2");
    }
}
