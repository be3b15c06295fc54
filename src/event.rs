use std::{borrow::Cow, fmt::Debug, hash::Hash};

/// Routing key of an event: a closed, fieldless enumeration.
///
/// The set of kinds is fixed at compile time. Handlers are registered per
/// kind and producers pick from [`EventKind::variants`]. Data belongs in the
/// envelope payload, never in the kind itself.
///
/// With the `macros` feature, `#[derive(EventKind)]` implements both methods
/// for any enum with unit variants.
///
/// ```rust
/// use evroute::EventKind;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EventKind)]
/// enum Payment {
///     Authorized,
///     Refunded,
/// }
///
/// assert_eq!(Payment::Refunded.name(), "Refunded");
/// assert_eq!(Payment::variants().len(), 2);
/// ```
pub trait EventKind: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Human-readable name of the kind, used in logs and default payloads.
    fn name(&self) -> Cow<'static, str>;

    /// Every kind in the enumeration, in declaration order.
    fn variants() -> &'static [Self];
}

/// Kinds of user-activity events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UserEvent {
    Login,
    Logout,
    Purchase,
}

impl EventKind for UserEvent {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            UserEvent::Login => "Login",
            UserEvent::Logout => "Logout",
            UserEvent::Purchase => "Purchase",
        })
    }

    fn variants() -> &'static [Self] {
        &[UserEvent::Login, UserEvent::Logout, UserEvent::Purchase]
    }
}

impl std::fmt::Display for UserEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
