//! Wire envelope shared by the control and publish paths.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Action carried by an [`Envelope`].
///
/// Any string outside the known set (including the empty string, `null`,
/// or a missing field) decodes to [`Action::Unknown`] instead of failing, so
/// callers can answer it with an "invalid message" rather than a decode
/// error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Join the broadcast set.
    Subscribe,
    /// Leave the broadcast set and close the connection.
    Unsubscribe,
    /// Broadcast `message` to every subscriber.
    Publish,
    /// Anything else.
    #[default]
    #[serde(other)]
    Unknown,
}

/// `{"action": ..., "message": ...}` unit exchanged with clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    /// What the sender wants done.
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: Action,
    /// Free-form payload, meaningful only for [`Action::Publish`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl Envelope {
    /// Builds a publish envelope.
    #[must_use]
    pub fn publish(message: impl Into<String>) -> Self {
        Self {
            action: Action::Publish,
            message: message.into(),
        }
    }

    /// Decodes the first envelope in `bytes`.
    ///
    /// Anything after the first JSON value is ignored.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when `bytes` does not start with a JSON
    /// object of the expected shape, or is empty.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::Deserializer::from_slice(bytes)
            .into_iter::<Self>()
            .next()
            .unwrap_or_else(|| {
                Err(serde::de::Error::custom("unexpected end of input"))
            })
    }
}

/// Deserializes `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
