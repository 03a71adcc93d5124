use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(WordlistId);
id_newtype!(WordId);

/// History label the backend assigns to a word. Only used client-side to pick
/// the phase a review turn starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecallClassification {
    Unknown,
    #[serde(alias = "PARTIALLY_KNOWN")]
    HalfKnown,
    Known,
    /// Any label this client does not recognise. Treated as a seen word.
    #[serde(other)]
    Other,
}

impl RecallClassification {
    pub fn is_unseen(self) -> bool {
        self == Self::Unknown
    }
}

/// The user's self-assessed recall for the word under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Known,
    NotKnown,
}

impl Judgment {
    pub fn is_known(self) -> bool {
        self == Self::Known
    }
}
