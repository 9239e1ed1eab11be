use std::fmt;

use serde::{Deserialize, Serialize};

use crate::columns;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Patient identifier.
    SubjectId
);
numeric_id!(
    /// Hospital admission identifier.
    AdmissionId
);
numeric_id!(
    /// ICU stay identifier.
    StayId
);

/// Composite identifier of the records belonging to one subject / admission / stay.
///
/// The stay component is only populated from the terminal stage onward; earlier
/// sources are keyed at admission granularity and carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub subject_id: SubjectId,
    pub admission_id: AdmissionId,
    pub stay_id: Option<StayId>,
}

impl EntityKey {
    pub fn new(subject_id: impl Into<SubjectId>, admission_id: impl Into<AdmissionId>) -> Self {
        Self {
            subject_id: subject_id.into(),
            admission_id: admission_id.into(),
            stay_id: None,
        }
    }

    #[must_use]
    pub fn with_stay(mut self, stay_id: impl Into<StayId>) -> Self {
        self.stay_id = Some(stay_id.into());
        self
    }

    /// The subject + admission projection of this key.
    pub fn admission(&self) -> (SubjectId, AdmissionId) {
        (self.subject_id, self.admission_id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stay_id {
            Some(stay) => write!(f, "{}/{}/{}", self.subject_id, self.admission_id, stay),
            None => write!(f, "{}/{}", self.subject_id, self.admission_id),
        }
    }
}

/// One component a join or grouping can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPart {
    Subject,
    Admission,
    Stay,
    Timestamp,
}

impl KeyPart {
    /// Subject + admission.
    pub const ADMISSION: &'static [KeyPart] = &[KeyPart::Subject, KeyPart::Admission];
    /// Subject + admission + stay.
    pub const STAY: &'static [KeyPart] = &[KeyPart::Subject, KeyPart::Admission, KeyPart::Stay];
    /// Subject + admission + stay + timestamp.
    pub const CHART: &'static [KeyPart] = &[
        KeyPart::Subject,
        KeyPart::Admission,
        KeyPart::Stay,
        KeyPart::Timestamp,
    ];

    pub const ALL: [KeyPart; 4] = [
        KeyPart::Subject,
        KeyPart::Admission,
        KeyPart::Stay,
        KeyPart::Timestamp,
    ];

    /// Canonical column holding this key part.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyPart::Subject => columns::SUBJECT_ID,
            KeyPart::Admission => columns::ADMISSION_ID,
            KeyPart::Stay => columns::STAY_ID,
            KeyPart::Timestamp => columns::TIMESTAMP,
        }
    }

    /// The key part stored in `column`, if it is a key column at all.
    pub fn from_column(column: &str) -> Option<KeyPart> {
        KeyPart::ALL.into_iter().find(|part| part.as_str() == column)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
