use std::{fmt, str::FromStr};

use diesel::{AsExpression, FromSqlRow, sql_types::BigInt};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    AdminQueue, OperationalStatus, ReportId, ReportVersion, UnixTime, UserId, Verdict,
    VerificationFlags, VerificationState, macros::diesel_i64_try_from,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReportInputError {
    #[error("Description is empty")]
    EmptyDescription,
    #[error("Description is too long, max length is {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Unknown urgency level: {0}")]
    UnknownUrgency(String),
    #[error("Latitude {0} is not in range [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} is not in range [-180, 180]")]
    InvalidLongitude(f64),
    #[error("Location is not in format 'latitude,longitude': {0}")]
    UnparsableLocation(String),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[repr(i64)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Flood = 0,
    Earthquake = 1,
    Fire = 2,
    Cyclone = 3,
    Landslide = 4,
    Drought = 5,
    Accident = 6,
    Medical = 7,
    Other = 8,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Flood,
        Self::Earthquake,
        Self::Fire,
        Self::Cyclone,
        Self::Landslide,
        Self::Drought,
        Self::Accident,
        Self::Medical,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flood => "flood",
            Self::Earthquake => "earthquake",
            Self::Fire => "fire",
            Self::Cyclone => "cyclone",
            Self::Landslide => "landslide",
            Self::Drought => "drought",
            Self::Accident => "accident",
            Self::Medical => "medical",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ReportInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or(ReportInputError::UnknownCategory(s.to_string()))
    }
}

diesel_i64_try_from!(Category);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[repr(i64)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Default for UrgencyLevel {
    fn default() -> Self {
        Self::Medium
    }
}

impl UrgencyLevel {
    /// Smaller number is handled first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }

    pub fn estimated_response_minutes(&self) -> u32 {
        match self {
            Self::Critical => 30,
            Self::High => 60,
            Self::Medium => 360,
            Self::Low => 1440,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for UrgencyLevel {
    type Err = ReportInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ReportInputError::UnknownUrgency(s.to_string())),
        }
    }
}

diesel_i64_try_from!(UrgencyLevel);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl Location {
    pub fn new(
        latitude: f64,
        longitude: f64,
        address: Option<String>,
    ) -> Result<Self, ReportInputError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ReportInputError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ReportInputError::InvalidLongitude(longitude));
        }
        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Ok(Self {
            latitude,
            longitude,
            address,
        })
    }

    /// Parse "latitude,longitude".
    pub fn parse(value: &str, address: Option<String>) -> Result<Self, ReportInputError> {
        let unparsable = || ReportInputError::UnparsableLocation(value.to_string());
        let (lat, lng) = value.split_once(',').ok_or_else(unparsable)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| unparsable())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| unparsable())?;
        Self::new(lat, lng, address)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// Attachment presence only. Attachment bytes are handled elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaAttachments {
    pub has_image: bool,
    pub has_audio: bool,
}

impl MediaAttachments {
    pub fn any(&self) -> bool {
        self.has_image || self.has_audio
    }

    fn describe(&self) -> Option<&'static str> {
        match (self.has_image, self.has_audio) {
            (true, true) => Some("image and audio"),
            (true, false) => Some("image"),
            (false, true) => Some("audio"),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
    pub submitter: UserId,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub urgency: UrgencyLevel,
    pub location: Location,
    #[serde(default)]
    pub affected_people: u32,
    #[serde(default)]
    pub media: MediaAttachments,
}

impl NewReport {
    pub const DESCRIPTION_MAX_LEN: usize = 2000;

    /// Location and category are validated when those are constructed.
    pub fn validate(&self) -> Result<(), ReportInputError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ReportInputError::EmptyDescription);
        }
        if description.graphemes(true).count() > Self::DESCRIPTION_MAX_LEN {
            return Err(ReportInputError::DescriptionTooLong {
                max: Self::DESCRIPTION_MAX_LEN,
            });
        }
        Ok(())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
#[repr(i64)]
#[serde(rename_all = "snake_case")]
pub enum NoteAuthor {
    System = 0,
    Admin = 1,
    Submitter = 2,
}

diesel_i64_try_from!(NoteAuthor);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNote {
    pub content: String,
    pub author: NoteAuthor,
    pub added_at: UnixTime,
}

impl ReportNote {
    pub fn new(content: impl Into<String>, author: NoteAuthor, added_at: UnixTime) -> Self {
        Self {
            content: content.into(),
            author,
            added_at,
        }
    }

    pub fn submission(media: MediaAttachments, added_at: UnixTime) -> Self {
        let content = match media.describe() {
            Some(media) => format!("Report submitted with {media} attachment"),
            None => "Report submitted".to_string(),
        };
        Self::new(content, NoteAuthor::System, added_at)
    }

    pub fn status_change(status: OperationalStatus, author: NoteAuthor, added_at: UnixTime) -> Self {
        Self::new(
            format!("Status changed to: {}", status.as_str()),
            author,
            added_at,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub submitter: UserId,
    pub description: String,
    pub category: Category,
    pub urgency: UrgencyLevel,
    pub location: Location,
    pub affected_people: u32,
    pub media: MediaAttachments,
    pub status: OperationalStatus,
    pub verification: VerificationState,
    pub validation_reason: String,
    pub manual_verification_reason: Option<String>,
    pub verdicts: Vec<Verdict>,
    pub notes: Vec<ReportNote>,
    pub version: ReportVersion,
    pub created_at: UnixTime,
    pub updated_at: UnixTime,
    pub resolved_at: Option<UnixTime>,
}

impl Report {
    /// Report which is waiting for the verification pipeline. This is never
    /// persisted.
    pub fn from_submission(new: NewReport, id: ReportId, now: UnixTime) -> Self {
        let note = ReportNote::submission(new.media, now);
        Self {
            id,
            submitter: new.submitter,
            description: new.description.trim().to_string(),
            category: new.category,
            urgency: new.urgency,
            location: new.location,
            affected_people: new.affected_people,
            media: new.media,
            status: OperationalStatus::Pending,
            verification: VerificationState::PendingPipeline,
            validation_reason: String::new(),
            manual_verification_reason: None,
            verdicts: vec![],
            notes: vec![note],
            version: ReportVersion::default(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    pub fn flags(&self) -> Option<VerificationFlags> {
        self.verification.flags()
    }

    pub fn admin_queue(&self) -> Option<AdminQueue> {
        self.verification.admin_queue()
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_verified()
    }

    pub fn priority(&self) -> u8 {
        self.urgency.priority()
    }

    pub fn estimated_response_minutes(&self) -> u32 {
        self.urgency.estimated_response_minutes()
    }
}
