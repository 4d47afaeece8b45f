use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorConversion, ErrorType, Result};
use crate::wake::Lateness;

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct PhotoSubmission {
    /// The picture itself, as a data URL
    pub photo_url: String,
    pub timestamp: DateTime<Utc>,
}

impl PhotoSubmission {
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.timestamp.with_timezone(&offset).date_naive()
    }
}

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
];

/// A picture picked by the user, checked to be an image
#[derive(Debug)]
pub struct PhotoFile {
    name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn mime_type(name: &str) -> Option<&'static str> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        IMAGE_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| *mime)
    }

    /// The type is checked before anything is read
    pub fn open(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let mime = Self::mime_type(&name)
            .ok_or_else(|| Error::from(ErrorType::InvalidFileType(name.clone())))?;
        let bytes = fs::read(path)
            .map_err(Error::from)
            .with_trace_step(format!("reading {}", name))?;
        Ok(Self { name, mime, bytes })
    }

    #[cfg(test)]
    pub fn from_bytes<S: ToString>(name: S, bytes: Vec<u8>) -> Result<Self> {
        let name = name.to_string();
        match Self::mime_type(&name) {
            Some(mime) => Ok(Self { name, mime, bytes }),
            None => Err(ErrorType::InvalidFileType(name).into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

pub fn submitted_on(submissions: &[PhotoSubmission], day: NaiveDate, offset: FixedOffset) -> bool {
    submissions.iter().any(|s| s.local_date(offset) == day)
}

/// Late with the challenge enabled and no photo for today yet
pub fn photo_required(
    lateness: Lateness,
    submissions: &[PhotoSubmission],
    today: NaiveDate,
    offset: FixedOffset,
) -> bool {
    lateness.is_late && !submitted_on(submissions, today, offset)
}
