//! Conversion between `ProfileRecord` and `Profile`.
//!
//! Pure and deterministic. `decode` never returns a partially filled profile:
//! either every required field is present with the right shape, or it fails.

use crate::error::DecodeFailure;
use crate::types::{Asset, FieldValue, Profile, ProfileImage, ProfileRecord};

/// Record field holding the first name
pub const FIELD_FIRST_NAME: &str = "firstName";
/// Record field holding the last name
pub const FIELD_LAST_NAME: &str = "lastName";
/// Record field holding the need statement
pub const FIELD_NEED: &str = "need";
/// Record field holding the skills list
pub const FIELD_SKILLS: &str = "skills";

/// Maps profile records to profiles and back
pub struct ProfileRecordCodec;

impl ProfileRecordCodec {
    /// Build a profile from a fetched record.
    pub fn decode(record: &ProfileRecord) -> Result<Profile, DecodeFailure> {
        let first_name = required_string(record, FIELD_FIRST_NAME)?;
        let last_name = required_string(record, FIELD_LAST_NAME)?;
        let need = required_string(record, FIELD_NEED)?;

        let skills = match record.field(FIELD_SKILLS) {
            None => None,
            Some(FieldValue::StringList(items)) => Some(items.clone()),
            Some(other) => {
                return Err(DecodeFailure::WrongShape {
                    field: FIELD_SKILLS,
                    expected: "list of strings",
                    found: other.kind(),
                })
            }
        };

        // Stored images were validated on the way in; only the format is
        // rechecked here, never the size.
        let profile_image = record
            .asset()
            .map(|asset| ProfileImage::from_bytes(asset.data.clone(), usize::MAX))
            .transpose()
            .map_err(|e| DecodeFailure::InvalidImage(e.to_string()))?;

        Ok(Profile {
            first_name,
            last_name,
            need,
            profile_image,
            skills,
        })
    }

    /// Project a profile onto a full-replacement record.
    pub fn encode(profile: &Profile) -> ProfileRecord {
        let mut record = ProfileRecord::new();
        record.set_field(
            FIELD_FIRST_NAME,
            FieldValue::String(profile.first_name.clone()),
        );
        record.set_field(
            FIELD_LAST_NAME,
            FieldValue::String(profile.last_name.clone()),
        );
        record.set_field(FIELD_NEED, FieldValue::String(profile.need.clone()));
        if let Some(skills) = &profile.skills {
            record.set_field(FIELD_SKILLS, FieldValue::StringList(skills.clone()));
        }
        record.set_asset(profile.profile_image.as_ref().map(|image| Asset {
            content_hash: image.content_hash(),
            data: image.data().to_vec(),
        }));
        record
    }
}

fn required_string(record: &ProfileRecord, field: &'static str) -> Result<String, DecodeFailure> {
    match record.field(field) {
        Some(FieldValue::String(value)) => Ok(value.clone()),
        Some(other) => Err(DecodeFailure::WrongShape {
            field,
            expected: "string",
            found: other.kind(),
        }),
        None => Err(DecodeFailure::MissingField(field)),
    }
}
