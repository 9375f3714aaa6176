//! User Profile Type - the single profile record an account owns
//!
//! Holds the user's name, what they need, an optional picture and the skills
//! they offer. Also provides `ProfileView`, the display projection handed to
//! the presentation layer.

use serde::{Deserialize, Serialize};

use crate::types::ProfileImage;

/// The user's profile.
///
/// Edits always replace the whole value; there is no field-level patching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,

    pub last_name: String,

    /// Free-text statement of what the user needs
    pub need: String,

    /// Profile picture, absent until the user sets one
    pub profile_image: Option<ProfileImage>,

    /// Skills in the order the user entered them
    pub skills: Option<Vec<String>>,
}

impl Profile {
    /// Create a profile with the required fields only
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        need: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            need: need.into(),
            profile_image: None,
            skills: None,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = Some(skills.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_image(mut self, image: ProfileImage) -> Self {
        self.profile_image = Some(image);
        self
    }

    /// First and last name joined by a single space
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the profile screen shows for a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub display_name: String,
    pub need: String,
    pub has_image: bool,
    /// One display item per skill, in stored order
    pub skill_items: Vec<String>,
}

impl ProfileView {
    /// Number of skill items to lay out
    pub fn item_count(&self) -> usize {
        self.skill_items.len()
    }
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name(),
            need: profile.need.clone(),
            has_image: profile.profile_image.is_some(),
            skill_items: profile.skills.clone().unwrap_or_default(),
        }
    }
}
