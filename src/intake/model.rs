//! Questionnaire data models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Kind of event being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Wedding,
    Birthday,
    #[serde(rename = "Other Event")]
    OtherEvent,
}

impl EventType {
    pub const ALL: [EventType; 3] = [Self::Wedding, Self::Birthday, Self::OtherEvent];

    /// Interpret the landing page's `?type=` hint.
    ///
    /// The hint only pre-fills a default, so anything that isn't a wedding or
    /// birthday is treated as some other event.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }
        Some(match hint.to_ascii_lowercase().as_str() {
            "wedding" => Self::Wedding,
            "birthday" => Self::Birthday,
            _ => Self::OtherEvent,
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Wedding => "Create your dream wedding celebration",
            Self::Birthday => "Make their special day unforgettable",
            Self::OtherEvent => "Corporate, anniversary, or custom event",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wedding => write!(f, "Wedding"),
            Self::Birthday => write!(f, "Birthday"),
            Self::OtherEvent => write!(f, "Other Event"),
        }
    }
}

/// Venue setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSetting {
    Indoor,
    Outdoor,
}

impl EventSetting {
    pub const ALL: [EventSetting; 2] = [Self::Indoor, Self::Outdoor];

    pub fn description(&self) -> &'static str {
        match self {
            Self::Indoor => "Climate-controlled comfort, perfect for any weather",
            Self::Outdoor => "Under the open sky, surrounded by nature's beauty",
        }
    }
}

impl std::fmt::Display for EventSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indoor => write!(f, "Indoor"),
            Self::Outdoor => write!(f, "Outdoor"),
        }
    }
}

/// Dietary preference for the guests. Several may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealPreference {
    Vegetarian,
    #[serde(rename = "Non-Vegetarian")]
    NonVegetarian,
    Vegan,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
}

impl MealPreference {
    pub const ALL: [MealPreference; 4] = [
        Self::Vegetarian,
        Self::NonVegetarian,
        Self::Vegan,
        Self::GlutenFree,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Self::Vegetarian => "Plant-based delicious meals",
            Self::NonVegetarian => "Includes meat and poultry options",
            Self::Vegan => "100% plant-based, no animal products",
            Self::GlutenFree => "Safe for gluten sensitivities",
        }
    }
}

impl std::fmt::Display for MealPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vegetarian => write!(f, "Vegetarian"),
            Self::NonVegetarian => write!(f, "Non-Vegetarian"),
            Self::Vegan => write!(f, "Vegan"),
            Self::GlutenFree => write!(f, "Gluten-Free"),
        }
    }
}

/// Free-text fields that are validated as they are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Phone,
    Email,
    GuestCount,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::GuestCount => "guestCount",
        };
        write!(f, "{s}")
    }
}

/// The in-progress, not yet submitted questionnaire.
///
/// Serialized under the `eventForm` storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(rename = "name", default)]
    pub contact_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub event_setting: Option<EventSetting>,
    #[serde(rename = "numberOfPeople", default)]
    pub guest_count: Option<i64>,
    #[serde(rename = "mealOptions", default)]
    pub meal_preferences: BTreeSet<MealPreference>,
}

impl Draft {
    /// Add the preference if absent, remove it if present.
    /// Returns whether it is selected afterwards.
    pub fn toggle_meal(&mut self, meal: MealPreference) -> bool {
        if self.meal_preferences.remove(&meal) {
            false
        } else {
            self.meal_preferences.insert(meal);
            true
        }
    }
}

/// Parse a guest count the way a number input reports it: leading sign and
/// digits, anything after them ignored. Empty or digit-less input is `None`.
pub fn parse_guest_count(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// A finalized lead handed to the lead sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub event_type: Option<EventType>,
    pub event_setting: Option<EventSetting>,
    pub number_of_people: Option<i64>,
    pub meal_options: Vec<MealPreference>,
    pub location: String,
    pub status: String,
    pub notes: String,
}

/// Lifecycle tag of a freshly captured lead.
pub const LEAD_STATUS_NEW: &str = "new";
/// Annotation recording that human verification passed.
pub const LEAD_NOTE_VERIFIED: &str = "[Captcha Verified]";

impl LeadRecord {
    pub fn from_draft(draft: &Draft, region: &str) -> Self {
        Self {
            name: draft.contact_name.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            event_type: draft.event_type,
            event_setting: draft.event_setting,
            number_of_people: draft.guest_count,
            meal_options: draft.meal_preferences.iter().copied().collect(),
            location: region.to_string(),
            status: LEAD_STATUS_NEW.to_string(),
            notes: LEAD_NOTE_VERIFIED.to_string(),
        }
    }
}
