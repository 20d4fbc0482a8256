//! Wizard stages in the linear order the questionnaire walks through.

use serde::{Deserialize, Serialize};

/// One step of the intake wizard.
///
/// Progresses linearly: ContactInfo → EventType → EventSetting → GuestCount →
/// MealPreferences → Review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ContactInfo,
    EventType,
    EventSetting,
    GuestCount,
    MealPreferences,
    Review,
}

impl Stage {
    /// All stages in wizard order.
    pub const ALL: [Stage; 6] = [
        Stage::ContactInfo,
        Stage::EventType,
        Stage::EventSetting,
        Stage::GuestCount,
        Stage::MealPreferences,
        Stage::Review,
    ];

    /// Number of stages.
    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based position in the wizard.
    pub fn index(&self) -> usize {
        match self {
            Self::ContactInfo => 0,
            Self::EventType => 1,
            Self::EventSetting => 2,
            Self::GuestCount => 3,
            Self::MealPreferences => 4,
            Self::Review => 5,
        }
    }

    /// Stage at `index`, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    pub fn next(&self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(&self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The review stage has no forward transition, only submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Review)
    }

    /// Stages whose data can be edited straight from the review summary.
    pub fn is_jump_target(&self) -> bool {
        matches!(
            self,
            Self::ContactInfo | Self::EventType | Self::MealPreferences
        )
    }

    /// Short label shown in the progress list.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ContactInfo => "Your Info",
            Self::EventType => "Event Type",
            Self::EventSetting => "Event Setting",
            Self::GuestCount => "Number of People",
            Self::MealPreferences => "Meal Options",
            Self::Review => "Summary",
        }
    }

    /// Conversational heading for the stage.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ContactInfo => "Let's get started",
            Self::EventType => "What are we celebrating?",
            Self::EventSetting => "Where's the magic happening?",
            Self::GuestCount => "How many guests?",
            Self::MealPreferences => "Let's talk food",
            Self::Review => "Looking great!",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::ContactInfo => "Tell us a bit about yourself",
            Self::EventType => "Choose the type of event you're planning",
            Self::EventSetting => "Select your preferred venue setting",
            Self::GuestCount => "This helps us plan the perfect setup",
            Self::MealPreferences => "Select all dietary preferences for your guests",
            Self::Review => "Review your details before submitting",
        }
    }

    /// Completion percentage for the progress bar.
    pub fn progress_percent(&self) -> u8 {
        (((self.index() + 1) * 100) / Self::COUNT) as u8
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::ContactInfo
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ContactInfo => "contact_info",
            Self::EventType => "event_type",
            Self::EventSetting => "event_setting",
            Self::GuestCount => "guest_count",
            Self::MealPreferences => "meal_preferences",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

/// Which way the last navigation moved. Only used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn between(from: Stage, to: Stage) -> Self {
        if to > from {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_stages() {
        let mut current = Stage::ContactInfo;
        for expected in &Stage::ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn previous_stops_at_first_stage() {
        assert!(Stage::ContactInfo.previous().is_none());
        assert_eq!(Stage::EventType.previous(), Some(Stage::ContactInfo));
        assert_eq!(Stage::Review.previous(), Some(Stage::MealPreferences));
    }

    #[test]
    fn index_roundtrip_and_bounds() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_index(stage.index()), Some(stage));
        }
        assert!(Stage::from_index(6).is_none());
    }

    #[test]
    fn jump_targets() {
        let targets: Vec<Stage> = Stage::ALL.into_iter().filter(Stage::is_jump_target).collect();
        assert_eq!(
            targets,
            vec![Stage::ContactInfo, Stage::EventType, Stage::MealPreferences]
        );
    }

    #[test]
    fn display_matches_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(format!("\"{stage}\""), json, "mismatch for {stage:?}");
        }
    }

    #[test]
    fn progress_reaches_full_on_review() {
        assert_eq!(Stage::ContactInfo.progress_percent(), 16);
        assert_eq!(Stage::Review.progress_percent(), 100);
    }

    #[test]
    fn direction_between() {
        assert_eq!(
            Direction::between(Stage::ContactInfo, Stage::EventType),
            Direction::Forward
        );
        assert_eq!(
            Direction::between(Stage::Review, Stage::EventType),
            Direction::Backward
        );
    }
}
