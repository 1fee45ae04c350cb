use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub ride_reminders: bool,
    pub daily_summary: bool,
    pub new_rides_available: bool,
    pub low_credits: bool,
    pub badges_earned: bool,
    pub group_invitations: bool,
    pub ride_completed: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            ride_reminders: true,
            daily_summary: true,
            new_rides_available: true,
            low_credits: true,
            badges_earned: true,
            group_invitations: true,
            ride_completed: true,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub enabled: Option<bool>,
    pub ride_reminders: Option<bool>,
    pub daily_summary: Option<bool>,
    pub new_rides_available: Option<bool>,
    pub low_credits: Option<bool>,
    pub badges_earned: Option<bool>,
    pub group_invitations: Option<bool>,
    pub ride_completed: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(self, prefs: &mut NotificationPreferences) {
        let fields = [
            (self.enabled, &mut prefs.enabled),
            (self.ride_reminders, &mut prefs.ride_reminders),
            (self.daily_summary, &mut prefs.daily_summary),
            (self.new_rides_available, &mut prefs.new_rides_available),
            (self.low_credits, &mut prefs.low_credits),
            (self.badges_earned, &mut prefs.badges_earned),
            (self.group_invitations, &mut prefs.group_invitations),
            (self.ride_completed, &mut prefs.ride_completed),
        ];

        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}
