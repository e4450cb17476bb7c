use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "female" => Ok(Self::Female),
            "male" => Ok(Self::Male),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown gender `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub user_id: UserId,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
}

impl CustomerProfile {
    /// Whole years between the date of birth and `as_of`.
    pub fn age_at(&self, as_of: NaiveDate) -> u32 {
        let mut age = as_of.year() - self.date_of_birth.year();
        if (as_of.month(), as_of.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_whole_years_only() {
        let profile = CustomerProfile {
            user_id: UserId(1),
            date_of_birth: date(1990, 6, 15),
            gender: Gender::Female,
        };

        assert_eq!(profile.age_at(date(2024, 6, 14)), 33);
        assert_eq!(profile.age_at(date(2024, 6, 15)), 34);
        assert_eq!(profile.age_at(date(2024, 6, 16)), 34);
    }

    #[test]
    fn age_never_goes_negative() {
        let profile = CustomerProfile {
            user_id: UserId(2),
            date_of_birth: date(2030, 1, 1),
            gender: Gender::Other,
        };

        assert_eq!(profile.age_at(date(2024, 1, 1)), 0);
    }
}
