//! Summary entity model
//!
//! AI-generated activity summaries, stored as cache entries keyed by
//! (user, timeframe, start_date, end_date). Rows are inserted on cache miss
//! and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Summary window granularity, "week" or "month"
    pub timeframe: String,

    /// First day of the summarized window
    pub start_date: Date,

    /// Last day of the summarized window
    pub end_date: Date,

    /// Generated summary text
    pub summary_text: String,

    /// When the summary was generated
    pub generated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Summary window granularity accepted by the API and stored on summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
}

impl Timeframe {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }

    /// Length of the trailing window in days.
    pub fn days(&self) -> i64 {
        match self {
            Timeframe::Week => 7,
            Timeframe::Month => 30,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = InvalidTimeframe;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            other => Err(InvalidTimeframe(other.to_string())),
        }
    }
}

/// Error returned when a timeframe string is neither "week" nor "month".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timeframe must be 'week' or 'month', got '{0}'")]
pub struct InvalidTimeframe(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_round_trips_through_str() {
        assert_eq!("week".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert_eq!("month".parse::<Timeframe>().unwrap(), Timeframe::Month);
        assert_eq!(Timeframe::Week.as_str(), "week");
        assert_eq!(Timeframe::Month.to_string(), "month");
    }

    #[test]
    fn timeframe_rejects_unknown_values() {
        let err = "fortnight".parse::<Timeframe>().unwrap_err();
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn timeframe_window_lengths() {
        assert_eq!(Timeframe::Week.days(), 7);
        assert_eq!(Timeframe::Month.days(), 30);
    }
}
