//! Schedule period entity - One opened or closed period of a schedule.
//!
//! Periods are stored the way the dialplan consumes them: `hours` as `HH:MM-HH:MM`,
//! and `weekdays`, `monthdays`, `months` as comma separated values or ranges
//! (`"1-5"`, `"1,3,5"`, `"1-3,6"`).

use crate::errors::{self, Error as ProvisionError};
use chrono::NaiveTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Schedule period database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedule_time")]
pub struct Model {
    /// Numeric identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning schedule
    pub schedule_id: i32,
    /// `opened` or `closed`
    pub mode: String,
    /// Time range, e.g. `"08:00-12:00"`
    pub hours: Option<String>,
    /// Days of week, 1 (Monday) to 7
    pub weekdays: Option<String>,
    /// Days of month, 1 to 31
    pub monthdays: Option<String>,
    /// Months, 1 to 12
    pub months: Option<String>,
}

impl Model {
    /// Parsed `hours` column; `None` when the period covers the whole day.
    pub fn hour_range(&self) -> errors::Result<Option<(NaiveTime, NaiveTime)>> {
        self.hours.as_deref().map(parse_hours).transpose()
    }

    /// Expanded `weekdays` column; empty when unset (every day).
    pub fn weekday_list(&self) -> errors::Result<Vec<u32>> {
        self.weekdays
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), |value| parse_ranges("weekdays", value, 1, 7))
    }

    /// Expanded `monthdays` column; empty when unset.
    pub fn monthday_list(&self) -> errors::Result<Vec<u32>> {
        self.monthdays
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), |value| parse_ranges("monthdays", value, 1, 31))
    }

    /// Expanded `months` column; empty when unset.
    pub fn month_list(&self) -> errors::Result<Vec<u32>> {
        self.months
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), |value| parse_ranges("months", value, 1, 12))
    }
}

/// Parses `HH:MM-HH:MM` into an ordered pair of times.
pub fn parse_hours(value: &str) -> errors::Result<(NaiveTime, NaiveTime)> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| ProvisionError::invalid("hours", format!("expected HH:MM-HH:MM, got '{value}'")))?;
    let parse = |part: &str| {
        NaiveTime::parse_from_str(part.trim(), "%H:%M")
            .map_err(|e| ProvisionError::invalid("hours", format!("'{part}': {e}")))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start >= end {
        return Err(ProvisionError::invalid(
            "hours",
            format!("start must be before end in '{value}'"),
        ));
    }
    Ok((start, end))
}

/// Expands a comma separated list of values and ranges bounded by `min..=max`.
pub fn parse_ranges(field: &'static str, value: &str, min: u32, max: u32) -> errors::Result<Vec<u32>> {
    let parse = |part: &str| -> errors::Result<u32> {
        let number: u32 = part
            .trim()
            .parse()
            .map_err(|_| ProvisionError::invalid(field, format!("'{part}' is not a number")))?;
        if (min..=max).contains(&number) {
            Ok(number)
        } else {
            Err(ProvisionError::invalid(
                field,
                format!("{number} is outside {min}-{max}"),
            ))
        }
    };

    let mut values = Vec::new();
    for item in value.split(',') {
        match item.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(ProvisionError::invalid(field, format!("empty range '{item}'")));
                }
                values.extend(start..=end);
            }
            None => values.push(parse(item)?),
        }
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

/// Relationships of a period
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each period belongs to one schedule
    #[sea_orm(
        belongs_to = "super::schedule::Entity",
        from = "Column::ScheduleId",
        to = "super::schedule::Column::Id",
        on_delete = "Cascade"
    )]
    Schedule,
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_hours() {
        let (start, end) = parse_hours("08:00-12:30").unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_hours_rejects_bad_input() {
        assert!(parse_hours("08:00").is_err());
        assert!(parse_hours("25:00-26:00").is_err());
        assert!(matches!(
            parse_hours("12:00-08:00"),
            Err(ProvisionError::InvalidInput { field: "hours", .. })
        ));
    }

    #[test]
    fn test_parse_ranges() {
        assert_eq!(parse_ranges("weekdays", "1-5", 1, 7).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_ranges("weekdays", "6,1-2,2", 1, 7).unwrap(), vec![1, 2, 6]);
        assert!(parse_ranges("weekdays", "0-3", 1, 7).is_err());
        assert!(parse_ranges("months", "5-3", 1, 12).is_err());
        assert!(parse_ranges("months", "x", 1, 12).is_err());
    }

    #[test]
    fn test_unset_columns_expand_to_whole_period() {
        let period = Model {
            id: 1,
            schedule_id: 1,
            mode: "opened".to_string(),
            hours: None,
            weekdays: None,
            monthdays: None,
            months: None,
        };
        assert!(period.hour_range().unwrap().is_none());
        assert!(period.weekday_list().unwrap().is_empty());
        assert!(period.month_list().unwrap().is_empty());
    }
}
