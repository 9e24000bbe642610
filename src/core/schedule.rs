//! Schedule business logic - opening hours, their closed-hours fallback, and the
//! entities they apply to.

use crate::{
    core::{
        dialaction::{self, Destination, DialactionOwner},
        validator::ensure_same_tenant,
    },
    entities::{
        Group, Incall, Queue, Schedule, SchedulePath, ScheduleTime, User, schedule, schedule_path,
        schedule_time::{self, parse_hours, parse_ranges},
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Event under which a schedule stores its closed-hours destination
pub const FALLBACK_EVENT: &str = "schedule_fallback";

/// One period of a schedule, in its stored string form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeriodArgs {
    /// `opened` or `closed`
    pub mode: String,
    /// `HH:MM-HH:MM`
    pub hours: Option<String>,
    /// Ranges of 1-7
    pub weekdays: Option<String>,
    /// Ranges of 1-31
    pub monthdays: Option<String>,
    /// Ranges of 1-12
    pub months: Option<String>,
}

impl PeriodArgs {
    /// An opened period on the given hours and weekdays
    #[must_use]
    pub fn opened(hours: &str, weekdays: &str) -> Self {
        Self {
            mode: "opened".to_string(),
            hours: Some(hours.to_string()),
            weekdays: Some(weekdays.to_string()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.mode.as_str(), "opened" | "closed") {
            return Err(Error::invalid(
                "mode",
                format!("expected opened or closed, got '{}'", self.mode),
            ));
        }
        if let Some(hours) = &self.hours {
            parse_hours(hours)?;
        }
        if let Some(weekdays) = &self.weekdays {
            parse_ranges("weekdays", weekdays, 1, 7)?;
        }
        if let Some(monthdays) = &self.monthdays {
            parse_ranges("monthdays", monthdays, 1, 31)?;
        }
        if let Some(months) = &self.months {
            parse_ranges("months", months, 1, 12)?;
        }
        Ok(())
    }
}

/// Everything needed to create a schedule
#[derive(Debug, Clone)]
pub struct ScheduleArgs {
    /// Owning tenant
    pub tenant_uuid: Uuid,
    /// Display name
    pub name: Option<String>,
    /// IANA timezone
    pub timezone: Option<String>,
    /// Whether the schedule is active
    pub enabled: bool,
    /// Opened and closed periods
    pub periods: Vec<PeriodArgs>,
    /// Where calls go outside the opened periods
    pub closed_destination: Destination,
}

/// Entity a schedule can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEntity {
    /// A user
    User(i32),
    /// A group
    Group(i32),
    /// A queue
    Queue(i32),
    /// An incall
    Incall(i32),
}

impl ScheduledEntity {
    /// Value of the `path` column
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Group(_) => "group",
            Self::Queue(_) => "queue",
            Self::Incall(_) => "incall",
        }
    }

    /// Value of the `pathid` column
    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::User(id) | Self::Group(id) | Self::Queue(id) | Self::Incall(id) => *id,
        }
    }

    async fn tenant_uuid<C: ConnectionTrait>(&self, db: &C) -> Result<Uuid> {
        let id = self.id();
        let tenant_uuid = match self {
            Self::User(_) => User::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Group(_) => Group::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Queue(_) => Queue::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
            Self::Incall(_) => Incall::find_by_id(id).one(db).await?.map(|m| m.tenant_uuid),
        };
        tenant_uuid.ok_or_else(|| Error::not_found(self.path(), id))
    }
}

/// Creates a schedule with its periods and closed-hours destination.
pub async fn create_schedule<C: ConnectionTrait>(db: &C, args: ScheduleArgs) -> Result<schedule::Model> {
    for period in &args.periods {
        period.validate()?;
    }
    dialaction::validate_destination(db, args.tenant_uuid, &args.closed_destination).await?;

    let schedule = schedule::ActiveModel {
        tenant_uuid: Set(args.tenant_uuid),
        name: Set(args.name),
        timezone: Set(args.timezone),
        enabled: Set(i32::from(args.enabled)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for period in args.periods {
        schedule_time::ActiveModel {
            schedule_id: Set(schedule.id),
            mode: Set(period.mode),
            hours: Set(period.hours),
            weekdays: Set(period.weekdays),
            monthdays: Set(period.monthdays),
            months: Set(period.months),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    dialaction::set_dialaction(
        db,
        DialactionOwner::Schedule(schedule.id),
        FALLBACK_EVENT,
        &args.closed_destination,
    )
    .await?;

    debug!(id = schedule.id, "created schedule");
    Ok(schedule)
}

/// Finds a schedule by ID, failing with [`Error::NotFound`] if it does not exist.
pub async fn require_schedule<C: ConnectionTrait>(db: &C, id: i32) -> Result<schedule::Model> {
    Schedule::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Schedule", id))
}

/// Lists the schedules of a tenant.
pub async fn list_schedules<C: ConnectionTrait>(db: &C, tenant_uuid: Uuid) -> Result<Vec<schedule::Model>> {
    Schedule::find()
        .filter(schedule::Column::TenantUuid.eq(tenant_uuid))
        .order_by_asc(schedule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Periods of a schedule in insertion order.
pub async fn get_periods<C: ConnectionTrait>(db: &C, schedule_id: i32) -> Result<Vec<schedule_time::Model>> {
    ScheduleTime::find()
        .filter(schedule_time::Column::ScheduleId.eq(schedule_id))
        .order_by_asc(schedule_time::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Closed-hours destination of a schedule.
pub async fn get_closed_destination<C: ConnectionTrait>(db: &C, schedule_id: i32) -> Result<Option<Destination>> {
    dialaction::get_dialaction(db, DialactionOwner::Schedule(schedule_id), FALLBACK_EVENT).await
}

/// Schedule currently applied to an entity.
pub async fn schedule_of<C: ConnectionTrait>(
    db: &C,
    entity: ScheduledEntity,
) -> Result<Option<schedule_path::Model>> {
    SchedulePath::find()
        .filter(schedule_path::Column::Path.eq(entity.path()))
        .filter(schedule_path::Column::Pathid.eq(entity.id()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a schedule to an entity. An entity carries at most one schedule.
pub async fn associate_schedule<C: ConnectionTrait>(
    db: &C,
    schedule_id: i32,
    entity: ScheduledEntity,
) -> Result<()> {
    let schedule = require_schedule(db, schedule_id).await?;
    ensure_same_tenant(entity.path(), schedule.tenant_uuid, entity.tenant_uuid(db).await?)?;
    if schedule_of(db, entity).await?.is_some() {
        return Err(Error::AlreadyAssociated {
            resource: entity.path(),
            id: entity.id().to_string(),
        });
    }

    schedule_path::ActiveModel {
        schedule_id: Set(schedule_id),
        path: Set(entity.path().to_string()),
        pathid: Set(entity.id()),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Removes a schedule from an entity.
pub async fn dissociate_schedule<C: ConnectionTrait>(
    db: &C,
    schedule_id: i32,
    entity: ScheduledEntity,
) -> Result<()> {
    let result = SchedulePath::delete_many()
        .filter(schedule_path::Column::ScheduleId.eq(schedule_id))
        .filter(schedule_path::Column::Path.eq(entity.path()))
        .filter(schedule_path::Column::Pathid.eq(entity.id()))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found(
            "Schedule association",
            format!("{}/{}", entity.path(), entity.id()),
        ));
    }
    Ok(())
}

/// Removes whatever schedule applies to an entity, used when the entity is deleted.
pub async fn clear_schedule<C: ConnectionTrait>(db: &C, entity: ScheduledEntity) -> Result<()> {
    SchedulePath::delete_many()
        .filter(schedule_path::Column::Path.eq(entity.path()))
        .filter(schedule_path::Column::Pathid.eq(entity.id()))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes a schedule with its periods, paths and fallback.
pub async fn delete_schedule<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    let schedule = require_schedule(db, id).await?;
    ScheduleTime::delete_many()
        .filter(schedule_time::Column::ScheduleId.eq(id))
        .exec(db)
        .await?;
    SchedulePath::delete_many()
        .filter(schedule_path::Column::ScheduleId.eq(id))
        .exec(db)
        .await?;
    dialaction::delete_dialactions(db, DialactionOwner::Schedule(id)).await?;
    schedule.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn office_hours(tenant_uuid: Uuid) -> ScheduleArgs {
        ScheduleArgs {
            tenant_uuid,
            name: Some("office".to_string()),
            timezone: Some("Europe/Paris".to_string()),
            enabled: true,
            periods: vec![PeriodArgs::opened("08:30-18:00", "1-5")],
            closed_destination: Destination::Hangup,
        }
    }

    #[tokio::test]
    async fn test_create_schedule() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let schedule = create_schedule(&db, office_hours(tenant.uuid)).await?;
        assert!(schedule.is_enabled());

        let periods = get_periods(&db, schedule.id).await?;
        assert_eq!(periods.len(), 1);
        assert_eq!(
            periods[0].hour_range()?,
            Some((
                NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap()
            ))
        );
        assert_eq!(periods[0].weekday_list()?, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            get_closed_destination(&db, schedule.id).await?,
            Some(Destination::Hangup)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_schedule_rejects_bad_periods() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;

        let mut args = office_hours(tenant.uuid);
        args.periods = vec![PeriodArgs::opened("18:00-08:00", "1-5")];
        assert!(create_schedule(&db, args).await.is_err());

        let mut args = office_hours(tenant.uuid);
        args.periods[0].mode = "sometimes".to_string();
        assert!(matches!(
            create_schedule(&db, args).await,
            Err(Error::InvalidInput { field: "mode", .. })
        ));

        let mut args = office_hours(tenant.uuid);
        args.periods[0].months = Some("13".to_string());
        assert!(create_schedule(&db, args).await.is_err());
        assert!(list_schedules(&db, tenant.uuid).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_one_schedule_per_entity() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;
        let day = create_schedule(&db, office_hours(tenant.uuid)).await?;
        let night = create_schedule(&db, office_hours(tenant.uuid)).await?;
        let entity = ScheduledEntity::User(user.id);

        associate_schedule(&db, day.id, entity).await?;
        assert!(matches!(
            associate_schedule(&db, night.id, entity).await,
            Err(Error::AlreadyAssociated { .. })
        ));
        assert_eq!(schedule_of(&db, entity).await?.map(|p| p.schedule_id), Some(day.id));

        dissociate_schedule(&db, day.id, entity).await?;
        assert!(dissociate_schedule(&db, day.id, entity).await.is_err());
        associate_schedule(&db, night.id, entity).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_associate_schedule_across_tenants_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let acme = create_test_tenant(&db, "acme").await?;
        let other = create_test_tenant(&db, "other").await?;
        let user = create_test_user(&db, other.uuid, "Mallory").await?;
        let schedule = create_schedule(&db, office_hours(acme.uuid)).await?;

        let result = associate_schedule(&db, schedule.id, ScheduledEntity::User(user.id)).await;
        assert!(matches!(result, Err(Error::DifferentTenants { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_schedule() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = create_test_tenant(&db, "acme").await?;
        let user = create_test_user(&db, tenant.uuid, "Alice").await?;
        let schedule = create_schedule(&db, office_hours(tenant.uuid)).await?;
        associate_schedule(&db, schedule.id, ScheduledEntity::User(user.id)).await?;

        delete_schedule(&db, schedule.id).await?;
        assert!(get_periods(&db, schedule.id).await?.is_empty());
        assert!(schedule_of(&db, ScheduledEntity::User(user.id)).await?.is_none());
        assert!(get_closed_destination(&db, schedule.id).await?.is_none());
        Ok(())
    }
}
