use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

/// A forecast or observation cycle, identified by its initialisation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRun {
    pub init: DateTime<Utc>,
}

impl ForecastRun {
    /// The newest run expected to be published at `now`: `now` minus
    /// `slack_hours`, rounded down to a multiple of `cycle_hours`.
    pub fn latest(now: DateTime<Utc>, cycle_hours: u32, slack_hours: u32) -> Self {
        let corrected = now - Duration::hours(i64::from(slack_hours));
        let hour = corrected.hour() / cycle_hours.max(1) * cycle_hours.max(1);
        let midnight = corrected.date_naive().and_time(NaiveTime::MIN).and_utc();

        Self {
            init: midnight + Duration::hours(i64::from(hour)),
        }
    }

    /// `YYYYMMDD`
    pub fn date(&self) -> String {
        self.init.format("%Y%m%d").to_string()
    }

    /// `HH`
    pub fn hour(&self) -> String {
        self.init.format("%H").to_string()
    }

    pub fn valid_time(&self, step_hours: u32) -> DateTime<Utc> {
        self.init + Duration::hours(i64::from(step_hours))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn should_round_down_after_slack() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 0).unwrap();
        let run = ForecastRun::latest(now, 6, 3);
        assert_eq!(run.init, Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap());
        assert_eq!(run.date(), "20240301");
        assert_eq!(run.hour(), "06");
    }

    #[test]
    fn should_roll_back_over_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 2, 59, 0).unwrap();
        let run = ForecastRun::latest(now, 6, 3);
        assert_eq!(run.init, Utc.with_ymd_and_hms(2024, 2, 29, 18, 0, 0).unwrap());

        let run = ForecastRun::latest(now, 12, 3);
        assert_eq!(run.hour(), "12");
    }

    #[test]
    fn should_add_steps_to_init() {
        let run = ForecastRun {
            init: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(run.valid_time(27), Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap());
    }
}
