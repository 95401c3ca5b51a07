// Timestamp conversion and expiry checks
use crate::error::{Result, SsoError};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Canonical textual form for every timestamp this tool writes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Parse a UTC timestamp as written by this tool, the AWS CLI or older versions
/// that appended a literal "UTC" token or used a `+0000` offset
pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>> {
    let cleaned = timestamp.replace("UTC", "");
    let cleaned = cleaned.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(cleaned, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(SsoError::InvalidTimestamp(timestamp.to_string()))
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn is_expired(timestamp: &str, clock: &dyn Clock) -> Result<bool> {
    is_expired_at(timestamp, clock.now())
}

pub fn is_expired_at(timestamp: &str, now: DateTime<Utc>) -> Result<bool> {
    Ok(now > parse_timestamp(timestamp)?)
}

pub fn from_epoch_millis(millis: Option<i64>) -> Result<String> {
    let millis = millis.ok_or(SsoError::MissingTimestamp)?;
    let dt = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| SsoError::InvalidTimestamp(millis.to_string()))?;
    Ok(format_timestamp(&dt))
}

pub fn from_epoch_seconds(seconds: Option<i64>) -> Result<String> {
    let seconds = seconds.ok_or(SsoError::MissingTimestamp)?;
    let dt = Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| SsoError::InvalidTimestamp(seconds.to_string()))?;
    Ok(format_timestamp(&dt))
}

pub fn from_now_plus_seconds(clock: &dyn Clock, seconds: Option<i64>) -> Result<String> {
    let seconds = seconds.ok_or(SsoError::MissingTimestamp)?;
    let dt = Duration::try_seconds(seconds)
        .and_then(|delta| clock.now().checked_add_signed(delta))
        .ok_or_else(|| SsoError::InvalidTimestamp(format!("now + {}s", seconds)))?;
    Ok(format_timestamp(&dt))
}

pub fn format_time_remaining(expires_at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    if *expires_at <= now {
        return "EXPIRED".to_string();
    }

    let duration = (*expires_at - now).num_seconds();
    let hours = duration / 3600;
    let minutes = (duration % 3600) / 60;
    let seconds = duration % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Clock that only moves when told to
    pub struct FakeClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
