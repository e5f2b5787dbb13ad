use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::{
    constants::{
        DEFAULT_MEDIA_ROOT, DEFAULT_MEDIA_URL, DEFAULT_PORT, DEFAULT_SESSION_HOURS,
        DEVELOPMENT_SECRET, INT_MAX_VALUE, INT_MIN_VALUE, RECIPE_COUNT_PER_PAGE,
    },
    error::Error,
};

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: i32,
    pub max: i32,
}

impl ValueRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn check(&self, field: &'static str, value: i32) -> Result<i32, Error> {
        if value < self.min || value > self.max {
            return Err(Error::OutOfRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub cooking_time: ValueRange,
    pub amount: ValueRange,
}

impl Bounds {
    /// Cooking times and amounts must stay positive, so `min` is at least 1.
    pub fn new(min: i32, max: i32) -> Result<Self, Error> {
        if min < 1 {
            return Err(Error::Configuration(format!(
                "FOODGRAM_MIN_VALUE ({min}) must be at least 1"
            )));
        }
        if min > max {
            return Err(Error::Configuration(format!(
                "FOODGRAM_MIN_VALUE ({min}) is greater than FOODGRAM_MAX_VALUE ({max})"
            )));
        }

        Ok(Self {
            cooking_time: ValueRange::new(min, max),
            amount: ValueRange::new(min, max),
        })
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            cooking_time: ValueRange::new(INT_MIN_VALUE, INT_MAX_VALUE),
            amount: ValueRange::new(INT_MIN_VALUE, INT_MAX_VALUE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub database_url: String,
    pub secret: String,
    pub session_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
    pub page_size: i64,
    pub bounds: Bounds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: String::new(),
            secret: DEVELOPMENT_SECRET.to_owned(),
            session_hours: DEFAULT_SESSION_HOURS,
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            media_url: DEFAULT_MEDIA_URL.to_owned(),
            page_size: RECIPE_COUNT_PER_PAGE,
            bounds: Bounds::default(),
        }
    }
}

impl Settings {
    /// Reads every setting from the environment, falling back to defaults.
    /// `DATABASE_URL` and `FOODGRAM_SECRET` have no default.
    pub fn load() -> Result<Self, Error> {
        let bounds = Bounds::new(
            try_load("FOODGRAM_MIN_VALUE", INT_MIN_VALUE)?,
            try_load("FOODGRAM_MAX_VALUE", INT_MAX_VALUE)?,
        )?;

        Ok(Self {
            port: try_load("FOODGRAM_PORT", DEFAULT_PORT)?,
            database_url: require("DATABASE_URL")?,
            secret: require("FOODGRAM_SECRET")?,
            session_hours: try_load("FOODGRAM_SESSION_HOURS", DEFAULT_SESSION_HOURS)?,
            media_root: PathBuf::from(try_load(
                "FOODGRAM_MEDIA_ROOT",
                DEFAULT_MEDIA_ROOT.to_owned(),
            )?),
            media_url: try_load("FOODGRAM_MEDIA_URL", DEFAULT_MEDIA_URL.to_owned())?,
            page_size: try_load("FOODGRAM_PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?,
            bounds,
        })
    }
}

fn require(key: &str) -> Result<String, Error> {
    env::var(key).map_err(|_| Error::Configuration(format!("{key} must be set")))
}

fn try_load<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid {key} value: {e}"))),
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        let range = ValueRange::new(1, 10);

        assert_eq!(range.check("cooking_time", 1), Ok(1));
        assert_eq!(range.check("cooking_time", 10), Ok(10));
        assert_eq!(
            range.check("cooking_time", 0),
            Err(Error::OutOfRange {
                field: "cooking_time",
                min: 1,
                max: 10
            })
        );
        assert!(range.check("amount", 11).is_err());
    }

    #[test]
    fn bounds_stay_positive() {
        assert!(matches!(Bounds::new(0, 10), Err(Error::Configuration(_))));
        assert!(matches!(Bounds::new(-5, 10), Err(Error::Configuration(_))));
        assert!(matches!(Bounds::new(5, 4), Err(Error::Configuration(_))));

        let bounds = Bounds::new(1, 1).unwrap();
        assert_eq!(bounds.cooking_time, ValueRange::new(1, 1));
        assert_eq!(bounds.amount.check("amount", 1), Ok(1));
    }

    #[test]
    fn defaults_are_usable_without_environment() {
        let settings = Settings::default();

        assert_eq!(settings.page_size, RECIPE_COUNT_PER_PAGE);
        assert_eq!(settings.bounds.cooking_time.min, INT_MIN_VALUE);
        assert!(!settings.secret.is_empty());
    }
}
