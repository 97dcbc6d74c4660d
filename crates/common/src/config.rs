use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::{IntoDeserializer, value::Error as ValueError};

    fn parse<'de, T: Deserialize<'de>>(value: &'de str) -> Result<T, ValueError> {
        T::deserialize(value.into_deserializer())
    }

    #[test]
    fn test_environment_accepts_short_aliases() {
        assert_eq!(parse::<Environment>("prod").unwrap(), Environment::Production);
        assert_eq!(
            parse::<Environment>("development").unwrap(),
            Environment::Development
        );
        assert!(
            parse::<Environment>("staging").is_err(),
            "Unknown environments must be rejected"
        );
    }

    #[test]
    fn test_log_level_round_trips_through_as_str() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(parse::<LogLevel>(level.as_str()).unwrap(), level);
        }
    }
}
