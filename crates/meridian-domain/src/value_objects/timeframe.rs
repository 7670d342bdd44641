use serde::{Deserialize, Serialize};

/// Bar interval, parsed from labels like "1m", "5min", "1h", "1d".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub label: String,
    pub step_seconds: i64,
}

impl Timeframe {
    pub fn parse(value: &str) -> Result<Self, String> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err("empty timeframe".to_string());
        }

        let (label, step_seconds) = match normalized.as_str() {
            "1m" | "1min" => ("1min", 60),
            "5m" | "5min" => ("5min", 300),
            "15m" | "15min" => ("15min", 900),
            "30m" | "30min" => ("30min", 1800),
            "1h" | "1hour" => ("1hour", 3600),
            "4h" | "4hour" => ("4hour", 14400),
            "1d" | "1day" => ("1day", 86400),
            "1w" | "1week" => ("1week", 604800),
            other => {
                // Bare seconds are accepted for irregular feeds.
                let seconds: i64 = other
                    .parse()
                    .map_err(|_| format!("unsupported timeframe: {value}"))?;
                if seconds <= 0 {
                    return Err(format!("unsupported timeframe: {value}"));
                }
                return Ok(Self {
                    label: other.to_string(),
                    step_seconds: seconds,
                });
            }
        };

        Ok(Self {
            label: label.to_string(),
            step_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Timeframe;

    #[test]
    fn parses_common_labels() {
        assert_eq!(Timeframe::parse("1m").unwrap().step_seconds, 60);
        assert_eq!(Timeframe::parse("1H").unwrap().label, "1hour");
        assert_eq!(Timeframe::parse("1d").unwrap().step_seconds, 86400);
    }

    #[test]
    fn accepts_bare_seconds_and_rejects_junk() {
        assert_eq!(Timeframe::parse("90").unwrap().step_seconds, 90);
        assert!(Timeframe::parse("2fortnights").is_err());
        assert!(Timeframe::parse("-60").is_err());
    }
}
