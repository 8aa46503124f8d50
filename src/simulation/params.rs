use std::collections::HashMap;

pub const DEFAULT_INVERTER_KW: i64 = 200;
pub const DEFAULT_BATTERY_KWH: i64 = 600;
pub const DEFAULT_EFFICIENCY_LOSS_PERCENT: i64 = 12;
pub const DEFAULT_BATTERY_RESERVE_PERCENT: i64 = 10;

/// Run parameters taken from the upload form.
///
/// Built once per request with [`SimulationParams::from_form`]; the derived
/// ratios are computed on demand so the raw form values stay inspectable.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub inverter_kw: i64,
    pub battery_kwh: i64,
    pub efficiency_loss_percent: i64,
    pub battery_reserve_percent: i64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            inverter_kw: DEFAULT_INVERTER_KW,
            battery_kwh: DEFAULT_BATTERY_KWH,
            efficiency_loss_percent: DEFAULT_EFFICIENCY_LOSS_PERCENT,
            battery_reserve_percent: DEFAULT_BATTERY_RESERVE_PERCENT,
        }
    }
}

impl SimulationParams {
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        let text = |name: &str| {
            fields
                .get(name)
                .filter(|v| !is_blank(v))
                .map(|v| v.to_string())
        };
        let int = |name: &str, default: i64| {
            fields
                .get(name)
                .filter(|v| !is_blank(v))
                .map_or(default, |v| lenient_int(v))
        };

        Self {
            start_date: text("start_date"),
            end_date: text("end_date"),
            inverter_kw: int("inverter_power", DEFAULT_INVERTER_KW),
            battery_kwh: int("battery_capacity", DEFAULT_BATTERY_KWH),
            efficiency_loss_percent: int("efficiency_loss", DEFAULT_EFFICIENCY_LOSS_PERCENT),
            battery_reserve_percent: int("battery_reserve", DEFAULT_BATTERY_RESERVE_PERCENT),
        }
    }

    /// Round-trip efficiency as a fraction: `(100 - loss) / 100`.
    pub fn efficiency(&self) -> f64 {
        (100.0 - self.efficiency_loss_percent as f64) / 100.0
    }

    /// Usable share of the battery: `(100 - reserve / 2) / 100`.
    pub fn reserve(&self) -> f64 {
        (100.0 - self.battery_reserve_percent as f64 / 2.0) / 100.0
    }

    /// Date window, only when both ends were supplied.
    pub fn date_range(&self) -> Option<(&str, &str)> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Some((start.as_str(), end.as_str())),
            _ => None,
        }
    }

    /// Flags appended after the staged file path.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--inverter".to_string(),
            self.inverter_kw.to_string(),
            "--battery".to_string(),
            self.battery_kwh.to_string(),
            "--efficiency".to_string(),
            format!("{:.2}", self.efficiency()),
            "--reserve".to_string(),
            format!("{:.2}", self.reserve()),
        ];
        if let Some((start, end)) = self.date_range() {
            args.extend([
                "--start".to_string(),
                start.to_string(),
                "--end".to_string(),
                end.to_string(),
            ]);
        }
        args
    }
}

/// Missing, empty and `"0"` all count as "not provided".
fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "0"
}

/// Leading integer prefix of `value`, saturating; 0 when there is none.
pub fn lenient_int(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut acc: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        acc = if negative {
            acc.saturating_mul(10).saturating_sub(digit)
        } else {
            acc.saturating_mul(10).saturating_add(digit)
        };
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_form_is_empty() {
        let params = SimulationParams::from_form(&HashMap::new());
        assert_eq!(params, SimulationParams::default());
        assert_eq!(
            params.to_args(),
            vec![
                "--inverter", "200", "--battery", "600", "--efficiency", "0.88", "--reserve",
                "0.95"
            ]
        );
    }

    #[test]
    fn test_explicit_values() {
        let params = SimulationParams::from_form(&form(&[
            ("inverter_power", "150"),
            ("battery_capacity", "1200"),
            ("efficiency_loss", "6"),
            ("battery_reserve", "20"),
        ]));
        assert_eq!(params.inverter_kw, 150);
        assert_eq!(params.battery_kwh, 1200);
        assert!((params.efficiency() - 0.94).abs() < 1e-9);
        assert!((params.reserve() - 0.90).abs() < 1e-9);
        assert_eq!(&params.to_args()[4..], ["--efficiency", "0.94", "--reserve", "0.90"]);
    }

    #[test]
    fn test_dates_need_both_ends() {
        let both = SimulationParams::from_form(&form(&[
            ("start_date", "2024-01-01"),
            ("end_date", "2024-01-31"),
        ]));
        assert_eq!(both.date_range(), Some(("2024-01-01", "2024-01-31")));
        assert_eq!(
            &both.to_args()[8..],
            ["--start", "2024-01-01", "--end", "2024-01-31"]
        );

        let start_only = SimulationParams::from_form(&form(&[
            ("start_date", "2024-01-01"),
            ("end_date", ""),
        ]));
        assert_eq!(start_only.date_range(), None);
        assert!(!start_only.to_args().iter().any(|a| a == "--start" || a == "--end"));

        let end_only = SimulationParams::from_form(&form(&[("end_date", "2024-01-31")]));
        assert_eq!(end_only.to_args().len(), 8);
    }

    #[rstest]
    #[case("", 200)]
    #[case("0", 200)]
    #[case("00", 0)]
    #[case("350", 350)]
    #[case("  42", 42)]
    #[case("12.7", 12)]
    #[case("75kW", 75)]
    #[case("abc", 0)]
    #[case("-5", -5)]
    #[case("+8", 8)]
    fn test_inverter_power_parsing(#[case] raw: &str, #[case] expected: i64) {
        let params = SimulationParams::from_form(&form(&[("inverter_power", raw)]));
        assert_eq!(params.inverter_kw, expected);
    }

    #[test]
    fn test_lenient_int_saturates() {
        assert_eq!(lenient_int("99999999999999999999999"), i64::MAX);
        assert_eq!(lenient_int("-99999999999999999999999"), i64::MIN);
    }
}
