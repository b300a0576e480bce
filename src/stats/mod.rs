//! Statistics: descriptive summaries, run-over-run tests, trend forecasting

pub mod descriptive;
pub mod inferential;
pub mod trend;

pub use descriptive::DescriptiveStats;
pub use inferential::{Comparator, InferentialSummary, TestOutcome, TestResult};
pub use trend::{Direction, Forecaster, ProbabilisticInsights, TrendFit, TrendOutcome};

/// Default significance level for every test
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Round half away from zero to `places` decimals.
///
/// Scaled values sitting within a few ulps below a half (2.675 * 100 =
/// 267.4999...) are treated as the half they represent.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    let nudge = scaled.abs().max(1.0) * f64::EPSILON * 8.0;
    let rounded = (scaled + nudge.copysign(scaled)).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Interpretation label for a p-value
pub fn interpret(p_value: f64, alpha: f64, subject: &str) -> String {
    if p_value < alpha {
        format!("significant {} (p < {})", subject, alpha)
    } else {
        format!("not significant (p >= {})", alpha)
    }
}

/// Serde adapter that keeps non-finite floats representable in JSON.
///
/// Finite values are plain numbers; infinities and NaN become the strings
/// `"Infinity"`, `"-Infinity"` and `"NaN"`.
pub(crate) mod lenient_float {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(t) => match t.as_str() {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid float: {}", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_half_away_from_zero() {
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(2.675, 2), 2.68);
        assert_eq!(round_to(-2.675, 2), -2.68);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(1.23456, 4), 1.2346);
    }

    #[test]
    fn round_to_keeps_non_finite() {
        assert!(round_to(f64::INFINITY, 2).is_infinite());
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn round_to_normalizes_negative_zero() {
        let r = round_to(-0.0001, 2);
        assert_eq!(r, 0.0);
        assert!(r.is_sign_positive());
    }

    #[test]
    fn interpret_labels() {
        assert_eq!(
            interpret(0.01, 0.05, "difference in mean frequency"),
            "significant difference in mean frequency (p < 0.05)"
        );
        assert_eq!(interpret(0.05, 0.05, "anything"), "not significant (p >= 0.05)");
    }

    #[derive(serde::Serialize, serde::Deserialize, Debug)]
    struct Wrapper {
        #[serde(with = "lenient_float")]
        v: f64,
    }

    #[test]
    fn lenient_float_round_trips_infinity() {
        let json = serde_json::to_string(&Wrapper { v: f64::INFINITY }).unwrap();
        assert_eq!(json, r#"{"v":"Infinity"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert!(back.v.is_infinite() && back.v > 0.0);
    }

    #[test]
    fn lenient_float_plain_numbers() {
        let back: Wrapper = serde_json::from_str(r#"{"v": 1.5}"#).unwrap();
        assert_eq!(back.v, 1.5);
        assert!(serde_json::from_str::<Wrapper>(r#"{"v": "lots"}"#).is_err());
    }
}
