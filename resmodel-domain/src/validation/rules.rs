//! 内置校验规则
//!
//! 每条规则失败时返回当前语言下的文案（见 `locale`），文案在校验时解析，
//! 因此切换语言对已构造的规则同样生效。
//!
use super::{Rule, locale};
use crate::value::{to_datetime, to_display_string, to_number};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[\w\-]+(\.[\w\-]+)+[/#?]?.*$").expect("url pattern is valid")
});

fn check<F>(key: &'static str, params: Vec<(&'static str, String)>, test: F) -> Rule
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Rule::new(move |value, _attribute| {
        if test(value) {
            Ok(())
        } else {
            Err(locale::message(key, &params))
        }
    })
}

/// 非空：null 与空字符串失败
pub fn required() -> Rule {
    check("required", Vec::new(), |v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

pub fn email() -> Rule {
    check("email", Vec::new(), |v| EMAIL.is_match(&to_display_string(v)))
}

pub fn url() -> Rule {
    check("url", Vec::new(), |v| match v {
        Value::String(s) => URL.is_match(s),
        _ => false,
    })
}

pub fn min_length(min: usize) -> Rule {
    check("minLength", vec![("min", min.to_string())], move |v| {
        to_display_string(v).chars().count() >= min
    })
}

pub fn max_length(max: usize) -> Rule {
    check("maxLength", vec![("max", max.to_string())], move |v| {
        to_display_string(v).chars().count() <= max
    })
}

pub fn alpha() -> Rule {
    check("alpha", Vec::new(), |v| {
        to_display_string(v).chars().all(|c| c.is_ascii_alphabetic())
    })
}

pub fn alphanumeric() -> Rule {
    check("alphanumeric", Vec::new(), |v| {
        to_display_string(v).chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// 字符串形式需匹配给定正则
pub fn matches(pattern: Regex) -> Rule {
    let shown = pattern.as_str().to_string();
    check("match", vec![("pattern", shown)], move |v| {
        pattern.is_match(&to_display_string(v))
    })
}

pub fn numeric() -> Rule {
    check("numeric", Vec::new(), |v| to_number(v).is_finite())
}

pub fn integer() -> Rule {
    check("integer", Vec::new(), |v| {
        let n = to_number(v);
        n.is_finite() && n.fract() == 0.0
    })
}

pub fn min(min: f64) -> Rule {
    check("min", vec![("min", min.to_string())], move |v| to_number(v) >= min)
}

pub fn max(max: f64) -> Rule {
    check("max", vec![("max", max.to_string())], move |v| to_number(v) <= max)
}

pub fn between(min: f64, max: f64) -> Rule {
    check(
        "between",
        vec![("min", min.to_string()), ("max", max.to_string())],
        move |v| {
            let n = to_number(v);
            n >= min && n <= max
        },
    )
}

pub fn date() -> Rule {
    check("date", Vec::new(), |v| to_datetime(v).is_some())
}

pub fn before(limit: DateTime<Utc>) -> Rule {
    check("before", vec![("date", limit.to_rfc3339())], move |v| {
        to_datetime(v).is_some_and(|d| d < limit)
    })
}

pub fn after(limit: DateTime<Utc>) -> Rule {
    check("after", vec![("date", limit.to_rfc3339())], move |v| {
        to_datetime(v).is_some_and(|d| d > limit)
    })
}

pub fn array() -> Rule {
    check("array", Vec::new(), Value::is_array)
}

pub fn boolean() -> Rule {
    check("boolean", Vec::new(), Value::is_boolean)
}

pub fn object() -> Rule {
    check("object", Vec::new(), Value::is_object)
}

/// 值必须等于给定候选之一
pub fn in_array(values: Vec<Value>) -> Rule {
    let shown = join_values(&values);
    check("in", vec![("values", shown)], move |v| values.contains(v))
}

pub fn not_in_array(values: Vec<Value>) -> Rule {
    let shown = join_values(&values);
    check("notIn", vec![("values", shown)], move |v| !values.contains(v))
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(to_display_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ok(rule: &Rule, value: Value) -> bool {
        rule.check(&value, "field").is_ok()
    }

    #[test]
    fn required_rejects_null_and_empty() {
        let rule = required();
        assert!(!ok(&rule, json!(null)));
        assert!(!ok(&rule, json!("")));
        assert!(ok(&rule, json!(0)));
        assert!(ok(&rule, json!(false)));
        assert_eq!(
            rule.check(&json!(null), "name"),
            Err("This field is required".to_string())
        );
    }

    #[test]
    fn string_rules() {
        assert!(ok(&email(), json!("a.b@example.com")));
        assert!(!ok(&email(), json!("nope@")));
        assert!(ok(&url(), json!("https://example.com/path?q=1")));
        assert!(!ok(&url(), json!("ftp://example.com")));
        assert!(ok(&min_length(3), json!("abc")));
        assert!(!ok(&min_length(3), json!("ab")));
        assert!(ok(&max_length(2), json!("ab")));
        assert!(!ok(&max_length(2), json!("abc")));
        assert!(ok(&alpha(), json!("abcXYZ")));
        assert!(!ok(&alpha(), json!("abc1")));
        assert!(ok(&alphanumeric(), json!("abc123")));
        assert!(!ok(&alphanumeric(), json!("abc-123")));
        assert!(ok(&matches(Regex::new(r"^\d{3}$").unwrap()), json!(123)));
        assert!(!ok(&matches(Regex::new(r"^\d{3}$").unwrap()), json!("12a")));
    }

    #[test]
    fn length_message_is_interpolated() {
        assert_eq!(
            min_length(5).check(&json!("abc"), "name"),
            Err("Must be at least 5 characters".to_string())
        );
    }

    #[test]
    fn number_rules() {
        assert!(ok(&numeric(), json!("12.5")));
        assert!(!ok(&numeric(), json!("twelve")));
        assert!(ok(&integer(), json!(4)));
        assert!(!ok(&integer(), json!(4.5)));
        assert!(ok(&min(1.0), json!(1)));
        assert!(!ok(&min(1.0), json!(0)));
        assert!(ok(&max(10.0), json!("10")));
        assert!(!ok(&max(10.0), json!(11)));
        assert!(ok(&between(1.0, 3.0), json!(2)));
        assert!(!ok(&between(1.0, 3.0), json!(4)));
        assert_eq!(
            between(1.0, 3.0).check(&json!(9), "n"),
            Err("Must be between 1 and 3".to_string())
        );
    }

    #[test]
    fn date_rules() {
        let limit = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(ok(&date(), json!("2024-05-01")));
        assert!(!ok(&date(), json!("yesterday")));
        assert!(ok(&before(limit), json!("2024-05-31")));
        assert!(!ok(&before(limit), json!("2024-06-02")));
        assert!(ok(&after(limit), json!("2024-06-02T10:00:00Z")));
        assert!(!ok(&after(limit), json!("not a date")));
    }

    #[test]
    fn type_and_membership_rules() {
        assert!(ok(&array(), json!([])));
        assert!(!ok(&array(), json!({})));
        assert!(ok(&object(), json!({})));
        assert!(!ok(&object(), json!(null)));
        assert!(ok(&boolean(), json!(true)));
        assert!(!ok(&boolean(), json!("true")));

        let colors = vec![json!("red"), json!("blue")];
        assert!(ok(&in_array(colors.clone()), json!("red")));
        assert!(!ok(&not_in_array(colors.clone()), json!("red")));
        assert_eq!(
            in_array(colors).check(&json!("green"), "color"),
            Err("Must be one of: red, blue".to_string())
        );
    }

    #[test]
    fn chained_rules_report_first_failure() {
        let rule = required().and(min_length(3));
        assert_eq!(
            rule.check(&json!(""), "name"),
            Err("This field is required".to_string())
        );
        assert_eq!(
            rule.check(&json!("ab"), "name"),
            Err("Must be at least 3 characters".to_string())
        );
    }
}
