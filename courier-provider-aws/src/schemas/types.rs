//! AWS-specific type definitions

use courier_core::resource::Value;
use courier_core::schema::AttributeType;

use crate::utils::{normalize_region, parse_arn};

/// Partition qualifiers that may follow the area code (e.g., "us-gov-west-1")
const REGION_QUALIFIERS: &[&str] = &["gov", "iso", "isob", "isoe", "isof"];

/// Whether `s` has the shape of an AWS region name
///
/// `<area>[-<qualifier>]-<direction>-<number>`, e.g. "ap-east-1",
/// "cn-north-1" or "us-gov-west-1".
pub fn is_region_name(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let (area, rest) = match parts.as_slice() {
        [area, rest @ ..] => (*area, rest),
        [] => return false,
    };
    let rest = match rest {
        [qualifier, rest @ ..] if REGION_QUALIFIERS.contains(qualifier) => rest,
        rest => rest,
    };
    let [direction, number] = rest else {
        return false;
    };

    area.len() == 2
        && area.chars().all(|c| c.is_ascii_lowercase())
        && !direction.is_empty()
        && direction.chars().all(|c| c.is_ascii_lowercase())
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

/// AWS region type with custom validation
/// Accepts:
/// - DSL format: aws.Region.ap_northeast_1
/// - AWS string format: "ap-northeast-1"
pub fn aws_region() -> AttributeType {
    AttributeType::Custom {
        name: "Region".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                if is_region_name(&normalize_region(s)) {
                    Ok(())
                } else {
                    Err(format!(
                        "Invalid region '{}', expected a region name like ap-northeast-1 or DSL format like aws.Region.ap_northeast_1",
                        s
                    ))
                }
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// IAM role ARN (e.g., "arn:aws:iam::123456789012:role/iot-destination")
pub fn iam_role_arn() -> AttributeType {
    AttributeType::Custom {
        name: "IamRoleArn".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let Value::String(s) = value else {
                return Err("Expected string".to_string());
            };
            match parse_arn(s) {
                Some(arn) if arn.service == "iam" && arn.resource.starts_with("role/") => Ok(()),
                Some(_) => Err(format!("'{}' is not an IAM role ARN", s)),
                None => Err(format!(
                    "Invalid ARN '{}': expected arn:<partition>:<service>:<region>:<account>:<resource>",
                    s
                )),
            }
        },
    }
}

/// HTTPS URL, as required for confirmation endpoints
pub fn https_url() -> AttributeType {
    AttributeType::Custom {
        name: "HttpsUrl".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let Value::String(s) = value else {
                return Err("Expected string".to_string());
            };
            match s.strip_prefix("https://") {
                Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
                Some(_) => Err(format!("URL '{}' has no host", s)),
                None => Err(format!("URL '{}' must use the https scheme", s)),
            }
        },
    }
}
