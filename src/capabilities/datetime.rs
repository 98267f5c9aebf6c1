//! Current date/time capability.

use anyhow::Result;
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, Local, Utc};
use serde_json::json;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct DateTimeCapability;

#[async_trait]
impl Capability for DateTimeCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "datetime",
            "Get the current date and time, optionally shifted by a number of days \
             and formatted with a strftime pattern.",
        )
        .param(
            ParamDescriptor::optional("format", ParamType::String, "strftime pattern")
                .with_default(json!(DEFAULT_FORMAT)),
        )
        .param(
            ParamDescriptor::optional(
                "timezone",
                ParamType::one_of(&["utc", "local"]),
                "Which clock to read",
            )
            .with_default(json!("utc")),
        )
        .param(ParamDescriptor::optional(
            "offset_days",
            ParamType::Integer,
            "Days to add (negative for the past)",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let format = params.str("format").unwrap_or(DEFAULT_FORMAT);
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(CapabilityError::invalid(format!("Invalid date format: {}", format)).into());
        }

        let offset = Duration::try_days(params.i64("offset_days").unwrap_or(0))
            .ok_or_else(|| CapabilityError::invalid("offset_days is out of range"))?;

        let out_of_range = || CapabilityError::invalid("offset_days is out of range");
        let (formatted, rfc3339, timezone) = match params.str("timezone") {
            Some("local") => {
                let now = Local::now()
                    .checked_add_signed(offset)
                    .ok_or_else(out_of_range)?;
                (now.format(format).to_string(), now.to_rfc3339(), "local")
            }
            _ => {
                let now = Utc::now()
                    .checked_add_signed(offset)
                    .ok_or_else(out_of_range)?;
                (now.format(format).to_string(), now.to_rfc3339(), "utc")
            }
        };

        Ok(CapabilityResult::success(
            json!({
                "formatted": formatted,
                "rfc3339": rfc3339,
                "timezone": timezone,
            }),
            formatted,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::params::ParamValue;
    use crate::error::ErrorKind;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_metadata() {
        let d = DateTimeCapability.descriptor();
        assert_eq!(d.name, "datetime");
        assert_eq!(d.required_parameters().count(), 0);
    }

    #[test]
    fn test_year_format() {
        rt().block_on(async {
            let mut params = Params::new();
            params.insert("format", ParamValue::String("%Y".to_string()));
            let result = DateTimeCapability.execute(params).await.unwrap();
            let year: i32 = result.data().unwrap()["formatted"]
                .as_str()
                .unwrap()
                .parse()
                .unwrap();
            assert!(year >= 2024);
        });
    }

    #[test]
    fn test_offset_moves_date() {
        rt().block_on(async {
            let mut params = Params::new();
            params.insert("format", ParamValue::String("%Y-%m-%d".to_string()));
            params.insert("offset_days", ParamValue::Integer(-1));
            let result = DateTimeCapability.execute(params).await.unwrap();
            let expected = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
            // The day can roll over between the two clock reads; accept today too.
            let today = Utc::now().format("%Y-%m-%d").to_string();
            let got = result.data().unwrap()["formatted"].as_str().unwrap().to_string();
            assert!(got == expected || got == today, "{}", got);
        });
    }

    #[test]
    fn test_offset_past_calendar_range() {
        rt().block_on(async {
            for timezone in ["utc", "local"] {
                let mut params = Params::new();
                params.insert("offset_days", ParamValue::Integer(1_000_000_000));
                params.insert("timezone", ParamValue::String(timezone.to_string()));
                let err = DateTimeCapability.execute(params).await.unwrap_err();
                assert_eq!(crate::error::classify(&err), ErrorKind::InvalidArgument);
                assert!(err.to_string().contains("out of range"));
            }
        });
    }

    #[test]
    fn test_invalid_format() {
        rt().block_on(async {
            let mut params = Params::new();
            params.insert("format", ParamValue::String("%Q".to_string()));
            let err = DateTimeCapability.execute(params).await.unwrap_err();
            assert_eq!(crate::error::classify(&err), ErrorKind::InvalidArgument);
        });
    }
}
