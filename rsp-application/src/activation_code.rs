//! Activation codes (`LPA:1$<SM-DP+>$<matching id>$<OID>$<CC flag>`)

use crate::error::RspError;
use std::fmt;
use std::str::FromStr;

/// Parsed activation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCode {
    pub smdp_address: String,
    pub matching_id: Option<String>,
    pub smdp_oid: Option<String>,
    pub confirmation_code_required: bool,
}

impl ActivationCode {
    /// Activation code carrying only an SM-DP+ address, as built from a
    /// discovered event
    pub fn for_address(smdp_address: impl Into<String>) -> Self {
        Self {
            smdp_address: smdp_address.into(),
            matching_id: None,
            smdp_oid: None,
            confirmation_code_required: false,
        }
    }

    pub fn with_matching_id(mut self, matching_id: impl Into<String>) -> Self {
        self.matching_id = Some(matching_id.into());
        self
    }
}

impl FromStr for ActivationCode {
    type Err = RspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RspError::InvalidActivationCode(format!("{}: '{}'", reason, s));

        let body = s.trim();
        let body = body
            .strip_prefix("LPA:")
            .or_else(|| body.strip_prefix("lpa:"))
            .unwrap_or(body);
        let mut fields = body.split('$');

        if fields.next() != Some("1") {
            return Err(invalid("Unsupported format"));
        }
        let smdp_address = match fields.next() {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => return Err(invalid("Missing SM-DP+ address")),
        };
        let non_empty = |field: Option<&str>| field.filter(|f| !f.is_empty()).map(str::to_string);
        let matching_id = non_empty(fields.next());
        let smdp_oid = non_empty(fields.next());
        let confirmation_code_required = match fields.next() {
            None | Some("") | Some("0") => false,
            Some("1") => true,
            Some(_) => return Err(invalid("Invalid confirmation code flag")),
        };
        if fields.next().is_some() {
            return Err(invalid("Too many fields"));
        }

        Ok(Self {
            smdp_address,
            matching_id,
            smdp_oid,
            confirmation_code_required,
        })
    }
}

impl fmt::Display for ActivationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LPA:1${}", self.smdp_address)?;
        let matching_id = self.matching_id.as_deref().unwrap_or("");
        if self.confirmation_code_required {
            write!(f, "${}${}$1", matching_id, self.smdp_oid.as_deref().unwrap_or(""))
        } else if let Some(oid) = &self.smdp_oid {
            write!(f, "${}${}", matching_id, oid)
        } else if !matching_id.is_empty() {
            write!(f, "${}", matching_id)
        } else {
            Ok(())
        }
    }
}
