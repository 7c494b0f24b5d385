//! Legal identity names used as certificate subjects.
//!
//! A node's legal identity is written in an X.500-style form such as
//! `O=MegaCorp,L=London,C=GB`. Organization, locality and country are
//! required; organizational unit, state and common name are optional.

use crate::error::{LedgerdError, LedgerdResult};
use std::fmt;
use std::str::FromStr;

const MAX_ATTRIBUTE_LENGTH: usize = 128;

/// An X.500-style legal name for a node identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegalName {
    organization: String,
    locality: String,
    country: String,
    organizational_unit: Option<String>,
    state: Option<String>,
    common_name: Option<String>,
}

impl LegalName {
    pub fn new(
        organization: impl Into<String>,
        locality: impl Into<String>,
        country: impl Into<String>,
    ) -> LedgerdResult<Self> {
        let name = Self {
            organization: organization.into(),
            locality: locality.into(),
            country: country.into(),
            organizational_unit: None,
            state: None,
            common_name: None,
        };
        name.validate()?;
        Ok(name)
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn locality(&self) -> &str {
        &self.locality
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn organizational_unit(&self) -> Option<&str> {
        self.organizational_unit.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    fn validate(&self) -> LedgerdResult<()> {
        let required = [
            ("O", &self.organization),
            ("L", &self.locality),
        ];
        for (attribute, value) in required {
            if value.is_empty() {
                return Err(invalid(attribute, "must not be empty"));
            }
            if value.len() > MAX_ATTRIBUTE_LENGTH {
                return Err(invalid(attribute, "exceeds maximum attribute length"));
            }
        }
        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid("C", "must be a 2-letter uppercase country code"));
        }
        Ok(())
    }
}

fn invalid(attribute: &str, message: &str) -> LedgerdError {
    LedgerdError::InvalidInput {
        field: format!("legalName.{}", attribute),
        message: message.to_string(),
    }
}

impl FromStr for LegalName {
    type Err = LedgerdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut organization = None;
        let mut locality = None;
        let mut country = None;
        let mut organizational_unit = None;
        let mut state = None;
        let mut common_name = None;

        for part in s.split(',') {
            let (attribute, value) = part.trim().split_once('=').ok_or_else(|| {
                LedgerdError::InvalidInput {
                    field: "legalName".to_string(),
                    message: format!("malformed attribute '{}', expected KEY=value", part.trim()),
                }
            })?;
            let slot = match attribute.trim() {
                "O" => &mut organization,
                "L" => &mut locality,
                "C" => &mut country,
                "OU" => &mut organizational_unit,
                "ST" => &mut state,
                "CN" => &mut common_name,
                other => {
                    return Err(LedgerdError::InvalidInput {
                        field: "legalName".to_string(),
                        message: format!("unsupported attribute '{}'", other),
                    })
                }
            };
            if slot.is_some() {
                return Err(invalid(attribute.trim(), "appears more than once"));
            }
            *slot = Some(value.trim().to_string());
        }

        let name = Self {
            organization: organization.ok_or_else(|| invalid("O", "is required"))?,
            locality: locality.ok_or_else(|| invalid("L", "is required"))?,
            country: country.ok_or_else(|| invalid("C", "is required"))?,
            organizational_unit,
            state,
            common_name,
        };
        name.validate()?;
        Ok(name)
    }
}

impl fmt::Display for LegalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O={},L={},C={}", self.organization, self.locality, self.country)?;
        if let Some(ref ou) = self.organizational_unit {
            write!(f, ",OU={}", ou)?;
        }
        if let Some(ref st) = self.state {
            write!(f, ",ST={}", st)?;
        }
        if let Some(ref cn) = self.common_name {
            write!(f, ",CN={}", cn)?;
        }
        Ok(())
    }
}
