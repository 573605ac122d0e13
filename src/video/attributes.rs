// src/video/attributes.rs

//! GL framebuffer attributes and the requested/granted maps built over them.
//!
//! `GlAttr` ids are persisted in configuration files, so they never change.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
pub enum GlAttr {
    RedSize = 0,
    GreenSize = 1,
    BlueSize = 2,
    AlphaSize = 3,
    DoubleBuffer = 4,
    BufferSize = 5,
    DepthSize = 6,
    StencilSize = 7,
    AccumRedSize = 8,
    AccumGreenSize = 9,
    AccumBlueSize = 10,
    AccumAlphaSize = 11,
}

impl GlAttr {
    pub const ALL: [GlAttr; 12] = [
        GlAttr::RedSize,
        GlAttr::GreenSize,
        GlAttr::BlueSize,
        GlAttr::AlphaSize,
        GlAttr::DoubleBuffer,
        GlAttr::BufferSize,
        GlAttr::DepthSize,
        GlAttr::StencilSize,
        GlAttr::AccumRedSize,
        GlAttr::AccumGreenSize,
        GlAttr::AccumBlueSize,
        GlAttr::AccumAlphaSize,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Boolean attributes only accept 0 or 1.
    pub fn is_flag(self) -> bool {
        self == GlAttr::DoubleBuffer
    }

    fn name(self) -> &'static str {
        match self {
            GlAttr::RedSize => "red size",
            GlAttr::GreenSize => "green size",
            GlAttr::BlueSize => "blue size",
            GlAttr::AlphaSize => "alpha size",
            GlAttr::BufferSize => "buffer size",
            GlAttr::DoubleBuffer => "double buffer",
            GlAttr::DepthSize => "depth size",
            GlAttr::StencilSize => "stencil size",
            GlAttr::AccumRedSize => "accum red size",
            GlAttr::AccumGreenSize => "accum green size",
            GlAttr::AccumBlueSize => "accum blue size",
            GlAttr::AccumAlphaSize => "accum alpha size",
        }
    }

    /// Checks `value` is admissible for this attribute.
    pub fn validate(self, value: i32) -> Result<()> {
        if value < 0 {
            return Err(Error::InvalidArgument(format!(
                "{} cannot be negative (got {})",
                self, value
            )));
        }
        if self.is_flag() && value > 1 {
            return Err(Error::InvalidArgument(format!(
                "{} is a flag, expected 0 or 1 (got {})",
                self, value
            )));
        }
        if value > 256 {
            return Err(Error::InvalidArgument(format!(
                "{} of {} bits is out of range",
                self, value
            )));
        }
        Ok(())
    }
}

impl fmt::Display for GlAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u32> for GlAttr {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        GlAttr::ALL
            .into_iter()
            .find(|attr| attr.id() == id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown GL attribute id {}", id)))
    }
}

impl From<GlAttr> for u32 {
    fn from(attr: GlAttr) -> u32 {
        attr.id()
    }
}

/// Whether a request may be missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Mode-set fails unless the granted value is at least the request.
    Required,
    /// Best effort; a lower granted value is reported, not an error.
    #[default]
    Preferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub attr: GlAttr,
    pub value: i32,
    #[serde(default)]
    pub requirement: Requirement,
}

impl AttributeRequest {
    pub fn preferred(attr: GlAttr, value: i32) -> Self {
        AttributeRequest {
            attr,
            value,
            requirement: Requirement::Preferred,
        }
    }

    pub fn required(attr: GlAttr, value: i32) -> Self {
        AttributeRequest {
            attr,
            value,
            requirement: Requirement::Required,
        }
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    /// Whether `granted` satisfies this request. A flag must match exactly
    /// when required; a size must reach the requested value.
    pub fn is_met_by(&self, granted: i32) -> bool {
        if self.attr.is_flag() {
            granted == self.value
        } else {
            granted >= self.value
        }
    }
}

/// Desired attributes, keyed by attribute. Later requests replace earlier
/// ones for the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRequests {
    requests: BTreeMap<GlAttr, AttributeRequest>,
}

impl AttributeRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, request: AttributeRequest) -> Result<()> {
        request.attr.validate(request.value)?;
        self.requests.insert(request.attr, request);
        Ok(())
    }

    pub fn get(&self, attr: GlAttr) -> Option<&AttributeRequest> {
        self.requests.get(&attr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeRequest> {
        self.requests.values()
    }

    pub fn required(&self) -> impl Iterator<Item = &AttributeRequest> {
        self.requests.values().filter(|request| request.is_required())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// True if a double buffer was asked for.
    pub fn wants_double_buffer(&self) -> bool {
        self.get(GlAttr::DoubleBuffer).is_some_and(|request| request.value == 1)
    }
}

/// Attribute values a driver actually provisioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedAttributes {
    values: BTreeMap<GlAttr, i32>,
}

impl GrantedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: GlAttr, value: i32) -> Self {
        self.values.insert(attr, value);
        self
    }

    pub fn set(&mut self, attr: GlAttr, value: i32) {
        self.values.insert(attr, value);
    }

    /// Unreported attributes read as 0.
    pub fn get(&self, attr: GlAttr) -> i32 {
        self.values.get(&attr).copied().unwrap_or(0)
    }

    pub fn is_double_buffered(&self) -> bool {
        self.get(GlAttr::DoubleBuffer) == 1
    }

    /// The first required request this grant falls short of.
    pub fn unmet<'a>(&self, requests: &'a AttributeRequests) -> Option<&'a AttributeRequest> {
        requests
            .required()
            .find(|request| !request.is_met_by(self.get(request.attr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn it_should_keep_attribute_ids_stable() {
        let ids: Vec<u32> = GlAttr::ALL.iter().map(|attr| attr.id()).collect();
        assert_eq!(ids, (0..12).collect::<Vec<u32>>());
        assert_eq!(GlAttr::try_from(6).ok(), Some(GlAttr::DepthSize));
        assert!(GlAttr::try_from(12).is_err());
    }

    #[test]
    fn it_should_persist_attributes_by_id() -> anyhow::Result<()> {
        let request = AttributeRequest::required(GlAttr::DepthSize, 24);
        let json = serde_json::to_string(&request)?;
        assert_eq!(json, r#"{"attr":6,"value":24,"requirement":"required"}"#);

        let parsed: AttributeRequest = serde_json::from_str(r#"{"attr":4,"value":1}"#)?;
        assert_eq!(parsed, AttributeRequest::preferred(GlAttr::DoubleBuffer, 1));
        assert!(serde_json::from_str::<AttributeRequest>(r#"{"attr":40,"value":1}"#).is_err());
        Ok(())
    }

    #[test]
    fn it_should_validate_request_values() {
        let mut requests = AttributeRequests::new();
        assert!(requests.insert(AttributeRequest::preferred(GlAttr::RedSize, -1)).is_err());
        assert!(requests.insert(AttributeRequest::preferred(GlAttr::DoubleBuffer, 2)).is_err());
        assert!(requests.insert(AttributeRequest::preferred(GlAttr::DoubleBuffer, 1)).is_ok());
        assert!(requests.wants_double_buffer());
    }

    #[test]
    fn it_should_find_unmet_required_attributes() -> anyhow::Result<()> {
        let mut requests = AttributeRequests::new();
        requests.insert(AttributeRequest::required(GlAttr::DepthSize, 24))?;
        requests.insert(AttributeRequest::preferred(GlAttr::StencilSize, 8))?;

        let low = GrantedAttributes::new().with(GlAttr::DepthSize, 16);
        assert_eq!(low.unmet(&requests).map(|r| r.attr), Some(GlAttr::DepthSize));

        let high = GrantedAttributes::new().with(GlAttr::DepthSize, 32);
        assert!(high.unmet(&requests).is_none());
        Ok(())
    }
}
