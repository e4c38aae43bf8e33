//! Stack option discovery.

use crate::{Client, Result};
use http::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The options a stack accepts, as a JSON schema per option.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StackOptions {
    pub properties: BTreeMap<String, Value>,
}

impl Client {
    /// Fetches the options stacks can be configured with.
    pub async fn get_stack_options(&self) -> Result<StackOptions> {
        let mut result = StackOptions::default();
        let request = self.new_request(Method::GET, "/stackoptions", None, None)?;
        self.call_json(request, &mut result).await?;
        Ok(result)
    }
}
