//! HTTP client for the D-Tale backend.
//!
//! Every response goes through [`decode`]: a body carrying an `error` field
//! becomes a [`ServerError`] inside the returned report, so callers can
//! downcast it and show the traceback.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::{Column, SortInfo};

/// Failure reported by the backend in the response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    pub error: String,
    #[serde(default)]
    pub traceback: Option<String>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ServerError {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub results: BTreeMap<String, serde_json::Map<String, Value>>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub final_query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DtypesResponse {
    #[serde(default)]
    pub dtypes: Vec<Column>,
}

/// Grid settings the backend persists per dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub sort_info: SortInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Lock,
    Unlock,
}

impl LockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAction {
    Front,
    Back,
    Left,
    Right,
}

impl MoveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Operations the grid needs from a backend.
pub trait DataSource: Send + Sync {
    /// Rows for the given range strings (`"10-20"`, `"35"`).
    fn fetch_rows(&self, ids: &[String]) -> Result<DataResponse>;
    fn fetch_dtypes(&self) -> Result<DtypesResponse>;
    fn update_settings(&self, settings: &Settings) -> Result<()>;
    fn update_visibility(&self, visibility: &BTreeMap<String, bool>) -> Result<()>;
    fn update_locked(&self, action: LockAction, column: &str) -> Result<()>;
    fn update_column_position(&self, action: MoveAction, column: &str) -> Result<()>;
}

/// Decode a response body, mapping `{error, traceback}` to [`ServerError`].
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| eyre!("Invalid response from server: {}", e))?;
    if let Some(err) = server_error(&value) {
        return Err(err.into());
    }
    serde_json::from_value(value).map_err(|e| eyre!("Unexpected response shape: {}", e))
}

fn server_error(value: &Value) -> Option<ServerError> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    let error = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let traceback = value
        .get("traceback")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(ServerError { error, traceback })
}

pub struct DtaleClient {
    base_url: String,
    data_id: String,
    agent: ureq::Agent,
}

impl DtaleClient {
    pub fn new(base_url: &str, data_id: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            data_id: data_id.to_string(),
            agent,
        }
    }

    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/dtale/{}/{}", self.base_url, name, self.data_id)
    }

    fn read(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<String> {
        match result {
            Ok(response) => Ok(response.into_string()?),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                if let Some(err) = serde_json::from_str::<Value>(&body)
                    .ok()
                    .as_ref()
                    .and_then(server_error)
                {
                    return Err(err.into());
                }
                Err(eyre!("Server returned HTTP {}", code))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get<T: DeserializeOwned>(&self, name: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(name);
        log::debug!("GET {}", url);
        let mut request = self.agent.get(&url);
        for (key, value) in params {
            request = request.query(key, value);
        }
        decode(&Self::read(request.call())?)
    }
}

impl DataSource for DtaleClient {
    fn fetch_rows(&self, ids: &[String]) -> Result<DataResponse> {
        let ids = serde_json::to_string(ids)?;
        self.get("data", &[("ids", ids.as_str())])
    }

    fn fetch_dtypes(&self) -> Result<DtypesResponse> {
        self.get("dtypes", &[])
    }

    fn update_settings(&self, settings: &Settings) -> Result<()> {
        let settings = serde_json::to_string(settings)?;
        self.get::<Value>("update-settings", &[("settings", settings.as_str())])
            .map(|_| ())
    }

    fn update_visibility(&self, visibility: &BTreeMap<String, bool>) -> Result<()> {
        let url = self.endpoint("update-visibility");
        log::debug!("POST {}", url);
        let visibility = serde_json::to_string(visibility)?;
        let body = Self::read(
            self.agent
                .post(&url)
                .send_form(&[("visibility", visibility.as_str())]),
        )?;
        decode::<Value>(&body).map(|_| ())
    }

    fn update_locked(&self, action: LockAction, column: &str) -> Result<()> {
        self.get::<Value>("update-locked", &[("action", action.as_str()), ("col", column)])
            .map(|_| ())
    }

    fn update_column_position(&self, action: MoveAction, column: &str) -> Result<()> {
        self.get::<Value>(
            "update-column-position",
            &[("action", action.as_str()), ("col", column)],
        )
        .map(|_| ())
    }
}
