//! Boundary to the warehouse staging step.
//!
//! The forecast CSVs produced elsewhere are put into an internal warehouse stage
//! and overwritten on every upload. This module validates the environment
//! provided credentials, checks the files are in place and renders the statement
//! sequence; executing it is left to a [`StageSession`] supplied by the caller.

use log::info;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ICON_CH1_STAGE: &str = "@bronze.stg_icon_ch1";
pub const ICON_CH1_GRID_FILE: &str = "icon_ch1_grid.csv";
pub const ICON_CH1_FORECAST_FILE: &str = "icon_ch1_forecast_aswdir_s.csv";

const REQUIRED_VARS: [&str; 3] = ["SNOWFLAKE_ACCOUNT", "SNOWFLAKE_USER", "SNOWFLAKE_PASSWORD"];

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Missing required warehouse credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("File to stage not found: '{0}'")]
    MissingFile(PathBuf, #[source] std::io::Error),

    #[error("Failed to connect to the warehouse: {0}")]
    Connect(String),

    #[error("Statement failed: {statement}: {message}")]
    Statement { statement: String, message: String },
}

/// Connection settings of the warehouse, read from `SNOWFLAKE_*` variables.
#[derive(Clone, PartialEq, Eq)]
pub struct WarehouseCredentials {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

impl fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"***")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

impl WarehouseCredentials {
    /// Reads the credentials from the process environment.
    ///
    /// Account, user and password are required together; every missing one is
    /// reported in a single error. Role, warehouse, database and schema fall back
    /// to `SYSADMIN`, `METEOSWISS_WH`, `METEOSWISS` and `BRONZE`.
    pub fn from_env() -> Result<Self, StagingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StagingError> {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let missing: Vec<&'static str> = REQUIRED_VARS
            .into_iter()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(StagingError::MissingCredentials(missing));
        }

        let required = |key: &str| get(key).unwrap_or_default();
        let optional = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        Ok(Self {
            account: required("SNOWFLAKE_ACCOUNT"),
            user: required("SNOWFLAKE_USER"),
            password: required("SNOWFLAKE_PASSWORD"),
            role: optional("SNOWFLAKE_ROLE", "SYSADMIN"),
            warehouse: optional("SNOWFLAKE_WAREHOUSE", "METEOSWISS_WH"),
            database: optional("SNOWFLAKE_DATABASE", "METEOSWISS"),
            schema: optional("SNOWFLAKE_SCHEMA", "BRONZE"),
        })
    }
}

/// A warehouse connection able to run staging statements.
pub trait StageSession {
    fn connect(&mut self, credentials: &WarehouseCredentials) -> Result<(), String>;

    /// Executes `statement` and returns the first column of every result row.
    fn execute(&mut self, statement: &str) -> Result<Vec<String>, String>;
}

/// Files to put into one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub stage: String,
    pub files: Vec<PathBuf>,
}

impl StagePlan {
    pub fn new(stage: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            stage: stage.into(),
            files,
        }
    }

    /// The grid reference and forecast CSVs of the ICON-CH1 pipeline below `data_root`.
    pub fn icon_ch1(data_root: &Path) -> Self {
        Self::new(
            ICON_CH1_STAGE,
            vec![
                data_root.join(ICON_CH1_GRID_FILE),
                data_root.join(ICON_CH1_FORECAST_FILE),
            ],
        )
    }

    /// Absolute paths of all files, failing on the first one that does not exist.
    fn resolve_files(&self) -> Result<Vec<PathBuf>, StagingError> {
        self.files
            .iter()
            .map(|file| {
                std::fs::canonicalize(file).map_err(|e| StagingError::MissingFile(file.clone(), e))
            })
            .collect()
    }

    /// One `PUT` per file, then a `LIST` of the stage.
    pub fn statements(&self) -> Result<Vec<String>, StagingError> {
        let mut statements: Vec<String> = self
            .resolve_files()?
            .iter()
            .map(|file| {
                format!(
                    "PUT file://{} {} AUTO_COMPRESS = FALSE OVERWRITE = TRUE",
                    file.display(),
                    self.stage
                )
            })
            .collect();
        statements.push(format!("LIST {}", self.stage));
        Ok(statements)
    }

    /// Uploads the files through `session` and returns the stage listing.
    ///
    /// Files are checked before a connection is attempted.
    pub fn execute<S: StageSession>(
        &self,
        credentials: &WarehouseCredentials,
        session: &mut S,
    ) -> Result<Vec<String>, StagingError> {
        let statements = self.statements()?;

        info!(
            "Connecting to warehouse account {} as {} ({}.{})",
            credentials.account, credentials.user, credentials.database, credentials.schema
        );
        session.connect(credentials).map_err(StagingError::Connect)?;

        let mut listing = Vec::new();
        for statement in statements {
            info!("Executing: {}", statement);
            listing = session
                .execute(&statement)
                .map_err(|message| StagingError::Statement {
                    statement: statement.clone(),
                    message,
                })?;
        }
        Ok(listing)
    }
}
