//! Session persistence: inputs and conversion state between invocations

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use crate::config::{SessionConfig, SCHEMA_VERSION};
use crate::conversion::ConversionState;
use crate::models::ResourceVector;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Calculator inputs as a versioned JSON document
        CREATE TABLE IF NOT EXISTS session (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL,
            config_json TEXT NOT NULL
        );

        -- Totals after all applied conversions
        CREATE TABLE IF NOT EXISTS conversion_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            active INTEGER NOT NULL,
            metal REAL NOT NULL,
            crystal REAL NOT NULL,
            deuterium REAL NOT NULL,
            conversion_count INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Store the session inputs, replacing any previous ones
pub fn save_config(conn: &Connection, config: &SessionConfig) -> Result<()> {
    let json = config.to_json_string()?;
    conn.execute(
        "INSERT OR REPLACE INTO session (id, schema_version, config_json) VALUES (1, ?1, ?2)",
        (SCHEMA_VERSION, &json),
    )?;
    debug!("Saved session config ({} bytes)", json.len());
    Ok(())
}

/// Load the session inputs, or defaults when none are stored
pub fn load_config(conn: &Connection) -> Result<SessionConfig> {
    let json: Option<String> = conn
        .query_row("SELECT config_json FROM session WHERE id = 1", [], |row| row.get(0))
        .optional()?;

    match json {
        Some(json) => SessionConfig::from_json_str(&json).context("Stored session config is invalid"),
        None => Ok(SessionConfig::default()),
    }
}

/// Store the conversion state. An empty state removes the row.
pub fn save_conversion_state(conn: &Connection, state: &ConversionState) -> Result<()> {
    if state.is_empty() {
        conn.execute("DELETE FROM conversion_state", [])?;
        return Ok(());
    }

    let totals = &state.cumulative_totals;
    conn.execute(
        "INSERT OR REPLACE INTO conversion_state (id, active, metal, crystal, deuterium, conversion_count)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)",
        (
            state.active,
            totals.metal,
            totals.crystal,
            totals.deuterium,
            state.conversion_count,
        ),
    )?;
    Ok(())
}

/// Load the conversion state, empty when none is stored
pub fn load_conversion_state(conn: &Connection) -> Result<ConversionState> {
    let state = conn
        .query_row(
            "SELECT active, metal, crystal, deuterium, conversion_count FROM conversion_state WHERE id = 1",
            [],
            |row| {
                Ok(ConversionState {
                    active: row.get(0)?,
                    cumulative_totals: ResourceVector::new(row.get(1)?, row.get(2)?, row.get(3)?),
                    conversion_count: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(state.unwrap_or_default())
}

/// Remove all stored inputs and conversions
pub fn clear_session(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM conversion_state;
        DELETE FROM session;
        "#,
    )?;
    info!("Session cleared");
    Ok(())
}
