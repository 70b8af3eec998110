use anyhow::Result;

use learn_swiping::storage::migration;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    // App::new already migrated; report where things stand
    let conn = app.connect()?;
    let version = migration::schema_version(&conn)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "database": app.db.path(),
                "schemaVersion": version,
                "latestVersion": migration::latest_version(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Database: {}", app.db.path().display());
            println!("Schema version: {}", version);
        }
    }

    Ok(())
}
