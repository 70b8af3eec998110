use anyhow::Result;

use learn_swiping::progress::ProgressLedger;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, days: u32, format: &OutputFormat) -> Result<()> {
    let conn = app.connect()?;
    let updated = ProgressLedger::new(&conn).advance_days(days)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "days": days,
                "updated": updated,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Advanced {} progress rows by {} day(s).", updated, days);
        }
    }

    Ok(())
}
