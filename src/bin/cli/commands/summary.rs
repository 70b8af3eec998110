use anyhow::Result;

use learn_swiping::progress::DueCardSelector;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, token: &str, deck: i64, format: &OutputFormat) -> Result<()> {
    let conn = app.connect()?;
    let account = app.account(&conn, token)?;
    let summary = DueCardSelector::new(&conn).progress_summary(account.id, deck)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            println!("Deck {} for {}", deck, account.username);
            println!("  Cards:     {}", summary.total_cards);
            println!("  Reviewed:  {}", summary.reviewed_count);
            println!("  Remaining: {}", summary.remaining_count);
            println!("  Complete:  {:.1}%", summary.percent_complete);
        }
    }

    Ok(())
}
