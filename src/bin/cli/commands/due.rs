use anyhow::Result;

use learn_swiping::progress::DueCardSelector;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, token: &str, deck: i64, format: &OutputFormat) -> Result<()> {
    let conn = app.connect()?;
    let account = app.account(&conn, token)?;
    let cards = DueCardSelector::new(&conn).due_cards(account.id, deck)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("No cards due.");
                return Ok(());
            }

            let max_front = cards.iter().map(|c| c.front.chars().count()).max().unwrap_or(5).max(5);

            println!("{:<8} {:<width$} Question", "Id", "Front", width = max_front);
            println!(
                "{} {} {}",
                "\u{2500}".repeat(8),
                "\u{2500}".repeat(max_front),
                "\u{2500}".repeat(8)
            );
            for card in &cards {
                println!("{:<8} {:<width$} {}", card.id, card.front, card.question, width = max_front);
            }

            println!("\n{} cards due", cards.len());
        }
    }

    Ok(())
}
