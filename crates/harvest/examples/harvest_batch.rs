//! Example: Harvest owner facts from a seeded in-memory wiki.
//!
//! Usage:
//!   cargo run --example harvest_batch
//!
//! Runs a full batch against `MockWiki` so no network access or API
//! credentials are needed. Point `ApiClient` at real endpoints for a live
//! run.

use std::sync::Arc;

use harvest::{
    AttributeSpec, Claim, ClaimValue, HarvestConfig, Harvester, MockWiki, Record, SearchMode,
};

fn main() -> harvest::Result<()> {
    let wiki = Arc::new(
        MockWiki::new()
            .with_collection(
                "Observatories",
                ["Radcliffe Observatory", "King's Observatory", "Hanwell Community Observatory"],
            )
            .with_page(
                "Radcliffe Observatory",
                "{{Infobox building\n\
                 | name = Radcliffe Observatory\n\
                 | owner = [[Green Templeton College]]\n\
                 }}\n",
            )
            .with_page(
                "King's Observatory",
                "{{Infobox building\n\
                 | name = King's Observatory\n\
                 | owner = [[The Crown Estate]]\n\
                 }}\n",
            )
            .with_page(
                "Hanwell Community Observatory",
                "A community observatory with no infobox.\n",
            )
            .with_page("Green Templeton College", "A graduate college of Oxford.")
            .with_page("The Crown Estate", "A property business.")
            .with_record(
                "Green Templeton College",
                Record::new("Q5603654").with_label("Green Templeton College"),
            )
            .with_record(
                "The Crown Estate",
                Record::new("Q1139073").with_label("The Crown Estate"),
            )
            .with_record(
                "Radcliffe Observatory",
                Record::new("Q1404163").with_claim(Claim::new(
                    "P127",
                    ClaimValue::Item {
                        id: "Q5603654".to_string(),
                    },
                )),
            )
            .with_record("King's Observatory", Record::new("Q6411421"))
            .with_record("Hanwell Community Observatory", Record::new("Q5648968")),
    );

    let harvester = Harvester::new(wiki.clone(), wiki.clone())
        .with_config(HarvestConfig::default().with_reference("https://en.wikipedia.org/"));

    let spec = AttributeSpec::new("P127", "owners?", SearchMode::Infobox, "entity")?
        .with_summary("Importing owner from English Wikipedia");

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Harvest: owner (P127) over collection 'Observatories'");
    println!("{}", separator);
    println!();

    let summary = harvester.run_collection("Observatories", &spec)?;

    println!("## Summary");
    println!("  Added:           {}", summary.added);
    println!("  Already present: {}", summary.already_present);
    println!("  Not found:       {}", summary.not_found);
    println!("  Conflicts:       {}", summary.conflicts.len());
    println!("  No record:       {}", summary.no_record.len());
    println!("  Errors:          {}", summary.errors.total());
    println!();

    println!("## Writes");
    for write in wiki.writes() {
        println!(
            "  {} {} <- {} ({})",
            write.record_id, write.attribute, write.value, write.summary
        );
    }

    Ok(())
}
