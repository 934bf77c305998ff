use invsync_config::Config;
use invsync_core::DataChangeEvent;
use owo_colors::OwoColorize;
use tabled::Tabled;

use crate::cli::{EventsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "SEQ")]
    sequence: i64,
    #[tabled(rename = "CHANGE")]
    change: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "OBJECT")]
    object: String,
    #[tabled(rename = "PARENT")]
    parent: String,
    #[tabled(rename = "AT")]
    at: String,
}

fn change_label(event: &DataChangeEvent) -> &'static str {
    match (&event.before_state, &event.after_state) {
        (None, Some(_)) => "create",
        (Some(_), None) => "delete",
        _ => "modify",
    }
}

fn row(event: &DataChangeEvent, color: bool) -> EventRow {
    let label = change_label(event);
    let change = match (color, label) {
        (false, _) => label.to_owned(),
        (true, "create") => label.green().to_string(),
        (true, "delete") => label.red().to_string(),
        (true, _) => label.yellow().to_string(),
    };
    EventRow {
        sequence: event.sequence_id,
        change,
        kind: event.object_type.to_string(),
        object: event.object_id.to_string(),
        parent: event.parent_id.map(|p| p.to_string()).unwrap_or_default(),
        at: event
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    }
}

pub fn handle(args: &EventsArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let db = super::open_database(config)?;
    let events = db.change_events_after(args.after, args.limit)?;
    let color = output::should_color(global.color);

    let out = output::render_list(
        global.output,
        &events,
        |e| row(e, color),
        |e| e.sequence_id.to_string(),
    )?;
    output::print_output(&out);
    Ok(())
}
