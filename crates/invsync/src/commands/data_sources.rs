use invsync_config::Config;
use invsync_core::DataSourceRecord;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DataSourceRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "GENERATION")]
    generation: i64,
    #[tabled(rename = "CREATED")]
    created: String,
}

fn row(record: &DataSourceRecord) -> DataSourceRow {
    DataSourceRow {
        name: record.name.clone(),
        id: record.data_source_id.to_string(),
        generation: record.generation_id,
        created: record
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    }
}

pub fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let db = super::open_database(config)?;
    let records = db.data_sources()?;
    let out = output::render_list(global.output, &records, row, |r| r.name.clone())?;
    output::print_output(&out);
    Ok(())
}
