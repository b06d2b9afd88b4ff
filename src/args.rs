use clap::Parser;

use crate::error::TailError;

#[derive(Debug, Parser)]
#[command(about = "Print new records from the latest stream of each log group")]
pub struct Args {
    // Optional here so a missing flag goes through our own error path (stdout, exit 1).
    #[arg(short = 'g', value_name = "GROUPS", help = "define multiple log groups separated by comma")]
    pub groups: Option<String>,
}

/// Splits the `-g` value into group names. Every segment must be non-empty.
pub fn parse_groups(groups: Option<&str>) -> Result<Vec<String>, TailError> {
    let groups = groups.ok_or(TailError::MissingGroups)?;
    groups
        .split(',')
        .map(|group| {
            if group.is_empty() {
                Err(TailError::EmptyGroup)
            } else {
                Ok(group.to_string())
            }
        })
        .collect()
}
