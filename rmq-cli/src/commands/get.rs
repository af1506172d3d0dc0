//! `rmq get <path>`: GET any management API path.

use super::{client, emit};
use crate::error::{CliError, CliResult};
use rmq_api::Config;
use rmq_web::Context;

pub async fn execute(path: &str, config: Config, ctx: Context) -> CliResult<()> {
    let path = path.trim();
    if path.is_empty() {
        return Err(CliError::InvalidArgument("the API path is empty".to_string()));
    }
    let pretty = config.pretty_print;
    let result = client(config, ctx).get_json(path, None).await;
    emit(result, pretty)
}
