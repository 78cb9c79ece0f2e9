// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::Config;

/// Validate configuration and log what a run would use.
pub fn run_validate(config: &Config) -> Result<()> {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    log::info!("✓ API: {} ({}s timeout)", config.api.base_url, config.api.timeout_secs);
    log::info!(
        "✓ Retry: {} attempts, {}ms base delay, {}ms between requests",
        config.retry.max_attempts,
        config.retry.base_delay_ms,
        config.retry.request_delay_ms
    );
    log::info!(
        "✓ Query: type {}, rank > {}{}, page size {}",
        config.query.subject_type,
        config.query.min_rank,
        config
            .query
            .max_rank
            .map(|max| format!(" and <= {max}"))
            .unwrap_or_default(),
        config.query.page_size
    );
    log::info!(
        "✓ Collections: publish to {}, diff against {}, top {}",
        config.collections.target_id,
        config.collections.previous_id,
        config.ranking.top_n
    );

    Ok(())
}
