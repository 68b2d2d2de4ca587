use crate::{config::Config, db::Db};
use std::{collections::HashSet, sync::Mutex, time::Duration};

/// Everything a delivery session needs, constructed once at startup
/// and handed to the dispatcher instead of living in globals.
pub struct AppContext {
    pub config: Config,
    pub db: Db,
    pub http: reqwest::Client,
    in_flight: Mutex<HashSet<String>>,
}

impl AppContext {
    pub fn new(config: Config, db: Db) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .expect("builder should be valid");

        Self {
            config,
            db,
            http,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Single-flight guard per content identity: the first session
    /// for a key wins, concurrent duplicates are dropped so the same
    /// content isn't fetched and cached twice in parallel.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.lock_in_flight().insert(key.to_owned())
    }

    pub fn release(&self, key: &str) {
        self.lock_in_flight().remove(key);
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_context() -> AppContext {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            archive_channel_id = -1001234567890

            [database]
            path = "media.db"

            [downloads]
            dir = "media-downloads"
            "#,
        )
        .unwrap();

        AppContext::new(config, Db::open_in_memory().unwrap())
    }

    #[test]
    fn in_flight_guard_is_exclusive_until_released() {
        let ctx = test_context();

        assert!(ctx.try_acquire("youtube:R4q-bxbxfXc"));
        assert!(!ctx.try_acquire("youtube:R4q-bxbxfXc"));
        assert!(ctx.try_acquire("youtube:other_video"));

        ctx.release("youtube:R4q-bxbxfXc");
        assert!(ctx.try_acquire("youtube:R4q-bxbxfXc"));
    }
}
