use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::matches::Match;

/// Periodically removes matches and events that ended a while ago.
pub(crate) struct Sweeper {
    pool: db::Pool,
    interval: Duration,
    grace: chrono::Duration,
}

impl Sweeper {
    pub fn new(pool: db::Pool) -> Self {
        Sweeper {
            pool,
            interval: Config::cleanup_interval(),
            grace: Config::cleanup_grace(),
        }
    }

    pub fn start(self) {
        thread::spawn(move || loop {
            thread::sleep(self.interval);

            match self.sweep() {
                Ok((0, 0)) => debug!("nothing to clean up"),
                Ok((matches, events)) => {
                    info!("removed {} ended match(es) and {} ended event(s)", matches, events)
                }
                Err(e) => error!("unable to clean up ended matches and events: {}", e),
            }
        });
    }

    #[tracing::instrument(name = "sweeper::sweep", skip(self))]
    fn sweep(&self) -> Result<(usize, usize), ServiceError> {
        let conn = self.pool.get()?;
        let before = Utc::now() - self.grace;

        let matches = Match::delete_ended_before(before, &conn)?;
        let events = Event::delete_ended_before(before, &conn)?;

        Ok((matches, events))
    }
}
