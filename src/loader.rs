//! Background worker for backend effects.
//!
//! Effects run one at a time in submission order, so a settings update
//! queued before a row fetch reaches the server first. Results come back to
//! the UI thread as [`AppEvent`]s.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::client::DataSource;
use crate::error_display::FetchFailure;
use crate::store::Effect;
use crate::AppEvent;

pub struct Loader {
    jobs: Sender<Effect>,
}

impl Loader {
    pub fn spawn(source: Arc<dyn DataSource>, events: Sender<AppEvent>) -> Result<Self> {
        let (jobs, rx) = mpsc::channel::<Effect>();
        thread::Builder::new()
            .name("dtgrid-loader".to_string())
            .spawn(move || {
                for effect in rx {
                    if let Some(event) = execute(source.as_ref(), effect) {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
                log::debug!("Loader stopped");
            })?;
        Ok(Self { jobs })
    }

    pub fn submit(&self, effect: Effect) -> Result<()> {
        self.jobs
            .send(effect)
            .map_err(|_| eyre!("Background loader is not running"))
    }
}

/// Run one effect against `source`. Returns the event to report, if any;
/// successful updates report nothing.
pub fn execute(source: &dyn DataSource, effect: Effect) -> Option<AppEvent> {
    match effect {
        Effect::FetchDtypes => match source.fetch_dtypes() {
            Ok(response) => Some(AppEvent::ColumnsLoaded(response.dtypes)),
            Err(e) => Some(report("load column types", &e)),
        },
        Effect::Fetch(request) => match source.fetch_rows(&request.ranges) {
            Ok(response) => Some(AppEvent::RowsLoaded {
                generation: request.generation,
                response,
            }),
            Err(e) => {
                log::warn!("Fetch {:?} failed: {:#}", request.ranges, e);
                Some(AppEvent::RowsFailed {
                    generation: request.generation,
                    failure: FetchFailure::from_report(&e),
                })
            }
        },
        Effect::UpdateSettings(settings) => {
            acknowledge("update settings", source.update_settings(&settings))
        }
        Effect::UpdateVisibility(visibility) => {
            acknowledge("update visibility", source.update_visibility(&visibility))
        }
        Effect::UpdateLocked(action, column) => acknowledge(
            "update locked columns",
            source.update_locked(action, &column),
        ),
        Effect::MoveColumn(action, column) => acknowledge(
            "move column",
            source.update_column_position(action, &column),
        ),
    }
}

fn acknowledge(what: &str, result: Result<()>) -> Option<AppEvent> {
    match result {
        Ok(()) => None,
        Err(e) => Some(report(what, &e)),
    }
}

fn report(what: &str, err: &color_eyre::eyre::Report) -> AppEvent {
    log::warn!("Failed to {}: {:#}", what, err);
    AppEvent::BackendError(FetchFailure::from_report(err))
}
