//! One complete run: acquire a session, paginate, release, persist.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use url::Url;

use crate::classify::FieldClassifier;
use crate::config::{RunConfig, SiteConfig};
use crate::controller::{CancelFlag, PaginationController, RunOutcome};
use crate::error::HarvestError;
use crate::pause::Pause;
use crate::segment::CardSegmenter;
use crate::session::{ScopedSession, SessionLauncher};
use crate::sink::{OutputFormat, ResultSink};
use crate::source;

/// What a successful run produced and where it went.
#[derive(Debug)]
pub struct HarvestReport {
    pub outcome: RunOutcome,
    /// `None` when nothing was accepted and nothing was written
    pub written: Option<PathBuf>,
}

/// Run the engine against one site and hand the records to `sink`.
///
/// The session is closed before the sink is called, on every exit path.
/// A sink failure comes back as [`HarvestError::Persist`] with the
/// accumulated records still inside.
#[allow(clippy::too_many_arguments)]
pub fn harvest<L, K>(
    launcher: &mut L,
    site: &SiteConfig,
    run: &RunConfig,
    cancel: CancelFlag,
    pause: &mut dyn Pause,
    sink: &mut K,
    destination: &Path,
    format: OutputFormat,
) -> Result<HarvestReport, HarvestError>
where
    L: SessionLauncher,
    K: ResultSink + ?Sized,
{
    site.validate()?;
    run.validate()?;

    let segmenter = CardSegmenter::new(site.segmenter.clone());
    let classifier = FieldClassifier::new(site.classifier.clone())?;
    let origin = Url::parse(&site.origin).ok();

    let outcome = {
        let mut session = ScopedSession::new(launcher.launch()?);
        let mut pages = source::for_mode(&site.pagination, &mut *session, run);
        let controller =
            PaginationController::new(run.clone(), segmenter, classifier, origin, cancel);
        controller.run(pages.as_mut(), pause)
    };

    info!(
        "Run finished ({}): {} records from {} pages",
        outcome.stop_reason,
        outcome.records.len(),
        outcome.state.pages_visited
    );

    match sink.write(&outcome.records, destination, format) {
        Ok(written) => Ok(HarvestReport { outcome, written }),
        Err(source) => {
            warn!("Could not save results: {}", source);
            Err(HarvestError::Persist { source, outcome })
        }
    }
}
