use std::{collections::HashSet, process::ExitCode};

use tracing::{error, info};

use crate::{
    fetcher::Fetcher,
    mailer::Mailer,
    paper::{Paper, Source},
    store::{SeenStore, StoreError},
};

/// How a digest run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every matching paper had already been sent.
    NothingNew,
    /// A digest with this many papers was delivered and recorded.
    Sent(usize),
    /// Delivery failed; nothing was recorded, so the same papers come up again next run.
    SendFailed,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::NothingNew | Outcome::Sent(_) => ExitCode::SUCCESS,
            Outcome::SendFailed => ExitCode::FAILURE,
        }
    }
}

/// Papers found by one pass over the sources.
#[derive(Debug, Default)]
pub struct Collected {
    /// Matching papers per source, in fetch order, before any deduplication.
    pub per_source: Vec<(Source, usize)>,
    /// Papers not delivered before, each link once.
    pub new: Vec<Paper>,
}

/// Run every fetcher in turn and keep the papers the store has not seen.
///
/// A link reported by more than one source is kept once, from the first source that reported it.
pub fn collect(store: &SeenStore, fetchers: &[Box<dyn Fetcher>]) -> Collected {
    let mut collected = Collected::default();
    let mut links: HashSet<String> = HashSet::new();

    for fetcher in fetchers {
        let papers = fetcher.fetch();
        info!(source = %fetcher.source(), count = papers.len(), "fetched matching papers");
        collected.per_source.push((fetcher.source(), papers.len()));

        for paper in papers {
            if store.is_seen(&paper) || !links.insert(paper.link().to_string()) {
                continue;
            }
            collected.new.push(paper);
        }
    }

    collected
}

/// Send the new papers and record them once the digest went out.
///
/// Only a failure to write the state file is an error; a failed send is reported through
/// [`Outcome::SendFailed`].
pub fn run_digest(
    store: &mut SeenStore,
    collected: &Collected,
    mailer: &dyn Mailer,
) -> Result<Outcome, StoreError> {
    let new = &collected.new;
    if new.is_empty() {
        info!("no new papers");
        return Ok(Outcome::NothingNew);
    }

    if let Err(e) = mailer.send_digest(new) {
        let chain = format!("{:#}", anyhow::Error::from(e));
        error!(error = %chain, count = new.len(), "failed to send digest");
        return Ok(Outcome::SendFailed);
    }

    for paper in new {
        store.mark_seen(paper)?;
    }
    info!(count = new.len(), "recorded sent papers");
    Ok(Outcome::Sent(new.len()))
}
